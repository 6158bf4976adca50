//! Simulated hardware. Devices are handles around shared state, so a clone
//! kept by a test sees everything the robot does to the original.

use alloc::rc::Rc;
use core::{cell::RefCell, time::Duration};

use hashbrown::{HashMap, HashSet};

use crate::{
    bus::MotorBus,
    hardware::{
        Axis, Button, ControlMode, DeviceId, DriverController, FeedbackDevice, MotorController,
        NeutralMode, OutputLimits, StatusFrame, VelocityMeasPeriod,
    },
    robot::{CompetitionMode, DriverStation, ITERATION_PERIOD},
    ControllerSnafu, MotorSnafu, Result,
};

/// Integrated encoder ticks per 100 ms at full output (6380 rpm, 2048 counts/rev).
pub const FREE_SPEED_TICKS_PER_100MS: f64 = 6380.0 / 600.0 * 2048.0;
/// Fraction of velocity kept per cycle while coasting at zero output.
pub const COAST_DECAY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct SimTalonState {
    pub mode: ControlMode,
    /// Last value passed to `set`.
    pub demand: f64,
    /// Output after peak and nominal limits, before inversion.
    pub applied_output: f64,
    pub neutral_mode: NeutralMode,
    pub inverted: bool,
    pub sensor_phase: bool,
    pub limits: OutputLimits,
    pub feedback_device: FeedbackDevice,
    pub velocity_measurement_period: VelocityMeasPeriod,
    pub velocity_measurement_window: u32,
    pub status_frame_periods: HashMap<StatusFrame, u32>,
    pub last_timeout_ms: Option<u32>,
    /// Shaft position in ticks, positive in the motor's physical forward direction.
    pub rotor_position: f64,
    /// Shaft velocity in ticks per 100 ms.
    pub rotor_velocity: f64,
    /// While set, every call fails.
    pub faulted: bool,
}

impl Default for SimTalonState {
    fn default() -> Self {
        Self {
            mode: ControlMode::PercentOutput,
            demand: 0.0,
            applied_output: 0.0,
            neutral_mode: NeutralMode::Coast,
            inverted: false,
            sensor_phase: false,
            limits: OutputLimits::default(),
            feedback_device: FeedbackDevice::IntegratedSensor,
            velocity_measurement_period: VelocityMeasPeriod::Period100Ms,
            velocity_measurement_window: 64,
            status_frame_periods: HashMap::new(),
            last_timeout_ms: None,
            rotor_position: 0.0,
            rotor_velocity: 0.0,
            faulted: false,
        }
    }
}

impl SimTalonState {
    /// Output actually driving the shaft, after inversion.
    pub fn motor_output(&self) -> f64 {
        if self.inverted {
            -self.applied_output
        } else {
            self.applied_output
        }
    }

    /// Sign relating shaft ticks to the selected sensor reading.
    ///
    /// The integrated sensor always reads positive for positive output, so it
    /// follows inversion and ignores sensor phase.
    fn sensor_sign(&self) -> f64 {
        let flipped = match self.feedback_device {
            FeedbackDevice::IntegratedSensor => self.inverted,
            FeedbackDevice::QuadEncoder => self.sensor_phase,
        };
        if flipped {
            -1.0
        } else {
            1.0
        }
    }

    fn step(&mut self, period: Duration) {
        let output = self.motor_output();
        if output != 0.0 {
            self.rotor_velocity = output * FREE_SPEED_TICKS_PER_100MS;
        } else {
            self.rotor_velocity = match self.neutral_mode {
                NeutralMode::Brake => 0.0,
                NeutralMode::Coast => self.rotor_velocity * COAST_DECAY,
            };
        }
        self.rotor_position += self.rotor_velocity * period.as_secs_f64() * 10.0;
    }
}

/// A simulated smart motor controller.
#[derive(Debug, Clone)]
pub struct SimTalon {
    id: DeviceId,
    bus: MotorBus,
    state: Rc<RefCell<SimTalonState>>,
}

impl SimTalon {
    pub fn new(id: DeviceId, bus: &MotorBus) -> Self {
        Self {
            id,
            bus: bus.clone(),
            state: Rc::new(RefCell::new(SimTalonState::default())),
        }
    }

    pub fn state(&self) -> SimTalonState {
        self.state.borrow().clone()
    }

    /// Make every subsequent call fail until cleared.
    pub fn set_faulted(&self, faulted: bool) {
        self.state.borrow_mut().faulted = faulted;
    }

    fn check(&self, operation: &'static str) -> Result {
        if self.state.borrow().faulted {
            return MotorSnafu {
                device: self.id,
                operation,
            }
            .fail();
        }
        Ok(())
    }

    fn leader(&self) -> Option<DeviceId> {
        let state = self.state.borrow();
        (state.mode == ControlMode::Follower).then(|| DeviceId(state.demand as u8))
    }

    fn follow_leader(&self) {
        if let Some(leader) = self.leader() {
            let leader_output = self.bus.output(leader).unwrap_or(0.0);
            let mut state = self.state.borrow_mut();
            state.applied_output = state.limits.apply(leader_output);
            self.bus.publish(self.id, state.applied_output);
        }
    }

    fn configure(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut SimTalonState),
    ) -> Result {
        self.check(operation)?;
        apply(&mut *self.state.borrow_mut());
        Ok(())
    }
}

impl MotorController for SimTalon {
    fn device_id(&self) -> DeviceId {
        self.id
    }

    fn set(&mut self, mode: ControlMode, value: f64) -> Result {
        self.check("set output")?;
        {
            let mut state = self.state.borrow_mut();
            state.mode = mode;
            state.demand = value;
            match mode {
                ControlMode::PercentOutput => {
                    state.applied_output = state.limits.apply(value);
                    self.bus.publish(self.id, state.applied_output);
                }
                ControlMode::Follower => {}
                ControlMode::Disabled => {
                    state.applied_output = 0.0;
                    self.bus.clear(self.id);
                }
            }
        }
        self.follow_leader();
        Ok(())
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result {
        self.configure("set neutral mode", |state| state.neutral_mode = mode)
    }

    fn set_inverted(&mut self, inverted: bool) -> Result {
        self.configure("set inversion", |state| state.inverted = inverted)
    }

    fn set_sensor_phase(&mut self, phase: bool) -> Result {
        self.configure("set sensor phase", |state| state.sensor_phase = phase)
    }

    fn config_nominal_output_forward(&mut self, value: f64, timeout_ms: u32) -> Result {
        self.configure("configure nominal forward output", |state| {
            state.limits.nominal_forward = value;
            state.last_timeout_ms = Some(timeout_ms);
        })
    }

    fn config_nominal_output_reverse(&mut self, value: f64, timeout_ms: u32) -> Result {
        self.configure("configure nominal reverse output", |state| {
            state.limits.nominal_reverse = value;
            state.last_timeout_ms = Some(timeout_ms);
        })
    }

    fn config_peak_output_forward(&mut self, value: f64, timeout_ms: u32) -> Result {
        self.configure("configure peak forward output", |state| {
            state.limits.peak_forward = value;
            state.last_timeout_ms = Some(timeout_ms);
        })
    }

    fn config_peak_output_reverse(&mut self, value: f64, timeout_ms: u32) -> Result {
        self.configure("configure peak reverse output", |state| {
            state.limits.peak_reverse = value;
            state.last_timeout_ms = Some(timeout_ms);
        })
    }

    fn config_selected_feedback_sensor(&mut self, device: FeedbackDevice) -> Result {
        self.configure("select feedback sensor", |state| state.feedback_device = device)
    }

    fn config_velocity_measurement_period(&mut self, period: VelocityMeasPeriod) -> Result {
        self.configure("configure velocity measurement period", |state| {
            state.velocity_measurement_period = period
        })
    }

    fn config_velocity_measurement_window(&mut self, samples: u32) -> Result {
        self.configure("configure velocity measurement window", |state| {
            state.velocity_measurement_window = samples
        })
    }

    fn set_status_frame_period(
        &mut self,
        frame: StatusFrame,
        period_ms: u32,
        timeout_ms: u32,
    ) -> Result {
        self.configure("set status frame period", |state| {
            state.status_frame_periods.insert(frame, period_ms);
            state.last_timeout_ms = Some(timeout_ms);
        })
    }

    fn selected_sensor_position(&self) -> Result<f64> {
        self.check("read sensor position")?;
        let state = self.state.borrow();
        Ok(state.rotor_position * state.sensor_sign())
    }

    fn selected_sensor_velocity(&self) -> Result<f64> {
        self.check("read sensor velocity")?;
        let state = self.state.borrow();
        Ok(state.rotor_velocity * state.sensor_sign())
    }

    fn set_selected_sensor_position(&mut self, ticks: f64) -> Result {
        self.configure("set sensor position", |state| {
            state.rotor_position = ticks * state.sensor_sign()
        })
    }

    fn sync_follower(&mut self) -> Result {
        self.check("follow leader")?;
        self.follow_leader();
        Ok(())
    }

    fn periodic(&mut self) -> Result {
        self.check("update")?;
        self.state.borrow_mut().step(ITERATION_PERIOD);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SimControllerState {
    axes: HashMap<Axis, f64>,
    buttons: HashSet<Button>,
    disconnected: bool,
}

/// A simulated gamepad whose axes and buttons are set directly.
#[derive(Debug, Clone, Default)]
pub struct SimXboxController(Rc<RefCell<SimControllerState>>);

impl SimXboxController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_axis(&self, axis: Axis, value: f64) {
        self.0.borrow_mut().axes.insert(axis, value);
    }

    pub fn set_button(&self, button: Button, pressed: bool) {
        let buttons = &mut self.0.borrow_mut().buttons;
        if pressed {
            buttons.insert(button);
        } else {
            buttons.remove(&button);
        }
    }

    /// Centre every axis and release every button.
    pub fn reset(&self) {
        let mut state = self.0.borrow_mut();
        state.axes.clear();
        state.buttons.clear();
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.borrow_mut().disconnected = !connected;
    }
}

impl DriverController for SimXboxController {
    fn axis(&self, axis: Axis) -> Result<f64> {
        let state = self.0.borrow();
        if state.disconnected {
            return ControllerSnafu { input: "axis" }.fail();
        }
        Ok(state.axes.get(&axis).copied().unwrap_or(0.0))
    }

    fn button(&self, button: Button) -> Result<bool> {
        let state = self.0.borrow();
        if state.disconnected {
            return ControllerSnafu { input: "button" }.fail();
        }
        Ok(state.buttons.contains(&button))
    }
}

/// A driver station whose competition mode is set by hand. Waiting only
/// advances a cycle counter.
#[derive(Debug, Clone)]
pub struct SimDriverStation {
    mode: CompetitionMode,
    cycles: u64,
}

impl SimDriverStation {
    pub fn new(mode: CompetitionMode) -> Self {
        Self { mode, cycles: 0 }
    }

    pub fn set_mode(&mut self, mode: CompetitionMode) {
        self.mode = mode;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl DriverStation for SimDriverStation {
    fn mode(&self) -> CompetitionMode {
        self.mode
    }

    fn wait_for_next_cycle(&mut self, _period: Duration) {
        self.cycles += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::close;

    #[test]
    fn output_is_clamped_to_peak() {
        let bus = MotorBus::new();
        let mut talon = SimTalon::new(DeviceId(1), &bus);
        talon.config_peak_output_forward(0.5, 10).unwrap();
        talon.set(ControlMode::PercentOutput, 0.9).unwrap();
        assert_eq!(talon.state().applied_output, 0.5);
        assert_eq!(bus.output(DeviceId(1)), Some(0.5));

        talon.set(ControlMode::PercentOutput, -1.7).unwrap();
        assert_eq!(talon.state().applied_output, -1.0);
    }

    #[test]
    fn nominal_output_lifts_small_demands() {
        let bus = MotorBus::new();
        let mut talon = SimTalon::new(DeviceId(1), &bus);
        talon.config_nominal_output_forward(0.1, 10).unwrap();
        talon.set(ControlMode::PercentOutput, 0.05).unwrap();
        assert_eq!(talon.state().applied_output, 0.1);
        talon.set(ControlMode::PercentOutput, 0.0).unwrap();
        assert_eq!(talon.state().applied_output, 0.0);
    }

    #[test]
    fn follower_mirrors_leader_with_own_inversion() {
        let bus = MotorBus::new();
        let mut leader = SimTalon::new(DeviceId(1), &bus);
        let mut follower = SimTalon::new(DeviceId(2), &bus);
        follower.set_inverted(true).unwrap();
        follower.set(ControlMode::Follower, 1.0).unwrap();

        leader.set(ControlMode::PercentOutput, 0.4).unwrap();
        follower.sync_follower().unwrap();

        assert_eq!(follower.state().applied_output, 0.4);
        assert_eq!(follower.state().motor_output(), -0.4);
    }

    #[test]
    fn periodic_does_not_resync_follower() {
        let bus = MotorBus::new();
        let mut leader = SimTalon::new(DeviceId(1), &bus);
        let mut follower = SimTalon::new(DeviceId(2), &bus);
        follower.set(ControlMode::Follower, 1.0).unwrap();

        leader.set(ControlMode::PercentOutput, 0.4).unwrap();
        follower.periodic().unwrap();
        assert_eq!(follower.state().applied_output, 0.0);

        follower.sync_follower().unwrap();
        follower.periodic().unwrap();
        assert_eq!(follower.state().applied_output, 0.4);
        assert!(follower.state().rotor_velocity > 0.0);
    }

    #[test]
    fn integrated_sensor_reads_positive_for_positive_output() {
        let bus = MotorBus::new();
        let mut talon = SimTalon::new(DeviceId(1), &bus);
        talon.set_inverted(true).unwrap();
        talon.set_sensor_phase(true).unwrap();
        talon.set(ControlMode::PercentOutput, 0.5).unwrap();
        talon.periodic().unwrap();

        let velocity = talon.selected_sensor_velocity().unwrap();
        assert!(close(velocity, 0.5 * FREE_SPEED_TICKS_PER_100MS));
        // 20 ms is a fifth of the 100 ms velocity unit.
        assert!(close(talon.selected_sensor_position().unwrap(), velocity * 0.2));
    }

    #[test]
    fn quad_encoder_honours_sensor_phase() {
        let bus = MotorBus::new();
        let mut talon = SimTalon::new(DeviceId(1), &bus);
        talon
            .config_selected_feedback_sensor(FeedbackDevice::QuadEncoder)
            .unwrap();
        talon.set_sensor_phase(true).unwrap();
        talon.set(ControlMode::PercentOutput, 0.5).unwrap();
        talon.periodic().unwrap();
        assert!(talon.selected_sensor_velocity().unwrap() < 0.0);
    }

    #[test]
    fn neutral_mode_governs_stopping() {
        let bus = MotorBus::new();
        let mut coast = SimTalon::new(DeviceId(1), &bus);
        let mut brake = SimTalon::new(DeviceId(2), &bus);
        brake.set_neutral_mode(NeutralMode::Brake).unwrap();
        for talon in [&mut coast, &mut brake] {
            talon.set(ControlMode::PercentOutput, 1.0).unwrap();
            talon.periodic().unwrap();
            talon.set(ControlMode::PercentOutput, 0.0).unwrap();
            talon.periodic().unwrap();
        }
        assert!(close(
            coast.selected_sensor_velocity().unwrap(),
            FREE_SPEED_TICKS_PER_100MS * COAST_DECAY
        ));
        assert_eq!(brake.selected_sensor_velocity().unwrap(), 0.0);
    }

    #[test]
    fn faulted_talon_reports_its_device() {
        let bus = MotorBus::new();
        let mut talon = SimTalon::new(DeviceId(7), &bus);
        talon.set_faulted(true);
        let err = talon.set_inverted(true).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Motor {
                device: DeviceId(7),
                ..
            }
        ));
    }

    #[test]
    fn controller_reads_what_was_set() {
        let controller = SimXboxController::new();
        controller.set_axis(Axis::LeftY, -0.6);
        controller.set_button(Button::A, true);
        assert_eq!(controller.axis(Axis::LeftY).unwrap(), -0.6);
        assert_eq!(controller.axis(Axis::RightX).unwrap(), 0.0);
        assert!(controller.button(Button::A).unwrap());

        controller.set_connected(false);
        assert!(controller.axis(Axis::LeftY).is_err());
    }
}
