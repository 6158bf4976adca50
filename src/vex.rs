use core::time::Duration;

use log::{debug, LevelFilter, Log, Metadata, Record, SetLoggerError};
use pros::core::task::Interval;
use pros::devices::competition;
use pros::devices::controller::{ControllerButton, JoystickAxis};
use pros::prelude::*;

use crate::{
    bus::MotorBus,
    hardware::{
        Axis, Button, ControlMode, DeviceId, DriverController, FeedbackDevice, MotorController,
        NeutralMode, OutputLimits, StatusFrame, VelocityMeasPeriod,
    },
    robot::{CompetitionMode, DriverStation},
    ControllerSnafu, MotorSnafu, Result,
};

/// Ticks per degree, so positions read like a 2048-count integrated encoder.
const TICKS_PER_DEGREE: f64 = 2048.0 / 360.0;
/// rpm to ticks per 100 ms.
const RPM_TO_TICKS_PER_100MS: f64 = 2048.0 / 600.0;

/// A V5 smart motor. Follower mode, output limits and sensor phase have no
/// firmware support, so they are emulated here; leader outputs are shared
/// through a [`MotorBus`].
#[derive(Debug)]
pub struct V5Talon {
    id: DeviceId,
    motor: Motor,
    bus: MotorBus,
    mode: ControlMode,
    demand: f64,
    inverted: bool,
    sensor_phase: bool,
    feedback_device: FeedbackDevice,
    limits: OutputLimits,
    zero_offset: f64,
}

impl V5Talon {
    /// The smart port number doubles as the device id.
    pub fn new(port: u8, bus: &MotorBus) -> Result<Self> {
        let id = DeviceId(port);
        let motor = Motor::new(port, BrakeMode::Coast).map_err(|_| {
            MotorSnafu {
                device: id,
                operation: "connect",
            }
            .build()
        })?;
        Ok(Self {
            id,
            motor,
            bus: bus.clone(),
            mode: ControlMode::PercentOutput,
            demand: 0.0,
            inverted: false,
            sensor_phase: false,
            feedback_device: FeedbackDevice::IntegratedSensor,
            limits: OutputLimits::default(),
            zero_offset: 0.0,
        })
    }

    fn error(&self, operation: &'static str) -> crate::Error {
        MotorSnafu {
            device: self.id,
            operation,
        }
        .build()
    }

    fn write_output(&mut self, applied: f64) -> Result {
        self.bus.publish(self.id, applied);
        let output = if self.inverted { -applied } else { applied };
        self.motor
            .set_output(output as f32)
            .map_err(|_| self.error("set output"))
    }

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

    fn raw_position(&self) -> Result<f64> {
        let position = self
            .motor
            .position()
            .map_err(|_| self.error("read sensor position"))?;
        Ok(position.into_degrees() * TICKS_PER_DEGREE * self.sensor_sign())
    }

    fn unsupported(&self, setting: &str) -> Result {
        debug!("{}: {} is fixed on V5 motors", self.id, setting);
        Ok(())
    }
}

impl MotorController for V5Talon {
    fn device_id(&self) -> DeviceId {
        self.id
    }

    fn set(&mut self, mode: ControlMode, value: f64) -> Result {
        self.mode = mode;
        self.demand = value;
        match mode {
            ControlMode::PercentOutput => self.write_output(self.limits.apply(value)),
            ControlMode::Follower => self.sync_follower(),
            ControlMode::Disabled => {
                self.bus.clear(self.id);
                self.motor
                    .set_output(0.0)
                    .map_err(|_| self.error("disable output"))
            }
        }
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result {
        let brake_mode = match mode {
            NeutralMode::Coast => BrakeMode::Coast,
            NeutralMode::Brake => BrakeMode::Brake,
        };
        self.motor
            .set_brake_mode(brake_mode)
            .map_err(|_| self.error("set neutral mode"))
    }

    fn set_inverted(&mut self, inverted: bool) -> Result {
        self.inverted = inverted;
        Ok(())
    }

    fn set_sensor_phase(&mut self, phase: bool) -> Result {
        self.sensor_phase = phase;
        Ok(())
    }

    fn config_nominal_output_forward(&mut self, value: f64, _timeout_ms: u32) -> Result {
        self.limits.nominal_forward = value;
        Ok(())
    }

    fn config_nominal_output_reverse(&mut self, value: f64, _timeout_ms: u32) -> Result {
        self.limits.nominal_reverse = value;
        Ok(())
    }

    fn config_peak_output_forward(&mut self, value: f64, _timeout_ms: u32) -> Result {
        self.limits.peak_forward = value;
        Ok(())
    }

    fn config_peak_output_reverse(&mut self, value: f64, _timeout_ms: u32) -> Result {
        self.limits.peak_reverse = value;
        Ok(())
    }

    fn config_selected_feedback_sensor(&mut self, device: FeedbackDevice) -> Result {
        self.feedback_device = device;
        Ok(())
    }

    fn config_velocity_measurement_period(&mut self, period: VelocityMeasPeriod) -> Result {
        debug!(
            "{}: ignoring {} ms velocity measurement period",
            self.id,
            period.millis()
        );
        Ok(())
    }

    fn config_velocity_measurement_window(&mut self, _samples: u32) -> Result {
        self.unsupported("velocity measurement window")
    }

    fn set_status_frame_period(
        &mut self,
        _frame: StatusFrame,
        _period_ms: u32,
        _timeout_ms: u32,
    ) -> Result {
        self.unsupported("status frame period")
    }

    fn selected_sensor_position(&self) -> Result<f64> {
        Ok(self.raw_position()? - self.zero_offset)
    }

    fn selected_sensor_velocity(&self) -> Result<f64> {
        let rpm = self
            .motor
            .velocity()
            .map_err(|_| self.error("read sensor velocity"))?;
        Ok(f64::from(rpm) * RPM_TO_TICKS_PER_100MS * self.sensor_sign())
    }

    fn set_selected_sensor_position(&mut self, ticks: f64) -> Result {
        self.zero_offset = self.raw_position()? - ticks;
        Ok(())
    }

    fn sync_follower(&mut self) -> Result {
        if self.mode != ControlMode::Follower {
            return Ok(());
        }
        let leader = DeviceId(self.demand as u8);
        let output = self.bus.output(leader).unwrap_or(0.0);
        self.write_output(self.limits.apply(output))
    }
}

/// The master V5 controller. Trigger axes read 1.0 while R2/L2 is held.
pub struct V5Controller {
    controller: Controller,
}

impl V5Controller {
    pub fn new(controller: Controller) -> Self {
        Self { controller }
    }

    fn read_button(&self, button: ControllerButton, input: &'static str) -> Result<bool> {
        self.controller
            .button(button)
            .map_err(|_| ControllerSnafu { input }.build())
    }
}

impl DriverController for V5Controller {
    fn axis(&self, axis: Axis) -> Result<f64> {
        let joystick_axis = match axis {
            Axis::LeftX => JoystickAxis::LeftX,
            Axis::LeftY => JoystickAxis::LeftY,
            Axis::RightX => JoystickAxis::RightX,
            Axis::RightY => JoystickAxis::RightY,
            Axis::LeftTrigger => {
                let held = self.read_button(ControllerButton::L2, "left trigger")?;
                return Ok(if held { 1.0 } else { 0.0 });
            }
            Axis::RightTrigger => {
                let held = self.read_button(ControllerButton::R2, "right trigger")?;
                return Ok(if held { 1.0 } else { 0.0 });
            }
        };
        let value = self
            .controller
            .joystick_axis(joystick_axis)
            .map_err(|_| ControllerSnafu { input: "joystick axis" }.build())?;
        Ok(f64::from(value))
    }

    fn button(&self, button: Button) -> Result<bool> {
        let (button, input) = match button {
            Button::A => (ControllerButton::A, "A"),
            Button::B => (ControllerButton::B, "B"),
            Button::X => (ControllerButton::X, "X"),
            Button::Y => (ControllerButton::Y, "Y"),
            Button::LeftBumper => (ControllerButton::L1, "L1"),
            Button::RightBumper => (ControllerButton::R1, "R1"),
            Button::Back => (ControllerButton::Left, "Left"),
            Button::Start => (ControllerButton::Right, "Right"),
        };
        self.read_button(button, input)
    }
}

pub struct V5DriverStation {
    interval: Interval,
}

impl V5DriverStation {
    pub fn new() -> Self {
        Self {
            interval: Interval::start(),
        }
    }
}

impl Default for V5DriverStation {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverStation for V5DriverStation {
    fn mode(&self) -> CompetitionMode {
        match competition::mode() {
            competition::CompetitionMode::Disabled => CompetitionMode::Disabled,
            competition::CompetitionMode::Autonomous => CompetitionMode::Autonomous,
            competition::CompetitionMode::Opcontrol => CompetitionMode::Opcontrol,
        }
    }

    fn wait_for_next_cycle(&mut self, period: Duration) {
        self.interval.delay(period);
    }
}

/// Prints log records to the brain's console.
pub struct V5Logger;

static LOGGER: V5Logger = V5Logger;

impl V5Logger {
    pub fn init(level: LevelFilter) -> core::result::Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for V5Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}
