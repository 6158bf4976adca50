use core::fmt;

use crate::Result;

/// Bus id of a motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u8);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Value is a fraction of supply voltage in [-1, 1].
    #[default]
    PercentOutput,
    /// Value is the device id of the leader to mirror.
    Follower,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeutralMode {
    #[default]
    Coast,
    Brake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackDevice {
    #[default]
    IntegratedSensor,
    QuadEncoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFrame {
    /// Selected sensor position and velocity.
    Feedback0,
    /// Auxiliary sensor data.
    Feedback1,
}

/// Window over which the controller differentiates position into velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VelocityMeasPeriod {
    Period1Ms,
    Period2Ms,
    Period5Ms,
    #[default]
    Period10Ms,
    Period20Ms,
    Period25Ms,
    Period50Ms,
    Period100Ms,
}

impl VelocityMeasPeriod {
    pub const fn millis(self) -> u32 {
        match self {
            Self::Period1Ms => 1,
            Self::Period2Ms => 2,
            Self::Period5Ms => 5,
            Self::Period10Ms => 10,
            Self::Period20Ms => 20,
            Self::Period25Ms => 25,
            Self::Period50Ms => 50,
            Self::Period100Ms => 100,
        }
    }
}

/// Nominal and peak output limits of a motor controller.
///
/// Nonzero demands are raised to at least the nominal output and capped at
/// the peak output in their direction. Reverse limits are zero or negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLimits {
    pub nominal_forward: f64,
    pub nominal_reverse: f64,
    pub peak_forward: f64,
    pub peak_reverse: f64,
}

impl OutputLimits {
    pub fn apply(&self, demand: f64) -> f64 {
        if demand > 0.0 {
            demand.max(self.nominal_forward).min(self.peak_forward)
        } else if demand < 0.0 {
            demand.min(self.nominal_reverse).max(self.peak_reverse)
        } else {
            demand
        }
    }
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            nominal_forward: 0.0,
            nominal_reverse: 0.0,
            peak_forward: 1.0,
            peak_reverse: -1.0,
        }
    }
}

/// A smart motor controller with an integrated encoder.
///
/// Sensor positions are in raw encoder ticks and velocities in ticks per
/// 100 ms, matching what the controller reports over the bus.
pub trait MotorController {
    fn device_id(&self) -> DeviceId;

    /// Command the controller. For [`ControlMode::Follower`] the value is the
    /// leader's device id.
    fn set(&mut self, mode: ControlMode, value: f64) -> Result;

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result;
    fn set_inverted(&mut self, inverted: bool) -> Result;
    fn set_sensor_phase(&mut self, phase: bool) -> Result;

    fn config_nominal_output_forward(&mut self, value: f64, timeout_ms: u32) -> Result;
    fn config_nominal_output_reverse(&mut self, value: f64, timeout_ms: u32) -> Result;
    fn config_peak_output_forward(&mut self, value: f64, timeout_ms: u32) -> Result;
    fn config_peak_output_reverse(&mut self, value: f64, timeout_ms: u32) -> Result;

    fn config_selected_feedback_sensor(&mut self, device: FeedbackDevice) -> Result;
    fn config_velocity_measurement_period(&mut self, period: VelocityMeasPeriod) -> Result;
    fn config_velocity_measurement_window(&mut self, samples: u32) -> Result;
    fn set_status_frame_period(
        &mut self,
        frame: StatusFrame,
        period_ms: u32,
        timeout_ms: u32,
    ) -> Result;

    fn selected_sensor_position(&self) -> Result<f64>;
    fn selected_sensor_velocity(&self) -> Result<f64>;
    fn set_selected_sensor_position(&mut self, ticks: f64) -> Result;

    /// Re-apply the leader's current output while in follower mode. Must be
    /// called after the leader is commanded on controllers that emulate
    /// follower mode in software; a no-op otherwise.
    fn sync_follower(&mut self) -> Result {
        Ok(())
    }

    /// Called once per control cycle.
    fn periodic(&mut self) -> Result {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
}

/// A handheld driver controller.
///
/// Stick axes are in [-1, 1], trigger axes in [0, 1].
pub trait DriverController {
    fn axis(&self, axis: Axis) -> Result<f64>;
    fn button(&self, button: Button) -> Result<bool>;
}
