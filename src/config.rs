use core::f64::consts::PI;

use crate::hardware::{
    Axis, Button, DeviceId, FeedbackDevice, NeutralMode, OutputLimits, VelocityMeasPeriod,
};

const IN_TO_M: f64 = 0.0254;

/// How controller input is shaped into throttle and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleopConfig {
    pub throttle_axis: Axis,
    pub rotation_axis: Axis,
    /// Holding this trigger past `precision_threshold` pins throttle to a
    /// fixed magnitude.
    pub precision_axis: Axis,
    pub boost_button: Button,
    /// Stick magnitudes strictly below this are treated as zero.
    pub deadband: f64,
    pub rotation_gain: f64,
    pub precision_threshold: f64,
    pub precision_throttle: f64,
    pub boost_gain: f64,
    pub normal_gain: f64,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            throttle_axis: Axis::LeftY,
            rotation_axis: Axis::RightX,
            precision_axis: Axis::RightTrigger,
            boost_button: Button::A,
            deadband: 0.25,
            rotation_gain: 2.0,
            precision_threshold: 0.25,
            precision_throttle: 0.75,
            boost_gain: 1.1,
            normal_gain: 0.8,
        }
    }
}

/// Per-motor settings applied once when the drivetrain is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    pub neutral_mode: NeutralMode,
    pub inverted: bool,
    pub sensor_phase: bool,
    pub limits: OutputLimits,
    pub feedback_device: FeedbackDevice,
    pub velocity_measurement_period: VelocityMeasPeriod,
    pub velocity_measurement_window: u32,
    pub feedback0_period_ms: u32,
    pub feedback1_period_ms: u32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            neutral_mode: NeutralMode::Coast,
            inverted: false,
            sensor_phase: false,
            limits: OutputLimits::default(),
            feedback_device: FeedbackDevice::IntegratedSensor,
            velocity_measurement_period: VelocityMeasPeriod::Period10Ms,
            velocity_measurement_window: 16,
            feedback0_period_ms: 1,
            feedback1_period_ms: 5,
        }
    }
}

/// Drive wheel and gearbox geometry for converting encoder ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    pub counts_per_rev: f64,
    pub gear_ratio: f64,
    pub wheel_diameter_inches: f64,
}

impl EncoderConfig {
    pub fn wheel_circumference_meters(&self) -> f64 {
        self.wheel_diameter_inches * IN_TO_M * PI
    }

    pub fn ticks_per_meter(&self) -> f64 {
        self.counts_per_rev * self.gear_ratio / self.wheel_circumference_meters()
    }

    pub fn meters_per_tick(&self) -> f64 {
        1.0 / self.ticks_per_meter()
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            counts_per_rev: 2048.0,
            gear_ratio: 12.75,
            wheel_diameter_inches: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveMotorIds {
    pub left_back: DeviceId,
    pub left_front: DeviceId,
    pub right_back: DeviceId,
    pub right_front: DeviceId,
}

impl Default for DriveMotorIds {
    fn default() -> Self {
        Self {
            left_back: DeviceId(1),
            left_front: DeviceId(2),
            right_back: DeviceId(3),
            right_front: DeviceId(4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivetrainConfig {
    pub ids: DriveMotorIds,
    pub left: MotorConfig,
    pub right: MotorConfig,
    /// Timeout passed to every configuration call.
    pub timeout_ms: u32,
    pub encoder: EncoderConfig,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            ids: DriveMotorIds::default(),
            left: MotorConfig {
                inverted: true,
                sensor_phase: true,
                ..MotorConfig::default()
            },
            right: MotorConfig {
                inverted: false,
                sensor_phase: false,
                ..MotorConfig::default()
            },
            timeout_ms: 10,
            encoder: EncoderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotConfig {
    pub teleop: TeleopConfig,
    pub drivetrain: DrivetrainConfig,
}
