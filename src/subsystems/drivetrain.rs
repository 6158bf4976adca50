//! Four-motor tank drivetrain.
//!
//! The back motor on each side is the leader and takes percent-output
//! commands. The front motor is linked to it as a follower and mirrors the
//! leader's output as soon as the leader is commanded.

use core::fmt::Debug;

use log::{info, trace, warn};

use crate::{
    config::{DrivetrainConfig, EncoderConfig, MotorConfig},
    hardware::{ControlMode, MotorController, StatusFrame},
    subsystem::Subsystem,
    Result,
};

/// Cycles between telemetry log lines.
const TELEMETRY_PERIOD: u32 = 50;

/// The four drive motor controllers, by position.
#[derive(Debug)]
pub struct DriveMotors<M> {
    pub left_back: M,
    pub left_front: M,
    pub right_back: M,
    pub right_front: M,
}

#[derive(Debug)]
pub struct Drivetrain<M> {
    left_back: M,
    left_front: M,
    right_back: M,
    right_front: M,
    encoder: EncoderConfig,
    followers_linked: bool,
    tick_number: u32,
}

impl<M: MotorController> Drivetrain<M> {
    /// Zero the encoders, link the front motors to the back ones and apply
    /// the one-time configuration to every motor.
    pub fn new(motors: DriveMotors<M>, config: &DrivetrainConfig) -> Result<Self> {
        let mut drivetrain = Self {
            left_back: motors.left_back,
            left_front: motors.left_front,
            right_back: motors.right_back,
            right_front: motors.right_front,
            encoder: config.encoder,
            followers_linked: false,
            tick_number: 0,
        };

        drivetrain.reset_encoders()?;
        drivetrain.link_followers()?;

        configure_motor(&mut drivetrain.left_front, &config.left, config.timeout_ms)?;
        configure_motor(&mut drivetrain.left_back, &config.left, config.timeout_ms)?;
        configure_motor(&mut drivetrain.right_front, &config.right, config.timeout_ms)?;
        configure_motor(&mut drivetrain.right_back, &config.right, config.timeout_ms)?;

        info!(
            "drivetrain configured: leaders {} and {}, followers {} and {}",
            drivetrain.left_back.device_id(),
            drivetrain.right_back.device_id(),
            drivetrain.left_front.device_id(),
            drivetrain.right_front.device_id(),
        );
        Ok(drivetrain)
    }

    /// Arcade mix: the left side gets `throttle + rotation`, the right side
    /// `throttle - rotation`. Motors clamp to their peak output.
    ///
    /// Every motor is commanded even if one fails; the first failure is
    /// returned.
    pub fn drive(&mut self, throttle: f64, rotation: f64) -> Result {
        let left = throttle + rotation;
        let right = throttle - rotation;

        let left_back = self.left_back.set(ControlMode::PercentOutput, left);
        let right_back = self.right_back.set(ControlMode::PercentOutput, right);
        let (left_front, right_front) = if self.followers_linked {
            (
                self.left_front.sync_follower(),
                self.right_front.sync_follower(),
            )
        } else {
            (
                self.left_front.set(ControlMode::PercentOutput, left),
                self.right_front.set(ControlMode::PercentOutput, right),
            )
        };

        [left_back, right_back, left_front, right_front]
            .into_iter()
            .find_map(Result::err)
            .map_or(Ok(()), Err)
    }

    pub fn stop(&mut self) -> Result {
        self.drive(0.0, 0.0)
    }

    /// Put every motor in percent-output mode at zero. This releases the
    /// follower linkage until [`Drivetrain::link_followers`] is called.
    pub fn set_mode_percent_output(&mut self) -> Result {
        for motor in self.motors_mut() {
            motor.set(ControlMode::PercentOutput, 0.0)?;
        }
        self.followers_linked = false;
        Ok(())
    }

    pub fn link_followers(&mut self) -> Result {
        let left_leader = self.left_back.device_id();
        let right_leader = self.right_back.device_id();
        self.left_front
            .set(ControlMode::Follower, f64::from(left_leader.0))?;
        self.right_front
            .set(ControlMode::Follower, f64::from(right_leader.0))?;
        self.followers_linked = true;
        Ok(())
    }

    pub fn followers_linked(&self) -> bool {
        self.followers_linked
    }

    pub fn reset_encoders(&mut self) -> Result {
        self.right_back.set_selected_sensor_position(0.0)?;
        self.right_front.set_selected_sensor_position(0.0)?;
        self.left_back.set_selected_sensor_position(0.0)?;
        self.left_front.set_selected_sensor_position(0.0)?;
        Ok(())
    }

    pub fn right_back_encoder_position(&self) -> Result<f64> {
        self.right_back.selected_sensor_position()
    }

    pub fn left_back_encoder_position(&self) -> Result<f64> {
        self.left_back.selected_sensor_position()
    }

    /// Mean of the two back encoders, in ticks.
    pub fn distance_travelled_in_ticks(&self) -> Result<f64> {
        Ok((self.left_back_encoder_position()? + self.right_back_encoder_position()?) / 2.0)
    }

    pub fn left_distance_travelled_in_meters(&self) -> Result<f64> {
        Ok(self.left_back_encoder_position()? * self.encoder.meters_per_tick())
    }

    pub fn right_distance_travelled_in_meters(&self) -> Result<f64> {
        Ok(self.right_back_encoder_position()? * self.encoder.meters_per_tick())
    }

    pub fn left_velocity_meters_per_second(&self) -> Result<f64> {
        self.velocity_meters_per_second(&self.left_back)
    }

    pub fn right_velocity_meters_per_second(&self) -> Result<f64> {
        self.velocity_meters_per_second(&self.right_back)
    }

    // Sensor velocity is per 100 ms.
    fn velocity_meters_per_second(&self, motor: &M) -> Result<f64> {
        Ok(motor.selected_sensor_velocity()? * 10.0 * self.encoder.meters_per_tick())
    }

    /// Leaders first.
    fn motors_mut(&mut self) -> [&mut M; 4] {
        [
            &mut self.left_back,
            &mut self.right_back,
            &mut self.left_front,
            &mut self.right_front,
        ]
    }

    fn log_telemetry(&self) -> Result {
        trace!(
            "drivetrain: left {:.3} m @ {:.3} m/s, right {:.3} m @ {:.3} m/s",
            self.left_distance_travelled_in_meters()?,
            self.left_velocity_meters_per_second()?,
            self.right_distance_travelled_in_meters()?,
            self.right_velocity_meters_per_second()?,
        );
        Ok(())
    }
}

fn configure_motor<M: MotorController>(
    motor: &mut M,
    config: &MotorConfig,
    timeout_ms: u32,
) -> Result {
    motor.set_status_frame_period(
        StatusFrame::Feedback0,
        config.feedback0_period_ms,
        timeout_ms,
    )?;
    motor.config_selected_feedback_sensor(config.feedback_device)?;
    motor.config_velocity_measurement_period(config.velocity_measurement_period)?;
    motor.config_velocity_measurement_window(config.velocity_measurement_window)?;
    motor.set_status_frame_period(
        StatusFrame::Feedback1,
        config.feedback1_period_ms,
        timeout_ms,
    )?;

    motor.set_neutral_mode(config.neutral_mode)?;

    let limits = &config.limits;
    motor.config_nominal_output_forward(limits.nominal_forward, timeout_ms)?;
    motor.config_nominal_output_reverse(limits.nominal_reverse, timeout_ms)?;
    motor.config_peak_output_forward(limits.peak_forward, timeout_ms)?;
    motor.config_peak_output_reverse(limits.peak_reverse, timeout_ms)?;

    motor.set_sensor_phase(config.sensor_phase)?;
    motor.set_inverted(config.inverted)?;
    Ok(())
}

impl<M: MotorController + Debug> Subsystem for Drivetrain<M> {
    fn periodic(&mut self) {
        for motor in self.motors_mut() {
            if let Err(err) = motor.periodic() {
                warn!("drive motor {} update failed: {}", motor.device_id(), err);
            }
        }

        self.tick_number = self.tick_number.wrapping_add(1);
        if self.tick_number % TELEMETRY_PERIOD == 0 {
            if let Err(err) = self.log_telemetry() {
                warn!("drivetrain telemetry unavailable: {}", err);
            }
        }
    }
}
