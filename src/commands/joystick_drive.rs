use alloc::{rc::Rc, vec, vec::Vec};
use core::{cell::RefCell, fmt::Debug};

use log::warn;

use crate::{
    command::Command,
    config::TeleopConfig,
    hardware::{DriverController, MotorController},
    subsystems::drivetrain::Drivetrain,
    Result, SubsystemRef,
};

/// One cycle's raw driver input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveInputs {
    pub throttle: f64,
    pub rotation: f64,
    /// Precision trigger axis, 0 when released.
    pub precision: f64,
    pub boost: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveSignal {
    pub throttle: f64,
    pub rotation: f64,
}

/// Zero any value strictly inside `(-deadband, deadband)`.
pub fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value > -deadband && value < deadband {
        0.0
    } else {
        value
    }
}

// -1, 1, or the value itself for zero and NaN.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        value
    }
}

/// Turn raw stick input into a drive command.
///
/// Both axes are deadbanded, rotation is then scaled by the rotation gain.
/// Throttle is pinned to the precision magnitude (keeping its sign) while the
/// precision trigger is past its threshold, otherwise scaled by the boost gain
/// while the boost button is held, otherwise by the normal gain.
pub fn shape(inputs: DriveInputs, config: &TeleopConfig) -> DriveSignal {
    let throttle = apply_deadband(inputs.throttle, config.deadband);
    let rotation = apply_deadband(inputs.rotation, config.deadband) * config.rotation_gain;

    let throttle = if inputs.precision > config.precision_threshold {
        sign(throttle) * config.precision_throttle
    } else if inputs.boost {
        throttle * config.boost_gain
    } else {
        throttle * config.normal_gain
    };

    DriveSignal { throttle, rotation }
}

/// Drives the drivetrain from a driver controller every cycle.
pub struct JoystickDrive<M, C> {
    drivetrain: Rc<RefCell<Drivetrain<M>>>,
    controller: C,
    config: TeleopConfig,
    requirements: Vec<SubsystemRef>,
}

impl<M, C> JoystickDrive<M, C>
where
    M: MotorController + Debug + 'static,
    C: DriverController,
{
    pub fn new(
        drivetrain: Rc<RefCell<Drivetrain<M>>>,
        controller: C,
        config: TeleopConfig,
    ) -> Self {
        Self {
            requirements: vec![SubsystemRef(drivetrain.clone())],
            drivetrain,
            controller,
            config,
        }
    }

    fn read_inputs(&self) -> Result<DriveInputs> {
        Ok(DriveInputs {
            throttle: self.controller.axis(self.config.throttle_axis)?,
            rotation: self.controller.axis(self.config.rotation_axis)?,
            precision: self.controller.axis(self.config.precision_axis)?,
            boost: self.controller.button(self.config.boost_button)?,
        })
    }
}

impl<M, C> Command for JoystickDrive<M, C>
where
    M: MotorController + Debug + 'static,
    C: DriverController,
{
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn execute(&mut self) -> Result {
        let inputs = self.read_inputs().unwrap_or_else(|err| {
            warn!("{}; holding the drivetrain still", err);
            DriveInputs::default()
        });
        let signal = shape(inputs, &self.config);
        if let Err(err) = self
            .drivetrain
            .borrow_mut()
            .drive(signal.throttle, signal.rotation)
        {
            warn!("drive failed: {}", err);
        }
        Ok(())
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        if let Err(err) = self.drivetrain.borrow_mut().stop() {
            warn!("stopping the drivetrain failed: {}", err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::MotorBus,
        testing::close,
        config::DrivetrainConfig,
        hardware::{Axis, Button, DeviceId},
        sim::{SimTalon, SimXboxController},
        subsystems::drivetrain::DriveMotors,
        CommandRef, CommandScheduler,
    };

    fn shaped(throttle: f64, rotation: f64, precision: f64, boost: bool) -> DriveSignal {
        shape(
            DriveInputs {
                throttle,
                rotation,
                precision,
                boost,
            },
            &TeleopConfig::default(),
        )
    }

    #[test]
    fn small_throttle_is_zeroed() {
        for throttle in [-0.2499, -0.2, -0.1, -0.0001, 0.0, 0.0001, 0.1, 0.2, 0.2499] {
            for (precision, boost) in [(0.0, false), (0.0, true), (1.0, false)] {
                assert_eq!(shaped(throttle, 0.0, precision, boost).throttle, 0.0);
            }
        }
    }

    #[test]
    fn deadband_edge_passes_through() {
        assert_eq!(apply_deadband(0.25, 0.25), 0.25);
        assert_eq!(apply_deadband(-0.25, 0.25), -0.25);
        assert!(close(shaped(0.25, 0.0, 0.0, false).throttle, 0.2));
    }

    #[test]
    fn rotation_is_doubled_after_deadband() {
        assert_eq!(shaped(0.0, 0.2, 0.0, false).rotation, 0.0);
        assert!(close(shaped(0.0, 0.3, 0.0, false).rotation, 0.6));
        assert!(close(shaped(0.0, -0.5, 0.0, false).rotation, -1.0));
        // Rotation ignores throttle modifiers.
        assert!(close(shaped(0.5, 0.4, 1.0, true).rotation, 0.8));
    }

    #[test]
    fn precision_trigger_pins_throttle_magnitude() {
        for throttle in [0.3, 0.5, 1.0] {
            assert_eq!(shaped(throttle, 0.0, 0.26, false).throttle, 0.75);
            assert_eq!(shaped(-throttle, 0.0, 1.0, true).throttle, -0.75);
        }
    }

    #[test]
    fn precision_threshold_is_exclusive() {
        assert!(close(shaped(0.5, 0.0, 0.25, false).throttle, 0.4));
    }

    #[test]
    fn boost_and_normal_gains() {
        assert!(close(shaped(0.5, 0.0, 0.0, true).throttle, 0.55));
        assert!(close(shaped(-1.0, 0.0, 0.0, true).throttle, -1.1));
        assert!(close(shaped(0.5, 0.0, 0.0, false).throttle, 0.4));
        assert!(close(shaped(-1.0, 0.0, 0.0, false).throttle, -0.8));
    }

    #[test]
    fn nan_input_is_not_guarded() {
        assert!(shaped(f64::NAN, 0.0, 0.0, false).throttle.is_nan());
        assert!(shaped(f64::NAN, 0.0, 1.0, false).throttle.is_nan());
        assert!(shaped(0.0, f64::NAN, 0.0, false).rotation.is_nan());
    }

    struct Rig {
        drivetrain: Rc<RefCell<Drivetrain<SimTalon>>>,
        controller: SimXboxController,
        left_back: SimTalon,
        right_back: SimTalon,
    }

    fn rig() -> Rig {
        let bus = MotorBus::new();
        let left_back = SimTalon::new(DeviceId(1), &bus);
        let right_back = SimTalon::new(DeviceId(3), &bus);
        let motors = DriveMotors {
            left_back: left_back.clone(),
            left_front: SimTalon::new(DeviceId(2), &bus),
            right_back: right_back.clone(),
            right_front: SimTalon::new(DeviceId(4), &bus),
        };
        let drivetrain = Drivetrain::new(motors, &DrivetrainConfig::default()).unwrap();
        Rig {
            drivetrain: Rc::new(RefCell::new(drivetrain)),
            controller: SimXboxController::new(),
            left_back,
            right_back,
        }
    }

    #[test]
    fn execute_drives_with_shaped_input() {
        let rig = rig();
        let mut command = JoystickDrive::new(
            rig.drivetrain.clone(),
            rig.controller.clone(),
            TeleopConfig::default(),
        );
        rig.controller.set_axis(Axis::LeftY, 0.5);
        rig.controller.set_axis(Axis::RightX, 0.3);
        rig.controller.set_button(Button::A, true);

        command.execute().unwrap();

        // throttle 0.55, rotation 0.6
        assert!(close(rig.left_back.state().applied_output, 1.0));
        assert!(close(rig.right_back.state().applied_output, -0.05));
    }

    #[test]
    fn lost_controller_holds_still() {
        let rig = rig();
        let mut command = JoystickDrive::new(
            rig.drivetrain.clone(),
            rig.controller.clone(),
            TeleopConfig::default(),
        );
        rig.controller.set_axis(Axis::LeftY, 0.8);
        command.execute().unwrap();
        assert!(rig.left_back.state().applied_output > 0.0);

        rig.controller.set_connected(false);
        command.execute().unwrap();
        assert_eq!(rig.left_back.state().applied_output, 0.0);
        assert_eq!(rig.right_back.state().applied_output, 0.0);
    }

    #[test]
    fn motor_fault_does_not_fail_execute() {
        let rig = rig();
        let mut command = JoystickDrive::new(
            rig.drivetrain.clone(),
            rig.controller.clone(),
            TeleopConfig::default(),
        );
        rig.controller.set_axis(Axis::LeftY, 1.0);
        command.execute().unwrap();

        rig.left_back.set_faulted(true);
        rig.controller.set_axis(Axis::LeftY, 0.0);
        command.execute().unwrap();
        assert_eq!(rig.right_back.state().applied_output, 0.0);
        command.end(true).unwrap();
    }

    #[test]
    fn interruption_stops_drivetrain() {
        let rig = rig();
        let mut scheduler = CommandScheduler::new();
        let drivetrain = {
            let Rig { drivetrain, .. } = rig;
            Rc::try_unwrap(drivetrain).unwrap().into_inner()
        };
        let drivetrain = scheduler.register(drivetrain);
        let controller = SimXboxController::new();
        let command = CommandRef::new(JoystickDrive::new(
            drivetrain.clone(),
            controller.clone(),
            TeleopConfig::default(),
        ));

        controller.set_axis(Axis::LeftY, 0.9);
        scheduler.schedule(command.clone()).unwrap();
        scheduler.run(false).unwrap();
        assert!(close(rig.left_back.state().applied_output, 0.72));

        scheduler.cancel(&command).unwrap();
        assert_eq!(rig.left_back.state().applied_output, 0.0);
    }
}
