use log::{error, LevelFilter};
use pros::prelude::*;
use teleop_drive::{
    bus::MotorBus,
    config::RobotConfig,
    container::DriveRobot,
    robot::start_robot,
    subsystems::drivetrain::DriveMotors,
    vex::{V5Controller, V5DriverStation, V5Logger, V5Talon},
};

fn build(config: &RobotConfig) -> teleop_drive::Result<DriveRobot<V5Talon>> {
    let bus = MotorBus::new();
    let ids = &config.drivetrain.ids;
    let motors = DriveMotors {
        left_back: V5Talon::new(ids.left_back.0, &bus)?,
        left_front: V5Talon::new(ids.left_front.0, &bus)?,
        right_back: V5Talon::new(ids.right_back.0, &bus)?,
        right_front: V5Talon::new(ids.right_front.0, &bus)?,
    };
    DriveRobot::new(motors, V5Controller::new(Controller::Master), config)
}

#[derive(Default)]
struct RobotBase;

impl SyncRobot for RobotBase {
    fn opcontrol(&mut self) -> pros::Result {
        // Only fails if a logger is already installed.
        _ = V5Logger::init(LevelFilter::Info);

        let result = build(&RobotConfig::default())
            .and_then(|robot| start_robot(robot, V5DriverStation::new()));
        if let Err(err) = result {
            error!("robot stopped: {}", err);
        }
        Ok(())
    }
}

sync_robot!(RobotBase);
