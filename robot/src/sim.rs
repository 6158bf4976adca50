//! Desktop simulation: a short scripted match on simulated hardware.

use std::thread;

use log::{error, info, LevelFilter};
use teleop_drive::{
    bus::MotorBus,
    config::RobotConfig,
    container::DriveRobot,
    hardware::{Axis, Button},
    robot::{CompetitionMode, DriverStation, RobotRunner, ITERATION_PERIOD},
    sim::{SimDriverStation, SimTalon, SimXboxController},
    subsystems::drivetrain::DriveMotors,
};

/// Cycles per second at the 20 ms loop period.
const CYCLES_PER_SECOND: u64 = 50;

fn init_logging() -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()
}

/// Stick input for the given second of driver control.
fn script(controller: &SimXboxController, second: u64) {
    controller.reset();
    match second {
        0 => controller.set_axis(Axis::LeftY, 0.6),
        1 => {
            controller.set_axis(Axis::LeftY, 0.6);
            controller.set_button(Button::A, true);
        }
        2 => {
            controller.set_axis(Axis::LeftY, 0.9);
            controller.set_axis(Axis::RightTrigger, 1.0);
        }
        3 => controller.set_axis(Axis::RightX, 0.4),
        _ => {}
    }
}

fn mode_at(second: u64) -> CompetitionMode {
    match second {
        0 => CompetitionMode::Disabled,
        1..=5 => CompetitionMode::Opcontrol,
        _ => CompetitionMode::Disabled,
    }
}

pub fn run() {
    if let Err(err) = init_logging() {
        eprintln!("logging unavailable: {err}");
    }

    let config = RobotConfig::default();
    let bus = MotorBus::new();
    let ids = &config.drivetrain.ids;
    let motors = DriveMotors {
        left_back: SimTalon::new(ids.left_back, &bus),
        left_front: SimTalon::new(ids.left_front, &bus),
        right_back: SimTalon::new(ids.right_back, &bus),
        right_front: SimTalon::new(ids.right_front, &bus),
    };
    let controller = SimXboxController::new();

    let robot = match DriveRobot::new(motors, controller.clone(), &config) {
        Ok(robot) => robot,
        Err(err) => {
            error!("could not build the robot: {err}");
            return;
        }
    };
    let mut runner = RobotRunner::new(robot);
    let mut station = SimDriverStation::new(CompetitionMode::Disabled);

    while station.cycles() < 7 * CYCLES_PER_SECOND {
        let second = station.cycles() / CYCLES_PER_SECOND;
        station.set_mode(mode_at(second));
        script(&controller, second.saturating_sub(1));

        if let Err(err) = runner.step(station.mode()) {
            error!("robot stopped: {err}");
            return;
        }

        if station.cycles() % CYCLES_PER_SECOND == 0 {
            let drivetrain = runner.robot().drivetrain().borrow();
            match (
                drivetrain.left_distance_travelled_in_meters(),
                drivetrain.right_distance_travelled_in_meters(),
            ) {
                (Ok(left), Ok(right)) => {
                    info!("t={second}s {:?}: left {left:.2} m, right {right:.2} m", station.mode())
                }
                (Err(err), _) | (_, Err(err)) => error!("encoders unavailable: {err}"),
            }
        }

        station.wait_for_next_cycle(ITERATION_PERIOD);
        thread::sleep(ITERATION_PERIOD);
    }
}
