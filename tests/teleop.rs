use teleop_drive::{
    bus::MotorBus,
    config::{DriveMotorIds, RobotConfig},
    container::DriveRobot,
    hardware::{Axis, Button, ControlMode},
    robot::{CompetitionMode, RobotRunner},
    sim::{SimTalon, SimXboxController},
    subsystems::drivetrain::DriveMotors,
};

struct Field {
    runner: RobotRunner<DriveRobot<SimTalon>>,
    controller: SimXboxController,
    left_back: SimTalon,
    left_front: SimTalon,
    right_back: SimTalon,
    right_front: SimTalon,
}

fn field() -> Field {
    let bus = MotorBus::new();
    let ids = DriveMotorIds::default();
    let motors = DriveMotors {
        left_back: SimTalon::new(ids.left_back, &bus),
        left_front: SimTalon::new(ids.left_front, &bus),
        right_back: SimTalon::new(ids.right_back, &bus),
        right_front: SimTalon::new(ids.right_front, &bus),
    };
    let controller = SimXboxController::new();
    Field {
        controller: controller.clone(),
        left_back: motors.left_back.clone(),
        left_front: motors.left_front.clone(),
        right_back: motors.right_back.clone(),
        right_front: motors.right_front.clone(),
        runner: RobotRunner::new(
            DriveRobot::new(motors, controller, &RobotConfig::default()).unwrap(),
        ),
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn default_command_scheduled(field: &Field) -> bool {
    let robot = field.runner.robot();
    let command = robot
        .scheduler()
        .default_command(robot.drivetrain())
        .expect("joystick drive is installed as the default command");
    robot.scheduler().is_scheduled(&command)
}

#[test]
fn disabled_robot_ignores_the_sticks() {
    let mut field = field();
    field.controller.set_axis(Axis::LeftY, 1.0);

    for _ in 0..3 {
        field.runner.step(CompetitionMode::Disabled).unwrap();
    }

    assert!(!default_command_scheduled(&field));
    assert_eq!(field.left_back.state().applied_output, 0.0);
    assert_eq!(field.right_back.state().applied_output, 0.0);
}

#[test]
fn driver_control_moves_all_four_motors() {
    let mut field = field();
    field.runner.step(CompetitionMode::Disabled).unwrap();

    field.controller.set_axis(Axis::LeftY, 0.5);
    field.controller.set_axis(Axis::RightX, -0.3);
    // Default command is scheduled at the end of the first enabled cycle and
    // executes from the second.
    field.runner.step(CompetitionMode::Opcontrol).unwrap();
    assert!(default_command_scheduled(&field));
    field.runner.step(CompetitionMode::Opcontrol).unwrap();

    // throttle 0.5 * 0.8 = 0.4, rotation -0.3 * 2 = -0.6
    assert!(close(field.left_back.state().applied_output, -0.2));
    assert!(close(field.right_back.state().applied_output, 1.0));
    assert!(close(field.left_front.state().applied_output, -0.2));
    assert!(close(field.right_front.state().applied_output, 1.0));
    assert_eq!(field.left_front.state().mode, ControlMode::Follower);
    assert_eq!(field.right_front.state().mode, ControlMode::Follower);
}

#[test]
fn precision_and_boost_modes() {
    let mut field = field();
    field.controller.set_axis(Axis::LeftY, 0.6);
    field.runner.step(CompetitionMode::Opcontrol).unwrap();

    field.controller.set_axis(Axis::RightTrigger, 0.9);
    field.controller.set_button(Button::A, true);
    field.runner.step(CompetitionMode::Opcontrol).unwrap();
    assert!(close(field.left_back.state().applied_output, 0.75));

    field.controller.set_axis(Axis::RightTrigger, 0.0);
    field.runner.step(CompetitionMode::Opcontrol).unwrap();
    assert!(close(field.left_back.state().applied_output, 0.66));
}

#[test]
fn disabling_stops_the_drivetrain() {
    let mut field = field();
    field.controller.set_axis(Axis::LeftY, 1.0);
    for _ in 0..3 {
        field.runner.step(CompetitionMode::Opcontrol).unwrap();
    }
    assert!(field.right_back.state().applied_output > 0.0);

    field.runner.step(CompetitionMode::Disabled).unwrap();
    assert!(!default_command_scheduled(&field));
    assert_eq!(field.left_back.state().applied_output, 0.0);
    assert_eq!(field.right_back.state().applied_output, 0.0);
    assert_eq!(field.left_front.state().applied_output, 0.0);
    assert_eq!(field.right_front.state().applied_output, 0.0);
}

#[test]
fn followers_stop_in_the_same_cycle_as_leaders() {
    let mut field = field();
    field.controller.set_axis(Axis::LeftY, 1.0);
    for _ in 0..3 {
        field.runner.step(CompetitionMode::Opcontrol).unwrap();
    }
    assert!(close(field.left_front.state().applied_output, 0.8));

    field.controller.set_axis(Axis::LeftY, 0.0);
    field.runner.step(CompetitionMode::Opcontrol).unwrap();
    for (leader, follower) in [
        (&field.left_back, &field.left_front),
        (&field.right_back, &field.right_front),
    ] {
        assert_eq!(leader.state().applied_output, 0.0);
        assert_eq!(follower.state().applied_output, 0.0);
    }
}

#[test]
fn motor_fault_keeps_the_robot_running() {
    let mut field = field();
    field.controller.set_axis(Axis::LeftY, 1.0);
    for _ in 0..3 {
        field.runner.step(CompetitionMode::Opcontrol).unwrap();
    }

    field.left_back.set_faulted(true);
    field.controller.set_axis(Axis::LeftY, 0.0);
    field.runner.step(CompetitionMode::Opcontrol).unwrap();
    assert!(default_command_scheduled(&field));
    assert_eq!(field.right_back.state().applied_output, 0.0);
    assert_eq!(field.right_front.state().applied_output, 0.0);

    field.left_back.set_faulted(false);
    field.controller.set_axis(Axis::LeftY, 0.5);
    field.runner.step(CompetitionMode::Opcontrol).unwrap();
    assert!(close(field.left_back.state().applied_output, 0.4));
    assert!(close(field.left_front.state().applied_output, 0.4));

    field.left_back.set_faulted(true);
    field.runner.step(CompetitionMode::Disabled).unwrap();
    assert_eq!(field.right_back.state().applied_output, 0.0);
}

#[test]
fn encoders_track_distance_driven() {
    let mut field = field();
    field.controller.set_axis(Axis::LeftY, 1.0);
    for _ in 0..50 {
        field.runner.step(CompetitionMode::Opcontrol).unwrap();
    }

    let drivetrain = field.runner.robot().drivetrain().borrow();
    let left = drivetrain.left_distance_travelled_in_meters().unwrap();
    let right = drivetrain.right_distance_travelled_in_meters().unwrap();
    assert!(left > 0.5, "left side travelled {left} m");
    assert!(close(left, right));
    assert!(drivetrain.left_velocity_meters_per_second().unwrap() > 0.0);
    assert!(drivetrain.distance_travelled_in_ticks().unwrap() > 0.0);
}
