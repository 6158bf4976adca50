use alloc::rc::Rc;
use core::{cell::RefCell, fmt::Debug};

use log::{info, warn};

use crate::{
    commands::joystick_drive::JoystickDrive,
    config::RobotConfig,
    hardware::{DriverController, MotorController},
    robot::ScheduledRobot,
    subsystems::drivetrain::{DriveMotors, Drivetrain},
    CommandScheduler, Result,
};

/// The teleop robot: one drivetrain driven by one controller through the
/// joystick default command.
pub struct DriveRobot<M> {
    scheduler: CommandScheduler,
    drivetrain: Rc<RefCell<Drivetrain<M>>>,
    disabled: bool,
}

impl<M> DriveRobot<M>
where
    M: MotorController + Debug + 'static,
{
    pub fn new(
        motors: DriveMotors<M>,
        controller: impl DriverController + 'static,
        config: &RobotConfig,
    ) -> Result<Self> {
        let mut scheduler = CommandScheduler::new();
        let drivetrain = scheduler.register(Drivetrain::new(motors, &config.drivetrain)?);
        scheduler.set_default_command(
            &drivetrain,
            JoystickDrive::new(drivetrain.clone(), controller, config.teleop),
        )?;

        Ok(Self {
            scheduler,
            drivetrain,
            disabled: true,
        })
    }

    pub fn drivetrain(&self) -> &Rc<RefCell<Drivetrain<M>>> {
        &self.drivetrain
    }

    pub fn scheduler(&self) -> &CommandScheduler {
        &self.scheduler
    }
}

impl<M> ScheduledRobot for DriveRobot<M>
where
    M: MotorController + Debug + 'static,
{
    fn periodic(&mut self) -> Result {
        self.scheduler.run(self.disabled)
    }

    fn disabled_init(&mut self) -> Result {
        self.disabled = true;
        self.scheduler.cancel_all()?;
        if let Err(err) = self.drivetrain.borrow_mut().stop() {
            warn!("stopping the drivetrain failed: {}", err);
        }
        Ok(())
    }

    fn autonomous_init(&mut self) -> Result {
        info!("no autonomous routine; drivetrain stays under driver control");
        self.disabled = false;
        Ok(())
    }

    fn opcontrol_init(&mut self) -> Result {
        self.disabled = false;
        Ok(())
    }
}
