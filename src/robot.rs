use core::time::Duration;

use log::info;

use crate::Result;

/// Returns true if the code is running on a real robot and not in simulation.
pub const fn is_real() -> bool {
    cfg!(target_os = "vexos")
}

/// Returns true if the code is running in simulation and not on a real robot.
pub const fn is_sim() -> bool {
    !is_real()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionMode {
    Disabled,
    Autonomous,
    Opcontrol,
}

/// Source of the competition mode and of the control loop's timing.
pub trait DriverStation {
    fn mode(&self) -> CompetitionMode;
    /// Block until the next cycle should start.
    fn wait_for_next_cycle(&mut self, period: Duration);
}

pub trait ScheduledRobot {
    fn periodic(&mut self) -> Result {
        Ok(())
    }
    fn sim_periodic(&mut self) -> Result {
        Ok(())
    }
    fn disabled_init(&mut self) -> Result {
        Ok(())
    }
    fn disabled_periodic(&mut self) -> Result {
        Ok(())
    }
    fn autonomous_init(&mut self) -> Result {
        Ok(())
    }
    fn autonomous_periodic(&mut self) -> Result {
        Ok(())
    }
    fn opcontrol_init(&mut self) -> Result {
        Ok(())
    }
    fn opcontrol_periodic(&mut self) -> Result {
        Ok(())
    }
}

pub const ITERATION_PERIOD: Duration = Duration::from_millis(20);

/// Drives a [`ScheduledRobot`] one cycle at a time, calling the `*_init` hook
/// whenever the competition mode changes.
pub struct RobotRunner<R> {
    robot: R,
    previous_mode: Option<CompetitionMode>,
}

impl<R: ScheduledRobot> RobotRunner<R> {
    pub fn new(robot: R) -> Self {
        Self {
            robot,
            previous_mode: None,
        }
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn step(&mut self, current_mode: CompetitionMode) -> Result {
        let entered = self.previous_mode != Some(current_mode);
        if entered {
            info!("entering {:?}", current_mode);
        }

        match current_mode {
            CompetitionMode::Disabled => {
                if entered {
                    self.robot.disabled_init()?;
                }
                self.robot.disabled_periodic()?;
            }
            CompetitionMode::Autonomous => {
                if entered {
                    self.robot.autonomous_init()?;
                }
                self.robot.autonomous_periodic()?;
            }
            CompetitionMode::Opcontrol => {
                if entered {
                    self.robot.opcontrol_init()?;
                }
                self.robot.opcontrol_periodic()?;
            }
        }
        self.previous_mode = Some(current_mode);

        self.robot.periodic()?;
        if is_sim() {
            self.robot.sim_periodic()?;
        }

        Ok(())
    }
}

/// Run the robot forever, one cycle every [`ITERATION_PERIOD`].
pub fn start_robot(robot: impl ScheduledRobot, mut station: impl DriverStation) -> Result {
    let mut runner = RobotRunner::new(robot);

    loop {
        runner.step(station.mode())?;
        station.wait_for_next_cycle(ITERATION_PERIOD);
    }
}
