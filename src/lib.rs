#![no_std]

extern crate alloc;

use alloc::{rc::Rc, vec::Vec};
use core::{cell::RefCell, hash::Hash, ops::Deref};

use command::{Command, InterruptionBehavior};
use hardware::DeviceId;
use hashbrown::{HashMap, HashSet};
use log::{debug, trace};
use snafu::{ensure, ResultExt, Snafu};
use subsystem::Subsystem;

pub mod bus;
pub mod command;
pub mod commands;
pub mod config;
pub mod container;
pub mod hardware;
pub mod robot;
pub mod sim;
pub mod subsystem;
pub mod subsystems;
#[cfg(test)]
mod testing;
#[cfg(target_os = "vexos")]
pub mod vex;

pub type Result<T = (), E = Error> = core::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Motor controller {device} failed to {operation}."))]
    Motor {
        device: DeviceId,
        operation: &'static str,
    },
    #[snafu(display("Could not read {input} from the driver controller."))]
    Controller { input: &'static str },
    #[snafu(display("Could not set the default command."))]
    DefaultCommand { source: SetDefaultCommandError },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SetDefaultCommandError {
    #[snafu(display("Default commands must require their subsystem."))]
    MustRequireSubsystem,
    #[snafu(display("Cannot set the default command on a subsystem that is not registered."))]
    NotRegistered,
}

#[derive(Clone)]
pub struct SubsystemRef(pub Rc<RefCell<dyn Subsystem>>);

impl PartialEq for SubsystemRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SubsystemRef {}

impl Hash for SubsystemRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const ()).hash(state);
    }
}

impl From<Rc<RefCell<dyn Subsystem>>> for SubsystemRef {
    fn from(subsystem: Rc<RefCell<dyn Subsystem>>) -> Self {
        Self(subsystem)
    }
}

impl Deref for SubsystemRef {
    type Target = Rc<RefCell<dyn Subsystem>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Clone)]
pub struct CommandRef(pub Rc<RefCell<dyn Command>>);

impl CommandRef {
    pub fn new(command: impl Command + 'static) -> Self {
        Self(Rc::new(RefCell::new(command)))
    }
}

impl PartialEq for CommandRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for CommandRef {}

impl Hash for CommandRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const ()).hash(state);
    }
}

impl From<Rc<RefCell<dyn Command>>> for CommandRef {
    fn from(command: Rc<RefCell<dyn Command>>) -> Self {
        Self(command)
    }
}

impl<T: Command + 'static> From<T> for CommandRef {
    fn from(command: T) -> Self {
        Self::new(command)
    }
}

impl Deref for CommandRef {
    type Target = Rc<RefCell<dyn Command>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Runs subsystems and commands once per control cycle.
///
/// Each subsystem is required by at most one scheduled command. Scheduling a
/// command whose requirements are held cancels the holders, unless a holder
/// is [`InterruptionBehavior::CancelIncoming`], in which case the incoming
/// command is dropped. Registered subsystems with no requiring command get
/// their default command scheduled at the end of every run.
#[derive(Default)]
pub struct CommandScheduler {
    subsystems: HashMap<SubsystemRef, Option<CommandRef>>,
    scheduled_commands: HashSet<CommandRef>,
    requirements: HashMap<SubsystemRef, CommandRef>,
    disabled: bool,
}

impl CommandScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem with the scheduler.
    pub fn register<S: Subsystem + 'static>(&mut self, subsystem: S) -> Rc<RefCell<S>> {
        let subsystem = Rc::new(RefCell::new(subsystem));
        self.subsystems
            .insert(SubsystemRef(subsystem.clone()), None);
        subsystem
    }

    /// Schedule a command to run.
    ///
    /// Does nothing if the command is already scheduled, or if the robot is
    /// disabled and the command does not run while disabled.
    pub fn schedule(&mut self, command: impl Into<CommandRef>) -> Result {
        let command = command.into();
        if self.is_scheduled(&command) {
            return Ok(());
        }
        if self.disabled && !command.borrow().runs_when_disabled() {
            trace!("not scheduling a command while disabled");
            return Ok(());
        }

        let requirements = Self::requirements_of(&*command.borrow());

        let mut requiring_commands = Vec::new();
        for requirement in &requirements {
            if let Some(holder) = self.requirements.get(requirement) {
                if !requiring_commands.contains(holder) {
                    requiring_commands.push(holder.clone());
                }
            }
        }

        for requiring in &requiring_commands {
            if requiring.borrow().get_interruption_behavior()
                == InterruptionBehavior::CancelIncoming
            {
                debug!("incoming command dropped, requirement held by an uninterruptible command");
                return Ok(());
            }
        }

        for requiring in &requiring_commands {
            self.cancel(requiring)?;
        }

        self.init_command(command, requirements)
    }

    /// Cancel a scheduled command, calling its `end` with `interrupted = true`.
    pub fn cancel(&mut self, command: &CommandRef) -> Result {
        if !self.scheduled_commands.remove(command) {
            return Ok(());
        }
        self.release(command);
        debug!("command cancelled");
        command.borrow_mut().end(true)
    }

    pub fn cancel_all(&mut self) -> Result {
        let scheduled_commands = self.scheduled_commands.iter().cloned().collect::<Vec<_>>();
        for command in scheduled_commands {
            self.cancel(&command)?;
        }
        Ok(())
    }

    pub fn is_scheduled(&self, command: &CommandRef) -> bool {
        self.scheduled_commands.contains(command)
    }

    /// Returns the command currently requiring `subsystem`, if any.
    pub fn requiring<S: Subsystem + 'static>(
        &self,
        subsystem: &Rc<RefCell<S>>,
    ) -> Option<CommandRef> {
        self.requirements
            .get(&SubsystemRef(subsystem.clone()))
            .cloned()
    }

    /// Set the command that runs on `subsystem` whenever nothing else requires
    /// it. A previously installed default command that is still running is
    /// cancelled.
    pub fn set_default_command<S>(
        &mut self,
        subsystem: &Rc<RefCell<S>>,
        command: impl Command + 'static,
    ) -> Result<CommandRef>
    where
        S: Subsystem + 'static,
    {
        let subsystem = SubsystemRef(subsystem.clone());
        let command = CommandRef::new(command);

        self.check_default_command(&subsystem, &command)
            .context(DefaultCommandSnafu)?;

        let previous = self
            .subsystems
            .get_mut(&subsystem)
            .and_then(|default| default.replace(command.clone()));
        if let Some(previous) = previous {
            self.cancel(&previous)?;
        }

        Ok(command)
    }

    /// Uninstall the default command of `subsystem`. A running instance is
    /// left scheduled.
    pub fn remove_default_command<S>(&mut self, subsystem: &Rc<RefCell<S>>) -> Option<CommandRef>
    where
        S: Subsystem + 'static,
    {
        self.subsystems
            .get_mut(&SubsystemRef(subsystem.clone()))?
            .take()
    }

    pub fn default_command<S>(&self, subsystem: &Rc<RefCell<S>>) -> Option<CommandRef>
    where
        S: Subsystem + 'static,
    {
        self.subsystems
            .get(&SubsystemRef(subsystem.clone()))?
            .clone()
    }

    /// Run one scheduler cycle: subsystem periodics, then every scheduled
    /// command, then default commands for idle subsystems.
    pub fn run(&mut self, disabled: bool) -> Result {
        self.disabled = disabled;

        for subsystem in self.subsystems.keys() {
            let mut subsystem = subsystem.borrow_mut();
            subsystem.periodic();
            if robot::is_sim() {
                subsystem.sim_periodic();
            }
        }

        let scheduled_commands = self.scheduled_commands.iter().cloned().collect::<Vec<_>>();
        for command in scheduled_commands {
            if disabled && !command.borrow().runs_when_disabled() {
                self.cancel(&command)?;
                continue;
            }

            let finished = {
                let mut command = command.borrow_mut();
                command.execute()?;
                command.is_finished()?
            };

            if finished {
                self.scheduled_commands.remove(&command);
                self.release(&command);
                command.borrow_mut().end(false)?;
            }
        }

        // Add default commands for un-required registered subsystems.
        let idle_defaults = self
            .subsystems
            .iter()
            .filter(|(subsystem, _)| !self.requirements.contains_key(*subsystem))
            .filter_map(|(_, command)| command.clone())
            .collect::<Vec<_>>();
        for command in idle_defaults {
            self.schedule(command)?;
        }

        Ok(())
    }

    fn check_default_command(
        &self,
        subsystem: &SubsystemRef,
        command: &CommandRef,
    ) -> Result<(), SetDefaultCommandError> {
        ensure!(
            Self::requirements_of(&*command.borrow()).contains(subsystem),
            MustRequireSubsystemSnafu
        );
        ensure!(self.subsystems.contains_key(subsystem), NotRegisteredSnafu);
        Ok(())
    }

    fn init_command(&mut self, command: CommandRef, requirements: HashSet<SubsystemRef>) -> Result {
        self.requirements
            .extend(requirements.into_iter().map(|r| (r, command.clone())));
        self.scheduled_commands.insert(command.clone());
        debug!("command scheduled");
        command.borrow_mut().initialize()
    }

    fn release(&mut self, command: &CommandRef) {
        self.requirements.retain(|_, holder| holder != command);
    }

    fn requirements_of(command: &dyn Command) -> HashSet<SubsystemRef> {
        command.get_requirements().iter().cloned().collect()
    }
}
