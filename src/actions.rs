// Gesture actions - what happens when a clap gesture is detected
//
// Single clap → wake command, double clap → lock command. The commands are
// plain argv lists from the configuration so any platform tool can be used
// (xset, loginctl, caffeinate, rundll32, ...).

use std::io;
use std::process::Command;

use tracing::{info, warn};

use crate::config::ActionsConfig;
use crate::detection::{GestureEvent, GestureKind};

/// Receiver of detected gestures
pub trait ActionSink {
    /// React to one gesture
    fn dispatch(&mut self, event: &GestureEvent) -> io::Result<()>;
}

/// Runs the configured command for each gesture
#[derive(Debug, Clone, Default)]
pub struct CommandActions {
    wake: Option<Vec<String>>,
    lock: Option<Vec<String>>,
}

impl CommandActions {
    pub fn new(wake: Option<Vec<String>>, lock: Option<Vec<String>>) -> Self {
        Self {
            wake: wake.filter(|argv| !argv.is_empty()),
            lock: lock.filter(|argv| !argv.is_empty()),
        }
    }

    pub fn from_config(config: &ActionsConfig) -> Self {
        Self::new(config.wake_command.clone(), config.lock_command.clone())
    }

    /// Command bound to a gesture, if any
    pub fn command_for(&self, kind: GestureKind) -> Option<&[String]> {
        match kind {
            GestureKind::Single => self.wake.as_deref(),
            GestureKind::Double => self.lock.as_deref(),
        }
    }
}

impl ActionSink for CommandActions {
    fn dispatch(&mut self, event: &GestureEvent) -> io::Result<()> {
        let Some((program, args)) = self
            .command_for(event.kind)
            .and_then(|argv| argv.split_first())
        else {
            info!(
                "[Actions] No command bound to {}",
                event.kind.display_name()
            );
            return Ok(());
        };

        info!(
            "[Actions] {}: running {} {}",
            event.kind.display_name(),
            program,
            args.join(" ")
        );
        let status = Command::new(program).args(args).status()?;
        if !status.success() {
            warn!("[Actions] {} exited with {}", program, status);
        }
        Ok(())
    }
}

/// Dry-run sink: logs gestures without touching the system
#[derive(Debug, Clone, Default)]
pub struct LogActions {
    dispatched: usize,
}

impl LogActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gestures seen so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }
}

impl ActionSink for LogActions {
    fn dispatch(&mut self, event: &GestureEvent) -> io::Result<()> {
        self.dispatched += 1;
        let action = match event.kind {
            GestureKind::Single => "wake display",
            GestureKind::Double => "lock screen",
        };
        info!(
            "[Actions] (dry run) {} at {:.2}s would {}",
            event.kind.display_name(),
            event.timestamp,
            action
        );
        Ok(())
    }
}

impl<A: ActionSink + ?Sized> ActionSink for Box<A> {
    fn dispatch(&mut self, event: &GestureEvent) -> io::Result<()> {
        (**self).dispatch(event)
    }
}
