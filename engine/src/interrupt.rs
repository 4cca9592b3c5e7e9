//! Cooperative pause / resume / abort.
//!
//! Every loop that moves more than one buffer calls [`InterruptPoller::check`]
//! once per buffer. Polling never blocks unless a pause is in effect; while
//! paused the poller sleeps in small steps and re-polls until resumed or
//! aborted.

use crate::error::EngineError;
use crate::progress::{ProgressCallback, TransferEvent};
use std::collections::VecDeque;
use std::time::Duration;

/// Operator request, already translated from whatever key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Abort,
    /// Pause once the file currently in flight has been verified
    PauseAfterVerify,
}

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Abort,
}

/// Non-blocking supplier of operator commands.
pub trait CommandSource: Send {
    /// Return the next pending command, or `None` immediately if there is none.
    fn poll_command(&mut self) -> Option<Command>;
}

/// A source that never has anything pending (non-interactive runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCommands;

impl CommandSource for NoCommands {
    fn poll_command(&mut self) -> Option<Command> {
        None
    }
}

/// Replays a fixed script, one entry per poll; `None` entries are idle polls.
#[derive(Debug, Default, Clone)]
pub struct ScriptedCommands {
    script: VecDeque<Option<Command>>,
}

impl ScriptedCommands {
    pub fn new(script: impl IntoIterator<Item = Option<Command>>) -> Self {
        ScriptedCommands {
            script: script.into_iter().collect(),
        }
    }
}

impl CommandSource for ScriptedCommands {
    fn poll_command(&mut self) -> Option<Command> {
        self.script.pop_front().flatten()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseState {
    pub paused: bool,
    pub pause_after_verify_requested: bool,
}

pub struct InterruptPoller {
    source: Box<dyn CommandSource>,
    state: PauseState,
    poll_interval: Duration,
}

impl InterruptPoller {
    pub fn new(source: Box<dyn CommandSource>, poll_interval: Duration) -> Self {
        InterruptPoller {
            source,
            state: PauseState::default(),
            poll_interval,
        }
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    /// Poll pending input. With `induced_pause` the poller starts out paused
    /// and only returns once the operator resumes or aborts.
    pub fn poll(&mut self, induced_pause: bool, progress: Option<&dyn ProgressCallback>) -> Signal {
        self.state.paused = induced_pause;
        if induced_pause {
            emit(progress, TransferEvent::Paused);
        }
        loop {
            match self.source.poll_command() {
                Some(Command::Abort) => return Signal::Abort,
                Some(Command::TogglePause) => {
                    self.state.paused = !self.state.paused;
                    if self.state.paused {
                        emit(progress, TransferEvent::Paused);
                    } else {
                        emit(progress, TransferEvent::Resumed);
                    }
                }
                Some(Command::PauseAfterVerify) => {
                    self.state.pause_after_verify_requested = true;
                    emit(progress, TransferEvent::PauseRequested);
                }
                None => {}
            }
            if !self.state.paused {
                return Signal::Continue;
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// [`poll`](Self::poll) without an induced pause, with abort mapped to
    /// [`EngineError::UserStop`].
    pub fn check(&mut self, progress: Option<&dyn ProgressCallback>) -> Result<(), EngineError> {
        match self.poll(false, progress) {
            Signal::Continue => Ok(()),
            Signal::Abort => Err(EngineError::UserStop),
        }
    }

    /// Consume a pending "pause after verify" request.
    pub fn take_pause_after_verify(&mut self) -> bool {
        std::mem::take(&mut self.state.pause_after_verify_requested)
    }
}

fn emit(progress: Option<&dyn ProgressCallback>, event: TransferEvent) {
    if let Some(callback) = progress {
        callback.on_event(&event);
    }
}
