//! Keyboard control while a run is in progress.
//!
//! The terminal is switched to non-canonical, no-echo input so single key
//! presses arrive immediately. A reader thread forwards every byte over a
//! channel, and the engine drains it without blocking between buffers.
//!
//! Keys: SPACE/p pause or resume, v pause after the current file, ESC/q stop.

use crossbeam_channel::{Receiver, TryRecvError};
use engine::interrupt::{Command, CommandSource, NoCommands};
#[cfg(unix)]
use nix::sys::termios;
use std::io::{self, IsTerminal, Read};
#[cfg(unix)]
use std::os::fd::AsFd;
use std::thread;

const ESC: u8 = 27;

/// Map a key press to an engine command.
pub fn translate(key: u8) -> Option<Command> {
    match key {
        b' ' | b'p' | b'P' => Some(Command::TogglePause),
        ESC | b'q' | b'Q' => Some(Command::Abort),
        b'v' | b'V' => Some(Command::PauseAfterVerify),
        _ => None,
    }
}

/// Commands read from key presses on stdin.
pub struct StdinCommands {
    keys: Receiver<u8>,
}

impl StdinCommands {
    pub fn from_receiver(keys: Receiver<u8>) -> Self {
        StdinCommands { keys }
    }

    /// Start the reader thread.
    ///
    /// The thread lives until stdin closes or the process exits; it is never
    /// joined.
    pub fn spawn() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let spawned = thread::Builder::new()
            .name("tcopy-keys".to_string())
            .spawn(move || {
                let mut stdin = io::stdin().lock();
                let mut byte = [0u8; 1];
                loop {
                    match stdin.read(&mut byte) {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(byte[0]).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "keyboard control unavailable");
        }
        StdinCommands::from_receiver(rx)
    }
}

impl CommandSource for StdinCommands {
    fn poll_command(&mut self) -> Option<Command> {
        loop {
            match self.keys.try_recv() {
                Ok(key) => {
                    if let Some(command) = translate(key) {
                        return Some(command);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }
}

/// Restores the terminal's original input mode when dropped.
pub struct TerminalGuard {
    #[cfg(unix)]
    original: termios::Termios,
}

#[cfg(unix)]
impl TerminalGuard {
    fn enable() -> io::Result<Self> {
        Self::enable_on(io::stdin())
    }

    /// Switch `input` to single-key mode. Dropping the guard restores stdin.
    fn enable_on<F: AsFd>(input: F) -> io::Result<Self> {
        let original = termios::tcgetattr(&input)?;

        let mut single_key = original.clone();
        single_key
            .local_flags
            .remove(termios::LocalFlags::ICANON | termios::LocalFlags::ECHO);
        single_key.control_chars[termios::SpecialCharacterIndices::VMIN as usize] = 1;
        single_key.control_chars[termios::SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&input, termios::SetArg::TCSANOW, &single_key)?;

        Ok(TerminalGuard { original })
    }
}

#[cfg(unix)]
impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(&io::stdin(), termios::SetArg::TCSANOW, &self.original) {
            tracing::warn!(error = %e, "could not restore the terminal mode");
        }
    }
}

#[cfg(not(unix))]
impl TerminalGuard {
    fn enable() -> io::Result<Self> {
        Ok(TerminalGuard {})
    }
}

/// Hook the keyboard up to the engine when stdin is an interactive terminal.
///
/// Keep the returned guard alive for the whole run. Without a terminal no
/// commands are ever produced.
pub fn attach() -> (Option<TerminalGuard>, Box<dyn CommandSource>) {
    if !io::stdin().is_terminal() {
        return (None, Box::new(NoCommands));
    }
    let guard = match TerminalGuard::enable() {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!(error = %e, "could not switch the terminal to single-key input");
            None
        }
    };
    (guard, Box::new(StdinCommands::spawn()))
}
