use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::{process::Command, thread, time::Duration};

use crate::button::{Debounce, Edge};
use crate::input::ButtonSource;

/// Watches a button and powers the board off once it is held for two
/// consecutive polls.
pub struct ShutdownButton<B> {
    button: B,
    debounce: Debounce,
    interval: Duration,
    command: String,
}

impl<B: ButtonSource> ShutdownButton<B> {
    pub fn new(button: B, active_low: bool, interval: Duration, command: &str) -> Self {
        Self {
            button,
            debounce: Debounce::new(active_low),
            interval,
            command: command.to_string(),
        }
    }

    /// One poll. Returns true when the press is confirmed.
    pub fn poll(&mut self) -> Result<bool> {
        let level = self.button.level()?;
        Ok(self.debounce.sample(level) == Some(Edge::Pressed))
    }

    /// Block until the button is pressed, then run the shutdown command.
    pub fn watch(mut self) -> Result<()> {
        loop {
            match self.poll() {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => warn!("could not read shutdown button: {:#}", e),
            }
            thread::sleep(self.interval);
        }
        info!("shutdown button pressed, running `{}`", self.command);
        run(&self.command)
    }
}

fn run(command: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("could not start `{}`", command))?;
    if !status.success() {
        bail!("`{}` exited with {}", command, status);
    }
    Ok(())
}
