use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs::File, io::BufReader, path::Path, time::Duration};

use crate::relay::DEFAULT_ADDRESS;

pub const CONFIGURATION_PATH: &str = "/etc/knobd.json";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Phases wired to two GPIO lines
    Gpio,
    /// Counts read from the I2C peripheral
    Relay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: Source,
    pub pin_a: u64,
    pub pin_b: u64,
    pub pin_push: Option<u64>,
    pub active_low: bool,
    pub poll_interval_us: u64,
    pub i2c_bus: String,
    pub i2c_address: u8,
    pub relay_interval_ms: u64,
    pub pin_relay_reset: Option<u64>,
    pub pin_shutdown: Option<u64>,
    pub shutdown_interval_ms: u64,
    pub shutdown_command: String,
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: Source::Gpio,
            pin_a: 18,
            pin_b: 19,
            pin_push: Some(13),
            active_low: true,
            poll_interval_us: 1000,
            i2c_bus: "/dev/i2c-1".to_string(),
            i2c_address: DEFAULT_ADDRESS,
            relay_interval_ms: 100,
            pin_relay_reset: None,
            pin_shutdown: None,
            shutdown_interval_ms: 1000,
            shutdown_command: "shutdown -H now".to_string(),
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Read the configuration named by `KNOBD_CONFIG`, falling back to
    /// defaults when the file does not exist. `KNOBD_BIND` wins over the
    /// file for the HTTP address.
    pub fn load() -> Result<Config> {
        let path = env::var("KNOBD_CONFIG").unwrap_or_else(|_| CONFIGURATION_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Config::load_from_path(&path)?
        } else {
            Config::default()
        };
        if let Ok(bind) = env::var("KNOBD_BIND") {
            config.bind = bind;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source == Source::Gpio && self.pin_a == self.pin_b {
            bail!("encoder phases share GPIO {}", self.pin_a);
        }
        if self.poll_interval_us == 0 || self.relay_interval_ms == 0 || self.shutdown_interval_ms == 0 {
            bail!("poll intervals must be positive");
        }
        if self.shutdown_command.trim().is_empty() {
            bail!("shutdown command is empty");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        match self.source {
            Source::Gpio => Duration::from_micros(self.poll_interval_us),
            Source::Relay => Duration::from_millis(self.relay_interval_ms),
        }
    }

    pub fn shutdown_interval(&self) -> Duration {
        Duration::from_millis(self.shutdown_interval_ms)
    }
}
