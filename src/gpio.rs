//! Encoder, push button and reset lines through the sysfs GPIO interface.
//!
//! Every read is a synchronous file read, so a polling loop built on this
//! tops out at a few kHz. That is plenty for a hand turned detent encoder.
use anyhow::{bail, Context, Result};
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::PathBuf,
    thread,
    time::Duration,
};

const SYSFS_GPIO: &str = "/sys/class/gpio";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    pin_num: u64,
    root: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    /// Output, starting high
    High,
}

impl Pin {
    /// Create a new Pin with the provided `pin_num`
    ///
    /// This function does not export the provided pin_num.
    pub fn new(pin_num: u64) -> Pin {
        Pin::with_root(SYSFS_GPIO, pin_num)
    }

    /// Same as `new`, but against a different sysfs mount point.
    pub fn with_root<P: Into<PathBuf>>(root: P, pin_num: u64) -> Pin {
        Pin {
            pin_num,
            root: root.into(),
        }
    }

    /// Export the pin as an input reporting raw levels. Polarity is
    /// left to the consumer.
    pub fn input(pin_num: u64) -> Result<Pin> {
        let pin = Pin::new(pin_num);
        pin.export()
            .with_context(|| format!("could not export GPIO {}", pin_num))?
            .set_direction(Direction::In)?
            .set_active_low(false)?;
        Ok(pin)
    }

    /// Export the GPIO
    ///
    /// Equivalent to `echo N > /sys/class/gpio/export`. A pin that is
    /// already exported is left alone.
    pub fn export(&self) -> Result<&Pin> {
        if fs::metadata(self.pin_dir()).is_err() {
            let mut export_file = File::create(self.root.join("export"))?;
            export_file.write_all(format!("{}", self.pin_num).as_bytes())?;
        }
        Ok(self)
    }

    /// `High` configures an output that starts high, so a reset line
    /// does not glitch low while it is being set up.
    pub fn set_direction(&self, dir: Direction) -> Result<&Pin> {
        self.write_to_device_file(
            "direction",
            match dir {
                Direction::In => "in",
                Direction::High => "high",
            },
        )?;
        Ok(self)
    }

    /// Invert the logical level reported by `get_value`.
    pub fn set_active_low(&self, active_low: bool) -> Result<&Pin> {
        self.write_to_device_file("active_low", if active_low { "1" } else { "0" })?;
        Ok(self)
    }

    pub fn set_value(&self, value: u8) -> Result<&Pin> {
        self.write_to_device_file(
            "value",
            match value {
                0 => "0",
                _ => "1",
            },
        )?;
        Ok(self)
    }

    /// Get the value of the Pin (0 or 1)
    pub fn get_value(&self) -> Result<u8> {
        let contents = self
            .read_from_device_file("value")
            .with_context(|| format!("could not read GPIO {}", self.pin_num))?;
        parse_value(&contents)
    }

    pub fn is_high(&self) -> Result<bool> {
        Ok(self.get_value()? == 1)
    }

    /// Hold the line low for `width`, then release it high again.
    pub fn pulse_low(&self, width: Duration) -> Result<()> {
        self.set_value(0)?;
        thread::sleep(width);
        self.set_value(1)?;
        Ok(())
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin_num))
    }

    fn write_to_device_file(&self, dev_file_name: &str, value: &str) -> Result<()> {
        let gpio_path = self.pin_dir().join(dev_file_name);
        let mut dev_file = File::create(&gpio_path)
            .with_context(|| format!("could not open {}", gpio_path.display()))?;
        dev_file.write_all(value.as_bytes())?;
        Ok(())
    }

    fn read_from_device_file(&self, dev_file_name: &str) -> Result<String> {
        let gpio_path = self.pin_dir().join(dev_file_name);
        let mut dev_file = File::open(&gpio_path)?;
        let mut s = String::new();
        dev_file.read_to_string(&mut s)?;
        Ok(s)
    }
}

fn parse_value(contents: &str) -> Result<u8> {
    match contents.trim() {
        "1" => Ok(1),
        "0" => Ok(0),
        other => bail!("value file contents {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn fake_sysfs(name: &str, pin_num: u64) -> PathBuf {
        let root = env::temp_dir().join(format!("knobd-gpio-{}-{}", name, std::process::id()));
        fs::create_dir_all(root.join(format!("gpio{}", pin_num))).unwrap();
        root
    }

    #[test]
    fn parses_sysfs_values() {
        assert_eq!(parse_value("1\n").unwrap(), 1);
        assert_eq!(parse_value("0").unwrap(), 0);
        assert!(parse_value("2\n").is_err());
        assert!(parse_value("").is_err());
    }

    #[test]
    fn reads_and_writes_through_device_files() {
        let root = fake_sysfs("rw", 18);
        let pin = Pin::with_root(&root, 18);

        pin.export().unwrap().set_direction(Direction::High).unwrap();
        assert_eq!(
            fs::read_to_string(root.join("gpio18/direction")).unwrap(),
            "high"
        );

        pin.set_value(1).unwrap();
        assert!(pin.is_high().unwrap());
        pin.set_value(0).unwrap();
        assert!(!pin.is_high().unwrap());

        pin.set_active_low(true).unwrap();
        assert_eq!(
            fs::read_to_string(root.join("gpio18/active_low")).unwrap(),
            "1"
        );
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn pulse_leaves_line_high() {
        let root = fake_sysfs("pulse", 6);
        let pin = Pin::with_root(&root, 6);
        pin.pulse_low(Duration::from_millis(1)).unwrap();
        assert_eq!(pin.get_value().unwrap(), 1);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_pin_is_an_error() {
        let pin = Pin::with_root(env::temp_dir().join("knobd-gpio-missing"), 99);
        assert!(pin.get_value().is_err());
    }
}
