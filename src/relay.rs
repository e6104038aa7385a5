//! Encoder counts relayed by a peripheral microcontroller over I2C.
//!
//! The peripheral decodes the encoder itself and answers every poll with a
//! single status byte:
//!
//! ```text
//!   7   6   5 ........ 0
//! | P | S |  magnitude  |
//! ```
//!
//! `P` is set while the push button is held, `S` is set for a positive
//! change. Writing `0x00` first tells the peripheral to clear its count
//! once it has been sent.
use anyhow::{anyhow, Result};
use embedded_hal::blocking::i2c::{Read, Write};
use std::fmt::Debug;

pub const DEFAULT_ADDRESS: u8 = 0x08;

const PRESSED: u8 = 0b1000_0000;
const POSITIVE: u8 = 0b0100_0000;
const MAGNITUDE: u8 = 0b0011_1111;

// Larger magnitudes only show up as bus noise
const MAX_CHANGE: u8 = 12;

const CLEAR_AFTER_SEND: [u8; 1] = [0x00];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Report {
    pub pressed: bool,
    pub change: i64,
}

impl From<u8> for Report {
    fn from(byte: u8) -> Self {
        let mut magnitude = byte & MAGNITUDE;
        if magnitude > MAX_CHANGE {
            magnitude = 0;
        }
        let sign = if byte & POSITIVE != 0 { 1 } else { -1 };
        Report {
            pressed: byte & PRESSED != 0,
            change: sign * magnitude as i64,
        }
    }
}

pub struct Relay<I> {
    i2c: I,
    address: u8,
}

impl<I, E> Relay<I>
where
    I: Write<Error = E> + Read<Error = E>,
    E: Debug,
{
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn read_report(&mut self) -> Result<Report> {
        self.i2c
            .write(self.address, &CLEAR_AFTER_SEND)
            .map_err(|e| anyhow!("i2c write to {:#04x} failed: {:?}", self.address, e))?;
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|e| anyhow!("i2c read from {:#04x} failed: {:?}", self.address, e))?;
        Ok(Report::from(buf[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn decodes_status_byte() {
        assert_eq!(
            Report::from(0b0100_0011),
            Report {
                pressed: false,
                change: 3
            }
        );
        assert_eq!(
            Report::from(0b1000_0010),
            Report {
                pressed: true,
                change: -2
            }
        );
        assert_eq!(Report::from(0).change, 0);
        assert_eq!(Report::from(0b0100_1100).change, 12);
    }

    #[test]
    fn drops_noisy_magnitudes() {
        let report = Report::from(0b1100_1101);
        assert!(report.pressed);
        assert_eq!(report.change, 0);
        assert_eq!(Report::from(0xff).change, 0);
    }

    #[test]
    fn polls_with_clear_then_read() {
        let expectations = [
            Transaction::write(DEFAULT_ADDRESS, vec![0x00]),
            Transaction::read(DEFAULT_ADDRESS, vec![0b0100_0001]),
            Transaction::write(DEFAULT_ADDRESS, vec![0x00]),
            Transaction::read(DEFAULT_ADDRESS, vec![0b1000_0000]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut relay = Relay::new(i2c.clone(), DEFAULT_ADDRESS);

        assert_eq!(relay.read_report().unwrap().change, 1);
        let report = relay.read_report().unwrap();
        assert!(report.pressed);
        assert_eq!(report.change, 0);

        i2c.done();
    }
}
