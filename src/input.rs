use anyhow::Result;
use embedded_hal::blocking::i2c::{Read, Write};
use log::info;
use std::fmt::Debug;

use crate::button::Debounce;
use crate::gpio::Pin;
use crate::position::Position;
use crate::relay::Relay;
use crate::rotary::Rotary;

/// What one poll of an encoder produced.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Reading {
    pub change: i64,
    pub pressed: bool,
}

pub trait EncoderSource {
    fn read(&mut self) -> Result<Reading>;

    /// Invalid transitions seen so far, for sources that decode themselves.
    fn invalid_transitions(&self) -> u64 {
        0
    }

    /// Detents emitted by the decoder, for sources that decode themselves.
    fn ticks(&self) -> Option<u64> {
        None
    }
}

/// Current levels of the two encoder phases.
pub trait QuadratureSource {
    fn levels(&mut self) -> Result<(bool, bool)>;
}

pub trait ButtonSource {
    fn level(&mut self) -> Result<bool>;
}

pub struct PinPair {
    pub a: Pin,
    pub b: Pin,
}

impl QuadratureSource for PinPair {
    fn levels(&mut self) -> Result<(bool, bool)> {
        Ok((self.a.is_high()?, self.b.is_high()?))
    }
}

impl ButtonSource for Pin {
    fn level(&mut self) -> Result<bool> {
        self.is_high()
    }
}

/// Encoder wired straight to two GPIO lines, decoded on the host.
pub struct GpioEncoder<Q, B> {
    phases: Q,
    push: Option<(B, Debounce)>,
    rotary: Rotary,
}

impl<Q, B> GpioEncoder<Q, B>
where
    Q: QuadratureSource,
    B: ButtonSource,
{
    /// Reads the phases once to seed the decoder.
    pub fn new(mut phases: Q, push: Option<B>, push_active_low: bool) -> Result<Self> {
        let (a, b) = phases.levels()?;
        Ok(Self {
            phases,
            push: push.map(|pin| (pin, Debounce::new(push_active_low))),
            rotary: Rotary::new(a, b),
        })
    }
}

impl<Q, B> EncoderSource for GpioEncoder<Q, B>
where
    Q: QuadratureSource,
    B: ButtonSource,
{
    fn read(&mut self) -> Result<Reading> {
        let (a, b) = self.phases.levels()?;
        let step = self.rotary.sample(a, b);
        let pressed = match self.push.as_mut() {
            Some((pin, debounce)) => {
                debounce.sample(pin.level()?);
                debounce.is_pressed()
            }
            None => false,
        };
        Ok(Reading {
            change: step.delta(),
            pressed,
        })
    }

    fn invalid_transitions(&self) -> u64 {
        self.rotary.invalid_transitions()
    }

    fn ticks(&self) -> Option<u64> {
        Some(self.rotary.ticks())
    }
}

/// Encoder decoded by the I2C peripheral, see `relay`.
pub struct RelayEncoder<I> {
    relay: Relay<I>,
    push: Debounce,
}

impl<I> RelayEncoder<I> {
    pub fn new(relay: Relay<I>) -> Self {
        Self {
            relay,
            push: Debounce::new(false),
        }
    }
}

impl<I, E> EncoderSource for RelayEncoder<I>
where
    I: Write<Error = E> + Read<Error = E>,
    E: Debug,
{
    fn read(&mut self) -> Result<Reading> {
        let report = self.relay.read_report()?;
        self.push.sample(report.pressed);
        Ok(Reading {
            change: report.change,
            pressed: self.push.is_pressed(),
        })
    }
}

/// Applies readings to a position until the push button is pressed.
#[derive(Debug, Default)]
pub struct Tracker {
    position: Position,
    detents: u64,
    stopped: bool,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new position when it moved. A change that arrives with
    /// the press is still applied.
    pub fn update(&mut self, reading: Reading) -> Option<i64> {
        if self.stopped {
            return None;
        }
        let moved = if reading.change != 0 {
            self.position.shift(reading.change);
            self.detents += reading.change.unsigned_abs();
            Some(self.position.value())
        } else {
            None
        };
        if reading.pressed {
            info!("button pressed at position {}", self.position.value());
            self.stopped = true;
        }
        moved
    }

    pub fn position(&self) -> i64 {
        self.position.value()
    }

    /// Detents turned in either direction.
    pub fn detents(&self) -> u64 {
        self.detents
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }
}
