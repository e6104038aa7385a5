use log::debug;

/// One detent worth of rotation, as seen by the position counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    None,
    Left,
    Right,
}

impl Step {
    pub fn delta(self) -> i64 {
        match self {
            Step::None => 0,
            Step::Left => -1,
            Step::Right => 1,
        }
    }
}

/// Contribution of a single edge between two phase samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Idle,
    Forward,
    Backward,
    /// Both phases changed between two samples, an edge was missed.
    Invalid,
}

use Transition::{Backward as B, Forward as F, Idle as I, Invalid as X};

/// Indexed by `prev_a prev_b a b`.
pub const TRANSITIONS: [Transition; 16] = [
    I, B, F, X, //
    F, I, X, B, //
    B, X, I, F, //
    X, F, B, I, //
];

// Four edges make one detent
const EDGES_PER_DETENT: i8 = 4;

/// Quadrature decoder for a mechanical encoder with one detent per
/// electrical cycle. Feed it the levels of both phases on every poll.
#[derive(Debug, Clone)]
pub struct Rotary {
    phase: u8,
    accumulator: i8,
    ticks: u64,
    invalid: u64,
}

impl Default for Rotary {
    /// Both phases high, the rest position of an encoder on pull-ups.
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Rotary {
    /// Seed the decoder with the current levels so that the first
    /// `sample` does not see a phantom edge.
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            phase: phase(a, b),
            accumulator: 0,
            ticks: 0,
            invalid: 0,
        }
    }

    pub fn sample(&mut self, a: bool, b: bool) -> Step {
        let current = phase(a, b);
        let index = (self.phase << 2) | current;
        self.phase = current;

        let edge = match TRANSITIONS[index as usize] {
            Transition::Idle => return Step::None,
            Transition::Forward => 1,
            Transition::Backward => -1,
            Transition::Invalid => {
                self.invalid += 1;
                debug!(
                    "invalid transition {:04b}, accumulator {}",
                    index, self.accumulator
                );
                return Step::None;
            }
        };

        self.accumulator += edge;
        if self.accumulator.abs() > EDGES_PER_DETENT {
            self.accumulator = 0;
            return Step::None;
        }
        if self.accumulator % EDGES_PER_DETENT != 0 {
            return Step::None;
        }
        let step = match self.accumulator {
            EDGES_PER_DETENT => Step::Right,
            n if n == -EDGES_PER_DETENT => Step::Left,
            _ => Step::None,
        };
        self.accumulator = 0;
        if step != Step::None {
            self.ticks += 1;
        }
        step
    }

    /// Partial progress through the current detent, in edges.
    pub fn accumulator(&self) -> i8 {
        self.accumulator
    }

    /// Last stored phase pair as `(a, b)`.
    pub fn phase(&self) -> (bool, bool) {
        (self.phase & 0b10 != 0, self.phase & 0b01 != 0)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn invalid_transitions(&self) -> u64 {
        self.invalid
    }
}

fn phase(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}
