use anyhow::Result;
use knobd::input::{ButtonSource, EncoderSource, GpioEncoder, QuadratureSource, Tracker};
use std::cell::Cell;
use std::rc::Rc;

const FORWARD: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

/// Phases of an encoder resting on pull-ups, turned by hand.
struct Knob {
    samples: Vec<(bool, bool)>,
    next: usize,
}

impl Knob {
    fn new() -> Self {
        Knob {
            samples: vec![(true, true)],
            next: 0,
        }
    }

    fn turn_right(mut self, detents: usize) -> Self {
        for _ in 0..detents {
            for &pair in FORWARD.iter() {
                // sampled twice per edge, like a poll loop faster than the knob
                self.samples.push(pair);
                self.samples.push(pair);
            }
        }
        self
    }

    fn turn_left(mut self, detents: usize) -> Self {
        for _ in 0..detents {
            for &pair in FORWARD.iter().rev().skip(1).chain(Some(&(true, true))) {
                self.samples.push(pair);
            }
        }
        self
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

impl QuadratureSource for Knob {
    fn levels(&mut self) -> Result<(bool, bool)> {
        let pair = self.samples[self.next.min(self.samples.len() - 1)];
        self.next += 1;
        Ok(pair)
    }
}

struct Button(Rc<Cell<bool>>);

impl ButtonSource for Button {
    fn level(&mut self) -> Result<bool> {
        Ok(self.0.get())
    }
}

#[test]
fn turns_then_stops_on_push() {
    let knob = Knob::new().turn_right(3).turn_left(1);
    let polls = knob.len() - 1;
    let released = Rc::new(Cell::new(true));
    let mut encoder = GpioEncoder::new(knob, Some(Button(released.clone())), true).unwrap();
    let mut tracker = Tracker::new();

    let mut positions = Vec::new();
    for _ in 0..polls {
        if let Some(position) = tracker.update(encoder.read().unwrap()) {
            positions.push(position);
        }
    }
    assert_eq!(positions, vec![1, 2, 3, 2]);
    assert_eq!(encoder.invalid_transitions(), 0);

    released.set(false);
    tracker.update(encoder.read().unwrap());
    assert!(!tracker.stopped());
    tracker.update(encoder.read().unwrap());
    assert!(tracker.stopped());
    assert_eq!(tracker.position(), 2);
    assert_eq!(tracker.detents(), 4);
}
