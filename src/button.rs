/// Confirmed change of a push button.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// Two-sample debounce: a new state is only accepted once two
/// consecutive samples agree on it.
#[derive(Debug, Clone)]
pub struct Debounce {
    active_low: bool,
    pressed: bool,
    last: Option<bool>,
}

impl Debounce {
    /// `active_low` buttons read a low level while held down.
    pub fn new(active_low: bool) -> Self {
        Self {
            active_low,
            pressed: false,
            last: None,
        }
    }

    pub fn sample(&mut self, level: bool) -> Option<Edge> {
        let pressed = level != self.active_low;
        let previous = self.last.replace(pressed);
        if previous != Some(pressed) || pressed == self.pressed {
            return None;
        }
        self.pressed = pressed;
        Some(if pressed { Edge::Pressed } else { Edge::Released })
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}
