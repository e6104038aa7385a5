use crate::rotary::Step;

/// Running detent count. Starts at zero on every start of the daemon.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Position {
    value: i64,
}

impl Position {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, step: Step) {
        self.value += step.delta();
    }

    /// Move by several detents at once, for sources that report
    /// already decoded counts.
    pub fn shift(&mut self, delta: i64) {
        self.value += delta;
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}
