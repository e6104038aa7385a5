use anyhow::Result;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    pub static ref POSITION: IntGauge =
        register_int_gauge!("knobd_position", "Current encoder position in detents")
            .expect("could not register knobd_position");
    pub static ref STEPS: IntCounterVec = register_int_counter_vec!(
        "knobd_steps_total",
        "Detents turned, by direction",
        &["direction"]
    )
    .expect("could not register knobd_steps_total");
    pub static ref INVALID_TRANSITIONS: IntCounter = register_int_counter!(
        "knobd_invalid_transitions_total",
        "Samples where both encoder phases changed at once"
    )
    .expect("could not register knobd_invalid_transitions_total");
    pub static ref BUTTON_PRESSES: IntCounter =
        register_int_counter!("knobd_button_presses_total", "Confirmed push button presses")
            .expect("could not register knobd_button_presses_total");
}

pub fn record_change(change: i64, position: i64) {
    let direction = if change > 0 { "right" } else { "left" };
    STEPS
        .with_label_values(&[direction])
        .inc_by(change.unsigned_abs());
    POSITION.set(position);
}

/// Bring the invalid transition counter up to `total`.
pub fn record_invalid(total: u64) {
    let seen = INVALID_TRANSITIONS.get();
    if total > seen {
        INVALID_TRANSITIONS.inc_by(total - seen);
    }
}

/// Everything registered so far, in the prometheus text format.
pub fn gather() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_recorded_values() {
        record_change(3, 3);
        record_change(-1, 2);
        record_invalid(2);
        record_invalid(1);
        BUTTON_PRESSES.inc();

        assert_eq!(POSITION.get(), 2);
        assert!(STEPS.with_label_values(&["right"]).get() >= 3);
        assert!(INVALID_TRANSITIONS.get() >= 2);

        let text = gather().unwrap();
        assert!(text.contains("knobd_position"));
        assert!(text.contains("knobd_steps_total{direction=\"left\"}"));
        assert!(text.contains("knobd_button_presses_total"));
    }
}
