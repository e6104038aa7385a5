//! Rotary encoder input for a Raspberry Pi: quadrature decoding, the push
//! and shutdown buttons, and the I2C relay used when a microcontroller
//! does the decoding instead.

pub mod button;
pub mod config;
pub mod gpio;
pub mod input;
pub mod metrics;
pub mod position;
pub mod relay;
pub mod rotary;
pub mod shutdown;
