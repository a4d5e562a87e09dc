//! Treiber gegen `embedded-hal` 1.0 Traits
//!
//! Keine Chip-Abhängigkeit: laufen auf dem ESP32 mit `esp-hal`
//! und auf dem Host mit einem Mock-Bus.

pub mod mcp23008;
pub mod ssd1306;

pub use mcp23008::Mcp23008;
pub use ssd1306::Ssd1306;
