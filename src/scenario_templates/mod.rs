//! Built-in scenario presets, usable as-is or as starting points for
//! custom RON definitions.

pub mod workday;

pub use workday::workday;
