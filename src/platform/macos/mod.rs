//! macOS platform implementation.

mod display;
mod ffi;

pub use display::SystemDisplays;
