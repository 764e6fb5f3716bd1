//! X11 implementation using XRandR.

mod display;

pub use display::SystemDisplays;
