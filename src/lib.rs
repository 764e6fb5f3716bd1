//! # monitors
//!
//! A pure Rust cross-platform library for enumerating monitors and switching
//! their display modes.
//!
//! ## Features
//!
//! - Cross-platform support (macOS, Windows, Linux/X11)
//! - Lists each monitor's usable modes and the currently active one
//! - Mode switching that re-validates the mode against the live OS state
//! - Injectable [`DisplayProvider`] so detection logic runs without hardware
//!
//! ## Quick Start
//!
//! ### Listing Monitors
//!
//! ```no_run
//! for monitor in monitors::detect()? {
//!     println!("{} ({:.0}x{:.0} mm)", monitor.name, monitor.width_mm, monitor.height_mm);
//!     for mode in monitor.modes() {
//!         let marker = if monitor.current_mode() == Some(mode) { "*" } else { " " };
//!         println!("  {marker} {mode}");
//!     }
//! }
//! # Ok::<(), monitors::Error>(())
//! ```
//!
//! ### Switching Modes
//!
//! ```no_run
//! use monitors::Error;
//!
//! let Some(mut monitor) = monitors::primary_monitor()? else {
//!     return Ok(());
//! };
//! if let Some(mode) = monitor.find_mode(1920, 1080, 60.0).cloned() {
//!     match monitors::apply_mode(&mut monitor, &mode) {
//!         Ok(()) => println!("Now running {mode}"),
//!         Err(Error::ModeNotFound) => println!("Display changed, detect again"),
//!         Err(e) => return Err(e),
//!     }
//! }
//! # Ok::<(), monitors::Error>(())
//! ```
//!
//! ## Filtering
//!
//! Only modes the OS marks valid and safe, that are neither interlaced nor
//! stretched, and that use 16-bit or 32-bit direct pixels are reported (see
//! [`filter`]). If the active mode fails that test, the monitor has no
//! current mode.

pub mod error;
pub mod filter;
pub mod manager;
pub mod monitor;
pub mod provider;
pub mod stub;

mod platform;

// Re-exports
pub use error::{Error, Result};
pub use manager::Monitors;
pub use monitor::{DisplayId, Mode, ModeId, Monitor};
pub use platform::SystemDisplays;
pub use provider::{
    DisplayProvider, ModeDescriptor, ModeFlags, PhysicalSize, PixelEncoding, RawMode,
    RefreshPeriod,
};

/// Prepare the library for use.
///
/// Currently there is nothing to set up; always succeeds.
pub fn init() -> Result<()> {
    Ok(())
}

/// Release anything [`init`] acquired. Currently a no-op.
pub fn deinit() {}

/// Detect every awake monitor using the OS display services.
pub fn detect() -> Result<Vec<Monitor>> {
    Monitors::new().detect()
}

/// Get the primary monitor, if it is awake.
pub fn primary_monitor() -> Result<Option<Monitor>> {
    Ok(detect()?.into_iter().find(Monitor::is_primary))
}

/// Switch `monitor` to `mode` using the OS display services.
///
/// See [`Monitors::apply_mode`].
pub fn apply_mode(monitor: &mut Monitor, mode: &Mode) -> Result<()> {
    Monitors::new().apply_mode(monitor, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        assert!(init().is_ok());
        deinit();
        assert!(init().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_monitor_serde_roundtrip() {
        use crate::stub::{StubDisplay, StubProvider};

        let display = StubDisplay::new(4, "DELL U2720Q")
            .with_uuid("6A1B2C3D-0000-0000-0000-000000000004")
            .with_size(597.0, 336.0)
            .with_mode(ModeDescriptor {
                id: ModeId(1),
                flags: ModeFlags::USABLE,
                encoding: PixelEncoding::Direct32,
                width: 3840,
                height: 2160,
                refresh_rate: 60.0,
            })
            .with_current(ModeId(1));
        let detected = Monitors::with_provider(StubProvider::new(vec![display]))
            .detect()
            .unwrap();

        let json = serde_json::to_string(&detected[0]).unwrap();
        let restored: Monitor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, detected[0]);
        assert_eq!(restored.current_mode().map(Mode::id), Some(ModeId(1)));
    }
}
