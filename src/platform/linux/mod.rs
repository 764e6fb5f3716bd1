//! Linux platform implementation.
//!
//! ## Feature Flags
//!
//! - `x11` (default): Use XRandR for outputs and modes, DPMS for sleep state
//!
//! Without `x11` every query reports [`Error::NotSupported`](crate::Error).

#[cfg(feature = "x11")]
mod x11;

#[cfg(feature = "x11")]
pub use x11::*;

#[cfg(not(feature = "x11"))]
mod stub {
    use crate::error::{Error, Result};
    use crate::monitor::{DisplayId, ModeId};
    use crate::provider::{DisplayProvider, ModeDescriptor, PhysicalSize, RefreshPeriod};

    const NO_BACKEND: &str = "No Linux display backend enabled. Enable the 'x11' feature.";

    /// Placeholder when no Linux backend is compiled in.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemDisplays;

    impl DisplayProvider for SystemDisplays {
        type Mode = ModeDescriptor;

        fn online_displays(&self) -> Result<Vec<DisplayId>> {
            Err(Error::NotSupported(NO_BACKEND.into()))
        }

        fn is_asleep(&self, _display: DisplayId) -> bool {
            false
        }

        fn name(&self, _display: DisplayId) -> Option<String> {
            None
        }

        fn uuid(&self, _display: DisplayId) -> Option<String> {
            None
        }

        fn physical_size(&self, _display: DisplayId) -> PhysicalSize {
            PhysicalSize::default()
        }

        fn is_primary(&self, _display: DisplayId) -> bool {
            false
        }

        fn current_mode_id(&self, _display: DisplayId) -> Option<ModeId> {
            None
        }

        fn modes(&self, _display: DisplayId) -> Result<Vec<ModeDescriptor>> {
            Err(Error::NotSupported(NO_BACKEND.into()))
        }

        fn nominal_refresh_period(&self, _display: DisplayId) -> Option<RefreshPeriod> {
            None
        }

        fn set_mode(&self, _display: DisplayId, _mode: &ModeDescriptor) -> Result<()> {
            Err(Error::NotSupported(NO_BACKEND.into()))
        }
    }
}

#[cfg(not(feature = "x11"))]
pub use stub::*;
