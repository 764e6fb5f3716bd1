//! The platform display capability that detection and mode switching run on.
//!
//! Every backend (CoreGraphics, GDI, XRandR) and the in-memory
//! [`StubProvider`](crate::stub::StubProvider) implements [`DisplayProvider`].
//! The provider only reports raw OS facts; filtering, refresh recovery and
//! current-mode matching live in [`crate::filter`] and [`crate::Monitors`].

use crate::error::Result;
use crate::monitor::{DisplayId, ModeId};

// IOKit display mode flags (IOGraphicsTypes.h)
/// Mode is valid for the attached display.
pub const MODE_VALID: u32 = 0x0000_0001;
/// Mode is safe to use without risk of damage to the display.
pub const MODE_SAFE: u32 = 0x0000_0002;
/// Mode is the display's default.
pub const MODE_DEFAULT: u32 = 0x0000_0004;
/// Mode is interlaced.
pub const MODE_INTERLACED: u32 = 0x0000_0040;
/// Mode is stretched (non-native aspect).
pub const MODE_STRETCHED: u32 = 0x0000_0400;

/// Raw mode flag set as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModeFlags(pub u32);

impl ModeFlags {
    /// Flags of an ordinary usable mode.
    pub const USABLE: ModeFlags = ModeFlags(MODE_VALID | MODE_SAFE);

    /// Check whether every bit of `mask` is set.
    #[inline]
    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    /// Return a copy with the bits of `mask` set.
    #[inline]
    pub fn with(self, mask: u32) -> Self {
        ModeFlags(self.0 | mask)
    }

    /// Return a copy with the bits of `mask` cleared.
    #[inline]
    pub fn without(self, mask: u32) -> Self {
        ModeFlags(self.0 & !mask)
    }
}

/// IOKit pixel layout string of 16-bit direct color.
pub const IO_16BIT_DIRECT_PIXELS: &str = "-RRRRRGGGGGBBBBB";
/// IOKit pixel layout string of 32-bit direct color.
pub const IO_32BIT_DIRECT_PIXELS: &str = "--------RRRRRRRRGGGGGGGGBBBBBBBB";

/// Pixel layout of a mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PixelEncoding {
    /// 16-bit direct RGB.
    Direct16,
    /// 32-bit direct RGB.
    Direct32,
    /// Anything else, kept verbatim.
    Other(String),
}

impl PixelEncoding {
    /// Classify an IOKit pixel layout string.
    pub fn from_io_layout(layout: &str) -> Self {
        match layout {
            IO_16BIT_DIRECT_PIXELS => PixelEncoding::Direct16,
            IO_32BIT_DIRECT_PIXELS => PixelEncoding::Direct32,
            other => PixelEncoding::Other(other.to_string()),
        }
    }

    /// Classify a bits-per-pixel depth.
    pub fn from_depth(bits: u32) -> Self {
        match bits {
            16 => PixelEncoding::Direct16,
            24 | 32 => PixelEncoding::Direct32,
            other => PixelEncoding::Other(format!("{other}bpp")),
        }
    }
}

/// Everything the OS reports about one raw mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeDescriptor {
    /// Platform mode identifier.
    pub id: ModeId,
    /// Raw flag set.
    pub flags: ModeFlags,
    /// Pixel layout.
    pub encoding: PixelEncoding,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Refresh rate in Hz as reported, `0.0` if the OS does not know.
    pub refresh_rate: f64,
}

/// Nominal output video refresh period (CoreVideo `CVTime` shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPeriod {
    /// Period length in units of `time_scale`.
    pub time_value: i64,
    /// Units per second.
    pub time_scale: i32,
    /// The period is indefinite and must not be used.
    pub indefinite: bool,
}

impl RefreshPeriod {
    /// Refresh rate in Hz implied by this period.
    ///
    /// `None` when the period is indefinite or zero-length.
    pub fn rate(&self) -> Option<f64> {
        if self.indefinite || self.time_value == 0 {
            return None;
        }
        Some(self.time_scale as f64 / self.time_value as f64)
    }
}

/// Physical size of a display in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalSize {
    /// Width in millimeters.
    pub width_mm: f64,
    /// Height in millimeters.
    pub height_mm: f64,
}

/// A raw mode handle returned by a provider's mode query.
///
/// Backends keep whatever OS handle `set_mode` needs alive inside it; the
/// handle is released when the value is dropped.
pub trait RawMode {
    /// Describe the mode for filtering.
    fn describe(&self) -> ModeDescriptor;
}

impl RawMode for ModeDescriptor {
    fn describe(&self) -> ModeDescriptor {
        self.clone()
    }
}

/// Access to the OS display services.
///
/// Calls are synchronous and blocking. Lookups that cannot fail in a way the
/// caller cares about return `Option`/`bool`; the caller applies defaults.
pub trait DisplayProvider {
    /// Raw mode handle type.
    type Mode: RawMode;

    /// List the online physical displays in OS order.
    fn online_displays(&self) -> Result<Vec<DisplayId>>;

    /// Whether the display is asleep.
    fn is_asleep(&self, display: DisplayId) -> bool;

    /// Human-readable product name.
    fn name(&self, display: DisplayId) -> Option<String>;

    /// Display UUID string.
    fn uuid(&self, display: DisplayId) -> Option<String>;

    /// Physical size in millimeters (zero when unknown).
    fn physical_size(&self, display: DisplayId) -> PhysicalSize;

    /// Whether the display is the main display.
    fn is_primary(&self, display: DisplayId) -> bool;

    /// Identifier of the active mode.
    fn current_mode_id(&self, display: DisplayId) -> Option<ModeId>;

    /// Query the full, unfiltered mode list.
    fn modes(&self, display: DisplayId) -> Result<Vec<Self::Mode>>;

    /// Nominal output video refresh period, if the platform has one.
    fn nominal_refresh_period(&self, display: DisplayId) -> Option<RefreshPeriod>;

    /// Ask the OS to switch `display` to `mode`.
    fn set_mode(&self, display: DisplayId, mode: &Self::Mode) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        let flags = ModeFlags::USABLE.with(MODE_INTERLACED);
        assert!(flags.contains(MODE_VALID | MODE_SAFE));
        assert!(flags.contains(MODE_INTERLACED));
        assert!(!flags.contains(MODE_STRETCHED));

        let flags = flags.without(MODE_INTERLACED);
        assert_eq!(flags, ModeFlags::USABLE);
    }

    #[test]
    fn test_pixel_encoding_from_io_layout() {
        assert_eq!(
            PixelEncoding::from_io_layout("-RRRRRGGGGGBBBBB"),
            PixelEncoding::Direct16
        );
        assert_eq!(
            PixelEncoding::from_io_layout("--------RRRRRRRRGGGGGGGGBBBBBBBB"),
            PixelEncoding::Direct32
        );
        assert_eq!(
            PixelEncoding::from_io_layout("--RRRRRRRRRRGGGGGGGGGGBBBBBBBBBB"),
            PixelEncoding::Other("--RRRRRRRRRRGGGGGGGGGGBBBBBBBBBB".into())
        );
    }

    #[test]
    fn test_pixel_encoding_from_depth() {
        assert_eq!(PixelEncoding::from_depth(16), PixelEncoding::Direct16);
        assert_eq!(PixelEncoding::from_depth(24), PixelEncoding::Direct32);
        assert_eq!(PixelEncoding::from_depth(32), PixelEncoding::Direct32);
        assert_eq!(PixelEncoding::from_depth(8), PixelEncoding::Other("8bpp".into()));
    }

    #[test]
    fn test_refresh_period_rate() {
        let period = RefreshPeriod {
            time_value: 1001,
            time_scale: 60000,
            indefinite: false,
        };
        assert_eq!(period.rate(), Some(60000.0 / 1001.0));

        let indefinite = RefreshPeriod {
            indefinite: true,
            ..period
        };
        assert_eq!(indefinite.rate(), None);

        let empty = RefreshPeriod {
            time_value: 0,
            ..period
        };
        assert_eq!(empty.rate(), None);
    }
}
