//! Monitor and display mode records produced by detection.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Platform identifier of a physical display.
///
/// Wraps `CGDirectDisplayID` on macOS, the `RROutput` XID on X11 and the
/// adapter index on Windows. Only ever compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayId(pub u64);

/// Platform identifier of a display mode.
///
/// Stable for a single detection pass only. Mode application re-resolves it
/// against a fresh query rather than trusting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModeId(pub u64);

/// A supported resolution/refresh rate combination of a monitor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mode {
    pub(crate) monitor: DisplayId,
    pub(crate) id: ModeId,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Refresh rate in Hz, `0.0` when unknown.
    pub refresh_rate: f64,
}

impl Mode {
    /// The monitor this mode was enumerated for.
    pub fn monitor(&self) -> DisplayId {
        self.monitor
    }

    /// The platform mode identifier.
    pub fn id(&self) -> ModeId {
        self.id
    }

    /// `(width, height)` in pixels.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {:.2}Hz", self.width, self.height, self.refresh_rate)
    }
}

/// A physical display attached to the system.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Monitor {
    pub(crate) id: DisplayId,
    /// Human-readable product name, `"Unknown"` if unavailable.
    pub name: String,
    /// Display UUID, `"Unknown"` if unavailable.
    pub uuid: String,
    /// Physical width in millimeters.
    pub width_mm: f64,
    /// Physical height in millimeters.
    pub height_mm: f64,
    pub(crate) primary: bool,
    pub(crate) modes: Vec<Mode>,
    pub(crate) current: Option<usize>,
}

impl Monitor {
    /// Platform display identifier.
    pub fn id(&self) -> DisplayId {
        self.id
    }

    /// Whether this is the main display.
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Usable modes in OS enumeration order.
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    /// The active mode, if it passed filtering.
    pub fn current_mode(&self) -> Option<&Mode> {
        self.current.and_then(|index| self.modes.get(index))
    }

    /// Find a mode with the exact resolution whose refresh rate is closest to
    /// `refresh_rate`.
    pub fn find_mode(&self, width: u32, height: u32, refresh_rate: f64) -> Option<&Mode> {
        self.modes
            .iter()
            .filter(|mode| mode.width == width && mode.height == height)
            .min_by(|a, b| {
                let da = (a.refresh_rate - refresh_rate).abs();
                let db = (b.refresh_rate - refresh_rate).abs();
                da.total_cmp(&db)
            })
    }

    /// Physical diagonal in inches, `None` if the OS reported no size.
    pub fn diagonal_inches(&self) -> Option<f64> {
        if self.width_mm <= 0.0 || self.height_mm <= 0.0 {
            return None;
        }
        Some(self.width_mm.hypot(self.height_mm) / 25.4)
    }

    /// Point `current` at the mode with `id`, or clear it when the monitor
    /// does not list that mode.
    pub(crate) fn mark_current(&mut self, id: ModeId) {
        self.current = self.modes.iter().position(|mode| mode.id == id);
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)?;
        if self.primary {
            write!(f, " [primary]")?;
        }
        if let Some(mode) = self.current_mode() {
            write!(f, " {mode}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(id: u64, width: u32, height: u32, refresh_rate: f64) -> Mode {
        Mode {
            monitor: DisplayId(1),
            id: ModeId(id),
            width,
            height,
            refresh_rate,
        }
    }

    fn monitor(modes: Vec<Mode>) -> Monitor {
        Monitor {
            id: DisplayId(1),
            name: "Test".into(),
            uuid: "Unknown".into(),
            width_mm: 600.0,
            height_mm: 340.0,
            primary: true,
            modes,
            current: None,
        }
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(mode(1, 1920, 1080, 60.0).to_string(), "1920x1080 @ 60.00Hz");
    }

    #[test]
    fn test_find_mode_nearest_refresh() {
        let m = monitor(vec![
            mode(1, 1920, 1080, 60.0),
            mode(2, 1920, 1080, 144.0),
            mode(3, 2560, 1440, 120.0),
        ]);
        assert_eq!(m.find_mode(1920, 1080, 120.0).map(Mode::id), Some(ModeId(2)));
        assert_eq!(m.find_mode(1920, 1080, 59.94).map(Mode::id), Some(ModeId(1)));
        assert!(m.find_mode(1280, 720, 60.0).is_none());
    }

    #[test]
    fn test_mark_current() {
        let mut m = monitor(vec![mode(1, 1920, 1080, 60.0), mode(2, 1280, 720, 60.0)]);
        assert!(m.current_mode().is_none());

        m.mark_current(ModeId(2));
        assert_eq!(m.current_mode().map(Mode::id), Some(ModeId(2)));

        // The active mode is no longer one of ours
        m.mark_current(ModeId(9));
        assert!(m.current_mode().is_none());
    }

    #[test]
    fn test_diagonal_inches() {
        let m = monitor(Vec::new());
        let diagonal = m.diagonal_inches().unwrap();
        assert!((diagonal - 27.15).abs() < 0.01);

        let mut unknown = monitor(Vec::new());
        unknown.width_mm = 0.0;
        assert!(unknown.diagonal_inches().is_none());
    }
}
