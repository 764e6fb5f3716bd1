//! In-memory display provider.
//!
//! Useful for exercising detection and mode switching without hardware.
//!
//! ```
//! use monitors::stub::{StubDisplay, StubProvider};
//! use monitors::{ModeDescriptor, ModeFlags, ModeId, Monitors, PixelEncoding};
//!
//! let display = StubDisplay::new(1, "Studio Display")
//!     .with_mode(ModeDescriptor {
//!         id: ModeId(1),
//!         flags: ModeFlags::USABLE,
//!         encoding: PixelEncoding::Direct32,
//!         width: 2560,
//!         height: 1440,
//!         refresh_rate: 60.0,
//!     })
//!     .with_current(ModeId(1));
//!
//! let monitors = Monitors::with_provider(StubProvider::new(vec![display]));
//! let detected = monitors.detect().unwrap();
//! assert_eq!(detected[0].modes().len(), 1);
//! ```

use crate::error::{Error, Result};
use crate::monitor::{DisplayId, ModeId};
use crate::provider::{DisplayProvider, ModeDescriptor, PhysicalSize, RefreshPeriod};
use std::cell::RefCell;

/// A fabricated display.
#[derive(Debug, Clone)]
pub struct StubDisplay {
    /// Display identifier.
    pub id: DisplayId,
    /// Product name, `None` simulates a failed lookup.
    pub name: Option<String>,
    /// UUID, `None` simulates a failed lookup.
    pub uuid: Option<String>,
    /// Physical size.
    pub size: PhysicalSize,
    /// Main display flag.
    pub primary: bool,
    /// Sleep state.
    pub asleep: bool,
    /// Raw modes in OS order.
    pub modes: Vec<ModeDescriptor>,
    /// Active mode identifier.
    pub current: Option<ModeId>,
    /// Nominal output video refresh period.
    pub nominal_period: Option<RefreshPeriod>,
}

impl StubDisplay {
    /// Create an awake, non-primary display with no modes.
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id: DisplayId(id),
            name: Some(name.to_string()),
            uuid: None,
            size: PhysicalSize::default(),
            primary: false,
            asleep: false,
            modes: Vec::new(),
            current: None,
            nominal_period: None,
        }
    }

    /// Append a raw mode.
    pub fn with_mode(mut self, mode: ModeDescriptor) -> Self {
        self.modes.push(mode);
        self
    }

    /// Set the active mode.
    pub fn with_current(mut self, id: ModeId) -> Self {
        self.current = Some(id);
        self
    }

    /// Set the nominal refresh period.
    pub fn with_nominal_period(mut self, period: RefreshPeriod) -> Self {
        self.nominal_period = Some(period);
        self
    }

    /// Set the UUID.
    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    /// Set the physical size.
    pub fn with_size(mut self, width_mm: f64, height_mm: f64) -> Self {
        self.size = PhysicalSize {
            width_mm,
            height_mm,
        };
        self
    }

    /// Mark as the main display.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Mark as asleep.
    pub fn asleep(mut self) -> Self {
        self.asleep = true;
        self
    }
}

/// Provider backed by a list of [`StubDisplay`]s.
///
/// Successful `set_mode` calls update the display's active mode, so a second
/// detection pass observes the switch.
#[derive(Debug, Default)]
pub struct StubProvider {
    displays: RefCell<Vec<StubDisplay>>,
    set_calls: RefCell<Vec<(DisplayId, ModeId)>>,
    unreadable_modes: RefCell<Vec<DisplayId>>,
    reject_switches: bool,
    enumeration_fails: bool,
}

impl StubProvider {
    /// Create a provider reporting `displays`.
    pub fn new(displays: Vec<StubDisplay>) -> Self {
        Self {
            displays: RefCell::new(displays),
            ..Default::default()
        }
    }

    /// Make every `set_mode` call fail as if the OS refused it.
    pub fn rejecting_switches(mut self) -> Self {
        self.reject_switches = true;
        self
    }

    /// Make the display list query fail.
    pub fn failing_enumeration(mut self) -> Self {
        self.enumeration_fails = true;
        self
    }

    /// Make the mode list query of `display` fail.
    pub fn failing_modes(self, display: DisplayId) -> Self {
        self.fail_modes(display);
        self
    }

    /// Make the mode list query of `display` fail from now on, simulating a
    /// display that went away after detection.
    pub fn fail_modes(&self, display: DisplayId) {
        self.unreadable_modes.borrow_mut().push(display);
    }

    /// Every `set_mode` call made so far, in order.
    pub fn set_calls(&self) -> Vec<(DisplayId, ModeId)> {
        self.set_calls.borrow().clone()
    }

    /// Replace a display's raw mode list, simulating external
    /// reconfiguration.
    pub fn replace_modes(&self, display: DisplayId, modes: Vec<ModeDescriptor>) {
        if let Some(entry) = self
            .displays
            .borrow_mut()
            .iter_mut()
            .find(|entry| entry.id == display)
        {
            entry.modes = modes;
        }
    }

    fn with_display<T>(
        &self,
        display: DisplayId,
        f: impl FnOnce(&StubDisplay) -> T,
    ) -> Option<T> {
        self.displays
            .borrow()
            .iter()
            .find(|entry| entry.id == display)
            .map(f)
    }
}

impl DisplayProvider for StubProvider {
    type Mode = ModeDescriptor;

    fn online_displays(&self) -> Result<Vec<DisplayId>> {
        if self.enumeration_fails {
            return Err(Error::EnumerationUnavailable(
                "stub display list unavailable".into(),
            ));
        }
        Ok(self.displays.borrow().iter().map(|entry| entry.id).collect())
    }

    fn is_asleep(&self, display: DisplayId) -> bool {
        self.with_display(display, |entry| entry.asleep).unwrap_or(false)
    }

    fn name(&self, display: DisplayId) -> Option<String> {
        self.with_display(display, |entry| entry.name.clone()).flatten()
    }

    fn uuid(&self, display: DisplayId) -> Option<String> {
        self.with_display(display, |entry| entry.uuid.clone()).flatten()
    }

    fn physical_size(&self, display: DisplayId) -> PhysicalSize {
        self.with_display(display, |entry| entry.size).unwrap_or_default()
    }

    fn is_primary(&self, display: DisplayId) -> bool {
        self.with_display(display, |entry| entry.primary).unwrap_or(false)
    }

    fn current_mode_id(&self, display: DisplayId) -> Option<ModeId> {
        self.with_display(display, |entry| entry.current).flatten()
    }

    fn modes(&self, display: DisplayId) -> Result<Vec<ModeDescriptor>> {
        if self.unreadable_modes.borrow().contains(&display) {
            return Err(Error::Platform(format!(
                "stub mode list of display {} unavailable",
                display.0
            )));
        }
        self.with_display(display, |entry| entry.modes.clone())
            .ok_or_else(|| Error::Platform(format!("unknown display {}", display.0)))
    }

    fn nominal_refresh_period(&self, display: DisplayId) -> Option<RefreshPeriod> {
        self.with_display(display, |entry| entry.nominal_period).flatten()
    }

    fn set_mode(&self, display: DisplayId, mode: &ModeDescriptor) -> Result<()> {
        self.set_calls.borrow_mut().push((display, mode.id));
        if self.reject_switches {
            return Err(Error::Rejected("stub refused the switch".into()));
        }
        if let Some(entry) = self
            .displays
            .borrow_mut()
            .iter_mut()
            .find(|entry| entry.id == display)
        {
            entry.current = Some(mode.id);
        }
        Ok(())
    }
}
