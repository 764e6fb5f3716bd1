//! Detection and mode application on top of a [`DisplayProvider`].

use crate::error::{Error, Result};
use crate::filter;
use crate::monitor::{DisplayId, Mode, Monitor};
use crate::platform::SystemDisplays;
use crate::provider::{DisplayProvider, RawMode};

const UNKNOWN: &str = "Unknown";

/// Entry point for detecting monitors and switching their modes.
///
/// `Monitors::new()` talks to the OS; [`Monitors::with_provider`] accepts any
/// [`DisplayProvider`], such as [`StubProvider`](crate::stub::StubProvider).
///
/// # Example
///
/// ```no_run
/// use monitors::Monitors;
///
/// let monitors = Monitors::new();
/// for mut monitor in monitors.detect()? {
///     let Some(mode) = monitor.find_mode(1920, 1080, 60.0).cloned() else {
///         continue;
///     };
///     monitors.apply_mode(&mut monitor, &mode)?;
/// }
/// # Ok::<(), monitors::Error>(())
/// ```
#[derive(Debug)]
pub struct Monitors<P: DisplayProvider = SystemDisplays> {
    provider: P,
}

impl Default for Monitors<SystemDisplays> {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitors<SystemDisplays> {
    /// Create an instance backed by the OS display services.
    pub fn new() -> Self {
        Self::with_provider(SystemDisplays::default())
    }
}

impl<P: DisplayProvider> Monitors<P> {
    /// Create an instance backed by `provider`.
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Enumerate every awake display with its usable modes.
    ///
    /// Sleeping displays are skipped. Name and UUID lookups that fail fall
    /// back to `"Unknown"`, and a display whose mode list cannot be read is
    /// returned with no modes. The only error is a failure to list displays
    /// at all.
    pub fn detect(&self) -> Result<Vec<Monitor>> {
        let displays = self.provider.online_displays()?;

        let mut monitors = Vec::with_capacity(displays.len());
        for display in displays {
            if self.provider.is_asleep(display) {
                log::debug!("Skipping display {} (asleep)", display.0);
                continue;
            }
            monitors.push(self.detect_monitor(display));
        }
        Ok(monitors)
    }

    fn detect_monitor(&self, display: DisplayId) -> Monitor {
        let size = self.provider.physical_size(display);
        let mut monitor = Monitor {
            id: display,
            name: self
                .provider
                .name(display)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            uuid: self
                .provider
                .uuid(display)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            width_mm: size.width_mm,
            height_mm: size.height_mm,
            primary: self.provider.is_primary(display),
            modes: Vec::new(),
            current: None,
        };
        self.detect_modes(&mut monitor);

        log::debug!(
            "Detected display {} \"{}\": {} usable modes, current {:?}",
            display.0,
            monitor.name,
            monitor.modes.len(),
            monitor.current_mode().map(ToString::to_string)
        );
        monitor
    }

    fn detect_modes(&self, monitor: &mut Monitor) {
        let display = monitor.id;
        let current = self.provider.current_mode_id(display);
        let nominal = self.provider.nominal_refresh_period(display);

        let raw_modes = match self.provider.modes(display) {
            Ok(modes) => modes,
            Err(e) => {
                log::warn!("Could not read modes of display {}: {}", display.0, e);
                return;
            }
        };

        for raw in &raw_modes {
            let raw = raw.describe();
            let Some(mode) = filter::to_mode(display, &raw, nominal) else {
                continue;
            };
            if monitor.current.is_none() && current == Some(mode.id) {
                monitor.current = Some(monitor.modes.len());
            }
            monitor.modes.push(mode);
        }
    }

    /// Switch `monitor` to `mode`.
    ///
    /// Returns immediately if `mode` is already current. Otherwise the mode
    /// list is queried again and the mode is located by identifier, so a
    /// display reconfigured since detection yields [`Error::ModeNotFound`]
    /// rather than a stale switch. A display whose mode list can no longer
    /// be read counts as reconfigured. On success `monitor`'s current mode is
    /// updated.
    pub fn apply_mode(&self, monitor: &mut Monitor, mode: &Mode) -> Result<()> {
        if mode.monitor != monitor.id {
            return Err(Error::ForeignMode);
        }
        if monitor.current_mode().is_some_and(|current| current.id == mode.id) {
            return Ok(());
        }

        let raw_modes = self.provider.modes(monitor.id).map_err(|e| {
            log::warn!("Could not re-read modes of display {}: {}", monitor.id.0, e);
            Error::ModeNotFound
        })?;
        let chosen = raw_modes
            .iter()
            .find(|raw| raw.describe().id == mode.id)
            .ok_or(Error::ModeNotFound)?;

        self.provider
            .set_mode(monitor.id, chosen)
            .map_err(|e| match e {
                rejected @ Error::Rejected(_) => rejected,
                other => Error::Rejected(other.to_string()),
            })?;

        log::info!("Display {} switched to {}", monitor.id.0, mode);
        monitor.mark_current(mode.id);
        Ok(())
    }
}
