//! X11 display queries via XRandR and DPMS.

use crate::error::{Error, Result};
use crate::monitor::{DisplayId, ModeId};
use crate::provider::{
    DisplayProvider, MODE_INTERLACED, ModeDescriptor, ModeFlags, PhysicalSize, PixelEncoding,
    RefreshPeriod,
};
use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::{c_int, c_ulong};
use std::ptr::null;
use std::slice;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use x11::{dpms, xlib, xrandr};

const RR_CONNECTED: u16 = 0;
const RR_INTERLACE: c_ulong = 0x0000_0010;
const RR_DOUBLE_SCAN: c_ulong = 0x0000_0020;
const RR_ROTATE_90: u16 = 0x0002;
const RR_ROTATE_270: u16 = 0x0008;
const DPMS_MODE_ON: u16 = 0;

/// Error code of the last X protocol error seen while trapping, 0 if none.
static X_ERROR: AtomicU8 = AtomicU8::new(0);
/// Serializes use of the process-wide Xlib error handler.
static X_ERROR_TRAP: Mutex<()> = Mutex::new(());

unsafe extern "C" fn record_x_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if let Some(event) = unsafe { event.as_ref() } {
        X_ERROR.store(event.error_code, Ordering::SeqCst);
    }
    0
}

fn take_x_error() -> Option<u8> {
    match X_ERROR.swap(0, Ordering::SeqCst) {
        0 => None,
        code => Some(code),
    }
}

/// An open Xlib connection, closed on drop.
#[derive(Debug)]
struct Connection {
    raw: *mut xlib::Display,
}

impl Connection {
    fn open() -> Result<Self> {
        let raw = unsafe { xlib::XOpenDisplay(null()) };
        if raw.is_null() {
            return Err(Error::Platform("XOpenDisplay failed".into()));
        }
        Ok(Self { raw })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe { xlib::XCloseDisplay(self.raw) };
    }
}

/// Outputs reported by XRandR on the default screen.
///
/// The X connection is opened on first use and shared by every query made
/// through this value.
#[derive(Debug, Default)]
pub struct SystemDisplays {
    connection: RefCell<Option<Connection>>,
}

impl SystemDisplays {
    fn connection(&self) -> Result<*mut xlib::Display> {
        let mut slot = self.connection.borrow_mut();
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.raw);
        }
        let connection = Connection::open()?;
        let raw = connection.raw;
        *slot = Some(connection);
        Ok(raw)
    }

    /// Run `f` on the shared connection with X protocol errors trapped.
    ///
    /// A protocol error raised by a request `f` makes is returned as
    /// [`Error::Platform`] instead of reaching Xlib's default handler.
    fn with_display<T>(&self, f: impl FnOnce(*mut xlib::Display) -> Result<T>) -> Result<T> {
        let display = self.connection()?;
        let _trap = X_ERROR_TRAP.lock().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            xlib::XSync(display, xlib::False);
            take_x_error();
            let previous = xlib::XSetErrorHandler(Some(record_x_error));
            let result = f(display);
            xlib::XSync(display, xlib::False);
            xlib::XSetErrorHandler(previous);
            match (result, take_x_error()) {
                (Ok(_), Some(code)) => Err(Error::Platform(format!("X protocol error {code}"))),
                (result, _) => result,
            }
        }
    }

    /// Run `f` on the output info of `display`.
    fn with_output<T>(
        &self,
        display: DisplayId,
        f: impl FnOnce(*mut xlib::Display, &ScreenResources, &OutputInfo) -> Result<T>,
    ) -> Result<T> {
        self.with_display(|connection| {
            let resources = ScreenResources::new(connection)?;
            let output = resources
                .output(output_id(display))
                .ok_or_else(|| Error::Platform(format!("no XRandR output {}", display.0)))?;
            f(connection, &resources, &output)
        })
    }
}

/// Borrow `len` items at `ptr`, empty when null.
///
/// # Safety
///
/// `ptr` must point to `len` initialized items that outlive the slice.
unsafe fn raw_slice<'a, T>(ptr: *const T, len: c_int) -> &'a [T] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(ptr, len as usize) }
    }
}

/// Screen resources of the default root window, freed on drop.
struct ScreenResources {
    display: *mut xlib::Display,
    raw: *mut xrandr::XRRScreenResources,
}

impl ScreenResources {
    fn new(display: *mut xlib::Display) -> Result<Self> {
        let raw = unsafe {
            let root = xlib::XDefaultRootWindow(display);
            xrandr::XRRGetScreenResourcesCurrent(display, root)
        };
        if raw.is_null() {
            return Err(Error::Platform("XRRGetScreenResourcesCurrent failed".into()));
        }
        Ok(Self { display, raw })
    }

    fn outputs(&self) -> &[xrandr::RROutput] {
        unsafe { raw_slice((*self.raw).outputs, (*self.raw).noutput) }
    }

    fn modes(&self) -> &[xrandr::XRRModeInfo] {
        unsafe { raw_slice((*self.raw).modes, (*self.raw).nmode) }
    }

    fn output(&self, output: xrandr::RROutput) -> Option<OutputInfo> {
        let raw = unsafe { xrandr::XRRGetOutputInfo(self.display, self.raw, output) };
        (!raw.is_null()).then_some(OutputInfo { raw })
    }

    fn crtc(&self, crtc: xrandr::RRCrtc) -> Option<CrtcInfo> {
        if crtc == 0 {
            return None;
        }
        let raw = unsafe { xrandr::XRRGetCrtcInfo(self.display, self.raw, crtc) };
        (!raw.is_null()).then_some(CrtcInfo { raw })
    }
}

impl Drop for ScreenResources {
    fn drop(&mut self) {
        unsafe { xrandr::XRRFreeScreenResources(self.raw) };
    }
}

/// Output info, freed on drop.
struct OutputInfo {
    raw: *mut xrandr::XRROutputInfo,
}

impl OutputInfo {
    fn info(&self) -> &xrandr::XRROutputInfo {
        unsafe { &*self.raw }
    }

    fn name(&self) -> Option<String> {
        let info = self.info();
        if info.name.is_null() {
            return None;
        }
        let name = unsafe { CStr::from_ptr(info.name) };
        Some(name.to_string_lossy().into_owned())
    }

    fn mode_ids(&self) -> &[xrandr::RRMode] {
        let info = self.info();
        unsafe { raw_slice(info.modes, info.nmode) }
    }
}

impl Drop for OutputInfo {
    fn drop(&mut self) {
        unsafe { xrandr::XRRFreeOutputInfo(self.raw) };
    }
}

/// CRTC info, freed on drop.
struct CrtcInfo {
    raw: *mut xrandr::XRRCrtcInfo,
}

impl CrtcInfo {
    fn info(&self) -> &xrandr::XRRCrtcInfo {
        unsafe { &*self.raw }
    }
}

impl Drop for CrtcInfo {
    fn drop(&mut self) {
        unsafe { xrandr::XRRFreeCrtcInfo(self.raw) };
    }
}

fn output_id(display: DisplayId) -> xrandr::RROutput {
    display.0 as xrandr::RROutput
}

/// Refresh rate of an XRandR mode line in Hz.
fn mode_refresh_rate(mode: &xrandr::XRRModeInfo) -> f64 {
    let mut vtotal = mode.vTotal as f64;
    if mode.modeFlags & RR_DOUBLE_SCAN != 0 {
        vtotal *= 2.0;
    }
    if mode.modeFlags & RR_INTERLACE != 0 {
        vtotal /= 2.0;
    }
    let htotal = mode.hTotal as f64;
    if htotal == 0.0 || vtotal == 0.0 {
        return 0.0;
    }
    mode.dotClock as f64 / (htotal * vtotal)
}

fn describe(mode: &xrandr::XRRModeInfo, encoding: &PixelEncoding) -> ModeDescriptor {
    // XRandR only lists modes the output accepts
    let mut flags = ModeFlags::USABLE;
    if mode.modeFlags & RR_INTERLACE != 0 {
        flags = flags.with(MODE_INTERLACED);
    }
    ModeDescriptor {
        id: ModeId(mode.id as u64),
        flags,
        encoding: encoding.clone(),
        width: mode.width,
        height: mode.height,
        refresh_rate: mode_refresh_rate(mode),
    }
}

fn screen_encoding(display: *mut xlib::Display) -> PixelEncoding {
    let depth = unsafe { xlib::XDefaultDepth(display, xlib::XDefaultScreen(display)) };
    PixelEncoding::from_depth(depth.max(0) as u32)
}

impl DisplayProvider for SystemDisplays {
    type Mode = ModeDescriptor;

    fn online_displays(&self) -> Result<Vec<DisplayId>> {
        self.with_display(|display| {
            let resources = ScreenResources::new(display)?;
            Ok(resources
                .outputs()
                .iter()
                .filter(|&&output| {
                    resources
                        .output(output)
                        .is_some_and(|info| info.info().connection == RR_CONNECTED)
                })
                .map(|&output| DisplayId(output as u64))
                .collect())
        })
        .map_err(|e| Error::EnumerationUnavailable(e.to_string()))
    }

    fn is_asleep(&self, _display: DisplayId) -> bool {
        // DPMS is per X screen, so every output sleeps together
        self.with_display(|display| unsafe {
            let mut level: u16 = 0;
            let mut enabled: u8 = 0;
            if dpms::DPMSCapable(display) == 0 {
                return Ok(false);
            }
            if dpms::DPMSInfo(display, &mut level, &mut enabled) == 0 {
                return Ok(false);
            }
            Ok(enabled != 0 && level != DPMS_MODE_ON)
        })
        .unwrap_or(false)
    }

    fn name(&self, display: DisplayId) -> Option<String> {
        self.with_output(display, |_, _, output| Ok(output.name()))
            .ok()
            .flatten()
    }

    fn uuid(&self, _display: DisplayId) -> Option<String> {
        None
    }

    fn physical_size(&self, display: DisplayId) -> PhysicalSize {
        self.with_output(display, |_, _, output| {
            let info = output.info();
            Ok(PhysicalSize {
                width_mm: info.mm_width as f64,
                height_mm: info.mm_height as f64,
            })
        })
        .unwrap_or_default()
    }

    fn is_primary(&self, display: DisplayId) -> bool {
        self.with_display(|connection| unsafe {
            let root = xlib::XDefaultRootWindow(connection);
            Ok(xrandr::XRRGetOutputPrimary(connection, root) == output_id(display))
        })
        .unwrap_or(false)
    }

    fn current_mode_id(&self, display: DisplayId) -> Option<ModeId> {
        self.with_output(display, |_, resources, output| {
            Ok(resources
                .crtc(output.info().crtc)
                .map(|crtc| ModeId(crtc.info().mode as u64)))
        })
        .ok()
        .flatten()
    }

    fn modes(&self, display: DisplayId) -> Result<Vec<ModeDescriptor>> {
        self.with_output(display, |connection, resources, output| {
            let encoding = screen_encoding(connection);
            let all = resources.modes();
            Ok(output
                .mode_ids()
                .iter()
                .filter_map(|id| all.iter().find(|mode| mode.id == *id))
                .map(|mode| describe(mode, &encoding))
                .collect())
        })
    }

    fn nominal_refresh_period(&self, _display: DisplayId) -> Option<RefreshPeriod> {
        None
    }

    fn set_mode(&self, display: DisplayId, mode: &ModeDescriptor) -> Result<()> {
        self.with_output(display, |connection, resources, output| {
            let crtc_id = output.info().crtc;
            let crtc = resources
                .crtc(crtc_id)
                .ok_or_else(|| Error::Rejected(format!("output {} has no CRTC", display.0)))?;
            let info = crtc.info();

            let screen = screen_size(connection);
            let required = required_screen_size(
                screen,
                (info.x, info.y),
                (mode.width, mode.height),
                info.rotation,
            );
            if required != screen {
                grow_screen(connection, screen, required)?;
            }

            let status = unsafe {
                xrandr::XRRSetCrtcConfig(
                    connection,
                    resources.raw,
                    crtc_id,
                    xlib::CurrentTime,
                    info.x,
                    info.y,
                    mode.id.0 as xrandr::RRMode,
                    info.rotation,
                    info.outputs,
                    info.noutput,
                )
            };
            if status != 0 {
                return Err(Error::Rejected(format!(
                    "XRRSetCrtcConfig failed: {}",
                    status
                )));
            }
            Ok(())
        })
    }
}

fn screen_size(display: *mut xlib::Display) -> (u32, u32) {
    unsafe {
        let screen = xlib::XDefaultScreen(display);
        (
            xlib::XDisplayWidth(display, screen).max(0) as u32,
            xlib::XDisplayHeight(display, screen).max(0) as u32,
        )
    }
}

/// Screen size in pixels needed to show a `mode` sized CRTC at `origin`.
fn required_screen_size(
    screen: (u32, u32),
    origin: (c_int, c_int),
    mode: (u32, u32),
    rotation: u16,
) -> (u32, u32) {
    let (width, height) = if rotation & (RR_ROTATE_90 | RR_ROTATE_270) != 0 {
        (mode.1, mode.0)
    } else {
        mode
    };
    let right = origin.0.max(0) as u32 + width;
    let bottom = origin.1.max(0) as u32 + height;
    (screen.0.max(right), screen.1.max(bottom))
}

/// Grow the X screen to `size`, keeping its physical DPI.
fn grow_screen(display: *mut xlib::Display, current: (u32, u32), size: (u32, u32)) -> Result<()> {
    let (mut min_width, mut min_height, mut max_width, mut max_height) = (0, 0, 0, 0);
    unsafe {
        let root = xlib::XDefaultRootWindow(display);
        let status = xrandr::XRRGetScreenSizeRange(
            display,
            root,
            &mut min_width,
            &mut min_height,
            &mut max_width,
            &mut max_height,
        );
        if status == 0 {
            return Err(Error::Rejected("XRRGetScreenSizeRange failed".into()));
        }
        if size.0 as c_int > max_width || size.1 as c_int > max_height {
            return Err(Error::Rejected(format!(
                "{}x{} exceeds the maximum screen size {}x{}",
                size.0, size.1, max_width, max_height
            )));
        }

        let screen = xlib::XDefaultScreen(display);
        let width_mm = scale_mm(xlib::XDisplayWidthMM(display, screen), current.0, size.0);
        let height_mm = scale_mm(xlib::XDisplayHeightMM(display, screen), current.1, size.1);
        log::debug!(
            "Growing X screen from {}x{} to {}x{}",
            current.0,
            current.1,
            size.0,
            size.1
        );
        xrandr::XRRSetScreenSize(
            display,
            root,
            size.0 as c_int,
            size.1 as c_int,
            width_mm,
            height_mm,
        );
    }
    Ok(())
}

fn scale_mm(mm: c_int, from: u32, to: u32) -> c_int {
    if from == 0 {
        return mm;
    }
    (mm as f64 * to as f64 / from as f64).round() as c_int
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr::null_mut;

    fn mode_line(
        dot_clock: c_ulong,
        h_total: u32,
        v_total: u32,
        flags: c_ulong,
    ) -> xrandr::XRRModeInfo {
        xrandr::XRRModeInfo {
            id: 0x45,
            width: 1920,
            height: 1080,
            dotClock: dot_clock,
            hSyncStart: 0,
            hSyncEnd: 0,
            hTotal: h_total,
            hSkew: 0,
            vSyncStart: 0,
            vSyncEnd: 0,
            vTotal: v_total,
            name: null_mut(),
            nameLength: 0,
            modeFlags: flags,
        }
    }

    #[test]
    fn test_mode_refresh_rate() {
        // CEA 1080p60
        let mode = mode_line(148_500_000, 2200, 1125, 0);
        assert!((mode_refresh_rate(&mode) - 60.0).abs() < 1e-9);

        let interlaced = mode_line(74_250_000, 2200, 1125, RR_INTERLACE);
        assert!((mode_refresh_rate(&interlaced) - 60.0).abs() < 1e-9);

        let double_scan = mode_line(148_500_000, 2200, 1125, RR_DOUBLE_SCAN);
        assert!((mode_refresh_rate(&double_scan) - 30.0).abs() < 1e-9);

        assert_eq!(mode_refresh_rate(&mode_line(148_500_000, 0, 1125, 0)), 0.0);
    }

    #[test]
    fn test_required_screen_size() {
        // Fits already
        assert_eq!(
            required_screen_size((1920, 1080), (0, 0), (1280, 720), 1),
            (1920, 1080)
        );
        // 4K on a 1080p screen
        assert_eq!(
            required_screen_size((1920, 1080), (0, 0), (3840, 2160), 1),
            (3840, 2160)
        );
        // Second head to the right of the first
        assert_eq!(
            required_screen_size((3840, 1080), (1920, 0), (2560, 1440), 1),
            (4480, 1440)
        );
        // Portrait CRTC swaps the mode's axes
        assert_eq!(
            required_screen_size((1920, 1080), (0, 0), (1920, 1080), RR_ROTATE_90),
            (1920, 1920)
        );
    }

    #[test]
    fn test_scale_mm() {
        assert_eq!(scale_mm(508, 1920, 3840), 1016);
        assert_eq!(scale_mm(286, 1080, 2160), 572);
        assert_eq!(scale_mm(286, 0, 2160), 286);
    }

    #[test]
    fn test_x_error_is_recorded() {
        let mut event = xlib::XErrorEvent {
            type_: 0,
            display: null_mut(),
            resourceid: 0,
            serial: 0,
            error_code: 2, // BadValue
            request_code: 140,
            minor_code: 7,
        };
        take_x_error();
        unsafe { record_x_error(null_mut(), &mut event) };
        assert_eq!(take_x_error(), Some(2));
        assert_eq!(take_x_error(), None);
    }

    #[test]
    fn test_describe_interlaced() {
        let line = mode_line(74_250_000, 2200, 1125, RR_INTERLACE);
        let raw = describe(&line, &PixelEncoding::Direct32);
        assert_eq!(raw.id, ModeId(0x45));
        assert!(raw.flags.contains(MODE_INTERLACED));
        assert_eq!((raw.width, raw.height), (1920, 1080));
        assert_eq!(raw.refresh_rate, 60.0);
    }
}
