//! Windows display queries via GDI display devices and settings.

use crate::error::{Error, Result};
use crate::monitor::{DisplayId, ModeId};
use crate::provider::{
    DisplayProvider, MODE_INTERLACED, ModeDescriptor, ModeFlags, PhysicalSize, PixelEncoding,
    RawMode, RefreshPeriod,
};
use std::mem::{MaybeUninit, size_of};
use windows::Win32::Graphics::Gdi::{
    CDS_TYPE, ChangeDisplaySettingsExW, CreateDCW, DEVMODEW, DISP_CHANGE_SUCCESSFUL,
    DISPLAY_DEVICE_ACTIVE, DISPLAY_DEVICE_ATTACHED_TO_DESKTOP, DISPLAY_DEVICE_PRIMARY_DEVICE,
    DISPLAY_DEVICEW, DeleteDC, ENUM_CURRENT_SETTINGS, ENUM_DISPLAY_SETTINGS_FLAGS,
    ENUM_DISPLAY_SETTINGS_MODE, EnumDisplayDevicesW, EnumDisplaySettingsExW, GetDeviceCaps,
    HDC, HORZSIZE, VERTSIZE,
};
use windows::core::{PCWSTR, w};

const DM_INTERLACED: u32 = 0x0000_0002;
const EDD_GET_DEVICE_INTERFACE_NAME: u32 = 0x0000_0001;

/// Displays reported by GDI.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDisplays;

/// A `DEVMODEW` from the adapter's settings list.
#[derive(Clone, Copy)]
pub struct DisplayMode {
    devmode: DEVMODEW,
}

impl RawMode for DisplayMode {
    fn describe(&self) -> ModeDescriptor {
        describe(&self.devmode)
    }
}

fn describe(devmode: &DEVMODEW) -> ModeDescriptor {
    // GDI only lists modes the monitor accepts, so they are valid and safe
    let mut flags = ModeFlags::USABLE;
    if display_flags(devmode) & DM_INTERLACED != 0 {
        flags = flags.with(MODE_INTERLACED);
    }

    // 0 and 1 both mean "hardware default"
    let refresh_rate = match devmode.dmDisplayFrequency {
        0 | 1 => 0.0,
        hz => hz as f64,
    };

    ModeDescriptor {
        id: mode_key(devmode),
        flags,
        encoding: PixelEncoding::from_depth(devmode.dmBitsPerPel),
        width: devmode.dmPelsWidth,
        height: devmode.dmPelsHeight,
        refresh_rate,
    }
}

fn display_flags(devmode: &DEVMODEW) -> u32 {
    unsafe { devmode.Anonymous2.dmDisplayFlags }
}

/// GDI has no mode identifier; pack the fields that tell modes apart.
fn mode_key(devmode: &DEVMODEW) -> ModeId {
    let width = (devmode.dmPelsWidth as u64) & 0xFFFF;
    let height = (devmode.dmPelsHeight as u64) & 0xFFFF;
    let frequency = (devmode.dmDisplayFrequency as u64) & 0xFFFF;
    let depth = (devmode.dmBitsPerPel as u64) & 0xFF;
    let flags = (display_flags(devmode) as u64) & 0xFF;
    ModeId(width << 48 | height << 32 | frequency << 16 | depth << 8 | flags)
}

fn new_devmode() -> DEVMODEW {
    let mut devmode = unsafe { MaybeUninit::<DEVMODEW>::zeroed().assume_init() };
    devmode.dmSize = size_of::<DEVMODEW>() as u16;
    devmode
}

fn new_device() -> DISPLAY_DEVICEW {
    let mut device = unsafe { MaybeUninit::<DISPLAY_DEVICEW>::zeroed().assume_init() };
    device.cb = size_of::<DISPLAY_DEVICEW>() as u32;
    device
}

fn wide_to_string(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// The adapter at `index`, if any.
fn adapter(index: u32) -> Option<DISPLAY_DEVICEW> {
    let mut device = new_device();
    let ok = unsafe { EnumDisplayDevicesW(PCWSTR::null(), index, &mut device, 0) };
    ok.as_bool().then_some(device)
}

/// The first monitor attached to `adapter`.
fn attached_monitor(adapter: &DISPLAY_DEVICEW, flags: u32) -> Option<DISPLAY_DEVICEW> {
    let mut device = new_device();
    let ok = unsafe {
        EnumDisplayDevicesW(PCWSTR(adapter.DeviceName.as_ptr()), 0, &mut device, flags)
    };
    ok.as_bool().then_some(device)
}

fn adapter_for(display: DisplayId) -> Option<DISPLAY_DEVICEW> {
    adapter(display.0 as u32)
}

fn has_flag(device: &DISPLAY_DEVICEW, flag: u32) -> bool {
    device.StateFlags.0 & flag != 0
}

fn settings(adapter: &DISPLAY_DEVICEW, mode: ENUM_DISPLAY_SETTINGS_MODE) -> Option<DEVMODEW> {
    let mut devmode = new_devmode();
    let ok = unsafe {
        EnumDisplaySettingsExW(
            PCWSTR(adapter.DeviceName.as_ptr()),
            mode,
            &mut devmode,
            ENUM_DISPLAY_SETTINGS_FLAGS(0),
        )
    };
    ok.as_bool().then_some(devmode)
}

/// Device context for an adapter, deleted on drop.
struct DeviceContext(HDC);

impl DeviceContext {
    fn new(adapter: &DISPLAY_DEVICEW) -> Option<Self> {
        let hdc = unsafe {
            CreateDCW(
                w!("DISPLAY"),
                PCWSTR(adapter.DeviceName.as_ptr()),
                PCWSTR::null(),
                None,
            )
        };
        if hdc.is_invalid() { None } else { Some(Self(hdc)) }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

impl DisplayProvider for SystemDisplays {
    type Mode = DisplayMode;

    fn online_displays(&self) -> Result<Vec<DisplayId>> {
        let mut displays = Vec::new();
        let mut index = 0;
        while let Some(device) = adapter(index) {
            if has_flag(&device, DISPLAY_DEVICE_ATTACHED_TO_DESKTOP.0) {
                displays.push(DisplayId(index as u64));
            }
            index += 1;
        }

        if index == 0 {
            return Err(Error::EnumerationUnavailable(
                "EnumDisplayDevicesW reported no adapters".into(),
            ));
        }
        Ok(displays)
    }

    fn is_asleep(&self, display: DisplayId) -> bool {
        adapter_for(display)
            .and_then(|adapter| attached_monitor(&adapter, 0))
            .is_some_and(|monitor| !has_flag(&monitor, DISPLAY_DEVICE_ACTIVE.0))
    }

    fn name(&self, display: DisplayId) -> Option<String> {
        let adapter = adapter_for(display)?;
        let monitor = attached_monitor(&adapter, 0)?;
        let name = wide_to_string(&monitor.DeviceString);
        (!name.is_empty()).then_some(name)
    }

    fn uuid(&self, display: DisplayId) -> Option<String> {
        let adapter = adapter_for(display)?;
        let monitor = attached_monitor(&adapter, EDD_GET_DEVICE_INTERFACE_NAME)?;
        let id = wide_to_string(&monitor.DeviceID);
        (!id.is_empty()).then_some(id)
    }

    fn physical_size(&self, display: DisplayId) -> PhysicalSize {
        let Some(context) = adapter_for(display).and_then(|adapter| DeviceContext::new(&adapter))
        else {
            return PhysicalSize::default();
        };
        let (width, height) = unsafe {
            (
                GetDeviceCaps(Some(context.0), HORZSIZE),
                GetDeviceCaps(Some(context.0), VERTSIZE),
            )
        };
        PhysicalSize {
            width_mm: width.max(0) as f64,
            height_mm: height.max(0) as f64,
        }
    }

    fn is_primary(&self, display: DisplayId) -> bool {
        adapter_for(display)
            .is_some_and(|adapter| has_flag(&adapter, DISPLAY_DEVICE_PRIMARY_DEVICE.0))
    }

    fn current_mode_id(&self, display: DisplayId) -> Option<ModeId> {
        let adapter = adapter_for(display)?;
        settings(&adapter, ENUM_CURRENT_SETTINGS).map(|devmode| mode_key(&devmode))
    }

    fn modes(&self, display: DisplayId) -> Result<Vec<DisplayMode>> {
        let adapter = adapter_for(display)
            .ok_or_else(|| Error::Platform(format!("no display adapter {}", display.0)))?;

        let mut modes = Vec::new();
        let mut index = 0;
        while let Some(devmode) = settings(&adapter, ENUM_DISPLAY_SETTINGS_MODE(index)) {
            modes.push(DisplayMode { devmode });
            index += 1;
        }
        Ok(modes)
    }

    fn nominal_refresh_period(&self, _display: DisplayId) -> Option<RefreshPeriod> {
        None
    }

    fn set_mode(&self, display: DisplayId, mode: &DisplayMode) -> Result<()> {
        let adapter = adapter_for(display)
            .ok_or_else(|| Error::Platform(format!("no display adapter {}", display.0)))?;

        let result = unsafe {
            ChangeDisplaySettingsExW(
                PCWSTR(adapter.DeviceName.as_ptr()),
                Some(&mode.devmode as *const DEVMODEW),
                None,
                CDS_TYPE(0),
                None,
            )
        };
        if result != DISP_CHANGE_SUCCESSFUL {
            return Err(Error::Rejected(format!(
                "ChangeDisplaySettingsExW failed: {}",
                result.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devmode(width: u32, height: u32, bpp: u32, hz: u32) -> DEVMODEW {
        let mut devmode = new_devmode();
        devmode.dmPelsWidth = width;
        devmode.dmPelsHeight = height;
        devmode.dmBitsPerPel = bpp;
        devmode.dmDisplayFrequency = hz;
        devmode
    }

    #[test]
    fn test_mode_key_distinguishes_modes() {
        let a = mode_key(&devmode(1920, 1080, 32, 60));
        let b = mode_key(&devmode(1920, 1080, 32, 144));
        let c = mode_key(&devmode(1920, 1080, 16, 60));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, mode_key(&devmode(1920, 1080, 32, 60)));
    }

    #[test]
    fn test_describe_default_frequency() {
        let raw = describe(&devmode(1280, 720, 32, 1));
        assert_eq!(raw.refresh_rate, 0.0);
        assert_eq!(raw.encoding, PixelEncoding::Direct32);
        assert_eq!(raw.flags, ModeFlags::USABLE);
    }
}
