//! macOS display queries via CoreGraphics, CoreVideo and IOKit.

#![allow(unused_unsafe)]

use super::ffi;
use crate::error::{Error, Result};
use crate::monitor::{DisplayId, ModeId};
use crate::provider::{
    DisplayProvider, ModeDescriptor, ModeFlags, PhysicalSize, PixelEncoding, RawMode,
    RefreshPeriod,
};
use objc2_core_foundation::{
    CFArray, CFArrayGetCount, CFArrayGetValueAtIndex, CFDictionary, CFDictionaryGetValue,
    CFRetained, CFString, CFUUID, CFUUIDCreateString, Type,
};
use objc2_core_graphics::{
    CGDirectDisplayID, CGDisplayCopyAllDisplayModes, CGDisplayCopyDisplayMode, CGDisplayIsAsleep,
    CGDisplayIsMain, CGDisplayMode, CGDisplayScreenSize, CGDisplaySetDisplayMode, CGError,
    CGGetOnlineDisplayList,
};
use std::ffi::c_void;
use std::ptr::{NonNull, null_mut};

const PRODUCT_NAME_KEY: &str = "DisplayProductName";
const NAME_LOCALE: &str = "en_US";

/// Displays reported by CoreGraphics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDisplays;

/// A retained `CGDisplayMode` from a mode list query.
#[derive(Debug)]
pub struct DisplayMode {
    mode: CFRetained<CGDisplayMode>,
}

impl RawMode for DisplayMode {
    #[allow(deprecated)]
    fn describe(&self) -> ModeDescriptor {
        let mode = Some(&*self.mode);
        let encoding = unsafe { CGDisplayMode::pixel_encoding(mode) }
            .map(|layout| PixelEncoding::from_io_layout(&layout.to_string()))
            .unwrap_or_else(|| PixelEncoding::Other(String::new()));

        ModeDescriptor {
            id: mode_id(&self.mode),
            flags: ModeFlags(unsafe { CGDisplayMode::io_flags(mode) }),
            encoding,
            width: unsafe { CGDisplayMode::width(mode) } as u32,
            height: unsafe { CGDisplayMode::height(mode) } as u32,
            refresh_rate: unsafe { CGDisplayMode::refresh_rate(mode) },
        }
    }
}

/// Owned `CVDisplayLink`, released on drop.
struct DisplayLink(ffi::CVDisplayLinkRef);

impl DisplayLink {
    fn new(display: CGDirectDisplayID) -> Option<Self> {
        let mut link: ffi::CVDisplayLinkRef = null_mut();
        let status = unsafe { ffi::CVDisplayLinkCreateWithCGDisplay(display, &mut link) };
        if status != ffi::CV_RETURN_SUCCESS || link.is_null() {
            log::debug!("CVDisplayLinkCreateWithCGDisplay failed: {}", status);
            return None;
        }
        Some(Self(link))
    }

    fn nominal_period(&self) -> ffi::CVTime {
        unsafe { ffi::CVDisplayLinkGetNominalOutputVideoRefreshPeriod(self.0) }
    }
}

impl Drop for DisplayLink {
    fn drop(&mut self) {
        unsafe { ffi::CVDisplayLinkRelease(self.0) };
    }
}

fn cg_id(display: DisplayId) -> CGDirectDisplayID {
    display.0 as CGDirectDisplayID
}

fn mode_id(mode: &CGDisplayMode) -> ModeId {
    let id = unsafe { CGDisplayMode::io_display_mode_id(Some(mode)) };
    ModeId(id as u32 as u64)
}

/// Look up `key` in a CF dictionary, retaining the value.
///
/// # Safety
///
/// The caller must name the CF type `T` the value actually has.
unsafe fn dictionary_value<T: Type>(
    dictionary: &CFDictionary,
    key: &CFString,
) -> Option<CFRetained<T>> {
    let key = key as *const CFString as *const c_void;
    let value = unsafe { CFDictionaryGetValue(dictionary, key) };
    NonNull::new(value as *mut T).map(|value| unsafe { CFRetained::retain(value) })
}

impl DisplayProvider for SystemDisplays {
    type Mode = DisplayMode;

    fn online_displays(&self) -> Result<Vec<DisplayId>> {
        let mut count: u32 = 0;
        let status = unsafe { CGGetOnlineDisplayList(0, null_mut(), &mut count) };
        if status != CGError::Success {
            return Err(Error::EnumerationUnavailable(format!(
                "CGGetOnlineDisplayList failed: {:?}",
                status
            )));
        }

        let mut displays: Vec<CGDirectDisplayID> = vec![0; count as usize];
        let status =
            unsafe { CGGetOnlineDisplayList(count, displays.as_mut_ptr(), &mut count) };
        if status != CGError::Success {
            return Err(Error::EnumerationUnavailable(format!(
                "CGGetOnlineDisplayList failed: {:?}",
                status
            )));
        }
        displays.truncate(count as usize);

        Ok(displays
            .into_iter()
            .map(|display| DisplayId(display as u64))
            .collect())
    }

    fn is_asleep(&self, display: DisplayId) -> bool {
        unsafe { CGDisplayIsAsleep(cg_id(display)) }
    }

    fn name(&self, display: DisplayId) -> Option<String> {
        let port = unsafe { ffi::CGDisplayIOServicePort(cg_id(display)) };
        let info = unsafe {
            ffi::IODisplayCreateInfoDictionary(port, ffi::IO_DISPLAY_ONLY_PREFERRED_NAME)
        };
        // Create rule: we own `info`
        let info: CFRetained<CFDictionary> =
            unsafe { CFRetained::from_raw(NonNull::new(info as *mut CFDictionary)?) };

        let names: CFRetained<CFDictionary> =
            unsafe { dictionary_value(&info, &CFString::from_str(PRODUCT_NAME_KEY)) }?;
        let name: CFRetained<CFString> =
            unsafe { dictionary_value(&names, &CFString::from_str(NAME_LOCALE)) }?;
        Some(name.to_string())
    }

    fn uuid(&self, display: DisplayId) -> Option<String> {
        let uuid = unsafe { ffi::CGDisplayCreateUUIDFromDisplayID(cg_id(display)) };
        let uuid: CFRetained<CFUUID> =
            unsafe { CFRetained::from_raw(NonNull::new(uuid as *mut CFUUID)?) };
        let string = unsafe { CFUUIDCreateString(None, Some(&*uuid)) }?;
        Some(string.to_string())
    }

    fn physical_size(&self, display: DisplayId) -> PhysicalSize {
        let size = unsafe { CGDisplayScreenSize(cg_id(display)) };
        PhysicalSize {
            width_mm: size.width as f64,
            height_mm: size.height as f64,
        }
    }

    fn is_primary(&self, display: DisplayId) -> bool {
        unsafe { CGDisplayIsMain(cg_id(display)) }
    }

    fn current_mode_id(&self, display: DisplayId) -> Option<ModeId> {
        unsafe { CGDisplayCopyDisplayMode(cg_id(display)) }.map(|mode| mode_id(&mode))
    }

    fn modes(&self, display: DisplayId) -> Result<Vec<DisplayMode>> {
        let modes: CFRetained<CFArray> = unsafe {
            CGDisplayCopyAllDisplayModes(cg_id(display), None)
        }
        .ok_or_else(|| {
            Error::Platform(format!(
                "CGDisplayCopyAllDisplayModes returned nothing for display {}",
                display.0
            ))
        })?;

        let count = unsafe { CFArrayGetCount(&modes) };
        let mut out = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let value = unsafe { CFArrayGetValueAtIndex(&modes, index) };
            // Get rule: retain so the mode outlives the array
            if let Some(mode) = NonNull::new(value as *mut CGDisplayMode) {
                out.push(DisplayMode {
                    mode: unsafe { CFRetained::retain(mode) },
                });
            }
        }
        Ok(out)
    }

    fn nominal_refresh_period(&self, display: DisplayId) -> Option<RefreshPeriod> {
        let link = DisplayLink::new(cg_id(display))?;
        let time = link.nominal_period();
        Some(RefreshPeriod {
            time_value: time.time_value,
            time_scale: time.time_scale,
            indefinite: time.flags & ffi::CV_TIME_IS_INDEFINITE != 0,
        })
    }

    fn set_mode(&self, display: DisplayId, mode: &DisplayMode) -> Result<()> {
        let status =
            unsafe { CGDisplaySetDisplayMode(cg_id(display), Some(&*mode.mode), None) };
        if status != CGError::Success {
            return Err(Error::Rejected(format!(
                "CGDisplaySetDisplayMode failed: {:?}",
                status
            )));
        }
        Ok(())
    }
}
