//! Declarations not covered by the objc2 framework crates.

use std::ffi::c_void;

pub type CVDisplayLinkRef = *mut c_void;
pub type CVReturn = i32;
pub type IoService = u32;

pub const CV_RETURN_SUCCESS: CVReturn = 0;
pub const CV_TIME_IS_INDEFINITE: i32 = 1 << 0;
pub const IO_DISPLAY_ONLY_PREFERRED_NAME: u32 = 0x0000_0200;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CVTime {
    pub time_value: i64,
    pub time_scale: i32,
    pub flags: i32,
}

#[link(name = "CoreVideo", kind = "framework")]
unsafe extern "C" {
    pub fn CVDisplayLinkCreateWithCGDisplay(
        display_id: u32,
        display_link_out: *mut CVDisplayLinkRef,
    ) -> CVReturn;
    pub fn CVDisplayLinkGetNominalOutputVideoRefreshPeriod(display_link: CVDisplayLinkRef)
    -> CVTime;
    pub fn CVDisplayLinkRelease(display_link: CVDisplayLinkRef);
}

#[link(name = "IOKit", kind = "framework")]
unsafe extern "C" {
    pub fn IODisplayCreateInfoDictionary(framebuffer: IoService, options: u32) -> *const c_void;
}

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    // Deprecated, returns 0 on displays without a framebuffer service
    pub fn CGDisplayIOServicePort(display: u32) -> IoService;
}

#[link(name = "ColorSync", kind = "framework")]
unsafe extern "C" {
    pub fn CGDisplayCreateUUIDFromDisplayID(display: u32) -> *const c_void;
}
