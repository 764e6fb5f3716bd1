//! Decide which raw OS modes are exposed, and normalize the ones that are.

use crate::monitor::{DisplayId, Mode};
use crate::provider::{
    MODE_INTERLACED, MODE_SAFE, MODE_STRETCHED, MODE_VALID, ModeDescriptor, PixelEncoding,
    RefreshPeriod,
};

/// Check whether a raw mode is usable.
///
/// A mode must be valid and safe, must not be interlaced or stretched, and
/// must use 16-bit or 32-bit direct pixels.
pub fn accepts(raw: &ModeDescriptor) -> bool {
    raw.flags.contains(MODE_VALID)
        && raw.flags.contains(MODE_SAFE)
        && !raw.flags.contains(MODE_INTERLACED)
        && !raw.flags.contains(MODE_STRETCHED)
        && matches!(
            raw.encoding,
            PixelEncoding::Direct16 | PixelEncoding::Direct32
        )
}

/// Refresh rate of a raw mode, recovered from the nominal period when the OS
/// reports exactly zero.
pub fn refresh_rate(raw: &ModeDescriptor, nominal: Option<RefreshPeriod>) -> f64 {
    if raw.refresh_rate != 0.0 {
        return raw.refresh_rate;
    }
    nominal.and_then(|period| period.rate()).unwrap_or(0.0)
}

/// Turn a raw mode into a [`Mode`] of `monitor`, or `None` if it is rejected.
pub fn to_mode(
    monitor: DisplayId,
    raw: &ModeDescriptor,
    nominal: Option<RefreshPeriod>,
) -> Option<Mode> {
    if !accepts(raw) {
        log::trace!(
            "Rejected mode {}x{} (flags {:#x}, encoding {:?})",
            raw.width,
            raw.height,
            raw.flags.0,
            raw.encoding
        );
        return None;
    }

    Some(Mode {
        monitor,
        id: raw.id,
        width: raw.width,
        height: raw.height,
        refresh_rate: refresh_rate(raw, nominal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ModeId;
    use crate::provider::{MODE_DEFAULT, ModeFlags};

    fn raw(flags: ModeFlags, encoding: PixelEncoding, refresh_rate: f64) -> ModeDescriptor {
        ModeDescriptor {
            id: ModeId(7),
            flags,
            encoding,
            width: 1920,
            height: 1080,
            refresh_rate,
        }
    }

    fn period(time_value: i64, time_scale: i32, indefinite: bool) -> Option<RefreshPeriod> {
        Some(RefreshPeriod {
            time_value,
            time_scale,
            indefinite,
        })
    }

    #[test]
    fn test_accepts_usable_modes() {
        assert!(accepts(&raw(ModeFlags::USABLE, PixelEncoding::Direct32, 60.0)));
        assert!(accepts(&raw(ModeFlags::USABLE, PixelEncoding::Direct16, 60.0)));
        assert!(accepts(&raw(
            ModeFlags::USABLE.with(MODE_DEFAULT),
            PixelEncoding::Direct32,
            60.0
        )));
    }

    #[test]
    fn test_rejects_each_failing_condition() {
        let enc = PixelEncoding::Direct32;
        assert!(!accepts(&raw(ModeFlags(MODE_SAFE), enc.clone(), 60.0)));
        assert!(!accepts(&raw(ModeFlags(MODE_VALID), enc.clone(), 60.0)));
        assert!(!accepts(&raw(
            ModeFlags::USABLE.with(MODE_INTERLACED),
            enc.clone(),
            60.0
        )));
        assert!(!accepts(&raw(
            ModeFlags::USABLE.with(MODE_STRETCHED),
            enc,
            60.0
        )));
        assert!(!accepts(&raw(
            ModeFlags::USABLE,
            PixelEncoding::Other("--RRRRRRRRRRGGGGGGGGGGBBBBBBBBBB".into()),
            60.0
        )));
    }

    #[test]
    fn test_accepts_is_deterministic() {
        let candidates = [
            raw(ModeFlags::USABLE, PixelEncoding::Direct32, 60.0),
            raw(ModeFlags::USABLE.with(MODE_INTERLACED), PixelEncoding::Direct32, 60.0),
            raw(ModeFlags(0), PixelEncoding::Direct16, 0.0),
        ];
        let first: Vec<bool> = candidates.iter().map(accepts).collect();
        let second: Vec<bool> = candidates.iter().map(accepts).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![true, false, false]);
    }

    #[test]
    fn test_reported_refresh_rate_wins() {
        let mode = raw(ModeFlags::USABLE, PixelEncoding::Direct32, 59.94);
        assert_eq!(refresh_rate(&mode, period(1, 120, false)), 59.94);
    }

    #[test]
    fn test_refresh_rate_recovered_from_period() {
        let mode = raw(ModeFlags::USABLE, PixelEncoding::Direct32, 0.0);
        assert_eq!(refresh_rate(&mode, period(1001, 60000, false)), 60000.0 / 1001.0);
        assert_eq!(refresh_rate(&mode, period(1, 75, false)), 75.0);
    }

    #[test]
    fn test_refresh_rate_unrecoverable() {
        let mode = raw(ModeFlags::USABLE, PixelEncoding::Direct32, 0.0);
        assert_eq!(refresh_rate(&mode, period(1001, 60000, true)), 0.0);
        assert_eq!(refresh_rate(&mode, None), 0.0);
    }

    #[test]
    fn test_to_mode() {
        let monitor = DisplayId(3);
        let mode = to_mode(
            monitor,
            &raw(ModeFlags::USABLE, PixelEncoding::Direct32, 0.0),
            period(1, 60, false),
        )
        .unwrap();
        assert_eq!(mode.monitor(), monitor);
        assert_eq!(mode.id(), ModeId(7));
        assert_eq!(mode.resolution(), (1920, 1080));
        assert_eq!(mode.refresh_rate, 60.0);

        assert!(
            to_mode(
                monitor,
                &raw(ModeFlags::USABLE.with(MODE_STRETCHED), PixelEncoding::Direct32, 60.0),
                None
            )
            .is_none()
        );
    }
}
