//! OSC timetags
//!
//! Timetags use the NTP format: 32 bits of seconds since 1900-01-01, then
//! 32 bits of fractional seconds. The raw value 1 is reserved and means
//! "immediately".

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// A 64-bit OSC timetag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeTag(u64);

impl TimeTag {
    /// The reserved "process immediately" tag.
    pub const IMMEDIATE: TimeTag = TimeTag(1);

    /// Wrap a raw 64-bit NTP value.
    pub const fn from_raw(raw: u64) -> Self {
        TimeTag(raw)
    }

    /// The raw 64-bit NTP value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Build from whole seconds since 1900 and a 32-bit fraction.
    pub const fn from_parts(seconds: u32, fraction: u32) -> Self {
        TimeTag(((seconds as u64) << 32) | fraction as u64)
    }

    /// Whole seconds since the NTP epoch.
    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Fractional seconds, in units of 2^-32 s.
    pub const fn fraction(self) -> u32 {
        self.0 as u32
    }

    pub const fn is_immediate(self) -> bool {
        self.0 == 1
    }

    /// Convert a Unix timestamp in microseconds.
    pub fn from_unix_micros(micros: u64) -> Self {
        let secs = micros / 1_000_000 + NTP_UNIX_OFFSET;
        let frac = ((micros % 1_000_000) << 32) / 1_000_000;
        TimeTag::from_parts(secs as u32, frac as u32)
    }

    /// Convert back to Unix microseconds. Saturates at zero for tags before
    /// the Unix epoch; `IMMEDIATE` maps to zero.
    pub fn to_unix_micros(self) -> u64 {
        let secs = (self.seconds() as u64).saturating_sub(NTP_UNIX_OFFSET);
        let micros = ((self.fraction() as u64) * 1_000_000) >> 32;
        secs * 1_000_000 + micros
    }

    /// The current wall-clock time as a timetag.
    ///
    /// Reads the system clock; call it from the control thread, not the
    /// audio thread.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        TimeTag::from_unix_micros(since_epoch.as_micros() as u64)
    }
}
