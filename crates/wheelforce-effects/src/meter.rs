//! Output level metering and the stepped clipping indicator.

use wheelforce_hid_slot_protocol::slot_ids::{self, SLOT_COUNT};
use wheelforce_hid_slot_protocol::SlotParameters;

/// Combined force demand across all four slots: the absolute direct level
/// plus every condition clip ceiling rescaled from its 16-bit range to the
/// signed full scale.
pub fn combined_level(channels: &[SlotParameters; SLOT_COUNT], full_scale: i32) -> i32 {
    let mut level = i64::from(channels[slot_ids::DIRECT as usize].level.unsigned_abs());
    for id in [slot_ids::SPRING, slot_ids::DAMPER, slot_ids::FRICTION] {
        level += i64::from(channels[id as usize].clip) * i64::from(full_scale) / 0xffff;
    }
    level.min(i64::from(i32::MAX)) as i32
}

/// Indicator band thresholds in permille of full scale, paired with the
/// five-lamp bitmask shown at or above each threshold. Past full scale the
/// lamps walk off one by one to signal clipping.
const INDICATOR_BANDS: [(i64, u8); 9] = [
    (1500, 0x10),
    (1250, 0x18),
    (1100, 0x1c),
    (1000, 0x1e),
    (900, 0x1f),
    (750, 0x0f),
    (500, 0x07),
    (250, 0x03),
    (75, 0x01),
];

/// Map a combined level to the stepped five-lamp indicator mask.
pub fn indicator_mask(level: i32, full_scale: i32) -> u8 {
    let permille = i64::from(level.max(0)) * 1000 / i64::from(full_scale);
    for (threshold, mask) in INDICATOR_BANDS {
        if permille >= threshold {
            return mask;
        }
    }
    0
}

/// Running peak of the combined output level.
///
/// The peak only moves up between resets, so a caller polling it sees the
/// worst clipping episode since the last reset rather than the current
/// instant.
#[derive(Debug, Default)]
pub struct ClippingMeter {
    peak: i32,
}

impl ClippingMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's combined level into the peak.
    pub fn update(&mut self, level: i32) {
        self.peak = self.peak.max(level);
    }

    pub fn peak(&self) -> i32 {
        self.peak
    }

    pub fn reset(&mut self) {
        self.peak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FULL_SCALE;

    #[test]
    fn test_peak_is_monotone_until_reset() {
        let mut meter = ClippingMeter::new();
        meter.update(1000);
        meter.update(500);
        assert_eq!(meter.peak(), 1000);
        meter.update(2000);
        assert_eq!(meter.peak(), 2000);
        meter.reset();
        assert_eq!(meter.peak(), 0);
        meter.update(300);
        assert_eq!(meter.peak(), 300);
    }

    #[test]
    fn test_combined_level_sums_direct_and_clips() {
        let mut channels = [SlotParameters::NEUTRAL; SLOT_COUNT];
        channels[slot_ids::DIRECT as usize].level = -10000;
        channels[slot_ids::SPRING as usize].clip = 0xffff;
        assert_eq!(combined_level(&channels, FULL_SCALE), 10000 + FULL_SCALE);
    }

    #[test]
    fn test_indicator_bands() {
        let fs = FULL_SCALE;
        assert_eq!(indicator_mask(0, fs), 0);
        assert_eq!(indicator_mask(fs / 10, fs), 0x01);
        assert_eq!(indicator_mask(fs / 3, fs), 0x03);
        assert_eq!(indicator_mask(fs * 3 / 5, fs), 0x07);
        assert_eq!(indicator_mask(fs * 4 / 5, fs), 0x0f);
        assert_eq!(indicator_mask(fs * 95 / 100, fs), 0x1f);
        assert_eq!(indicator_mask(fs, fs), 0x1e);
        assert_eq!(indicator_mask(fs * 12 / 10, fs), 0x1c);
        assert_eq!(indicator_mask(fs * 13 / 10, fs), 0x18);
        assert_eq!(indicator_mask(fs * 2, fs), 0x10);
    }

    #[test]
    fn test_indicator_band_boundaries() {
        // First level at each permille threshold of 0x7fff, and the level
        // one below it.
        let cases = [
            (2458, 2457, 0x01, 0x00),
            (8192, 8191, 0x03, 0x01),
            (16384, 16383, 0x07, 0x03),
            (24576, 24575, 0x0f, 0x07),
            (29491, 29490, 0x1f, 0x0f),
            (32767, 32766, 0x1e, 0x1f),
            (36044, 36043, 0x1c, 0x1e),
            (40959, 40958, 0x18, 0x1c),
            (49151, 49150, 0x10, 0x18),
        ];
        for (at, below, at_mask, below_mask) in cases {
            assert_eq!(indicator_mask(at, FULL_SCALE), at_mask, "at {at}");
            assert_eq!(indicator_mask(below, FULL_SCALE), below_mask, "below {below}");
        }
    }
}
