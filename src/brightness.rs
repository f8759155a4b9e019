// Brightness writes across capability tiers and the min/max toggle rule.
// Consumes prefs: autoprofile.brightness.min, autoprofile.brightness.max.
use crate::error::Result;
use crate::gateway::{CapabilityTier, DeviceGateway};
use crate::prefs::{PrefSpec, keys};
use crate::profile::{BrightnessRange, Percent};

/// Lowest raw value ever written; anything darker leaves the screen unreadable.
pub const MIN_RAW_BRIGHTNESS: u16 = 10;
/// Highest raw value the device accepts.
pub const MAX_RAW_BRIGHTNESS: u16 = 255;

/// Default toggle bounds seeded into the preference store.
pub const DEFAULT_TOGGLE_LOW: u8 = 20;
pub const DEFAULT_TOGGLE_HIGH: u8 = 80;

/// Map a raw device unit onto 0..=100. The usable raw range starts at
/// [`MIN_RAW_BRIGHTNESS`], so 10..=255 maps to 0..=100.
pub fn percent_from_raw(raw: u16) -> u8 {
    let span = raw.saturating_sub(MIN_RAW_BRIGHTNESS) as u32;
    let percent = span * 100 / (MAX_RAW_BRIGHTNESS - MIN_RAW_BRIGHTNESS) as u32;
    percent.min(100) as u8
}

/// Map 0..=100 onto the usable raw range; never yields a value below
/// [`MIN_RAW_BRIGHTNESS`].
pub fn raw_from_percent(percent: u8) -> u16 {
    let percent = percent.min(100) as u16;
    MIN_RAW_BRIGHTNESS + percent * (MAX_RAW_BRIGHTNESS - MIN_RAW_BRIGHTNESS) / 100
}

/// Current brightness as a percent. A device without the backing setting
/// reads as full brightness.
pub fn current_brightness_percent(gateway: &dyn DeviceGateway) -> u8 {
    match gateway.raw_brightness() {
        Ok(raw) => percent_from_raw(raw),
        Err(_) => 100,
    }
}

/// Pick the opposite toggle bound from the current level.
///
/// The comparison against the median is strict, so a current value sitting
/// exactly on the median selects the high bound. Repeated calls with
/// unchanged inputs always return the same answer.
pub fn toggle_percent(current: u8, range: BrightnessRange) -> u8 {
    let (low, high) = range.normalized();
    let median = (low.value() as u16 + high.value() as u16) / 2;
    if current as u16 > median {
        low.value()
    } else {
        high.value()
    }
}

/// Tiered brightness writer. The baseline content-setting write is the
/// durable source of truth; the window-hint and legacy-service paths are
/// mutually exclusive live-repaint attempts that never mask a baseline
/// outcome.
#[derive(Debug, Clone, Copy)]
pub struct BrightnessStrategy {
    tier: CapabilityTier,
}

impl BrightnessStrategy {
    pub fn new(tier: CapabilityTier) -> Self {
        Self { tier }
    }

    /// Write a target percent, returning the effectively applied fraction of
    /// full brightness (raw/255). Fails only when the baseline write fails.
    pub fn write_brightness(
        &self,
        gateway: &mut dyn DeviceGateway,
        percent: Percent,
    ) -> Result<f32> {
        let raw = raw_from_percent(percent.value()).clamp(MIN_RAW_BRIGHTNESS, MAX_RAW_BRIGHTNESS);
        let fraction = raw as f32 / MAX_RAW_BRIGHTNESS as f32;

        gateway.set_raw_brightness(raw)?;

        let repaint = match self.tier {
            CapabilityTier::WindowHint => gateway.try_set_window_brightness_hint(fraction),
            CapabilityTier::LegacyHardware => gateway.try_legacy_hardware_brightness(raw),
            CapabilityTier::BaselineOnly => Ok(()),
        };
        if let Err(err) = repaint {
            log::debug!("brightness repaint path skipped: {err}");
        }

        Ok(fraction)
    }
}

inventory::submit! {
    PrefSpec {
        key: keys::BRIGHTNESS_MIN,
        default: "20",
    }
}

inventory::submit! {
    PrefSpec {
        key: keys::BRIGHTNESS_MAX,
        default: "80",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gateway::testing::ScriptedGateway;

    fn range(low: u8, high: u8) -> BrightnessRange {
        BrightnessRange::new(Percent::clamped(low), Percent::clamped(high))
    }

    #[test]
    fn conversion_covers_the_endpoints() {
        assert_eq!(raw_from_percent(0), MIN_RAW_BRIGHTNESS);
        assert_eq!(raw_from_percent(100), MAX_RAW_BRIGHTNESS);
        assert_eq!(percent_from_raw(MIN_RAW_BRIGHTNESS), 0);
        assert_eq!(percent_from_raw(MAX_RAW_BRIGHTNESS), 100);
        assert_eq!(percent_from_raw(0), 0);
    }

    #[test]
    fn raw_never_drops_below_the_floor() {
        for percent in 0..=100u8 {
            assert!(raw_from_percent(percent) >= MIN_RAW_BRIGHTNESS);
        }
    }

    #[test]
    fn round_trip_is_stable_after_one_normalization() {
        for raw in MIN_RAW_BRIGHTNESS..=MAX_RAW_BRIGHTNESS {
            let once = percent_from_raw(raw);
            let twice = percent_from_raw(raw_from_percent(once));
            assert_eq!(once, twice, "raw {raw} drifted across a round trip");
        }
    }

    #[test]
    fn toggle_switches_around_the_median() {
        assert_eq!(toggle_percent(50, range(20, 80)), 80, "tie goes high");
        assert_eq!(toggle_percent(51, range(20, 80)), 20);
        assert_eq!(toggle_percent(10, range(20, 80)), 80);
        assert_eq!(toggle_percent(100, range(20, 80)), 20);
    }

    #[test]
    fn toggle_accepts_inverted_ranges() {
        for current in [0u8, 10, 50, 51, 100] {
            assert_eq!(
                toggle_percent(current, range(80, 20)),
                toggle_percent(current, range(20, 80))
            );
        }
    }

    #[test]
    fn toggle_is_deterministic() {
        let first = toggle_percent(37, range(20, 80));
        for _ in 0..10 {
            assert_eq!(toggle_percent(37, range(20, 80)), first);
        }
    }

    #[test]
    fn unsupported_hint_still_reports_baseline_success() {
        let mut gateway = ScriptedGateway {
            supports_hint: false,
            ..ScriptedGateway::default()
        };
        let strategy = BrightnessStrategy::new(CapabilityTier::WindowHint);

        let fraction = strategy
            .write_brightness(&mut gateway, Percent::clamped(50))
            .expect("baseline write should succeed");

        let raw = raw_from_percent(50);
        assert_eq!(gateway.raw, Some(raw));
        assert!((fraction - raw as f32 / 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn baseline_failure_is_the_only_failure() {
        let mut gateway = ScriptedGateway {
            fail_baseline: true,
            ..ScriptedGateway::default()
        };
        let strategy = BrightnessStrategy::new(CapabilityTier::WindowHint);

        let result = strategy.write_brightness(&mut gateway, Percent::clamped(50));
        assert!(matches!(result, Err(Error::WriteFailed(_))));
        // The repaint path is never attempted once the baseline write fails.
        assert_eq!(gateway.writes, vec!["set_raw_brightness"]);
    }

    #[test]
    fn legacy_tier_never_touches_the_window_hint() {
        let mut gateway = ScriptedGateway {
            supports_hint: false,
            supports_legacy: true,
            ..ScriptedGateway::default()
        };
        let strategy = BrightnessStrategy::new(CapabilityTier::LegacyHardware);

        strategy
            .write_brightness(&mut gateway, Percent::clamped(80))
            .expect("write through legacy tier");

        assert_eq!(gateway.writes, vec!["set_raw_brightness", "legacy_hardware"]);
        assert_eq!(gateway.legacy, Some(raw_from_percent(80)));
    }

    #[test]
    fn zero_percent_writes_the_darkest_readable_value() {
        let mut gateway = ScriptedGateway::default();
        let strategy = BrightnessStrategy::new(CapabilityTier::BaselineOnly);

        let fraction = strategy
            .write_brightness(&mut gateway, Percent::clamped(0))
            .expect("baseline write");

        assert_eq!(gateway.raw, Some(MIN_RAW_BRIGHTNESS));
        assert!((fraction - MIN_RAW_BRIGHTNESS as f32 / 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_brightness_setting_reads_as_full() {
        let gateway = ScriptedGateway {
            raw: None,
            ..ScriptedGateway::default()
        };
        assert_eq!(current_brightness_percent(&gateway), 100);
    }
}
