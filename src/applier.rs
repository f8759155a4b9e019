// Per-field profile application with independent outcome recording.
use std::fmt;

use crate::brightness::BrightnessStrategy;
use crate::error::{Error, Result};
use crate::gateway::{CapabilityTier, DeviceGateway};
use crate::profile::DeviceProfile;

/// One controllable setting inside a [`DeviceProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProfileField {
    Ringer,
    Vibrate,
    RingVolume,
    Wifi,
    Brightness,
}

impl ProfileField {
    pub fn label(self) -> &'static str {
        match self {
            ProfileField::Ringer => "ringer",
            ProfileField::Vibrate => "vibrate",
            ProfileField::RingVolume => "ring_volume",
            ProfileField::Wifi => "wifi",
            ProfileField::Brightness => "brightness",
        }
    }
}

/// Outcome of one apply pass, one entry per attempted field. Settings are
/// independent OS subsystems, so one failure never rolls back the others.
#[derive(Debug, Default)]
pub struct ApplyReport {
    outcomes: Vec<(ProfileField, Result<()>)>,
}

impl ApplyReport {
    fn record(&mut self, field: ProfileField, outcome: Result<()>) {
        self.outcomes.push((field, outcome));
    }

    /// True iff every attempted field succeeded (vacuously true for an
    /// empty profile).
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    pub fn outcome(&self, field: ProfileField) -> Option<&Result<()>> {
        self.outcomes
            .iter()
            .find(|(recorded, _)| *recorded == field)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = (ProfileField, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|(field, outcome)| outcome.as_ref().err().map(|err| (*field, err)))
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outcomes.is_empty() {
            return f.write_str("nothing to apply");
        }
        for (index, (field, outcome)) in self.outcomes.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match outcome {
                Ok(()) => write!(f, "{}: ok", field.label())?,
                Err(err) => write!(f, "{}: failed ({err})", field.label())?,
            }
        }
        Ok(())
    }
}

/// Round a percent onto the device's ring volume unit scale.
fn ring_volume_units(max_units: u32, percent: u8) -> u32 {
    (max_units * percent as u32 + 50) / 100
}

/// Translates a target profile into gateway writes, one per set field.
/// No retries here; retry policy belongs to the caller.
pub struct ProfileApplier {
    brightness: BrightnessStrategy,
}

impl ProfileApplier {
    pub fn new(tier: CapabilityTier) -> Self {
        Self {
            brightness: BrightnessStrategy::new(tier),
        }
    }

    pub fn apply(&self, gateway: &mut dyn DeviceGateway, target: &DeviceProfile) -> ApplyReport {
        let mut report = ApplyReport::default();

        if let Some(mode) = target.ringer {
            report.record(ProfileField::Ringer, gateway.set_ringer_mode(mode));
        }
        if let Some(mode) = target.vibrate {
            report.record(ProfileField::Vibrate, gateway.set_vibrate_mode(mode));
        }
        if let Some(percent) = target.ring_volume {
            let units = ring_volume_units(gateway.max_ring_volume_units(), percent.value());
            report.record(ProfileField::RingVolume, gateway.set_ring_volume_units(units));
        }
        if let Some(enabled) = target.wifi {
            report.record(ProfileField::Wifi, gateway.set_wifi_enabled(enabled));
        }
        if let Some(percent) = target.brightness {
            let outcome = self
                .brightness
                .write_brightness(gateway, percent)
                .map(|_| ());
            report.record(ProfileField::Brightness, outcome);
        }

        for (field, err) in report.failures() {
            log::warn!("failed to apply {}: {err}", field.label());
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::ScriptedGateway;
    use crate::profile::{Percent, RingerMode, VibrateRingerMode};

    #[test]
    fn one_failing_field_does_not_abort_the_rest() {
        let mut gateway = ScriptedGateway {
            fail_wifi: true,
            ..ScriptedGateway::default()
        };
        let applier = ProfileApplier::new(CapabilityTier::BaselineOnly);
        let target = DeviceProfile {
            ringer: Some(RingerMode::Vibrate),
            wifi: Some(false),
            ..DeviceProfile::default()
        };

        let report = applier.apply(&mut gateway, &target);

        assert!(!report.all_succeeded());
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(
            report.outcome(ProfileField::Wifi),
            Some(Err(Error::WriteFailed(_)))
        ));
        assert_eq!(report.outcome(ProfileField::Ringer), Some(&Ok(())));
        // The ringer write landed even though wifi failed.
        assert_eq!(gateway.ringer, RingerMode::Vibrate);
        assert!(gateway.wifi, "failed wifi write must leave the radio alone");
    }

    #[test]
    fn partial_profile_touches_only_its_fields() {
        let mut gateway = ScriptedGateway::default();
        let applier = ProfileApplier::new(CapabilityTier::BaselineOnly);
        let target = DeviceProfile {
            ringer: Some(RingerMode::Silent),
            wifi: Some(false),
            ..DeviceProfile::default()
        };

        let report = applier.apply(&mut gateway, &target);

        assert!(report.all_succeeded());
        assert_eq!(gateway.writes, vec!["set_ringer_mode", "set_wifi_enabled"]);
        assert_eq!(gateway.raw, Some(140), "brightness left untouched");
        assert_eq!(gateway.units, 5, "volume left untouched");
    }

    #[test]
    fn empty_profile_is_a_no_op() {
        let mut gateway = ScriptedGateway::default();
        let applier = ProfileApplier::new(CapabilityTier::BaselineOnly);

        let report = applier.apply(&mut gateway, &DeviceProfile::default());

        assert!(report.is_empty());
        assert!(report.all_succeeded());
        assert!(gateway.writes.is_empty());
    }

    #[test]
    fn ring_volume_rounds_onto_device_units() {
        assert_eq!(ring_volume_units(7, 50), 4); // 3.5 rounds up
        assert_eq!(ring_volume_units(7, 0), 0);
        assert_eq!(ring_volume_units(7, 100), 7);
        assert_eq!(ring_volume_units(15, 33), 5); // 4.95 rounds up
    }

    #[test]
    fn full_profile_applies_every_field() {
        let mut gateway = ScriptedGateway::default();
        let applier = ProfileApplier::new(CapabilityTier::WindowHint);
        let target = DeviceProfile {
            ringer: Some(RingerMode::Normal),
            vibrate: Some(VibrateRingerMode::OnlyWhenSilent),
            ring_volume: Some(Percent::clamped(100)),
            wifi: Some(true),
            brightness: Some(Percent::clamped(80)),
        };

        let report = applier.apply(&mut gateway, &target);

        assert!(report.all_succeeded());
        assert_eq!(gateway.vibrate, VibrateRingerMode::OnlyWhenSilent);
        assert_eq!(gateway.units, 7);
        assert_eq!(gateway.raw, Some(crate::brightness::raw_from_percent(80)));
        assert!(gateway.hint.is_some(), "window hint attempted on this tier");
    }

    #[test]
    fn report_renders_per_field_outcomes() {
        let mut gateway = ScriptedGateway {
            fail_wifi: true,
            ..ScriptedGateway::default()
        };
        let applier = ProfileApplier::new(CapabilityTier::BaselineOnly);
        let target = DeviceProfile {
            ringer: Some(RingerMode::Silent),
            wifi: Some(false),
            ..DeviceProfile::default()
        };

        let rendered = applier.apply(&mut gateway, &target).to_string();
        assert!(rendered.contains("ringer: ok"));
        assert!(rendered.contains("wifi: failed"));

        assert_eq!(ApplyReport::default().to_string(), "nothing to apply");
    }
}
