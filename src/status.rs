use crate::profile::DeviceProfile;

/// Render a profile as one labeled line per set field.
pub fn status_text(profile: &DeviceProfile) -> String {
    let mut lines = Vec::new();
    if let Some(mode) = profile.ringer {
        lines.push(format!("Ringer: {mode}"));
    }
    if let Some(mode) = profile.vibrate {
        lines.push(format!("Vibrate: {mode}"));
    }
    if let Some(percent) = profile.ring_volume {
        lines.push(format!("Ring volume: {percent}"));
    }
    if let Some(enabled) = profile.wifi {
        lines.push(format!("Wifi: {}", if enabled { "on" } else { "off" }));
    }
    if let Some(percent) = profile.brightness {
        lines.push(format!("Brightness: {percent}"));
    }

    if lines.is_empty() {
        "No settings observed yet".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Percent, RingerMode, VibrateRingerMode};

    #[test]
    fn renders_one_line_per_set_field() {
        let profile = DeviceProfile {
            ringer: Some(RingerMode::Normal),
            vibrate: Some(VibrateRingerMode::WhenPossible),
            ring_volume: Some(Percent::clamped(80)),
            wifi: Some(true),
            brightness: Some(Percent::clamped(62)),
        };

        assert_eq!(
            status_text(&profile),
            "Ringer: Normal\nVibrate: When possible\nRing volume: 80%\nWifi: on\nBrightness: 62%"
        );
    }

    #[test]
    fn skips_unset_fields() {
        let profile = DeviceProfile {
            wifi: Some(false),
            ..DeviceProfile::default()
        };
        assert_eq!(status_text(&profile), "Wifi: off");
    }

    #[test]
    fn empty_profile_renders_a_placeholder() {
        assert_eq!(status_text(&DeviceProfile::default()), "No settings observed yet");
    }
}
