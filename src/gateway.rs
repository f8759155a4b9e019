// Device capability interface and the file-backed simulated gateway used by
// the CLI and tests. All operations return explicit outcomes; nothing panics
// across this boundary.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::prefs_storage::PrefsStorage;
use crate::profile::{RingerMode, VibrateRingerMode};

/// Platform write path for brightness, ranked by availability and resolved
/// once by the platform binding. The core never re-probes per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTier {
    /// Window-level brightness hint is available (newer tiers).
    WindowHint,
    /// Only the privileged legacy hardware service is available (old tiers).
    LegacyHardware,
    /// Neither live-repaint path exists; baseline writes only.
    BaselineOnly,
}

impl CapabilityTier {
    fn ident(self) -> &'static str {
        match self {
            CapabilityTier::WindowHint => "window_hint",
            CapabilityTier::LegacyHardware => "legacy_hardware",
            CapabilityTier::BaselineOnly => "baseline",
        }
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ident())
    }
}

impl FromStr for CapabilityTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "window_hint" => Ok(CapabilityTier::WindowHint),
            "legacy_hardware" => Ok(CapabilityTier::LegacyHardware),
            "baseline" => Ok(CapabilityTier::BaselineOnly),
            other => Err(format!(
                "Invalid capability tier '{other}', expected 'window_hint', 'legacy_hardware' or 'baseline'"
            )),
        }
    }
}

/// Read/write access to the device settings surface.
///
/// Implementations are platform bindings; this crate ships [`SimulatedGateway`]
/// so the binary and tests have a device to talk to.
pub trait DeviceGateway: Send {
    fn ringer_mode(&self) -> RingerMode;
    fn set_ringer_mode(&mut self, mode: RingerMode) -> Result<()>;

    fn vibrate_mode(&self) -> VibrateRingerMode;
    fn set_vibrate_mode(&mut self, mode: VibrateRingerMode) -> Result<()>;

    fn max_ring_volume_units(&self) -> u32;
    fn set_ring_volume_units(&mut self, units: u32) -> Result<()>;

    fn set_wifi_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Raw brightness in device units. `Err(NotFound)` when the backing
    /// setting is absent on this device.
    fn raw_brightness(&self) -> Result<u16>;
    fn set_raw_brightness(&mut self, raw: u16) -> Result<()>;

    /// Best-effort live-repaint path on newer tiers. `Err(Unsupported)`
    /// elsewhere; never authoritative.
    fn try_set_window_brightness_hint(&mut self, fraction: f32) -> Result<()>;

    /// Privileged backlight write on very old tiers. `Err(Unsupported)`
    /// elsewhere; never authoritative.
    fn try_legacy_hardware_brightness(&mut self, raw: u16) -> Result<()>;
}

const KEY_RINGER: &str = "autoprofile.device.ringer";
const KEY_VIBRATE: &str = "autoprofile.device.vibrate";
const KEY_MAX_UNITS: &str = "autoprofile.device.max_ring_volume_units";
const KEY_UNITS: &str = "autoprofile.device.ring_volume_units";
const KEY_WIFI: &str = "autoprofile.device.wifi";
const KEY_BRIGHTNESS_RAW: &str = "autoprofile.device.brightness_raw";
const KEY_TIER: &str = "autoprofile.device.tier";

const DEFAULT_MAX_UNITS: u32 = 7;
const DEFAULT_UNITS: u32 = 5;
const DEFAULT_BRIGHTNESS_RAW: u16 = 140;

/// In-memory device stand-in, optionally persisted so consecutive CLI
/// invocations observe each other's writes.
pub struct SimulatedGateway {
    ringer: RingerMode,
    vibrate: VibrateRingerMode,
    max_units: u32,
    units: u32,
    wifi: bool,
    /// `None` models a device whose brightness setting is absent.
    raw_brightness: Option<u16>,
    window_hint: Option<f32>,
    tier: CapabilityTier,
    storage: Option<PrefsStorage>,
}

impl SimulatedGateway {
    /// Fresh device with no backing file.
    pub fn new(tier: CapabilityTier) -> Self {
        Self {
            ringer: RingerMode::Normal,
            vibrate: VibrateRingerMode::WhenPossible,
            max_units: DEFAULT_MAX_UNITS,
            units: DEFAULT_UNITS,
            wifi: true,
            raw_brightness: Some(DEFAULT_BRIGHTNESS_RAW),
            window_hint: None,
            tier,
            storage: None,
        }
    }

    /// Load device state from storage. An empty or missing file reads as a
    /// fresh device; a populated file without the brightness key models a
    /// device whose brightness setting is absent.
    pub fn load(storage: PrefsStorage) -> Self {
        let map = match storage.load() {
            Ok(map) => map,
            Err(err) => {
                log::error!("failed to load device state: {err}");
                HashMap::new()
            }
        };

        let mut gateway = if map.is_empty() {
            Self::new(CapabilityTier::WindowHint)
        } else {
            Self {
                ringer: parsed_or(&map, KEY_RINGER, RingerMode::Normal),
                vibrate: parsed_or(&map, KEY_VIBRATE, VibrateRingerMode::WhenPossible),
                max_units: parsed_or(&map, KEY_MAX_UNITS, DEFAULT_MAX_UNITS),
                units: parsed_or(&map, KEY_UNITS, DEFAULT_UNITS),
                wifi: parsed_or(&map, KEY_WIFI, true),
                raw_brightness: map
                    .get(KEY_BRIGHTNESS_RAW)
                    .and_then(|value| value.parse::<u16>().ok()),
                window_hint: None,
                tier: parsed_or(&map, KEY_TIER, CapabilityTier::WindowHint),
                storage: None,
            }
        };
        gateway.storage = Some(storage);
        gateway
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn wifi_enabled(&self) -> bool {
        self.wifi
    }

    pub fn ring_volume_units(&self) -> u32 {
        self.units
    }

    pub fn window_hint(&self) -> Option<f32> {
        self.window_hint
    }

    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let mut map = HashMap::new();
        map.insert(KEY_RINGER.to_string(), self.ringer.ident().to_string());
        map.insert(KEY_VIBRATE.to_string(), self.vibrate.ident().to_string());
        map.insert(KEY_MAX_UNITS.to_string(), self.max_units.to_string());
        map.insert(KEY_UNITS.to_string(), self.units.to_string());
        map.insert(KEY_WIFI.to_string(), self.wifi.to_string());
        if let Some(raw) = self.raw_brightness {
            map.insert(KEY_BRIGHTNESS_RAW.to_string(), raw.to_string());
        }
        map.insert(KEY_TIER.to_string(), self.tier.to_string());
        if let Err(err) = storage.save(&map) {
            log::error!("failed to save device state: {err}");
        }
    }
}

fn parsed_or<T: FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    let Some(value) = map.get(key) else {
        return default;
    };
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            log::warn!("ignoring malformed device state '{key}': '{value}'");
            default
        }
    }
}

impl DeviceGateway for SimulatedGateway {
    fn ringer_mode(&self) -> RingerMode {
        self.ringer
    }

    fn set_ringer_mode(&mut self, mode: RingerMode) -> Result<()> {
        self.ringer = mode;
        self.persist();
        Ok(())
    }

    fn vibrate_mode(&self) -> VibrateRingerMode {
        self.vibrate
    }

    fn set_vibrate_mode(&mut self, mode: VibrateRingerMode) -> Result<()> {
        self.vibrate = mode;
        self.persist();
        Ok(())
    }

    fn max_ring_volume_units(&self) -> u32 {
        self.max_units
    }

    fn set_ring_volume_units(&mut self, units: u32) -> Result<()> {
        self.units = units.min(self.max_units);
        self.persist();
        Ok(())
    }

    fn set_wifi_enabled(&mut self, enabled: bool) -> Result<()> {
        self.wifi = enabled;
        self.persist();
        Ok(())
    }

    fn raw_brightness(&self) -> Result<u16> {
        self.raw_brightness.ok_or(Error::NotFound)
    }

    fn set_raw_brightness(&mut self, raw: u16) -> Result<()> {
        self.raw_brightness = Some(raw.min(255));
        self.persist();
        Ok(())
    }

    fn try_set_window_brightness_hint(&mut self, fraction: f32) -> Result<()> {
        if self.tier != CapabilityTier::WindowHint {
            return Err(Error::Unsupported);
        }
        self.window_hint = Some(fraction);
        Ok(())
    }

    fn try_legacy_hardware_brightness(&mut self, _raw: u16) -> Result<()> {
        if self.tier != CapabilityTier::LegacyHardware {
            return Err(Error::Unsupported);
        }
        // The legacy service repaints from the raw value already written at
        // the baseline; nothing extra to record for the simulated device.
        Ok(())
    }
}
