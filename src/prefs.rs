// Profile preference store with change notification, persisted through
// PrefsStorage. Default keys are collected from the PrefSpec registry.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::brightness::{DEFAULT_TOGGLE_HIGH, DEFAULT_TOGGLE_LOW};
use crate::prefs_storage::PrefsStorage;
use crate::profile::{BrightnessRange, DeviceProfile, Percent};

/// Static preference metadata for defaults and help output. Modules submit
/// their own specs through `inventory`.
#[derive(Debug, Clone, Copy)]
pub struct PrefSpec {
    pub key: &'static str,
    pub default: &'static str,
}

inventory::collect!(PrefSpec);

/// All registered preference specs, sorted by key.
pub fn pref_specs() -> Vec<&'static PrefSpec> {
    let mut specs: Vec<&'static PrefSpec> = inventory::iter::<PrefSpec>.into_iter().collect();
    specs.sort_by_key(|spec| spec.key);
    specs
}

pub mod keys {
    pub const RINGER: &str = "autoprofile.profile.ringer";
    pub const VIBRATE: &str = "autoprofile.profile.vibrate";
    pub const RING_VOLUME: &str = "autoprofile.profile.ring_volume";
    pub const WIFI: &str = "autoprofile.profile.wifi";
    pub const BRIGHTNESS: &str = "autoprofile.profile.brightness";
    pub const BRIGHTNESS_MIN: &str = "autoprofile.brightness.min";
    pub const BRIGHTNESS_MAX: &str = "autoprofile.brightness.max";
    pub const SETTLE_DELAY_MS: &str = "autoprofile.settle_delay_ms";
}

// Profile fields default to unset; an empty value means "leave that setting
// alone" when the profile is applied.
inventory::submit! { PrefSpec { key: keys::RINGER, default: "" } }
inventory::submit! { PrefSpec { key: keys::VIBRATE, default: "" } }
inventory::submit! { PrefSpec { key: keys::RING_VOLUME, default: "" } }
inventory::submit! { PrefSpec { key: keys::WIFI, default: "" } }
inventory::submit! { PrefSpec { key: keys::BRIGHTNESS, default: "" } }

const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Callback invoked with the changed key after a preference value changes.
pub type PrefChangeNotify = Arc<dyn Fn(&str) + Send + Sync>;

/// Key/value preference store shared by the controller and the CLI.
pub struct ProfileStore {
    map: RwLock<HashMap<String, String>>,
    storage: PrefsStorage,
    subscribers: Mutex<Vec<PrefChangeNotify>>,
}

impl ProfileStore {
    pub fn new(storage: PrefsStorage) -> Self {
        let map = match storage.load() {
            Ok(map) => map,
            Err(err) => {
                log::error!("failed to load preference storage: {err}");
                HashMap::new()
            }
        };
        Self {
            map: RwLock::new(map),
            storage,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map
            .read()
            .expect("prefs read lock poisoned")
            .get(key)
            .cloned()
    }

    /// Store a value and notify subscribers. A write that does not change
    /// the stored value is a no-op and notifies nobody.
    pub fn update(&self, key: &str, value: &str) {
        {
            let mut map = self.map.write().expect("prefs write lock poisoned");
            if map.get(key).is_some_and(|current| current == value) {
                return;
            }
            map.insert(key.to_string(), value.to_string());
            let snapshot = map.clone();
            drop(map);
            if let Err(err) = self.storage.save(&snapshot) {
                log::error!("failed to save preference storage: {err}");
            }
        }
        self.notify(key);
    }

    /// Register a change-notification callback. Callbacks run on the thread
    /// performing the update.
    pub fn subscribe(&self, notify: PrefChangeNotify) {
        self.subscribers
            .lock()
            .expect("prefs subscriber lock poisoned")
            .push(notify);
    }

    fn notify(&self, key: &str) {
        let subscribers = self
            .subscribers
            .lock()
            .expect("prefs subscriber lock poisoned")
            .clone();
        for subscriber in subscribers {
            subscriber(key);
        }
    }

    /// Seed every registered spec's default for keys not yet present.
    pub fn ensure_defaults(&self) {
        let mut map = self.map.write().expect("prefs write lock poisoned");
        for spec in inventory::iter::<PrefSpec> {
            map.entry(spec.key.to_string())
                .or_insert_with(|| spec.default.to_string());
        }
        let snapshot = map.clone();
        drop(map);
        if let Err(err) = self.storage.save(&snapshot) {
            log::error!("failed to save preference storage: {err}");
        }
    }

    /// The stored target profile. Absent, blank, or malformed fields read as
    /// unset; a bad persisted string must never abort the apply path.
    pub fn load_profile(&self) -> DeviceProfile {
        DeviceProfile {
            ringer: self.parsed_field(keys::RINGER),
            vibrate: self.parsed_field(keys::VIBRATE),
            ring_volume: self.percent_field(keys::RING_VOLUME),
            wifi: self.parsed_field(keys::WIFI),
            brightness: self.percent_field(keys::BRIGHTNESS),
        }
    }

    /// Persist a target profile, clearing keys for unset fields.
    pub fn save_profile(&self, profile: &DeviceProfile) {
        self.update(
            keys::RINGER,
            &profile.ringer.map(|m| m.ident().to_string()).unwrap_or_default(),
        );
        self.update(
            keys::VIBRATE,
            &profile.vibrate.map(|m| m.ident().to_string()).unwrap_or_default(),
        );
        self.update(
            keys::RING_VOLUME,
            &profile
                .ring_volume
                .map(|p| p.value().to_string())
                .unwrap_or_default(),
        );
        self.update(
            keys::WIFI,
            &profile.wifi.map(|w| w.to_string()).unwrap_or_default(),
        );
        self.update(
            keys::BRIGHTNESS,
            &profile
                .brightness
                .map(|p| p.value().to_string())
                .unwrap_or_default(),
        );
    }

    /// Configured brightness toggle bounds, possibly inverted as stored.
    pub fn load_brightness_range(&self) -> BrightnessRange {
        let low = self
            .percent_field(keys::BRIGHTNESS_MIN)
            .unwrap_or_else(|| Percent::clamped(DEFAULT_TOGGLE_LOW));
        let high = self
            .percent_field(keys::BRIGHTNESS_MAX)
            .unwrap_or_else(|| Percent::clamped(DEFAULT_TOGGLE_HIGH));
        BrightnessRange::new(low, high)
    }

    pub fn settle_delay(&self) -> Duration {
        let ms = self
            .parsed_field(keys::SETTLE_DELAY_MS)
            .unwrap_or(DEFAULT_SETTLE_DELAY_MS);
        Duration::from_millis(ms)
    }

    fn parsed_field<T: FromStr>(&self, key: &str) -> Option<T>
    where
        T::Err: fmt::Display,
    {
        let value = self.get(key)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse() {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!("ignoring preference '{key}': {err}");
                None
            }
        }
    }

    fn percent_field(&self, key: &str) -> Option<Percent> {
        let value: u8 = self.parsed_field(key)?;
        match Percent::new(value) {
            Ok(percent) => Some(percent),
            Err(err) => {
                log::warn!("ignoring preference '{key}': {err}");
                None
            }
        }
    }
}

/// Parse a `key=value` (or `key:value`) CLI argument into a map entry.
pub fn parse_pref_arg(arg: &str) -> Result<(String, String), String> {
    let trimmed = arg.trim();
    let sep_index = trimmed
        .find(['=', ':'])
        .ok_or_else(|| format!("missing '=' or ':' in preference '{trimmed}'"))?;
    let (key, value) = trimmed.split_at(sep_index);
    let value = &value[1..];
    if key.is_empty() {
        return Err(format!("missing key in preference '{trimmed}'"));
    }
    if key.chars().any(|c| c.is_whitespace()) {
        return Err(format!("preference key '{key}' cannot contain whitespace"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
