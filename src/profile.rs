// Profile value types: ringer modes, percent units, and partial device profiles.
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Ringer behavior for incoming calls. Exactly one mode is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingerMode {
    Normal,
    Silent,
    Vibrate,
}

impl RingerMode {
    /// Stable lowercase identifier used for stored values; `FromStr` accepts it.
    pub fn ident(self) -> &'static str {
        match self {
            RingerMode::Normal => "normal",
            RingerMode::Silent => "silent",
            RingerMode::Vibrate => "vibrate",
        }
    }
}

impl fmt::Display for RingerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", capitalize(self.ident()))
    }
}

impl FromStr for RingerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(RingerMode::Normal),
            "silent" => Ok(RingerMode::Silent),
            "vibrate" => Ok(RingerMode::Vibrate),
            other => Err(format!(
                "Invalid ringer mode '{other}', expected 'normal', 'silent' or 'vibrate'"
            )),
        }
    }
}

/// Vibrate policy for the ringer, independent of [`RingerMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibrateRingerMode {
    WhenPossible,
    Never,
    OnlyWhenSilent,
}

impl VibrateRingerMode {
    /// Stable lowercase identifier used for stored values; `FromStr` accepts it.
    pub fn ident(self) -> &'static str {
        match self {
            VibrateRingerMode::WhenPossible => "when_possible",
            VibrateRingerMode::Never => "never",
            VibrateRingerMode::OnlyWhenSilent => "only_when_silent",
        }
    }
}

impl fmt::Display for VibrateRingerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", capitalize(&self.ident().replace('_', " ")))
    }
}

impl FromStr for VibrateRingerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "when_possible" => Ok(VibrateRingerMode::WhenPossible),
            "never" => Ok(VibrateRingerMode::Never),
            "only_when_silent" => Ok(VibrateRingerMode::OnlyWhenSilent),
            other => Err(format!(
                "Invalid vibrate mode '{other}', expected 'when_possible', 'never' or 'only_when_silent'"
            )),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Normalized percentage in 0..=100, the unit for ring volume and brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent(u8);

impl Percent {
    pub fn new(value: u8) -> Result<Self> {
        if value > 100 {
            return Err(Error::InvalidRange(value));
        }
        Ok(Self(value))
    }

    /// Build a percent from a possibly-overshooting value, clamping to 100.
    pub fn clamped(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// User-configured brightness toggle bounds. The pair may arrive inverted;
/// [`BrightnessRange::normalized`] swaps so low <= high before any use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessRange {
    pub low: Percent,
    pub high: Percent,
}

impl BrightnessRange {
    pub fn new(low: Percent, high: Percent) -> Self {
        Self { low, high }
    }

    pub fn normalized(self) -> (Percent, Percent) {
        if self.low <= self.high {
            (self.low, self.high)
        } else {
            (self.high, self.low)
        }
    }
}

/// A target bundle of device settings. Unset fields are left untouched when
/// the profile is applied; fully-unset profiles are legal no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceProfile {
    pub ringer: Option<RingerMode>,
    pub vibrate: Option<VibrateRingerMode>,
    pub ring_volume: Option<Percent>,
    pub wifi: Option<bool>,
    pub brightness: Option<Percent>,
}

impl DeviceProfile {
    pub fn is_empty(&self) -> bool {
        self.ringer.is_none()
            && self.vibrate.is_none()
            && self.ring_volume.is_none()
            && self.wifi.is_none()
            && self.brightness.is_none()
    }
}
