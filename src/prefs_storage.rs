// Xresources-style key/value file storage shared by the preference store and
// the simulated device state.
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct PrefsStorage {
    path: PathBuf,
}

impl PrefsStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default preference file under the user config directory.
    pub fn default_prefs_path() -> PathBuf {
        config_dir().join("Prefs.xresources")
    }

    /// Default simulated-device state file under the user config directory.
    pub fn default_device_path() -> PathBuf {
        config_dir().join("Device.xresources")
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load all entries. A missing file reads as an empty map.
    pub fn load(&self) -> Result<HashMap<String, String>, String> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(err) => {
                return Err(format!("unable to open {}: {err}", self.path.display()));
            }
        };

        let mut map = HashMap::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line =
                line.map_err(|err| format!("unable to read {}: {err}", self.path.display()))?;
            match parse_line(&line) {
                Ok(Some((key, value))) => {
                    map.insert(key, value);
                }
                Ok(None) => {}
                Err(err) => {
                    return Err(format!(
                        "{} line {}: {err}",
                        self.path.display(),
                        index + 1
                    ));
                }
            }
        }

        Ok(map)
    }

    /// Write all entries sorted by key, creating parent directories as needed.
    pub fn save(&self, map: &HashMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| format!("unable to create {}: {err}", parent.display()))?;
        }

        let mut file = fs::File::create(&self.path)
            .map_err(|err| format!("unable to open {}: {err}", self.path.display()))?;

        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(value) = map.get(key) {
                writeln!(file, "{key}: {value}")
                    .map_err(|err| format!("unable to write {}: {err}", self.path.display()))?;
            }
        }

        Ok(())
    }
}

fn config_dir() -> PathBuf {
    let mut path = match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home),
        None => PathBuf::from("."),
    };
    path.push(".config");
    path.push("autoprofile");
    path
}

// Lines are `key: value` or `key = value`; `!` and `#` start comments.
fn parse_line(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with('#') {
        return Ok(None);
    }

    let sep_index = trimmed
        .find([':', '='])
        .ok_or_else(|| "missing ':' or '=' separator".to_string())?;
    let (key, value) = trimmed.split_at(sep_index);
    let key = key.trim();
    let value = value[1..].trim();

    if key.is_empty() {
        return Err("empty key".to_string());
    }

    Ok(Some((key.to_string(), value.to_string())))
}
