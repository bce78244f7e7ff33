//! INI file configuration adapter.
//!
//! Sections used by simtrader: `[session]`, `[engine]`, `[autotrade]` and
//! `[feed]`.

use crate::domain::error::SimtraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

/// Values are trimmed and a key with an empty value reads as absent.
/// Numbers may use `_` as a digit separator (`initial_balance = 1_000_000`).
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimtraderError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| SimtraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, SimtraderError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| SimtraderError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { ini })
    }

    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn lookup_number<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        let raw = self.lookup(section, key)?;
        raw.replace('_', "").parse().ok()
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.lookup_number(section, key).unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.lookup_number::<f64>(section, key)
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key)
            .and_then(|v| parse_switch(&v))
            .unwrap_or(default)
    }
}
