//! Engine settings: defaults, `bf.toml`, and `BF_*` environment overrides.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use cross_xdg::BaseDirs;
use tracing::{debug, warn};

use crate::tape::CellWidth;

pub const DEFAULT_CAPACITY: usize = 30_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Names the config file explicitly, bypassing the XDG lookup.
pub const CONFIG_PATH_VAR: &str = "BF_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of tape cells.
    pub capacity: usize,
    pub cell_width: CellWidth,
    /// Step budget for supervised runs; `None` is unlimited.
    pub max_steps: Option<u64>,
    /// Wall-clock budget for the `run` command.
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cell_width: CellWidth::U8,
            max_steps: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Defaults, overlaid with the config file (if any), overlaid with the
    /// process environment.
    pub fn load() -> Self {
        let mut cfg = Self::default();
        if let Some(content) = read_config_file() {
            cfg.apply_pairs(&parse_engine_table(&content), "config file");
        }
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    /// Apply `BF_CAPACITY`, `BF_CELL_WIDTH`, `BF_MAX_STEPS` and
    /// `BF_TIMEOUT_MS` as looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let pairs: HashMap<String, String> = [
            ("capacity", "BF_CAPACITY"),
            ("cell_width", "BF_CELL_WIDTH"),
            ("max_steps", "BF_MAX_STEPS"),
            ("timeout_ms", "BF_TIMEOUT_MS"),
        ]
        .into_iter()
        .filter_map(|(key, var)| lookup(var).map(|v| (key.to_string(), v)))
        .collect();
        self.apply_pairs(&pairs, "environment");
    }

    fn apply_pairs(&mut self, pairs: &HashMap<String, String>, origin: &str) {
        let cfg = self;

        macro_rules! set {
            ($field:ident, $key:literal) => {
                if let Some(raw) = pairs.get($key) {
                    match parse_value(raw) {
                        Some(v) => cfg.$field = v,
                        None => warn!(key = $key, value = %raw, origin, "ignoring invalid setting"),
                    }
                }
            };
        }

        set!(capacity, "capacity");
        set!(cell_width, "cell_width");
        set!(timeout_ms, "timeout_ms");

        if let Some(raw) = pairs.get("max_steps") {
            match parse_value::<u64>(raw) {
                Some(v) => cfg.max_steps = Some(v),
                None => warn!(key = "max_steps", value = %raw, origin, "ignoring invalid setting"),
            }
        }
    }
}

fn parse_value<T>(raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.trim().replace('_', "").parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(value = raw, error = %e, "setting did not parse");
            None
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        return Some(PathBuf::from(path));
    }

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bf.toml");
    Some(path)
}

fn read_config_file() -> Option<String> {
    let path = config_path()?;
    match fs::read_to_string(&path) {
        Ok(content) => {
            debug!(path = %path.display(), "loaded config file");
            Some(content)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no config file");
            None
        }
    }
}

/// Very small line-based reader: collect `key = value` pairs from the
/// `[engine]` table. Values may be quoted; `#` starts a comment line.
fn parse_engine_table(content: &str) -> HashMap<String, String> {
    let mut in_engine = false;
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_engine = line[1..line.len() - 1].trim() == "engine";
            continue;
        }
        if !in_engine {
            continue;
        }
        if let Some((key, val_raw)) = line.split_once('=') {
            let val_raw = val_raw.trim();
            let val = if val_raw.len() >= 2 && val_raw.starts_with('"') && val_raw.ends_with('"') {
                &val_raw[1..val_raw.len() - 1]
            } else {
                val_raw
            };
            map.insert(key.trim().to_string(), val.to_string());
        }
    }
    map
}
