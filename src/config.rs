use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use cross_xdg::BaseDirs;
use tracing::{debug, warn};

use crate::engine::{EngineConfig, DEFAULT_STACK_CAPACITY, DEFAULT_TAPE_LEN};

pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Engine limits and run controls, before command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tape_len: usize,
    pub stack_capacity: usize,
    pub timeout_ms: u64,
    pub max_steps: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tape_len: DEFAULT_TAPE_LEN,
            stack_capacity: DEFAULT_STACK_CAPACITY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_steps: None,
        }
    }
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tape_len: self.tape_len,
            stack_capacity: self.stack_capacity,
        }
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Settings from the config file and `RLBF_*` environment variables, loaded once.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| {
        let mut cfg = load_from_toml().unwrap_or_default();
        apply_env(&mut cfg, |key| env::var(key).ok());
        cfg
    })
}

fn config_path() -> Option<PathBuf> {
    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("rlbf.toml");
    Some(path)
}

fn load_from_toml() -> Option<Settings> {
    let path = config_path()?;
    let content = fs::read_to_string(&path).ok()?;
    debug!(path = %path.display(), "loaded config file");
    Some(parse_settings(&content))
}

/// Parse the `[engine]` section of a config file.
///
/// Very small hand-rolled parser: `key = value` lines, `#` comments, values
/// optionally quoted. Unknown keys and unparsable values are skipped.
pub fn parse_settings(content: &str) -> Settings {
    let mut in_engine = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') && line.ends_with(']') {
            in_engine = &line[1..line.len()-1] == "engine";
            continue;
        }
        if !in_engine { continue; }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim().to_string();
            let val_raw = line[eq+1..].trim();
            let val = if val_raw.starts_with('"') && val_raw.ends_with('"') && val_raw.len() >= 2 {
                val_raw[1..val_raw.len()-1].to_string()
            } else { val_raw.to_string() };
            map.insert(key, val);
        }
    }

    let mut cfg = Settings::default();

    macro_rules! set {
        ($field:ident, $key:literal) => {
            if let Some(raw) = map.get($key) {
                match raw.parse() {
                    Ok(v) => cfg.$field = v,
                    Err(_) => warn!(key = $key, value = %raw, "ignoring invalid config value"),
                }
            }
        };
    }

    set!(tape_len, "tape_len");
    if cfg.tape_len == 0 {
        warn!(key = "tape_len", "ignoring zero tape length");
        cfg.tape_len = DEFAULT_TAPE_LEN;
    }
    set!(stack_capacity, "stack_capacity");
    set!(timeout_ms, "timeout_ms");
    if let Some(raw) = map.get("max_steps") {
        match raw.parse() {
            Ok(v) => cfg.max_steps = Some(v),
            Err(_) => warn!(key = "max_steps", value = %raw, "ignoring invalid config value"),
        }
    }

    cfg
}

/// Override `cfg` from `RLBF_*` variables looked up through `lookup`.
pub fn apply_env<F>(cfg: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    match env_value(&lookup, "RLBF_TAPE_LEN") {
        Some(0) => warn!(var = "RLBF_TAPE_LEN", "ignoring zero tape length"),
        Some(v) => cfg.tape_len = v,
        None => {}
    }
    if let Some(v) = env_value(&lookup, "RLBF_STACK_CAPACITY") { cfg.stack_capacity = v; }
    if let Some(v) = env_value(&lookup, "RLBF_TIMEOUT_MS") { cfg.timeout_ms = v; }
    if let Some(v) = env_value(&lookup, "RLBF_MAX_STEPS") { cfg.max_steps = Some(v); }
}

fn env_value<T, F>(lookup: &F, var: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var, value = %raw, "ignoring invalid environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse_settings(""), Settings::default());
    }

    #[test]
    fn engine_section_is_read() {
        let cfg = parse_settings(
            "# limits\n[other]\ntape_len = 5\n\n[engine]\ntape_len = 100\nstack_capacity = \"8\"\nmax_steps = 99\n",
        );
        assert_eq!(cfg.tape_len, 100);
        assert_eq!(cfg.stack_capacity, 8);
        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.max_steps, Some(99));
    }

    #[test]
    fn invalid_values_are_skipped() {
        let cfg = parse_settings("[engine]\ntape_len = lots\ntimeout_ms = 10\n");
        assert_eq!(cfg.tape_len, DEFAULT_TAPE_LEN);
        assert_eq!(cfg.timeout_ms, 10);
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg = parse_settings("[engine]\ntape_len = 100\n");
        apply_env(&mut cfg, |key| match key {
            "RLBF_TAPE_LEN" => Some("42".to_string()),
            "RLBF_MAX_STEPS" => Some(" 7 ".to_string()),
            "RLBF_TIMEOUT_MS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(cfg.tape_len, 42);
        assert_eq!(cfg.max_steps, Some(7));
        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn zero_tape_len_is_ignored() {
        let mut cfg = parse_settings("[engine]\ntape_len = 0\n");
        assert_eq!(cfg.tape_len, DEFAULT_TAPE_LEN);

        cfg.tape_len = 64;
        apply_env(&mut cfg, |key| (key == "RLBF_TAPE_LEN").then(|| "0".to_string()));
        assert_eq!(cfg.tape_len, 64);
    }

    #[test]
    fn engine_config_carries_limits() {
        let cfg = Settings { tape_len: 3, stack_capacity: 2, ..Settings::default() };
        assert_eq!(cfg.engine_config(), EngineConfig { tape_len: 3, stack_capacity: 2 });
    }
}
