use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use cross_xdg::BaseDirs;
use log::{debug, warn};

use crate::machine::TAPE_LEN;

/// Env var naming an explicit config file; overrides the XDG location.
pub const CONFIG_ENV: &str = "TAPEBF_CONFIG";
pub const TAPE_LEN_ENV: &str = "TAPEBF_TAPE_LEN";
pub const MAX_STEPS_ENV: &str = "TAPEBF_MAX_STEPS";
pub const TIMEOUT_ENV: &str = "TAPEBF_TIMEOUT_MS";

/// Machine limits as given by one source (flags or the config file).
/// `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub tape_len: Option<usize>,
    pub max_steps: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// Fully resolved limits for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub tape_len: usize,
    pub max_steps: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl Limits {
    /// Resolve each limit: flags -> env -> config file -> default.
    pub fn resolve(flags: &Settings, file: &Settings) -> Limits {
        Limits {
            tape_len: flags
                .tape_len
                .or_else(|| from_env(TAPE_LEN_ENV))
                .or(file.tape_len)
                .unwrap_or(TAPE_LEN)
                .max(1),
            max_steps: flags
                .max_steps
                .or_else(|| from_env(MAX_STEPS_ENV))
                .or(file.max_steps),
            timeout_ms: flags
                .timeout_ms
                .or_else(|| from_env(TIMEOUT_ENV))
                .or(file.timeout_ms),
        }
    }
}

fn from_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Load settings from the config file, if there is one.
pub fn load() -> Settings {
    let Some(path) = config_path() else {
        return Settings::default();
    };
    match fs::read_to_string(&path) {
        Ok(content) => {
            debug!("loaded config from {}", path.display());
            parse(&content)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(e) => {
            warn!("config: cannot read {}: {e}", path.display());
            Settings::default()
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(explicit));
    }

    let base_dirs = BaseDirs::new().ok()?;

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let config_home = base_dirs.config_home();

    let mut path = PathBuf::from(config_home);
    path.push("tapebf.toml");
    Some(path)
}

/// Very small hand-rolled reader: looks for a `[machine]` section with
/// `key = value` pairs. Values may be quoted.
pub fn parse(content: &str) -> Settings {
    let mut settings = Settings::default();
    let mut in_machine = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_machine = &line[1..line.len() - 1] == "machine";
            continue;
        }
        if !in_machine {
            continue;
        }

        let Some((key, raw)) = line.split_once('=') else {
            warn!("config: ignoring line without '=': {line}");
            continue;
        };
        let key = key.trim();
        let raw = raw.trim();
        let value = raw
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(raw);

        let ok = match key {
            "tape_len" => set(&mut settings.tape_len, value),
            "max_steps" => set(&mut settings.max_steps, value),
            "timeout_ms" => set(&mut settings.timeout_ms, value),
            _ => {
                warn!("config: unknown key '{key}'");
                continue;
            }
        };
        if !ok {
            warn!("config: invalid value for '{key}': {value}");
        }
    }

    settings
}

fn set<T: FromStr>(slot: &mut Option<T>, value: &str) -> bool {
    match value.parse::<T>() {
        Ok(v) => {
            *slot = Some(v);
            true
        }
        Err(_) => false,
    }
}
