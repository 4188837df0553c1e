//! # Runtime Configuration Module
//!
//! Environment-variable configuration for the mock server. CLI flags override these values.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `SPECMOCK_STACK_SIZE` | coroutine stack size, decimal or `0x` hex | `0x4000` |
//! | `SPECMOCK_MODE` | `simple` or `comprehensive` integer defaults | `comprehensive` |
//! | `SPECMOCK_POLICY` | `preference` or `success` response selection | `preference` |
//! | `SPECMOCK_SEED` | seed for reproducible output | unset |
//! | `SPECMOCK_ARRAY_MIN` / `SPECMOCK_ARRAY_MAX` | default array length bounds | `1` / `5` |
//! | `SPECMOCK_STRICT` | reject properties the schema does not declare | `false` |
//! | `SPECMOCK_DELEGATE_URL` | external generator endpoint | unset |
//! | `SPECMOCK_DELEGATE_TIMEOUT_MS` | delegate time budget | `2000` |
//!
//! Unparseable values fall back to the default with a warning.
//!
//! ```rust
//! use specmock::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use crate::selector::SelectionPolicy;
use crate::synth::{SynthConfig, SynthMode};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_STACK_SIZE: usize = 0x4000;
const DEFAULT_DELEGATE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Stack size for request coroutines in bytes
    pub stack_size: usize,
    pub mode: SynthMode,
    pub policy: SelectionPolicy,
    pub seed: Option<u64>,
    pub array_min: usize,
    pub array_max: usize,
    /// Reject unknown request properties
    pub strict: bool,
    pub delegate_url: Option<String>,
    pub delegate_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let synth = SynthConfig::default();
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            mode: synth.mode,
            policy: SelectionPolicy::default(),
            seed: None,
            array_min: synth.array_min,
            array_max: synth.array_max,
            strict: false,
            delegate_url: None,
            delegate_timeout: Duration::from_millis(DEFAULT_DELEGATE_TIMEOUT_MS),
        }
    }
}

fn parse_stack_size(val: &str) -> Option<usize> {
    match val.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parsed<T, F>(lookup: &F, key: &str, parse: impl Fn(&str) -> Option<T>, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
            warn!(key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
        None => default,
    }
}

fn from_str_opt<T: FromStr>(s: &str) -> Option<T> {
    s.parse().ok()
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let mut config = Self {
            stack_size: parsed(&lookup, "SPECMOCK_STACK_SIZE", parse_stack_size, d.stack_size),
            mode: parsed(&lookup, "SPECMOCK_MODE", from_str_opt, d.mode),
            policy: parsed(&lookup, "SPECMOCK_POLICY", from_str_opt, d.policy),
            seed: lookup("SPECMOCK_SEED").and_then(|s| {
                let seed = s.trim().parse().ok();
                if seed.is_none() {
                    warn!(value = %s, "Ignoring unparseable SPECMOCK_SEED");
                }
                seed
            }),
            array_min: parsed(&lookup, "SPECMOCK_ARRAY_MIN", from_str_opt, d.array_min),
            array_max: parsed(&lookup, "SPECMOCK_ARRAY_MAX", from_str_opt, d.array_max),
            strict: parsed(&lookup, "SPECMOCK_STRICT", parse_bool, d.strict),
            delegate_url: lookup("SPECMOCK_DELEGATE_URL").filter(|s| !s.trim().is_empty()),
            delegate_timeout: Duration::from_millis(parsed(
                &lookup,
                "SPECMOCK_DELEGATE_TIMEOUT_MS",
                from_str_opt,
                DEFAULT_DELEGATE_TIMEOUT_MS,
            )),
        };
        if config.array_min > config.array_max {
            warn!(
                array_min = config.array_min,
                array_max = config.array_max,
                "Array bounds inverted, using defaults"
            );
            config.array_min = d.array_min;
            config.array_max = d.array_max;
        }
        config
    }

    pub fn synth_config(&self) -> SynthConfig {
        SynthConfig {
            mode: self.mode,
            array_min: self.array_min,
            array_max: self.array_max,
        }
    }
}
