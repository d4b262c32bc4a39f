use std::{env, path::PathBuf, str::FromStr};

use pacelink_timing::Nanos;
use thiserror::Error;

/// Which end of the link this process is. Only the `ACT_HOST` default
/// differs: the simulator dials the hardware by name, the hardware binds
/// every interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Simulator,
    Hardware,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key}={value:?}: expected {expected}")]
    Invalid { key: &'static str, value: String, expected: &'static str },
}

/// Runtime configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub act_host: String,
    pub act_port: u16,
    /// Step period; the simulator's cadence.
    pub step: Nanos,
    /// Per-step window to wait for the matching telemetry.
    pub reply_timeout: Nanos,
    pub total_steps: u64,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env(role: Role) -> Result<Self, ConfigError> {
        Self::from_lookup(role, |key| env::var(key).ok())
    }

    /// Parse from any key lookup. `from_env` wires the process environment;
    /// tests inject maps instead of mutating it.
    pub fn from_lookup<F>(role: Role, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let act_host = lookup("ACT_HOST").unwrap_or_else(|| {
            match role {
                Role::Simulator => "act",
                Role::Hardware => "0.0.0.0",
            }
            .to_owned()
        });
        let act_port = parse(&lookup, "ACT_PORT", 5001, "a TCP port")?;
        let step_ms: u64 = parse(&lookup, "STEP_MS", 10, "a step period in whole ms")?;
        if step_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "STEP_MS",
                value: "0".to_owned(),
                expected: "a non-zero step period",
            });
        }
        let reply_timeout_ms = parse(&lookup, "REPLY_TIMEOUT_MS", 2, "a timeout in whole ms")?;
        let total_steps = parse(&lookup, "TOTAL_STEPS", 1000, "a step count")?;
        let log_dir = PathBuf::from(lookup("LOG_DIR").unwrap_or_else(|| "/app/logs".to_owned()));

        Ok(Self {
            act_host,
            act_port,
            step: Nanos::from_millis(step_ms),
            reply_timeout: Nanos::from_millis(reply_timeout_ms),
            total_steps,
            log_dir,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw, expected }),
    }
}
