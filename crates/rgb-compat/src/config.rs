//! Compatibility layer configuration.

use std::time::Duration;

use legacy_scheduler::TaskId;
use rgb_tick::TICK_DURATION;

/// Knobs for the compatibility layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatConfig {
    /// First shadow task id. Kept far above anything the legacy scheduler
    /// hands out so the two id spaces never meet.
    pub shadow_id_base: TaskId,
    /// Wall-clock length of one tick, for async delays.
    pub tick_duration: Duration,
    /// Forward calls from modules that are not enabled yet (or anymore) to
    /// the original scheduler untouched.
    pub bypass_uninitialized: bool,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            shadow_id_base: 1_000_000,
            tick_duration: TICK_DURATION,
            bypass_uninitialized: true,
        }
    }
}

impl CompatConfig {
    /// Read overrides from `COMPAT_SHADOW_ID_BASE`, `COMPAT_TICK_MS` and
    /// `COMPAT_BYPASS_UNINITIALIZED`. Unset or unparsable values keep their
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let shadow_id_base = lookup("COMPAT_SHADOW_ID_BASE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.shadow_id_base);

        let tick_duration = lookup("COMPAT_TICK_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_duration);

        let bypass_uninitialized = lookup("COMPAT_BYPASS_UNINITIALIZED")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.bypass_uninitialized);

        Self {
            shadow_id_base,
            tick_duration,
            bypass_uninitialized,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_without_environment() {
        assert_eq!(CompatConfig::from_lookup(|_| None), CompatConfig::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = CompatConfig::from_lookup(|key| {
            match key {
                "COMPAT_SHADOW_ID_BASE" => Some("5000".into()),
                "COMPAT_TICK_MS" => Some(" 25 ".into()),
                "COMPAT_BYPASS_UNINITIALIZED" => Some("off".into()),
                _ => None,
            }
        });
        assert_eq!(
            config,
            CompatConfig {
                shadow_id_base: 5000,
                tick_duration: Duration::from_millis(25),
                bypass_uninitialized: false,
            }
        );
    }

    #[test]
    fn garbage_keeps_defaults() {
        let config = CompatConfig::from_lookup(|key| {
            match key {
                "COMPAT_TICK_MS" => Some("0".into()),
                _ => Some("nope".into()),
            }
        });
        assert_eq!(config, CompatConfig::default());
    }
}
