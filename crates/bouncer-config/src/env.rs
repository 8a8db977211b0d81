//! `BOUNCER_*` environment variable fallbacks (spec §1: env vars are a
//! fallback layer, lower precedence than both config files).

use std::collections::HashMap;

use crate::merge::{get_path, set_path};

/// One env-var-name → dotted-config-path mapping, plus how to parse it.
struct EnvMapping {
    var: &'static str,
    path: &'static str,
    kind: ValueKind,
}

enum ValueKind {
    String,
    Integer,
    Bool,
}

const MAPPINGS: &[EnvMapping] = &[
    EnvMapping { var: "BOUNCER_CHAT_BOT_TOKEN", path: "chat.bot_token", kind: ValueKind::String },
    EnvMapping { var: "BOUNCER_CHAT_ID", path: "chat.chat_id", kind: ValueKind::Integer },
    EnvMapping { var: "BOUNCER_STORE_PATH", path: "store.path", kind: ValueKind::String },
    EnvMapping { var: "BOUNCER_STORE_IN_MEMORY", path: "store.in_memory", kind: ValueKind::Bool },
    EnvMapping { var: "BOUNCER_SERVER_BIND_ADDR", path: "server.bind_addr", kind: ValueKind::String },
    EnvMapping { var: "BOUNCER_SERVER_SHARED_SECRET", path: "server.shared_secret", kind: ValueKind::String },
    EnvMapping { var: "BOUNCER_TRUST_ENABLED", path: "trust.enabled", kind: ValueKind::Bool },
    EnvMapping { var: "BOUNCER_RATE_LIMIT_FAIL_CLOSED", path: "rate_limit.fail_closed", kind: ValueKind::Bool },
    EnvMapping { var: "BOUNCER_LOGGING_FILTER", path: "logging.filter", kind: ValueKind::String },
];

/// Collect only the `BOUNCER_*` variables this crate understands, so the
/// rest of the process environment never flows into config.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    MAPPINGS.iter().filter_map(|mapping| std::env::var(mapping.var).ok().map(|value| (mapping.var.to_owned(), value))).collect()
}

/// Apply an env var to `merged` only where the file layers left the
/// embedded-default value untouched, i.e. env vars are a fallback, never an
/// override of an explicit file setting. `defaults` is the pre-file-layer
/// snapshot used as the "untouched" baseline. Returns how many fields were
/// set this way.
pub fn apply_env_fallbacks(merged: &mut toml::Value, defaults: &toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = 0;
    for mapping in MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var) else { continue };

        let current = get_path(merged, mapping.path);
        let default = get_path(defaults, mapping.path);
        if current.is_some() && current != default {
            // A file layer already set this field; env is fallback-only.
            continue;
        }

        let value = match mapping.kind {
            ValueKind::String => toml::Value::String(raw.clone()),
            ValueKind::Integer => match raw.parse::<i64>() {
                Ok(parsed) => toml::Value::Integer(parsed),
                Err(_) => {
                    tracing::warn!(var = mapping.var, value = raw, "expected an integer, ignoring");
                    continue;
                }
            },
            ValueKind::Bool => match raw.parse::<bool>() {
                Ok(parsed) => toml::Value::Boolean(parsed),
                Err(_) => {
                    tracing::warn!(var = mapping.var, value = raw, "expected true/false, ignoring");
                    continue;
                }
            },
        };
        set_path(merged, mapping.path, value);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_fallback_fills_untouched_default() {
        let defaults: toml::Value = toml::from_str("[chat]\nchat_id = 0\n").unwrap();
        let mut merged = defaults.clone();
        let env_vars = HashMap::from([("BOUNCER_CHAT_ID".to_owned(), "555".to_owned())]);

        let applied = apply_env_fallbacks(&mut merged, &defaults, &env_vars);
        assert_eq!(applied, 1);
        assert_eq!(get_path(&merged, "chat.chat_id").unwrap().as_integer(), Some(555));
    }

    #[test]
    fn env_fallback_never_overrides_a_file_value() {
        let defaults: toml::Value = toml::from_str("[chat]\nchat_id = 0\n").unwrap();
        let mut merged: toml::Value = toml::from_str("[chat]\nchat_id = 111\n").unwrap();
        let env_vars = HashMap::from([("BOUNCER_CHAT_ID".to_owned(), "555".to_owned())]);

        apply_env_fallbacks(&mut merged, &defaults, &env_vars);
        assert_eq!(get_path(&merged, "chat.chat_id").unwrap().as_integer(), Some(111));
    }
}
