//! Config file discovery and layered loading (spec §1).
//!
//! 1. Parse embedded `defaults.toml` → base, snapshot it.
//! 2. Merge `~/.bouncer/config.toml` (user).
//! 3. Merge `{workspace}/bouncer.toml` (workspace; highest file precedence).
//! 4. Apply `BOUNCER_*` env var fallbacks for fields no file layer touched.
//! 5. Deserialize the merged tree → `BouncerConfig`.
//! 6. Validate.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::BouncerConfig;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB); guards against a misconfigured
/// path pointing at something enormous.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the unified configuration with layered file precedence.
///
/// `workspace_root` is the directory to look for `bouncer.toml` in (e.g.
/// the daemon's working directory); skipped if `None`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is malformed or the merged
/// configuration fails validation.
pub fn load(workspace_root: Option<&Path>) -> ConfigResult<BouncerConfig> {
    load_with_home(workspace_root, None)
}

/// Load with an explicit home-directory override, for tests and alternate
/// deployment layouts.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is malformed or the merged
/// configuration fails validation.
pub fn load_with_home(workspace_root: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<BouncerConfig> {
    let env_vars = collect_env_vars();

    let defaults: toml::Value = toml::from_str(DEFAULTS_TOML).map_err(|source| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source,
    })?;
    let mut merged = defaults.clone();

    let home_dir = match home_override {
        Some(path) => Some(path.to_path_buf()),
        None => directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
    };

    if let Some(home) = &home_dir {
        let user_path = home.join(".bouncer").join("config.toml");
        if let Some(overlay) = try_load_file(&user_path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %user_path.display(), "loaded user config");
        }
    }

    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join("bouncer.toml");
        if let Some(overlay) = try_load_file(&ws_path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %ws_path.display(), "loaded workspace config");
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &defaults, &env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: BouncerConfig = merged.try_into().map_err(|source| ConfigError::ParseError { path: "<merged config>".to_owned(), source })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a single file, with no layering (used by `--config`
/// overrides and tests).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<BouncerConfig> {
    let content = read_capped(path)?;
    let config: BouncerConfig = toml::from_str(&content).map_err(|source| ConfigError::ParseError { path: path.display().to_string(), source })?;
    validate::validate(&config)?;
    Ok(config)
}

fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        }
        Err(source) => return Err(ConfigError::ReadError { path: path.display().to_string(), source }),
    };
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit", content.len()),
        });
    }
    let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::ParseError { path: path.display().to_string(), source })?;
    Ok(Some(value))
}

fn read_capped(path: &Path) -> ConfigResult<String> {
    let metadata = std::fs::metadata(path).map_err(|source| ConfigError::ReadError { path: path.display().to_string(), source })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit", metadata.len()),
        });
    }
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_deserialize() {
        let config: BouncerConfig = toml::from_str(DEFAULTS_TOML).expect("embedded defaults must parse");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8787");
        assert!(config.classifier.safelist_prefixes.contains(&"aws s3 ls".to_owned()));
    }

    #[test]
    fn load_without_any_files_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_with_home(Some(dir.path()), Some(dir.path())).unwrap();
        assert_eq!(config.approval.timeout_secs, 300);
    }

    #[test]
    fn workspace_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bouncer.toml"), "[approval]\ntimeout_secs = 900\n").unwrap();
        let config = load_with_home(Some(dir.path()), Some(dir.path())).unwrap();
        assert_eq!(config.approval.timeout_secs, 900);
    }

    #[test]
    fn load_file_rejects_missing_path() {
        let result = load_file(Path::new("/nonexistent/bouncer.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
