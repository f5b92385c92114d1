//! Layered configuration resolution shared by the gateway and system-server
//! binaries: CLI argument > environment variable > TOML config file >
//! compiled default. Each binary's own `Config` struct calls these resolvers
//! per field rather than inheriting a single shared struct, since the two
//! services' option sets barely overlap.

use crate::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// `MINIMUM_LISTEN_TIME` env var: seconds of cumulative PLAY time required
/// per side before a vote is accepted. Default: 5.0.
pub const ENV_MINIMUM_LISTEN_TIME: &str = "MINIMUM_LISTEN_TIME";
pub const DEFAULT_MINIMUM_LISTEN_TIME: f64 = 5.0;

/// `GATEWAY_URL`: base URL the gateway advertises to clients / uses to
/// self-reference in generated links.
pub const ENV_GATEWAY_URL: &str = "GATEWAY_URL";

/// `SYSTEMS_BASE_URL`: base URL prefix the registry resolves relative
/// system endpoints against, when a catalog entry omits a full URL.
pub const ENV_SYSTEMS_BASE_URL: &str = "SYSTEMS_BASE_URL";

/// `FLAKINESS`: probability in [0, 1] of injected dispatch failure, used in
/// local/staging runs to exercise retry and one-resample-of-failing-side
/// paths without a real flaky backend. Default: 0.
pub const ENV_FLAKINESS: &str = "FLAKINESS";
pub const DEFAULT_FLAKINESS: f64 = 0.0;

/// Administrative CLI exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 2;
    pub const REGISTRY_NOT_FOUND: i32 = 3;
    pub const SECRET_MISSING: i32 = 4;
}

/// Resolve a string-valued setting: CLI arg, then environment variable, then
/// a key in a TOML config file (if `config_path` is given and parses), then
/// `default`.
pub fn resolve_str(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_path: Option<&PathBuf>,
    toml_key: &str,
    default: &str,
) -> String {
    if let Some(v) = cli_arg {
        return v.to_string();
    }
    if let Ok(v) = std::env::var(env_var_name) {
        return v;
    }
    if let Some(v) = read_toml_str(config_path, toml_key) {
        return v;
    }
    default.to_string()
}

/// Same resolution order as [`resolve_str`], parsing the resolved string via
/// `FromStr`. Returns [`Error::Config`] if a value was found but failed to
/// parse at any layer.
pub fn resolve_parsed<T>(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_path: Option<&PathBuf>,
    toml_key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::fmt::Display,
{
    if let Some(v) = cli_arg {
        return v
            .parse()
            .map_err(|e| Error::Config(format!("invalid value for {toml_key}: {e}")));
    }
    if let Ok(v) = std::env::var(env_var_name) {
        return v
            .parse()
            .map_err(|e| Error::Config(format!("invalid value for {env_var_name}: {e}")));
    }
    if let Some(v) = read_toml_str(config_path, toml_key) {
        return v
            .parse()
            .map_err(|e| Error::Config(format!("invalid value for {toml_key} in config file: {e}")));
    }
    Ok(default)
}

fn read_toml_str(config_path: Option<&PathBuf>, key: &str) -> Option<String> {
    let path = config_path?;
    let contents = std::fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&contents).ok()?;
    value.get(key)?.as_str().map(str::to_string)
}

/// OS-dependent default root data directory, following the platform
/// conventions of `dirs`.
pub fn default_data_dir(app_name: &str) -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(app_name))
            .unwrap_or_else(|| PathBuf::from(format!("/var/lib/{app_name}")))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(app_name))
            .unwrap_or_else(|| PathBuf::from(format!("/Library/Application Support/{app_name}")))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(app_name))
            .unwrap_or_else(|| PathBuf::from(format!("C:\\ProgramData\\{app_name}")))
    } else {
        PathBuf::from(format!("./{app_name}_data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_takes_priority() {
        let got = resolve_str(Some("cli"), "ARENA_TEST_VAR_UNSET", None, "key", "default");
        assert_eq!(got, "cli");
    }

    #[test]
    fn falls_back_to_default_when_nothing_set() {
        let got = resolve_str(None, "ARENA_TEST_VAR_DEFINITELY_UNSET", None, "key", "default");
        assert_eq!(got, "default");
    }

    #[test]
    fn resolve_parsed_rejects_bad_cli_value() {
        let err = resolve_parsed::<f64>(Some("not-a-number"), "ARENA_TEST_VAR_UNSET", None, "k", 0.0);
        assert!(err.is_err());
    }

    #[test]
    fn resolve_parsed_falls_back_to_default() {
        let got =
            resolve_parsed::<f64>(None, "ARENA_TEST_VAR_DEFINITELY_UNSET", None, "k", 5.0).unwrap();
        assert_eq!(got, 5.0);
    }
}
