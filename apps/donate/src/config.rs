use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use donation_core::{ControllerOptions, StatusPolling};
use serde::Deserialize;
use shared::domain::Network;
use tracing::warn;

const DEFAULT_SETTINGS_FILE: &str = "donate.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gateway_url: String,
    pub api_key: Option<String>,
    pub network: Network,
    /// Zero disables the per-call timeout.
    pub call_timeout_secs: u64,
    pub status_poll_attempts: u32,
    pub status_poll_interval_ms: u64,
    /// Player invocation, e.g. `paplay --volume={volume} {file}`.
    pub sound_command: Option<String>,
    pub sound_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:8787".into(),
            api_key: None,
            network: Network::Testnet,
            call_timeout_secs: 60,
            status_poll_attempts: 1,
            status_poll_interval_ms: 2_000,
            sound_command: None,
            sound_file: None,
        }
    }
}

impl Settings {
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            call_timeout: (self.call_timeout_secs > 0)
                .then(|| Duration::from_secs(self.call_timeout_secs)),
            status_polling: StatusPolling {
                attempts: self.status_poll_attempts.max(1),
                interval: Duration::from_millis(self.status_poll_interval_ms),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    gateway_url: Option<String>,
    api_key: Option<String>,
    network: Option<Network>,
    call_timeout_secs: Option<u64>,
    status_poll_attempts: Option<u32>,
    status_poll_interval_ms: Option<u64>,
    sound_command: Option<String>,
    sound_file: Option<PathBuf>,
}

/// Defaults, then the settings file, then `DONATE__*` environment variables.
///
/// An explicit `path` must exist; the default `donate.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let file = match path {
        Some(path) => Some((
            path.to_path_buf(),
            fs::read_to_string(path)
                .with_context(|| format!("failed to read settings '{}'", path.display()))?,
        )),
        None => fs::read_to_string(DEFAULT_SETTINGS_FILE)
            .ok()
            .map(|raw| (PathBuf::from(DEFAULT_SETTINGS_FILE), raw)),
    };
    if let Some((path, raw)) = file {
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.gateway_url {
        settings.gateway_url = v;
    }
    if let Some(v) = file_cfg.api_key {
        settings.api_key = Some(v);
    }
    if let Some(v) = file_cfg.network {
        settings.network = v;
    }
    if let Some(v) = file_cfg.call_timeout_secs {
        settings.call_timeout_secs = v;
    }
    if let Some(v) = file_cfg.status_poll_attempts {
        settings.status_poll_attempts = v;
    }
    if let Some(v) = file_cfg.status_poll_interval_ms {
        settings.status_poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.sound_command {
        settings.sound_command = Some(v);
    }
    if let Some(v) = file_cfg.sound_file {
        settings.sound_file = Some(v);
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PAYMENT_GATEWAY_URL") {
        settings.gateway_url = v;
    }
    if let Some(v) = var("DONATE__GATEWAY_URL") {
        settings.gateway_url = v;
    }

    if let Some(v) = var("PAYMENT_GATEWAY_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = var("DONATE__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = var("DONATE__NETWORK") {
        match v.parse() {
            Ok(network) => settings.network = network,
            Err(err) => warn!("config: ignoring DONATE__NETWORK: {err}"),
        }
    }

    if let Some(v) = var("DONATE__CALL_TIMEOUT_SECS") {
        parse_into(&mut settings.call_timeout_secs, "DONATE__CALL_TIMEOUT_SECS", &v);
    }
    if let Some(v) = var("DONATE__STATUS_POLL_ATTEMPTS") {
        parse_into(
            &mut settings.status_poll_attempts,
            "DONATE__STATUS_POLL_ATTEMPTS",
            &v,
        );
    }
    if let Some(v) = var("DONATE__STATUS_POLL_INTERVAL_MS") {
        parse_into(
            &mut settings.status_poll_interval_ms,
            "DONATE__STATUS_POLL_INTERVAL_MS",
            &v,
        );
    }

    if let Some(v) = var("DONATE__SOUND_COMMAND") {
        settings.sound_command = Some(v);
    }
    if let Some(v) = var("DONATE__SOUND_FILE") {
        settings.sound_file = Some(PathBuf::from(v));
    }
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("config: ignoring {key}={raw:?}, not a number"),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            r#"
gateway_url = "https://pay.example.test"
network = "mainnet"
call_timeout_secs = 0
status_poll_attempts = 4
"#,
        )
        .expect("apply file");

        assert_eq!(settings.gateway_url, "https://pay.example.test");
        assert_eq!(settings.network, Network::Mainnet);
        assert_eq!(settings.status_poll_attempts, 4);
        assert_eq!(settings.status_poll_interval_ms, 2_000);

        let options = settings.controller_options();
        assert_eq!(options.call_timeout, None);
        assert_eq!(options.status_polling.attempts, 4);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut settings = Settings::default();
        assert!(apply_file(&mut settings, "recipient = \"0xdead\"").is_err());
    }

    #[test]
    fn prefixed_env_wins_over_plain_env() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env(&[
                ("PAYMENT_GATEWAY_URL", "http://plain.test"),
                ("DONATE__GATEWAY_URL", "http://prefixed.test"),
                ("DONATE__NETWORK", "mainnet"),
                ("DONATE__STATUS_POLL_ATTEMPTS", "3"),
            ]),
        );

        assert_eq!(settings.gateway_url, "http://prefixed.test");
        assert_eq!(settings.network, Network::Mainnet);
        assert_eq!(settings.status_poll_attempts, 3);
    }

    #[test]
    fn malformed_env_numbers_keep_previous_value() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env(&[
                ("DONATE__CALL_TIMEOUT_SECS", "soon"),
                ("DONATE__NETWORK", "devnet"),
            ]),
        );

        assert_eq!(settings.call_timeout_secs, 60);
        assert_eq!(settings.network, Network::Testnet);
    }

    #[test]
    fn zero_poll_attempts_still_query_once() {
        let settings = Settings {
            status_poll_attempts: 0,
            ..Settings::default()
        };
        assert_eq!(settings.controller_options().status_polling.attempts, 1);
    }

    #[test]
    fn explicit_settings_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "sound_command = \"paplay --volume={{volume}} {{file}}\"")
            .expect("write settings");

        let settings = load_settings(Some(file.path())).expect("load settings");
        assert_eq!(
            settings.sound_command.as_deref(),
            Some("paplay --volume={volume} {file}")
        );
    }

    #[test]
    fn missing_explicit_settings_path_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_settings(Some(&dir.path().join("absent.toml"))).expect_err("must fail");
        assert!(err.to_string().contains("absent.toml"));
    }
}
