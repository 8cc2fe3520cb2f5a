// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration.
//
// Two JSON files live in the configuration directory: `config.json` (remote
// endpoints and printer settings, written by `ticketwerk setup` or by hand)
// and `credentials.json` (the device id and API key issued at registration).
// Both are read once at startup into an immutable `AgentConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicketwerkError};

pub const CONFIG_FILE: &str = "config.json";
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "TICKETWERK_CONFIG_DIR";

/// Last-resort configuration directory for system-wide installs.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/ticketwerk";

/// Remote service location and endpoint paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to, e.g. `https://host/api`.
    pub base_url: String,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl ApiConfig {
    /// Full URL for an endpoint path.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Endpoints {
    pub register: String,
    pub ping: String,
    pub status: String,
    pub get_jobs: String,
    pub update_job: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            register: "/printer/register".into(),
            ping: "/printer/ping".into(),
            status: "/printer/status".into(),
            get_jobs: "/printer/get-jobs".into(),
            update_job: "/printer/update-job".into(),
        }
    }
}

/// Device-side printing and polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrinterSettings {
    /// Display name sent when registering.
    pub name: String,
    pub company_id: Option<String>,
    /// Milliseconds between polling cycles.
    #[serde(rename = "pollInterval")]
    pub poll_interval_ms: u64,
    /// Maximum jobs fetched per cycle.
    pub job_limit: u32,
    #[serde(rename = "requestTimeout")]
    pub request_timeout_ms: u64,
    /// Character device of the thermal printer. `null` disables thermal output.
    pub thermal_device: Option<PathBuf>,
    #[serde(rename = "thermalTimeout")]
    pub thermal_timeout_ms: u64,
    /// Spooler executable for the system strategy.
    pub spooler_command: String,
    /// Destination queue passed as `-d <queue>`.
    pub spooler_queue: Option<String>,
    #[serde(rename = "spoolerTimeout")]
    pub spooler_timeout_ms: u64,
    /// Wireless interface used for IP and WiFi lookups.
    pub network_interface: String,
    /// Prefix privileged network commands with `sudo`.
    pub use_sudo: bool,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            name: "ticketwerk".into(),
            company_id: None,
            poll_interval_ms: 5_000,
            job_limit: 3,
            request_timeout_ms: 10_000,
            thermal_device: Some(PathBuf::from("/dev/usb/lp0")),
            thermal_timeout_ms: 5_000,
            spooler_command: "lp".into(),
            spooler_queue: None,
            spooler_timeout_ms: 30_000,
            network_interface: "wlan0".into(),
            use_sudo: false,
        }
    }
}

impl PrinterSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn thermal_timeout(&self) -> Duration {
        Duration::from_millis(self.thermal_timeout_ms)
    }

    pub fn spooler_timeout(&self) -> Duration {
        Duration::from_millis(self.spooler_timeout_ms)
    }
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub printer: PrinterSettings,
}

impl FileConfig {
    /// Read `config.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let config: Self = read_json(&path, TicketwerkError::ConfigurationMissing)?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config.json` into `dir`, creating the directory if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE), json)?;
        Ok(())
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(TicketwerkError::InvalidConfiguration(format!(
                "api.baseUrl must be an http(s) URL, got {base:?}"
            )));
        }
        if self.printer.poll_interval_ms == 0 {
            return Err(TicketwerkError::InvalidConfiguration(
                "printer.pollInterval must be greater than zero".into(),
            ));
        }
        if self.printer.job_limit == 0 {
            return Err(TicketwerkError::InvalidConfiguration(
                "printer.jobLimit must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Contents of `credentials.json`, issued by the remote service on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub device_id: String,
    pub api_key: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Credentials {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CREDENTIALS_FILE);
        let creds: Self = read_json(&path, TicketwerkError::CredentialsMissing)?;
        if creds.api_key.trim().is_empty() {
            return Err(TicketwerkError::InvalidConfiguration(format!(
                "{} has an empty apiKey",
                path.display()
            )));
        }
        Ok(creds)
    }

    /// Write `credentials.json` into `dir`. The file is readable by the owner only.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(CREDENTIALS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// API key with all but the first and last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

/// Everything the agent needs at runtime, loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Directory the files were read from.
    pub dir: PathBuf,
    pub api: ApiConfig,
    pub printer: PrinterSettings,
    pub credentials: Credentials,
}

impl AgentConfig {
    /// Load `config.json` and `credentials.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let file = FileConfig::load(dir)?;
        let credentials = Credentials::load(dir)?;
        tracing::debug!(dir = %dir.display(), base_url = %file.api.base_url, "configuration loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            api: file.api,
            printer: file.printer,
            credentials,
        })
    }

    /// Effective configuration as JSON with the API key masked.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "configDir": self.dir,
            "api": self.api,
            "printer": self.printer,
            "credentials": {
                "deviceId": self.credentials.device_id,
                "apiKey": self.credentials.masked_api_key(),
                "name": self.credentials.name,
            },
        })
    }
}

/// Pick the configuration directory.
///
/// Order: explicit path, `TICKETWERK_CONFIG_DIR`, `$XDG_CONFIG_HOME/ticketwerk`,
/// `$HOME/.config/ticketwerk`, then `/etc/ticketwerk`.
pub fn resolve_config_dir(explicit: Option<&Path>) -> PathBuf {
    resolve_config_dir_with(explicit, |key| std::env::var(key).ok())
}

fn resolve_config_dir_with(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(dir) = non_empty(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("ticketwerk");
    }
    if let Some(home) = non_empty("HOME") {
        return PathBuf::from(home).join(".config").join("ticketwerk");
    }
    PathBuf::from(SYSTEM_CONFIG_DIR)
}

/// Hide the middle of a secret, keeping four characters at each end.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
    missing: impl FnOnce(PathBuf) -> TicketwerkError,
) -> Result<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing(path.to_path_buf())),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw)
        .map_err(|e| TicketwerkError::InvalidConfiguration(format!("{}: {e}", path.display())))
}
