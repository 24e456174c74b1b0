use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, ObservabilitySettings};
use service_core::error::AppError;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    /// Whether only this machine can reach the listener.
    pub fn is_loopback(&self) -> bool {
        self.host == "localhost"
            || self
                .host
                .parse::<IpAddr>()
                .is_ok_and(|address| address.is_loopback())
    }
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    /// Project URL of the hosted backend (e.g. https://xyz.supabase.co).
    pub url: String,
    /// Public (anon) API key. Row-level security does the real gating.
    pub anon_key: Secret<String>,
    #[serde(default = "default_photo_bucket")]
    pub photo_bucket: String,
    /// Where the signed-in session is kept between runs. Not persisted when unset.
    #[serde(default)]
    pub session_file: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_photo_bucket() -> String {
    "upload-photos".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let configuration_directory = core_config::configuration_directory("nivela-frontend")?;
    core_config::load(&configuration_directory)
}
