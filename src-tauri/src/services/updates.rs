//! Periodic release check against a Hazel-style update server.
//!
//! `GET {server}/update/{platform}/{version}` answers 204 when the running
//! version is current and 200 with release metadata otherwise. Installation is
//! left to the user; the control strip is told a release exists.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tauri::{AppHandle, Emitter};
use url::Url;

use super::config::AppSettings;
use crate::windows::overlay_window::CONTROL_STRIP_LABEL;

pub const EVT_UPDATE_AVAILABLE: &str = "update-available";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "pub_date")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available(UpdateInfo),
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("invalid update feed URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("update request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("update server answered {0}")]
    Status(StatusCode),
    #[error("malformed update metadata: {0}")]
    Body(#[from] serde_json::Error),
}

/// Platform names as the update server knows them.
pub fn platform_key() -> &'static str {
    platform_key_for(std::env::consts::OS)
}

fn platform_key_for(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

pub fn feed_url(server: &Url, platform: &str, version: &str) -> Result<Url, UpdateError> {
    let mut base = server.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("update/{platform}/{version}"))?)
}

fn interpret(status: StatusCode, body: &[u8]) -> Result<UpdateStatus, UpdateError> {
    match status {
        StatusCode::NO_CONTENT => Ok(UpdateStatus::UpToDate),
        StatusCode::OK => Ok(UpdateStatus::Available(serde_json::from_slice(body)?)),
        other => Err(UpdateError::Status(other)),
    }
}

pub async fn check_once(client: &reqwest::Client, feed: &Url) -> Result<UpdateStatus, UpdateError> {
    let response = client.get(feed.clone()).send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    interpret(status, &body)
}

/// Starts the background checker. Debug builds and installs without an update
/// server never check. Checking stops once a release has been announced.
pub fn spawn_update_checker(app: &AppHandle, settings: &AppSettings) {
    if cfg!(debug_assertions) {
        log::debug!("Update checks disabled in debug builds");
        return;
    }
    let Some(server) = settings.update_server.as_ref() else {
        log::info!("No update server configured; update checks disabled");
        return;
    };

    let version = app.package_info().version.to_string();
    let feed = match feed_url(server, platform_key(), &version) {
        Ok(feed) => feed,
        Err(err) => {
            log::warn!("{err}");
            return;
        }
    };
    let client = match reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(format!("quick-overlay/{version}"))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            log::warn!("Update checker unavailable: {err}");
            return;
        }
    };

    let app = app.clone();
    let period = settings.update_interval;
    tauri::async_runtime::spawn(async move {
        log::info!("Checking {feed} every {}s", period.as_secs());
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match check_once(&client, &feed).await {
                Ok(UpdateStatus::UpToDate) => log::debug!("Running the latest release"),
                Ok(UpdateStatus::Available(info)) => {
                    log::info!("Update available: {}", info.name);
                    if let Err(err) = app.emit_to(CONTROL_STRIP_LABEL, EVT_UPDATE_AVAILABLE, &info) {
                        log::warn!("Failed to announce update: {err}");
                    }
                    break;
                }
                Err(err) => log::warn!("Update check failed: {err}"),
            }
        }
    });
}
