// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote job source.
//
// Every endpoint is a JSON POST to `baseUrl + endpoint` answered with an
// envelope `{ success, message?, data? }`. Transport failures map to
// `RemoteUnreachable`; HTTP errors, `success: false` and unreadable bodies
// map to `RemoteRejected`.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use ticketwerk_core::config::ApiConfig;
use ticketwerk_core::error::{Result, TicketwerkError};
use ticketwerk_core::{DeviceStatus, Job, JobStatus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where jobs come from and where their status goes.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Report this device's address and learn whether it is approved.
    async fn ping(&self, ip: IpAddr) -> Result<DeviceStatus>;

    /// Up to `limit` pending jobs, in the order they should print.
    async fn fetch_jobs(&self, limit: u32) -> Result<Vec<FetchedJob>>;

    async fn update_job_status(&self, job_id: &str, status: JobStatus, error_message: Option<&str>) -> Result<()>;
}

/// One entry of a fetched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedJob {
    Ready(Job),
    /// Identified, but its payload could not be read. Still owed a
    /// terminal status.
    Unreadable { id: String, reason: String },
}

impl FetchedJob {
    pub fn id(&self) -> &str {
        match self {
            Self::Ready(job) => &job.id,
            Self::Unreadable { id, .. } => id,
        }
    }

    /// Parse one raw `data.jobs` entry. `None` when it carries no id, since
    /// such an entry cannot be reported back.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        let id = value.get("id").and_then(serde_json::Value::as_str).map(str::to_string);
        match (serde_json::from_value::<Job>(value), id) {
            (Ok(job), _) => Some(Self::Ready(job)),
            (Err(e), Some(id)) => Some(Self::Unreadable {
                id,
                reason: format!("unreadable job payload: {e}"),
            }),
            (Err(e), None) => {
                warn!(error = %e, "dropping job entry without an id");
                None
            }
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PingRequest<'a> {
    api_key: &'a str,
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct PingData {
    status: DeviceStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobsRequest<'a> {
    api_key: &'a str,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct JobsData {
    #[serde(default)]
    jobs: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    api_key: &'a str,
    job_id: &'a str,
    status: JobStatus,
    error_message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyRequest<'a> {
    api_key: &'a str,
}

/// Body of a device registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub ip_address: String,
    pub company_id: Option<String>,
}

/// What the service issues on registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub api_key: String,
    pub name: String,
    pub status: DeviceStatus,
}

/// Device record as returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub status: DeviceStatus,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Thin JSON-over-HTTP client shared by registration and the job source.
#[derive(Debug, Clone)]
struct ApiClient {
    client: Client,
    api: ApiConfig,
}

impl ApiClient {
    fn new(api: ApiConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| TicketwerkError::InvalidConfiguration(format!("HTTP client: {e}")))?;
        Ok(Self { client, api })
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.api.url(endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TicketwerkError::RemoteUnreachable(format!("{url}: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TicketwerkError::RemoteUnreachable(format!("{url}: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|env| env.message)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            return Err(TicketwerkError::RemoteRejected(format!("HTTP {}: {message}", status.as_u16())));
        }

        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|e| TicketwerkError::RemoteRejected(format!("malformed response from {endpoint}: {e}")))?;
        if !envelope.success {
            return Err(TicketwerkError::RemoteRejected(
                envelope.message.unwrap_or_else(|| format!("{endpoint} reported failure")),
            ));
        }
        Ok(envelope.data)
    }
}

/// `JobSource` backed by the ticket service's printer API.
#[derive(Debug, Clone)]
pub struct HttpJobSource {
    http: ApiClient,
    api_key: String,
}

impl HttpJobSource {
    pub fn new(api: ApiConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: ApiClient::new(api, timeout)?,
            api_key: api_key.into(),
        })
    }

    /// Current device record.
    #[instrument(skip(self))]
    pub async fn device_status(&self) -> Result<DeviceInfo> {
        self.http
            .post::<_, DeviceInfo>(&self.http.api.endpoints.status, &ApiKeyRequest { api_key: &self.api_key })
            .await?
            .ok_or_else(|| TicketwerkError::RemoteRejected("status response has no device".into()))
    }
}

/// Register a new device. Needs no credentials; the response carries them.
#[instrument(skip(api, request), fields(name = %request.name))]
pub async fn register_device(api: &ApiConfig, timeout: Duration, request: &RegisterRequest) -> Result<Registration> {
    let http = ApiClient::new(api.clone(), timeout)?;
    let registration = http
        .post::<_, Registration>(&api.endpoints.register, request)
        .await?
        .ok_or_else(|| TicketwerkError::RemoteRejected("registration response has no device".into()))?;
    info!(device_id = %registration.id, status = %registration.status, "device registered");
    Ok(registration)
}

#[async_trait]
impl JobSource for HttpJobSource {
    #[instrument(skip(self))]
    async fn ping(&self, ip: IpAddr) -> Result<DeviceStatus> {
        let body = PingRequest {
            api_key: &self.api_key,
            ip_address: ip.to_string(),
        };
        let data = self
            .http
            .post::<_, PingData>(&self.http.api.endpoints.ping, &body)
            .await?
            .ok_or_else(|| TicketwerkError::RemoteRejected("ping response has no status".into()))?;
        debug!(status = %data.status, "ping acknowledged");
        Ok(data.status)
    }

    #[instrument(skip(self))]
    async fn fetch_jobs(&self, limit: u32) -> Result<Vec<FetchedJob>> {
        let body = JobsRequest {
            api_key: &self.api_key,
            limit,
        };
        let raw = self
            .http
            .post::<_, JobsData>(&self.http.api.endpoints.get_jobs, &body)
            .await?
            .map(|data| data.jobs)
            .unwrap_or_default();

        let jobs: Vec<FetchedJob> = raw.into_iter().filter_map(FetchedJob::from_value).collect();
        for job in &jobs {
            if let FetchedJob::Unreadable { id, reason } = job {
                warn!(job_id = %id, reason = %reason, "received unreadable job");
            }
        }
        if !jobs.is_empty() {
            info!(count = jobs.len(), "received print jobs");
        }
        Ok(jobs)
    }

    #[instrument(skip(self, error_message))]
    async fn update_job_status(&self, job_id: &str, status: JobStatus, error_message: Option<&str>) -> Result<()> {
        let body = UpdateRequest {
            api_key: &self.api_key,
            job_id,
            status,
            error_message,
        };
        self.http
            .post::<_, serde_json::Value>(&self.http.api.endpoints.update_job, &body)
            .await?;
        debug!("job status updated");
        Ok(())
    }
}
