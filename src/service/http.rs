//! REST client for the ticket service.
//!
//! The bearer token is marked sensitive on every request so it never shows up
//! in reqwest's debug output.

use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{Result, TaskboardError};
use crate::filter::TicketQuery;
use crate::session::{Credential, Role, SessionUser};
use crate::types::{ProjectId, Ticket, TicketId};

use super::error::{ApiError, RetryPolicy, execute_with_retry};
use super::{TicketPatch, TicketService};

/// FastAPI-style error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: u64,
    email: String,
    role: Role,
}

pub struct HttpTicketService {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl HttpTicketService {
    /// Build a client from configuration, using its timeouts and retry policy
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url()?,
            retry: config.retry_policy(),
        })
    }

    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: Url::parse(base_url)?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /auth/me`: the user the credential belongs to
    pub async fn fetch_current_user(&self, credential: &Credential) -> Result<SessionUser> {
        let url = self.endpoint(&["auth", "me"])?;
        let response = self
            .send(|| self.client.request(Method::GET, url.clone()), credential, None)
            .await?;
        let me: MeResponse = response.json().await?;
        Ok(SessionUser::new(me.id, me.email, me.role))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TaskboardError::Config(format!("server URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request with retry, turning non-success responses into errors.
    /// `ticket` is the ticket a 404 would refer to.
    async fn send<F>(
        &self,
        build: F,
        credential: &Credential,
        ticket: Option<TicketId>,
    ) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Sync,
    {
        let auth = &bearer(credential)?;
        let build = &build;
        execute_with_retry(self.retry, move || async move {
            let response = build()
                .header(header::AUTHORIZATION, auth.clone())
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            Err(api_error(response).await.into_error(ticket))
        })
        .await
    }
}

impl TicketService for HttpTicketService {
    async fn list_tickets(
        &self,
        project: ProjectId,
        query: &TicketQuery,
        credential: &Credential,
    ) -> Result<Vec<Ticket>> {
        let mut url = self.endpoint(&["tickets", "projects", &project.to_string()])?;
        if !query.is_empty() {
            url.set_query(Some(&query.to_query_string()));
        }
        tracing::debug!(%project, query = %query.to_query_string(), "listing tickets");

        let response = self
            .send(|| self.client.request(Method::GET, url.clone()), credential, None)
            .await?;
        let records: Vec<serde_json::Value> = response.json().await?;
        Ok(decode_tickets(records))
    }

    async fn patch_ticket(
        &self,
        id: TicketId,
        patch: &TicketPatch,
        credential: &Credential,
    ) -> Result<Ticket> {
        let url = self.endpoint(&["tickets", &id.to_string()])?;
        tracing::debug!(ticket = %id, ?patch, "patching ticket");

        let response = self
            .send(
                || self.client.request(Method::PATCH, url.clone()).json(patch),
                credential,
                Some(id),
            )
            .await?;
        Ok(response.json().await?)
    }
}

fn bearer(credential: &Credential) -> Result<header::HeaderValue> {
    let mut value = header::HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
        .map_err(|_| TaskboardError::Config("token contains invalid characters".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

async fn api_error(response: Response) -> ApiError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let body = response.text().await.unwrap_or_default();
    let message = parse_detail(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    let error = ApiError::new(status, message);
    match retry_after {
        Some(seconds) => error.with_retry_after(seconds),
        None => error,
    }
}

fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Decode list records one at a time. Records the board cannot represent,
/// such as a status outside the three known columns, are dropped.
fn decode_tickets(records: Vec<serde_json::Value>) -> Vec<Ticket> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.get("id").and_then(|v| v.as_u64());
            match serde_json::from_value::<Ticket>(record) {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    tracing::warn!(ticket = ?id, error = %e, "dropping unreadable ticket record");
                    None
                }
            }
        })
        .collect()
}
