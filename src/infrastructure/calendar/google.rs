use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::{ports::CalendarApi, CalendarEvent, DomainError, EventDraft};
use crate::infrastructure::config::CalendarConfig;

/// Refresh a cached token this long before Google says it expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    next_page_token: Option<String>,
}

enum Credentials {
    Static(String),
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    Missing,
}

struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

/// Google Calendar v3 REST client.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    calendar_id: String,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendarClient {
    pub fn from_config(config: &CalendarConfig) -> Self {
        let credentials = match (
            &config.access_token,
            &config.client_id,
            &config.client_secret,
            &config.refresh_token,
        ) {
            (_, Some(id), Some(secret), Some(refresh)) => Credentials::Refresh {
                client_id: id.clone(),
                client_secret: secret.clone(),
                refresh_token: refresh.clone(),
            },
            (Some(token), _, _, _) => Credentials::Static(token.clone()),
            _ => Credentials::Missing,
        };

        if matches!(credentials, Credentials::Missing) {
            tracing::warn!("google calendar credentials not configured; calendar tools will fail");
        }

        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            calendar_id: config.calendar_id.clone(),
            credentials,
            token: Mutex::new(None),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        )
    }

    async fn access_token(&self) -> Result<String, DomainError> {
        let (client_id, client_secret, refresh_token) = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::Missing => {
                return Err(DomainError::validation(
                    "Google Calendar credentials are not configured",
                ))
            }
            Credentials::Refresh {
                client_id,
                client_secret,
                refresh_token,
            } => (client_id, client_secret, refresh_token),
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            let fresh = token.expires_at.map_or(true, |at| Instant::now() < at);
            if fresh {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| DomainError::external(format!("google token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::external(format!(
                "google token request failed ({status}): {body}"
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| {
                DomainError::external(format!("google token response parse failed: {e}"))
            })?;

        let expires_at = token
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN));
        tracing::debug!("google access token refreshed");

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, DomainError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(DomainError::external(format!(
        "google {what} request failed ({status}): {body}"
    )))
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_events(
        &self,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<CalendarEvent>, DomainError> {
        let token = self.access_token().await?;
        let url = self.events_url();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url).bearer_auth(&token).query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| DomainError::external(format!("google events request failed: {e}")))?;
            let payload = check(response, "events")
                .await?
                .json::<EventsResponse>()
                .await
                .map_err(|e| DomainError::external(format!("google events parse failed: {e}")))?;

            events.extend(payload.items);
            match payload.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = events.len(), time_min, time_max, "calendar events listed");
        Ok(events)
    }

    async fn insert_event(&self, draft: &EventDraft) -> Result<CalendarEvent, DomainError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&token)
            .query(&[("sendUpdates", "all")])
            .json(draft)
            .send()
            .await
            .map_err(|e| DomainError::external(format!("google insert request failed: {e}")))?;

        let event = check(response, "insert")
            .await?
            .json::<CalendarEvent>()
            .await
            .map_err(|e| DomainError::external(format!("google insert parse failed: {e}")))?;

        tracing::info!(event_id = ?event.id, summary = %draft.summary, "calendar event created");
        Ok(event)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), DomainError> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.events_url(), urlencoding::encode(event_id));
        let response = self
            .http
            .delete(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| DomainError::external(format!("google delete request failed: {e}")))?;

        check(response, "delete").await?;
        tracing::info!(event_id, "calendar event deleted");
        Ok(())
    }
}
