//! Google Calendar API client.
//!
//! A low-level HTTP client for the slice of the Calendar v3 API this
//! program consumes: paging the calendar list, creating a calendar,
//! registering it in the account's visible list, and inserting events.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use weeksync_core::{EventRecord, ReminderOverride};

use crate::error::{ProviderError, ProviderResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Overrides the API base URL (tests point this at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Fetches one page of the account's calendar list.
    ///
    /// The returned page carries the continuation token for the next
    /// page, or `None` when the listing is exhausted.
    pub async fn list_calendars_page(
        &self,
        page_token: Option<&str>,
    ) -> ProviderResult<CalendarListPage> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let mut request = self.http_client.get(&url).bearer_auth(&self.access_token);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let body = self.execute(request).await?;
        Self::parse(&body)
    }

    /// Creates a new secondary calendar.
    pub async fn insert_calendar(
        &self,
        summary: &str,
        time_zone: &str,
    ) -> ProviderResult<CalendarResource> {
        let url = format!("{}/calendars", self.base_url);
        let payload = serde_json::json!({ "summary": summary, "timeZone": time_zone });

        let request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload);

        let body = self.execute(request).await?;
        debug!("created calendar {:?}", summary);
        Self::parse(&body)
    }

    /// Registers a calendar in the account's visible calendar list.
    pub async fn insert_calendar_list_entry(&self, calendar_id: &str) -> ProviderResult<()> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "id": calendar_id }));

        self.execute(request).await?;
        Ok(())
    }

    /// Inserts an event, asking the service to notify every attendee.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventPayload,
    ) -> ProviderResult<CreatedEvent> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("sendUpdates", "all")])
            .json(event);

        let body = self.execute(request).await?;
        Self::parse(&body)
    }

    /// Sends a request and maps transport/status failures to provider errors.
    async fn execute(&self, request: reqwest::RequestBuilder) -> ProviderResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::authorization("access denied to calendar"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))
    }

    fn parse<T: DeserializeOwned>(body: &str) -> ProviderResult<T> {
        serde_json::from_str(body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// One page of the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListPage {
    /// Calendars on this page.
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    /// Continuation token; absent on the final page.
    pub next_page_token: Option<String>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar's display name.
    #[serde(default)]
    pub summary: String,
    /// The calendar timezone.
    pub time_zone: Option<String>,
    /// Whether this is the primary calendar.
    #[serde(default)]
    pub primary: bool,
}

/// A calendar resource, as returned by calendar insertion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResource {
    /// The calendar ID.
    pub id: String,
    /// The calendar's display name.
    #[serde(default)]
    pub summary: String,
}

/// The event body submitted to the events.insert endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// Event title.
    pub summary: String,
    /// Event description.
    pub description: String,
    /// First-occurrence start, with the named zone.
    pub start: EventDateTime,
    /// First-occurrence end, with the named zone.
    pub end: EventDateTime,
    /// Recurrence rules; always a single weekly RRULE here.
    pub recurrence: Vec<String>,
    /// Invited attendees.
    pub attendees: Vec<Attendee>,
    /// Reminder policy: defaults disabled, explicit overrides only.
    pub reminders: Reminders,
}

/// Start/end of an event: RFC 3339 timestamp plus the IANA zone name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

/// A bare email attendee reference.
#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    pub email: String,
}

/// The reminders block of an event body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

impl EventPayload {
    /// Builds the wire payload for a derived event record.
    pub fn from_record(
        record: &EventRecord,
        attendees: &[String],
        reminders: &[ReminderOverride],
    ) -> Self {
        let time_zone = record.start.timezone().name().to_string();
        Self {
            summary: record.title.clone(),
            description: record.description.clone(),
            start: EventDateTime {
                date_time: record.start.to_rfc3339(),
                time_zone: time_zone.clone(),
            },
            end: EventDateTime {
                date_time: record.end.to_rfc3339(),
                time_zone,
            },
            recurrence: vec![record.recurrence.clone()],
            attendees: attendees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
            reminders: Reminders {
                use_default: false,
                overrides: reminders.to_vec(),
            },
        }
    }
}

/// A created event, as returned by the events.insert endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    /// The event ID.
    pub id: String,
    /// Browser link to the event.
    pub html_link: Option<String>,
}
