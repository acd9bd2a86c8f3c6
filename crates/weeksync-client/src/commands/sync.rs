//! Schedule synchronization.
//!
//! The run is fully sequential: load the schedule, resolve the target
//! calendar once, then issue one insert call per declared slot in the
//! schedule's own iteration order. The first failure aborts the rest of
//! the run; events created before the failure stay in place.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use weeksync_core::{EventRecord, ScheduleConfig, Weekday};
use weeksync_providers::google::{CalendarRef, EventPayload, GoogleProvider};

use crate::commands::auth::{build_google_config, resolve_google_credentials};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Runs a sync: every slot in the schedule becomes one weekly-recurring
/// event in the named calendar.
pub async fn run(
    schedule_path: &Path,
    credentials_file: Option<PathBuf>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let schedule = ScheduleConfig::load(schedule_path)?;
    debug!(
        "loaded schedule from {} ({} slots)",
        schedule_path.display(),
        schedule.slot_count()
    );

    // Reject an unknown zone before touching the network.
    schedule.timezone()?;

    let (client_id, client_secret, _) =
        resolve_google_credentials(None, None, credentials_file, config.google.as_ref())?;
    let provider = GoogleProvider::new(build_google_config(
        &client_id,
        &client_secret,
        config.google.as_ref(),
    )?)?;

    if !provider.is_authenticated() {
        return Err(ClientError::Config(
            "not authenticated with Google Calendar - run 'weeksync auth google' first".to_string(),
        ));
    }

    let calendar = provider
        .ensure_calendar(&schedule.calendar_name, &schedule.timezone)
        .await?;
    println!("Using calendar: {} id: {}", calendar.summary, calendar.id);

    let created = sync_events(&provider, &schedule, &calendar).await?;
    debug!("created {} events", created);

    Ok(())
}

/// Creates one recurring event per declared slot, in schedule order.
///
/// Slot validation (weekday name, time format) happens per slot, before
/// that slot's network call. Returns the number of events created.
pub(crate) async fn sync_events(
    provider: &GoogleProvider,
    schedule: &ScheduleConfig,
    calendar: &CalendarRef,
) -> ClientResult<usize> {
    let tz = schedule.timezone()?;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let mut created_count = 0;
    for (weekday_name, slots) in &schedule.week {
        let weekday = Weekday::parse(weekday_name)?;
        for (slot_name, slot) in slots.iter() {
            let record = EventRecord::build(
                weekday,
                slot_name,
                slot,
                schedule.defaults.duration_minutes,
                tz,
                today,
            )?;
            let payload =
                EventPayload::from_record(&record, &schedule.attendees, &schedule.reminders);

            let created = provider.insert_event(calendar, &payload).await?;
            println!(
                "Created: {} on {} at {} -> {}",
                record.title,
                weekday,
                record.start_time(),
                created.html_link.as_deref().unwrap_or("(no link)")
            );
            created_count += 1;
        }
    }

    Ok(created_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weeksync_core::ScheduleError;
    use weeksync_providers::google::{GoogleConfig, OAuthCredentials, TokenInfo, TokenStorage};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn schedule(json: &str) -> ScheduleConfig {
        serde_json::from_str(json).unwrap()
    }

    fn calendar() -> CalendarRef {
        CalendarRef {
            id: "cal-1".to_string(),
            summary: "Team Schedule".to_string(),
        }
    }

    fn authed_provider(dir: &tempfile::TempDir, base_url: &str) -> GoogleProvider {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        let config =
            GoogleConfig::new(credentials).with_token_path(dir.path().join("tokens.json"));
        TokenStorage::new(&config.token_path)
            .set(TokenInfo::new("test-token", None, Some(3600)))
            .unwrap();
        GoogleProvider::new(config)
            .unwrap()
            .with_api_base_url(base_url)
    }

    #[tokio::test]
    async fn two_slots_become_two_inserts_with_distinct_starts() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let created = serde_json::json!({
            "id": "evt",
            "htmlLink": "https://calendar.google.com/event?eid=evt"
        });

        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .and(body_string_contains("T09:00:00"))
            .and(body_string_contains("BYDAY=MO"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created.clone()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .and(body_string_contains("T16:30:00"))
            .and(body_string_contains("BYDAY=MO"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created))
            .expect(1)
            .mount(&server)
            .await;

        let provider = authed_provider(&dir, &server.uri());
        let schedule = schedule(
            r#"{
                "timezone": "UTC",
                "week": {
                    "monday": {
                        "standup": {"time": "09:00"},
                        "review": {"time": "16:30"}
                    }
                }
            }"#,
        );

        let count = sync_events(&provider, &schedule, &calendar()).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn invalid_weekday_fails_before_any_network_call() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = authed_provider(&dir, &server.uri());
        let schedule = schedule(
            r#"{"week": {"funday": {"standup": {"time": "09:00"}}}}"#,
        );

        let err = sync_events(&provider, &schedule, &calendar()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Schedule(ScheduleError::InvalidWeekday(_))
        ));
    }

    #[tokio::test]
    async fn malformed_time_fails_before_its_network_call() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = authed_provider(&dir, &server.uri());
        let schedule = schedule(
            r#"{"week": {"monday": {"standup": {"time": "9 o'clock"}}}}"#,
        );

        let err = sync_events(&provider, &schedule, &calendar()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Schedule(ScheduleError::InvalidTime(_))
        ));
    }

    #[tokio::test]
    async fn slots_are_synced_in_schedule_order() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt", "htmlLink": "https://calendar.google.com/event?eid=evt"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let provider = authed_provider(&dir, &server.uri());
        // Weekdays deliberately out of calendar order.
        let schedule = schedule(
            r#"{
                "week": {
                    "friday": {"retro": {"time": "15:00"}},
                    "monday": {"standup": {"time": "09:00"}, "planning": {"time": "10:00"}}
                }
            }"#,
        );

        let count = sync_events(&provider, &schedule, &calendar()).await.unwrap();
        assert_eq!(count, 3);

        let requests = server.received_requests().await.unwrap();
        let summaries: Vec<String> = requests
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["summary"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            summaries,
            ["Friday Retro", "Monday Standup", "Monday Planning"]
        );
    }
}
