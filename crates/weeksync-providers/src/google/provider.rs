//! Google Calendar provider facade.
//!
//! Ties the OAuth client, the token cache, and the API client together
//! behind the three operations the sync run needs: authenticate, resolve
//! a calendar by name, insert an event.

use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::client::{CreatedEvent, EventPayload, GoogleCalendarClient};
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

/// A resolved remote calendar: identifier plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRef {
    /// The remote calendar identifier.
    pub id: String,
    /// The calendar's display name.
    pub summary: String,
}

/// Google Calendar provider.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    /// API client, built lazily once a valid access token exists.
    api_client: TokioRwLock<Option<GoogleCalendarClient>>,
    /// API base override, used by tests.
    api_base_url: Option<String>,
}

impl GoogleProvider {
    /// Creates a provider with the given configuration.
    ///
    /// Loads the token cache but does not initiate authentication; a
    /// corrupt or unreadable cache is an error here, not a silent
    /// fallback to the interactive flow.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let token_storage = TokenStorage::new(&config.token_path);
        token_storage.load()?;

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout);

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(None),
            api_base_url: None,
        })
    }

    /// Overrides the Calendar API base URL (tests point this at a mock).
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(base_url.into());
        self
    }

    /// Returns true if cached tokens are usable, directly or via refresh.
    pub fn is_authenticated(&self) -> bool {
        match self.token_storage.get() {
            Some(tokens) => !tokens.is_expired() || tokens.refresh_token.is_some(),
            None => false,
        }
    }

    /// Runs the interactive OAuth flow and persists the obtained tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;

        self.token_storage.set(tokens.clone())?;
        *self.api_client.write().await = Some(self.make_client(&tokens.access_token));

        info!("authentication successful");
        Ok(())
    }

    /// Ensures a valid access token and API client.
    ///
    /// Performs at most one blocking refresh via the stored refresh
    /// token; never falls back to the interactive flow.
    pub async fn ensure_authenticated(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authenticated - run 'weeksync auth google'")
        })?;

        if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.as_ref().ok_or_else(|| {
                ProviderError::authentication("no refresh token - re-authentication required")
            })?;

            debug!("refreshing expired access token");

            let (new_access_token, expires_in) =
                self.oauth_client.refresh_token(refresh_token).await?;

            self.token_storage
                .update_access_token(&new_access_token, expires_in)?;

            let mut client = self.api_client.write().await;
            match client.as_mut() {
                Some(c) => c.set_access_token(&new_access_token),
                None => *client = Some(self.make_client(&new_access_token)),
            }
        } else {
            let mut client = self.api_client.write().await;
            if client.is_none() {
                *client = Some(self.make_client(&tokens.access_token));
            }
        }

        Ok(())
    }

    /// Resolves a calendar by display name, creating it when absent.
    ///
    /// Pages through the account's calendar list, stopping at the first
    /// exact, case-sensitive match on display name. When every page is
    /// exhausted without a match, a new calendar is created with the
    /// given name and timezone and registered in the visible calendar
    /// list. Repeated calls never create duplicate calendars.
    pub async fn ensure_calendar(
        &self,
        display_name: &str,
        time_zone: &str,
    ) -> ProviderResult<CalendarRef> {
        self.ensure_authenticated().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let mut page_token: Option<String> = None;
        loop {
            let page = client.list_calendars_page(page_token.as_deref()).await?;

            if let Some(entry) = page.items.into_iter().find(|c| c.summary == display_name) {
                debug!("found calendar {:?} ({})", display_name, entry.id);
                return Ok(CalendarRef {
                    id: entry.id,
                    summary: entry.summary,
                });
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("calendar {:?} not found, creating it", display_name);
        let created = client.insert_calendar(display_name, time_zone).await?;
        client.insert_calendar_list_entry(&created.id).await?;

        Ok(CalendarRef {
            id: created.id,
            summary: created.summary,
        })
    }

    /// Inserts one event into the calendar, dispatching attendee updates.
    pub async fn insert_event(
        &self,
        calendar: &CalendarRef,
        payload: &EventPayload,
    ) -> ProviderResult<CreatedEvent> {
        self.ensure_authenticated().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        client.insert_event(&calendar.id, payload).await
    }

    fn make_client(&self, access_token: &str) -> GoogleCalendarClient {
        let client = GoogleCalendarClient::new(access_token, self.config.timeout);
        match &self.api_base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        }
    }
}
