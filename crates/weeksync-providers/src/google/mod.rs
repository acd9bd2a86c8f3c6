//! Google Calendar provider.
//!
//! # Authentication flow
//!
//! 1. The user supplies their own OAuth client ID/secret (required by
//!    Google), either as flags or as a Cloud Console credentials file
//! 2. The provider starts a loopback HTTP server and opens the browser
//!    to Google's consent page with a PKCE challenge
//! 3. Google redirects back with the authorization code, which is
//!    exchanged for access and refresh tokens
//! 4. Tokens are persisted as JSON and refreshed on later runs without
//!    user interaction
//!
//! # Calendar operations
//!
//! The provider consumes exactly four API operations: paging through the
//! account's calendar list, inserting a calendar, registering it in the
//! visible list, and inserting an event (with recurrence, attendees,
//! reminder overrides, and attendee notification dispatch).

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{CalendarListEntry, CalendarResource, CreatedEvent, EventPayload, GoogleCalendarClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::{CalendarRef, GoogleProvider};
pub use tokens::{TokenInfo, TokenStorage};
