//! Google Calendar provider for weeksync.
//!
//! This crate owns everything that talks to the remote calendar service:
//!
//! - [`google::GoogleProvider`] - the provider facade: authentication,
//!   idempotent calendar resolution, event insertion
//! - [`google::OAuthClient`] - OAuth 2.0 PKCE flow with loopback redirect
//! - [`google::TokenStorage`] - persisted token cache
//! - [`ProviderError`] - error types for provider operations
//!
//! The rest of the program treats this crate as an opaque collaborator:
//! calendars, events, recurrence expansion, reminders, and attendee
//! notifications all live in the remote service.

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
