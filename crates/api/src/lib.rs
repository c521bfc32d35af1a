//! Client for the MyAnimeList v2 API.
//!
//! The remote API enforces per-account rate limits and occasionally refuses
//! requests for reasons that go away on their own, so every call made through
//! this crate goes through two retry layers:
//!
//! - an **inner** layer inside [`RequestExecutor`] that reacts to the HTTP
//!   status the server answered with (token refresh, rate-limit cooldown,
//!   stripping a problematic query field, generic cooldown-and-retry), and
//! - an **outer** [`Backoff`] layer with a constant delay that re-issues the
//!   request when it never completed at all (connection refused, DNS failure,
//!   timeout) or when the inner layer explicitly deferred to it.
//!
//! Authentication state lives in a shared [`AuthSession`], which is created
//! once and handed to whoever needs it.

pub mod error;
mod executor;
mod policy;
mod session;

pub use crate::executor::RequestExecutor;
pub use crate::policy::{Backoff, RetryPolicy};
pub use crate::session::{AuthSession, OAuthRefresher, Token, TokenRefresher};
