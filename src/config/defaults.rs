//! Default configuration constants.
//!
//! Keeping defaults in one module lets loader, types and tests share the
//! same literals.

/// Embedded default `runwatch.toml` template written by `runwatch init`.
pub(super) const DEFAULT_RUNWATCH_CONFIG_TEMPLATE: &str =
    include_str!("../templates/runwatch.toml");
/// Default run backend base URL.
pub(super) const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
/// Default timeout for REST requests (and push-channel connect).
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
/// Poll interval once the push channel has failed.
pub(super) const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
/// Ceiling after which polling stops even without teardown.
pub(super) const DEFAULT_POLL_CEILING_SECS: u64 = 600;
/// Delay between a qualifying delta and the refresh signal.
pub(super) const DEFAULT_REFRESH_DELAY_MS: u64 = 1500;
/// Events rendered for the selected cycle.
pub(super) const DEFAULT_MAX_EVENTS: usize = 40;
