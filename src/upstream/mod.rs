//! SimpleFIN API access.
//!
//! This module fetches the account list from the upstream API and
//! converts it into a [`MetricSet`](crate::metrics::MetricSet). One call
//! is one request: no retries happen here.

mod accounts;
mod fetcher;

pub use accounts::{Account, AccountsResponse};
pub use fetcher::{AccountSource, FetchError, Fetcher, ACCOUNTS_ENDPOINT};
