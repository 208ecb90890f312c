//! SimpleFIN `/accounts` payload and its conversion into metrics.

use crate::metrics::{Metric, MetricSet, LAST_UPDATED, SIMPLEFIN_BALANCE};
use serde::{Deserialize, Deserializer};

/// Body returned by `GET {access_url}/accounts`.
///
/// Absent or null arrays decode as empty, and absent or null account
/// fields decode as empty strings. A value of the wrong JSON type is still
/// an error. Fields SimpleFIN sends that the exporter does not use
/// (currency, org, transactions, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsResponse {
    /// Application-level errors reported by upstream.
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
    /// Accounts in upstream order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: Vec<Account>,
}

/// One upstream account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Account {
    /// Opaque account identifier.
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Display name.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Decimal balance, kept as the upstream string.
    #[serde(deserialize_with = "null_as_default")]
    pub balance: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AccountsResponse {
    /// Builds the metric set for this response.
    ///
    /// `last_updated` comes first, followed by one balance gauge per
    /// account in upstream order. Balances are passed through untouched.
    pub fn to_metric_set(&self, timestamp: i64) -> MetricSet {
        let mut metrics = Vec::with_capacity(self.accounts.len() + 1);
        metrics.push(Metric::gauge(LAST_UPDATED, timestamp.to_string()));
        metrics.extend(self.accounts.iter().map(|account| {
            Metric::gauge(SIMPLEFIN_BALANCE, account.balance.as_str())
                .with_tag("account", account.name.as_str())
                .with_tag("id", account.id.as_str())
        }));
        metrics
    }
}
