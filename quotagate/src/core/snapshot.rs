//! Identities and the usage counters attached to them

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Who is consuming quota
///
/// Registered accounts have a stable identifier. Guests carry an identifier
/// generated client-side with no durability guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "id", rename_all = "lowercase"))]
pub enum Identity {
    Account(String),
    Guest(String),
}

impl Identity {
    /// Key under which this identity's counters are stored
    ///
    /// Accounts and guests live in separate namespaces, so a guest can never
    /// collide with an account that happens to share its id.
    ///
    /// ```
    /// use quotagate::Identity;
    ///
    /// assert_eq!(Identity::Account("42".into()).storage_key(), "account:42");
    /// assert_eq!(Identity::Guest("f00d".into()).storage_key(), "guest:f00d");
    /// ```
    pub fn storage_key(&self) -> String {
        self.to_string()
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Account(id) => write!(f, "account:{id}"),
            Identity::Guest(id) => write!(f, "guest:{id}"),
        }
    }
}

/// Usage counters for one identity
///
/// Each period counter is valid only as of its anchor. An anchor of `None`
/// means the record has never been evaluated; it differs from every real
/// boundary, so the first evaluation anchors it.
///
/// `Default` is the zero snapshot created for a newly observed identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CounterSnapshot {
    pub generations_today: u64,
    pub generations_this_week: u64,
    pub generations_this_month: u64,
    /// Never reset
    pub generations_lifetime: u64,

    pub period_anchor_day: Option<NaiveDate>,
    pub period_anchor_week_start: Option<NaiveDate>,
    pub period_anchor_month_start: Option<NaiveDate>,

    pub last_generation_at: Option<DateTime<Utc>>,

    pub catalog_views_this_week: u64,
    /// Never reset
    pub catalog_views_total: u64,
    pub catalog_anchor_week_start: Option<NaiveDate>,
}
