//! Stored Value Module
//!
//! A single value held by the memory store, with its expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Stored Value ==
/// Bytes plus the creation and expiry instants.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: Vec<u8>,
    pub created_at: DateTime<Utc>,
    /// None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a value expiring after `ttl`. A zero TTL never expires.
    pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
        };

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Expired once the current time reaches the expiry instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining lifetime; `Some(ZERO)` once expired, None without expiry.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            (expires - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }
}
