//! Basket grouping of exit requests
//!
//! A basket is never stored: it is the set of requests sharing a requester and
//! a submission minute, recomputed from the requests on every read.

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ExitRequest, ExitRequestStatus};

/// Requester plus submission time truncated to the minute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasketKey {
    pub minute: DateTime<Utc>,
    pub requested_by: Uuid,
}

impl BasketKey {
    pub fn new(requested_by: Uuid, requested_at: DateTime<Utc>) -> Self {
        Self {
            minute: truncate_to_minute(requested_at),
            requested_by,
        }
    }

    pub fn contains(&self, request: &ExitRequest) -> bool {
        request.basket_key() == *self
    }
}

impl std::fmt::Display for BasketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.requested_by, self.minute.format("%Y-%m-%dT%H:%MZ"))
    }
}

pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Aggregate status of a basket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BasketStatus {
    Pending,
    AwaitingReception,
    Approved,
    Rejected,
    Mixed,
}

/// Uniform status when every member agrees, `mixed` otherwise
pub fn aggregate_status<'a>(requests: impl IntoIterator<Item = &'a ExitRequest>) -> BasketStatus {
    let mut statuses = requests.into_iter().map(|r| r.status);
    let Some(first) = statuses.next() else {
        return BasketStatus::Pending;
    };
    if statuses.any(|s| s != first) {
        return BasketStatus::Mixed;
    }
    match first {
        ExitRequestStatus::Pending => BasketStatus::Pending,
        ExitRequestStatus::AwaitingReception => BasketStatus::AwaitingReception,
        ExitRequestStatus::Approved => BasketStatus::Approved,
        ExitRequestStatus::Rejected => BasketStatus::Rejected,
    }
}

/// One basket with its member requests, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basket {
    pub key: BasketKey,
    pub requested_by_name: String,
    pub status: BasketStatus,
    pub line_count: usize,
    pub total_quantity: Decimal,
    pub requests: Vec<ExitRequest>,
}

/// Group requests into baskets, newest basket first
pub fn group_into_baskets(requests: &[ExitRequest]) -> Vec<Basket> {
    let mut groups: BTreeMap<BasketKey, Vec<ExitRequest>> = BTreeMap::new();
    for request in requests {
        groups.entry(request.basket_key()).or_default().push(request.clone());
    }

    groups
        .into_iter()
        .rev()
        .map(|(key, mut members)| {
            members.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
            Basket {
                key,
                requested_by_name: members
                    .first()
                    .map(|r| r.requested_by_name.clone())
                    .unwrap_or_default(),
                status: aggregate_status(&members),
                line_count: members.len(),
                total_quantity: members.iter().map(|r| r.quantity).sum(),
                requests: members,
            }
        })
        .collect()
}

/// Ids of the basket members still pending, in submission order
pub fn pending_members(requests: &[ExitRequest], key: &BasketKey) -> Vec<Uuid> {
    let mut members: Vec<&ExitRequest> = requests
        .iter()
        .filter(|r| key.contains(r) && r.status == ExitRequestStatus::Pending)
        .collect();
    members.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
    members.into_iter().map(|r| r.id).collect()
}

/// Bulk operation applied to the pending members of a basket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum BasketOperation {
    Approve,
    Reject { reason: String },
    Cancel,
}

/// A basket member whose transition failed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasketFailure {
    pub request_id: Uuid,
    pub error: String,
}

/// Per-member result of a bulk basket operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BasketOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BasketFailure>,
}

impl BasketOutcome {
    pub fn record<E: std::fmt::Display>(&mut self, request_id: Uuid, result: Result<(), E>) {
        match result {
            Ok(()) => self.succeeded.push(request_id),
            Err(e) => self.failed.push(BasketFailure {
                request_id,
                error: e.to_string(),
            }),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_to_minute() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 41, 59).unwrap();
        assert_eq!(
            truncate_to_minute(at),
            Utc.with_ymd_and_hms(2026, 10, 17, 9, 41, 0).unwrap()
        );
    }

    #[test]
    fn test_basket_key_display() {
        let user = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 41, 12).unwrap();
        assert_eq!(
            BasketKey::new(user, at).to_string(),
            "00000000-0000-0000-0000-000000000000@2026-10-17T09:41Z"
        );
    }

    #[test]
    fn test_outcome_partial() {
        let mut outcome = BasketOutcome::default();
        outcome.record::<String>(Uuid::new_v4(), Ok(()));
        assert!(!outcome.is_partial());
        outcome.record(Uuid::new_v4(), Err("Product not found"));
        assert!(outcome.is_partial());
    }
}
