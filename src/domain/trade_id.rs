//! Time-ordered trade identifiers (CQL `TIMEUUID`).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::{Context, Timestamp, Uuid};

/// Version-1 UUID whose embedded timestamp is the trade time.
///
/// Ordering follows the store's `TIMEUUID` comparator: timestamp first, raw
/// bytes second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(Uuid);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeIdError {
    #[error("{0} is not a time-based uuid")]
    NotTimeBased(Uuid),
    #[error("timestamp before the unix epoch: {0}")]
    BeforeEpoch(DateTime<Utc>),
}

impl TradeId {
    /// Build an id stamped at `at` with the given clock sequence and node.
    pub fn from_datetime(
        at: DateTime<Utc>,
        clock_seq: u16,
        node: [u8; 6],
    ) -> Result<Self, TradeIdError> {
        let secs = u64::try_from(at.timestamp()).map_err(|_| TradeIdError::BeforeEpoch(at))?;
        let ts = Timestamp::from_unix(Context::new(clock_seq), secs, at.timestamp_subsec_nanos());
        Ok(TradeId(Uuid::new_v1(ts, &node)))
    }

    /// Build an id stamped at midnight UTC of `date`.
    pub fn from_date(date: NaiveDate, clock_seq: u16, node: [u8; 6]) -> Result<Self, TradeIdError> {
        let midnight = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
        Self::from_datetime(midnight, clock_seq, node)
    }

    /// Wrap an existing uuid, rejecting ids that carry no timestamp.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, TradeIdError> {
        if uuid.get_version_num() != 1 {
            return Err(TradeIdError::NotTimeBased(uuid));
        }
        Ok(TradeId(uuid))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Embedded timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let (secs, nanos) = self
            .0
            .get_timestamp()
            .map(|ts| ts.to_unix())
            .unwrap_or((0, 0));
        Utc.timestamp_opt(secs as i64, nanos)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Calendar day (UTC) the trade was stamped with.
    pub fn trade_date(&self) -> NaiveDate {
        self.timestamp().date_naive()
    }
}

impl Ord for TradeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp()
            .cmp(&other.timestamp())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for TradeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_roundtrips_through_timestamp() {
        let id = TradeId::from_date(date(2017, 3, 14), 7, [1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(id.as_uuid().get_version_num(), 1);
        assert_eq!(id.trade_date(), date(2017, 3, 14));
        assert_eq!(id.timestamp().timestamp() % 86_400, 0);
    }

    #[test]
    fn test_ordering_follows_days() {
        let early = TradeId::from_date(date(2013, 1, 1), 9999, [0xff; 6]).unwrap();
        let late = TradeId::from_date(date(2022, 8, 31), 0, [0; 6]).unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_same_day_ids_differ_by_node() {
        let a = TradeId::from_date(date(2020, 5, 5), 1, [1; 6]).unwrap();
        let b = TradeId::from_date(date(2020, 5, 5), 1, [2; 6]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.trade_date(), b.trade_date());
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_from_uuid_rejects_random_uuid() {
        let err = TradeId::from_uuid(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, TradeIdError::NotTimeBased(_)));
    }
}
