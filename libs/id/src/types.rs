//! Typed ID definitions.

use crate::define_id;

define_id!(
    /// Tenant instance that owns configuration aggregates.
    InstanceId,
    "inst"
);

define_id!(
    /// SMS provider configuration aggregate.
    SmsConfigId,
    "sms"
);

define_id!(
    /// Request correlation ID recorded on every event.
    RequestId,
    "req"
);

// =============================================================================
// Events
// =============================================================================

/// Globally monotonic position of an event in the log.
///
/// Assigned by the event log on append; unrelated to per-aggregate ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(i64);

impl EventId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl serde::Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Self)
    }
}

// =============================================================================
// Aggregate Sequence Number
// =============================================================================

/// Position of an event within its aggregate stream.
///
/// Streams are contiguous and 1-based; `ZERO` is the watermark of an
/// aggregate that has no events yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AggregateSeq(i32);

impl AggregateSeq {
    /// Watermark of an empty stream.
    pub const ZERO: Self = Self(0);

    /// The first sequence number of a new aggregate.
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn new(seq: i32) -> Self {
        Self(seq)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for AggregateSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for AggregateSeq {
    fn from(seq: i32) -> Self {
        Self(seq)
    }
}

impl From<AggregateSeq> for i32 {
    fn from(seq: AggregateSeq) -> Self {
        seq.0
    }
}

impl serde::Serialize for AggregateSeq {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for AggregateSeq {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        i32::deserialize(deserializer).map(Self)
    }
}
