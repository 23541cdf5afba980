//! Identifier generation seam.

use smsgate_id::Ulid;

/// Source of new aggregate identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Ulid;
}

/// Generates time-ordered ULIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> Ulid {
        Ulid::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ulid_generator_yields_distinct_ids() {
        let generator = UlidGenerator;
        assert_ne!(generator.next_id(), generator.next_id());
    }
}
