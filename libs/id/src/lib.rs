//! # smsgate-id
//!
//! Typed identifiers for tenants, SMS configurations and requests, plus the
//! event ordering primitives (`EventId`, `AggregateSeq`).
//!
//! Resource IDs use a prefixed format: `{prefix}_{ulid}`
//!
//! - `inst_01HV4Z2WQXKJNM8GPQY6VBKC3D` (tenant instance)
//! - `sms_01HV4Z3MXNKPQR9HSTZ7WCLD4E` (SMS configuration)
//! - `req_01HV4Z4NYPLTRS0JTUA8XDME5F` (request)
//!
//! The prefix makes a misplaced ID fail at parse time instead of silently
//! addressing the wrong aggregate.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
