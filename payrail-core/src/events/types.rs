//! Event type definitions.
//!
//! Events carry identifiers only; the receiving processor reads current
//! state from the database.

use uuid::Uuid;

/// Emitted by the checkout API after a deposit vault was recorded.
///
/// The vault watcher uses it to tighten its scan cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultCreated {
    pub subscription_id: Uuid,
    pub vault_id: i64,
    pub created_at: time::PrimitiveDateTime,
}
