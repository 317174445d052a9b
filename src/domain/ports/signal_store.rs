//! Signal Store Port
//!
//! Defines the interface for reading stored station and tower records.
//! Implementations may use SQLite or in-memory storage.

use crate::domain::entities::{SignalKey, SignalRecord};
use crate::domain::errors::LookupError;
use crate::domain::value_objects::SignalKind;
use async_trait::async_trait;

/// Read access to the per-signal-kind shards.
///
/// This is an outbound port. Keys the store has never seen are simply
/// omitted from the result; an error means the shard could not be read
/// at all and the caller should treat it as holding no records.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Fetch the records known for `keys` in the shard of `kind`.
    async fn lookup(
        &self,
        kind: SignalKind,
        keys: &[SignalKey],
    ) -> Result<Vec<SignalRecord>, LookupError>;
}
