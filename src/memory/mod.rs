//! Experience memory: vector-indexed long-term storage
//!
//! The [`VectorStore`] trait is the opaque ANN seam: a remote store speaking
//! the Qdrant REST protocol in production, a brute-force in-memory
//! implementation for tests and mock mode. The memory wrappers above it own
//! payload (de)serialization and id discipline; they never rank or reason.
//!
//! Raw cosine scores live in [-1, 1] inside the store and are normalized to
//! [0, 1] here, at the boundary, before anything downstream sees them.

mod mock;
mod qdrant;

pub use mock::InMemoryVectorStore;
pub use qdrant::QdrantStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::types::{DecisionSnapshot, ExperienceUnit};

// ============================================================================
// Store contract
// ============================================================================

/// One stored point: id, embedding, and a payload sufficient to reconstruct
/// the unit or snapshot it indexes.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A search hit: payload plus raw cosine similarity in [-1, 1].
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub payload: Value,
    pub score: f64,
}

/// Opaque approximate-nearest-neighbour index with cosine distance.
///
/// Guarantees: at-least-once delivery to the index; last-writer-wins between
/// concurrent upserts of the same id; retrieval consistent with the most
/// recent acknowledged upsert.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection with a fixed vector dimension if absent.
    async fn ensure_collection(&self, collection: &str, dim: usize) -> EngineResult<()>;

    async fn collection_exists(&self, collection: &str) -> EngineResult<bool>;

    /// Idempotent on point id.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> EngineResult<()>;

    /// kNN by cosine similarity, best first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> EngineResult<Vec<ScoredPoint>>;
}

/// Map a raw cosine similarity into [0, 1] for downstream consumers.
pub fn normalize_cosine(score: f64) -> f64 {
    ((score + 1.0) / 2.0).clamp(0.0, 1.0)
}

// ============================================================================
// Experience memory (phased pipeline)
// ============================================================================

/// Long-term memory of phased experience units.
#[derive(Clone)]
pub struct ExperienceMemory {
    store: Arc<dyn VectorStore>,
    collection: String,
    dim: usize,
}

impl ExperienceMemory {
    /// Bind to a store, creating the collection when missing.
    pub async fn initialize(
        store: Arc<dyn VectorStore>,
        collection: &str,
        dim: usize,
    ) -> EngineResult<Self> {
        store.ensure_collection(collection, dim).await?;
        Ok(Self {
            store,
            collection: collection.to_string(),
            dim,
        })
    }

    /// Store one unit keyed by its deterministic id. Upserting the same
    /// case and phase twice overwrites in place.
    pub async fn store_experience(
        &self,
        unit: &ExperienceUnit,
        vector: Vec<f32>,
    ) -> EngineResult<()> {
        self.check_dim(vector.len())?;
        let payload = serde_json::to_value(unit)
            .map_err(|e| EngineError::Internal(format!("experience serialization: {e}")))?;
        self.store
            .upsert(
                &self.collection,
                vec![Point {
                    id: unit.point_id(),
                    vector,
                    payload,
                }],
            )
            .await
    }

    /// Raw kNN search returning reconstructed units with normalized scores.
    /// A malformed stored payload is skipped with a diagnostic, never fatal.
    pub async fn retrieve_candidates(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> EngineResult<Vec<(ExperienceUnit, f64)>> {
        self.check_dim(vector.len())?;
        let hits = self.store.search(&self.collection, vector, limit).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match decode_experience(hit.payload) {
                Ok(unit) => results.push((unit, normalize_cosine(hit.score))),
                Err(e) => warn!(error = %e, "Skipping candidate"),
            }
        }
        Ok(results)
    }

    fn check_dim(&self, got: usize) -> EngineResult<()> {
        if got != self.dim {
            return Err(EngineError::Protocol(format!(
                "embedding dimension {got} does not match collection dimension {}",
                self.dim
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Snapshot memory (narrative pipeline)
// ============================================================================

/// Long-term memory of narrative decision snapshots.
#[derive(Clone)]
pub struct SnapshotMemory {
    store: Arc<dyn VectorStore>,
    collection: String,
    dim: usize,
}

impl SnapshotMemory {
    pub async fn initialize(
        store: Arc<dyn VectorStore>,
        collection: &str,
        dim: usize,
    ) -> EngineResult<Self> {
        store.ensure_collection(collection, dim).await?;
        Ok(Self {
            store,
            collection: collection.to_string(),
            dim,
        })
    }

    /// Store snapshots with their embeddings under fresh point ids.
    /// Returns the number of stored points.
    pub async fn store_snapshots(
        &self,
        snapshots: &[DecisionSnapshot],
        embeddings: Vec<Vec<f32>>,
    ) -> EngineResult<usize> {
        if snapshots.is_empty() {
            warn!("No snapshots to store");
            return Ok(0);
        }
        if snapshots.len() != embeddings.len() {
            return Err(EngineError::Internal(format!(
                "snapshot/embedding count mismatch: {} vs {}",
                snapshots.len(),
                embeddings.len()
            )));
        }

        let mut points = Vec::with_capacity(snapshots.len());
        for (snap, vector) in snapshots.iter().zip(embeddings) {
            if vector.len() != self.dim {
                return Err(EngineError::Protocol(format!(
                    "embedding dimension {} does not match collection dimension {}",
                    vector.len(),
                    self.dim
                )));
            }
            let dump = serde_json::to_value(snap)
                .map_err(|e| EngineError::Internal(format!("snapshot serialization: {e}")))?;
            points.push(Point {
                id: Uuid::new_v4(),
                vector,
                payload: serde_json::json!({
                    "snapshot_id": snap.snapshot_id,
                    "case_study_id": snap.case_study_id,
                    "source_id": snap.source_id,
                    "inferred_time_window": snap.inferred_time_window,
                    "full_narrative_dump": dump,
                }),
            });
        }

        let count = points.len();
        self.store.upsert(&self.collection, points).await?;
        Ok(count)
    }

    /// kNN over snapshots with normalized scores, skipping malformed payloads.
    pub async fn retrieve_relevant(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> EngineResult<Vec<(DecisionSnapshot, f64)>> {
        if vector.len() != self.dim {
            return Err(EngineError::Protocol(format!(
                "query dimension {} does not match collection dimension {}",
                vector.len(),
                self.dim
            )));
        }
        let hits = self.store.search(&self.collection, vector, limit).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match decode_snapshot(hit.payload) {
                Ok(snap) => results.push((snap, normalize_cosine(hit.score))),
                Err(e) => warn!(error = %e, "Skipping candidate"),
            }
        }
        Ok(results)
    }
}

// ============================================================================
// Payload decoding
// ============================================================================

/// Reconstruct an experience unit from its stored payload.
fn decode_experience(payload: Value) -> EngineResult<ExperienceUnit> {
    serde_json::from_value(payload)
        .map_err(|e| EngineError::DataShape(format!("experience payload: {e}")))
}

/// Reconstruct a snapshot from the `full_narrative_dump` of its payload.
fn decode_snapshot(payload: Value) -> EngineResult<DecisionSnapshot> {
    let dump = payload
        .get("full_narrative_dump")
        .cloned()
        .ok_or_else(|| {
            EngineError::DataShape("snapshot payload missing full_narrative_dump".to_string())
        })?;
    serde_json::from_value(dump)
        .map_err(|e| EngineError::DataShape(format!("snapshot payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EarthquakeSituation, TimePhase};

    fn unit(case: &str, phase: TimePhase) -> ExperienceUnit {
        ExperienceUnit {
            situation: EarthquakeSituation::default(),
            phase,
            source_case_id: case.to_string(),
            subsequent_outcomes: None,
        }
    }

    #[test]
    fn cosine_normalization_maps_to_unit_interval() {
        assert_eq!(normalize_cosine(1.0), 1.0);
        assert_eq!(normalize_cosine(-1.0), 0.0);
        assert_eq!(normalize_cosine(0.0), 0.5);
        assert_eq!(normalize_cosine(2.0), 1.0);
    }

    #[tokio::test]
    async fn round_trips_experience_units() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let memory = ExperienceMemory::initialize(store, "exp_test", 3).await.unwrap();

        let u = unit("case-1", TimePhase::T0Impact);
        memory.store_experience(&u, vec![1.0, 0.0, 0.0]).await.unwrap();

        let hits = memory.retrieve_candidates(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, u);
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_case_and_phase() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let memory = ExperienceMemory::initialize(store, "exp_idem", 3).await.unwrap();

        let mut u = unit("case-1", TimePhase::T0Impact);
        memory.store_experience(&u, vec![1.0, 0.0, 0.0]).await.unwrap();
        u.situation.event_identity.event_id = Some("updated".to_string());
        memory.store_experience(&u, vec![1.0, 0.0, 0.0]).await.unwrap();

        let hits = memory.retrieve_candidates(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1, "same case+phase must overwrite, not append");
        assert_eq!(
            hits[0].0.situation.event_identity.event_id.as_deref(),
            Some("updated")
        );
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_at_upsert() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let memory = ExperienceMemory::initialize(store, "exp_dim", 3).await.unwrap();

        let err = memory
            .store_experience(&unit("c", TimePhase::T0Impact), vec![1.0, 0.0])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped_not_fatal() {
        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection("exp_bad", 2).await.unwrap();
        store
            .upsert(
                "exp_bad",
                vec![Point {
                    id: Uuid::new_v4(),
                    vector: vec![1.0, 0.0],
                    payload: serde_json::json!({"phase": 17}),
                }],
            )
            .await
            .unwrap();

        let memory = ExperienceMemory::initialize(store, "exp_bad", 2).await.unwrap();
        let hits = memory.retrieve_candidates(&[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn malformed_payloads_decode_to_data_shape_errors() {
        let err = decode_experience(serde_json::json!({"phase": 17})).unwrap_err();
        assert!(matches!(err, EngineError::DataShape(_)));

        let err = decode_snapshot(serde_json::json!({"case_study_id": "c"})).unwrap_err();
        assert!(matches!(err, EngineError::DataShape(_)));
        assert!(err.to_string().contains("full_narrative_dump"));
    }

    #[tokio::test]
    async fn snapshot_memory_round_trips_with_scores() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let memory = SnapshotMemory::initialize(store, "snap_test", 2).await.unwrap();

        let snap = DecisionSnapshot {
            case_study_id: "kobe-1995".to_string(),
            decision_context: "fires spreading through collapsed blocks".to_string(),
            ..DecisionSnapshot::default()
        };
        let stored = memory
            .store_snapshots(&[snap.clone()], vec![vec![0.0, 1.0]])
            .await
            .unwrap();
        assert_eq!(stored, 1);

        let hits = memory.retrieve_relevant(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, snap);
        assert!(hits[0].1 > 0.99);
    }
}
