//! In-process vector store with brute-force cosine search
//!
//! Implements the store contract against a plain vector of points. Used as
//! the mock-mode backend and as the test seam for the retrieval and
//! reasoning stages. Last-writer-wins on point id; insertion order is
//! preserved so tie-breaks stay deterministic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{EngineError, EngineResult};

use super::{Point, ScoredPoint, VectorStore};

struct MemCollection {
    dim: usize,
    points: Vec<Point>,
}

/// Brute-force in-memory store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, MemCollection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points currently stored in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.points.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, collection: &str, dim: usize) -> EngineResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(collection) {
            if existing.dim != dim {
                return Err(EngineError::Internal(format!(
                    "collection '{collection}' exists with dimension {}, requested {dim}",
                    existing.dim
                )));
            }
            return Ok(());
        }
        collections.insert(
            collection.to_string(),
            MemCollection {
                dim,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> EngineResult<bool> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> EngineResult<()> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| EngineError::Internal(format!("unknown collection '{collection}'")))?;

        for point in points {
            if point.vector.len() != coll.dim {
                return Err(EngineError::Protocol(format!(
                    "vector dimension {} does not match collection dimension {}",
                    point.vector.len(),
                    coll.dim
                )));
            }
            match coll.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => coll.points.push(point),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> EngineResult<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| EngineError::Internal(format!("unknown collection '{collection}'")))?;

        let mut scored: Vec<ScoredPoint> = coll
            .points
            .iter()
            .map(|p| ScoredPoint {
                payload: p.payload.clone(),
                score: cosine(vector, &p.vector),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn point(id: Uuid, vector: Vec<f32>, tag: &str) -> Point {
        Point {
            id,
            vector,
            payload: json!({ "tag": tag }),
        }
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("c", 2).await.unwrap();
        store
            .upsert(
                "c",
                vec![
                    point(Uuid::new_v4(), vec![0.0, 1.0], "orthogonal"),
                    point(Uuid::new_v4(), vec![1.0, 0.0], "aligned"),
                    point(Uuid::new_v4(), vec![-1.0, 0.0], "opposed"),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("c", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload["tag"], "aligned");
        assert_eq!(hits[1].payload["tag"], "orthogonal");
    }

    #[tokio::test]
    async fn upsert_overwrites_same_id() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("c", 2).await.unwrap();
        let id = Uuid::new_v4();
        store
            .upsert("c", vec![point(id, vec![1.0, 0.0], "first")])
            .await
            .unwrap();
        store
            .upsert("c", vec![point(id, vec![1.0, 0.0], "second")])
            .await
            .unwrap();

        assert_eq!(store.len("c").await, 1);
        let hits = store.search("c", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].payload["tag"], "second");
    }

    #[tokio::test]
    async fn ensure_collection_rejects_dimension_change() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("c", 2).await.unwrap();
        assert!(store.ensure_collection("c", 3).await.is_err());
        assert!(store.ensure_collection("c", 2).await.is_ok());
    }
}
