use crate::backend::{
    compare_values, Filter, Patch, Record, RecordStore, Result, Sort, SortDir, StoreError, Update,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

type Collection = BTreeMap<String, Record>;

/// In-memory store backend for testing and development.
///
/// A single write lock covers every mutation, which is what makes increment
/// patches and guarded updates atomic here.
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_patches(record: &mut Record, update: &Update) {
    for (field, patch) in &update.patches {
        match patch {
            Patch::Set(value) => {
                record.insert(field.clone(), value.clone());
            }
            Patch::Increment(delta) => {
                let base = record
                    .get(field)
                    .and_then(Value::as_i64)
                    .unwrap_or_default();
                record.insert(field.clone(), Value::from(base + delta));
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Record)>> {
        let collections = self.collections.read().await;
        let mut matches: Vec<(String, Record)> = collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, record)| filters.iter().all(|f| f.matches(record)))
                    .map(|(id, record)| (id.clone(), record.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = sort {
            matches.sort_by(|(_, a), (_, b)| {
                let av = a.get(&sort.field).unwrap_or(&Value::Null);
                let bv = b.get(&sort.field).unwrap_or(&Value::Null);
                let ordering = compare_values(av, bv).unwrap_or(Ordering::Equal);
                match sort.dir {
                    SortDir::Asc => ordering,
                    SortDir::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = limit {
            matches.truncate(limit);
        }

        Ok(matches)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn create(&self, collection: &str, record: Record) -> Result<String> {
        let id = Uuid::new_v4().hyphenated().to_string();
        self.create_with_id(collection, &id, record).await?;
        Ok(id)
    }

    async fn create_with_id(&self, collection: &str, id: &str, record: Record) -> Result<()> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();

        if records.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        records.insert(id.to_string(), record);
        debug!(collection, id, "record created");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, update: Update) -> Result<()> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        apply_patches(record, &update);
        debug!(collection, id, fields = update.patches.len(), "record updated");
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        guards: &[Filter],
        update: Update,
    ) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        if !guards.iter().all(|g| g.matches(record)) {
            debug!(collection, id, "guarded update skipped");
            return Ok(false);
        }

        apply_patches(record, &update);
        debug!(collection, id, fields = update.patches.len(), "guarded update applied");
        Ok(true)
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| filters.iter().all(|f| f.matches(record)))
                    .count()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = MemoryStore::new();
        let id = store
            .create("deposits", record(&[("amount", json!(50000))]))
            .await
            .unwrap();

        let fetched = store.get("deposits", &id).await.unwrap().unwrap();
        assert_eq!(fetched.get("amount"), Some(&json!(50000)));

        assert!(store.get("deposits", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_with_id_rejects_duplicates() {
        let store = MemoryStore::new();
        store
            .create_with_id("users", "uid-1", record(&[("username", json!("a"))]))
            .await
            .unwrap();

        let err = store
            .create_with_id("users", "uid-1", record(&[("username", json!("b"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn query_filters_sorts_and_limits() {
        let store = MemoryStore::new();
        for (code, amount, status) in [
            ("DEP1", 30000, "pending"),
            ("DEP2", 80000, "approved"),
            ("DEP3", 50000, "pending"),
            ("DEP4", 45000, "pending"),
        ] {
            store
                .create(
                    "deposits",
                    record(&[
                        ("depositCode", json!(code)),
                        ("amount", json!(amount)),
                        ("status", json!(status)),
                    ]),
                )
                .await
                .unwrap();
        }

        let pending = store
            .query(
                "deposits",
                &[Filter::eq("status", "pending")],
                Some(Sort::desc("amount")),
                Some(2),
            )
            .await
            .unwrap();

        let codes: Vec<_> = pending
            .iter()
            .map(|(_, r)| r.get("depositCode").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["DEP3", "DEP4"]);

        let rich = store
            .query("deposits", &[Filter::ge("amount", 50000)], None, None)
            .await
            .unwrap();
        assert_eq!(rich.len(), 2);

        assert_eq!(
            store
                .count("deposits", &[Filter::eq("status", "pending")])
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn increments_are_atomic_under_concurrency() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_with_id("users", "u-1", record(&[("mainBalance", json!(0))]))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update("users", "u-1", Update::new().increment("mainBalance", 150))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = store.get("users", "u-1").await.unwrap().unwrap();
        assert_eq!(user.get("mainBalance"), Some(&json!(7500)));
    }

    #[tokio::test]
    async fn guarded_update_applies_at_most_once() {
        let store = MemoryStore::new();
        store
            .create_with_id("deposits", "d-1", record(&[("status", json!("pending"))]))
            .await
            .unwrap();

        let guard = [Filter::eq("status", "pending")];
        let claim = Update::new().set("status", "approved");

        assert!(store
            .update_if("deposits", "d-1", &guard, claim.clone())
            .await
            .unwrap());
        assert!(!store
            .update_if("deposits", "d-1", &guard, claim)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn guarded_decrement_respects_balance_floor() {
        let store = MemoryStore::new();
        store
            .create_with_id("users", "u-2", record(&[("lockedBalance", json!(10000))]))
            .await
            .unwrap();

        let ok = store
            .update_if(
                "users",
                "u-2",
                &[Filter::ge("lockedBalance", 12000)],
                Update::new().increment("lockedBalance", -12000),
            )
            .await
            .unwrap();
        assert!(!ok);

        let user = store.get("users", "u-2").await.unwrap().unwrap();
        assert_eq!(user.get("lockedBalance"), Some(&json!(10000)));
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("users", "ghost", Update::new().set("isActive", false))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
