//! Persistence collaborator for model forms.
//!
//! [`ModelStore`] is the minimal record store model forms and inline
//! formsets write through. [`MemoryStore`] keeps rows in memory and is used
//! by tests and demos.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use inline_edit_core::{InlineEditError, InlineEditResult, ModelInstance, ModelMeta};

/// An async record store keyed by model and primary key.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Fetches one record. Returns `DoesNotExist` when there is no such row.
    async fn get(&self, meta: &ModelMeta, pk: i64) -> InlineEditResult<ModelInstance>;

    /// Inserts (no pk) or updates (pk set) a record and returns it with its pk.
    async fn save(&self, meta: &ModelMeta, instance: ModelInstance) -> InlineEditResult<ModelInstance>;

    /// Deletes one record.
    async fn delete(&self, meta: &ModelMeta, pk: i64) -> InlineEditResult<()>;

    /// Returns every record whose `field` equals `value`, ordered by pk.
    async fn filter(
        &self,
        meta: &ModelMeta,
        field: &str,
        value: &Value,
    ) -> InlineEditResult<Vec<ModelInstance>>;
}

#[derive(Debug, Default)]
struct Table {
    next_pk: i64,
    rows: BTreeMap<i64, ModelInstance>,
}

/// An in-memory [`ModelStore`].
///
/// # Examples
///
/// ```
/// use inline_edit_core::{ModelInstance, ModelMeta};
/// use inline_edit_forms::{MemoryStore, ModelStore};
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// rt.block_on(async {
///     let store = MemoryStore::new();
///     let meta = ModelMeta::new("schedule", "program");
///     let saved = store
///         .save(&meta, ModelInstance::new().with_value("name", "Morning".into()))
///         .await
///         .unwrap();
///     assert_eq!(saved.pk, Some(1));
/// });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows stored for a model.
    pub async fn count(&self, meta: &ModelMeta) -> usize {
        self.tables
            .read()
            .await
            .get(&meta.label())
            .map_or(0, |table| table.rows.len())
    }

    /// Returns every row stored for a model, ordered by pk.
    pub async fn all(&self, meta: &ModelMeta) -> Vec<ModelInstance> {
        self.tables
            .read()
            .await
            .get(&meta.label())
            .map(|table| table.rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn get(&self, meta: &ModelMeta, pk: i64) -> InlineEditResult<ModelInstance> {
        self.tables
            .read()
            .await
            .get(&meta.label())
            .and_then(|table| table.rows.get(&pk))
            .cloned()
            .ok_or_else(|| InlineEditError::DoesNotExist(format!("{meta} matching pk={pk}")))
    }

    async fn save(&self, meta: &ModelMeta, mut instance: ModelInstance) -> InlineEditResult<ModelInstance> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(meta.label()).or_default();
        let pk = match instance.pk {
            Some(pk) => pk,
            None => table.next_pk + 1,
        };
        table.next_pk = table.next_pk.max(pk);
        instance.pk = Some(pk);
        table.rows.insert(pk, instance.clone());
        tracing::debug!(model = %meta, pk, "Saved record");
        Ok(instance)
    }

    async fn delete(&self, meta: &ModelMeta, pk: i64) -> InlineEditResult<()> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(&meta.label())
            .and_then(|table| table.rows.remove(&pk));
        match removed {
            Some(_) => {
                tracing::debug!(model = %meta, pk, "Deleted record");
                Ok(())
            }
            None => Err(InlineEditError::DoesNotExist(format!("{meta} matching pk={pk}"))),
        }
    }

    async fn filter(
        &self,
        meta: &ModelMeta,
        field: &str,
        value: &Value,
    ) -> InlineEditResult<Vec<ModelInstance>> {
        Ok(self
            .tables
            .read()
            .await
            .get(&meta.label())
            .map(|table| {
                table
                    .rows
                    .values()
                    .filter(|row| row.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
