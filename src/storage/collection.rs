use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{IdGenerator, KvStore, Record, Repository, StorageError, StorageResult};

/// One element of a stored array. Elements that no longer match the record
/// shape are carried through writes untouched.
enum Slot<T> {
    Record(T),
    Opaque(Value),
}

/// A collection kept as one JSON array under a single key.
pub struct KvRepository<T> {
    kv: Arc<dyn KvStore>,
    key: &'static str,
    ids: Arc<IdGenerator>,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> KvRepository<T>
where
    T: Record<Id = String>,
{
    pub fn new(kv: Arc<dyn KvStore>, key: &'static str, ids: Arc<IdGenerator>) -> Self {
        Self {
            kv,
            key,
            ids,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    /// True when the collection has never been written.
    pub async fn is_unset(&self) -> StorageResult<bool> {
        Ok(self.kv.get_item(self.key).await?.is_none())
    }

    /// A payload that is not a JSON array reads as an empty collection.
    async fn load(&self) -> StorageResult<Vec<Slot<T>>> {
        let Some(raw) = self.kv.get_item(self.key).await? else {
            return Ok(Vec::new());
        };
        let values = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(collection = self.key, error = %e, "stored collection is not a JSON array; treating as empty");
                return Ok(Vec::new());
            }
        };
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match T::deserialize(&value) {
                Ok(mut record) => {
                    record.upgrade();
                    Slot::Record(record)
                }
                Err(e) => {
                    warn!(collection = self.key, index, error = %e, "skipping undecodable record");
                    Slot::Opaque(value)
                }
            })
            .collect())
    }

    async fn records(&self) -> StorageResult<Vec<T>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Record(r) => Some(r),
                Slot::Opaque(_) => None,
            })
            .collect())
    }

    async fn store(&self, slots: &[Slot<T>]) -> StorageResult<()> {
        let encode = |source| StorageError::Encode { key: self.key.to_string(), source };
        let values = slots
            .iter()
            .map(|slot| match slot {
                Slot::Record(r) => serde_json::to_value(r),
                Slot::Opaque(v) => Ok(v.clone()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(encode)?;
        let raw = serde_json::to_string(&values).map_err(encode)?;
        self.kv.set_item(self.key, &raw).await
    }

    /// Replaces the whole collection.
    pub async fn replace_all(&self, records: &[T]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let slots: Vec<Slot<T>> = records.iter().cloned().map(Slot::Record).collect();
        self.store(&slots).await
    }

    fn position(slots: &[Slot<T>], id: &str) -> Option<usize> {
        slots
            .iter()
            .position(|s| matches!(s, Slot::Record(r) if r.id().as_deref() == Some(id)))
    }
}

#[async_trait]
impl<T> Repository<T> for KvRepository<T>
where
    T: Record<Id = String>,
{
    async fn get_all(&self) -> StorageResult<Vec<T>> {
        self.records().await
    }

    async fn get_by_id(&self, id: &String) -> StorageResult<Option<T>> {
        Ok(self.records().await?.into_iter().find(|r| r.id().as_ref() == Some(id)))
    }

    async fn put(&self, mut record: T) -> StorageResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut slots = self.load().await?;
        match record.id() {
            None => {
                record.assign_id(self.ids.next());
                slots.push(Slot::Record(record.clone()));
            }
            Some(id) => match Self::position(&slots, &id) {
                Some(idx) => slots[idx] = Slot::Record(record.clone()),
                None => slots.push(Slot::Record(record.clone())),
            },
        }
        self.store(&slots).await?;
        debug!(collection = self.key, id = ?record.id(), total = slots.len(), "record stored");
        Ok(record)
    }

    async fn hard_delete(&self, id: &String) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut slots = self.load().await?;
        let Some(idx) = Self::position(&slots, id) else {
            return Ok(false);
        };
        slots.remove(idx);
        self.store(&slots).await?;
        debug!(collection = self.key, id = %id, "record removed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::storage::{LifecycleState, MemoryKv};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Item {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        estado: LifecycleState,
    }

    impl Record for Item {
        type Id = String;
        fn id(&self) -> Option<String> {
            self.id.clone()
        }
        fn assign_id(&mut self, id: String) {
            self.id = Some(id);
        }
        fn is_active(&self) -> bool {
            self.estado == LifecycleState::Active
        }
        fn set_active(&mut self, active: bool) {
            self.estado = if active { LifecycleState::Active } else { LifecycleState::Inactive };
        }
    }

    fn item(name: &str) -> Item {
        Item { id: None, name: name.into(), estado: LifecycleState::Active }
    }

    fn repo(kv: Arc<dyn KvStore>) -> KvRepository<Item> {
        KvRepository::new(kv, "items", Arc::new(IdGenerator::default()))
    }

    #[tokio::test]
    async fn put_inserts_then_replaces_in_place() {
        let repo = repo(Arc::new(MemoryKv::new()));
        let a = repo.put(item("a")).await.unwrap();
        let b = repo.put(item("b")).await.unwrap();
        assert!(a.id.is_some() && b.id.is_some());
        assert_ne!(a.id, b.id);

        let mut renamed = a.clone();
        renamed.name = "a2".into();
        repo.put(renamed).await.unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "a2");
        assert_eq!(all[1].name, "b");
    }

    #[tokio::test]
    async fn put_with_unknown_id_appends() {
        let repo = repo(Arc::new(MemoryKv::new()));
        let mut rec = item("x");
        rec.id = Some("42".into());
        repo.put(rec).await.unwrap();
        assert!(repo.get_by_id(&"42".to_string()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn soft_delete_keeps_record_and_reactivate_restores_it() {
        let repo = repo(Arc::new(MemoryKv::new()));
        let rec = repo.put(item("a")).await.unwrap();
        let id = rec.id.clone().unwrap();

        let gone = repo.soft_delete(&id).await.unwrap().unwrap();
        assert_eq!(gone.estado, LifecycleState::Inactive);
        let still = repo.get_by_id(&id).await.unwrap().unwrap();
        assert!(!still.is_active());

        repo.reactivate(&id).await.unwrap();
        assert!(repo.get_by_id(&id).await.unwrap().unwrap().is_active());

        assert!(repo.soft_delete(&"missing".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hard_delete_removes_record() {
        let repo = repo(Arc::new(MemoryKv::new()));
        let rec = repo.put(item("a")).await.unwrap();
        let id = rec.id.unwrap();
        assert!(repo.hard_delete(&id).await.unwrap());
        assert!(repo.get_by_id(&id).await.unwrap().is_none());
        assert!(!repo.hard_delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn corrupted_collection_reads_as_empty() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        kv.set_item("items", "{not json").await.unwrap();
        let repo = repo(kv.clone());
        assert!(repo.get_all().await.unwrap().is_empty());

        // the next write replaces the corrupted payload
        repo.put(item("fresh")).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn undecodable_records_are_skipped_and_kept_on_write() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        kv.set_item(
            "items",
            r#"[{"id":"1","name":"ok"},{"id":"2","name":17},{"id":"3","name":"also ok"}]"#,
        )
        .await
        .unwrap();
        let repo = repo(kv.clone());

        let names: Vec<String> = repo.get_all().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["ok", "also ok"]);

        repo.put(item("fresh")).await.unwrap();
        assert!(repo.hard_delete(&"1".to_string()).await.unwrap());

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&kv.get_item("items").await.unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0]["name"], 17);
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
    }
}
