use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::OffsetDateTime;

pub mod collection;
pub mod documents;
pub mod kv;

pub use collection::KvRepository;
pub use documents::{ConfigRepo, PayslipRepo, SqliteDocuments};
pub use kv::{FileKv, KvStore};
#[cfg(test)]
pub use kv::MemoryKv;

/// Storage keys of the persisted collections.
pub mod collections {
    pub const USUARIOS: &str = "usuarios";
    pub const USERS: &str = "users";
    pub const CLIENTES: &str = "clientes";
    pub const EMPLEADOS: &str = "empleados";
    pub const CONCEPTOS: &str = "conceptos";
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Active / Inactive flag shared by users and clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    #[serde(rename = "Activo", alias = "activo")]
    Active,
    #[serde(rename = "Inactivo", alias = "inactivo")]
    Inactive,
}

/// A flat record persisted in one of the collections.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Clone + Debug + Display + PartialEq + Send + Sync;

    fn id(&self) -> Option<Self::Id>;

    fn assign_id(&mut self, id: Self::Id);

    fn is_active(&self) -> bool {
        true
    }

    /// Records without a lifecycle ignore this.
    fn set_active(&mut self, _active: bool) {}

    /// Moves values read from older field names into the current ones.
    fn upgrade(&mut self) {}
}

/// Typed CRUD over one entity type, regardless of the engine underneath.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn get_all(&self) -> StorageResult<Vec<T>>;

    async fn get_by_id(&self, id: &T::Id) -> StorageResult<Option<T>>;

    /// Inserts when the record carries no identifier, replaces it in place otherwise.
    async fn put(&self, record: T) -> StorageResult<T>;

    async fn hard_delete(&self, id: &T::Id) -> StorageResult<bool>;

    async fn soft_delete(&self, id: &T::Id) -> StorageResult<Option<T>> {
        self.set_active(id, false).await
    }

    async fn reactivate(&self, id: &T::Id) -> StorageResult<Option<T>> {
        self.set_active(id, true).await
    }

    async fn set_active(&self, id: &T::Id, active: bool) -> StorageResult<Option<T>> {
        let Some(mut record) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        record.set_active(active);
        self.put(record).await.map(Some)
    }
}

/// Identifiers are strings, but older data stored some of them as numbers.
pub mod flexible_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Raw>::deserialize(d)? {
            Some(Raw::Text(s)) if !s.is_empty() => Some(s),
            Some(Raw::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}

/// Timestamp-derived identifiers, strictly increasing within the process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn next(&self) -> String {
        let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = if now > prev { now } else { prev + 1 };
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}
