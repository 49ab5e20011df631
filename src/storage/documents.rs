use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::{Record, Repository, StorageError, StorageResult};
use crate::payslips::repo_types::{Payslip, PayslipStatus};
use crate::settings::repo_types::Configuration;

/// Embedded transactional store holding payslips and configuration.
#[derive(Clone)]
pub struct SqliteDocuments {
    pub pool: SqlitePool,
}

impl SqliteDocuments {
    pub async fn open(url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let docs = Self { pool };
        docs.migrate().await?;
        info!(url, "document store ready");
        Ok(docs)
    }

    /// Single-connection in-memory database; the connection must never be recycled.
    #[cfg(test)]
    pub async fn in_memory() -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let docs = Self { pool };
        docs.migrate().await?;
        Ok(docs)
    }

    async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn payslips(&self) -> PayslipRepo {
        PayslipRepo { pool: self.pool.clone() }
    }

    pub fn config(&self) -> ConfigRepo {
        ConfigRepo { pool: self.pool.clone() }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PayslipFilter {
    pub periodo: Option<String>,
    pub estado: Option<PayslipStatus>,
}

#[derive(Clone)]
pub struct PayslipRepo {
    pool: SqlitePool,
}

impl PayslipRepo {
    fn decode(id: i64, documento: &str) -> Option<Payslip> {
        match serde_json::from_str::<Payslip>(documento) {
            Ok(mut p) => {
                p.id = Some(id);
                Some(p)
            }
            Err(e) => {
                warn!(id, error = %e, "skipping unreadable payslip document");
                None
            }
        }
    }

    pub async fn list_filtered(&self, filter: &PayslipFilter) -> StorageResult<Vec<Payslip>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT id, documento
              FROM liquidaciones
             WHERE (?1 IS NULL OR periodo = ?1)
               AND (?2 IS NULL OR estado = ?2)
             ORDER BY id ASC
            "#,
        )
        .bind(filter.periodo.as_deref())
        .bind(filter.estado.map(|e| e.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, doc)| Self::decode(id, &doc))
            .collect())
    }
}

#[async_trait]
impl Repository<Payslip> for PayslipRepo {
    async fn get_all(&self) -> StorageResult<Vec<Payslip>> {
        self.list_filtered(&PayslipFilter::default()).await
    }

    async fn get_by_id(&self, id: &i64) -> StorageResult<Option<Payslip>> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, documento FROM liquidaciones WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(id, doc)| Self::decode(id, &doc)))
    }

    async fn put(&self, mut record: Payslip) -> StorageResult<Payslip> {
        let mut tx = self.pool.begin().await?;
        let id = match record.id() {
            None => {
                let documento = encode(&record)?;
                let done = sqlx::query(
                    "INSERT INTO liquidaciones (empleado, periodo, estado, documento) VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&record.employee_id)
                .bind(&record.period)
                .bind(record.status.as_str())
                .bind(documento)
                .execute(&mut *tx)
                .await?;
                done.last_insert_rowid()
            }
            Some(id) => {
                let documento = encode(&record)?;
                sqlx::query(
                    r#"
                    INSERT INTO liquidaciones (id, empleado, periodo, estado, documento)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(id) DO UPDATE SET
                        empleado = excluded.empleado,
                        periodo = excluded.periodo,
                        estado = excluded.estado,
                        documento = excluded.documento
                    "#,
                )
                .bind(id)
                .bind(&record.employee_id)
                .bind(&record.period)
                .bind(record.status.as_str())
                .bind(documento)
                .execute(&mut *tx)
                .await?;
                id
            }
        };
        tx.commit().await?;
        record.assign_id(id);
        debug!(id, periodo = %record.period, "payslip stored");
        Ok(record)
    }

    async fn hard_delete(&self, id: &i64) -> StorageResult<bool> {
        let done = sqlx::query("DELETE FROM liquidaciones WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct ConfigRepo {
    pool: SqlitePool,
}

impl ConfigRepo {
    pub async fn get(&self, tipo: &str) -> StorageResult<Option<Configuration>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT documento FROM configuracion WHERE tipo = ?1",
        )
        .bind(tipo)
        .fetch_optional(&self.pool)
        .await?;

        let Some((doc,)) = row else {
            return Ok(None);
        };
        match serde_json::from_str::<Configuration>(&doc) {
            Ok(cfg) => Ok(Some(cfg)),
            Err(e) => {
                warn!(tipo, error = %e, "configuration document unreadable; ignoring");
                Ok(None)
            }
        }
    }

    pub async fn put(&self, config: &Configuration) -> StorageResult<()> {
        let documento = serde_json::to_string(config).map_err(|source| StorageError::Encode {
            key: config.tipo.clone(),
            source,
        })?;
        let stamp = config.updated_at.unwrap_or_else(OffsetDateTime::now_utc);
        sqlx::query(
            r#"
            INSERT INTO configuracion (tipo, documento, actualizado)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(tipo) DO UPDATE SET
                documento = excluded.documento,
                actualizado = excluded.actualizado
            "#,
        )
        .bind(&config.tipo)
        .bind(documento)
        .bind(stamp.unix_timestamp().to_string())
        .execute(&self.pool)
        .await?;
        debug!(tipo = %config.tipo, "configuration stored");
        Ok(())
    }
}

fn encode(p: &Payslip) -> StorageResult<String> {
    serde_json::to_string(p).map_err(|source| StorageError::Encode {
        key: "liquidaciones".into(),
        source,
    })
}
