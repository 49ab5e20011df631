use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::repo_types::{Client, ClientPatch};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{Record, Repository};
use crate::validation::{first_missing, format_rut, is_valid_email, is_valid_rut, normalize_rut};

pub fn check_client(c: &Client, existing: &[Client]) -> Result<(), String> {
    if first_missing(&[("nombre", Some(c.name.as_str())), ("rut", Some(c.rut.as_str()))]).is_some() {
        return Err("El nombre y el RUT son obligatorios".into());
    }
    if !is_valid_rut(&c.rut) {
        return Err("El RUT ingresado no es válido".into());
    }
    if !c.email.trim().is_empty() && !is_valid_email(c.email.trim()) {
        return Err("El correo electrónico no es válido".into());
    }
    let rut = normalize_rut(&c.rut);
    if existing
        .iter()
        .any(|o| o.id != c.id && o.is_active() && normalize_rut(&o.rut) == rut)
    {
        return Err("Ya existe un cliente con el mismo RUT".into());
    }
    Ok(())
}

pub struct ClientService {
    repo: Arc<dyn Repository<Client>>,
    /// Held from the uniqueness check to the write.
    writes: Mutex<()>,
}

impl ClientService {
    pub fn new(repo: Arc<dyn Repository<Client>>) -> Self {
        Self { repo, writes: Mutex::new(()) }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Client>> {
        Ok(self.repo.get_all().await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Client> {
        self.repo
            .get_by_id(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Cliente no encontrado"))
    }

    /// Creation and update apply the same rules to clients.
    pub async fn validate(&self, c: &Client, _is_update: bool) -> ServiceResult<()> {
        let existing = self.repo.get_all().await?;
        check_client(c, &existing).map_err(ServiceError::Validation)
    }

    #[instrument(skip(self, client), fields(rut = %client.rut))]
    pub async fn save(&self, mut client: Client) -> ServiceResult<Client> {
        client.id = None;
        client.set_active(true);
        let _writes = self.writes.lock().await;
        self.validate(&client, false).await?;
        client.rut = format_rut(&client.rut);
        client.created_at = Some(OffsetDateTime::now_utc());
        let saved = self.repo.put(client).await?;
        info!(id = ?saved.id, "client created");
        Ok(saved)
    }

    pub async fn update(&self, id: &str, patch: ClientPatch) -> ServiceResult<Client> {
        let _writes = self.writes.lock().await;
        let mut client = self.get(id).await?;
        patch.apply(&mut client);
        self.validate(&client, true).await?;
        client.rut = format_rut(&client.rut);
        let saved = self.repo.put(client).await?;
        info!(id, "client updated");
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Client> {
        self.repo
            .soft_delete(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Cliente no encontrado"))
    }

    pub async fn reactivate(&self, id: &str) -> ServiceResult<Client> {
        let _writes = self.writes.lock().await;
        let mut client = self.get(id).await?;
        client.set_active(true);
        self.validate(&client, true).await?;
        Ok(self.repo.put(client).await?)
    }

    pub async fn purge(&self, id: &str) -> ServiceResult<()> {
        if !self.repo.hard_delete(&id.to_string()).await? {
            return Err(ServiceError::not_found("Cliente no encontrado"));
        }
        info!(id, "client purged");
        Ok(())
    }
}
