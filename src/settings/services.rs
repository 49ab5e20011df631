use time::OffsetDateTime;
use tracing::{info, warn};

use super::repo_types::{CompanyProfile, Configuration, GENERAL};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::ConfigRepo;
use crate::validation::is_valid_rut;

pub struct SettingsService {
    repo: ConfigRepo,
}

impl SettingsService {
    pub fn new(repo: ConfigRepo) -> Self {
        Self { repo }
    }

    /// The stored `general` document, or `None` when nothing was saved yet.
    pub async fn stored(&self) -> ServiceResult<Option<Configuration>> {
        Ok(self.repo.get(GENERAL).await?)
    }

    /// Falls back to defaults when nothing usable is stored.
    pub async fn load(&self) -> ServiceResult<Configuration> {
        match self.stored().await? {
            Some(cfg) => Ok(cfg),
            None => {
                warn!("no stored configuration; using defaults");
                Ok(Configuration::default())
            }
        }
    }

    pub async fn save(&self, mut config: Configuration) -> ServiceResult<Configuration> {
        config.tipo = GENERAL.to_string();
        check_company(&config.company)?;
        config.updated_at = Some(OffsetDateTime::now_utc());
        self.repo.put(&config).await?;
        info!("configuration saved");
        Ok(config)
    }

    /// Replaces the company profile only; parameters stay as stored.
    pub async fn save_company(&self, company: CompanyProfile) -> ServiceResult<Configuration> {
        let mut config = self.load().await?;
        config.company = company;
        self.save(config).await
    }
}

fn check_company(c: &CompanyProfile) -> ServiceResult<()> {
    if c.name.trim().is_empty() {
        return Err(ServiceError::validation("El nombre de la empresa es obligatorio"));
    }
    if !c.rut.trim().is_empty() && !is_valid_rut(&c.rut) {
        return Err(ServiceError::validation("El RUT ingresado no es válido"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteDocuments;

    async fn service() -> SettingsService {
        let docs = SqliteDocuments::in_memory().await.unwrap();
        SettingsService::new(docs.config())
    }

    #[tokio::test]
    async fn load_defaults_when_empty() {
        let svc = service().await;
        assert!(svc.stored().await.unwrap().is_none());
        let cfg = svc.load().await.unwrap();
        assert_eq!(cfg.company.name, "Mi Empresa S.A.");
        assert_eq!(cfg.parameters.afp, 0.1);
    }

    #[tokio::test]
    async fn save_company_keeps_parameters_and_stamps() {
        let svc = service().await;
        let mut cfg = Configuration::default();
        cfg.parameters.uf = 37_000.0;
        svc.save(cfg).await.unwrap();

        let company = CompanyProfile {
            name: "Nueva Empresa SpA".into(),
            rut: "76.543.210-3".into(),
            ..Configuration::default().company
        };
        let saved = svc.save_company(company).await.unwrap();
        assert!(saved.updated_at.is_some());

        let loaded = svc.load().await.unwrap();
        assert_eq!(loaded.company.name, "Nueva Empresa SpA");
        assert_eq!(loaded.parameters.uf, 37_000.0);
    }

    #[tokio::test]
    async fn rejects_invalid_company_rut() {
        let svc = service().await;
        let company = CompanyProfile { rut: "76.543.210-1".into(), ..Configuration::default().company };
        assert!(matches!(svc.save_company(company).await, Err(ServiceError::Validation(_))));
    }
}
