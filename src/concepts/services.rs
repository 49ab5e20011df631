use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::repo_types::{Concept, ConceptBook};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::Repository;
use crate::validation::first_missing;

pub struct ConceptService {
    repo: Arc<dyn Repository<Concept>>,
    writes: Mutex<()>,
}

impl ConceptService {
    pub fn new(repo: Arc<dyn Repository<Concept>>) -> Self {
        Self { repo, writes: Mutex::new(()) }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Concept>> {
        Ok(self.repo.get_all().await?)
    }

    pub async fn book(&self) -> ServiceResult<ConceptBook> {
        Ok(ConceptBook::from_concepts(self.list().await?))
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Concept> {
        self.repo
            .get_by_id(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Concepto no encontrado"))
    }

    async fn validate(&self, c: &Concept) -> ServiceResult<()> {
        if first_missing(&[("codigo", Some(c.codigo.as_str())), ("nombre", Some(c.nombre.as_str()))]).is_some() {
            return Err(ServiceError::validation("El código y el nombre son obligatorios"));
        }
        if !c.valor.is_finite() || c.valor < 0.0 {
            return Err(ServiceError::validation("El valor no puede ser negativo"));
        }
        let code = c.codigo.trim().to_uppercase();
        let taken = self
            .repo
            .get_all()
            .await?
            .iter()
            .any(|o| o.id != c.id && o.codigo.trim().to_uppercase() == code);
        if taken {
            return Err(ServiceError::validation("Ya existe un concepto con el mismo código"));
        }
        Ok(())
    }

    pub async fn save(&self, mut concept: Concept) -> ServiceResult<Concept> {
        concept.id = None;
        let _writes = self.writes.lock().await;
        self.validate(&concept).await?;
        let saved = self.repo.put(concept).await?;
        info!(id = ?saved.id, codigo = %saved.codigo, "concept created");
        Ok(saved)
    }

    /// Replaces the stored concept wholesale.
    pub async fn update(&self, id: &str, mut concept: Concept) -> ServiceResult<Concept> {
        let _writes = self.writes.lock().await;
        self.get(id).await?;
        concept.id = Some(id.to_string());
        self.validate(&concept).await?;
        Ok(self.repo.put(concept).await?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        if !self.repo.hard_delete(&id.to_string()).await? {
            return Err(ServiceError::not_found("Concepto no encontrado"));
        }
        info!(id, "concept deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::repo_types::ConceptKind;
    use crate::storage::{collections, IdGenerator, KvRepository, MemoryKv};

    fn service() -> ConceptService {
        let repo = KvRepository::<Concept>::new(
            Arc::new(MemoryKv::new()),
            collections::CONCEPTOS,
            Arc::new(IdGenerator::default()),
        );
        ConceptService::new(Arc::new(repo))
    }

    fn bono() -> Concept {
        Concept {
            codigo: "HAB003".into(),
            nombre: "Bono Asistencia".into(),
            tipo: ConceptKind::Haber,
            imponible: true,
            tributable: true,
            valor: 50_000.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn codes_are_unique_ignoring_case() {
        let svc = service();
        svc.save(bono()).await.unwrap();
        let mut dup = bono();
        dup.codigo = "hab003".into();
        assert!(matches!(svc.save(dup).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn update_replaces_and_book_splits() {
        let svc = service();
        let id = svc.save(bono()).await.unwrap().id.unwrap();
        let mut changed = bono();
        changed.valor = 60_000.0;
        svc.update(&id, changed).await.unwrap();

        svc.save(Concept {
            codigo: "DES001".into(),
            nombre: "AFP".into(),
            tipo: ConceptKind::Descuento,
            valor: 0.1,
            ..Default::default()
        })
        .await
        .unwrap();

        let book = svc.book().await.unwrap();
        assert_eq!(book.earnings.len(), 1);
        assert_eq!(book.earnings[0].valor, 60_000.0);
        assert_eq!(book.deductions.len(), 1);
    }

    #[tokio::test]
    async fn negative_values_and_missing_concepts_are_rejected() {
        let svc = service();
        let mut neg = bono();
        neg.valor = -1.0;
        assert!(matches!(svc.save(neg).await, Err(ServiceError::Validation(_))));
        assert!(matches!(svc.delete("nope").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.update("nope", bono()).await, Err(ServiceError::NotFound(_))));
    }
}
