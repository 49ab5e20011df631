use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::controller::{render, ViewController, ViewOutcome, ViewServices};
use super::store::AppStore;
use super::templates::TemplateSource;

/// One view controller, and so one store, per signed-in client.
pub struct ViewSessions {
    templates: Arc<dyn TemplateSource>,
    services: ViewServices,
    clients: Mutex<HashMap<String, Arc<ViewController>>>,
}

impl ViewSessions {
    pub fn new(templates: Arc<dyn TemplateSource>, services: ViewServices) -> Self {
        Self { templates, services, clients: Mutex::new(HashMap::new()) }
    }

    /// The controller bound to `sid`, created on first use.
    pub fn for_client(&self, sid: &str) -> Arc<ViewController> {
        let mut clients = self.clients.lock().unwrap_or_else(|p| p.into_inner());
        clients
            .entry(sid.to_string())
            .or_insert_with(|| {
                debug!("view store opened for client");
                Arc::new(ViewController::new(
                    Arc::new(AppStore::new()),
                    self.templates.clone(),
                    self.services.clone(),
                ))
            })
            .clone()
    }

    pub fn forget(&self, sid: &str) {
        let mut clients = self.clients.lock().unwrap_or_else(|p| p.into_inner());
        if clients.remove(sid).is_some() {
            debug!("view store dropped for client");
        }
    }

    /// Markup for callers without a session.
    pub async fn render(&self, name: &str) -> ViewOutcome {
        render(self.templates.as_ref(), name).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::concepts::{Concept, ConceptService};
    use crate::employees::{Employee, EmployeeService};
    use crate::payslips::PayslipService;
    use crate::seed::seed_if_empty;
    use crate::settings::SettingsService;
    use crate::storage::{collections, IdGenerator, KvRepository, KvStore, MemoryKv, SqliteDocuments};
    use crate::views::controller::ViewSource;
    use crate::views::templates::ViewError;

    struct Fixed;

    #[async_trait]
    impl TemplateSource for Fixed {
        async fn fetch(&self, path: &str) -> Result<Option<String>, ViewError> {
            Ok(match path {
                "views/empleados/lista.html" => Some("<table></table>".into()),
                "views/reportes/lista.html" => Some("<div></div>".into()),
                _ => None,
            })
        }
    }

    async fn sessions() -> ViewSessions {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let ids = Arc::new(IdGenerator::default());
        let employees = Arc::new(KvRepository::<Employee>::new(kv.clone(), collections::EMPLEADOS, ids.clone()));
        let concepts = Arc::new(KvRepository::<Concept>::new(kv, collections::CONCEPTOS, ids));
        let docs = SqliteDocuments::in_memory().await.unwrap();
        let settings = Arc::new(SettingsService::new(docs.config()));
        seed_if_empty(&employees, &concepts, &settings).await.unwrap();

        ViewSessions::new(
            Arc::new(Fixed),
            ViewServices {
                employees: Arc::new(EmployeeService::new(employees.clone())),
                payslips: Arc::new(PayslipService::new(docs.payslips(), employees)),
                concepts: Arc::new(ConceptService::new(concepts)),
                settings,
            },
        )
    }

    #[tokio::test]
    async fn each_client_navigates_its_own_store() {
        let views = sessions().await;
        views.for_client("ana").navigate("empleados").await;
        views.for_client("luis").navigate("reportes").await;

        let ana = views.for_client("ana").store().snapshot();
        let luis = views.for_client("luis").store().snapshot();
        assert_eq!(ana.current_view, "empleados");
        assert_eq!(ana.employees.len(), 2);
        assert!(ana.reports.is_none());
        assert_eq!(luis.current_view, "reportes");
        assert!(luis.reports.is_some());
    }

    #[tokio::test]
    async fn anonymous_render_does_not_disturb_a_client() {
        let views = sessions().await;
        let ana = views.for_client("ana");
        ana.navigate("empleados").await;
        let before = ana.store().snapshot();

        let out = views.render("reportes").await;
        assert_eq!(out.source, ViewSource::Template);
        assert!(Arc::ptr_eq(&before, &ana.store().snapshot()));
    }

    #[tokio::test]
    async fn forgetting_a_client_starts_it_fresh() {
        let views = sessions().await;
        views.for_client("ana").navigate("empleados").await;
        views.forget("ana");
        assert!(views.for_client("ana").store().snapshot().current_view.is_empty());
    }
}
