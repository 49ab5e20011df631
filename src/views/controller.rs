use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use super::store::{AppStore, ReportSummary};
use super::templates::{
    candidate_paths, error_panel_html, landing_html, loading_html, TemplateSource, ViewError,
    LANDING_VIEW,
};
use crate::concepts::ConceptService;
use crate::employees::EmployeeService;
use crate::error::ServiceError;
use crate::payslips::PayslipService;
use crate::settings::SettingsService;
use crate::storage::documents::PayslipFilter;

lazy_static! {
    static ref VIEW_NAME_RE: Regex = Regex::new(r"^[a-z0-9_-]+$").unwrap();
}

pub const TITLE_PREFIX: &str = "Remuneraciones";

pub fn is_valid_view_name(name: &str) -> bool {
    VIEW_NAME_RE.is_match(name)
}

/// `Remuneraciones - Empleados` for `empleados`.
pub fn page_title(name: &str) -> String {
    let mut chars = name.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{TITLE_PREFIX} - {capitalized}")
}

fn normalize(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        LANDING_VIEW.to_string()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSource {
    Inline,
    Template,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewOutcome {
    pub view: String,
    pub title: String,
    pub html: String,
    pub source: ViewSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// A newer load started before this one finished; its markup was not published.
    #[serde(skip)]
    pub superseded: bool,
}

struct Resolved {
    html: String,
    source: ViewSource,
    path: Option<String>,
}

async fn resolve(templates: &dyn TemplateSource, name: &str) -> Result<Resolved, ViewError> {
    if name == LANDING_VIEW {
        return Ok(Resolved {
            html: landing_html().to_string(),
            source: ViewSource::Inline,
            path: None,
        });
    }
    if !is_valid_view_name(name) {
        return Err(ViewError::InvalidName(name.to_string()));
    }
    for path in candidate_paths(name) {
        match templates.fetch(&path).await? {
            Some(body) if body.trim().is_empty() => return Err(ViewError::Empty(path)),
            Some(body) => return Ok(Resolved { html: body, source: ViewSource::Template, path: Some(path) }),
            None => debug!(path = %path, "template not found"),
        }
    }
    Err(ViewError::NotFound(name.to_string()))
}

/// Markup only: no store is touched and no initializer runs.
#[instrument(skip(templates))]
pub async fn render(templates: &dyn TemplateSource, name: &str) -> ViewOutcome {
    let name = normalize(name);
    let Resolved { html, source, path } = match resolve(templates, &name).await {
        Ok(r) => r,
        Err(e) => {
            warn!(view = %name, error = %e, "view could not be rendered");
            Resolved {
                html: error_panel_html(&name, Some(&e.to_string())),
                source: ViewSource::Error,
                path: None,
            }
        }
    };
    ViewOutcome { title: page_title(&name), view: name, html, source, path, superseded: false }
}

/// Services the view initializers read from.
#[derive(Clone)]
pub struct ViewServices {
    pub employees: Arc<EmployeeService>,
    pub payslips: Arc<PayslipService>,
    pub concepts: Arc<ConceptService>,
    pub settings: Arc<SettingsService>,
}

pub struct ViewController {
    store: Arc<AppStore>,
    templates: Arc<dyn TemplateSource>,
    services: ViewServices,
    generation: AtomicU64,
}

impl ViewController {
    pub fn new(store: Arc<AppStore>, templates: Arc<dyn TemplateSource>, services: ViewServices) -> Self {
        Self { store, templates, services, generation: AtomicU64::new(0) }
    }

    pub fn store(&self) -> &Arc<AppStore> {
        &self.store
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Swaps `html` into the container unless a newer load has started.
    fn publish(&self, generation: u64, html: &str) -> bool {
        let mut published = false;
        self.store.update(|s| {
            if self.is_current(generation) {
                s.content = html.to_string();
                published = true;
            }
        });
        published
    }

    /// Marks `name` as the active link, retitles the page and loads the view.
    #[instrument(skip(self))]
    pub async fn navigate(&self, name: &str) -> ViewOutcome {
        let name = normalize(name);
        let title = page_title(&name);
        self.store.update(|s| {
            s.active_link = Some(name.clone());
            s.title = title.clone();
        });
        self.load_view(&name).await
    }

    #[instrument(skip(self))]
    pub async fn load_view(&self, name: &str) -> ViewOutcome {
        let name = normalize(name);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let placeholder = loading_html(&name);
        self.store.update(|s| {
            s.current_view = name.clone();
            s.content = placeholder;
        });

        let Resolved { mut html, mut source, path } = match self.resolve(&name).await {
            Ok(r) => r,
            Err(e) => {
                warn!(view = %name, error = %e, "view could not be loaded");
                Resolved {
                    html: error_panel_html(&name, Some(&e.to_string())),
                    source: ViewSource::Error,
                    path: None,
                }
            }
        };

        let mut superseded = !self.publish(generation, &html);
        if superseded {
            debug!(view = %name, generation, "load superseded by a newer one");
        } else if source != ViewSource::Error {
            if let Err(e) = self.initialize(&name).await {
                error!(view = %name, error = %e, "view initializer failed");
                html = error_panel_html(&name, Some(&e.to_string()));
                source = ViewSource::Error;
                superseded = !self.publish(generation, &html);
            }
        }

        ViewOutcome { title: page_title(&name), view: name, html, source, path, superseded }
    }

    async fn resolve(&self, name: &str) -> Result<Resolved, ViewError> {
        resolve(self.templates.as_ref(), name).await
    }

    /// Loads what the view renders into the store.
    async fn initialize(&self, name: &str) -> Result<(), ViewError> {
        let fail = |e: ServiceError| ViewError::Initializer {
            view: name.to_string(),
            reason: e.to_string(),
        };
        let svc = &self.services;
        match name {
            "empleados" => {
                let employees = svc.employees.list().await.map_err(fail)?;
                self.store.update(|s| s.employees = employees);
            }
            "liquidaciones" => {
                let payslips = svc.payslips.list(&PayslipFilter::default()).await.map_err(fail)?;
                let employees = svc.employees.list().await.map_err(fail)?;
                let concepts = svc.concepts.book().await.map_err(fail)?;
                self.store.update(|s| {
                    s.payslips = payslips;
                    s.employees = employees;
                    s.concepts = concepts;
                });
            }
            "reportes" => {
                let payslips = svc.payslips.list(&PayslipFilter::default()).await.map_err(fail)?;
                let employees = svc.employees.list().await.map_err(fail)?;
                let reports = ReportSummary::build(&employees, &payslips);
                self.store.update(|s| {
                    s.payslips = payslips;
                    s.employees = employees;
                    s.reports = Some(reports);
                });
            }
            "configuracion" => {
                let config = svc.settings.load().await.map_err(fail)?;
                self.store.update(|s| s.configuration = Some(config));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::concepts::Concept;
    use crate::employees::Employee;
    use crate::seed::seed_if_empty;
    use crate::storage::{collections, IdGenerator, KvRepository, KvStore, MemoryKv, SqliteDocuments};

    enum Canned {
        Body(&'static str),
        Fail,
    }

    #[derive(Default)]
    struct MapSource {
        files: HashMap<&'static str, Canned>,
        requested: Mutex<Vec<String>>,
    }

    impl MapSource {
        fn with(files: impl IntoIterator<Item = (&'static str, Canned)>) -> Arc<Self> {
            Arc::new(Self { files: files.into_iter().collect(), ..Default::default() })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TemplateSource for MapSource {
        async fn fetch(&self, path: &str) -> Result<Option<String>, ViewError> {
            self.requested.lock().unwrap().push(path.to_string());
            match self.files.get(path) {
                Some(Canned::Body(b)) => Ok(Some(b.to_string())),
                Some(Canned::Fail) => Err(ViewError::Io {
                    path: path.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                }),
                None => Ok(None),
            }
        }
    }

    async fn controller(source: Arc<dyn TemplateSource>) -> (Arc<ViewController>, Arc<AppStore>) {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let ids = Arc::new(IdGenerator::default());
        let employees = Arc::new(KvRepository::<Employee>::new(kv.clone(), collections::EMPLEADOS, ids.clone()));
        let concepts = Arc::new(KvRepository::<Concept>::new(kv, collections::CONCEPTOS, ids));
        let docs = SqliteDocuments::in_memory().await.unwrap();
        let settings = Arc::new(SettingsService::new(docs.config()));
        seed_if_empty(&employees, &concepts, &settings).await.unwrap();

        let services = ViewServices {
            employees: Arc::new(EmployeeService::new(employees.clone())),
            payslips: Arc::new(PayslipService::new(docs.payslips(), employees)),
            concepts: Arc::new(ConceptService::new(concepts)),
            settings,
        };
        let store = Arc::new(AppStore::new());
        (Arc::new(ViewController::new(store.clone(), source, services)), store)
    }

    #[test]
    fn titles_capitalize_the_view_name() {
        assert_eq!(page_title("empleados"), "Remuneraciones - Empleados");
        assert_eq!(page_title("inicio"), "Remuneraciones - Inicio");
    }

    #[tokio::test]
    async fn landing_renders_without_fetching() {
        let source = MapSource::empty();
        let (ctl, store) = controller(source.clone()).await;

        for name in ["inicio", "", "  "] {
            let out = ctl.load_view(name).await;
            assert_eq!(out.source, ViewSource::Inline);
            assert_eq!(out.view, "inicio");
            assert!(out.html.contains("Bienvenido al Módulo de Remuneraciones"));
        }
        assert!(source.requested().is_empty());
        assert!(store.snapshot().content.contains(r#"data-view="empleados""#));
    }

    #[tokio::test]
    async fn list_template_wins_over_flat_one() {
        let source = MapSource::with([
            ("views/empleados/lista.html", Canned::Body("<table id=\"empleados\"></table>")),
            ("views/empleados.html", Canned::Body("<p>plano</p>")),
        ]);
        let (ctl, store) = controller(source.clone()).await;

        let out = ctl.navigate("empleados").await;
        assert_eq!(out.source, ViewSource::Template);
        assert_eq!(out.path.as_deref(), Some("views/empleados/lista.html"));
        assert_eq!(out.title, "Remuneraciones - Empleados");
        assert_eq!(source.requested(), vec!["views/empleados/lista.html"]);

        let snap = store.snapshot();
        assert_eq!(snap.current_view, "empleados");
        assert_eq!(snap.active_link.as_deref(), Some("empleados"));
        assert_eq!(snap.title, "Remuneraciones - Empleados");
        assert_eq!(snap.content, "<table id=\"empleados\"></table>");
        assert_eq!(snap.employees.len(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_flat_template() {
        let source = MapSource::with([("views/configuracion.html", Canned::Body("<form></form>"))]);
        let (ctl, store) = controller(source.clone()).await;

        let out = ctl.load_view("configuracion").await;
        assert_eq!(out.path.as_deref(), Some("views/configuracion.html"));
        assert_eq!(source.requested().len(), 2);
        assert!(store.snapshot().configuration.is_some());
    }

    #[tokio::test]
    async fn unknown_view_shows_error_panel_after_both_lookups() {
        let source = MapSource::empty();
        let (ctl, store) = controller(source.clone()).await;

        let out = ctl.load_view("desconocida").await;
        assert_eq!(out.source, ViewSource::Error);
        assert_eq!(
            source.requested(),
            vec!["views/desconocida/lista.html", "views/desconocida.html"]
        );
        let snap = store.snapshot();
        assert!(snap.content.contains("Error al cargar la vista"));
        assert!(snap.content.contains("desconocida"));
        assert!(snap.content.contains(r#"data-view="inicio""#));
    }

    #[tokio::test]
    async fn read_failure_aborts_the_lookup() {
        let source = MapSource::with([
            ("views/reportes/lista.html", Canned::Fail),
            ("views/reportes.html", Canned::Body("<p>reportes</p>")),
        ]);
        let (ctl, store) = controller(source.clone()).await;

        let out = ctl.load_view("reportes").await;
        assert_eq!(out.source, ViewSource::Error);
        assert_eq!(source.requested(), vec!["views/reportes/lista.html"]);
        // initializer is skipped when markup could not be resolved
        assert!(store.snapshot().reports.is_none());
    }

    #[tokio::test]
    async fn empty_template_aborts_the_lookup() {
        let source = MapSource::with([
            ("views/liquidaciones/lista.html", Canned::Body("   \n")),
            ("views/liquidaciones.html", Canned::Body("<p>ok</p>")),
        ]);
        let (ctl, _store) = controller(source.clone()).await;

        let out = ctl.load_view("liquidaciones").await;
        assert_eq!(out.source, ViewSource::Error);
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn suspicious_names_never_reach_the_source() {
        let source = MapSource::empty();
        let (ctl, _store) = controller(source.clone()).await;

        for name in ["../secretos", "Empleados", "a/b", "<script>"] {
            let out = ctl.load_view(name).await;
            assert_eq!(out.source, ViewSource::Error, "{name}");
            assert!(!out.html.contains("<script>"));
        }
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn reports_view_builds_summary() {
        let source = MapSource::with([("views/reportes/lista.html", Canned::Body("<div></div>"))]);
        let (ctl, store) = controller(source).await;

        ctl.load_view("reportes").await;
        let reports = store.snapshot().reports.clone().unwrap();
        assert_eq!(reports.empleados, 2);
        assert_eq!(reports.liquidaciones, 0);
    }

    #[tokio::test]
    async fn render_leaves_no_trace() {
        let source = MapSource::with([("views/empleados/lista.html", Canned::Body("<table></table>"))]);
        let (_ctl, store) = controller(source.clone()).await;
        let before = store.snapshot();

        let out = render(source.as_ref(), "empleados").await;
        assert_eq!(out.source, ViewSource::Template);
        assert_eq!(out.html, "<table></table>");
        let missing = render(source.as_ref(), "nada").await;
        assert_eq!(missing.source, ViewSource::Error);

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    struct GatedSource {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TemplateSource for GatedSource {
        async fn fetch(&self, path: &str) -> Result<Option<String>, ViewError> {
            match path {
                "views/lenta/lista.html" => {
                    self.gate.notified().await;
                    Ok(Some("<p>lenta</p>".into()))
                }
                "views/rapida/lista.html" => Ok(Some("<p>rapida</p>".into())),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn superseded_load_never_overwrites_the_container() {
        let gate = Arc::new(Notify::new());
        let (ctl, store) = controller(Arc::new(GatedSource { gate: gate.clone() })).await;
        let mut rx = store.subscribe();

        let slow = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.load_view("lenta").await }
        });
        rx.wait_for(|s| s.current_view == "lenta").await.unwrap();

        let fast = ctl.load_view("rapida").await;
        gate.notify_one();
        let slow = slow.await.unwrap();

        assert!(!fast.superseded);
        assert!(slow.superseded);
        let snap = store.snapshot();
        assert_eq!(snap.current_view, "rapida");
        assert_eq!(snap.content, "<p>rapida</p>");
    }
}
