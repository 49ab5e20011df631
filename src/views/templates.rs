use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

pub const LANDING_VIEW: &str = "inicio";

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("nombre de vista no permitido: {0}")]
    InvalidName(String),
    #[error("error al leer {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("la vista está vacía: {0}")]
    Empty(String),
    #[error("no se encontró la vista {0} en ninguna de las ubicaciones probadas")]
    NotFound(String),
    #[error("no se pudo inicializar la vista {view}: {reason}")]
    Initializer { view: String, reason: String },
}

/// Where view markup comes from. `Ok(None)` means "not there", anything else that fails is an error.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Option<String>, ViewError>;
}

/// Templates served from `<public>/remus/views/...`.
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self { root: public_dir.into().join("remus") }
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn fetch(&self, path: &str) -> Result<Option<String>, ViewError> {
        let full = self.root.join(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(body) => {
                debug!(path, bytes = body.len(), "template read");
                Ok(Some(body))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ViewError::Io { path: path.to_string(), source }),
        }
    }
}

/// Candidate template paths, most specific first.
pub fn candidate_paths(name: &str) -> [String; 2] {
    [format!("views/{name}/lista.html"), format!("views/{name}.html")]
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn landing_html() -> &'static str {
    r#"<div class="welcome-message">
  <h2>Bienvenido al Módulo de Remuneraciones</h2>
  <p class="lead">Seleccione una opción del menú para comenzar.</p>
  <div class="row mt-4">
    <div class="col-md-4 mb-4"><div class="card h-100 shadow-sm"><div class="card-body text-center">
      <h5 class="card-title">Empleados</h5>
      <p class="card-text text-muted">Gestione la información de los empleados y sus contratos.</p>
      <button class="btn btn-outline-primary btn-sm" data-view="empleados">Ver Empleados</button>
    </div></div></div>
    <div class="col-md-4 mb-4"><div class="card h-100 shadow-sm"><div class="card-body text-center">
      <h5 class="card-title">Liquidaciones</h5>
      <p class="card-text text-muted">Genere y gestione las liquidaciones de sueldos.</p>
      <button class="btn btn-outline-success btn-sm" data-view="liquidaciones">Ver Liquidaciones</button>
    </div></div></div>
    <div class="col-md-4 mb-4"><div class="card h-100 shadow-sm"><div class="card-body text-center">
      <h5 class="card-title">Reportes</h5>
      <p class="card-text text-muted">Genere reportes y estadísticas de sueldos.</p>
      <button class="btn btn-outline-info btn-sm" data-view="reportes">Ver Reportes</button>
    </div></div></div>
  </div>
</div>"#
}

pub fn loading_html(name: &str) -> String {
    format!(
        r#"<div class="d-flex justify-content-center align-items-center" style="height: 300px;">
  <div class="spinner-border text-primary" role="status"><span class="visually-hidden">Cargando...</span></div>
  <span class="ms-3">Cargando {}...</span>
</div>"#,
        escape_html(name)
    )
}

pub fn error_panel_html(name: &str, detail: Option<&str>) -> String {
    let detail = detail
        .map(|d| {
            format!(
                r#"<div class="alert alert-warning mt-3"><strong>Detalles del error:</strong><br><code>{}</code></div>"#,
                escape_html(d)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<div class="container mt-5">
  <div class="alert alert-danger">
    <h4>Error al cargar la vista</h4>
    <p>No se pudo cargar la vista solicitada: <strong>{}</strong>.</p>
    <p>Por favor, verifique que la vista exista o contacte al administrador del sistema.</p>
    {detail}
    <div class="mt-3"><button class="btn btn-primary" data-view="{LANDING_VIEW}">Volver al inicio</button></div>
  </div>
</div>"#,
        escape_html(name)
    )
}
