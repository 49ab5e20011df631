use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::auth::accounts::{Accounts, RegisteredAccount};
use crate::auth::session::SessionStore;
use crate::auth::AuthFlow;
use crate::clients::{Client, ClientService};
use crate::concepts::{Concept, ConceptService};
use crate::config::AppConfig;
use crate::db;
use crate::employees::{Employee, EmployeeService};
use crate::payslips::PayslipService;
use crate::seed::{ensure_admin, seed_if_empty};
use crate::settings::SettingsService;
use crate::storage::{
    collections, FileKv, IdGenerator, KvRepository, KvStore, SqliteDocuments,
};
use crate::users::{User, UserService};
use crate::views::templates::TemplateSource;
use crate::views::{FsTemplateSource, ViewServices, ViewSessions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pg: PgPool,
    pub users: Arc<UserService>,
    pub employees: Arc<EmployeeService>,
    pub clients: Arc<ClientService>,
    pub payslips: Arc<PayslipService>,
    pub concepts: Arc<ConceptService>,
    pub settings: Arc<SettingsService>,
    pub auth: Arc<AuthFlow>,
    pub views: Arc<ViewSessions>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pg = db::connect(&config.db).await?;
        let kv: Arc<dyn KvStore> = Arc::new(FileKv::open(&config.data_dir).await?);
        let docs = SqliteDocuments::open(&config.payroll_db_url).await?;
        let templates = Arc::new(FsTemplateSource::new(&config.public_dir));
        Self::assemble(config, pg, kv, docs, templates, true).await
    }

    /// Wires every service over the given stores, seeding sample data when asked and empty.
    pub async fn assemble(
        config: Arc<AppConfig>,
        pg: PgPool,
        kv: Arc<dyn KvStore>,
        docs: SqliteDocuments,
        templates: Arc<dyn TemplateSource>,
        seed: bool,
    ) -> anyhow::Result<Self> {
        let ids = Arc::new(IdGenerator::default());
        let user_repo = Arc::new(KvRepository::<User>::new(kv.clone(), collections::USUARIOS, ids.clone()));
        let account_repo = Arc::new(KvRepository::<RegisteredAccount>::new(
            kv.clone(),
            collections::USERS,
            ids.clone(),
        ));
        let client_repo = Arc::new(KvRepository::<Client>::new(kv.clone(), collections::CLIENTES, ids.clone()));
        let employee_repo = Arc::new(KvRepository::<Employee>::new(
            kv.clone(),
            collections::EMPLEADOS,
            ids.clone(),
        ));
        let concept_repo = Arc::new(KvRepository::<Concept>::new(kv.clone(), collections::CONCEPTOS, ids));

        let settings = Arc::new(SettingsService::new(docs.config()));
        if seed && seed_if_empty(&employee_repo, &concept_repo, &settings).await? {
            info!("empty stores seeded with sample data");
        }

        let employees = Arc::new(EmployeeService::new(employee_repo.clone()));
        let payslips = Arc::new(PayslipService::new(docs.payslips(), employee_repo));
        let concepts = Arc::new(ConceptService::new(concept_repo));
        let session = SessionStore::new(kv, config.session_guard_disabled);
        let auth = Arc::new(AuthFlow::new(
            user_repo.clone(),
            Arc::new(Accounts::new(account_repo)),
            session,
        ));

        let views = Arc::new(ViewSessions::new(
            templates,
            ViewServices {
                employees: employees.clone(),
                payslips: payslips.clone(),
                concepts: concepts.clone(),
                settings: settings.clone(),
            },
        ));

        let users = Arc::new(UserService::new(user_repo));
        if let Some(admin) = &config.admin {
            ensure_admin(&users, admin).await?;
        }

        Ok(Self {
            config,
            pg,
            users,
            employees,
            clients: Arc::new(ClientService::new(client_repo)),
            payslips,
            concepts,
            settings,
            auth,
            views,
        })
    }

    /// In-memory stores and a PostgreSQL pool that never connects unless queried.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::{AdminBootstrap, DbConfig, JwtConfig};
        use crate::storage::MemoryKv;

        let config = Arc::new(AppConfig {
            db: DbConfig {
                host: "localhost".into(),
                port: 5432,
                user: "postgres".into(),
                password: "postgres".into(),
                name: "postgres".into(),
            },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            admin: Some(AdminBootstrap {
                email: "admin@empresa.cl".into(),
                password: "admin-clave".into(),
                rut: "11.111.111-1".into(),
            }),
            data_dir: "./data".into(),
            payroll_db_url: "sqlite::memory:".into(),
            public_dir: "./public".into(),
            session_guard_disabled: false,
            host: "127.0.0.1".into(),
            port: 0,
        });
        let pg = sqlx::postgres::PgPoolOptions::new().connect_lazy_with(db::connect_options(&config.db));
        let docs = SqliteDocuments::in_memory().await.expect("in-memory sqlite");
        let templates = Arc::new(FsTemplateSource::new(&config.public_dir));
        Self::assemble(config, pg, Arc::new(MemoryKv::new()), docs, templates, true)
            .await
            .expect("fake state")
    }
}
