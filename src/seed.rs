use time::macros::date;
use tracing::info;

use crate::concepts::{Concept, ConceptKind};
use crate::config::AdminBootstrap;
use crate::employees::{Employee, EmployeeStatus};
use crate::error::ServiceResult;
use crate::settings::{Configuration, SettingsService};
use crate::storage::KvRepository;
use crate::users::{User, UserService};

pub fn sample_employees() -> Vec<Employee> {
    vec![
        Employee {
            id: Some("1".into()),
            rut: "12.345.678-5".into(),
            nombres: "Juan".into(),
            apellidos: "Pérez".into(),
            email: "juan.perez@empresa.com".into(),
            cargo: "Desarrollador".into(),
            fecha_ingreso: Some(date!(2023 - 01 - 15)),
            sueldo_base: 1_500_000.0,
            afp: "Habitat".into(),
            salud: "Fonasa".into(),
            tipo_contrato: "Indefinido".into(),
            estado: EmployeeStatus::Active,
            ..Default::default()
        },
        Employee {
            id: Some("2".into()),
            rut: "18.765.432-7".into(),
            nombres: "María".into(),
            apellidos: "González".into(),
            email: "maria.gonzalez@empresa.com".into(),
            cargo: "Diseñadora UX".into(),
            fecha_ingreso: Some(date!(2023 - 03 - 10)),
            sueldo_base: 1_600_000.0,
            afp: "Modelo".into(),
            salud: "Isapre Banmédica".into(),
            tipo_contrato: "Plazo fijo".into(),
            estado: EmployeeStatus::Active,
            ..Default::default()
        },
    ]
}

pub fn sample_concepts() -> Vec<Concept> {
    let c = |id: &str, codigo: &str, nombre: &str, tipo: ConceptKind, valor: f64| {
        let earning = tipo == ConceptKind::Haber;
        Concept {
            id: Some(id.into()),
            codigo: codigo.into(),
            nombre: nombre.into(),
            tipo,
            imponible: earning,
            tributable: earning,
            valor,
        }
    };
    vec![
        c("1", "HAB001", "Sueldo Base", ConceptKind::Haber, 0.0),
        c("2", "HAB002", "Horas Extras", ConceptKind::Haber, 0.0),
        c("3", "HAB003", "Bono Asistencia", ConceptKind::Haber, 50_000.0),
        c("4", "DES001", "AFP", ConceptKind::Descuento, 0.1),
        c("5", "DES002", "Salud", ConceptKind::Descuento, 0.07),
        c("6", "DES003", "Préstamo", ConceptKind::Descuento, 100_000.0),
    ]
}

/// First-run sample data. Each collection is only written when it has never been set,
/// and the configuration only when no `general` document exists.
pub async fn seed_if_empty(
    employees: &KvRepository<Employee>,
    concepts: &KvRepository<Concept>,
    settings: &SettingsService,
) -> ServiceResult<bool> {
    let mut seeded = false;
    if employees.is_unset().await? {
        employees.replace_all(&sample_employees()).await?;
        seeded = true;
    }
    if concepts.is_unset().await? {
        concepts.replace_all(&sample_concepts()).await?;
        seeded = true;
    }
    if settings.stored().await?.is_none() {
        settings.save(Configuration::default()).await?;
        seeded = true;
    }
    if seeded {
        info!("sample data loaded");
    }
    Ok(seeded)
}

/// Creates the configured administrator while `usuarios` is empty.
pub async fn ensure_admin(users: &UserService, admin: &AdminBootstrap) -> ServiceResult<bool> {
    if !users.list().await?.is_empty() {
        return Ok(false);
    }
    let saved = users
        .save(User {
            first_name: "Administrador".into(),
            last_name: "Sistema".into(),
            rut: admin.rut.clone(),
            email: admin.email.clone(),
            username: "admin".into(),
            password: admin.password.clone(),
            ..Default::default()
        })
        .await?;
    info!(id = ?saved.id, email = %saved.email, "initial administrator created");
    Ok(true)
}
