use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::dto::EmployeePatch;
use super::repo_types::Employee;
use crate::dates::today;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{Record, Repository};
use crate::validation::{first_missing, is_valid_email, is_valid_rut, normalize_rut};

/// Field-level checks; RUT uniqueness is handled by `save` since it only applies on creation.
pub fn check_employee(e: &Employee) -> Result<(), String> {
    let missing = first_missing(&[
        ("rut", Some(e.rut.as_str())),
        ("nombres", Some(e.nombres.as_str())),
        ("apellidos", Some(e.apellidos.as_str())),
    ]);
    if missing.is_some() {
        return Err("Los campos RUT, nombres y apellidos son obligatorios".into());
    }
    if !is_valid_rut(&e.rut) {
        return Err("El RUT ingresado no es válido".into());
    }
    if !e.email.trim().is_empty() && !is_valid_email(e.email.trim()) {
        return Err("El correo electrónico no es válido".into());
    }
    if !e.sueldo_base.is_finite() || e.sueldo_base < 0.0 {
        return Err("El sueldo base no puede ser negativo".into());
    }
    if let (Some(birth), Some(hire)) = (e.fecha_nacimiento, e.fecha_ingreso) {
        if birth > hire {
            return Err("La fecha de nacimiento no puede ser posterior a la fecha de ingreso".into());
        }
    }
    Ok(())
}

pub struct EmployeeService {
    repo: Arc<dyn Repository<Employee>>,
    /// Held from the RUT check to the insert.
    writes: Mutex<()>,
}

impl EmployeeService {
    pub fn new(repo: Arc<dyn Repository<Employee>>) -> Self {
        Self { repo, writes: Mutex::new(()) }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Employee>> {
        Ok(self.repo.get_all().await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Employee> {
        self.repo
            .get_by_id(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Empleado no encontrado"))
    }

    pub async fn validate(&self, e: &Employee, is_update: bool) -> ServiceResult<()> {
        check_employee(e).map_err(ServiceError::Validation)?;
        if !is_update {
            let rut = normalize_rut(&e.rut);
            let taken = self
                .repo
                .get_all()
                .await?
                .iter()
                .any(|other| other.id != e.id && normalize_rut(&other.rut) == rut);
            if taken {
                return Err(ServiceError::validation("Ya existe un empleado con el mismo RUT"));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, employee), fields(rut = %employee.rut))]
    pub async fn save(&self, mut employee: Employee) -> ServiceResult<Employee> {
        employee.id = None;
        employee.upgrade();
        if employee.fecha_ingreso.is_none() {
            employee.fecha_ingreso = Some(today());
        }
        let _writes = self.writes.lock().await;
        self.validate(&employee, false).await?;

        let now = OffsetDateTime::now_utc();
        employee.fecha_creacion = Some(now);
        employee.fecha_actualizacion = Some(now);
        let saved = self.repo.put(employee).await?;
        info!(id = ?saved.id, "employee created");
        Ok(saved)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: EmployeePatch) -> ServiceResult<Employee> {
        let current = self.get(id).await?;
        let mut updated = current.clone();
        patch.apply(&mut updated).map_err(ServiceError::Validation)?;
        self.validate(&updated, true).await?;

        updated.fecha_creacion = current.fecha_creacion.or_else(|| Some(OffsetDateTime::now_utc()));
        updated.fecha_actualizacion = Some(OffsetDateTime::now_utc());
        let saved = self.repo.put(updated).await?;
        info!(id, "employee updated");
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Employee> {
        let e = self
            .repo
            .soft_delete(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Empleado no encontrado"))?;
        info!(id, "employee deactivated");
        Ok(e)
    }

    pub async fn reactivate(&self, id: &str) -> ServiceResult<Employee> {
        let e = self
            .repo
            .reactivate(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Empleado no encontrado"))?;
        info!(id, "employee reactivated");
        Ok(e)
    }

    pub async fn purge(&self, id: &str) -> ServiceResult<()> {
        if !self.repo.hard_delete(&id.to_string()).await? {
            return Err(ServiceError::not_found("Empleado no encontrado"));
        }
        info!(id, "employee purged");
        Ok(())
    }
}
