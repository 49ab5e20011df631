use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::storage::{flexible_id, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeStatus {
    #[default]
    #[serde(rename = "Activo", alias = "activo")]
    Active,
    #[serde(rename = "Inactivo", alias = "inactivo")]
    Inactive,
    #[serde(rename = "Licencia", alias = "licencia")]
    OnLeave,
    #[serde(rename = "Suspendido", alias = "suspendido")]
    Suspended,
}

/// A worker on the payroll, stored in the `empleados` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, deserialize_with = "flexible_id::deserialize", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub rut: String,
    #[serde(default)]
    pub nombres: String,
    /// Older records keep the given names here.
    #[serde(rename = "nombre", default, skip_serializing)]
    pub legacy_nombre: Option<String>,
    #[serde(default)]
    pub apellidos: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, with = "crate::dates::iso_date_opt")]
    pub fecha_nacimiento: Option<Date>,
    #[serde(default, with = "crate::dates::iso_date_opt")]
    pub fecha_ingreso: Option<Date>,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub genero: String,
    #[serde(default)]
    pub estado_civil: String,
    #[serde(default)]
    pub nacionalidad: String,
    #[serde(default)]
    pub cargo: String,
    #[serde(default)]
    pub departamento: String,
    #[serde(default)]
    pub tipo_contrato: String,
    #[serde(default)]
    pub sueldo_base: f64,
    #[serde(default)]
    pub afp: String,
    #[serde(default)]
    pub salud: String,
    #[serde(default)]
    pub estado: EmployeeStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub fecha_creacion: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub fecha_actualizacion: Option<OffsetDateTime>,
}

impl Record for Employee {
    type Id = String;

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Leave and suspension still count as on the payroll.
    fn is_active(&self) -> bool {
        self.estado != EmployeeStatus::Inactive
    }

    fn set_active(&mut self, active: bool) {
        self.estado = if active { EmployeeStatus::Active } else { EmployeeStatus::Inactive };
    }

    fn upgrade(&mut self) {
        if let Some(nombre) = self.legacy_nombre.take() {
            if self.nombres.trim().is_empty() {
                self.nombres = nombre;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn reads_form_shaped_json() {
        let raw = r#"{
            "id": 1,
            "rut": "12.345.678-5",
            "nombres": "Juan",
            "apellidos": "Pérez",
            "fechaNacimiento": "",
            "fechaIngreso": "2023-01-15",
            "sueldoBase": 1500000,
            "tipoContrato": "Indefinido",
            "estado": "licencia"
        }"#;
        let e: Employee = serde_json::from_str(raw).unwrap();
        assert_eq!(e.id.as_deref(), Some("1"));
        assert_eq!(e.fecha_nacimiento, None);
        assert_eq!(e.fecha_ingreso, Some(date!(2023 - 01 - 15)));
        assert_eq!(e.sueldo_base, 1_500_000.0);
        assert_eq!(e.estado, EmployeeStatus::OnLeave);
        assert!(e.is_active());

        let back = serde_json::to_value(&e).unwrap();
        assert_eq!(back["fechaIngreso"], "2023-01-15");
        assert_eq!(back["tipoContrato"], "Indefinido");
        assert_eq!(back["estado"], "Licencia");
    }

    #[test]
    fn record_with_both_name_keys_still_reads() {
        let mut e: Employee =
            serde_json::from_str(r#"{"nombres": "Juan", "nombre": "J."}"#).unwrap();
        e.upgrade();
        assert_eq!(e.nombres, "Juan");

        let mut old: Employee = serde_json::from_str(r#"{"nombre": "Juan"}"#).unwrap();
        old.upgrade();
        assert_eq!(old.nombres, "Juan");
        assert!(serde_json::to_value(&old).unwrap().get("nombre").is_none());
    }
}
