use serde::Deserialize;

use super::repo_types::{Employee, EmployeeStatus};
use crate::dates::parse_date_field;

/// Partial employee update; absent fields keep their stored value, blank dates clear,
/// unreadable dates are refused.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    pub rut: Option<String>,
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
    pub email: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub fecha_ingreso: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub genero: Option<String>,
    pub estado_civil: Option<String>,
    pub nacionalidad: Option<String>,
    pub cargo: Option<String>,
    pub departamento: Option<String>,
    pub tipo_contrato: Option<String>,
    pub sueldo_base: Option<f64>,
    pub afp: Option<String>,
    pub salud: Option<String>,
    pub estado: Option<EmployeeStatus>,
}

fn merge(slot: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

impl EmployeePatch {
    pub fn apply(&self, e: &mut Employee) -> Result<(), String> {
        merge(&mut e.rut, &self.rut);
        merge(&mut e.nombres, &self.nombres);
        merge(&mut e.apellidos, &self.apellidos);
        merge(&mut e.email, &self.email);
        merge(&mut e.direccion, &self.direccion);
        merge(&mut e.telefono, &self.telefono);
        merge(&mut e.genero, &self.genero);
        merge(&mut e.estado_civil, &self.estado_civil);
        merge(&mut e.nacionalidad, &self.nacionalidad);
        merge(&mut e.cargo, &self.cargo);
        merge(&mut e.departamento, &self.departamento);
        merge(&mut e.tipo_contrato, &self.tipo_contrato);
        merge(&mut e.afp, &self.afp);
        merge(&mut e.salud, &self.salud);
        if let Some(raw) = &self.fecha_nacimiento {
            e.fecha_nacimiento = parse_date_field("fechaNacimiento", raw)?;
        }
        if let Some(raw) = &self.fecha_ingreso {
            e.fecha_ingreso = parse_date_field("fechaIngreso", raw)?;
        }
        if let Some(v) = self.sueldo_base {
            e.sueldo_base = v;
        }
        if let Some(v) = self.estado {
            e.estado = v;
        }
        Ok(())
    }
}
