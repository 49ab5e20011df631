use serde::{Deserialize, Serialize};
use time::{macros::date, Date, OffsetDateTime};

pub const GENERAL: &str = "general";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default)]
    pub rut: String,
    #[serde(rename = "direccion", default)]
    pub address: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "actividad", default)]
    pub activity: String,
    #[serde(rename = "fechaInicioActividades", default, with = "crate::dates::iso_date_opt")]
    pub activity_start: Option<Date>,
}

/// Statutory contribution rates and currency unit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatutoryParameters {
    pub afp: f64,
    pub salud: f64,
    pub seguro_cesantia: f64,
    pub tope_afp: f64,
    pub uf: f64,
    pub utm: f64,
    pub sueldo_minimo: f64,
}

impl Default for StatutoryParameters {
    fn default() -> Self {
        Self {
            afp: 0.1,
            salud: 0.07,
            seguro_cesantia: 0.03,
            tope_afp: 85.0,
            uf: 35_000.0,
            utm: 65_000.0,
            sueldo_minimo: 500_000.0,
        }
    }
}

/// The singleton configuration document, keyed by `tipo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "general_type")]
    pub tipo: String,
    #[serde(rename = "empresa")]
    pub company: CompanyProfile,
    #[serde(rename = "parametros", default)]
    pub parameters: StatutoryParameters,
    #[serde(rename = "actualizado", default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

fn general_type() -> String {
    GENERAL.to_string()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            tipo: general_type(),
            company: CompanyProfile {
                name: "Mi Empresa S.A.".into(),
                rut: "76.543.210-3".into(),
                address: "Av. Principal 1234, Santiago".into(),
                phone: "+56 2 2345 6789".into(),
                email: "contacto@miempresa.cl".into(),
                activity: "Desarrollo de Software".into(),
                activity_start: Some(date!(2020 - 01 - 01)),
            },
            parameters: StatutoryParameters::default(),
            updated_at: None,
        }
    }
}
