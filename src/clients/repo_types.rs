use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::storage::{flexible_id, LifecycleState, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(default, deserialize_with = "flexible_id::deserialize", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub rut: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(rename = "direccion", default)]
    pub address: String,
    #[serde(rename = "estado", default)]
    pub state: LifecycleState,
    #[serde(rename = "fechaCreacion", default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl Record for Client {
    type Id = String;

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    fn set_active(&mut self, active: bool) {
        self.state = if active { LifecycleState::Active } else { LifecycleState::Inactive };
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientPatch {
    pub rut: Option<String>,
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
}

impl ClientPatch {
    pub fn apply(&self, c: &mut Client) {
        for (slot, value) in [
            (&mut c.rut, &self.rut),
            (&mut c.name, &self.nombre),
            (&mut c.email, &self.email),
            (&mut c.phone, &self.telefono),
            (&mut c.address, &self.direccion),
        ] {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
    }
}
