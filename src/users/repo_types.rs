use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::storage::{flexible_id, LifecycleState, Record};

/// Administrator account stored in the `usuarios` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "flexible_id::deserialize", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "nombre", default)]
    pub first_name: String,
    #[serde(rename = "apellido", default)]
    pub last_name: String,
    #[serde(default)]
    pub rut: String,
    #[serde(default)]
    pub email: String,
    /// Older records keep the email here.
    #[serde(rename = "correo", default, skip_serializing)]
    pub legacy_email: Option<String>,
    #[serde(rename = "user", default)]
    pub username: String,
    /// Encoded password; plaintext only while a save is in flight.
    #[serde(rename = "pass", default)]
    pub password: String,
    #[serde(rename = "contrasena", default, skip_serializing)]
    pub legacy_password: Option<String>,
    #[serde(rename = "estado", default)]
    pub state: LifecycleState,
    #[serde(rename = "habilitar", default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "fechaCreacion", default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            "Usuario".to_string()
        } else {
            full.to_string()
        }
    }

    /// Explicitly disabled accounts and Inactive ones cannot sign in.
    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false) || self.state == LifecycleState::Inactive
    }
}

impl Record for User {
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

    /// `email || correo`, `pass || contrasena`.
    fn upgrade(&mut self) {
        if let Some(correo) = self.legacy_email.take() {
            if self.email.trim().is_empty() {
                self.email = correo;
            }
        }
        if let Some(contrasena) = self.legacy_password.take() {
            if self.password.is_empty() {
                self.password = contrasena;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_fields_win_over_legacy_ones() {
        let mut both: User = serde_json::from_str(
            r#"{"email": "luis@e.cl", "correo": "viejo@e.cl", "pass": "p1", "contrasena": "p0"}"#,
        )
        .unwrap();
        both.upgrade();
        assert_eq!(both.email, "luis@e.cl");
        assert_eq!(both.password, "p1");

        let mut legacy: User =
            serde_json::from_str(r#"{"correo": "viejo@e.cl", "contrasena": "p0"}"#).unwrap();
        legacy.upgrade();
        assert_eq!(legacy.email, "viejo@e.cl");
        assert_eq!(legacy.password, "p0");

        let written = serde_json::to_value(&legacy).unwrap();
        assert_eq!(written["email"], "viejo@e.cl");
        assert!(written.get("correo").is_none());
    }
}
