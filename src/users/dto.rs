use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::User;
use crate::storage::LifecycleState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub rut: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

impl From<CreateUserRequest> for User {
    fn from(r: CreateUserRequest) -> Self {
        User {
            first_name: r.nombre,
            last_name: r.apellido,
            rut: r.rut,
            email: r.email,
            username: r.user,
            password: r.pass,
            ..Default::default()
        }
    }
}

/// Named optional fields; absent ones keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub rut: Option<String>,
    pub email: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub habilitar: Option<bool>,
}

impl UserPatch {
    /// Merges everything except the password, which needs encoding first.
    pub fn apply(&self, user: &mut User) {
        if let Some(v) = &self.nombre {
            user.first_name = v.clone();
        }
        if let Some(v) = &self.apellido {
            user.last_name = v.clone();
        }
        if let Some(v) = &self.rut {
            user.rut = v.clone();
        }
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.user {
            user.username = v.clone();
        }
        if let Some(v) = self.habilitar {
            user.enabled = Some(v);
        }
    }

    pub fn new_password(&self) -> Option<&str> {
        self.pass.as_deref().filter(|p| !p.is_empty())
    }
}

/// User as returned to clients, never carrying the password.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Option<String>,
    pub nombre: String,
    pub apellido: String,
    pub rut: String,
    pub email: String,
    pub user: String,
    pub estado: LifecycleState,
    #[serde(rename = "fechaCreacion", with = "time::serde::rfc3339::option")]
    pub fecha_creacion: Option<OffsetDateTime>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            nombre: u.first_name,
            apellido: u.last_name,
            rut: u.rut,
            email: u.email,
            user: u.username,
            estado: u.state,
            fecha_creacion: u.created_at,
        }
    }
}
