use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::info;

use super::password::hash_password;
use super::services::{AuthError, AuthResult};
use crate::storage::{flexible_id, Record, Repository};
use crate::validation::{is_valid_email, normalize_email};

pub const MIN_RESET_PASSWORD_LEN: usize = 8;

/// Self-registered account from the sign-up page, stored in `users`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAccount {
    #[serde(default, deserialize_with = "flexible_id::deserialize", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub security_question: String,
    #[serde(default)]
    pub security_answer: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl RegisteredAccount {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        match full.trim() {
            "" => "Usuario".to_string(),
            name => name.to_string(),
        }
    }
}

impl Record for RegisteredAccount {
    type Id = String;

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

pub fn question_text(key: &str) -> &'static str {
    match key {
        "mother_maiden" => "¿Cuál es el apellido de soltera de tu madre?",
        "first_pet" => "¿Cuál fue el nombre de tu primera mascota?",
        "birth_city" => "¿En qué ciudad naciste?",
        _ => "Por favor responde tu pregunta de seguridad",
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub security_question: String,
    #[serde(default)]
    pub security_answer: String,
}

pub struct Accounts {
    repo: Arc<dyn Repository<RegisteredAccount>>,
    /// Held from the duplicate-email check to the insert.
    writes: Mutex<()>,
}

impl Accounts {
    pub fn new(repo: Arc<dyn Repository<RegisteredAccount>>) -> Self {
        Self { repo, writes: Mutex::new(()) }
    }

    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<RegisteredAccount>> {
        let needle = normalize_email(email);
        Ok(self
            .repo
            .get_all()
            .await?
            .into_iter()
            .find(|a| normalize_email(&a.email) == needle))
    }

    async fn require(&self, email: &str) -> AuthResult<RegisteredAccount> {
        if email.trim().is_empty() {
            return Err(AuthError::Validation("Por favor ingresa tu correo electrónico".into()));
        }
        self.find_by_email(email).await?.ok_or_else(|| {
            AuthError::NotFound("No se encontró ninguna cuenta con este correo electrónico".into())
        })
    }

    pub async fn register(&self, r: Registration) -> AuthResult<RegisteredAccount> {
        let fields = [
            r.first_name.trim(),
            r.last_name.trim(),
            r.email.trim(),
            r.password.as_str(),
            r.confirm_password.as_str(),
            r.security_question.as_str(),
            r.security_answer.trim(),
        ];
        if fields.iter().any(|f| f.is_empty()) {
            return Err(AuthError::Validation("Todos los campos son obligatorios".into()));
        }
        if !is_valid_email(r.email.trim()) {
            return Err(AuthError::Validation("El formato del correo electrónico no es válido".into()));
        }
        if r.password != r.confirm_password {
            return Err(AuthError::Validation("Las contraseñas no coinciden".into()));
        }
        let _writes = self.writes.lock().await;
        if self.find_by_email(&r.email).await?.is_some() {
            return Err(AuthError::Validation(
                "Ya existe un usuario con este correo electrónico".into(),
            ));
        }

        let account = RegisteredAccount {
            id: None,
            first_name: r.first_name.trim().to_string(),
            last_name: r.last_name.trim().to_string(),
            email: r.email.trim().to_string(),
            password: hash_password(&r.password).map_err(|e| AuthError::Internal(e.to_string()))?,
            security_question: r.security_question,
            security_answer: r.security_answer.trim().to_string(),
            created_at: Some(OffsetDateTime::now_utc()),
        };
        let saved = self.repo.put(account).await?;
        info!(id = ?saved.id, "account registered");
        Ok(saved)
    }

    pub async fn security_question(&self, email: &str) -> AuthResult<&'static str> {
        let account = self.require(email).await?;
        Ok(question_text(&account.security_question))
    }

    pub async fn verify_answer(&self, email: &str, answer: &str) -> AuthResult<()> {
        let account = self.require(email).await?;
        check_answer(&account, answer)
    }

    pub async fn reset_password(
        &self,
        email: &str,
        answer: &str,
        new_password: &str,
        confirm: &str,
    ) -> AuthResult<()> {
        let mut account = self.require(email).await?;
        check_answer(&account, answer)?;
        if new_password.is_empty() || confirm.is_empty() {
            return Err(AuthError::Validation("Por favor completa todos los campos".into()));
        }
        if new_password != confirm {
            return Err(AuthError::Validation("Las contraseñas no coinciden".into()));
        }
        if new_password.chars().count() < MIN_RESET_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "La contraseña debe tener al menos {MIN_RESET_PASSWORD_LEN} caracteres"
            )));
        }
        account.password = hash_password(new_password).map_err(|e| AuthError::Internal(e.to_string()))?;
        self.repo.put(account).await?;
        info!("account password reset");
        Ok(())
    }

}

fn check_answer(account: &RegisteredAccount, answer: &str) -> AuthResult<()> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(AuthError::Validation("Por favor ingresa tu respuesta".into()));
    }
    if answer.to_lowercase() != account.security_answer.trim().to_lowercase() {
        return Err(AuthError::Validation(
            "La respuesta no es correcta. Por favor intenta de nuevo.".into(),
        ));
    }
    Ok(())
}
