use std::sync::Arc;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::accounts::Accounts;
use super::password::verify_password;
use super::session::{Session, SessionStore};
use crate::storage::{Repository, StorageError};
use crate::users::User;
use crate::validation::{is_valid_email, normalize_email};

pub const INVALID_CREDENTIALS: &str = "Usuario o contraseña incorrectos";
pub const ACCOUNT_DISABLED: &str =
    "Esta cuenta está deshabilitada. Por favor, contacte al administrador.";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Usuario o contraseña incorrectos")]
    InvalidCredentials,
    #[error("Esta cuenta está deshabilitada. Por favor, contacte al administrador.")]
    Disabled,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn reject(self) -> (StatusCode, String) {
        match self {
            AuthError::Validation(m) => (StatusCode::BAD_REQUEST, m),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.into()),
            AuthError::Disabled => (StatusCode::FORBIDDEN, ACCOUNT_DISABLED.into()),
            AuthError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            AuthError::Storage(e) => {
                error!(error = %e, "auth storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor".into())
            }
            AuthError::Internal(e) => {
                error!(error = %e, "auth internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor".into())
            }
        }
    }
}

/// Administrators live in `usuarios`; self-registered accounts in `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Account,
}

/// Who signed in, as needed for the access token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

pub struct AuthFlow {
    users: Arc<dyn Repository<User>>,
    accounts: Arc<Accounts>,
    session: SessionStore,
}

impl AuthFlow {
    pub fn new(users: Arc<dyn Repository<User>>, accounts: Arc<Accounts>, session: SessionStore) -> Self {
        Self { users, accounts, session }
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    /// Administrators in `usuarios` are matched first, then self-registered accounts.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str, remember: bool) -> AuthResult<(Identity, Session)> {
        if email.trim().is_empty() {
            return Err(AuthError::Validation("El correo electrónico es requerido".into()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("La contraseña es requerida".into()));
        }
        let needle = normalize_email(email);
        if !is_valid_email(&needle) {
            return Err(AuthError::Validation(
                "El formato del correo electrónico no es válido".into(),
            ));
        }

        let admin = self
            .users
            .get_all()
            .await?
            .into_iter()
            .find(|u| !u.email.is_empty() && normalize_email(&u.email) == needle);

        let identity = match admin {
            Some(user) => {
                if user.is_disabled() {
                    warn!(email = %needle, "login attempt on disabled account");
                    return Err(AuthError::Disabled);
                }
                if !verify_password(password, &user.password) {
                    warn!(email = %needle, "login invalid password");
                    return Err(AuthError::InvalidCredentials);
                }
                Identity {
                    id: user.id.clone().unwrap_or_default(),
                    email: user.email.clone(),
                    name: user.display_name(),
                    role: Role::Admin,
                }
            }
            None => match self.accounts.find_by_email(&needle).await? {
                Some(account) if verify_password(password, &account.password) => Identity {
                    id: account.id.clone().unwrap_or_default(),
                    email: account.email.clone(),
                    name: account.display_name(),
                    role: Role::Account,
                },
                Some(_) => {
                    warn!(email = %needle, "login invalid password");
                    return Err(AuthError::InvalidCredentials);
                }
                None => {
                    warn!(email = %needle, "login unknown email");
                    return Err(AuthError::InvalidCredentials);
                }
            },
        };

        let session = self.session.begin(&identity.email, &identity.name, remember).await?;
        info!(email = %identity.email, role = ?identity.role, "user logged in");
        Ok((identity, session))
    }

    pub async fn logout(&self, sid: &str) -> AuthResult<()> {
        self.session.clear(sid).await?;
        info!("user logged out");
        Ok(())
    }

    pub async fn check_session(&self, sid: &str) -> AuthResult<bool> {
        Ok(self.session.check(sid).await?)
    }

    pub async fn current_session(&self, sid: &str) -> AuthResult<Option<Session>> {
        Ok(self.session.current(sid).await?)
    }
}
