use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::dto::UserPatch;
use super::repo_types::User;
use crate::auth::password::hash_password;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{Record, Repository};
use crate::validation::{first_missing, is_valid_email, is_valid_rut, normalize_email, normalize_rut};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Field checks plus uniqueness against the other Active users.
pub fn check_user(user: &User, is_update: bool, existing: &[User]) -> Result<(), String> {
    let mut required = vec![
        ("nombre", Some(user.first_name.as_str())),
        ("apellido", Some(user.last_name.as_str())),
        ("rut", Some(user.rut.as_str())),
        ("email", Some(user.email.as_str())),
        ("user", Some(user.username.as_str())),
    ];
    if !is_update {
        required.push(("pass", Some(user.password.as_str())));
    }
    if first_missing(&required).is_some() {
        return Err("Todos los campos son obligatorios".into());
    }
    if !is_valid_rut(&user.rut) {
        return Err("El RUT ingresado no es válido".into());
    }
    if !is_valid_email(user.email.trim()) {
        return Err("El correo electrónico no es válido".into());
    }
    if !is_update && user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
        ));
    }

    let rut = normalize_rut(&user.rut);
    let email = normalize_email(&user.email);
    let clash = existing.iter().any(|u| {
        u.id != user.id
            && u.is_active()
            && (normalize_rut(&u.rut) == rut
                || normalize_email(&u.email) == email
                || u.username == user.username)
    });
    if clash {
        return Err("Ya existe un usuario con el mismo RUT, correo o nombre de usuario".into());
    }
    Ok(())
}

pub struct UserService {
    repo: Arc<dyn Repository<User>>,
    /// Held from the uniqueness check to the write.
    writes: Mutex<()>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository<User>>) -> Self {
        Self { repo, writes: Mutex::new(()) }
    }

    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.get_all().await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<User> {
        self.repo
            .get_by_id(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Usuario no encontrado"))
    }

    /// Looks a user up by email, ignoring case and surrounding blanks.
    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let needle = normalize_email(email);
        Ok(self
            .repo
            .get_all()
            .await?
            .into_iter()
            .find(|u| !u.email.is_empty() && normalize_email(&u.email) == needle))
    }

    pub async fn validate(&self, user: &User, is_update: bool) -> ServiceResult<()> {
        let existing = self.repo.get_all().await?;
        check_user(user, is_update, &existing).map_err(ServiceError::Validation)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn save(&self, mut user: User) -> ServiceResult<User> {
        user.id = None;
        user.enabled = None;
        let _writes = self.writes.lock().await;
        self.validate(&user, false).await?;

        user.created_at = Some(OffsetDateTime::now_utc());
        user.set_active(true);
        user.password = hash_password(&user.password).map_err(|e| {
            warn!(error = %e, "password hashing failed");
            ServiceError::validation("No se pudo procesar la contraseña")
        })?;

        let saved = self.repo.put(user).await?;
        info!(id = ?saved.id, "user created");
        Ok(saved)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: UserPatch) -> ServiceResult<User> {
        let _writes = self.writes.lock().await;
        let current = self.get(id).await?;
        let mut updated = current.clone();
        patch.apply(&mut updated);
        self.validate(&updated, true).await?;

        if let Some(pass) = patch.new_password() {
            if pass.chars().count() < MIN_PASSWORD_LEN {
                return Err(ServiceError::validation(format!(
                    "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
                )));
            }
            updated.password = hash_password(pass)
                .map_err(|_| ServiceError::validation("No se pudo procesar la contraseña"))?;
        } else {
            updated.password = current.password;
        }

        let saved = self.repo.put(updated).await?;
        info!(id, "user updated");
        Ok(saved)
    }

    /// Soft delete: the record stays, flagged Inactive.
    pub async fn delete(&self, id: &str) -> ServiceResult<User> {
        let user = self
            .repo
            .soft_delete(&id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Usuario no encontrado"))?;
        info!(id, "user deactivated");
        Ok(user)
    }

    /// Brings an Inactive user back, unless an Active one took its RUT, email or username meanwhile.
    pub async fn reactivate(&self, id: &str) -> ServiceResult<User> {
        let _writes = self.writes.lock().await;
        let mut user = self.get(id).await?;
        user.set_active(true);
        self.validate(&user, true).await?;
        let saved = self.repo.put(user).await?;
        info!(id, "user reactivated");
        Ok(saved)
    }

    pub async fn purge(&self, id: &str) -> ServiceResult<()> {
        if !self.repo.hard_delete(&id.to_string()).await? {
            return Err(ServiceError::not_found("Usuario no encontrado"));
        }
        info!(id, "user purged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::storage::{collections, IdGenerator, KvRepository, KvStore, LifecycleState, MemoryKv};

    fn service() -> UserService {
        let repo = KvRepository::<User>::new(
            Arc::new(MemoryKv::new()),
            collections::USUARIOS,
            Arc::new(IdGenerator::default()),
        );
        UserService::new(Arc::new(repo))
    }

    fn new_user(rut: &str, email: &str, username: &str) -> User {
        User {
            first_name: "Ana".into(),
            last_name: "Rojas".into(),
            rut: rut.into(),
            email: email.into(),
            username: username.into(),
            password: "secreto1".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn save_assigns_id_state_and_hash() {
        let svc = service();
        let saved = svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        assert!(saved.id.is_some());
        assert!(saved.created_at.is_some());
        assert_eq!(saved.state, LifecycleState::Active);
        assert_ne!(saved.password, "secreto1");
        assert!(verify_password("secreto1", &saved.password));
    }

    #[tokio::test]
    async fn save_rejects_invalid_fields() {
        let svc = service();
        let mut missing = new_user("12345678-5", "ana@empresa.cl", "ana");
        missing.last_name = " ".into();
        let err = svc.save(missing).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("obligatorios")));

        let err = svc.save(new_user("12345678-9", "ana@empresa.cl", "ana")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("RUT")));

        let err = svc.save(new_user("12345678-5", "ana-at-empresa", "ana")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("correo")));

        let mut short = new_user("12345678-5", "ana@empresa.cl", "ana");
        short.password = "12345".into();
        let err = svc.save(short).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("6")));
    }

    #[tokio::test]
    async fn active_users_never_share_rut_email_or_username() {
        let svc = service();
        svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();

        for dup in [
            new_user("12.345.678-5", "otra@empresa.cl", "otra"),
            new_user("18765432-7", "ANA@empresa.cl", "otra"),
            new_user("18765432-7", "otra@empresa.cl", "ana"),
        ] {
            let err = svc.save(dup).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(m) if m.starts_with("Ya existe")));
        }
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_users_are_excluded_from_uniqueness() {
        let svc = service();
        let first = svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        let first_id = first.id.clone().unwrap();
        svc.delete(&first_id).await.unwrap();

        let second = svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        assert_ne!(second.id, first.id);

        // bringing the first back would now duplicate an Active user
        let err = svc.reactivate(&first_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_merges_patch_and_keeps_password() {
        let svc = service();
        let saved = svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        let id = saved.id.clone().unwrap();

        let patch = UserPatch { apellido: Some("Soto".into()), ..Default::default() };
        svc.update(&id, patch).await.unwrap();

        let reloaded = svc.get(&id).await.unwrap();
        assert_eq!(reloaded.last_name, "Soto");
        assert_eq!(reloaded.first_name, "Ana");
        assert_eq!(reloaded.email, "ana@empresa.cl");
        assert_eq!(reloaded.password, saved.password);
        assert_eq!(reloaded.created_at, saved.created_at);
    }

    #[tokio::test]
    async fn update_reencodes_new_password() {
        let svc = service();
        let saved = svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        let id = saved.id.unwrap();
        let patch = UserPatch { pass: Some("nuevaClave".into()), ..Default::default() };
        let updated = svc.update(&id, patch).await.unwrap();
        assert!(verify_password("nuevaClave", &updated.password));
        assert!(!verify_password("secreto1", &updated.password));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let svc = service();
        let err = svc.update("nope", UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn soft_delete_reactivate_and_purge() {
        let svc = service();
        let saved = svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        let id = saved.id.unwrap();

        svc.delete(&id).await.unwrap();
        assert_eq!(svc.get(&id).await.unwrap().state, LifecycleState::Inactive);

        svc.reactivate(&id).await.unwrap();
        assert_eq!(svc.get(&id).await.unwrap().state, LifecycleState::Active);

        svc.purge(&id).await.unwrap();
        assert!(matches!(svc.get(&id).await.unwrap_err(), ServiceError::NotFound(_)));
        assert!(matches!(svc.purge(&id).await.unwrap_err(), ServiceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_never_duplicate_an_active_rut() {
        for _ in 0..10 {
            let svc = Arc::new(service());
            let tasks: Vec<_> = (0..8)
                .map(|i| {
                    let svc = svc.clone();
                    tokio::spawn(async move {
                        svc.save(new_user("12345678-5", &format!("u{i}@empresa.cl"), &format!("u{i}")))
                            .await
                    })
                })
                .collect();
            for t in tasks {
                let _ = t.await.unwrap();
            }
            let active = svc
                .list()
                .await
                .unwrap()
                .into_iter()
                .filter(|u| u.is_active() && normalize_rut(&u.rut) == "123456785")
                .count();
            assert_eq!(active, 1);
        }
    }

    #[tokio::test]
    async fn legacy_record_with_both_email_keys_survives_a_save() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        kv.set_item(
            collections::USUARIOS,
            r#"[{"id":"1","nombre":"Luis","apellido":"Mora","rut":"18765432-7","email":"luis@e.cl","correo":"luis@e.cl","user":"luis","pass":"x"}]"#,
        )
        .await
        .unwrap();
        let repo = KvRepository::<User>::new(kv, collections::USUARIOS, Arc::new(IdGenerator::default()));
        let svc = UserService::new(Arc::new(repo));
        assert_eq!(svc.list().await.unwrap().len(), 1);

        svc.save(new_user("12345678-5", "ana@empresa.cl", "ana")).await.unwrap();
        let all = svc.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|u| u.email == "luis@e.cl"));

        let dup = svc.save(new_user("11111111-1", "LUIS@e.cl", "otro")).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn find_by_email_ignores_case() {
        let svc = service();
        svc.save(new_user("12345678-5", "Ana@Empresa.cl", "ana")).await.unwrap();
        assert!(svc.find_by_email("  ana@empresa.CL ").await.unwrap().is_some());
        assert!(svc.find_by_email("otro@empresa.cl").await.unwrap().is_none());
    }
}
