//! Staff directory service
//!
//! Users are keyed by JSHSHIR. "Create" is deliberately an idempotent
//! append: a second create for an existing JSHSHIR merges the requested
//! roles into the existing row instead of failing, trading strict
//! create-must-conflict semantics for upsert-like convenience. This is
//! intentional, not a bug (see DESIGN.md).

use crate::core::identifier;
use crate::domain::{
    DmedError, Jshshir, NewUser, Result, Role, User, UserUpdate,
};
use crate::store::Store;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Staff directory service
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    /// Create a new user service on top of a store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>> {
        tracing::info!("Fetching all users");
        self.store.list_users().await
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn get(&self, id: i64) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| DmedError::not_found("User", id))
    }

    /// Create a user, or merge roles into the existing one
    ///
    /// If the JSHSHIR is unknown, a new row is inserted with a freshly
    /// generated 6-digit password. If it already identifies a user, the
    /// requested roles are unioned into that user's role set and nothing
    /// else changes - in particular, no new password is generated.
    ///
    /// An insert that loses a concurrent race (the store reports the
    /// JSHSHIR as taken after our lookup said otherwise) degrades into the
    /// same merge path.
    pub async fn create_or_merge(&self, fields: NewUser) -> Result<User> {
        tracing::info!(
            full_name = %fields.full_name,
            jshshir = %fields.jshshir,
            "Creating user"
        );
        fields.validate().map_err(DmedError::Validation)?;

        if let Some(existing) = self.store.get_user_by_jshshir(&fields.jshshir).await? {
            tracing::info!(
                jshshir = %fields.jshshir,
                user_id = existing.id,
                "User already exists, adding new roles"
            );
            return self.merge_roles(existing, &fields.roles).await;
        }

        let mut rng = StdRng::from_entropy();
        let password = identifier::generate_password(&mut rng);

        match self.store.insert_user(fields.clone(), password).await {
            Ok(user) => {
                tracing::info!(
                    user_id = user.id,
                    jshshir = %user.jshshir,
                    "User created successfully"
                );
                Ok(user)
            }
            Err(DmedError::AlreadyExists { .. }) => {
                // Another writer created this jshshir between our lookup and
                // the insert; the constraint is authoritative, merge instead.
                let existing = self
                    .store
                    .get_user_by_jshshir(&fields.jshshir)
                    .await?
                    .ok_or_else(|| {
                        DmedError::Database(format!(
                            "User with jshshir={} vanished after insert conflict",
                            fields.jshshir
                        ))
                    })?;
                tracing::warn!(
                    jshshir = %fields.jshshir,
                    user_id = existing.id,
                    "Lost create race, merging roles into existing user"
                );
                self.merge_roles(existing, &fields.roles).await
            }
            Err(e) => Err(e),
        }
    }

    /// Apply a partial update to a user
    ///
    /// Unlike create-or-merge, a `roles` value here replaces the whole set.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist, `AlreadyExists` if a
    /// jshshir change collides with a different user, `Validation` if the
    /// update would leave the user without roles.
    pub async fn update(&self, id: i64, update: UserUpdate) -> Result<User> {
        tracing::info!(user_id = id, "Updating user");

        let user = self.get(id).await?;

        if let Some(ref new_jshshir) = update.jshshir {
            if new_jshshir != &user.jshshir
                && self.store.get_user_by_jshshir(new_jshshir).await?.is_some()
            {
                return Err(DmedError::already_exists(
                    "User",
                    "jshshir",
                    new_jshshir.as_str(),
                ));
            }
        }

        if let Some(ref roles) = update.roles {
            if roles.is_empty() {
                return Err(DmedError::Validation(
                    "roles must not be empty".to_string(),
                ));
            }
        }

        let updated = self.store.update_user(id, update).await?;
        tracing::info!(user_id = id, "User updated successfully");
        Ok(updated)
    }

    /// Delete a user
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        tracing::info!(user_id = id, "Deleting user");
        self.get(id).await?;
        self.store.delete_user(id).await?;
        tracing::info!(user_id = id, "User deleted successfully");
        Ok(())
    }

    /// Verify staff credentials
    ///
    /// Compares the stored password value directly (passwords are stored as
    /// generated - see DESIGN.md). The failure is uniform on purpose: it
    /// never reveals whether the JSHSHIR or the password was wrong.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` on any mismatch.
    pub async fn authenticate(&self, jshshir: &Jshshir, password: &str) -> Result<User> {
        tracing::info!(jshshir = %jshshir, "Login attempt");

        let user = match self.store.get_user_by_jshshir(jshshir).await? {
            Some(user) => user,
            None => {
                tracing::warn!(jshshir = %jshshir, "Login failed: user not found");
                return Err(DmedError::InvalidCredentials);
            }
        };

        if user.password != password {
            tracing::warn!(jshshir = %jshshir, "Login failed: invalid password");
            return Err(DmedError::InvalidCredentials);
        }

        tracing::info!(jshshir = %jshshir, user_id = user.id, "Login successful");
        Ok(user)
    }

    async fn merge_roles(&self, existing: User, new_roles: &BTreeSet<Role>) -> Result<User> {
        let merged: BTreeSet<Role> = existing.roles.union(new_roles).copied().collect();
        let update = UserUpdate {
            roles: Some(merged),
            ..Default::default()
        };
        self.store.update_user(existing.id, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()))
    }

    fn fields(roles: &[Role]) -> NewUser {
        NewUser {
            full_name: "Dilshod Rakhimov".to_string(),
            jshshir: Jshshir::new("12345678901234").unwrap(),
            roles: roles.iter().copied().collect(),
            gender: Gender::Male,
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 2).unwrap(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_create_generates_six_digit_password() {
        let service = service();
        let user = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();
        assert_eq!(user.password.len(), 6);
        assert!(user.password.bytes().all(|b| b.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_create_or_merge_unions_roles() {
        let service = service();
        let first = service
            .create_or_merge(fields(&[Role::Doctor, Role::Nurse]))
            .await
            .unwrap();
        let second = service
            .create_or_merge(fields(&[Role::Nurse, Role::Manager]))
            .await
            .unwrap();

        // One row, merged roles, untouched password.
        assert_eq!(first.id, second.id);
        assert_eq!(
            second.roles,
            [Role::Doctor, Role::Nurse, Role::Manager].into_iter().collect()
        );
        assert_eq!(first.password, second.password);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_or_merge_is_idempotent() {
        let service = service();
        let first = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();
        let second = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.roles, second.roles);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_roles() {
        let service = service();
        let err = service.create_or_merge(fields(&[])).await.unwrap_err();
        assert!(matches!(err, DmedError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_jshshir_collision_fails_and_changes_nothing() {
        let service = service();
        let user_a = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();

        let mut other = fields(&[Role::Nurse]);
        other.full_name = "Gulnora Yusupova".to_string();
        other.jshshir = Jshshir::new("98765432109876").unwrap();
        let user_b = service.create_or_merge(other).await.unwrap();

        let err = service
            .update(
                user_a.id,
                UserUpdate {
                    jshshir: Some(user_b.jshshir.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DmedError::AlreadyExists { field: "jshshir", .. }));

        // Both rows unchanged.
        assert_eq!(service.get(user_a.id).await.unwrap().jshshir, user_a.jshshir);
        assert_eq!(service.get(user_b.id).await.unwrap().jshshir, user_b.jshshir);
    }

    #[tokio::test]
    async fn test_update_replaces_role_set() {
        let service = service();
        let user = service
            .create_or_merge(fields(&[Role::Doctor, Role::Nurse]))
            .await
            .unwrap();

        let updated = service
            .update(
                user.id,
                UserUpdate {
                    roles: Some([Role::Receptionist].into_iter().collect()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.roles, [Role::Receptionist].into_iter().collect());
    }

    #[tokio::test]
    async fn test_update_keeping_own_jshshir_is_allowed() {
        let service = service();
        let user = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();
        let updated = service
            .update(
                user.id,
                UserUpdate {
                    jshshir: Some(user.jshshir.clone()),
                    full_name: Some("Dilshod R. Rakhimov".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Dilshod R. Rakhimov");
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let service = service();
        let err = service.delete(404).await.unwrap_err();
        assert!(matches!(err, DmedError::NotFound { resource: "User", id: 404 }));
    }

    #[tokio::test]
    async fn test_authenticate_accepts_generated_password() {
        let service = service();
        let user = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();
        let logged_in = service
            .authenticate(&user.jshshir, &user.password)
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_authenticate_failure_is_uniform() {
        let service = service();
        let user = service.create_or_merge(fields(&[Role::Doctor])).await.unwrap();

        let wrong_password = service
            .authenticate(&user.jshshir, "000000")
            .await
            .unwrap_err();
        let unknown_user = service
            .authenticate(&Jshshir::new("11111111111111").unwrap(), "000000")
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }
}
