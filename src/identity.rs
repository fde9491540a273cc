// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mapping verified identities to local accounts.

use crate::auth::{AuthenticatedUser, ClerkDirectory, DirectoryError, Role};
use crate::storage::audit::record;
use crate::storage::{AccountRepository, AuditEvent, AuditEventType, Database, StoreError, StoredAccount};

const DEFAULT_NAME: &str = "New User";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no email address is known for this identity")]
    MissingEmail,

    #[error("role {0} cannot be self-assigned")]
    RoleNotPermitted(Role),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub account: StoredAccount,
    /// The account was created by this call
    pub created: bool,
}

pub struct IdentitySync<'a> {
    db: &'a Database,
    directory: Option<&'a ClerkDirectory>,
}

impl<'a> IdentitySync<'a> {
    pub fn new(db: &'a Database, directory: Option<&'a ClerkDirectory>) -> Self {
        Self { db, directory }
    }

    /// Find or create the account for `user`.
    ///
    /// Existing accounts are returned untouched; `declared_role` only applies
    /// on creation.
    pub async fn sync(
        &self,
        user: &AuthenticatedUser,
        declared_role: Option<Role>,
    ) -> Result<SyncOutcome, IdentityError> {
        let accounts = AccountRepository::new(self.db);
        if let Some(account) = accounts.find_by_external_id(&user.user_id)? {
            return Ok(SyncOutcome { account, created: false });
        }

        let role = declared_role.unwrap_or_default();
        if role == Role::Admin && !user.provider_is_admin() {
            tracing::warn!(
                security_event = true,
                external_id = %user.user_id,
                "Refused self-assigned admin role"
            );
            return Err(IdentityError::RoleNotPermitted(role));
        }

        let (email, name) = self.profile(user).await?;
        let account = StoredAccount::new(&user.user_id, email, name, role);

        match accounts.create(&account) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(what)) => {
                // Lost a race with a concurrent sync of the same identity
                if let Some(existing) = accounts.find_by_external_id(&user.user_id)? {
                    return Ok(SyncOutcome { account: existing, created: false });
                }
                return Err(StoreError::AlreadyExists(what).into());
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            account_id = %account.id,
            external_id = %account.external_id,
            role = %account.role,
            "Account created"
        );
        record(
            self.db,
            AuditEvent::new(AuditEventType::AccountCreated)
                .with_actor(&account.id)
                .with_resource("account", &account.id)
                .with_details(serde_json::json!({ "role": account.role })),
        );

        Ok(SyncOutcome { account, created: true })
    }

    async fn profile(&self, user: &AuthenticatedUser) -> Result<(String, String), IdentityError> {
        let mut email = user.email.clone();
        let mut name = user.name.clone();

        if email.is_none() {
            if let Some(directory) = self.directory {
                let profile = directory.fetch_profile(&user.user_id).await?;
                email = profile.email;
                name = name.or(profile.name);
            }
        }

        let email = email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or(IdentityError::MissingEmail)?;
        let name = name.unwrap_or_else(|| DEFAULT_NAME.to_string());
        Ok((email, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;

    fn identity(sub: &str, email: &str) -> AuthenticatedUser {
        let mut user = AuthenticatedUser::with_subject(sub);
        user.email = Some(email.to_string());
        user
    }

    #[tokio::test]
    async fn creates_student_by_default() {
        let (db, _dir) = temp_db();
        let outcome = IdentitySync::new(&db, None)
            .sync(&identity("user_1", "a@example.com"), None)
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.account.role, Role::Student);
        assert_eq!(outcome.account.name, DEFAULT_NAME);
        assert_eq!(outcome.account.external_id, "user_1");
    }

    #[tokio::test]
    async fn sync_is_idempotent_and_ignores_later_role() {
        let (db, _dir) = temp_db();
        let sync = IdentitySync::new(&db, None);
        let user = identity("user_1", "a@example.com");

        let first = sync.sync(&user, Some(Role::Teacher)).await.unwrap();
        let second = sync.sync(&user, Some(Role::Student)).await.unwrap();

        assert!(!second.created);
        assert_eq!(second.account.id, first.account.id);
        assert_eq!(second.account.role, Role::Teacher);
        assert_eq!(AccountRepository::new(&db).list_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_requires_provider_assertion() {
        let (db, _dir) = temp_db();
        let sync = IdentitySync::new(&db, None);

        let user = identity("user_1", "a@example.com");
        assert!(matches!(
            sync.sync(&user, Some(Role::Admin)).await,
            Err(IdentityError::RoleNotPermitted(Role::Admin))
        ));

        let mut admin = identity("user_2", "b@example.com");
        admin.provider_role = Some(Role::Admin);
        let outcome = sync.sync(&admin, Some(Role::Admin)).await.unwrap();
        assert_eq!(outcome.account.role, Role::Admin);
    }

    #[tokio::test]
    async fn missing_email_without_directory_fails() {
        let (db, _dir) = temp_db();
        let result = IdentitySync::new(&db, None)
            .sync(&AuthenticatedUser::with_subject("user_1"), None)
            .await;
        assert!(matches!(result, Err(IdentityError::MissingEmail)));
    }

    #[tokio::test]
    async fn name_from_token_is_kept() {
        let (db, _dir) = temp_db();
        let mut user = identity("user_1", "a@example.com");
        user.name = Some("Ada Lovelace".into());
        let outcome = IdentitySync::new(&db, None).sync(&user, None).await.unwrap();
        assert_eq!(outcome.account.name, "Ada Lovelace");
    }
}
