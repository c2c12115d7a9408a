//! Authorization policy
//!
//! Capabilities are computed once per request into an `AuthContext` and
//! passed explicitly into every coordinator and chat operation that needs
//! them. Nothing looks permissions up on its own.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use crate::database::EventStore;
use crate::utils::errors::{UniHubError, Result};

/// Permission levels for different operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Member of the society the request is about
    Member,
    /// Administrator of that society
    SocietyAdmin,
    /// Platform-wide administrator
    GlobalAdmin,
}

/// Capabilities of an account with respect to one society
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: i64,
    pub society_id: i64,
    pub permissions: HashSet<Permission>,
}

impl AuthContext {
    pub fn new(account_id: i64, society_id: i64, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            account_id,
            society_id,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn can_manage_society(&self) -> bool {
        self.has_permission(Permission::SocietyAdmin) || self.has_permission(Permission::GlobalAdmin)
    }

    /// Fail with `PermissionDenied` unless the account may manage `society_id`
    pub fn require_society_admin(&self, society_id: i64) -> Result<()> {
        if self.society_id == society_id && self.can_manage_society() {
            return Ok(());
        }
        Err(UniHubError::PermissionDenied(format!(
            "Account {} cannot manage society {}", self.account_id, society_id
        )))
    }
}

/// Builds `AuthContext`s from accounts and memberships in the store
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn EventStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn context(&self, account_id: i64, society_id: i64) -> Result<AuthContext> {
        let account = self.store.find_account(account_id).await?
            .ok_or(UniHubError::AccountNotFound { account_id })?;
        self.store.find_society(society_id).await?
            .ok_or(UniHubError::SocietyNotFound { society_id })?;

        let mut permissions = HashSet::new();
        if account.is_admin {
            permissions.insert(Permission::GlobalAdmin);
        }

        if let Some(membership) = self.store.find_membership(society_id, account_id).await? {
            permissions.insert(Permission::Member);
            if membership.is_admin {
                permissions.insert(Permission::SocietyAdmin);
            }
        }

        debug!(account_id = account_id, society_id = society_id, permissions = ?permissions, "Built auth context");

        Ok(AuthContext {
            account_id,
            society_id,
            permissions,
        })
    }
}
