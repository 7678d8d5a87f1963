/*
   Entra ID group to role synchronization
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use crate::constants::{BASELINE_ROLE, PROTECTED_ROLE};
use crate::interface::{RoleStore, SyncError, User};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The role changes needed to bring a user in line with the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePlan {
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl RolePlan {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// The roles a user should hold: every desired name lower-cased, plus the
/// baseline role.
pub fn desired_roles(desired: Option<&[String]>) -> BTreeSet<String> {
    let mut roles: BTreeSet<String> = desired
        .unwrap_or_default()
        .iter()
        .map(|r| r.to_lowercase())
        .collect();
    roles.insert(BASELINE_ROLE.to_string());
    roles
}

pub fn plan_role_changes(current: &BTreeSet<String>, desired: Option<&[String]>) -> RolePlan {
    let desired = desired_roles(desired);
    RolePlan {
        add: desired.difference(current).cloned().collect(),
        remove: current
            .difference(&desired)
            .filter(|r| r.as_str() != PROTECTED_ROLE)
            .cloned()
            .collect(),
    }
}

pub struct RoleReconciler {
    store: Arc<dyn RoleStore>,
}

impl RoleReconciler {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        RoleReconciler { store }
    }

    /// Add the missing roles and drop the stale ones. Any failure here is
    /// returned as `SyncError::RoleApply` and must abort the login.
    pub async fn reconcile(
        &self,
        user: &mut User,
        desired: Option<&[String]>,
    ) -> Result<RolePlan, SyncError> {
        let plan = plan_role_changes(&user.roles, desired);
        if let Err(e) = self.apply(user, &plan).await {
            error!("Failed applying roles for {}: {}", user.login_name, e);
            return Err(match e {
                SyncError::RoleApply(msg) => SyncError::RoleApply(msg),
                e => SyncError::RoleApply(format!("{}", e)),
            });
        }
        if !plan.is_empty() {
            info!(
                "Updated roles for {}: added {:?}, removed {:?}",
                user.login_name, plan.add, plan.remove
            );
        }
        Ok(plan)
    }

    async fn apply(&self, user: &mut User, plan: &RolePlan) -> Result<(), SyncError> {
        for role in plan.add.iter() {
            if !self.store.role_exists(role).await? {
                debug!("Defining role {}", role);
                self.store.define_role(role, role).await?;
            }
            self.store.assign_role(user.id, role).await?;
            user.roles.insert(role.clone());
        }
        for role in plan.remove.iter() {
            self.store.unassign_role(user.id, role).await?;
            user.roles.remove(role);
        }
        self.store
            .invalidate_user_cache(user.id, &user.login_name)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memstore::MemoryRoleStore;
    use crate::test_utils::FailingRoleStore;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    const NO_ROLES: &[String] = &[];

    #[test]
    fn test_plan_adds_baseline() {
        let plan = plan_role_changes(&roles(&[]), None);
        assert_eq!(plan.add, roles(&["subscriber"]));
        assert!(plan.remove.is_empty());

        let plan = plan_role_changes(&roles(&["subscriber"]), Some(NO_ROLES));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_lowercases() {
        let plan = plan_role_changes(&roles(&["subscriber"]), Some(strings(&["Editors"]).as_slice()));
        assert_eq!(plan.add, roles(&["editors"]));
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn test_plan_never_removes_protected_role() {
        let current = roles(&["administrator", "editors", "subscriber"]);
        for desired in [None, Some(strings(&[])), Some(strings(&["Authors"]))] {
            let plan = plan_role_changes(&current, desired.as_deref());
            assert!(!plan.remove.contains(PROTECTED_ROLE));
            assert!(plan.remove.contains("editors"));
        }
    }

    #[tokio::test]
    async fn test_reconcile_keeps_administrator() {
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(1, "alice", &["subscriber", "administrator"]).await;
        let reconciler = RoleReconciler::new(store.clone());
        let mut user = User::new(1, "alice", &["subscriber", "administrator"]);

        let plan = reconciler.reconcile(&mut user, Some(NO_ROLES)).await.unwrap();
        assert!(plan.is_empty());
        assert_eq!(user.roles, roles(&["administrator", "subscriber"]));
        assert_eq!(
            store.user_roles(1).await,
            Some(roles(&["administrator", "subscriber"]))
        );
    }

    #[tokio::test]
    async fn test_reconcile_defines_missing_role() {
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(1, "alice", &["subscriber"]).await;
        let reconciler = RoleReconciler::new(store.clone());
        let mut user = User::new(1, "alice", &["subscriber"]);

        assert!(!store.role_exists("editors").await.unwrap());
        reconciler
            .reconcile(&mut user, Some(strings(&["Editors"]).as_slice()))
            .await
            .unwrap();

        assert_eq!(user.roles, roles(&["editors", "subscriber"]));
        assert_eq!(store.role_label("editors").await, Some("editors".to_string()));
        assert_eq!(
            store.user_roles(1).await,
            Some(roles(&["editors", "subscriber"]))
        );
        assert_eq!(store.invalidations().await, vec![(1, "alice".to_string())]);
    }

    #[tokio::test]
    async fn test_reconcile_removes_stale_roles() {
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(1, "alice", &["subscriber", "authors", "editors"]).await;
        let reconciler = RoleReconciler::new(store.clone());
        let mut user = User::new(1, "alice", &["subscriber", "authors", "editors"]);

        let plan = reconciler
            .reconcile(&mut user, Some(strings(&["EDITORS"]).as_slice()))
            .await
            .unwrap();
        assert_eq!(plan.remove, roles(&["authors"]));
        assert_eq!(user.roles, roles(&["editors", "subscriber"]));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(7, "bob", &["authors"]).await;
        let reconciler = RoleReconciler::new(store.clone());
        let mut user = User::new(7, "bob", &["authors"]);
        let desired = strings(&["Editors", "Reviewers"]);

        let first = reconciler.reconcile(&mut user, Some(desired.as_slice())).await.unwrap();
        assert!(!first.is_empty());
        let second = reconciler.reconcile(&mut user, Some(desired.as_slice())).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(user.roles, roles(&["editors", "reviewers", "subscriber"]));
    }

    #[tokio::test]
    async fn test_reconcile_failure_is_fatal() {
        let reconciler = RoleReconciler::new(Arc::new(FailingRoleStore));
        let mut user = User::new(1, "alice", &[]);

        let err = reconciler.reconcile(&mut user, None).await.unwrap_err();
        assert!(matches!(err, SyncError::RoleApply(_)));
        assert!(err.is_fatal());
    }
}
