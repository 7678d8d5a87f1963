/*
   Entra ID group to role synchronization - In-memory host store
   Copyright (C) David Mulder <dmulder@samba.org> 2025

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
use crate::interface::{ProfileStore, RoleStore, SyncError, User};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub login_name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Everything a host application keeps about roles and users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    /// Role name to display label.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    #[serde(default)]
    pub users: BTreeMap<u64, StoredUser>,
    #[serde(default)]
    pub contact_methods: Vec<String>,
}

/// A [`RoleStore`] and [`ProfileStore`] kept entirely in memory, optionally
/// loaded from and saved to a JSON file.
#[derive(Default)]
pub struct MemoryRoleStore {
    state: RwLock<HostState>,
    invalidations: RwLock<Vec<(u64, String)>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        MemoryRoleStore::default()
    }

    pub fn from_state(state: HostState) -> Self {
        MemoryRoleStore {
            state: RwLock::new(state),
            invalidations: RwLock::new(vec![]),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed reading {}: {}", path.display(), e))?;
        let state: HostState = serde_json::from_str(&data)
            .map_err(|e| anyhow!("Failed parsing {}: {}", path.display(), e))?;
        Ok(MemoryRoleStore::from_state(state))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let state = self.state.read().await;
        fs::write(path, serde_json::to_string_pretty(&*state)?)
            .map_err(|e| anyhow!("Failed writing {}: {}", path.display(), e))
    }

    pub async fn state(&self) -> HostState {
        self.state.read().await.clone()
    }

    /// Add a user, defining any of their roles that do not exist yet.
    pub async fn add_user(&self, id: u64, login_name: &str, roles: &[&str]) {
        let mut state = self.state.write().await;
        for role in roles {
            state
                .roles
                .entry(role.to_string())
                .or_insert_with(|| role.to_string());
        }
        state.users.insert(
            id,
            StoredUser {
                login_name: login_name.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
                attributes: BTreeMap::new(),
            },
        );
    }

    pub async fn set_contact_methods(&self, methods: &[&str]) {
        let mut state = self.state.write().await;
        state.contact_methods = methods.iter().map(|m| m.to_string()).collect();
    }

    pub async fn user(&self, id: u64) -> Option<User> {
        let state = self.state.read().await;
        state.users.get(&id).map(|u| User {
            id,
            login_name: u.login_name.clone(),
            roles: u.roles.clone(),
        })
    }

    pub async fn user_roles(&self, id: u64) -> Option<BTreeSet<String>> {
        self.state.read().await.users.get(&id).map(|u| u.roles.clone())
    }

    pub async fn user_attributes(&self, id: u64) -> Option<BTreeMap<String, String>> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .map(|u| u.attributes.clone())
    }

    pub async fn role_label(&self, role: &str) -> Option<String> {
        self.state.read().await.roles.get(role).cloned()
    }

    pub async fn invalidations(&self) -> Vec<(u64, String)> {
        self.invalidations.read().await.clone()
    }
}

fn unknown_user(user_id: u64) -> SyncError {
    SyncError::RoleApply(format!("user {} does not exist", user_id))
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn role_exists(&self, role: &str) -> Result<bool, SyncError> {
        Ok(self.state.read().await.roles.contains_key(role))
    }

    async fn define_role(&self, role: &str, label: &str) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        state.roles.insert(role.to_string(), label.to_string());
        Ok(())
    }

    async fn assign_role(&self, user_id: u64, role: &str) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(role) {
            return Err(SyncError::RoleApply(format!(
                "role {} is not defined",
                role
            )));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| unknown_user(user_id))?;
        user.roles.insert(role.to_string());
        Ok(())
    }

    async fn unassign_role(&self, user_id: u64, role: &str) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| unknown_user(user_id))?;
        user.roles.remove(role);
        Ok(())
    }

    async fn invalidate_user_cache(
        &self,
        user_id: u64,
        login_name: &str,
    ) -> Result<(), SyncError> {
        self.invalidations
            .write()
            .await
            .push((user_id, login_name.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryRoleStore {
    async fn contact_methods(&self) -> Vec<String> {
        self.state.read().await.contact_methods.clone()
    }

    async fn update_user(
        &self,
        user_id: u64,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| unknown_user(user_id))?;
        for (k, v) in attributes.iter() {
            user.attributes.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}
