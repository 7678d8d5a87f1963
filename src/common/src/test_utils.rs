/*
   Entra ID group to role synchronization - Test helpers
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
use crate::config::RoleSyncConfig;
use crate::interface::{RoleStore, SyncError};
use async_trait::async_trait;

pub(crate) use graph::mock::MockTransport;

pub(crate) const TOKEN_URL: &str =
    "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/token";
pub(crate) const TOKEN_RESPONSE: &str =
    r#"{"token_type":"Bearer","expires_in":3599,"access_token":"token-1"}"#;
pub(crate) const GROUPS_URL: &str = "https://graph.microsoft.com/v1.0/groups";
pub(crate) const GROUPS_RESPONSE: &str = r#"{"value":[
    {"id":"g-editors","displayName":"Site Editors","onPremisesSamAccountName":"Editors"},
    {"id":"g-authors","displayName":"Site Authors","onPremisesSamAccountName":"Authors"},
    {"id":"g-cloud","displayName":"Cloud Only","onPremisesSamAccountName":null}
]}"#;
pub(crate) const GROUPS_LINK: &str =
    "https://graph.windows.net/tenant-id/users/user-oid/getMemberObjects";
pub(crate) const MEMBER_GROUPS_URL: &str =
    "https://graph.microsoft.com/v1.0/tenant-id/users/user-oid/getMemberGroups";

pub(crate) fn test_config() -> RoleSyncConfig {
    let mut config = RoleSyncConfig::new(Some("/tmp/rolesync_missing.ini")).unwrap();
    config.set("graph", "tenant_id", "tenant-id");
    config.set("graph", "client_id", "client-id");
    config.set("graph", "client_secret", "client-secret");
    config.set("graph", "base_domain", "contoso.com");
    config
}

/// A role store whose every operation fails.
pub(crate) struct FailingRoleStore;

#[async_trait]
impl RoleStore for FailingRoleStore {
    async fn role_exists(&self, _role: &str) -> Result<bool, SyncError> {
        Err(SyncError::RoleApply("store unavailable".to_string()))
    }

    async fn define_role(&self, _role: &str, _label: &str) -> Result<(), SyncError> {
        Err(SyncError::RoleApply("store unavailable".to_string()))
    }

    async fn assign_role(&self, _user_id: u64, _role: &str) -> Result<(), SyncError> {
        Err(SyncError::RoleApply("store unavailable".to_string()))
    }

    async fn unassign_role(&self, _user_id: u64, _role: &str) -> Result<(), SyncError> {
        Err(SyncError::RoleApply("store unavailable".to_string()))
    }

    async fn invalidate_user_cache(
        &self,
        _user_id: u64,
        _login_name: &str,
    ) -> Result<(), SyncError> {
        Err(SyncError::RoleApply("store unavailable".to_string()))
    }
}
