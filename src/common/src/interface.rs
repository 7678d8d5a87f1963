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
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Errors raised while synchronizing a user. Only `RoleApply` is fatal to the
/// login; everything else means the directory is unavailable and the user is
/// left as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The request to the directory could not complete, returned a failure
    /// status, or returned an empty body.
    Transport(String),
    /// The directory answered with something that could not be parsed.
    Parse(String),
    /// No directory credential could be obtained.
    ProviderUnauthorised(String),
    /// Mutating the user's roles failed. The request must be aborted.
    RoleApply(String),
    /// Required configuration is missing or invalid.
    Config(String),
}

impl SyncError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::RoleApply(_))
    }

    /// Classify an error bubbled up from the graph requests.
    pub fn from_request(context: &str, e: &anyhow::Error) -> Self {
        if e.downcast_ref::<serde_json::Error>().is_some() {
            SyncError::Parse(format!("{}: {}", context, e))
        } else {
            SyncError::Transport(format!("{}: {}", context, e))
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Transport(msg) => write!(f, "directory request failed: {}", msg),
            SyncError::Parse(msg) => write!(f, "malformed directory response: {}", msg),
            SyncError::ProviderUnauthorised(msg) => {
                write!(f, "directory authentication unavailable: {}", msg)
            }
            SyncError::RoleApply(msg) => write!(f, "failed applying roles: {}", msg),
            SyncError::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

/// A host application account, as seen at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login_name: String,
    pub roles: BTreeSet<String>,
}

impl User {
    pub fn new(id: u64, login_name: &str, roles: &[&str]) -> Self {
        User {
            id,
            login_name: login_name.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Role capabilities of the host application.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn role_exists(&self, role: &str) -> Result<bool, SyncError>;

    /// Define a role without any capabilities.
    async fn define_role(&self, role: &str, label: &str) -> Result<(), SyncError>;

    async fn assign_role(&self, user_id: u64, role: &str) -> Result<(), SyncError>;

    async fn unassign_role(&self, user_id: u64, role: &str) -> Result<(), SyncError>;

    /// Drop any cached copy of the user, keyed both by id and by login name.
    async fn invalidate_user_cache(&self, user_id: u64, login_name: &str)
        -> Result<(), SyncError>;
}

/// Profile attribute storage of the host application.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Extra contact-method attributes the host has registered.
    async fn contact_methods(&self) -> Vec<String>;

    async fn update_user(
        &self,
        user_id: u64,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), SyncError>;
}
