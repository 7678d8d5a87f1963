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
use crate::cache::ExpiringCache;
use crate::config::RoleSyncConfig;
use crate::constants::GROUP_CACHE_KEY;
use crate::interface::SyncError;
use crate::token::BearerToken;
use graph::group::{request_synced_groups, GroupObject};
use graph::user::{request_member_groups, rewrite_groups_link};
use graph::HttpTransport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub type GroupDirectoryCache = ExpiringCache<GroupDirectorySnapshot>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: String,
    pub display_name: String,
    /// The on-premises account name, used as the role name. May be empty for
    /// groups that never had one.
    pub local_account_name: String,
}

impl From<GroupObject> for DirectoryGroup {
    fn from(group: GroupObject) -> Self {
        DirectoryGroup {
            id: group.id,
            display_name: group.displayname,
            local_account_name: group.sam_account_name,
        }
    }
}

/// Every synced group in the directory, as of one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDirectorySnapshot {
    groups: Arc<Vec<DirectoryGroup>>,
}

impl GroupDirectorySnapshot {
    pub fn new(groups: Vec<DirectoryGroup>) -> Self {
        GroupDirectorySnapshot {
            groups: Arc::new(groups),
        }
    }

    pub fn find(&self, id: &str) -> Option<&DirectoryGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Where a user's group memberships come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSource {
    /// A groups link asserted in place of inline group claims.
    Link(String),
    /// Group object ids that are already known.
    Ids(Vec<String>),
}

pub struct GroupResolver {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<GroupDirectoryCache>,
    graph_url: String,
    cache_timeout: Duration,
}

impl GroupResolver {
    pub fn new(
        config: &RoleSyncConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<GroupDirectoryCache>,
    ) -> Self {
        GroupResolver {
            transport,
            cache,
            graph_url: config.get_graph_url(),
            cache_timeout: config.get_group_cache_timeout(),
        }
    }

    /// The cached group listing, fetched again once it has expired. A failed
    /// fetch leaves the cache untouched.
    pub async fn snapshot(&self, token: &BearerToken) -> Result<GroupDirectorySnapshot, SyncError> {
        if let Some(snapshot) = self.cache.get(GROUP_CACHE_KEY).await {
            return Ok(snapshot);
        }

        debug!("Group listing not cached, fetching synced groups");
        let groups = request_synced_groups(self.transport.as_ref(), &self.graph_url, token.value())
            .await
            .map_err(|e| SyncError::from_request("listing synced groups", &e))?;
        let snapshot =
            GroupDirectorySnapshot::new(groups.into_iter().map(DirectoryGroup::from).collect());
        self.cache
            .set(GROUP_CACHE_KEY, snapshot.clone(), self.cache_timeout)
            .await;
        info!("Cached {} synced groups", snapshot.len());
        Ok(snapshot)
    }

    /// Map the user's groups onto role names. Groups that are not part of the
    /// synced listing, or that have no account name, are skipped.
    pub async fn resolve(
        &self,
        source: &GroupSource,
        token: &BearerToken,
    ) -> Result<Vec<String>, SyncError> {
        let snapshot = self.snapshot(token).await?;

        let group_ids = match source {
            GroupSource::Link(group_link) => {
                let url = rewrite_groups_link(group_link, &self.graph_url);
                request_member_groups(self.transport.as_ref(), &url, token.value())
                    .await
                    .map_err(|e| SyncError::from_request("requesting member groups", &e))?
            }
            GroupSource::Ids(ids) => ids.clone(),
        };

        let mut names = vec![];
        for id in group_ids.iter() {
            match snapshot.find(id) {
                Some(group) if !group.local_account_name.is_empty() => {
                    names.push(group.local_account_name.clone())
                }
                Some(group) => debug!("Group {} has no account name, skipping", group.id),
                None => debug!("Group {} is not a synced group, skipping", id),
            }
        }
        Ok(names)
    }
}
