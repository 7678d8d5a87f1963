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
use crate::constants::TOKEN_CACHE_KEY;
use crate::interface::SyncError;
use graph::token::request_client_credentials_token;
use graph::HttpTransport;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub type CredentialCache = ExpiringCache<BearerToken>;

#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    value: String,
    expires_at: SystemTime,
}

impl BearerToken {
    pub fn new(value: &str, expires_at: SystemTime) -> Self {
        BearerToken {
            value: value.to_string(),
            expires_at,
        }
    }

    /// `None` when the validity window does not fit in a `SystemTime`.
    pub fn expiring_in(value: &str, expires_in: Duration) -> Option<Self> {
        SystemTime::now()
            .checked_add(expires_in)
            .map(|expires_at| BearerToken::new(value, expires_at))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

struct ClientCredentials {
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

pub struct TokenProvider {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<CredentialCache>,
    credentials: ClientCredentials,
    authority_host: String,
    graph_url: String,
}

impl TokenProvider {
    pub fn new(
        config: &RoleSyncConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<CredentialCache>,
    ) -> Result<Self, SyncError> {
        let missing = |option: &str| SyncError::Config(format!("[graph] {} is not set", option));
        let credentials = ClientCredentials {
            tenant_id: config.get_tenant_id().ok_or_else(|| missing("tenant_id"))?,
            client_id: config.get_client_id().ok_or_else(|| missing("client_id"))?,
            client_secret: config
                .get_client_secret()
                .ok_or_else(|| missing("client_secret"))?,
        };
        Ok(TokenProvider {
            transport,
            cache,
            credentials,
            authority_host: config.get_authority_host(),
            graph_url: config.get_graph_url(),
        })
    }

    /// Return the cached token, or request a new one from the token endpoint
    /// when the cache is empty or expired. Nothing is cached on failure.
    pub async fn get_token(&self) -> Result<BearerToken, SyncError> {
        if let Some(token) = self.cache.get(TOKEN_CACHE_KEY).await {
            debug!("Using cached directory token");
            return Ok(token);
        }

        debug!("Requesting directory token for tenant {}", self.credentials.tenant_id);
        let resp = request_client_credentials_token(
            self.transport.as_ref(),
            &self.authority_host,
            &self.credentials.tenant_id,
            &self.credentials.client_id,
            &self.credentials.client_secret,
            &self.graph_url,
        )
        .await
        .map_err(|e| {
            warn!("Directory token request failed: {}", e);
            SyncError::ProviderUnauthorised(format!("{}", e))
        })?;

        let token = BearerToken::expiring_in(&resp.access_token, Duration::from_secs(resp.expires_in))
            .ok_or_else(|| {
                warn!("Directory token has an invalid lifetime of {}s", resp.expires_in);
                SyncError::Parse(format!("token lifetime out of range: {}s", resp.expires_in))
            })?;
        self.cache
            .set_until(TOKEN_CACHE_KEY, token.clone(), token.expires_at())
            .await;
        Ok(token)
    }

    pub async fn invalidate(&self) {
        self.cache.expire(TOKEN_CACHE_KEY).await;
    }

    pub fn graph_url(&self) -> &str {
        &self.graph_url
    }
}
