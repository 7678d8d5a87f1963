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
use crate::claims::{ClaimKey, Claims};
use crate::config::{ProfileAttr, RoleSyncConfig};
use crate::gate::{self, DomainRejection};
use crate::groups::{GroupDirectoryCache, GroupResolver, GroupSource};
use crate::hooks::{HookEvent, HookTable};
use crate::interface::{ProfileStore, RoleStore, SyncError, User};
use crate::reconcile::RoleReconciler;
use crate::token::{CredentialCache, TokenProvider};
use graph::HttpTransport;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Why a hook refused to let the login continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    Rejected(DomainRejection),
    Sync(SyncError),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::Rejected(r) => write!(f, "{}", r),
            LoginError::Sync(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<DomainRejection> for LoginError {
    fn from(r: DomainRejection) -> Self {
        LoginError::Rejected(r)
    }
}

impl From<SyncError> for LoginError {
    fn from(e: SyncError) -> Self {
        LoginError::Sync(e)
    }
}

pub struct RoleSync {
    tokens: TokenProvider,
    resolver: GroupResolver,
    reconciler: RoleReconciler,
    profiles: Arc<dyn ProfileStore>,
    attribute_claims: Vec<(ProfileAttr, String)>,
    hooks: HookTable,
    base_domain: Option<String>,
}

impl RoleSync {
    pub fn new(
        config: &RoleSyncConfig,
        transport: Arc<dyn HttpTransport>,
        roles: Arc<dyn RoleStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Result<Self, SyncError> {
        RoleSync::with_caches(
            config,
            transport,
            roles,
            profiles,
            Arc::new(CredentialCache::new()),
            Arc::new(GroupDirectoryCache::new()),
        )
    }

    /// Build with caches shared across instances, so a long running host
    /// keeps its token and group listing between logins.
    pub fn with_caches(
        config: &RoleSyncConfig,
        transport: Arc<dyn HttpTransport>,
        roles: Arc<dyn RoleStore>,
        profiles: Arc<dyn ProfileStore>,
        credential_cache: Arc<CredentialCache>,
        group_cache: Arc<GroupDirectoryCache>,
    ) -> Result<Self, SyncError> {
        let base_domain = config.get_base_domain();
        if base_domain.is_none() {
            warn!("No base_domain configured, every sign in will be rejected");
        }
        Ok(RoleSync {
            tokens: TokenProvider::new(config, transport.clone(), credential_cache)?,
            resolver: GroupResolver::new(config, transport, group_cache),
            reconciler: RoleReconciler::new(roles),
            profiles,
            attribute_claims: ProfileAttr::ALL
                .iter()
                .map(|attr| (*attr, config.get_attribute_claim(*attr)))
                .collect(),
            hooks: HookTable::from_config(config),
            base_domain,
        })
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    pub fn resolver(&self) -> &GroupResolver {
        &self.resolver
    }

    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    /// Without a configured `base_domain` every username is rejected.
    pub fn authorize(&self, username: &str) -> Result<(), DomainRejection> {
        match &self.base_domain {
            Some(domain) => gate::authorize(username, domain),
            None => Err(gate::unconfigured(username)),
        }
    }

    pub fn pre_authenticate(&self, claims: &Claims) -> Result<(), DomainRejection> {
        match &self.base_domain {
            Some(domain) => gate::pre_authenticate(claims, domain),
            None => Err(gate::unconfigured(
                claims.first(ClaimKey::Name).unwrap_or_default(),
            )),
        }
    }

    /// Synchronize the user's roles and profile with the assertion.
    ///
    /// When the assertion only carries a groups link, the groups are looked up
    /// in the directory. If that lookup is unavailable or maps to no known
    /// group, the user's roles are left alone. Only a failure to apply roles
    /// is returned.
    pub async fn on_login(&self, user: &mut User, claims: &Claims) -> Result<(), SyncError> {
        match claims.first(ClaimKey::GroupsLink) {
            Some(link) => match self.resolve_link(link).await {
                Ok(names) if !names.is_empty() => {
                    self.reconciler
                        .reconcile(user, Some(names.as_slice()))
                        .await?;
                }
                Ok(_) => {
                    info!(
                        "No synced groups found for {}, leaving roles unchanged",
                        user.login_name
                    );
                }
                Err(e) => {
                    warn!(
                        "Unable to resolve groups for {}, leaving roles unchanged: {}",
                        user.login_name, e
                    );
                }
            },
            None => {
                self.reconciler
                    .reconcile(user, claims.values(ClaimKey::Groups))
                    .await?;
            }
        }

        self.update_profile(user, claims).await;
        Ok(())
    }

    async fn resolve_link(&self, link: &str) -> Result<Vec<String>, SyncError> {
        let token = self.tokens.get_token().await?;
        self.resolver
            .resolve(&GroupSource::Link(link.to_string()), &token)
            .await
    }

    async fn update_profile(&self, user: &User, claims: &Claims) {
        let mut attributes = BTreeMap::new();
        for (attr, claim) in self.attribute_claims.iter() {
            attributes.insert(
                attr.as_str().to_string(),
                claims.attribute(claim).unwrap_or_default().to_string(),
            );
        }
        for method in self.profiles.contact_methods().await {
            let value = claims.attribute(&method).unwrap_or_default().to_string();
            attributes.insert(method, value);
        }

        if let Err(e) = self.profiles.update_user(user.id, &attributes).await {
            error!("Failed updating profile of {}: {}", user.login_name, e);
        }
    }

    /// Run whatever is bound to the named host hook.
    pub async fn dispatch(
        &self,
        hook: &str,
        user: &mut User,
        claims: &Claims,
    ) -> Result<(), LoginError> {
        match self.hooks.event_for(hook) {
            Some(HookEvent::PreAuthentication) => Ok(self.pre_authenticate(claims)?),
            Some(HookEvent::Login) => Ok(self.on_login(user, claims).await?),
            None => {
                debug!("Ignoring unbound hook {}", hook);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        DEFAULT_DISPLAY_NAME_CLAIM, DEFAULT_FIRST_NAME_CLAIM, DEFAULT_HOOK_LOGIN,
        DEFAULT_HOOK_PRE_AUTHENTICATION, GROUPS_CLAIM, GROUPS_LINK_CLAIM, NAME_CLAIM,
        UNAUTHORIZED_DOMAIN,
    };
    use crate::memstore::MemoryRoleStore;
    use crate::test_utils::{
        test_config, FailingRoleStore, MockTransport, GROUPS_LINK, GROUPS_RESPONSE, GROUPS_URL,
        MEMBER_GROUPS_URL, TOKEN_RESPONSE, TOKEN_URL,
    };
    use std::collections::BTreeSet;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    async fn setup(
        transport: &Arc<MockTransport>,
        user_roles: &[&str],
    ) -> (RoleSync, Arc<MemoryRoleStore>, User) {
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(1, "alice@contoso.com", user_roles).await;
        let sync = RoleSync::new(
            &test_config(),
            transport.clone(),
            store.clone(),
            store.clone(),
        )
        .unwrap();
        let user = User::new(1, "alice@contoso.com", user_roles);
        (sync, store, user)
    }

    fn directory() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.respond(TOKEN_URL, TOKEN_RESPONSE);
        transport.respond(GROUPS_URL, GROUPS_RESPONSE);
        transport
    }

    #[tokio::test]
    async fn test_link_roles_applied() {
        let transport = directory();
        transport.respond(MEMBER_GROUPS_URL, r#"{"value":["g-editors"]}"#);
        let (sync, store, mut user) = setup(&transport, &["subscriber", "authors"]).await;
        let claims = Claims::new().with(GROUPS_LINK_CLAIM, &[GROUPS_LINK]);

        sync.on_login(&mut user, &claims).await.unwrap();
        assert_eq!(user.roles, roles(&["editors", "subscriber"]));
        assert_eq!(store.user_roles(1).await, Some(roles(&["editors", "subscriber"])));
    }

    #[tokio::test]
    async fn test_link_without_known_groups_leaves_roles() {
        let transport = directory();
        transport.respond(MEMBER_GROUPS_URL, r#"{"value":["g-unknown","g-cloud"]}"#);
        let (sync, store, mut user) = setup(&transport, &["subscriber", "authors"]).await;
        let claims = Claims::new().with(GROUPS_LINK_CLAIM, &[GROUPS_LINK]);

        sync.on_login(&mut user, &claims).await.unwrap();
        assert_eq!(user.roles, roles(&["authors", "subscriber"]));
        assert_eq!(store.user_roles(1).await, Some(roles(&["authors", "subscriber"])));
        assert!(store.invalidations().await.is_empty());
    }

    #[tokio::test]
    async fn test_token_failure_leaves_roles() {
        let transport = Arc::new(MockTransport::new());
        let (sync, store, mut user) = setup(&transport, &["editors"]).await;
        let claims = Claims::new()
            .with(GROUPS_LINK_CLAIM, &[GROUPS_LINK])
            .with(DEFAULT_FIRST_NAME_CLAIM, &["Alice"]);

        sync.on_login(&mut user, &claims).await.unwrap();
        assert_eq!(user.roles, roles(&["editors"]));
        assert_eq!(transport.calls(GROUPS_URL), 0);
        // The profile is still refreshed
        let attrs = store.user_attributes(1).await.unwrap();
        assert_eq!(attrs.get("first_name").map(|v| v.as_str()), Some("Alice"));
    }

    #[tokio::test]
    async fn test_groups_claim_fallback() {
        let transport = Arc::new(MockTransport::new());
        let (sync, _store, mut user) = setup(&transport, &["authors"]).await;
        let claims = Claims::new().with(GROUPS_CLAIM, &["Editors", "Reviewers"]);

        sync.on_login(&mut user, &claims).await.unwrap();
        assert_eq!(user.roles, roles(&["editors", "reviewers", "subscriber"]));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_group_claims_gives_baseline() {
        let transport = Arc::new(MockTransport::new());
        let (sync, _store, mut user) = setup(&transport, &["administrator", "authors"]).await;

        sync.on_login(&mut user, &Claims::new()).await.unwrap();
        assert_eq!(user.roles, roles(&["administrator", "subscriber"]));
    }

    #[tokio::test]
    async fn test_role_failure_is_returned() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryRoleStore::new());
        let sync = RoleSync::new(
            &test_config(),
            transport,
            Arc::new(FailingRoleStore),
            store.clone(),
        )
        .unwrap();
        let mut user = User::new(1, "alice@contoso.com", &[]);

        let err = sync.on_login(&mut user, &Claims::new()).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_profile_attributes() {
        let transport = Arc::new(MockTransport::new());
        let (sync, store, mut user) = setup(&transport, &["subscriber"]).await;
        store.set_contact_methods(&["phone", "mobile"]).await;
        let claims = Claims::new()
            .with(DEFAULT_DISPLAY_NAME_CLAIM, &["Alice Smith"])
            .with(DEFAULT_FIRST_NAME_CLAIM, &[""])
            .with("phone", &["555-0100"]);

        sync.on_login(&mut user, &claims).await.unwrap();
        let attrs = store.user_attributes(1).await.unwrap();
        let expected: BTreeMap<String, String> = [
            ("display_name", "Alice Smith"),
            ("first_name", ""),
            ("last_name", ""),
            ("mobile", ""),
            ("phone", "555-0100"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(attrs, expected);
    }

    #[tokio::test]
    async fn test_profile_failure_is_not_fatal() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(1, "alice@contoso.com", &[]).await;
        // An empty profile store does not know the user
        let sync = RoleSync::new(
            &test_config(),
            transport,
            store.clone(),
            Arc::new(MemoryRoleStore::new()),
        )
        .unwrap();
        let mut user = User::new(1, "alice@contoso.com", &[]);

        assert!(sync.on_login(&mut user, &Claims::new()).await.is_ok());
        assert_eq!(user.roles, roles(&["subscriber"]));
    }

    #[tokio::test]
    async fn test_dispatch() {
        let transport = Arc::new(MockTransport::new());
        let (sync, _store, mut user) = setup(&transport, &[]).await;
        let outsider = Claims::new().with(NAME_CLAIM, &["alice@other.com"]);

        match sync
            .dispatch(DEFAULT_HOOK_PRE_AUTHENTICATION, &mut user, &outsider)
            .await
        {
            Err(LoginError::Rejected(r)) => assert_eq!(r.code, UNAUTHORIZED_DOMAIN),
            other => panic!("unexpected result {:?}", other),
        }

        sync.dispatch("init", &mut user, &outsider).await.unwrap();
        assert!(user.roles.is_empty());

        sync.dispatch(DEFAULT_HOOK_LOGIN, &mut user, &outsider)
            .await
            .unwrap();
        assert_eq!(user.roles, roles(&["subscriber"]));
    }

    #[tokio::test]
    async fn test_dispatch_role_failure() {
        let store = Arc::new(MemoryRoleStore::new());
        let sync = RoleSync::new(
            &test_config(),
            Arc::new(MockTransport::new()),
            Arc::new(FailingRoleStore),
            store,
        )
        .unwrap();
        let mut user = User::new(1, "alice@contoso.com", &[]);

        let err = sync
            .dispatch(DEFAULT_HOOK_LOGIN, &mut user, &Claims::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Sync(SyncError::RoleApply(_))));
    }

    #[tokio::test]
    async fn test_gate_without_base_domain_rejects() {
        let mut config = test_config();
        config.set("graph", "base_domain", "");
        let store = Arc::new(MemoryRoleStore::new());
        let sync = RoleSync::new(
            &config,
            Arc::new(MockTransport::new()),
            store.clone(),
            store,
        )
        .unwrap();

        let rejection = sync.authorize("alice@contoso.com").unwrap_err();
        assert_eq!(rejection.code, UNAUTHORIZED_DOMAIN);
        let claims = Claims::new().with(NAME_CLAIM, &["alice@contoso.com"]);
        assert!(sync.pre_authenticate(&claims).is_err());

        // Group sync itself does not depend on the gate
        let mut user = User::new(1, "alice@contoso.com", &[]);
        let err = sync
            .dispatch(DEFAULT_HOOK_PRE_AUTHENTICATION, &mut user, &claims)
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_shared_caches_across_instances() {
        let transport = directory();
        transport.respond(MEMBER_GROUPS_URL, r#"{"value":["g-authors"]}"#);
        let credentials = Arc::new(CredentialCache::new());
        let groups = Arc::new(GroupDirectoryCache::new());
        let store = Arc::new(MemoryRoleStore::new());
        store.add_user(1, "alice@contoso.com", &[]).await;
        let claims = Claims::new().with(GROUPS_LINK_CLAIM, &[GROUPS_LINK]);

        for _ in 0..2 {
            let sync = RoleSync::with_caches(
                &test_config(),
                transport.clone(),
                store.clone(),
                store.clone(),
                credentials.clone(),
                groups.clone(),
            )
            .unwrap();
            let mut user = store.user(1).await.unwrap();
            sync.on_login(&mut user, &claims).await.unwrap();
            assert_eq!(user.roles, roles(&["authors", "subscriber"]));
        }
        assert_eq!(transport.calls(TOKEN_URL), 1);
        assert_eq!(transport.calls(GROUPS_URL), 1);
        assert_eq!(transport.calls(MEMBER_GROUPS_URL), 2);
    }
}
