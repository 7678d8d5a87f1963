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
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rolesync/rolesync.conf";
pub const DEFAULT_AUTHORITY_HOST: &str = "login.microsoftonline.com";
pub const DEFAULT_GRAPH: &str = "https://graph.microsoft.com";
pub const DEFAULT_CONN_TIMEOUT: u64 = 4;
// 12 hours
pub const DEFAULT_GROUP_CACHE_TIMEOUT: u64 = 43200;
pub const DEFAULT_DEBUG: bool = false;

pub const DEFAULT_HOOK_LOGIN: &str = "wp_saml_auth_existing_user_authenticated";
pub const DEFAULT_HOOK_LOGIN_NEW: &str = "wp_saml_auth_new_user_authenticated";
pub const DEFAULT_HOOK_PRE_AUTHENTICATION: &str = "wp_saml_auth_pre_authentication";

pub const DEFAULT_DISPLAY_NAME_CLAIM: &str =
    "http://schemas.microsoft.com/identity/claims/displayname";
pub const DEFAULT_FIRST_NAME_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname";
pub const DEFAULT_LAST_NAME_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname";

pub const GROUPS_LINK_CLAIM: &str = "http://schemas.microsoft.com/claims/groups.link";
pub const GROUPS_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/groups";
pub const NAME_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";

pub const TOKEN_CACHE_KEY: &str = "directory_token";
pub const GROUP_CACHE_KEY: &str = "directory_groups";

pub const BASELINE_ROLE: &str = "subscriber";
pub const PROTECTED_ROLE: &str = "administrator";
pub const UNAUTHORIZED_DOMAIN: &str = "unauthorized-domain";
