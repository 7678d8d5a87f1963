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
use configparser::ini::Ini;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_AUTHORITY_HOST, DEFAULT_CONFIG_PATH, DEFAULT_CONN_TIMEOUT, DEFAULT_DEBUG,
    DEFAULT_DISPLAY_NAME_CLAIM, DEFAULT_FIRST_NAME_CLAIM, DEFAULT_GRAPH,
    DEFAULT_GROUP_CACHE_TIMEOUT, DEFAULT_HOOK_LOGIN, DEFAULT_HOOK_LOGIN_NEW,
    DEFAULT_HOOK_PRE_AUTHENTICATION, DEFAULT_LAST_NAME_CLAIM,
};

/// Profile attributes that are always refreshed from the assertion on login.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProfileAttr {
    DisplayName,
    FirstName,
    LastName,
}

impl ProfileAttr {
    pub const ALL: [ProfileAttr; 3] = [
        ProfileAttr::DisplayName,
        ProfileAttr::FirstName,
        ProfileAttr::LastName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileAttr::DisplayName => "display_name",
            ProfileAttr::FirstName => "first_name",
            ProfileAttr::LastName => "last_name",
        }
    }

    fn default_claim(&self) -> &'static str {
        match self {
            ProfileAttr::DisplayName => DEFAULT_DISPLAY_NAME_CLAIM,
            ProfileAttr::FirstName => DEFAULT_FIRST_NAME_CLAIM,
            ProfileAttr::LastName => DEFAULT_LAST_NAME_CLAIM,
        }
    }
}

#[derive(Clone)]
pub struct RoleSyncConfig {
    config: Ini,
    filename: String,
}

fn match_bool(val: Option<String>, default: bool) -> bool {
    match val {
        Some(val) => match val.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            "1" => true,
            "0" => false,
            _ => {
                error!("Unrecognized boolean value '{}'", val);
                default
            }
        },
        None => default,
    }
}

fn match_u64(option: &str, val: Option<String>, default: u64) -> u64 {
    match val {
        Some(val) => match val.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                error!("Failed parsing {} from config: {}", option, val);
                default
            }
        },
        None => default,
    }
}

fn non_empty(val: Option<String>) -> Option<String> {
    val.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl RoleSyncConfig {
    pub fn new(config_path: Option<&str>) -> Result<RoleSyncConfig, String> {
        let mut sconfig = Ini::new();
        let mut filename: String = DEFAULT_CONFIG_PATH.to_string();
        if let Some(config_path) = config_path {
            filename = config_path.to_string();
        }
        let cfg_path: PathBuf = PathBuf::from(filename.clone());
        if cfg_path.exists() {
            if let Err(e) = sconfig.load(filename.clone()) {
                return Err(format!(
                    "failed to read config from {} - cannot start up: {} Quitting.",
                    filename, e
                ));
            }
        } else {
            debug!("Config file {} not found, using defaults", filename);
        }
        Ok(RoleSyncConfig {
            config: sconfig,
            filename,
        })
    }

    pub fn get(&self, section: &str, option: &str) -> Option<String> {
        self.config.get(section, option)
    }

    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        self.config.set(section, option, Some(value.to_string()));
    }

    pub fn get_config_file(&self) -> String {
        self.filename.clone()
    }

    pub fn get_tenant_id(&self) -> Option<String> {
        non_empty(self.config.get("graph", "tenant_id"))
    }

    pub fn get_client_id(&self) -> Option<String> {
        non_empty(self.config.get("graph", "client_id"))
    }

    pub fn get_client_secret(&self) -> Option<String> {
        non_empty(self.config.get("graph", "client_secret"))
    }

    pub fn get_base_domain(&self) -> Option<String> {
        non_empty(self.config.get("graph", "base_domain"))
    }

    pub fn get_authority_host(&self) -> String {
        match non_empty(self.config.get("graph", "authority_host")) {
            Some(val) => val,
            None => DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    pub fn get_graph_url(&self) -> String {
        match non_empty(self.config.get("graph", "graph_url")) {
            Some(val) => val.trim_end_matches('/').to_string(),
            None => DEFAULT_GRAPH.to_string(),
        }
    }

    pub fn get_connection_timeout(&self) -> u64 {
        match_u64(
            "connection_timeout",
            self.config.get("global", "connection_timeout"),
            DEFAULT_CONN_TIMEOUT,
        )
    }

    pub fn get_group_cache_timeout(&self) -> Duration {
        Duration::from_secs(match_u64(
            "group_cache_timeout",
            self.config.get("global", "group_cache_timeout"),
            DEFAULT_GROUP_CACHE_TIMEOUT,
        ))
    }

    pub fn get_debug(&self) -> bool {
        match_bool(self.config.get("global", "debug"), DEFAULT_DEBUG)
    }

    pub fn get_hook_login(&self) -> String {
        match non_empty(self.config.get("integrations", "hook_login")) {
            Some(val) => val,
            None => DEFAULT_HOOK_LOGIN.to_string(),
        }
    }

    /// The second login hook is optional; an explicitly empty value disables it.
    pub fn get_hook_login_new(&self) -> Option<String> {
        match self.config.get("integrations", "hook_login_new") {
            Some(val) => non_empty(Some(val)),
            None => Some(DEFAULT_HOOK_LOGIN_NEW.to_string()),
        }
    }

    pub fn get_hook_pre_authentication(&self) -> String {
        match non_empty(self.config.get("integrations", "hook_pre_authentication")) {
            Some(val) => val,
            None => DEFAULT_HOOK_PRE_AUTHENTICATION.to_string(),
        }
    }

    /// Name of the claim the given profile attribute is read from.
    pub fn get_attribute_claim(&self, attr: ProfileAttr) -> String {
        match non_empty(self.config.get("attributes", attr.as_str())) {
            Some(val) => val,
            None => attr.default_claim().to_string(),
        }
    }
}

impl fmt::Debug for RoleSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The client secret must never end up in a log line.
        f.debug_struct("RoleSyncConfig")
            .field("filename", &self.filename)
            .field("tenant_id", &self.get_tenant_id())
            .field("client_id", &self.get_client_id())
            .field("base_domain", &self.get_base_domain())
            .finish()
    }
}
