/*
   Entra ID group to role synchronization
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

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// A user finished signing in and should be synchronized.
    Login,
    /// The raw assertion is about to be turned into a session.
    PreAuthentication,
}

/// Hook names the host fires, as configured under `[integrations]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTable {
    login: String,
    login_new: Option<String>,
    pre_authentication: String,
}

impl HookTable {
    pub fn from_config(config: &RoleSyncConfig) -> Self {
        HookTable {
            login: config.get_hook_login(),
            login_new: config.get_hook_login_new(),
            pre_authentication: config.get_hook_pre_authentication(),
        }
    }

    pub fn event_for(&self, hook: &str) -> Option<HookEvent> {
        if hook == self.login || Some(hook) == self.login_new.as_deref() {
            Some(HookEvent::Login)
        } else if hook == self.pre_authentication {
            Some(HookEvent::PreAuthentication)
        } else {
            None
        }
    }

    pub fn login_hook(&self) -> &str {
        &self.login
    }

    pub fn pre_authentication_hook(&self) -> &str {
        &self.pre_authentication
    }
}
