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
use crate::constants::UNAUTHORIZED_DOMAIN;
use std::fmt;

/// Authentication was refused before a session was established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRejection {
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for DomainRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for DomainRejection {}

/// The username must contain the allowed domain, ignoring case.
pub fn authorize(username: &str, allowed_domain: &str) -> Result<(), DomainRejection> {
    if username
        .to_lowercase()
        .contains(&allowed_domain.to_lowercase())
    {
        return Ok(());
    }
    warn!(
        "Rejecting {} which is not part of domain {}",
        username, allowed_domain
    );
    Err(DomainRejection {
        code: UNAUTHORIZED_DOMAIN,
        message: format!(
            "Please sign in with your {} account (currently using {})",
            allowed_domain, username
        ),
    })
}

/// Rejection used when no permitted domain is configured. Every username is
/// refused until `base_domain` is set.
pub fn unconfigured(username: &str) -> DomainRejection {
    error!(
        "Rejecting {} because no base_domain is configured",
        username
    );
    DomainRejection {
        code: UNAUTHORIZED_DOMAIN,
        message: format!(
            "Sign in is disabled until a permitted domain is configured (currently using {})",
            username
        ),
    }
}

/// Check the asserted username before any session exists. A missing name
/// claim is checked as an empty username.
pub fn pre_authenticate(claims: &Claims, allowed_domain: &str) -> Result<(), DomainRejection> {
    let username = claims.first(ClaimKey::Name).unwrap_or_default();
    authorize(username, allowed_domain)
}
