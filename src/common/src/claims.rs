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
use crate::constants::{GROUPS_CLAIM, GROUPS_LINK_CLAIM, NAME_CLAIM};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Claims the synchronization logic knows how to interpret.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClaimKey {
    /// A single link to the user's group collection. Entra ID emits this
    /// instead of `Groups` once the user is in too many groups to inline.
    GroupsLink,
    /// Inline group names.
    Groups,
    /// The asserted username.
    Name,
}

impl ClaimKey {
    pub fn uri(&self) -> &'static str {
        match self {
            ClaimKey::GroupsLink => GROUPS_LINK_CLAIM,
            ClaimKey::Groups => GROUPS_CLAIM,
            ClaimKey::Name => NAME_CLAIM,
        }
    }
}

/// Attributes asserted by the identity provider, already validated by the
/// SAML layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims {
    values: HashMap<String, Vec<String>>,
}

impl Claims {
    pub fn new() -> Self {
        Claims::default()
    }

    pub fn insert(&mut self, name: &str, values: Vec<String>) {
        self.values.insert(name.to_string(), values);
    }

    pub fn with(mut self, name: &str, values: &[&str]) -> Self {
        self.insert(name, values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// All values of a recognized claim. `None` when the claim is absent or
    /// carries no values.
    pub fn values(&self, key: ClaimKey) -> Option<&[String]> {
        self.attribute_values(key.uri())
    }

    /// First value of a recognized claim, if there is one.
    pub fn first(&self, key: ClaimKey) -> Option<&str> {
        self.values(key).and_then(|v| v.first()).map(|v| v.as_str())
    }

    pub fn attribute_values(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(values) if !values.is_empty() => Some(values.as_slice()),
            _ => None,
        }
    }

    /// First non-empty value of an arbitrary attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attribute_values(name)
            .and_then(|v| v.first())
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

impl From<HashMap<String, Vec<String>>> for Claims {
    fn from(values: HashMap<String, Vec<String>>) -> Self {
        Claims { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_claims() {
        let claims = Claims::new()
            .with(GROUPS_LINK_CLAIM, &["https://graph.windows.net/t/users/u/getMemberObjects"])
            .with(GROUPS_CLAIM, &["Editors", "Authors"]);

        assert_eq!(
            claims.first(ClaimKey::GroupsLink),
            Some("https://graph.windows.net/t/users/u/getMemberObjects")
        );
        assert_eq!(
            claims.values(ClaimKey::Groups),
            Some(&["Editors".to_string(), "Authors".to_string()][..])
        );
        assert_eq!(claims.first(ClaimKey::Name), None);
    }

    #[test]
    fn test_empty_list_is_absent() {
        let claims = Claims::new().with(GROUPS_LINK_CLAIM, &[]);
        assert_eq!(claims.values(ClaimKey::GroupsLink), None);
        assert_eq!(claims.first(ClaimKey::GroupsLink), None);
    }

    #[test]
    fn test_attribute_skips_empty_value() {
        let claims = Claims::new().with("phone", &[""]).with("mobile", &["555"]);
        assert_eq!(claims.attribute("phone"), None);
        assert_eq!(claims.attribute("mobile"), Some("555"));
        assert_eq!(claims.attribute("fax"), None);
    }

    #[test]
    fn test_deserialize() {
        let claims: Claims = serde_json::from_str(
            r#"{"http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name": ["alice@contoso.com"]}"#,
        )
        .unwrap();
        assert_eq!(claims.first(ClaimKey::Name), Some("alice@contoso.com"));
    }
}
