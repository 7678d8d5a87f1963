use crate::transport::{HttpRequest, HttpTransport};
use anyhow::Result;
use reqwest::header;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Host used by group links issued against the retired Azure AD Graph API.
pub const LEGACY_GRAPH_URL: &str = "https://graph.windows.net";

#[derive(Debug, Deserialize)]
struct MemberGroups {
    value: Vec<String>,
}

/// Rewrite a groups link from the legacy Azure AD Graph into the Microsoft
/// Graph equivalent, e.g. `.../users/{oid}/getMemberObjects` becomes
/// `{graph_url}/v1.0/.../users/{oid}/getMemberGroups`.
pub fn rewrite_groups_link(group_link: &str, graph_url: &str) -> String {
    let current = format!("{}/v1.0", graph_url.trim_end_matches('/'));
    group_link
        .replace(LEGACY_GRAPH_URL, &current)
        .replace("Objects", "Groups")
}

/// Request the ids of the security groups the user behind `url` is a member
/// of. `url` should already be rewritten with [`rewrite_groups_link`].
pub async fn request_member_groups(
    transport: &dyn HttpTransport,
    url: &str,
    access_token: &str,
) -> Result<Vec<String>> {
    let req = HttpRequest::post(url)
        .bearer(access_token)
        .header(header::CONTENT_TYPE.as_str(), "application/json")
        .json(json!({ "securityEnabledOnly": true }));
    let body = transport.send(req).await?;
    let json_resp: MemberGroups = serde_json::from_str(&body)?;
    debug!("User is a member of {} security groups", json_resp.value.len());
    Ok(json_resp.value)
}
