use crate::transport::{HttpRequest, HttpTransport};
use anyhow::Result;
use reqwest::header;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Graph returns at most this many groups per page. Later pages are never
/// requested.
pub const GROUP_PAGE_SIZE: u32 = 999;

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupObject {
    pub id: String,
    #[serde(rename = "displayName", default, deserialize_with = "null_as_empty")]
    pub displayname: String,
    #[serde(
        rename = "onPremisesSamAccountName",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub sam_account_name: String,
}

#[derive(Debug, Deserialize)]
struct GroupList {
    value: Vec<GroupObject>,
}

/// Fetch every group synced from an on-premises directory, selecting only the
/// attributes needed for role mapping.
pub async fn request_synced_groups(
    transport: &dyn HttpTransport,
    graph_url: &str,
    access_token: &str,
) -> Result<Vec<GroupObject>> {
    let req = HttpRequest::get(&format!("{}/v1.0/groups", graph_url.trim_end_matches('/')))
        .query("$select", "id,displayName,onPremisesSamAccountName")
        .query("$top", &GROUP_PAGE_SIZE.to_string())
        .query("$filter", "onPremisesSyncEnabled eq true")
        .bearer(access_token)
        .header(header::CONTENT_TYPE.as_str(), "application/json");
    let body = transport.send(req).await?;
    let json_resp: GroupList = serde_json::from_str(&body)?;
    debug!("Fetched {} synced groups", json_resp.value.len());
    Ok(json_resp.value)
}
