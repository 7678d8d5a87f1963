use crate::transport::{HttpRequest, HttpTransport};
use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

pub fn token_endpoint(authority_host: &str, tenant_id: &str) -> String {
    let authority_host = authority_host.trim_end_matches('/');
    if authority_host.starts_with("https://") || authority_host.starts_with("http://") {
        format!("{}/{}/oauth2/v2.0/token", authority_host, tenant_id)
    } else {
        format!("https://{}/{}/oauth2/v2.0/token", authority_host, tenant_id)
    }
}

/// Client credential grant against the identity platform, scoped to the
/// whole of the Graph resource.
pub async fn request_client_credentials_token(
    transport: &dyn HttpTransport,
    authority_host: &str,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
    graph_url: &str,
) -> Result<TokenResponse> {
    let scope = format!("{}/.default", graph_url.trim_end_matches('/'));
    let req = HttpRequest::post(&token_endpoint(authority_host, tenant_id)).form(&[
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("scope", &scope),
        ("grant_type", "client_credentials"),
    ]);
    let body = transport.send(req).await?;
    let json_resp: TokenResponse = serde_json::from_str(&body)?;
    debug!("Token acquired, expires in {}s", json_resp.expires_in);
    Ok(json_resp)
}
