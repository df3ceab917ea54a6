use url::{ParseError, Url};

pub fn to_url(host: &str) -> Result<Url, ParseError> {
    Url::parse(host)
}

/// `https://<domain>/admin/api/<version>/graphql.json`
pub fn admin_graphql_url(shop_domain: &str, api_version: &str) -> Result<Url, ParseError> {
    let domain = shop_domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    to_url(&format!(
        "https://{}/admin/api/{}/graphql.json",
        domain, api_version
    ))
}

/// Normalizes a CORS origin: scheme + host (+ port), no path or trailing slash.
pub fn to_origin(raw: &str) -> Result<String, ParseError> {
    let url = to_url(raw.trim())?;
    Ok(url.origin().ascii_serialization())
}
