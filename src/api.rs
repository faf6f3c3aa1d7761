//! Typed client for the mcapi.shit.vc server index.
//!
//! Every call issues exactly one GET. `404` on the player lookups means
//! "nothing recorded" and comes back as `Ok(None)`; any other failure is an
//! [`ApiError`], which the command layer reports as the index being unavailable.

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid API base URL: {0}")]
    BaseUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[name = "Last Seen"]
    LastSeen,
    #[name = "Player Count"]
    Players,
    #[name = "Version"]
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[name = "Online"]
    Online,
    #[name = "Offline"]
    Offline,
    #[name = "Whitelist"]
    Whitelist,
}

/// Filters for `GET /servers`. Unset filters are left out of the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerQuery {
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authmode: Option<AuthMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_players: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Default for ServerQuery {
    fn default() -> Self {
        Self {
            page: 1,
            software: None,
            version: None,
            sort: None,
            authmode: None,
            min_players: None,
            country: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geolocation {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    #[serde(default)]
    pub serverip: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub geolocation: Option<Geolocation>,
    #[serde(default)]
    pub authmode: Option<String>,
    #[serde(default)]
    pub online_players: Option<u64>,
    #[serde(default)]
    pub max_players: Option<u64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerPage {
    #[serde(default)]
    pub servers: Vec<ServerRecord>,
    #[serde(default)]
    pub total: u64,
}

/// Reads a field that may be missing, null or of the wrong type as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Reads a list, dropping entries that don't decode instead of failing the whole body.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSighting {
    #[serde(default, deserialize_with = "lenient")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub port: Option<u16>,
    #[serde(default, deserialize_with = "lenient")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub servers: Vec<ServerSighting>,
}

impl PlayerRecord {
    /// Case-insensitive match on the name, or on the UUID with dashes ignored.
    fn matches(&self, identifier: &str) -> bool {
        if self
            .name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(identifier))
        {
            return true;
        }
        self.uuid
            .as_deref()
            .is_some_and(|uuid| normalize_uuid(uuid) == normalize_uuid(identifier))
    }
}

fn normalize_uuid(value: &str) -> String {
    value.replace('-', "").to_ascii_lowercase()
}

/// `/whereis` answers with either one player object or `{ "players": [...] }`.
fn whereis_candidates(body: Value) -> Vec<PlayerRecord> {
    match body {
        Value::Object(mut map) => match map.remove("players") {
            Some(Value::Array(players)) => players
                .into_iter()
                .filter_map(|p| serde_json::from_value(p).ok())
                .collect(),
            Some(_) => Vec::new(),
            None => serde_json::from_value(Value::Object(map))
                .map(|p| vec![p])
                .unwrap_or_default(),
        },
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerEndpoint {
    #[serde(default, deserialize_with = "lenient")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSighting {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WhoResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub server: Option<ServerEndpoint>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub players: Vec<PlayerSighting>,
}

/// `.` and `..` are dropped or collapsed by URL path normalization, so they
/// can never reach the upstream as a path segment.
fn routable(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

#[derive(Clone, Debug)]
pub struct McApi {
    client: reqwest::Client,
    base_url: Url,
}

impl McApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::BaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::BaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T, Q>(&self, segments: &[&str], query: Option<&Q>) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn get_required<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Option<&ServerQuery>,
    ) -> Result<T, ApiError> {
        self.get(segments, query)
            .await?
            .ok_or(ApiError::Status(StatusCode::NOT_FOUND))
    }

    /// One page (20 entries) of the filtered server list.
    pub async fn servers(&self, query: &ServerQuery) -> Result<ServerPage, ApiError> {
        self.get_required(&["servers"], Some(query)).await
    }

    pub async fn random_servers(&self) -> Result<Vec<ServerRecord>, ApiError> {
        let page: ServerPage = self.get_required(&["servers", "random"], None).await?;
        Ok(page.servers)
    }

    pub async fn total_servers(&self) -> Result<u64, ApiError> {
        let page: ServerPage = self.get_required(&["servers"], None).await?;
        Ok(page.total)
    }

    /// Looks up a player by name or UUID. Only an exact match is returned.
    pub async fn whereis(&self, identifier: &str) -> Result<Option<PlayerRecord>, ApiError> {
        if !routable(identifier) {
            debug!("Skipping whereis lookup for unroutable {:?}", identifier);
            return Ok(None);
        }

        let body: Option<Value> = self
            .get(&["whereis", identifier], None::<&ServerQuery>)
            .await?;

        Ok(body.and_then(|body| {
            whereis_candidates(body)
                .into_iter()
                .find(|p| p.matches(identifier))
        }))
    }

    pub async fn who(&self, server_ip: &str) -> Result<Option<WhoResponse>, ApiError> {
        if !routable(server_ip) {
            debug!("Skipping who lookup for unroutable {:?}", server_ip);
            return Ok(None);
        }
        self.get(&["who", server_ip], None::<&ServerQuery>).await
    }
}
