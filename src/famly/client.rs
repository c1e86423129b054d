use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::{Host, Url};

use super::error::FamlyError;
use super::sidebar::{Child, parse_children};

/// Production API host
pub const DEFAULT_BASE_URL: &str = "https://app.famly.co";

/// Device identifier sent with the login mutation
pub const DEFAULT_DEVICE_ID: &str = "8858035b-b514-4a7e-b2e1-5e73059425ae";

/// Header carrying the access token on REST calls
pub const ACCESS_TOKEN_HEADER: &str = "x-famly-accesstoken";

const AUTH_PATH: &str = "/graphql";
const SIDEBAR_PATH: &str = "/api/v2/sidebar";
const CALENDAR_PATH: &str = "/api/v2/calendar";

const AUTHENTICATE_MUTATION: &str = "mutation Authenticate($email: EmailAddress!, $password: Password!) \
     { me { authenticateWithPassword(email: $email, password: $password) \
     { ... on AuthenticationSucceeded { accessToken } } } }";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    operation_name: &'a str,
    variables: AuthVariables<'a>,
    query: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthVariables<'a> {
    email: &'a str,
    password: &'a str,
    device_id: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AuthResponse {
    data: Option<AuthData>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AuthData {
    me: Option<AuthMe>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct AuthMe {
    authenticate_with_password: Option<Value>,
}

/// Thin HTTP client for the three Famly endpoints we use
#[derive(Debug, Clone)]
pub struct FamlyClient {
    client: Client,
    base_url: Url,
    device_id: String,
}

impl FamlyClient {
    /// Create a new client against `base_url`
    ///
    /// HTTPS is required unless the host is loopback.
    pub fn new(base_url: &str, device_id: &str) -> Result<Self, FamlyError> {
        let base_url = validate_base_url(base_url)?;

        let client = Client::builder()
            .user_agent(format!("famly-presence/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .https_only(base_url.scheme() == "https")
            .build()?;

        Ok(Self {
            client,
            base_url,
            device_id: device_id.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, FamlyError> {
        self.base_url
            .join(path)
            .map_err(|e| FamlyError::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))
    }

    /// Log in with email and password, returning the access token
    pub async fn authenticate_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<String, FamlyError> {
        let mut url = self.endpoint(AUTH_PATH)?;
        url.set_query(Some("Authenticate=null"));

        let request = AuthRequest {
            operation_name: "Authenticate",
            variables: AuthVariables {
                email,
                password,
                device_id: &self.device_id,
            },
            query: AUTHENTICATE_MUTATION,
        };

        tracing::debug!("Authenticating against {}", url);

        let response = self.client.post(url).json(&request).send().await?;
        let response = ensure_success(response, AUTH_PATH)?;
        let body: AuthResponse = response.json().await?;

        let result = body
            .data
            .and_then(|data| data.me)
            .and_then(|me| me.authenticate_with_password)
            .unwrap_or(Value::Null);

        match result.get("accessToken").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(FamlyError::Authentication(format!(
                "no access token in response: {}",
                result
            ))),
        }
    }

    /// List the children visible to this account
    pub async fn sidebar_children(&self, token: &str) -> Result<Vec<Child>, FamlyError> {
        let url = self.endpoint(SIDEBAR_PATH)?;

        tracing::debug!("Fetching sidebar data to find children");

        let response = self
            .client
            .get(url)
            .header(ACCESS_TOKEN_HEADER, token)
            .send()
            .await?;
        let response = ensure_success(response, SIDEBAR_PATH)?;
        let payload: Value = response.json().await?;

        Ok(parse_children(&payload))
    }

    /// Fetch one day of calendar data for a child
    ///
    /// Returns `FamlyError::Unauthorized` on 401 so the caller can refresh the token.
    /// An empty body is returned as `Value::Null`.
    pub async fn calendar(
        &self,
        token: &str,
        child_id: &str,
        day: NaiveDate,
    ) -> Result<Value, FamlyError> {
        let url = self.endpoint(CALENDAR_PATH)?;
        let day = day.format("%Y-%m-%d").to_string();

        tracing::debug!("Fetching calendar for child {} on {}", child_id, day);

        let response = self
            .client
            .get(url)
            .query(&[
                ("type", "RANGE"),
                ("day", day.as_str()),
                ("to", day.as_str()),
                ("childId", child_id),
            ])
            .header(ACCESS_TOKEN_HEADER, token)
            .send()
            .await?;
        let response = ensure_success(response, CALENDAR_PATH)?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Map non-2xx responses to errors, 401 to `Unauthorized`
fn ensure_success(response: Response, endpoint: &str) -> Result<Response, FamlyError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(FamlyError::Unauthorized),
        status if status.is_success() => Ok(response),
        status => Err(FamlyError::Status {
            status,
            endpoint: endpoint.to_string(),
        }),
    }
}

/// Parse and check a base URL: HTTPS, or plain HTTP to a loopback host
pub fn validate_base_url(raw: &str) -> Result<Url, FamlyError> {
    let url = Url::parse(raw).map_err(|e| FamlyError::InvalidUrl(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => Err(FamlyError::InvalidUrl(format!(
            "{} must use HTTPS (got: {})",
            raw, scheme
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
