use std::fmt;
use tokio::sync::RwLock;

use super::client::FamlyClient;
use super::error::FamlyError;
use super::sidebar::Child;

/// Account credentials, submitted only to the login mutation
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated session against Famly
///
/// Holds the bearer token in memory for the lifetime of the process. Concurrent
/// callers may race to refresh an expired token; the last successful login wins.
#[derive(Debug)]
pub struct Session {
    client: FamlyClient,
    credentials: Credentials,
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(client: FamlyClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            token: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &FamlyClient {
        &self.client
    }

    pub fn email(&self) -> &str {
        &self.credentials.email
    }

    /// Current token, if a login has succeeded
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Log in and store the new token, returning it
    pub async fn login(&self) -> Result<String, FamlyError> {
        let token = self
            .client
            .authenticate_with_password(&self.credentials.email, &self.credentials.password)
            .await?;

        *self.token.write().await = Some(token.clone());
        tracing::info!("Authenticated as {}", self.credentials.email);

        Ok(token)
    }

    /// Log in, reporting only success or failure
    ///
    /// Failures are logged. A previously held token is kept, so callers should
    /// treat it as possibly stale.
    pub async fn authenticate(&self) -> bool {
        match self.login().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Error during authentication: {}", e);
                false
            }
        }
    }

    /// Token held now, or a fresh one from logging in
    pub async fn token_or_login(&self) -> Result<String, FamlyError> {
        match self.token().await {
            Some(token) => Ok(token),
            None => self.login().await,
        }
    }

    /// Children listed in the account sidebar
    ///
    /// Requires a prior successful `authenticate`. Returns `None` without a token
    /// or on any request error.
    pub async fn fetch_children(&self) -> Option<Vec<Child>> {
        let result = match self.token().await {
            Some(token) => self.client.sidebar_children(&token).await,
            None => Err(FamlyError::NotAuthenticated),
        };

        match result {
            Ok(children) => {
                let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
                tracing::info!("Found {} children: {:?}", children.len(), names);
                Some(children)
            }
            Err(e) => {
                tracing::error!("Error fetching or parsing children list from sidebar: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::famly::{DEFAULT_BASE_URL, DEFAULT_DEVICE_ID};
    use crate::testing::{self, FakeFamly};
    use serde_json::json;

    fn session() -> Session {
        Session::new(
            FamlyClient::new(DEFAULT_BASE_URL, DEFAULT_DEVICE_ID).unwrap(),
            Credentials {
                email: "parent@example.com".to_string(),
                password: "hunter2".to_string(),
            },
        )
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials {
            email: "parent@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("parent@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn new_session_holds_no_token() {
        assert!(session().token().await.is_none());
    }

    #[tokio::test]
    async fn fetch_children_without_token_is_none() {
        assert!(session().fetch_children().await.is_none());
    }

    #[tokio::test]
    async fn authenticate_stores_token() {
        let fake = FakeFamly::default();
        let session = testing::session(&fake.clone().spawn().await);

        assert!(session.authenticate().await);
        assert_eq!(session.token().await.as_deref(), Some("token-1"));
        assert_eq!(fake.login_count(), 1);
    }

    #[tokio::test]
    async fn authenticate_reports_rejected_credentials() {
        let fake = FakeFamly {
            accepted_logins: Some(0),
            ..Default::default()
        };
        let session = testing::session(&fake.spawn().await);

        assert!(!session.authenticate().await);
        assert!(session.token().await.is_none());
    }

    #[tokio::test]
    async fn authenticate_reports_server_error() {
        let fake = FakeFamly {
            login_server_error: true,
            ..Default::default()
        };
        let session = testing::session(&fake.clone().spawn().await);

        assert!(!session.authenticate().await);
        assert!(session.token().await.is_none());
        assert_eq!(fake.login_count(), 1);

        let err = session.login().await.unwrap_err();
        assert!(matches!(
            err,
            FamlyError::Status { status, .. } if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn failed_reauthentication_keeps_previous_token() {
        let fake = FakeFamly {
            accepted_logins: Some(1),
            ..Default::default()
        };
        let session = testing::session(&fake.spawn().await);

        assert!(session.authenticate().await);
        assert!(!session.authenticate().await);
        assert_eq!(session.token().await.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn fetch_children_lists_child_items() {
        let fake = FakeFamly {
            sidebar: json!({
                "items": [
                    { "type": "Famly.Daycare:Child", "id": "c1", "title": "Alice" },
                    { "type": "Famly.Daycare:Institution", "id": "i1", "title": "Little Acorns" },
                ]
            }),
            ..Default::default()
        };
        let session = testing::session(&fake.spawn().await);

        assert!(session.authenticate().await);
        let children = session.fetch_children().await.unwrap();
        assert_eq!(
            children,
            vec![Child { id: "c1".to_string(), name: "Alice".to_string() }]
        );
    }

    #[tokio::test]
    async fn authenticate_against_unreachable_host_fails() {
        let session = testing::session("http://127.0.0.1:9");
        assert!(!session.authenticate().await);
    }
}
