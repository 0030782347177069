//! HTTP transport for the remote list service.
//!
//! Each RPC method is a `POST {base_url}/{Method}` with a JSON body and HTTP
//! basic auth; responses arrive as `{"return": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{AuthError, TransportError};
use crate::service::{
    AddCsvQuery, AddRecordQuery, Authenticator, CreateListQuery, Credentials, ImportIdentifier,
    ListService, RecordResult, RpcReturn,
};

/// Logs in against `{base_url}/session` and hands out [`HttpListService`]s.
pub struct HttpAuthenticator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthenticator {
    /// Create an authenticator for the given service base URL.
    ///
    /// `base_url` should be like `https://lists.example.com/rpc` (a trailing
    /// slash is dropped). `timeout` bounds every request made by the client.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_request(&self, credentials: &Credentials) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/session", self.base_url))
            .query(&[("user", credentials.username.as_str())])
            .basic_auth(&credentials.username, Some(&credentials.password))
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    type Service = HttpListService;

    async fn authenticate(&self, credentials: &Credentials) -> Result<HttpListService, AuthError> {
        if credentials.username.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        info!(base_url = %self.base_url, user = %credentials.username, "authenticating");
        let resp = self
            .session_request(credentials)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(if body.is_empty() {
                status.to_string()
            } else {
                body
            }));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Server {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(HttpListService {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credentials: credentials.clone(),
        })
    }
}

/// Authenticated handle to the remote list service.
pub struct HttpListService {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpListService {
    async fn post<Q: Serialize + Sync>(
        &self,
        method: &str,
        query: &Q,
    ) -> Result<reqwest::Response, TransportError> {
        let url = format!("{}/{}", self.base_url, method);
        debug!(url = %url, "calling remote method");
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn call<Q: Serialize + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        query: &Q,
    ) -> Result<R, TransportError> {
        let resp = self.post(method, query).await?;
        let envelope: RpcReturn<R> = resp.json().await?;
        Ok(envelope.value)
    }
}

#[async_trait]
impl ListService for HttpListService {
    async fn add_record_to_list(
        &self,
        query: &AddRecordQuery,
    ) -> Result<RecordResult, TransportError> {
        self.call("AddRecordToList", query).await
    }

    async fn add_to_list_csv(
        &self,
        query: &AddCsvQuery,
    ) -> Result<ImportIdentifier, TransportError> {
        self.call("AddToListCsv", query).await
    }

    async fn create_list(&self, query: &CreateListQuery) -> Result<(), TransportError> {
        self.post("CreateList", query).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticator_trims_trailing_slash() {
        let auth =
            HttpAuthenticator::new("http://localhost:4000/".into(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(auth.base_url, "http://localhost:4000");
    }

    #[test]
    fn session_request_names_the_user() {
        let auth =
            HttpAuthenticator::new("http://localhost:4000/".into(), Duration::from_secs(5))
                .unwrap();
        let request = auth
            .session_request(&Credentials::new("agent 7", "secret"))
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/session");
        let user: Vec<_> = request
            .url()
            .query_pairs()
            .filter(|(k, _)| k == "user")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(user, vec!["agent 7".to_string()]);
        assert!(request.headers().contains_key(reqwest::header::AUTHORIZATION));
    }

    #[tokio::test]
    async fn empty_username_rejected_without_request() {
        let auth =
            HttpAuthenticator::new("http://localhost:4000".into(), Duration::from_secs(5))
                .unwrap();
        let result = auth.authenticate(&Credentials::new("", "secret")).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn import_identifier_from_envelope() {
        let body = r#"{"return": {"identifier": "b6f1c1e2"}}"#;
        let parsed: RpcReturn<ImportIdentifier> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.value.identifier, "b6f1c1e2");
    }

    #[test]
    fn create_list_query_wire_shape() {
        let query = CreateListQuery {
            list_name: "spring-campaign".into(),
        };
        assert_eq!(
            serde_json::to_string(&query).unwrap(),
            r#"{"listName":"spring-campaign"}"#
        );
    }
}
