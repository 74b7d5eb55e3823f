//! Authenticated request dispatch
//!
//! [`Dispatcher::request`] executes one logical request: it attaches the
//! bearer token, normalizes failures, and on a 401 refreshes the token pair
//! (single-flight) and re-issues the request exactly once.

use crate::error::{ClientError, Result};
use crate::refresh::RefreshCoordinator;
use crate::token_store::{TokenPair, TokenStore};
use crate::types::{RefreshRequest, TokenResponse};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Token refresh endpoint, relative to the API prefix
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Everything needed to issue one request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    path: String,
    method: Method,
    headers: HeaderMap,
    body: Option<Value>,
    requires_auth: bool,
    allow_retry_after_refresh: bool,
}

impl RequestDescriptor {
    /// Authenticated request with retry-after-refresh enabled
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: HeaderMap::new(),
            body: None,
            requires_auth: true,
            allow_retry_after_refresh: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns an encode error if `body` cannot be serialized
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let body = serde_json::to_value(body).map_err(|e| ClientError::encode(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send without credentials, even if a session exists
    pub fn unauthenticated(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Do not refresh and retry on a 401
    pub fn without_retry(mut self) -> Self {
        self.allow_retry_after_refresh = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub const fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub const fn allow_retry_after_refresh(&self) -> bool {
        self.allow_retry_after_refresh
    }
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// 2xx with a JSON body
    Json { status: u16, body: Value },
    /// 204
    NoContent,
}

impl ApiResponse {
    pub const fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    /// The JSON body, if there is one
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json { body, .. } => Some(body),
            Self::NoContent => None,
        }
    }

    /// Deserialize the body. `NoContent` only decodes into types that accept
    /// null, such as `()` or `Option<T>`.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body does not match `T`
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json { status, body } => {
                serde_json::from_value(body).map_err(|e| ClientError::decode(status, &e))
            }
            Self::NoContent => serde_json::from_value(Value::Null)
                .map_err(|e| ClientError::decode(StatusCode::NO_CONTENT.as_u16(), &e)),
        }
    }
}

/// Undecoded success body, with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Executes requests against the backend API on behalf of one session
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: Client,
    origin: String,
    api_base: String,
    tokens: TokenStore,
    refresher: RefreshCoordinator,
}

impl Dispatcher {
    /// `origin` is the scheme/host part, `api_prefix` the path all API routes
    /// live under (e.g. `/api/v1`)
    pub fn new(http: Client, origin: &str, api_prefix: &str, tokens: TokenStore) -> Self {
        let origin = origin.trim_end_matches('/').to_string();
        let api_base = format!("{origin}{}", api_prefix.trim_end_matches('/'));
        Self {
            http,
            origin,
            api_base,
            tokens,
            refresher: RefreshCoordinator::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub const fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    pub(crate) const fn http(&self) -> &Client {
        &self.http
    }

    /// Absolute URL of an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Execute a request, refreshing the session and retrying once on a 401
    ///
    /// # Errors
    ///
    /// Returns the normalized failure. When the refresh itself fails, the
    /// original 401 is returned and the session is cleared.
    #[instrument(skip_all, fields(method = %descriptor.method(), path = descriptor.path()))]
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse> {
        let response = self.execute(descriptor).await?;
        Self::into_result(response).await
    }

    /// Like [`request`](Self::request), but hands back the body undecoded
    ///
    /// Used for streamed exports (NDJSON, CSV) that are not a single JSON
    /// document.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    #[instrument(skip_all, fields(method = %descriptor.method(), path = descriptor.path()))]
    pub async fn request_raw(&self, descriptor: &RequestDescriptor) -> Result<RawResponse> {
        let response = self.execute(descriptor).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| ClientError::network(&e))?;
        Ok(RawResponse {
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }

    /// [`request`](Self::request) followed by deserialization of the body
    ///
    /// # Errors
    ///
    /// Returns the request failure, or a decode error if the body does not
    /// match `T`
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T> {
        self.request(descriptor).await?.parse()
    }

    /// Send a multipart body to an API path
    ///
    /// Carries the bearer token when one exists but makes a single attempt:
    /// a 401 is returned as-is without a refresh.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    #[instrument(skip_all, fields(path = path))]
    pub async fn upload(&self, path: &str, form: Form) -> Result<ApiResponse> {
        let mut request = self.http.post(self.url(path)).multipart(form);
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| ClientError::network(&e))?;
        debug!(status = response.status().as_u16(), "Upload completed");
        Self::into_result(response).await
    }

    /// Exchange the refresh token for a new pair, joining any refresh that is
    /// already in flight
    ///
    /// On success the store holds the new pair; on failure it is cleared.
    /// Either update only applies if the store still holds the refresh token
    /// the exchange started from, so a logout during the exchange sticks.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure, which every concurrent caller shares
    pub async fn refresh_tokens(&self) -> Result<TokenPair> {
        let http = self.http.clone();
        let url = self.url(REFRESH_PATH);
        let tokens = self.tokens.clone();

        self.refresher
            .run(move || async move {
                let Some(refresh_token) = tokens.refresh_token() else {
                    return Err(ClientError::auth_expired("No refresh token available"));
                };

                match exchange_refresh_token(&http, &url, refresh_token.clone()).await {
                    Ok(pair) => {
                        if tokens.replace_if_refresh(&refresh_token, pair.clone()) {
                            Ok(pair)
                        } else {
                            // Logged out (or logged in again) while the exchange ran
                            debug!("Session changed during token refresh, discarding new pair");
                            Err(ClientError::auth_expired("Session ended during token refresh"))
                        }
                    }
                    Err(err) => {
                        tokens.clear_if_refresh(&refresh_token);
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Send once, and on a recoverable 401 refresh and send the retry
    /// variant. The returned response has not been checked for success.
    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Response> {
        let response = self.send(descriptor).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && descriptor.requires_auth()
            && descriptor.allow_retry_after_refresh()
            && self.tokens.refresh_token().is_some()
        {
            let unauthorized = ClientError::from_response(response).await;
            debug!("Access token rejected, refreshing session");

            if let Err(err) = self.refresh_tokens().await {
                warn!(error = %err, "Token refresh failed, session terminated");
                return Err(unauthorized);
            }

            let retry = descriptor.clone().without_retry();
            return self.send(&retry).await;
        }

        Ok(response)
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<Response> {
        let mut request = self
            .http
            .request(descriptor.method().clone(), self.url(descriptor.path()))
            .header(header::CONTENT_TYPE, "application/json")
            .headers(descriptor.headers().clone());

        if descriptor.requires_auth() {
            if let Some(token) = self.tokens.get() {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = descriptor.body() {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response was received");
            ClientError::network(&e)
        })?;
        debug!(status = response.status().as_u16(), "Response received");
        Ok(response)
    }

    /// Turn a response into the success marker/body or a normalized error
    pub(crate) async fn into_result(response: Response) -> Result<ApiResponse> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(ApiResponse::NoContent);
        }
        if !status.is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let bytes = response.bytes().await.map_err(|e| ClientError::network(&e))?;
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::decode(status.as_u16(), &e))?;
        Ok(ApiResponse::Json {
            status: status.as_u16(),
            body,
        })
    }
}

#[instrument(skip_all)]
async fn exchange_refresh_token(
    http: &Client,
    url: &str,
    refresh_token: String,
) -> Result<TokenPair> {
    let response = http
        .post(url)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|e| ClientError::network(&e))?;

    let tokens: TokenResponse = Dispatcher::into_result(response).await?.parse()?;
    debug!("Token pair refreshed");
    Ok(tokens.into())
}
