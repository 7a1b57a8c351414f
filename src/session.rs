//! Session state and lazy re-authentication
//!
//! A session is trusted for a fixed lifetime after login. Expiry is only ever
//! checked, never acted on in the background: the dispatcher asks
//! [`SessionManager::login_required`] before each gated call.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::transport::SoapTransport;
use crate::types::{CallOptions, LoginResult, OperationKind, QueryOptions, SessionHeader};

/// An authenticated session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    server_url: Url,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Session token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Server URL returned at login
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// When the session stops being trusted
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the session is still trusted at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }

    /// `SessionHeader` for this session
    pub fn header(&self) -> SessionHeader {
        SessionHeader {
            session: self.token.clone(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("server_url", &self.server_url.as_str())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Owns the credentials, the current target endpoint and the session
pub struct SessionManager {
    credentials: Credentials,
    endpoint: Url,
    session_length: Duration,
    current: Option<Session>,
}

impl SessionManager {
    /// Create a manager with no session
    pub fn new(credentials: Credentials, endpoint: Url, session_length: Duration) -> Self {
        Self {
            credentials,
            endpoint,
            session_length,
            current: None,
        }
    }

    /// True if there is no session or it has expired
    pub fn login_required(&self) -> bool {
        self.login_required_at(Utc::now())
    }

    /// True if there is no session or it is expired at `now`
    pub fn login_required_at(&self, now: DateTime<Utc>) -> bool {
        self.current
            .as_ref()
            .is_none_or(|session| !session.is_valid_at(now))
    }

    /// Current session, expired or not
    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Endpoint calls are currently sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Configured session lifetime
    pub fn session_length(&self) -> Duration {
        self.session_length
    }

    /// Change the session lifetime; applies from the next login
    pub fn set_session_length(&mut self, session_length: Duration) -> Result<()> {
        if session_length.is_zero() {
            return Err(Error::validation(
                "session_length",
                "session length must be greater than zero",
            ));
        }
        self.session_length = session_length;
        Ok(())
    }

    /// Log in and replace the session
    ///
    /// On success the endpoint switches to the server URL returned by the
    /// service and the session expires `session_length` from now. On failure
    /// the previous session and endpoint are left untouched.
    pub async fn login(&mut self, transport: &dyn SoapTransport) -> Result<LoginResult> {
        let result = transport
            .login(
                &self.endpoint,
                &self.credentials.username,
                &self.credentials.password,
            )
            .await
            .map_err(|e| match e {
                Error::Authentication(_) => e,
                other => Error::Authentication(format!("login call failed: {other}")),
            })?;

        let token = result
            .session
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Authentication("login response has no session".to_string()))?;
        let server_url = result
            .server_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                Error::Authentication("login response has no server URL".to_string())
            })?;
        let server_url = Url::parse(server_url).map_err(|e| {
            Error::Authentication(format!("login returned invalid server URL {server_url}: {e}"))
        })?;

        let lifetime = chrono::Duration::from_std(self.session_length)
            .map_err(|e| Error::validation("session_length", e.to_string()))?;
        let expires_at = Utc::now() + lifetime;

        info!(
            transport = transport.name(),
            endpoint = %server_url,
            expires_at = %expires_at,
            "logged in"
        );

        if server_url != self.endpoint {
            info!(from = %self.endpoint, to = %server_url, "switching endpoint");
        }
        self.endpoint = server_url.clone();
        self.current = Some(Session {
            token: token.to_string(),
            server_url,
            expires_at,
        });

        Ok(result)
    }

    /// Request metadata for one call
    ///
    /// Every call carries the session header; `query` and `queryMore` also carry
    /// query options with `query_batch_size`.
    pub fn call_options(&self, kind: OperationKind, query_batch_size: u32) -> Result<CallOptions> {
        let session = self.current.as_ref().ok_or_else(|| {
            warn!(operation = kind.method_name(), "call attempted without a session");
            Error::Authentication(format!("no session for {}", kind.method_name()))
        })?;

        Ok(CallOptions {
            endpoint: self.endpoint.clone(),
            session: session.header(),
            query_options: kind.uses_query_options().then_some(QueryOptions {
                batch_size: query_batch_size,
            }),
        })
    }
}
