//! Session gating for remote calls

use std::future::Future;
use tracing::{debug, error};

use super::ZuoraClient;
use crate::error::Result;
use crate::types::{CallOptions, LoginResult, OperationKind};

impl ZuoraClient {
    /// Log in now, replacing any current session
    ///
    /// Normally unnecessary: gated calls log in on demand.
    pub async fn login(&self) -> Result<LoginResult> {
        let mut session = self.session.lock().await;
        session.login(self.transport.as_ref()).await
    }

    /// True if there is no session or it has expired
    pub async fn login_required(&self) -> bool {
        self.session.lock().await.login_required()
    }

    /// Ensure a session and snapshot the request metadata for one call
    ///
    /// Both steps happen under the session lock, so a concurrent call can
    /// never observe a half-updated session.
    pub(crate) async fn call_options(&self, kind: OperationKind) -> Result<CallOptions> {
        let mut session = self.session.lock().await;

        if session.login_required() {
            debug!(operation = kind.method_name(), "session missing or expired, logging in");
            if let Err(e) = session.login(self.transport.as_ref()).await {
                error!(
                    operation = kind.method_name(),
                    error = %e,
                    "login failed, call not sent"
                );
                return Err(e);
            }
        }

        session.call_options(kind, self.limits.query_batch_size.get())
    }

    /// Run `operation` with a valid session
    ///
    /// Logs in first if required. If that login fails, `operation` is never
    /// invoked and the authentication error is returned.
    pub async fn dispatch<T, F, Fut>(&self, kind: OperationKind, operation: F) -> Result<T>
    where
        F: FnOnce(CallOptions) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let options = self.call_options(kind).await?;
        debug!(
            operation = kind.method_name(),
            endpoint = %options.endpoint,
            "dispatching call"
        );
        operation(options).await
    }
}
