//! SOAP transport seam
//!
//! Envelope encoding, WSDL handling and object marshalling live behind the
//! [`SoapTransport`] trait. The client owns session gating, request metadata,
//! batching and the export pipeline, and only ever talks to the remote service
//! through this trait.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::types::{
    AmendResult, CallOptions, DeleteResult, LoginResult, ObjectType, QueryResult, SaveResult,
    SubscribeResult, ZObject,
};

/// Remote operations exposed by the Zuora SOAP API
///
/// Every call except `login` receives the [`CallOptions`] built for it by the
/// client: the endpoint to send to, the session header, and (for `query` /
/// `queryMore`) the query options. Implementations must not cache these
/// between calls.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use zuora_toolkit::{Config, SoapTransport, ZuoraClient};
///
/// # async fn example(transport: Arc<dyn SoapTransport>) -> zuora_toolkit::Result<()> {
/// let client = ZuoraClient::new(Config::with_credentials("api@example.com", "secret"), transport)?;
/// let accounts = client.query("SELECT Id FROM Account").await?;
/// println!("{} accounts", accounts.size);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Authenticate against `endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if the call itself fails. A response without a session
    /// token or server URL is reported by the client as an authentication error.
    async fn login(&self, endpoint: &Url, username: &str, password: &str) -> Result<LoginResult>;

    /// Run a ZOQL query
    async fn query(&self, options: &CallOptions, query: &str) -> Result<QueryResult>;

    /// Fetch the next batch of a query
    async fn query_more(&self, options: &CallOptions, query_locator: &str) -> Result<QueryResult>;

    /// Create objects; one result per object, in order
    async fn create(&self, options: &CallOptions, objects: Vec<ZObject>) -> Result<Vec<SaveResult>>;

    /// Update objects; one result per object, in order
    async fn update(&self, options: &CallOptions, objects: Vec<ZObject>) -> Result<Vec<SaveResult>>;

    /// Delete objects of one type by id; one result per id, in order
    async fn delete(
        &self,
        options: &CallOptions,
        object_type: &ObjectType,
        ids: Vec<String>,
    ) -> Result<Vec<DeleteResult>>;

    /// Apply amend requests; one result per request, in order
    async fn amend(&self, options: &CallOptions, requests: Vec<ZObject>) -> Result<Vec<AmendResult>>;

    /// Apply subscribe requests; one result per request, in order
    async fn subscribe(
        &self,
        options: &CallOptions,
        requests: Vec<ZObject>,
    ) -> Result<Vec<SubscribeResult>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str {
        "soap"
    }
}
