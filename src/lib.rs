//! # zuora-toolkit
//!
//! Client library for the Zuora billing SOAP API.
//!
//! ## Design Philosophy
//!
//! zuora-toolkit is designed to be:
//! - **Transport-agnostic** - SOAP encoding lives behind the [`SoapTransport`] trait
//! - **Lazy about sessions** - Every call logs in first only when the session is missing or expired
//! - **Explicit about partial failure** - Split batches report an outcome per item
//! - **Library-first** - No CLI, no logging subscriber; embed it and bring your own
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use zuora_toolkit::{Config, DownloadTarget, SoapTransport, ZuoraClient};
//! use zuora_toolkit::export::ExportRequest;
//!
//! # async fn example(transport: Arc<dyn SoapTransport>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = ZuoraClient::new(Config::with_credentials("api@example.com", "secret"), transport)?;
//! client.set_batch_size(8, 25)?;
//!
//! let accounts = client
//!     .retrieve("Account", &["Name", "Balance"], &["2c92c0f8", "2c92c0f9"])
//!     .await?;
//! println!("{} accounts", accounts.size);
//!
//! let file_id = client
//!     .export(ExportRequest::new("Invoice", ["Id", "Amount"]).max_tries(60))
//!     .await?;
//! client
//!     .download(&file_id, DownloadTarget::persist("invoices"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch size limits and sub-batch dispatch
pub mod batch;
/// API client (decomposed into focused submodules)
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export jobs, file URLs, persisting and parsing
pub mod export;
/// ZOQL query generation
pub mod query;
/// Session state and expiry
pub mod session;
/// SOAP transport seam
pub mod transport;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use batch::{BatchResult, BatchSizes, ItemOutcome, QueryBatchSize};
pub use client::{DownloadTarget, Downloaded, FatalErrorHook, ZuoraClient};
pub use config::{Config, Credentials};
pub use error::{DownloadError, Error, Result};
pub use export::{ExportRequest, ExportedRecordSet, PersistedExport};
pub use query::LogicalOperator;
pub use session::{Session, SessionManager};
pub use transport::SoapTransport;
pub use types::{
    AmendResult, CallOptions, DeleteResult, ExportId, FileId, LoginResult, ObjectType,
    OperationKind, QueryOptions, QueryResult, SaveResult, SessionHeader, SubscribeResult,
    ZObject, ZuoraFault,
};
