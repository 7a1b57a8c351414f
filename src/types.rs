//! Core types for zuora-toolkit
//!
//! These are the values exchanged with the [`SoapTransport`](crate::transport::SoapTransport):
//! generic `ZObject` payloads, typed results, and the per-call request metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Namespace used to qualify object types that collide with SOAP header types
pub const OBJECT_NAMESPACE: &str = "http://object.api.zuora.com/";

/// Identifier of a file produced by a completed export
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    /// Create a new FileId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote identifier of an export job
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(pub String);

impl From<String> for ExportId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ExportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known Zuora object types
///
/// Unknown names are kept verbatim in [`ObjectType::Custom`], so any object the
/// tenant exposes can still be built and queried.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    /// Customer account
    Account,
    /// Subscription amendment
    Amendment,
    /// Bill-to / sold-to contact
    Contact,
    /// Asynchronous data export job
    Export,
    /// Invoice
    Invoice,
    /// Invoice line item
    InvoiceItem,
    /// Payment
    Payment,
    /// Payment method attached to an account
    PaymentMethod,
    /// Catalog product
    Product,
    /// Catalog product rate plan
    ProductRatePlan,
    /// Catalog product rate plan charge
    ProductRatePlanCharge,
    /// Subscription rate plan
    RatePlan,
    /// Subscription rate plan charge
    RatePlanCharge,
    /// Subscription
    Subscription,
    /// Usage record
    Usage,
    /// Any other object type, by name
    Custom(String),
}

impl ObjectType {
    /// The object name as used in ZOQL and SOAP payloads
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Account => "Account",
            ObjectType::Amendment => "Amendment",
            ObjectType::Contact => "Contact",
            ObjectType::Export => "Export",
            ObjectType::Invoice => "Invoice",
            ObjectType::InvoiceItem => "InvoiceItem",
            ObjectType::Payment => "Payment",
            ObjectType::PaymentMethod => "PaymentMethod",
            ObjectType::Product => "Product",
            ObjectType::ProductRatePlan => "ProductRatePlan",
            ObjectType::ProductRatePlanCharge => "ProductRatePlanCharge",
            ObjectType::RatePlan => "RatePlan",
            ObjectType::RatePlanCharge => "RatePlanCharge",
            ObjectType::Subscription => "Subscription",
            ObjectType::Usage => "Usage",
            ObjectType::Custom(name) => name,
        }
    }

    /// Name qualified with the object namespace where the bare name is ambiguous
    ///
    /// `Contact` and `RatePlanCharge` share their names with other schema types
    /// and must be addressed as `{http://object.api.zuora.com/}Name`.
    pub fn qualified_name(&self) -> String {
        match self {
            ObjectType::Contact | ObjectType::RatePlanCharge => {
                format!("{{{}}}{}", OBJECT_NAMESPACE, self.as_str())
            }
            _ => self.as_str().to_string(),
        }
    }
}

impl From<&str> for ObjectType {
    fn from(name: &str) -> Self {
        match name {
            "Account" => ObjectType::Account,
            "Amendment" => ObjectType::Amendment,
            "Contact" => ObjectType::Contact,
            "Export" => ObjectType::Export,
            "Invoice" => ObjectType::Invoice,
            "InvoiceItem" => ObjectType::InvoiceItem,
            "Payment" => ObjectType::Payment,
            "PaymentMethod" => ObjectType::PaymentMethod,
            "Product" => ObjectType::Product,
            "ProductRatePlan" => ObjectType::ProductRatePlan,
            "ProductRatePlanCharge" => ObjectType::ProductRatePlanCharge,
            "RatePlan" => ObjectType::RatePlan,
            "RatePlanCharge" => ObjectType::RatePlanCharge,
            "Subscription" => ObjectType::Subscription,
            "Usage" => ObjectType::Usage,
            other => ObjectType::Custom(other.to_string()),
        }
    }
}

impl From<String> for ObjectType {
    fn from(name: String) -> Self {
        ObjectType::from(name.as_str())
    }
}

impl From<ObjectType> for String {
    fn from(object_type: ObjectType) -> Self {
        object_type.as_str().to_string()
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic Zuora object payload
///
/// Field names follow the API's casing (`AccountNumber`, `FileId`, ...). Lookups
/// through [`ZObject::get`] fall back to a case-insensitive match because query
/// results do not always echo the casing used in the select list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZObject {
    /// The object's type
    pub object_type: ObjectType,
    /// Field values keyed by field name
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl ZObject {
    /// Create an empty object of the given type
    pub fn new(object_type: impl Into<ObjectType>) -> Self {
        Self {
            object_type: object_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field value, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Get a field value as a string slice
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The object's `Id` field, if set
    pub fn id(&self) -> Option<&str> {
        self.get_str("Id")
    }
}

/// Result of the `login` call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    /// Session token; absent or empty means the login did not establish a session
    pub session: Option<String>,
    /// Server URL to direct subsequent calls to
    pub server_url: Option<String>,
}

/// Result of `query` / `queryMore`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Whether this is the last batch of records
    pub done: bool,
    /// Total number of records matched by the query
    pub size: usize,
    /// Locator to pass to `queryMore` when `done` is false
    pub query_locator: Option<String>,
    /// Records in this batch
    #[serde(default)]
    pub records: Vec<ZObject>,
}

/// Error entry returned by the API for a failed item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZuoraFault {
    /// API error code (e.g., "INVALID_VALUE")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl std::fmt::Display for ZuoraFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Per-item result of `create` / `update` / `delete`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Whether the item was saved
    pub success: bool,
    /// Id of the created/updated/deleted object
    pub id: Option<String>,
    /// Errors reported for this item
    #[serde(default)]
    pub errors: Vec<ZuoraFault>,
}

/// Per-item result of `delete` (same shape as [`SaveResult`])
pub type DeleteResult = SaveResult;

/// Per-request result of `amend`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AmendResult {
    /// Whether the amendment was applied
    pub success: bool,
    /// Ids of the created amendments
    #[serde(default)]
    pub amendment_ids: Vec<String>,
    /// Errors reported for this request
    #[serde(default)]
    pub errors: Vec<ZuoraFault>,
}

/// Per-request result of `subscribe`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeResult {
    /// Whether the subscription was created
    pub success: bool,
    /// Account the subscription belongs to
    pub account_id: Option<String>,
    /// Id of the created subscription
    pub subscription_id: Option<String>,
    /// Errors reported for this request
    #[serde(default)]
    pub errors: Vec<ZuoraFault>,
}

/// Remote operations the dispatcher knows how to gate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `query`
    Query,
    /// `queryMore`
    QueryMore,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
    /// `amend`
    Amend,
    /// `subscribe`
    Subscribe,
    /// Authenticated export file download (HTTP, not SOAP)
    Download,
}

impl OperationKind {
    /// SOAP method name
    pub fn method_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::QueryMore => "queryMore",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Amend => "amend",
            OperationKind::Subscribe => "subscribe",
            OperationKind::Download => "download",
        }
    }

    /// Whether the call carries `QueryOptions`
    pub fn uses_query_options(&self) -> bool {
        matches!(self, OperationKind::Query | OperationKind::QueryMore)
    }
}

/// `SessionHeader` SOAP header
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    /// Session token
    pub session: String,
}

impl std::fmt::Debug for SessionHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHeader")
            .field("session", &"<redacted>")
            .finish()
    }
}

/// `QueryOptions` SOAP header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Number of records returned per batch
    pub batch_size: u32,
}

/// Request metadata for a single remote call
///
/// Built fresh for every call from the session state, so concurrent calls never
/// share mutable header state.
#[derive(Clone, Debug, PartialEq)]
pub struct CallOptions {
    /// Endpoint the call is sent to
    pub endpoint: Url,
    /// Session credential attached to every call
    pub session: SessionHeader,
    /// Present only for `query` / `queryMore`
    pub query_options: Option<QueryOptions>,
}
