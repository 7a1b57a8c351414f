//! Shared test helpers: a scripted in-memory SOAP transport and client builders.

use crate::client::ZuoraClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::transport::SoapTransport;
use crate::types::{
    AmendResult, CallOptions, DeleteResult, LoginResult, ObjectType, QueryResult, SaveResult,
    SubscribeResult, ZObject,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

type CreateHandler = Box<dyn Fn(&[ZObject]) -> Result<Vec<SaveResult>> + Send + Sync>;

/// Scripted transport recording every call it receives
pub(crate) struct MockTransport {
    login_result: std::result::Result<LoginResult, String>,
    logins: AtomicUsize,
    query_results: Mutex<VecDeque<Result<QueryResult>>>,
    queries: Mutex<Vec<(CallOptions, String)>>,
    create_handler: CreateHandler,
    create_delay: Option<Duration>,
    creates: Mutex<Vec<(CallOptions, Vec<ZObject>)>>,
    updates: Mutex<Vec<Vec<ZObject>>>,
    deletes: Mutex<Vec<(ObjectType, Vec<String>)>>,
    amends: AtomicUsize,
    subscribes: AtomicUsize,
}

impl MockTransport {
    pub(crate) const SESSION_TOKEN: &'static str = "LiUBQF-ugxg2jJuCA==";
    pub(crate) const SERVER_URL: &'static str = "https://apisandbox.zuora.com/apps/services/a/26.0";

    pub(crate) fn new() -> Self {
        Self {
            login_result: Ok(LoginResult {
                session: Some(Self::SESSION_TOKEN.to_string()),
                server_url: Some(Self::SERVER_URL.to_string()),
            }),
            logins: AtomicUsize::new(0),
            query_results: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            create_handler: Box::new(|objects| Ok(saved(objects.len()))),
            create_delay: None,
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            amends: AtomicUsize::new(0),
            subscribes: AtomicUsize::new(0),
        }
    }

    /// Log in to a different endpoint (e.g. a wiremock server)
    pub(crate) fn with_server_url(mut self, server_url: &str) -> Self {
        self.login_result = Ok(LoginResult {
            session: Some(Self::SESSION_TOKEN.to_string()),
            server_url: Some(server_url.to_string()),
        });
        self
    }

    pub(crate) fn with_login(mut self, result: LoginResult) -> Self {
        self.login_result = Ok(result);
        self
    }

    pub(crate) fn failing_login(mut self, message: &str) -> Self {
        self.login_result = Err(message.to_string());
        self
    }

    /// Results returned by successive `query` calls; once exhausted, queries
    /// return an empty not-done result
    pub(crate) fn with_query_results(self, results: Vec<Result<QueryResult>>) -> Self {
        *self.query_results.lock().unwrap() = results.into();
        self
    }

    pub(crate) fn with_create_handler(
        mut self,
        handler: impl Fn(&[ZObject]) -> Result<Vec<SaveResult>> + Send + Sync + 'static,
    ) -> Self {
        self.create_handler = Box::new(handler);
        self
    }

    pub(crate) fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub(crate) fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<(CallOptions, String)> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn creates(&self) -> Vec<(CallOptions, Vec<ZObject>)> {
        self.creates.lock().unwrap().clone()
    }

    pub(crate) fn updates(&self) -> Vec<Vec<ZObject>> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn deletes(&self) -> Vec<(ObjectType, Vec<String>)> {
        self.deletes.lock().unwrap().clone()
    }

    pub(crate) fn amend_count(&self) -> usize {
        self.amends.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SoapTransport for MockTransport {
    async fn login(&self, _endpoint: &Url, _username: &str, _password: &str) -> Result<LoginResult> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.login_result.clone().map_err(Error::Transport)
    }

    async fn query(&self, options: &CallOptions, query: &str) -> Result<QueryResult> {
        self.queries
            .lock()
            .unwrap()
            .push((options.clone(), query.to_string()));
        self.query_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::default()))
    }

    async fn query_more(&self, options: &CallOptions, query_locator: &str) -> Result<QueryResult> {
        self.query(options, query_locator).await
    }

    async fn create(&self, options: &CallOptions, objects: Vec<ZObject>) -> Result<Vec<SaveResult>> {
        self.creates
            .lock()
            .unwrap()
            .push((options.clone(), objects.clone()));
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        (self.create_handler)(&objects)
    }

    async fn update(&self, _options: &CallOptions, objects: Vec<ZObject>) -> Result<Vec<SaveResult>> {
        let count = objects.len();
        self.updates.lock().unwrap().push(objects);
        Ok(saved(count))
    }

    async fn delete(
        &self,
        _options: &CallOptions,
        object_type: &ObjectType,
        ids: Vec<String>,
    ) -> Result<Vec<DeleteResult>> {
        let results = ids
            .iter()
            .map(|id| DeleteResult {
                success: true,
                id: Some(id.clone()),
                errors: vec![],
            })
            .collect();
        self.deletes.lock().unwrap().push((object_type.clone(), ids));
        Ok(results)
    }

    async fn amend(&self, _options: &CallOptions, requests: Vec<ZObject>) -> Result<Vec<AmendResult>> {
        self.amends.fetch_add(1, Ordering::SeqCst);
        Ok(requests
            .iter()
            .map(|_| AmendResult {
                success: true,
                amendment_ids: vec!["amendment-1".to_string()],
                errors: vec![],
            })
            .collect())
    }

    async fn subscribe(
        &self,
        _options: &CallOptions,
        requests: Vec<ZObject>,
    ) -> Result<Vec<SubscribeResult>> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(requests
            .iter()
            .map(|_| SubscribeResult {
                success: true,
                account_id: Some("account-1".to_string()),
                subscription_id: Some("subscription-1".to_string()),
                errors: vec![],
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// `count` successful save results with ids `id-0`, `id-1`, ...
pub(crate) fn saved(count: usize) -> Vec<SaveResult> {
    (0..count)
        .map(|n| SaveResult {
            success: true,
            id: Some(format!("id-{n}")),
            errors: vec![],
        })
        .collect()
}

/// Config for tests: valid credentials, 5 second poll interval
pub(crate) fn test_config() -> Config {
    let mut config = Config::with_credentials("api@c.co", "Asdf1234!");
    config.export.poll_interval = Duration::from_secs(5);
    config
}

/// Client over the given mock; the mock is returned alongside for assertions
pub(crate) fn create_test_client(transport: MockTransport) -> (ZuoraClient, Arc<MockTransport>) {
    create_test_client_with_config(transport, test_config())
}

pub(crate) fn create_test_client_with_config(
    transport: MockTransport,
    config: Config,
) -> (ZuoraClient, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let client = ZuoraClient::new(config, transport.clone()).unwrap();
    (client, transport)
}

/// Export status record as returned by the status query
pub(crate) fn export_status(status: &str, file_id: Option<&str>) -> QueryResult {
    let mut record = ZObject::new(ObjectType::Export).with_field("Status", status);
    if let Some(file_id) = file_id {
        record.set("FileId", file_id);
    }
    QueryResult {
        done: true,
        size: 1,
        query_locator: None,
        records: vec![record],
    }
}
