//! Common test utilities for zuora-toolkit integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;
use zuora_toolkit::{
    AmendResult, CallOptions, Config, DeleteResult, LoginResult, ObjectType, QueryResult,
    Result, SaveResult, SoapTransport, SubscribeResult, ZObject,
};

pub const SESSION_TOKEN: &str = "integration-session";

/// In-memory stand-in for a Zuora tenant
///
/// Created objects are stored by type. Export jobs report `Processing` for a
/// fixed number of polls and then `Completed` with a file id.
pub struct FakeTenant {
    server_url: String,
    polls_until_complete: usize,
    polls: AtomicUsize,
    logins: AtomicUsize,
    next_id: AtomicUsize,
    objects: Mutex<BTreeMap<String, Vec<ZObject>>>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FakeTenant {
    pub fn new(server_url: impl Into<String>, polls_until_complete: usize) -> Self {
        Self {
            server_url: server_url.into(),
            polls_until_complete,
            polls: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
            objects: Mutex::new(BTreeMap::new()),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn file_id() -> &'static str {
        "2c92a0fd55a0b9a2"
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, object_type: &ObjectType) -> Vec<ZObject> {
        self.objects
            .lock()
            .unwrap()
            .get(object_type.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn export_status(&self) -> QueryResult {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut record = ZObject::new(ObjectType::Export);
        if polls > self.polls_until_complete {
            record.set("Status", "Completed");
            record.set("FileId", Self::file_id());
        } else {
            record.set("Status", "Processing");
        }
        QueryResult {
            done: true,
            size: 1,
            query_locator: None,
            records: vec![record],
        }
    }

    fn save(&self, objects: Vec<ZObject>) -> Vec<SaveResult> {
        self.batch_sizes.lock().unwrap().push(objects.len());
        let mut stored = self.objects.lock().unwrap();
        objects
            .into_iter()
            .map(|mut object| {
                let id = format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
                object.set("Id", id.as_str());
                stored
                    .entry(object.object_type.to_string())
                    .or_default()
                    .push(object);
                SaveResult {
                    success: true,
                    id: Some(id),
                    errors: vec![],
                }
            })
            .collect()
    }
}

#[async_trait]
impl SoapTransport for FakeTenant {
    async fn login(&self, _endpoint: &Url, username: &str, _password: &str) -> Result<LoginResult> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if username.is_empty() {
            return Ok(LoginResult::default());
        }
        Ok(LoginResult {
            session: Some(SESSION_TOKEN.to_string()),
            server_url: Some(self.server_url.clone()),
        })
    }

    async fn query(&self, _options: &CallOptions, query: &str) -> Result<QueryResult> {
        if query.contains("FROM Export") {
            return Ok(self.export_status());
        }
        let object = query
            .split(" FROM ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or_default();
        let records = self.stored(&ObjectType::from(object));
        Ok(QueryResult {
            done: true,
            size: records.len(),
            query_locator: None,
            records,
        })
    }

    async fn query_more(&self, _options: &CallOptions, _locator: &str) -> Result<QueryResult> {
        Ok(QueryResult {
            done: true,
            ..Default::default()
        })
    }

    async fn create(&self, _options: &CallOptions, objects: Vec<ZObject>) -> Result<Vec<SaveResult>> {
        Ok(self.save(objects))
    }

    async fn update(&self, _options: &CallOptions, objects: Vec<ZObject>) -> Result<Vec<SaveResult>> {
        Ok(objects
            .iter()
            .map(|o| SaveResult {
                success: true,
                id: o.id().map(str::to_string),
                errors: vec![],
            })
            .collect())
    }

    async fn delete(
        &self,
        _options: &CallOptions,
        _object_type: &ObjectType,
        ids: Vec<String>,
    ) -> Result<Vec<DeleteResult>> {
        Ok(ids
            .into_iter()
            .map(|id| DeleteResult {
                success: true,
                id: Some(id),
                errors: vec![],
            })
            .collect())
    }

    async fn amend(&self, _options: &CallOptions, requests: Vec<ZObject>) -> Result<Vec<AmendResult>> {
        Ok(requests.iter().map(|_| AmendResult::default()).collect())
    }

    async fn subscribe(
        &self,
        _options: &CallOptions,
        requests: Vec<ZObject>,
    ) -> Result<Vec<SubscribeResult>> {
        Ok(requests.iter().map(|_| SubscribeResult::default()).collect())
    }

    fn name(&self) -> &'static str {
        "fake-tenant"
    }
}

/// Config with fast polling for integration tests
pub fn test_config() -> Config {
    let mut config = Config::with_credentials("integration@example.com", "secret");
    config.export.poll_interval = std::time::Duration::from_millis(10);
    config.export.max_tries = Some(20);
    config
}
