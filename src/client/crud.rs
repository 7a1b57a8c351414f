//! Query and object operations - query, retrieve, create/update/delete, amend, subscribe.

use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::ZuoraClient;
use crate::batch::{BatchResult, dispatch_batches};
use crate::error::{Error, Result};
use crate::query::{LogicalOperator, generate_search_conditions, generate_select_list, select_statement};
use crate::transport::SoapTransport;
use crate::types::{
    AmendResult, CallOptions, DeleteResult, ObjectType, OperationKind, QueryResult, SaveResult,
    SubscribeResult, ZObject,
};

impl ZuoraClient {
    /// Run a ZOQL query
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use zuora_toolkit::ZuoraClient;
    /// # async fn example(client: &ZuoraClient) -> zuora_toolkit::Result<()> {
    /// let result = client
    ///     .query("SELECT Id, Name FROM Account WHERE Status = 'Active'")
    ///     .await?;
    /// for account in &result.records {
    ///     println!("{:?}", account.get_str("Name"));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn query(&self, query: &str) -> Result<QueryResult> {
        let transport = &self.transport;
        self.dispatch(OperationKind::Query, |options| async move {
            transport.query(&options, query).await
        })
        .await
    }

    /// Fetch the next batch of a query that was not `done`
    pub async fn query_more(&self, query_locator: &str) -> Result<QueryResult> {
        let transport = &self.transport;
        self.dispatch(OperationKind::QueryMore, |options| async move {
            transport.query_more(&options, query_locator).await
        })
        .await
    }

    /// Fetch `fields` of the objects with the given ids
    ///
    /// `Id` is always selected.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty object type or id list.
    pub async fn retrieve<F, I>(
        &self,
        object_type: impl Into<ObjectType>,
        fields: &[F],
        ids: &[I],
    ) -> Result<QueryResult>
    where
        F: AsRef<str>,
        I: AsRef<str>,
    {
        let object_type = object_type.into();
        if object_type.as_str().trim().is_empty() {
            return Err(Error::validation("object_type", "object type must not be empty"));
        }
        if ids.is_empty() {
            return Err(Error::validation("ids", "at least one id is required"));
        }

        let query = select_statement(
            &generate_select_list(fields),
            &object_type,
            &generate_search_conditions(ids, LogicalOperator::Or),
        );
        self.query(&query).await
    }

    /// Create objects, splitting payloads larger than the max batch size
    ///
    /// A payload within the limit is sent in one call and a failure of that
    /// call is returned as an error. Larger payloads report failures per item
    /// in the returned [`BatchResult`].
    pub async fn create(&self, objects: Vec<ZObject>) -> Result<BatchResult<SaveResult>> {
        self.run_batched(OperationKind::Create, objects, |transport, options, slice| async move {
            transport.create(&options, slice).await
        })
        .await
    }

    /// Update objects; batching as for [`create`](Self::create)
    pub async fn update(&self, objects: Vec<ZObject>) -> Result<BatchResult<SaveResult>> {
        self.run_batched(OperationKind::Update, objects, |transport, options, slice| async move {
            transport.update(&options, slice).await
        })
        .await
    }

    /// Delete objects of one type by id; batching as for [`create`](Self::create)
    pub async fn delete(
        &self,
        object_type: impl Into<ObjectType>,
        ids: Vec<String>,
    ) -> Result<BatchResult<DeleteResult>> {
        let object_type = object_type.into();
        self.run_batched(OperationKind::Delete, ids, move |transport, options, slice| {
            let object_type = object_type.clone();
            async move { transport.delete(&options, &object_type, slice).await }
        })
        .await
    }

    /// Apply amend requests; batching as for [`create`](Self::create)
    pub async fn amend(&self, requests: Vec<ZObject>) -> Result<BatchResult<AmendResult>> {
        self.run_batched(OperationKind::Amend, requests, |transport, options, slice| async move {
            transport.amend(&options, slice).await
        })
        .await
    }

    /// Apply subscribe requests in a single call
    pub async fn subscribe(&self, requests: Vec<ZObject>) -> Result<Vec<SubscribeResult>> {
        let transport = &self.transport;
        self.dispatch(OperationKind::Subscribe, |options| async move {
            transport.subscribe(&options, requests).await
        })
        .await
    }

    /// Build an empty object of the given type
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty type name.
    pub fn generate_object(&self, object_type: impl Into<ObjectType>) -> Result<ZObject> {
        let object_type = object_type.into();
        if object_type.as_str().trim().is_empty() {
            return Err(Error::validation("object_type", "object type must not be empty"));
        }
        debug!(object_type = %object_type.qualified_name(), "generating object");
        Ok(ZObject::new(object_type))
    }

    /// Send `items` in one call, or split them when they exceed the max batch size
    ///
    /// The session is checked once; every sub-batch carries the same call options.
    async fn run_batched<T, R, F, Fut>(
        &self,
        kind: OperationKind,
        items: Vec<T>,
        call: F,
    ) -> Result<BatchResult<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(Arc<dyn SoapTransport>, CallOptions, Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<R>>> + Send + 'static,
    {
        if items.is_empty() {
            debug!(operation = kind.method_name(), "empty payload, nothing to send");
            return Ok(BatchResult::default());
        }

        let options = self.call_options(kind).await?;
        let max = self.limits.sizes.max();

        if items.len() <= max {
            let size = items.len();
            let results = call(self.transport.clone(), options, items).await?;
            return Ok(BatchResult::from_single_call(size, results));
        }

        let transport = &self.transport;
        let options = &options;
        let call = &call;
        Ok(dispatch_batches(items, max, self.limits.dispatch_timeout, |slice| {
            call(transport.clone(), options.clone(), slice)
        })
        .await)
    }
}
