//! Chained asynchronous stages that stop at the first failure.
//!
//! A [`Pipeline`] is a deferred computation producing `Result<T, LabError>`.
//! Building one performs no I/O; stages run in declaration order only when
//! [`Pipeline::run`] is awaited. Dropping the pipeline (or the `run` future)
//! drops whatever call is in flight.

use crate::error::{LabError, Result};
use crate::request::{Request, Response, Transport};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

#[must_use = "a pipeline does nothing until `run` is awaited"]
pub struct Pipeline<'a, T> {
    future: BoxFuture<'a, Result<T>>,
}

impl<'a, T: Send + 'a> Pipeline<'a, T> {
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'a,
    {
        Self {
            future: future.boxed(),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        Self::from_future(async move { result })
    }

    pub fn ok(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    pub fn fail(error: LabError) -> Self {
        Self::from_result(Err(error))
    }

    /// Sequential composition. `stage` is only called on upstream success;
    /// an upstream failure is handed through untouched.
    pub fn bind<U, F>(self, stage: F) -> Pipeline<'a, U>
    where
        U: Send + 'a,
        F: FnOnce(T) -> Pipeline<'a, U> + Send + 'a,
    {
        Pipeline::from_future(async move {
            let value = self.future.await?;
            stage(value).future.await
        })
    }

    /// Reshape a successful value
    pub fn map<U, F>(self, transform: F) -> Pipeline<'a, U>
    where
        U: Send + 'a,
        F: FnOnce(T) -> U + Send + 'a,
    {
        Pipeline::from_future(async move { self.future.await.map(transform) })
    }

    /// Like `map`, for synchronous steps that can fail
    pub fn and_then_result<U, F>(self, step: F) -> Pipeline<'a, U>
    where
        U: Send + 'a,
        F: FnOnce(T) -> Result<U> + Send + 'a,
    {
        Pipeline::from_future(async move { self.future.await.and_then(step) })
    }

    pub fn map_err<F>(self, transform: F) -> Self
    where
        F: FnOnce(LabError) -> LabError + Send + 'a,
    {
        Pipeline::from_future(async move { self.future.await.map_err(transform) })
    }

    pub async fn run(self) -> Result<T> {
        self.future.await
    }
}

impl Pipeline<'static, Response> {
    /// One HTTP call; non-2xx statuses become `HttpStatus` failures
    pub fn send(transport: Arc<dyn Transport>, request: Request) -> Self {
        Pipeline::from_future(async move {
            let response = transport.execute(&request).await?;
            response.error_for_status()
        })
    }

    /// Decode the response body as JSON
    pub fn decode<T>(self) -> Pipeline<'static, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.and_then_result(|response| response.json())
    }
}
