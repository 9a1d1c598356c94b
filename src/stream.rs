//! Lazy, page-at-a-time cursor over a paginated collection.
//!
//! A [`PageStream`] starts in `NotStarted` holding only its first request.
//! Each call to [`PageStream::next`] hands out a buffered element, or, once
//! the buffered page is used up, fetches exactly one more page. Pages are
//! never fetched ahead of demand and never fetched twice. A failed fetch
//! parks the stream in `Failed` and every later call returns that error
//! again without touching the network.

use crate::error::{LabError, Result};
use crate::pipeline::Pipeline;
use crate::request::{Request, Response, Transport};
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Where the next page lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Absolute URI from a `Link: <...>; rel="next"` header
    Uri(Url),
    /// Page number from `X-Next-Page`, applied to the previous request
    PageNumber(String),
}

impl Continuation {
    /// Read the continuation off a response. `Link` wins over `X-Next-Page`.
    pub fn from_response(response: &Response) -> Option<Self> {
        if let Some(url) = response.header("link").and_then(parse_next_link) {
            return Some(Continuation::Uri(url));
        }

        response
            .header("x-next-page")
            .map(str::trim)
            .filter(|page| !page.is_empty())
            .map(|page| Continuation::PageNumber(page.to_string()))
    }

    /// Build the request for the page this continuation points at.
    ///
    /// The request carries the previous one's token, so a `Link` target on
    /// another origin is refused.
    pub fn next_request(&self, previous: &Request) -> Result<Request> {
        match self {
            Continuation::Uri(url) => {
                if url.origin() != previous.url().origin() {
                    return Err(LabError::Configuration(format!(
                        "next page {url} is outside API origin {}",
                        previous.url().origin().ascii_serialization()
                    )));
                }
                Ok(previous.with_url(url.clone()))
            }
            Continuation::PageNumber(page) => {
                let mut url = previous.url().clone();
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(key, _)| key != "page")
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair("page", page);
                Ok(previous.with_url(url))
            }
        }
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header
pub fn parse_next_link(header: &str) -> Option<Url> {
    let mut rest = header;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let end = after.find('>')?;
        let target = &after[..end];
        let params_end = next_link_start(&after[end..]).map_or(after.len(), |i| end + i);
        let params = &after[end + 1..params_end];

        let is_next = params.split(';').any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_end_matches(',')
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
        });

        if is_next {
            return Url::parse(target.trim()).ok();
        }
        rest = &after[params_end..];
    }

    None
}

/// Offset of the next `<` that opens a link, skipping quoted parameter values
fn next_link_start(params: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in params.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '<' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

/// One decoded batch of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Continuation>,
}

impl<T: DeserializeOwned> Page<T> {
    pub fn from_response(response: Response) -> Result<Self> {
        Ok(Self {
            items: response.json()?,
            next: Continuation::from_response(&response),
        })
    }
}

/// Externally visible stream state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    NotStarted,
    HasBufferedPage,
    Exhausted,
    Failed,
}

enum State<T> {
    NotStarted(Request),
    Buffered {
        items: VecDeque<T>,
        next: Option<Request>,
    },
    Exhausted,
    Failed(LabError),
}

pub struct PageStream<T> {
    transport: Arc<dyn Transport>,
    state: State<T>,
    pages_fetched: usize,
}

impl<T> fmt::Debug for PageStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStream")
            .field("state", &self.state())
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

impl<T> PageStream<T> {
    pub fn state(&self) -> StreamState {
        match self.state {
            State::NotStarted(_) => StreamState::NotStarted,
            State::Buffered { .. } => StreamState::HasBufferedPage,
            State::Exhausted => StreamState::Exhausted,
            State::Failed(_) => StreamState::Failed,
        }
    }

    /// Number of page requests issued so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

impl<T> PageStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Create a cursor for `initial`. No request is sent until `next`.
    pub fn new(transport: Arc<dyn Transport>, initial: Request) -> Self {
        Self {
            transport,
            state: State::NotStarted(initial),
            pages_fetched: 0,
        }
    }

    /// Next element, `Ok(None)` at the end of the collection.
    ///
    /// The fetch of a page happens inside this call while it holds
    /// `&mut self`, so the fetching state is never observable from outside.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            let pending = match &mut self.state {
                State::NotStarted(request) => Some(request.clone()),
                State::Buffered { items, next } => {
                    if let Some(item) = items.pop_front() {
                        return Ok(Some(item));
                    }
                    next.clone()
                }
                State::Exhausted => return Ok(None),
                State::Failed(error) => return Err(error.clone()),
            };

            let Some(request) = pending else {
                self.state = State::Exhausted;
                return Ok(None);
            };

            self.fetch(request).await?;
        }
    }

    async fn fetch(&mut self, request: Request) -> Result<()> {
        self.pages_fetched += 1;
        tracing::debug!(url = %request.url(), page = self.pages_fetched, "fetching page");

        let previous = request.clone();
        let result = Pipeline::send(Arc::clone(&self.transport), request)
            .and_then_result(Page::<T>::from_response)
            .and_then_result(move |page| {
                let next = page
                    .next
                    .map(|c| c.next_request(&previous))
                    .transpose()?;
                Ok((page.items, next))
            })
            .run()
            .await;

        match result {
            Ok((items, next)) => {
                tracing::debug!(items = items.len(), more = next.is_some(), "page received");
                self.state = State::Buffered {
                    items: items.into(),
                    next,
                };
                Ok(())
            }
            Err(error) => {
                tracing::debug!(%error, "page fetch failed");
                self.state = State::Failed(error.clone());
                Err(error)
            }
        }
    }

    /// Drain in order, stopping at the first failure from either the
    /// stream or the consumer
    pub async fn for_each<F>(&mut self, mut consumer: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        while let Some(item) = self.next().await? {
            consumer(item)?;
        }
        Ok(())
    }

    /// Materialize the whole collection
    pub async fn to_list(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.for_each(|item| {
            items.push(item);
            Ok(())
        })
        .await?;
        Ok(items)
    }

    /// Collect at most `limit` elements, fetching only the pages needed
    pub async fn collect_at_most(&mut self, limit: usize) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while items.len() < limit {
            match self.next().await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Adapt into a `futures::Stream`. The adapter ends after yielding the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        stream::unfold(Some(self), |cursor| async move {
            let mut cursor = cursor?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
    }
}
