//! Typed endpoints of the v4 REST API.
//!
//! Every method builds exactly one initial [`Request`] and wraps it either in
//! a [`Pipeline`] (single resource or write) or a [`PageStream`] (collection).

use crate::config::{Settings, Token};
use crate::error::{LabError, Result};
use crate::models::{
    Branch, CommitStatus, CommitStatusUpdate, Event, MergeRequest, NewProject, Project,
    StatusCheck, User,
};
use crate::pipeline::Pipeline;
use crate::request::{Request, Transport};
use crate::stream::PageStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

pub const PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    api_root: Url,
    token: Option<Token>,
}

impl Client {
    pub fn with_transport(settings: &Settings, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut host = settings.host.clone();
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }
        let api_root = host.join("api/v4/")?;
        Ok(Self {
            transport,
            api_root,
            token: settings.token.clone(),
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// API URL built from path segments; each segment is percent-encoded,
    /// so `group/project` stays one segment
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LabError::Configuration(format!("Host {} cannot be a base URL", self.api_root))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// API URL from a raw relative path such as `projects/42?simple=true`
    pub fn raw_endpoint(&self, path: &str) -> Result<Url> {
        let url = self.api_root.join(path.trim_start_matches('/'))?;
        // The token must never be sent to another origin
        if !url.as_str().starts_with(self.api_root.as_str()) {
            return Err(LabError::Configuration(format!(
                "Endpoint '{path}' is outside {}",
                self.api_root
            )));
        }
        Ok(url)
    }

    fn collection_endpoint(
        &self,
        segments: &[&str],
        query: &[(&str, Option<&str>)],
    ) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                if let Some(value) = value {
                    pairs.append_pair(key, value);
                }
            }
            pairs.append_pair("per_page", &PER_PAGE.to_string());
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> Request {
        Request::get(url).with_token(self.token.clone())
    }

    fn post<B: Serialize>(&self, url: Url, body: &B) -> Result<Request> {
        let body = serde_json::to_value(body)?;
        Ok(Request::post(url, body).with_token(self.token.clone()))
    }

    /// Run one request and decode its JSON body
    pub fn fetch<T>(&self, request: Result<Request>) -> Pipeline<'static, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        Pipeline::from_result(request)
            .bind(move |request| Pipeline::send(transport, request))
            .decode()
    }

    /// Lazy cursor over a paginated collection
    pub fn paginate<T>(&self, url: Url) -> PageStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        PageStream::new(Arc::clone(&self.transport), self.get(url))
    }

    pub fn users(&self, search: Option<&str>) -> Result<PageStream<User>> {
        let url = self.collection_endpoint(&["users"], &[("search", search)])?;
        Ok(self.paginate(url))
    }

    pub fn users_by_username(&self, username: &str) -> Result<PageStream<User>> {
        let url = self.collection_endpoint(&["users"], &[("username", Some(username))])?;
        Ok(self.paginate(url))
    }

    pub fn user_projects(&self, user: &str) -> Result<PageStream<Project>> {
        let url = self.collection_endpoint(&["users", user, "projects"], &[])?;
        Ok(self.paginate(url))
    }

    pub fn user_events(&self, user: &str, action: Option<&str>) -> Result<PageStream<Event>> {
        let url = self.collection_endpoint(&["users", user, "events"], &[("action", action)])?;
        Ok(self.paginate(url))
    }

    pub fn merge_requests(
        &self,
        project: &str,
        state: Option<&str>,
    ) -> Result<PageStream<MergeRequest>> {
        let url = self.collection_endpoint(
            &["projects", project, "merge_requests"],
            &[("state", state)],
        )?;
        Ok(self.paginate(url))
    }

    pub fn status_checks(&self, project: &str, mr_iid: u64) -> Result<PageStream<StatusCheck>> {
        let iid = mr_iid.to_string();
        let url = self.collection_endpoint(
            &["projects", project, "merge_requests", iid.as_str(), "status_checks"],
            &[],
        )?;
        Ok(self.paginate(url))
    }

    pub fn commit_statuses(
        &self,
        project: &str,
        sha: &str,
        ref_name: Option<&str>,
    ) -> Result<PageStream<CommitStatus>> {
        let url = self.collection_endpoint(
            &["projects", project, "repository", "commits", sha, "statuses"],
            &[("ref", ref_name)],
        )?;
        Ok(self.paginate(url))
    }

    pub fn create_project(&self, project: &NewProject) -> Pipeline<'static, Project> {
        let request = self
            .endpoint(&["projects"])
            .and_then(|url| self.post(url, project));
        self.fetch(request)
    }

    pub fn set_commit_status(
        &self,
        project: &str,
        sha: &str,
        update: &CommitStatusUpdate,
    ) -> Pipeline<'static, CommitStatus> {
        let request = self
            .endpoint(&["projects", project, "statuses", sha])
            .and_then(|url| self.post(url, update));
        self.fetch(request)
    }

    pub fn branch(&self, project: &str, name: &str) -> Pipeline<'static, Branch> {
        let request = self
            .endpoint(&["projects", project, "repository", "branches", name])
            .map(|url| self.get(url));
        self.fetch(request)
    }

    /// `GET` an arbitrary path and return the body without typed decoding
    pub fn raw_get(&self, path: &str) -> Pipeline<'static, serde_json::Value> {
        let request = self.raw_endpoint(path).map(|url| self.get(url));
        self.fetch(request)
    }
}
