//! Rendering of records as pretty JSON or one human-readable line each.

use crate::error::Result;
use crate::models::{Branch, CommitStatus, Event, MergeRequest, Project, StatusCheck, User};
use crate::stream::PageStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;

/// Single-line human rendering of a record
pub trait Line {
    fn line(&self) -> String;
}

impl Line for User {
    fn line(&self) -> String {
        format!("{}\t{}\t{}", self.id, self.username, self.name)
    }
}

impl Line for Project {
    fn line(&self) -> String {
        match &self.web_url {
            Some(url) => format!("{}\t{}\t{url}", self.id, self.path_with_namespace),
            None => format!("{}\t{}", self.id, self.path_with_namespace),
        }
    }
}

impl Line for MergeRequest {
    fn line(&self) -> String {
        format!(
            "!{}\t{}\t{} -> {}\t{}",
            self.iid, self.state, self.source_branch, self.target_branch, self.title
        )
    }
}

impl Line for CommitStatus {
    fn line(&self) -> String {
        self.status.clone()
    }
}

impl Line for Branch {
    fn line(&self) -> String {
        format!("{}\t{}\t{}", self.name, self.commit.short_id, self.commit.title)
    }
}

impl Line for Event {
    fn line(&self) -> String {
        let when = self
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let target = self.target_title.as_deref().unwrap_or("");
        format!("{when}\t{}\t{target}", self.action_name)
            .trim_end()
            .to_string()
    }
}

impl Line for StatusCheck {
    fn line(&self) -> String {
        format!("{}\t{}", self.name, self.status)
    }
}

pub struct Output<W: Write> {
    json: bool,
    writer: W,
}

impl<W: Write> Output<W> {
    pub fn new(writer: W, json: bool) -> Self {
        Self { json, writer }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write a bare line regardless of mode
    pub fn text(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}")?;
        Ok(())
    }

    pub fn record<T: Serialize + Line>(&mut self, record: &T) -> Result<()> {
        if self.json {
            let pretty = serde_json::to_string_pretty(record)?;
            self.text(&pretty)
        } else {
            self.text(&record.line())
        }
    }

    /// Pretty JSON array of records
    pub fn records<T: Serialize>(&mut self, records: &[T]) -> Result<()> {
        let pretty = serde_json::to_string_pretty(records)?;
        self.text(&pretty)
    }

    /// Pretty JSON of an arbitrary value, used by the raw `api` command
    pub fn raw(&mut self, value: &serde_json::Value) -> Result<()> {
        let pretty = serde_json::to_string_pretty(value)?;
        self.text(&pretty)
    }

    /// Render up to `limit` stream elements and return how many were written.
    ///
    /// Human mode writes each line as it arrives. JSON mode has to hold the
    /// elements to emit one array.
    pub async fn stream<T>(
        &mut self,
        stream: &mut PageStream<T>,
        limit: Option<usize>,
    ) -> Result<usize>
    where
        T: DeserializeOwned + Serialize + Line + Send + 'static,
    {
        if self.json {
            let items = match limit {
                Some(limit) => stream.collect_at_most(limit).await?,
                None => stream.to_list().await?,
            };
            self.records(&items)?;
            return Ok(items.len());
        }

        let limit = limit.unwrap_or(usize::MAX);
        let mut written = 0;
        while written < limit {
            let Some(item) = stream.next().await? else {
                break;
            };
            self.text(&item.line())?;
            written += 1;
        }
        Ok(written)
    }
}
