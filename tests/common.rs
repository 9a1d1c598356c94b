#![allow(dead_code)]

use async_trait::async_trait;
use clap::Parser;
use labctl::cli::Cli;
use labctl::commands;
use labctl::config::{Settings, Token};
use labctl::error::{LabError, Result};
use labctl::request::{HttpTransport, Request, Response, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::MockServer;

pub const TOKEN: &str = "glpat-test-token";

pub fn settings_for(server: &MockServer, token: Option<&str>) -> Settings {
    Settings {
        host: Url::parse(&server.uri()).expect("mock server URI"),
        token: token.and_then(Token::new),
    }
}

/// Parse `args` as a command line and run it against the mock server,
/// returning the outcome and everything written to stdout
pub async fn run_cli(
    server: &MockServer,
    token: Option<&str>,
    args: &[&str],
) -> (Result<()>, String) {
    let cli = Cli::try_parse_from(std::iter::once("labctl").chain(args.iter().copied()))
        .expect("valid command line");
    let settings = settings_for(server, token);
    let transport = Arc::new(HttpTransport::new(5).expect("HTTP transport"));

    let mut stdout = Vec::new();
    let result =
        commands::run_with(cli.command, cli.json, &settings, transport, &mut stdout).await;
    (result, String::from_utf8(stdout).expect("utf-8 output"))
}

pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

/// In-memory transport serving canned pages in order
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Response>>,
    calls: Mutex<usize>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        })
    }

    /// One response per page; every page but the last points at the next
    pub fn pages(pages: &[Vec<u32>]) -> Arc<Self> {
        let responses = pages
            .iter()
            .enumerate()
            .map(|(index, items)| {
                let body = serde_json::to_vec(items).expect("encode page");
                let response = Response::new(200, body);
                if index + 1 < pages.len() {
                    response.with_header("X-Next-Page", &(index + 2).to_string())
                } else {
                    response
                }
            })
            .collect();
        Self::new(responses)
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, _request: &Request) -> Result<Response> {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LabError::Transport("no scripted response left".to_string()))
    }
}

pub fn first_request() -> Request {
    Request::get(Url::parse("https://gitlab.test/api/v4/things").unwrap())
}
