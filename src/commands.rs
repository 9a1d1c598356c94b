//! Command dispatch: one verb, one request or stream, one rendering.

use crate::cli::{Cli, Command};
use crate::client::Client;
use crate::config::{Environment, Settings};
use crate::error::{LabError, Result};
use crate::models::{CommitStatusUpdate, NewProject};
use crate::output::Output;
use crate::request::{HttpTransport, Transport};
use std::io::Write;
use std::sync::Arc;

/// Printed by `ci-status` when a commit has no statuses
pub const NO_STATUS_LINE: &str = "failure";

/// Resolve configuration, then run the command over HTTP
pub async fn run<W: Write>(cli: Cli, env: &Environment, writer: W) -> Result<()> {
    let settings = Settings::load(&cli.overrides(), env)?;
    let transport = Arc::new(HttpTransport::new(cli.timeout)?);
    run_with(cli.command, cli.json, &settings, transport, writer).await
}

/// Run a command against resolved settings and an explicit transport.
///
/// A missing token for an authenticated command fails here, before any
/// request is built.
pub async fn run_with<W: Write>(
    command: Command,
    json: bool,
    settings: &Settings,
    transport: Arc<dyn Transport>,
    writer: W,
) -> Result<()> {
    if command.requires_auth() {
        settings.require_token()?;
    }

    let client = Client::with_transport(settings, transport)?;
    let mut output = Output::new(writer, json);
    let empty_means_failure = matches!(command, Command::CiStatus { .. });
    tracing::debug!(command = command.name(), host = %settings.host, "dispatching");

    match dispatch(command, &client, &mut output).await {
        Err(error) if error.is_empty_result() && empty_means_failure => {
            tracing::debug!(%error, "no commit statuses");
            output.text(NO_STATUS_LINE)
        }
        result => result,
    }
}

async fn dispatch<W: Write>(command: Command, client: &Client, out: &mut Output<W>) -> Result<()> {
    match command {
        Command::UserList { search, limit } => {
            let mut users = client.users(search.as_deref())?;
            out.stream(&mut users, limit).await?;
        }

        Command::UserName { username } => {
            let user = client
                .users_by_username(&username)?
                .next()
                .await?
                .ok_or_else(|| LabError::EmptyResult(format!("no user named '{username}'")))?;
            if out.is_json() {
                out.record(&user)?;
            } else {
                out.text(&user.name)?;
            }
        }

        Command::UserProjects { user, limit } => {
            let mut projects = client.user_projects(&user)?;
            out.stream(&mut projects, limit).await?;
        }

        Command::UserEvents {
            user,
            action,
            limit,
        } => {
            let mut events = client.user_events(&user, action.as_deref())?;
            out.stream(&mut events, limit).await?;
        }

        Command::MergeRequests {
            project,
            state,
            limit,
        } => {
            let mut merge_requests = client.merge_requests(&project, state.as_deref())?;
            out.stream(&mut merge_requests, limit).await?;
        }

        Command::StatusChecks { project, mr_iid } => {
            let mut checks = client.status_checks(&project, mr_iid)?;
            out.stream(&mut checks, None).await?;
        }

        Command::ProjectCreate {
            name,
            path,
            description,
            visibility,
            namespace_id,
        } => {
            let project = NewProject {
                name,
                path,
                description,
                visibility,
                namespace_id,
            };
            let created = client.create_project(&project).run().await?;
            out.record(&created)?;
        }

        Command::CiStatus {
            project,
            sha,
            ref_name,
        } => {
            let mut statuses = client.commit_statuses(&project, &sha, ref_name.as_deref())?;
            let empty = || LabError::EmptyResult(format!("no statuses for commit {sha}"));
            if out.is_json() {
                let all = statuses.to_list().await?;
                if all.is_empty() {
                    return Err(empty());
                }
                out.records(&all)?;
            } else if out.stream(&mut statuses, None).await? == 0 {
                return Err(empty());
            }
        }

        Command::SetCiStatus {
            project,
            sha,
            state,
            ref_name,
            name,
            target_url,
            description,
        } => {
            let update = CommitStatusUpdate {
                state,
                ref_name,
                name,
                target_url,
                description,
            };
            let status = client.set_commit_status(&project, &sha, &update).run().await?;
            out.record(&status)?;
        }

        Command::Branch { project, name } => {
            let branch = client.branch(&project, &name).run().await?;
            out.record(&branch)?;
        }

        Command::Api { endpoint } => {
            let body = client.raw_get(&endpoint).run().await?;
            out.raw(&body)?;
        }
    }

    Ok(())
}
