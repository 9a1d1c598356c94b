use crate::config::Overrides;
use crate::models::{CommitState, Visibility};
use crate::request::DEFAULT_TIMEOUT_SECS;
use clap::{Parser, Subcommand};

/// A command-line client for GitLab-style hosting APIs
///
/// Labctl talks to the v4 REST API of a GitLab-compatible server. Collections
/// are fetched page by page as they are printed, so long listings start
/// immediately and stop fetching as soon as `--limit` is reached.
#[derive(Parser, Debug)]
#[command(name = "labctl", version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print pretty JSON instead of one line per record
    #[arg(long, global = true)]
    pub json: bool,

    /// Log requests and pages to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Access token (overrides LABCTL_TOKEN and the config file)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Server base URL (overrides LABCTL_HOST and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub host: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            token: self.token.clone(),
            host: self.host.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List users
    UserList {
        /// Only users whose name, username or email match
        #[arg(long)]
        search: Option<String>,

        /// Stop after this many users
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the display name of a user
    UserName {
        /// Username to look up
        #[arg(value_name = "USERNAME")]
        username: String,
    },

    /// List projects owned by a user
    UserProjects {
        /// User ID or username
        #[arg(value_name = "USER")]
        user: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// List a user's contribution events
    UserEvents {
        /// User ID or username
        #[arg(value_name = "USER")]
        user: String,

        /// Only events of this action type (e.g. pushed, commented)
        #[arg(long)]
        action: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// List merge requests of a project
    MergeRequests {
        /// Project ID or path (group/project)
        #[arg(value_name = "PROJECT")]
        project: String,

        /// opened, closed, locked, merged or all
        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show external status checks of a merge request
    StatusChecks {
        /// Project ID or path (group/project)
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Merge request IID
        #[arg(value_name = "MR_IID")]
        mr_iid: u64,
    },

    /// Create a project
    ProjectCreate {
        #[arg(value_name = "NAME")]
        name: String,

        /// Repository path (defaults to the name)
        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, value_enum)]
        visibility: Option<Visibility>,

        /// Namespace to create the project in
        #[arg(long)]
        namespace_id: Option<u64>,
    },

    /// Print the pipeline statuses of a commit, one per line
    ///
    /// Prints `failure` when the commit has no statuses at all.
    CiStatus {
        /// Project ID or path (group/project)
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Commit SHA
        #[arg(value_name = "SHA")]
        sha: String,

        /// Only statuses for this branch or tag
        #[arg(long = "ref")]
        ref_name: Option<String>,
    },

    /// Report a pipeline status for a commit
    SetCiStatus {
        /// Project ID or path (group/project)
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Commit SHA
        #[arg(value_name = "SHA")]
        sha: String,

        #[arg(value_enum, value_name = "STATE")]
        state: CommitState,

        /// Branch or tag the status refers to
        #[arg(long = "ref")]
        ref_name: Option<String>,

        /// Label distinguishing this status from others on the commit
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        target_url: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Show a single branch
    Branch {
        /// Project ID or path (group/project)
        #[arg(value_name = "PROJECT")]
        project: String,

        #[arg(value_name = "BRANCH")]
        name: String,
    },

    /// GET an arbitrary API path and print the raw JSON body
    Api {
        /// Path below /api/v4, e.g. `projects/42/issues?state=opened`
        #[arg(value_name = "ENDPOINT")]
        endpoint: String,
    },
}

impl Command {
    /// Every command except the raw passthrough needs a token
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Command::Api { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::UserList { .. } => "user-list",
            Command::UserName { .. } => "user-name",
            Command::UserProjects { .. } => "user-projects",
            Command::UserEvents { .. } => "user-events",
            Command::MergeRequests { .. } => "merge-requests",
            Command::StatusChecks { .. } => "status-checks",
            Command::ProjectCreate { .. } => "project-create",
            Command::CiStatus { .. } => "ci-status",
            Command::SetCiStatus { .. } => "set-ci-status",
            Command::Branch { .. } => "branch",
            Command::Api { .. } => "api",
        }
    }
}
