pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod stream;

// Re-export commonly used types
pub use client::Client;
pub use config::{Settings, Token};
pub use error::{LabError, Result};
pub use pipeline::Pipeline;
pub use request::{Request, Response, Transport};
pub use stream::{Page, PageStream, StreamState};
