//! # Assistant Link
//!
//! Resilient backend client for the assistant dashboard.
//!
//! Assistant Link sits between the dashboard's UI layer and its REST
//! backend. It routes every request through an ordered list of alternate
//! base URLs, wakes sleeping backends before judging them down, and runs
//! one search query across every content category in parallel without
//! letting a single failing category spoil the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   ┌──────────────┐   ┌─────────────────────┐
//! │ SearchAggregator│──▶│  Dispatcher   │──▶│ HttpTransport × N   │──▶ network
//! │ ResourceClient │   │ (cascade)    │   │ token, headers, 4xx │
//! └────────────────┘   └──────┬───────┘   └─────────────────────┘
//!                             │
//!                      ┌──────┴───────┐
//!                      │ HealthProber │  wake → probe → verdict
//!                      └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! alink candidates                 # show the fallback order
//! alink health                     # wake the backend and probe it
//! alink request GET /api/notes     # one request through the cascade
//! alink search "project" --only notes,tasks
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and `ALINK_*` overrides |
//! | [`error`] | [`ClientError`](error::ClientError) taxonomy |
//! | [`timeout`] | Deadline racing |
//! | [`session`] | Bearer-token storage and 401 handling |
//! | [`error_body`] | User messages from server error bodies |
//! | [`transport`] | Single-base-URL HTTP transport |
//! | [`candidates`] | Candidate list construction |
//! | [`dispatcher`] | Fallback cascade (`smart_request`) |
//! | [`health`] | Wake-up and liveness probing |
//! | [`models`] | Search result types |
//! | [`search`] | Unified search, snippets, suggestions, offline cache |
//! | [`resources`] | CRUD helpers for backend resources |

pub mod candidates;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod error_body;
pub mod health;
pub mod models;
pub mod resources;
pub mod search;
pub mod session;
pub mod timeout;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use error::{ClientError, ClientResult};
pub use health::{ConnectivityVerdict, HealthProber};
pub use search::{SearchAggregator, SearchOptions};
pub use transport::{RequestSpec, Response, Transport};
