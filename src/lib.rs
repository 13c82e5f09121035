// Client core for the Integrify media-authenticity checker.
//
// The modules below implement the upload-analyze-persist workflow and its
// supporting view-state. Everything the workflow talks to — auth backend,
// document store, object store, detection API, modal UI, page navigation —
// is a trait seam, so the whole flow runs and tests without a WebView.

pub mod auth;
pub mod config;
pub mod detect;
pub mod error;
pub mod gallery;
pub mod history;
pub mod models;
pub mod notify;
pub mod player;
pub mod storage;
pub mod workflow;

pub use config::ClientConfig;
pub use error::{Result, WorkflowError};
pub use workflow::{ClientEvent, Page, WorkflowController};
