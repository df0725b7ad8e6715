pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod domain;
pub mod error;
pub mod git;
pub mod last_commit;
pub mod lock;
pub mod notify;
pub mod preflight;
pub mod release;
pub mod remote;
pub mod ui;

pub use error::{ReleaseFlowError, Result};
