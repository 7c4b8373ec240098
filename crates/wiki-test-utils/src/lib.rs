//! Shared test utilities for the wikisync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`remote`]: [`InMemoryRemote`], a fake wiki implementing `RemoteApi`
//! - [`workspace`]: [`TestWorkspace`] builder over a temporary directory
//! - [`logging`]: opt-in tracing output for debugging a test run

pub mod logging;
pub mod remote;
pub mod workspace;

pub use logging::init_tracing;
pub use remote::InMemoryRemote;
pub use workspace::TestWorkspace;
