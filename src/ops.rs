//! Adapters for the collaborators the orchestrator drives.
//!
//! - [`git`]: the git operation executor, one operation per migration step
//! - [`credentials`]: per-host credential resolution from the environment
//!
//! Both are traits with a real implementation and, under test, a mock.

pub mod credentials;
pub mod git;
