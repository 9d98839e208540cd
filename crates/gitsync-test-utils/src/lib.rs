//! Testing utilities for gitsync.
//!
//! # Modules
//!
//! - [`repo`]: Temporary upstream and working repositories built with libgit2
//! - [`doubles`]: Scripted secret providers, recording sinks and fake key probes
//! - [`strategies`]: Proptest strategies for remote URLs
//!
//! # Example
//!
//! ```rust,no_run
//! use gitsync_test_utils::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let fixture = RemoteFixture::new()?;
//! let repo = fixture.clone_into("work")?;
//! fixture.upstream_commit("CHANGELOG.md", "v2\n", "Release v2")?;
//! # let _ = repo;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod doubles;
pub mod repo;
pub mod strategies;

/// Re-export commonly used testing utilities.
pub mod prelude {
    pub use crate::doubles::{FakeAgent, FixedKey, NoKeys, RecordingSink, ScriptedSecrets};
    pub use crate::repo::{RemoteFixture, commit_file, init_repo};
    pub use crate::strategies::*;

    pub use proptest::prelude::*;
}
