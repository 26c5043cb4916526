//! fleetsync - keeps a clustered server's config in step with fleet membership.
//!
//! Resolves peers from the fleet's TXT directory, rewrites the managed
//! server's config when membership changes, and restarts the server so
//! its supervisor brings it back up with the new peer list.

mod runtime;

pub use runtime::Fleetsync;
