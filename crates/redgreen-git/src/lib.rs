//! # redgreen-git
//!
//! Git-backed snapshot store for the redgreen TDD loop.
//!
//! Each verified step of a cycle is persisted as a commit; each failed
//! refactor attempt is discarded by reverting the working tree to the last
//! commit. The store wraps git2 with the handful of operations the cycle
//! needs:
//!
//! - [`SnapshotStore::init`] - idempotent repository creation
//! - [`SnapshotStore::stage`] / [`SnapshotStore::stage_all`]
//! - [`SnapshotStore::commit`] - returns `false` when nothing is staged
//! - [`SnapshotStore::revert`] / [`SnapshotStore::revert_all`]
//! - [`SnapshotStore::diff`] / [`SnapshotStore::status`] read-only queries

mod status;
mod store;

pub use status::WorkspaceStatus;
pub use store::{GitError, SnapshotStore};
