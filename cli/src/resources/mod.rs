//! Idempotent directory resources (check + apply pattern).
//!
//! [`TrackedFolder`](folder::TrackedFolder) creation is typed with
//! [`TrackingError`](crate::error::TrackingError) so fatal tracking errors
//! stay recognisable; the workspace goes through [`Applicable`].
pub mod folder;
pub mod workspace;

use anyhow::Result;

/// Minimal interface for resources that can be described, applied, and removed.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Bring the resource into its desired state.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be applied due to I/O failures,
    /// permission issues, or invalid paths.
    fn apply(&self) -> Result<ResourceChange>;

    /// Remove the resource, undoing a previous `apply()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be removed.
    fn remove(&self) -> Result<ResourceChange>;
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use deploy_cli::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let kept = ResourceChange::Skipped { reason: "directory not empty".into() };
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, kept);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or removed.
    Applied,
    /// Resource was already in the desired state.
    AlreadyCorrect,
    /// Nothing was changed.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}
