//! Data store abstraction.
//!
//! The core never talks to Postgres directly — it goes through [`TaskStore`],
//! injected into the task service. This keeps the matching and linking logic
//! testable against in-memory fakes and keeps storage schema an
//! implementation detail of the backend.

pub mod pg;

pub use pg::PgStore;

use async_trait::async_trait;
use crate::error::Result;
use crate::model::*;

/// Row-oriented CRUD and the filtered query shapes the core needs, scoped by
/// owner. All methods that take an owner enforce single-owner visibility.
#[async_trait]
pub trait TaskStore: Send + Sync {
    // --- projects ---

    async fn insert_project(
        &self,
        owner: UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project>;

    async fn list_projects(&self, owner: UserId) -> Result<Vec<Project>>;

    async fn project_exists(&self, owner: UserId, project: ProjectId) -> Result<bool>;

    // --- domains ---

    async fn insert_domain(
        &self,
        owner: UserId,
        project: ProjectId,
        name: &str,
    ) -> Result<Domain>;

    async fn list_domains(&self, owner: UserId, project: ProjectId) -> Result<Vec<Domain>>;

    /// Display name of a domain, or `None` if it does not exist.
    async fn domain_name(&self, owner: UserId, domain: DomainId) -> Result<Option<String>>;

    // --- canonical tasks ---

    /// Canonical tasks in the (owner, domain, version-bucket) scope, as match
    /// candidates in creation order. `version = None` selects the "no
    /// version" bucket, not all versions.
    async fn canonical_candidates(
        &self,
        owner: UserId,
        domain: DomainId,
        version: Option<&str>,
    ) -> Result<Vec<MatchCandidate>>;

    /// Exact (case-sensitive) canonical name lookup within a
    /// (owner, project, domain, version-bucket) scope. Used by orphan repair.
    async fn find_canonical_by_name(
        &self,
        owner: UserId,
        project: ProjectId,
        domain: DomainId,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<CanonicalId>>;

    async fn get_canonical(&self, owner: UserId, id: CanonicalId)
        -> Result<Option<CanonicalTask>>;

    async fn insert_canonical(&self, new: NewCanonicalTask) -> Result<CanonicalTask>;

    /// Notes are the only canonical-task field updated after creation.
    async fn update_canonical_notes(
        &self,
        owner: UserId,
        id: CanonicalId,
        notes: Option<&str>,
    ) -> Result<CanonicalTask>;

    /// Delete a canonical task. Its task instances are unlinked (orphaned),
    /// not deleted.
    async fn delete_canonical(&self, owner: UserId, id: CanonicalId) -> Result<()>;

    // --- task instances ---

    async fn insert_instance(&self, new: NewTaskInstance) -> Result<TaskInstance>;

    async fn get_instance(&self, owner: UserId, id: TaskId) -> Result<TaskInstance>;

    /// All instances in a project, newest first.
    async fn list_instances(&self, owner: UserId, project: ProjectId)
        -> Result<Vec<TaskInstance>>;

    /// Undated instances in a project (the backlog), newest first.
    async fn list_backlog(&self, owner: UserId, project: ProjectId)
        -> Result<Vec<TaskInstance>>;

    /// Instances with no canonical link, oldest first (stable repair order).
    async fn orphaned_instances(
        &self,
        owner: UserId,
        project: ProjectId,
    ) -> Result<Vec<TaskInstance>>;

    /// Set the canonical link on an instance.
    async fn link_instance(&self, id: TaskId, canonical: CanonicalId) -> Result<()>;

    /// Write a status change. When `to` is `Completed`, stamps `completed_at`
    /// and records the check-in fields. Transition validity is the caller's
    /// concern.
    async fn set_instance_status(
        &self,
        owner: UserId,
        id: TaskId,
        to: TaskStatus,
        check_in: Option<CheckIn>,
    ) -> Result<TaskInstance>;

    async fn delete_instance(&self, owner: UserId, id: TaskId) -> Result<()>;
}
