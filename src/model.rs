//! Core data model.
//!
//! A canonical task is a deduplicated recurring activity within a
//! (project, domain, version) scope. A task instance is one concrete, dated
//! (or backlog) unit of work, optionally linked back to a canonical task.
//! The link is what this crate exists to maintain.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(
    /// Owning user.
    UserId
);
define_id!(
    /// A project.
    ProjectId
);
define_id!(
    /// A domain within a project.
    DomainId
);
define_id!(
    /// A canonical (deduplicated, recurring) task.
    CanonicalId
);
define_id!(
    /// A task instance.
    TaskId
);

// ---------------------------------------------------------------------------
// Version bucket
// ---------------------------------------------------------------------------

/// Normalize a version label into its bucket: `None` and empty/whitespace-only
/// strings are the same "no version" bucket. Call sites historically spelled
/// "absent" both ways; this is the single place that collapses them.
pub fn version_bucket(version: Option<&str>) -> Option<String> {
    match version {
        Some(v) => {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Completed)   // check-in straight from pending
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Pending)  // paused, back to the queue
        )
    }

    /// Is this a terminal status?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(Error::Other(format!("unknown task status: {other}"))),
        }
    }
}

/// How progress on a task is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureType {
    /// Unit count (e.g., pages written, reps done).
    Unit,
    Percentage,
    Status,
    Revisions,
}

impl std::fmt::Display for MeasureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MeasureType::Unit => "unit",
            MeasureType::Percentage => "percentage",
            MeasureType::Status => "status",
            MeasureType::Revisions => "revisions",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MeasureType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit" => Ok(MeasureType::Unit),
            "percentage" => Ok(MeasureType::Percentage),
            "status" => Ok(MeasureType::Status),
            "revisions" => Ok(MeasureType::Revisions),
            other => Err(Error::Other(format!("unknown measure type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical Task
// ---------------------------------------------------------------------------

/// A deduplicated recurring activity. Many task instances can link back to
/// one canonical task, enabling "how many times have I done X" aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTask {
    pub id: CanonicalId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub domain_id: DomainId,
    /// Trimmed display name. Semantically unique within the
    /// (project, domain, version) scope — best effort, not enforced by storage.
    pub name: String,
    pub description: Option<String>,
    /// Free-text notes. The only field updated after creation.
    pub notes: Option<String>,
    /// Version label. `None` is the "no version" bucket.
    pub version: Option<String>,
    pub measure_type: Option<MeasureType>,
    pub measure_unit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new canonical task.
#[derive(Debug, Clone)]
pub struct NewCanonicalTask {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub domain_id: DomainId,
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub measure_type: Option<MeasureType>,
    pub measure_unit: Option<String>,
}

/// The minimal canonical-task projection handed to the similarity oracle.
/// Never persisted.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub id: CanonicalId,
    pub name: String,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Task Instance
// ---------------------------------------------------------------------------

/// One concrete, dated (or backlog) unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: TaskId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub domain_id: DomainId,
    /// The canonical link this crate maintains. `None` marks the row orphaned
    /// and eligible for repair.
    pub canonical_task_id: Option<CanonicalId>,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub version: Option<String>,
    pub measure_type: Option<MeasureType>,
    pub measure_unit: Option<String>,
    pub target_value: Option<f64>,
    pub timebox_value: Option<f64>,
    /// Free-form unit for the timebox ("mins", "hrs").
    pub timebox_unit: Option<String>,
    /// `None` = backlog (undated).
    pub scheduled_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// Actual time spent, in minutes. Populated on completion.
    pub actual_minutes: Option<f64>,
    /// What actually got done. Populated on completion.
    pub actual_work: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new task instance. Built by the orchestrator, not
/// by callers — callers go through [`NewTaskRequest`].
#[derive(Debug, Clone)]
pub struct NewTaskInstance {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub domain_id: DomainId,
    pub canonical_task_id: Option<CanonicalId>,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub version: Option<String>,
    pub measure_type: Option<MeasureType>,
    pub measure_unit: Option<String>,
    pub target_value: Option<f64>,
    pub timebox_value: Option<f64>,
    pub timebox_unit: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub status: TaskStatus,
}

/// Completion data recorded when a task is checked in.
#[derive(Debug, Clone, Default)]
pub struct CheckIn {
    pub actual_minutes: Option<f64>,
    pub actual_work: Option<String>,
}

// ---------------------------------------------------------------------------
// Creation request
// ---------------------------------------------------------------------------

/// Builder for task-creation requests. The public entry shape for
/// [`TaskService::create_task`](crate::tasks::TaskService::create_task).
#[derive(Debug, Clone)]
pub struct NewTaskRequest {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) notes: Option<String>,
    pub(crate) project_id: ProjectId,
    pub(crate) domain_id: DomainId,
    pub(crate) version: Option<String>,
    pub(crate) measure_type: Option<MeasureType>,
    pub(crate) measure_unit: Option<String>,
    pub(crate) target_value: Option<f64>,
    pub(crate) timebox_value: Option<f64>,
    pub(crate) timebox_unit: Option<String>,
    pub(crate) scheduled_date: Option<NaiveDate>,
}

impl NewTaskRequest {
    pub fn new(name: impl Into<String>, project_id: ProjectId, domain_id: DomainId) -> Self {
        Self {
            name: name.into(),
            description: None,
            notes: None,
            project_id,
            domain_id,
            version: None,
            measure_type: None,
            measure_unit: None,
            target_value: None,
            timebox_value: None,
            timebox_unit: None,
            scheduled_date: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Version label. Empty and whitespace-only strings collapse to the
    /// "no version" bucket at validation time.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn measure(mut self, measure_type: MeasureType, unit: Option<String>) -> Self {
        self.measure_type = Some(measure_type);
        self.measure_unit = unit;
        self
    }

    pub fn target_value(mut self, value: f64) -> Self {
        self.target_value = Some(value);
        self
    }

    pub fn timebox(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.timebox_value = Some(value);
        self.timebox_unit = Some(unit.into());
        self
    }

    pub fn scheduled_date(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    /// Validate and normalize the request: trimmed non-empty name within
    /// length limits, positive numeric fields, version collapsed to its
    /// bucket. Returns the normalized request.
    pub fn validate(mut self) -> crate::error::Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("task name is required".into()));
        }
        if name.chars().count() > 200 {
            return Err(Error::Validation("task name is too long".into()));
        }
        if let Some(ref d) = self.description {
            if d.chars().count() > 1000 {
                return Err(Error::Validation("description is too long".into()));
            }
        }
        if let Some(ref n) = self.notes {
            if n.chars().count() > 2000 {
                return Err(Error::Validation("notes are too long".into()));
            }
        }
        if let Some(v) = self.target_value {
            if v <= 0.0 {
                return Err(Error::Validation("target value must be positive".into()));
            }
        }
        if let Some(v) = self.timebox_value {
            if v <= 0.0 {
                return Err(Error::Validation("timebox value must be positive".into()));
            }
        }
        self.name = name;
        self.version = version_bucket(self.version.as_deref());
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Creation result
// ---------------------------------------------------------------------------

/// Which pipeline produced a created task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationMethod {
    /// Full pipeline: candidates loaded, matcher consulted, canonical linked.
    Enriched,
    /// Direct insert with no canonical link, used when the enriched pipeline
    /// failed for an environmental reason.
    Degraded,
}

impl std::fmt::Display for CreationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CreationMethod::Enriched => "enriched",
            CreationMethod::Degraded => "degraded",
        };
        write!(f, "{s}")
    }
}

/// Canonical-task summary denormalized onto a created task for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSummary {
    pub id: CanonicalId,
    pub name: String,
    pub version: Option<String>,
    pub measure_type: Option<MeasureType>,
    pub measure_unit: Option<String>,
}

/// A freshly created task instance, denormalized for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTask {
    pub task: TaskInstance,
    pub domain_name: String,
    pub canonical: Option<CanonicalSummary>,
}

/// Success value of [`TaskService::create_task`](crate::tasks::TaskService::create_task).
#[derive(Debug, Clone)]
pub struct TaskCreated {
    pub task: CreatedTask,
    pub method: CreationMethod,
}

// ---------------------------------------------------------------------------
// Match verdict
// ---------------------------------------------------------------------------

/// The new task's fields the oracle sees.
#[derive(Debug, Clone)]
pub struct TaskProbe {
    pub name: String,
    pub description: Option<String>,
}

/// The oracle's judgment for one comparison, parsed from its response text.
/// Consumed by the matcher and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub match_found: bool,
    #[serde(default)]
    pub matched_canonical_task_id: Option<CanonicalId>,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// The matcher's decision for a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// Link to this existing canonical task.
    Existing(CanonicalId),
    /// No sufficiently similar canonical task; create a new one.
    NoMatch,
}

// ---------------------------------------------------------------------------
// Projects and domains
// ---------------------------------------------------------------------------

/// A project: the top-level container users create work in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A domain: a named slice of a project that tasks are logged against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an orphan-repair run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Instances successfully linked during the run.
    pub linked: u64,
    /// New canonical tasks created during the run.
    pub created: u64,
}
