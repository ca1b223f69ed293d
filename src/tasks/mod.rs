//! Task operations: creation with canonical linking, orphan repair, and
//! status transitions.
//!
//! [`TaskService`] is the entry point the API/UI layer talks to. It owns no
//! state of its own — the store and oracle are injected so tests can
//! substitute fakes.

pub mod create;
pub mod repair;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{CheckIn, TaskId, TaskInstance, TaskStatus, UserId};
use crate::oracle::SimilarityOracle;
use crate::store::TaskStore;

/// Request-scoped task operations over an injected store and oracle.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    oracle: Arc<dyn SimilarityOracle>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, oracle: Arc<dyn SimilarityOracle>) -> Self {
        Self { store, oracle }
    }

    /// Move a task to a new status, validating the transition.
    pub async fn update_status(
        &self,
        owner: UserId,
        id: TaskId,
        to: TaskStatus,
    ) -> Result<TaskInstance> {
        let current = self.store.get_instance(owner, id).await?;
        validate_transition(current.status, to)?;
        self.store.set_instance_status(owner, id, to, None).await
    }

    /// Check a task in: transition to completed and record what actually
    /// happened (time spent, work done).
    pub async fn complete_task(
        &self,
        owner: UserId,
        id: TaskId,
        check_in: CheckIn,
    ) -> Result<TaskInstance> {
        let current = self.store.get_instance(owner, id).await?;
        validate_transition(current.status, TaskStatus::Completed)?;
        self.store
            .set_instance_status(owner, id, TaskStatus::Completed, Some(check_in))
            .await
    }
}

/// Validate a status transition, returning an error if disallowed.
fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
