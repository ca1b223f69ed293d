//! Task creation: the enriched pipeline and its degraded fallback.

use opentelemetry::KeyValue;

use super::TaskService;
use crate::error::{Error, Result};
use crate::matcher::CanonicalMatcher;
use crate::model::*;
use crate::telemetry::metrics;

impl TaskService {
    /// Create a task instance, linked to a canonical task when possible.
    ///
    /// The enriched pipeline resolves the domain, loads canonical candidates
    /// in the (owner, domain, version-bucket) scope, consults the matcher,
    /// and links the instance to a reused or freshly created canonical task.
    /// If the enriched pipeline fails because the oracle's hosting layer is
    /// unreachable, the instance is created anyway with no canonical link —
    /// explicitly orphaned, repairable later — and the result is tagged
    /// [`CreationMethod::Degraded`]. Validation and store errors surface as
    /// failures; they never degrade.
    ///
    /// Side effects: at most one new canonical row, exactly one instance row.
    /// Not idempotent across retries.
    pub async fn create_task(&self, owner: UserId, request: NewTaskRequest) -> Result<TaskCreated> {
        let request = request.validate()?;

        if !self.store.project_exists(owner, request.project_id).await? {
            return Err(Error::NotFound(format!("project {}", request.project_id)));
        }

        match self.create_enriched(owner, &request).await {
            Ok(task) => {
                metrics::tasks_created().add(1, &[KeyValue::new("method", "enriched")]);
                Ok(TaskCreated {
                    task,
                    method: CreationMethod::Enriched,
                })
            }
            Err(e) if e.is_environmental() => {
                tracing::warn!(
                    task = %request.name,
                    error = %e,
                    "enriched pipeline unavailable, creating without canonical link"
                );
                let task = self.create_degraded(owner, &request).await?;
                metrics::tasks_created().add(1, &[KeyValue::new("method", "degraded")]);
                Ok(TaskCreated {
                    task,
                    method: CreationMethod::Degraded,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Full pipeline: domain → candidates → match → canonical → instance.
    async fn create_enriched(&self, owner: UserId, request: &NewTaskRequest) -> Result<CreatedTask> {
        let domain_name = self
            .store
            .domain_name(owner, request.domain_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("domain {}", request.domain_id)))?;

        let candidates = self
            .store
            .canonical_candidates(owner, request.domain_id, request.version.as_deref())
            .await?;

        let probe = TaskProbe {
            name: request.name.clone(),
            description: request.description.clone(),
        };
        let decision = CanonicalMatcher::new(self.oracle.as_ref())
            .resolve(&probe, &domain_name, &candidates)
            .await?;

        let canonical = match decision {
            MatchDecision::Existing(id) => {
                metrics::canonical_matches().add(1, &[KeyValue::new("outcome", "reused")]);
                self.store
                    .get_canonical(owner, id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("canonical task {id}")))?
            }
            MatchDecision::NoMatch => {
                metrics::canonical_matches().add(1, &[KeyValue::new("outcome", "created")]);
                self.store
                    .insert_canonical(NewCanonicalTask {
                        user_id: owner,
                        project_id: request.project_id,
                        domain_id: request.domain_id,
                        name: request.name.clone(),
                        description: request.description.clone(),
                        version: request.version.clone(),
                        measure_type: request.measure_type,
                        measure_unit: request.measure_unit.clone(),
                    })
                    .await?
            }
        };

        let instance = self
            .store
            .insert_instance(self.instance_fields(owner, request, Some(canonical.id)))
            .await?;

        tracing::info!(
            task = %instance.id,
            canonical = %canonical.id,
            "task created with canonical link"
        );

        Ok(CreatedTask {
            task: instance,
            domain_name,
            canonical: Some(CanonicalSummary {
                id: canonical.id,
                name: canonical.name,
                version: canonical.version,
                measure_type: canonical.measure_type,
                measure_unit: canonical.measure_unit,
            }),
        })
    }

    /// Degraded path: direct insert, no canonical link, no oracle.
    async fn create_degraded(&self, owner: UserId, request: &NewTaskRequest) -> Result<CreatedTask> {
        let domain_name = self
            .store
            .domain_name(owner, request.domain_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("domain {}", request.domain_id)))?;

        let instance = self
            .store
            .insert_instance(self.instance_fields(owner, request, None))
            .await?;

        tracing::info!(task = %instance.id, "task created without canonical link");

        Ok(CreatedTask {
            task: instance,
            domain_name,
            canonical: None,
        })
    }

    fn instance_fields(
        &self,
        owner: UserId,
        request: &NewTaskRequest,
        canonical_task_id: Option<CanonicalId>,
    ) -> NewTaskInstance {
        NewTaskInstance {
            user_id: owner,
            project_id: request.project_id,
            domain_id: request.domain_id,
            canonical_task_id,
            name: request.name.clone(),
            description: request.description.clone(),
            notes: request.notes.clone(),
            version: request.version.clone(),
            measure_type: request.measure_type,
            measure_unit: request.measure_unit.clone(),
            target_value: request.target_value,
            timebox_value: request.timebox_value,
            timebox_unit: request.timebox_unit.clone(),
            scheduled_date: request.scheduled_date,
            status: TaskStatus::Pending,
        }
    }
}
