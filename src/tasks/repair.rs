//! Orphan repair: retroactively link instances that have no canonical task.
//!
//! Runs on demand, e.g. after a migration or a stretch of degraded creations.
//! Deliberately uses exact name matching only — no oracle calls — so batch
//! repair stays deterministic and cheap at scale.

use opentelemetry::KeyValue;

use super::TaskService;
use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;

impl TaskService {
    /// Link every orphaned instance in a project to a canonical task,
    /// creating canonical tasks where no exact (case-sensitive, trimmed)
    /// name match exists in the instance's (domain, version-bucket) scope.
    ///
    /// A single instance's failure is logged and skipped; the batch
    /// continues. Safe to re-run: repaired instances drop out of the orphan
    /// query, so a second run over a fully repaired project reports zeros.
    pub async fn link_orphans(&self, owner: UserId, project: ProjectId) -> Result<RepairReport> {
        if !self.store.project_exists(owner, project).await? {
            return Err(Error::NotFound(format!("project {project}")));
        }

        let orphans = self.store.orphaned_instances(owner, project).await?;
        tracing::info!(project = %project, count = orphans.len(), "starting orphan repair");

        let mut report = RepairReport::default();

        for task in orphans {
            // Rows written before version normalization may carry an empty
            // string; collapse to the bucket before scope matching.
            let version = version_bucket(task.version.as_deref());
            let name = task.name.trim().to_string();

            let found = match self
                .store
                .find_canonical_by_name(owner, project, task.domain_id, &name, version.as_deref())
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(task = %task.id, error = %e, "orphan lookup failed, skipping");
                    continue;
                }
            };

            let canonical_id = match found {
                Some(id) => id,
                None => {
                    let new = NewCanonicalTask {
                        user_id: owner,
                        project_id: project,
                        domain_id: task.domain_id,
                        name,
                        description: task.description.clone(),
                        version,
                        measure_type: None,
                        measure_unit: None,
                    };
                    match self.store.insert_canonical(new).await {
                        Ok(canonical) => {
                            report.created += 1;
                            canonical.id
                        }
                        Err(e) => {
                            tracing::warn!(task = %task.id, error = %e, "canonical create failed, skipping");
                            continue;
                        }
                    }
                }
            };

            if let Err(e) = self.store.link_instance(task.id, canonical_id).await {
                tracing::warn!(task = %task.id, error = %e, "link failed, skipping");
                continue;
            }
            report.linked += 1;
        }

        metrics::orphans_linked().add(report.linked, &[KeyValue::new("project", project.to_string())]);
        tracing::info!(
            project = %project,
            linked = report.linked,
            created = report.created,
            "orphan repair complete"
        );

        Ok(report)
    }
}
