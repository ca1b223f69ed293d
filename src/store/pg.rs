//! Postgres implementation of [`TaskStore`].
//!
//! Owns the connection pool, runs migrations, and maps rows into model types.
//! Table and column names are private to this module — nothing outside the
//! store depends on them.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::TaskStore;
use crate::error::{Error, Result};
use crate::model::*;

/// Postgres-backed store. Cheap to clone handles are not needed — wrap in an
/// `Arc` at the composition root.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Store(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Simple health check — run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const INSTANCE_COLS: &str = "id, user_id, project_id, domain_id, canonical_task_id, task_name, \
     description, notes, version, measure_type, measure_unit, target_value, timebox_value, \
     timebox_unit, scheduled_date, status, completed_at, actual_minutes, actual_work, \
     created_at, updated_at";

const CANONICAL_COLS: &str = "id, user_id, project_id, domain_id, canonical_name, description, \
     notes, version, measure_type, measure_unit, created_at, updated_at";

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_project(
        &self,
        owner: UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        let row: ProjectRow = sqlx::query_as(
            "INSERT INTO projects (id, user_id, name, description)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, name, description, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner.0)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_projects(&self, owner: UserId) -> Result<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            "SELECT id, user_id, name, description, created_at
             FROM projects WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn project_exists(&self, owner: UserId, project: ProjectId) -> Result<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM projects WHERE id = $1 AND user_id = $2")
                .bind(project.0)
                .bind(owner.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn insert_domain(
        &self,
        owner: UserId,
        project: ProjectId,
        name: &str,
    ) -> Result<Domain> {
        let row: DomainRow = sqlx::query_as(
            "INSERT INTO domains (id, user_id, project_id, name)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, project_id, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner.0)
        .bind(project.0)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_domains(&self, owner: UserId, project: ProjectId) -> Result<Vec<Domain>> {
        let rows: Vec<DomainRow> = sqlx::query_as(
            "SELECT id, user_id, project_id, name, created_at
             FROM domains WHERE user_id = $1 AND project_id = $2 ORDER BY created_at",
        )
        .bind(owner.0)
        .bind(project.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Domain::from).collect())
    }

    async fn domain_name(&self, owner: UserId, domain: DomainId) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM domains WHERE id = $1 AND user_id = $2")
                .bind(domain.0)
                .bind(owner.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn canonical_candidates(
        &self,
        owner: UserId,
        domain: DomainId,
        version: Option<&str>,
    ) -> Result<Vec<MatchCandidate>> {
        // IS NOT DISTINCT FROM gives NULL = NULL semantics for the
        // "no version" bucket.
        let rows: Vec<(Uuid, String, Option<String>)> = sqlx::query_as(
            "SELECT id, canonical_name, description
             FROM canonical_tasks
             WHERE user_id = $1 AND domain_id = $2 AND version IS NOT DISTINCT FROM $3
             ORDER BY created_at",
        )
        .bind(owner.0)
        .bind(domain.0)
        .bind(version)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, description)| MatchCandidate {
                id: CanonicalId(id),
                name,
                description,
            })
            .collect())
    }

    async fn find_canonical_by_name(
        &self,
        owner: UserId,
        project: ProjectId,
        domain: DomainId,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<CanonicalId>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM canonical_tasks
             WHERE user_id = $1 AND project_id = $2 AND domain_id = $3
             AND canonical_name = $4 AND version IS NOT DISTINCT FROM $5
             ORDER BY created_at
             LIMIT 1",
        )
        .bind(owner.0)
        .bind(project.0)
        .bind(domain.0)
        .bind(name)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| CanonicalId(r.0)))
    }

    async fn get_canonical(
        &self,
        owner: UserId,
        id: CanonicalId,
    ) -> Result<Option<CanonicalTask>> {
        let row: Option<CanonicalRow> = sqlx::query_as(&format!(
            "SELECT {CANONICAL_COLS} FROM canonical_tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.0)
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CanonicalRow::try_into_canonical).transpose()
    }

    async fn insert_canonical(&self, new: NewCanonicalTask) -> Result<CanonicalTask> {
        let row: CanonicalRow = sqlx::query_as(&format!(
            "INSERT INTO canonical_tasks
             (id, user_id, project_id, domain_id, canonical_name, description, version,
              measure_type, measure_unit)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {CANONICAL_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.user_id.0)
        .bind(new.project_id.0)
        .bind(new.domain_id.0)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.version)
        .bind(new.measure_type.map(|m| m.to_string()))
        .bind(&new.measure_unit)
        .fetch_one(&self.pool)
        .await?;
        row.try_into_canonical()
    }

    async fn update_canonical_notes(
        &self,
        owner: UserId,
        id: CanonicalId,
        notes: Option<&str>,
    ) -> Result<CanonicalTask> {
        let row: Option<CanonicalRow> = sqlx::query_as(&format!(
            "UPDATE canonical_tasks SET notes = $1, updated_at = now()
             WHERE id = $2 AND user_id = $3
             RETURNING {CANONICAL_COLS}"
        ))
        .bind(notes)
        .bind(id.0)
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| Error::NotFound(format!("canonical task {id}")))?
            .try_into_canonical()
    }

    async fn delete_canonical(&self, owner: UserId, id: CanonicalId) -> Result<()> {
        // The FK on task_instances is ON DELETE SET NULL: instances are
        // unlinked, not deleted.
        let rows = sqlx::query("DELETE FROM canonical_tasks WHERE id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(owner.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows == 0 {
            return Err(Error::NotFound(format!("canonical task {id}")));
        }
        Ok(())
    }

    async fn insert_instance(&self, new: NewTaskInstance) -> Result<TaskInstance> {
        let row: InstanceRow = sqlx::query_as(&format!(
            "INSERT INTO task_instances
             (id, user_id, project_id, domain_id, canonical_task_id, task_name, description,
              notes, version, measure_type, measure_unit, target_value, timebox_value,
              timebox_unit, scheduled_date, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {INSTANCE_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.user_id.0)
        .bind(new.project_id.0)
        .bind(new.domain_id.0)
        .bind(new.canonical_task_id.map(|c| c.0))
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.notes)
        .bind(&new.version)
        .bind(new.measure_type.map(|m| m.to_string()))
        .bind(&new.measure_unit)
        .bind(new.target_value)
        .bind(new.timebox_value)
        .bind(&new.timebox_unit)
        .bind(new.scheduled_date)
        .bind(new.status.to_string())
        .fetch_one(&self.pool)
        .await?;
        row.try_into_instance()
    }

    async fn get_instance(&self, owner: UserId, id: TaskId) -> Result<TaskInstance> {
        let row: Option<InstanceRow> = sqlx::query_as(&format!(
            "SELECT {INSTANCE_COLS} FROM task_instances WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.0)
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| Error::NotFound(format!("task instance {id}")))?
            .try_into_instance()
    }

    async fn list_instances(
        &self,
        owner: UserId,
        project: ProjectId,
    ) -> Result<Vec<TaskInstance>> {
        let rows: Vec<InstanceRow> = sqlx::query_as(&format!(
            "SELECT {INSTANCE_COLS} FROM task_instances
             WHERE user_id = $1 AND project_id = $2
             ORDER BY created_at DESC"
        ))
        .bind(owner.0)
        .bind(project.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(InstanceRow::try_into_instance).collect()
    }

    async fn list_backlog(&self, owner: UserId, project: ProjectId) -> Result<Vec<TaskInstance>> {
        let rows: Vec<InstanceRow> = sqlx::query_as(&format!(
            "SELECT {INSTANCE_COLS} FROM task_instances
             WHERE user_id = $1 AND project_id = $2 AND scheduled_date IS NULL
             ORDER BY created_at DESC"
        ))
        .bind(owner.0)
        .bind(project.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(InstanceRow::try_into_instance).collect()
    }

    async fn orphaned_instances(
        &self,
        owner: UserId,
        project: ProjectId,
    ) -> Result<Vec<TaskInstance>> {
        let rows: Vec<InstanceRow> = sqlx::query_as(&format!(
            "SELECT {INSTANCE_COLS} FROM task_instances
             WHERE user_id = $1 AND project_id = $2 AND canonical_task_id IS NULL
             ORDER BY created_at"
        ))
        .bind(owner.0)
        .bind(project.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(InstanceRow::try_into_instance).collect()
    }

    async fn link_instance(&self, id: TaskId, canonical: CanonicalId) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE task_instances SET canonical_task_id = $1, updated_at = now() WHERE id = $2",
        )
        .bind(canonical.0)
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if rows == 0 {
            return Err(Error::NotFound(format!("task instance {id}")));
        }
        Ok(())
    }

    async fn set_instance_status(
        &self,
        owner: UserId,
        id: TaskId,
        to: TaskStatus,
        check_in: Option<CheckIn>,
    ) -> Result<TaskInstance> {
        let now = chrono::Utc::now();
        let completed_at = (to == TaskStatus::Completed).then_some(now);
        let check_in = check_in.unwrap_or_default();

        let row: Option<InstanceRow> = sqlx::query_as(&format!(
            "UPDATE task_instances
             SET status = $1, updated_at = $2,
                 completed_at = COALESCE($3, completed_at),
                 actual_minutes = COALESCE($4, actual_minutes),
                 actual_work = COALESCE($5, actual_work)
             WHERE id = $6 AND user_id = $7
             RETURNING {INSTANCE_COLS}"
        ))
        .bind(to.to_string())
        .bind(now)
        .bind(completed_at)
        .bind(check_in.actual_minutes)
        .bind(&check_in.actual_work)
        .bind(id.0)
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| Error::NotFound(format!("task instance {id}")))?
            .try_into_instance()
    }

    async fn delete_instance(&self, owner: UserId, id: TaskId) -> Result<()> {
        // No cascade: the canonical task stays.
        let rows = sqlx::query("DELETE FROM task_instances WHERE id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(owner.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows == 0 {
            return Err(Error::NotFound(format!("task instance {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId(row.id),
            user_id: UserId(row.user_id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DomainRow {
    id: Uuid,
    user_id: Uuid,
    project_id: Uuid,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<DomainRow> for Domain {
    fn from(row: DomainRow) -> Self {
        Self {
            id: DomainId(row.id),
            user_id: UserId(row.user_id),
            project_id: ProjectId(row.project_id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CanonicalRow {
    id: Uuid,
    user_id: Uuid,
    project_id: Uuid,
    domain_id: Uuid,
    canonical_name: String,
    description: Option<String>,
    notes: Option<String>,
    version: Option<String>,
    measure_type: Option<String>,
    measure_unit: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl CanonicalRow {
    fn try_into_canonical(self) -> Result<CanonicalTask> {
        Ok(CanonicalTask {
            id: CanonicalId(self.id),
            user_id: UserId(self.user_id),
            project_id: ProjectId(self.project_id),
            domain_id: DomainId(self.domain_id),
            name: self.canonical_name,
            description: self.description,
            notes: self.notes,
            version: self.version,
            measure_type: self.measure_type.map(|m| m.parse()).transpose()?,
            measure_unit: self.measure_unit,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InstanceRow {
    id: Uuid,
    user_id: Uuid,
    project_id: Uuid,
    domain_id: Uuid,
    canonical_task_id: Option<Uuid>,
    task_name: String,
    description: Option<String>,
    notes: Option<String>,
    version: Option<String>,
    measure_type: Option<String>,
    measure_unit: Option<String>,
    target_value: Option<f64>,
    timebox_value: Option<f64>,
    timebox_unit: Option<String>,
    scheduled_date: Option<chrono::NaiveDate>,
    status: String,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    actual_minutes: Option<f64>,
    actual_work: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl InstanceRow {
    fn try_into_instance(self) -> Result<TaskInstance> {
        Ok(TaskInstance {
            id: TaskId(self.id),
            user_id: UserId(self.user_id),
            project_id: ProjectId(self.project_id),
            domain_id: DomainId(self.domain_id),
            canonical_task_id: self.canonical_task_id.map(CanonicalId),
            name: self.task_name,
            description: self.description,
            notes: self.notes,
            version: self.version,
            measure_type: self.measure_type.map(|m| m.parse()).transpose()?,
            measure_unit: self.measure_unit,
            target_value: self.target_value,
            timebox_value: self.timebox_value,
            timebox_unit: self.timebox_unit,
            scheduled_date: self.scheduled_date,
            status: self.status.parse()?,
            completed_at: self.completed_at,
            actual_minutes: self.actual_minutes,
            actual_work: self.actual_work,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
