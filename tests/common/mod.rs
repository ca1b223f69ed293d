//! In-memory fakes shared by the integration tests: a store backed by Vecs
//! and an oracle that follows a script.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use sensei_core::error::{Error, Result};
use sensei_core::model::*;
use sensei_core::oracle::SimilarityOracle;
use sensei_core::store::TaskStore;

// ---------------------------------------------------------------------------
// Fake store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    projects: Vec<Project>,
    domains: Vec<Domain>,
    canonicals: Vec<CanonicalTask>,
    instances: Vec<TaskInstance>,
}

/// Vec-backed store. Insertion order stands in for creation order, which
/// keeps orphan processing deterministic without timestamp games.
#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<Inner>,
    /// When set, `link_instance` fails for this task id once per call.
    fail_link_for: Mutex<Option<TaskId>>,
    /// When set, `insert_canonical` fails for this canonical name.
    fail_canonical_named: Mutex<Option<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_link_for(&self, id: TaskId) {
        *self.fail_link_for.lock().unwrap() = Some(id);
    }

    pub fn fail_canonical_named(&self, name: impl Into<String>) {
        *self.fail_canonical_named.lock().unwrap() = Some(name.into());
    }

    pub fn canonicals(&self) -> Vec<CanonicalTask> {
        self.inner.lock().unwrap().canonicals.clone()
    }

    pub fn instances(&self) -> Vec<TaskInstance> {
        self.inner.lock().unwrap().instances.clone()
    }

    pub fn canonical_count(&self) -> usize {
        self.inner.lock().unwrap().canonicals.len()
    }

    pub fn instance_count(&self) -> usize {
        self.inner.lock().unwrap().instances.len()
    }
}

#[async_trait]
impl TaskStore for FakeStore {
    async fn insert_project(
        &self,
        owner: UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        let project = Project {
            id: ProjectId::new(),
            user_id: owner,
            name: name.to_string(),
            description: description.map(String::from),
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().projects.push(project.clone());
        Ok(project)
    }

    async fn list_projects(&self, owner: UserId) -> Result<Vec<Project>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .projects
            .iter()
            .filter(|p| p.user_id == owner)
            .cloned()
            .collect())
    }

    async fn project_exists(&self, owner: UserId, project: ProjectId) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .projects
            .iter()
            .any(|p| p.id == project && p.user_id == owner))
    }

    async fn insert_domain(
        &self,
        owner: UserId,
        project: ProjectId,
        name: &str,
    ) -> Result<Domain> {
        let domain = Domain {
            id: DomainId::new(),
            user_id: owner,
            project_id: project,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().domains.push(domain.clone());
        Ok(domain)
    }

    async fn list_domains(&self, owner: UserId, project: ProjectId) -> Result<Vec<Domain>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .domains
            .iter()
            .filter(|d| d.user_id == owner && d.project_id == project)
            .cloned()
            .collect())
    }

    async fn domain_name(&self, owner: UserId, domain: DomainId) -> Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .domains
            .iter()
            .find(|d| d.id == domain && d.user_id == owner)
            .map(|d| d.name.clone()))
    }

    async fn canonical_candidates(
        &self,
        owner: UserId,
        domain: DomainId,
        version: Option<&str>,
    ) -> Result<Vec<MatchCandidate>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .canonicals
            .iter()
            .filter(|c| {
                c.user_id == owner && c.domain_id == domain && c.version.as_deref() == version
            })
            .map(|c| MatchCandidate {
                id: c.id,
                name: c.name.clone(),
                description: c.description.clone(),
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
        Ok(self
            .inner
            .lock()
            .unwrap()
            .canonicals
            .iter()
            .find(|c| {
                c.user_id == owner
                    && c.project_id == project
                    && c.domain_id == domain
                    && c.name == name
                    && c.version.as_deref() == version
            })
            .map(|c| c.id))
    }

    async fn get_canonical(
        &self,
        owner: UserId,
        id: CanonicalId,
    ) -> Result<Option<CanonicalTask>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .canonicals
            .iter()
            .find(|c| c.id == id && c.user_id == owner)
            .cloned())
    }

    async fn insert_canonical(&self, new: NewCanonicalTask) -> Result<CanonicalTask> {
        if self.fail_canonical_named.lock().unwrap().as_deref() == Some(new.name.as_str()) {
            return Err(Error::Store("injected canonical insert failure".into()));
        }
        let now = Utc::now();
        let canonical = CanonicalTask {
            id: CanonicalId::new(),
            user_id: new.user_id,
            project_id: new.project_id,
            domain_id: new.domain_id,
            name: new.name,
            description: new.description,
            notes: None,
            version: new.version,
            measure_type: new.measure_type,
            measure_unit: new.measure_unit,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().canonicals.push(canonical.clone());
        Ok(canonical)
    }

    async fn update_canonical_notes(
        &self,
        owner: UserId,
        id: CanonicalId,
        notes: Option<&str>,
    ) -> Result<CanonicalTask> {
        let mut inner = self.inner.lock().unwrap();
        let canonical = inner
            .canonicals
            .iter_mut()
            .find(|c| c.id == id && c.user_id == owner)
            .ok_or_else(|| Error::NotFound(format!("canonical task {id}")))?;
        canonical.notes = notes.map(String::from);
        canonical.updated_at = Utc::now();
        Ok(canonical.clone())
    }

    async fn delete_canonical(&self, owner: UserId, id: CanonicalId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.canonicals.len();
        inner
            .canonicals
            .retain(|c| !(c.id == id && c.user_id == owner));
        if inner.canonicals.len() == before {
            return Err(Error::NotFound(format!("canonical task {id}")));
        }
        for instance in &mut inner.instances {
            if instance.canonical_task_id == Some(id) {
                instance.canonical_task_id = None;
            }
        }
        Ok(())
    }

    async fn insert_instance(&self, new: NewTaskInstance) -> Result<TaskInstance> {
        let now = Utc::now();
        let instance = TaskInstance {
            id: TaskId::new(),
            user_id: new.user_id,
            project_id: new.project_id,
            domain_id: new.domain_id,
            canonical_task_id: new.canonical_task_id,
            name: new.name,
            description: new.description,
            notes: new.notes,
            version: new.version,
            measure_type: new.measure_type,
            measure_unit: new.measure_unit,
            target_value: new.target_value,
            timebox_value: new.timebox_value,
            timebox_unit: new.timebox_unit,
            scheduled_date: new.scheduled_date,
            status: new.status,
            completed_at: None,
            actual_minutes: None,
            actual_work: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().instances.push(instance.clone());
        Ok(instance)
    }

    async fn get_instance(&self, owner: UserId, id: TaskId) -> Result<TaskInstance> {
        self.inner
            .lock()
            .unwrap()
            .instances
            .iter()
            .find(|t| t.id == id && t.user_id == owner)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task instance {id}")))
    }

    async fn list_instances(
        &self,
        owner: UserId,
        project: ProjectId,
    ) -> Result<Vec<TaskInstance>> {
        let mut tasks: Vec<TaskInstance> = self
            .inner
            .lock()
            .unwrap()
            .instances
            .iter()
            .filter(|t| t.user_id == owner && t.project_id == project)
            .cloned()
            .collect();
        tasks.reverse();
        Ok(tasks)
    }

    async fn list_backlog(&self, owner: UserId, project: ProjectId) -> Result<Vec<TaskInstance>> {
        let mut tasks: Vec<TaskInstance> = self
            .inner
            .lock()
            .unwrap()
            .instances
            .iter()
            .filter(|t| {
                t.user_id == owner && t.project_id == project && t.scheduled_date.is_none()
            })
            .cloned()
            .collect();
        tasks.reverse();
        Ok(tasks)
    }

    async fn orphaned_instances(
        &self,
        owner: UserId,
        project: ProjectId,
    ) -> Result<Vec<TaskInstance>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .instances
            .iter()
            .filter(|t| {
                t.user_id == owner && t.project_id == project && t.canonical_task_id.is_none()
            })
            .cloned()
            .collect())
    }

    async fn link_instance(&self, id: TaskId, canonical: CanonicalId) -> Result<()> {
        if *self.fail_link_for.lock().unwrap() == Some(id) {
            return Err(Error::Store("injected link failure".into()));
        }
        let mut inner = self.inner.lock().unwrap();
        let instance = inner
            .instances
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("task instance {id}")))?;
        instance.canonical_task_id = Some(canonical);
        instance.updated_at = Utc::now();
        Ok(())
    }

    async fn set_instance_status(
        &self,
        owner: UserId,
        id: TaskId,
        to: TaskStatus,
        check_in: Option<CheckIn>,
    ) -> Result<TaskInstance> {
        let mut inner = self.inner.lock().unwrap();
        let instance = inner
            .instances
            .iter_mut()
            .find(|t| t.id == id && t.user_id == owner)
            .ok_or_else(|| Error::NotFound(format!("task instance {id}")))?;
        let now = Utc::now();
        instance.status = to;
        instance.updated_at = now;
        if to == TaskStatus::Completed {
            instance.completed_at = Some(now);
        }
        if let Some(check_in) = check_in {
            if check_in.actual_minutes.is_some() {
                instance.actual_minutes = check_in.actual_minutes;
            }
            if check_in.actual_work.is_some() {
                instance.actual_work = check_in.actual_work;
            }
        }
        Ok(instance.clone())
    }

    async fn delete_instance(&self, owner: UserId, id: TaskId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.instances.len();
        inner
            .instances
            .retain(|t| !(t.id == id && t.user_id == owner));
        if inner.instances.len() == before {
            return Err(Error::NotFound(format!("task instance {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scripted oracle
// ---------------------------------------------------------------------------

enum Behavior {
    Verdict(MatchResult),
    /// Call-level failure: the matcher falls back to exact name matching.
    CallFailure(String),
    /// Service-level outage: propagates, the orchestrator degrades.
    Unavailable(String),
}

/// Oracle that returns a fixed response and counts its calls.
pub struct ScriptedOracle {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn verdict(match_found: bool, id: Option<CanonicalId>, confidence: f64) -> Self {
        Self {
            behavior: Behavior::Verdict(MatchResult {
                match_found,
                matched_canonical_task_id: id,
                confidence,
                reasoning: None,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::CallFailure(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Unavailable(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilarityOracle for ScriptedOracle {
    async fn judge(
        &self,
        _probe: &TaskProbe,
        _domain_name: &str,
        _candidates: &[MatchCandidate],
    ) -> Result<MatchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Verdict(result) => Ok(result.clone()),
            Behavior::CallFailure(message) => Err(Error::Oracle(message.clone())),
            Behavior::Unavailable(message) => Err(Error::OracleUnavailable(message.clone())),
        }
    }
}
