use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Application, ApplicationId, Job, JobId};
use super::repository::{Changeset, Committed, MarketplaceRepository, RepositoryError};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub jobs: BTreeMap<JobId, Job>,
    pub applications: BTreeMap<ApplicationId, Application>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: StoreSnapshot,
    job_sequence: u64,
    application_sequence: u64,
}

/// Process-local store. A single mutex covers every table, so a commit is
/// observed either completely or not at all.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketplaceStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryMarketplaceStore {
    pub fn snapshot(&self) -> Result<StoreSnapshot, RepositoryError> {
        Ok(self.lock()?.tables.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn stale(kind: &str, id: &str, stored: u64, expected: u64) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "{kind} {id} is at version {stored}, write expected {expected}"
    ))
}

impl MarketplaceRepository for InMemoryMarketplaceStore {
    fn next_job_id(&self) -> Result<JobId, RepositoryError> {
        let mut state = self.lock()?;
        state.job_sequence += 1;
        Ok(JobId(format!("job-{:06}", state.job_sequence)))
    }

    fn insert_job(&self, mut job: Job) -> Result<Job, RepositoryError> {
        let mut state = self.lock()?;
        if state.tables.jobs.contains_key(&job.id) {
            return Err(RepositoryError::Duplicate);
        }
        job.version = 1;
        state.tables.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.tables.jobs.get(id).cloned())
    }

    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        let mut state = self.lock()?;
        state.application_sequence += 1;
        Ok(ApplicationId(format!("app-{:06}", state.application_sequence)))
    }

    fn insert_application(
        &self,
        job: &Job,
        mut application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.lock()?;
        let tables = &mut state.tables;

        let stored_job = tables
            .jobs
            .get_mut(&job.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored_job.version != job.version {
            return Err(stale("job", &job.id.0, stored_job.version, job.version));
        }

        let duplicate = tables.applications.contains_key(&application.id)
            || tables.applications.values().any(|existing| {
                existing.job_id == application.job_id
                    && existing.tradesperson_id == application.tradesperson_id
            });
        if duplicate {
            return Err(RepositoryError::Duplicate);
        }

        stored_job.version += 1;
        application.version = 1;
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.tables.applications.get(id).cloned())
    }

    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        let state = self.lock()?;
        let mut applications: Vec<Application> = state
            .tables
            .applications
            .values()
            .filter(|application| &application.job_id == job_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(applications)
    }

    fn commit(&self, changeset: Changeset) -> Result<Committed, RepositoryError> {
        if changeset.is_empty() {
            return Ok(Committed::default());
        }
        let mut state = self.lock()?;
        let tables = &mut state.tables;

        for job in &changeset.jobs {
            match tables.jobs.get(&job.id) {
                Some(stored) if stored.version == job.version => {}
                Some(stored) => return Err(stale("job", &job.id.0, stored.version, job.version)),
                None => return Err(RepositoryError::NotFound),
            }
        }
        for application in &changeset.applications {
            match tables.applications.get(&application.id) {
                Some(stored) if stored.version == application.version => {}
                Some(stored) => {
                    return Err(stale(
                        "application",
                        &application.id.0,
                        stored.version,
                        application.version,
                    ))
                }
                None => return Err(RepositoryError::NotFound),
            }
        }

        let mut committed = Committed::default();
        for mut job in changeset.jobs {
            job.version += 1;
            tables.jobs.insert(job.id.clone(), job.clone());
            committed.jobs.push(job);
        }
        for mut application in changeset.applications {
            application.version += 1;
            tables
                .applications
                .insert(application.id.clone(), application.clone());
            committed.applications.push(application);
        }

        Ok(committed)
    }
}
