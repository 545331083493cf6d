use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use thunai_core::domain::schedule::ScheduleSubmission;
use thunai_core::records::{
    MomentRecord, NewMoment, NewUser, RecordStore, RecordStoreError, ScheduleStore, UserRecord,
};

#[derive(Default)]
struct Records {
    users: Vec<UserRecord>,
    moments: Vec<MomentRecord>,
    schedules: Vec<ScheduleSubmission>,
}

/// Record store kept in process memory, for local runs and tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Records>,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    pub async fn with_users(names: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut records = store.records.write().await;
            for name in names {
                let id = records.users.len() as i64 + 1;
                records.users.push(UserRecord {
                    id,
                    name: (*name).to_owned(),
                    external_id: None,
                    email: None,
                    is_admin: false,
                });
            }
        }
        store
    }

    /// Makes every call fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn users(&self) -> Vec<UserRecord> {
        self.records.read().await.users.clone()
    }

    pub async fn moments(&self) -> Vec<MomentRecord> {
        self.records.read().await.moments.clone()
    }

    pub async fn schedules(&self) -> Vec<ScheduleSubmission> {
        self.records.read().await.schedules.clone()
    }

    fn check_available(&self) -> Result<(), RecordStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Unavailable("connection refused".to_owned()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, RecordStoreError> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records.users.iter().find(|user| user.name.eq_ignore_ascii_case(name.trim())).cloned())
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RecordStoreError> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records
            .users
            .iter()
            .find(|user| user.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn search_users(&self, fragment: &str) -> Result<Vec<UserRecord>, RecordStoreError> {
        self.check_available()?;
        let needle = fragment.trim().to_lowercase();
        let records = self.records.read().await;
        Ok(records
            .users
            .iter()
            .filter(|user| !needle.is_empty() && user.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RecordStoreError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        if records.users.iter().any(|existing| existing.email.as_deref() == Some(&user.email)) {
            return Err(RecordStoreError::Rejected {
                status: 409,
                message: format!("user with email {} already exists", user.email),
            });
        }
        let record = UserRecord {
            id: records.users.len() as i64 + 1,
            name: user.name,
            external_id: Some(user.external_id),
            email: Some(user.email),
            is_admin: user.is_admin,
        };
        records.users.push(record.clone());
        Ok(record)
    }

    async fn create_moment(&self, moment: NewMoment) -> Result<MomentRecord, RecordStoreError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let record = MomentRecord {
            id: records.moments.len() as i64 + 1,
            person_name: moment.person_name,
            moment_type: moment.moment_type,
            moment_date: moment.moment_date,
            description: Some(moment.description),
            created_by: Some(moment.created_by),
        };
        records.moments.push(record.clone());
        Ok(record)
    }

    async fn find_moments_by_person(
        &self,
        person_name: &str,
    ) -> Result<Vec<MomentRecord>, RecordStoreError> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records
            .moments
            .iter()
            .filter(|moment| moment.person_name.eq_ignore_ascii_case(person_name.trim()))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ScheduleStore for InMemoryRecordStore {
    async fn save_schedule(&self, submission: ScheduleSubmission) -> Result<(), RecordStoreError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        records.schedules.retain(|existing| {
            existing.user_id != submission.user_id
                || existing.week_start_date != submission.week_start_date
        });
        records.schedules.push(submission);
        Ok(())
    }
}
