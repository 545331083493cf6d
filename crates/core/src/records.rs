//! Port to the external system of record holding users, moments and schedules.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::celebration::CelebrationCategory;
use crate::domain::schedule::ScheduleSubmission;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub external_id: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub external_id: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentRecord {
    pub id: i64,
    pub person_name: String,
    pub moment_type: String,
    pub moment_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: Option<i64>,
}

impl MomentRecord {
    pub fn category(&self) -> CelebrationCategory {
        CelebrationCategory::from_label(&self.moment_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMoment {
    pub person_name: String,
    pub moment_type: String,
    pub moment_date: NaiveDate,
    pub description: String,
    pub created_by: i64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordStoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store timed out after {0}s")]
    Timeout(u64),
    #[error("record store rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("record store response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, RecordStoreError>;
    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RecordStoreError>;
    /// Users whose name contains `fragment`, case-insensitively.
    async fn search_users(&self, fragment: &str) -> Result<Vec<UserRecord>, RecordStoreError>;
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RecordStoreError>;
    async fn create_moment(&self, moment: NewMoment) -> Result<MomentRecord, RecordStoreError>;
    async fn find_moments_by_person(
        &self,
        person_name: &str,
    ) -> Result<Vec<MomentRecord>, RecordStoreError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn save_schedule(&self, submission: ScheduleSubmission) -> Result<(), RecordStoreError>;
}
