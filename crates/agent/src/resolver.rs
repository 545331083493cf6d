use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use thunai_core::{
    CelebrationCandidate, MomentRecord, NewMoment, NewUser, RecordStore, RecordStoreError,
    UserContext, UserRecord,
};
use tracing::info;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("user lookup failed: {0}")]
    Lookup(#[source] RecordStoreError),
    #[error("user provisioning failed: {0}")]
    Provision(#[source] RecordStoreError),
    #[error("moment could not be recorded: {0}")]
    Commit(#[source] RecordStoreError),
}

/// How a name was matched to a user record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Exact(UserRecord),
    Partial(UserRecord),
    Provisioned(UserRecord),
}

impl Resolution {
    pub fn into_record(self) -> UserRecord {
        match self {
            Self::Exact(record) | Self::Partial(record) | Self::Provisioned(record) => record,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Exact(_) => "exact",
            Self::Partial(_) => "partial",
            Self::Provisioned(_) => "provisioned",
        }
    }
}

/// Maps people named in chat to records in the external record store, creating
/// placeholder users for names it has never seen.
pub struct CelebrantResolver {
    records: Arc<dyn RecordStore>,
    email_domain: String,
    timeout: Duration,
}

impl CelebrantResolver {
    pub fn new(
        records: Arc<dyn RecordStore>,
        email_domain: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self { records, email_domain: email_domain.into(), timeout }
    }

    /// Exact name match first, then a case-insensitive partial match, then a new user.
    pub async fn resolve(&self, name: &str) -> Result<Resolution, ResolverError> {
        let name = name.trim();
        if let Some(record) =
            self.bounded(self.records.find_user_by_name(name)).await.map_err(ResolverError::Lookup)?
        {
            return Ok(Resolution::Exact(record));
        }

        let matches =
            self.bounded(self.records.search_users(name)).await.map_err(ResolverError::Lookup)?;
        let first_name_match = matches.iter().find(|record| {
            record
                .name
                .split_whitespace()
                .next()
                .is_some_and(|first| first.eq_ignore_ascii_case(name))
        });
        if let Some(record) = first_name_match.or_else(|| matches.first()) {
            return Ok(Resolution::Partial(record.clone()));
        }

        let slug = slug(name);
        let new_user = NewUser {
            name: name.to_owned(),
            external_id: format!("{slug}-{}", Utc::now().timestamp_millis()),
            email: format!("{slug}@{}", self.email_domain),
            is_admin: false,
        };
        let record = self
            .bounded(self.records.create_user(new_user))
            .await
            .map_err(ResolverError::Provision)?;
        info!(
            event_name = "resolver.user_provisioned",
            user_record_id = record.id,
            "created placeholder user for unrecognised name"
        );
        Ok(Resolution::Provisioned(record))
    }

    /// Record for the chat user sending a message, keyed by their chat identifier.
    pub async fn resolve_requester(
        &self,
        context: &UserContext,
    ) -> Result<UserRecord, ResolverError> {
        let external_id = context.user_id.as_str();
        if let Some(record) = self
            .bounded(self.records.find_user_by_external_id(external_id))
            .await
            .map_err(ResolverError::Lookup)?
        {
            return Ok(record);
        }

        let name = context.display_name.clone().unwrap_or_else(|| external_id.to_owned());
        let new_user = NewUser {
            email: format!("{}@{}", slug(&name), self.email_domain),
            name,
            external_id: external_id.to_owned(),
            is_admin: false,
        };
        self.bounded(self.records.create_user(new_user)).await.map_err(ResolverError::Provision)
    }

    /// Resolves the celebrant and requester, then records the moment.
    pub async fn commit_moment(
        &self,
        candidate: &CelebrationCandidate,
        requester: &UserContext,
    ) -> Result<MomentRecord, ResolverError> {
        let resolution = self.resolve(&candidate.person_name).await?;
        let creator = self.resolve_requester(requester).await?;
        let match_kind = resolution.kind();
        let celebrant = resolution.into_record();

        let moment = NewMoment {
            person_name: celebrant.name.clone(),
            moment_type: candidate.category.as_str().to_owned(),
            moment_date: candidate.date,
            description: format!(
                "{}'s {}: {}",
                celebrant.name,
                candidate.category.label(),
                candidate.source_text
            ),
            created_by: creator.id,
        };
        let record =
            self.bounded(self.records.create_moment(moment)).await.map_err(ResolverError::Commit)?;
        info!(
            event_name = "resolver.moment_recorded",
            correlation_id = %requester.correlation_id,
            moment_id = record.id,
            match_kind,
            "celebration moment recorded"
        );
        Ok(record)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RecordStoreError>>,
    ) -> Result<T, RecordStoreError> {
        bounded(self.timeout, call).await
    }
}

/// Applies the record store timeout to a single call.
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, RecordStoreError>>,
) -> Result<T, RecordStoreError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RecordStoreError::Timeout(timeout.as_secs())),
    }
}

fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for character in name.trim().chars() {
        if character.is_alphanumeric() {
            slug.extend(character.to_lowercase());
        } else if !slug.ends_with('.') && !slug.is_empty() {
            slug.push('.');
        }
    }
    let slug = slug.trim_end_matches('.');
    if slug.is_empty() {
        "user".to_owned()
    } else {
        slug.to_owned()
    }
}
