pub mod audit;
pub mod collection;
pub mod config;
pub mod dates;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod records;
pub mod store;

pub use collection::{CollectionDecision, CollectionPolicy, StopReason};
pub use domain::attempt::{AttemptReason, AttemptType, CollectionAttempt};
pub use domain::celebration::{CelebrationCandidate, CelebrationCategory, CelebrationDraft};
pub use domain::conversation::{Awaiting, ConversationState, PendingQuestion};
pub use domain::message::{OutboundKind, OutboundMessage};
pub use domain::schedule::{
    OfficeScheduleCandidate, OfficeStatus, ScheduleQuestion, ScheduleScope, ScheduleSubmission,
    TargetPeriod, WorkDay,
};
pub use domain::user::{UserContext, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use records::{
    MomentRecord, NewMoment, NewUser, RecordStore, RecordStoreError, ScheduleStore, UserRecord,
};
pub use store::{CollectionLedger, ConversationStateStore, StoreError};
