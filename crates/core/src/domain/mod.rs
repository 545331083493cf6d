pub mod attempt;
pub mod celebration;
pub mod conversation;
pub mod message;
pub mod schedule;
pub mod user;
