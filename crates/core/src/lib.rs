//! `hosteldesk-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the employee and
//! escalation modules (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod settings;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{AccountId, DocumentKey, EscalationId};
pub use settings::{SettingKind, Settings};
