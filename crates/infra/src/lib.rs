//! Infrastructure layer: identity provider, record stores, mail delivery,
//! configuration, and the lifecycle/workflow services built on them.

pub mod access;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod mail;
pub mod notify;
pub mod retry;
pub mod store;
pub mod workflow;

pub use access::{authenticate, bearer_token};
pub use config::AppConfig;
pub use error::ServiceError;
pub use identity::{IdentityGateway, IdentityProvider, InMemoryIdentityProvider};
pub use lifecycle::{EmployeeLifecycle, StatusChangeOutcome};
pub use mail::{HttpMailer, LogMailer, Mailer, MemoryMailer};
pub use notify::{DispatchReport, NotificationDispatcher, StatusUpdateNotice};
pub use retry::RetryPolicy;
pub use workflow::{EscalationWorkflow, WorkflowOutcome};
