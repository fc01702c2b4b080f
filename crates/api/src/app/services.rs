//! Service wiring: adapters behind the identity, record-store and mail
//! traits, and the lifecycle/workflow services built on them.

use std::sync::Arc;

use chrono::Utc;

use hosteldesk_auth::{Affiliation, AuthorizationClaims, Role};
use hosteldesk_core::{AccountId, Settings};
use hosteldesk_employees::Employee;
use hosteldesk_infra::{
    AppConfig, EmployeeLifecycle, EscalationWorkflow, HttpMailer, IdentityGateway, IdentityProvider,
    InMemoryIdentityProvider, LogMailer, Mailer, NotificationDispatcher, ServiceError,
    mail::MailError,
    store::{
        EmployeeStore, EscalationStore, InMemoryEmployeeStore, InMemoryEscalationStore,
        InMemorySettingsStore, SettingsStore,
    },
};

pub struct AppServices {
    pub gateway: Arc<IdentityGateway>,
    pub employees: Arc<dyn EmployeeStore>,
    pub lifecycle: EmployeeLifecycle,
    pub workflow: EscalationWorkflow,
}

/// A staff record to seed directly (bootstrap and tests).
#[derive(Debug, Clone)]
pub struct SeedEmployee {
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub department: Option<String>,
    pub is_admin: bool,
    pub is_oversight: bool,
}

impl SeedEmployee {
    pub fn admin(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            role: Role::ADMIN,
            department: None,
            is_admin: true,
            is_oversight: false,
        }
    }
}

impl AppServices {
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn IdentityProvider>,
        employees: Arc<dyn EmployeeStore>,
        escalations: Arc<dyn EscalationStore>,
        settings: Arc<dyn SettingsStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let retry = config.retry.policy();
        let gateway = Arc::new(IdentityGateway::new(provider, &config.identity, retry.clone()));
        let lifecycle = EmployeeLifecycle::new(
            gateway.clone(),
            employees.clone(),
            settings.clone(),
            config.app.reset_password_url(),
        );
        let workflow = EscalationWorkflow::new(
            employees.clone(),
            escalations,
            settings,
            NotificationDispatcher::new(mailer),
            retry,
        );

        Self {
            gateway,
            employees,
            lifecycle,
            workflow,
        }
    }

    /// In-memory adapters for every external collaborator.
    ///
    /// The identity provider is returned as well so callers can seed accounts.
    pub fn in_memory(config: &AppConfig, mailer: Arc<dyn Mailer>) -> (Self, Arc<InMemoryIdentityProvider>) {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let services = Self::new(
            config,
            provider.clone(),
            Arc::new(InMemoryEmployeeStore::new()),
            Arc::new(InMemoryEscalationStore::new()),
            Arc::new(InMemorySettingsStore::new(Settings::default())),
            mailer,
        );
        (services, provider)
    }

    /// Mail adapter for the configured endpoint (log-only when unset).
    pub fn mailer_for(config: &AppConfig) -> Result<Arc<dyn Mailer>, MailError> {
        let mailer: Arc<dyn Mailer> = match &config.mail.endpoint {
            Some(endpoint) => Arc::new(HttpMailer::new(endpoint.clone(), config.mail.timeout())?),
            None => Arc::new(LogMailer),
        };
        Ok(mailer)
    }

    /// Create an account and its employee record without going through the
    /// admin-only lifecycle.
    pub async fn seed_employee(
        &self,
        provider: &InMemoryIdentityProvider,
        seed: SeedEmployee,
    ) -> Result<AccountId, ServiceError> {
        let role = Role::new(seed.role);
        let is_admin = seed.is_admin || role.implies_admin();
        let is_oversight = seed.is_oversight || role.implies_oversight();
        let claims = AuthorizationClaims {
            role: Some(role.as_str().to_string()),
            is_admin,
            is_oversight,
        };
        let id = provider.seed_account(&seed.email, &seed.name, claims);

        self.employees
            .upsert(Employee {
                id: id.clone(),
                name: seed.name,
                email: seed.email.trim().to_lowercase(),
                role,
                affiliation: seed.department.map(Affiliation::Department),
                is_admin,
                is_oversight,
                is_active: true,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(account_id = %id, "employee seeded");
        Ok(id)
    }
}
