//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::{ApiServer, AuthManager};
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::session::SessionState;
use crate::core::shutdown::ShutdownService;
use crate::data::credentials::{CredentialStore, MemoryCredentialStore};
use crate::data::directory::{DirectoryStore, MemoryDirectoryStore};
use crate::data::types::{NewAccount, NewContactAccount};
use crate::domain::{
    AccountService, CatalogService, DomainError, NotificationService, ReviewService, SearchService,
};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub credentials: Arc<dyn CredentialStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub accounts: Arc<AccountService>,
    pub reviews: Arc<ReviewService>,
    pub search: Arc<SearchService>,
    pub notifications: Arc<NotificationService>,
    pub catalog: Arc<CatalogService>,
    pub session: Arc<SessionState>,
    pub auth: Arc<AuthManager>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let directory: Arc<dyn DirectoryStore> = Arc::new(MemoryDirectoryStore::new());
        tracing::debug!(
            credentials = credentials.backend_name(),
            directory = directory.backend_name(),
            "Stores initialized"
        );

        let accounts = Arc::new(AccountService::new(credentials.clone(), directory.clone()));
        let reviews = Arc::new(ReviewService::new(directory.clone()));
        let search = Arc::new(SearchService::new(directory.clone()));
        let notifications = Arc::new(NotificationService::new(directory.clone()));
        let catalog = Arc::new(CatalogService::new(directory.clone()));

        let auth = Arc::new(AuthManager::new(config.auth.session_ttl_days));
        let session = Arc::new(SessionState::new());
        let shutdown = ShutdownService::new();

        let app = Self {
            shutdown,
            config,
            credentials,
            directory,
            accounts,
            reviews,
            search,
            notifications,
            catalog,
            session,
            auth,
        };

        app.seed_admin().await?;
        Ok(app)
    }

    /// Seed the bootstrap admin account when configured and absent.
    async fn seed_admin(&self) -> Result<()> {
        let Some((email, password)) = self.config.admin.seed() else {
            return Ok(());
        };

        if self.directory.find_profile_by_email(email).await?.is_some() {
            tracing::debug!(email, "Bootstrap admin already exists");
            return Ok(());
        }

        let account = NewAccount::Admin(NewContactAccount {
            email: email.to_string(),
            name: self
                .config
                .admin
                .name
                .clone()
                .unwrap_or_else(|| "Administrator".to_string()),
            wilaya: None,
            phone: None,
        });

        match self.accounts.register(&account, password).await {
            Ok(profile) => {
                tracing::info!(id = %profile.id, email, "Bootstrap admin seeded");
                Ok(())
            }
            Err(DomainError::AccountExists) => {
                tracing::warn!(email, "Bootstrap admin credential exists without a profile");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.shutdown
            .register(app.session.start_observer(app.shutdown.subscribe()))
            .await;

        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            app.credentials.backend_name(),
            app.directory.backend_name(),
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
