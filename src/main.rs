// Main entry point for Eventdesk

use eventdesk::api::{create_router, AccountStore, AppState, EventStore};
use eventdesk::auth::audit_logger::AuditLogger;
use eventdesk::auth::identity::AuthState;
use eventdesk::auth::session::SessionStore;
use eventdesk::config::Config;
use eventdesk::core::errors::EventdeskError;
use eventdesk::core::models::{NewAccount, Role};
use eventdesk::core::password::generate_random_password;
use eventdesk::store::memory::{MemoryAccountStore, MemoryEventStore};
use eventdesk::store::postgres::{ensure_schema, PgAccountStore, PgEventStore};

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    // Must be done only once - tracing panics if init() is called multiple times
    init_tracing(&config)?;

    info!("Starting Eventdesk");

    info!(
        bind_address = %config.bind_address,
        port = config.port,
        "Configuration loaded"
    );

    // 3. Initialize database pool (if configured)
    let db_pool: Option<Arc<sqlx::PgPool>> = if let Some(ref database_url) = config.database_url {
        let pool = sqlx::PgPool::connect(database_url).await.map_err(|e| {
            error!(error = %e, "Failed to connect to database");
            e
        })?;

        ensure_schema(&pool).await.map_err(|e| {
            error!(error = %e, "Failed to prepare database schema");
            e
        })?;

        Some(Arc::new(pool))
    } else {
        None
    };

    // 4. Initialize stores (Postgres or in-memory)
    let (account_store, event_store): (
        Arc<dyn AccountStore + Send + Sync>,
        Arc<dyn EventStore + Send + Sync>,
    ) = match db_pool {
        Some(ref pool) => {
            info!("Database pool initialized");
            (
                Arc::new(PgAccountStore::new((**pool).clone())),
                Arc::new(PgEventStore::new((**pool).clone())),
            )
        }
        None => {
            info!("No DATABASE_URL configured, using in-memory stores");
            (
                Arc::new(MemoryAccountStore::new()),
                Arc::new(MemoryEventStore::new()),
            )
        }
    };

    // 5. Initialize session store
    let sessions = Arc::new(SessionStore::new());

    // 6. Initialize audit logger
    let audit_logger = Arc::new(AuditLogger::new(db_pool.clone()));

    // 7. Bootstrap the admin account
    bootstrap_admin(&config, account_store.as_ref()).await?;

    // 8. Create AuthState for the identity middleware
    let auth_state = Arc::new(AuthState {
        sessions: sessions.clone(),
        account_store: account_store.clone(),
        audit_logger: audit_logger.clone(),
    });

    // 9. Create AppState
    let app_state = AppState {
        account_store,
        event_store,
        sessions,
        audit_logger,
        config: Arc::new(config.clone()),
    };

    // 10. Create router
    let router = create_router(&app_state, auth_state).with_state(app_state);

    info!("Router created");

    // 11. Start HTTP server with graceful shutdown
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind to address");
        e
    })?;

    info!(addr = %addr, "Server listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the admin account if it does not exist yet.
///
/// The password comes from ADMIN_PASSWORD when set; otherwise a random
/// one is generated and written to the credentials file. Generated
/// credentials are never logged.
async fn bootstrap_admin(
    config: &Config,
    account_store: &(dyn AccountStore + Send + Sync),
) -> Result<(), EventdeskError> {
    if account_store.fetch(&config.admin_username).await?.is_some() {
        info!(username = %config.admin_username, "Admin account already present");
        return Ok(());
    }

    let (admin_password, generated) = match config.admin_password {
        Some(ref password) => (password.clone(), false),
        None => (generate_random_password(), true),
    };

    match account_store
        .register(NewAccount {
            username: config.admin_username.clone(),
            password: admin_password.clone(),
            email: None,
            role: Role::Admin,
        })
        .await
    {
        Ok(_) => {}
        // Another instance won the bootstrap race; nothing to do
        Err(EventdeskError::DuplicateUsername) => return Ok(()),
        Err(e) => return Err(e),
    }

    if generated {
        tokio::fs::write(
            &config.admin_credentials_path,
            format!(
                "Username: {}\nPassword: {}\n",
                config.admin_username, admin_password
            ),
        )
        .await
        .map_err(|e| {
            EventdeskError::ConfigurationError(format!(
                "Failed to write admin credentials to {:?}: {}",
                config.admin_credentials_path, e
            ))
        })?;
        info!(
            path = ?config.admin_credentials_path,
            "Admin account created, generated credentials written to file"
        );
    } else {
        info!(username = %config.admin_username, "Admin account created");
    }

    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
