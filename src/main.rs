use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use clap::Parser;
use florette::{
    application::{
        admin::{
            AdminCatalogService, AdminContentService, AdminSettingsService, AdminTaxonomyService,
        },
        auth::AdminAuthService,
        error::AppError,
        ordering::OrderingService,
        repos::HealthRepo,
        storefront::{StorefrontCache, StorefrontService},
        uploads::{UploadPublisher, UploadService},
    },
    cache::CacheConfig,
    config::{self, CliArgs},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, LoginRateLimiter, PublicState},
        publish::GitPublisher,
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::{sync::watch, task::JoinHandle, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli_args = CliArgs::parse();

    // needs no configuration, so it works before a config file exists
    if let Some(config::Command::HashPassword(args)) = cli_args.command.as_ref() {
        println!("{}", AdminAuthService::hash_password(&args.password));
        return Ok(());
    }

    let settings = config::load(&cli_args)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;
    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        None | Some(config::Command::Serve(_)) => run_serve(settings).await,
        Some(config::Command::PurgeSessions(_)) => run_purge_sessions(settings).await,
        Some(config::Command::HashPassword(_)) => Ok(()),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let purge_handle = spawn_session_purge(
        app.admin_state.auth.clone(),
        app.admin_state.login_limiter.clone(),
        settings.admin.session_purge_interval,
    );

    let result = serve_http(&settings, app.public_state, app.admin_state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

async fn run_purge_sessions(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let auth = AdminAuthService::new(
        repositories.clone(),
        settings.admin.password_sha256,
        settings.admin.session_ttl,
    );

    let removed = auth
        .purge_expired()
        .await
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    info!(target = "florette::sessions", removed, "session purge finished");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

struct ApplicationContext {
    public_state: PublicState,
    admin_state: AdminState,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let cache = Arc::new(StorefrontCache::new(&CacheConfig::from(&settings.cache)));

    let storefront = StorefrontService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        cache.clone(),
    );
    let ordering = OrderingService::new(storefront.clone(), repositories.clone());

    let storage = UploadStorage::new(settings.uploads.directory.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let publisher: Option<Arc<dyn UploadPublisher>> = if settings.publish.enabled {
        Some(Arc::new(GitPublisher::from_settings(&settings.publish)))
    } else {
        None
    };
    let uploads = Arc::new(UploadService::new(
        Arc::new(storage),
        publisher,
        settings.uploads.public_base_path.clone(),
    ));

    let health: Arc<dyn HealthRepo> = repositories.clone();

    let public_state = PublicState {
        storefront,
        ordering,
        uploads: uploads.clone(),
        health: health.clone(),
    };

    let admin_state = AdminState {
        auth: Arc::new(AdminAuthService::new(
            repositories.clone(),
            settings.admin.password_sha256,
            settings.admin.session_ttl,
        )),
        catalog: Arc::new(AdminCatalogService::new(
            repositories.clone(),
            repositories.clone(),
            cache.clone(),
        )),
        taxonomy: Arc::new(AdminTaxonomyService::new(
            repositories.clone(),
            repositories.clone(),
            cache.clone(),
        )),
        content: Arc::new(AdminContentService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            cache.clone(),
        )),
        settings: Arc::new(AdminSettingsService::new(
            repositories.clone(),
            cache.clone(),
        )),
        uploads,
        cache,
        health,
        login_limiter: LoginRateLimiter::new(
            Duration::from_secs(u64::from(settings.admin.login_window_seconds.get())),
            settings.admin.login_max_attempts.get(),
        ),
        cookie_secure: settings.admin.cookie_secure,
        max_request_bytes: usize::try_from(settings.uploads.max_request_bytes.get())
            .unwrap_or(usize::MAX),
    };

    Ok(ApplicationContext {
        public_state,
        admin_state,
    })
}

fn spawn_session_purge(
    auth: Arc<AdminAuthService>,
    login_limiter: LoginRateLimiter,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            login_limiter.prune();
            if let Err(err) = auth.purge_expired().await {
                warn!(
                    target = "florette::sessions",
                    error = %err,
                    "scheduled session purge failed"
                );
            }
        }
    })
}

async fn serve_http(
    settings: &config::Settings,
    public_state: PublicState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_public_router(public_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "florette::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_requested(shutdown_rx.clone()));
    let admin_server = axum::serve(
        admin_listener,
        admin_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_requested(shutdown_rx.clone()));

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        shutdown_requested(shutdown_rx).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = async { try_join!(public_server, admin_server) } => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!(target = "florette::serve", "servers stopped");
        }
        _ = deadline => {
            warn!(
                target = "florette::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "florette::serve", error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "florette::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target = "florette::serve", "shutdown requested");
}
