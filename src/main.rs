use std::{future::IntoFuture, pin::pin, process, sync::Arc, time::Duration};

use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::error::AppError,
    config,
    infra::{
        app::{AppOptions, ApplicationContext, Repositories},
        db::PostgresRepositories,
        error::InfraError,
        memory::MemoryRepositories,
        telemetry,
    },
};

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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = ApplicationContext::new(repositories, &AppOptions::from(&settings));
    app.seed_groups(&settings.groups).await?;
    serve_http(&settings, app).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_postgres(&settings, "migrate").await?;
    info!(target = "yatube::migrate", "migrations applied");
    Ok(())
}

async fn init_repositories(settings: &config::Settings) -> Result<Repositories, AppError> {
    if settings.database.url.is_none() {
        warn!(
            target = "yatube::startup",
            "database.url is not configured; data is kept in memory and lost on exit"
        );
        return Ok(Repositories::shared(Arc::new(MemoryRepositories::new())));
    }

    let repositories = init_postgres(settings, "serve").await?;
    Ok(Repositories::shared(Arc::new(repositories)))
}

async fn init_postgres(
    settings: &config::Settings,
    command: &'static str,
) -> Result<PostgresRepositories, InfraError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or(InfraError::MissingDatabaseUrl { command })?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    PostgresRepositories::run_migrations(&pool).await?;

    Ok(PostgresRepositories::new(pool))
}

async fn serve_http(settings: &config::Settings, app: ApplicationContext) -> Result<(), AppError> {
    let router = app.router();

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;
    info!(
        target = "yatube::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let stop = Arc::new(Notify::new());
    let stopped = stop.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { stopped.notified().await })
        .into_future();
    let mut server = pin!(server);

    tokio::select! {
        result = &mut server => {
            return Ok(result.map_err(InfraError::Serve)?);
        }
        () = shutdown_signal() => {}
    }

    info!(
        target = "yatube::shutdown",
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested; draining connections"
    );
    stop.notify_one();

    drain(server, settings.server.graceful_shutdown).await
}

async fn drain<F>(server: F, grace: Duration) -> Result<(), AppError>
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match tokio::time::timeout(grace, server).await {
        Ok(result) => Ok(result.map_err(InfraError::Serve)?),
        Err(_) => {
            warn!(
                target = "yatube::shutdown",
                "graceful shutdown timed out; dropping remaining connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
