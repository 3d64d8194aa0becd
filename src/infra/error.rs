//! Failures of the process plumbing around the services: the Postgres
//! connection, schema migrations, the HTTP listener and the log subscriber.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("`{command}` needs database.url (or --database-url)")]
    MissingDatabaseUrl { command: &'static str },
    #[error("failed to connect to postgres: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("http server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn bind_failure_names_the_address() {
        let error = InfraError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            error.to_string(),
            "failed to bind 127.0.0.1:8000: address in use"
        );
    }

    #[test]
    fn missing_url_names_the_command() {
        let error = InfraError::MissingDatabaseUrl { command: "migrate" };
        assert!(error.to_string().starts_with("`migrate` needs database.url"));
    }
}
