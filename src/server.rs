//! Web server

use crate::app::Service;
use crate::cli::CommandLineArgs;

use std::io;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use thiserror::Error;
use tokio::signal;

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    /// The host is not an IP address
    #[error("invalid listen address {host}")]
    Address {
        host: String,
        #[source]
        source: AddrParseError,
    },

    /// A TLS file does not exist
    #[error("TLS {kind} file expected at '{}' but not found", path.display())]
    TlsFileNotFound { kind: &'static str, path: PathBuf },

    /// A TLS file path could not be expanded or resolved
    #[error("failed to resolve TLS {kind} file path {path}")]
    TlsPath {
        kind: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The TLS certificate or key could not be loaded
    #[error("failed to load TLS certificate files")]
    TlsConfig(#[source] io::Error),

    /// The server stopped with an error
    #[error("server failed")]
    Serve(#[source] io::Error),
}

/// Returns the socket address to listen on.
///
/// IPv4 and IPv6 hosts are both accepted.
pub fn bind_address(args: &CommandLineArgs) -> Result<SocketAddr, ServerError> {
    let ip: IpAddr = args
        .host
        .parse()
        .map_err(|source| ServerError::Address {
            host: args.host.clone(),
            source,
        })?;
    Ok(SocketAddr::new(ip, args.port))
}

/// Returns the absolute path of a TLS file, expanding `~`.
///
/// # Arguments
///
/// * `kind`: Which file this is, used in errors
/// * `path`: Path as given on the command line
fn tls_file(kind: &'static str, path: &str) -> Result<PathBuf, ServerError> {
    let path_error = |source| ServerError::TlsPath {
        kind,
        path: path.to_string(),
        source,
    };
    let expanded = expanduser(path).map_err(path_error)?;
    match expanded.canonicalize() {
        Ok(absolute) => Ok(absolute),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(ServerError::TlsFileNotFound {
                kind,
                path: expanded,
            })
        }
        Err(err) => Err(path_error(err)),
    }
}

/// Serve the query API until shutdown
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [Service] to serve
pub async fn serve(args: &CommandLineArgs, service: Service) -> Result<(), ServerError> {
    let addr = bind_address(args)?;

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        Duration::from_secs(args.graceful_shutdown_timeout),
    ));

    let result = if args.https {
        let cert_file = tls_file("certificate", &args.cert_file)?;
        let key_file = tls_file("key", &args.key_file)?;
        let tls_config = RustlsConfig::from_pem_file(cert_file, key_file)
            .await
            .map_err(ServerError::TlsConfig)?;
        tracing::info!("Listening on https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    } else {
        tracing::info!("Listening on http://{}", addr);
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    };
    result.map_err(ServerError::Serve)
}

/// Waits for Ctrl-C or SIGTERM, then starts a graceful shutdown that is forced after `timeout`.
async fn shutdown_signal(handle: Handle, timeout: Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
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

    tracing::info!(
        "Shutting down, waiting up to {}s for open requests",
        timeout.as_secs()
    );
    handle.graceful_shutdown(Some(timeout));
}
