//! Web server

use crate::cli;

use std::{
    fmt::Display,
    net::SocketAddr,
    path::PathBuf,
    process::exit,
    str::FromStr,
    time::Duration,
};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;
use tracing::{error, info};

/// Log a fatal startup error and exit.
fn fail(context: &str, err: impl Display) -> ! {
    error!("{}: {}", context, err);
    exit(1)
}

/// Expand `~` in a TLS file path and check that the file exists.
fn tls_file(path: &str, kind: &str) -> PathBuf {
    let expanded = expanduser(path).unwrap_or_else(|err| {
        fail(
            "Failed to expand ~ to user name. Please provide an absolute path instead",
            err,
        )
    });
    if !expanded.exists() {
        fail(
            &format!("TLS {} file expected but not found", kind),
            expanded.display(),
        )
    }
    expanded.canonicalize().unwrap_or_else(|err| {
        fail(
            &format!("failed to determine absolute path to TLS {} file", kind),
            err,
        )
    })
}

/// Serve the taxi analysis service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(args: &cli::CommandLineArgs, service: crate::app::Service) {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port))
        .unwrap_or_else(|err| fail("invalid host name, IP address or port number", err));

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    let result = if args.https {
        let abs_cert_file = tls_file(&args.cert_file, "certificate");
        let abs_key_file = tls_file(&args.key_file, "key");
        // Set up TLS config
        let tls_config = RustlsConfig::from_pem_file(abs_cert_file, abs_key_file)
            .await
            .unwrap_or_else(|err| fail("Failed to load TLS certificate files", err));
        info!(%addr, "serving HTTPS");
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    } else {
        info!(%addr, "serving HTTP");
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    };
    if let Err(err) = result {
        fail("server error", err)
    }
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {}", err);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
