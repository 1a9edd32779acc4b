//! Server mode CLI logic
//!
//! Runs the startup sequence: host listener, readiness wait, tunnel, publish.

use crate::{
    Settings,
    binary::BinaryResolver,
    config::{ConfigLoader, default_config_path},
    net::PortReadinessWaiter,
    probe::{MediaProbe, is_video_path, validate_video_upload},
    server::app,
    state::PublicUrl,
    tunnel::TunnelSupervisor,
    utils::version,
};
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Arguments for server mode
#[derive(Debug, Default, Clone)]
pub struct ServerArgs {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub config: Option<PathBuf>,
    pub tunnel_timeout_secs: Option<u64>,
    pub verbose: bool,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level`, the `logging.level` setting.
pub fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback_filter(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Filter for `level`, or plain `info` when it does not parse
fn fallback_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log level {:?}: {}", level, e);
        tracing_subscriber::EnvFilter::new("info")
    })
}

fn config_path(args: &ServerArgs) -> Option<PathBuf> {
    args.config.clone().or_else(default_config_path)
}

/// Defaults < config file < environment < CLI arguments
pub fn load_settings(args: &ServerArgs) -> crate::Result<Settings> {
    let mut settings = ConfigLoader::new().load(config_path(args).as_deref())?;

    if let Some(host) = &args.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(secs) = args.tunnel_timeout_secs {
        settings.tunnel.startup_timeout_secs = secs;
    }
    if args.verbose {
        settings.logging.level = "debug".to_string();
    }

    settings.validate()?;
    Ok(settings)
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    init_logging(&settings.logging.level);
    tracing::info!("Starting gallery tunnel v{}", version::get_version());

    let public_url = Arc::new(PublicUrl::new());
    let router = app::create_app(Arc::clone(&public_url));

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                settings.server.host, settings.server.port
            )
        })?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let mut server = tokio::spawn(async move { axum::serve(listener, router).await });

    println!("Please wait while we prepare your server...");

    let waiter = PortReadinessWaiter::from_settings(&settings.readiness);
    if let Err(e) = waiter
        .wait(
            &settings.server.readiness_addr(),
            settings.readiness.timeout(),
        )
        .await
    {
        server.abort();
        return Err(e).context("server not ready");
    }

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                cancel.cancel();
            }
        }
    });

    let supervisor = TunnelSupervisor::from_settings(BinaryResolver::new(), &settings.tunnel);
    let mut tunnel = match supervisor
        .start(&settings.server.local_url(), &cancel)
        .await
    {
        Ok(tunnel) => tunnel,
        Err(e) => {
            server.abort();
            ctrl_c.abort();
            return Err(e).context("failed to start tunnel");
        }
    };

    if public_url.set(tunnel.public_url()).is_err() {
        tracing::warn!("Public URL was already published");
    }
    for line in banner(tunnel.public_url(), config_path(&args).as_deref()) {
        println!("{}", line);
    }

    let outcome = tokio::select! {
        _ = cancel.cancelled() => Ok(()),
        status = tunnel.exited() => match status {
            Ok(status) => Err(anyhow!("{} exited unexpectedly ({})", settings.tunnel.binary, status)),
            Err(e) => Err(anyhow!(e).context("lost track of the tunnel process")),
        },
        joined = &mut server => {
            match joined {
                Ok(Ok(())) => tracing::warn!("Host listener stopped"),
                Ok(Err(e)) => tracing::error!("Host listener failed: {}", e),
                Err(e) => tracing::error!("Host listener task panicked: {}", e),
            }
            Ok(())
        }
    };

    tunnel.close().await;
    server.abort();
    ctrl_c.abort();
    outcome
}

/// Lines printed once the gallery is publicly reachable
fn banner(public_url: &str, settings_path: Option<&Path>) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!("● Your Gallery is ready at: {}/slideshow", public_url),
    ];
    if let Some(path) = settings_path {
        lines.push(format!(
            "● Your application settings are stored at: {}",
            path.display()
        ));
    }
    lines.push("● Press Ctrl+C to stop sharing.".to_string());
    lines.push(String::new());
    lines
}

/// Report where the companion executables resolve to
pub fn run_check_mode(args: &ServerArgs) -> Result<()> {
    let settings = load_settings(args)?;
    init_logging(&settings.logging.level);
    let resolver = BinaryResolver::new();

    let mut missing = Vec::new();
    for name in [&settings.tunnel.binary, &settings.probe.binary] {
        match resolver.resolve(name) {
            Ok(resolved) => match &resolved.search_directory {
                Some(dir) => println!(
                    "{}: {} (bundled in {})",
                    name,
                    resolved.executable_path.display(),
                    dir.display()
                ),
                None => println!("{}: {}", name, resolved.executable_path.display()),
            },
            Err(e) => {
                println!("{}: {}", name, e);
                missing.push(name.clone());
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("missing companion executables: {}", missing.join(", "));
    }
    Ok(())
}

/// Probe a media file and print its duration in seconds.
///
/// With `enforce_limit`, video files are held to `probe.max_video_secs` and
/// deleted when they fail the check, the same as a rejected upload.
pub async fn run_probe_mode(args: &ServerArgs, file: &Path, enforce_limit: bool) -> Result<()> {
    let settings = load_settings(args)?;
    init_logging(&settings.logging.level);
    let probe = MediaProbe::new(BinaryResolver::new()).with_binary(&settings.probe.binary);

    let duration = if enforce_limit && is_video_path(file) {
        validate_video_upload(&probe, file, settings.probe.max_video_secs).await?
    } else {
        probe.duration_seconds(file).await?
    };

    println!("{}", duration);
    Ok(())
}
