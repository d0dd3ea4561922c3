//! Process wiring: client, bus, watchers, and signal-driven shutdown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

use forculus_api::ZmClient;
use forculus_config::Config;
use forculus_core::{
    CoreError, EventLogger, EventType, HandlerLoop, LifecycleManager, MonitorEventWatch,
    MonitorWatch, Reactor,
};

use crate::error::CliError;

pub async fn run(config: &Config) -> Result<(), CliError> {
    let endpoint = config.endpoint()?;
    let credentials = config.credentials()?;
    let time_zone = config.time_zone()?;
    let client = Arc::new(
        ZmClient::new(&endpoint, credentials, &config.transport())
            .map_err(CoreError::from)?
            .with_time_zone(time_zone),
    );

    // Bad credentials will not fix themselves; an unreachable server might.
    match client.login().await {
        Ok(()) => {}
        Err(e @ forculus_api::Error::Authentication { .. }) => {
            return Err(CoreError::from(e).into());
        }
        Err(e) => warn!(error = %e, "initial login failed, will keep retrying"),
    }

    match client.version().await {
        Ok(v) => info!(
            server = %client.base_url(),
            version = %v.service_version,
            time_zone = %client.time_zone(),
            api_version = %v.api_version,
            "connected to ZoneMinder"
        ),
        Err(e) => warn!(error = %e, "could not query ZoneMinder version"),
    }

    let watch_config = config.watch_config();
    let lifecycle = LifecycleManager::new();
    let reactor = Reactor::new(lifecycle.clone(), watch_config.mailbox_capacity);

    if tracing::enabled!(Level::DEBUG) {
        reactor.register("event-logger", HandlerLoop::new(EventLogger), [EventType::All]);
    }

    let interrupted = CancellationToken::new();
    tokio::spawn({
        let interrupted = interrupted.clone();
        async move {
            wait_for_signal().await;
            info!("shutdown signal received");
            interrupted.cancel();
        }
    });

    let mut event_watch =
        MonitorEventWatch::new(Arc::clone(&client), reactor.clone(), watch_config.clone());
    if !event_watch.bootstrap(&interrupted).await {
        reactor.stop().await;
        return Ok(());
    }
    reactor.register(
        "monitor-event-watch",
        event_watch,
        [EventType::MonitorExitingAlert],
    );

    lifecycle.start(MonitorWatch::new(
        Arc::clone(&client),
        reactor.clone(),
        watch_config.poll_interval,
    ));

    info!(tasks = lifecycle.task_count(), "forculus running");
    interrupted.cancelled().await;

    info!("stopping");
    reactor.stop().await;
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
