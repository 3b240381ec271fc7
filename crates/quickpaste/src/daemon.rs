//! The background half of the daemon: engine, press router, status printer
//! and console, all on one tokio runtime.

use std::{path::PathBuf, sync::Arc};

use quickpaste_config::ConfigStore;
use quickpaste_engine::{Engine, HookId, HotkeyApi, system_player};
use tokio::{signal, sync::mpsc::UnboundedReceiver, task};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::console;

/// Run until Ctrl+C or `quit`, returning the process exit code.
///
/// The engine is built on a blocking thread: arming hooks round-trips through
/// the main-thread event loop, which must already be running.
pub async fn run(
    api: Arc<dyn HotkeyApi>,
    config: PathBuf,
    mut presses: UnboundedReceiver<HookId>,
) -> i32 {
    let store = ConfigStore::new(config);
    let (engine, mut status) =
        match task::spawn_blocking(move || Engine::new(api, store, system_player)).await {
            Ok(Ok(built)) => built,
            Ok(Err(e)) => {
                error!(error = %e, "engine_start_failed");
                return 1;
            }
            Err(e) => {
                error!(error = %e, "engine_start_panicked");
                return 1;
            }
        };
    info!(config = %engine.config_path().display(), "quickpaste_ready");

    let router = engine.clone();
    tokio::spawn(async move {
        while let Some(id) = presses.recv().await {
            router.dispatch(id).await;
        }
        debug!("press_router_stopped");
    });

    tokio::spawn(async move {
        while let Some(event) = status.recv().await {
            println!("{}", console::describe(&event));
        }
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(console::run(engine.clone(), shutdown.clone()));

    tokio::select! {
        res = signal::ctrl_c() => match res {
            Ok(()) => info!("interrupted"),
            Err(e) => error!(error = %e, "signal_handler_failed"),
        },
        _ = shutdown.cancelled() => debug!("quit_requested"),
    }
    shutdown.cancel();
    engine.request_quit().await;
    0
}
