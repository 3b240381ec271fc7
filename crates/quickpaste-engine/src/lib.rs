//! quickpaste engine
//!
//! The engine turns a table of chord → action-sequence bindings into live
//! global hotkeys and plays the bound sequence when one fires:
//! - keeps the hotkey table (and its on-disk copy) as the single source of truth
//! - arms one OS hook per bindable chord through a [`HotkeyApi`]
//! - hands fired chords to a single executor thread that plays sequences in order
//! - publishes [`Status`] events for whoever drives the UI
//!
//! It exposes a small API:
//! - [`Engine`]: the primary type you construct and drive
//! - [`SequencePlayer`] with the [`ClipboardSink`] and [`KeySender`] seams
//! - [`HotkeyApi`] and [`MockHotkeyApi`] for the platform hook layer
use std::{path::Path, sync::Arc, time::Instant};

mod bridge;
mod deps;
mod error;
mod player;
mod registrar;
mod status;
mod system;
pub mod test_support;

use quickpaste_config::{
    Action, ConfigStore, Error as ConfigError, HotkeyBinding, HotkeyTable, auto_tag,
};
use tokio::{
    sync::{Mutex, mpsc},
    task,
};
use tracing::{debug, info, trace, warn};

pub use bridge::{DispatchBridge, PlayRequest};
pub use deps::{HookId, HotkeyApi, MockHotkeyApi};
pub use error::{Error, Result};
pub use player::{
    ClipboardSink, IMAGE_SETTLE, ImageFrame, KeySender, PlayReport, SequencePlayer, TEXT_SETTLE,
    paste_chord,
};
pub use registrar::HookState;
pub use status::{Status, StatusDispatcher, StatusReceiver};
pub use system::{EnigoSender, SystemClipboard, key_for};

use registrar::Registrar;

/// A player backed by the system clipboard and synthetic keyboard input.
///
/// Pass this as the player factory to [`Engine::new`] in production.
pub fn system_player() -> SequencePlayer {
    SequencePlayer::new(
        Box::new(SystemClipboard::new()),
        Box::new(EnigoSender::new()),
    )
}

/// Engine coordinates the hotkey table, the OS hooks and sequence playback.
///
/// Construct via [`Engine::new`], then feed fired hook ids via
/// [`Engine::dispatch`]. Every table mutation persists the table and re-arms
/// the hooks before returning.
#[derive(Clone)]
pub struct Engine {
    /// The hotkey table. Lock before `registrar` when both are needed.
    table: Arc<Mutex<HotkeyTable>>,
    /// Persistence for the table.
    store: Arc<ConfigStore>,
    /// Hook lifecycle.
    registrar: Arc<Mutex<Registrar>>,
    /// Queue to the executor thread.
    bridge: DispatchBridge,
    /// Status publisher.
    status: StatusDispatcher,
}

impl Engine {
    /// Load the table, start the executor and arm hooks.
    ///
    /// - `api`: platform hook API used for registration
    /// - `store`: where the table is loaded from and saved to
    /// - `player`: builds the sequence player; runs on the executor thread
    pub fn new<F>(
        api: Arc<dyn HotkeyApi>,
        store: ConfigStore,
        player: F,
    ) -> Result<(Self, StatusReceiver)>
    where
        F: FnOnce() -> SequencePlayer + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = StatusDispatcher::new(tx);
        let table = store.load();
        let bridge = DispatchBridge::spawn(player, status.clone())?;
        let mut registrar = Registrar::new(api);
        let armed = registrar.start(&table);
        info!(
            path = %store.path().display(),
            bindings = table.len(),
            armed,
            "engine_started"
        );
        let engine = Self {
            table: Arc::new(Mutex::new(table)),
            store: Arc::new(store),
            registrar: Arc::new(Mutex::new(registrar)),
            bridge,
            status,
        };
        Ok((engine, rx))
    }

    /// Fail fast once [`Self::request_quit`] has run.
    fn ensure_open(&self) -> Result<()> {
        if self.bridge.is_closed() {
            Err(Error::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Run a registrar pass on the blocking pool.
    ///
    /// Platform registration may block on another thread, so it never runs on
    /// a runtime worker. A panicked pass yields `T::default()`.
    async fn with_registrar<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut Registrar) -> T + Send + 'static,
        T: Default + Send + 'static,
    {
        let mut registrar = Arc::clone(&self.registrar).lock_owned().await;
        match task::spawn_blocking(move || f(&mut registrar)).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "registrar_pass_failed");
                T::default()
            }
        }
    }

    /// Persist the table and re-arm hooks. Called with the table lock held.
    async fn commit(&self, table: &HotkeyTable) {
        let start = Instant::now();
        if let Err(e) = self.store.save(table) {
            warn!(error = %e, "config_save_failed; keeping in-memory table");
        }
        let snapshot = table.clone();
        let rearmed = self.with_registrar(move |r| r.restart(&snapshot)).await;
        if let Some(armed) = rearmed {
            self.status.send(Status::Reloaded { armed });
        }
        trace!(elapsed = ?start.elapsed(), "table_committed");
    }

    /// Create or replace the binding for `key_combo`.
    ///
    /// Steps are validated, external images are copied into the managed
    /// images directory, and an empty tag is replaced with a derived one.
    /// Returns the normalized combo the binding is stored under.
    pub async fn save_binding(
        &self,
        key_combo: &str,
        actions: Vec<Action>,
        tag: &str,
    ) -> Result<String> {
        self.ensure_open()?;
        for (index, action) in actions.iter().enumerate() {
            action.check(index).map_err(|e| match e {
                ConfigError::InvalidAction { index, message } => {
                    Error::InvalidAction { index, message }
                }
                other => Error::Config(other),
            })?;
        }
        let mut table = self.table.lock().await;
        let mut actions = actions;
        self.store.import_images(&mut actions);
        let tag = if tag.trim().is_empty() {
            auto_tag(&actions)
        } else {
            tag.to_string()
        };
        let key = table.add_or_replace(key_combo, HotkeyBinding::new(tag, actions));
        debug!(%key, "binding_saved");
        self.commit(&table).await;
        Ok(key)
    }

    /// Replace the tag of an existing binding. Returns false if absent.
    pub async fn set_tag(&self, key_combo: &str, tag: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut table = self.table.lock().await;
        if !table.set_tag(key_combo, tag) {
            return Ok(false);
        }
        if let Err(e) = self.store.save(&table) {
            warn!(error = %e, "config_save_failed; keeping in-memory table");
        }
        Ok(true)
    }

    /// Remove a binding. Returns the removed binding, if there was one.
    pub async fn remove_binding(&self, key_combo: &str) -> Result<Option<HotkeyBinding>> {
        self.ensure_open()?;
        let mut table = self.table.lock().await;
        let removed = table.remove(key_combo);
        if removed.is_some() {
            debug!(key = %keychord::normalize(key_combo), "binding_removed");
            self.commit(&table).await;
        }
        Ok(removed)
    }

    /// Move a binding to a new combo, overwriting any binding there.
    ///
    /// Returns the new normalized combo, or `None` if `old` was not bound.
    pub async fn rename_binding(&self, old: &str, new: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let mut table = self.table.lock().await;
        let renamed = table.rename(old, new);
        if let Some(key) = &renamed {
            debug!(from = %keychord::normalize(old), to = %key, "binding_renamed");
            self.commit(&table).await;
        }
        Ok(renamed)
    }

    /// Suspend all hooks, e.g. while the user types into an editor.
    pub async fn pause_hotkeys(&self) -> Result<()> {
        self.ensure_open()?;
        let paused = self
            .with_registrar(|r| {
                let listening = r.state() == HookState::Listening;
                if listening {
                    r.stop();
                }
                listening
            })
            .await;
        if paused {
            info!("hotkeys_paused");
            self.status.send(Status::Paused);
        }
        Ok(())
    }

    /// Re-arm hooks from the current table after a pause.
    pub async fn resume_hotkeys(&self) -> Result<()> {
        self.ensure_open()?;
        let table = self.table.lock().await;
        let snapshot = table.clone();
        let resumed = self
            .with_registrar(move |r| {
                (r.state() != HookState::Listening).then(|| r.start(&snapshot))
            })
            .await;
        if let Some(armed) = resumed {
            info!(armed, "hotkeys_resumed");
            self.status.send(Status::Resumed);
        }
        Ok(())
    }

    /// Re-arm hooks from the current table. A no-op while paused.
    pub async fn reload_hotkeys(&self) -> Result<usize> {
        self.ensure_open()?;
        let table = self.table.lock().await;
        let snapshot = table.clone();
        let armed = self.with_registrar(move |r| r.restart(&snapshot)).await;
        match armed {
            Some(armed) => {
                self.status.send(Status::Reloaded { armed });
                Ok(armed)
            }
            None => Ok(0),
        }
    }

    /// Unhook everything, cancel playback and join the executor.
    ///
    /// After this returns no hook callback resolves and every mutating
    /// operation fails with [`Error::ShutDown`]. Safe to call more than once.
    pub async fn request_quit(&self) {
        {
            let _table = self.table.lock().await;
            self.with_registrar(Registrar::shutdown).await;
        }
        self.bridge.shutdown().await;
        info!("engine_stopped");
    }

    /// Copy of the current table.
    pub async fn snapshot(&self) -> HotkeyTable {
        self.table.lock().await.clone()
    }

    /// Sorted combos with an armed hook.
    pub async fn armed_hotkeys(&self) -> Vec<String> {
        self.registrar.lock().await.armed()
    }

    /// Current hook lifecycle state.
    pub async fn state(&self) -> HookState {
        self.registrar.lock().await.state()
    }

    /// Path of the config document backing the table.
    pub fn config_path(&self) -> &Path {
        self.store.path()
    }

    /// Handle a fired hook: resolve it and queue the bound sequence.
    ///
    /// Unknown ids, ids fired while paused and bindings without steps are ignored.
    pub async fn dispatch(&self, id: HookId) {
        let request = {
            let table = self.table.lock().await;
            let Some(key) = self.registrar.lock().await.resolve(id) else {
                trace!(id, "dispatch_unresolved");
                return;
            };
            let Some(binding) = table.get(&key) else {
                trace!(%key, "dispatch_unbound");
                return;
            };
            if binding.actions.is_empty() {
                return;
            }
            PlayRequest {
                actions: binding.actions.clone().into(),
                key,
            }
        };
        trace!(key = %request.key, "hotkey_fired");
        if let Err(e) = self.bridge.enqueue(request) {
            debug!(error = %e, "dispatch_dropped");
        }
    }

    /// Registration id for a combo. Intended for diagnostics/tests.
    pub async fn resolve_id_for_combo(&self, combo: &str) -> Option<HookId> {
        self.registrar.lock().await.id_for(combo)
    }
}
