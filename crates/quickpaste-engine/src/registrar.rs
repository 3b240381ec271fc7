use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use quickpaste_config::HotkeyTable;
use tracing::{debug, trace, warn};

use crate::deps::{HookId, HotkeyApi};

/// Threshold for warning about slow registration passes that may drop presses
const BIND_UPDATE_WARN_MS: u64 = 10;

/// Lifecycle of the global hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// No hooks armed; either not started yet or shut down.
    Stopped,
    /// Hooks armed for every armable binding.
    Listening,
    /// Hooks temporarily removed; the next start re-arms from the table.
    Suspended,
}

impl fmt::Display for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Listening => "listening",
            Self::Suspended => "suspended",
        })
    }
}

/// Translates the hotkey table into OS-level global hooks.
///
/// Holds no bindings, only the hook ids and the combo each was armed for.
pub struct Registrar {
    /// Platform hook API.
    api: Arc<dyn HotkeyApi>,
    /// Registration id → normalized combo.
    id_map: HashMap<HookId, String>,
    /// Normalized combo → registration id.
    inv_map: HashMap<String, HookId>,
    /// Current lifecycle state.
    state: HookState,
    /// Set by [`Self::shutdown`]; no further arming happens.
    closed: bool,
}

impl Registrar {
    /// Create a registrar in the `Stopped` state.
    pub fn new(api: Arc<dyn HotkeyApi>) -> Self {
        Self {
            api,
            id_map: HashMap::new(),
            inv_map: HashMap::new(),
            state: HookState::Stopped,
            closed: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        self.state
    }

    /// Arm hooks for every armable binding and enter `Listening`.
    ///
    /// Any previously held hooks are removed first. Returns the number of
    /// hooks armed.
    pub fn start(&mut self, table: &HotkeyTable) -> usize {
        if self.closed {
            debug!("registrar_start_ignored; shut down");
            return 0;
        }
        self.unhook_all();
        let armed = self.arm(table);
        self.state = HookState::Listening;
        armed
    }

    /// Re-arm from the table while `Listening`; a no-op in any other state.
    pub fn restart(&mut self, table: &HotkeyTable) -> Option<usize> {
        if self.closed || self.state != HookState::Listening {
            trace!(state = %self.state, "registrar_restart_skipped");
            return None;
        }
        self.unhook_all();
        Some(self.arm(table))
    }

    /// Remove all hooks and enter `Suspended`.
    pub fn stop(&mut self) {
        self.unhook_all();
        if !self.closed && self.state == HookState::Listening {
            self.state = HookState::Suspended;
        }
    }

    /// Remove all hooks and refuse any further arming.
    pub fn shutdown(&mut self) {
        self.unhook_all();
        self.closed = true;
        self.state = HookState::Stopped;
    }

    /// Map a fired hook id to its combo. Only resolves while `Listening`.
    pub fn resolve(&self, id: HookId) -> Option<String> {
        if self.state != HookState::Listening {
            return None;
        }
        self.id_map.get(&id).cloned()
    }

    /// Registration id for a combo, if armed.
    pub fn id_for(&self, combo: &str) -> Option<HookId> {
        self.inv_map.get(&keychord::normalize(combo)).copied()
    }

    /// Sorted snapshot of armed combos.
    pub fn armed(&self) -> Vec<String> {
        let mut out: Vec<String> = self.inv_map.keys().cloned().collect();
        out.sort();
        out
    }

    /// Unregister everything currently held, tolerating platform errors.
    fn unhook_all(&mut self) {
        for (id, combo) in self.id_map.drain() {
            match self.api.unregister(id) {
                Ok(()) => trace!(%combo, id, "hook_unregistered"),
                Err(e) => debug!(%combo, id, error = %e, "hook_unregister_failed"),
            }
        }
        self.inv_map.clear();
    }

    /// Register one hook per armable binding; failures are logged and skipped.
    fn arm(&mut self, table: &HotkeyTable) -> usize {
        let start = Instant::now();
        for (combo, _) in table.armable() {
            match self.api.register(combo) {
                Ok(id) => {
                    trace!(%combo, id, "hook_registered");
                    self.id_map.insert(id, combo.to_string());
                    self.inv_map.insert(combo.to_string(), id);
                }
                Err(e) => warn!(%combo, error = %e, "hook_registration_failed; skipping"),
            }
        }
        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(BIND_UPDATE_WARN_MS) {
            warn!(?elapsed, armed = self.inv_map.len(), "hook_registration_slow");
        } else {
            debug!(?elapsed, armed = self.inv_map.len(), "hooks_armed");
        }
        self.inv_map.len()
    }
}

#[cfg(test)]
mod tests {
    use quickpaste_config::{Action, HotkeyBinding};

    use super::*;
    use crate::MockHotkeyApi;

    fn table(keys: &[&str]) -> HotkeyTable {
        let mut t = HotkeyTable::new();
        for k in keys {
            t.add_or_replace(k, HotkeyBinding::untagged(vec![Action::text("x", 0.0)]));
        }
        t
    }

    fn setup() -> (Arc<MockHotkeyApi>, Registrar) {
        let api = Arc::new(MockHotkeyApi::new());
        let reg = Registrar::new(api.clone());
        (api, reg)
    }

    #[test]
    fn start_arms_only_armable_entries() {
        let (api, mut reg) = setup();
        let mut t = table(&["ctrl+1", "shift+f2"]);
        t.add_or_replace("", HotkeyBinding::untagged(vec![Action::text("draft", 0.0)]));
        t.add_or_replace("ctrl+9", HotkeyBinding::default());

        assert_eq!(reg.start(&t), 2);
        assert_eq!(reg.state(), HookState::Listening);
        assert_eq!(reg.armed(), vec!["ctrl+1", "shift+f2"]);
        assert_eq!(api.armed(), reg.armed());
    }

    #[test]
    fn failed_registration_is_skipped() {
        let (api, mut reg) = setup();
        api.fail_on("ctrl+2");
        assert_eq!(reg.start(&table(&["ctrl+1", "ctrl+2", "ctrl+3"])), 2);
        assert_eq!(reg.armed(), vec!["ctrl+1", "ctrl+3"]);
    }

    #[test]
    fn restart_replaces_hooks() {
        let (api, mut reg) = setup();
        reg.start(&table(&["ctrl+1"]));
        assert_eq!(reg.restart(&table(&["ctrl+2"])), Some(1));
        assert_eq!(api.armed(), vec!["ctrl+2"]);
        // Redundant restarts are harmless.
        reg.restart(&table(&["ctrl+2"]));
        assert_eq!(api.armed(), vec!["ctrl+2"]);
    }

    #[test]
    fn suspended_restart_does_not_arm() {
        let (api, mut reg) = setup();
        reg.start(&table(&["ctrl+1"]));
        reg.stop();
        assert_eq!(reg.state(), HookState::Suspended);
        assert!(api.armed().is_empty());
        assert_eq!(reg.restart(&table(&["ctrl+1", "ctrl+2"])), None);
        assert!(api.armed().is_empty());
        reg.start(&table(&["ctrl+1", "ctrl+2"]));
        assert_eq!(api.armed(), vec!["ctrl+1", "ctrl+2"]);
    }

    #[test]
    fn resolve_only_while_listening() {
        let (api, mut reg) = setup();
        reg.start(&table(&["ctrl+1"]));
        let id = api.id_for("ctrl+1").expect("armed");
        assert_eq!(reg.id_for("Ctrl+1"), Some(id));
        assert_eq!(reg.resolve(id).as_deref(), Some("ctrl+1"));
        reg.stop();
        assert_eq!(reg.resolve(id), None);
    }

    #[test]
    fn shutdown_is_terminal() {
        let (api, mut reg) = setup();
        reg.start(&table(&["ctrl+1"]));
        reg.shutdown();
        assert_eq!(reg.state(), HookState::Stopped);
        assert_eq!(reg.start(&table(&["ctrl+1"])), 0);
        assert_eq!(reg.restart(&table(&["ctrl+1"])), None);
        assert!(api.armed().is_empty());
        assert_eq!(reg.state(), HookState::Stopped);
    }
}
