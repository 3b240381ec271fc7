use std::collections::{BTreeMap, HashSet};

use parking_lot::Mutex;

use crate::{Error, Result};

/// Opaque identifier the platform hands out for a registered global hook.
pub type HookId = u32;

/// Minimal global-hotkey API used by the engine's hook registrar.
///
/// Implementations must not block on the engine; the real one forwards
/// requests to the thread that owns the platform hotkey manager.
pub trait HotkeyApi: Send + Sync {
    /// Register a system-wide hook for a normalized combo.
    fn register(&self, combo: &str) -> Result<HookId>;
    /// Remove a previously registered hook.
    fn unregister(&self, id: HookId) -> Result<()>;
}

/// Mutable state behind [`MockHotkeyApi`].
#[derive(Default)]
struct MockState {
    /// Last id handed out.
    next_id: HookId,
    /// Currently registered hooks.
    armed: BTreeMap<HookId, String>,
    /// Combos that fail to register.
    failing: HashSet<String>,
    /// Total register calls, including failures.
    register_calls: usize,
}

/// In-memory [`HotkeyApi`] for tests: hands out sequential ids and records
/// which combos are armed.
#[derive(Default)]
pub struct MockHotkeyApi {
    /// Shared state.
    inner: Mutex<MockState>,
}

impl MockHotkeyApi {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later registration of `combo` fail.
    pub fn fail_on(&self, combo: &str) {
        self.inner.lock().failing.insert(keychord::normalize(combo));
    }

    /// Sorted combos currently registered with the mock.
    pub fn armed(&self) -> Vec<String> {
        let mut out: Vec<String> = self.inner.lock().armed.values().cloned().collect();
        out.sort();
        out
    }

    /// Id currently registered for `combo`, if any.
    pub fn id_for(&self, combo: &str) -> Option<HookId> {
        let combo = keychord::normalize(combo);
        self.inner
            .lock()
            .armed
            .iter()
            .find(|(_, c)| **c == combo)
            .map(|(id, _)| *id)
    }

    /// Number of register calls seen so far.
    pub fn register_calls(&self) -> usize {
        self.inner.lock().register_calls
    }
}

impl HotkeyApi for MockHotkeyApi {
    fn register(&self, combo: &str) -> Result<HookId> {
        let mut st = self.inner.lock();
        st.register_calls += 1;
        if st.failing.contains(combo) {
            return Err(Error::HookRegistration {
                combo: combo.to_string(),
                message: "rejected by mock".into(),
            });
        }
        st.next_id += 1;
        let id = st.next_id;
        st.armed.insert(id, combo.to_string());
        Ok(id)
    }

    fn unregister(&self, id: HookId) -> Result<()> {
        match self.inner.lock().armed.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::HookRegistration {
                combo: String::new(),
                message: format!("unknown hook id {id}"),
            }),
        }
    }
}
