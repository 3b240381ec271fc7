//! Main-thread hook host.
//!
//! The OS hotkey manager must live on the thread that runs the platform event
//! loop. [`run`] builds that loop on the calling (main) thread, keeps the
//! manager there inside [`HookHost`], and serves registration requests sent
//! through [`ProxyHotkeyApi`] as user events. Everything else (the engine,
//! the console, the press router) runs on a tokio runtime in a background
//! thread.

use std::{
    collections::HashMap,
    path::PathBuf,
    result::Result as StdResult,
    sync::Arc,
    thread,
    time::Duration,
};

use crossbeam_channel::{Sender, bounded};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use keychord::{Chord, Modifier};
use parking_lot::Mutex;
use quickpaste_engine::{Error as EngineError, HookId, HotkeyApi};
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy},
};
use tokio::{
    runtime,
    sync::mpsc::{self, UnboundedSender},
};
use tracing::{debug, error, trace, warn};

use crate::{Error, Result, daemon};

/// How long a registration request may wait for the event loop.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Requests served on the main thread.
#[derive(Debug)]
pub enum HostEvent {
    /// Register a normalized combo and reply with its hook id.
    Register {
        /// Normalized combo.
        combo: String,
        /// Reply channel.
        reply: Sender<StdResult<HookId, String>>,
    },
    /// Unregister a hook id.
    Unregister {
        /// Hook id returned by a previous registration.
        id: HookId,
        /// Reply channel.
        reply: Sender<StdResult<(), String>>,
    },
    /// Leave the event loop with this exit code.
    Exit(i32),
}

/// Map a normalized combo onto a platform hotkey.
///
/// Chords must have exactly one non-modifier key.
pub fn hotkey_for(combo: &str) -> StdResult<HotKey, String> {
    let chord = Chord::parse(combo).map_err(|e| e.to_string())?;
    let [key] = chord.keys.as_slice() else {
        return Err(format!("expected exactly one key in {combo:?}"));
    };
    let code = code_for(key).ok_or_else(|| format!("unsupported key {key:?}"))?;
    let mut mods = Modifiers::empty();
    for m in &chord.modifiers {
        mods |= match m {
            Modifier::Control => Modifiers::CONTROL,
            Modifier::Shift => Modifiers::SHIFT,
            Modifier::Alt => Modifiers::ALT,
            Modifier::Super => Modifiers::SUPER,
        };
    }
    Ok(HotKey::new((!mods.is_empty()).then_some(mods), code))
}

/// Physical key code for a key name.
fn code_for(name: &str) -> Option<Code> {
    let code = match name {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "space" => Code::Space,
        "esc" | "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" | "del" => Code::Delete,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "-" => Code::Minus,
        "=" => Code::Equal,
        "+" => Code::NumpadAdd,
        "," => Code::Comma,
        "." => Code::Period,
        "/" => Code::Slash,
        ";" => Code::Semicolon,
        "'" => Code::Quote,
        "[" => Code::BracketLeft,
        "]" => Code::BracketRight,
        "\\" => Code::Backslash,
        "`" => Code::Backquote,
        _ => return None,
    };
    Some(code)
}

/// Owns the OS hotkey manager on the main thread.
struct HookHost {
    /// Platform manager.
    manager: GlobalHotKeyManager,
    /// Registered hotkeys by id.
    hotkeys: HashMap<HookId, HotKey>,
}

impl HookHost {
    /// Wrap a freshly created manager.
    fn new(manager: GlobalHotKeyManager) -> Self {
        Self {
            manager,
            hotkeys: HashMap::new(),
        }
    }

    /// Register `combo`, returning its id.
    fn register(&mut self, combo: &str) -> StdResult<HookId, String> {
        let hotkey = hotkey_for(combo)?;
        self.manager.register(hotkey).map_err(|e| e.to_string())?;
        let id = hotkey.id();
        self.hotkeys.insert(id, hotkey);
        trace!(%combo, id, "os_hotkey_registered");
        Ok(id)
    }

    /// Unregister a previously registered id. Unknown ids are ignored.
    fn unregister(&mut self, id: HookId) -> StdResult<(), String> {
        let Some(hotkey) = self.hotkeys.remove(&id) else {
            return Ok(());
        };
        self.manager.unregister(hotkey).map_err(|e| e.to_string())
    }

    /// Serve one request. Replies are best effort: the requester may have timed out.
    fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::Register { combo, reply } => {
                let res = self.register(&combo);
                reply.send(res).ok();
            }
            HostEvent::Unregister { id, reply } => {
                let res = self.unregister(id);
                reply.send(res).ok();
            }
            HostEvent::Exit(_) => {}
        }
    }

    /// Drop every remaining registration before the loop exits.
    fn clear(&mut self) {
        for (id, hotkey) in self.hotkeys.drain() {
            if let Err(e) = self.manager.unregister(hotkey) {
                debug!(id, error = %e, "os_hotkey_unregister_failed");
            }
        }
    }
}

/// [`HotkeyApi`] that forwards calls to the main-thread [`HookHost`].
pub struct ProxyHotkeyApi {
    /// Event loop proxy.
    proxy: Mutex<EventLoopProxy<HostEvent>>,
}

impl ProxyHotkeyApi {
    /// Wrap an event loop proxy.
    pub fn new(proxy: EventLoopProxy<HostEvent>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }

    /// Send a request to the host.
    fn send(&self, event: HostEvent) -> StdResult<(), String> {
        self.proxy
            .lock()
            .send_event(event)
            .map_err(|_| "event loop closed".to_string())
    }
}

impl HotkeyApi for ProxyHotkeyApi {
    fn register(&self, combo: &str) -> quickpaste_engine::Result<HookId> {
        let fail = |message: String| EngineError::HookRegistration {
            combo: combo.to_string(),
            message,
        };
        let (reply, rx) = bounded(1);
        self.send(HostEvent::Register {
            combo: combo.to_string(),
            reply,
        })
        .map_err(fail)?;
        match rx.recv_timeout(REPLY_TIMEOUT) {
            Ok(res) => res.map_err(fail),
            Err(e) => Err(fail(e.to_string())),
        }
    }

    fn unregister(&self, id: HookId) -> quickpaste_engine::Result<()> {
        let fail = |message: String| EngineError::HookRegistration {
            combo: format!("#{id}"),
            message,
        };
        let (reply, rx) = bounded(1);
        self.send(HostEvent::Unregister { id, reply }).map_err(fail)?;
        match rx.recv_timeout(REPLY_TIMEOUT) {
            Ok(res) => res.map_err(fail),
            Err(e) => Err(fail(e.to_string())),
        }
    }
}

/// Forward hotkey presses to `tx` until the receiver is dropped.
fn spawn_listener(tx: UnboundedSender<HookId>) -> Result<()> {
    thread::Builder::new()
        .name("quickpaste-hotkeys".into())
        .spawn(move || {
            let events = GlobalHotKeyEvent::receiver();
            while let Ok(event) = events.recv() {
                if event.state() != HotKeyState::Pressed {
                    continue;
                }
                if tx.send(event.id()).is_err() {
                    break;
                }
            }
            debug!("hotkey_listener_stopped");
        })
        .map_err(|source| Error::Startup {
            what: "hotkey listener",
            source,
        })?;
    Ok(())
}

/// Run the daemon. Must be called on the main thread; returns only on
/// startup failure, otherwise the process exits when the event loop ends.
pub fn run(config: PathBuf) -> Result<()> {
    #[allow(unused_mut)]
    let mut event_loop = EventLoopBuilder::<HostEvent>::with_user_event().build();
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }
    let manager = GlobalHotKeyManager::new().map_err(|e| Error::HookManager(e.to_string()))?;
    let mut host = HookHost::new(manager);

    let proxy = event_loop.create_proxy();
    let api: Arc<dyn HotkeyApi> = Arc::new(ProxyHotkeyApi::new(proxy.clone()));
    let (press_tx, press_rx) = mpsc::unbounded_channel();
    spawn_listener(press_tx)?;

    thread::Builder::new()
        .name("quickpaste-runtime".into())
        .spawn(move || {
            let code = match runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(daemon::run(api, config, press_rx)),
                Err(e) => {
                    error!(error = %e, "runtime_start_failed");
                    1
                }
            };
            if proxy.send_event(HostEvent::Exit(code)).is_err() {
                warn!("event_loop_gone_before_exit");
            }
        })
        .map_err(|source| Error::Startup {
            what: "runtime thread",
            source,
        })?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        if let Event::UserEvent(event) = event {
            match event {
                HostEvent::Exit(code) => {
                    host.clear();
                    debug!(code, "event_loop_exit");
                    *control_flow = ControlFlow::ExitWithCode(code);
                }
                other => host.handle(other),
            }
        }
    })
}
