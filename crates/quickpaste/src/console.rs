//! Line-oriented control console on stdin.
//!
//! Each line is one command; replies go to stdout. Closing stdin stops the
//! console but leaves the hotkeys running until Ctrl+C.

use std::{fmt::Write as _, result::Result as StdResult};

use quickpaste_config::{HotkeyTable, decode_entry};
use quickpaste_engine::{Engine, Status};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Result;

/// Help text printed by `help`.
const HELP: &str = "\
commands:
  list                        show bindings (* = armed)
  bind <combo> <json>         create or replace a binding; json is any stored entry form
  tag <combo> <text>          set a binding's tag
  rename <old> <new>          move a binding to another combo
  remove <combo>              delete a binding
  pause | resume              suspend or re-arm every hotkey
  reload                      re-arm hotkeys from the table
  status                      hook state and config path
  quit                        unhook everything and exit
  help                        this text";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List bindings.
    List,
    /// Create or replace a binding from a JSON entry.
    Bind {
        /// Combo to bind.
        combo: String,
        /// Entry JSON in any stored form.
        entry: String,
    },
    /// Set a tag.
    Tag {
        /// Bound combo.
        combo: String,
        /// New tag text.
        text: String,
    },
    /// Move a binding.
    Rename {
        /// Current combo.
        old: String,
        /// Target combo.
        new: String,
    },
    /// Delete a binding.
    Remove {
        /// Combo to delete.
        combo: String,
    },
    /// Suspend hotkeys.
    Pause,
    /// Re-arm hotkeys.
    Resume,
    /// Re-arm from the table.
    Reload,
    /// Show state.
    Status,
    /// Exit the daemon.
    Quit,
    /// Show help.
    Help,
}

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this and keep reading.
    Text(String),
    /// Stop the daemon.
    Quit,
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

impl Command {
    /// Parse one console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> StdResult<Option<Self>, String> {
        let (verb, rest) = split_word(line.trim());
        if verb.is_empty() {
            return Ok(None);
        }
        let need = |what: &str| format!("usage: {verb} {what}");
        let cmd = match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "bind" => {
                let (combo, entry) = split_word(rest);
                if combo.is_empty() || entry.is_empty() {
                    return Err(need("<combo> <json>"));
                }
                Self::Bind {
                    combo: combo.to_string(),
                    entry: entry.to_string(),
                }
            }
            "tag" => {
                let (combo, text) = split_word(rest);
                if combo.is_empty() {
                    return Err(need("<combo> <text>"));
                }
                Self::Tag {
                    combo: combo.to_string(),
                    text: text.to_string(),
                }
            }
            "rename" | "mv" => {
                let (old, new) = split_word(rest);
                if old.is_empty() || new.is_empty() || new.contains(char::is_whitespace) {
                    return Err(need("<old> <new>"));
                }
                Self::Rename {
                    old: old.to_string(),
                    new: new.to_string(),
                }
            }
            "remove" | "rm" => {
                if rest.is_empty() || rest.contains(char::is_whitespace) {
                    return Err(need("<combo>"));
                }
                Self::Remove {
                    combo: rest.to_string(),
                }
            }
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "reload" => Self::Reload,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            "help" | "?" => Self::Help,
            other => return Err(format!("unknown command {other:?}; try help")),
        };
        Ok(Some(cmd))
    }
}

/// Render the table, marking armed combos.
fn render_table(table: &HotkeyTable, armed: &[String]) -> String {
    if table.is_empty() {
        return "no bindings".to_string();
    }
    let mut out = String::new();
    for (key, binding) in table {
        let mark = if armed.iter().any(|a| a == key) { '*' } else { ' ' };
        let key = if key.is_empty() { "(draft)" } else { key.as_str() };
        let steps = binding.actions.len();
        writeln!(out, "{mark} {key:<20} {:<40} {steps} step(s)", binding.tag).ok();
    }
    out.trim_end().to_string()
}

/// One-line description of a status event.
pub fn describe(status: &Status) -> String {
    match status {
        Status::Running { key } => format!("running {key}"),
        Status::Idle { key, failed_steps: 0 } => format!("done {key}"),
        Status::Idle { key, failed_steps } => {
            format!("done {key} ({failed_steps} step(s) failed)")
        }
        Status::Reloaded { armed } => format!("{armed} hotkey(s) armed"),
        Status::Paused => "hotkeys paused".to_string(),
        Status::Resumed => "hotkeys resumed".to_string(),
    }
}

/// Run one command against the engine.
pub async fn execute(engine: &Engine, cmd: Command) -> Result<Reply> {
    let text = match cmd {
        Command::List => {
            let table = engine.snapshot().await;
            render_table(&table, &engine.armed_hotkeys().await)
        }
        Command::Bind { combo, entry } => {
            let binding = decode_entry(&entry)?;
            let key = engine
                .save_binding(&combo, binding.actions, &binding.tag)
                .await?;
            format!("bound {key}")
        }
        Command::Tag { combo, text } => {
            if engine.set_tag(&combo, &text).await? {
                format!("tagged {}", keychord::normalize(&combo))
            } else {
                format!("no binding for {combo}")
            }
        }
        Command::Rename { old, new } => match engine.rename_binding(&old, &new).await? {
            Some(key) => format!("renamed to {key}"),
            None => format!("no binding for {old}"),
        },
        Command::Remove { combo } => match engine.remove_binding(&combo).await? {
            Some(_) => format!("removed {}", keychord::normalize(&combo)),
            None => format!("no binding for {combo}"),
        },
        Command::Pause => {
            engine.pause_hotkeys().await?;
            "paused".to_string()
        }
        Command::Resume => {
            engine.resume_hotkeys().await?;
            "resumed".to_string()
        }
        Command::Reload => {
            let armed = engine.reload_hotkeys().await?;
            format!("{armed} hotkey(s) armed")
        }
        Command::Status => format!(
            "hooks {}, {} armed, config {}",
            engine.state().await,
            engine.armed_hotkeys().await.len(),
            engine.config_path().display()
        ),
        Command::Quit => return Ok(Reply::Quit),
        Command::Help => HELP.to_string(),
    };
    Ok(Reply::Text(text))
}

/// Read commands from stdin until `quit` or end of input.
///
/// `quit` cancels `shutdown`; end of input only stops the console.
pub async fn run(engine: Engine, shutdown: CancellationToken) {
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("console_eof");
                break;
            }
            Err(e) => {
                debug!(error = %e, "console_read_failed");
                break;
            }
        };
        let cmd = match Command::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        match execute(&engine, cmd).await {
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Quit) => {
                shutdown.cancel();
                break;
            }
            Err(e) => println!("error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quickpaste_config::ConfigStore;
    use quickpaste_engine::{
        MockHotkeyApi,
        test_support::{Recorder, temp_dir},
    };

    use super::*;

    fn engine(label: &str) -> Engine {
        let dir = temp_dir(label);
        let rec = Recorder::new();
        let (engine, _rx) = Engine::new(
            Arc::new(MockHotkeyApi::new()),
            ConfigStore::new(dir.join("config.json")),
            move || rec.player(),
        )
        .expect("engine");
        engine
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  "), Ok(None));
        assert_eq!(Command::parse("LIST"), Ok(Some(Command::List)));
        assert_eq!(
            Command::parse(r#"bind Ctrl+1 {"tag":"hi","actions":[]}"#),
            Ok(Some(Command::Bind {
                combo: "Ctrl+1".into(),
                entry: r#"{"tag":"hi","actions":[]}"#.into(),
            }))
        );
        assert_eq!(
            Command::parse("tag ctrl+1 greeting  text"),
            Ok(Some(Command::Tag {
                combo: "ctrl+1".into(),
                text: "greeting  text".into(),
            }))
        );
        assert_eq!(
            Command::parse("rename ctrl+1 ctrl+2"),
            Ok(Some(Command::Rename {
                old: "ctrl+1".into(),
                new: "ctrl+2".into(),
            }))
        );
        assert_eq!(Command::parse("quit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn rejects_bad_usage() {
        assert!(Command::parse("bind ctrl+1").is_err());
        assert!(Command::parse("remove").is_err());
        assert!(Command::parse("rename ctrl+1").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[tokio::test]
    async fn bind_list_and_remove() {
        let engine = engine("console-bind");
        let reply = execute(
            &engine,
            Command::Bind {
                combo: "Shift+Ctrl+1".into(),
                entry: r#""hello""#.into(),
            },
        )
        .await
        .expect("bind");
        assert_eq!(text(reply), "bound ctrl+shift+1");

        let listing = text(execute(&engine, Command::List).await.expect("list"));
        assert!(listing.starts_with("* ctrl+shift+1"), "{listing}");
        assert!(listing.contains("hello"), "{listing}");

        let reply = execute(
            &engine,
            Command::Remove {
                combo: "ctrl+shift+1".into(),
            },
        )
        .await
        .expect("remove");
        assert_eq!(text(reply), "removed ctrl+shift+1");
        let listing = text(execute(&engine, Command::List).await.expect("list"));
        assert_eq!(listing, "no bindings");
        engine.request_quit().await;
    }

    #[tokio::test]
    async fn invalid_entries_report_errors() {
        let engine = engine("console-invalid");
        let res = execute(
            &engine,
            Command::Bind {
                combo: "ctrl+1".into(),
                entry: "{not json".into(),
            },
        )
        .await;
        assert!(res.is_err());
        assert!(engine.snapshot().await.is_empty());
        engine.request_quit().await;
    }

    #[tokio::test]
    async fn quit_is_reported_not_executed() {
        let engine = engine("console-quit");
        assert_eq!(
            execute(&engine, Command::Quit).await.expect("quit"),
            Reply::Quit
        );
        let status = text(execute(&engine, Command::Status).await.expect("status"));
        assert!(status.starts_with("hooks listening"), "{status}");
        engine.request_quit().await;
    }

    #[test]
    fn statuses_read_naturally() {
        assert_eq!(
            describe(&Status::Idle {
                key: "ctrl+1".into(),
                failed_steps: 2
            }),
            "done ctrl+1 (2 step(s) failed)"
        );
        assert_eq!(describe(&Status::Reloaded { armed: 3 }), "3 hotkey(s) armed");
    }
}
