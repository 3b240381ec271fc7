use std::path::Path;

use crate::{Action, ActionKind};

/// Maximum length of a derived tag, in characters, including any trailing `…`.
pub const TAG_MAX_CHARS: usize = 40;

/// Characters kept from a text step.
const TEXT_TOKEN_CHARS: usize = 8;

/// Characters kept from an image basename.
const IMAGE_NAME_CHARS: usize = 12;

/// Truncate to `max` characters and mark the cut with `…`.
///
/// With `mark_inside` the marker counts toward `max`; otherwise it is appended.
fn clip(s: &str, max: usize, mark_inside: bool) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = if mark_inside { max.saturating_sub(1) } else { max };
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

/// One token per step.
fn token(action: &Action) -> String {
    match action.kind {
        ActionKind::Text => {
            // Keep the label on one line.
            let flat: String = action
                .value
                .chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect();
            clip(&flat, TEXT_TOKEN_CHARS, false)
        }
        ActionKind::Key => format!("[{}]", action.value.trim()),
        ActionKind::Image => {
            let name = Path::new(&action.value)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| action.value.clone());
            format!("[img:{}]", clip(&name, IMAGE_NAME_CHARS, true))
        }
    }
}

/// Derive a short label from an action sequence.
///
/// Used when a binding is saved with an empty tag. Returns an empty string for
/// an empty sequence.
pub fn auto_tag(actions: &[Action]) -> String {
    let joined = actions.iter().map(token).collect::<Vec<_>>().join(" ");
    clip(&joined, TAG_MAX_CHARS, true)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn text_and_key() {
        let tag = auto_tag(&[Action::text("hello world", 0.3), Action::key("enter", 0.1)]);
        assert_eq!(tag, "hello wo… [enter]");
    }

    #[test]
    fn short_text_is_not_marked() {
        assert_eq!(auto_tag(&[Action::text("hi", 0.3)]), "hi");
        assert_eq!(auto_tag(&[Action::text("12345678", 0.3)]), "12345678");
    }

    #[test]
    fn image_basename_is_bounded() {
        let tag = auto_tag(&[Action::image("images/1700000000_screenshot.png", 1.5)]);
        assert_eq!(tag, "[img:1700000000_…]");
        assert_eq!(
            auto_tag(&[Action::image("/tmp/cat.png", 1.5)]),
            "[img:cat.png]"
        );
    }

    #[test]
    fn whole_tag_is_capped() {
        let actions: Vec<Action> = (0..10).map(|_| Action::key("ctrl+shift+tab", 0.1)).collect();
        let tag = auto_tag(&actions);
        assert_eq!(tag.chars().count(), TAG_MAX_CHARS);
        assert!(tag.ends_with('…'));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let tag = auto_tag(&[Action::text("你好世界你好世界你好", 0.3)]);
        assert_eq!(tag, "你好世界你好世界…");
    }

    #[test]
    fn newlines_are_flattened() {
        assert_eq!(auto_tag(&[Action::text("a\nb", 0.3)]), "a b");
    }

    #[test]
    fn empty_sequence() {
        assert_eq!(auto_tag(&[]), "");
    }

    proptest! {
        #[test]
        fn derived_tags_are_bounded_and_single_line(
            steps in proptest::collection::vec((0u8..3, "\\PC{0,30}|[a-z\n\t]{0,30}"), 0..8)
        ) {
            let actions: Vec<Action> = steps
                .into_iter()
                .map(|(kind, value)| match kind {
                    0 => Action::text(value, 0.0),
                    1 => Action::key(value, 0.0),
                    _ => Action::image(value, 0.0),
                })
                .collect();
            let tag = auto_tag(&actions);
            prop_assert!(tag.chars().count() <= TAG_MAX_CHARS);
            if actions.iter().all(|a| a.kind == ActionKind::Text) {
                prop_assert!(!tag.contains('\n'));
            }
        }
    }
}
