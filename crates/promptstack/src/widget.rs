use std::sync::Arc;

use chrono::NaiveDate;
use promptstack_core::dispatch::OwnerId;
use promptstack_core::fuzzy::Candidate;
use promptstack_core::input::KeyCode;
use promptstack_core::input::KeyEvent;
use promptstack_core::keymap::KeyMap;
use serde_json::Value;

use crate::theme::Theme;

/// Key list for numeric quick-select bindings.
pub(crate) const DIGIT_KEYS: [KeyCode; 10] = [
    KeyCode::Char('0'),
    KeyCode::Char('1'),
    KeyCode::Char('2'),
    KeyCode::Char('3'),
    KeyCode::Char('4'),
    KeyCode::Char('5'),
    KeyCode::Char('6'),
    KeyCode::Char('7'),
    KeyCode::Char('8'),
    KeyCode::Char('9'),
];

/// Error raised by a user-supplied hook. Hook failures are programming
/// errors, distinct from a user declining to proceed, and propagate to the
/// prompt caller unswallowed.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// What a handler asks the session to do after it ran.
#[derive(Debug)]
pub enum Flow {
    /// Redraw the active widget once dispatch completes.
    Render,
    /// The handler ran but suppresses this keypress's redraw. Suppression is
    /// global across all handlers triggered by one keypress.
    Silent,
    /// The widget swapped its keymap set (mode change); re-register, then
    /// redraw.
    Remap,
    /// The widget finished; its output is ready via [`Widget::take_output`].
    Done,
    /// The widget needs a nested interaction before it can continue; the
    /// outcome arrives through [`Widget::resume`].
    Effect(Effect),
    /// A hook failed.
    Fail(HookError),
}

/// Nested interactions a widget can request mid-dispatch. The session runs
/// each one under its own focus frame, so the requesting widget's bindings
/// stay inactive until the nested prompt completes.
#[derive(Debug)]
pub enum Effect {
    EditString {
        prompt: String,
        initial: String,
        placeholder: Option<String>,
        masked: bool,
    },
    EditNumber {
        prompt: String,
        initial: Option<f64>,
    },
    EditDate {
        prompt: String,
        initial: Option<NaiveDate>,
    },
    PickOne {
        entries: Vec<MenuEntry<Value>>,
        initial: Option<Value>,
    },
    PickMany {
        entries: Vec<MenuEntry<Value>>,
        current: Vec<Value>,
    },
    Confirm {
        message: String,
    },
}

/// The result of a nested interaction, fed back into [`Widget::resume`].
#[derive(Clone, Debug, PartialEq)]
pub enum EffectOutcome {
    Text(String),
    Number(Option<f64>),
    Date(Option<NaiveDate>),
    One(Option<Value>),
    Many(Vec<Value>),
    Confirmed(bool),
}

/// One selectable entry, shared by the menu, list, and pick-many widgets.
///
/// `kind` and `help` participate in fuzzy ranking; `priority` orders entries
/// within a column (higher first, stable).
#[derive(Clone, Debug, PartialEq)]
pub struct MenuEntry<T> {
    pub label: String,
    pub value: T,
    pub help: Option<String>,
    pub kind: Option<String>,
    pub priority: i32,
}

impl<T> MenuEntry<T> {
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
            help: None,
            kind: None,
            priority: 0,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn candidate(&self) -> Candidate<'_> {
        Candidate {
            label: &self.label,
            help: self.help.as_deref(),
            kind: self.kind.as_deref(),
        }
    }
}

/// Compares entry values for selection purposes. The default is plain
/// `PartialEq`; callers whose values are structured objects supply a
/// comparator over an id path instead.
pub type EntryEq<T> = Arc<dyn Fn(&T, &T) -> bool>;

pub fn entry_eq<T: PartialEq>(custom: &Option<EntryEq<T>>, a: &T, b: &T) -> bool {
    match custom {
        Some(eq) => eq(a, b),
        None => a == b,
    }
}

/// The contract every interactive widget implements.
///
/// A widget is constructed once and configured fresh for every invocation:
/// its `configure` method (one per widget type, taking that widget's options
/// struct) resets all working state. The session registers the widget's
/// keymaps when the prompt's focus frame is entered, routes resolved actions
/// through [`Widget::apply`], and collects the typed output once a handler
/// reports [`Flow::Done`].
pub trait Widget {
    type Output;

    fn owner(&self) -> OwnerId;

    /// The keymaps for the widget's current mode, flattened in order by the
    /// dispatcher (later maps override earlier ones).
    fn keymaps(&self) -> Vec<KeyMap>;

    /// Every action identifier the widget handles. Bindings outside this
    /// table are configuration errors, warned about at registration.
    fn actions(&self) -> &'static [&'static str];

    fn apply(&mut self, action: &str, key: &KeyEvent) -> Flow;

    /// Renders the widget body as a string with embedded ANSI styling.
    fn render(&self, theme: &Theme) -> String;

    fn take_output(&mut self) -> Option<Self::Output>;

    /// Receives the outcome of an [`Effect`] this widget requested.
    fn resume(&mut self, outcome: EffectOutcome) -> Flow {
        let _ = outcome;
        Flow::Render
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_eq_prefers_custom_comparator() {
        let by_first_char: EntryEq<String> =
            Arc::new(|a: &String, b: &String| a.chars().next() == b.chars().next());
        let custom = Some(by_first_char);
        assert!(entry_eq(
            &custom,
            &"apple".to_string(),
            &"avocado".to_string()
        ));
        assert!(!entry_eq(&None, &"apple".to_string(), &"avocado".to_string()));
    }
}
