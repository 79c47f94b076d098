use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyModifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Esc,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

impl KeyCode {
    /// Parses a raw key name as reported by a terminal reader.
    ///
    /// Aliases are folded onto one canonical code (`"return"` → [`KeyCode::Enter`],
    /// `"escape"` → [`KeyCode::Esc`]); unknown multi-character names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let code = match name {
            "enter" | "return" => Self::Enter,
            "backspace" => Self::Backspace,
            "delete" => Self::Delete,
            "tab" => Self::Tab,
            "esc" | "escape" => Self::Esc,
            "left" => Self::Left,
            "right" => Self::Right,
            "up" => Self::Up,
            "down" => Self::Down,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            "space" => Self::Char(' '),
            _ => {
                let mut chars = name.chars();
                let first = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Self::Char(first)
            }
        };
        Some(code)
    }

    /// The rendered name used in help listings.
    pub fn name(&self) -> String {
        match self {
            Self::Char(' ') => "space".to_string(),
            Self::Char(c) => c.to_string(),
            Self::Enter => "enter".to_string(),
            Self::Backspace => "backspace".to_string(),
            Self::Delete => "delete".to_string(),
            Self::Tab => "tab".to_string(),
            Self::Esc => "esc".to_string(),
            Self::Left => "left".to_string(),
            Self::Right => "right".to_string(),
            Self::Up => "up".to_string(),
            Self::Down => "down".to_string(),
            Self::Home => "home".to_string(),
            Self::End => "end".to_string(),
            Self::PageUp => "pageup".to_string(),
            Self::PageDown => "pagedown".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::none(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Folds raw control characters onto their canonical codes.
    ///
    /// Dispatch always normalizes before matching, so bindings only ever see
    /// the canonical form.
    pub fn normalized(mut self) -> Self {
        self.code = match self.code {
            KeyCode::Char('\r') | KeyCode::Char('\n') => KeyCode::Enter,
            KeyCode::Char('\t') => KeyCode::Tab,
            code => code,
        };
        self
    }
}

/// The raw-keypress boundary. The core does not care how events are produced:
/// a terminal raw-mode reader, a scripted test source, or anything else that
/// can yield [`KeyEvent`]s.
pub trait KeySource {
    /// Blocks until the next key event, or fails with
    /// [`std::io::ErrorKind::UnexpectedEof`] when the source is exhausted.
    fn next_key(&mut self) -> std::io::Result<KeyEvent>;
}

/// A scripted key source for tests and replay.
#[derive(Clone, Debug, Default)]
pub struct ScriptedKeys {
    queue: VecDeque<KeyEvent>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            queue: keys.into_iter().collect(),
        }
    }

    pub fn push(&mut self, key: KeyEvent) {
        self.queue.push_back(key);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> std::io::Result<KeyEvent> {
        self.queue.pop_front().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "key source exhausted")
        })
    }
}

/// Types characters from `text` as individual key events.
pub fn typed(text: &str) -> Vec<KeyEvent> {
    text.chars()
        .map(|c| KeyEvent::new(KeyCode::Char(c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_folds_aliases() {
        assert_eq!(KeyCode::from_name("return"), Some(KeyCode::Enter));
        assert_eq!(KeyCode::from_name("enter"), Some(KeyCode::Enter));
        assert_eq!(KeyCode::from_name("escape"), Some(KeyCode::Esc));
        assert_eq!(KeyCode::from_name("a"), Some(KeyCode::Char('a')));
        assert_eq!(KeyCode::from_name("bogus"), None);
    }

    #[test]
    fn normalized_folds_control_chars() {
        let ev = KeyEvent::new(KeyCode::Char('\r')).normalized();
        assert_eq!(ev.code, KeyCode::Enter);
        let ev = KeyEvent::new(KeyCode::Char('x')).normalized();
        assert_eq!(ev.code, KeyCode::Char('x'));
    }

    #[test]
    fn scripted_keys_drain_then_eof() {
        let mut keys = ScriptedKeys::new(typed("ab"));
        assert_eq!(keys.next_key().unwrap().code, KeyCode::Char('a'));
        assert_eq!(keys.next_key().unwrap().code, KeyCode::Char('b'));
        let err = keys.next_key().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
