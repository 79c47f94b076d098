use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::input::KeyModifiers;

/// The keys a binding fires on: an explicit key list, or everything.
///
/// Catch-all bindings let a text-input widget receive ordinary typed
/// characters while named keys like `enter` stay bindable directly; dispatch
/// gives direct bindings precedence over catch-all ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeySet {
    Only(Vec<KeyCode>),
    CatchAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    Direct,
    CatchAll,
}

/// One keybinding: a trigger plus the action identifier it dispatches to.
///
/// Action identifiers are plain strings validated against the owner's action
/// table when the map is registered; there is no runtime reflection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub keys: KeySet,
    pub modifiers: KeyModifiers,
    pub action: &'static str,
    pub description: String,
    pub power_user: bool,
}

impl Binding {
    pub fn new(action: &'static str, description: impl Into<String>, keys: Vec<KeyCode>) -> Self {
        Self {
            keys: KeySet::Only(keys),
            modifiers: KeyModifiers::none(),
            action,
            description: description.into(),
            power_user: false,
        }
    }

    pub fn catch_all(action: &'static str, description: impl Into<String>) -> Self {
        Self {
            keys: KeySet::CatchAll,
            modifiers: KeyModifiers::none(),
            action,
            description: description.into(),
            power_user: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn power_user(mut self) -> Self {
        self.power_user = true;
        self
    }

    /// How this binding matches `event`, if at all.
    ///
    /// Direct bindings require the key to be listed and the observed modifiers
    /// to equal the binding's modifier requirements exactly. Catch-all
    /// bindings match every event.
    pub fn match_kind(&self, event: &KeyEvent) -> Option<MatchKind> {
        match &self.keys {
            KeySet::CatchAll => Some(MatchKind::CatchAll),
            KeySet::Only(keys) => {
                if keys.contains(&event.code) && self.modifiers == event.modifiers {
                    Some(MatchKind::Direct)
                } else {
                    None
                }
            }
        }
    }

    /// Trigger identity: two bindings collide when they fire on the same keys
    /// with the same modifier requirements. Used by [`KeyMap::flatten`] to let
    /// later maps override earlier ones.
    pub fn same_trigger(&self, other: &Binding) -> bool {
        self.keys == other.keys && self.modifiers == other.modifiers
    }

    /// The rendered key label used in help listings, e.g. `ctrl+a` or `↑/k`.
    pub fn key_label(&self) -> String {
        let mut prefix = String::new();
        if self.modifiers.ctrl {
            prefix.push_str("ctrl+");
        }
        if self.modifiers.meta {
            prefix.push_str("meta+");
        }
        if self.modifiers.shift {
            prefix.push_str("shift+");
        }
        match &self.keys {
            KeySet::CatchAll => format!("{prefix}…"),
            KeySet::Only(keys) => {
                let names: Vec<String> = keys.iter().map(KeyCode::name).collect();
                format!("{prefix}{}", names.join("/"))
            }
        }
    }
}

/// An ordered collection of bindings, registered as a unit by one owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyMap {
    bindings: Vec<Binding>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn push(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn into_bindings(self) -> Vec<Binding> {
        self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Flattens `maps` into one map. Later maps override earlier ones when a
    /// binding shares the same trigger; the overriding binding keeps the later
    /// position.
    pub fn flatten(maps: impl IntoIterator<Item = KeyMap>) -> KeyMap {
        let mut out: Vec<Binding> = Vec::new();
        for map in maps {
            for binding in map.bindings {
                out.retain(|b| !b.same_trigger(&binding));
                out.push(binding);
            }
        }
        KeyMap { bindings: out }
    }
}

pub fn key_char(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c))
}

pub fn key_ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c)).with_modifiers(KeyModifiers::ctrl())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_binding_requires_exact_modifiers() {
        let b = Binding::new("quit", "quit", vec![KeyCode::Char('q')]);
        assert_eq!(b.match_kind(&key_char('q')), Some(MatchKind::Direct));
        assert_eq!(b.match_kind(&key_ctrl('q')), None);
        assert_eq!(b.match_kind(&key_char('x')), None);
    }

    #[test]
    fn catch_all_matches_everything() {
        let b = Binding::catch_all("type", "type to search");
        assert_eq!(b.match_kind(&key_char('z')), Some(MatchKind::CatchAll));
        assert_eq!(
            b.match_kind(&KeyEvent::new(KeyCode::Enter)),
            Some(MatchKind::CatchAll)
        );
    }

    #[test]
    fn flatten_later_map_overrides_same_trigger() {
        let base = KeyMap::new()
            .with(Binding::new("up", "previous", vec![KeyCode::Up]))
            .with(Binding::new("confirm", "confirm", vec![KeyCode::Enter]));
        let over = KeyMap::new().with(Binding::new("commit", "commit", vec![KeyCode::Enter]));
        let flat = KeyMap::flatten([base, over]);
        assert_eq!(flat.len(), 2);
        let actions: Vec<&str> = flat.bindings().iter().map(|b| b.action).collect();
        assert_eq!(actions, vec!["up", "commit"]);
    }

    #[test]
    fn flatten_keeps_distinct_modifiers_apart() {
        let a = KeyMap::new().with(Binding::new("a", "a", vec![KeyCode::Char('x')]));
        let b = KeyMap::new().with(
            Binding::new("b", "b", vec![KeyCode::Char('x')]).with_modifiers(KeyModifiers::ctrl()),
        );
        assert_eq!(KeyMap::flatten([a, b]).len(), 2);
    }

    #[test]
    fn key_label_renders_modifiers_and_lists() {
        let b = Binding::new("nav", "navigate", vec![KeyCode::Up, KeyCode::Char('k')]);
        assert_eq!(b.key_label(), "up/k");
        let b = Binding::new("quit", "quit", vec![KeyCode::Char('c')])
            .with_modifiers(KeyModifiers::ctrl());
        assert_eq!(b.key_label(), "ctrl+c");
    }
}
