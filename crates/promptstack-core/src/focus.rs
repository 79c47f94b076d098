use crate::dispatch::Dispatcher;
use crate::dispatch::OwnerId;
use crate::keymap::KeyMap;

/// The focus stack: temporary replacement of the active keymap set.
///
/// `wrap` snapshots the set around an inner operation that is free to
/// register and remove maps; `focus` additionally empties the set and
/// installs a single owner's map, so no other owner's bindings can fire while
/// the focused operation runs. Both restore the exact prior state on every
/// exit path, including unwinds.
impl Dispatcher {
    pub fn wrap<T>(&mut self, f: impl FnOnce(&mut Dispatcher) -> T) -> T {
        let saved = self.save();
        let mut guard = scopeguard::guard(self, move |d| d.restore(saved));
        f(&mut guard)
    }

    pub fn focus<T>(
        &mut self,
        owner: OwnerId,
        maps: impl IntoIterator<Item = KeyMap>,
        supports: impl Fn(&str) -> bool,
        f: impl FnOnce(&mut Dispatcher) -> T,
    ) -> T {
        self.wrap(|d| {
            d.clear();
            d.set_keymap(owner, maps, supports);
            f(d)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyCode;
    use crate::input::KeyEvent;
    use crate::keymap::Binding;

    fn simple_map(action: &'static str, code: KeyCode) -> KeyMap {
        KeyMap::new().with(Binding::new(action, "", vec![code]))
    }

    #[test]
    fn wrap_restores_prior_set() {
        let mut d = Dispatcher::new();
        let outer = OwnerId::new("outer");
        d.set_keymap(outer, [simple_map("quit", KeyCode::Char('q'))], |_| true);
        let before = d.save();

        d.wrap(|d| {
            let inner = OwnerId::new("inner");
            d.set_keymap(inner, [simple_map("pick", KeyCode::Enter)], |_| true);
            assert_eq!(d.owner_count(), 2);
        });

        assert_eq!(d.save(), before);
    }

    #[test]
    fn focus_excludes_every_other_owner() {
        let mut d = Dispatcher::new();
        let outer = OwnerId::new("outer");
        d.set_keymap(outer, [simple_map("quit", KeyCode::Char('q'))], |_| true);

        let editor = OwnerId::new("editor");
        d.focus(
            editor,
            [simple_map("commit", KeyCode::Enter)],
            |_| true,
            |d| {
                // the outer quit binding must not fire while focused
                assert!(d.resolve(&KeyEvent::new(KeyCode::Char('q'))).is_empty());
                let hits = d.resolve(&KeyEvent::new(KeyCode::Enter));
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].owner, editor);
            },
        );

        assert_eq!(d.resolve(&KeyEvent::new(KeyCode::Char('q'))).len(), 1);
    }

    #[test]
    fn wrap_restores_on_unwind() {
        let mut d = Dispatcher::new();
        let outer = OwnerId::new("outer");
        d.set_keymap(outer, [simple_map("quit", KeyCode::Char('q'))], |_| true);
        let before = d.save();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            d.wrap(|d| {
                d.clear();
                panic!("inner operation failed");
            })
        }));

        assert!(result.is_err());
        assert_eq!(d.save(), before);
    }

    #[test]
    fn nested_focus_frames_unwind_in_order() {
        let mut d = Dispatcher::new();
        let a = OwnerId::new("a");
        let b = OwnerId::new("b");
        let c = OwnerId::new("c");
        d.set_keymap(a, [simple_map("a", KeyCode::Char('a'))], |_| true);

        d.focus(b, [simple_map("b", KeyCode::Char('b'))], |_| true, |d| {
            d.focus(c, [simple_map("c", KeyCode::Char('c'))], |_| true, |d| {
                assert_eq!(d.owner_count(), 1);
                assert!(!d.resolve(&KeyEvent::new(KeyCode::Char('c'))).is_empty());
            });
            assert_eq!(d.owner_count(), 1);
            assert!(!d.resolve(&KeyEvent::new(KeyCode::Char('b'))).is_empty());
        });

        assert_eq!(d.owner_count(), 1);
        assert!(!d.resolve(&KeyEvent::new(KeyCode::Char('a'))).is_empty());
    }
}
