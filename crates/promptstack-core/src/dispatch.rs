use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::input::KeyEvent;
use crate::keymap::Binding;
use crate::keymap::KeyMap;
use crate::keymap::MatchKind;

/// Identifies one binding owner (usually a widget instance).
///
/// Ids are allocated from a process-wide counter so two instances of the same
/// widget type never collide; the label only shows up in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId {
    id: u64,
    label: &'static str,
}

impl OwnerId {
    pub fn new(label: &'static str) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT.fetch_add(1, Ordering::Relaxed),
            label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ActiveBinding {
    binding: Binding,
    inert: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct OwnerMap {
    owner: OwnerId,
    bindings: Vec<ActiveBinding>,
}

/// A snapshot of the dispatcher's live state, taken and restored by the focus
/// stack. Owner order is registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveSet {
    owners: Vec<OwnerMap>,
}

/// One binding resolved for a keypress: which owner it belongs to and which
/// action identifier it dispatches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub owner: OwnerId,
    pub action: &'static str,
    pub kind: MatchKind,
}

/// Owns the active keymap set and resolves raw keypresses against it.
///
/// The dispatcher never mutates widget state; it reports which handlers a
/// keypress binds to and the surrounding session invokes them.
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    active: ActiveSet,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens `maps` and stores the result as `owner`'s active map,
    /// replacing any prior map for that owner (the owner keeps its original
    /// position in the set).
    ///
    /// A binding whose action `supports` rejects is a configuration error:
    /// it is reported once here and stays inert, without blocking the owner's
    /// other bindings.
    pub fn set_keymap(
        &mut self,
        owner: OwnerId,
        maps: impl IntoIterator<Item = KeyMap>,
        supports: impl Fn(&str) -> bool,
    ) {
        let bindings: Vec<ActiveBinding> = KeyMap::flatten(maps)
            .into_bindings()
            .into_iter()
            .map(|binding| {
                let inert = !supports(binding.action);
                if inert {
                    log::warn!(
                        "owner `{}`: binding `{}` ({}) targets an unknown action and will be ignored",
                        owner.label(),
                        binding.action,
                        binding.key_label(),
                    );
                }
                ActiveBinding { binding, inert }
            })
            .collect();

        if let Some(entry) = self.active.owners.iter_mut().find(|m| m.owner == owner) {
            entry.bindings = bindings;
        } else {
            self.active.owners.push(OwnerMap { owner, bindings });
        }
    }

    /// Drops `owner`'s map from the active set.
    pub fn remove(&mut self, owner: OwnerId) {
        self.active.owners.retain(|m| m.owner != owner);
    }

    /// Drops every owner's map.
    pub fn clear(&mut self) {
        self.active.owners.clear();
    }

    /// Resolves a raw keypress across every owner's active map.
    ///
    /// The event is normalized first. Matching bindings split into direct and
    /// catch-all; when any direct match exists only the direct handlers run,
    /// otherwise all catch-all handlers run. Results preserve registration
    /// order across owners.
    pub fn resolve(&self, event: &KeyEvent) -> Vec<Resolved> {
        let event = event.normalized();
        let mut direct: Vec<Resolved> = Vec::new();
        let mut catch_all: Vec<Resolved> = Vec::new();

        for map in &self.active.owners {
            for active in &map.bindings {
                if active.inert {
                    continue;
                }
                match active.binding.match_kind(&event) {
                    Some(MatchKind::Direct) => direct.push(Resolved {
                        owner: map.owner,
                        action: active.binding.action,
                        kind: MatchKind::Direct,
                    }),
                    Some(MatchKind::CatchAll) => catch_all.push(Resolved {
                        owner: map.owner,
                        action: active.binding.action,
                        kind: MatchKind::CatchAll,
                    }),
                    None => {}
                }
            }
        }

        if direct.is_empty() { catch_all } else { direct }
    }

    /// Merges every owner's live bindings into one table, ignoring owner
    /// identity. Inert bindings are excluded. This is the table help rendering
    /// works from.
    pub fn merged_bindings(&self) -> Vec<&Binding> {
        self.active
            .owners
            .iter()
            .flat_map(|m| m.bindings.iter())
            .filter(|a| !a.inert)
            .map(|a| &a.binding)
            .collect()
    }

    pub fn owner_count(&self) -> usize {
        self.active.owners.len()
    }

    pub fn save(&self) -> ActiveSet {
        self.active.clone()
    }

    pub fn restore(&mut self, set: ActiveSet) {
        self.active = set;
    }
}
