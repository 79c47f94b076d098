use promptstack_core::keymap::Binding;
use promptstack_core::keymap::KeyMap;

use crate::theme::Theme;
use crate::theme::paint;

#[derive(Clone, Debug)]
pub struct HelpOptions {
    pub separator: String,
    pub space: String,
}

impl Default for HelpOptions {
    fn default() -> Self {
        Self {
            separator: " • ".to_string(),
            space: " ".to_string(),
        }
    }
}

/// Renders the merged active bindings as a one-line help listing.
///
/// Power-user bindings are hidden, the rest sort by their rendered key label,
/// and `prefix` (fixed, always-shown bindings) renders in front in its own
/// order. Returns an empty string when nothing is listable.
pub fn render_help(prefix: &KeyMap, bindings: &[&Binding], theme: &Theme) -> String {
    render_help_with_options(prefix, bindings, theme, &HelpOptions::default())
}

pub fn render_help_with_options(
    prefix: &KeyMap,
    bindings: &[&Binding],
    theme: &Theme,
    options: &HelpOptions,
) -> String {
    let mut sorted: Vec<&Binding> = bindings
        .iter()
        .copied()
        .filter(|b| !b.power_user && !b.description.is_empty())
        .collect();
    sorted.sort_by_key(|b| b.key_label());

    let mut out = String::new();
    let entries = prefix
        .bindings()
        .iter()
        .filter(|b| !b.description.is_empty())
        .chain(sorted);
    for (i, binding) in entries.enumerate() {
        if i > 0 {
            out.push_str(&options.separator);
        }
        out.push_str(&paint(theme.accent, &binding.key_label()));
        out.push_str(&options.space);
        out.push_str(&binding.description);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptstack_core::input::KeyCode;
    use promptstack_core::text::strip_ansi;

    #[test]
    fn hides_power_user_bindings_and_sorts_by_label() {
        let bindings = vec![
            Binding::new("z", "last", vec![KeyCode::Char('z')]),
            Binding::new("a", "first", vec![KeyCode::Char('a')]),
            Binding::new("h", "hidden", vec![KeyCode::Char('h')]).power_user(),
        ];
        let refs: Vec<&Binding> = bindings.iter().collect();
        let out = render_help(&KeyMap::new(), &refs, &Theme::default());
        let plain = strip_ansi(&out);
        assert_eq!(plain, "a first • z last");
    }

    #[test]
    fn prefix_map_renders_in_front_unsorted() {
        let prefix = KeyMap::new()
            .with(Binding::new("quit", "quit", vec![KeyCode::Char('q')]))
            .with(Binding::new("back", "back", vec![KeyCode::Esc]));
        let bindings = vec![Binding::new("a", "first", vec![KeyCode::Char('a')])];
        let refs: Vec<&Binding> = bindings.iter().collect();
        let out = render_help(&prefix, &refs, &Theme::default());
        let plain = strip_ansi(&out);
        assert_eq!(plain, "q quit • esc back • a first");
    }

    #[test]
    fn empty_input_renders_empty() {
        let out = render_help(&KeyMap::new(), &[], &Theme::default());
        assert!(out.is_empty());
    }
}
