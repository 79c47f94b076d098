use promptstack_core::dispatch::OwnerId;
use promptstack_core::fuzzy;
use promptstack_core::fuzzy::Candidate;
use promptstack_core::input::KeyCode;
use promptstack_core::input::KeyEvent;
use promptstack_core::keymap::Binding;
use promptstack_core::keymap::KeyMap;
use promptstack_core::paging::select_range;
use promptstack_core::text::pad_end;

use crate::theme::Theme;
use crate::theme::paint;
use crate::widget::DIGIT_KEYS;
use crate::widget::EntryEq;
use crate::widget::Flow;
use crate::widget::MenuEntry;
use crate::widget::Widget;
use crate::widget::entry_eq;

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub struct MenuOptions<T> {
    /// Primary column.
    pub entries: Vec<MenuEntry<T>>,
    /// Optional second column.
    pub secondary: Vec<MenuEntry<T>>,
    pub initial: Option<T>,
    pub page_size: usize,
    pub eq: Option<EntryEq<T>>,
}

impl<T> Default for MenuOptions<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            secondary: Vec::new(),
            initial: None,
            page_size: DEFAULT_PAGE_SIZE,
            eq: None,
        }
    }
}

/// A single- or dual-column menu selector with windowed pagination, fuzzy
/// search, and numeric quick-select. Completes with the selected entry's
/// value, or `None` on cancel.
pub struct Menu<T> {
    owner: OwnerId,
    columns: [Vec<MenuEntry<T>>; 2],
    column: usize,
    /// Position within the currently visible (possibly filtered) list.
    cursor: usize,
    searching: bool,
    search: String,
    digits: String,
    page_size: usize,
    eq: Option<EntryEq<T>>,
    output: Option<Option<T>>,
}

impl<T: Clone + PartialEq> Default for Menu<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq> Menu<T> {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("menu"),
            columns: [Vec::new(), Vec::new()],
            column: 0,
            cursor: 0,
            searching: false,
            search: String::new(),
            digits: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            eq: None,
            output: None,
        }
    }

    pub fn configure(&mut self, options: MenuOptions<T>) {
        let mut primary = options.entries;
        let mut secondary = options.secondary;
        sort_by_priority(&mut primary);
        sort_by_priority(&mut secondary);
        self.columns = [primary, secondary];
        self.column = 0;
        self.cursor = 0;
        self.searching = false;
        self.search.clear();
        self.digits.clear();
        self.page_size = options.page_size;
        self.eq = options.eq;
        self.output = None;

        if let Some(initial) = options.initial {
            for (col, entries) in self.columns.iter().enumerate() {
                if let Some(idx) = entries
                    .iter()
                    .position(|e| entry_eq(&self.eq, &e.value, &initial))
                {
                    self.column = col;
                    self.cursor = idx;
                    break;
                }
            }
        }
    }

    pub fn selected_value(&self) -> Option<&T> {
        let visible = self.visible_indices();
        let idx = *visible.get(self.cursor)?;
        Some(&self.columns[self.column][idx].value)
    }

    /// Indices into the active column, in display order. While searching with
    /// a non-empty query the list is fuzzy-ranked; when nothing matches the
    /// full column is kept so navigation remains possible.
    fn visible_indices(&self) -> Vec<usize> {
        let column = &self.columns[self.column];
        if self.searching && !self.search.is_empty() {
            let candidates: Vec<Candidate<'_>> = column.iter().map(|e| e.candidate()).collect();
            let ranked = fuzzy::rank(&self.search, &candidates);
            if !ranked.is_empty() {
                return ranked;
            }
        }
        (0..column.len()).collect()
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_indices().len();
        if len == 0 {
            return;
        }
        let len = len as isize;
        let next = (self.cursor as isize + delta).rem_euclid(len);
        self.cursor = next as usize;
    }

    fn switch_column(&mut self, to: usize) -> Flow {
        if to == self.column || self.columns[to].is_empty() {
            return Flow::Silent;
        }
        let was_searching = self.searching;
        self.column = to;
        self.cursor = self.cursor.min(self.columns[to].len() - 1);
        self.searching = false;
        self.search.clear();
        if was_searching { Flow::Remap } else { Flow::Render }
    }

    /// Re-ranks after a search edit; the selection follows the previously
    /// highlighted entry when it survives the filter and snaps to the top
    /// match otherwise.
    fn update_search(&mut self, previous: Option<usize>) {
        let visible = self.visible_indices();
        self.cursor = previous
            .and_then(|prev| visible.iter().position(|&i| i == prev))
            .unwrap_or(0);
    }

    fn current_underlying(&self) -> Option<usize> {
        self.visible_indices().get(self.cursor).copied()
    }

    fn quick_select(&mut self, key: &KeyEvent) -> Flow {
        let KeyCode::Char(c) = key.code else {
            return Flow::Silent;
        };
        self.digits.push(c);
        let len = self.visible_indices().len();
        match self.digits.parse::<usize>() {
            Ok(n) if n >= 1 && n <= len => {
                self.cursor = n - 1;
                Flow::Render
            }
            _ => {
                self.digits.clear();
                Flow::Silent
            }
        }
    }
}

impl<T: Clone + PartialEq> Widget for Menu<T> {
    type Output = Option<T>;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        let mut base = KeyMap::new()
            .with(Binding::new("prev", "", vec![KeyCode::Up]).power_user())
            .with(Binding::new("next", "", vec![KeyCode::Down]).power_user())
            .with(Binding::new("pick", "select", vec![KeyCode::Enter]))
            .with(Binding::new("cancel", "cancel", vec![KeyCode::Esc]))
            .with(Binding::new("find", "search", vec![KeyCode::Char('/')]));
        if !self.columns[1].is_empty() {
            base.push(Binding::new("col-left", "", vec![KeyCode::Left]).power_user());
            base.push(Binding::new("col-right", "", vec![KeyCode::Right]).power_user());
        }
        if !self.searching {
            base.push(Binding::new("quick", "", DIGIT_KEYS.to_vec()).power_user());
        }

        if self.searching {
            let overlay = KeyMap::new()
                .with(Binding::catch_all("type", "").power_user())
                .with(Binding::new("erase", "", vec![KeyCode::Backspace]).power_user())
                .with(Binding::new("stop-find", "stop searching", vec![KeyCode::Esc]));
            vec![base, overlay]
        } else {
            vec![base]
        }
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "prev",
            "next",
            "pick",
            "cancel",
            "find",
            "col-left",
            "col-right",
            "quick",
            "type",
            "erase",
            "stop-find",
        ]
    }

    fn apply(&mut self, action: &str, key: &KeyEvent) -> Flow {
        if action != "quick" {
            self.digits.clear();
        }
        match action {
            "prev" => {
                self.move_cursor(-1);
                Flow::Render
            }
            "next" => {
                self.move_cursor(1);
                Flow::Render
            }
            "col-left" => self.switch_column(0),
            "col-right" => self.switch_column(1),
            "find" => {
                self.searching = true;
                self.search.clear();
                Flow::Remap
            }
            "stop-find" => {
                self.searching = false;
                self.search.clear();
                Flow::Remap
            }
            "type" => {
                let KeyCode::Char(c) = key.code else {
                    return Flow::Silent;
                };
                if key.modifiers.ctrl || key.modifiers.meta || c.is_control() || c == '/' {
                    return Flow::Silent;
                }
                let previous = self.current_underlying();
                self.search.push(c);
                self.update_search(previous);
                Flow::Render
            }
            "erase" => {
                let previous = self.current_underlying();
                self.search.pop();
                self.update_search(previous);
                Flow::Render
            }
            "quick" => self.quick_select(key),
            "pick" => {
                let Some(idx) = self.current_underlying() else {
                    return Flow::Silent;
                };
                let value = self.columns[self.column][idx].value.clone();
                self.output = Some(Some(value));
                Flow::Done
            }
            "cancel" => {
                self.output = Some(None);
                Flow::Done
            }
            _ => Flow::Silent,
        }
    }

    fn render(&self, theme: &Theme) -> String {
        let visible = self.visible_indices();
        let window = select_range(&visible, self.cursor, self.page_size);
        let selected = visible.get(self.cursor).copied();

        let active = &self.columns[self.column];
        let width = active
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0);

        let mut lines: Vec<String> = Vec::new();
        for (row, &idx) in window.iter().enumerate() {
            let entry = &active[idx];
            let number = window_number(&visible, window, row);
            let label = pad_end(&entry.label, width);
            let line = format!("{number:>3} {label}");
            if Some(idx) == selected {
                lines.push(paint(theme.highlight, &line));
            } else {
                lines.push(line);
            }
        }

        let other = self.other_column_lines(theme);
        let mut body = crate::layout::merge_columns(lines, other);

        if self.searching {
            body.push(format!("/{}", paint(theme.accent, &self.search)));
        }
        if let Some(idx) = selected
            && let Some(help) = &active[idx].help
        {
            body.push(paint(theme.muted, help));
        }
        body.join("\n")
    }

    fn take_output(&mut self) -> Option<Option<T>> {
        self.output.take()
    }
}

impl<T: Clone + PartialEq> Menu<T> {
    fn other_column_lines(&self, theme: &Theme) -> Vec<String> {
        let other = &self.columns[1 - self.column];
        if other.is_empty() {
            return Vec::new();
        }
        let shown = &other[..other.len().min(self.page_size.max(1))];
        shown
            .iter()
            .map(|e| paint(theme.muted, &e.label))
            .collect()
    }
}

fn sort_by_priority<T>(entries: &mut [MenuEntry<T>]) {
    entries.sort_by_key(|e| std::cmp::Reverse(e.priority));
}

/// 1-based display number of a window row within the full visible list.
fn window_number(visible: &[usize], window: &[usize], row: usize) -> usize {
    let offset = visible
        .iter()
        .position(|&v| Some(&v) == window.first())
        .unwrap_or(0);
    offset + row + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(labels: &[&str]) -> Vec<MenuEntry<String>> {
        labels
            .iter()
            .map(|l| MenuEntry::new(*l, l.to_string()))
            .collect()
    }

    fn menu(labels: &[&str]) -> Menu<String> {
        let mut m = Menu::new();
        m.configure(MenuOptions {
            entries: entries(labels),
            ..MenuOptions::default()
        });
        m
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code)
    }

    #[test]
    fn navigation_wraps_at_both_ends() {
        let mut m = menu(&["a", "b", "c"]);
        m.apply("prev", &key(KeyCode::Up));
        assert_eq!(m.selected_value(), Some(&"c".to_string()));
        m.apply("next", &key(KeyCode::Down));
        assert_eq!(m.selected_value(), Some(&"a".to_string()));
    }

    #[test]
    fn pick_emits_selected_value() {
        let mut m = menu(&["a", "b", "c"]);
        m.apply("next", &key(KeyCode::Down));
        let flow = m.apply("pick", &key(KeyCode::Enter));
        assert!(matches!(flow, Flow::Done));
        assert_eq!(m.take_output(), Some(Some("b".to_string())));
    }

    #[test]
    fn cancel_emits_none() {
        let mut m = menu(&["a"]);
        m.apply("cancel", &key(KeyCode::Esc));
        assert_eq!(m.take_output(), Some(None));
    }

    #[test]
    fn priority_orders_entries_stably() {
        let mut m = Menu::new();
        m.configure(MenuOptions {
            entries: vec![
                MenuEntry::new("low", "low".to_string()),
                MenuEntry::new("high", "high".to_string()).with_priority(5),
                MenuEntry::new("also-low", "also-low".to_string()),
            ],
            ..MenuOptions::default()
        });
        assert_eq!(m.selected_value(), Some(&"high".to_string()));
        m.apply("next", &key(KeyCode::Down));
        assert_eq!(m.selected_value(), Some(&"low".to_string()));
    }

    #[test]
    fn search_snaps_selection_to_top_match() {
        let mut m = menu(&["alpha", "beta", "gamma"]);
        m.apply("find", &key(KeyCode::Char('/')));
        m.apply("type", &key(KeyCode::Char('b')));
        assert_eq!(m.selected_value(), Some(&"beta".to_string()));
    }

    #[test]
    fn search_keeps_selection_when_it_survives() {
        let mut m = menu(&["map", "lamp", "x"]);
        m.apply("next", &key(KeyCode::Down));
        assert_eq!(m.selected_value(), Some(&"lamp".to_string()));
        m.apply("find", &key(KeyCode::Char('/')));
        m.apply("type", &key(KeyCode::Char('m')));
        // both "map" and "lamp" match; the highlight stays on "lamp"
        assert_eq!(m.selected_value(), Some(&"lamp".to_string()));
    }

    #[test]
    fn no_match_falls_back_to_full_list() {
        let mut m = menu(&["alpha", "beta"]);
        m.apply("find", &key(KeyCode::Char('/')));
        m.apply("type", &key(KeyCode::Char('z')));
        m.apply("type", &key(KeyCode::Char('z')));
        assert!(m.selected_value().is_some());
    }

    #[test]
    fn quick_select_accumulates_digits() {
        let labels: Vec<String> = (1..=12).map(|i| format!("entry-{i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let mut m = menu(&refs);
        m.apply("quick", &key(KeyCode::Char('1')));
        m.apply("quick", &key(KeyCode::Char('2')));
        assert_eq!(m.selected_value(), Some(&"entry-12".to_string()));
    }

    #[test]
    fn initial_value_preselects_in_either_column() {
        let mut m = Menu::new();
        m.configure(MenuOptions {
            entries: entries(&["a", "b"]),
            secondary: entries(&["x", "y"]),
            initial: Some("y".to_string()),
            ..MenuOptions::default()
        });
        assert_eq!(m.selected_value(), Some(&"y".to_string()));
    }

    #[test]
    fn switching_to_empty_column_is_silent() {
        let mut m = menu(&["a"]);
        assert!(matches!(
            m.apply("col-right", &key(KeyCode::Right)),
            Flow::Silent
        ));
    }
}
