use promptstack_core::dispatch::OwnerId;
use promptstack_core::fuzzy;
use promptstack_core::fuzzy::Candidate;
use promptstack_core::input::KeyCode;
use promptstack_core::input::KeyEvent;
use promptstack_core::keymap::Binding;
use promptstack_core::keymap::KeyMap;
use promptstack_core::paging::select_range;
use promptstack_core::text::pad_end;

use crate::layout::merge_columns;
use crate::menu::DEFAULT_PAGE_SIZE;
use crate::theme::Theme;
use crate::theme::paint;
use crate::widget::DIGIT_KEYS;
use crate::widget::EntryEq;
use crate::widget::Flow;
use crate::widget::MenuEntry;
use crate::widget::Widget;
use crate::widget::entry_eq;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Current,
    Source,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Self::Current => Self::Source,
            Self::Source => Self::Current,
        }
    }
}

pub struct ListBuilderOptions<T> {
    /// Entries already picked.
    pub current: Vec<MenuEntry<T>>,
    /// Entries available to pick.
    pub source: Vec<MenuEntry<T>>,
    pub page_size: usize,
    pub eq: Option<EntryEq<T>>,
}

impl<T> Default for ListBuilderOptions<T> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            source: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            eq: None,
        }
    }
}

/// The dual-pane pick-many builder: two panes over one entry universe, one of
/// which holds keyboard focus. UI operations only ever move entries between
/// the panes; none are created or destroyed, so `current ∪ source` is always
/// the universe supplied at configure time and the panes never overlap.
///
/// Completes with the `current` pane's values in pane order.
pub struct ListBuilder<T> {
    owner: OwnerId,
    current: Vec<MenuEntry<T>>,
    source: Vec<MenuEntry<T>>,
    side: Side,
    finding: bool,
    search: String,
    /// Position within the active pane's visible (possibly filtered) list.
    cursor: usize,
    digits: String,
    page_size: usize,
    eq: Option<EntryEq<T>>,
    output: Option<Vec<T>>,
}

impl<T: Clone + PartialEq> Default for ListBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq> ListBuilder<T> {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("list-builder"),
            current: Vec::new(),
            source: Vec::new(),
            side: Side::Source,
            finding: false,
            search: String::new(),
            cursor: 0,
            digits: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            eq: None,
            output: None,
        }
    }

    pub fn configure(&mut self, options: ListBuilderOptions<T>) {
        self.current = options.current;
        self.source = options.source;
        self.side = if self.source.is_empty() && !self.current.is_empty() {
            Side::Current
        } else {
            Side::Source
        };
        self.finding = false;
        self.search.clear();
        self.cursor = 0;
        self.digits.clear();
        self.page_size = options.page_size;
        self.eq = options.eq;
        self.output = None;
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn current_values(&self) -> Vec<T> {
        self.current.iter().map(|e| e.value.clone()).collect()
    }

    pub fn source_values(&self) -> Vec<T> {
        self.source.iter().map(|e| e.value.clone()).collect()
    }

    fn pane(&self, side: Side) -> &Vec<MenuEntry<T>> {
        match side {
            Side::Current => &self.current,
            Side::Source => &self.source,
        }
    }

    fn active_pane(&self) -> &Vec<MenuEntry<T>> {
        self.pane(self.side)
    }

    /// Indices into the active pane, in display order. While finding with a
    /// non-empty query the pane is fuzzy-ranked; when nothing matches the full
    /// pane is kept so navigation remains possible.
    fn visible_indices(&self) -> Vec<usize> {
        let pane = self.active_pane();
        if self.finding && !self.search.is_empty() {
            let candidates: Vec<Candidate<'_>> = pane.iter().map(|e| e.candidate()).collect();
            let ranked = fuzzy::rank(&self.search, &candidates);
            if !ranked.is_empty() {
                return ranked;
            }
        }
        (0..pane.len()).collect()
    }

    fn underlying(&self) -> Option<usize> {
        self.visible_indices().get(self.cursor).copied()
    }

    pub fn highlighted_value(&self) -> Option<T> {
        self.underlying()
            .map(|idx| self.active_pane()[idx].value.clone())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_indices().len();
        if len == 0 {
            return;
        }
        let len = len as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    /// Moves the highlighted entry to the other pane. The new highlight is
    /// the next entry at the same index if one exists below, else the
    /// previous entry, else focus moves to the other pane.
    fn toggle(&mut self) -> Flow {
        let Some(idx) = self.underlying() else {
            return Flow::Silent;
        };
        let entry = match self.side {
            Side::Current => self.current.remove(idx),
            Side::Source => self.source.remove(idx),
        };
        match self.side {
            Side::Current => self.source.push(entry),
            Side::Source => self.current.push(entry),
        }

        let pane_len = self.active_pane().len();
        if pane_len == 0 {
            self.side = self.side.other();
            self.cursor = 0;
        } else {
            let target = idx.min(pane_len - 1);
            let visible = self.visible_indices();
            self.cursor = visible.iter().position(|&i| i == target).unwrap_or(0);
        }
        Flow::Render
    }

    /// Swaps the pane contents wholesale; focus follows the highlighted
    /// entry to its new pane.
    fn invert(&mut self) -> Flow {
        std::mem::swap(&mut self.current, &mut self.source);
        self.side = self.side.other();
        self.ensure_valid_selection();
        Flow::Render
    }

    fn select_all(&mut self) -> Flow {
        let keep = self.highlighted_value();
        let drained: Vec<MenuEntry<T>> = self.source.drain(..).collect();
        self.current.extend(drained);
        self.side = Side::Current;
        self.restore_selection(keep);
        Flow::Render
    }

    fn select_none(&mut self) -> Flow {
        let keep = self.highlighted_value();
        let drained: Vec<MenuEntry<T>> = self.current.drain(..).collect();
        self.source.extend(drained);
        self.side = Side::Source;
        self.restore_selection(keep);
        Flow::Render
    }

    fn restore_selection(&mut self, value: Option<T>) {
        self.cursor = value
            .and_then(|v| {
                self.active_pane()
                    .iter()
                    .position(|e| entry_eq(&self.eq, &e.value, &v))
            })
            .unwrap_or(0);
    }

    fn ensure_valid_selection(&mut self) {
        if self.active_pane().is_empty() {
            if !self.pane(self.side.other()).is_empty() {
                self.side = self.side.other();
            }
            self.cursor = 0;
        } else {
            self.cursor = self.cursor.min(self.active_pane().len() - 1);
        }
    }

    fn switch_side(&mut self) -> Flow {
        if self.pane(self.side.other()).is_empty() {
            return Flow::Silent;
        }
        self.side = self.side.other();
        self.cursor = self.cursor.min(self.active_pane().len().saturating_sub(1));
        Flow::Render
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

    fn pane_lines(&self, side: Side, theme: &Theme) -> Vec<String> {
        let pane = self.pane(side);
        let width = pane
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0);

        let header = match side {
            Side::Current => format!("selected ({})", pane.len()),
            Side::Source => format!("available ({})", pane.len()),
        };
        let header = if side == self.side {
            paint(theme.accent, &header)
        } else {
            paint(theme.muted, &header)
        };

        let mut lines = vec![header];
        if side == self.side {
            let visible = self.visible_indices();
            let window = select_range(&visible, self.cursor, self.page_size);
            let selected = visible.get(self.cursor).copied();
            let offset = visible
                .iter()
                .position(|v| Some(v) == window.first())
                .unwrap_or(0);
            for (row, &idx) in window.iter().enumerate() {
                let label = pad_end(&pane[idx].label, width);
                let line = format!("{:>3} {label}", offset + row + 1);
                if Some(idx) == selected {
                    lines.push(paint(theme.highlight, &line));
                } else {
                    lines.push(line);
                }
            }
        } else {
            for entry in pane.iter().take(self.page_size.max(1)) {
                lines.push(format!("    {}", pad_end(&entry.label, width)));
            }
        }
        lines
    }
}

impl<T: Clone + PartialEq> Widget for ListBuilder<T> {
    type Output = Vec<T>;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        let mut base = KeyMap::new()
            .with(Binding::new("prev", "", vec![KeyCode::Up]).power_user())
            .with(Binding::new("next", "", vec![KeyCode::Down]).power_user())
            .with(Binding::new("switch", "", vec![KeyCode::Left, KeyCode::Right, KeyCode::Tab]).power_user());

        if self.finding {
            base.push(Binding::new("toggle", "move", vec![KeyCode::Enter]));
            let overlay = KeyMap::new()
                .with(Binding::catch_all("type", "").power_user())
                .with(Binding::new("erase", "", vec![KeyCode::Backspace]).power_user())
                .with(Binding::new("stop-find", "stop searching", vec![KeyCode::Esc]));
            vec![base, overlay]
        } else {
            base.push(Binding::new(
                "toggle",
                "move",
                vec![KeyCode::Enter, KeyCode::Char(' ')],
            ));
            base.push(Binding::new("invert", "invert", vec![KeyCode::Char('i')]));
            base.push(Binding::new(
                "select-all",
                "select all",
                vec![KeyCode::Char('a')],
            ));
            base.push(Binding::new(
                "select-none",
                "select none",
                vec![KeyCode::Char('n')],
            ));
            base.push(Binding::new("find", "search", vec![KeyCode::Char('/')]));
            base.push(Binding::new(
                "done",
                "done",
                vec![KeyCode::Char('d'), KeyCode::Esc],
            ));
            base.push(Binding::new("quick", "", DIGIT_KEYS.to_vec()).power_user());
            vec![base]
        }
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "prev",
            "next",
            "switch",
            "toggle",
            "invert",
            "select-all",
            "select-none",
            "find",
            "done",
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
            "switch" => self.switch_side(),
            "toggle" => self.toggle(),
            "invert" => self.invert(),
            "select-all" => self.select_all(),
            "select-none" => self.select_none(),
            "find" => {
                self.finding = true;
                self.search.clear();
                Flow::Remap
            }
            "stop-find" => {
                self.finding = false;
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
                let previous = self.underlying();
                self.search.push(c);
                self.snap_after_search(previous);
                Flow::Render
            }
            "erase" => {
                let previous = self.underlying();
                self.search.pop();
                self.snap_after_search(previous);
                Flow::Render
            }
            "quick" => self.quick_select(key),
            "done" => {
                self.output = Some(self.current_values());
                Flow::Done
            }
            _ => Flow::Silent,
        }
    }

    fn render(&self, theme: &Theme) -> String {
        let left = self.pane_lines(Side::Current, theme);
        let right = self.pane_lines(Side::Source, theme);
        let mut body = merge_columns(left, right);
        if self.finding {
            body.push(format!("/{}", paint(theme.accent, &self.search)));
        }
        body.join("\n")
    }

    fn take_output(&mut self) -> Option<Vec<T>> {
        self.output.take()
    }
}

impl<T: Clone + PartialEq> ListBuilder<T> {
    /// After a search edit, keep the highlight on the same entry when it
    /// survives the filter, otherwise snap to the top match.
    fn snap_after_search(&mut self, previous: Option<usize>) {
        let visible = self.visible_indices();
        self.cursor = previous
            .and_then(|prev| visible.iter().position(|&i| i == prev))
            .unwrap_or(0);
    }
}
