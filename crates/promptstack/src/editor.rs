use chrono::NaiveDate;
use promptstack_core::dispatch::OwnerId;
use promptstack_core::input::KeyCode;
use promptstack_core::input::KeyEvent;
use promptstack_core::keymap::Binding;
use promptstack_core::keymap::KeyMap;

use crate::theme::Theme;
use crate::theme::paint;
use crate::widget::Flow;
use crate::widget::Widget;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The edit model every scalar editor shares: a single-line text buffer and a
/// character-offset cursor.
#[derive(Clone, Debug, Default)]
struct EditState {
    buffer: String,
    cursor: usize,
}

impl EditState {
    fn reset(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.cursor = self.buffer.chars().count();
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        if char_idx == 0 {
            return 0;
        }
        match self.buffer.char_indices().nth(char_idx) {
            Some((i, _)) => i,
            None => self.buffer.len(),
        }
    }

    fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = self.byte_index(self.cursor - 1);
        let end = self.byte_index(self.cursor);
        self.buffer.replace_range(start..end, "");
        self.cursor -= 1;
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let start = self.byte_index(self.cursor);
        let end = self.byte_index(self.cursor + 1);
        self.buffer.replace_range(start..end, "");
        true
    }

    /// Handles the cursor/edit actions common to all editors.
    fn apply_common(&mut self, action: &str) -> Option<Flow> {
        match action {
            "left" => {
                self.cursor = self.cursor.saturating_sub(1);
                Some(Flow::Render)
            }
            "right" => {
                self.cursor = (self.cursor + 1).min(self.char_len());
                Some(Flow::Render)
            }
            "home" => {
                self.cursor = 0;
                Some(Flow::Render)
            }
            "end" => {
                self.cursor = self.char_len();
                Some(Flow::Render)
            }
            "backspace" => {
                self.backspace();
                Some(Flow::Render)
            }
            "delete" => {
                self.delete();
                Some(Flow::Render)
            }
            _ => None,
        }
    }

    /// Renders the buffer with a block cursor, substituting `shown` for the
    /// raw buffer so masked editors reuse the same path.
    fn render_line(&self, shown: &str, theme: &Theme) -> String {
        let chars: Vec<char> = shown.chars().collect();
        let before: String = chars.iter().take(self.cursor).collect();
        let at: String = chars
            .get(self.cursor)
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string());
        let after: String = chars.iter().skip(self.cursor + 1).collect();
        format!("{before}{}{after}", paint(theme.highlight, &at))
    }
}

fn common_edit_map() -> KeyMap {
    KeyMap::new()
        .with(Binding::catch_all("insert", "").power_user())
        .with(Binding::new("left", "", vec![KeyCode::Left]).power_user())
        .with(Binding::new("right", "", vec![KeyCode::Right]).power_user())
        .with(Binding::new("home", "", vec![KeyCode::Home]).power_user())
        .with(Binding::new("end", "", vec![KeyCode::End]).power_user())
        .with(Binding::new("backspace", "", vec![KeyCode::Backspace]).power_user())
        .with(Binding::new("delete", "", vec![KeyCode::Delete]).power_user())
        .with(Binding::new("commit", "accept", vec![KeyCode::Enter]))
        .with(Binding::new("cancel", "cancel", vec![KeyCode::Esc]))
}

fn insertable(key: &KeyEvent) -> Option<char> {
    if key.modifiers.ctrl || key.modifiers.meta {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if !c.is_control() => Some(c),
        _ => None,
    }
}

fn render_prompt_line(prompt: &str, line: &str, theme: &Theme) -> String {
    if prompt.is_empty() {
        line.to_string()
    } else {
        format!("{} {line}", paint(theme.accent, prompt))
    }
}

// ─── String / password ────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct StringEditorOptions {
    pub prompt: String,
    pub initial: String,
    pub placeholder: Option<String>,
    pub masked: bool,
}

impl StringEditorOptions {
    /// A masked editor sharing the ordinary string edit model.
    pub fn password(prompt: impl Into<String>, initial: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            initial: initial.into(),
            placeholder: None,
            masked: true,
        }
    }
}

pub struct StringEditor {
    owner: OwnerId,
    options: StringEditorOptions,
    original: String,
    state: EditState,
    output: Option<String>,
}

impl Default for StringEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl StringEditor {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("string-editor"),
            options: StringEditorOptions::default(),
            original: String::new(),
            state: EditState::default(),
            output: None,
        }
    }

    pub fn configure(&mut self, options: StringEditorOptions) {
        self.original = options.initial.clone();
        self.state.reset(&options.initial);
        self.options = options;
        self.output = None;
    }

    pub fn text(&self) -> &str {
        &self.state.buffer
    }
}

impl Widget for StringEditor {
    type Output = String;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        vec![common_edit_map()]
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "insert",
            "left",
            "right",
            "home",
            "end",
            "backspace",
            "delete",
            "commit",
            "cancel",
        ]
    }

    fn apply(&mut self, action: &str, key: &KeyEvent) -> Flow {
        if let Some(flow) = self.state.apply_common(action) {
            return flow;
        }
        match action {
            "insert" => match insertable(key) {
                Some(c) => {
                    self.state.insert(c);
                    Flow::Render
                }
                None => Flow::Silent,
            },
            "commit" => {
                self.output = Some(self.state.buffer.clone());
                Flow::Done
            }
            "cancel" => {
                self.output = Some(self.original.clone());
                Flow::Done
            }
            _ => Flow::Silent,
        }
    }

    fn render(&self, theme: &Theme) -> String {
        let line = if self.state.buffer.is_empty() {
            match &self.options.placeholder {
                Some(placeholder) => format!(
                    "{}{}",
                    paint(theme.highlight, " "),
                    paint(theme.muted, placeholder)
                ),
                None => self.state.render_line("", theme),
            }
        } else if self.options.masked {
            let masked = "•".repeat(self.state.char_len());
            self.state.render_line(&masked, theme)
        } else {
            self.state.render_line(&self.state.buffer, theme)
        };
        render_prompt_line(&self.options.prompt, &line, theme)
    }

    fn take_output(&mut self) -> Option<String> {
        self.output.take()
    }
}

// ─── Number ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct NumberEditorOptions {
    pub prompt: String,
    pub initial: Option<f64>,
}

pub struct NumberEditor {
    owner: OwnerId,
    options: NumberEditorOptions,
    state: EditState,
    output: Option<Option<f64>>,
}

impl Default for NumberEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberEditor {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("number-editor"),
            options: NumberEditorOptions::default(),
            state: EditState::default(),
            output: None,
        }
    }

    pub fn configure(&mut self, options: NumberEditorOptions) {
        let text = options.initial.map(|v| v.to_string()).unwrap_or_default();
        self.state.reset(&text);
        self.options = options;
        self.output = None;
    }

    fn parsed(&self) -> Option<f64> {
        self.state.buffer.trim().parse().ok()
    }

    fn step(&mut self, delta: f64) -> Flow {
        let value = if self.state.buffer.trim().is_empty() {
            0.0
        } else {
            match self.parsed() {
                Some(v) => v,
                None => return Flow::Silent,
            }
        };
        self.state.reset(&(value + delta).to_string());
        Flow::Render
    }
}

impl Widget for NumberEditor {
    type Output = Option<f64>;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        let steps = KeyMap::new()
            .with(Binding::new("increment", "", vec![KeyCode::Up]).power_user())
            .with(Binding::new("decrement", "", vec![KeyCode::Down]).power_user());
        vec![common_edit_map(), steps]
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "insert",
            "left",
            "right",
            "home",
            "end",
            "backspace",
            "delete",
            "commit",
            "cancel",
            "increment",
            "decrement",
        ]
    }

    fn apply(&mut self, action: &str, key: &KeyEvent) -> Flow {
        if let Some(flow) = self.state.apply_common(action) {
            return flow;
        }
        match action {
            "insert" => match insertable(key) {
                Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e') => {
                    self.state.insert(c);
                    Flow::Render
                }
                _ => Flow::Silent,
            },
            "increment" => self.step(1.0),
            "decrement" => self.step(-1.0),
            "commit" => {
                if self.state.buffer.trim().is_empty() {
                    self.output = Some(None);
                    return Flow::Done;
                }
                match self.parsed() {
                    Some(v) => {
                        self.output = Some(Some(v));
                        Flow::Done
                    }
                    // unparsable buffer: stay open
                    None => Flow::Render,
                }
            }
            "cancel" => {
                self.output = Some(self.options.initial);
                Flow::Done
            }
            _ => Flow::Silent,
        }
    }

    fn render(&self, theme: &Theme) -> String {
        let line = self.state.render_line(&self.state.buffer, theme);
        render_prompt_line(&self.options.prompt, &line, theme)
    }

    fn take_output(&mut self) -> Option<Option<f64>> {
        self.output.take()
    }
}

// ─── Date ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct DateEditorOptions {
    pub prompt: String,
    pub initial: Option<NaiveDate>,
}

pub struct DateEditor {
    owner: OwnerId,
    options: DateEditorOptions,
    state: EditState,
    output: Option<Option<NaiveDate>>,
}

impl Default for DateEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl DateEditor {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("date-editor"),
            options: DateEditorOptions::default(),
            state: EditState::default(),
            output: None,
        }
    }

    pub fn configure(&mut self, options: DateEditorOptions) {
        let text = options
            .initial
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        self.state.reset(&text);
        self.options = options;
        self.output = None;
    }

    fn parsed(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.state.buffer.trim(), DATE_FORMAT).ok()
    }

    fn step(&mut self, forward: bool) -> Flow {
        let Some(date) = self.parsed().or(self.options.initial) else {
            return Flow::Silent;
        };
        let stepped = if forward {
            date.succ_opt()
        } else {
            date.pred_opt()
        };
        let Some(next) = stepped else {
            return Flow::Silent;
        };
        self.state.reset(&next.format(DATE_FORMAT).to_string());
        Flow::Render
    }
}

impl Widget for DateEditor {
    type Output = Option<NaiveDate>;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        let steps = KeyMap::new()
            .with(Binding::new("next-day", "", vec![KeyCode::Up]).power_user())
            .with(Binding::new("prev-day", "", vec![KeyCode::Down]).power_user());
        vec![common_edit_map(), steps]
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "insert",
            "left",
            "right",
            "home",
            "end",
            "backspace",
            "delete",
            "commit",
            "cancel",
            "next-day",
            "prev-day",
        ]
    }

    fn apply(&mut self, action: &str, key: &KeyEvent) -> Flow {
        if let Some(flow) = self.state.apply_common(action) {
            return flow;
        }
        match action {
            "insert" => match insertable(key) {
                Some(c) if c.is_ascii_digit() || c == '-' => {
                    self.state.insert(c);
                    Flow::Render
                }
                _ => Flow::Silent,
            },
            "next-day" => self.step(true),
            "prev-day" => self.step(false),
            "commit" => {
                if self.state.buffer.trim().is_empty() {
                    self.output = Some(None);
                    return Flow::Done;
                }
                match self.parsed() {
                    Some(d) => {
                        self.output = Some(Some(d));
                        Flow::Done
                    }
                    None => Flow::Render,
                }
            }
            "cancel" => {
                self.output = Some(self.options.initial);
                Flow::Done
            }
            _ => Flow::Silent,
        }
    }

    fn render(&self, theme: &Theme) -> String {
        let hint = if self.state.buffer.is_empty() {
            paint(theme.muted, DATE_FORMAT)
        } else {
            String::new()
        };
        let line = self.state.render_line(&self.state.buffer, theme);
        render_prompt_line(&self.options.prompt, &format!("{line}{hint}"), theme)
    }

    fn take_output(&mut self) -> Option<Option<NaiveDate>> {
        self.output.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptstack_core::input::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code)
    }

    fn type_str(editor: &mut StringEditor, text: &str) {
        for c in text.chars() {
            editor.apply("insert", &key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn inserts_at_cursor_and_moves() {
        let mut ed = StringEditor::new();
        ed.configure(StringEditorOptions::default());
        type_str(&mut ed, "ac");
        ed.apply("left", &key(KeyCode::Left));
        ed.apply("insert", &key(KeyCode::Char('b')));
        assert_eq!(ed.text(), "abc");
    }

    #[test]
    fn home_end_backspace_delete() {
        let mut ed = StringEditor::new();
        ed.configure(StringEditorOptions {
            initial: "abcd".to_string(),
            ..StringEditorOptions::default()
        });
        ed.apply("home", &key(KeyCode::Home));
        ed.apply("delete", &key(KeyCode::Delete));
        assert_eq!(ed.text(), "bcd");
        ed.apply("end", &key(KeyCode::End));
        ed.apply("backspace", &key(KeyCode::Backspace));
        assert_eq!(ed.text(), "bc");
    }

    #[test]
    fn escape_reverts_to_original() {
        let mut ed = StringEditor::new();
        ed.configure(StringEditorOptions {
            initial: "keep".to_string(),
            ..StringEditorOptions::default()
        });
        type_str(&mut ed, "-changed");
        let flow = ed.apply("cancel", &key(KeyCode::Esc));
        assert!(matches!(flow, Flow::Done));
        assert_eq!(ed.take_output(), Some("keep".to_string()));
    }

    #[test]
    fn control_chords_do_not_insert_and_suppress_render() {
        let mut ed = StringEditor::new();
        ed.configure(StringEditorOptions::default());
        let chord = key(KeyCode::Char('c')).with_modifiers(KeyModifiers::ctrl());
        let flow = ed.apply("insert", &chord);
        assert!(matches!(flow, Flow::Silent));
        assert_eq!(ed.text(), "");
    }

    #[test]
    fn masked_render_hides_text() {
        let mut ed = StringEditor::new();
        ed.configure(StringEditorOptions::password("pass:", "secret"));
        let body = ed.render(&Theme::default());
        assert!(!promptstack_core::text::strip_ansi(&body).contains("secret"));
        assert!(body.contains('•'));
    }

    #[test]
    fn placeholder_only_when_empty() {
        let mut ed = StringEditor::new();
        ed.configure(StringEditorOptions {
            placeholder: Some("name".to_string()),
            ..StringEditorOptions::default()
        });
        assert!(ed.render(&Theme::default()).contains("name"));
        type_str(&mut ed, "x");
        assert!(!ed.render(&Theme::default()).contains("name"));
    }

    #[test]
    fn number_steps_by_one() {
        let mut ed = NumberEditor::new();
        ed.configure(NumberEditorOptions {
            initial: Some(41.0),
            ..NumberEditorOptions::default()
        });
        ed.apply("increment", &key(KeyCode::Up));
        ed.apply("commit", &key(KeyCode::Enter));
        assert_eq!(ed.take_output(), Some(Some(42.0)));
    }

    #[test]
    fn number_rejects_letters_and_keeps_invalid_buffer_open() {
        let mut ed = NumberEditor::new();
        ed.configure(NumberEditorOptions::default());
        assert!(matches!(
            ed.apply("insert", &key(KeyCode::Char('x'))),
            Flow::Silent
        ));
        ed.apply("insert", &key(KeyCode::Char('1')));
        ed.apply("insert", &key(KeyCode::Char('.')));
        ed.apply("insert", &key(KeyCode::Char('.')));
        let flow = ed.apply("commit", &key(KeyCode::Enter));
        assert!(matches!(flow, Flow::Render));
        assert!(ed.take_output().is_none());
    }

    #[test]
    fn empty_number_commits_none() {
        let mut ed = NumberEditor::new();
        ed.configure(NumberEditorOptions::default());
        ed.apply("commit", &key(KeyCode::Enter));
        assert_eq!(ed.take_output(), Some(None));
    }

    #[test]
    fn date_steps_across_month_boundary() {
        let mut ed = DateEditor::new();
        ed.configure(DateEditorOptions {
            initial: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..DateEditorOptions::default()
        });
        ed.apply("next-day", &key(KeyCode::Up));
        ed.apply("commit", &key(KeyCode::Enter));
        assert_eq!(ed.take_output(), Some(NaiveDate::from_ymd_opt(2024, 2, 1)));
    }

    #[test]
    fn date_commit_reparses_buffer() {
        let mut ed = DateEditor::new();
        ed.configure(DateEditorOptions::default());
        for c in "2023-06-15".chars() {
            ed.apply("insert", &key(KeyCode::Char(c)));
        }
        ed.apply("commit", &key(KeyCode::Enter));
        assert_eq!(ed.take_output(), Some(NaiveDate::from_ymd_opt(2023, 6, 15)));
    }
}
