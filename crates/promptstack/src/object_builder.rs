use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use chrono::NaiveDate;
use promptstack_core::dispatch::OwnerId;
use promptstack_core::input::KeyCode;
use promptstack_core::input::KeyEvent;
use promptstack_core::keymap::Binding;
use promptstack_core::keymap::KeyMap;
use promptstack_core::text::pad_end;
use serde_json::Value;

use crate::theme::Theme;
use crate::theme::paint;
use crate::widget::Effect;
use crate::widget::EffectOutcome;
use crate::widget::Flow;
use crate::widget::HookError;
use crate::widget::MenuEntry;
use crate::widget::Widget;

const DATE_FORMAT: &str = "%Y-%m-%d";

static NULL: Value = Value::Null;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    Number,
    Date,
    PickOne,
    PickMany,
}

pub type HiddenFn = Arc<dyn Fn(&Value) -> bool>;

/// One row of the form: a dotted path into the working value, a label, and
/// the field type that decides which editor `enter` launches.
#[derive(Clone)]
pub struct FieldSpec {
    pub path: String,
    pub label: String,
    pub kind: FieldKind,
    /// Choices for pick-one / pick-many fields.
    pub choices: Vec<MenuEntry<Value>>,
    /// Hides the row (and excludes it from `visible-paths` sanitizing) while
    /// the predicate holds for the working value.
    pub hidden: Option<HiddenFn>,
}

impl FieldSpec {
    pub fn new(path: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            kind,
            choices: Vec::new(),
            hidden: None,
        }
    }

    pub fn with_choices(mut self, choices: Vec<MenuEntry<Value>>) -> Self {
        self.choices = choices;
        self
    }

    pub fn hidden_when(mut self, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        self.hidden = Some(Arc::new(predicate));
        self
    }

    fn is_hidden(&self, value: &Value) -> bool {
        self.hidden.as_ref().is_some_and(|h| h(value))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessagePosition {
    Above,
    Below,
}

/// A message shown at a controllable position until its deadline passes or
/// another message replaces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransientMessage {
    pub text: String,
    pub position: MessagePosition,
    pub clear_after: Duration,
}

impl TransientMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: MessagePosition::Below,
            clear_after: Duration::from_secs(4),
        }
    }

    pub fn with_position(mut self, position: MessagePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_timeout(mut self, clear_after: Duration) -> Self {
        self.clear_after = clear_after;
        self
    }
}

/// What a validate hook decided about the working value.
pub struct Validation {
    pub ok: bool,
    pub message: Option<TransientMessage>,
}

impl Validation {
    pub fn pass() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn reject(message: TransientMessage) -> Self {
        Self {
            ok: false,
            message: Some(message),
        }
    }
}

/// Receives the working value and the dirty paths; deciding `ok: false`
/// blocks the exit. Errors are programming errors and propagate to the
/// prompt caller.
pub type ValidateHook = Box<dyn FnMut(&Value, &[String]) -> Result<Validation, HookError>>;

/// Governs the escape-key path.
#[derive(Clone, Debug, Default)]
pub enum CancelPolicy {
    /// Cancel immediately with no result.
    #[default]
    Immediate,
    /// Cancel resolves to this value instead of nothing.
    Value(Value),
    /// Ask for confirmation first; on yes, cancel with no result.
    Confirm(String),
    /// Escape does nothing.
    Disabled,
}

/// Which keys of the working value survive into the final result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SanitizePolicy {
    /// The full working value, unmodified.
    None,
    /// Only keys named by the field specs.
    #[default]
    DefinedPaths,
    /// Only keys of fields not currently hidden.
    VisiblePaths,
}

pub struct ObjectBuilderOptions {
    pub title: String,
    /// The caller-supplied current value; the builder works on a deep clone.
    pub value: Value,
    pub fields: Vec<FieldSpec>,
    pub sanitize: SanitizePolicy,
    pub validate: Option<ValidateHook>,
    pub cancel: CancelPolicy,
}

impl Default for ObjectBuilderOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            value: Value::Object(serde_json::Map::new()),
            fields: Vec::new(),
            sanitize: SanitizePolicy::default(),
            validate: None,
            cancel: CancelPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Edit(usize),
    Reset(usize),
    Cancel,
}

/// The tabular object/form builder: a fixed ordered list of typed fields
/// rendered as a two-column table, one row highlighted at a time. `enter`
/// launches the type-appropriate editor for the highlighted field and writes
/// the result back at that field's path.
///
/// Completes with the sanitized working value, or `None` on cancel.
pub struct ObjectBuilder {
    owner: OwnerId,
    title: String,
    original: Value,
    working: Value,
    fields: Vec<FieldSpec>,
    sanitize: SanitizePolicy,
    validate: Option<ValidateHook>,
    cancel: CancelPolicy,
    /// Position within the currently visible rows.
    row: usize,
    message: Option<(TransientMessage, Instant)>,
    pending: Option<Pending>,
    output: Option<Option<Value>>,
}

impl Default for ObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("object-builder"),
            title: String::new(),
            original: Value::Null,
            working: Value::Null,
            fields: Vec::new(),
            sanitize: SanitizePolicy::default(),
            validate: None,
            cancel: CancelPolicy::default(),
            row: 0,
            message: None,
            pending: None,
            output: None,
        }
    }

    pub fn configure(&mut self, options: ObjectBuilderOptions) {
        self.title = options.title;
        self.working = options.value.clone();
        self.original = options.value;
        self.fields = options.fields;
        self.sanitize = options.sanitize;
        self.validate = options.validate;
        self.cancel = options.cancel;
        self.row = 0;
        self.message = None;
        self.pending = None;
        self.output = None;
    }

    pub fn working_value(&self) -> &Value {
        &self.working
    }

    /// Paths whose resolved value differs from the original.
    pub fn dirty_paths(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| resolve(&self.working, &f.path) != resolve(&self.original, &f.path))
            .map(|f| f.path.clone())
            .collect()
    }

    /// Posts a transient message, replacing any current one (and its
    /// deadline).
    pub fn post_message(&mut self, message: TransientMessage) {
        let deadline = Instant::now() + message.clear_after;
        self.message = Some((message, deadline));
    }

    fn visible_rows(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_hidden(&self.working))
            .map(|(i, _)| i)
            .collect()
    }

    fn highlighted_field(&self) -> Option<usize> {
        self.visible_rows().get(self.row).copied()
    }

    fn move_row(&mut self, delta: isize) {
        let len = self.visible_rows().len();
        if len == 0 {
            return;
        }
        let len = len as isize;
        self.row = (self.row as isize + delta).rem_euclid(len) as usize;
    }

    fn enable_edit(&mut self) -> Flow {
        let Some(idx) = self.highlighted_field() else {
            return Flow::Silent;
        };
        let field = &self.fields[idx];
        let current = resolve(&self.working, &field.path);
        let prompt = format!("{}:", field.label);

        let effect = match field.kind {
            FieldKind::Boolean => {
                let flipped = !current.as_bool().unwrap_or(false);
                set_path(&mut self.working, &self.fields[idx].path.clone(), Value::Bool(flipped));
                return Flow::Render;
            }
            FieldKind::String => Effect::EditString {
                prompt,
                initial: current.as_str().unwrap_or("").to_string(),
                placeholder: None,
                masked: false,
            },
            FieldKind::Number => Effect::EditNumber {
                prompt,
                initial: current.as_f64(),
            },
            FieldKind::Date => Effect::EditDate {
                prompt,
                initial: current
                    .as_str()
                    .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok()),
            },
            FieldKind::PickOne => Effect::PickOne {
                entries: field.choices.clone(),
                initial: if current.is_null() {
                    None
                } else {
                    Some(current.clone())
                },
            },
            FieldKind::PickMany => Effect::PickMany {
                entries: field.choices.clone(),
                current: current.as_array().cloned().unwrap_or_default(),
            },
        };
        self.pending = Some(Pending::Edit(idx));
        Flow::Effect(effect)
    }

    fn reset_field(&mut self) -> Flow {
        let Some(idx) = self.highlighted_field() else {
            return Flow::Silent;
        };
        let field = &self.fields[idx];
        if resolve(&self.working, &field.path) == resolve(&self.original, &field.path) {
            return Flow::Silent;
        }
        self.pending = Some(Pending::Reset(idx));
        Flow::Effect(Effect::Confirm {
            message: format!("Reset {}?", field.label),
        })
    }

    fn submit(&mut self) -> Flow {
        let dirty = self.dirty_paths();
        if let Some(hook) = self.validate.as_mut() {
            match hook(&self.working, &dirty) {
                Err(err) => return Flow::Fail(err),
                Ok(validation) if !validation.ok => {
                    if let Some(message) = validation.message {
                        self.post_message(message);
                    }
                    return Flow::Render;
                }
                Ok(_) => {}
            }
        }
        self.output = Some(Some(self.sanitized()));
        Flow::Done
    }

    fn request_cancel(&mut self) -> Flow {
        match &self.cancel {
            CancelPolicy::Disabled => Flow::Silent,
            CancelPolicy::Immediate => {
                self.output = Some(None);
                Flow::Done
            }
            CancelPolicy::Value(v) => {
                self.output = Some(Some(v.clone()));
                Flow::Done
            }
            CancelPolicy::Confirm(message) => {
                let message = message.clone();
                self.pending = Some(Pending::Cancel);
                Flow::Effect(Effect::Confirm { message })
            }
        }
    }

    fn sanitized(&self) -> Value {
        match self.sanitize {
            SanitizePolicy::None => self.working.clone(),
            SanitizePolicy::DefinedPaths => self.collect(self.fields.iter()),
            SanitizePolicy::VisiblePaths => self.collect(
                self.fields
                    .iter()
                    .filter(|f| !f.is_hidden(&self.working)),
            ),
        }
    }

    fn collect<'a>(&self, fields: impl Iterator<Item = &'a FieldSpec>) -> Value {
        let mut out = Value::Object(serde_json::Map::new());
        for field in fields {
            if let Some(v) = get_path(&self.working, &field.path) {
                set_path(&mut out, &field.path, v.clone());
            }
        }
        out
    }

    fn write_back(&mut self, idx: usize, outcome: EffectOutcome) {
        let path = self.fields[idx].path.clone();
        let new = match outcome {
            EffectOutcome::Text(s) => Some(Value::String(s)),
            EffectOutcome::Number(Some(n)) => {
                Some(serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number))
            }
            EffectOutcome::Number(None) => Some(Value::Null),
            EffectOutcome::Date(Some(d)) => {
                Some(Value::String(d.format(DATE_FORMAT).to_string()))
            }
            EffectOutcome::Date(None) => Some(Value::Null),
            EffectOutcome::One(Some(v)) => Some(v),
            // a cancelled selection leaves the field untouched
            EffectOutcome::One(None) => None,
            EffectOutcome::Many(values) => Some(Value::Array(values)),
            EffectOutcome::Confirmed(_) => None,
        };
        if let Some(new) = new {
            set_path(&mut self.working, &path, new);
        }
    }

    fn summary(&self, field: &FieldSpec) -> String {
        let v = resolve(&self.working, &field.path);
        match field.kind {
            FieldKind::String | FieldKind::Date => v.as_str().unwrap_or("").to_string(),
            FieldKind::Boolean => {
                if v.as_bool().unwrap_or(false) {
                    "yes".to_string()
                } else {
                    "no".to_string()
                }
            }
            FieldKind::Number => v.as_f64().map(|n| n.to_string()).unwrap_or_default(),
            FieldKind::PickOne => field
                .choices
                .iter()
                .find(|c| &c.value == v)
                .map(|c| c.label.clone())
                .unwrap_or_default(),
            FieldKind::PickMany => {
                let values = v.as_array().cloned().unwrap_or_default();
                let labels: Vec<String> = values
                    .iter()
                    .map(|value| {
                        field
                            .choices
                            .iter()
                            .find(|c| &c.value == value)
                            .map(|c| c.label.clone())
                            .unwrap_or_else(|| value.to_string())
                    })
                    .collect();
                labels.join(", ")
            }
        }
    }

    fn live_message(&self) -> Option<&TransientMessage> {
        match &self.message {
            Some((message, deadline)) if Instant::now() < *deadline => Some(message),
            _ => None,
        }
    }
}

impl Widget for ObjectBuilder {
    type Output = Option<Value>;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        vec![
            KeyMap::new()
                .with(Binding::new("prev", "", vec![KeyCode::Up]).power_user())
                .with(Binding::new("next", "", vec![KeyCode::Down]).power_user())
                .with(Binding::new("edit", "edit field", vec![KeyCode::Enter]))
                .with(Binding::new("reset", "reset field", vec![KeyCode::Char('r')]))
                .with(Binding::new("done", "done", vec![KeyCode::Char('d')]))
                .with(Binding::new("cancel", "cancel", vec![KeyCode::Esc])),
        ]
    }

    fn actions(&self) -> &'static [&'static str] {
        &["prev", "next", "edit", "reset", "done", "cancel"]
    }

    fn apply(&mut self, action: &str, _key: &KeyEvent) -> Flow {
        match action {
            "prev" => {
                self.move_row(-1);
                Flow::Render
            }
            "next" => {
                self.move_row(1);
                Flow::Render
            }
            "edit" => self.enable_edit(),
            "reset" => self.reset_field(),
            "done" => self.submit(),
            "cancel" => self.request_cancel(),
            _ => Flow::Silent,
        }
    }

    fn render(&self, theme: &Theme) -> String {
        let mut lines: Vec<String> = Vec::new();
        if !self.title.is_empty() {
            lines.push(paint(theme.accent, &self.title));
        }
        if let Some(message) = self.live_message()
            && message.position == MessagePosition::Above
        {
            lines.push(paint(theme.danger, &message.text));
        }

        let visible = self.visible_rows();
        let dirty = self.dirty_paths();
        let label_width = visible
            .iter()
            .map(|&i| self.fields[i].label.chars().count())
            .max()
            .unwrap_or(0);

        for (pos, &idx) in visible.iter().enumerate() {
            let field = &self.fields[idx];
            let marker = if dirty.contains(&field.path) { "*" } else { " " };
            let line = format!(
                "{marker}{} {}",
                pad_end(&field.label, label_width),
                self.summary(field)
            );
            if pos == self.row {
                lines.push(paint(theme.highlight, &line));
            } else {
                lines.push(line);
            }
        }

        if let Some(message) = self.live_message()
            && message.position == MessagePosition::Below
        {
            lines.push(paint(theme.danger, &message.text));
        }
        lines.join("\n")
    }

    fn take_output(&mut self) -> Option<Option<Value>> {
        self.output.take()
    }

    fn resume(&mut self, outcome: EffectOutcome) -> Flow {
        match self.pending.take() {
            Some(Pending::Edit(idx)) => {
                self.write_back(idx, outcome);
                Flow::Render
            }
            Some(Pending::Reset(idx)) => {
                if outcome == EffectOutcome::Confirmed(true) {
                    let path = self.fields[idx].path.clone();
                    let restored = resolve(&self.original, &path).clone();
                    set_path(&mut self.working, &path, restored);
                }
                Flow::Render
            }
            Some(Pending::Cancel) => {
                if outcome == EffectOutcome::Confirmed(true) {
                    self.output = Some(None);
                    Flow::Done
                } else {
                    Flow::Render
                }
            }
            None => Flow::Render,
        }
    }
}

fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, seg| v.get(seg))
}

fn resolve<'a>(value: &'a Value, path: &str) -> &'a Value {
    get_path(value, path).unwrap_or(&NULL)
}

fn set_path(target: &mut Value, path: &str, new: Value) {
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), new);
        }
        Some((head, rest)) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_path(child, rest, new);
        }
    }
}
