//! Scripted end-to-end flows: keys go in through a scripted source, frames
//! come out through a capturing renderer.

use promptstack::input::KeyCode;
use promptstack::input::KeyEvent;
use promptstack::input::ScriptedKeys;
use promptstack::input::typed;
use promptstack::object_builder::CancelPolicy;
use promptstack::object_builder::FieldKind;
use promptstack::object_builder::FieldSpec;
use promptstack::object_builder::ObjectBuilder;
use promptstack::object_builder::ObjectBuilderOptions;
use promptstack::render::CaptureRenderer;
use promptstack::session::Session;
use promptstack::widget::MenuEntry;
use serde_json::json;

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code)
}

fn session(keys: Vec<KeyEvent>) -> Session<ScriptedKeys, CaptureRenderer> {
    Session::new(ScriptedKeys::new(keys), CaptureRenderer::new())
}

fn name_form(value: serde_json::Value) -> ObjectBuilder {
    let mut form = ObjectBuilder::new();
    form.configure(ObjectBuilderOptions {
        value,
        fields: vec![FieldSpec::new("name", "Name", FieldKind::String)],
        ..ObjectBuilderOptions::default()
    });
    form
}

#[test]
fn form_edit_commits_through_nested_editor() {
    // enter opens the editor, "hi" is typed, enter commits, d submits
    let mut keys = vec![key(KeyCode::Enter)];
    keys.extend(typed("hi"));
    keys.push(key(KeyCode::Enter));
    keys.push(key(KeyCode::Char('d')));

    let mut session = session(keys);
    let mut form = name_form(json!({"name": ""}));
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, Some(json!({"name": "hi"})));
}

#[test]
fn focused_editor_swallows_keys_bound_by_the_outer_form() {
    // while the editor is focused, `d` must insert a character instead of
    // triggering the form's done binding
    let mut keys = vec![key(KeyCode::Enter)];
    keys.extend(typed("d"));
    keys.push(key(KeyCode::Enter));
    keys.push(key(KeyCode::Char('d')));

    let mut session = session(keys);
    let mut form = name_form(json!({"name": ""}));
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, Some(json!({"name": "d"})));
}

#[test]
fn editor_escape_reverts_the_field() {
    let mut keys = vec![key(KeyCode::Enter)];
    keys.extend(typed("junk"));
    keys.push(key(KeyCode::Esc));
    keys.push(key(KeyCode::Char('d')));

    let mut session = session(keys);
    let mut form = name_form(json!({"name": "original"}));
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, Some(json!({"name": "original"})));
}

#[test]
fn pick_many_field_round_trips_through_the_list_builder() {
    let mut form = ObjectBuilder::new();
    form.configure(ObjectBuilderOptions {
        value: json!({"colors": []}),
        fields: vec![
            FieldSpec::new("colors", "Colors", FieldKind::PickMany).with_choices(vec![
                MenuEntry::new("Red", json!("red")),
                MenuEntry::new("Blue", json!("blue")),
            ]),
        ],
        ..ObjectBuilderOptions::default()
    });

    // enter opens the builder, enter moves "Red" across, d closes the
    // builder, d submits the form
    let keys = vec![
        key(KeyCode::Enter),
        key(KeyCode::Enter),
        key(KeyCode::Char('d')),
        key(KeyCode::Char('d')),
    ];
    let mut session = session(keys);
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, Some(json!({"colors": ["red"]})));
}

#[test]
fn pick_one_field_round_trips_through_the_menu() {
    let mut form = ObjectBuilder::new();
    form.configure(ObjectBuilderOptions {
        value: json!({"scene": "day"}),
        fields: vec![
            FieldSpec::new("scene", "Scene", FieldKind::PickOne).with_choices(vec![
                MenuEntry::new("Day", json!("day")),
                MenuEntry::new("Night", json!("night")),
            ]),
        ],
        ..ObjectBuilderOptions::default()
    });

    // enter opens the menu preselected on "day", down moves to "night",
    // enter picks it, d submits
    let keys = vec![
        key(KeyCode::Enter),
        key(KeyCode::Down),
        key(KeyCode::Enter),
        key(KeyCode::Char('d')),
    ];
    let mut session = session(keys);
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, Some(json!({"scene": "night"})));
}

#[test]
fn confirmed_cancel_exits_with_no_result() {
    let mut form = ObjectBuilder::new();
    form.configure(ObjectBuilderOptions {
        value: json!({"name": "x"}),
        fields: vec![FieldSpec::new("name", "Name", FieldKind::String)],
        cancel: CancelPolicy::Confirm("Discard changes?".to_string()),
        ..ObjectBuilderOptions::default()
    });

    let keys = vec![key(KeyCode::Esc), key(KeyCode::Char('y'))];
    let mut session = session(keys);
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, None);
}

#[test]
fn declined_cancel_returns_to_the_form() {
    let mut form = ObjectBuilder::new();
    form.configure(ObjectBuilderOptions {
        value: json!({"name": "x"}),
        fields: vec![FieldSpec::new("name", "Name", FieldKind::String)],
        cancel: CancelPolicy::Confirm("Discard changes?".to_string()),
        ..ObjectBuilderOptions::default()
    });

    let keys = vec![
        key(KeyCode::Esc),
        key(KeyCode::Char('n')),
        key(KeyCode::Char('d')),
    ];
    let mut session = session(keys);
    let result = session.prompt(&mut form).unwrap();
    assert_eq!(result, Some(json!({"name": "x"})));
}

#[test]
fn frames_render_the_confirm_prompt_while_focused() {
    let mut form = ObjectBuilder::new();
    form.configure(ObjectBuilderOptions {
        value: json!({"name": "x"}),
        fields: vec![FieldSpec::new("name", "Name", FieldKind::String)],
        cancel: CancelPolicy::Confirm("Discard changes?".to_string()),
        ..ObjectBuilderOptions::default()
    });

    let keys = vec![key(KeyCode::Esc), key(KeyCode::Char('y'))];
    let mut session = session(keys);
    session.prompt(&mut form).unwrap();
    let bodies: Vec<String> = session
        .renderer()
        .frames()
        .iter()
        .map(|f| promptstack::text::strip_ansi(&f.body).to_string())
        .collect();
    assert!(bodies.iter().any(|b| b.contains("Discard changes?")));
}
