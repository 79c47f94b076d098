use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::input::KeyModifiers;
use crate::input::KeySource;

pub fn key_event_from_crossterm(key: crossterm::event::KeyEvent) -> Option<KeyEvent> {
    let code = match key.code {
        crossterm::event::KeyCode::Char(c) => KeyCode::Char(c),
        crossterm::event::KeyCode::Enter => KeyCode::Enter,
        crossterm::event::KeyCode::Backspace => KeyCode::Backspace,
        crossterm::event::KeyCode::Delete => KeyCode::Delete,
        crossterm::event::KeyCode::Tab => KeyCode::Tab,
        crossterm::event::KeyCode::Esc => KeyCode::Esc,
        crossterm::event::KeyCode::Left => KeyCode::Left,
        crossterm::event::KeyCode::Right => KeyCode::Right,
        crossterm::event::KeyCode::Up => KeyCode::Up,
        crossterm::event::KeyCode::Down => KeyCode::Down,
        crossterm::event::KeyCode::Home => KeyCode::Home,
        crossterm::event::KeyCode::End => KeyCode::End,
        crossterm::event::KeyCode::PageUp => KeyCode::PageUp,
        crossterm::event::KeyCode::PageDown => KeyCode::PageDown,
        _ => return None,
    };

    Some(KeyEvent {
        code,
        modifiers: modifiers_from_crossterm(key.modifiers),
    })
}

fn modifiers_from_crossterm(m: crossterm::event::KeyModifiers) -> KeyModifiers {
    KeyModifiers {
        ctrl: m.contains(crossterm::event::KeyModifiers::CONTROL),
        shift: m.contains(crossterm::event::KeyModifiers::SHIFT),
        meta: m.contains(crossterm::event::KeyModifiers::ALT),
    }
}

/// Blocking [`KeySource`] over crossterm's event stream. Non-key events are
/// skipped; key releases and repeats are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrosstermKeys;

impl CrosstermKeys {
    pub fn new() -> Self {
        Self
    }
}

impl KeySource for CrosstermKeys {
    fn next_key(&mut self) -> std::io::Result<KeyEvent> {
        loop {
            if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                if key.kind != crossterm::event::KeyEventKind::Press {
                    continue;
                }
                if let Some(event) = key_event_from_crossterm(key) {
                    return Ok(event);
                }
            }
        }
    }
}
