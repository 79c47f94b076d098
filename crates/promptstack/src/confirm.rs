use promptstack_core::dispatch::OwnerId;
use promptstack_core::input::KeyCode;
use promptstack_core::input::KeyEvent;
use promptstack_core::keymap::Binding;
use promptstack_core::keymap::KeyMap;

use crate::theme::Theme;
use crate::theme::paint;
use crate::widget::Flow;
use crate::widget::Widget;

#[derive(Clone, Debug, Default)]
pub struct ConfirmOptions {
    pub message: String,
    /// What plain `enter` answers.
    pub default_yes: bool,
}

/// A minimal yes/no prompt. Escape answers no.
pub struct Confirm {
    owner: OwnerId,
    options: ConfirmOptions,
    output: Option<bool>,
}

impl Default for Confirm {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm {
    pub fn new() -> Self {
        Self {
            owner: OwnerId::new("confirm"),
            options: ConfirmOptions::default(),
            output: None,
        }
    }

    pub fn configure(&mut self, options: ConfirmOptions) {
        self.options = options;
        self.output = None;
    }
}

impl Widget for Confirm {
    type Output = bool;

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn keymaps(&self) -> Vec<KeyMap> {
        vec![
            KeyMap::new()
                .with(Binding::new("yes", "yes", vec![KeyCode::Char('y')]))
                .with(Binding::new("no", "no", vec![KeyCode::Char('n')]))
                .with(Binding::new("accept", "", vec![KeyCode::Enter]).power_user())
                .with(Binding::new("no", "", vec![KeyCode::Esc]).power_user()),
        ]
    }

    fn actions(&self) -> &'static [&'static str] {
        &["yes", "no", "accept"]
    }

    fn apply(&mut self, action: &str, _key: &KeyEvent) -> Flow {
        let answer = match action {
            "yes" => true,
            "no" => false,
            "accept" => self.options.default_yes,
            _ => return Flow::Silent,
        };
        self.output = Some(answer);
        Flow::Done
    }

    fn render(&self, theme: &Theme) -> String {
        let hint = if self.options.default_yes {
            "[Y/n]"
        } else {
            "[y/N]"
        };
        format!("{} {}", self.options.message, paint(theme.muted, hint))
    }

    fn take_output(&mut self) -> Option<bool> {
        self.output.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_and_no_complete_immediately() {
        let mut c = Confirm::new();
        c.configure(ConfirmOptions {
            message: "Proceed?".to_string(),
            default_yes: false,
        });
        assert!(matches!(
            c.apply("yes", &KeyEvent::new(KeyCode::Char('y'))),
            Flow::Done
        ));
        assert_eq!(c.take_output(), Some(true));
    }

    #[test]
    fn enter_answers_the_default() {
        let mut c = Confirm::new();
        c.configure(ConfirmOptions {
            message: "Proceed?".to_string(),
            default_yes: true,
        });
        c.apply("accept", &KeyEvent::new(KeyCode::Enter));
        assert_eq!(c.take_output(), Some(true));
    }
}
