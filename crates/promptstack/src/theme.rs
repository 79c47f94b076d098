use crossterm::style::Attribute;
use crossterm::style::Color;
use crossterm::style::ContentStyle;

#[derive(Clone, Debug)]
pub struct Theme {
    pub text: ContentStyle,
    pub muted: ContentStyle,
    pub accent: ContentStyle,
    pub danger: ContentStyle,
    pub highlight: ContentStyle,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: ContentStyle::new(),
            muted: ContentStyle {
                foreground_color: Some(Color::DarkGrey),
                ..ContentStyle::new()
            },
            accent: ContentStyle {
                foreground_color: Some(Color::Cyan),
                ..ContentStyle::new()
            },
            danger: ContentStyle {
                foreground_color: Some(Color::Red),
                ..ContentStyle::new()
            },
            highlight: ContentStyle {
                attributes: Attribute::Reverse.into(),
                ..ContentStyle::new()
            },
        }
    }
}

/// Applies `style` to `text`, yielding a string with embedded ANSI styling.
pub fn paint(style: ContentStyle, text: &str) -> String {
    style.apply(text).to_string()
}
