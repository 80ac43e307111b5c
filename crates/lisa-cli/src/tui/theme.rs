//! Terminal colors

use ratatui::style::Color;

/// Colors used when printing replies
#[derive(Debug, Clone)]
pub struct Theme {
    pub text_color: Color,
    pub title_color: Color,
    pub border_color: Color,
    pub dim_color: Color,
    pub link_color: Color,
    pub error_color: Color,
    pub user_msg_color: Color,
    pub assistant_msg_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text_color: Color::Rgb(203, 213, 225),
            title_color: Color::Rgb(139, 233, 253),
            border_color: Color::Rgb(88, 91, 112),
            dim_color: Color::Rgb(148, 163, 184),
            link_color: Color::Rgb(139, 233, 253),
            error_color: Color::Rgb(255, 85, 85),
            user_msg_color: Color::Rgb(80, 250, 123),
            assistant_msg_color: Color::Rgb(189, 147, 249),
        }
    }
}
