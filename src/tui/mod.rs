mod app;
mod theme;
mod widgets;

pub use app::run_wizard;
pub use theme::Theme;
pub use widgets::{prompt_lines, PromptCursor, TextInput};
