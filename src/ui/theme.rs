//! cliclack theme

use cliclack::ThemeState;
use console::Style;

/// Blue while working, green once a step lands
#[derive(Debug, Clone, Default)]
pub struct ModcacheTheme;

impl ModcacheTheme {
    fn color_for(state: &ThemeState, submitted: Style) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Submit => submitted,
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Error(_) => Style::new().red(),
        }
    }
}

impl cliclack::Theme for ModcacheTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        Self::color_for(state, Style::new().blue().dim())
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        Self::color_for(state, Style::new().green())
    }
}

/// Install the theme for every cliclack widget
pub fn init_theme() {
    cliclack::set_theme(ModcacheTheme);
}
