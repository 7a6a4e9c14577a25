//! Output styles using the owo-colors stylesheet pattern

use owo_colors::Style;

/// Stylesheet for terminal output. Every field is a no-op style unless the
/// sheet was built for a color terminal.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    /// Step labels printed without a spinner
    pub step: Style,
    pub dim: Style,
    pub bold: Style,
    pub header: Style,
    /// URLs and hostnames
    pub link: Style,
    /// Passwords shown once at the end of an installation
    pub secret: Style,
}

impl Styles {
    /// Build the sheet for a terminal with or without color support.
    #[must_use]
    pub fn for_terminal(colored: bool) -> Self {
        if colored { Self::colored() } else { Self::default() }
    }

    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            step: Style::new().cyan(),
            dim: Style::new().dimmed(),
            bold: Style::new().bold(),
            header: Style::new().bold().cyan(),
            link: Style::new().underline().blue(),
            secret: Style::new().bold().magenta(),
        }
    }
}
