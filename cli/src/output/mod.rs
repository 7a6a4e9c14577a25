//! Terminal presentation: styles, spinners, renderers for results and the
//! live event stream.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::fmt::Display;

use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use reporter::{EventReporter, JsonLinesReporter, TerminalReporter};
pub use styles::Styles;

/// Terminal state shared by every renderer.
///
/// Status lines honour `quiet`; report fields do not, because a finished
/// installation's credentials are printed nowhere else.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a terminal.
    pub is_tty: bool,
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, and never when `no_color` is set
    /// or `NO_COLOR` is present in the environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let colored = !no_color && is_tty && std::env::var_os("NO_COLOR").is_none();
        Self {
            styles: Styles::for_terminal(colored),
            is_tty,
            quiet,
        }
    }

    /// Spinners only make sense on an interactive, non-quiet terminal.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Tolerated problems, such as a plugin that would not activate. Goes to
    /// stderr so it survives stdout redirection.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            eprintln!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// A step starting, for output without spinners.
    pub fn step(&self, label: &str) {
        if !self.quiet {
            println!("  {} {label}", "→".style(self.styles.step));
        }
    }

    pub fn note(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.dim));
        }
    }

    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// `label` padded to `width`, then `value`. Never suppressed.
    pub fn field(&self, indent: usize, width: usize, label: &str, value: impl Display) {
        println!("{:indent$}{:<width$} {value}", "", format!("{label}:"));
    }

    /// `✓` for present, dim `✗` for absent.
    #[must_use]
    pub fn mark(&self, present: bool) -> String {
        if present {
            "✓".style(self.styles.success).to_string()
        } else {
            "✗".style(self.styles.dim).to_string()
        }
    }
}
