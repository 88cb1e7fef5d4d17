use owo_colors::Style;
use std::sync::OnceLock;

static COLORED: OnceLock<bool> = OnceLock::new();

/// What a piece of terminal output is, which decides its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Header,
    Success,
    Error,
    Warn,
    Info,
    Dim,
}

/// Colors are off when stdout is not a terminal or `NODEPREFS_QUIET` is set
pub fn colored() -> bool {
    *COLORED.get_or_init(|| console::Term::stdout().is_term() && !crate::output::is_quiet())
}

pub fn style(role: Role) -> Style {
    if !colored() {
        return Style::new();
    }
    match role {
        Role::Header => Style::new().cyan().bold(),
        Role::Success => Style::new().green().bold(),
        Role::Error => Style::new().red().bold(),
        Role::Warn => Style::new().yellow().bold(),
        Role::Info => Style::new().magenta(),
        Role::Dim => Style::new().white().dimmed(),
    }
}
