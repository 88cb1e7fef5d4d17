use crate::ui::{style, Role};
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::Duration;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() && !crate::output::is_quiet() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

pub fn finish_with_summary(duration: Duration, nodes: usize, keys: usize) {
    println!(
        "{} {}",
        Icons::CHECK.style(style(Role::Success)),
        format!("Complete in {}", HumanDuration(duration)).style(style(Role::Success))
    );
    println!(
        "  {} {}  {} {}",
        Icons::FOLDER.style(style(Role::Info)),
        nodes,
        Icons::KEY.style(style(Role::Info)),
        keys
    );
}
