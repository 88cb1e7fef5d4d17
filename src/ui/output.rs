use crate::output::is_quiet;
use crate::ui::{style, Icons, Role};
use owo_colors::OwoColorize;

fn icon(icon: &'static str) -> &'static str {
    if is_quiet() { "" } else { icon }
}

pub fn header(text: &str) {
    println!("{} {}", icon(Icons::ROCKET), text.style(style(Role::Header)));
}

pub fn success(label: &str) {
    println!("{} {}", icon(Icons::CHECK), label.style(style(Role::Success)));
}

pub fn error(label: &str) {
    eprintln!("{} {}", icon(Icons::CROSS), label.style(style(Role::Error)));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", icon(Icons::WARN), label.style(style(Role::Warn)));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        icon(Icons::INFO).style(style(Role::Info)),
        label.style(style(Role::Dim)),
        value
    );
}

pub fn dim(text: &str) -> String {
    text.style(style(Role::Dim)).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(style(Role::Dim)), value);
}
