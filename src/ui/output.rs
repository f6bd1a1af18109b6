use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// One module line: name and root handle
pub fn module_line(name: &str, root: &str) {
    println!(
        "{} {} {}",
        Icons::PACKAGE.style(theme().info.clone()),
        name.style(theme().module.clone()),
        root.style(theme().muted.clone())
    );
}

/// `from -> to` for alias records
pub fn alias_arrow(from: &str, to: &str) -> String {
    format!(
        "{} {} {}",
        from,
        Icons::LINK.style(theme().muted.clone()),
        to.style(theme().alias.clone())
    )
}
