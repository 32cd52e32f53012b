//! Styled progress output on stderr for `--verbose`.

use std::time::Duration;

use owo_colors::OwoColorize;

use crate::VERSION;

const RULE_WIDTH: usize = 48;

pub fn print_banner() {
    eprintln!("{} {}", "readmark".bold().bright_blue(), format!("v{VERSION}").dimmed());
}

pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("{step}/{total}").dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message);
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "·".blue(), message.dimmed());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow().bold(), message.yellow());
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// One timing line; steps over 100ms are highlighted.
pub fn print_timing(label: &str, duration: Duration) {
    let ms = millis(duration);
    let value = format!("{ms:>9.2}ms");
    if ms > 100.0 {
        eprintln!("  {:<10}{}", label.dimmed(), value.bright_red());
    } else {
        eprintln!("  {:<10}{}", label.dimmed(), value);
    }
}

pub fn print_timing_summary(total: Duration, timings: &[(String, Duration)]) {
    eprintln!("{}", "─".repeat(RULE_WIDTH).dimmed());
    for (label, duration) in timings {
        print_timing(label, *duration);
    }
    eprintln!("  {:<10}{:>9.2}ms", "total".bold(), millis(total));
}

/// Human-readable byte count (binary units).
pub fn format_size(bytes: usize) -> String {
    let units = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < units.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{value:.1} {}", units[unit]) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
