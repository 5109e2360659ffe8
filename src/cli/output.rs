//! Terminal output for the CLI.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Width keys are padded to in [`Output::kv`].
const KEY_WIDTH: usize = 14;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    pub fn info(msg: &str) {
        println!("{} {}", style("::").cyan().bold(), msg);
    }

    pub fn success(msg: &str) {
        println!("{} {}", style("ok").green().bold(), msg);
    }

    pub fn warning(msg: &str) {
        eprintln!("{} {}", style("warn").yellow().bold(), msg);
    }

    pub fn error(msg: &str) {
        eprintln!("{} {}", style("error").red().bold(), msg);
    }

    /// Print a section title followed by a rule of the same width.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold());
        println!("{}", style("-".repeat(msg.chars().count())).dim());
    }

    /// Print a block group: display name, slug and how many blocks it holds.
    pub fn block_group(display_name: &str, block_type: &str, count: usize) {
        println!(
            "\n{} {} {}",
            style(display_name).bold(),
            style(format!("[{}]", block_type)).dim(),
            style(format!("({})", count)).cyan()
        );
    }

    /// Print a key-value pair with keys aligned.
    pub fn kv(key: &str, value: &str) {
        println!("  {} {}", style(pad_key(key)).dim(), value);
    }

    /// Print a block name or other list entry.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("-").cyan(), msg);
    }

    /// Print an interpreted error, highlighting the explanation.
    pub fn interpretation(message: &str, marker: &str) {
        match message.split_once(&format!("\n{}", marker)) {
            Some((original, explanation)) => {
                Self::error(original);
                eprintln!("{} {}", style(marker.trim()).magenta().bold(), explanation);
            }
            None => Self::error(message),
        }
    }

    /// Spinner shown while a request is in flight.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let template =
            ProgressStyle::default_spinner().template("{spinner:.magenta} {msg} {elapsed:.dim}");
        if let Ok(template) = template {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb
    }
}

fn pad_key(key: &str) -> String {
    format!("{:<width$}", key, width = KEY_WIDTH)
}
