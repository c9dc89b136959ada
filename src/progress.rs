use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_CHARS: &str = "█▓░";

/// Create a byte-based progress bar with a consistent style.
pub fn byte_progress_bar(label: impl Into<String>, total_bytes: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix:.bold.dim} {spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({binary_bytes_per_sec}) {msg}",
        )
        .unwrap()
        .progress_chars(BAR_CHARS),
    );
    pb.set_prefix(label.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}

/// Create a progress bar that tracks how many logical items (segments,
/// paths, records, …) have been processed.
pub fn count_progress_bar(
    label: impl Into<String>,
    unit_label: &str,
    total_items: u64,
) -> ProgressBar {
    let pb = ProgressBar::new(total_items);
    let template = format!(
        "{{prefix:.bold.dim}} {{spinner:.green}} [{{elapsed_precise}}] {{wide_bar:.cyan/blue}} {{pos}}/{{len}} {unit_label} ({{eta}} @ {{per_sec}} {unit_label}/s) {{msg}}",
    );
    pb.set_style(
        ProgressStyle::with_template(&template)
            .unwrap()
            .progress_chars(BAR_CHARS),
    );
    pb.set_prefix(label.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}
