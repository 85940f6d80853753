//! Output-tree statistics.
//!
//! Summarizes what a run has produced so far: per-document image
//! directories, total extracted images, and the size of each data and
//! suggestion file. Used by `distill stats` to monitor a long batch from a
//! second terminal without touching the run itself.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;

/// Run the stats command: inspect the output tree and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    println!("doc-distill — Output Stats");
    println!("==========================");
    println!();

    let (document_dirs, total_images) = image_totals(&config.output.images_dir);
    println!("  Images:      {}", config.output.images_dir.display());
    println!("  Documents:   {}", document_dirs);
    println!("  Extracted:   {} images", total_images);
    println!();

    print_dir_files("Data", &config.output.data_dir);
    print_dir_files("Suggestions", &config.output.suggestions_dir);
    print_dir_files("Partitioned", &config.output.partitioned_dir);

    Ok(())
}

/// Count per-document image directories and the images inside them.
fn image_totals(images_dir: &Path) -> (u64, u64) {
    let mut document_dirs = 0u64;
    let mut total_images = 0u64;

    let entries = match std::fs::read_dir(images_dir) {
        Ok(entries) => entries,
        Err(_) => return (0, 0),
    };
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        document_dirs += 1;
        if let Ok(images) = std::fs::read_dir(entry.path()) {
            total_images += images
                .flatten()
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count() as u64;
        }
    }

    (document_dirs, total_images)
}

/// Print each plain file of `dir` with its size. A missing directory prints
/// as empty — the run simply has not produced that view yet.
fn print_dir_files(label: &str, dir: &Path) {
    println!("  {}:   {}", label, dir.display());
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            println!("    (not created yet)");
            println!();
            return;
        }
    };

    let mut files: Vec<(String, u64)> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| {
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            (e.file_name().to_string_lossy().to_string(), size)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        println!("    (empty)");
    }
    for (name, size) in files {
        println!("    {:<24} {}", name, format_bytes(size));
    }
    println!();
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
