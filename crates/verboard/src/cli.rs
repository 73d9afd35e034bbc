//! Terminal output for the one-shot commands
//!
//! Tables via comfy-table, spinner via indicatif. Everything here returns
//! strings so it can be tested without a terminal.

use chrono::{DateTime, Local, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use verboard_core::models::{Changelog, RestorePoint, SystemStatus, VersionEntry};

fn header(table: &mut Table, columns: &[&str], no_color: bool) {
    if no_color {
        table.set_header(columns.to_vec());
    } else {
        table.set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Versions list, newest first (already sorted by the registry)
pub fn format_versions_table(versions: &[VersionEntry], no_color: bool) -> String {
    if versions.is_empty() {
        return "No backups found.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(
        &mut table,
        &["Version", "Type", "Format", "Size", "Created", "File"],
        no_color,
    );

    for v in versions {
        let channel = if no_color {
            Cell::new(v.channel.as_str())
        } else {
            let color = match v.channel {
                verboard_core::models::ReleaseChannel::Stable => Color::Green,
                verboard_core::models::ReleaseChannel::Beta => Color::Yellow,
            };
            Cell::new(v.channel.as_str()).fg(color)
        };

        table.add_row(vec![
            Cell::new(&v.display_name),
            channel,
            Cell::new(v.format.as_str()),
            Cell::new(&v.size),
            Cell::new(local_time(&v.created)),
            Cell::new(&v.name),
        ]);
    }

    table.to_string()
}

pub fn format_status(status: &SystemStatus, no_color: bool) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(&mut table, &["Field", "Value"], no_color);

    let rows = [
        ("Current version", status.current_version.clone()),
        ("Last backup", status.last_backup.clone()),
        ("Total backups", status.total_backups.to_string()),
        ("Disk usage", status.disk_usage.clone()),
        ("Memory usage", status.memory_usage.clone()),
        ("Platform", status.platform.clone()),
        ("Checked at", local_time(&status.timestamp)),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }

    let mut out = table.to_string();
    if let Some(error) = &status.error {
        out.push_str(&format!("\nWarning: {}", error));
    }
    out
}

pub fn format_restore_points_table(points: &[RestorePoint], no_color: bool) -> String {
    if points.is_empty() {
        return "No restore points found.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(&mut table, &["Tag", "Created", "Description"], no_color);

    for p in points {
        table.add_row(vec![
            p.name.clone(),
            p.timestamp.as_ref().map(local_time).unwrap_or_else(|| "-".to_string()),
            p.description.clone(),
        ]);
    }

    table.to_string()
}

pub fn format_changelog(log: &Changelog) -> String {
    let mut out = format!("Changes {} -> {}\n", log.version1, log.version2);
    for change in &log.changes {
        out.push_str(&format!("  - {}\n", change));
    }
    if let Some(note) = &log.note {
        out.push_str(&format!("\n({})", note));
    }
    out
}

/// Spinner shown while a script runs
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.into());
    spinner
}
