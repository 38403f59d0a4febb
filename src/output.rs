//! CLI output formatting for the event stream.
//!
//! The pipeline core knows nothing about terminals; it emits typed events.
//! This module decides what a plain command-line front-end shows for each
//! of them. Each formatter is a pure function returning lines (for
//! testability); `print_event` is the stdout wrapper `main` drives.
//!
//! Display policy for a line-oriented terminal:
//!
//! - Stage changes become `==>` banners, log lines print verbatim, and
//!   heartbeats print indented — they are already rate-limited at the
//!   source.
//! - The widget-feed events (`Progress`, `Counts`, `Remaining`,
//!   `NowProcessing`) are skipped: they exist for front-ends with panels
//!   to update, and the heartbeat line already carries the same figures
//!   in readable form.
//! - The analysis summary and the final failure breakdown render as
//!   indented blocks, tailored to the two decision points a user actually
//!   reads: "proceed with the merge?" and "what failed, and why?".

use crate::events::Event;
use crate::merge::FailureTaxonomy;
use crate::plan::AnalysisSummary;

/// Format one event as zero or more terminal lines.
pub fn format_event(event: &Event) -> Vec<String> {
    match event {
        Event::StageChanged(stage) => vec![format!("==> {stage}")],
        Event::LogLine(line) => vec![line.clone()],
        Event::Heartbeat(text) => vec![format!("    {text}")],
        Event::ConfirmationNeeded(summary) => format_summary(summary),
        Event::FailureSummary(taxonomy) => format_taxonomy(taxonomy),
        Event::Finished { report, log } => vec![
            "Processing complete".to_string(),
            format!("    Report: {}", report.display()),
            format!("    Log:    {}", log.display()),
        ],
        Event::Fatal(msg) => vec![format!("FATAL: {msg}")],
        // Widget feeds; the heartbeat line covers them on a terminal.
        Event::Progress { .. }
        | Event::Counts { .. }
        | Event::Remaining { .. }
        | Event::NowProcessing { .. } => Vec::new(),
    }
}

/// Format the Stage-1 summary shown at the confirmation gate.
pub fn format_summary(summary: &AnalysisSummary) -> Vec<String> {
    let gb = summary.total_bytes as f64 / 1024f64.powi(3);
    vec![
        "Plan complete".to_string(),
        format!(
            "    With sidecar (ready to merge): {}",
            summary.with_sidecar
        ),
        format!(
            "    Missing sidecar (will fail in merge): {}",
            summary.without_sidecar
        ),
        format!(
            "    Images: {} | Videos: {} | Live pairs: {}",
            summary.images, summary.videos, summary.live_pairs
        ),
        format!("    Total size scanned: {gb:.1} GB"),
    ]
}

/// Format the final failure breakdown.
pub fn format_taxonomy(taxonomy: &FailureTaxonomy) -> Vec<String> {
    if taxonomy.failures() == 0 && taxonomy.partner_error == 0 {
        return vec!["No failures".to_string()];
    }
    let mut lines = vec!["Failure breakdown".to_string()];
    for (label, count) in [
        ("missing sidecar", taxonomy.no_sidecar),
        ("unreadable sidecar", taxonomy.bad_sidecar),
        ("tool errors", taxonomy.tool_error),
        ("live-partner warnings", taxonomy.partner_error),
        ("other", taxonomy.other),
    ] {
        if count > 0 {
            lines.push(format!("    {label}: {count}"));
        }
    }
    lines
}

/// Print an event to stdout.
pub fn print_event(event: &Event) {
    for line in format_event(event) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Stage;
    use std::path::PathBuf;

    #[test]
    fn stage_changes_become_banners() {
        let lines = format_event(&Event::StageChanged(Stage::Planning));
        assert_eq!(lines, vec!["==> Planning"]);
    }

    #[test]
    fn widget_feed_events_print_nothing() {
        assert!(format_event(&Event::Progress { processed: 1, total: 2 }).is_empty());
        assert!(
            format_event(&Event::Counts {
                completed: 1,
                failed: 0,
                warnings: 0
            })
            .is_empty()
        );
        assert!(format_event(&Event::Remaining { images: 3, videos: 1 }).is_empty());
        assert!(
            format_event(&Event::NowProcessing {
                path: PathBuf::from("/x/a.jpg"),
                caption: "a.jpg".into()
            })
            .is_empty()
        );
    }

    #[test]
    fn summary_block_carries_the_gate_numbers() {
        let summary = AnalysisSummary {
            total: 4,
            images: 3,
            videos: 1,
            with_sidecar: 2,
            without_sidecar: 2,
            live_pairs: 1,
            total_bytes: 2 * 1024 * 1024 * 1024,
        };
        let lines = format_summary(&summary);
        assert!(lines[0].contains("Plan complete"));
        assert!(lines.iter().any(|l| l.contains("ready to merge): 2")));
        assert!(lines.iter().any(|l| l.contains("will fail in merge): 2")));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("Images: 3 | Videos: 1 | Live pairs: 1"))
        );
        assert!(lines.iter().any(|l| l.contains("2.0 GB")));
    }

    #[test]
    fn taxonomy_block_skips_empty_buckets() {
        let taxonomy = FailureTaxonomy {
            no_sidecar: 2,
            tool_error: 1,
            ..FailureTaxonomy::default()
        };
        let lines = format_taxonomy(&taxonomy);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().any(|l| l.contains("missing sidecar: 2")));
        assert!(lines.iter().any(|l| l.contains("tool errors: 1")));
        assert!(!lines.iter().any(|l| l.contains("other")));
    }

    #[test]
    fn clean_run_reports_no_failures() {
        assert_eq!(format_taxonomy(&FailureTaxonomy::default()), vec!["No failures"]);
    }

    #[test]
    fn fatal_lines_are_unmissable() {
        let lines = format_event(&Event::Fatal("source folder does not exist".into()));
        assert_eq!(lines, vec!["FATAL: source folder does not exist"]);
    }
}
