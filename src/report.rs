//! Chronological audit report.
//!
//! Rows are ordered by start time as an RFC 3339 string with fixed nanosecond
//! precision, then by sidecar path. The HTML document embeds the rendered
//! provenance graph below the table.
use crate::audit::AuditRecord;
use crate::resolve::ResolvedRecords;
use crate::settings::ReportStyle;
use chrono::SecondsFormat;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub start_time: String,
    pub command: String,
    pub duration_ms: u128,
}

impl ReportRow {
    fn from_record(record: &AuditRecord) -> Self {
        Self {
            start_time: record
                .tags
                .start_time
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            command: record.command_line(),
            duration_ms: record.tags.duration.as_millis(),
        }
    }
}

pub fn report_rows(records: &ResolvedRecords) -> Vec<ReportRow> {
    let mut keyed: Vec<(String, &Path, &AuditRecord)> = records
        .iter()
        .map(|(path, record)| (sort_key(record), path.as_path(), record))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    keyed
        .into_iter()
        .map(|(_, _, record)| ReportRow::from_record(record))
        .collect()
}

fn sort_key(record: &AuditRecord) -> String {
    record
        .tags
        .start_time
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Full HTML document for `output`'s history, embedding `svg` verbatim.
pub fn render_html(output: &str, rows: &[ReportRow], svg: &str, style: &ReportStyle) -> String {
    let title = format!("SciCommander Audit Report for {}", escape_html(output));
    let mut html = String::from("<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(&format!("<style>\n{}</style>\n", style.stylesheet));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    html.push_str("<hr>\n<table>\n");
    html.push_str("<tr><th>Start time</th><th>Command</th><th>Duration</th></tr>\n");
    for row in rows {
        html.push_str(&format!(
            "<tr><td style=\"background: {time_bg};\">{start}</td>\
             <td style=\"background: {command_bg};\">{command}</td>\
             <td style=\"background: {time_bg};\">{duration} ms</td></tr>\n",
            time_bg = style.time_cell_background,
            command_bg = style.command_cell_background,
            start = escape_html(&row.start_time),
            command = escape_html(&row.command),
            duration = row.duration_ms,
        ));
    }
    html.push_str("</table>\n<hr>\n");
    html.push_str(svg.trim());
    html.push_str("\n<hr>\n");
    html.push_str(&format!("<p>Generated by SciCommander {}</p>\n", style.version));
    html.push_str("</body>\n</html>\n");
    html
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
