//! Sorting Validation Report
//!
//! Renders the single most-recent report document and optionally surfaces it
//! in the platform's default viewer.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::info;

use super::store::StoreLocations;
use crate::order_check::{EvidenceRef, RunRecord};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Render the HTML report for a failing cycle.
pub fn render_report(record: &RunRecord, locations: &StoreLocations) -> String {
    let evidence_html = match &record.evidence {
        Some(EvidenceRef::Captured { path }) if is_image(path) => format!(
            r#"<img src="{}" alt="Sorting Error" width="600"/>"#,
            escape(path)
        ),
        Some(EvidenceRef::Captured { path }) => format!(
            r#"<p><a href="{0}">{0}</a></p>"#,
            escape(path)
        ),
        Some(EvidenceRef::Unavailable { reason }) => {
            format!("<p>Evidence unavailable: {}</p>", escape(reason))
        }
        None => "<p>Evidence unavailable</p>".to_string(),
    };

    let rows: String = record
        .violations
        .iter()
        .map(|v| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                v.position,
                escape(&v.actual.to_string()),
                escape(&v.expected.to_string())
            )
        })
        .collect();

    format!(
        r#"<html>
  <head><title>Sorting Validation Report</title></head>
  <body>
    <h1>Sorting Validation Report</h1>
    <p>Sorting Status: Failed</p>
    <p>Run: {label} ({checked} entries checked, {count} out of order)</p>
    <h2>Screenshot of the issue:</h2>
    {evidence}
    <h2>Download Sorting Errors:</h2>
    <p><a href="{table}" download>Download CSV Log</a></p>
    <p><a href="{log}" download>Download Log File</a></p>
    <h2>Mismatched positions:</h2>
    <table>
      <tr><th>Position</th><th>Actual Date</th><th>Expected Date</th></tr>
{rows}    </table>
  </body>
</html>
"#,
        label = escape(&record.label),
        checked = record.observed.len(),
        count = record.violations.len(),
        evidence = evidence_html,
        table = escape(&locations.table),
        log = escape(&locations.log),
        rows = rows,
    )
}

/// Open the report with the platform's default application.
pub async fn open_report(path: &str) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(path);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", path]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(path);
        c
    };

    let status = cmd
        .status()
        .await
        .with_context(|| format!("Failed to launch viewer for {}", path))?;
    if !status.success() {
        bail!("viewer for {} exited with {}", path, status);
    }
    info!("Opened report {}", path);
    Ok(())
}

fn is_image(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
