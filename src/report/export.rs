//! Downloadable report artifacts
//!
//! The export is written to a temporary file that is removed when the
//! [`ExportArtifact`] is dropped, whether or not sending it succeeded.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

use super::{CachedReport, ReportEntry};
use crate::cache::QueryId;
use crate::utils::escape_html;

/// Format of the downloadable report
#[derive(Debug, Clone)]
pub enum ExportFormat {
    /// The plain-text export
    Text,
    /// An HTML document starting with a static preamble (stylesheet etc.)
    Html {
        /// Raw HTML placed before the report body
        preamble: Arc<str>,
    },
}

impl ExportFormat {
    /// HTML when a preamble is available, plain text otherwise
    #[must_use]
    pub fn from_preamble(preamble: Option<String>) -> Self {
        preamble.map_or(Self::Text, |preamble| Self::Html {
            preamble: preamble.into(),
        })
    }

    /// File extension, without the dot
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Html { .. } => "html",
        }
    }

    /// Renders the artifact content for a report
    #[must_use]
    pub fn render(&self, report: &CachedReport) -> String {
        match self {
            Self::Text => report.full_export.clone(),
            Self::Html { preamble } => render_html(preamble, report),
        }
    }
}

fn render_html(preamble: &str, report: &CachedReport) -> String {
    let mut html = String::from(preamble);
    if !html.ends_with('\n') {
        html.push('\n');
    }

    html.push_str("<div class=\"report\">\n");
    html.push_str(&format!(
        "<h1>Report for {}</h1>\n<p class=\"generated\">{}</p>\n",
        escape_html(&report.query),
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for entry in &report.entries {
        html.push_str(&render_html_entry(entry));
    }
    html.push_str("</div>\n");

    if preamble.to_ascii_lowercase().contains("<body") {
        html.push_str("</body>\n</html>\n");
    }
    html
}

fn render_html_entry(entry: &ReportEntry) -> String {
    let mut section = format!(
        "<div class=\"database\">\n<h2>{} <span class=\"count\">({})</span></h2>\n<p class=\"info\">{}</p>\n",
        escape_html(&entry.name),
        entry.leak_count(),
        escape_html(&entry.info)
    );

    for row in &entry.rows {
        section.push_str("<pre class=\"record\">");
        let lines: Vec<&str> = row.iter().map(|line| line.export.as_str()).collect();
        // Field lines are already escaped
        section.push_str(&lines.join("\n"));
        section.push_str("</pre>\n");
    }

    section.push_str("</div>\n");
    section
}

/// A report written to a temporary file, deleted on drop
pub struct ExportArtifact {
    file: NamedTempFile,
    file_name: String,
}

impl ExportArtifact {
    /// Renders `report` in `format` and writes it to a new temporary file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temporary file cannot be created or written.
    pub fn create(
        id: &QueryId,
        report: &CachedReport,
        format: &ExportFormat,
    ) -> std::io::Result<Self> {
        let extension = format.extension();
        let mut file = tempfile::Builder::new()
            .prefix("report_")
            .suffix(&format!(".{extension}"))
            .tempfile()?;

        file.write_all(format.render(report).as_bytes())?;
        file.flush()?;

        Ok(Self {
            file,
            file_name: format!("report_{id}.{extension}"),
        })
    }

    /// Path of the temporary file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name shown to the user
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}
