//! Renders a batch of summaries into the HTML email body.

use crate::pipeline::BatchReport;

pub struct DigestKind {
    pub subject: &'static str,
    pub heading: &'static str,
}

pub const WEEKLY: DigestKind = DigestKind {
    subject: "Weekly Changelog AI Summaries",
    heading: "Weekly Changelog Summaries",
};

pub const TEST: DigestKind = DigestKind {
    subject: "Changelog AI Summaries - Test Email",
    heading: "Changelog AI Summaries",
};

fn esc(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// `None` when nothing in the batch succeeded; there is nothing worth sending.
pub fn render(kind: &DigestKind, report: &BatchReport) -> Option<String> {
    let summaries: Vec<_> = report
        .successes()
        .filter_map(|r| r.ai_summary.as_deref().map(|s| (r.url.as_str(), s)))
        .collect();
    if summaries.is_empty() {
        return None;
    }

    let mut html = format!("<html><body><h1>{}</h1>", kind.heading);
    for (i, (url, summary)) in summaries.iter().enumerate() {
        html.push_str(r#"<div style="margin-bottom: 20px;">"#);
        html.push_str(&format!("<h2>Changelog #{}: {}</h2>", i + 1, esc(url)));
        html.push_str(summary);
        html.push_str("</div>");
    }

    let failed: Vec<_> = report.failures().map(|r| r.url.as_str()).collect();
    if !failed.is_empty() {
        html.push_str("<h2>Errors</h2><p>Failed to process the following URLs:</p><ul>");
        for url in failed {
            html.push_str(&format!("<li>{}</li>", esc(url)));
        }
        html.push_str("</ul>");
    }

    html.push_str("</body></html>");
    Some(html)
}
