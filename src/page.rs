//! Assembles the single scrollable report page.

use crate::charts::Section;
use crate::summary::{ColumnStats, Summary};

pub const PAGE_TITLE: &str = "E-Commerce Dataset EDA";

const DESCRIBE_ROWS: [&str; 11] = [
    "count", "unique", "top", "freq", "mean", "std", "min", "25%", "50%", "75%", "max",
];

/// A chart step after rendering; failures carry their message.
#[derive(Debug)]
pub struct RenderedStep {
    pub step: String,
    pub section: Section,
    pub svg: Result<String, String>,
}

#[derive(Debug)]
pub struct Report {
    pub summary: Summary,
    pub info_text: String,
    pub steps: Vec<RenderedStep>,
}

pub fn idle_message() -> &'static str {
    "Please upload a CSV file to begin."
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else {
        format!("{value:.6}")
    }
}

// one describe cell, blank where the statistic does not apply
fn describe_cell(stats: &ColumnStats, row: &str) -> String {
    match stats {
        ColumnStats::Numeric {
            count,
            mean,
            std,
            min,
            q1,
            median,
            q3,
            max,
        } => match row {
            "count" => format_number(*count as f64),
            "mean" => format_number(*mean),
            "std" => format_number(*std),
            "min" => format_number(*min),
            "25%" => format_number(*q1),
            "50%" => format_number(*median),
            "75%" => format_number(*q3),
            "max" => format_number(*max),
            _ => String::new(),
        },
        ColumnStats::Temporal {
            count,
            mean,
            min,
            q1,
            median,
            q3,
            max,
        } => {
            let stamp = match row {
                "count" => return count.to_string(),
                "mean" => mean,
                "min" => min,
                "25%" => q1,
                "50%" => median,
                "75%" => q3,
                "max" => max,
                _ => return String::new(),
            };
            stamp.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "NaT".to_owned())
        }
        ColumnStats::Categorical {
            count,
            unique,
            top,
            freq,
        } => match row {
            "count" => count.to_string(),
            "unique" => unique.to_string(),
            "top" => top.clone().unwrap_or_default(),
            "freq" => freq.to_string(),
            _ => String::new(),
        },
    }
}

fn basic_info(out: &mut String, report: &Report) {
    let summary = &report.summary;
    out.push_str("<h2>Basic Info</h2>\n");
    out.push_str(&format!(
        "<p>Shape: ({}, {})</p>\n",
        summary.shape.0, summary.shape.1
    ));

    out.push_str("<p>Missing values:</p>\n<table>\n");
    for (name, count) in &summary.missing_values {
        out.push_str(&format!(
            "<tr><th>{}</th><td>{count}</td></tr>\n",
            escape(name)
        ));
    }
    out.push_str("</table>\n");

    out.push_str(&format!("<p>Duplicate rows: {}</p>\n", summary.duplicate_rows));
    out.push_str(&format!(
        "<p>Info:</p>\n<pre>{}</pre>\n",
        escape(&report.info_text)
    ));

    out.push_str("<p>Describe (all):</p>\n<table>\n<tr><th></th>\n");
    for (name, _) in &summary.describe {
        out.push_str(&format!("<th>{}</th>", escape(name)));
    }
    out.push_str("</tr>\n");
    for row in DESCRIBE_ROWS {
        out.push_str(&format!("<tr><th>{row}</th>"));
        for (_, stats) in &summary.describe {
            out.push_str(&format!("<td>{}</td>", escape(&describe_cell(stats, row))));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn page_head() -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{PAGE_TITLE}</title>\n</head>\n<body>\n<h1>{PAGE_TITLE}</h1>\n"
    )
}

/// The whole report in its fixed order.
pub fn render_page(report: &Report) -> String {
    let mut out = page_head();
    basic_info(&mut out, report);

    let mut current: Option<Section> = None;
    for step in &report.steps {
        if current != Some(step.section) {
            out.push_str(&format!("<h2>{}</h2>\n", step.section.heading()));
            current = Some(step.section);
        }
        match &step.svg {
            Ok(svg) => {
                out.push_str(&format!(
                    "<figure id=\"{}\">\n{svg}\n</figure>\n",
                    escape(&step.step)
                ));
            }
            Err(message) => {
                out.push_str(&format!(
                    "<p class=\"step-error\" id=\"{}\">{} failed: {}</p>\n",
                    escape(&step.step),
                    escape(&step.step),
                    escape(message)
                ));
            }
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Page shown while no file has been supplied.
pub fn render_idle_page() -> String {
    let mut out = page_head();
    out.push_str(&format!("<p>{}</p>\n", idle_message()));
    out.push_str("</body>\n</html>\n");
    out
}
