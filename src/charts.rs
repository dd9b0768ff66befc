//! One pure builder per chart step, each turning the table into a chart description.

use serde::Serialize;
use tracing::warn;

use crate::aggregate::{
    correlation_matrix, density_curve, group_mean, group_sum, histogram_bins,
    month_range, monthly_counts_by, monthly_sum, sort_descending, value_counts, Bin, MonthKey,
};
use crate::derive::REVENUE_COLUMN;
use crate::events::EdaError;
use crate::loader::DATE_COLUMN;
use crate::table::Table;

pub const NUMERIC_COLUMNS: [&str; 3] = ["quantity", "price", "discount"];
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["category", "region", "payment_method"];

// figure sizes in pixels
const SMALL: (u32, u32) = (600, 400);
const WIDE: (u32, u32) = (1000, 500);
const MEDIUM: (u32, u32) = (800, 500);
const LARGE: (u32, u32) = (1200, 600);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(MonthKey, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    Histogram {
        bins: Vec<Bin>,
        density: Vec<(f64, f64)>,
    },
    Bar {
        bars: Vec<(String, f64)>,
    },
    Heatmap {
        labels: Vec<String>,
        matrix: Vec<Vec<f64>>,
    },
    Line {
        points: Vec<(MonthKey, f64)>,
    },
    MultiLine {
        months: Vec<MonthKey>,
        series: Vec<Series>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub id: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub size: (u32, u32),
    pub kind: ChartKind,
}

impl Chart {
    fn new(id: &str, title: &str, size: (u32, u32), kind: ChartKind) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            x_label: String::new(),
            y_label: String::new(),
            size,
            kind,
        }
    }

    fn labelled(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_owned();
        self.y_label = y_label.to_owned();
        self
    }
}

/// Page section a step renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    NumericDistributions,
    CategoricalCounts,
    CorrelationHeatmap,
    MonthlyRevenueTrend,
    ExtraGraphs,
}

impl Section {
    pub fn heading(self) -> &'static str {
        match self {
            Section::NumericDistributions => "Numeric Distributions",
            Section::CategoricalCounts => "Categorical Counts",
            Section::CorrelationHeatmap => "Correlation Heatmap",
            Section::MonthlyRevenueTrend => "Monthly Revenue Trend",
            Section::ExtraGraphs => "Extra Graphs",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub top_n: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

#[derive(Debug)]
pub struct StepOutcome {
    pub step: String,
    pub section: Section,
    pub result: Result<Chart, EdaError>,
}

pub fn numeric_distribution(table: &Table, column: &str) -> Result<Chart, EdaError> {
    let values: Vec<f64> = table
        .numeric(column)?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();
    let bins = histogram_bins(&values);
    let bin_width = bins.first().map_or(1.0, |b| b.end - b.start);
    let density = density_curve(&values, bin_width);
    Ok(Chart::new(
        &format!("distribution-{column}"),
        &format!("Distribution of {column}"),
        SMALL,
        ChartKind::Histogram { bins, density },
    )
    .labelled(column, "Count"))
}

pub fn categorical_counts(table: &Table, column: &str) -> Result<Chart, EdaError> {
    let bars = value_counts(&table.labels(column)?);
    Ok(Chart::new(
        &format!("count-{column}"),
        &format!("Count of {column}"),
        SMALL,
        ChartKind::Bar { bars },
    )
    .labelled(column, "count"))
}

pub fn correlation_heatmap(table: &Table) -> Result<Chart, EdaError> {
    let matrix = correlation_matrix(table, &NUMERIC_COLUMNS)?;
    Ok(Chart::new(
        "correlation",
        "Correlation between Numeric Columns",
        SMALL,
        ChartKind::Heatmap {
            labels: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            matrix,
        },
    ))
}

pub fn monthly_revenue_trend(table: &Table) -> Result<Chart, EdaError> {
    let points = monthly_sum(table.timestamps(DATE_COLUMN)?, &table.numeric(REVENUE_COLUMN)?);
    Ok(Chart::new(
        "monthly-revenue",
        "Monthly Revenue Trend",
        WIDE,
        ChartKind::Line { points },
    )
    .labelled("Month", "Revenue"))
}

pub fn top_products(table: &Table, n: usize) -> Result<Chart, EdaError> {
    let mut bars = group_sum(&table.labels("product_id")?, &table.numeric(REVENUE_COLUMN)?);
    sort_descending(&mut bars);
    bars.truncate(n);
    Ok(Chart::new(
        "top-products",
        &format!("Top {n} Products by Revenue"),
        WIDE,
        ChartKind::Bar { bars },
    ))
}

pub fn average_discount_by_category(table: &Table) -> Result<Chart, EdaError> {
    let mut bars = group_mean(&table.labels("category")?, &table.numeric("discount")?);
    sort_descending(&mut bars);
    Ok(Chart::new(
        "average-discount",
        "Average Discount by Category",
        MEDIUM,
        ChartKind::Bar { bars },
    ))
}

pub fn revenue_by_region(table: &Table) -> Result<Chart, EdaError> {
    let mut bars = group_sum(&table.labels("region")?, &table.numeric(REVENUE_COLUMN)?);
    sort_descending(&mut bars);
    Ok(Chart::new(
        "revenue-by-region",
        "Total Revenue by Region",
        MEDIUM,
        ChartKind::Bar { bars },
    ))
}

pub fn monthly_orders_by_payment(table: &Table) -> Result<Chart, EdaError> {
    let rows = monthly_counts_by(
        table.timestamps(DATE_COLUMN)?,
        &table.labels("payment_method")?,
    );

    // full calendar axis; series points stay sparse
    let months = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => month_range(first.0, last.0),
        _ => Vec::new(),
    };

    let mut series: Vec<Series> = Vec::new();
    for (month, label, count) in rows {
        let point = (month, count as f64);
        match series.iter_mut().find(|s| s.name == label) {
            Some(existing) => existing.points.push(point),
            None => series.push(Series {
                name: label,
                points: vec![point],
            }),
        }
    }

    Ok(Chart::new(
        "monthly-orders-by-payment",
        "Monthly Orders by Payment Method",
        LARGE,
        ChartKind::MultiLine { months, series },
    )
    .labelled("order_date", "orders"))
}

/// Every chart step in page order. A failing step does not stop the others.
pub fn build_all(table: &Table, options: &ChartOptions) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();
    let mut step = |section: Section, name: String, result: Result<Chart, EdaError>| {
        if let Err(err) = &result {
            warn!(step = %name, error = %err, "chart step failed");
        }
        outcomes.push(StepOutcome {
            step: name,
            section,
            result,
        });
    };

    for column in NUMERIC_COLUMNS {
        step(
            Section::NumericDistributions,
            format!("distribution-{column}"),
            numeric_distribution(table, column),
        );
    }
    for column in CATEGORICAL_COLUMNS {
        step(
            Section::CategoricalCounts,
            format!("count-{column}"),
            categorical_counts(table, column),
        );
    }
    step(
        Section::CorrelationHeatmap,
        "correlation".to_owned(),
        correlation_heatmap(table),
    );
    step(
        Section::MonthlyRevenueTrend,
        "monthly-revenue".to_owned(),
        monthly_revenue_trend(table),
    );
    step(
        Section::ExtraGraphs,
        "top-products".to_owned(),
        top_products(table, options.top_n),
    );
    step(
        Section::ExtraGraphs,
        "average-discount".to_owned(),
        average_discount_by_category(table),
    );
    step(
        Section::ExtraGraphs,
        "revenue-by-region".to_owned(),
        revenue_by_region(table),
    );
    step(
        Section::ExtraGraphs,
        "monthly-orders-by-payment".to_owned(),
        monthly_orders_by_payment(table),
    );
    outcomes
}
