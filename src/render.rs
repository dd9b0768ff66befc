//! Draws chart descriptions as SVG documents.

use std::ops::Range;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::aggregate::{Bin, MonthKey};
use crate::charts::{Chart, ChartKind, Series};
use crate::events::EdaError;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

// seaborn "deep" palette
const PALETTE: [RGBColor; 10] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
    RGBColor(129, 114, 179),
    RGBColor(147, 120, 96),
    RGBColor(218, 139, 195),
    RGBColor(140, 140, 140),
    RGBColor(204, 185, 116),
    RGBColor(100, 181, 205),
];

const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

const CAPTION_FONT: (&str, u32) = ("sans-serif", 20);

fn draw_err<E: std::fmt::Display>(err: E) -> EdaError {
    EdaError::Render(err.to_string())
}

fn palette(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Diverging blue-grey-red scale over [-1, 1].
pub fn coolwarm(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(245, 245, 245);
    }
    let t = ((value + 1.0) / 2.0).clamp(0.0, 1.0);
    let (from, to, f) = if t < 0.5 {
        (COOL, NEUTRAL, t * 2.0)
    } else {
        (NEUTRAL, WARM, (t - 0.5) * 2.0)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Padded axis range over the finite values.
fn value_range<I: Iterator<Item = f64>>(values: I, include_zero: bool) -> Range<f64> {
    let (mut lo, mut hi) = if include_zero {
        (0.0, 0.0)
    } else {
        (f64::INFINITY, f64::NEG_INFINITY)
    };
    for value in values.filter(|v| v.is_finite()) {
        lo = lo.min(value);
        hi = hi.max(value);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if lo == hi {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    let lo = if include_zero && lo == 0.0 { 0.0 } else { lo - pad };
    (lo)..(hi + pad)
}

// segment slots for `n` categories, never fewer than two
fn slots(n: usize) -> Range<i32> {
    0..(n.max(2) as i32 - 1)
}

pub fn render_svg(chart: &Chart) -> Result<String, EdaError> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, chart.size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        match &chart.kind {
            ChartKind::Histogram { bins, density } => draw_histogram(&root, chart, bins, density)?,
            ChartKind::Bar { bars } => draw_bars(&root, chart, bars)?,
            ChartKind::Heatmap { labels, matrix } => draw_heatmap(&root, chart, labels, matrix)?,
            ChartKind::Line { points } => {
                let months: Vec<MonthKey> = points.iter().map(|p| p.0).collect();
                let series = Series {
                    name: chart.y_label.clone(),
                    points: points.clone(),
                };
                draw_lines(&root, chart, &months, std::slice::from_ref(&series), false)?
            }
            ChartKind::MultiLine { months, series } => {
                draw_lines(&root, chart, months, series, true)?
            }
        }
        root.present().map_err(draw_err)?;
    }
    Ok(buffer)
}

fn draw_histogram(
    root: &Area,
    chart: &Chart,
    bins: &[Bin],
    density: &[(f64, f64)],
) -> Result<(), EdaError> {
    let x_range = match (bins.first(), bins.last()) {
        (Some(first), Some(last)) => first.start..last.end,
        _ => 0.0..1.0,
    };
    let y_range = value_range(
        bins.iter()
            .map(|b| b.count as f64)
            .chain(density.iter().map(|p| p.1)),
        true,
    );

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_err)?;
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()
        .map_err(draw_err)?;

    let color = palette(0);
    ctx.draw_series(bins.iter().map(|b| {
        Rectangle::new(
            [(b.start, 0.0), (b.end, b.count as f64)],
            color.mix(0.6).filled(),
        )
    }))
    .map_err(draw_err)?;
    ctx.draw_series(LineSeries::new(density.iter().copied(), color.stroke_width(2)))
        .map_err(draw_err)?;
    Ok(())
}

fn draw_bars(root: &Area, chart: &Chart, bars: &[(String, f64)]) -> Result<(), EdaError> {
    let y_range = value_range(bars.iter().map(|b| b.1), true);
    let label_of = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(idx) => bars
            .get(*idx as usize)
            .map(|b| b.0.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(slots(bars.len()).into_segmented(), y_range)
        .map_err(draw_err)?;
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&label_of)
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()
        .map_err(draw_err)?;

    ctx.draw_series(
        bars.iter()
            .enumerate()
            .filter(|(_, bar)| bar.1.is_finite())
            .map(|(idx, bar)| {
                let slot = idx as i32;
                let mut rect = Rectangle::new(
                    [
                        (SegmentValue::Exact(slot), 0.0),
                        (SegmentValue::Exact(slot + 1), bar.1),
                    ],
                    palette(idx).filled(),
                );
                rect.set_margin(0, 0, 6, 6);
                rect
            }),
    )
    .map_err(draw_err)?;
    Ok(())
}

fn draw_heatmap(
    root: &Area,
    chart: &Chart,
    labels: &[String],
    matrix: &[Vec<f64>],
) -> Result<(), EdaError> {
    let k = labels.len();
    // row 0 is drawn at the top
    let flip = |slot: i32| (k as i32 - 1 - slot).max(0) as usize;
    let column_label = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(idx) => labels.get(*idx as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    let row_label = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(idx) => labels.get(flip(*idx)).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(slots(k).into_segmented(), slots(k).into_segmented())
        .map_err(draw_err)?;
    ctx.configure_mesh()
        .disable_mesh()
        .x_labels(k.max(1))
        .y_labels(k.max(1))
        .x_label_formatter(&column_label)
        .y_label_formatter(&row_label)
        .draw()
        .map_err(draw_err)?;

    let mut cells = Vec::new();
    for (row, values) in matrix.iter().enumerate() {
        let y = (k - 1 - row) as i32;
        for (col, value) in values.iter().enumerate() {
            cells.push((col as i32, y, *value));
        }
    }

    ctx.draw_series(cells.iter().map(|(x, y, value)| {
        Rectangle::new(
            [
                (SegmentValue::Exact(*x), SegmentValue::Exact(*y)),
                (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
            ],
            coolwarm(*value).filled(),
        )
    }))
    .map_err(draw_err)?;

    let annotation = ("sans-serif", 16)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    ctx.draw_series(cells.iter().map(|(x, y, value)| {
        Text::new(
            format!("{value:.2}"),
            (SegmentValue::CenterOf(*x), SegmentValue::CenterOf(*y)),
            annotation.clone(),
        )
    }))
    .map_err(draw_err)?;
    Ok(())
}

fn draw_lines(
    root: &Area,
    chart: &Chart,
    months: &[MonthKey],
    series: &[Series],
    legend: bool,
) -> Result<(), EdaError> {
    let last = (months.len() as i32 - 1).max(1);
    let y_range = value_range(
        series.iter().flat_map(|s| s.points.iter().map(|p| p.1)),
        false,
    );
    let month_label = |idx: &i32| {
        usize::try_from(*idx)
            .ok()
            .and_then(|idx| months.get(idx))
            .map(ToString::to_string)
            .unwrap_or_default()
    };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0..last, y_range)
        .map_err(draw_err)?;
    ctx.configure_mesh()
        .x_labels(months.len().clamp(1, 12))
        .x_label_formatter(&month_label)
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()
        .map_err(draw_err)?;

    for (idx, line) in series.iter().enumerate() {
        let color = palette(idx);
        let points: Vec<(i32, f64)> = line
            .points
            .iter()
            .filter_map(|(month, value)| {
                let x = months.iter().position(|m| m == month)?;
                Some((x as i32, *value))
            })
            .collect();
        let anno = ctx
            .draw_series(LineSeries::new(points, color.stroke_width(2)).point_size(4))
            .map_err(draw_err)?;
        if legend {
            anno.label(line.name.as_str()).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
        }
    }

    if legend && !series.is_empty() {
        ctx.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use plotters::style::RGBColor;

    use super::{coolwarm, render_svg, slots, value_range};
    use crate::aggregate::{Bin, MonthKey};
    use crate::charts::{Chart, ChartKind, Series};
    use crate::events::EdaError;

    fn chart(kind: ChartKind) -> Chart {
        Chart {
            id: "test".to_owned(),
            title: "Test Chart".to_owned(),
            x_label: "x".to_owned(),
            y_label: "y".to_owned(),
            size: (400, 300),
            kind,
        }
    }

    #[test]
    fn test_coolwarm_endpoints() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
        assert_eq!(coolwarm(7.0), coolwarm(1.0));
    }

    #[test]
    fn test_value_range() {
        let range = value_range([2.0, 4.0].into_iter(), true);
        assert_eq!(range.start, 0.0);
        assert!((range.end - 4.2).abs() < 1e-9);
        assert_eq!(value_range([3.0, 3.0].into_iter(), false), 2.0..4.0);
        assert_eq!(value_range(std::iter::empty(), false), 0.0..1.0);
        assert_eq!(value_range([f64::NAN].into_iter(), true), -1.0..1.0);
        assert_eq!(slots(0), 0..1);
        assert_eq!(slots(5), 0..4);
    }

    #[test]
    fn test_render_every_kind() -> Result<(), EdaError> {
        let months = vec![
            MonthKey { year: 2024, month: 1 },
            MonthKey { year: 2024, month: 2 },
        ];
        let kinds = vec![
            ChartKind::Histogram {
                bins: vec![
                    Bin {
                        start: 0.0,
                        end: 1.0,
                        count: 3,
                    },
                    Bin {
                        start: 1.0,
                        end: 2.0,
                        count: 1,
                    },
                ],
                density: vec![(0.0, 2.0), (2.0, 0.5)],
            },
            ChartKind::Bar {
                bars: vec![("a".to_owned(), 2.0), ("b".to_owned(), f64::NAN)],
            },
            ChartKind::Heatmap {
                labels: vec!["p".to_owned(), "q".to_owned()],
                matrix: vec![vec![1.0, -0.5], vec![-0.5, 1.0]],
            },
            ChartKind::Line {
                points: vec![(months[0], 18.0), (months[1], 10.0)],
            },
            ChartKind::MultiLine {
                months: months.clone(),
                series: vec![Series {
                    name: "card".to_owned(),
                    points: vec![(months[1], 2.0)],
                }],
            },
        ];

        for kind in kinds {
            let svg = render_svg(&chart(kind))?;
            assert!(svg.contains("<svg"));
            assert!(svg.contains("Test Chart"));
        }
        Ok(())
    }

    #[test]
    fn test_render_empty_data() -> Result<(), EdaError> {
        let svg = render_svg(&chart(ChartKind::Bar { bars: Vec::new() }))?;
        assert!(svg.contains("</svg>"));
        let svg = render_svg(&chart(ChartKind::Line { points: Vec::new() }))?;
        assert!(svg.contains("</svg>"));
        Ok(())
    }
}
