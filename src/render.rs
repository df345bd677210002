// Rendering collaborator: AnalyticalView -> SVG or PNG

use crate::palette::ColorPalette;
use crate::view::{AnalyticalView, BarMode, ChartKind, ChartSpec, Orientation, Table, Theme, Value};
use crate::{OutputFormat, RenderOptions};
use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::ops::Range;

/// Render one view to bytes in the requested format
pub fn render_view(view: &AnalyticalView, options: &RenderOptions) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);

    match options.format {
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw_view(&root, view)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
        OutputFormat::Png => {
            let len = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(3))
                .ok_or_else(|| anyhow!("Image size {}x{} is too large", width, height))?;
            let mut buffer = vec![0u8; len];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw_view(&root, view)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, width, height)
        }
    }
}

/// Encode an RGB buffer as PNG
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

struct Colors {
    background: RGBColor,
    foreground: RGBColor,
    grid: RGBColor,
}

fn theme_colors(theme: Theme) -> Colors {
    match theme {
        Theme::Light => Colors {
            background: WHITE,
            foreground: RGBColor(42, 63, 95),
            grid: RGBColor(200, 208, 220),
        },
        Theme::White => Colors {
            background: WHITE,
            foreground: RGBColor(42, 63, 95),
            grid: RGBColor(235, 235, 235),
        },
        Theme::Dark => Colors {
            background: RGBColor(17, 17, 17),
            foreground: RGBColor(242, 242, 242),
            grid: RGBColor(80, 80, 80),
        },
    }
}

fn font(size: u32, color: &RGBColor) -> TextStyle<'static> {
    ("sans-serif", size).into_font().color(color)
}

fn draw_view<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, view: &AnalyticalView) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let colors = theme_colors(view.chart.theme);
    root.fill(&colors.background).context("Failed to fill background")?;

    if view.table.is_empty() {
        return draw_placeholder(root, &view.chart, &colors);
    }

    match view.chart.kind {
        ChartKind::Bar => draw_bars(root, view, &colors),
        ChartKind::Pie => draw_pie(root, view, &colors),
        ChartKind::Scatter3d | ChartKind::Line3d => draw_3d(root, view, &colors),
    }
}

/// Title plus a "no data" notice
fn draw_placeholder<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    colors: &Colors,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, h) = root.dim_in_pixel();
    let centered = Pos::new(HPos::Center, VPos::Center);

    if let Some(title) = &spec.title {
        root.draw(&Text::new(
            title.clone(),
            (w as i32 / 2, 30),
            font(20, &colors.foreground).pos(centered),
        ))
        .context("Failed to draw title")?;
    }
    root.draw(&Text::new(
        "Sin datos",
        (w as i32 / 2, h as i32 / 2),
        font(18, &colors.foreground).pos(centered),
    ))
    .context("Failed to draw placeholder")?;

    Ok(())
}

fn column<'t>(table: &'t Table, name: &str) -> Result<Vec<&'t Value>> {
    table
        .column(name)
        .ok_or_else(|| anyhow!("Column '{}' not found in view table", name))
}

/// Distinct labels in order of first appearance
fn distinct_labels(values: &[&Value]) -> Vec<String> {
    distinct(values.iter().map(|v| v.label()))
}

fn distinct(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            labels.push(item);
        }
    }
    labels
}

fn format_number(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Label for a tick on a categorical axis whose categories sit at integer positions
fn category_label(categories: &[String], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

fn padded(min: f64, max: f64) -> Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return -1.0..1.0;
    }
    if min == max {
        return (min - 1.0)..(max + 1.0);
    }
    let padding = (max - min) * 0.05;
    (min - padding)..(max + padding)
}

/// One rectangle in category/value space
struct Bar {
    series: usize,
    lo: f64,
    hi: f64,
    base: f64,
    top: f64,
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    view: &AnalyticalView,
    colors: &Colors,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let spec = &view.chart;
    let table = &view.table;
    let horizontal = spec.orientation == Orientation::Horizontal;
    let (cat_col, val_col) = if horizontal {
        (&spec.y, &spec.x)
    } else {
        (&spec.x, &spec.y)
    };

    let cat_values = column(table, cat_col)?;
    let amounts: Vec<f64> = column(table, val_col)?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0))
        .collect();
    let categories = distinct_labels(&cat_values);
    let cat_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Series: one per color group, or one per category when coloring by the category itself
    let color_values = match &spec.color {
        Some(c) if c != cat_col => Some(column(table, c)?),
        _ => None,
    };
    let colored_by_category = spec.color.as_deref() == Some(cat_col.as_str());
    let series_labels = match &color_values {
        Some(values) => distinct_labels(values),
        None if colored_by_category => categories.clone(),
        None => Vec::new(),
    };
    let series_index: HashMap<&str, usize> = series_labels
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let n_series = series_labels.len().max(1);
    let dodge = color_values.is_some() && spec.bar_mode == BarMode::Group;

    let mut stack: HashMap<usize, f64> = HashMap::new();
    let mut bars = Vec::with_capacity(amounts.len());
    for (row, amount) in amounts.iter().enumerate() {
        let cat_label = cat_values[row].label();
        let cat = cat_index[cat_label.as_str()];
        let series = match &color_values {
            Some(values) => series_index[values[row].label().as_str()],
            None if colored_by_category => cat,
            None => 0,
        };
        let center = cat as f64;

        let (lo, hi) = if dodge {
            let width = 0.8 / n_series as f64;
            let offset = (series as f64 - (n_series as f64 - 1.0) / 2.0) * width;
            (center + offset - width / 2.0, center + offset + width / 2.0)
        } else {
            (center - 0.4, center + 0.4)
        };
        let base = if dodge { 0.0 } else { *stack.get(&cat).unwrap_or(&0.0) };
        let top = base + amount;
        if !dodge {
            stack.insert(cat, top);
        }

        bars.push(Bar { series, lo, hi, base, top });
    }

    let value_min = bars.iter().map(|b| b.base.min(b.top)).fold(0.0, f64::min);
    let value_max = bars.iter().map(|b| b.base.max(b.top)).fold(0.0, f64::max);
    let headroom = if spec.value_labels { 0.15 } else { 0.05 };
    let span = (value_max - value_min).max(1.0);
    let value_range = value_min..(value_max + span * headroom);
    let cat_range = -0.5..(categories.len() as f64 - 0.5);
    let (x_range, y_range) = if horizontal {
        (value_range, cat_range)
    } else {
        (cat_range, value_range)
    };

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(spec.title.as_deref().unwrap_or(""), font(20, &colors.foreground))
        .x_label_area_size(50)
        .y_label_area_size(if horizontal { 120 } else { 60 })
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    let cat_fmt = |v: &f64| category_label(&categories, *v);
    let val_fmt = |v: &f64| format_number(*v);
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_desc(spec.x_title())
            .y_desc(spec.y_title())
            .label_style(font(12, &colors.foreground))
            .axis_desc_style(font(14, &colors.foreground))
            .bold_line_style(colors.grid.stroke_width(1))
            .light_line_style(colors.background.stroke_width(0));
        if horizontal {
            mesh.disable_y_mesh()
                .y_labels(categories.len())
                .y_label_formatter(&cat_fmt)
                .x_label_formatter(&val_fmt);
        } else {
            mesh.disable_x_mesh()
                .x_labels(categories.len())
                .x_label_formatter(&cat_fmt)
                .y_label_formatter(&val_fmt);
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    let palette = if spec.color_sequence.is_empty() {
        ColorPalette::category10()
    } else {
        ColorPalette::from_names(&spec.color_sequence)
    };

    for series in 0..n_series {
        let color = palette.color(series);
        let rects = bars.iter().filter(|b| b.series == series).map(|b| {
            let corners = if horizontal {
                [(b.base, b.lo), (b.top, b.hi)]
            } else {
                [(b.lo, b.base), (b.hi, b.top)]
            };
            Rectangle::new(corners, color.filled())
        });
        let mut anno = chart.draw_series(rects).context("Failed to draw bars")?;
        if let Some(label) = series_labels.get(series) {
            anno.label(label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }

    if spec.value_labels {
        let style = if horizontal {
            font(12, &colors.foreground).pos(Pos::new(HPos::Left, VPos::Center))
        } else {
            font(12, &colors.foreground).pos(Pos::new(HPos::Center, VPos::Bottom))
        };
        chart
            .draw_series(bars.iter().map(|b| {
                let amount = b.top - b.base;
                let mid = (b.lo + b.hi) / 2.0;
                let at = if horizontal { (b.top, mid) } else { (mid, b.top) };
                Text::new(format!(" {} ", format_number(amount)), at, style.clone())
            }))
            .context("Failed to draw value labels")?;
    }

    if !series_labels.is_empty() {
        chart
            .configure_series_labels()
            .label_font(font(12, &colors.foreground))
            .background_style(&colors.background.mix(0.8))
            .border_style(&colors.grid)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_pie<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    view: &AnalyticalView,
    colors: &Colors,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let spec = &view.chart;
    let names = distinct_labels(&column(&view.table, &spec.x)?);
    let amounts: Vec<f64> = column(&view.table, &spec.y)?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0).max(0.0))
        .collect();
    let total: f64 = amounts.iter().sum();
    if total <= 0.0 {
        return draw_placeholder(root, spec, colors);
    }

    let titled;
    let area = match &spec.title {
        Some(title) => {
            titled = root
                .titled(title, font(20, &colors.foreground))
                .context("Failed to draw title")?;
            &titled
        }
        None => root,
    };

    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 * 0.4, h as f64 / 2.0);
    let radius = (w as f64 * 0.35).min(h as f64 * 0.42);
    let palette = ColorPalette::category10();
    let to_pixel = |angle: f64, r: f64| {
        (
            (center.0 + r * angle.cos()).round() as i32,
            (center.1 + r * angle.sin()).round() as i32,
        )
    };

    // Clockwise from twelve o'clock
    let mut start = -PI / 2.0;
    for (i, amount) in amounts.iter().enumerate() {
        let share = amount / total;
        let sweep = share * 2.0 * PI;
        let steps = ((share * 120.0).ceil() as usize).max(2);

        let mut points = vec![to_pixel(0.0, 0.0)];
        for step in 0..=steps {
            points.push(to_pixel(start + sweep * step as f64 / steps as f64, radius));
        }
        area.draw(&Polygon::new(points, palette.color(i).filled()))
            .context("Failed to draw sector")?;

        if share >= 0.03 {
            area.draw(&Text::new(
                format!("{:.1}%", share * 100.0),
                to_pixel(start + sweep / 2.0, radius * 0.65),
                font(13, &WHITE).pos(Pos::new(HPos::Center, VPos::Center)),
            ))
            .context("Failed to draw sector label")?;
        }
        start += sweep;
    }

    let legend_x = (w as f64 * 0.78) as i32;
    for (i, name) in names.iter().enumerate() {
        let y = 40 + i as i32 * 22;
        area.draw(&Rectangle::new(
            [(legend_x, y), (legend_x + 12, y + 12)],
            palette.color(i).filled(),
        ))
        .context("Failed to draw legend")?;
        area.draw(&Text::new(name.clone(), (legend_x + 18, y), font(13, &colors.foreground)))
            .context("Failed to draw legend")?;
    }

    Ok(())
}

/// Numeric axis, or categorical with categories at 0, 1, 2, ...
struct Axis {
    values: Vec<Option<f64>>,
    categories: Option<Vec<String>>,
    range: Range<f64>,
}

impl Axis {
    fn from_values(values: &[&Value]) -> Self {
        let numeric = values
            .iter()
            .all(|v| matches!(v, Value::Missing) || v.as_f64().is_some());

        if numeric {
            let nums: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
            let min = nums.iter().flatten().cloned().fold(f64::INFINITY, f64::min);
            let max = nums.iter().flatten().cloned().fold(f64::NEG_INFINITY, f64::max);
            return Axis {
                values: nums,
                categories: None,
                range: padded(min, max),
            };
        }

        let present: Vec<&Value> = values
            .iter()
            .copied()
            .filter(|v| !matches!(v, Value::Missing))
            .collect();
        let categories = distinct_labels(&present);
        let values = values
            .iter()
            .map(|v| match v {
                Value::Missing => None,
                v => categories.iter().position(|c| *c == v.label()).map(|i| i as f64),
            })
            .collect();
        let range = -0.5..(categories.len().max(1) as f64 - 0.5);

        Axis {
            values,
            categories: Some(categories),
            range,
        }
    }

    fn tick_label(&self, v: f64) -> String {
        match &self.categories {
            Some(categories) => category_label(categories, v),
            None => format_number(v),
        }
    }
}

fn draw_3d<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    view: &AnalyticalView,
    colors: &Colors,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let spec = &view.chart;
    let table = &view.table;
    let z_col = spec
        .z
        .as_deref()
        .ok_or_else(|| anyhow!("3-D view '{}' has no z column", view.id))?;

    let x = Axis::from_values(&column(table, &spec.x)?);
    let y = Axis::from_values(&column(table, &spec.y)?);
    let z = Axis::from_values(&column(table, z_col)?);

    let keys: Vec<String> = match &spec.color {
        Some(c) => column(table, c)?.iter().map(|v| v.label()).collect(),
        None => vec![String::new(); table.len()],
    };
    let series_labels = distinct(keys.iter().cloned());

    let palette = if spec.color_sequence.is_empty() {
        ColorPalette::category10()
    } else {
        ColorPalette::from_names(&spec.color_sequence)
    };

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(spec.title.as_deref().unwrap_or(""), font(20, &colors.foreground))
        .build_cartesian_3d(x.range.clone(), y.range.clone(), z.range.clone())
        .context("Failed to build 3-D chart")?;

    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.8;
        pb.into_matrix()
    });

    let fx = |v: &f64| x.tick_label(*v);
    let fy = |v: &f64| y.tick_label(*v);
    let fz = |v: &f64| z.tick_label(*v);
    {
        let mut axes = chart.configure_axes();
        axes.label_style(font(11, &colors.foreground))
            .x_formatter(&fx)
            .y_formatter(&fy)
            .z_formatter(&fz);
        if let Some(categories) = &x.categories {
            axes.x_labels(categories.len());
        }
        if let Some(categories) = &z.categories {
            axes.z_labels(categories.len());
        }
        axes.draw().context("Failed to draw axes")?;
    }

    let series_colors = palette.assign_colors(&series_labels);
    for label in &series_labels {
        let color = series_colors[label];
        let points: Vec<(f64, f64, f64)> = (0..table.len())
            .filter(|&row| keys[row] == *label)
            .filter_map(|row| Some((x.values[row]?, y.values[row]?, z.values[row]?)))
            .collect();

        let mut anno = match spec.kind {
            ChartKind::Line3d => {
                chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
                    .context("Failed to draw markers")?;
                chart
                    .draw_series(LineSeries::new(points, color.stroke_width(3)))
                    .context("Failed to draw line")?
            }
            _ => chart
                .draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))
                .context("Failed to draw points")?,
        };
        if !label.is_empty() {
            anno.label(label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }

    if series_labels.iter().any(|l| !l.is_empty()) {
        chart
            .configure_series_labels()
            .label_font(font(12, &colors.foreground))
            .background_style(&colors.background.mix(0.8))
            .border_style(&colors.grid)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::data::Dataset;
    use crate::pipeline::build_dashboard;

    fn make_view() -> AnalyticalView {
        let mut table = Table::new(vec!["Region".into(), "Participantes".into()]);
        table.push(vec!["Norte".into(), 12.0.into()]);
        table.push(vec!["Sur".into(), 7.5.into()]);
        AnalyticalView {
            id: "graph4".into(),
            chart: ChartSpec::new(ChartKind::Bar, "Participantes", "Region")
                .title("Total")
                .horizontal()
                .value_labels(),
            table,
        }
    }

    fn svg_options() -> RenderOptions {
        RenderOptions {
            format: OutputFormat::Svg,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(7.5), "7.50");
    }

    #[test]
    fn test_category_label() {
        let cats = vec!["A".to_string(), "B".to_string()];
        assert_eq!(category_label(&cats, 1.0), "B");
        assert_eq!(category_label(&cats, 0.5), "");
        assert_eq!(category_label(&cats, 2.0), "");
        assert_eq!(category_label(&cats, -1.0), "");
    }

    #[test]
    fn test_axis_detection() {
        let values = [Value::from("B"), Value::from("A"), Value::Missing, Value::from("B")];
        let refs: Vec<&Value> = values.iter().collect();
        let axis = Axis::from_values(&refs);
        assert_eq!(axis.categories, Some(vec!["B".to_string(), "A".to_string()]));
        assert_eq!(axis.values, vec![Some(0.0), Some(1.0), None, Some(0.0)]);

        let values = [Value::Number(2022.0), Value::from("2024")];
        let refs: Vec<&Value> = values.iter().collect();
        let axis = Axis::from_values(&refs);
        assert!(axis.categories.is_none());
        assert_eq!(axis.values, vec![Some(2022.0), Some(2024.0)]);
    }

    #[test]
    fn test_render_bar_svg() {
        let bytes = render_view(&make_view(), &svg_options()).unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Norte"));
    }

    #[test]
    fn test_render_png_signature() {
        let bytes = render_view(&make_view(), &RenderOptions::default()).unwrap();
        assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_oversized_png_is_an_error() {
        let options = RenderOptions {
            width: u32::MAX,
            height: u32::MAX,
            format: OutputFormat::Png,
        };
        let err = render_view(&make_view(), &options).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_render_empty_view() {
        let mut view = make_view();
        view.table.rows.clear();
        let svg = String::from_utf8(render_view(&view, &svg_options()).unwrap()).unwrap();
        assert!(svg.contains("Sin datos"));
    }

    #[test]
    fn test_render_every_dashboard_view() {
        let csv = std::fs::read_to_string("test/indicador.csv").unwrap();
        let data = Dataset::from_csv(csv.as_bytes()).unwrap();
        let dashboard = build_dashboard(&data, &DashboardConfig::default());
        for view in dashboard.successes() {
            let bytes = render_view(view, &svg_options()).unwrap();
            assert!(!bytes.is_empty(), "{} rendered nothing", view.id);
        }
        assert_eq!(dashboard.successes().count(), 7);
    }
}
