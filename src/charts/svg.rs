//! Minimal SVG chart primitives.
//!
//! Charts are plain SVG strings so they can be written to disk as-is or
//! rasterized for the report.

use super::ChartError;
use std::f64::consts::PI;
use std::fmt::Write as _;

pub const PALETTE: [&str; 7] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D", "#FFC0CB",
];

const FONT: &str = "Helvetica, Arial, sans-serif";
const MARGIN_X: f64 = 64.0;
const MARGIN_TOP: f64 = 48.0;
const MARGIN_BOTTOM: f64 = 44.0;

pub fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Short axis label: `12500` → `12.5k`.
fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

struct Canvas {
    width: f64,
    height: f64,
    body: String,
}

impl Canvas {
    fn new(width: u32, height: u32, title: &str) -> Result<Self, ChartError> {
        if width < 2 * MARGIN_X as u32 || height < (MARGIN_TOP + MARGIN_BOTTOM) as u32 + 20 {
            return Err(ChartError::TooSmall { width, height });
        }
        let mut canvas = Self {
            width: f64::from(width),
            height: f64::from(height),
            body: String::new(),
        };
        let _ = write!(
            canvas.body,
            r##"<rect width="{w}" height="{h}" fill="#ffffff"/><text x="{cx:.1}" y="28" text-anchor="middle" font-family="{FONT}" font-size="18" font-weight="bold" fill="#1f2937">{t}</text>"##,
            w = width,
            h = height,
            cx = canvas.width / 2.0,
            t = escape_xml(title),
        );
        Ok(canvas)
    }

    fn plot_left(&self) -> f64 {
        MARGIN_X
    }

    fn plot_right(&self) -> f64 {
        self.width - MARGIN_X
    }

    fn plot_top(&self) -> f64 {
        MARGIN_TOP
    }

    fn plot_bottom(&self) -> f64 {
        self.height - MARGIN_BOTTOM
    }

    fn text(&mut self, x: f64, y: f64, anchor: &str, size: u32, fill: &str, content: &str) {
        let _ = write!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="{anchor}" font-family="{FONT}" font-size="{size}" fill="{fill}">{}</text>"#,
            escape_xml(content)
        );
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str) {
        let _ = write!(
            self.body,
            r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{stroke}" stroke-width="1"/>"#
        );
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
        let _ = write!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{fill}"/>"#,
            w.max(0.0),
            h.max(0.0)
        );
    }

    fn legend(&mut self, entries: &[(&str, &str)]) {
        let mut x = self.plot_left();
        let y = self.height - 12.0;
        for (name, color) in entries {
            self.rect(x, y - 10.0, 10.0, 10.0, color);
            self.text(x + 14.0, y, "start", 12, "#374151", name);
            x += 24.0 + 7.0 * name.chars().count() as f64;
        }
    }

    fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

/// One line of a [`line_chart`].
#[derive(Debug, Clone)]
pub struct LineSeries<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
    pub color: &'a str,
    /// Fixed y range; `0..=max` when absent
    pub domain: Option<(f64, f64)>,
}

fn domain_of(series: &LineSeries<'_>) -> (f64, f64) {
    let (lo, hi) = series.domain.unwrap_or_else(|| {
        let max = series.values.iter().copied().fold(0.0_f64, f64::max);
        (0.0, max)
    });
    if hi > lo {
        (lo, hi)
    } else {
        (lo, lo + 1.0)
    }
}

/// Lines over shared x labels. The first series' scale is drawn on the left
/// axis, the second (if any) on the right.
pub fn line_chart(
    title: &str,
    labels: &[String],
    series: &[LineSeries<'_>],
    width: u32,
    height: u32,
) -> Result<String, ChartError> {
    if labels.is_empty() || series.iter().all(|s| s.values.is_empty()) {
        return Err(ChartError::Empty { chart: title.to_string() });
    }
    let mut canvas = Canvas::new(width, height, title)?;
    let (left, right, top, bottom) = (canvas.plot_left(), canvas.plot_right(), canvas.plot_top(), canvas.plot_bottom());
    let step = if labels.len() > 1 {
        (right - left) / (labels.len() - 1) as f64
    } else {
        0.0
    };
    let x_at = |i: usize| if labels.len() > 1 { left + step * i as f64 } else { (left + right) / 2.0 };

    canvas.line(left, bottom, right, bottom, "#9ca3af");
    let every = labels.len().div_ceil(8).max(1);
    for (i, label) in labels.iter().enumerate().filter(|(i, _)| i % every == 0) {
        canvas.text(x_at(i), bottom + 16.0, "middle", 11, "#4b5563", label);
    }

    for (index, s) in series.iter().enumerate() {
        let (lo, hi) = domain_of(s);
        let y_at = |v: f64| bottom - (v.clamp(lo, hi) - lo) / (hi - lo) * (bottom - top);

        let (axis_x, anchor) = if index == 0 { (left - 6.0, "end") } else { (right + 6.0, "start") };
        if index < 2 {
            canvas.text(axis_x, top + 4.0, anchor, 11, s.color, &compact(hi));
            canvas.text(axis_x, bottom, anchor, 11, s.color, &compact(lo));
        }

        let points: Vec<String> = s
            .values
            .iter()
            .take(labels.len())
            .enumerate()
            .map(|(i, v)| format!("{:.1},{:.1}", x_at(i), y_at(*v)))
            .collect();
        let _ = write!(
            canvas.body,
            r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
            s.color,
            points.join(" ")
        );
    }

    let legend: Vec<(&str, &str)> = series.iter().map(|s| (s.name, s.color)).collect();
    canvas.legend(&legend);
    Ok(canvas.finish())
}

/// Vertical bars with the value above each bar.
pub fn bar_chart(title: &str, bars: &[(String, f64)], width: u32, height: u32) -> Result<String, ChartError> {
    if bars.is_empty() {
        return Err(ChartError::Empty { chart: title.to_string() });
    }
    let mut canvas = Canvas::new(width, height, title)?;
    let (left, right, top, bottom) = (canvas.plot_left(), canvas.plot_right(), canvas.plot_top(), canvas.plot_bottom());
    let max = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max).max(1.0);
    let slot = (right - left) / bars.len() as f64;
    let bar_width = slot * 0.6;

    canvas.line(left, bottom, right, bottom, "#9ca3af");
    for (i, (label, value)) in bars.iter().enumerate() {
        let h = value.max(0.0) / max * (bottom - top - 16.0);
        let x = left + slot * i as f64 + (slot - bar_width) / 2.0;
        canvas.rect(x, bottom - h, bar_width, h, PALETTE[i % PALETTE.len()]);
        canvas.text(x + bar_width / 2.0, bottom - h - 4.0, "middle", 11, "#111827", &compact(*value));
        canvas.text(x + bar_width / 2.0, bottom + 16.0, "middle", 11, "#4b5563", label);
    }
    Ok(canvas.finish())
}

/// Horizontal bars, one row per entry, labels on the left.
pub fn horizontal_bar_chart(title: &str, bars: &[(String, f64)], width: u32, height: u32) -> Result<String, ChartError> {
    if bars.is_empty() {
        return Err(ChartError::Empty { chart: title.to_string() });
    }
    let mut canvas = Canvas::new(width, height, title)?;
    let label_width = 120.0;
    let left = canvas.plot_left() + label_width;
    let (right, top, bottom) = (canvas.plot_right(), canvas.plot_top(), canvas.plot_bottom());
    let max = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max).max(1.0);
    let row = (bottom - top) / bars.len() as f64;

    for (i, (label, value)) in bars.iter().enumerate() {
        let y = top + row * i as f64;
        let w = value.max(0.0) / max * (right - left - 40.0);
        canvas.rect(left, y + row * 0.15, w, row * 0.7, PALETTE[0]);
        canvas.text(left - 6.0, y + row * 0.62, "end", 12, "#374151", label);
        canvas.text(left + w + 4.0, y + row * 0.62, "start", 11, "#111827", &compact(*value));
    }
    Ok(canvas.finish())
}

/// Pie with a legend showing each slice's share. Zero slices are left out.
pub fn pie_chart(title: &str, slices: &[(String, f64)], width: u32, height: u32) -> Result<String, ChartError> {
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return Err(ChartError::Empty { chart: title.to_string() });
    }
    let mut canvas = Canvas::new(width, height, title)?;
    let (top, bottom) = (canvas.plot_top(), canvas.plot_bottom());
    let radius = ((bottom - top) / 2.0).min(canvas.width / 4.0) - 4.0;
    let cx = canvas.plot_left() + radius;
    let cy = (top + bottom) / 2.0;

    let mut angle = -PI / 2.0;
    let mut legend_y = top + 12.0;
    for (i, (label, value)) in slices.iter().enumerate() {
        if *value <= 0.0 {
            continue;
        }
        let color = PALETTE[i % PALETTE.len()];
        let share = value / total;
        if share >= 0.9999 {
            let _ = write!(canvas.body, r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{radius:.1}" fill="{color}"/>"#);
        } else {
            let end = angle + share * 2.0 * PI;
            let (x1, y1) = (cx + radius * angle.cos(), cy + radius * angle.sin());
            let (x2, y2) = (cx + radius * end.cos(), cy + radius * end.sin());
            let large_arc = u8::from(share > 0.5);
            let _ = write!(
                canvas.body,
                r#"<path d="M{cx:.1},{cy:.1} L{x1:.1},{y1:.1} A{radius:.1},{radius:.1} 0 {large_arc} 1 {x2:.1},{y2:.1} Z" fill="{color}"/>"#
            );
            angle = end;
        }

        let legend_x = cx + radius + 24.0;
        canvas.rect(legend_x, legend_y - 10.0, 10.0, 10.0, color);
        canvas.text(
            legend_x + 16.0,
            legend_y,
            "start",
            12,
            "#374151",
            &format!("{label}: {:.0}%", share * 100.0),
        );
        legend_y += 18.0;
    }
    Ok(canvas.finish())
}
