//! SVG file sink.
//!
//! Every shown figure is written to `{output_dir}/{NN}_{slug}.svg`, where `NN`
//! counts figures shown by this canvas and `slug` comes from the figure
//! heading. Panels stack vertically and share the figure width.

use super::figure::{Figure, FigureBuilder, Panel};
use super::{Canvas, RenderError};
use chrono::{Datelike, NaiveDate};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const WIDTH: f64 = 960.0;
const SINGLE_PANEL_HEIGHT: f64 = 360.0;
const STACKED_PANEL_HEIGHT: f64 = 190.0;
const SUPTITLE_HEIGHT: f64 = 30.0;
const PAD_LEFT: f64 = 64.0;
const PAD_RIGHT: f64 = 24.0;
const PAD_TOP: f64 = 28.0;
const PAD_BOTTOM: f64 = 40.0;
const MAX_TICKS: usize = 8;
const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

pub struct SvgCanvas {
    output_dir: PathBuf,
    builder: FigureBuilder,
    written: Vec<PathBuf>,
}

impl SvgCanvas {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            builder: FigureBuilder::new(),
            written: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Paths of every file written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn next_path(&self, figure: &Figure) -> PathBuf {
        let slug = slugify(figure.heading().unwrap_or("figure"));
        self.output_dir
            .join(format!("{:02}_{slug}.svg", self.written.len() + 1))
    }
}

impl Canvas for SvgCanvas {
    fn figure(&mut self, panels: usize) {
        self.builder.figure(panels);
    }

    fn panel(&mut self, index: usize) {
        self.builder.panel(index);
    }

    fn line(&mut self, x: &[NaiveDate], y: &[f64], label: Option<&str>) -> Result<(), RenderError> {
        self.builder.line(x, y, label)
    }

    fn title(&mut self, text: &str) {
        self.builder.title(text);
    }

    fn suptitle(&mut self, text: &str) {
        self.builder.suptitle(text);
    }

    fn x_label(&mut self, text: &str) {
        self.builder.x_label(text);
    }

    fn y_label(&mut self, text: &str) {
        self.builder.y_label(text);
    }

    fn legend(&mut self) {
        self.builder.legend();
    }

    fn show(&mut self) -> Result<(), RenderError> {
        let Some(figure) = self.builder.take() else {
            return Ok(());
        };

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| RenderError::Io { path, source }
        };

        fs::create_dir_all(&self.output_dir).map_err(io_err(&self.output_dir))?;
        let path = self.next_path(&figure);
        fs::write(&path, render_figure(&figure)).map_err(io_err(&path))?;

        info!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Render a whole figure to an SVG document.
pub fn render_figure(figure: &Figure) -> String {
    let panel_height = if figure.panels.len() == 1 {
        SINGLE_PANEL_HEIGHT
    } else {
        STACKED_PANEL_HEIGHT
    };
    let top = if figure.suptitle.is_some() { SUPTITLE_HEIGHT } else { 0.0 };
    let height = top + panel_height * figure.panels.len() as f64;

    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {height}" width="{WIDTH}" height="{height}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#444}}</style><rect width="100%" height="100%" fill="#ffffff" />"##
    );

    if let Some(text) = &figure.suptitle {
        let _ = write!(
            svg,
            r#"<text x="{x:.2}" y="20" text-anchor="middle" font-size="15" font-weight="bold">{text}</text>"#,
            x = WIDTH / 2.0,
            text = escape(text)
        );
    }

    for (i, panel) in figure.panels.iter().enumerate() {
        let offset = top + panel_height * i as f64;
        let _ = write!(svg, r#"<g transform="translate(0,{offset:.2})">"#);
        render_panel(&mut svg, panel, panel_height);
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

fn render_panel(svg: &mut String, panel: &Panel, height: f64) {
    let plot_w = WIDTH - PAD_LEFT - PAD_RIGHT;
    let plot_h = height - PAD_TOP - PAD_BOTTOM;

    if let Some(title) = &panel.title {
        let _ = write!(
            svg,
            r#"<text x="{x:.2}" y="18" text-anchor="middle" font-size="13">{t}</text>"#,
            x = PAD_LEFT + plot_w / 2.0,
            t = escape(title)
        );
    }

    let _ = write!(
        svg,
        r##"<rect x="{PAD_LEFT}" y="{PAD_TOP}" width="{plot_w:.2}" height="{plot_h:.2}" fill="none" stroke="#999" stroke-width="1" />"##
    );

    let (Some((x_min, x_max)), Some((y_min, y_max))) = (date_extent(panel), value_extent(panel))
    else {
        return;
    };

    let sx = |date: NaiveDate| {
        let span = (x_max - x_min).num_days().max(1) as f64;
        PAD_LEFT + (date - x_min).num_days() as f64 / span * plot_w
    };
    let sy = |value: f64| PAD_TOP + (1.0 - (value - y_min) / (y_max - y_min)) * plot_h;

    // Y extent labels
    for value in [y_min, (y_min + y_max) / 2.0, y_max] {
        let y = sy(value);
        let _ = write!(
            svg,
            r##"<line x1="{PAD_LEFT}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#eeeeee" stroke-width="0.5" /><text x="{tx:.2}" y="{ty:.2}" text-anchor="end">{label}</text>"##,
            x2 = PAD_LEFT + plot_w,
            tx = PAD_LEFT - 6.0,
            ty = y + 4.0,
            label = format_value(value)
        );
    }

    // Time axis
    for date in time_ticks(x_min, x_max) {
        let x = sx(date);
        let _ = write!(
            svg,
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#999" stroke-width="1" /><text x="{x:.2}" y="{ty:.2}" text-anchor="middle">{label}</text>"##,
            y1 = PAD_TOP + plot_h,
            y2 = PAD_TOP + plot_h + 4.0,
            ty = PAD_TOP + plot_h + 16.0,
            label = date.format("%Y-%m")
        );
    }

    for (i, line) in panel.lines.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        for segment in finite_segments(&line.x, &line.y) {
            let points = segment
                .iter()
                .map(|(d, v)| format!("{:.2},{:.2}", sx(*d), sy(*v)))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(
                svg,
                r#"<polyline fill="none" stroke="{color}" stroke-width="1.4" points="{points}" />"#
            );
        }
    }

    if let Some(label) = &panel.x_label {
        let _ = write!(
            svg,
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{l}</text>"#,
            x = PAD_LEFT + plot_w / 2.0,
            y = height - 6.0,
            l = escape(label)
        );
    }
    if let Some(label) = &panel.y_label {
        let cy = PAD_TOP + plot_h / 2.0;
        let _ = write!(
            svg,
            r#"<text x="14" y="{cy:.2}" text-anchor="middle" transform="rotate(-90 14 {cy:.2})">{l}</text>"#,
            l = escape(label)
        );
    }

    if panel.legend {
        let mut y = PAD_TOP + 16.0;
        let x = PAD_LEFT + 12.0;
        for (i, line) in panel.lines.iter().enumerate() {
            let Some(label) = &line.label else {
                continue;
            };
            let color = PALETTE[i % PALETTE.len()];
            let _ = write!(
                svg,
                r##"<line x1="{x:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="2" /><text x="{tx:.2}" y="{y:.2}" text-anchor="start" fill="#333">{l}</text>"##,
                ly = y - 4.0,
                x2 = x + 20.0,
                tx = x + 26.0,
                l = escape(label)
            );
            y += 16.0;
        }
    }
}

fn date_extent(panel: &Panel) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = panel.lines.iter().flat_map(|l| l.x.iter().copied());
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

fn value_extent(panel: &Panel) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for value in panel.lines.iter().flat_map(|l| l.y.iter()) {
        if value.is_finite() {
            min_v = min_v.min(*value);
            max_v = max_v.max(*value);
        }
    }
    if !min_v.is_finite() {
        return None;
    }
    if (max_v - min_v).abs() < f64::EPSILON {
        let adjust = if min_v.abs() > 1.0 { min_v.abs() * 0.05 } else { 1.0 };
        return Some((min_v - adjust, max_v + adjust));
    }
    let pad = (max_v - min_v) * 0.05;
    Some((min_v - pad, max_v + pad))
}

/// Runs of consecutive finite points.
fn finite_segments(x: &[NaiveDate], y: &[f64]) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (d, v) in x.iter().zip(y) {
        if v.is_finite() {
            current.push((*d, *v));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// First-of-month ticks between the bounds, thinned to at most `MAX_TICKS`.
fn time_ticks(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) else {
            break;
        };
        if date > end {
            break;
        }
        if date >= start {
            months.push(date);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    let step = months.len().div_ceil(MAX_TICKS).max(1);
    months.into_iter().step_by(step).collect()
}

fn format_value(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{value:.0}")
    } else if value.abs() >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.3}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "figure".to_string()
    } else {
        slug
    }
}
