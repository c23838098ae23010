//! In-memory figure model shared by every canvas.

use super::RenderError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub label: Option<String>,
    pub x: Vec<NaiveDate>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Panel {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub legend: bool,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Figure {
    pub suptitle: Option<String>,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(panels: usize) -> Self {
        Self {
            suptitle: None,
            panels: vec![Panel::default(); panels.max(1)],
        }
    }

    /// Text used to name the figure: the suptitle, else the first panel title.
    pub fn heading(&self) -> Option<&str> {
        self.suptitle
            .as_deref()
            .or_else(|| self.panels.iter().find_map(|p| p.title.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.panels.iter().all(|p| p.lines.is_empty())
    }
}

/// Applies canvas directives to a figure under construction.
#[derive(Debug, Default)]
pub struct FigureBuilder {
    current: Option<Figure>,
    active: usize,
}

impl FigureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn figure(&mut self, panels: usize) {
        self.current = Some(Figure::new(panels));
        self.active = 0;
    }

    pub fn panel(&mut self, index: usize) {
        let figure = self.current.get_or_insert_with(|| Figure::new(1));
        if index >= figure.panels.len() {
            figure.panels.resize(index + 1, Panel::default());
        }
        self.active = index;
    }

    fn active_panel(&mut self) -> &mut Panel {
        let figure = self.current.get_or_insert_with(|| Figure::new(1));
        let index = self.active.min(figure.panels.len() - 1);
        &mut figure.panels[index]
    }

    pub fn line(&mut self, x: &[NaiveDate], y: &[f64], label: Option<&str>) -> Result<(), RenderError> {
        if x.len() != y.len() {
            return Err(RenderError::LengthMismatch { x: x.len(), y: y.len() });
        }
        self.active_panel().lines.push(Line {
            label: label.map(str::to_string),
            x: x.to_vec(),
            y: y.to_vec(),
        });
        Ok(())
    }

    pub fn title(&mut self, text: &str) {
        self.active_panel().title = Some(text.to_string());
    }

    pub fn suptitle(&mut self, text: &str) {
        self.current.get_or_insert_with(|| Figure::new(1)).suptitle = Some(text.to_string());
    }

    pub fn x_label(&mut self, text: &str) {
        self.active_panel().x_label = Some(text.to_string());
    }

    pub fn y_label(&mut self, text: &str) {
        self.active_panel().y_label = Some(text.to_string());
    }

    pub fn legend(&mut self) {
        self.active_panel().legend = true;
    }

    /// Take the finished figure, leaving the builder empty.
    pub fn take(&mut self) -> Option<Figure> {
        self.active = 0;
        self.current.take().filter(|f| !f.is_empty())
    }
}
