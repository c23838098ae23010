//! Canvas that keeps shown figures in memory.

use super::figure::{Figure, FigureBuilder};
use super::{Canvas, RenderError};
use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    builder: FigureBuilder,
    shown: Vec<Figure>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every figure flushed by `show()`, oldest first.
    pub fn shown(&self) -> &[Figure] {
        &self.shown
    }
}

impl Canvas for RecordingCanvas {
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
        if let Some(figure) = self.builder.take() {
            self.shown.push(figure);
        }
        Ok(())
    }
}
