//! Chart rendering.
//!
//! [`Canvas`] is a stateful figure in the matplotlib style: directives build
//! up the current figure and `show()` flushes it to the sink. Drawing a line
//! before `figure()` opens a single-panel figure implicitly.

pub mod figure;
pub mod recording;
pub mod svg;

pub use figure::{Figure, FigureBuilder, Line, Panel};
pub use recording::RecordingCanvas;
pub use svg::SvgCanvas;

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line has {x} dates but {y} values")]
    LengthMismatch { x: usize, y: usize },
}

pub trait Canvas {
    /// Start a new figure with `panels` vertically stacked panels.
    fn figure(&mut self, panels: usize);

    /// Direct subsequent directives at panel `index`.
    fn panel(&mut self, index: usize);

    /// Add a line to the current panel. Non-finite values break the line.
    fn line(&mut self, x: &[NaiveDate], y: &[f64], label: Option<&str>) -> Result<(), RenderError>;

    fn title(&mut self, text: &str);

    /// Title over the whole figure.
    fn suptitle(&mut self, text: &str);

    fn x_label(&mut self, text: &str);

    fn y_label(&mut self, text: &str);

    /// Show a legend for labelled lines in the current panel.
    fn legend(&mut self);

    /// Flush the current figure. A no-op when nothing was drawn.
    fn show(&mut self) -> Result<(), RenderError>;
}
