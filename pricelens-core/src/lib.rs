//! PriceLens Core: price loading, cleaning and exploratory analysis.
//!
//! - Providers fetch daily bars per ticker (Yahoo Finance, CSV files, synthetic)
//! - `DataProcessor` loads every ticker into a `DataMapping` and fills gaps
//! - `ExploratoryAnalysis` adds returns and rolling volatility, plots closing
//!   prices and runs seasonal decomposition
//! - Charts go through the `Canvas` trait; `SvgCanvas` writes SVG files

pub mod analysis;
pub mod config;
pub mod data;
pub mod render;

pub use analysis::{DecompositionOutcome, ExploratoryAnalysis};
pub use config::AnalysisConfig;
pub use data::{DataMapping, DataProcessor, PriceSeries};
