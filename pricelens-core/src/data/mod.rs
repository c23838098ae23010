//! Price retrieval, per-ticker frames and cleaning

pub mod csv_source;
pub mod mapping;
pub mod processor;
pub mod provider;
pub mod series;
pub mod synthetic;
pub mod yahoo;

pub use csv_source::CsvProvider;
pub use mapping::DataMapping;
pub use processor::{clean_mapping, DataProcessor};
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar, SchemaError};
pub use series::PriceSeries;
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
