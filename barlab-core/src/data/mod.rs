//! Bar data: CSV loading and the forward-only feed

pub mod csv_source;
pub mod feed;

pub use csv_source::{load_csv, load_feed, read_csv, CsvOptions};
pub use feed::{BarFeed, History};
