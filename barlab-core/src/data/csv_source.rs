//! CSV bar source: daily OHLCV in the Yahoo Finance download layout.
//!
//! Expected columns: `Date, Open, High, Low, Close, Volume` plus an optional
//! `Adj Close`. Header names are matched case-insensitively and ignore spaces
//! and underscores, so `adj_close` and `Adj Close` are the same column.
//!
//! Every row inside the date window must parse. A malformed row is a
//! `FeedError::Parse` carrying its line number; rows are never skipped.

use super::feed::BarFeed;
use crate::domain::Bar;
use crate::error::FeedError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Loading options for a CSV bar file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// First date to keep (inclusive).
    pub from_date: Option<NaiveDate>,
    /// Last date to keep (inclusive).
    pub to_date: Option<NaiveDate>,
    /// The file is ordered newest-first.
    pub reverse: bool,
    /// Scale OHLC (and volume) by `adj_close / close` when an adjusted close column exists.
    pub adjust_close: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            from_date: None,
            to_date: None,
            reverse: false,
            adjust_close: true,
        }
    }
}

impl CsvOptions {
    fn in_window(&self, date: NaiveDate) -> bool {
        self.from_date.map_or(true, |from| date >= from)
            && self.to_date.map_or(true, |to| date <= to)
    }
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, FeedError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| normalize_header(h) == name)
        };
        let require = |name: &'static str| find(name).ok_or(FeedError::MissingColumn(name));

        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            adj_close: find("adjclose"),
        })
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Load bars from a CSV file on disk.
pub fn load_csv(path: &Path, options: &CsvOptions) -> Result<Vec<Bar>, FeedError> {
    let file = std::fs::File::open(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file, options)
}

/// Load a CSV file straight into a ready-to-run feed.
pub fn load_feed(path: &Path, options: &CsvOptions) -> Result<BarFeed, FeedError> {
    BarFeed::new(load_csv(path, options)?)
}

/// Parse bars from any CSV reader. Returned bars are oldest first.
pub fn read_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Vec<Bar>, FeedError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_error(e, 1))?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut bars = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            csv_error(e, line)
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Blank trailing lines come through as a single empty field.
        if record.iter().all(str::is_empty) {
            continue;
        }

        let date = parse_date(field(&record, columns.date, "date", line)?, line)?;
        if !options.in_window(date) {
            continue;
        }

        let bar = parse_bar(&record, &columns, date, options.adjust_close, line)?;
        bars.push(bar);
    }

    if options.reverse {
        bars.reverse();
    }
    Ok(bars)
}

fn parse_bar(
    record: &csv::StringRecord,
    columns: &Columns,
    date: NaiveDate,
    adjust_close: bool,
    line: u64,
) -> Result<Bar, FeedError> {
    let open = parse_price(record, columns.open, "open", line)?;
    let high = parse_price(record, columns.high, "high", line)?;
    let low = parse_price(record, columns.low, "low", line)?;
    let close = parse_price(record, columns.close, "close", line)?;
    let volume = parse_number(record, columns.volume, "volume", line)?;

    if volume < 0.0 {
        return Err(parse_err(line, format!("negative volume {volume}")));
    }
    if high < low {
        return Err(parse_err(line, format!("high {high} is below low {low}")));
    }

    let mut bar = Bar::new(date, open, high, low, close, volume);

    if adjust_close {
        if let Some(idx) = columns.adj_close {
            let adj = parse_price(record, idx, "adj close", line)?;
            let factor = adj / close;
            bar.open *= factor;
            bar.high *= factor;
            bar.low *= factor;
            bar.close = adj;
            bar.volume /= factor;
        }
    }

    Ok(bar)
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<&'r str, FeedError> {
    match record.get(idx) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(parse_err(line, format!("missing {name}"))),
    }
}

fn parse_date(raw: &str, line: u64) -> Result<NaiveDate, FeedError> {
    // Timestamps such as "2000-01-03 00:00:00" keep only the date part.
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| parse_err(line, format!("invalid date '{raw}'")))
}

fn parse_number(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<f64, FeedError> {
    let raw = field(record, idx, name, line)?;
    let value: f64 = raw
        .parse()
        .map_err(|_| parse_err(line, format!("invalid {name} '{raw}'")))?;
    if !value.is_finite() {
        return Err(parse_err(line, format!("non-finite {name} '{raw}'")));
    }
    Ok(value)
}

fn parse_price(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<f64, FeedError> {
    let value = parse_number(record, idx, name, line)?;
    if value <= 0.0 {
        return Err(parse_err(line, format!("{name} must be positive, got {value}")));
    }
    Ok(value)
}

fn parse_err(line: u64, message: String) -> FeedError {
    FeedError::Parse { line, message }
}

fn csv_error(err: csv::Error, line: u64) -> FeedError {
    FeedError::Parse {
        line,
        message: err.to_string(),
    }
}
