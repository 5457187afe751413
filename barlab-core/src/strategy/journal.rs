//! Line sinks for a strategy's human-readable log.
//!
//! The journal carries the strategy's own narrative ("BUY CREATE, 8.00").
//! Engine diagnostics go through `tracing` instead.

use chrono::NaiveDate;

/// Receives one dated line per strategy event.
pub trait Journal: Send {
    fn record(&mut self, date: NaiveDate, text: &str);
}

impl<J: Journal + ?Sized> Journal for &mut J {
    fn record(&mut self, date: NaiveDate, text: &str) {
        (**self).record(date, text);
    }
}

/// Prints `"{date}, {text}"` to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutJournal;

impl Journal for StdoutJournal {
    fn record(&mut self, date: NaiveDate, text: &str) {
        println!("{}", format_line(date, text));
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    lines: Vec<String>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl Journal for MemoryJournal {
    fn record(&mut self, date: NaiveDate, text: &str) {
        self.lines.push(format_line(date, text));
    }
}

/// Discards everything. Used by parameter sweeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl Journal for NullJournal {
    fn record(&mut self, _date: NaiveDate, _text: &str) {}
}

fn format_line(date: NaiveDate, text: &str) -> String {
    format!("{}, {}", date.format("%Y-%m-%d"), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_journal_prefixes_iso_date() {
        let mut journal = MemoryJournal::new();
        journal.record(NaiveDate::from_ymd_opt(2000, 1, 3).unwrap(), "Close, 8.00");
        assert_eq!(journal.lines(), ["2000-01-03, Close, 8.00"]);
    }

    #[test]
    fn borrowed_journal_writes_through() {
        fn write<J: Journal>(mut journal: J) {
            journal.record(NaiveDate::from_ymd_opt(2000, 1, 4).unwrap(), "Close, 9.00");
        }

        let mut journal = MemoryJournal::new();
        write(&mut journal);
        assert_eq!(journal.into_lines(), vec!["2000-01-04, Close, 9.00".to_string()]);
    }

    #[test]
    fn null_journal_accepts_anything() {
        let mut journal = NullJournal;
        journal.record(NaiveDate::from_ymd_opt(2000, 1, 3).unwrap(), "ignored");
    }
}
