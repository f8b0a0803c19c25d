use std::{
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use snafu::{Backtrace, ResultExt, Snafu};
use tracing::info;

use crate::models::row::SeriesRow;

/// Rows printed to stdout when no output file is given.
pub const DEFAULT_PREVIEW_ROWS: usize = 25;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The destination could not be created or written.
    #[snafu(display("Failed to write data to {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// A row could not be encoded as CSV.
    #[snafu(display("CSV encoding error: {source}"))]
    Csv {
        source: csv::Error,
        backtrace: Backtrace,
    },
}

/// A destination for parsed rows.
#[async_trait]
pub trait RowSink {
    /// What a successful write reports back, e.g. the file written or a row count.
    type Output;

    async fn write(&self, rows: &[SeriesRow]) -> Result<Self::Output, SinkError>;
}

/// Writes rows as CSV with the full header, even when there are no rows.
pub fn write_csv<W: Write>(rows: &[SeriesRow], out: W) -> Result<(), SinkError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(SeriesRow::COLUMNS).context(CsvSnafu)?;
    for row in rows {
        writer.serialize(row).context(CsvSnafu)?;
    }
    writer
        .flush()
        .map_err(csv::Error::from)
        .context(CsvSnafu)?;
    Ok(())
}

/// CSV file at a fixed path. Parent directories are created as needed.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RowSink for CsvFileSink {
    type Output = PathBuf;

    async fn write(&self, rows: &[SeriesRow]) -> Result<PathBuf, SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context(IoSnafu { path: parent })?;
        }
        let file = std::fs::File::create(&self.path).context(IoSnafu { path: &self.path })?;
        write_csv(rows, std::io::BufWriter::new(file))?;
        info!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(self.path.clone())
    }
}

/// Prints the first `limit` rows to stdout as CSV.
#[derive(Debug, Clone, Copy)]
pub struct StdoutPreview {
    pub limit: usize,
}

impl Default for StdoutPreview {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PREVIEW_ROWS,
        }
    }
}

#[async_trait]
impl RowSink for StdoutPreview {
    /// Number of rows printed.
    type Output = usize;

    async fn write(&self, rows: &[SeriesRow]) -> Result<usize, SinkError> {
        let shown = &rows[..rows.len().min(self.limit)];
        let stdout = std::io::stdout();
        write_csv(shown, stdout.lock())?;
        if rows.len() > shown.len() {
            println!("... {} more rows", rows.len() - shown.len());
        }
        Ok(shown.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(id: &str, value: Option<f64>) -> SeriesRow {
        SeriesRow {
            series_id: id.into(),
            alias: Some("cpi|headline".into()),
            year: 2024,
            period: "M01".into(),
            period_name: Some("January".into()),
            value,
            latest: Some(true),
            seasonality: None,
            series_title: Some("All items, U.S. city average".into()),
            survey_name: None,
            measure_data_type: None,
            area: None,
            item: None,
            footnotes: Some("preliminary; revised".into()),
        }
    }

    #[test]
    fn empty_output_still_has_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), SeriesRow::COLUMNS.join(","));
    }

    #[test]
    fn rows_follow_header_order() {
        let mut buf = Vec::new();
        write_csv(&[row("CUUR0000SA0", Some(308.417)), row("CUSR0000SA0", None)], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "CUUR0000SA0,cpi|headline,2024,M01,January,308.417,true,,\"All items, U.S. city average\",,,,,preliminary; revised"
        );
        assert!(lines[2].starts_with("CUSR0000SA0,cpi|headline,2024,M01,January,,true"));
    }

    #[tokio::test]
    async fn file_sink_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let sink = CsvFileSink::new(dir.path().join("out/nested/cpi.csv"));
        let path = sink.write(&[row("CUUR0000SA0", Some(1.0))]).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
