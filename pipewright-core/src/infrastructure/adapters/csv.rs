// pipewright-core/src/infrastructure/adapters/csv.rs

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::DomainError;
use crate::domain::pipeline::{Backend, ConnectionConfig, TableRef, WriteMode};
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{atomic_write, has_content, remove_if_exists};
use crate::ports::connector::Connector;

/// A delimited text file. The whole file is the "table": `TableRef` only
/// matters to SQL targets.
#[derive(Debug)]
pub struct CsvConnector {
    name: String,
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl CsvConnector {
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, EtlError> {
        let p = &config.params;
        let path = config.require(&p.file_path, "file_path")?.clone();
        let delimiter = parse_delimiter(p.delimiter.as_deref().unwrap_or(","))
            .ok_or_else(|| {
                EtlError::config(format!(
                    "Connection '{}': delimiter must be a single byte, got {:?}",
                    config.name,
                    p.delimiter.as_deref().unwrap_or_default()
                ))
            })?;
        let encoding = match p.encoding.as_deref() {
            None => UTF_8,
            Some(label) => Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                EtlError::config(format!(
                    "Connection '{}': unknown encoding '{}'",
                    config.name, label
                ))
            })?,
        };
        Ok(Self {
            name: config.name.clone(),
            path,
            delimiter,
            encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_text(&self) -> Result<String, EtlError> {
        if !self.path.exists() {
            return Err(InfrastructureError::connection(format!(
                "file not found: {}",
                self.path.display()
            ))
            .into());
        }
        let bytes = std::fs::read(&self.path)?;
        let (text, _, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            return Err(InfrastructureError::format(format!(
                "{} is not valid {}",
                self.path.display(),
                self.encoding.name()
            ))
            .into());
        }
        Ok(text.into_owned())
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }

    fn render(&self, data: &Dataset, with_header: bool) -> Result<String, EtlError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        if with_header {
            writer
                .write_record(data.column_names())
                .map_err(InfrastructureError::format)?;
        }
        for row in data.rows() {
            writer
                .write_record(row.iter().map(|v| v.render()))
                .map_err(InfrastructureError::format)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| InfrastructureError::format(e.error()))?;
        String::from_utf8(bytes).map_err(|e| InfrastructureError::format(e).into())
    }

    /// Header of the existing file and whether any record follows it.
    fn layout(&self) -> Result<(Vec<String>, bool), EtlError> {
        let text = self.load_text()?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());
        let header = reader
            .headers()
            .map_err(InfrastructureError::format)?
            .iter()
            .map(str::to_string)
            .collect();
        let has_rows = reader.records().next().is_some();
        Ok((header, has_rows))
    }
}

/// Accepts `;`, `';'` or `"\t"` style values; `\t` spelled out means tab.
fn parse_delimiter(raw: &str) -> Option<u8> {
    let trimmed = raw.trim_matches(|c| c == '\'' || c == '"');
    match trimmed {
        "\\t" => Some(b'\t'),
        s if s.len() == 1 => s.bytes().next(),
        _ => None,
    }
}

#[async_trait]
impl Connector for CsvConnector {
    fn backend(&self) -> Backend {
        Backend::Csv
    }

    #[instrument(skip(self, _query), fields(connection = %self.name))]
    async fn read(&mut self, _query: Option<&str>) -> Result<Dataset, EtlError> {
        let text = self.load_text()?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let names: Vec<String> = reader
            .headers()
            .map_err(InfrastructureError::format)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(InfrastructureError::format)?;
            rows.push(record.iter().map(Value::infer).collect());
        }

        let data = Dataset::from_rows(names, rows)?;
        info!("Read {} rows from {}", data.row_count(), self.path.display());
        Ok(data)
    }

    #[instrument(skip(self, data, _target), fields(connection = %self.name))]
    async fn write(
        &mut self,
        data: &Dataset,
        _target: &TableRef,
        mode: WriteMode,
    ) -> Result<u64, EtlError> {
        if data.width() == 0 {
            warn!("Dataset has no columns, nothing written");
            return Ok(0);
        }

        match mode {
            WriteMode::Append if has_content(&self.path) => {
                let (header, has_rows) = self.layout()?;
                let names = data.column_names();
                if header.iter().map(String::as_str).eq(names.iter().copied()) {
                    let body = self.render(data, false)?;
                    let mut file = OpenOptions::new().append(true).open(&self.path)?;
                    file.write_all(&self.encode(&body))?;
                } else if has_rows {
                    return Err(DomainError::Schema(format!(
                        "{} has columns [{}], dataset has [{}]",
                        self.path.display(),
                        header.join(", "),
                        names.join(", ")
                    ))
                    .into());
                } else {
                    // Header-only file: the dataset's layout replaces it
                    let body = self.render(data, true)?;
                    atomic_write(&self.path, self.encode(&body))?;
                }
            }
            _ => {
                let body = self.render(data, true)?;
                atomic_write(&self.path, self.encode(&body))?;
            }
        }

        info!("Wrote {} rows to {}", data.row_count(), self.path.display());
        Ok(data.row_count() as u64)
    }

    async fn table_exists(&mut self, _target: &TableRef) -> Result<bool, EtlError> {
        Ok(self.path.is_file())
    }

    #[instrument(skip(self, _target), fields(connection = %self.name))]
    async fn truncate(&mut self, _target: &TableRef) -> Result<(), EtlError> {
        if !self.path.is_file() {
            warn!("{} does not exist, nothing to truncate", self.path.display());
            return Ok(());
        }
        let (header, _) = self.layout()?;
        let empty = Dataset::from_rows(header, Vec::new())?;
        let body = self.render(&empty, true)?;
        atomic_write(&self.path, self.encode(&body))?;
        info!("Truncated {} (header kept)", self.path.display());
        Ok(())
    }

    async fn drop_table(&mut self, _target: &TableRef) -> Result<(), EtlError> {
        if remove_if_exists(&self.path)? {
            info!("Deleted {}", self.path.display());
        }
        Ok(())
    }
}
