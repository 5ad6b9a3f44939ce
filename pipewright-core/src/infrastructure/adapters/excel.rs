// pipewright-core/src/infrastructure/adapters/excel.rs

// Workbooks are read with calamine and written with rust_xlsxwriter. The
// writer cannot edit a file in place, so every write loads the existing cells
// of all sheets, changes the target sheet and saves a new workbook over the
// old one. Cell formatting other than dates is not carried over.

use async_trait::async_trait;
use calamine::{Data, Reader, Sheets, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::domain::dataset::{Dataset, Value, parse_timestamp};
use crate::domain::error::DomainError;
use crate::domain::pipeline::{Backend, ConnectionConfig, TableRef, WriteMode};
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{atomic_write, remove_if_exists};
use crate::ports::connector::Connector;

const DEFAULT_SHEET: &str = "Sheet1";
const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
// Largest integer a spreadsheet number holds exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

type Cell = (u32, u16, Value);

struct Sheet {
    name: String,
    cells: Vec<Cell>,
}

impl Sheet {
    fn next_free_row(&self) -> Option<u32> {
        self.cells.iter().map(|(row, _, _)| row + 1).max()
    }
}

#[derive(Debug)]
pub struct ExcelConnector {
    name: String,
    path: PathBuf,
    sheet_name: Option<String>,
    header_row: u32,
}

impl ExcelConnector {
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, EtlError> {
        let p = &config.params;
        Ok(Self {
            name: config.name.clone(),
            path: config.require(&p.file_path, "file_path")?.clone(),
            sheet_name: p.sheet_name.clone(),
            header_row: p.header_start_row.unwrap_or(0),
        })
    }

    /// Sheet written by `target`: its own sheet, else the connection's.
    fn target_sheet<'a>(&'a self, target: &'a TableRef) -> &'a str {
        target
            .sheet
            .as_deref()
            .or(self.sheet_name.as_deref())
            .unwrap_or(DEFAULT_SHEET)
    }

    /// Row, first column and labels of the header: the first used row at or
    /// below the configured header row.
    fn find_header(&self, sheet: &Sheet) -> Option<(u32, u16, Vec<String>)> {
        let row = sheet
            .cells
            .iter()
            .map(|(r, _, _)| *r)
            .filter(|r| *r >= self.header_row)
            .min()?;
        let mut labels: Vec<(u16, String)> = sheet
            .cells
            .iter()
            .filter(|(r, _, _)| *r == row)
            .map(|(_, c, v)| (*c, v.render()))
            .collect();
        labels.sort_by_key(|(c, _)| *c);
        let left = labels.first().map(|(c, _)| *c)?;
        Some((row, left, labels.into_iter().map(|(_, l)| l).collect()))
    }

    fn open(&self) -> Result<Sheets<BufReader<File>>, EtlError> {
        if !self.path.is_file() {
            return Err(InfrastructureError::connection(format!(
                "file not found: {}",
                self.path.display()
            ))
            .into());
        }
        open_workbook_auto(&self.path).map_err(|e| {
            InfrastructureError::format(format!("{}: {}", self.path.display(), e)).into()
        })
    }

    fn load_sheets(&self) -> Result<Vec<Sheet>, EtlError> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let mut workbook = self.open()?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| InfrastructureError::format(format!("sheet '{}': {}", name, e)))?;
            let (top, left) = range.start().unwrap_or((0, 0));
            let cells = range
                .cells()
                .filter_map(|(r, c, data)| {
                    let value = decode(data);
                    let row = top + u32::try_from(r).ok()?;
                    let col = u16::try_from(left as usize + c).ok()?;
                    (!value.is_null()).then_some((row, col, value))
                })
                .collect();
            sheets.push(Sheet { name, cells });
        }
        Ok(sheets)
    }

    fn save_sheets(&self, sheets: &[Sheet]) -> Result<(), EtlError> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(InfrastructureError::format)?;
            for (row, col, value) in &sheet.cells {
                write_cell(worksheet, *row, *col, value, &date_format)
                    .map_err(InfrastructureError::format)?;
            }
        }
        let bytes = workbook
            .save_to_buffer()
            .map_err(InfrastructureError::format)?;
        atomic_write(&self.path, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl Connector for ExcelConnector {
    fn backend(&self) -> Backend {
        Backend::Excel
    }

    #[instrument(skip(self, _query), fields(connection = %self.name))]
    async fn read(&mut self, _query: Option<&str>) -> Result<Dataset, EtlError> {
        let mut workbook = self.open()?;
        let sheet = match &self.sheet_name {
            Some(name) => name.clone(),
            None => workbook.sheet_names().into_iter().next().ok_or_else(|| {
                InfrastructureError::format(format!("{} has no sheets", self.path.display()))
            })?,
        };
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| InfrastructureError::format(format!("sheet '{}': {}", sheet, e)))?;

        // Rows above the header are skipped; the range itself may start lower
        let top = range.start().map_or(0, |(row, _)| row);
        let mut rows = range.rows().skip(self.header_row.saturating_sub(top) as usize);
        let Some(header) = rows.next() else {
            warn!("Sheet '{}' is empty", sheet);
            return Ok(Dataset::default());
        };

        let names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| match decode(cell) {
                Value::Null => format!("column_{}", i + 1),
                other => other.to_string(),
            })
            .collect();
        let body: Vec<Vec<Value>> = rows
            .map(|row| row.iter().map(decode).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|v| !v.is_null()))
            .collect();

        let data = Dataset::from_rows(names, body)?;
        info!("Read {} rows from sheet '{}'", data.row_count(), sheet);
        Ok(data)
    }

    #[instrument(skip(self, data), fields(connection = %self.name, sheet = %self.target_sheet(target)))]
    async fn write(
        &mut self,
        data: &Dataset,
        target: &TableRef,
        mode: WriteMode,
    ) -> Result<u64, EtlError> {
        if data.width() == 0 {
            warn!("Dataset has no columns, nothing written");
            return Ok(0);
        }

        let sheet_name = self.target_sheet(target).to_string();
        let mut sheets = self.load_sheets()?;
        let index = match sheets.iter().position(|s| s.name == sheet_name) {
            Some(i) => i,
            None => {
                sheets.push(Sheet {
                    name: sheet_name.clone(),
                    cells: Vec::new(),
                });
                sheets.len() - 1
            }
        };
        let sheet = &mut sheets[index];

        let (first_data_row, left) = match (mode, self.find_header(sheet)) {
            (WriteMode::Append, Some((row, col, names))) => {
                if names.iter().map(String::as_str).eq(data.column_names()) {
                    (sheet.next_free_row().unwrap_or(row + 1), col)
                } else if sheet.cells.iter().any(|(r, _, _)| *r > row) {
                    return Err(DomainError::Schema(format!(
                        "sheet '{}' has columns [{}], dataset has [{}]",
                        sheet_name,
                        names.join(", "),
                        data.column_names().join(", ")
                    ))
                    .into());
                } else {
                    // Header-only sheet: the dataset's layout replaces it
                    sheet.cells.retain(|(r, _, _)| *r != row);
                    push_header(sheet, row, col, data)?;
                    (row + 1, col)
                }
            }
            (WriteMode::Append, None) if !sheet.cells.is_empty() => {
                let row = sheet.next_free_row().unwrap_or(0).max(self.header_row);
                push_header(sheet, row, target.start_column, data)?;
                (row + 1, target.start_column)
            }
            _ => {
                sheet.cells.clear();
                push_header(sheet, target.start_row, target.start_column, data)?;
                (target.start_row + 1, target.start_column)
            }
        };

        for (i, row) in data.rows().enumerate() {
            let r = first_data_row + u32::try_from(i).map_err(InfrastructureError::format)?;
            for (j, value) in row.into_iter().enumerate() {
                if !value.is_null() {
                    sheet.cells.push((r, offset(left, j)?, value.clone()));
                }
            }
        }

        self.save_sheets(&sheets)?;
        info!(
            "Wrote {} rows to sheet '{}' of {}",
            data.row_count(),
            sheet_name,
            self.path.display()
        );
        Ok(data.row_count() as u64)
    }

    async fn table_exists(&mut self, target: &TableRef) -> Result<bool, EtlError> {
        if !self.path.is_file() {
            return Ok(false);
        }
        let sheet = self.target_sheet(target);
        Ok(self.open()?.sheet_names().iter().any(|s| s == sheet))
    }

    #[instrument(skip(self), fields(connection = %self.name))]
    async fn truncate(&mut self, target: &TableRef) -> Result<(), EtlError> {
        let sheet_name = self.target_sheet(target).to_string();
        let mut sheets = self.load_sheets()?;
        let Some(sheet) = sheets.iter_mut().find(|s| s.name == sheet_name) else {
            warn!("Sheet '{}' does not exist, nothing to truncate", sheet_name);
            return Ok(());
        };

        if let Some((header_row, _, _)) = self.find_header(sheet) {
            sheet.cells.retain(|(row, _, _)| *row <= header_row);
        }

        self.save_sheets(&sheets)?;
        info!("Truncated sheet '{}' (header kept)", sheet_name);
        Ok(())
    }

    async fn drop_table(&mut self, _target: &TableRef) -> Result<(), EtlError> {
        if remove_if_exists(&self.path)? {
            info!("Deleted {}", self.path.display());
        }
        Ok(())
    }
}

fn push_header(sheet: &mut Sheet, row: u32, left: u16, data: &Dataset) -> Result<(), EtlError> {
    for (j, name) in data.column_names().into_iter().enumerate() {
        sheet
            .cells
            .push((row, offset(left, j)?, Value::Text(name.to_string())));
    }
    Ok(())
}

fn offset(left: u16, j: usize) -> Result<u16, EtlError> {
    u16::try_from(j)
        .ok()
        .and_then(|j| left.checked_add(j))
        .ok_or_else(|| InfrastructureError::format("too many columns for a worksheet").into())
}

fn decode(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        Data::Float(x) if x.fract() == 0.0 && x.abs() < MAX_EXACT_INT => Value::Integer(*x as i64),
        Data::Float(x) => Value::Float(*x),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Bool(b) => Value::Boolean(*b),
        Data::DateTime(dt) => dt.as_datetime().map_or(Value::Null, Value::Timestamp),
        Data::DateTimeIso(s) => parse_timestamp(s).map_or_else(|| Value::Text(s.clone()), Value::Timestamp),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    date_format: &Format,
) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Value::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(x) => {
            worksheet.write_number(row, col, *x)?;
        }
        Value::Boolean(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Timestamp(ts) => {
            worksheet.write_number_with_format(row, col, serial_date(ts), date_format)?;
        }
    }
    Ok(())
}

/// Days since 1899-12-30, the spreadsheet epoch.
fn serial_date(ts: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (*ts - epoch).num_milliseconds() as f64 / 86_400_000.0
}
