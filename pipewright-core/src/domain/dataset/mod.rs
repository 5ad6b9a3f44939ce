// pipewright-core/src/domain/dataset/mod.rs

mod value;

pub use value::{DataType, TIMESTAMP_FORMAT, Value, parse_timestamp};

use crate::domain::error::DomainError;

/// One named column of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Logical type of the column, derived from its non-null values.
    ///
    /// Integers mixed with floats widen to `Float`; any other mix, and an
    /// all-null column, is `Text`.
    pub fn data_type(&self) -> DataType {
        let mut seen: Option<DataType> = None;
        for ty in self.values.iter().filter_map(Value::data_type) {
            seen = Some(match (seen, ty) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(DataType::Integer), DataType::Float)
                | (Some(DataType::Float), DataType::Integer) => DataType::Float,
                _ => return DataType::Text,
            });
        }
        seen.unwrap_or(DataType::Text)
    }
}

/// In-memory table: ordered named columns of equal length.
///
/// Row order is preserved through read, transform and write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DomainError> {
        if let Some(first) = columns.first() {
            let expected = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != expected) {
                return Err(DomainError::Schema(format!(
                    "column '{}' has {} values, expected {}",
                    bad.name,
                    bad.values.len(),
                    expected
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Builds a dataset from row-major data.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DomainError> {
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DomainError::Schema(format!(
                    "row {} has {} values, expected {}",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Values of row `index`, in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count()).map(move |i| self.row(i))
    }

    /// Replaces the column named `name` in place, or appends it at the end.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), DomainError> {
        if !self.columns.is_empty() && values.len() != self.row_count() {
            return Err(DomainError::Schema(format!(
                "column '{}' has {} values, dataset has {} rows",
                name,
                values.len(),
                self.row_count()
            )));
        }
        match self.column_mut(name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
        Ok(())
    }

    /// Sets every row of `name` to the same value.
    pub fn fill_column(&mut self, name: &str, value: Value) {
        let values = vec![value; self.row_count()];
        // Length matches by construction.
        let _ = self.set_column(name, values);
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<(), DomainError> {
        let column = self
            .column_mut(old)
            .ok_or_else(|| DomainError::Schema(format!("column '{}' not found", old)))?;
        column.name = new.to_string();
        Ok(())
    }

    /// Applies `f` to every column name, keeping order.
    pub fn rename_all(&mut self, f: impl Fn(&str) -> String) {
        for column in &mut self.columns {
            column.name = f(&column.name);
        }
    }

    /// Appends the rows of `other`, matching columns by position.
    pub fn extend(&mut self, other: Dataset) -> Result<(), DomainError> {
        if self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.width() != self.width() {
            return Err(DomainError::Schema(format!(
                "cannot append {} columns to a dataset of {} columns",
                other.width(),
                self.width()
            )));
        }
        for (column, incoming) in self.columns.iter_mut().zip(other.columns) {
            column.values.extend(incoming.values);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Integer(1), Value::Text("ada".into())],
                vec![Value::Integer(2), Value::Text("grace".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_keeps_order() {
        let ds = sample();
        assert_eq!(ds.column_names(), vec!["id", "name"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.row(1), vec![&Value::Integer(2), &Value::Text("grace".into())]);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let result = Dataset::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Integer(1)]],
        );
        assert!(matches!(result, Err(DomainError::Schema(_))));
    }

    #[test]
    fn test_column_type_widening() {
        let mixed = Column::new("n", vec![Value::Integer(1), Value::Null, Value::Float(2.5)]);
        assert_eq!(mixed.data_type(), DataType::Float);

        let text = Column::new("t", vec![Value::Integer(1), Value::Text("x".into())]);
        assert_eq!(text.data_type(), DataType::Text);

        let nulls = Column::new("z", vec![Value::Null, Value::Null]);
        assert_eq!(nulls.data_type(), DataType::Text);
    }

    #[test]
    fn test_set_column_replaces_in_place() {
        let mut ds = sample();
        ds.set_column("id", vec![Value::Integer(10), Value::Integer(20)])
            .unwrap();
        assert_eq!(ds.column_names(), vec!["id", "name"]);
        assert_eq!(ds.column("id").unwrap().values[0], Value::Integer(10));

        let err = ds.set_column("short", vec![Value::Null]);
        assert!(err.is_err());
    }

    #[test]
    fn test_extend_by_position() {
        let mut ds = sample();
        ds.extend(sample()).unwrap();
        assert_eq!(ds.row_count(), 4);
    }
}
