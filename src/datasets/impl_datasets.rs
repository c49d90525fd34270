use ndarray::{Array1, ArrayView1};

use super::{Column, Dataset, FieldKind, Record, Schema, Value};
use crate::error::{Result, SelectionError};
use crate::Float;

/// This implementation block provides the constructors of a [`Dataset`].
impl<F: Float> Dataset<F> {
    /// This method instantiates a new dataset from named columns. Every column
    /// must have the same length and field names must be unique.
    pub fn new(columns: Vec<(String, Column<F>)>) -> Result<Dataset<F>> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut fields = Vec::with_capacity(columns.len());
        let mut cols = Vec::with_capacity(columns.len());

        for (name, column) in columns {
            if column.len() != n_rows {
                return Err(SelectionError::SchemaMismatch(format!(
                    "column `{}` has {} rows, expected {}",
                    name,
                    column.len(),
                    n_rows
                )));
            }
            if fields.contains(&name) {
                return Err(SelectionError::SchemaMismatch(format!(
                    "duplicate field `{}`",
                    name
                )));
            }
            fields.push(name);
            cols.push(column);
        }

        Ok(Dataset {
            fields,
            columns: cols,
            n_rows,
        })
    }

    /// This method builds a dataset from row records. All records must carry
    /// the same fields with the same kinds.
    pub fn from_records(records: &[Record<F>]) -> Result<Dataset<F>> {
        let first = records.first().ok_or_else(|| {
            SelectionError::InvalidParameter("cannot build a dataset from zero records".into())
        })?;

        let mut columns = Vec::with_capacity(first.len());
        for (name, value) in first.iter() {
            let column = match value {
                Value::Numeric(_) => {
                    let values = records
                        .iter()
                        .enumerate()
                        .map(|(i, record)| match record.get(name) {
                            Some(Value::Numeric(x)) => Ok(*x),
                            _ => Err(mismatch(i, name, FieldKind::Numeric)),
                        })
                        .collect::<Result<Vec<F>>>()?;
                    Column::Numeric(Array1::from(values))
                }
                Value::Categorical(_) => {
                    let labels = records
                        .iter()
                        .enumerate()
                        .map(|(i, record)| match record.get(name) {
                            Some(Value::Categorical(label)) => Ok(label.as_str()),
                            _ => Err(mismatch(i, name, FieldKind::Categorical)),
                        })
                        .collect::<Result<Vec<&str>>>()?;
                    Column::categorical(&labels)
                }
            };
            columns.push((name.clone(), column));
        }

        if let Some((i, record)) = records
            .iter()
            .enumerate()
            .find(|(_, record)| record.len() != first.len())
        {
            return Err(SelectionError::SchemaMismatch(format!(
                "record {} has {} fields, expected {}",
                i,
                record.len(),
                first.len()
            )));
        }

        Dataset::new(columns)
    }
}

fn mismatch(row: usize, field: &str, expected: FieldKind) -> SelectionError {
    SelectionError::SchemaMismatch(format!(
        "record {} lacks a {:?} value for field `{}`",
        row, expected, field
    ))
}

/// This implementation block provides getters and row selection.
impl<F: Float> Dataset<F> {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn schema(&self) -> Schema {
        Schema {
            fields: self
                .fields
                .iter()
                .cloned()
                .zip(self.columns.iter().map(|c| c.kind()))
                .collect(),
        }
    }

    /// This method is a getter for the column named `name`.
    pub fn column(&self, name: &str) -> Result<&Column<F>> {
        self.fields
            .iter()
            .position(|field| field == name)
            .map(|j| &self.columns[j])
            .ok_or_else(|| SelectionError::UnknownField(name.to_string()))
    }

    /// This method returns a view of the numeric column named `name`.
    pub fn numeric(&self, name: &str) -> Result<ArrayView1<F>> {
        match self.column(name)? {
            Column::Numeric(values) => Ok(values.view()),
            Column::Categorical { .. } => Err(SelectionError::InvalidParameter(format!(
                "field `{}` is categorical, a numeric field is required",
                name
            ))),
        }
    }

    /// This method rebuilds the record at row `i`.
    pub fn record(&self, i: usize) -> Record<F> {
        self.fields
            .iter()
            .cloned()
            .zip(self.columns.iter().map(|c| c.value(i)))
            .collect()
    }

    /// This method gathers the given rows into a new dataset. Indices may
    /// repeat.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset<F> {
        Dataset {
            fields: self.fields.clone(),
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            n_rows: indices.len(),
        }
    }
}
