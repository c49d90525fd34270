use ndarray::Array1;
use std::collections::BTreeMap;

use crate::Float;

mod impl_columns;
mod impl_datasets;


/// A single cell of a record, either a number or a category label.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<F> {
    Numeric(F),
    Categorical(String),
}

/// One row of a dataset, keyed by field name.
pub type Record<F> = BTreeMap<String, Value<F>>;

/// Storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// Ordered field names and their kinds. Two datasets share a schema if and
/// only if their schemas compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, FieldKind)>,
}

impl Schema {
    pub fn fields(&self) -> &[(String, FieldKind)] {
        &self.fields
    }

    /// Returns the kind of `name`, if the field exists.
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, kind)| *kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }
}

/// A column of a [`Dataset`].
///
/// Categorical columns store integer codes into a level table. Subsetting a
/// categorical column keeps the full level table, so that dummy coding stays
/// identical between the training and test sides of a fold.
#[derive(Debug, Clone, PartialEq)]
pub enum Column<F> {
    Numeric(Array1<F>),
    Categorical { levels: Vec<String>, codes: Vec<usize> },
}

/// Dataset
///
/// An immutable, column-oriented table whose columns all have the same
/// length. Datasets are built once by the caller and every resampling step
/// produces new datasets through [`Dataset::select_rows`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<F: Float> {
    fields: Vec<String>,
    columns: Vec<Column<F>>,
    n_rows: usize,
}
