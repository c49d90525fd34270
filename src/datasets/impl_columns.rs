use ndarray::Array1;

use super::{Column, FieldKind, Value};
use crate::error::{Result, SelectionError};
use crate::Float;

impl<F: Float> Column<F> {
    /// Builds a numeric column.
    pub fn numeric<I: IntoIterator<Item = F>>(values: I) -> Column<F> {
        Column::Numeric(values.into_iter().collect())
    }

    /// Builds a categorical column whose levels are ordered by first
    /// appearance.
    pub fn categorical<S: AsRef<str>>(values: &[S]) -> Column<F> {
        let mut levels: Vec<String> = Vec::new();
        let codes = values
            .iter()
            .map(|v| {
                let v = v.as_ref();
                match levels.iter().position(|l| l == v) {
                    Some(code) => code,
                    None => {
                        levels.push(v.to_string());
                        levels.len() - 1
                    }
                }
            })
            .collect();
        Column::Categorical { levels, codes }
    }

    /// Builds a categorical column with an explicit level order. The first
    /// level is the reference level of the dummy coding.
    pub fn categorical_with_levels<S: AsRef<str>>(values: &[S], levels: &[S]) -> Result<Column<F>> {
        let levels: Vec<String> = levels.iter().map(|l| l.as_ref().to_string()).collect();
        let codes = values
            .iter()
            .map(|v| {
                levels.iter().position(|l| l == v.as_ref()).ok_or_else(|| {
                    SelectionError::SchemaMismatch(format!(
                        "value `{}` is not one of the declared levels",
                        v.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Column::Categorical { levels, codes })
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Column::Numeric(_) => FieldKind::Numeric,
            Column::Categorical { .. } => FieldKind::Categorical,
        }
    }

    /// Cell at row `i`.
    pub fn value(&self, i: usize) -> Value<F> {
        match self {
            Column::Numeric(values) => Value::Numeric(values[i]),
            Column::Categorical { levels, codes } => Value::Categorical(levels[codes[i]].clone()),
        }
    }

    /// Gathers the given rows, repeated indices included.
    pub fn select(&self, indices: &[usize]) -> Column<F> {
        match self {
            Column::Numeric(values) => {
                Column::Numeric(Array1::from_iter(indices.iter().map(|&i| values[i])))
            }
            Column::Categorical { levels, codes } => Column::Categorical {
                levels: levels.clone(),
                codes: indices.iter().map(|&i| codes[i]).collect(),
            },
        }
    }
}
