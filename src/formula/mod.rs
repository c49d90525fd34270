use ndarray::{Array1, Array2};
use std::fmt;

use crate::datasets::{Column, Dataset, FieldKind, Record, Schema, Value};
use crate::error::{Result, SelectionError};
use crate::Float;


/// Transformation applied to the field(s) of a predictor term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform<F> {
    /// The raw field. Categorical fields expand to treatment dummies.
    Identity,
    /// Natural logarithm, the field must be strictly positive.
    Log,
    /// `ln(1 + x)`, the field must be greater than `-1`.
    Log1p,
    /// Square root, the field must be non-negative.
    Sqrt,
    Square,
    Power(F),
    /// Product of two or more numeric fields.
    Interaction,
}

/// A predictor term: a transformation and the fields it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Term<F> {
    transform: Transform<F>,
    fields: Vec<String>,
}

impl<F: Float> Term<F> {
    pub fn field(name: &str) -> Term<F> {
        Term::unary(Transform::Identity, name)
    }

    pub fn log(name: &str) -> Term<F> {
        Term::unary(Transform::Log, name)
    }

    pub fn log1p(name: &str) -> Term<F> {
        Term::unary(Transform::Log1p, name)
    }

    pub fn sqrt(name: &str) -> Term<F> {
        Term::unary(Transform::Sqrt, name)
    }

    pub fn square(name: &str) -> Term<F> {
        Term::unary(Transform::Square, name)
    }

    pub fn power(name: &str, exponent: F) -> Term<F> {
        Term::unary(Transform::Power(exponent), name)
    }

    pub fn interaction(names: &[&str]) -> Term<F> {
        Term {
            transform: Transform::Interaction,
            fields: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn unary(transform: Transform<F>, name: &str) -> Term<F> {
        Term {
            transform,
            fields: vec![name.to_string()],
        }
    }

    pub fn transform(&self) -> Transform<F> {
        self.transform
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Printable name of the term, e.g. `log(x)` or `x:z`.
    pub fn name(&self) -> String {
        let field = self.fields.first().map(String::as_str).unwrap_or("");
        match self.transform {
            Transform::Identity => field.to_string(),
            Transform::Log => format!("log({})", field),
            Transform::Log1p => format!("log1p({})", field),
            Transform::Sqrt => format!("sqrt({})", field),
            Transform::Square => format!("I({}^2)", field),
            Transform::Power(p) => format!("I({}^{})", field, p),
            Transform::Interaction => self.fields.join(":"),
        }
    }

    fn apply(&self, x: F) -> F {
        match self.transform {
            Transform::Identity | Transform::Interaction => x,
            Transform::Log => x.ln(),
            Transform::Log1p => x.ln_1p(),
            Transform::Sqrt => x.sqrt(),
            Transform::Square => x * x,
            Transform::Power(p) => x.powf(p),
        }
    }

    /// Appends the design columns of this term, evaluated on `dataset`.
    fn expand(&self, dataset: &Dataset<F>, out: &mut Vec<(String, Array1<F>)>) -> Result<()> {
        if self.transform == Transform::Interaction {
            let mut product = Array1::<F>::ones(dataset.n_rows());
            for name in self.fields.iter() {
                product = &product * &dataset.numeric(name)?;
            }
            out.push((self.name(), product));
            return Ok(());
        }

        let name = &self.fields[0];
        match dataset.column(name)? {
            Column::Numeric(values) => {
                let transformed = values.mapv(|x| self.apply(x));
                if let Some(pos) = transformed.iter().position(|x| !x.is_finite()) {
                    return Err(SelectionError::InvalidParameter(format!(
                        "{} is not finite for value {} of field `{}`",
                        self.name(),
                        values[pos],
                        name
                    )));
                }
                out.push((self.name(), transformed));
            }
            Column::Categorical { levels, codes } => {
                // treatment coding, the first level is the reference
                for (level_code, level) in levels.iter().enumerate().skip(1) {
                    let dummy = codes
                        .iter()
                        .map(|&c| if c == level_code { F::one() } else { F::zero() })
                        .collect::<Array1<F>>();
                    out.push((format!("{}{}", name, level), dummy));
                }
            }
        }
        Ok(())
    }
}

/// FormulaSpec
///
/// The functional form of a candidate regression model: a numeric response
/// field, an ordered list of predictor terms and an optional intercept.
/// A formula carries no fitted values and can be reused across folds.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaSpec<F> {
    response: String,
    terms: Vec<Term<F>>,
    intercept: bool,
}

impl<F: Float> FormulaSpec<F> {
    /// Creates a formula with an intercept and no predictor terms.
    pub fn new(response: &str) -> FormulaSpec<F> {
        FormulaSpec {
            response: response.to_string(),
            terms: Vec::new(),
            intercept: true,
        }
    }

    /// Adds a predictor term.
    pub fn term(mut self, term: Term<F>) -> Self {
        self.terms.push(term);
        self
    }

    /// Adds an untransformed predictor for each of `names`.
    pub fn fields(mut self, names: &[&str]) -> Self {
        self.terms.extend(names.iter().map(|n| Term::field(n)));
        self
    }

    /// Includes or drops the intercept column.
    ///
    /// Defaults to `true` if not set.
    pub fn intercept(mut self, intercept: bool) -> Self {
        self.intercept = intercept;
        self
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn terms(&self) -> &[Term<F>] {
        &self.terms
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept
    }

    /// Checks that every referenced field exists in `schema` with a kind the
    /// term can use.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        self.validate_predictors(schema)?;
        match schema.kind_of(&self.response) {
            None => Err(SelectionError::UnknownField(self.response.clone())),
            Some(FieldKind::Categorical) => Err(SelectionError::InvalidParameter(format!(
                "response `{}` must be numeric",
                self.response
            ))),
            Some(FieldKind::Numeric) => Ok(()),
        }
    }

    fn validate_predictors(&self, schema: &Schema) -> Result<()> {
        for term in self.terms.iter() {
            if term.fields.is_empty()
                || (term.transform == Transform::Interaction && term.fields.len() < 2)
            {
                return Err(SelectionError::InvalidParameter(format!(
                    "term `{}` needs {} field(s)",
                    term.name(),
                    if term.transform == Transform::Interaction { "at least 2" } else { "1" }
                )));
            }
            for field in term.fields.iter() {
                match schema.kind_of(field) {
                    None => return Err(SelectionError::UnknownField(field.clone())),
                    Some(FieldKind::Categorical) if term.transform != Transform::Identity => {
                        return Err(SelectionError::InvalidParameter(format!(
                            "term `{}` cannot transform categorical field `{}`",
                            term.name(),
                            field
                        )))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Builds the design matrix of `dataset`, one row per record. The
    /// response field is not required.
    pub fn design_matrix(&self, dataset: &Dataset<F>) -> Result<Array2<F>> {
        let (_, columns) = self.design_columns(dataset)?;
        let n_rows = dataset.n_rows();
        let mut X = Array2::<F>::zeros((n_rows, columns.len()));
        for (j, column) in columns.iter().enumerate() {
            X.column_mut(j).assign(column);
        }
        Ok(X)
    }

    /// Names of the design matrix columns, in order.
    pub fn column_names(&self, dataset: &Dataset<F>) -> Result<Vec<String>> {
        let (names, _) = self.design_columns(dataset)?;
        Ok(names)
    }

    fn design_columns(&self, dataset: &Dataset<F>) -> Result<(Vec<String>, Vec<Array1<F>>)> {
        self.validate_predictors(&dataset.schema())?;
        let mut columns = Vec::with_capacity(self.terms.len() + 1);
        if self.intercept {
            columns.push(("(Intercept)".to_string(), Array1::ones(dataset.n_rows())));
        }
        for term in self.terms.iter() {
            term.expand(dataset, &mut columns)?;
        }
        Ok(columns.into_iter().unzip())
    }

    /// Response vector of `dataset`.
    pub fn response_values(&self, dataset: &Dataset<F>) -> Result<Array1<F>> {
        Ok(dataset.numeric(&self.response)?.to_owned())
    }
}

/// Rebuilds a one-row dataset from `record`, borrowing categorical levels
/// from `template` so the dummy columns line up with the training design.
pub fn single_record_dataset<F: Float>(record: &Record<F>, template: &Dataset<F>) -> Result<Dataset<F>> {
    let mut columns = Vec::with_capacity(record.len());
    for (name, value) in record.iter() {
        let column = match (value, template.column(name)) {
            (Value::Categorical(label), Ok(Column::Categorical { levels, .. })) => {
                let levels: Vec<&str> = levels.iter().map(String::as_str).collect();
                Column::categorical_with_levels(&[label.as_str()], levels.as_slice())?
            }
            (Value::Categorical(label), _) => Column::categorical(&[label.as_str()]),
            (Value::Numeric(x), _) => Column::numeric(std::iter::once(*x)),
        };
        columns.push((name.clone(), column));
    }
    Dataset::new(columns)
}

impl<F: Float> fmt::Display for FormulaSpec<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.terms.iter().map(|t| t.name()).collect();
        let rhs = match (terms.is_empty(), self.intercept) {
            (true, true) => "1".to_string(),
            (true, false) => "0".to_string(),
            (false, true) => terms.join(" + "),
            (false, false) => format!("{} - 1", terms.join(" + ")),
        };
        write!(f, "{} ~ {}", self.response, rhs)
    }
}
