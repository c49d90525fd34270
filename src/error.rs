use thiserror::Error;

/// Simplified `Result` using [`SelectionError`](crate::SelectionError) as error type
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Error variants from partitioning, fitting, scoring and model selection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    /// A resampling scheme, hyperparameter or transformation argument is out
    /// of its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A formula references a field absent from the dataset schema
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// The design matrix is rank-deficient
    #[error("singular design matrix: rank at most {rank_hint} for {n_columns} columns")]
    SingularDesign { rank_hint: usize, n_columns: usize },
    /// The metric needs information the fitted model does not expose
    #[error("metric {metric} is undefined: {reason}")]
    MetricUndefined { metric: &'static str, reason: String },
    /// Fewer than two folds were supplied, the standard error is undefined
    #[error("at least 2 folds are required to estimate a standard error, got {0}")]
    InsufficientFolds(usize),
    /// Records or columns do not share a common schema
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl SelectionError {
    /// Short stable name of the error kind, used when reporting failed
    /// candidates.
    pub fn kind(&self) -> &'static str {
        match self {
            SelectionError::InvalidParameter(_) => "InvalidParameterError",
            SelectionError::UnknownField(_) => "UnknownFieldError",
            SelectionError::SingularDesign { .. } => "SingularDesignError",
            SelectionError::MetricUndefined { .. } => "MetricUndefinedError",
            SelectionError::InsufficientFolds(_) => "InsufficientFoldsError",
            SelectionError::SchemaMismatch(_) => "SchemaMismatchError",
        }
    }
}
