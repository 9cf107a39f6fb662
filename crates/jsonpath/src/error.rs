use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("JSONPath parse error in '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Eval [?(expr)] prevented in JSONPath expression: {expression}")]
    EvalDisabled { expression: String },

    #[error("jsonPath: {message}: {expression}")]
    Eval { expression: String, message: String },

    #[error("Unknown value type '{0}'")]
    UnknownType(String),

    #[error("@other() requires an otherTypeCallback in the query options")]
    MissingOtherTypeHandler,
}

impl PathError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
