use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("{message} at character {pos}")]
    Syntax { message: String, pos: usize },

    #[error("{0} is not defined")]
    Reference(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Assignment target must be an identifier")]
    AssignmentTarget,

    #[error("Evaluation error: {0}")]
    Eval(String),
}

impl ExprError {
    pub fn syntax(message: impl Into<String>, pos: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            pos,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}
