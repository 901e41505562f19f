//! Graph Mutator error taxonomy.

use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("embedded workflow template is malformed: {0}")]
    TemplateMalformed(String),

    #[error("template node '{0}' missing from workflow template")]
    MissingNode(&'static str),
}
