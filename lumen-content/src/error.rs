use thiserror::Error;

use crate::item::ContentKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("{kind} content is missing required field `{field}`")]
    MissingField {
        kind: ContentKind,
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ContentError>;
