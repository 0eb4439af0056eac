use thiserror::Error;

/// Errors raised while assembling a document into the modular or official
/// XML shape (§4.3).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XmlError {
    #[error("XML write error: {0}")]
    Write(String),
    #[error("XML UTF-8 error: {0}")]
    Utf8(String),
}

/// Errors raised while mapping between the modular and official XML shapes
/// (§4.4).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapperError {
    #[error("XML parse error: {0}")]
    Parse(String),
    #[error("unknown element {0:?} encountered in strict mode")]
    UnknownElement(String),
    #[error(transparent)]
    Xml(#[from] XmlError),
}
