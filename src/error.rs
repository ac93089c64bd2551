//! Error types for rust-odata

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning OData metadata into a definition
#[derive(Error, Debug)]
pub enum ODataError {
    #[error("Failed to read metadata file: {path}")]
    MetadataReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata document")]
    DocumentParseError {
        #[source]
        source: roxmltree::Error,
    },

    #[error("Metadata is not valid text: {message}")]
    MetadataEncodingError { message: String },

    #[error("Invalid metadata format: {message}")]
    MetadataFormatError { message: String },

    #[error("Unknown type reference: {name}")]
    UnknownTypeReference { name: String },

    #[error("Unknown Edm primitive type: {name}")]
    UnknownPrimitiveType { name: String },

    #[error("Invalid annotation query '{query}': {message}")]
    EvaluatorError { query: String, message: String },

    #[error("Invalid service url '{url}': {message}")]
    InvalidServiceUrl { url: String, message: String },

    #[error("Failed to read configuration file: {path}")]
    ConfigReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {path}")]
    ConfigParseError {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl From<roxmltree::Error> for ODataError {
    fn from(err: roxmltree::Error) -> Self {
        ODataError::DocumentParseError { source: err }
    }
}

impl ODataError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        ODataError::MetadataFormatError {
            message: message.into(),
        }
    }
}
