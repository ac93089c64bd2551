//! rust-odata: OData v4 metadata ingest
//!
//! This library reads a CSDL/EDMX `$metadata` document and turns it into a
//! typed [`Definition`]: a registry of enumerations and structures plus the
//! create, list, get, delete and update functions each entity set exposes.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use rayon::prelude::*;
use roxmltree::Document;
use tracing::info;
use url::Url;

pub use config::{load_config, parse_config, ExpansionRequest, ParserConfig};
pub use error::ODataError;
pub use model::{Definition, ServiceLocation};

/// Options for inspecting metadata documents
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Metadata files or glob patterns
    pub metadata: Vec<String>,
    /// Root url of the service the documents describe
    pub service_url: String,
    /// Optional configuration file
    pub config_path: Option<PathBuf>,
    /// Overrides the configuration file's base id
    pub base_id: Option<String>,
    /// Added to the configuration file's expansions
    pub expansions: Vec<ExpansionRequest>,
}

/// Parse metadata text into a definition
pub fn parse_metadata(
    xml: &str,
    service_url: &str,
    config: &ParserConfig,
) -> Result<Definition, ODataError> {
    let location = service_location(service_url)?;
    let doc = Document::parse(xml)?;
    parser::walk_document(&doc, location, config)
}

/// Parse raw metadata bytes, honoring a byte order mark (UTF-8 otherwise)
pub fn parse_metadata_bytes(
    bytes: &[u8],
    service_url: &str,
    config: &ParserConfig,
) -> Result<Definition, ODataError> {
    let text = decode_metadata(bytes)?;
    parse_metadata(&text, service_url, config)
}

/// Read and parse one metadata file
pub fn parse_metadata_file(
    path: &Path,
    service_url: &str,
    config: &ParserConfig,
) -> Result<Definition, ODataError> {
    let bytes = std::fs::read(path).map_err(|e| ODataError::MetadataReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_metadata_bytes(&bytes, service_url, config)
}

fn decode_metadata(bytes: &[u8]) -> Result<String, ODataError> {
    let (encoding, bom_length) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
    if had_errors {
        return Err(ODataError::MetadataEncodingError {
            message: format!("Metadata contains bytes that are not valid {}", encoding.name()),
        });
    }
    Ok(text.into_owned())
}

/// Scheme, host (with an explicit port) and path of a service url
pub fn service_location(service_url: &str) -> Result<ServiceLocation, ODataError> {
    let invalid = |message: String| ODataError::InvalidServiceUrl {
        url: service_url.to_string(),
        message,
    };
    let url = Url::parse(service_url.trim()).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("the url has no host".to_string()))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(ServiceLocation {
        scheme: url.scheme().to_string(),
        host,
        base_path: url.path().to_string(),
    })
}

/// Parse every document matched by the options, in parallel
pub fn inspect_metadata(options: &InspectOptions) -> Result<Vec<(PathBuf, Definition)>> {
    let mut config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => ParserConfig::new(),
    };
    if let Some(base_id) = &options.base_id {
        config.base_id = Some(base_id.clone());
    }
    config.expansions.extend(options.expansions.iter().cloned());

    let paths = expand_metadata_paths(&options.metadata)?;
    info!("Inspecting {} metadata documents", paths.len());

    paths
        .into_par_iter()
        .map(|path| {
            let definition = parse_metadata_file(&path, &options.service_url, &config)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok((path, definition))
        })
        .collect()
}

/// Resolve literal paths and glob patterns, keeping the order given
fn expand_metadata_paths(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if Path::new(pattern).exists() {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("Invalid metadata pattern: {pattern}"))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        if matched.is_empty() {
            anyhow::bail!("No metadata documents match {pattern}");
        }
        matched.sort();
        paths.append(&mut matched);
    }
    Ok(paths)
}
