//! Parser configuration: id prefix and opt-in navigation expansions
//!
//! Configuration can be built in code or read from an XML file:
//!
//! ```xml
//! <ODataConfiguration BaseId="my.service">
//!   <Entity Name="NS.Product">
//!     <Expand>Supplier</Expand>
//!   </Entity>
//! </ODataConfiguration>
//! ```

use std::path::Path;

use roxmltree::Document;

use crate::error::ODataError;

/// Request to expand navigations of one entity in its select extension.
///
/// `entity` matches either the minted qualified id (`<base>.entities.<Name>`)
/// or the `<namespace>.<name>` of the entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub entity: String,
    pub navigations: Vec<String>,
}

impl ExpansionRequest {
    pub fn new<I, S>(entity: impl Into<String>, navigations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity: entity.into(),
            navigations: navigations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, qualified_id: &str, qualified_name: &str) -> bool {
        self.entity == qualified_id || self.entity == qualified_name
    }

    /// Parse a command line value of the form `<entity>=<nav>[,<nav>...]`
    pub fn parse_arg(arg: &str) -> Result<Self, ODataError> {
        let (entity, navigations) = arg.split_once('=').ok_or_else(|| ODataError::InvalidConfig {
            message: format!("Expected <entity>=<navigation>[,<navigation>], got '{arg}'"),
        })?;
        let entity = entity.trim();
        if entity.is_empty() {
            return Err(ODataError::InvalidConfig {
                message: format!("Missing entity in expansion '{arg}'"),
            });
        }
        Ok(Self::new(
            entity,
            navigations
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty()),
        ))
    }
}

/// Caller-supplied settings for one parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Prefix of minted qualified ids
    pub base_id: Option<String>,
    pub expansions: Vec<ExpansionRequest>,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_id(mut self, base_id: impl Into<String>) -> Self {
        self.base_id = Some(base_id.into());
        self
    }

    pub fn with_expansion(mut self, expansion: ExpansionRequest) -> Self {
        self.expansions.push(expansion);
        self
    }

    /// Mint `<base>.<kind>.<name>`, or `<kind>.<name>` without a base
    pub fn mint_id(&self, kind: &str, name: &str) -> String {
        match self.base_id.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => format!("{base}.{kind}.{name}"),
            _ => format!("{kind}.{name}"),
        }
    }
}

/// Read a configuration file
pub fn load_config(path: &Path) -> Result<ParserConfig, ODataError> {
    let content = std::fs::read_to_string(path).map_err(|e| ODataError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let doc = Document::parse(&content).map_err(|e| ODataError::ConfigParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_config_document(&doc)
}

/// Parse configuration from XML text
pub fn parse_config(content: &str) -> Result<ParserConfig, ODataError> {
    let doc = Document::parse(content)?;
    parse_config_document(&doc)
}

fn parse_config_document(doc: &Document) -> Result<ParserConfig, ODataError> {
    let root = doc.root_element();
    if root.tag_name().name() != "ODataConfiguration" {
        return Err(ODataError::InvalidConfig {
            message: format!(
                "Expected an ODataConfiguration root element, found {}",
                root.tag_name().name()
            ),
        });
    }

    let base_id = root
        .attribute("BaseId")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);

    let mut expansions = Vec::new();
    for entity in root.children().filter(|n| n.has_tag_name("Entity")) {
        let name = entity
            .attribute("Name")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ODataError::InvalidConfig {
                message: "Entity element without a Name attribute".to_string(),
            })?;
        let navigations: Vec<String> = entity
            .children()
            .filter(|n| n.has_tag_name("Expand"))
            .filter_map(|n| n.text())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        expansions.push(ExpansionRequest::new(name, navigations));
    }

    Ok(ParserConfig {
        base_id,
        expansions,
    })
}
