//! Mapping of Edm primitive type names to host scalar kinds

use crate::error::ODataError;

use super::Cardinality;

/// Prefix shared by every built-in CSDL type
pub const EDM_PREFIX: &str = "Edm.";

/// Namespace and name under which the GeographyPoint record is registered
pub const GEOGRAPHY_POINT_NAMESPACE: &str = "Edm";
pub const GEOGRAPHY_POINT_NAME: &str = "GeographyPoint";

const COLLECTION_PREFIX: &str = "Collection(";

/// Host scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Binary,
    Stream,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    DateTime,
    Uuid,
    Duration,
}

impl PrimitiveType {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Binary => "bytes",
            PrimitiveType::Stream => "stream",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::Uuid => "uuid",
            PrimitiveType::Duration => "duration",
        }
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of mapping an `Edm.` name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdmType {
    Primitive(PrimitiveType),
    /// GeoJSON point: `{type: string, coordinates: [double]}`
    GeographyPoint,
}

pub fn is_edm_name(name: &str) -> bool {
    name.starts_with(EDM_PREFIX)
}

/// Map a fully qualified `Edm.` name to its host kind
pub fn map_edm_type(name: &str) -> Result<EdmType, ODataError> {
    let primitive = match name {
        "Edm.GeographyPoint" => return Ok(EdmType::GeographyPoint),
        "Edm.String" => PrimitiveType::String,
        "Edm.Binary" => PrimitiveType::Binary,
        "Edm.Stream" => PrimitiveType::Stream,
        "Edm.Boolean" => PrimitiveType::Boolean,
        // Edm.Byte is unsigned, it needs the wider signed kind
        "Edm.Byte" => PrimitiveType::Int16,
        "Edm.SByte" => PrimitiveType::Int8,
        "Edm.Date" | "Edm.DateTime" | "Edm.Time" | "Edm.TimeOfDay" | "Edm.DateTimeOffset" => {
            PrimitiveType::DateTime
        }
        "Edm.Decimal" | "Edm.Double" => PrimitiveType::Double,
        "Edm.Float" | "Edm.Single" => PrimitiveType::Float,
        "Edm.Guid" => PrimitiveType::Uuid,
        "Edm.Int16" => PrimitiveType::Int16,
        "Edm.Int32" => PrimitiveType::Int32,
        "Edm.Int64" => PrimitiveType::Int64,
        "Edm.Duration" => PrimitiveType::Duration,
        _ => {
            return Err(ODataError::UnknownPrimitiveType {
                name: name.to_string(),
            })
        }
    };
    Ok(EdmType::Primitive(primitive))
}

/// Strip any `Collection(...)` wrappers from a type name.
///
/// Returns the inner name and `Unbounded` if at least one wrapper was present.
pub fn unwrap_collection(type_name: &str) -> Result<(&str, Cardinality), ODataError> {
    let mut inner = type_name.trim();
    let mut cardinality = Cardinality::Single;

    while let Some(rest) = inner.strip_prefix(COLLECTION_PREFIX) {
        inner = rest
            .strip_suffix(')')
            .ok_or_else(|| ODataError::format(format!("Unterminated collection type: {type_name}")))?
            .trim();
        cardinality = Cardinality::Unbounded;
    }

    Ok((inner, cardinality))
}
