//! Type registry and service definition model

mod definition;
mod primitives;
mod registry;
mod types;

pub use definition::{
    Definition, DefinitionSummary, FunctionDescriptor, HttpMethod, NavigationProperty, Operation,
    ServiceLocation,
};
pub use primitives::{
    is_edm_name, map_edm_type, unwrap_collection, EdmType, PrimitiveType, EDM_PREFIX,
    GEOGRAPHY_POINT_NAME, GEOGRAPHY_POINT_NAMESPACE,
};
pub use registry::TypeRegistry;
pub use types::{
    Cardinality, Enumeration, Field, FieldFormat, ForeignKey, NamedType, Structure, TypeId,
    TypeRef,
};
