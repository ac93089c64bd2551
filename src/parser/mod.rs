//! EDMX metadata parsing

mod alias;
mod capabilities;
mod crud;
mod query;
mod walker;

pub use alias::{split_qualified, AliasTable};
pub use capabilities::{Capabilities, CapabilityEvaluator, CapabilityFlags, EntitySetKind};
pub use crud::{CrudSchemaGenerator, EntitySetDecl};
pub use query::{ExpressionEvaluator, QueryNode, QueryResult};
pub use walker::{walk_document, DeferredLink, ParseContext, SchemaWalker, NS_EDM, NS_EDMX};
