//! The parsed service definition: registry, navigation properties and CRUD functions

use super::{Field, Structure, TypeId, TypeRegistry};

/// A typed relationship declared on a structure
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationProperty {
    /// `<namespace>.<name>` of the owning structure
    pub qualified_name: String,
    pub owner: TypeId,
    /// The field this navigation produces; its type is the target structure
    pub field: Field,
    /// Maps local properties (aliases) to referenced-type properties for PATCH payloads
    pub update_mapping: Option<Structure>,
    pub contains_target: bool,
}

impl NavigationProperty {
    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn target(&self) -> Option<TypeId> {
        self.field.ty.named()
    }
}

/// HTTP method a function is invoked with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRUD operation kinds, in generation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Get,
    Delete,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::Update => "update",
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Operation::Create => HttpMethod::Post,
            Operation::List | Operation::Get => HttpMethod::Get,
            Operation::Delete => HttpMethod::Delete,
            // a PATCH carrying the full document, used as a PUT
            Operation::Update => HttpMethod::Patch,
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Delete | Operation::Update
        )
    }
}

/// One operation exposed on an entity set
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    /// Entity set (or singleton) name
    pub context: String,
    pub operation: Operation,
    pub method: HttpMethod,
    pub input: Structure,
    pub output: Structure,
    /// True for mutating operations
    pub action: bool,
}

impl FunctionDescriptor {
    pub fn new(
        context: impl Into<String>,
        operation: Operation,
        input: Structure,
        output: Structure,
    ) -> Self {
        Self {
            context: context.into(),
            operation,
            method: operation.method(),
            input,
            output,
            action: operation.is_action(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.operation.as_str()
    }
}

/// Counts reported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefinitionSummary {
    pub enumerations: usize,
    pub structures: usize,
    pub entity_types: usize,
    pub navigation_properties: usize,
    pub functions: usize,
}

/// Everything derived from one metadata document
#[derive(Debug)]
pub struct Definition {
    version: String,
    scheme: String,
    host: String,
    base_path: String,
    registry: TypeRegistry,
    functions: Vec<FunctionDescriptor>,
    navigation_properties: Vec<NavigationProperty>,
}

/// Where the service lives; fills the location part of a [`Definition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocation {
    pub scheme: String,
    pub host: String,
    pub base_path: String,
}

impl Definition {
    pub(crate) fn new(
        version: String,
        location: ServiceLocation,
        registry: TypeRegistry,
        functions: Vec<FunctionDescriptor>,
        navigation_properties: Vec<NavigationProperty>,
    ) -> Self {
        Self {
            version,
            scheme: location.scheme,
            host: location.host,
            base_path: location.base_path,
            registry,
            functions,
            navigation_properties,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn navigation_properties(&self) -> &[NavigationProperty] {
        &self.navigation_properties
    }

    /// Functions of one entity set, in generation order
    pub fn functions_for<'a>(
        &'a self,
        context: &'a str,
    ) -> impl Iterator<Item = &'a FunctionDescriptor> + 'a {
        self.functions.iter().filter(move |f| f.context == context)
    }

    pub fn function(&self, context: &str, operation: Operation) -> Option<&FunctionDescriptor> {
        self.functions
            .iter()
            .find(|f| f.context == context && f.operation == operation)
    }

    /// Navigation properties declared on the structure `<namespace>.<name>`
    pub fn navigation_properties_for<'a>(
        &'a self,
        qualified_name: &'a str,
    ) -> impl Iterator<Item = &'a NavigationProperty> + 'a {
        self.navigation_properties
            .iter()
            .filter(move |n| n.qualified_name == qualified_name)
    }

    pub fn summary(&self) -> DefinitionSummary {
        let mut summary = DefinitionSummary {
            navigation_properties: self.navigation_properties.len(),
            functions: self.functions.len(),
            ..Default::default()
        };
        for (_, ty) in self.registry.iter() {
            match ty.as_structure() {
                Some(s) => {
                    summary.structures += 1;
                    if s.is_entity() {
                        summary.entity_types += 1;
                    }
                }
                None => summary.enumerations += 1,
            }
        }
        summary
    }
}
