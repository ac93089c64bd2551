//! Named types, structures and fields of the type registry

use super::PrimitiveType;

/// Index of a named type inside its [`TypeRegistry`](super::TypeRegistry).
///
/// Ids are only meaningful for the registry that minted them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a field holds: a host scalar or a registered named type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    Named(TypeId),
}

impl TypeRef {
    pub fn named(&self) -> Option<TypeId> {
        match self {
            TypeRef::Named(id) => Some(*id),
            TypeRef::Primitive(_) => None,
        }
    }
}

/// Field cardinality (maxOccurs 1 vs unbounded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    Single,
    Unbounded,
}

/// Formatting directive attached to scalar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Guids are rendered in the 8-4-4-4-12 dashed form
    DashedUuid,
}

/// Foreign key marker: the field refers to `target_field` of the type `target_id`,
/// established through the navigation property `navigation`.
///
/// Minted ids do not carry the namespace, so two schemas declaring the same
/// local name share an id. `target_id` then names the first declaration; use
/// [`TypeRegistry::lookup`](super::TypeRegistry::lookup) when the namespace is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub target_id: String,
    pub target_field: String,
    pub navigation: String,
}

impl ForeignKey {
    /// `<target id>:<target field>`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.target_id, self.target_field)
    }
}

/// A field of a structure
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub cardinality: Cardinality,
    pub nillable: bool,
    /// minOccurs = 1
    pub required: bool,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
    /// Name used on the wire when it differs from `name`
    pub alias: Option<String>,
    pub format: Option<FieldFormat>,
    /// Entity set the field's values live in, for navigation fields
    pub collection_name: Option<String>,
    /// Set on navigation fields cloned into a select extension
    pub duplicate: bool,
}

impl Field {
    /// A single, nillable, optional field
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            cardinality: Cardinality::Single,
            nillable: true,
            required: false,
            primary_key: false,
            foreign_key: None,
            alias: None,
            format: None,
            collection_name: None,
            duplicate: false,
        }
    }

    pub fn primitive(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self::new(name, TypeRef::Primitive(primitive))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.cardinality = Cardinality::Unbounded;
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Unbounded
    }
}

/// A complex type, entity type, derived extension or anonymous wrapper.
///
/// Anonymous wrappers (function inputs/outputs, update mappings) are never
/// registered and have an empty namespace and id.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub namespace: String,
    pub name: String,
    pub id: String,
    pub base: Option<TypeId>,
    /// Persistence marker; only entity types (and their select extensions) carry one
    pub collection_name: Option<String>,
    pub fields: Vec<Field>,
    /// Inherited fields excluded from this type
    pub restricted: Vec<String>,
    /// Fields added on top of the base type that the wire format also carries elsewhere
    pub duplicates: Vec<String>,
}

impl Structure {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            id: id.into(),
            base: None,
            collection_name: None,
            fields: Vec::new(),
            restricted: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn anonymous(name: impl Into<String>) -> Self {
        Self::new(String::new(), name, String::new())
    }

    pub fn is_entity(&self) -> bool {
        self.collection_name.is_some()
    }

    /// `<namespace>.<name>`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }
}

/// An `EnumType` with its members in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub namespace: String,
    pub name: String,
    pub members: Vec<String>,
}

/// A registered named type
#[derive(Debug, Clone, PartialEq)]
pub enum NamedType {
    Enumeration(Enumeration),
    Structure(Structure),
}

impl NamedType {
    pub fn namespace(&self) -> &str {
        match self {
            NamedType::Enumeration(e) => &e.namespace,
            NamedType::Structure(s) => &s.namespace,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NamedType::Enumeration(e) => &e.name,
            NamedType::Structure(s) => &s.name,
        }
    }

    /// Qualified id, only minted for structures
    pub fn id(&self) -> Option<&str> {
        match self {
            NamedType::Enumeration(_) => None,
            NamedType::Structure(s) => Some(&s.id),
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            NamedType::Structure(s) => Some(s),
            NamedType::Enumeration(_) => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut Structure> {
        match self {
            NamedType::Structure(s) => Some(s),
            NamedType::Enumeration(_) => None,
        }
    }

    pub fn as_enumeration(&self) -> Option<&Enumeration> {
        match self {
            NamedType::Enumeration(e) => Some(e),
            NamedType::Structure(_) => None,
        }
    }
}
