//! Type registry: an arena of named types indexed by (namespace, name) and by qualified id
//!
//! Types refer to each other through [`TypeId`] indexes into this arena, never
//! through pointers, so forward references and cycles need no special handling.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::ODataError;

use super::{
    Enumeration, Field, NamedType, PrimitiveType, Structure, TypeId, GEOGRAPHY_POINT_NAME,
    GEOGRAPHY_POINT_NAMESPACE,
};

/// All named types of one parsed document
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<NamedType>,
    by_name: HashMap<(String, String), TypeId>,
    by_id: HashMap<String, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new type. Fails if (namespace, name) is already taken.
    pub(crate) fn register(&mut self, ty: NamedType) -> Result<TypeId, ODataError> {
        let key = (ty.namespace().to_string(), ty.name().to_string());
        if self.by_name.contains_key(&key) {
            return Err(ODataError::format(format!(
                "Type {}.{} is declared more than once",
                key.0, key.1
            )));
        }

        let id = TypeId(self.types.len());
        if let Some(qualified_id) = ty.id() {
            if self.by_id.contains_key(qualified_id) {
                // keep the first owner of the id, the later type stays reachable by name
                warn!(
                    "Qualified id {} of {}.{} is already owned by another type",
                    qualified_id, key.0, key.1
                );
            } else {
                self.by_id.insert(qualified_id.to_string(), id);
            }
        }
        self.by_name.insert(key, id);
        self.types.push(ty);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &NamedType)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    pub fn get(&self, id: TypeId) -> Option<&NamedType> {
        self.types.get(id.0)
    }

    pub fn lookup(&self, namespace: &str, name: &str) -> Option<TypeId> {
        self.by_name
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    /// Type owning a minted id.
    ///
    /// Ids are `<base>.<kind>.<Name>` without the namespace, so they are not
    /// unique when a local name repeats across schemas. The first registered
    /// type keeps the id; later ones are only reachable through [`Self::lookup`].
    pub fn lookup_id(&self, qualified_id: &str) -> Option<TypeId> {
        self.by_id.get(qualified_id).copied()
    }

    pub fn structure(&self, id: TypeId) -> Option<&Structure> {
        self.get(id).and_then(NamedType::as_structure)
    }

    pub(crate) fn structure_mut(&mut self, id: TypeId) -> Option<&mut Structure> {
        self.types.get_mut(id.0).and_then(NamedType::as_structure_mut)
    }

    pub fn structure_by_name(&self, namespace: &str, name: &str) -> Option<&Structure> {
        self.lookup(namespace, name).and_then(|id| self.structure(id))
    }

    /// Structure owning a minted id, see [`Self::lookup_id`]
    pub fn structure_by_id(&self, qualified_id: &str) -> Option<&Structure> {
        self.lookup_id(qualified_id).and_then(|id| self.structure(id))
    }

    pub fn enumeration(&self, namespace: &str, name: &str) -> Option<&Enumeration> {
        self.lookup(namespace, name)
            .and_then(|id| self.get(id))
            .and_then(NamedType::as_enumeration)
    }

    /// All fields of a structure, inherited ones first.
    ///
    /// Fields named in a type's `restricted` list are dropped from what it inherits.
    /// A base-type cycle stops at the first repeated type.
    pub fn all_fields(&self, id: TypeId) -> Vec<&Field> {
        let mut chain: Vec<&Structure> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(type_id) = current {
            if !seen.insert(type_id) {
                break;
            }
            let Some(structure) = self.structure(type_id) else {
                break;
            };
            chain.push(structure);
            current = structure.base;
        }

        let mut fields = Vec::new();
        // chain runs derived -> root; restrictions of a type apply to everything above it
        for (depth, structure) in chain.iter().enumerate().rev() {
            for field in &structure.fields {
                let restricted = chain[..depth]
                    .iter()
                    .any(|derived| derived.restricted.iter().any(|r| r == &field.name));
                if !restricted {
                    fields.push(field);
                }
            }
        }
        fields
    }

    /// The first field marked primary among all fields of a structure
    pub fn primary_key(&self, id: TypeId) -> Option<&Field> {
        self.all_fields(id).into_iter().find(|f| f.primary_key)
    }

    /// Walk the base chain of `id` looking for `ancestor`
    pub fn is_subtype_of(&self, id: TypeId, ancestor: TypeId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(type_id) = current {
            if type_id == ancestor {
                return true;
            }
            if !seen.insert(type_id) {
                return false;
            }
            current = self.structure(type_id).and_then(|s| s.base);
        }
        false
    }

    /// The GeographyPoint record, registered on first use
    pub(crate) fn geography_point(&mut self) -> Result<TypeId, ODataError> {
        if let Some(id) = self.lookup(GEOGRAPHY_POINT_NAMESPACE, GEOGRAPHY_POINT_NAME) {
            return Ok(id);
        }
        let mut point = Structure::new(
            GEOGRAPHY_POINT_NAMESPACE,
            GEOGRAPHY_POINT_NAME,
            format!("{}.{}", GEOGRAPHY_POINT_NAMESPACE, GEOGRAPHY_POINT_NAME),
        );
        point.add(Field::primitive("type", PrimitiveType::String));
        point.add(Field::primitive("coordinates", PrimitiveType::Double).unbounded());
        self.register(NamedType::Structure(point))
    }
}
