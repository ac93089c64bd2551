//! CRUD schema generation for one entity set.
//!
//! From an entity type and its capability flags this derives
//! - a select extension (read shape, with opt-in navigation expansions)
//! - insert/update extensions (write shapes, with `@odata.bind` siblings)
//! - the create, list, get, delete and update function descriptors

use tracing::debug;

use crate::config::ExpansionRequest;
use crate::error::ODataError;
use crate::model::{
    Field, FunctionDescriptor, NamedType, NavigationProperty, Operation, PrimitiveType, Structure,
    TypeId, TypeRef, TypeRegistry,
};

use super::capabilities::{Capabilities, EntitySetKind};

const BIND_SUFFIX: &str = "@odata.bind";

/// An `EntitySet` or `Singleton` of an entity container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySetDecl {
    pub name: String,
    /// Namespace of the schema declaring the container
    pub namespace: String,
    pub entity: TypeId,
    pub kind: EntitySetKind,
}

/// Which restriction lists apply to a write extension
struct PayloadRestrictions<'c> {
    suffix: &'static str,
    properties: &'c [String],
    navigations: &'c [String],
}

pub struct CrudSchemaGenerator<'a> {
    registry: &'a mut TypeRegistry,
    navigations: &'a [NavigationProperty],
    expansions: &'a [ExpansionRequest],
}

impl<'a> CrudSchemaGenerator<'a> {
    pub fn new(
        registry: &'a mut TypeRegistry,
        navigations: &'a [NavigationProperty],
        expansions: &'a [ExpansionRequest],
    ) -> Self {
        Self {
            registry,
            navigations,
            expansions,
        }
    }

    /// Register the extensions of `set` and return its functions in the order
    /// create, list, get, delete, update.
    pub fn generate(
        &mut self,
        set: &EntitySetDecl,
        capabilities: &Capabilities,
    ) -> Result<Vec<FunctionDescriptor>, ODataError> {
        let flags = &capabilities.flags;
        let primary_key = self.registry.primary_key(set.entity).cloned();
        let mut functions = Vec::new();

        if flags.insertable {
            let insert = self.payload_extension(
                set,
                capabilities,
                PayloadRestrictions {
                    suffix: "Insert",
                    properties: &capabilities.non_insertable_properties,
                    navigations: &capabilities.non_insertable_navigation_properties,
                },
            )?;
            functions.push(create_function(set, insert, primary_key.as_ref()));
        }

        let select = self.select_extension(set)?;

        if flags.listable {
            functions.push(list_function(set, select, capabilities));
        }

        if let Some(key) = &primary_key {
            if flags.gettable {
                let mut input = Structure::anonymous("input");
                input.add(key.clone().required());
                let mut output = Structure::anonymous("output");
                output.add(Field::new("result", TypeRef::Named(select)).optional());
                functions.push(FunctionDescriptor::new(
                    &set.name,
                    Operation::Get,
                    input,
                    output,
                ));
            }

            if flags.deletable {
                let mut input = Structure::anonymous("input");
                input.add(key.clone().required());
                functions.push(FunctionDescriptor::new(
                    &set.name,
                    Operation::Delete,
                    input,
                    Structure::anonymous("output"),
                ));
            }

            if flags.updatable {
                let update = self.payload_extension(
                    set,
                    capabilities,
                    PayloadRestrictions {
                        suffix: "Update",
                        properties: &capabilities.non_updatable_properties,
                        navigations: &capabilities.non_updatable_navigation_properties,
                    },
                )?;
                let mut input = Structure::anonymous("input");
                input.add(key.clone().required());
                input.add(Field::new("update", TypeRef::Named(update)).required());
                functions.push(FunctionDescriptor::new(
                    &set.name,
                    Operation::Update,
                    input,
                    Structure::anonymous("output"),
                ));
            }
        }

        debug!(
            "Entity set {}: {}",
            set.name,
            functions
                .iter()
                .map(|f| f.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(functions)
    }

    fn entity(&self, set: &EntitySetDecl) -> Result<&Structure, ODataError> {
        self.registry.structure(set.entity).ok_or_else(|| {
            ODataError::format(format!("Entity set {} has no structured type", set.name))
        })
    }

    fn own_navigations(&self, entity: TypeId) -> impl Iterator<Item = &'a NavigationProperty> {
        let navigations: &'a [NavigationProperty] = self.navigations;
        navigations.iter().filter(move |n| n.owner == entity)
    }

    /// Subtype of the entity named `<set><suffix>` with id `<entity id><suffix>`
    fn extension(&self, set: &EntitySetDecl, suffix: &str) -> Result<Structure, ODataError> {
        let entity = self.entity(set)?;
        let mut extension = Structure::new(
            set.namespace.clone(),
            format!("{}{}", set.name, suffix),
            format!("{}{}", entity.id, suffix),
        );
        extension.base = Some(set.entity);
        Ok(extension)
    }

    fn select_extension(&mut self, set: &EntitySetDecl) -> Result<TypeId, ODataError> {
        let entity = self.entity(set)?;
        let entity_id = entity.id.clone();
        let qualified_name = entity.qualified_name();
        let collection_name = entity.collection_name.clone();

        let mut select = self.extension(set, "Select")?;
        select.collection_name = collection_name;

        let expanded: Vec<&str> = self
            .expansions
            .iter()
            .filter(|e| e.matches(&entity_id, &qualified_name))
            .flat_map(|e| e.navigations.iter().map(String::as_str))
            .collect();

        if !expanded.is_empty() {
            for navigation in self.own_navigations(set.entity) {
                if expanded.contains(&navigation.name()) {
                    let mut field = navigation.field.clone();
                    field.duplicate = true;
                    select.duplicates.push(field.name.clone());
                    select.add(field);
                }
            }
        }

        self.registry.register(NamedType::Structure(select))
    }

    /// Insert or update extension: restricted properties are dropped from the
    /// inherited fields, every remaining navigation is cloned in next to an
    /// `<nav>@odata.bind` reference field.
    fn payload_extension(
        &mut self,
        set: &EntitySetDecl,
        capabilities: &Capabilities,
        restrictions: PayloadRestrictions<'_>,
    ) -> Result<TypeId, ODataError> {
        let mut extension = self.extension(set, restrictions.suffix)?;
        extension.restricted = restrictions.properties.to_vec();

        for navigation in self.own_navigations(set.entity) {
            let name = navigation.name();
            if restrictions.properties.iter().any(|r| r == name)
                || restrictions.navigations.iter().any(|r| r == name)
            {
                continue;
            }
            let mut field = navigation.field.clone();
            field.collection_name = capabilities.binding_target(name).map(str::to_string);
            let bind = Field::primitive(format!("{name}{BIND_SUFFIX}"), PrimitiveType::String)
                .optional()
                .with_cardinality(field.cardinality);
            extension.add(field);
            extension.add(bind);
        }

        self.registry.register(NamedType::Structure(extension))
    }
}

fn create_function(
    set: &EntitySetDecl,
    insert: TypeId,
    primary_key: Option<&Field>,
) -> FunctionDescriptor {
    let mut input = Structure::anonymous("input");
    input.add(Field::new("create", TypeRef::Named(insert)).required());
    let mut output = Structure::anonymous("output");
    if let Some(key) = primary_key {
        output.add(key.clone());
    }
    FunctionDescriptor::new(&set.name, Operation::Create, input, output)
}

fn list_function(
    set: &EntitySetDecl,
    select: TypeId,
    capabilities: &Capabilities,
) -> FunctionDescriptor {
    let flags = &capabilities.flags;
    let mut input = Structure::anonymous("input");
    if flags.searchable {
        input.add(Field::primitive("search", PrimitiveType::String));
    }
    if flags.filterable {
        input.add(Field::primitive("filter", PrimitiveType::String));
    }
    if flags.sortable {
        input.add(Field::primitive("orderBy", PrimitiveType::String).unbounded());
    }
    if flags.top_supported {
        input.add(Field::primitive("limit", PrimitiveType::Int32));
    }
    if flags.skip_supported {
        input.add(Field::primitive("offset", PrimitiveType::Int64));
    }
    if flags.count_supported {
        input.add(Field::primitive("totalCount", PrimitiveType::Boolean));
    }

    let mut output = Structure::anonymous("output");
    output.add(
        Field::new("results", TypeRef::Named(select))
            .unbounded()
            .with_alias("value"),
    );
    if flags.count_supported {
        output.add(Field::primitive("count", PrimitiveType::Int64).with_alias("@odata.count"));
    }
    FunctionDescriptor::new(&set.name, Operation::List, input, output)
}
