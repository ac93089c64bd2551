//! Five-phase traversal of an EDMX document.
//!
//! Declarations may reference each other in any order, across schemas, so
//! the walk is split into phases that each finish over the whole document
//! before the next one starts:
//!
//! 1. aliases and enumerations
//! 2. empty stubs for every complex and entity type
//! 3. base types, properties, navigations and keys
//! 4. deferred `@odata.id` links to target primary keys
//! 5. entity sets and singletons, capabilities and CRUD functions
//!
//! All mutable state lives in a [`ParseContext`] owned by one parse.

use std::collections::VecDeque;

use roxmltree::{Document, Node};
use tracing::{debug, info, warn};

use crate::config::ParserConfig;
use crate::error::ODataError;
use crate::model::{
    is_edm_name, map_edm_type, unwrap_collection, Definition, EdmType, Enumeration, Field,
    FieldFormat, ForeignKey, FunctionDescriptor, NamedType, NavigationProperty, PrimitiveType,
    ServiceLocation, Structure, TypeId, TypeRef, TypeRegistry,
};

use super::alias::{split_qualified, AliasTable};
use super::capabilities::{CapabilityEvaluator, EntitySetKind};
use super::crud::{CrudSchemaGenerator, EntitySetDecl};
use super::query::ExpressionEvaluator;

pub const NS_EDM: &str = "http://docs.oasis-open.org/odata/ns/edm";
pub const NS_EDMX: &str = "http://docs.oasis-open.org/odata/ns/edmx";

const ODATA_ID_SUFFIX: &str = "@odata.id";

/// Navigation awaiting its target's primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredLink {
    pub owner: TypeId,
    /// Index into the navigation property list
    pub navigation: usize,
}

/// A complex or entity type declaration waiting for phase 3
struct TypeDecl<'a, 'input> {
    id: TypeId,
    node: Node<'a, 'input>,
    namespace: &'a str,
}

/// Per-parse state
pub struct ParseContext<'c> {
    config: &'c ParserConfig,
    aliases: AliasTable,
    registry: TypeRegistry,
    navigations: Vec<NavigationProperty>,
    deferred: VecDeque<DeferredLink>,
    functions: Vec<FunctionDescriptor>,
    evaluator: ExpressionEvaluator,
}

impl<'c> ParseContext<'c> {
    pub fn new(config: &'c ParserConfig) -> Self {
        Self {
            config,
            aliases: AliasTable::new(),
            registry: TypeRegistry::new(),
            navigations: Vec::new(),
            deferred: VecDeque::new(),
            functions: Vec::new(),
            evaluator: ExpressionEvaluator::new(),
        }
    }
}

/// Drives the five phases over one document
pub struct SchemaWalker<'c> {
    ctx: ParseContext<'c>,
}

impl<'c> SchemaWalker<'c> {
    pub fn new(config: &'c ParserConfig) -> Self {
        Self {
            ctx: ParseContext::new(config),
        }
    }

    /// Walk the document and produce its definition. Any error discards all state.
    pub fn walk(mut self, doc: &Document, location: ServiceLocation) -> Result<Definition, ODataError> {
        let root = doc.root_element();
        if root.tag_name().name() != "Edmx" {
            return Err(ODataError::format(format!(
                "Not an edmx document, the root tag is: {}",
                root.tag_name().name()
            )));
        }
        let version = root.attribute("Version").unwrap_or_default().to_string();
        if version.is_empty() {
            warn!("Edmx root has no Version attribute");
        }

        let data_services: Vec<Node> = children(root, NS_EDMX, "DataServices").collect();
        if data_services.is_empty() {
            return Err(ODataError::format("Edmx document has no DataServices element"));
        }
        let schemas: Vec<Node> = data_services
            .iter()
            .flat_map(|ds| children(*ds, NS_EDM, "Schema"))
            .collect();

        let mut namespaces = Vec::with_capacity(schemas.len());
        for schema in &schemas {
            namespaces.push(self.register_schema(*schema)?);
        }

        for (schema, namespace) in schemas.iter().zip(&namespaces) {
            self.register_enumerations(*schema, *namespace)?;
        }

        let mut declarations = Vec::new();
        for (schema, namespace) in schemas.iter().zip(&namespaces) {
            self.register_stubs(*schema, *namespace, &mut declarations)?;
        }
        info!(
            "Registered {} types across {} schemas ({} aliases)",
            self.ctx.registry.len(),
            schemas.len(),
            self.ctx.aliases.len()
        );

        for decl in &declarations {
            self.fill_structure(decl)?;
        }

        self.resolve_deferred_links()?;

        for (schema, namespace) in schemas.iter().zip(&namespaces) {
            for container in children(*schema, NS_EDM, "EntityContainer") {
                self.derive_container(container, *namespace)?;
            }
        }
        info!(
            "Generated {} functions for {} navigation properties",
            self.ctx.functions.len(),
            self.ctx.navigations.len()
        );

        let ctx = self.ctx;
        Ok(Definition::new(
            version,
            location,
            ctx.registry,
            ctx.functions,
            ctx.navigations,
        ))
    }

    // ========================================================================
    // Phase 1: aliases and enumerations
    // ========================================================================

    fn register_schema<'a>(&mut self, schema: Node<'a, '_>) -> Result<&'a str, ODataError> {
        let namespace = required_attribute(schema, "Namespace")?;
        if let Some(alias) = schema.attribute("Alias") {
            self.ctx.aliases.register(alias, namespace);
        }
        Ok(namespace)
    }

    fn register_enumerations(&mut self, schema: Node, namespace: &str) -> Result<(), ODataError> {
        for enum_type in children(schema, NS_EDM, "EnumType") {
            let name = required_attribute(enum_type, "Name")?;
            let members = children(enum_type, NS_EDM, "Member")
                .map(|m| required_attribute(m, "Name").map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            debug!("Parsing enum {}: {:?}", name, members);
            self.ctx
                .registry
                .register(NamedType::Enumeration(Enumeration {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    members,
                }))?;
        }
        Ok(())
    }

    // ========================================================================
    // Phase 2: stubs
    // ========================================================================

    fn register_stubs<'a, 'input>(
        &mut self,
        schema: Node<'a, 'input>,
        namespace: &'a str,
        declarations: &mut Vec<TypeDecl<'a, 'input>>,
    ) -> Result<(), ODataError> {
        let complex = children(schema, NS_EDM, "ComplexType");
        let entities = children(schema, NS_EDM, "EntityType");
        for node in complex.chain(entities) {
            let name = required_attribute(node, "Name")?;
            let is_entity = node.tag_name().name() == "EntityType";
            debug!("Preparsing complex type {}", name);

            let kind = if is_entity { "entities" } else { "types" };
            let mut structure = Structure::new(namespace, name, self.ctx.config.mint_id(kind, name));
            // the collection name marks entity types as persisted
            if is_entity {
                structure.collection_name = Some(name.to_string());
            }
            let id = self.ctx.registry.register(NamedType::Structure(structure))?;
            declarations.push(TypeDecl {
                id,
                node,
                namespace,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Phase 3: fields, navigations, keys
    // ========================================================================

    fn fill_structure(&mut self, decl: &TypeDecl) -> Result<(), ODataError> {
        let node = decl.node;
        let name = required_attribute(node, "Name")?;
        debug!("Parsing complex type {}", name);

        if let Some(base_type) = node.attribute("BaseType") {
            let base = match self.resolve_type(base_type)? {
                TypeRef::Named(id) if self.ctx.registry.structure(id).is_some() => id,
                _ => {
                    return Err(ODataError::format(format!(
                        "Base type {base_type} of {name} is not a structured type"
                    )))
                }
            };
            self.structure_mut(decl.id)?.base = Some(base);
        }

        for property in children(node, NS_EDM, "Property") {
            let field = self.build_field(property)?;
            self.structure_mut(decl.id)?.add(field);
        }

        for navigation in children(node, NS_EDM, "NavigationProperty") {
            self.add_navigation(decl, name, navigation)?;
        }

        let keys: Vec<&str> = children(node, NS_EDM, "Key")
            .flat_map(|key| children(key, NS_EDM, "PropertyRef"))
            .map(|r| required_attribute(r, "Name"))
            .collect::<Result<_, _>>()?;
        // composite keys are not supported, only a single key is marked
        if let [key] = keys.as_slice() {
            match self.structure_mut(decl.id)?.field_mut(key) {
                Some(field) => field.primary_key = true,
                None => warn!("Key {} of {} does not name a declared property", key, name),
            }
        } else if keys.len() > 1 {
            debug!("{} has a composite key, no primary key is marked", name);
        }
        Ok(())
    }

    fn add_navigation(
        &mut self,
        decl: &TypeDecl,
        owner_name: &str,
        node: Node,
    ) -> Result<(), ODataError> {
        let field = self.build_field(node)?;
        let target = match field.ty {
            TypeRef::Named(id) => self.ctx.registry.structure(id).map(|s| s.id.clone()),
            TypeRef::Primitive(_) => None,
        }
        .ok_or_else(|| {
            ODataError::format(format!(
                "Navigation property {} of {} does not target a structured type",
                field.name, owner_name
            ))
        })?;

        let mut update_mapping = Structure::anonymous(field.name.clone());
        let mut referenced = false;
        for constraint in children(node, NS_EDM, "ReferentialConstraint") {
            let property = required_attribute(constraint, "Property")?;
            let referenced_property = required_attribute(constraint, "ReferencedProperty")?;
            update_mapping.add(
                Field::primitive(referenced_property, PrimitiveType::String).with_alias(property),
            );

            if let Some(local) = self.structure_mut(decl.id)?.field_mut(property) {
                local.foreign_key = Some(ForeignKey {
                    target_id: target.clone(),
                    target_field: referenced_property.to_string(),
                    navigation: field.name.clone(),
                });
                referenced = true;
            }
        }

        let index = self.ctx.navigations.len();
        if !referenced {
            // the target's key may only be marked later in this phase
            self.ctx.deferred.push_back(DeferredLink {
                owner: decl.id,
                navigation: index,
            });
        }
        self.ctx.navigations.push(NavigationProperty {
            qualified_name: format!("{}.{}", decl.namespace, owner_name),
            owner: decl.id,
            field,
            update_mapping: (!update_mapping.fields.is_empty()).then_some(update_mapping),
            contains_target: node.attribute("ContainsTarget") == Some("true"),
        });
        Ok(())
    }

    fn build_field(&mut self, node: Node) -> Result<Field, ODataError> {
        let name = required_attribute(node, "Name")?;
        let type_name = required_attribute(node, "Type")?;
        let (inner, cardinality) = unwrap_collection(type_name)?;
        debug!("\tParsing child {} of type {}", name, inner);

        let ty = self.resolve_type(inner)?;
        let nillable = node.attribute("Nullable").map_or(true, |n| n == "true");
        let mut field = Field::new(name, ty).with_cardinality(cardinality);
        field.nillable = nillable;
        field.required = !nillable;
        if ty == TypeRef::Primitive(PrimitiveType::Uuid) {
            field.format = Some(FieldFormat::DashedUuid);
        }
        Ok(field)
    }

    /// Alias substitution, then the Edm mapper, then the registry
    fn resolve_type(&mut self, name: &str) -> Result<TypeRef, ODataError> {
        let name = name.trim();
        let unknown = || ODataError::UnknownTypeReference {
            name: name.to_string(),
        };
        let (namespace, local) = split_qualified(name).ok_or_else(unknown)?;
        let namespace = self.ctx.aliases.resolve(namespace);
        let qualified = format!("{namespace}.{local}");

        if is_edm_name(&qualified) {
            return match map_edm_type(&qualified)? {
                EdmType::Primitive(primitive) => Ok(TypeRef::Primitive(primitive)),
                EdmType::GeographyPoint => Ok(TypeRef::Named(self.ctx.registry.geography_point()?)),
            };
        }

        self.ctx
            .registry
            .lookup(namespace, local)
            .map(TypeRef::Named)
            .ok_or_else(unknown)
    }

    fn structure_mut(&mut self, id: TypeId) -> Result<&mut Structure, ODataError> {
        self.ctx
            .registry
            .structure_mut(id)
            .ok_or_else(|| ODataError::format(format!("Type {} is not a structure", id.index())))
    }

    // ========================================================================
    // Phase 4: deferred links
    // ========================================================================

    fn resolve_deferred_links(&mut self) -> Result<(), ODataError> {
        let mut linked = 0;
        while let Some(link) = self.ctx.deferred.pop_front() {
            let navigation = self.ctx.navigations.get(link.navigation).ok_or_else(|| {
                ODataError::format(format!("Unknown navigation index {}", link.navigation))
            })?;
            let Some(target) = navigation.target() else {
                continue;
            };
            let Some(target_id) = self.ctx.registry.structure(target).map(|s| s.id.clone()) else {
                continue;
            };
            let Some(primary_key) = self.ctx.registry.primary_key(target) else {
                continue;
            };

            let mut field = primary_key.clone();
            field.name = format!("{}{}", navigation.name(), ODATA_ID_SUFFIX);
            field.required = false;
            field.cardinality = navigation.field.cardinality;
            field.primary_key = false;
            field.alias = None;
            field.foreign_key = Some(ForeignKey {
                target_id,
                target_field: primary_key.name.clone(),
                navigation: navigation.name().to_string(),
            });

            self.structure_mut(link.owner)?.add(field);
            linked += 1;
        }
        debug!("Resolved {} deferred navigation links", linked);
        Ok(())
    }

    // ========================================================================
    // Phase 5: entity sets and CRUD derivation
    // ========================================================================

    fn derive_container(&mut self, container: Node, namespace: &str) -> Result<(), ODataError> {
        for member in container.children().filter(|c| c.is_element()) {
            let kind = match member.tag_name().name() {
                "EntitySet" => EntitySetKind::EntitySet,
                "Singleton" => EntitySetKind::Singleton,
                _ => continue,
            };
            if member.tag_name().namespace() != Some(NS_EDM) {
                continue;
            }
            self.derive_entity_set(member, namespace, kind)?;
        }
        Ok(())
    }

    fn derive_entity_set(
        &mut self,
        node: Node,
        namespace: &str,
        kind: EntitySetKind,
    ) -> Result<(), ODataError> {
        let name = required_attribute(node, "Name")?;
        let type_attribute = match kind {
            EntitySetKind::EntitySet => "EntityType",
            EntitySetKind::Singleton => "Type",
        };
        let type_name = required_attribute(node, type_attribute)?;
        let entity = match self.resolve_type(type_name)? {
            TypeRef::Named(id) if self.ctx.registry.structure(id).is_some() => id,
            _ => {
                return Err(ODataError::format(format!(
                    "Entity set {name} is bound to {type_name}, which is not a structured type"
                )))
            }
        };
        self.structure_mut(entity)?.collection_name = Some(name.to_string());

        let capabilities = CapabilityEvaluator::new(&mut self.ctx.evaluator).evaluate(node, kind)?;
        let set = EntitySetDecl {
            name: name.to_string(),
            namespace: namespace.to_string(),
            entity,
            kind,
        };
        let functions = CrudSchemaGenerator::new(
            &mut self.ctx.registry,
            &self.ctx.navigations,
            &self.ctx.config.expansions,
        )
        .generate(&set, &capabilities)?;
        self.ctx.functions.extend(functions);
        Ok(())
    }
}

/// Element children with the given namespace and local name
fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    namespace: &'static str,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |c| {
        c.is_element() && c.tag_name().name() == name && c.tag_name().namespace() == Some(namespace)
    })
}

fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, ODataError> {
    node.attribute(name).ok_or_else(|| {
        ODataError::format(format!(
            "<{}> is missing the {} attribute",
            node.tag_name().name(),
            name
        ))
    })
}

/// Parse a document with fresh per-parse state
pub fn walk_document(
    doc: &Document,
    location: ServiceLocation,
    config: &ParserConfig,
) -> Result<Definition, ODataError> {
    SchemaWalker::new(config).walk(doc, location)
}
