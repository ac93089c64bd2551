//! Capability flags of an entity set or singleton, read from
//! `Org.OData.Capabilities.V1` annotations.
//!
//! An absent annotation is permissive: every flag defaults to true.

use crate::error::ODataError;

use super::query::ExpressionEvaluator;

/// Whether the container member is a collection or a single instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySetKind {
    EntitySet,
    Singleton,
}

/// Operations an entity set supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFlags {
    pub insertable: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
    pub skip_supported: bool,
    pub top_supported: bool,
    pub count_supported: bool,
    pub deletable: bool,
    pub updatable: bool,
    pub listable: bool,
    pub gettable: bool,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            insertable: true,
            searchable: true,
            filterable: true,
            sortable: true,
            skip_supported: true,
            top_supported: true,
            count_supported: true,
            deletable: true,
            updatable: true,
            listable: true,
            gettable: true,
        }
    }
}

/// Flags plus the property lists and bindings that shape derived payloads
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub flags: CapabilityFlags,
    pub non_insertable_properties: Vec<String>,
    pub non_insertable_navigation_properties: Vec<String>,
    pub non_updatable_properties: Vec<String>,
    pub non_updatable_navigation_properties: Vec<String>,
    /// `NavigationPropertyBinding` Path -> Target, in declaration order
    pub navigation_bindings: Vec<(String, String)>,
}

impl Capabilities {
    pub fn binding_target(&self, navigation: &str) -> Option<&str> {
        self.navigation_bindings
            .iter()
            .find(|(path, _)| path == navigation)
            .map(|(_, target)| target.as_str())
    }
}

const INSERTABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.InsertRestrictions']/edm:Record/edm:PropertyValue[@Property='Insertable']/@Bool";
const NON_INSERTABLE_PROPERTIES: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.InsertRestrictions']/edm:Record/edm:PropertyValue[@Property='NonInsertableProperties']/edm:Collection/edm:PropertyPath";
const NON_INSERTABLE_NAVIGATION_PROPERTIES: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.InsertRestrictions']/edm:Record/edm:PropertyValue[@Property='NonInsertableNavigationProperties']/edm:Collection/edm:NavigationPropertyPath";
const SEARCHABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SearchRestrictions']/edm:Record/edm:PropertyValue[@Property='Searchable']/@Bool";
const SELECT_SEARCHABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SelectSupport']/edm:Record/edm:PropertyValue[@Property='Searchable']/@Bool";
const SELECT_FILTERABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SelectSupport']/edm:Record/edm:PropertyValue[@Property='Filterable']/@Bool";
const SELECT_SORTABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SelectSupport']/edm:Record/edm:PropertyValue[@Property='Sortable']/@Bool";
const SKIP_SUPPORTED: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SkipSupported']/@Bool";
const SELECT_SKIP_SUPPORTED: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SelectSupport']/edm:Record/edm:PropertyValue[@Property='SkipSupported']/@Bool";
const TOP_SUPPORTED: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.TopSupported']/@Bool";
const SELECT_TOP_SUPPORTED: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SelectSupport']/edm:Record/edm:PropertyValue[@Property='TopSupported']/@Bool";
const COUNTABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.CountRestrictions']/edm:Record/edm:PropertyValue[@Property='Countable']/@Bool";
const SELECT_COUNT_SUPPORTED: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.SelectSupport']/edm:Record/edm:PropertyValue[@Property='CountSupported']/@Bool";
const DELETABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.DeleteRestrictions']/edm:Record/edm:PropertyValue[@Property='Deletable']/@Bool";
const UPDATABLE: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.UpdateRestrictions']/edm:Record/edm:PropertyValue[@Property='Updatable']/@Bool";
const NON_UPDATABLE_PROPERTIES: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.UpdateRestrictions']/edm:Record/edm:PropertyValue[@Property='NonUpdatableProperties']/edm:Collection/edm:PropertyPath";
const NON_UPDATABLE_NAVIGATION_PROPERTIES: &str = "edm:Annotation[@Term='Org.OData.Capabilities.V1.UpdateRestrictions']/edm:Record/edm:PropertyValue[@Property='NonUpdatableNavigationProperties']/edm:Collection/edm:NavigationPropertyPath";
const NAVIGATION_BINDINGS: &str = "edm:NavigationPropertyBinding";

/// Reads the capability table for one container member
pub struct CapabilityEvaluator<'e> {
    evaluator: &'e mut ExpressionEvaluator,
}

impl<'e> CapabilityEvaluator<'e> {
    pub fn new(evaluator: &'e mut ExpressionEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn evaluate(
        &mut self,
        node: roxmltree::Node,
        kind: EntitySetKind,
    ) -> Result<Capabilities, ODataError> {
        let collection = kind == EntitySetKind::EntitySet;

        // search/skip/top/count combine the legacy term with SelectSupport
        let flags = CapabilityFlags {
            insertable: collection && self.flag(node, INSERTABLE)?,
            searchable: collection
                && self.flag(node, SEARCHABLE)?
                && self.flag(node, SELECT_SEARCHABLE)?,
            filterable: collection && self.flag(node, SELECT_FILTERABLE)?,
            sortable: collection && self.flag(node, SELECT_SORTABLE)?,
            skip_supported: collection
                && self.flag(node, SKIP_SUPPORTED)?
                && self.flag(node, SELECT_SKIP_SUPPORTED)?,
            top_supported: collection
                && self.flag(node, TOP_SUPPORTED)?
                && self.flag(node, SELECT_TOP_SUPPORTED)?,
            count_supported: collection
                && self.flag(node, COUNTABLE)?
                && self.flag(node, SELECT_COUNT_SUPPORTED)?,
            deletable: collection && self.flag(node, DELETABLE)?,
            updatable: self.flag(node, UPDATABLE)?,
            listable: collection,
            gettable: true,
        };

        let mut navigation_bindings = Vec::new();
        for binding in self.evaluator.elements(node, NAVIGATION_BINDINGS)? {
            if let (Some(path), Some(target)) = (binding.attribute("Path"), binding.attribute("Target")) {
                navigation_bindings.push((path.to_string(), target.to_string()));
            }
        }

        Ok(Capabilities {
            flags,
            non_insertable_properties: self.evaluator.strings(node, NON_INSERTABLE_PROPERTIES)?,
            non_insertable_navigation_properties: self
                .evaluator
                .strings(node, NON_INSERTABLE_NAVIGATION_PROPERTIES)?,
            non_updatable_properties: self.evaluator.strings(node, NON_UPDATABLE_PROPERTIES)?,
            non_updatable_navigation_properties: self
                .evaluator
                .strings(node, NON_UPDATABLE_NAVIGATION_PROPERTIES)?,
            navigation_bindings,
        })
    }

    /// `"true"` unless the annotation says otherwise
    fn flag(&mut self, node: roxmltree::Node, query: &str) -> Result<bool, ODataError> {
        Ok(self.evaluator.string_or(node, query, "true")? == "true")
    }
}
