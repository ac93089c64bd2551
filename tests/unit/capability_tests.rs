//! Unit tests for capability annotations on container members

use pretty_assertions::assert_eq;
use roxmltree::Document;

use rust_odata::model::Operation;
use rust_odata::parser::{CapabilityEvaluator, CapabilityFlags, EntitySetKind, ExpressionEvaluator};

use crate::common::{edmx_ns, parse};

const PERSON: &str = r#"
      <EntityType Name="Person">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Guid" Nullable="false"/>
        <Property Name="Name" Type="Edm.String"/>
      </EntityType>"#;

#[test]
fn test_singleton_gets_and_updates() {
    let xml = edmx_ns(&format!(
        r#"{PERSON}
      <EntityContainer Name="Container">
        <Singleton Name="Me" Type="NS.Person"/>
      </EntityContainer>"#
    ));
    let definition = parse(&xml);

    let operations: Vec<Operation> = definition.functions_for("Me").map(|f| f.operation).collect();
    assert_eq!(operations, vec![Operation::Get, Operation::Update]);
    assert_eq!(
        definition
            .registry()
            .structure_by_name("NS", "Person")
            .and_then(|p| p.collection_name.as_deref()),
        Some("Me")
    );
}

#[test]
fn test_singleton_update_can_be_disabled() {
    let xml = edmx_ns(&format!(
        r#"{PERSON}
      <EntityContainer Name="Container">
        <Singleton Name="Me" Type="NS.Person">
          <Annotation Term="Org.OData.Capabilities.V1.UpdateRestrictions">
            <Record><PropertyValue Property="Updatable" Bool="false"/></Record>
          </Annotation>
        </Singleton>
      </EntityContainer>"#
    ));
    let definition = parse(&xml);

    let operations: Vec<Operation> = definition.functions_for("Me").map(|f| f.operation).collect();
    assert_eq!(operations, vec![Operation::Get]);
}

#[test]
fn test_prefixed_annotations_are_read() {
    let xml = r#"<edm:EntitySet xmlns:edm="http://docs.oasis-open.org/odata/ns/edm" Name="People" EntityType="NS.Person">
  <edm:Annotation Term="Org.OData.Capabilities.V1.SearchRestrictions">
    <edm:Record>
      <edm:PropertyValue Property="Searchable" Bool="false"/>
    </edm:Record>
  </edm:Annotation>
</edm:EntitySet>"#;
    let doc = Document::parse(xml).unwrap();
    let mut evaluator = ExpressionEvaluator::new();

    let capabilities = CapabilityEvaluator::new(&mut evaluator)
        .evaluate(doc.root_element(), EntitySetKind::EntitySet)
        .unwrap();
    assert_eq!(
        capabilities.flags,
        CapabilityFlags {
            searchable: false,
            ..CapabilityFlags::default()
        }
    );
}

#[test]
fn test_queries_are_cached_across_entity_sets() {
    let doc = Document::parse(r#"<Container><EntitySet Name="A"/><EntitySet Name="B"/></Container>"#)
        .unwrap();
    let mut evaluator = ExpressionEvaluator::new();

    let sets: Vec<_> = doc.root_element().children().filter(|n| n.is_element()).collect();
    CapabilityEvaluator::new(&mut evaluator)
        .evaluate(sets[0], EntitySetKind::EntitySet)
        .unwrap();
    let cached = evaluator.cached_queries();
    CapabilityEvaluator::new(&mut evaluator)
        .evaluate(sets[1], EntitySetKind::EntitySet)
        .unwrap();

    assert!(cached > 0);
    assert_eq!(evaluator.cached_queries(), cached);
}
