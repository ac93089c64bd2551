//! Unit tests for CRUD function generation
//!
//! These tests verify the functions and payload extensions derived for
//! each entity set.

use pretty_assertions::assert_eq;

use rust_odata::model::{Cardinality, HttpMethod, Operation, PrimitiveType, TypeRef};
use rust_odata::{ExpansionRequest, ParserConfig};

use crate::common::{
    all_field_names, edmx_ns, field, field_names, parse, parse_with, structure, PRODUCTS_SCHEMA,
};

const ORDERS_SCHEMA: &str = r#"
      <EntityType Name="Order">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <Property Name="CreatedAt" Type="Edm.DateTimeOffset"/>
        <Property Name="Total" Type="Edm.Decimal"/>
        <NavigationProperty Name="Customer" Type="NS.Customer"/>
        <NavigationProperty Name="Lines" Type="Collection(NS.Line)"/>
        <NavigationProperty Name="Tags" Type="Collection(NS.Tag)"/>
      </EntityType>
      <EntityType Name="Customer">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
      </EntityType>
      <EntityType Name="Line">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
      </EntityType>
      <EntityType Name="Tag">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
      </EntityType>
      <EntityContainer Name="Container">
        <EntitySet Name="Orders" EntityType="NS.Order">
          <NavigationPropertyBinding Path="Customer" Target="Customers"/>
          <NavigationPropertyBinding Path="Tags" Target="Tags"/>
          <Annotation Term="Org.OData.Capabilities.V1.InsertRestrictions">
            <Record>
              <PropertyValue Property="NonInsertableProperties">
                <Collection><PropertyPath>CreatedAt</PropertyPath></Collection>
              </PropertyValue>
              <PropertyValue Property="NonInsertableNavigationProperties">
                <Collection><NavigationPropertyPath>Lines</NavigationPropertyPath></Collection>
              </PropertyValue>
            </Record>
          </Annotation>
          <Annotation Term="Org.OData.Capabilities.V1.UpdateRestrictions">
            <Record>
              <PropertyValue Property="NonUpdatableProperties">
                <Collection>
                  <PropertyPath>CreatedAt</PropertyPath>
                  <PropertyPath>Total</PropertyPath>
                </Collection>
              </PropertyValue>
            </Record>
          </Annotation>
        </EntitySet>
        <EntitySet Name="Customers" EntityType="NS.Customer"/>
      </EntityContainer>"#;

// ============================================================================
// Function list
// ============================================================================

#[test]
fn test_products_get_five_functions() {
    let definition = parse(&edmx_ns(PRODUCTS_SCHEMA));

    let functions: Vec<_> = definition.functions_for("Products").collect();
    let shape: Vec<(Operation, HttpMethod)> =
        functions.iter().map(|f| (f.operation, f.method)).collect();
    assert_eq!(
        shape,
        vec![
            (Operation::Create, HttpMethod::Post),
            (Operation::List, HttpMethod::Get),
            (Operation::Get, HttpMethod::Get),
            (Operation::Delete, HttpMethod::Delete),
            (Operation::Update, HttpMethod::Patch),
        ]
    );

    for operation in [Operation::Get, Operation::Delete, Operation::Update] {
        let function = definition.function("Products", operation).unwrap();
        let id = field(&function.input, "Id");
        assert!(id.required, "{operation:?} does not require Id");
        assert!(id.primary_key);
    }
    assert!(definition.function("Products", Operation::Create).unwrap().action);
    assert!(!definition.function("Products", Operation::List).unwrap().action);
}

#[test]
fn test_function_payloads() {
    let definition = parse(&edmx_ns(PRODUCTS_SCHEMA));
    let registry = definition.registry();
    let select = registry.lookup("NS", "ProductsSelect").unwrap();
    let insert = registry.lookup("NS", "ProductsInsert").unwrap();
    let update = registry.lookup("NS", "ProductsUpdate").unwrap();

    let create = definition.function("Products", Operation::Create).unwrap();
    assert_eq!(field(&create.input, "create").ty, TypeRef::Named(insert));
    assert!(field(&create.input, "create").required);
    assert_eq!(field_names(&create.output), vec!["Id"]);

    let get = definition.function("Products", Operation::Get).unwrap();
    let result = field(&get.output, "result");
    assert_eq!(result.ty, TypeRef::Named(select));
    assert!(!result.required);

    let delete = definition.function("Products", Operation::Delete).unwrap();
    assert!(delete.output.fields.is_empty());

    let patch = definition.function("Products", Operation::Update).unwrap();
    assert_eq!(field_names(&patch.input), vec!["Id", "update"]);
    assert_eq!(field(&patch.input, "update").ty, TypeRef::Named(update));
    assert!(patch.output.fields.is_empty());
}

#[test]
fn test_list_inputs_follow_capabilities() {
    let definition = parse(&edmx_ns(PRODUCTS_SCHEMA));
    let list = definition.function("Products", Operation::List).unwrap();

    assert_eq!(
        field_names(&list.input),
        vec!["search", "filter", "orderBy", "limit", "offset", "totalCount"]
    );
    assert_eq!(field(&list.input, "orderBy").cardinality, Cardinality::Unbounded);
    assert_eq!(
        field(&list.input, "offset").ty,
        TypeRef::Primitive(PrimitiveType::Int64)
    );

    let results = field(&list.output, "results");
    assert_eq!(results.cardinality, Cardinality::Unbounded);
    assert_eq!(results.alias.as_deref(), Some("value"));
    assert_eq!(
        field(&list.output, "count").alias.as_deref(),
        Some("@odata.count")
    );
}

#[test]
fn test_restricted_list_drops_inputs_and_count() {
    let schema = PRODUCTS_SCHEMA.replace(
        r#"<EntitySet Name="Products" EntityType="NS.Product"/>"#,
        r#"<EntitySet Name="Products" EntityType="NS.Product">
          <Annotation Term="Org.OData.Capabilities.V1.SelectSupport">
            <Record>
              <PropertyValue Property="Filterable" Bool="false"/>
              <PropertyValue Property="Sortable" Bool="false"/>
            </Record>
          </Annotation>
          <Annotation Term="Org.OData.Capabilities.V1.CountRestrictions">
            <Record><PropertyValue Property="Countable" Bool="false"/></Record>
          </Annotation>
          <Annotation Term="Org.OData.Capabilities.V1.TopSupported" Bool="false"/>
        </EntitySet>"#,
    );
    let definition = parse(&edmx_ns(&schema));
    let list = definition.function("Products", Operation::List).unwrap();

    assert_eq!(field_names(&list.input), vec!["search", "offset"]);
    assert_eq!(field_names(&list.output), vec!["results"]);
}

#[test]
fn test_not_insertable_and_not_deletable() {
    let schema = PRODUCTS_SCHEMA.replace(
        r#"<EntitySet Name="Products" EntityType="NS.Product"/>"#,
        r#"<EntitySet Name="Products" EntityType="NS.Product">
          <Annotation Term="Org.OData.Capabilities.V1.InsertRestrictions">
            <Record><PropertyValue Property="Insertable" Bool="false"/></Record>
          </Annotation>
          <Annotation Term="Org.OData.Capabilities.V1.DeleteRestrictions">
            <Record><PropertyValue Property="Deletable" Bool="false"/></Record>
          </Annotation>
        </EntitySet>"#,
    );
    let definition = parse(&edmx_ns(&schema));

    let operations: Vec<Operation> = definition
        .functions_for("Products")
        .map(|f| f.operation)
        .collect();
    assert_eq!(
        operations,
        vec![Operation::List, Operation::Get, Operation::Update]
    );
    assert!(definition
        .registry()
        .structure_by_name("NS", "ProductsInsert")
        .is_none());
}

#[test]
fn test_entity_without_key_only_creates_and_lists() {
    let schema = PRODUCTS_SCHEMA.replace(r#"<Key><PropertyRef Name="Id"/></Key>"#, "");
    let definition = parse(&edmx_ns(&schema));

    let operations: Vec<Operation> = definition
        .functions_for("Products")
        .map(|f| f.operation)
        .collect();
    assert_eq!(operations, vec![Operation::Create, Operation::List]);

    let create = definition.function("Products", Operation::Create).unwrap();
    assert!(create.output.fields.is_empty());
}

#[test]
fn test_functions_follow_entity_set_order() {
    let definition = parse(&edmx_ns(ORDERS_SCHEMA));

    let contexts: Vec<&str> = definition
        .functions()
        .iter()
        .map(|f| f.context.as_str())
        .collect();
    assert_eq!(
        contexts,
        vec![
            "Orders", "Orders", "Orders", "Orders", "Orders", "Customers", "Customers",
            "Customers", "Customers", "Customers",
        ]
    );
}

// ============================================================================
// Extensions
// ============================================================================

#[test]
fn test_extensions_subtype_the_entity() {
    let definition = parse_with(
        &edmx_ns(PRODUCTS_SCHEMA),
        &ParserConfig::new().with_base_id("shop"),
    );
    let registry = definition.registry();
    let product = registry.lookup("NS", "Product").unwrap();

    for (name, id) in [
        ("ProductsSelect", "shop.entities.ProductSelect"),
        ("ProductsInsert", "shop.entities.ProductInsert"),
        ("ProductsUpdate", "shop.entities.ProductUpdate"),
    ] {
        let extension = structure(&definition, "NS", name);
        assert_eq!(extension.id, id);
        assert_eq!(extension.base, Some(product));
        assert_eq!(all_field_names(registry, extension), vec!["Id", "Name"]);
    }

    // the entity set binds its name as the collection name
    assert_eq!(
        structure(&definition, "NS", "Product").collection_name.as_deref(),
        Some("Products")
    );
    assert_eq!(
        structure(&definition, "NS", "ProductsSelect")
            .collection_name
            .as_deref(),
        Some("Products")
    );
}

#[test]
fn test_insert_extension_restrictions_and_binds() {
    let definition = parse(&edmx_ns(ORDERS_SCHEMA));
    let registry = definition.registry();
    let insert = structure(&definition, "NS", "OrdersInsert");

    assert_eq!(insert.restricted, vec!["CreatedAt"]);
    assert_eq!(
        field_names(insert),
        vec!["Customer", "Customer@odata.bind", "Tags", "Tags@odata.bind"]
    );
    assert!(!all_field_names(registry, insert).contains(&"CreatedAt".to_string()));

    let customer = field(insert, "Customer");
    assert_eq!(customer.collection_name.as_deref(), Some("Customers"));

    let bind = field(insert, "Customer@odata.bind");
    assert_eq!(bind.ty, TypeRef::Primitive(PrimitiveType::String));
    assert_eq!(bind.cardinality, Cardinality::Single);
    assert!(!bind.required);
    assert_eq!(
        field(insert, "Tags@odata.bind").cardinality,
        Cardinality::Unbounded
    );
}

#[test]
fn test_update_extension_restrictions() {
    let definition = parse(&edmx_ns(ORDERS_SCHEMA));
    let registry = definition.registry();
    let update = structure(&definition, "NS", "OrdersUpdate");

    assert_eq!(update.restricted, vec!["CreatedAt", "Total"]);
    assert!(update.field("Lines").is_some());
    assert!(update.field("Lines@odata.bind").is_some());

    let names = all_field_names(registry, update);
    assert!(names.contains(&"Id".to_string()));
    assert!(!names.contains(&"Total".to_string()));
}

#[test]
fn test_select_extension_has_no_navigations_by_default() {
    let definition = parse(&edmx_ns(ORDERS_SCHEMA));
    let select = structure(&definition, "NS", "OrdersSelect");

    assert!(select.fields.is_empty());
    assert!(select.duplicates.is_empty());
}

#[test]
fn test_expansion_clones_navigation_into_select() {
    let schema = r#"
      <EntityType Name="Product">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <NavigationProperty Name="Supplier" Type="NS.Supplier"/>
        <NavigationProperty Name="Category" Type="NS.Supplier"/>
      </EntityType>
      <EntityType Name="Supplier">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
      </EntityType>
      <EntityContainer Name="Container">
        <EntitySet Name="Products" EntityType="NS.Product"/>
      </EntityContainer>"#;
    let config = ParserConfig::new().with_expansion(ExpansionRequest::new("NS.Product", ["Supplier"]));
    let definition = parse_with(&edmx_ns(schema), &config);

    let product = structure(&definition, "NS", "Product");
    assert!(product.field("Supplier").is_none());

    let select = structure(&definition, "NS", "ProductsSelect");
    assert_eq!(field_names(select), vec!["Supplier"]);
    assert_eq!(select.duplicates, vec!["Supplier"]);
    let supplier = field(select, "Supplier");
    assert!(supplier.duplicate);
    let target = definition.registry().lookup("NS", "Supplier").unwrap();
    assert_eq!(supplier.ty, TypeRef::Named(target));
}

#[test]
fn test_expansion_matches_minted_id() {
    let config = ParserConfig::new()
        .with_base_id("shop")
        .with_expansion(ExpansionRequest::new("shop.entities.Order", ["Lines"]));
    let definition = parse_with(&edmx_ns(ORDERS_SCHEMA), &config);

    let select = structure(&definition, "NS", "OrdersSelect");
    assert_eq!(field_names(select), vec!["Lines"]);
    assert!(structure(&definition, "NS", "CustomersSelect").fields.is_empty());
}
