//! End-to-end tests: metadata files on disk through `inspect_metadata`

use pretty_assertions::assert_eq;

use rust_odata::model::{DefinitionSummary, HttpMethod, Operation};
use rust_odata::{
    inspect_metadata, parse_metadata_bytes, ExpansionRequest, InspectOptions, ODataError,
    ParserConfig,
};

use crate::common::{edmx, edmx_ns, TestContext, PRODUCTS_SCHEMA, SERVICE_URL};

fn options(metadata: Vec<String>) -> InspectOptions {
    InspectOptions {
        metadata,
        service_url: SERVICE_URL.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_inspect_single_document() {
    let ctx = TestContext::new();
    let path = ctx.write("products.xml", edmx_ns(PRODUCTS_SCHEMA));

    let results = inspect_metadata(&options(vec![path.display().to_string()])).unwrap();
    assert_eq!(results.len(), 1);

    let (parsed_path, definition) = &results[0];
    assert_eq!(parsed_path, &path);
    assert_eq!(definition.version(), "4.0");
    assert_eq!(definition.scheme(), "https");
    assert_eq!(definition.host(), "example.com");
    assert_eq!(definition.base_path(), "/odata/");

    let methods: Vec<HttpMethod> = definition.functions().iter().map(|f| f.method).collect();
    assert_eq!(
        methods,
        vec![
            HttpMethod::Post,
            HttpMethod::Get,
            HttpMethod::Get,
            HttpMethod::Delete,
            HttpMethod::Patch,
        ]
    );
    assert_eq!(
        definition.summary(),
        DefinitionSummary {
            enumerations: 0,
            // Product plus its select, insert and update extensions
            structures: 4,
            entity_types: 2,
            navigation_properties: 0,
            functions: 5,
        }
    );
}

#[test]
fn test_inspect_glob_keeps_documents_apart() {
    let ctx = TestContext::new();
    ctx.write("a.xml", edmx_ns(PRODUCTS_SCHEMA));
    ctx.write(
        "b.xml",
        edmx(&[(
            "Other",
            r#"
      <EnumType Name="Level"><Member Name="Low"/></EnumType>
      <EntityType Name="Thing">
        <Property Name="Name" Type="Edm.String"/>
      </EntityType>"#,
        )]),
    );
    ctx.write("notes.txt", "not metadata");

    let pattern = ctx.dir.join("*.xml").display().to_string();
    let results = inspect_metadata(&options(vec![pattern])).unwrap();

    let names: Vec<String> = results
        .iter()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.xml", "b.xml"]);

    let (_, first) = &results[0];
    assert!(first.registry().structure_by_name("Other", "Thing").is_none());
    let (_, second) = &results[1];
    assert!(second.functions().is_empty());
    assert_eq!(second.summary().enumerations, 1);
}

#[test]
fn test_inspect_merges_config_and_flags() {
    let ctx = TestContext::new();
    let schema = PRODUCTS_SCHEMA.replace(
        r#"<Property Name="Name" Type="Edm.String"/>"#,
        r#"<Property Name="Name" Type="Edm.String"/>
        <NavigationProperty Name="Supplier" Type="NS.Product"/>"#,
    );
    let path = ctx.write("products.xml", edmx_ns(&schema));
    let config = ctx.write("odata.xml", r#"<ODataConfiguration BaseId="from.file"/>"#);

    let mut options = options(vec![path.display().to_string()]);
    options.config_path = Some(config);
    options.base_id = Some("from.flag".to_string());
    options.expansions = vec![ExpansionRequest::new("NS.Product", ["Supplier"])];

    let results = inspect_metadata(&options).unwrap();
    let (_, definition) = &results[0];
    let registry = definition.registry();

    let select = registry
        .structure_by_id("from.flag.entities.ProductSelect")
        .expect("select extension not registered under the flag's base id");
    assert!(select.field("Supplier").is_some());
}

#[test]
fn test_inspect_reports_failing_document() {
    let ctx = TestContext::new();
    let path = ctx.write(
        "broken.xml",
        edmx_ns(r#"<ComplexType Name="X"><Property Name="Y" Type="NS.Z"/></ComplexType>"#),
    );

    let err = inspect_metadata(&options(vec![path.display().to_string()])).unwrap_err();
    assert!(err.to_string().contains("broken.xml"), "{err}");
    let cause = err.downcast_ref::<ODataError>().expect("not an ODataError");
    assert!(matches!(cause, ODataError::UnknownTypeReference { .. }));
}

#[test]
fn test_inspect_unmatched_pattern() {
    let ctx = TestContext::new();
    let pattern = ctx.dir.join("*.edmx").display().to_string();
    assert!(inspect_metadata(&options(vec![pattern])).is_err());
}

#[test]
fn test_bytes_with_utf8_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(edmx_ns(PRODUCTS_SCHEMA).as_bytes());

    let definition = parse_metadata_bytes(&bytes, SERVICE_URL, &ParserConfig::new()).unwrap();
    assert!(definition.function("Products", Operation::Update).is_some());
}
