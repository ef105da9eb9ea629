// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use schemaview::high::Composition;
use schemaview::*;
use serde::Deserialize;
use serde_json::{json, Value};
use test_generator::test_resources;

lazy_static::lazy_static! {
    static ref FALLBACK_CONFIG_LOCK: Mutex<()> = Mutex::new(());
}

fn load(value: Value) -> Result<Arc<low::Schema>> {
    Ok(Arc::new(low::Schema::from_serde_json_value(
        &value,
        &low::Node::new(""),
    )?))
}

fn materializer(workers: usize) -> Materializer {
    let workers = NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN);
    Materializer::with_config(MaterializeConfig::default().with_workers(workers))
}

fn pointers(proxies: &[SchemaProxy]) -> Vec<String> {
    proxies
        .iter()
        .map(|p| p.value_node().map(|n| n.pointer().to_string()).unwrap_or_default())
        .collect()
}

#[test]
fn scenario_all_of_and_properties() -> Result<()> {
    let low = load(json!({
        "allOf": [{ "title": "A" }, { "title": "B" }, { "title": "C" }],
        "properties": { "x": { "title": "X" }, "y": { "title": "Y" } }
    }))?;
    let schema = Schema::new(Arc::clone(&low))?;

    let titles: Vec<_> = schema
        .all_of
        .iter()
        .map(|p| p.schema().map(|s| s.title))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        titles,
        [Some("A".into()), Some("B".into()), Some("C".into())]
    );

    let keys: Vec<_> = schema.properties.keys().cloned().collect();
    assert_eq!(keys, ["x", "y"]);
    for (key, proxy) in &schema.properties {
        assert_eq!(
            proxy.schema()?.title.as_deref(),
            Some(key.to_uppercase().as_str())
        );
        assert_eq!(
            proxy.key_node().map(|n| n.pointer().to_string()),
            Some(format!("/properties/{key}"))
        );
    }
    assert!(Arc::ptr_eq(schema.as_low(), &low));
    Ok(())
}

#[test]
fn scenario_empty_input() -> Result<()> {
    let low = load(json!({ "type": "string", "maxLength": 4 }))?;
    let schema = Schema::new(low)?;

    for category in Composition::ALL {
        assert!(schema.composition(category).is_empty(), "{category} not empty");
    }
    assert!(schema.properties.is_empty());
    assert_eq!(schema.max_length, Some(4));
    Ok(())
}

#[test]
fn scenario_fifty_one_of_elements() -> Result<()> {
    let members: Vec<Value> = (0..50).map(|i| json!({ "title": format!("m{i}") })).collect();
    let low = load(json!({ "oneOf": members }))?;
    let schema = materializer(8).materialize(Arc::clone(&low))?;

    let input = Composition::OneOf.of_low(&low);
    assert_eq!(schema.one_of.len(), 50);
    for (proxy, reference) in schema.one_of.iter().zip(input) {
        assert!(Arc::ptr_eq(proxy.as_low(), &reference.value));
        assert!(proxy
            .value_node()
            .is_some_and(|node| Arc::ptr_eq(node, &reference.value_node)));
    }
    let expected: Vec<String> = (0..50).map(|i| format!("/oneOf/{i}")).collect();
    assert_eq!(pointers(&schema.one_of), expected);
    Ok(())
}

#[test]
fn cardinality_per_slot() -> Result<()> {
    for n in 0..6usize {
        let list: Vec<Value> = (0..n).map(|i| json!({ "minimum": i })).collect();
        let low = load(json!({
            "allOf": list, "oneOf": list, "anyOf": list, "not": list, "items": list
        }))?;
        let schema = materializer(3).materialize(low)?;
        for category in Composition::ALL {
            let proxies = schema.composition(category);
            assert_eq!(proxies.len(), n, "{category} with {n} elements");
            let expected: Vec<String> =
                (0..n).map(|i| format!("/{}/{i}", category.name())).collect();
            assert_eq!(pointers(proxies), expected);
        }
    }
    Ok(())
}

#[test]
fn key_integrity() -> Result<()> {
    let properties: serde_json::Map<String, Value> = (0..200)
        .map(|i| (format!("p{i}"), json!({ "description": format!("value of p{i}") })))
        .collect();
    let low = load(json!({ "properties": properties }))?;
    let schema = materializer(16).materialize(low)?;

    assert_eq!(schema.properties.len(), 200);
    for (i, (key, proxy)) in schema.properties.iter().enumerate() {
        assert_eq!(key, &format!("p{i}"));
        let description = proxy.schema()?.description;
        assert_eq!(description, Some(format!("value of {key}")));
    }
    Ok(())
}

#[test]
fn idempotence() -> Result<()> {
    let low = load(json!({
        "title": "Pet",
        "required": ["id"],
        "enum": ["a", 1],
        "anyOf": [{ "type": "string" }, { "type": "integer" }],
        "items": { "type": "boolean" },
        "properties": { "id": { "type": "integer" }, "tag": { "type": "string" } },
        "discriminator": { "propertyName": "tag" },
        "x-owner": "pets"
    }))?;

    let first = materializer(4).materialize(Arc::clone(&low))?;
    let second = materializer(1).materialize(Arc::clone(&low))?;
    assert_eq!(first, second);

    // Same shape, different low-level node: not the same provenance.
    let other = Schema::new(load(json!({ "title": "Pet" }))?)?;
    assert_ne!(first, other);
    Ok(())
}

#[test]
fn many_units_terminate() -> Result<()> {
    let properties: serde_json::Map<String, Value> = (0..1000)
        .map(|i| (format!("field_{i:04}"), json!({ "type": "string" })))
        .collect();
    let five: Vec<Value> = (0..5).map(|i| json!({ "title": i.to_string() })).collect();
    let low = load(json!({
        "allOf": five, "oneOf": five, "anyOf": five, "not": five, "items": five,
        "properties": properties
    }))?;

    for workers in [1, 4, 64] {
        let schema = materializer(workers).materialize(Arc::clone(&low))?;
        assert_eq!(schema.properties.len(), 1000);
        for category in Composition::ALL {
            assert_eq!(schema.composition(category).len(), 5);
        }
        assert!(schema.properties.keys().enumerate().all(|(i, k)| k == &format!("field_{i:04}")));
    }
    Ok(())
}

#[test]
fn generous_timeout_succeeds() -> Result<()> {
    let low = load(json!({ "allOf": [{}, {}], "properties": { "a": {} } }))?;
    let config = MaterializeConfig::default().with_timeout(Some(Duration::from_secs(30)));
    let start = Instant::now();
    let schema = Materializer::with_config(config).materialize(low)?;
    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(schema.all_of.len(), 2);
    Ok(())
}

#[test]
fn fallback_config_applies() -> Result<()> {
    let _guard = FALLBACK_CONFIG_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let previous = fallback_materialize_config();

    let two = NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN);
    set_fallback_materialize_config(Some(MaterializeConfig::default().with_workers(two)));
    assert_eq!(Materializer::new().config().workers, two);

    let three = NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN);
    let mut materializer = Materializer::new();
    materializer.set_config(Some(MaterializeConfig::default().with_workers(three)));
    assert_eq!(materializer.config().workers, three);
    materializer.set_config(None);
    assert_eq!(materializer.config().workers, two);

    set_fallback_materialize_config(previous);
    Ok(())
}

#[test]
fn reference_proxies_stay_lazy() -> Result<()> {
    let low = load(json!({
        "allOf": [{ "$ref": "#/components/schemas/Base" }, { "title": "extra" }]
    }))?;
    let schema = Schema::new(low)?;

    assert!(schema.all_of[0].is_reference());
    assert_eq!(schema.all_of[0].reference(), Some("#/components/schemas/Base"));
    match schema.all_of[0].schema() {
        Err(MaterializeError::Build(low::BuildError::UnresolvedReference { reference, .. })) => {
            assert_eq!(&*reference, "#/components/schemas/Base")
        }
        other => bail!("expected unresolved reference, got {other:?}"),
    }
    assert!(!schema.all_of[1].is_reference());
    assert_eq!(schema.all_of[1].schema()?.title.as_deref(), Some("extra"));
    Ok(())
}

#[test]
fn nested_dereference() -> Result<()> {
    let low = load(json!({
        "properties": {
            "owner": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "oneOf": [{ "required": ["name"] }]
            }
        }
    }))?;
    let schema = Schema::new(low)?;
    let owner = schema.properties["owner"].schema()?;
    assert_eq!(owner.type_.as_deref(), Some("object"));
    assert_eq!(owner.one_of[0].schema()?.required, ["name"]);
    assert_eq!(
        owner.properties["name"]
            .value_node()
            .map(|n| n.pointer().to_string()),
        Some("/properties/owner/properties/name".to_string())
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    #[serde(default)]
    workers: Option<usize>,
    schema: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    required: Option<Vec<String>>,
    #[serde(rename = "enum", default)]
    enum_values: Option<Vec<String>>,
    #[serde(default)]
    compositions: BTreeMap<Composition, Vec<String>>,
    #[serde(default)]
    properties: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let result = low::Schema::from_serde_json_value(&case.schema, &low::Node::new(""))
        .map_err(MaterializeError::from)
        .and_then(|low| materializer(case.workers.unwrap_or(4)).materialize(Arc::new(low)));

    let schema = match (result, &case.error) {
        (Ok(schema), None) => schema,
        (Err(e), Some(expected)) => {
            let actual = e.to_string();
            if !actual.contains(expected.as_str()) {
                bail!("error '{actual}' does not contain '{expected}'");
            }
            return Ok(());
        }
        (Ok(_), Some(expected)) => bail!("expected error containing '{expected}'"),
        (Err(e), None) => return Err(e.into()),
    };

    if let Some(title) = &case.title {
        assert_eq!(schema.title.as_ref(), Some(title));
    }
    if let Some(required) = &case.required {
        assert_eq!(&schema.required, required);
    }
    if let Some(enum_values) = &case.enum_values {
        assert_eq!(&schema.enum_values, enum_values);
    }
    for category in Composition::ALL {
        let expected = case
            .compositions
            .get(&category)
            .cloned()
            .unwrap_or_default();
        assert_eq!(pointers(schema.composition(category)), expected, "{category}");
    }
    if let Some(properties) = &case.properties {
        let keys: Vec<_> = schema.properties.keys().cloned().collect();
        assert_eq!(&keys, properties);
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    std::println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        std::print!("\ncase {} ", case.note);
        run_case(case)?;
        std::println!("passed");
    }

    std::println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/materialize/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
