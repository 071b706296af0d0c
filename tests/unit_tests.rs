//! Unit tests for broker resolution and declared attributes as seen through
//! the gateway's public API.

use broker_address::{resolve, BrokerAddressSpec, BrokerEndpoint};
use dataset_attributes::{AttributeMap, Attributes};
use kafka_session::{MemoryBroker, ProducerSession};
use serde_json::{json, Value};
use std::sync::Arc;
use topic_gateway::{Dataset, Gateway, GatewayConfig};

fn map(value: Value) -> AttributeMap {
    value.as_object().cloned().unwrap_or_default()
}

fn lines(endpoints: &[BrokerEndpoint]) -> Vec<String> {
    endpoints.iter().map(ToString::to_string).collect()
}

#[test]
fn test_resolve_mixed_input() {
    let endpoints = resolve(&["127.0.0.1:9092"], &["127.0.0.2"], Some(9093)).unwrap();
    assert_eq!(lines(&endpoints), vec!["127.0.0.1:9092", "127.0.0.2:9093"]);
}

#[test]
fn test_resolve_empty_input() {
    let endpoints = resolve::<&str>(&[], &[], None).unwrap();
    assert_eq!(endpoints, vec![BrokerEndpoint::default()]);
    assert_eq!(lines(&endpoints), vec!["localhost:9092"]);
}

#[test]
fn test_resolve_keeps_duplicates_in_order() {
    let spec = BrokerAddressSpec::from_args(&[
        json!("b:9094"),
        json!(["a", "b:9094"]),
        json!({ "hosts": "c", "port": "9095", "client_id": "ignored" }),
    ])
    .unwrap();
    assert_eq!(
        lines(&spec.resolve().unwrap()),
        vec!["b:9094", "a:9095", "b:9094", "c:9095"]
    );
}

#[test]
fn test_gateway_and_config_resolve_alike() {
    let broker = MemoryBroker::new();
    let options = map(json!({ "client_id": "admin", "hosts": ["127.0.0.2"], "port": 9093 }));
    let gateway = Gateway::new(["127.0.0.1:9092"], &options, Arc::new(broker.connector())).unwrap();

    let config = GatewayConfig {
        addresses: vec!["127.0.0.1:9092".to_string()],
        datasets: Vec::new(),
        options,
    };
    let from_config = config.build(Arc::new(broker.connector())).unwrap();

    assert_eq!(gateway.endpoints(), from_config.endpoints());
}

#[test]
fn test_configuration_is_idempotent() {
    let input = map(json!({ "partition": 2, "colour": "blue", "max_wait_ms": null }));
    let first = Dataset::configure(&input);
    let second = Dataset::configure(&input);

    assert_eq!(first, second);
    assert_eq!(first.get("colour"), None);
    assert_eq!(first.get("max_wait_ms"), Some(&json!(100)));

    let mut keys: Vec<&str> = first.keys().collect();
    let mut names: Vec<&str> = Dataset::schema().names().collect();
    keys.sort_unstable();
    names.sort_unstable();
    assert_eq!(keys, names);
}

#[test]
fn test_schemas_with_equal_names_agree() {
    let input = map(json!({ "required_acks": 1, "compression_codec": "snappy" }));
    let from_gateway = Gateway::configure(&input);
    let from_producer = ProducerSession::configure(&input);

    for (name, value) in from_producer.iter() {
        assert_eq!(from_gateway.get(name), Some(value), "attribute {name}");
    }
}
