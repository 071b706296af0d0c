//! Publish-then-fetch against a real Kafka broker.
//!
//! Test flow:
//! 1. Create a single-partition topic with a unique name
//! 2. Publish through a create command
//! 3. Fetch through the registered dataset and a relation at offset 0

use dataset_attributes::AttributeMap;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::ClientConfig;
use serde_json::{json, Value};
use std::time::Duration;
use topic_gateway::Gateway;

fn broker() -> String {
    std::env::var("KAFKA_BROKER").unwrap_or_else(|_| "localhost:9092".to_string())
}

fn map(value: Value) -> AttributeMap {
    value.as_object().cloned().unwrap_or_default()
}

async fn create_topic(broker: &str, topic: &str) -> anyhow::Result<()> {
    let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", broker)
        .create()?;

    let new_topic = NewTopic::new(topic, 1, TopicReplication::Fixed(1));
    let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(5)));

    for result in admin_client.create_topics(&[new_topic], &opts).await? {
        if let Err((name, err)) = result {
            anyhow::bail!("Failed to create topic {name}: {err}");
        }
    }
    Ok(())
}

#[tokio::test]
#[ignore = "needs a Kafka broker"]
async fn test_publish_then_fetch() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("topic_gateway=debug,kafka_session=debug")
        .try_init()
        .ok();

    let broker = broker();
    let topic = format!("scholars-{}", uuid::Uuid::new_v4());
    create_topic(&broker, &topic).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let expected: Vec<String> = vec!["Matthew".into(), "Mark".into()];
    let topic_name = topic.clone();
    let broker_line = broker.clone();

    // Sessions block on the broker; keep them off the async workers.
    let fetched = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut gateway = Gateway::connect(
            [broker_line],
            &map(json!({ "client_id": "topic-gateway-e2e", "required_acks": -1, "max_wait_ms": 5000 })),
        )?;
        gateway.dataset(&topic_name)?;

        let insert = gateway.command(&topic_name)?.with(&map(json!({ "key": 0 })))?;
        let sent = insert.call(["Matthew", "Mark"])?;
        assert!(sent.iter().all(|tuple| tuple.offset.is_none()));

        let first = gateway.get(&topic_name).map(|d| d.to_vec()).transpose()?;
        let again = gateway.relation(&topic_name)?.offset(0)?.to_vec()?;
        gateway.close()?;
        Ok((first.unwrap_or_default(), again))
    })
    .await??;

    let (first, again) = fetched;
    for tuples in [&first, &again] {
        let values: Vec<String> = tuples.iter().map(|tuple| tuple.value.clone()).collect();
        assert_eq!(values, expected);
        assert_eq!(
            tuples.iter().map(|tuple| tuple.offset).collect::<Vec<_>>(),
            vec![Some(0), Some(1)]
        );
        assert!(tuples.iter().all(|tuple| tuple.key.as_deref() == Some("0")));
        assert!(tuples.iter().all(|tuple| tuple.topic == topic));
    }
    Ok(())
}
