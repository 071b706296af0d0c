//! Kafka E2E tests
//!
//! These run against a real broker (`KAFKA_BROKER`, default `localhost:9092`)
//! and are ignored by default:
//!
//! ```bash
//! KAFKA_BROKER=localhost:9092 cargo test --test kafka -- --ignored
//! ```

mod scholars_lib;
