//! Runs against a live server when `RRPS_TEST_REDIS_URL` is set, e.g.
//! `RRPS_TEST_REDIS_URL=redis://127.0.0.1:6379/15 cargo test --test redis_integration_test`.
//! Each test uses its own namespace and purges it first.

use anyhow::Result;
use rrps::{RedisStore, ReliablePubSub};
use std::time::Duration;

async fn connect(namespace: &str) -> Result<Option<ReliablePubSub<RedisStore>>> {
    let Ok(url) = std::env::var("RRPS_TEST_REDIS_URL") else {
        eprintln!("RRPS_TEST_REDIS_URL not set, skipping");
        return Ok(None);
    };

    let store = RedisStore::connect(&url).await?;
    let pubsub = ReliablePubSub::new(store, namespace)?;
    pubsub.purge().await?;
    Ok(Some(pubsub))
}

#[tokio::test]
async fn test_connection_working() -> Result<()> {
    let Some(pubsub) = connect("rrps_it_ping").await? else {
        return Ok(());
    };
    pubsub.ping().await?;
    Ok(())
}

#[tokio::test]
async fn test_publish_without_reader() -> Result<()> {
    let Some(pubsub) = connect("rrps_it_no_reader").await? else {
        return Ok(());
    };

    pubsub.publish_default("test", b"test message content").await?;

    let sub = pubsub.subscribe("test", "consumer").await?;
    assert!(sub.try_consume().await?.is_none());

    pubsub.purge().await?;
    Ok(())
}

#[tokio::test]
async fn test_publish_with_reader() -> Result<()> {
    let Some(pubsub) = connect("rrps_it_reader").await? else {
        return Ok(());
    };

    let sub = pubsub.subscribe("test", "consumer").await?;
    pubsub.publish_default("test", b"test message content").await?;

    let message = sub.try_consume().await?.expect("message should be delivered");
    assert_eq!(message.payload_str(), "test message content");

    pubsub.purge().await?;
    Ok(())
}

#[tokio::test]
async fn test_blocking_consume_with_timeout() -> Result<()> {
    let Some(pubsub) = connect("rrps_it_blocking").await? else {
        return Ok(());
    };

    let sub = pubsub.subscribe("live", "listener").await?;
    assert!(sub
        .consume_timeout(Duration::from_millis(200))
        .await?
        .is_none());

    let publisher = pubsub.clone();
    let waiter = tokio::spawn(async move { sub.consume_timeout(Duration::from_secs(5)).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    publisher.publish_default("live", b"wake up").await?;

    let message = waiter.await??.expect("blocked consumer should be woken");
    assert_eq!(message.payload_str(), "wake up");

    pubsub.purge().await?;
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_removes_keys() -> Result<()> {
    let Some(pubsub) = connect("rrps_it_unsubscribe").await? else {
        return Ok(());
    };

    let sub = pubsub.subscribe("orders", "invoicing").await?;
    pubsub.publish_default("orders", b"pending").await?;
    assert_eq!(pubsub.backlog("orders", "invoicing").await?, 1);

    sub.unsubscribe().await?;
    assert!(pubsub.consumers("orders").await?.is_empty());
    assert_eq!(pubsub.backlog("orders", "invoicing").await?, 0);

    pubsub.purge().await?;
    Ok(())
}
