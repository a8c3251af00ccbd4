use anyhow::Result;
use rrps::{
    ConsumeMode, Keyspace, MemoryStore, MessageId, MessageStore, ReliablePubSub, RpsError,
    TomlConfig,
};
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "rrps_test";

fn pubsub() -> Result<ReliablePubSub<MemoryStore>> {
    Ok(ReliablePubSub::new(MemoryStore::new(), NAMESPACE)?)
}

/// 沒有訂閱者時發布的訊息，之後訂閱也收不到
#[tokio::test]
async fn test_publish_without_reader() -> Result<()> {
    let pubsub = pubsub()?;

    pubsub.publish_default("test", b"test message content").await?;

    let sub = pubsub.subscribe("test", "consumer").await?;
    assert!(sub.try_consume().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_publish_with_reader() -> Result<()> {
    let pubsub = pubsub()?;
    let sub = pubsub.subscribe("test", "consumer").await?;

    let receipt = pubsub.publish_default("test", b"test message content").await?;
    assert_eq!(receipt.recipients, 1);

    let message = sub.try_consume().await?.expect("message should be delivered");
    assert_eq!(message.payload_str(), "test message content");
    assert_eq!(message.id, receipt.id);
    assert_eq!(message.queue, "test");

    assert!(sub.try_consume().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_distinct_consumers_each_receive_every_message() -> Result<()> {
    let pubsub = pubsub()?;
    let invoicing = pubsub.subscribe("orders", "invoicing").await?;
    let fulfillment = pubsub.subscribe("orders", "fulfillment").await?;

    let first = pubsub.publish_default("orders", b"order 1").await?;
    let second = pubsub.publish_default("orders", b"order 2").await?;
    assert_eq!(first.recipients, 2);

    for sub in [&invoicing, &fulfillment] {
        let a = sub.try_consume().await?.expect("first order");
        let b = sub.try_consume().await?.expect("second order");
        assert_eq!((a.id, a.payload), (first.id, b"order 1".to_vec()));
        assert_eq!((b.id, b.payload), (second.id, b"order 2".to_vec()));
        assert!(sub.try_consume().await?.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_shared_consumer_id_distributes_work() -> Result<()> {
    let pubsub = pubsub()?;
    let worker_a = pubsub.subscribe("jobs", "workers").await?;
    let worker_b = pubsub.subscribe("jobs", "workers").await?;

    assert_eq!(pubsub.consumers("jobs").await?, vec!["workers".to_string()]);

    for n in 0..4 {
        let receipt = pubsub
            .publish_default("jobs", format!("job {}", n).as_bytes())
            .await?;
        assert_eq!(receipt.recipients, 1);
    }

    let mut seen = Vec::new();
    for worker in [&worker_a, &worker_b, &worker_a, &worker_b] {
        let message = worker.try_consume().await?.expect("job available");
        seen.push(message.payload_str().into_owned());
    }
    assert_eq!(seen, vec!["job 0", "job 1", "job 2", "job 3"]);
    assert!(worker_a.try_consume().await?.is_none());
    assert!(worker_b.try_consume().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_message_ids_increase_across_queues() -> Result<()> {
    let pubsub = pubsub()?;

    let a = pubsub.publish_default("a", b"1").await?;
    let b = pubsub.publish_default("b", b"2").await?;
    let c = pubsub.publish_default("a", b"3").await?;

    assert_eq!(a.id, MessageId(1));
    assert!(a.id < b.id && b.id < c.id);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_expired_messages_are_skipped() -> Result<()> {
    let pubsub = pubsub()?;
    let sub = pubsub.subscribe("events", "audit").await?;

    pubsub
        .publish("events", b"short lived", Duration::from_secs(5))
        .await?;
    pubsub
        .publish("events", b"long lived", Duration::from_secs(600))
        .await?;
    assert_eq!(sub.backlog().await?, 2);

    tokio::time::advance(Duration::from_secs(10)).await;

    let message = sub.try_consume().await?.expect("long lived message");
    assert_eq!(message.payload_str(), "long lived");
    assert_eq!(sub.backlog().await?, 0);
    assert!(sub.try_consume().await?.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_blocking_consume_times_out() -> Result<()> {
    let pubsub = pubsub()?;
    let sub = pubsub.subscribe("idle", "listener").await?;

    let started = tokio::time::Instant::now();
    let result = sub.consume_timeout(Duration::from_secs(3)).await?;

    assert!(result.is_none());
    assert!(started.elapsed() >= Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_blocking_consume_wakes_on_publish() -> Result<()> {
    let pubsub = pubsub()?;
    let sub = pubsub.subscribe("live", "listener").await?;

    let waiter = tokio::spawn(async move {
        sub.consume(ConsumeMode::Blocking { timeout: None }).await
    });

    tokio::task::yield_now().await;
    pubsub.publish_default("live", b"wake up").await?;

    let message = tokio::time::timeout(Duration::from_secs(5), waiter).await???;
    assert_eq!(message.map(|m| m.payload), Some(b"wake up".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_drops_pending_messages() -> Result<()> {
    let pubsub = pubsub()?;
    let sub = pubsub.subscribe("orders", "invoicing").await?;
    pubsub.publish_default("orders", b"pending").await?;
    assert_eq!(pubsub.backlog("orders", "invoicing").await?, 1);

    sub.unsubscribe().await?;

    assert!(pubsub.consumers("orders").await?.is_empty());
    assert_eq!(pubsub.backlog("orders", "invoicing").await?, 0);

    let receipt = pubsub.publish_default("orders", b"after").await?;
    assert_eq!(receipt.recipients, 0);

    // 重複取消訂閱不會出錯
    tokio_test::assert_ok!(pubsub.unsubscribe("orders", "invoicing").await);
    Ok(())
}

#[tokio::test]
async fn test_namespaces_are_isolated() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let shop = ReliablePubSub::with_keyspace(store.clone(), Keyspace::new("shop")?);
    let shop_eu = ReliablePubSub::with_keyspace(store.clone(), Keyspace::new("shop_eu")?);

    let sub = shop_eu.subscribe("orders", "invoicing").await?;
    shop.subscribe("orders", "invoicing").await?;
    shop.publish_default("orders", b"us order").await?;

    assert!(sub.try_consume().await?.is_none());

    let deleted = shop.purge().await?;
    assert!(deleted >= 3);
    assert!(store.scan_keys("shop.*").await?.is_empty());
    assert_eq!(
        shop_eu.consumers("orders").await?,
        vec!["invoicing".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_purge_resets_id_counter() -> Result<()> {
    let pubsub = pubsub()?;
    pubsub.publish_default("q", b"1").await?;
    pubsub.publish_default("q", b"2").await?;

    pubsub.purge().await?;

    let receipt = pubsub.publish_default("q", b"3").await?;
    assert_eq!(receipt.id, MessageId(1));
    Ok(())
}

#[tokio::test]
async fn test_queue_status_lists_backlogs() -> Result<()> {
    let pubsub = pubsub()?;
    let fast = pubsub.subscribe("orders", "fast").await?;
    pubsub.subscribe("orders", "slow").await?;

    pubsub.publish_default("orders", b"1").await?;
    pubsub.publish_default("orders", b"2").await?;
    fast.try_consume().await?;

    let status = pubsub.queue_status("orders").await?;
    let summary: Vec<(&str, u64)> = status
        .iter()
        .map(|entry| (entry.consumer.as_str(), entry.pending))
        .collect();
    assert_eq!(summary, vec![("fast", 1), ("slow", 2)]);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_entry_is_reported_and_dropped() -> Result<()> {
    let pubsub = pubsub()?;
    let sub = pubsub.subscribe("q", "c").await?;

    pubsub
        .store()
        .rpush(&format!("{}.q.c.messages", NAMESPACE), "not-an-id")
        .await?;
    pubsub.publish_default("q", b"good").await?;

    let err = sub.try_consume().await.unwrap_err();
    assert!(matches!(err, RpsError::CorruptEntry { .. }));

    let message = sub.try_consume().await?.expect("valid message after corrupt one");
    assert_eq!(message.payload_str(), "good");
    Ok(())
}

#[tokio::test]
async fn test_invalid_names_and_ttl_rejected() -> Result<()> {
    let pubsub = pubsub()?;

    assert!(matches!(
        pubsub.subscribe("orders.eu", "c").await,
        Err(RpsError::InvalidName { kind: "queue", .. })
    ));
    assert!(matches!(
        pubsub.subscribe("orders", "").await,
        Err(RpsError::InvalidName { kind: "consumer", .. })
    ));
    assert!(pubsub.publish("orders", b"x", Duration::ZERO).await.is_err());
    assert!(ReliablePubSub::new(MemoryStore::new(), "a*").is_err());
    Ok(())
}

/// 反斜線會讓 `shop\.*` 變成 `shop.*`，purge 時誤刪別的 namespace
#[tokio::test]
async fn test_backslash_names_rejected() -> Result<()> {
    let pubsub = pubsub()?;

    assert!(matches!(
        Keyspace::new("shop\\"),
        Err(RpsError::InvalidName { kind: "namespace", .. })
    ));
    assert!(matches!(
        pubsub.subscribe("orders\\", "c").await,
        Err(RpsError::InvalidName { kind: "queue", .. })
    ));
    assert!(matches!(
        pubsub.subscribe("orders", "in\\voicing").await,
        Err(RpsError::InvalidName { kind: "consumer", .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_publish_with_huge_ttl_is_an_error() -> Result<()> {
    let pubsub = pubsub()?;
    pubsub.subscribe("q", "c").await?;

    let result = pubsub
        .publish("q", b"forever", Duration::from_secs(u64::MAX))
        .await;

    assert!(matches!(result, Err(RpsError::StoreError { .. })));
    assert_eq!(pubsub.backlog("q", "c").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_from_config_uses_namespace_and_ttl() -> Result<()> {
    let config = TomlConfig::from_toml_str(
        r#"
[redis]
url = "redis://127.0.0.1:6379/0"

[namespace]
name = "billing"
default_ttl_seconds = 120
"#,
    )?;

    let pubsub = ReliablePubSub::from_config(MemoryStore::new(), &config)?;
    assert_eq!(pubsub.default_ttl(), Duration::from_secs(120));

    pubsub.subscribe("invoices", "mailer").await?;
    let receipt = pubsub.publish_default("invoices", b"inv-1").await?;
    assert_eq!(receipt.recipients, 1);
    assert!(pubsub
        .store()
        .get(&format!("billing.invoices.messages.{}", receipt.id))
        .await?
        .is_some());
    Ok(())
}
