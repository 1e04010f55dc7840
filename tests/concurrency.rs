#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nox_relay::core::ObfuscationKey;
use nox_relay::transport::ClientPortManager;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_acquire_same_client_creates_one_port() {
    let manager = Arc::new(ClientPortManager::new(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    let created = Arc::new(AtomicUsize::new(0));
    let client: SocketAddr = "127.0.0.1:41000".parse().unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..64 {
        let manager = Arc::clone(&manager);
        let created = Arc::clone(&created);
        tasks.spawn(async move {
            let port = manager
                .acquire(client, |_| {
                    created.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            port.id()
        });
    }

    let mut ids = Vec::new();
    while let Some(res) = tasks.join_next().await {
        ids.push(res.unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(ids.iter().all(|&id| id == 1));
    assert_eq!(manager.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_acquire_distinct_clients_get_distinct_ids() {
    let manager = Arc::new(ClientPortManager::new(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    let clients = 32u16;

    let mut tasks = JoinSet::new();
    for n in 0..clients {
        let manager = Arc::clone(&manager);
        tasks.spawn(async move {
            let client = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 42_000 + n);
            // Several racing senders per client.
            let (a, b) = tokio::join!(manager.acquire(client, |_| {}), manager.acquire(client, |_| {}));
            let (a, b) = (a.unwrap(), b.unwrap());
            assert!(Arc::ptr_eq(&a, &b));
            a.id()
        });
    }

    let mut ids = Vec::new();
    while let Some(res) = tasks.join_next().await {
        ids.push(res.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), clients as usize);
    assert_eq!(ids, (1..=u32::from(clients)).collect::<Vec<_>>());
    assert_eq!(manager.len().await, clients as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn key_is_visible_across_tasks() {
    let key = Arc::new(ObfuscationKey::new());

    let writer = {
        let key = Arc::clone(&key);
        tokio::spawn(async move { key.set(0x37) })
    };
    writer.await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let key = Arc::clone(&key);
        tasks.spawn(async move {
            let mut data = [0x37u8; 16];
            key.apply(&mut data);
            data
        });
    }
    while let Some(res) = tasks.join_next().await {
        assert_eq!(res.unwrap(), [0u8; 16]);
    }
}
