#![cfg(all(feature = "server", feature = "client"))]

use signbook::capture::{Point, SignaturePad};
use signbook::gallery::{Gallery, Submission, SubmitOutcome};
use signbook::service::http::serve;
use signbook::store::MemoryStore;
use signbook::{AsyncClient, ClientConfig, NewSignature, ServerConfig};

fn test_config() -> ServerConfig {
    ServerConfig {
        bind: "127.0.0.1".to_string(),
        port: 0,
        workers: 2,
        ..Default::default()
    }
}

#[tokio::test]
async fn async_client_create_list_delete() {
    let server = serve(&test_config(), MemoryStore::new()).expect("server");
    let client = AsyncClient::new(ClientConfig {
        base_url: server.base_url(),
        ..Default::default()
    })
    .await
    .expect("client");

    let a = client
        .create(NewSignature::new("A", "data:image/png;base64,AA"))
        .await
        .unwrap();
    let b = client
        .create(NewSignature::new("B", "data:image/png;base64,BB"))
        .await
        .unwrap();
    assert_eq!(client.list().await.unwrap(), vec![a.clone(), b.clone()]);

    assert_eq!(client.delete(&a.id).await.unwrap(), a);
    assert!(client.delete(&a.id).await.unwrap_err().is_not_found());
    assert_eq!(client.list().await.unwrap(), vec![b]);

    client.close().await.unwrap();
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn concurrent_creates_all_land() {
    let server = serve(&test_config(), MemoryStore::new()).expect("server");
    let client = AsyncClient::new(ClientConfig {
        base_url: server.base_url(),
        ..Default::default()
    })
    .await
    .expect("client");

    let mut tasks = Vec::new();
    for i in 0..8 {
        let c = client.clone();
        tasks.push(tokio::spawn(async move {
            c.create(NewSignature::new(format!("n{}", i), "s")).await
        }));
    }
    for t in tasks {
        t.await.unwrap().unwrap();
    }
    assert_eq!(client.list().await.unwrap().len(), 8);

    client.close().await.unwrap();
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn gallery_ignores_response_after_unmount() {
    let server = serve(&test_config(), MemoryStore::new()).expect("server");
    let client = AsyncClient::new(ClientConfig {
        base_url: server.base_url(),
        ..Default::default()
    })
    .await
    .expect("client");

    let mut gallery = Gallery::new();
    let ticket = gallery.begin_mount();
    assert!(gallery.finish_mount(ticket, client.list().await));

    let mut pad = SignaturePad::new();
    pad.draw_stroke([Point::new(5.0, 5.0), Point::new(50.0, 50.0)]);
    gallery.set_name("Late");
    let Submission::Ready { ticket, payload } = gallery.begin_submit(&pad) else {
        panic!("expected a payload");
    };

    // The view goes away while the request is in flight.
    let sender = client.clone();
    let pending = tokio::spawn(async move { sender.create(payload).await });
    tokio::task::yield_now().await;
    gallery.unmount();
    let created = pending.await.unwrap();
    let outcome = gallery.finish_submit(ticket, created, &mut pad);

    assert_eq!(outcome, SubmitOutcome::Stale);
    assert!(gallery.records().is_empty());
    // The server still stored it; only the torn-down view ignored it.
    assert_eq!(client.list().await.unwrap().len(), 1);

    client.close().await.unwrap();
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn start_server_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        data_path: dir.path().join("signatures.journal"),
        sync: false,
        ..test_config()
    };

    let server = signbook::start_server(&config).expect("server");
    let client = AsyncClient::new(ClientConfig {
        base_url: server.base_url(),
        ..Default::default()
    })
    .await
    .unwrap();
    let kept = client.create(NewSignature::new("Kept", "k")).await.unwrap();
    let gone = client.create(NewSignature::new("Gone", "g")).await.unwrap();
    client.delete(&gone.id).await.unwrap();
    client.close().await.unwrap();
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .unwrap()
        .unwrap();

    let server = signbook::start_server(&config).expect("restart");
    let client = AsyncClient::new(ClientConfig {
        base_url: server.base_url(),
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(client.list().await.unwrap(), vec![kept]);
    client.close().await.unwrap();
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .unwrap()
        .unwrap();
}
