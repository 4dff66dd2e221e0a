//! End-to-end tests for the caching agent lifecycle.

use std::sync::Arc;
use std::time::Duration;

use http::Method;

use keel_agent::{
    AgentMessage, AgentPhase, CacheStore, CachingAgent, FetchEvent, FetchRequest, FetchResponse,
    MemoryCacheStore, PlatformCapabilities, PrecacheList, ScriptedNetwork, StrategyConfig,
};
use keel_core::VersionToken;

fn agent(
    version: &str,
    store: Arc<MemoryCacheStore>,
    network: Arc<ScriptedNetwork>,
) -> CachingAgent {
    CachingAgent::new(VersionToken::new(version), store, network)
}

async fn online_network() -> Arc<ScriptedNetwork> {
    let network = ScriptedNetwork::new();
    for url in PrecacheList::shell().urls() {
        network
            .insert(url.clone(), FetchResponse::ok(format!("body of {url}")))
            .await;
    }
    Arc::new(network)
}

#[tokio::test]
async fn test_install_then_activate_phases() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    let mut agent = agent("v1", Arc::clone(&store), network);

    assert_eq!(agent.phase(), AgentPhase::Idle);

    agent.handle_install().await.unwrap();
    assert_eq!(agent.phase(), AgentPhase::Installed);
    assert!(agent.skip_waiting());

    let report = agent
        .handle_activate(PlatformCapabilities {
            navigation_preload: true,
        })
        .await
        .unwrap();
    assert_eq!(agent.phase(), AgentPhase::Active);
    assert!(agent.preload_enabled());
    assert!(agent.clients_claimed());
    assert!(report.deleted.is_empty());
}

#[tokio::test]
async fn test_activating_new_version_evicts_old_generations() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;

    let mut first = agent("v1", Arc::clone(&store), Arc::clone(&network));
    first.handle_install().await.unwrap();
    first
        .handle_activate(PlatformCapabilities::default())
        .await
        .unwrap();

    let mut second = agent("v2", Arc::clone(&store), Arc::clone(&network));
    second.handle_install().await.unwrap();
    let report = second
        .handle_activate(PlatformCapabilities::default())
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["v1-immutable", "v1-static"]);
    let remaining = store.list_caches().await.unwrap();
    assert!(remaining.iter().all(|name| name.starts_with("v2-")));
}

#[tokio::test]
async fn test_skip_waiting_message() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    let mut agent = agent("v1", store, network);

    assert!(!agent.skip_waiting());
    agent.handle_message(AgentMessage::SkipWaiting);
    assert!(agent.skip_waiting());
}

#[tokio::test]
async fn test_non_get_passes_through() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    let agent = agent("v1", store, network);

    let event = FetchEvent::new(FetchRequest::get("/api/posts").with_method(Method::POST));

    assert!(agent.handle_fetch(event).await.unwrap().is_none());
}

#[tokio::test]
async fn test_navigation_network_first_updates_dynamic_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    network.insert("/pricing", FetchResponse::ok("pricing page")).await;
    let mut agent = agent("v1", Arc::clone(&store), network);
    agent.handle_install().await.unwrap();

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::navigate("/pricing")))
        .await
        .unwrap()
        .expect("navigation intercepted");
    let response = outcome.settle().await;

    assert_eq!(response.body, bytes::Bytes::from_static(b"pricing page"));
    let cached = store.get("v1-dynamic", "/pricing").await.unwrap().unwrap();
    assert_eq!(cached.body, bytes::Bytes::from_static(b"pricing page"));
}

#[tokio::test]
async fn test_offline_navigation_uses_dynamic_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    network.insert("/pricing", FetchResponse::ok("pricing page")).await;
    let mut agent = agent("v1", Arc::clone(&store), Arc::clone(&network));
    agent.handle_install().await.unwrap();

    // Visit once online, then go offline.
    agent
        .handle_fetch(FetchEvent::new(FetchRequest::navigate("/pricing")))
        .await
        .unwrap();
    network.set_offline(true);

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::navigate("/pricing")))
        .await
        .unwrap()
        .expect("navigation intercepted");

    assert_eq!(
        outcome.response.body,
        bytes::Bytes::from_static(b"pricing page")
    );
}

#[tokio::test]
async fn test_offline_navigation_without_cache_serves_offline_doc() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    let mut agent = agent("v1", Arc::clone(&store), Arc::clone(&network));
    agent.handle_install().await.unwrap();
    network.set_offline(true);

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::navigate("/never-visited")))
        .await
        .unwrap()
        .expect("navigation intercepted");

    // The offline document is returned verbatim from the static generation.
    assert_eq!(
        outcome.response.body,
        bytes::Bytes::from_static(b"body of /offline.html")
    );
}

#[tokio::test]
async fn test_custom_precache_and_offline_document() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = Arc::new(ScriptedNetwork::new());
    network.insert("/", FetchResponse::ok("shell")).await;
    network
        .insert("/unavailable.html", FetchResponse::ok("be right back"))
        .await;
    let mut agent = CachingAgent::new(
        VersionToken::new("v1"),
        store.clone(),
        network.clone(),
    )
    .with_precache(PrecacheList::new(["/", "/unavailable.html"]))
    .with_offline(keel_agent::OfflineFallback::new("/unavailable.html"));
    agent.handle_install().await.unwrap();
    network.set_offline(true);

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::navigate("/pricing")))
        .await
        .unwrap()
        .expect("navigation intercepted");

    assert_eq!(
        outcome.response.body,
        bytes::Bytes::from_static(b"be right back")
    );
}

#[tokio::test]
async fn test_navigation_preload_is_used_and_cached() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    let mut agent = agent("v1", Arc::clone(&store), Arc::clone(&network));
    agent.handle_install().await.unwrap();

    let preload = FetchResponse::ok("preloaded page");
    let event = FetchEvent::new(FetchRequest::navigate("/docs")).with_preload(preload);

    let outcome = agent.handle_fetch(event).await.unwrap().unwrap();

    assert_eq!(
        outcome.response.body,
        bytes::Bytes::from_static(b"preloaded page")
    );
    // The preload went into the dynamic generation without a network fetch.
    assert!(store.get("v1-dynamic", "/docs").await.unwrap().is_some());
    assert_eq!(network.fetch_count("/docs").await, 0);
}

#[tokio::test]
async fn test_precached_member_served_stale_while_revalidate() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    let mut agent = agent("v1", Arc::clone(&store), Arc::clone(&network));
    agent.handle_install().await.unwrap();
    network.set_offline(true);

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::get("/site.webmanifest")))
        .await
        .unwrap()
        .expect("intercepted");
    let response = outcome.settle().await;

    // Install-time copy survives a dead network untouched.
    assert_eq!(
        response.body,
        bytes::Bytes::from_static(b"body of /site.webmanifest")
    );
    let cached = store
        .get("v1-static", "/site.webmanifest")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        cached.body,
        bytes::Bytes::from_static(b"body of /site.webmanifest")
    );
}

#[tokio::test]
async fn test_immutable_asset_cached_in_immutable_generation() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = online_network().await;
    network
        .insert("/assets/chunk-abc.js", FetchResponse::ok("chunk"))
        .await;
    let mut agent = agent("v1", Arc::clone(&store), Arc::clone(&network));
    agent.handle_install().await.unwrap();

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::get("/assets/chunk-abc.js")))
        .await
        .unwrap()
        .unwrap();
    let response = outcome.settle().await;

    assert_eq!(response.body, bytes::Bytes::from_static(b"chunk"));
    assert!(store
        .get("v1-immutable", "/assets/chunk-abc.js")
        .await
        .unwrap()
        .is_some());
    assert!(store
        .get("v1-dynamic", "/assets/chunk-abc.js")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn test_api_request_times_out_to_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = Arc::new(ScriptedNetwork::new().with_delay(Duration::from_secs(30)));
    network.insert("/api/stats", FetchResponse::ok("late")).await;
    store
        .put("v1-dynamic", "/api/stats", FetchResponse::ok("cached stats"))
        .await
        .unwrap();
    let agent = CachingAgent::new(
        VersionToken::new("v1"),
        store.clone(),
        network,
    )
    .with_strategy_config(StrategyConfig::default().with_api_timeout(Duration::from_millis(200)));

    let outcome = agent
        .handle_fetch(FetchEvent::new(FetchRequest::get("/api/stats")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        outcome.response.body,
        bytes::Bytes::from_static(b"cached stats")
    );
}
