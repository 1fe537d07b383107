//! Discovery pipeline integration tests against an in-memory network

mod common;

use serde_json::json;
use std::time::Duration;

use common::{app_state, brazil, config_with_seeds, pod, FakeGeo, FakeHost, FakeNetwork};
use pnode_monitor::models::{NodeStatus, Pod, UNKNOWN_LOCATION};

#[tokio::test]
async fn test_duplicates_collapse_and_geo_enriches_resolvable_nodes() {
    let network = FakeNetwork::new();
    network.set_host(
        "seed-a",
        FakeHost::serving(vec![
            pod("PubkeyAlpha1111", "200.1.1.1", 0),
            pod("PubkeyBravo2222", "10.0.0.1", 0),
            pod("PubkeyAlpha1111", "200.1.1.2", 0),
        ]),
    );
    let geo = FakeGeo::new();
    geo.locate("200.1.1.1", brazil());

    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &geo);
    let nodes = state.pnodes.get_all_nodes().await;

    assert_eq!(nodes.len(), 2);

    let alpha = &nodes[0];
    assert_eq!(alpha.pubkey, "PubkeyAlpha1111");
    assert_eq!(alpha.address, "200.1.1.1:9001");
    assert_eq!(alpha.country, "Brazil");
    assert_eq!(alpha.region, "Sao Paulo");
    assert_eq!(alpha.city.as_deref(), Some("Sao Paulo"));
    assert_eq!(alpha.lat, Some(-23.5505));

    let bravo = &nodes[1];
    assert_eq!(bravo.region, UNKNOWN_LOCATION);
    assert_eq!(bravo.country, UNKNOWN_LOCATION);
    assert!(bravo.lat.is_none() && bravo.lng.is_none());

    // Duplicate record is dropped before enrichment
    assert!(!geo.lookups().contains(&"200.1.1.2".to_string()));
}

#[tokio::test]
async fn test_primary_falls_back_to_plain_pods() {
    let network = FakeNetwork::new();
    network.set_host(
        "seed-a",
        FakeHost {
            pods_with_stats: None,
            pods: Some(vec![pod("KeyOne", "1.1.1.1", 0)]),
            stats: None,
        },
    );

    let state = app_state(&config_with_seeds(&["seed-a", "seed-b"]), &network, &FakeGeo::new());
    let nodes = state.pnodes.get_all_nodes().await;

    assert_eq!(nodes.len(), 1);
    assert_eq!(
        network.calls(),
        vec!["seed-a:get-pods-with-stats".to_string(), "seed-a:get-pods".to_string()]
    );
}

#[tokio::test]
async fn test_fallback_seeds_in_order_until_first_success() {
    let network = FakeNetwork::new();
    network.set_host("seed-b", FakeHost::serving(Vec::new()));
    network.set_host("seed-c", FakeHost::serving(vec![pod("KeyFromC", "3.3.3.3", 0)]));
    network.set_host("seed-d", FakeHost::serving(vec![pod("KeyFromD", "4.4.4.4", 0)]));

    let state = app_state(
        &config_with_seeds(&["seed-a", "seed-b", "seed-c", "seed-d"]),
        &network,
        &FakeGeo::new(),
    );
    let nodes = state.pnodes.get_all_nodes().await;

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].pubkey, "KeyFromC");
    assert_eq!(
        network.calls(),
        vec![
            "seed-a:get-pods-with-stats".to_string(),
            "seed-a:get-pods".to_string(),
            "seed-b:get-pods".to_string(),
            "seed-c:get-pods".to_string(),
        ]
    );

    let connects = network.connects();
    assert_eq!(connects[0], ("seed-a".to_string(), Duration::from_secs(10)));
    assert!(connects[1..]
        .iter()
        .all(|(_, timeout)| *timeout == Duration::from_secs(5)));
}

#[tokio::test]
async fn test_unusable_primary_records_trigger_fallback() {
    let network = FakeNetwork::new();
    let nameless = Pod {
        address: Some("9.9.9.9:9001".to_string()),
        ..Default::default()
    };
    network.set_host("seed-a", FakeHost::serving(vec![nameless]));
    network.set_host("seed-b", FakeHost::serving(vec![pod("KeyFromB", "2.2.2.2", 0)]));

    let state = app_state(&config_with_seeds(&["seed-a", "seed-b"]), &network, &FakeGeo::new());
    let nodes = state.pnodes.get_all_nodes().await;

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].pubkey, "KeyFromB");
}

#[tokio::test]
async fn test_all_seeds_failing_yields_empty_list() {
    let network = FakeNetwork::new();
    let state = app_state(&config_with_seeds(&["seed-a", "seed-b", "seed-c"]), &network, &FakeGeo::new());

    let nodes = state.pnodes.get_all_nodes().await;
    assert!(nodes.is_empty());
    assert_eq!(network.calls().len(), 4);
}

#[tokio::test]
async fn test_node_list_is_cached_until_refresh() {
    let network = FakeNetwork::new();
    network.set_host("seed-a", FakeHost::serving(vec![pod("KeyOne", "1.1.1.1", 0)]));
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    state.pnodes.get_all_nodes().await;
    state.pnodes.get_all_nodes().await;
    assert_eq!(network.call_count("seed-a:get-pods-with-stats"), 1);

    network.set_host(
        "seed-a",
        FakeHost::serving(vec![pod("KeyOne", "1.1.1.1", 0), pod("KeyTwo", "2.2.2.2", 0)]),
    );
    assert_eq!(state.pnodes.get_all_nodes().await.len(), 1);

    let refreshed = state.pnodes.refresh().await;
    assert_eq!(refreshed.len(), 2);
    assert_eq!(network.call_count("seed-a:get-pods-with-stats"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_node_list_expires_after_ttl() {
    let network = FakeNetwork::new();
    network.set_host("seed-a", FakeHost::serving(vec![pod("KeyOne", "1.1.1.1", 0)]));
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    state.pnodes.get_all_nodes().await;
    tokio::time::advance(Duration::from_secs(29)).await;
    state.pnodes.get_all_nodes().await;
    assert_eq!(network.call_count("seed-a:get-pods-with-stats"), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    state.pnodes.get_all_nodes().await;
    assert_eq!(network.call_count("seed-a:get-pods-with-stats"), 2);
}

#[tokio::test]
async fn test_online_status_uses_threshold() {
    let network = FakeNetwork::new();
    network.set_host(
        "seed-a",
        FakeHost::serving(vec![pod("Fresh", "1.1.1.1", 10), pod("Stale", "2.2.2.2", 3_600)]),
    );
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    let nodes = state.pnodes.get_all_nodes().await;
    assert_eq!(nodes[0].status, NodeStatus::Online);
    assert_eq!(nodes[1].status, NodeStatus::Offline);
}

#[tokio::test]
async fn test_lookup_by_pubkey_and_short_id() {
    let network = FakeNetwork::new();
    network.set_host(
        "seed-a",
        FakeHost::serving(vec![pod("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", "1.1.1.1", 0)]),
    );
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    let by_key = state
        .pnodes
        .get_node_by_pubkey("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")
        .await
        .unwrap();
    let by_id = state.pnodes.get_node_by_id("node-9xQeWvG8").await.unwrap();
    assert_eq!(by_key, by_id);

    assert!(state.pnodes.get_node_by_pubkey("missing").await.is_none());
    assert!(state.pnodes.get_node_by_id("node-missing").await.is_none());
}

#[tokio::test]
async fn test_node_stats_from_node_itself() {
    let network = FakeNetwork::new();
    network.set_host(
        "seed-a",
        FakeHost::serving(vec![pod("OnlineKey", "5.5.5.5", 0), pod("OfflineKey", "6.6.6.6", 3_600)]),
    );
    network.set_host(
        "5.5.5.5",
        FakeHost {
            stats: Some(json!({"ram_used": 2048, "ram_total": 8192, "storage_used": 1, "storage_committed": 2})),
            ..Default::default()
        },
    );
    network.set_host(
        "6.6.6.6",
        FakeHost {
            stats: Some(json!({"ram_used": 1})),
            ..Default::default()
        },
    );
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    let stats = state.pnodes.get_node_stats("OnlineKey").await.unwrap();
    assert_eq!(stats.ram_used, 2048);
    assert_eq!(stats.ram_total, 8192);

    // Second read comes from the stats cache
    state.pnodes.get_node_stats("OnlineKey").await;
    assert_eq!(network.call_count("5.5.5.5:get-stats"), 1);
    assert!(network
        .connects()
        .contains(&("5.5.5.5".to_string(), Duration::from_secs(8))));

    assert!(state.pnodes.get_node_stats("OfflineKey").await.is_none());
    assert_eq!(network.call_count("6.6.6.6:get-stats"), 0);
    assert!(state.pnodes.get_node_stats("UnknownKey").await.is_none());

    let with_stats = state.pnodes.get_node_with_stats("OnlineKey").await.unwrap();
    assert_eq!(with_stats.ram_used, Some(2048));
    assert_eq!(with_stats.ram_total, Some(8192));

    let without = state.pnodes.get_node_with_stats("OfflineKey").await.unwrap();
    assert!(without.ram_used.is_none());
}

#[tokio::test]
async fn test_node_stats_failure_is_none() {
    let network = FakeNetwork::new();
    network.set_host("seed-a", FakeHost::serving(vec![pod("OnlineKey", "5.5.5.5", 0)]));
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    assert!(state.pnodes.get_node_stats("OnlineKey").await.is_none());
    assert_eq!(network.call_count("5.5.5.5:get-stats"), 1);
}

#[tokio::test]
async fn test_node_stats_without_address_makes_no_call() {
    let network = FakeNetwork::new();
    let mut hidden = pod("HiddenKey", "7.7.7.7", 0);
    hidden.address = None;
    network.set_host("seed-a", FakeHost::serving(vec![hidden]));
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    let node = state.pnodes.get_node_by_pubkey("HiddenKey").await.unwrap();
    assert_eq!(node.status, NodeStatus::Online);
    assert!(node.address.is_empty());

    assert!(state.pnodes.get_node_stats("HiddenKey").await.is_none());
    assert!(network.calls().iter().all(|c| !c.ends_with(":get-stats")));
    assert!(network.connects().iter().all(|(host, _)| host == "seed-a"));
}

#[tokio::test]
async fn test_raw_pods_error_propagates_when_primary_down() {
    let network = FakeNetwork::new();
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    assert!(state.pnodes.get_raw_pods_for_analytics().await.is_err());
    assert!(state.analytics.summary().await.is_err());
}

#[tokio::test]
async fn test_analytics_over_discovered_nodes() {
    let network = FakeNetwork::new();
    let mut busy = pod("Busy", "1.1.1.1", 0);
    busy.storage_used = Some(95);
    busy.storage_committed = Some(100);
    let mut idle = pod("Idle", "2.2.2.2", 0);
    idle.storage_used = Some(5);
    idle.storage_committed = Some(100);
    network.set_host("seed-a", FakeHost::serving(vec![busy, idle, pod("Gone", "3.3.3.3", 7_200)]));
    let state = app_state(&config_with_seeds(&["seed-a"]), &network, &FakeGeo::new());

    let summary = state.analytics.summary().await.unwrap();
    assert_eq!(summary.total_pnodes, 3);
    assert_eq!(summary.online_pnodes, 2);
    assert_eq!(summary.active_pods, 2);
    assert_eq!(summary.consensus_version, "0.8.0");

    let metrics = state.analytics.node_metrics().await.unwrap();
    assert_eq!(metrics.len(), 3);

    let pressure = state.analytics.storage_pressure().await.unwrap();
    assert_eq!(pressure.high_pressure_nodes, 1);

    let top = state.analytics.top_nodes().await.unwrap();
    assert_eq!(top[0].pubkey, "Idle");
    assert_eq!(top[1].pubkey, "Gone");
    assert_eq!(top[2].pubkey, "Busy");

    // Metrics are served from the analytics cache
    let calls = network.calls().len();
    state.analytics.node_metrics().await.unwrap();
    assert_eq!(network.calls().len(), calls);
}
