//! Integration tests for session activation and request handling.

use std::time::Duration;

use serde_json::json;

use cloudmock::preset::{
    BaselineGroup, BaselinePreset, CrudGroup, CrudPreset, MockSeeder, PresetInfo, SeedFuture,
    SeedOptions,
};
use cloudmock::session::NO_LAYER_REASON;
use cloudmock::state::factories;
use cloudmock::{
    ComposeError, Interceptor, MockHandler, MockPreset, MockRequest, MockSession, MockState,
    PresetRegistry, Selection,
};

fn slow_seed(mut state: MockState, options: SeedOptions) -> SeedFuture {
    Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        for id in 1..=u64::from(options.count) {
            state.linodes.push(factories::linode(id, factories::DEFAULT_REGION));
        }
        Ok::<_, anyhow::Error>(state)
    })
}

fn fast_seed(mut state: MockState, _options: SeedOptions) -> SeedFuture {
    state.domains.push(factories::domain(1));
    Box::pin(async move { Ok::<_, anyhow::Error>(state) })
}

fn failing_seed(_state: MockState, _options: SeedOptions) -> SeedFuture {
    Box::pin(async { Err::<MockState, _>(anyhow::anyhow!("seed store unavailable")) })
}

fn no_handlers(_state: &MockState) -> Vec<Interceptor> {
    Vec::new()
}

const NO_HANDLERS: &[MockHandler] = &[no_handlers];

fn crud(id: &'static str, seed: cloudmock::preset::SeedFn) -> MockPreset {
    MockPreset::Crud(CrudPreset {
        info: PresetInfo {
            id,
            label: id,
            desc: None,
            handlers: NO_HANDLERS,
        },
        group: CrudGroup::Linodes,
        seeder: Some(MockSeeder::new(seed)),
        can_update_count: true,
    })
}

fn timing_registry() -> &'static PresetRegistry {
    let presets = vec![
        MockPreset::Baseline(BaselinePreset {
            info: PresetInfo {
                id: "baseline:empty",
                label: "Empty",
                desc: None,
                handlers: NO_HANDLERS,
            },
            group: BaselineGroup::General,
        }),
        crud("slow:crud", slow_seed),
        crud("fast:crud", fast_seed),
        crud("broken:crud", failing_seed),
    ];
    Box::leak(Box::new(PresetRegistry::new(presets).unwrap()))
}

#[tokio::test]
async fn test_latest_activation_wins() {
    let session = MockSession::new(timing_registry());
    let slow = Selection::new(["baseline:empty", "slow:crud"]);
    let fast = Selection::new(["baseline:empty", "fast:crud"]);

    let (first, second) = tokio::join!(session.activate(&slow), session.activate(&fast));

    match first {
        Err(ComposeError::Superseded { generation }) => assert_eq!(generation, 1),
        other => panic!("expected superseded, got {:?}", other),
    }
    let report = second.unwrap();
    assert_eq!(report.generation, 2);

    let state = session.snapshot().await.unwrap();
    assert_eq!(state.domains.len(), 1);
    assert!(state.linodes.is_empty());
}

#[tokio::test]
async fn test_deactivate_cancels_in_flight_activation() {
    let session = MockSession::new(timing_registry());
    let slow = Selection::new(["baseline:empty", "slow:crud"]);

    let (activated, deactivated) = tokio::join!(session.activate(&slow), session.deactivate());
    assert!(deactivated.is_none());
    assert!(matches!(activated, Err(ComposeError::Superseded { .. })));
    assert!(!session.is_active().await);
}

#[tokio::test]
async fn test_seeder_failure_keeps_installed_layer() {
    let session = MockSession::new(timing_registry());
    let first = session
        .activate(&Selection::new(["baseline:empty", "fast:crud"]))
        .await
        .unwrap();

    let err = session
        .activate(&Selection::new(["baseline:empty", "slow:crud", "broken:crud"]))
        .await
        .unwrap_err();
    match err {
        ComposeError::SeederFailure { preset_id, .. } => assert_eq!(preset_id, "broken:crud"),
        other => panic!("expected seeder failure, got {:?}", other),
    }

    let state = session.snapshot().await.unwrap();
    assert_eq!(state.domains.len(), 1);
    assert!(state.linodes.is_empty());
    let report = session.report().await.unwrap();
    assert_eq!(report.generation, first.generation);
    assert_eq!(report.presets.len(), 2);
}

#[tokio::test]
async fn test_crud_flow_through_session() {
    let session = MockSession::default();
    session
        .activate(&Selection::new(["baseline:crud", "linodes:crud", "volumes:crud"]))
        .await
        .unwrap();

    let resp = session
        .handle(MockRequest::post(
            "/v4/linode/instances",
            json!({"label": "api-01", "region": "us-east", "type": "g6-standard-2"}),
        ))
        .await;
    assert_eq!(resp.status, 200, "{:?}", resp.body);
    let id = resp.body["id"].as_u64().unwrap();
    assert_eq!(id, 4);

    let resp = session
        .handle(MockRequest::post("/v4/volumes/1/detach", json!({})))
        .await;
    assert_eq!(resp.status, 200);
    let resp = session
        .handle(MockRequest::post("/v4/volumes/1/attach", json!({"linode_id": id})))
        .await;
    assert_eq!(resp.body["linode_label"], "api-01");

    let resp = session.handle(MockRequest::get("/v4/account/events")).await;
    assert_eq!(resp.body["data"][0]["action"], "volume_attach");
}

#[tokio::test]
async fn test_api_state_baselines() {
    let session = MockSession::default();

    session
        .activate(&Selection::new(["baseline:api-offline"]))
        .await
        .unwrap();
    let resp = session.handle(MockRequest::get("/v4/profile")).await;
    assert_eq!(resp.status, 0);

    session
        .activate(&Selection::new(["baseline:api-maintenance"]))
        .await
        .unwrap();
    let resp = session.handle(MockRequest::get("/v4/profile")).await;
    assert_eq!(resp.status, 503);
    assert!(resp.headers.contains_key("X-Maintenance-Mode"));

    session
        .activate(&Selection::new(["baseline:account-activation"]))
        .await
        .unwrap();
    let resp = session.handle(MockRequest::get("/v4/linode/instances")).await;
    assert_eq!(resp.status, 403);
}

#[tokio::test]
async fn test_unstable_baseline_fails_every_third_request() {
    let session = MockSession::default();
    session
        .activate(&Selection::new(["baseline:api-unstable"]))
        .await
        .unwrap();

    let mut statuses = Vec::new();
    for _ in 0..6 {
        statuses.push(session.handle(MockRequest::get("/v4/profile")).await.status);
    }
    assert_eq!(statuses, vec![200, 200, 500, 200, 200, 500]);
}

#[tokio::test]
async fn test_custom_profile_payload() {
    let session = MockSession::default();
    session
        .activate(
            &Selection::new(["baseline:crud", "profile:custom"])
                .with_custom_profile(json!({"username": "operator"})),
        )
        .await
        .unwrap();
    let resp = session.handle(MockRequest::get("/v4/profile")).await;
    assert_eq!(resp.body["username"], "operator");
}

#[tokio::test]
async fn test_response_time_delay() {
    let session = MockSession::default();
    session
        .activate(&Selection::new(["baseline:crud", "api:response-time"]))
        .await
        .unwrap();
    let resp = session.handle(MockRequest::get("/v4/regions")).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.delay, cloudmock::preset::extra::RESPONSE_TIME);
}

#[tokio::test]
async fn test_after_deactivate_requests_fall_through() {
    let session = MockSession::default();
    session
        .activate(&Selection::new(["baseline:crud"]))
        .await
        .unwrap();
    session.deactivate().await;
    let resp = session.handle(MockRequest::get("/v4/profile")).await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body["errors"][0]["reason"], NO_LAYER_REASON);
}
