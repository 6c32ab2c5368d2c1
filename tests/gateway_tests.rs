mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use trial_adapt::adaptive::attempt_log::AttemptLog;
use trial_adapt::adaptive::config::SessionTiming;
use trial_adapt::adaptive::decision::{
    DecisionError, DecisionGateway, DecisionSource, LocalPolicy, RemoteDecisionClient,
};
use trial_adapt::adaptive::engine::SessionEngine;
use trial_adapt::adaptive::rounds::{ContentTable, RoundGenerator};
use trial_adapt::adaptive::types::{DecisionAction, DecisionInput, DifficultyLevel, Provenance};

fn scenario_input() -> DecisionInput {
    DecisionInput {
        level: DifficultyLevel::Medium,
        errors_consecutive: 3,
        hints_used: 0,
        retries_same_round: 2,
        latency_sec: 3.0,
        perseveration: 0,
        high_frustration_streak: 0,
        success_streak: 0,
        correct: false,
    }
}

fn remote_gateway(url: String, timeout: Duration) -> DecisionGateway {
    let remote: Arc<dyn DecisionSource> = Arc::new(RemoteDecisionClient::new(url, timeout));
    DecisionGateway::new(Some(remote), LocalPolicy::default(), timeout)
}

async fn stub_server(router: Router) -> String {
    let addr = common::spawn_server(router).await;
    format!("http://{addr}/decide")
}

#[tokio::test]
async fn remote_service_answer_is_used_and_marked_remote() {
    let addr = common::spawn_server(common::create_test_app()).await;
    let gateway = remote_gateway(
        format!("http://{addr}/api/decision"),
        Duration::from_millis(800),
    );

    let input = scenario_input();
    let result = gateway.decide(&input).await;
    assert_eq!(result.provenance, Provenance::Remote);
    assert_eq!(result.decision, LocalPolicy::default().evaluate(&input));
    assert_eq!(result.decision.frustration, 0.5);
    assert_eq!(result.decision.action, DecisionAction::Support);

    let stats = gateway.stats();
    assert_eq!(stats.remote, 1);
    assert_eq!(stats.fallbacks, 0);
}

#[tokio::test]
async fn server_error_falls_back_to_local() {
    let url = stub_server(Router::new().route(
        "/decide",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;
    let gateway = remote_gateway(url, Duration::from_millis(800));

    let input = scenario_input();
    let result = gateway.decide(&input).await;
    assert_eq!(result.provenance, Provenance::Local);
    assert_eq!(result.decision, LocalPolicy::default().evaluate(&input));
    assert_eq!(gateway.stats().fallbacks, 1);
}

#[tokio::test]
async fn malformed_body_falls_back_to_local() {
    let url = stub_server(Router::new().route(
        "/decide",
        post(|| async { r#"{"frustration": "high"}"# }),
    ))
    .await;
    let gateway = remote_gateway(url, Duration::from_millis(800));

    let result = gateway.decide(&scenario_input()).await;
    assert_eq!(result.provenance, Provenance::Local);
}

#[tokio::test]
async fn out_of_range_frustration_falls_back_to_local() {
    let body = serde_json::json!({
        "frustration": 1.7,
        "frustrationComponents": {
            "error": 0.0, "hint": 0.0, "retry": 0.0, "latency": 0.0, "perseveration": 0.0
        },
        "action": "keep",
        "suggestedLevel": "easy",
        "nextHighFrustrationStreak": 0,
        "nextSuccessStreak": 0
    });
    let url = stub_server(Router::new().route(
        "/decide",
        post(move || {
            let body = body.clone();
            async move { axum::Json(body) }
        }),
    ))
    .await;
    let gateway = remote_gateway(url, Duration::from_millis(800));

    let result = gateway.decide(&scenario_input()).await;
    assert_eq!(result.provenance, Provenance::Local);
    assert_eq!(result.decision.frustration, 0.5);
}

#[tokio::test]
async fn slow_service_times_out_to_local() {
    let url = stub_server(Router::new().route(
        "/decide",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    ))
    .await;
    let gateway = remote_gateway(url, Duration::from_millis(100));

    let started = std::time::Instant::now();
    let result = gateway.decide(&scenario_input()).await;
    assert_eq!(result.provenance, Provenance::Local);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unreachable_service_falls_back_to_local() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = remote_gateway(format!("http://{addr}/decide"), Duration::from_millis(800));
    let result = gateway.decide(&scenario_input()).await;
    assert_eq!(result.provenance, Provenance::Local);
    assert_eq!(gateway.last_provenance(), Some(Provenance::Local));
}

#[tokio::test]
async fn engine_records_remote_provenance() {
    let addr = common::spawn_server(common::create_test_app()).await;
    let gateway = remote_gateway(
        format!("http://{addr}/api/decision"),
        Duration::from_millis(800),
    );
    let mut engine = SessionEngine::new(
        RoundGenerator::new(ContentTable::reference()),
        SessionTiming::default(),
        Arc::new(AttemptLog::new(100)),
        StdRng::seed_from_u64(42),
        Utc::now(),
    );

    let option = engine.trial().correct_option().unwrap().id;
    let now = engine.trial().started_at + chrono::Duration::seconds(1);
    let outcome = engine.choose(&gateway, option, now).await.unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.record.provenance, Provenance::Remote);
    assert_eq!(engine.log().to_vec()[0].provenance, Provenance::Remote);
}

#[tokio::test]
async fn client_enforces_its_own_timeout() {
    let url = stub_server(Router::new().route(
        "/decide",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    ))
    .await;
    let client = RemoteDecisionClient::new(url, Duration::from_millis(100));

    let started = std::time::Instant::now();
    let err = client.decide(&scenario_input()).await.unwrap_err();
    assert!(matches!(err, DecisionError::Request(ref e) if e.is_timeout()));
    assert!(started.elapsed() < Duration::from_secs(2));
}
