//! Wire-contract and protocol integration tests against a mock HTTP server:
//! Basic auth, per-attempt request ids, continue-on-error, the test-first
//! gate, and retry addressing.

use std::time::Duration;

use bulkpost::adapters::gate::StaticGate;
use bulkpost::adapters::http::HttpSubmitter;
use bulkpost::core::outcome::failed_indexes;
use bulkpost::domain::model::BatchDisposition;
use bulkpost::{plan_full, plan_retry, ApiConfig, BatchSubmitter, ResultLog, StructuredRecord, SubmitOptions};
use httpmock::prelude::*;

// base64("client-id:client-secret")
const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        api_url: server.url("/v1/businesses"),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        workers: 4,
        rate_limit: Duration::ZERO,
        timeout: Duration::from_secs(30),
    }
}

fn records(count: usize) -> Vec<StructuredRecord> {
    (1..=count)
        .map(|n| {
            let mut fields = serde_json::Map::new();
            fields.insert(
                "business".to_string(),
                serde_json::json!({ "name": format!("Business {n}"), "seq": n }),
            );
            StructuredRecord { fields }
        })
        .collect()
}

fn submitter(
    server: &MockServer,
    answer: bool,
) -> BatchSubmitter<HttpSubmitter, StaticGate> {
    let config = api_config(server);
    let options = SubmitOptions {
        workers: config.workers,
        delay: config.rate_limit,
    };
    BatchSubmitter::new(HttpSubmitter::new(&config).unwrap(), StaticGate(answer), options)
}

#[tokio::test]
async fn test_wire_contract_basic_auth_request_id_and_json_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/businesses")
            .header("Authorization", BASIC_AUTH)
            .header_exists("X-Request-Id")
            .header("Content-Type", "application/json");
        then.status(200).json_body(serde_json::json!({"ok": true}));
    });

    let batch = records(3);
    let result = submitter(&server, true).send_batch(plan_full(&batch)).await;

    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.successful, 3);
    assert_eq!(mock.hits(), 3);
    for outcome in &result.outcomes {
        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.response_body, Some(serde_json::json!({"ok": true})));
        assert!(!outcome.request_id.is_empty());
    }
}

#[tokio::test]
async fn test_request_ids_are_unique_per_attempt() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/businesses");
        then.status(201);
    });

    let batch = records(8);
    let result = submitter(&server, true).send_batch(plan_full(&batch)).await;

    let mut ids: Vec<&str> = result
        .outcomes
        .iter()
        .map(|o| o.request_id.as_str())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_one_rejected_record_does_not_affect_siblings() {
    let server = MockServer::start();
    // The record with seq 4 is rejected; everything else succeeds. One mock
    // per record so the matchers never overlap.
    let rejected = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/businesses")
            .json_body_partial(r#"{"business": {"seq": 4}}"#);
        then.status(422)
            .json_body(serde_json::json!({"message": "invalid taxId"}));
    });
    let accepted: Vec<_> = [1usize, 2, 3, 5, 6, 7, 8, 9]
        .iter()
        .map(|seq| {
            server.mock(|when, then| {
                when.method(POST)
                    .path("/v1/businesses")
                    .json_body_partial(format!(r#"{{"business": {{"seq": {seq}}}}}"#));
                then.status(200);
            })
        })
        .collect();

    let batch = records(9);
    let result = submitter(&server, true).send_batch(plan_full(&batch)).await;

    assert_eq!(result.summary.total, 9);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(result.summary.successful, 8);
    assert_eq!(rejected.hits(), 1);
    for mock in &accepted {
        assert_eq!(mock.hits(), 1);
    }

    let failed = result.outcomes.iter().find(|o| !o.success).unwrap();
    assert_eq!(failed.record_index, 4);
    assert_eq!(failed.status_code, Some(422));
    assert!(failed.error.as_deref().unwrap().starts_with("HTTP 422"));
}

#[tokio::test]
async fn test_declined_gate_stops_after_the_test_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/businesses");
        then.status(200);
    });

    let batch = records(5);
    let result = submitter(&server, false).send_batch(plan_full(&batch)).await;

    assert_eq!(result.disposition, BatchDisposition::Aborted);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].record_index, 1);
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn test_retry_by_explicit_indexes_resubmits_only_those() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/businesses");
        then.status(200);
    });

    let batch = records(100);
    let working_set = plan_retry(&batch, &[23, 45, 78]);
    let result = submitter(&server, true).send_batch(working_set).await;

    assert_eq!(result.summary.total, 3);
    assert_eq!(mock.hits(), 3);
    let mut indexes: Vec<usize> = result.outcomes.iter().map(|o| o.record_index).collect();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![23, 45, 78]);
}

#[tokio::test]
async fn test_failed_outcomes_replay_as_a_retry_run() {
    let server = MockServer::start();
    // Seq 2 and seq 5 always fail; the rest always succeed.
    let mut failing = Vec::new();
    for seq in 1usize..=6 {
        let status = if seq == 2 || seq == 5 { 500 } else { 200 };
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/businesses")
                .json_body_partial(format!(r#"{{"business": {{"seq": {seq}}}}}"#));
            then.status(status);
        });
        if status == 500 {
            failing.push(mock);
        }
    }

    let batch = records(6);
    let first_run = submitter(&server, true).send_batch(plan_full(&batch)).await;
    assert_eq!(first_run.summary.failed, 2);

    let log = ResultLog::from_result(&first_run);
    let retry_indexes = log.failed_indexes();
    assert_eq!(retry_indexes, vec![2, 5]);
    assert_eq!(failed_indexes(&log.failed), retry_indexes);

    // Second run over only the failed subset; outcomes keep original indexes.
    let retry_run = submitter(&server, true)
        .send_batch(plan_retry(&batch, &retry_indexes))
        .await;
    assert_eq!(retry_run.summary.total, 2);
    let mut indexes: Vec<usize> = retry_run.outcomes.iter().map(|o| o.record_index).collect();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![2, 5]);
    for mock in &failing {
        assert_eq!(mock.hits(), 2);
    }
}

#[tokio::test]
async fn test_worker_counts_never_lose_or_duplicate_outcomes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/businesses");
        then.status(200);
    });

    for workers in [1, 2, 4, 8] {
        let config = ApiConfig {
            workers,
            ..api_config(&server)
        };
        let submitter = BatchSubmitter::new(
            HttpSubmitter::new(&config).unwrap(),
            StaticGate(true),
            SubmitOptions {
                workers,
                delay: Duration::ZERO,
            },
        );

        let batch = records(17);
        let result = submitter.send_batch(plan_full(&batch)).await;

        assert_eq!(result.summary.total, 17, "workers={workers}");
        let mut indexes: Vec<usize> =
            result.outcomes.iter().map(|o| o.record_index).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, (1..=17).collect::<Vec<_>>(), "workers={workers}");
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_yields_failed_outcomes_not_a_crash() {
    // A port nothing listens on: every request is a transport error.
    let config = ApiConfig {
        api_url: "http://127.0.0.1:9".to_string(),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        workers: 2,
        rate_limit: Duration::ZERO,
        timeout: Duration::from_secs(2),
    };
    let submitter = BatchSubmitter::new(
        HttpSubmitter::new(&config).unwrap(),
        StaticGate(true),
        SubmitOptions {
            workers: 2,
            delay: Duration::ZERO,
        },
    );

    let batch = records(3);
    let result = submitter.send_batch(plan_full(&batch)).await;

    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.failed, 3);
    for outcome in &result.outcomes {
        assert_eq!(outcome.status_code, None);
        assert!(outcome.error.is_some());
    }
}
