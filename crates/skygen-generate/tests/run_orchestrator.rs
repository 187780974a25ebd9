use std::collections::BTreeSet;
use std::path::Path;

use serde_json::json;

use skygen_client::{InMemoryTableService, Request};
use skygen_core::{DataType, PropertyDefinition, PropertyValue};
use skygen_generate::{
    GenerationError, Orchestrator, RandomSource, RunError, RunOptions, RunReport, RunState,
};
use skygen_script::{Script, load_script};

fn example(name: &str) -> Script {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../scripts/examples")
        .join(name);
    load_script(&path).expect("load example script").script
}

async fn run(
    service: &InMemoryTableService,
    script: &Script,
    options: RunOptions,
    seed: u64,
) -> (Result<RunReport, RunError>, Vec<RunState>) {
    let mut orchestrator = Orchestrator::new(service, script, options);
    assert_eq!(orchestrator.state(), RunState::Idle);
    let mut rng = RandomSource::new(seed);
    let outcome = orchestrator.run(&mut rng).await;
    let expected = if outcome.is_ok() {
        RunState::Done
    } else {
        RunState::Failed
    };
    assert_eq!(orchestrator.state(), expected);
    (outcome, orchestrator.history().to_vec())
}

fn count_sends(service: &InMemoryTableService) -> usize {
    service
        .requests()
        .iter()
        .filter(|request| matches!(request, Request::Send { .. }))
        .count()
}

#[tokio::test]
async fn login_scenario_streams_one_event_per_object() {
    let service = InMemoryTableService::new();
    let script = example("login.script.json");

    let (outcome, history) = run(&service, &script, RunOptions::new("logins", 3), 42).await;
    let report = outcome.expect("run succeeds");

    assert_eq!(report.seed, 42);
    assert_eq!(report.objects, 3);
    assert_eq!(report.events, 3);
    assert!(!report.recreated);
    assert_eq!(report.sync.added, vec!["action".to_string()]);
    assert_eq!(
        history,
        vec![
            RunState::Idle,
            RunState::Connected,
            RunState::TableResolved,
            RunState::SchemaSynced,
            RunState::Streaming,
            RunState::Done,
        ]
    );

    let events = service.events("logins");
    let ids: BTreeSet<_> = events.iter().map(|event| event.object_id.clone()).collect();
    assert_eq!(ids.len(), 3);
    for event in &events {
        assert_eq!(event.values.len(), 1);
        assert_eq!(
            event.value("action"),
            Some(&PropertyValue::String("login".to_string()))
        );
    }

    let requests = service.requests();
    assert_eq!(
        requests[..6],
        [
            Request::Ping,
            Request::GetTable("logins".to_string()),
            Request::CreateTable("logins".to_string()),
            Request::ListProperties("logins".to_string()),
            Request::CreateProperty {
                table: "logins".to_string(),
                property: "action".to_string(),
            },
            Request::OpenStream("logins".to_string()),
        ]
    );
    assert_eq!(
        requests.last(),
        Some(&Request::CloseStream("logins".to_string()))
    );
}

#[tokio::test]
async fn overwrite_recreates_table_before_sync() {
    let service = InMemoryTableService::new().with_table(
        "logins",
        vec![
            PropertyDefinition::new("action", DataType::Integer),
            PropertyDefinition::new("legacy", DataType::Boolean),
        ],
    );
    let script = example("login.script.json");
    let mut options = RunOptions::new("logins", 1);
    options.overwrite = true;

    let (outcome, _) = run(&service, &script, options, 42).await;
    let report = outcome.expect("conflicting table is replaced, not synced");
    assert!(report.recreated);
    assert_eq!(report.sync.added, vec!["action".to_string()]);
    assert!(report.sync.existing.is_empty());

    let requests = service.requests();
    assert_eq!(
        requests[1..4],
        [
            Request::GetTable("logins".to_string()),
            Request::DeleteTable("logins".to_string()),
            Request::CreateTable("logins".to_string()),
        ]
    );

    let properties = service.table_properties("logins");
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].name, "action");
    assert_eq!(properties[0].data_type, DataType::String);
    assert!(!properties[0].transient);
}

#[tokio::test]
async fn existing_table_is_reused_without_overwrite() {
    let service = InMemoryTableService::new().with_table(
        "logins",
        vec![PropertyDefinition::new("action", DataType::String)],
    );
    let script = example("login.script.json");

    let (outcome, _) = run(&service, &script, RunOptions::new("logins", 2), 42).await;
    let report = outcome.expect("run succeeds");
    assert!(report.sync.added.is_empty());
    assert_eq!(report.sync.existing, vec!["action".to_string()]);
    assert!(
        !service
            .requests()
            .iter()
            .any(|request| matches!(request, Request::CreateTable(_) | Request::DeleteTable(_)))
    );
}

#[tokio::test]
async fn same_seed_streams_identical_events() {
    let script = example("storefront.script.json");
    let first = InMemoryTableService::new();
    let second = InMemoryTableService::new();

    run(&first, &script, RunOptions::new("shop", 10), 1234)
        .await
        .0
        .expect("first run");
    run(&second, &script, RunOptions::new("shop", 10), 1234)
        .await
        .0
        .expect("second run");

    assert_eq!(first.events("shop"), second.events("shop"));
}

#[tokio::test]
async fn objects_are_streamed_one_after_another() {
    let service = InMemoryTableService::new();
    let script = example("storefront.script.json");

    let (outcome, _) = run(&service, &script, RunOptions::new("shop", 10), 77).await;
    let report = outcome.expect("run succeeds");

    let events = service.events("shop");
    assert_eq!(report.events, events.len() as u64);

    let mut blocks: Vec<&str> = Vec::new();
    for event in &events {
        if blocks.last() != Some(&event.object_id.as_str()) {
            blocks.push(event.object_id.as_str());
        }
    }
    assert_eq!(blocks.len(), 10);
    let distinct: BTreeSet<_> = blocks.iter().collect();
    assert_eq!(distinct.len(), 10);
}

#[tokio::test]
async fn unreachable_store_fails_before_any_table_call() {
    let service = InMemoryTableService::new();
    service.set_reachable(false);
    let script = example("login.script.json");

    let (outcome, history) = run(&service, &script, RunOptions::new("logins", 3), 42).await;
    let err = outcome.expect_err("run fails");

    assert!(matches!(err, RunError::Connectivity { .. }));
    assert_eq!(err.stage(), "connect");
    assert_eq!(history, vec![RunState::Idle, RunState::Failed]);
    assert_eq!(service.requests(), vec![Request::Ping]);
}

#[tokio::test]
async fn transport_failure_stops_the_run_and_closes_the_stream() {
    let service = InMemoryTableService::new();
    service.fail_sends_after(2);
    let script = example("login.script.json");

    let (outcome, history) = run(&service, &script, RunOptions::new("logins", 5), 42).await;
    let err = outcome.expect_err("run fails");

    assert_eq!(err.stage(), "emit");
    assert_eq!(history.last(), Some(&RunState::Failed));
    assert_eq!(service.events("logins").len(), 2);
    assert_eq!(count_sends(&service), 3);
    assert_eq!(
        service.requests().last(),
        Some(&Request::CloseStream("logins".to_string()))
    );
}

#[tokio::test]
async fn generation_failure_names_the_object() {
    let service = InMemoryTableService::new();
    let script: Script = serde_json::from_value(json!({
        "script_version": "0.1",
        "schema": { "properties": [{ "name": "action", "type": "string" }] },
        "generate": { "type": "emit", "values": {
            "color": { "kind": "constant", "value": "red" }
        }}
    }))
    .expect("script json");

    let (outcome, history) = run(&service, &script, RunOptions::new("logins", 4), 42).await;

    match outcome {
        Err(RunError::Generation {
            index,
            object_id,
            source: GenerationError::UndeclaredProperty { property, .. },
        }) => {
            assert_eq!(index, 1);
            assert_eq!(object_id.len(), 8);
            assert_eq!(property, "color");
        }
        other => panic!("expected generation failure, got {other:?}"),
    }
    assert_eq!(
        history[history.len() - 2..],
        [RunState::Streaming, RunState::Failed]
    );
    assert_eq!(count_sends(&service), 0);
    assert_eq!(
        service.requests().last(),
        Some(&Request::CloseStream("logins".to_string()))
    );
}

#[tokio::test]
async fn generation_failure_on_a_later_object_stops_the_run() {
    // Every object emits a login; some also take an arm naming an undeclared
    // property. Search seeds for a run whose first failing object is not the first.
    let script: Script = serde_json::from_value(json!({
        "script_version": "0.1",
        "schema": { "properties": [{ "name": "action", "type": "string" }] },
        "generate": { "type": "sequence", "rules": [
            { "type": "emit", "values": { "action": { "kind": "constant", "value": "login" } } },
            { "type": "branch", "arms": [
                { "probability": 0.3, "rule": { "type": "emit", "values": {
                    "color": { "kind": "constant", "value": "red" }
                }}}
            ]}
        ]}
    }))
    .expect("script json");

    for seed in 1..200 {
        let service = InMemoryTableService::new();
        let (outcome, history) = run(&service, &script, RunOptions::new("logins", 10), seed).await;
        let (index, object_id) = match outcome {
            Err(RunError::Generation {
                index, object_id, ..
            }) if index > 1 => (index, object_id),
            _ => continue,
        };

        let events = service.events("logins");
        assert_eq!(events.len() as u64, index - 1);
        assert_eq!(count_sends(&service), (index - 1) as usize);
        let emitted: BTreeSet<_> = events.iter().map(|event| event.object_id.as_str()).collect();
        assert_eq!(emitted.len() as u64, index - 1);
        assert!(!emitted.contains(object_id.as_str()));
        assert_eq!(history.last(), Some(&RunState::Failed));
        assert_eq!(
            service.requests().last(),
            Some(&Request::CloseStream("logins".to_string()))
        );
        return;
    }
    panic!("no seed failed after the first object");
}

#[tokio::test]
async fn schema_conflict_stops_before_streaming() {
    let service = InMemoryTableService::new().with_table(
        "logins",
        vec![PropertyDefinition::new("action", DataType::Integer)],
    );
    let script = example("login.script.json");

    let (outcome, history) = run(&service, &script, RunOptions::new("logins", 3), 42).await;
    let err = outcome.expect_err("run fails");

    assert_eq!(err.stage(), "sync-schema");
    assert_eq!(
        history,
        vec![
            RunState::Idle,
            RunState::Connected,
            RunState::TableResolved,
            RunState::Failed,
        ]
    );
    assert!(
        !service
            .requests()
            .iter()
            .any(|request| matches!(request, Request::OpenStream(_)))
    );
}
