//! End-to-end flows through the lab service.

use std::sync::Arc;
use std::time::Duration;

use agentlab_core::{
    AgentDraft, AgentPatch, AgentRegistry, ExperimentEvent, ExperimentRequest, LabConfig,
    LabService, ManualClock, RecordingNotifier, SimulatorState,
};
use chrono::{TimeZone, Utc};

fn lab() -> (LabService, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let config = LabConfig {
        seed: Some(2024),
        tick_interval_ms: 250,
        ..LabConfig::default()
    };
    (LabService::new(config, notifier.clone()), notifier)
}

#[test]
fn test_create_update_delete_round() {
    let (mut lab, notifier) = lab();

    let created = lab
        .create_agent(AgentDraft::new("A", "R", "G", "B"))
        .expect("create");
    let listed = lab.list_agents();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "A");

    let updated = lab
        .update_agent(created.id, AgentPatch::default().with_goal("G2"))
        .expect("update");
    assert_eq!(updated.goal, "G2");
    assert_eq!(updated.role, "R");
    assert_eq!(updated.id, created.id);
    assert!(updated.updated_at > created.updated_at);

    lab.delete_agent(created.id).expect("delete");
    assert!(lab.list_agents().is_empty());

    assert_eq!(
        notifier.titles(),
        vec!["Agent Created", "Agent Updated", "Agent Deleted"]
    );
}

#[test]
fn test_pinned_clock_still_orders_updates() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let registry = AgentRegistry::with_clock(clock.clone());
    let notifier = Arc::new(RecordingNotifier::new());
    let mut lab = LabService::with_registry(registry, LabConfig::default(), notifier);

    let agent = lab
        .create_agent(AgentDraft::new("A", "R", "G", "B"))
        .expect("create");
    let first = lab
        .update_agent(agent.id, AgentPatch::default().with_name("A1"))
        .expect("update");
    let second = lab
        .update_agent(agent.id, AgentPatch::default().with_name("A2"))
        .expect("update");

    assert_eq!(first.created_at, agent.created_at);
    assert!(first.updated_at > agent.updated_at);
    assert!(second.updated_at > first.updated_at);
}

#[test]
fn test_update_to_blank_is_rejected_and_agent_kept() {
    let (mut lab, notifier) = lab();
    let agent = lab
        .create_agent(AgentDraft::new("A", "R", "G", "B"))
        .expect("create");
    notifier.drain();

    let err = lab
        .update_agent(agent.id, AgentPatch::default().with_backstory("   "))
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(lab.agent(agent.id), Some(&agent));
    assert_eq!(notifier.titles(), vec!["Missing Information"]);
}

#[tokio::test(start_paused = true)]
async fn test_experiment_leaves_registry_untouched() {
    let (mut lab, notifier) = lab();
    let agent = lab
        .create_agent(AgentDraft::new("Analyst", "Research", "Compare", "Curious"))
        .expect("create");
    let before = lab.list_agents();
    notifier.drain();

    let start = tokio::time::Instant::now();
    let run = lab
        .start_experiment(ExperimentRequest::new(agent.id, "Bench", "Prompt", 8))
        .expect("start");
    let mut seen = Vec::new();
    let last = run
        .finish(|event| {
            if let ExperimentEvent::Progress(s) = event {
                seen.push(s.current_iteration);
            }
        })
        .await;

    assert_eq!(seen, (1..=8).collect::<Vec<_>>());
    // Eight progress ticks plus the completing tick.
    assert_eq!(start.elapsed(), Duration::from_millis(250 * 9));
    match last {
        Some(ExperimentEvent::Completed(outcome)) => {
            assert_eq!(outcome.agent_name, "Analyst");
            assert_eq!(outcome.snapshot.total_attempts(), 8);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }
    assert_eq!(lab.list_agents(), before);
    assert_eq!(
        notifier.titles(),
        vec!["Experiment Started", "Experiment Complete"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_experiment_reports_partial_state() {
    let (mut lab, notifier) = lab();
    let agent = lab
        .create_agent(AgentDraft::new("A", "R", "G", "B"))
        .expect("create");

    let mut run = lab
        .start_experiment(ExperimentRequest::new(agent.id, "Long", "Prompt", 100))
        .expect("start");
    for _ in 0..4 {
        run.events.recv().await.expect("progress");
    }
    assert!(run.handle.cancel());
    assert_eq!(run.handle.state(), SimulatorState::Cancelled);

    let frozen = run.handle.snapshot();
    let last = run.finish(|_| {}).await;
    assert_eq!(last, Some(ExperimentEvent::Cancelled(frozen)));
    assert!(notifier
        .titles()
        .contains(&"Experiment Cancelled".to_string()));
}
