//! Resume behaviour across calls, failures, restarts and threads
//!
//! Tool answers come from the scripted session; checkpoints go either to the
//! in-memory store, a fault-injecting wrapper around it, or SQLite on disk.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use easel::db::Database;
use easel::mcp::{ArgValue, ScriptedToolSession, ToolArguments, ToolName};
use easel::{
    Checkpoint, CheckpointStore, FailureKind, MemoryCheckpointStore, PersistenceError,
    PipelineSteps, Position, ResumeDriver, RunOutcome, StepTool, ToolErrorKind, WorkflowEngine,
};
use tempfile::tempdir;

fn steps() -> PipelineSteps {
    PipelineSteps {
        prompt: StepTool::new("comfy", ToolName::new("generate_prompt").unwrap()),
        artifact: StepTool::new("comfy", ToolName::new("generate_image").unwrap()),
    }
}

fn driver_over(store: Arc<dyn CheckpointStore>, tools: Arc<ScriptedToolSession>) -> ResumeDriver {
    ResumeDriver::new(WorkflowEngine::new(store, tools, steps()))
}

fn pending_prompt(outcome: &RunOutcome) -> &str {
    match outcome {
        RunOutcome::PendingFeedback { prompt, .. } => prompt,
        other => panic!("expected pending feedback, got {:?}", other),
    }
}

/// Memory store that can be told to lose one upcoming append
struct FlakyStore {
    inner: MemoryCheckpointStore,
    appends: AtomicUsize,
    fail_on: AtomicUsize,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryCheckpointStore::new(),
            appends: AtomicUsize::new(0),
            fail_on: AtomicUsize::new(0),
        }
    }

    /// Fail the `n`th append from now (1 = the next one)
    fn fail_append_in(&self, n: usize) {
        let target = self.appends.load(Ordering::SeqCst) + n;
        self.fail_on.store(target, Ordering::SeqCst);
    }
}

impl CheckpointStore for FlakyStore {
    fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError> {
        self.inner.load_latest(thread_id)
    }

    fn append(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let index = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if index == self.fail_on.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated crash before commit").into());
        }
        self.inner.append(checkpoint)
    }

    fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, PersistenceError> {
        self.inner.history(thread_id)
    }
}

#[tokio::test]
async fn test_red_bicycle_scenario() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .respond("generate_prompt", "a red bicycle, studio lighting")
        .respond("generate_prompt", "a red bicycle, golden hour, 35mm")
        .respond("generate_image", "file:///out/img1.png");
    let driver = driver_over(store.clone(), tools.clone());

    let outcome = driver.run("T1", Some("a red bicycle"), None).await;
    assert_eq!(pending_prompt(&outcome), "a red bicycle, studio lighting");

    let outcome = driver.run("T1", None, Some("n")).await;
    assert_eq!(pending_prompt(&outcome), "a red bicycle, golden hour, 35mm");

    let outcome = driver.run("T1", None, Some("y")).await;
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            thread_id: "T1".to_string(),
            artifact_ref: "file:///out/img1.png".to_string(),
        }
    );

    assert_eq!(tools.calls_to("generate_prompt"), 2);
    assert_eq!(tools.calls_to("generate_image"), 1);
    let image_call = &tools.calls()[2];
    assert_eq!(
        image_call.arguments.get("prompt"),
        Some(&ArgValue::Text("a red bicycle, golden hour, 35mm".to_string()))
    );
}

#[tokio::test]
async fn test_resume_without_feedback_is_idempotent() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools.respond("generate_prompt", "a cat, studio lighting");
    let driver = driver_over(store.clone(), tools.clone());

    driver.run("T1", Some("a cat"), None).await;
    let before = store.history("T1").unwrap().len();

    let first = driver.run("T1", None, None).await;
    let second = driver.run("T1", None, None).await;

    assert_eq!(first, second);
    let RunOutcome::PendingFeedback {
        sequence, action, ..
    } = &first
    else {
        panic!("expected pending feedback");
    };
    assert_eq!(*sequence, 2);
    assert_eq!(action, "Do you like this prompt? (y/n)");
    assert_eq!(store.history("T1").unwrap().len(), before);
    assert_eq!(tools.call_count(), 1);
}

#[tokio::test]
async fn test_completed_thread_ignores_inputs() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .respond("generate_prompt", "a cat, studio lighting")
        .respond("generate_image", "file:///out/cat.png");
    let driver = driver_over(store.clone(), tools.clone());

    driver.run("T1", Some("a cat"), None).await;
    driver.run("T1", None, Some("yes")).await;
    let calls = tools.call_count();
    let checkpoints = store.history("T1").unwrap().len();

    for (topic, feedback) in [(None, None), (Some("a dog"), Some("n")), (None, Some("y"))] {
        let outcome = driver.run("T1", topic, feedback).await;
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                thread_id: "T1".to_string(),
                artifact_ref: "file:///out/cat.png".to_string(),
            }
        );
    }

    assert_eq!(tools.call_count(), calls);
    assert_eq!(store.history("T1").unwrap().len(), checkpoints);
}

#[tokio::test]
async fn test_history_follows_allowed_transitions() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .respond("generate_prompt", "first")
        .respond("generate_prompt", "second")
        .respond("generate_prompt", "third")
        .respond("generate_image", "file:///out/img.png");
    let driver = driver_over(store.clone(), tools.clone());

    driver.run("T1", Some("a lighthouse"), None).await;
    driver.run("T1", None, Some("no")).await;
    driver.run("T1", None, Some("nope")).await;
    driver.run("T1", None, Some("")).await;

    let history = store.history("T1").unwrap();
    assert_eq!(history.first().unwrap().sequence, 1);
    assert_eq!(history.last().unwrap().position, Position::Completed);
    for pair in history.windows(2) {
        assert_eq!(pair[1].sequence, pair[0].sequence + 1);
        assert!(
            pair[0].position.can_transition_to(pair[1].position),
            "{} -> {}",
            pair[0].position,
            pair[1].position
        );
        assert_eq!(pair[1].state.topic, "a lighthouse");
    }

    // pending question only while parked
    for checkpoint in &history {
        assert_eq!(
            checkpoint.pending_question.is_some(),
            checkpoint.position == Position::AwaitingFeedback
        );
    }
}

#[tokio::test]
async fn test_tool_failure_then_retry() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .respond("generate_prompt", "a cat, studio lighting")
        .fail("generate_image", ToolErrorKind::Timeout, "no answer after 300s")
        .respond("generate_image", "file:///out/cat.png");
    let driver = driver_over(store.clone(), tools.clone());

    driver.run("T1", Some("a cat"), None).await;
    let outcome = driver.run("T1", None, Some("y")).await;

    let RunOutcome::Failed { kind, .. } = outcome else {
        panic!("expected failure");
    };
    assert!(kind.is_retryable());
    let latest = store.load_latest("T1").unwrap().unwrap();
    assert_eq!(latest.position, Position::GeneratingArtifact);

    // feedback is not needed again, the artifact step is simply re-run
    let outcome = driver.run("T1", None, None).await;
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(tools.calls_to("generate_image"), 2);
}

#[tokio::test]
async fn test_first_prompt_failure_keeps_thread() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .fail("generate_prompt", ToolErrorKind::Spawn, "uvx: not found")
        .respond("generate_prompt", "a cat, studio lighting");
    let driver = driver_over(store.clone(), tools.clone());

    let outcome = driver.run("T1", Some("a cat"), None).await;
    assert!(outcome.is_failed());

    // the topic was persisted, so it need not be given again
    let outcome = driver.run("T1", None, None).await;
    assert_eq!(pending_prompt(&outcome), "a cat, studio lighting");
}

#[tokio::test]
async fn test_crash_between_tool_and_commit() {
    let store = Arc::new(FlakyStore::new());
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .respond("generate_prompt", "a robot, cinematic lighting")
        .respond("generate_image", "file:///out/lost.png")
        .respond("generate_image", "file:///out/robot.png");
    let driver = driver_over(store.clone(), tools.clone());

    driver.run("T1", Some("a robot"), None).await;

    // feedback commits, the image tool succeeds, the final commit is lost
    store.fail_append_in(2);
    let outcome = driver.run("T1", None, Some("y")).await;
    let RunOutcome::Failed { kind, .. } = outcome else {
        panic!("expected failure");
    };
    assert_eq!(kind, FailureKind::Persistence);

    let latest = store.load_latest("T1").unwrap().unwrap();
    assert_eq!(latest.sequence, 3);
    assert_eq!(latest.position, Position::GeneratingArtifact);
    assert!(latest.state.artifact_ref.is_empty());

    let outcome = driver.run("T1", None, None).await;
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            thread_id: "T1".to_string(),
            artifact_ref: "file:///out/robot.png".to_string(),
        }
    );
    assert_eq!(store.load_latest("T1").unwrap().unwrap().sequence, 4);
}

#[tokio::test]
async fn test_resume_after_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoints.db");

    {
        let tools = Arc::new(ScriptedToolSession::new());
        tools.respond("generate_prompt", "a portrait, soft natural lighting");
        let driver = driver_over(Arc::new(Database::open_at(&path).unwrap()), tools);
        let outcome = driver.run("T1", Some("a portrait"), None).await;
        assert_eq!(pending_prompt(&outcome), "a portrait, soft natural lighting");
    }

    let tools = Arc::new(ScriptedToolSession::new());
    tools.respond("generate_image", "file:///out/portrait.png");
    let db = Arc::new(Database::open_at(&path).unwrap());
    let driver = driver_over(db.clone(), tools.clone());

    let outcome = driver.run("T1", None, Some("Y")).await;
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            thread_id: "T1".to_string(),
            artifact_ref: "file:///out/portrait.png".to_string(),
        }
    );
    assert_eq!(tools.calls_to("generate_prompt"), 0);
    assert_eq!(db.history("T1").unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_threads_do_not_interfere() {
    let dir = tempdir().unwrap();
    let db = Arc::new(Database::open_at(dir.path().join("checkpoints.db")).unwrap());
    let tools = Arc::new(ScriptedToolSession::new());
    for _ in 0..8 {
        tools.respond("generate_prompt", "a scene, high quality");
    }
    let driver = Arc::new(driver_over(db.clone(), tools.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let driver = driver.clone();
        handles.push(tokio::spawn(async move {
            let thread_id = format!("T{}", i);
            let topic = format!("scene {}", i);
            driver.run(&thread_id, Some(topic.as_str()), None).await
        }));
    }
    for handle in handles {
        assert!(matches!(
            handle.await.unwrap(),
            RunOutcome::PendingFeedback { sequence: 2, .. }
        ));
    }

    for i in 0..8 {
        let thread_id = format!("T{}", i);
        let history = db.history(&thread_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].state.topic, format!("scene {}", i));
    }
    assert_eq!(db.list_threads(100).unwrap().len(), 8);
}

#[tokio::test]
async fn test_step_arguments_reach_the_tool() {
    let tools = Arc::new(ScriptedToolSession::new());
    tools
        .respond("generate_prompt", "a cat, studio lighting")
        .respond("generate_image", "http://127.0.0.1:8188/view?filename=cat.png&type=output");

    let mut steps = steps();
    steps.artifact = steps.artifact.with_arguments(
        ToolArguments::new()
            .with("model", "dall-e-3")
            .unwrap()
            .with("size", "1024x1024")
            .unwrap()
            .with("quality", "standard")
            .unwrap(),
    );
    let engine = WorkflowEngine::new(Arc::new(MemoryCheckpointStore::new()), tools.clone(), steps);
    let driver = ResumeDriver::new(engine);

    driver.run("T1", Some("a cat"), None).await;
    driver.run("T1", None, Some("y")).await;

    let image_call = &tools.calls()[1];
    assert_eq!(image_call.arguments.len(), 4);
    assert_eq!(
        image_call.arguments.get("size"),
        Some(&ArgValue::Text("1024x1024".to_string()))
    );
    assert_eq!(
        image_call.arguments.get("prompt"),
        Some(&ArgValue::Text("a cat, studio lighting".to_string()))
    );
}
