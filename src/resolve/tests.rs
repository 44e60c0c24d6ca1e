use super::*;
use serde_json::json;

// ===================================================================
// Test helpers
// ===================================================================

fn make_transcript(lines: &[serde_json::Value]) -> Transcript {
    let contents = lines
        .iter()
        .map(|v| serde_json::to_string(v).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    let (transcript, dropped) = Transcript::parse("/p/S1.jsonl", &contents);
    assert!(dropped.is_empty(), "dropped lines: {dropped:?}");
    transcript
}

/// Assistant record making one `Task` call.
fn task_call(uuid: &str, ts: &str, call_id: &str, agent_type: &str, prompt: &str) -> serde_json::Value {
    json!({
        "type": "assistant",
        "uuid": uuid,
        "sessionId": "S1",
        "timestamp": ts,
        "cwd": "/proj",
        "message": {
            "role": "assistant",
            "content": [{
                "type": "tool_use",
                "id": call_id,
                "name": "Task",
                "input": {
                    "description": "spawn",
                    "prompt": prompt,
                    "subagent_type": agent_type
                }
            }]
        }
    })
}

/// User record carrying the written-back result of a `Task` call.
fn task_result(uuid: &str, ts: &str, call_id: &str, agent_id: &str) -> serde_json::Value {
    json!({
        "type": "user",
        "uuid": uuid,
        "sessionId": "S1",
        "timestamp": ts,
        "cwd": "/proj",
        "message": {
            "role": "user",
            "content": [{ "type": "tool_result", "tool_use_id": call_id, "content": "done" }]
        },
        "toolUseResult": { "status": "completed", "agentId": agent_id, "content": [] }
    })
}

// ===================================================================
// Direct lookup
// ===================================================================

#[test]
fn direct_lookup_finds_saved_call_id() {
    let parent = make_transcript(&[
        task_call("a1", "2025-01-01T00:00:00Z", "tool-1", "Explore", "first"),
        task_call("a2", "2025-01-01T00:00:05Z", "tool-2", "Plan", "second"),
    ]);
    let hints = Hints {
        call_id: Some("tool-1"),
        ..Default::default()
    };
    let hit = resolve(&parent, "42", &hints).unwrap();
    assert_eq!(hit.call_id, "tool-1");
    assert_eq!(hit.prompt, "first");
    assert_eq!(hit.agent_type.as_deref(), Some("Explore"));
    assert_eq!(hit.strategy, "direct");
}

#[test]
fn direct_lookup_ignores_non_spawning_tools() {
    let parent = make_transcript(&[json!({
        "type": "assistant",
        "uuid": "a1",
        "sessionId": "S1",
        "timestamp": "2025-01-01T00:00:00Z",
        "message": { "content": [{
            "type": "tool_use", "id": "tool-1", "name": "Read",
            "input": { "file_path": "/p/x" }
        }]}
    })]);
    let hints = Hints {
        call_id: Some("tool-1"),
        ..Default::default()
    };
    assert!(resolve(&parent, "42", &hints).is_none());
}

#[test]
fn direct_lookup_accepts_agent_tool_name() {
    let parent = make_transcript(&[json!({
        "type": "assistant",
        "uuid": "a1",
        "sessionId": "S1",
        "timestamp": "2025-01-01T00:00:00Z",
        "message": { "content": [{
            "type": "tool_use", "id": "tool-1", "name": "Agent",
            "input": { "prompt": "go", "subagent_type": "general-purpose" }
        }]}
    })]);
    let hints = Hints {
        call_id: Some("tool-1"),
        ..Default::default()
    };
    let hit = resolve(&parent, "42", &hints).unwrap();
    assert_eq!(hit.agent_type.as_deref(), Some("general-purpose"));
}

// ===================================================================
// Back-reference lookup
// ===================================================================

#[test]
fn back_reference_follows_written_back_result() {
    let parent = make_transcript(&[
        task_call("a1", "2025-01-01T00:00:00Z", "tool-1", "Explore", "first"),
        task_call("a2", "2025-01-01T00:00:01Z", "tool-2", "Explore", "second"),
        task_result("u1", "2025-01-01T00:01:00Z", "tool-1", "other-agent"),
        task_result("u2", "2025-01-01T00:02:00Z", "tool-2", "42"),
    ]);
    let hit = resolve(&parent, "42", &Hints::default()).unwrap();
    assert_eq!(hit.call_id, "tool-2");
    assert_eq!(hit.prompt, "second");
    assert_eq!(hit.strategy, "back-reference");
}

#[test]
fn back_reference_used_when_saved_call_id_is_stale() {
    let parent = make_transcript(&[
        task_call("a1", "2025-01-01T00:00:00Z", "tool-1", "Explore", "first"),
        task_result("u1", "2025-01-01T00:01:00Z", "tool-1", "42"),
    ]);
    let hints = Hints {
        call_id: Some("tool-missing"),
        ..Default::default()
    };
    let hit = resolve(&parent, "42", &hints).unwrap();
    assert_eq!(hit.call_id, "tool-1");
    assert_eq!(hit.strategy, "back-reference");
}

// ===================================================================
// Time-window match
// ===================================================================

#[test]
fn time_window_picks_closest_preceding_call_of_type() {
    let parent = make_transcript(&[
        task_call("a1", "2025-01-01T00:00:01Z", "tool-1", "Explore", "older"),
        task_call("a2", "2025-01-01T00:00:04Z", "tool-2", "Explore", "newer"),
        task_call("a3", "2025-01-01T00:00:05Z", "tool-3", "Plan", "wrong type"),
        task_call("a4", "2025-01-01T00:00:07Z", "tool-4", "Explore", "after start"),
    ]);
    let hints = Hints {
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:06Z"),
        ..Default::default()
    };
    let hit = resolve(&parent, "42", &hints).unwrap();
    assert_eq!(hit.call_id, "tool-2");
    assert_eq!(hit.prompt, "newer");
    assert_eq!(hit.strategy, "time-window");
}

#[test]
fn time_window_boundary_is_inclusive() {
    let parent = make_transcript(&[task_call(
        "a1",
        "2025-01-01T00:00:00.000Z",
        "tool-1",
        "Explore",
        "edge",
    )]);
    let hints = Hints {
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:10.000Z"),
        ..Default::default()
    };
    assert_eq!(resolve(&parent, "42", &hints).unwrap().call_id, "tool-1");
}

#[test]
fn time_window_rejects_one_millisecond_past_boundary() {
    let parent = make_transcript(&[task_call(
        "a1",
        "2025-01-01T00:00:00.000Z",
        "tool-1",
        "Explore",
        "edge",
    )]);
    let hints = Hints {
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:10.001Z"),
        ..Default::default()
    };
    assert!(resolve(&parent, "42", &hints).is_none());
}

#[test]
fn time_window_is_caller_overridable() {
    let parent = make_transcript(&[task_call(
        "a1",
        "2025-01-01T00:00:00Z",
        "tool-1",
        "Explore",
        "slow start",
    )]);
    let hints = Hints {
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:30Z"),
        window: Duration::seconds(60),
        ..Default::default()
    };
    assert_eq!(resolve(&parent, "42", &hints).unwrap().call_id, "tool-1");
}

#[test]
fn time_window_needs_both_type_and_start() {
    let parent = make_transcript(&[task_call(
        "a1",
        "2025-01-01T00:00:00Z",
        "tool-1",
        "Explore",
        "p",
    )]);
    let only_type = Hints {
        agent_type: Some("Explore"),
        ..Default::default()
    };
    let only_start = Hints {
        started_at: Some("2025-01-01T00:00:01Z"),
        ..Default::default()
    };
    assert!(resolve(&parent, "42", &only_type).is_none());
    assert!(resolve(&parent, "42", &only_start).is_none());
}

#[test]
fn time_window_skips_unparseable_timestamps() {
    let parent = make_transcript(&[task_call("a1", "yesterday", "tool-1", "Explore", "p")]);
    let hints = Hints {
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:01Z"),
        ..Default::default()
    };
    assert!(resolve(&parent, "42", &hints).is_none());
}

// ===================================================================
// Priority
// ===================================================================

#[test]
fn direct_lookup_dominates_time_window() {
    let parent = make_transcript(&[
        task_call("a1", "2025-01-01T00:00:00Z", "tool-A", "Explore", "A"),
        task_call("a2", "2025-01-01T00:00:09Z", "tool-B", "Explore", "B"),
    ]);
    let hints = Hints {
        call_id: Some("tool-A"),
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:10Z"),
        ..Default::default()
    };
    let hit = resolve(&parent, "42", &hints).unwrap();
    assert_eq!(hit.prompt, "A");
}

#[test]
fn back_reference_dominates_time_window() {
    let parent = make_transcript(&[
        task_call("a1", "2025-01-01T00:00:00Z", "tool-A", "Explore", "A"),
        task_call("a2", "2025-01-01T00:00:09Z", "tool-B", "Explore", "B"),
        task_result("u1", "2025-01-01T00:01:00Z", "tool-A", "42"),
    ]);
    let hints = Hints {
        agent_type: Some("Explore"),
        started_at: Some("2025-01-01T00:00:10Z"),
        ..Default::default()
    };
    assert_eq!(resolve(&parent, "42", &hints).unwrap().prompt, "A");
}

#[test]
fn all_strategies_missing_is_none() {
    let parent = make_transcript(&[task_call(
        "a1",
        "2025-01-01T00:00:00Z",
        "tool-1",
        "Explore",
        "p",
    )]);
    assert!(resolve(&parent, "42", &Hints::default()).is_none());
}

#[test]
fn parse_timestamp_handles_fractional_seconds() {
    let a = parse_timestamp("2025-01-01T00:00:00.250Z").unwrap();
    let b = parse_timestamp("2025-01-01T00:00:00Z").unwrap();
    assert_eq!(a - b, Duration::milliseconds(250));
    assert!(parse_timestamp("t").is_none());
}
