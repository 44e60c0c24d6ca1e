#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run the binary with `args`, feeding `stdin` to it. Returns the exit code,
/// stdout and stderr.
pub fn run_with_args(args: &[&str], stdin: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_subagent-edits"))
        .args(args)
        .env_remove("SUBAGENT_EDITS_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Run the hook handler with `stdin_json` as the event.
pub fn run_cli(stdin_json: &str) -> (i32, String, String) {
    run_with_args(&[], stdin_json)
}

/// Common hook fields for a session rooted at `cwd`.
pub fn common(cwd: &Path, transcript_path: &Path) -> Value {
    json!({
        "session_id": "S1",
        "transcript_path": transcript_path,
        "cwd": cwd,
        "permission_mode": "default"
    })
}

/// `common` merged with the event-specific `fields`.
pub fn event(cwd: &Path, transcript_path: &Path, name: &str, fields: Value) -> String {
    let mut input = common(cwd, transcript_path);
    input["hook_event_name"] = json!(name);
    if let (Some(target), Value::Object(extra)) = (input.as_object_mut(), fields) {
        target.extend(extra);
    }
    input.to_string()
}

pub fn write_jsonl(path: &Path, lines: &[Value]) {
    let contents = lines
        .iter()
        .map(|v| serde_json::to_string(v).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(path, contents).unwrap();
}

/// Parent-session record making one `Task` call.
pub fn spawn_call(call_id: &str, ts: &str, agent_type: &str, prompt: &str) -> Value {
    json!({
        "type": "assistant",
        "uuid": format!("p-{call_id}"),
        "sessionId": "S1",
        "timestamp": ts,
        "cwd": "/proj",
        "message": { "role": "assistant", "content": [{
            "type": "tool_use",
            "id": call_id,
            "name": "Task",
            "input": { "description": "spawn", "prompt": prompt, "subagent_type": agent_type }
        }]}
    })
}

/// Agent record making one tool call.
pub fn agent_call(uuid: &str, id: &str, name: &str, input: Value) -> Value {
    json!({
        "type": "assistant",
        "uuid": uuid,
        "sessionId": "S1",
        "timestamp": "2025-01-01T00:00:20Z",
        "cwd": "/proj",
        "isSidechain": true,
        "message": { "role": "assistant", "content": [
            { "type": "tool_use", "id": id, "name": name, "input": input }
        ]}
    })
}

/// First record of an agent transcript.
pub fn agent_prompt(prompt: &str) -> Value {
    json!({
        "type": "user",
        "uuid": "a-0",
        "sessionId": "S1",
        "timestamp": "2025-01-01T00:00:10Z",
        "cwd": "/proj",
        "isSidechain": true,
        "message": { "role": "user", "content": prompt }
    })
}

/// Default context store location under `project`.
pub fn store_path(project: &Path) -> std::path::PathBuf {
    project.join(".claude/state/subagent-context.json")
}

pub fn read_store(project: &Path) -> Value {
    match std::fs::read_to_string(store_path(project)) {
        Ok(s) => serde_json::from_str(&s).unwrap(),
        Err(_) => json!({}),
    }
}
