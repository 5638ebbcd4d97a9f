use agentcore_store::entry::{EntryMessage, EntryType, SessionEntry};
use agentcore_store::SessionStore;

fn make_entry(session_id: &str, content: &str) -> SessionEntry {
    SessionEntry {
        uuid: uuid::Uuid::now_v7(),
        parent_uuid: None,
        session_id: session_id.to_string(),
        timestamp: chrono::Utc::now(),
        entry_type: EntryType::User,
        subtype: None,
        cwd: "/tmp/project".to_string(),
        git_branch: Some("main".to_string()),
        version: "0.1.0".to_string(),
        message: EntryMessage { role: "user".to_string(), content: content.to_string(), model: None, usage: None },
        tool: Vec::new(),
        tool_result: None,
        is_compact_summary: None,
        compact_metadata: None,
    }
}

#[tokio::test]
async fn session_file_lands_at_escaped_project_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    let path = store.session_path("/Users/jo/my project", "abc-123");
    assert!(path.to_string_lossy().contains("Users-jo-my-project"));
    assert!(path.ends_with("abc-123.jsonl"));
}

#[tokio::test]
async fn round_trip_preserves_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());

    store.append("/project", "sess-rt", make_entry("sess-rt", "first"));
    store.append("/project", "sess-rt", make_entry("sess-rt", "second"));
    store.flush("/project", "sess-rt").await;

    let loaded = store.load_entries("/project", "sess-rt").await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].message.content, "first");
    assert_eq!(loaded[1].message.content, "second");
    assert_eq!(loaded[0].git_branch.as_deref(), Some("main"));
}

#[tokio::test]
async fn unknown_json_fields_on_disk_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let session_dir = dir.path().join("project");
    tokio::fs::create_dir_all(&session_dir).await.unwrap();
    let path = session_dir.join("sess-unknown.jsonl");
    let mut entry = serde_json::to_value(make_entry("sess-unknown", "hi")).unwrap();
    entry["futureField"] = serde_json::json!("from a newer client");
    tokio::fs::write(&path, format!("{}\n", entry)).await.unwrap();

    let store = SessionStore::new(dir.path());
    let loaded = store.load_entries("project", "sess-unknown").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].message.content, "hi");
}
