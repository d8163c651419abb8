//! End-to-end tests: tools file text in, tool results out.
//!
//! Every backend is in-process (in-memory SQLite, a temporary document
//! folder). Redis is only used to check that an unreachable server aborts
//! startup.

use conduit_core::Claims;
use conduit_runtime::{Bootstrap, ConfigError, Gateway, InvokeError, ToolsFile};
use serde_json::{Map, Value, json};

// =============================================================================
// FIXTURES
// =============================================================================

const TOOLS_FILE: &str = r#"
sources:
  hotels-db:
    kind: sqlite
    database: ":memory:"
tools:
  setup-hotels:
    kind: sqlite-execute-sql
    source: hotels-db
    description: Run SQL against the hotels database.
  search-hotels:
    kind: sqlite-sql
    source: hotels-db
    description: Search hotels by id or name.
    statement: SELECT * FROM hotels WHERE id = ? OR name = ? ORDER BY id
    parameters:
      - name: id
        type: string
        description: Hotel id
      - name: name
        type: string
        description: Hotel name
  my-bookings:
    kind: sqlite-sql
    source: hotels-db
    description: Hotels booked by the signed-in user.
    statement: SELECT name FROM hotels WHERE booked_by = ?
    authRequired: [google]
    parameters:
      - name: email
        type: string
        description: Caller email
        authServices:
          - name: google
            field: email
toolsets:
  hotels: [search-hotels, my-bookings]
"#;

const SCHEMA: &str = "CREATE TABLE hotels (id INTEGER PRIMARY KEY, name TEXT NOT NULL, booked_by TEXT);
INSERT INTO hotels (id, name, booked_by) VALUES (1, 'Alex', NULL), (2, 'Sid', 'sid@example.com'), (3, 'Bo', NULL);";

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

async fn gateway() -> Gateway {
    let bootstrap = Bootstrap::builtin().unwrap();
    let tools_file = ToolsFile::parse(TOOLS_FILE, &bootstrap).unwrap();
    let gateway = Gateway::initialize(&tools_file, "0.1.0-test").await.unwrap();

    gateway
        .invoke("setup-hotels", &args(json!({"sql": SCHEMA})), &Claims::new(), &[])
        .await
        .unwrap();
    gateway
}

// =============================================================================
// INITIALIZATION
// =============================================================================

#[tokio::test]
async fn test_initialize_builds_default_and_named_toolsets() {
    let gateway = gateway().await;

    assert_eq!(gateway.sources().len(), 1);
    assert_eq!(
        gateway.tool_names(),
        ["my-bookings", "search-hotels", "setup-hotels"]
    );

    let default = gateway.toolset("").unwrap();
    assert_eq!(default.manifest.tools.len(), 3);

    let hotels = serde_json::to_value(&gateway.toolset("hotels").unwrap().manifest).unwrap();
    assert_eq!(hotels["serverVersion"], "0.1.0-test");
    assert_eq!(
        hotels["tools"]["my-bookings"]["authRequired"],
        json!(["google"])
    );
    assert_eq!(
        hotels["tools"]["my-bookings"]["parameters"][0]["authSources"],
        json!(["google"])
    );
    assert!(gateway.toolset("missing").is_none());
}

#[tokio::test]
async fn test_mcp_tools_are_sorted_by_name() {
    let gateway = gateway().await;

    let tools = gateway.mcp_tools("hotels").unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["my-bookings", "search-hotels"]);
    assert_eq!(tools[1].input_schema.required, ["id", "name"]);
}

#[tokio::test]
async fn test_toolset_with_unknown_tool_fails_initialization() {
    let bootstrap = Bootstrap::builtin().unwrap();
    let tools_file = ToolsFile::parse(
        "sources:\n  db:\n    kind: sqlite\n    database: ':memory:'\ntoolsets:\n  broken: [nope]\n",
        &bootstrap,
    )
    .unwrap();

    let err = Gateway::initialize(&tools_file, "dev").await.unwrap_err();

    assert!(matches!(err, ConfigError::Toolset(_)));
}

#[tokio::test]
async fn test_tool_with_missing_source_fails_initialization() {
    let bootstrap = Bootstrap::builtin().unwrap();
    let tools_file = ToolsFile::parse(
        "tools:\n  t:\n    kind: sqlite-execute-sql\n    source: nowhere\n    description: x\n",
        &bootstrap,
    )
    .unwrap();

    let err = Gateway::initialize(&tools_file, "dev").await.unwrap_err();

    assert_eq!(err.to_string(), "no source named \"nowhere\" configured");
}

#[tokio::test]
async fn test_source_failure_aborts_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let bootstrap = Bootstrap::builtin().unwrap();
    let tools_file = ToolsFile::parse(
        &format!(
            "sources:\n  docs:\n    kind: local-documents\n    root: {}\n",
            missing.display()
        ),
        &bootstrap,
    )
    .unwrap();

    let err = Gateway::initialize(&tools_file, "dev").await.unwrap_err();

    assert!(matches!(err, ConfigError::Source(_)));
}

#[tokio::test]
async fn test_unreachable_redis_source_aborts_initialization() {
    let bootstrap = Bootstrap::builtin().unwrap();
    let tools_file = ToolsFile::parse(
        "sources:\n  cache:\n    kind: redis\n    url: redis://127.0.0.1:1\n",
        &bootstrap,
    )
    .unwrap();

    let err = Gateway::initialize(&tools_file, "dev").await.unwrap_err();

    assert!(matches!(err, ConfigError::Source(_)));
}

// =============================================================================
// REQUEST PATH
// =============================================================================

#[tokio::test]
async fn test_invoke_binds_parameters_positionally() {
    let gateway = gateway().await;

    let rows = gateway
        .invoke(
            "search-hotels",
            &args(json!({"id": "1", "name": "Sid"})),
            &Claims::new(),
            &[],
        )
        .await
        .unwrap();

    assert_eq!(
        rows,
        json!([
            {"id": 1, "name": "Alex", "booked_by": null},
            {"id": 2, "name": "Sid", "booked_by": "sid@example.com"},
        ])
    );
}

#[tokio::test]
async fn test_invoke_unknown_tool() {
    let gateway = gateway().await;

    let err = gateway
        .invoke("nope", &Map::new(), &Claims::new(), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, InvokeError::ToolNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn test_invoke_requires_a_verified_auth_service() {
    let gateway = gateway().await;

    let err = gateway
        .invoke("my-bookings", &Map::new(), &Claims::new(), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, InvokeError::Unauthorized));
}

#[tokio::test]
async fn test_invoke_reads_auth_parameters_from_claims() {
    let gateway = gateway().await;
    let mut claims = Claims::new();
    claims.insert(
        "google".to_string(),
        args(json!({"email": "sid@example.com"})),
    );

    let rows = gateway
        .invoke(
            "my-bookings",
            &Map::new(),
            &claims,
            &["google".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(rows, json!([{"name": "Sid"}]));
}

#[tokio::test]
async fn test_invoke_reports_parameter_errors() {
    let gateway = gateway().await;

    let err = gateway
        .invoke("search-hotels", &args(json!({"id": 1, "name": "Sid"})), &Claims::new(), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, InvokeError::Parameters(_)));
    assert!(err.to_string().starts_with("provided parameters were invalid"));
}

#[tokio::test]
async fn test_invoke_reports_backend_errors() {
    let gateway = gateway().await;

    let err = gateway
        .invoke(
            "setup-hotels",
            &args(json!({"sql": "SELECT * FROM rooms"})),
            &Claims::new(),
            &[],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InvokeError::Tool(_)));
}
