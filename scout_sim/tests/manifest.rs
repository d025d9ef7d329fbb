// scout_sim/tests/manifest.rs

use toml::Value;

#[test]
fn termination_signals_reach_the_shutdown_handler() {
    let manifest: Value = toml::from_str(include_str!("../Cargo.toml")).unwrap();
    let features = manifest
        .get("dependencies")
        .and_then(|deps| deps.get("ctrlc"))
        .and_then(|ctrlc| ctrlc.get("features"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    // Without it the handler only sees SIGINT and SIGTERM skips the stop guard.
    assert!(
        features.iter().any(|f| f.as_str() == Some("termination")),
        "ctrlc features: {features:?}"
    );
}
