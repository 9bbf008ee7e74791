use cascade_cli::{run, FleetConfig, SimulateOptions};
use cascade_feature::RepoRef;
use pretty_assertions::assert_eq;
use std::io::Write;

const FLEET: &str = r#"
feature = "runtime"
ideal = "1.0"
push = "acme/api"

[rollout]
max_concurrent_loads = 2

[[repos]]
owner = "acme"
name = "api"
version = "2.0"

[[repos]]
owner = "acme"
name = "billing"
version = "1.0"

[[repos]]
owner = "acme"
name = "search"
version = "3.1"

[[repos]]
owner = "acme"
name = "docs"

[[repos]]
owner = "acme"
name = "legacy"
version = "0.9"
unreachable = true
"#;

fn fleet_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FLEET.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn push_without_approval_only_proposes() {
    let file = fleet_file();
    let config = FleetConfig::from_file(file.path()).unwrap();

    let report = run(&config, SimulateOptions::default()).await.unwrap();

    assert_eq!(report.outcome, "proposed");
    assert_eq!(report.storage_key.as_deref(), Some("0_key"));
    assert!(report.rollout.is_none());
    assert_eq!(report.final_ideal.as_deref(), Some("1.0"));
    assert_eq!(report.invitations.len(), 1);
    assert_eq!(report.invitations[0].action_id, "rollout-runtime");
}

#[tokio::test]
async fn approve_and_converge_whole_fleet() {
    let file = fleet_file();
    let config = FleetConfig::from_file(file.path()).unwrap();
    let options = SimulateOptions {
        auto_approve: true,
        converge: true,
    };

    let report = run(&config, options).await.unwrap();

    let rollout = report.rollout.as_ref().unwrap();
    assert_eq!(rollout.invited, vec![RepoRef::new("acme", "billing")]);
    assert_eq!(
        rollout.up_to_date,
        vec![RepoRef::new("acme", "api"), RepoRef::new("acme", "search")]
    );
    assert_eq!(rollout.absent, vec![RepoRef::new("acme", "docs")]);
    assert_eq!(rollout.failed.len(), 1);
    assert_eq!(rollout.failed[0].0, RepoRef::new("acme", "legacy"));
    assert_eq!(report.converged, vec![RepoRef::new("acme", "billing")]);
    assert_eq!(report.final_ideal.as_deref(), Some("2.0"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"], "proposed");
}

#[tokio::test]
async fn worse_push_is_unremarkable() {
    let raw = FLEET.replace("push = \"acme/api\"", "push = \"acme/billing\"");
    let config = FleetConfig::from_toml_str(&raw).unwrap();

    let report = run(
        &config,
        SimulateOptions {
            auto_approve: true,
            converge: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, "unremarkable");
    assert!(report.storage_key.is_none());
    assert!(report.invitations.is_empty());
}
