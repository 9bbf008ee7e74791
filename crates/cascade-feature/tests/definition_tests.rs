use cascade_feature::{
    compare_dotted_versions, ComparisonPolicy, Feature, FeatureDefinition, FeatureError,
    FeatureRegistry, Fingerprint, MemoryProject, Project, ProjectTransform, RatingScale,
    RemoveFile, RepoRef, WriteFile,
};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

fn svc(version: Option<&str>) -> MemoryProject {
    let project = MemoryProject::new(RepoRef::new("acme", "svc"));
    match version {
        Some(v) => project.with_file("VERSION", format!("{v}\n")),
        None => project,
    }
}

fn version_of(fp: &Fingerprint) -> String {
    fp.data().as_str().unwrap_or_default().to_string()
}

fn runtime(v: &str) -> Fingerprint {
    Fingerprint::new("runtime", "rt", "0.1.0", serde_json::Value::String(v.to_string()))
}

fn runtime_feature() -> FeatureDefinition {
    FeatureDefinition::builder("runtime", "0.1.0", |p: &dyn Project| {
        Ok(p.file("VERSION").map(|v| runtime(v.trim())))
    })
    .unwrap()
    .compare_by(ComparisonPolicy::Quality, |a, b| {
        compare_dotted_versions(&version_of(a), &version_of(b))
    })
    .rate_on(RatingScale::traffic_light(), |fp| {
        if version_of(fp).starts_with('1') {
            "red".to_string()
        } else {
            "green".to_string()
        }
    })
    .summarize_with(|fp| format!("v{}", version_of(fp)))
    .converge_with(|target| {
        Arc::new(WriteFile::new("VERSION", format!("{}\n", version_of(target)))) as Arc<dyn ProjectTransform>
    })
    .remove_with(Arc::new(RemoveFile::new("VERSION")))
    .build()
}

#[tokio::test]
async fn fingerprints_present_and_absent() {
    let feature = runtime_feature();
    let present = feature
        .fingerprint(&svc(Some("2.1.0")))
        .await
        .unwrap();
    assert_eq!(present, Some(runtime("2.1.0")));

    let absent = svc(None);
    assert_eq!(feature.fingerprint(&absent).await.unwrap(), None);
    assert!(!feature.is_present(&absent).await.unwrap());
    assert!(feature.is_relevant(&absent).await);
}

#[test]
fn unsupported_policy_fails_fast() {
    let feature = runtime_feature();
    let err = feature
        .compare(&runtime("1.0"), &runtime("2.0"), ComparisonPolicy::Size)
        .unwrap_err();
    assert!(matches!(err, FeatureError::UnsupportedPolicy { policy: ComparisonPolicy::Size, .. }));
    assert!(err.is_programming_error());
}

#[test]
fn foreign_fingerprint_rejected() {
    let feature = runtime_feature();
    let other = Fingerprint::new("boot", "sbv", "0.1.0", serde_json::json!("1.0"));
    assert!(matches!(
        feature.compare(&runtime("1.0"), &other, ComparisonPolicy::Quality),
        Err(FeatureError::ForeignFingerprint { .. })
    ));
}

#[test]
fn summary_and_rating() {
    let feature = runtime_feature();
    assert_eq!(feature.summary(&runtime("2.0")), "v2.0");
    let rating = feature
        .rate(&runtime("1.9"), &RatingScale::traffic_light())
        .unwrap();
    assert_eq!(rating.level, "red");
    assert_eq!(feature.supported_rating_scales().len(), 1);
    assert!(matches!(
        feature.rate(&runtime("1.9"), &RatingScale::new("stars", ["1", "2"])),
        Err(FeatureError::UnsupportedRatingScale { .. })
    ));
}

#[tokio::test]
async fn convergence_is_idempotent() {
    let feature = runtime_feature();
    let target = runtime("3.0.0");
    let transform = feature.convergence_transform(&target).unwrap();
    let mut project = svc(Some("2.0.0"));

    let first = transform.apply(&mut project).await.unwrap();
    assert!(first.edited);
    assert_eq!(feature.fingerprint(&project).await.unwrap(), Some(target));

    let second = transform.apply(&mut project).await.unwrap();
    assert!(!second.edited);
}

#[tokio::test]
async fn removal_makes_feature_absent() {
    let feature = runtime_feature();
    let removal = feature.removal_transform().unwrap();
    let mut project = svc(Some("2.0.0"));
    assert!(feature.is_present(&project).await.unwrap());

    let report = removal.apply(&mut project).await.unwrap();
    assert_eq!(report.files_changed, vec!["VERSION".to_string()]);
    assert!(!feature.is_present(&project).await.unwrap());
    assert_eq!(feature.fingerprint(&project).await.unwrap(), None);

    assert!(!removal.apply(&mut project).await.unwrap().edited);
}

#[tokio::test]
async fn removal_is_optional() {
    let feature = FeatureDefinition::builder("bare", "0.1.0", |_p: &dyn Project| Ok(None))
        .unwrap()
        .build();
    assert!(feature.removal_transform().is_none());
    assert!(!feature.can_converge());
}

#[test]
fn blank_name_rejected() {
    let res = FeatureDefinition::builder("  ", "0.1.0", |_p: &dyn Project| Ok(None));
    assert!(matches!(res, Err(FeatureError::InvalidName(_))));
}

#[test]
fn registry_rejects_duplicates() {
    let mut registry = FeatureRegistry::new();
    registry.register(Arc::new(runtime_feature())).unwrap();
    let err = registry.register(Arc::new(runtime_feature())).unwrap_err();
    assert!(matches!(err, FeatureError::DuplicateFeature(name) if name == "runtime"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.convergent().count(), 1);
    assert!(registry.require("boot").is_err());
}

proptest! {
    #[test]
    fn prop_quality_comparison_antisymmetric(
        a in proptest::collection::vec(0u64..50, 1..4),
        b in proptest::collection::vec(0u64..50, 1..4),
    ) {
        let feature = runtime_feature();
        let join = |v: &[u64]| v.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        let (a, b) = (runtime(&join(&a)), runtime(&join(&b)));
        let ab = feature.compare(&a, &b, ComparisonPolicy::Quality).unwrap();
        let ba = feature.compare(&b, &a, ComparisonPolicy::Quality).unwrap();
        prop_assert_eq!(ab, ba.reverse());
        if a.same_content(&b) {
            prop_assert_eq!(ab, Ordering::Equal);
        }
    }
}
