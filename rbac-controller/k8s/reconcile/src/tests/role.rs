use super::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn role_policy_is_written_idempotently() {
    let test = TestConfig::with_finalizers();
    test.store().insert(mk_role(
        "ns-0",
        "role-0",
        [
            vault_rule(&["secret/data/app/*"], &["read", "list"]),
            vault_rule(&["auth/token/lookup-self"], &["read"]),
        ],
    ));

    for _ in 0..2 {
        let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
        assert_eq!(outcome, Outcome::Synced);
    }

    let expected = r#"{
  "path": {
    "auth/token/lookup-self": {
      "capabilities": [
        "read"
      ]
    },
    "secret/data/app/*": {
      "capabilities": [
        "read",
        "list"
      ]
    }
  }
}"#;
    let put = Call::PutPolicy("ns-0-role-0".to_string(), expected.to_string());
    assert_eq!(test.authority.calls(), vec![put.clone(), put]);
    assert!(has_finalizer::<Role>(test.store(), "ns-0", "role-0"));
    assert_eq!(
        test.events.reasons("role-0"),
        vec![Reason::Synced, Reason::Synced]
    );
}

#[tokio::test]
async fn policy_name_annotation_overrides_default() {
    let test = TestConfig::without_finalizers();
    let mut role = mk_role("ns-0", "role-0", Some(vault_rule(&["secret/*"], &["read"])));
    role.annotations_mut()
        .insert(annotations::POLICY_NAME.to_string(), "team-a".to_string());
    test.store().insert(role);

    test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(
        test.authority.policies().keys().collect::<Vec<_>>(),
        vec!["team-a"]
    );
    assert!(!has_finalizer::<Role>(test.store(), "ns-0", "role-0"));
}

#[tokio::test]
async fn role_without_vault_rules_is_ignored() {
    let test = TestConfig::with_finalizers();
    test.store().insert(mk_role(
        "ns-0",
        "role-0",
        Some(PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["pods".to_string()]),
            verbs: vec!["get".to_string()],
            ..Default::default()
        }),
    ));

    let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(outcome, Outcome::Ignored);
    assert!(test.authority.calls().is_empty());
    assert!(!has_finalizer::<Role>(test.store(), "ns-0", "role-0"));
    assert_eq!(test.events.reasons("role-0"), vec![Reason::Ignored]);
}

#[tokio::test]
async fn role_with_ignore_marker_is_ignored() {
    let test = TestConfig::with_finalizers();
    let mut role = mk_role("ns-0", "role-0", Some(vault_rule(&["secret/*"], &["read"])));
    role.annotations_mut()
        .insert(annotations::IGNORE.to_string(), "true".to_string());
    test.store().insert(role);

    let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(outcome, Outcome::Ignored);
    assert!(test.authority.calls().is_empty());
}

#[tokio::test]
async fn tracked_role_is_cleaned_up_on_deletion() {
    let test = TestConfig::with_finalizers();
    test.store()
        .insert(mk_role("ns-0", "role-0", Some(vault_rule(&["secret/*"], &["read"]))));
    test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    test.authority.clear_calls();

    test.store().delete::<Role>("ns-0", "role-0");
    let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(outcome, Outcome::CleanedUp);
    assert_eq!(
        test.authority.calls(),
        vec![Call::DeletePolicy("ns-0-role-0".to_string())]
    );
    assert!(test.authority.policies().is_empty());
    assert!(test.store().fetch::<Role>("ns-0", "role-0").is_none());

    // A trigger for the removed object finds nothing.
    let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(outcome, Outcome::Gone);
}

#[tokio::test]
async fn ignored_role_with_finalizer_is_still_cleaned_up() {
    let test = TestConfig::with_finalizers();
    test.store()
        .insert(mk_role("ns-0", "role-0", Some(vault_rule(&["secret/*"], &["read"]))));
    test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");

    let mut role = test.store().fetch::<Role>("ns-0", "role-0").expect("role must exist");
    role.annotations_mut()
        .insert(annotations::IGNORE.to_string(), "true".to_string());
    test.store().insert(role);
    test.store().delete::<Role>("ns-0", "role-0");
    test.authority.clear_calls();

    let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(outcome, Outcome::CleanedUp);
    assert_eq!(
        test.authority.calls(),
        vec![Call::DeletePolicy("ns-0-role-0".to_string())]
    );
}

#[tokio::test]
async fn deletion_without_finalizer_does_not_touch_vault() {
    let test = TestConfig::with_finalizers();
    let mut role = mk_role("ns-0", "role-0", Some(vault_rule(&["secret/*"], &["read"])));
    role.finalizers_mut().push("example.com/other".to_string());
    test.store().insert(role);
    test.store().delete::<Role>("ns-0", "role-0");

    let outcome = test.reconcile(Kind::Role, "ns-0", "role-0").await.expect("must reconcile");
    assert_eq!(outcome, Outcome::Gone);
    assert!(test.authority.calls().is_empty());
    assert!(test.events.last().is_none());
}
