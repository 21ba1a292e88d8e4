use super::*;
use pretty_assertions::assert_eq;

fn record_path(name: &str) -> String {
    format!("auth/kubernetes/role/{name}")
}

fn policies(params: &Parameters) -> &Value {
    &params["policies"]
}

fn seed_role(test: &TestConfig) {
    test.store()
        .insert(mk_role("ns-0", "role-0", Some(vault_rule(&["secret/*"], &["read"]))));
}

#[tokio::test]
async fn binding_writes_auth_role() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    let mut ann = bind();
    ann.insert(annotations::TOKEN_TTL.to_string(), "1h".to_string());
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", ann, &["sa-0", "sa-1"]));

    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::Synced);

    let expected = btreemap! {
        "bound_service_account_names".to_string() => json!(["sa-0", "sa-1"]),
        "bound_service_account_namespaces".to_string() => json!(["ns-0"]),
        "policies".to_string() => json!(["ns-0-role-0"]),
        "token_ttl".to_string() => json!("1h"),
    };
    assert_eq!(
        test.authority.calls(),
        vec![Call::Write(record_path("ns-0-rb-0"), expected)]
    );
    assert!(has_finalizer::<RoleBinding>(test.store(), "ns-0", "rb-0"));
}

#[tokio::test]
async fn binding_without_opt_in_is_ignored() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", Default::default(), &["sa-0"]));

    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::Ignored);
    assert!(test.authority.calls().is_empty());
    assert_eq!(test.events.reasons("rb-0"), vec![Reason::Ignored]);
}

#[tokio::test]
async fn binding_to_cluster_role_is_ignored() {
    let test = TestConfig::with_finalizers();
    let mut rb = mk_binding("ns-0", "rb-0", "admin", bind(), &["sa-0"]);
    rb.role_ref.kind = "ClusterRole".to_string();
    test.store().insert(rb);

    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::Ignored);
    assert!(test.authority.calls().is_empty());
}

#[tokio::test]
async fn missing_role_is_an_error() {
    let test = TestConfig::with_finalizers();
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", bind(), &["sa-0"]));

    let error = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect_err("role does not exist");
    assert!(error.is_configuration_missing());
    assert!(test.authority.calls().is_empty());
    assert_eq!(test.events.reasons("rb-0"), vec![Reason::Error]);
}

#[tokio::test]
async fn missing_role_config_map_is_an_error() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    let mut ann = bind();
    ann.insert(annotations::ROLE_CONFIG_MAP.to_string(), "params".to_string());
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", ann, &["sa-0"]));

    let error = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect_err("configmap does not exist");
    assert!(matches!(error, Error::ConfigMapNotFound(_)));
    assert!(test.authority.calls().is_empty());

    test.store().insert(mk_config_map(
        "ns-0",
        "params",
        btreemap! { "token-period".to_string() => "24h".to_string() },
    ));
    test.reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    let records = test.authority.records();
    assert_eq!(records[&record_path("ns-0-rb-0")]["token_period"], json!("24h"));
}

#[tokio::test]
async fn sibling_bindings_bind_each_policy_once() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", bind(), &["sa-0"]));
    let mut ignored = bind();
    ignored.insert(annotations::IGNORE.to_string(), "true".to_string());
    test.store()
        .insert(mk_binding("ns-0", "rb-1", "role-0", ignored, &["sa-1"]));
    test.store()
        .insert(mk_binding("ns-0", "rb-2", "role-0", bind(), &["sa-2"]));

    test.reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    let records = test.authority.records();
    assert_eq!(
        policies(&records[&record_path("ns-0-rb-0")]),
        &json!(["ns-0-role-0"])
    );
}

fn shared(role_name: &str) -> BTreeMap<String, String> {
    let mut ann = bind();
    ann.insert(annotations::ROLE_NAME.to_string(), role_name.to_string());
    ann
}

async fn sync_all(test: &TestConfig, names: &[&str]) {
    for name in names {
        test.reconcile(Kind::RoleBinding, "ns-0", name)
            .await
            .expect("must reconcile");
    }
}

#[tokio::test]
async fn deleted_binding_with_own_record_removes_it() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-x", "role-0", bind(), &["sa-x"]));
    test.store()
        .insert(mk_binding("ns-0", "rb-y", "role-0", bind(), &["sa-y"]));
    sync_all(&test, &["rb-x", "rb-y"]).await;
    test.authority.clear_calls();

    test.store().delete::<RoleBinding>("ns-0", "rb-x");
    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-x")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::CleanedUp);
    assert_eq!(
        test.authority.calls(),
        vec![Call::Delete(record_path("ns-0-rb-x"))]
    );

    let records = test.authority.records();
    assert!(!records.contains_key(&record_path("ns-0-rb-x")));
    assert_eq!(
        records[&record_path("ns-0-rb-y")]["bound_service_account_names"],
        json!(["sa-y"])
    );
    assert!(test.store().fetch::<RoleBinding>("ns-0", "rb-x").is_none());
}

#[tokio::test]
async fn bindings_sharing_a_record_bind_all_subjects() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-x", "role-0", shared("app"), &["sa-x"]));
    test.store()
        .insert(mk_binding("ns-0", "rb-y", "role-0", shared("app"), &["sa-y"]));
    sync_all(&test, &["rb-x", "rb-y"]).await;

    let records = test.authority.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[&record_path("app")]["bound_service_account_names"],
        json!(["sa-x", "sa-y"])
    );
}

#[tokio::test]
async fn deleted_binding_sharing_a_record_is_rewritten() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-x", "role-0", shared("app"), &["sa-x"]));
    test.store()
        .insert(mk_binding("ns-0", "rb-y", "role-0", shared("app"), &["sa-y"]));
    sync_all(&test, &["rb-x", "rb-y"]).await;
    test.authority.clear_calls();

    test.store().delete::<RoleBinding>("ns-0", "rb-x");
    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-x")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::CleanedUp);

    let calls = test.authority.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Call::Write(path, params) => {
            assert_eq!(path, &record_path("app"));
            assert_eq!(params["bound_service_account_names"], json!(["sa-y"]));
            assert_eq!(policies(params), &json!(["ns-0-role-0"]));
        }
        call => panic!("unexpected call: {call:?}"),
    }
    assert!(test.store().fetch::<RoleBinding>("ns-0", "rb-x").is_none());
}

#[tokio::test]
async fn deleted_config_map_does_not_block_shared_record_cleanup() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store().insert(mk_config_map(
        "ns-0",
        "params",
        btreemap! { "token-period".to_string() => "24h".to_string() },
    ));
    let mut ann = shared("app");
    ann.insert(annotations::ROLE_CONFIG_MAP.to_string(), "params".to_string());
    test.store()
        .insert(mk_binding("ns-0", "rb-x", "role-0", ann.clone(), &["sa-x"]));
    test.store()
        .insert(mk_binding("ns-0", "rb-y", "role-0", ann, &["sa-y"]));
    sync_all(&test, &["rb-x", "rb-y"]).await;
    assert_eq!(
        test.authority.records()[&record_path("app")]["token_period"],
        json!("24h")
    );

    test.store().delete::<ConfigMap>("ns-0", "params");
    test.store().delete::<RoleBinding>("ns-0", "rb-x");
    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-x")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::CleanedUp);
    assert!(test.store().fetch::<RoleBinding>("ns-0", "rb-x").is_none());

    let record = &test.authority.records()[&record_path("app")];
    assert_eq!(record["bound_service_account_names"], json!(["sa-y"]));
    assert!(!record.contains_key("token_period"));
}

#[tokio::test]
async fn unreadable_config_map_blocks_shared_record_cleanup() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store().insert(mk_config_map("ns-0", "params", btreemap! {}));
    let mut ann = shared("app");
    ann.insert(annotations::ROLE_CONFIG_MAP.to_string(), "params".to_string());
    test.store()
        .insert(mk_binding("ns-0", "rb-x", "role-0", ann.clone(), &["sa-x"]));
    test.store()
        .insert(mk_binding("ns-0", "rb-y", "role-0", ann, &["sa-y"]));
    sync_all(&test, &["rb-x", "rb-y"]).await;
    test.authority.clear_calls();

    test.store().fail_reads::<ConfigMap>();
    test.store().delete::<RoleBinding>("ns-0", "rb-x");
    let error = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-x")
        .await
        .expect_err("configmap read must fail");
    assert!(matches!(error, Error::Store(_)));
    assert!(test.authority.calls().is_empty());
    assert!(has_finalizer::<RoleBinding>(test.store(), "ns-0", "rb-x"));
}

#[tokio::test]
async fn deleted_last_binding_removes_auth_role() {
    let test = TestConfig::with_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", bind(), &["sa-0"]));
    test.reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    test.authority.clear_calls();

    test.store().delete::<RoleBinding>("ns-0", "rb-0");
    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::CleanedUp);
    assert_eq!(
        test.authority.calls(),
        vec![Call::Delete(record_path("ns-0-rb-0"))]
    );
    assert!(test.authority.records().is_empty());
}

#[tokio::test]
async fn untracked_binding_deletion_is_a_noop() {
    let test = TestConfig::without_finalizers();
    seed_role(&test);
    test.store()
        .insert(mk_binding("ns-0", "rb-0", "role-0", bind(), &["sa-0"]));
    test.reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    test.authority.clear_calls();

    test.store().delete::<RoleBinding>("ns-0", "rb-0");
    let outcome = test
        .reconcile(Kind::RoleBinding, "ns-0", "rb-0")
        .await
        .expect("must reconcile");
    assert_eq!(outcome, Outcome::Gone);
    assert!(test.authority.calls().is_empty());
}
