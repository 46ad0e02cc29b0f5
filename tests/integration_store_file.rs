use proxy_acl::config::StoreConfig;
use proxy_acl::policy::{PolicyStore, RuleAction, RuleFields, RuleType, SourceId};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread;

fn file_config(dir: &tempfile::TempDir) -> StoreConfig {
    StoreConfig {
        path: dir.path().join("policy.db").to_string_lossy().into_owned(),
        ..StoreConfig::default()
    }
}

#[test]
fn test_policy_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);

    let (acl, rule) = {
        let store = PolicyStore::open(&config).unwrap();
        let acl = store.create_acl("persisted").unwrap();
        let rule = store
            .create_rule_in_acl(
                &acl,
                &RuleFields::new(RuleType::Domain, ".example.com", RuleAction::Block),
            )
            .unwrap();
        (acl, rule)
    };

    let store = PolicyStore::open(&config).unwrap();
    let rules = store.acl_rules(&acl).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rule_id, rule);

    // Verify the stored text form directly
    let conn = Connection::open(&config.path).expect("Failed to open test DB");
    let (typ, action): (String, String) = conn
        .query_row(
            "SELECT type, action FROM rules WHERE rule_id = ?1",
            [rule.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(typ, "domain");
    assert_eq!(action, "block");
    let linked: String = conn
        .query_row(
            "SELECT acl_id FROM aclrules WHERE rule_id = ?1",
            [rule.as_str()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(linked, acl.as_str());
}

#[test]
fn test_readers_never_see_partial_member_sets() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(PolicyStore::open(&file_config(&dir)).unwrap());
    let group = store.create_group("office").unwrap();

    let mut ids: Vec<SourceId> = Vec::new();
    for i in 0..4 {
        ids.push(
            store
                .create_source_and_add_to_group(&group, &format!("10.0.0.{i}"), "", "")
                .unwrap(),
        );
    }
    let set_a: Vec<(SourceId, String)> = ids[..2].iter().map(|id| (id.clone(), "a".into())).collect();
    let set_b: Vec<(SourceId, String)> = ids[2..].iter().map(|id| (id.clone(), "b".into())).collect();
    store.replace_group_members(&group, &set_a).unwrap();

    let writer = {
        let store = store.clone();
        let group = group.clone();
        thread::spawn(move || {
            for i in 0..50 {
                let set = if i % 2 == 0 { &set_b } else { &set_a };
                store.replace_group_members(&group, set).unwrap();
            }
        })
    };

    for _ in 0..50 {
        let members = store.group_sources(&group).unwrap();
        assert_eq!(members.len(), 2);
        let comments: Vec<_> = members.values().collect();
        assert_eq!(comments[0], comments[1], "mixed member set: {members:?}");
    }
    writer.join().unwrap();
}
