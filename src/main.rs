use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use proxy_acl::config::Config;
use proxy_acl::init::{inbox_acl, init_store, init_tail, setup_logging};
use proxy_acl::policy::{Acl, AclId, Group, PolicyStore, Rule, SourceId};

const USAGE: &str = "usage: proxy-acl [config.toml] <tail | acls | groups | allow <type> <value> <action>>";

#[derive(Serialize)]
struct AclView {
    #[serde(flatten)]
    acl: Acl,
    rules: Vec<Rule>,
}

#[derive(Serialize)]
struct GroupView {
    #[serde(flatten)]
    group: Group,
    acls: Vec<(AclId, String)>,
    sources: Vec<(SourceId, String)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.first() {
        Some(first) if first.ends_with(".toml") => args.remove(0),
        _ => "config.toml".to_string(),
    };
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    if !std::path::Path::new(&config_path).exists() {
        info!("Config file not found, using defaults.");
    }

    // 3. Dispatch
    let command = args.first().map(String::as_str).unwrap_or("tail");
    match command {
        "tail" => {
            let (tail, _) = init_tail(&config);
            print_json(&tail.recent().await?)
        }
        "acls" => {
            let store = init_store(&config)?;
            print_json(&acl_views(&store)?)
        }
        "groups" => {
            let store = init_store(&config)?;
            print_json(&group_views(&store)?)
        }
        "allow" => {
            let [_, rule_type, value, action] = args.as_slice() else {
                bail!(USAGE);
            };
            let Some(inbox) = inbox_acl(&config)? else {
                bail!("policy.inbox_acl is not configured");
            };
            let store = init_store(&config)?;
            let id = store
                .create_inbox_rule(&inbox, rule_type, value, action)
                .context("Failed to add rule")?;
            info!("Added rule {} to inbox ACL {}", id, inbox);
            print_json(&id)
        }
        _ => bail!(USAGE),
    }
}

fn acl_views(store: &PolicyStore) -> Result<Vec<AclView>> {
    let mut views = Vec::new();
    for acl in store.list_acls()? {
        let rules = store.acl_rules(&acl.acl_id)?;
        views.push(AclView { acl, rules });
    }
    Ok(views)
}

fn group_views(store: &PolicyStore) -> Result<Vec<GroupView>> {
    let mut views = Vec::new();
    for group in store.list_groups()? {
        let mut acls: Vec<_> = store.group_acls(&group.group_id)?.into_iter().collect();
        acls.sort();
        let mut sources: Vec<_> = store.group_sources(&group.group_id)?.into_iter().collect();
        sources.sort();
        views.push(GroupView {
            group,
            acls,
            sources,
        });
    }
    Ok(views)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
