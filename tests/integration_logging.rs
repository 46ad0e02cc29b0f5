use proxy_acl::config::{Config, LoggingConfig};
use proxy_acl::init::{inbox_acl, init_tail};
use proxy_acl::logger::{FaultLogger, ParseFault, ParseFaultSink};

#[test]
fn test_logging_config_instantiation() {
    let config = LoggingConfig {
        level: "info".to_string(),
        format: "json".to_string(),
        fault_sinks: vec!["console".to_string(), "memory".to_string()],
        memory_capacity: 5,
    };

    let (logger, memory) = FaultLogger::new(&config);
    logger.report(&ParseFault {
        observed_at: chrono::Utc::now(),
        line: "junk".to_string(),
        reason: "bad log line: \"junk\"".to_string(),
    });

    let memory = memory.expect("memory sink configured");
    assert_eq!(memory.get_recent().len(), 1);
}

#[tokio::test]
async fn test_default_tail_reports_missing_log() {
    let mut config = Config::default();
    config.tail.squid_log = "/definitely/not/here.log".to_string();
    config.logging.fault_sinks = vec!["memory".to_string()];

    let (tail, memory) = init_tail(&config);
    assert!(memory.is_some());
    let err = tail.recent().await.unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.log"));
}

#[test]
fn test_inbox_acl_must_be_a_valid_id() {
    let mut config = Config::default();
    assert!(inbox_acl(&config).unwrap().is_none());

    config.policy.inbox_acl = Some("88bf513a-802f-450d-9fc4-b49eeabf1b8f".to_string());
    assert!(inbox_acl(&config).unwrap().is_some());

    config.policy.inbox_acl = Some("new".to_string());
    assert!(inbox_acl(&config).is_err());
}
