//! Configuration tests

use clap::Parser;
use deepseek_bedrock::cli::Cli;
use deepseek_bedrock::config::{Config, DEFAULT_MODEL_ID};
use deepseek_bedrock::session::ChatSettings;
use deepseek_bedrock::AppError;
use std::collections::HashMap;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

const CREDENTIALS: [(&str, &str); 3] = [
    ("AWS_REGION_NAME", "us-west-2"),
    ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
    ("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI"),
];

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.service_name, "bedrock-runtime");
    assert_eq!(config.model_id, DEFAULT_MODEL_ID);
    let params = config.params();
    assert_eq!(params.max_tokens, 8192);
    assert!((params.temperature - 0.5).abs() < f32::EPSILON);
    assert!((params.top_p - 0.9).abs() < f32::EPSILON);
}

#[test]
fn test_config_env_override() {
    let mut vars = CREDENTIALS.to_vec();
    vars.extend([
        ("AWS_SERVICE_NAME", "bedrock-runtime"),
        ("BEDROCK_MODEL_ID", "deepseek.r1-v1:0"),
        ("BEDROCK_MAX_TOKENS", "2048"),
        ("BEDROCK_TOP_P", "0.5"),
    ]);

    let config = Config::default().with_overrides(env(&vars)).unwrap();

    assert_eq!(config.region, "us-west-2");
    assert_eq!(config.access_key_id, "AKIAEXAMPLE");
    assert_eq!(config.secret_access_key, "wJalrXUtnFEMI");
    assert_eq!(config.model_id, "deepseek.r1-v1:0");
    assert_eq!(config.max_tokens, Some(2048));
    assert_eq!(config.top_p, Some(0.5));
    assert_eq!(config.temperature, None);
    config.require_credentials().unwrap();
}

#[test]
fn test_config_missing_credentials() {
    let config = Config::default()
        .with_overrides(env(&[("AWS_REGION_NAME", "us-east-1")]))
        .unwrap();

    match config.require_credentials() {
        Err(AppError::ConfigurationMissing(names)) => {
            assert!(names.contains("AWS_ACCESS_KEY_ID"));
            assert!(names.contains("AWS_SECRET_ACCESS_KEY"));
            assert!(!names.contains("AWS_REGION_NAME"));
        }
        other => panic!("Expected ConfigurationMissing, got {other:?}"),
    }
}

#[test]
fn test_config_without_credentials_can_still_be_shown() {
    let config = Config::default()
        .with_overrides(env(&[("BEDROCK_TEMPERATURE", "0.3")]))
        .unwrap();

    let shown = config.redacted();
    assert!(shown.contains("temperature       = 0.3"));
    assert!(config.require_credentials().is_err());
}

#[test]
fn test_chat_settings_follow_cli_flags() {
    let cli = Cli::try_parse_from([
        "deepseek-bedrock",
        "--temperature",
        "0.2",
        "--max-tokens",
        "1024",
        "chat",
    ])
    .unwrap();
    let mut config = Config::default()
        .with_overrides(env(&[("BEDROCK_TOP_P", "0.8")]))
        .unwrap();

    cli.apply_overrides(&mut config);
    let settings = ChatSettings::from_config(&config);

    assert_eq!(settings.params(), config.params());
    assert_eq!(settings.max_tokens, 1024);
    assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
    assert!((settings.top_p - 0.8).abs() < f32::EPSILON);
}

#[test]
fn test_redacted_hides_secret() {
    let config = Config::default().with_overrides(env(&CREDENTIALS)).unwrap();
    let shown = config.redacted();

    assert!(shown.contains("us-west-2"));
    assert!(!shown.contains("wJalrXUtnFEMI"));
    assert!(shown.contains("wJal****"));
}

#[tokio::test]
async fn test_config_file_round_trip_omits_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default().with_overrides(env(&CREDENTIALS)).unwrap();
    config.max_tokens = Some(1024);
    config.save_to(&path).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(!written.contains("AKIAEXAMPLE"));
    assert!(!written.contains("wJalrXUtnFEMI"));

    let loaded = Config::load_from_path(&path).await.unwrap();
    assert_eq!(loaded.max_tokens, Some(1024));
    assert_eq!(loaded.top_p, None);
    assert_eq!(loaded.region, "us-west-2");
    assert!(loaded.access_key_id.is_empty());
}

#[tokio::test]
async fn test_missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = Config::load_from_path(&dir.path().join("absent.toml"))
        .await
        .unwrap();
    assert_eq!(loaded.model_id, DEFAULT_MODEL_ID);
}
