use std::collections::HashMap;
use std::path::PathBuf;

use liso::config::Config;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let cfg = Config::load_with(env(&[])).unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:9999");
    assert_eq!(cfg.server.max_connections, 1024);
    assert_eq!(cfg.server.buffer_size, 4096);
    assert_eq!(cfg.server.max_pipeline, 10);
    assert!(cfg.static_files.root.ends_with("static_site"));
}

#[test]
fn test_config_listen_from_env() {
    let cfg = Config::load_with(env(&[("LISTEN", "127.0.0.1:8000")])).unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8000");
}

#[test]
fn test_config_root_from_env() {
    let cfg = Config::load_with(env(&[("LISO_ROOT", "/srv/www")])).unwrap();
    assert_eq!(cfg.static_files.root, PathBuf::from("/srv/www"));
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml("server:\n  buffer_size: 8192\n").unwrap();
    assert_eq!(cfg.server.buffer_size, 8192);
    assert_eq!(cfg.server.max_pipeline, 10);
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:9999");
}

#[test]
fn test_config_full_yaml() {
    let yaml = r#"
server:
  listen_addr: "127.0.0.1:7000"
  max_connections: 16
  buffer_size: 1024
  max_pipeline: 4
static_files:
  root: "/var/www"
"#;
    let cfg = Config::from_yaml(yaml).unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:7000");
    assert_eq!(cfg.server.max_connections, 16);
    assert_eq!(cfg.server.buffer_size, 1024);
    assert_eq!(cfg.server.max_pipeline, 4);
    assert_eq!(cfg.static_files.root, PathBuf::from("/var/www"));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_file_then_env_override() {
    let path = std::env::temp_dir().join(format!("liso-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "server:\n  listen_addr: \"127.0.0.1:7001\"\n  max_pipeline: 2\n").unwrap();

    let path_str = path.to_string_lossy().to_string();
    let cfg = Config::load_with(env(&[
        ("LISO_CONFIG", path_str.as_str()),
        ("LISTEN", "127.0.0.1:7002"),
    ]))
    .unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:7002");
    assert_eq!(cfg.server.max_pipeline, 2);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_config_missing_file_is_error() {
    let result = Config::load_with(env(&[("LISO_CONFIG", "/nonexistent/liso.yaml")]));
    assert!(result.is_err());
}

#[test]
fn test_config_rejects_tiny_buffer() {
    let cfg = Config::from_yaml("server:\n  buffer_size: 16\n").unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_rejects_zero_pipeline() {
    let cfg = Config::from_yaml("server:\n  max_pipeline: 0\n").unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
    assert_eq!(cfg1.static_files.root, cfg2.static_files.root);
}
