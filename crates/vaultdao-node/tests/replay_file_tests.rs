use serde_json::json;
use std::fs;
use tempfile::TempDir;
use vaultdao_node::config::{GenesisConfig, NodeConfig};
use vaultdao_node::replay::{load_log, load_state, replay, save_state};
use vaultdao_types::Address;

fn write_log(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("calls.json");
    let log = json!([
        {"caller": "admin", "input": {"function": "transfer", "target": "user", "qty": 1000}},
        {"caller": "admin", "input": {"function": "lock", "qty": 5000, "lockLength": 100}},
        {"height": 1, "caller": "admin", "input": {
            "function": "propose", "type": "mint", "recipient": "user", "qty": 250, "note": "grant"
        }},
        {"height": 2, "caller": "admin", "input": {"function": "vote", "id": 0, "cast": "yay"}},
        {"caller": "user", "input": {"function": "vote", "id": 0, "cast": "yay"}},
        {"height": 2001, "caller": "user", "input": {"function": "finalize", "id": 0}},
        {"caller": "user", "input": {"function": "balance"}}
    ]);
    fs::write(&path, serde_json::to_string_pretty(&log).unwrap()).unwrap();
    path
}

#[test]
fn test_replay_from_files() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    save_state(&state_path, &GenesisConfig::default().build_state().unwrap()).unwrap();

    let records = load_log(&write_log(&dir)).unwrap();
    let (state, summary) = replay(load_state(&state_path).unwrap(), records, 0, false).unwrap();

    // user has no vault, so their vote is the only rejection
    assert_eq!(summary.applied, 6);
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.rejected[0].index, 4);
    assert_eq!(summary.final_height, 2001);
    assert_eq!(state.balances.balance_of(&Address::new("user")).units(), 1250);

    let out = dir.path().join("final.json");
    save_state(&out, &state).unwrap();
    assert_eq!(load_state(&out).unwrap().digest().unwrap(), state.digest().unwrap());
}

#[test]
fn test_replay_twice_gives_same_digest() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir);
    let genesis = GenesisConfig::default().build_state().unwrap();

    let (first, _) = replay(genesis.clone(), load_log(&log).unwrap(), 0, false).unwrap();
    let (second, _) = replay(genesis, load_log(&log).unwrap(), 0, false).unwrap();

    assert_eq!(first.digest_hex().unwrap(), second.digest_hex().unwrap());
}

#[test]
fn test_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vaultdao.toml");

    let mut config = NodeConfig::default();
    config.genesis.name = "Guild".to_string();
    config.genesis.settings.quorum = 0.3;
    config.genesis.allocations.insert("alice".to_string(), 42);
    config.replay.stop_on_error = true;
    config.save_to_file(&path).unwrap();

    let loaded = NodeConfig::from_file(&path).unwrap();
    assert_eq!(loaded.genesis.name, "Guild");
    assert_eq!(loaded.genesis.settings, config.genesis.settings);
    assert_eq!(loaded.genesis.allocations, config.genesis.allocations);
    assert!(loaded.replay.stop_on_error);

    let state = loaded.genesis.build_state().unwrap();
    assert_eq!(state.total_supply().unwrap().units(), 10_000_042);
}

#[test]
fn test_missing_state_file_has_context() {
    let dir = TempDir::new().unwrap();
    let err = load_state(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read state"));
}
