use std::time::Duration;

use super::{TRADER_YAML, trader};
use crate::{CanonicalManifest, FieldSpec, PodManifest, manifest_hash};

#[test]
fn hash_is_deterministic_and_fixed_width() {
    let first = manifest_hash(&trader()).expect("hash");
    let second = manifest_hash(&trader()).expect("hash");
    assert_eq!(first, second);
    assert_eq!(first.to_hex().len(), 64);
}

#[test]
fn formatting_does_not_change_hash() {
    let reformatted = r#"
# same pod, different layout
name:    trader
actions:
  buy: "local.portfolio.usd_balance -= coinbase.btcusd.price\nlocal.portfolio.btc_balance += 1"
  sell: "local.portfolio.usd_balance += coinbase.btcusd.price\nlocal.portfolio.btc_balance -= 1"
  hold: ""
rewards: {buy: reward = 1, sell: reward = 1, hold: reward = 1}
fields: [{name: portfolio.btc_balance}, {name: portfolio.usd_balance}]
data_sources:
  - {from: coinbase, name: btcusd, fields: [{name: price}]}
training: {granularity: 17s, interval: 17m, period: 17h, epoch: 1605312000}
"#;
    let a = manifest_hash(&PodManifest::from_yaml_str(TRADER_YAML).unwrap()).unwrap();
    let b = manifest_hash(&PodManifest::from_yaml_str(reformatted).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn semantic_changes_change_hash() {
    let base = manifest_hash(&trader()).unwrap();

    let mut renamed_field = trader();
    renamed_field.fields[0] = FieldSpec {
        name: "portfolio.eth_balance".into(),
    };

    let mut reward = trader();
    reward.rewards.insert("buy".into(), "reward = 2".into());

    let mut action = trader();
    action.actions.insert("hold".into(), "noop".into());

    let mut window = trader();
    window.training.as_mut().unwrap().granularity = Some(Duration::from_secs(18));

    let mut no_training = trader();
    no_training.training = None;

    for changed in [renamed_field, reward, action, window, no_training] {
        assert_ne!(manifest_hash(&changed).unwrap(), base);
    }
}

#[test]
fn declaration_order_is_part_of_identity() {
    let mut reordered = trader();
    reordered.rewards.move_index(0, 2);
    assert_ne!(
        manifest_hash(&reordered).unwrap(),
        manifest_hash(&trader()).unwrap()
    );
}

#[test]
fn very_long_durations_still_hash() {
    let manifest = PodManifest::from_yaml_str("name: p\ntraining:\n  period: 600years\n").unwrap();
    let long = manifest_hash(&manifest).expect("600 years hashes");

    let mut longest = manifest.clone();
    longest.training.as_mut().unwrap().period = Some(Duration::MAX);
    assert!(CanonicalManifest::new(&longest).to_cbor().is_ok());
    assert_ne!(manifest_hash(&longest).unwrap(), long);

    let mut sub_second = manifest.clone();
    sub_second.training.as_mut().unwrap().period =
        Some(Duration::from_secs(600 * 31_557_600) + Duration::from_nanos(1));
    assert_ne!(manifest_hash(&sub_second).unwrap(), long);
}

#[test]
fn empty_optional_sections_hash_like_absent_ones() {
    let hash = |yaml: &str| manifest_hash(&PodManifest::from_yaml_str(yaml).unwrap()).unwrap();
    let absent = hash("name: p\n");
    assert_eq!(hash("name: p\ntraining: {}\n"), absent);
    assert_eq!(hash("name: p\nmodels: {}\n"), absent);
    assert_eq!(hash("name: p\ntraining: {}\nmodels: {}\n"), absent);

    assert_ne!(hash("name: p\ntraining:\n  period: 72h\n"), absent);
    assert_ne!(hash("name: p\nmodels:\n  keep: 1\n"), absent);
}
