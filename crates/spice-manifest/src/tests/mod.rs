pub mod canonical;

pub(crate) const TRADER_YAML: &str = r#"
name: trader
training:
  epoch: 2020-11-14T00:00:00Z
  period: 17h
  interval: 17m
  granularity: 17s
data_sources:
  - from: coinbase
    name: btcusd
    fields:
      - name: price
fields:
  - name: portfolio.btc_balance
  - name: portfolio.usd_balance
rewards:
  buy: reward = 1
  sell: reward = 1
  hold: reward = 1
actions:
  buy: |-
    local.portfolio.usd_balance -= coinbase.btcusd.price
    local.portfolio.btc_balance += 1
  sell: |-
    local.portfolio.usd_balance += coinbase.btcusd.price
    local.portfolio.btc_balance -= 1
  hold:
"#;

pub(crate) fn trader() -> crate::PodManifest {
    crate::PodManifest::from_yaml_str(TRADER_YAML).expect("trader manifest")
}
