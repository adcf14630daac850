use super::*;

fn unused_tail(harness: &Harness, keychain: Keychain) -> usize {
  harness.manager.read().accounts("alice").unwrap()[0].unused_tail(keychain)
}

#[test]
fn gap_limit_follows_the_highest_used_address() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let far = harness.manager.read().accounts("alice").unwrap()[0].external[7].clone();
  harness.mine(vec![payment(&far.script_pubkey, 1_000)]);

  let reader = harness.manager.read();
  let account = reader.accounts("alice").unwrap()[0];

  pretty_assert_eq!(account.external.len(), 28);
  pretty_assert_eq!(account.last_used_index(Keychain::External), Some(7));
  pretty_assert_eq!(account.unused_tail(Keychain::External), 20);
  pretty_assert_eq!(account.internal.len(), 20);
}

#[test]
fn lookahead_is_configurable() {
  let harness = Harness::with_config(ManagerConfig {
    lookahead: 3,
    ..ManagerConfig::new(CHAIN)
  });
  harness.create_wallet("alice");

  pretty_assert_eq!(unused_tail(&harness, Keychain::External), 3);
  pretty_assert_eq!(unused_tail(&harness, Keychain::Internal), 3);

  let address = harness.receive_address("alice");
  harness.mine(vec![payment(&address.script_pubkey, 1_000)]);

  pretty_assert_eq!(unused_tail(&harness, Keychain::External), 3);
  pretty_assert_eq!(
    harness.manager.read().accounts("alice").unwrap()[0].external.len(),
    4
  );
}

#[test]
fn handing_out_addresses_keeps_the_tail() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let addresses = harness
    .manager
    .unused_addresses("alice", 0, Keychain::External, 25)
    .unwrap();

  pretty_assert_eq!(addresses.len(), 25);
  pretty_assert_eq!(
    addresses.iter().map(|address| address.index).collect::<Vec<u32>>(),
    (0..25).collect::<Vec<u32>>()
  );
  assert!(unused_tail(&harness, Keychain::External) >= 20);
  harness.assert_index_consistent();
}
