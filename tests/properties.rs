use super::*;

fn spendable_total(wallet: &Wallet) -> Amount {
  wallet
    .transactions()
    .filter(|(_, output)| output.spending_details.is_none())
    .map(|(_, output)| output.amount)
    .sum()
}

#[test]
fn processing_is_idempotent() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let address = harness.receive_address("alice");
  let transaction = payment(&address.script_pubkey, 25_000);

  for _ in 0..3 {
    assert!(
      harness
        .manager
        .process_transaction(&transaction, None, None, false)
        .unwrap()
    );
  }

  let wallet = harness.wallet("alice");
  pretty_assert_eq!(wallet.transactions().count(), 1);

  harness
    .manager
    .process_transaction(&transaction, None, None, false)
    .unwrap();

  pretty_assert_eq!(harness.wallet("alice"), wallet);
}

#[test]
fn propagation_is_never_withdrawn() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let address = harness.receive_address("alice");
  let transaction = payment(&address.script_pubkey, 25_000);
  let outpoint = outpoint(&transaction, 0);

  harness
    .manager
    .process_transaction(&transaction, None, None, true)
    .unwrap();
  harness
    .manager
    .process_transaction(&transaction, None, None, false)
    .unwrap();

  assert!(harness.manager.read().transaction(outpoint).unwrap().is_propagated);
}

#[test]
fn balances_match_the_outputs() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let first = payment(&harness.receive_address("alice").script_pubkey, 40_000);
  harness.mine(vec![first.clone()]);

  let second = payment(&harness.receive_address("alice").script_pubkey, 15_000);
  harness
    .manager
    .process_transaction(&second, None, None, false)
    .unwrap();

  let spend = transaction(
    &[outpoint(&first, 0)],
    vec![
      output(&script(2), 30_000),
      output(&harness.change_address("alice").script_pubkey, 9_000),
    ],
  );
  harness.mine(vec![spend]);

  let balance = harness.manager.balance("alice", None).unwrap();

  pretty_assert_eq!(balance.confirmed, Amount::from_sat(9_000));
  pretty_assert_eq!(balance.unconfirmed, Amount::from_sat(15_000));
  pretty_assert_eq!(balance.total(), spendable_total(&harness.wallet("alice")));
  pretty_assert_eq!(
    harness.manager.read().spendable_amount("alice", false).unwrap(),
    balance.total()
  );
}

#[test]
fn index_tracks_every_change() {
  let harness = Harness::new();
  harness.create_wallet("alice");
  harness.create_wallet("bob");

  let alice = harness.receive_address("alice");
  let bob = harness.receive_address("bob");

  harness.mine(vec![payment(&alice.script_pubkey, 10_000)]);
  harness.assert_index_consistent();

  let unconfirmed = payment(&bob.script_pubkey, 20_000);
  harness
    .manager
    .process_transaction(&unconfirmed, None, None, false)
    .unwrap();
  harness.assert_index_consistent();

  let removed = harness
    .manager
    .lock()
    .remove_unconfirmed_transactions("bob")
    .unwrap();
  pretty_assert_eq!(removed, BTreeSet::from([unconfirmed.compute_txid()]));
  assert!(
    harness
      .manager
      .read()
      .transaction(outpoint(&unconfirmed, 0))
      .is_none()
  );
  harness.assert_index_consistent();

  harness.manager.lock().delete_wallet("alice").unwrap();
  harness.assert_index_consistent();
  assert!(harness.manager.read().script_owner(&alice.script_pubkey).is_none());
}

#[test]
fn first_spender_wins() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let funding = payment(&harness.receive_address("alice").script_pubkey, 50_000);
  harness.mine(vec![funding.clone()]);

  let first = transaction(&[outpoint(&funding, 0)], vec![output(&script(3), 49_000)]);
  let second = transaction(&[outpoint(&funding, 0)], vec![output(&script(4), 48_000)]);

  harness
    .manager
    .process_transaction(&first, None, None, false)
    .unwrap();
  harness
    .manager
    .process_transaction(&second, None, None, false)
    .unwrap();

  pretty_assert_eq!(
    harness
      .manager
      .read()
      .transaction(outpoint(&funding, 0))
      .unwrap()
      .spending_details
      .as_ref()
      .unwrap()
      .txid,
    first.compute_txid()
  );
}

#[test]
fn unknown_wallets_are_reported() {
  let harness = Harness::new();

  assert!(matches!(
    harness.manager.balance("carol", None),
    Err(WalletError::WalletNotFound { .. })
  ));

  harness.create_wallet("alice");

  assert!(matches!(
    harness.manager.balance("alice", Some(7)),
    Err(WalletError::AccountNotFound { account: 7, .. })
  ));

  assert!(matches!(
    harness
      .manager
      .create_wallet("Alice", "password", "", Some(MNEMONIC.parse().unwrap())),
    Err(WalletError::WalletAlreadyExists { .. })
  ));
}
