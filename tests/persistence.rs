use super::*;

#[test]
fn failed_commits_leave_memory_untouched() {
  let harness = Harness::new();
  harness.create_wallet("alice");
  harness.mine_empty(2);

  let address = harness.receive_address("alice");
  let funding = payment(&address.script_pubkey, 60_000);
  let (block, height) = harness.block(vec![funding.clone()]);

  let before = harness.wallet("alice");
  let tip = harness.manager.read().tip();

  harness.fail_commits(true);

  assert!(matches!(
    harness.manager.process_block(&block, height),
    Err(WalletError::Store { .. })
  ));

  pretty_assert_eq!(harness.wallet("alice"), before);
  pretty_assert_eq!(harness.manager.read().tip(), tip);
  assert!(harness.manager.read().transaction(outpoint(&funding, 0)).is_none());
  harness.assert_index_consistent();

  harness.fail_commits(false);
  harness.manager.process_block(&block, height).unwrap();

  pretty_assert_eq!(
    harness.manager.balance("alice", None).unwrap().confirmed,
    Amount::from_sat(60_000)
  );
  harness.assert_index_consistent();
}

#[test]
fn wallets_survive_a_restart() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let address = harness.receive_address("alice");
  let funding = payment(&address.script_pubkey, 60_000);
  harness.mine(vec![funding.clone()]);

  let spend = transaction(
    &[outpoint(&funding, 0)],
    vec![
      output(&script(6), 20_000),
      output(&harness.change_address("alice").script_pubkey, 39_000),
    ],
  );
  harness
    .manager
    .process_transaction(&spend, None, None, false)
    .unwrap();

  let reopened = harness.reopen();
  reopened.load().unwrap();

  pretty_assert_eq!(
    reopened.balance("alice", None).unwrap(),
    harness.manager.balance("alice", None).unwrap()
  );
  pretty_assert_eq!(
    reopened.history("alice", None).unwrap(),
    harness.manager.history("alice", None).unwrap()
  );

  let expected = harness.wallet("alice");
  let reader = reopened.read();
  let loaded = reader.wallet("alice").unwrap();

  pretty_assert_eq!(loaded.id, expected.id);
  pretty_assert_eq!(loaded.account_roots.len(), expected.account_roots.len());
  pretty_assert_eq!(loaded.addresses().count(), expected.addresses().count());
  pretty_assert_eq!(reader.tip().unwrap().height, 0);
  pretty_assert_eq!(*reader.index(), *harness.manager.read().index());
}

#[test]
fn untouched_blocks_are_flushed_later() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let address = harness.receive_address("alice");
  harness.mine(vec![payment(&address.script_pubkey, 10_000)]);
  harness.mine_empty(3);

  assert!(harness.manager.read().is_dirty("alice"));

  {
    let reopened = harness.reopen();
    reopened.load().unwrap();
    pretty_assert_eq!(reopened.read().tip().unwrap().height, 0);
  }

  harness.manager.flush().unwrap();
  assert!(!harness.manager.read().is_dirty("alice"));

  let reopened = harness.reopen();
  reopened.load().unwrap();
  pretty_assert_eq!(reopened.read().tip(), harness.manager.read().tip());
  pretty_assert_eq!(reopened.read().tip().unwrap().height, 3);
}

#[test]
fn deleted_wallets_stay_deleted() {
  let harness = Harness::new();
  harness.create_wallet("alice");
  harness.create_wallet("bob");

  harness.manager.lock().delete_wallet("alice").unwrap();

  let reopened = harness.reopen();
  reopened.load().unwrap();

  pretty_assert_eq!(reopened.read().wallet_names(), ["bob"]);
}

#[test]
fn loading_checks_the_password() {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let reopened = harness.reopen();

  assert!(matches!(
    reopened.load_wallet("alice", "wrong"),
    Err(WalletError::Security)
  ));
  assert!(reopened.read().wallet("alice").is_err());

  reopened.load_wallet("alice", "password").unwrap();
  pretty_assert_eq!(reopened.read().wallet_names(), ["alice"]);
}
