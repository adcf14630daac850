use {super::*, tokio::sync::mpsc};

fn drain(receiver: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
  let mut notifications = Vec::new();
  while let Ok(notification) = receiver.try_recv() {
    notifications.push(notification);
  }
  notifications
}

#[test]
fn confirmed_receives_and_spends_are_announced() {
  let (sender, mut receiver) = mpsc::channel(64);
  let harness = Harness::with_sink(sender);
  harness.create_wallet("alice");

  let funding = payment(&harness.receive_address("alice").script_pubkey, 80_000);
  harness
    .manager
    .process_transaction(&funding, None, None, false)
    .unwrap();
  assert!(drain(&mut receiver).is_empty());

  harness.mine(vec![funding.clone()]);

  let txid = funding.compute_txid();
  pretty_assert_eq!(
    drain(&mut receiver),
    [
      Notification {
        kind: NotificationKind::Received,
        txid,
      },
      Notification {
        kind: NotificationKind::All,
        txid,
      },
    ]
  );

  let spend = transaction(&[outpoint(&funding, 0)], vec![output(&script(5), 79_000)]);
  harness.mine(vec![spend.clone()]);

  let txid = spend.compute_txid();
  pretty_assert_eq!(
    drain(&mut receiver),
    [
      Notification {
        kind: NotificationKind::Sent,
        txid,
      },
      Notification {
        kind: NotificationKind::All,
        txid,
      },
    ]
  );
}

#[test]
fn failed_commits_announce_nothing() {
  let (sender, mut receiver) = mpsc::channel(64);
  let harness = Harness::with_sink(sender);
  harness.create_wallet("alice");

  let funding = payment(&harness.receive_address("alice").script_pubkey, 80_000);
  let (block, height) = harness.block(vec![funding]);

  harness.fail_commits(true);
  assert!(harness.manager.process_block(&block, height).is_err());
  assert!(drain(&mut receiver).is_empty());

  harness.fail_commits(false);
  harness.manager.process_block(&block, height).unwrap();
  pretty_assert_eq!(drain(&mut receiver).len(), 2);
}
