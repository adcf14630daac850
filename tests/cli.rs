use {
  super::*,
  tally::{
    HistoryItem, HistoryKind,
    subcommand::{
      wallet::{balance, receive},
      wallets,
    },
  },
};

/// A data directory holding wallet `alice` with one confirmed receive and
/// one unconfirmed receive.
fn funded() -> (TempDir, Transaction, Transaction) {
  let harness = Harness::new();
  harness.create_wallet("alice");

  let confirmed = payment(&harness.receive_address("alice").script_pubkey, 70_000);
  harness.mine(vec![confirmed.clone()]);

  let unconfirmed = payment(&harness.receive_address("alice").script_pubkey, 5_000);
  harness
    .manager
    .process_transaction(&unconfirmed, None, None, false)
    .unwrap();

  (harness.into_data_dir(), confirmed, unconfirmed)
}

#[test]
fn empty_data_dir_has_no_wallets() {
  let tempdir = TempDir::new().unwrap();

  pretty_assert_eq!(
    CommandBuilder::new(tempdir.path(), "wallets")
      .run_and_deserialize_output::<Vec<wallets::Output>>(),
    Vec::new()
  );
}

#[test]
fn missing_wallets_are_an_error() {
  let tempdir = TempDir::new().unwrap();

  let (_, stderr) = CommandBuilder::new(tempdir.path(), "wallet --name bob balance")
    .expected_exit_code(1)
    .run();

  pretty_assert_eq!(
    stderr,
    "error: failed to open wallet `bob`\nbecause: wallet `bob` not found\n"
  );
}

#[test]
fn stored_wallets_are_listed() {
  let (tempdir, _, _) = funded();

  let output = CommandBuilder::new(tempdir.path(), "wallets")
    .run_and_deserialize_output::<Vec<wallets::Output>>();

  pretty_assert_eq!(output.len(), 1);
  pretty_assert_eq!(output[0].name, "alice");
  pretty_assert_eq!(output[0].accounts, 1);
  pretty_assert_eq!(output[0].tip.unwrap().height, 0);
}

#[test]
fn balance() {
  let (tempdir, _, _) = funded();

  pretty_assert_eq!(
    CommandBuilder::new(tempdir.path(), "wallet --name alice balance")
      .run_and_deserialize_output::<balance::Output>(),
    balance::Output {
      confirmed: 70_000,
      unconfirmed: 5_000,
      total: 75_000,
    }
  );
}

#[test]
fn history() {
  let (tempdir, confirmed, unconfirmed) = funded();

  let history = CommandBuilder::new(tempdir.path(), "wallet --name alice history")
    .run_and_deserialize_output::<Vec<HistoryItem>>();

  pretty_assert_eq!(
    history
      .iter()
      .map(|item| (item.kind, item.txid, item.block_height))
      .collect::<Vec<(HistoryKind, Txid, Option<u32>)>>(),
    [
      (HistoryKind::Received, unconfirmed.compute_txid(), None),
      (HistoryKind::Received, confirmed.compute_txid(), Some(0)),
    ]
  );

  let limited = CommandBuilder::new(tempdir.path(), "wallet --name alice history --limit 1")
    .run_and_deserialize_output::<Vec<HistoryItem>>();

  pretty_assert_eq!(limited.len(), 1);
}

#[test]
fn receive_hands_out_the_first_unused_address() {
  let (tempdir, _, _) = funded();

  let first = CommandBuilder::new(tempdir.path(), "wallet --name alice receive --count 2")
    .run_and_deserialize_output::<receive::Output>();

  pretty_assert_eq!(first.addresses.len(), 2);
  assert!(first.addresses.iter().all(|address| address.starts_with("bcrt1")));

  let again = CommandBuilder::new(tempdir.path(), "wallet --name alice receive")
    .run_and_deserialize_output::<receive::Output>();

  pretty_assert_eq!(again.addresses, first.addresses[..1].to_vec());
}

#[test]
fn version_flag_prints_version() {
  let tempdir = TempDir::new().unwrap();

  let stdout = CommandBuilder::new(tempdir.path(), "--version").run_and_extract_stdout();

  pretty_assert_eq!(stdout, format!("tally {}\n", env!("CARGO_PKG_VERSION")));
}
