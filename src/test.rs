use {
  super::*,
  bitcoin::{
    CompactTarget, Sequence, TxIn, TxMerkleNode, TxOut, WScriptHash, Witness,
    absolute::LockTime, script,
  },
  std::sync::atomic::{AtomicU32, AtomicU64},
  tempfile::TempDir,
};

pub(crate) const CHAIN: Chain = Chain::Regtest;

const GENESIS_TIME: u32 = 1_600_000_000;

pub(crate) fn mnemonic() -> Mnemonic {
  "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
    .parse()
    .unwrap()
}

pub(crate) fn txid(n: u64) -> Txid {
  let mut bytes = [0; 32];
  bytes[..8].copy_from_slice(&n.to_le_bytes());
  Txid::from_byte_array(bytes)
}

pub(crate) fn outpoint(n: u64) -> OutPoint {
  OutPoint {
    txid: txid(n),
    vout: 0,
  }
}

/// A P2WSH script no wallet owns.
pub(crate) fn script(n: u8) -> ScriptBuf {
  ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array([n; 32]))
}

pub(crate) fn transaction_data(txid: Txid, vout: u32, sats: u64) -> TransactionData {
  TransactionData {
    txid,
    index: vout,
    amount: Amount::from_sat(sats),
    script_pubkey: script(0),
    block_height: None,
    block_hash: None,
    created_at: timestamp(GENESIS_TIME),
    transaction: None,
    merkle_proof: None,
    is_propagated: false,
    is_coinbase: false,
    spending_details: None,
  }
}

pub(crate) fn output(script_pubkey: &Script, sats: u64) -> TxOut {
  TxOut {
    value: Amount::from_sat(sats),
    script_pubkey: script_pubkey.into(),
  }
}

pub(crate) fn transaction(inputs: &[OutPoint], outputs: Vec<TxOut>) -> Transaction {
  Transaction {
    version: bitcoin::transaction::Version::TWO,
    lock_time: LockTime::ZERO,
    input: inputs
      .iter()
      .map(|previous_output| TxIn {
        previous_output: *previous_output,
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::new(),
      })
      .collect(),
    output: outputs,
  }
}

/// Pays `sats` to `script_pubkey` from an output no wallet owns. Every call
/// spends a different outpoint.
pub(crate) fn payment(script_pubkey: &Script, sats: u64) -> Transaction {
  static NEXT: AtomicU64 = AtomicU64::new(1 << 32);

  transaction(
    &[outpoint(NEXT.fetch_add(1, atomic::Ordering::Relaxed))],
    vec![output(script_pubkey, sats)],
  )
}

pub(crate) fn coinbase(height: u32, outputs: Vec<TxOut>) -> Transaction {
  Transaction {
    version: bitcoin::transaction::Version::TWO,
    lock_time: LockTime::ZERO,
    input: vec![TxIn {
      previous_output: OutPoint::null(),
      script_sig: script::Builder::new().push_int(i64::from(height)).into_script(),
      sequence: Sequence::MAX,
      witness: Witness::new(),
    }],
    output: outputs,
  }
}

pub(crate) fn header(prev_blockhash: BlockHash, time: u32) -> Header {
  Header {
    version: bitcoin::block::Version::ONE,
    prev_blockhash,
    merkle_root: TxMerkleNode::all_zeros(),
    time,
    bits: CompactTarget::from_consensus(0x207f_ffff),
    nonce: 0,
  }
}

pub(crate) fn block(prev_blockhash: BlockHash, time: u32, txdata: Vec<Transaction>) -> Block {
  let mut block = Block {
    header: header(prev_blockhash, time),
    txdata,
  };

  if let Some(root) = block.compute_merkle_root() {
    block.header.merkle_root = root;
  }

  block
}

/// A redb store that can be told to fail every commit.
pub(crate) struct TestStore {
  failing: AtomicBool,
  inner: RedbStore,
}

impl TestStore {
  pub(crate) fn fail(&self, failing: bool) {
    self.failing.store(failing, atomic::Ordering::Relaxed);
  }
}

impl WalletStore for TestStore {
  fn wallet_names(&self) -> Result<Vec<String>, StoreError> {
    self.inner.wallet_names()
  }

  fn wallet_by_name(&self, name: &str) -> Result<Option<Wallet>, StoreError> {
    self.inner.wallet_by_name(name)
  }

  fn wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, StoreError> {
    self.inner.wallet_by_address(address)
  }

  fn wallet_by_script(&self, script: &Script) -> Result<Option<Wallet>, StoreError> {
    self.inner.wallet_by_script(script)
  }

  fn next_wallet_id(&self) -> Result<WalletId, StoreError> {
    self.inner.next_wallet_id()
  }

  fn commit(&self, batch: Batch) -> Result<(), StoreError> {
    if self.failing.load(atomic::Ordering::Relaxed) {
      return Err(StoreError::Io {
        source: io::Error::other("injected failure"),
        path: "test".into(),
      });
    }

    self.inner.commit(batch)
  }
}

pub(crate) struct ContextBuilder {
  sink: Option<Arc<dyn NotificationSink>>,
  store_transactions: bool,
  wallet: bool,
}

impl ContextBuilder {
  pub(crate) fn sink(self, sink: impl NotificationSink + 'static) -> Self {
    Self {
      sink: Some(Arc::new(sink)),
      ..self
    }
  }

  pub(crate) fn store_transactions(self) -> Self {
    Self {
      store_transactions: true,
      ..self
    }
  }

  pub(crate) fn without_wallet(self) -> Self {
    Self {
      wallet: false,
      ..self
    }
  }

  pub(crate) fn build(self) -> Context {
    let tempdir = TempDir::new().unwrap();

    let store = Arc::new(TestStore {
      failing: AtomicBool::new(false),
      inner: RedbStore::open(&tempdir.path().join("wallets.redb")).unwrap(),
    });

    let chain = Arc::new(MemoryChain::default());

    let keys = Arc::new(Bip32KeySource::new(CHAIN.network()).with_kdf(KdfParams::INSECURE));

    let config = ManagerConfig {
      store_transactions: self.store_transactions,
      ..ManagerConfig::new(CHAIN)
    };

    let mut manager =
      WalletManager::new(config.clone(), store.clone(), chain.clone(), keys.clone());

    if let Some(sink) = self.sink {
      manager = manager.with_sink(sink);
    }

    let context = Context {
      chain,
      config,
      keys,
      manager: Arc::new(manager),
      store,
      time: AtomicU32::new(GENESIS_TIME),
      _tempdir: tempdir,
    };

    if self.wallet {
      context
        .manager
        .create_wallet("alice", "password", "", Some(mnemonic()))
        .unwrap();
    }

    context
  }
}

pub(crate) struct Context {
  pub(crate) chain: Arc<MemoryChain>,
  config: ManagerConfig,
  keys: Arc<Bip32KeySource>,
  pub(crate) manager: Arc<WalletManager>,
  pub(crate) store: Arc<TestStore>,
  time: AtomicU32,
  _tempdir: TempDir,
}

impl Context {
  pub(crate) fn builder() -> ContextBuilder {
    ContextBuilder {
      sink: None,
      store_transactions: false,
      wallet: true,
    }
  }

  /// A context with wallet `alice`, password `password` and no passphrase.
  pub(crate) fn new() -> Self {
    Self::builder().build()
  }

  pub(crate) fn create_wallet(&self, name: &str, passphrase: &str) {
    self
      .manager
      .create_wallet(name, "password", passphrase, Some(mnemonic()))
      .unwrap();
  }

  /// A second manager over the same store and chain, with nothing loaded.
  pub(crate) fn reopen(&self) -> WalletManager {
    WalletManager::new(
      self.config.clone(),
      self.store.clone(),
      self.chain.clone(),
      self.keys.clone(),
    )
  }

  pub(crate) fn wallet(&self, name: &str) -> Wallet {
    self.manager.read().wallet(name).unwrap().clone()
  }

  pub(crate) fn account_key(&self, name: &str) -> AccountKey {
    AccountKey {
      wallet: self.wallet(name).id,
      coin_type: CHAIN.coin_type(),
      account: 0,
    }
  }

  pub(crate) fn receive_address(&self, name: &str) -> HdAddress {
    self
      .manager
      .unused_addresses(name, 0, Keychain::External, 1)
      .unwrap()
      .remove(0)
  }

  pub(crate) fn change_address(&self, name: &str) -> HdAddress {
    self
      .manager
      .unused_addresses(name, 0, Keychain::Internal, 1)
      .unwrap()
      .remove(0)
  }

  fn next_block(&self, coinbase_outputs: Vec<TxOut>, transactions: Vec<Transaction>) -> Block {
    let (prev, height) = match self.chain.tip().unwrap() {
      Some(tip) => (tip.hash(), tip.height + 1),
      None => (BlockHash::all_zeros(), 0),
    };

    let mut txdata = vec![coinbase(height, coinbase_outputs)];
    txdata.extend(transactions);

    let block = block(
      prev,
      self.time.fetch_add(600, atomic::Ordering::Relaxed),
      txdata,
    );

    self.chain.push(block.header);

    block
  }

  /// Builds a block on the chain tip and adds its header to the chain
  /// without handing it to the manager.
  pub(crate) fn block(&self, transactions: Vec<Transaction>) -> Block {
    self.next_block(Vec::new(), transactions)
  }

  pub(crate) fn mine(&self, transactions: Vec<Transaction>) -> Block {
    let block = self.block(transactions);
    self.process(&block);
    block
  }

  /// Mines a block whose coinbase pays `sats` to `script_pubkey`.
  pub(crate) fn mine_to(&self, script_pubkey: &Script, sats: u64) -> Block {
    let block = self.next_block(vec![output(script_pubkey, sats)], Vec::new());
    self.process(&block);
    block
  }

  fn process(&self, block: &Block) {
    let height = self.chain.tip().unwrap().unwrap().height;
    self.manager.process_block(block, height).unwrap();
  }
}
