use {
  self::{flusher::Flusher, indexer::Confirmation, journal::Journal, updater::BlockContext},
  super::*,
  std::{
    ops::Deref,
    sync::{RwLockReadGuard, RwLockWriteGuard},
  },
};

pub use self::history::{Balance, HistoryItem, HistoryKind, SpendableOutput};

mod flusher;
mod history;
mod indexer;
mod journal;
mod lookahead;
mod updater;

pub const DEFAULT_LOOKAHEAD: usize = 20;

/// Coinbase outputs need this many confirmations before they can be spent.
pub const COINBASE_MATURITY: u32 = 100;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
  pub chain: Chain,
  pub flush_interval: Duration,
  pub lookahead: usize,
  pub store_transactions: bool,
}

impl ManagerConfig {
  pub fn new(chain: Chain) -> Self {
    Self {
      chain,
      flush_interval: DEFAULT_FLUSH_INTERVAL,
      lookahead: DEFAULT_LOOKAHEAD,
      store_transactions: false,
    }
  }
}

/// Everything the manager guards with its lock: the wallet arena, the lookup
/// index over it and the sync tip.
#[derive(Debug)]
pub struct WalletState {
  chain: Chain,
  dirty: BTreeSet<WalletId>,
  index: AddressIndex,
  tip: Option<BlockId>,
  wallets: BTreeMap<WalletId, Wallet>,
}

impl WalletState {
  fn new(chain: Chain) -> Self {
    Self {
      chain,
      dirty: BTreeSet::new(),
      index: AddressIndex::default(),
      tip: None,
      wallets: BTreeMap::new(),
    }
  }

  pub fn chain(&self) -> Chain {
    self.chain
  }

  pub fn coin_type(&self) -> u32 {
    self.chain.coin_type()
  }

  pub fn index(&self) -> &AddressIndex {
    &self.index
  }

  pub fn tip(&self) -> Option<BlockId> {
    self.tip
  }

  pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
    self.wallets.values()
  }

  pub fn wallet_names(&self) -> Vec<String> {
    self.wallets.values().map(|wallet| wallet.name.clone()).collect()
  }

  /// Looks up a loaded wallet by name, ignoring case.
  pub fn wallet(&self, name: &str) -> Result<&Wallet, WalletError> {
    let name = name.to_lowercase();
    self
      .wallets
      .values()
      .find(|wallet| wallet.name.to_lowercase() == name)
      .ok_or_else(|| WalletError::WalletNotFound { name })
  }

  pub fn accounts(&self, name: &str) -> Result<Vec<&Account>, WalletError> {
    let coin_type = self.coin_type();
    Ok(
      self
        .wallet(name)?
        .root(coin_type)
        .map(|root| root.accounts.iter().collect())
        .unwrap_or_default(),
    )
  }

  pub fn is_dirty(&self, name: &str) -> bool {
    self
      .wallet(name)
      .is_ok_and(|wallet| self.dirty.contains(&wallet.id))
  }

  pub fn address(&self, key: AddressKey) -> Option<&HdAddress> {
    self.wallets.get(&key.wallet)?.address(key)
  }

  pub fn address_owner(&self, address: &str) -> Option<AddressKey> {
    self.index.lookup_address(address)
  }

  pub fn script_owner(&self, script: &Script) -> Option<AddressKey> {
    self.index.resolve(script, self.chain)
  }

  pub fn transaction(&self, outpoint: OutPoint) -> Option<&TransactionData> {
    self
      .address(self.index.lookup_outpoint(outpoint)?)?
      .transaction(outpoint)
  }

  /// The first height some loaded wallet has yet to see.
  pub fn earliest_sync_height(&self) -> Option<u32> {
    let coin_type = self.coin_type();
    self
      .wallets
      .values()
      .map(|wallet| {
        wallet
          .last_synced(coin_type)
          .map_or(0, |block| block.height + 1)
      })
      .min()
  }

  fn wallet_id(&self, name: &str) -> Result<WalletId, WalletError> {
    self.wallet(name).map(|wallet| wallet.id)
  }

  fn account_key(&self, name: &str, account: u32) -> Result<AccountKey, WalletError> {
    let wallet = self.wallet(name)?;
    let key = AccountKey {
      wallet: wallet.id,
      coin_type: self.coin_type(),
      account,
    };

    if wallet.account(key).is_none() {
      return Err(WalletError::AccountNotFound {
        wallet: wallet.name.clone(),
        account,
      });
    }

    Ok(key)
  }
}

/// A batch of in-memory changes that lands in the store as one commit, or is
/// rolled back.
pub(crate) struct Unit<'a> {
  batch: Batch,
  journal: Journal,
  manager: &'a WalletManager,
  notifications: Vec<Notification>,
  state: &'a mut WalletState,
}

impl<'a> Unit<'a> {
  fn new(manager: &'a WalletManager, state: &'a mut WalletState) -> Self {
    Self {
      batch: Batch::default(),
      journal: Journal::default(),
      manager,
      notifications: Vec::new(),
      state,
    }
  }

  fn config(&self) -> &'a ManagerConfig {
    &self.manager.config
  }

  fn coin_type(&self) -> u32 {
    self.state.coin_type()
  }

  fn wallet_name(&self, wallet: WalletId) -> String {
    self
      .state
      .wallets
      .get(&wallet)
      .map(|wallet| wallet.name.clone())
      .unwrap_or_else(|| wallet.to_string())
  }

  fn address_mut(&mut self, key: AddressKey) -> Option<&mut HdAddress> {
    self.journal.address(self.state, key);
    self.state.wallets.get_mut(&key.wallet)?.address_mut(key)
  }

  fn wallet_mut(&mut self, wallet: WalletId) -> Option<&mut Wallet> {
    self.journal.wallet(self.state, wallet);
    self.state.wallets.get_mut(&wallet)
  }

  fn insert_wallet(&mut self, wallet: Wallet) {
    self.journal.wallet(self.state, wallet.id);

    for (key, address) in wallet.addresses() {
      self.state.index.register(key, address);
    }

    self.state.wallets.insert(wallet.id, wallet);
  }

  fn set_cursor(&mut self, wallet: WalletId, block: Option<BlockId>) {
    self.journal.cursor(self.state, wallet);

    let coin_type = self.coin_type();
    if let Some(root) = self
      .state
      .wallets
      .get_mut(&wallet)
      .and_then(|wallet| wallet.root_mut(coin_type))
    {
      root.last_synced = block;
    }
  }

  fn persist_cursor(&mut self, wallet: WalletId, block: Option<BlockId>) {
    self.set_cursor(wallet, block);
    self
      .batch
      .save_last_synced_block(wallet, self.state.coin_type(), block);
    self.journal.dirty(self.state);
    self.state.dirty.remove(&wallet);
  }

  fn set_tip(&mut self, tip: Option<BlockId>) {
    self.journal.tip(self.state);
    self.state.tip = tip;
  }

  /// Moves the tip back so a wallet whose cursor is behind it gets the blocks
  /// it is missing.
  fn rewind_tip(&mut self, cursor: Option<BlockId>) {
    let tip = if self.state.wallets.len() <= 1 {
      cursor
    } else {
      match (self.state.tip, cursor) {
        (Some(tip), Some(cursor)) if cursor.height < tip.height => Some(cursor),
        (Some(_), None) => None,
        (tip, _) => tip,
      }
    };

    if tip != self.state.tip {
      log::info!(
        "wallet tip moved to {}",
        tip.map_or_else(|| "genesis".into(), |tip| tip.to_string())
      );
    }

    self.set_tip(tip);
  }

  fn notify(&mut self, kind: NotificationKind, txid: Txid) {
    self.notifications.push(Notification { kind, txid });
  }

  fn flush(&mut self) {
    let dirty = self.state.dirty.iter().copied().collect::<Vec<WalletId>>();

    for wallet in dirty {
      let cursor = self
        .state
        .wallets
        .get(&wallet)
        .and_then(|wallet| wallet.last_synced(self.state.coin_type()));
      self.persist_cursor(wallet, cursor);
    }
  }

  fn load_all(&mut self) -> Result<(), WalletError> {
    for name in self.manager.store.wallet_names()? {
      if self.state.wallet(&name).is_ok() {
        continue;
      }

      if let Some(wallet) = self.manager.store.wallet_by_name(&name)? {
        log::info!(
          "loaded wallet `{}` with {} addresses",
          wallet.name,
          wallet.addresses().count()
        );
        self.insert_wallet(wallet);
      }
    }

    let coin_type = self.coin_type();
    let lowest = self
      .state
      .wallets
      .values()
      .map(|wallet| wallet.last_synced(coin_type))
      .min_by_key(|cursor| cursor.map(|cursor| cursor.height));

    if let Some(lowest) = lowest {
      self.set_tip(lowest);
    }

    Ok(())
  }

  fn add_wallet(
    &mut self,
    name: &str,
    password: &str,
    mnemonic: &Mnemonic,
    passphrase: &str,
    created_at: DateTime<Utc>,
    cursor: Option<BlockId>,
  ) -> Result<WalletId, WalletError> {
    let keys = &self.manager.keys;
    let seed = Zeroizing::new(mnemonic.to_seed(passphrase));

    let id = self
      .state
      .wallets
      .keys()
      .map(|id| WalletId(id.0 + 1))
      .max()
      .unwrap_or(WalletId(0))
      .max(self.manager.store.next_wallet_id()?);

    let wallet = Wallet {
      id,
      name: name.into(),
      encrypted_seed: keys.encrypt_seed(seed.as_slice(), password)?,
      chain_code: keys.chain_code(seed.as_slice())?,
      created_at,
      network: self.state.chain.network(),
      account_roots: vec![AccountRoot {
        coin_type: self.coin_type(),
        last_synced: cursor,
        accounts: Vec::new(),
      }],
    };

    self.insert_wallet(wallet);
    self.add_account(id, seed.as_slice(), None)?;
    self.rewind_tip(cursor);

    Ok(id)
  }

  fn add_account(
    &mut self,
    wallet: WalletId,
    seed: &[u8],
    name: Option<&str>,
  ) -> Result<AccountKey, WalletError> {
    let coin_type = self.coin_type();
    let keys = self.manager.keys.clone();

    let Some(root) = self
      .wallet_mut(wallet)
      .and_then(|wallet| wallet.root_mut(coin_type))
    else {
      return Err(WalletError::WalletNotFound {
        name: wallet.to_string(),
      });
    };

    let index = u32::try_from(root.accounts.len()).map_err(|_| WalletError::InvalidArgument {
      message: "too many accounts".into(),
    })?;

    let (xpub, _) = keys.derive_extended_key(seed, coin_type, index)?;

    root.accounts.push(Account {
      index,
      name: name.map_or_else(|| format!("account {index}"), str::to_string),
      hd_path: format!("m/84'/{coin_type}'/{index}'"),
      xpub,
      created_at: Utc::now(),
      external: Vec::new(),
      internal: Vec::new(),
    });

    let key = AccountKey {
      wallet,
      coin_type,
      account: index,
    };

    for keychain in Keychain::ALL {
      self.ensure_lookahead(key, keychain)?;
    }

    if let Some(wallet) = self.state.wallets.get(&wallet) {
      self.batch.save_wallet(wallet, false);
    }

    log::info!("created account {index} in wallet `{}`", self.wallet_name(wallet));

    Ok(key)
  }

  fn remove_wallet(&mut self, wallet: WalletId) {
    self.journal.wallet(self.state, wallet);
    self.state.wallets.remove(&wallet);
    self.state.index.unregister_wallet(wallet);
    self.journal.dirty(self.state);
    self.state.dirty.remove(&wallet);
    self.batch.delete_wallet(wallet);
  }

  /// Drops every output matching `output` and clears every spend matching
  /// `spend`. Returns the affected txids.
  fn evict(
    &mut self,
    wallet: WalletId,
    output: impl Fn(&TransactionData) -> bool,
    spend: impl Fn(&SpendingDetails) -> bool,
  ) -> BTreeSet<Txid> {
    let keys = self
      .state
      .wallets
      .get(&wallet)
      .map(|wallet| {
        wallet
          .addresses()
          .filter(|(_, address)| {
            address.transactions.iter().any(|transaction| {
              output(transaction) || transaction.spending_details.as_ref().is_some_and(&spend)
            })
          })
          .map(|(key, _)| key)
          .collect::<Vec<AddressKey>>()
      })
      .unwrap_or_default();

    let mut txids = BTreeSet::new();

    for key in keys {
      let Some(address) = self.address_mut(key) else {
        continue;
      };

      let mut removed = Vec::new();
      address.transactions.retain(|transaction| {
        if output(transaction) {
          removed.push(transaction.outpoint());
          if let Some(details) = &transaction.spending_details
            && spend(details)
          {
            txids.insert(details.txid);
          }
          false
        } else {
          true
        }
      });

      let mut updated = Vec::new();
      for transaction in &mut address.transactions {
        if let Some(details) = &transaction.spending_details
          && spend(details)
        {
          txids.insert(details.txid);
          transaction.spending_details = None;
          updated.push(transaction.clone());
        }
      }

      for outpoint in removed {
        txids.insert(outpoint.txid);
        self.state.index.unregister_output(outpoint);
        self.batch.remove_transaction(key, outpoint);
      }

      for transaction in updated {
        self.batch.save_transaction(key, &transaction);
      }
    }

    txids
  }
}

/// Exclusive access to the wallet state. Holding a guard keeps every other
/// reader and writer out, so several operations can run as one.
pub struct WalletGuard<'a> {
  manager: &'a WalletManager,
  state: RwLockWriteGuard<'a, WalletState>,
}

impl Deref for WalletGuard<'_> {
  type Target = WalletState;

  fn deref(&self) -> &WalletState {
    &self.state
  }
}

impl WalletGuard<'_> {
  /// Runs `f` as one unit of work. On success the collected batch is
  /// committed and notifications go out; on failure the arena is restored and
  /// the index rebuilt from it.
  fn unit<T>(
    &mut self,
    f: impl FnOnce(&mut Unit) -> Result<T, WalletError>,
  ) -> Result<T, WalletError> {
    let manager = self.manager;
    let mut unit = Unit::new(manager, &mut self.state);

    let result = f(&mut unit);

    let Unit {
      batch,
      journal,
      notifications,
      state,
      ..
    } = unit;

    let result = result.and_then(|value| {
      manager.store.commit(batch)?;
      Ok(value)
    });

    match result {
      Ok(value) => {
        if let Some(sink) = &manager.sink {
          for notification in notifications {
            sink.notify(notification);
          }
        }
        Ok(value)
      }
      Err(err) => {
        log::warn!("rolling back wallet changes: {err}");
        journal.rollback(state);
        state.index = AddressIndex::build(state.wallets.values());
        Err(err)
      }
    }
  }

  pub fn create_wallet(
    &mut self,
    name: &str,
    password: &str,
    passphrase: &str,
    mnemonic: Option<Mnemonic>,
  ) -> Result<Mnemonic, WalletError> {
    self.check_new_wallet(name, password)?;

    let mnemonic = match mnemonic {
      Some(mnemonic) => mnemonic,
      None => generate_mnemonic()?,
    };

    self.check_new_seed(&mnemonic, passphrase)?;

    let cursor = self.manager.chain.tip()?.map(|tip| tip.id());

    self.unit(|unit| {
      unit.add_wallet(name, password, &mnemonic, passphrase, Utc::now(), cursor)
    })?;

    log::info!("created wallet `{name}`");

    Ok(mnemonic)
  }

  /// Restores a wallet from its mnemonic. Syncing resumes from the last block
  /// before `created_at`.
  pub fn recover_wallet(
    &mut self,
    name: &str,
    password: &str,
    mnemonic: &Mnemonic,
    passphrase: &str,
    created_at: DateTime<Utc>,
  ) -> Result<(), WalletError> {
    self.check_new_wallet(name, password)?;
    self.check_new_seed(mnemonic, passphrase)?;

    let cursor = self.cursor_before(created_at)?;

    self.unit(|unit| {
      unit.add_wallet(name, password, mnemonic, passphrase, created_at, cursor)
    })?;

    log::info!(
      "recovered wallet `{name}`, syncing from {}",
      cursor.map_or_else(|| "genesis".into(), |cursor| cursor.to_string())
    );

    Ok(())
  }

  pub fn load_wallet(&mut self, name: &str, password: &str) -> Result<(), WalletError> {
    let wallet = self
      .manager
      .store
      .wallet_by_name(name)?
      .ok_or_else(|| WalletError::WalletNotFound { name: name.into() })?;

    self
      .manager
      .keys
      .decrypt_seed(&wallet.encrypted_seed, password)?;

    if self.wallets.contains_key(&wallet.id) {
      return Ok(());
    }

    let cursor = wallet.last_synced(self.coin_type());

    self.unit(|unit| {
      unit.insert_wallet(wallet);
      unit.rewind_tip(cursor);
      Ok(())
    })
  }

  pub fn delete_wallet(&mut self, name: &str) -> Result<(), WalletError> {
    let id = match self.wallet_id(name) {
      Ok(id) => id,
      Err(_) => {
        self
          .manager
          .store
          .wallet_by_name(name)?
          .ok_or_else(|| WalletError::WalletNotFound { name: name.into() })?
          .id
      }
    };

    self.unit(|unit| {
      unit.remove_wallet(id);
      Ok(())
    })?;

    log::info!("deleted wallet `{name}`");

    Ok(())
  }

  /// Adds the next account to a wallet. The previous account must have seen
  /// a transaction first.
  pub fn create_account(
    &mut self,
    name: &str,
    password: &str,
    account_name: Option<&str>,
  ) -> Result<Account, WalletError> {
    let wallet = self.wallet(name)?;
    let id = wallet.id;

    if let Some(last) = wallet
      .root(self.coin_type())
      .and_then(|root| root.accounts.last())
      && !last.is_used()
    {
      return Err(WalletError::PreviousAccountUnused {
        wallet: wallet.name.clone(),
        account: last.index + 1,
      });
    }

    self.add_account(id, password, account_name)
  }

  /// Returns the last account if it is still unused, creating a new one
  /// otherwise.
  pub fn unused_account(&mut self, name: &str, password: &str) -> Result<Account, WalletError> {
    let wallet = self.wallet(name)?;
    let id = wallet.id;

    if let Some(last) = wallet
      .root(self.coin_type())
      .and_then(|root| root.accounts.last())
      && !last.is_used()
    {
      return Ok(last.clone());
    }

    self.add_account(id, password, None)
  }

  fn add_account(
    &mut self,
    wallet: WalletId,
    password: &str,
    account_name: Option<&str>,
  ) -> Result<Account, WalletError> {
    let encrypted_seed = self
      .wallets
      .get(&wallet)
      .map(|wallet| wallet.encrypted_seed.clone())
      .ok_or_else(|| WalletError::WalletNotFound {
        name: wallet.to_string(),
      })?;

    let seed = self.manager.keys.decrypt_seed(&encrypted_seed, password)?;

    let key = self.unit(|unit| unit.add_account(wallet, &seed, account_name))?;

    self
      .wallets
      .get(&wallet)
      .and_then(|wallet| wallet.account(key))
      .cloned()
      .ok_or_else(|| WalletError::WalletNotFound {
        name: wallet.to_string(),
      })
  }

  pub fn process_transaction(
    &mut self,
    transaction: &Transaction,
    height: Option<u32>,
    block: Option<&Block>,
    is_propagated: bool,
  ) -> Result<bool, WalletError> {
    let context = block.map(BlockContext::new);
    let confirmation = height.map(|height| Confirmation {
      height,
      block: context.as_ref(),
    });

    self.unit(|unit| {
      unit.process_transaction(
        transaction,
        transaction.compute_txid(),
        confirmation,
        is_propagated,
      )
    })
  }

  pub fn ensure_lookahead(
    &mut self,
    name: &str,
    account: u32,
    keychain: Keychain,
  ) -> Result<(), WalletError> {
    let key = self.account_key(name, account)?;
    self.unit(|unit| unit.ensure_lookahead(key, keychain).map(|_| ()))
  }

  /// Hands out the first `count` unused addresses, deriving more as needed.
  pub fn unused_addresses(
    &mut self,
    name: &str,
    account: u32,
    keychain: Keychain,
    count: usize,
  ) -> Result<Vec<HdAddress>, WalletError> {
    let key = self.account_key(name, account)?;
    let keys = self.unit(|unit| unit.unused_addresses(key, keychain, count))?;
    Ok(self.addresses_at(&keys))
  }

  /// Derives `count` addresses past the end of the chain.
  pub fn new_addresses(
    &mut self,
    name: &str,
    account: u32,
    keychain: Keychain,
    count: usize,
  ) -> Result<Vec<HdAddress>, WalletError> {
    let key = self.account_key(name, account)?;
    let keys = self.unit(|unit| unit.new_addresses(key, keychain, count))?;
    Ok(self.addresses_at(&keys))
  }

  fn addresses_at(&self, keys: &[AddressKey]) -> Vec<HdAddress> {
    keys
      .iter()
      .filter_map(|key| self.address(*key).cloned())
      .collect()
  }

  pub fn remove_unconfirmed_transactions(
    &mut self,
    name: &str,
  ) -> Result<BTreeSet<Txid>, WalletError> {
    let wallet = self.wallet_id(name)?;
    self.unit(|unit| {
      Ok(unit.evict(
        wallet,
        |output| !output.is_confirmed(),
        |spend| spend.block_height.is_none(),
      ))
    })
  }

  pub fn remove_transactions(
    &mut self,
    name: &str,
    txids: &BTreeSet<Txid>,
  ) -> Result<BTreeSet<Txid>, WalletError> {
    let wallet = self.wallet_id(name)?;
    self.unit(|unit| {
      Ok(unit.evict(
        wallet,
        |output| txids.contains(&output.txid),
        |spend| txids.contains(&spend.txid),
      ))
    })
  }

  /// Forgets every transaction and rewinds the wallet to its creation time so
  /// the chain is scanned again.
  pub fn remove_all_transactions(&mut self, name: &str) -> Result<BTreeSet<Txid>, WalletError> {
    let wallet = self.wallet(name)?;
    let (id, created_at) = (wallet.id, wallet.created_at);

    let cursor = self.cursor_before(created_at)?;

    self.unit(|unit| {
      let txids = unit.evict(id, |_| true, |_| true);
      unit.persist_cursor(id, cursor);
      unit.rewind_tip(cursor);
      Ok(txids)
    })
  }

  /// Persists the sync cursor of every wallet whose cursor moved without a
  /// store write.
  pub fn flush(&mut self) -> Result<(), WalletError> {
    if self.dirty.is_empty() {
      return Ok(());
    }

    self.unit(|unit| {
      unit.flush();
      Ok(())
    })
  }

  fn check_new_wallet(&self, name: &str, password: &str) -> Result<(), WalletError> {
    snafu::ensure!(
      !name.trim().is_empty(),
      error::InvalidArgument {
        message: "wallet name must not be empty",
      }
    );

    snafu::ensure!(
      !password.is_empty(),
      error::InvalidArgument {
        message: "wallet password must not be empty",
      }
    );

    if self.wallet(name).is_ok() || self.manager.store.wallet_by_name(name)?.is_some() {
      return Err(WalletError::WalletAlreadyExists { name: name.into() });
    }

    Ok(())
  }

  /// A seed backs at most one wallet.
  fn check_new_seed(&self, mnemonic: &Mnemonic, passphrase: &str) -> Result<(), WalletError> {
    let seed = Zeroizing::new(mnemonic.to_seed(passphrase));
    let chain_code = self.manager.keys.chain_code(seed.as_slice())?;

    if let Some(wallet) = self
      .wallets()
      .find(|wallet| wallet.chain_code == chain_code)
    {
      return Err(WalletError::WalletAlreadyExists {
        name: wallet.name.clone(),
      });
    }

    for name in self.manager.store.wallet_names()? {
      if let Some(wallet) = self.manager.store.wallet_by_name(&name)?
        && wallet.chain_code == chain_code
      {
        return Err(WalletError::WalletAlreadyExists { name: wallet.name });
      }
    }

    Ok(())
  }

  fn cursor_before(&self, time: DateTime<Utc>) -> Result<Option<BlockId>, WalletError> {
    let chain = &self.manager.chain;

    match chain.height_at_time(time)?.checked_sub(1) {
      Some(height) => Ok(chain.header_at(height)?.map(|header| header.id())),
      None => Ok(None),
    }
  }
}

/// Shared access to the wallet state.
pub struct WalletReader<'a> {
  state: RwLockReadGuard<'a, WalletState>,
}

impl Deref for WalletReader<'_> {
  type Target = WalletState;

  fn deref(&self) -> &WalletState {
    &self.state
  }
}

/// Owns the wallet arena and serializes every change to it.
pub struct WalletManager {
  chain: Arc<dyn ChainSource>,
  config: ManagerConfig,
  flusher: Mutex<Option<Flusher>>,
  keys: Arc<dyn KeySource>,
  sink: Option<Arc<dyn NotificationSink>>,
  state: RwLock<WalletState>,
  store: Arc<dyn WalletStore>,
}

impl WalletManager {
  pub fn new(
    config: ManagerConfig,
    store: Arc<dyn WalletStore>,
    chain: Arc<dyn ChainSource>,
    keys: Arc<dyn KeySource>,
  ) -> Self {
    Self {
      chain,
      flusher: Mutex::new(None),
      keys,
      sink: None,
      state: RwLock::new(WalletState::new(config.chain)),
      store,
      config,
    }
  }

  pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
    self.sink = Some(sink);
    self
  }

  pub fn config(&self) -> &ManagerConfig {
    &self.config
  }

  /// Takes the wallet lock exclusively.
  pub fn lock(&self) -> WalletGuard<'_> {
    WalletGuard {
      manager: self,
      state: self.state.write().unwrap(),
    }
  }

  pub fn read(&self) -> WalletReader<'_> {
    WalletReader {
      state: self.state.read().unwrap(),
    }
  }

  /// Loads every stored wallet without checking passwords. The tip moves to
  /// the lowest sync cursor among them.
  pub fn load(&self) -> Result<(), WalletError> {
    self.lock().unit(|unit| unit.load_all())
  }

  /// Loads every stored wallet and starts the background flusher.
  pub fn start(self: &Arc<Self>) -> Result<(), WalletError> {
    self.load()?;

    let mut flusher = self.flusher.lock().unwrap();
    if flusher.is_none() {
      *flusher = Some(Flusher::spawn(
        Arc::downgrade(self),
        self.config.flush_interval,
      ));
    }

    Ok(())
  }

  /// Stops the flusher and writes out anything it had pending.
  pub fn stop(&self) -> Result<(), WalletError> {
    if let Some(flusher) = self.flusher.lock().unwrap().take() {
      flusher.stop();
    }

    self.flush()
  }

  pub fn flush(&self) -> Result<(), WalletError> {
    self.lock().flush()
  }

  pub fn create_wallet(
    &self,
    name: &str,
    password: &str,
    passphrase: &str,
    mnemonic: Option<Mnemonic>,
  ) -> Result<Mnemonic, WalletError> {
    self
      .lock()
      .create_wallet(name, password, passphrase, mnemonic)
  }

  pub fn recover_wallet(
    &self,
    name: &str,
    password: &str,
    mnemonic: &Mnemonic,
    passphrase: &str,
    created_at: DateTime<Utc>,
  ) -> Result<(), WalletError> {
    self
      .lock()
      .recover_wallet(name, password, mnemonic, passphrase, created_at)
  }

  pub fn load_wallet(&self, name: &str, password: &str) -> Result<(), WalletError> {
    self.lock().load_wallet(name, password)
  }

  pub fn process_block(&self, block: &Block, height: u32) -> Result<(), WalletError> {
    self.lock().process_block(block, height)
  }

  pub fn process_transaction(
    &self,
    transaction: &Transaction,
    height: Option<u32>,
    block: Option<&Block>,
    is_propagated: bool,
  ) -> Result<bool, WalletError> {
    self
      .lock()
      .process_transaction(transaction, height, block, is_propagated)
  }

  pub fn remove_blocks(&self, fork: BlockId) -> Result<(), WalletError> {
    self.lock().remove_blocks(fork)
  }

  pub fn unused_addresses(
    &self,
    name: &str,
    account: u32,
    keychain: Keychain,
    count: usize,
  ) -> Result<Vec<HdAddress>, WalletError> {
    self.lock().unused_addresses(name, account, keychain, count)
  }

  pub fn balance(&self, name: &str, account: Option<u32>) -> Result<Balance, WalletError> {
    self.read().balance(name, account)
  }

  pub fn history(&self, name: &str, account: Option<u32>) -> Result<Vec<HistoryItem>, WalletError> {
    self.read().history(name, account)
  }
}

impl Drop for WalletManager {
  fn drop(&mut self) {
    if let Ok(flusher) = self.flusher.get_mut()
      && let Some(flusher) = flusher.take()
    {
      flusher.signal();
    }

    if let Err(err) = self.flush() {
      log::error!("failed to flush wallets on shutdown: {err}");
    }
  }
}
