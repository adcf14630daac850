use {
  super::{entry::*, *},
  redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction},
};

macro_rules! define_table {
  ($name:ident, $key:ty, $value:ty) => {
    const $name: TableDefinition<$key, $value> = TableDefinition::new(stringify!($name));
  };
}

define_table! { ADDRESS_KEY_TO_ADDRESS, &[u8], &[u8] }
define_table! { ADDRESS_TO_WALLET_ID, &str, u32 }
define_table! { SCRIPT_PUBKEY_TO_WALLET_ID, &[u8], u32 }
define_table! { TRANSACTION_KEY_TO_TRANSACTION, &[u8], &[u8] }
define_table! { WALLET_ID_TO_WALLET, u32, &[u8] }
define_table! { WALLET_NAME_TO_WALLET_ID, &str, u32 }

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
  serde_json::to_vec(value).snafu_context(Encode)
}

fn decode<T: DeserializeOwned>(table: &'static str, bytes: &[u8]) -> Result<T, StoreError> {
  serde_json::from_slice(bytes).snafu_context(Corrupt { table })
}

fn name_key(name: &str) -> String {
  name.to_lowercase()
}

pub struct RedbStore {
  database: Database,
}

impl RedbStore {
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).snafu_context(Io { path: parent })?;
    }

    let database = Database::create(path)?;

    let wtx = database.begin_write()?;
    wtx.open_table(ADDRESS_KEY_TO_ADDRESS)?;
    wtx.open_table(ADDRESS_TO_WALLET_ID)?;
    wtx.open_table(SCRIPT_PUBKEY_TO_WALLET_ID)?;
    wtx.open_table(TRANSACTION_KEY_TO_TRANSACTION)?;
    wtx.open_table(WALLET_ID_TO_WALLET)?;
    wtx.open_table(WALLET_NAME_TO_WALLET_ID)?;
    wtx.commit()?;

    log::debug!("opened wallet store at {}", path.display());

    Ok(Self { database })
  }

  fn load_wallet(&self, id: u32) -> Result<Option<Wallet>, StoreError> {
    let rtx = self.database.begin_read()?;

    let wallets = rtx.open_table(WALLET_ID_TO_WALLET)?;

    let Some(record) = wallets.get(id)? else {
      return Ok(None);
    };

    let mut wallet = decode::<Wallet>("WALLET_ID_TO_WALLET", record.value())?;

    let prefix = wallet_prefix(wallet.id);

    let addresses = rtx.open_table(ADDRESS_KEY_TO_ADDRESS)?;
    for entry in addresses.range::<&[u8]>(prefix.as_slice()..)? {
      let (key, value) = entry?;
      let Ok(key) = AddressKeyValue::try_from(key.value()) else {
        break;
      };
      if !key.starts_with(&prefix) {
        break;
      }

      let key = AddressKey::load(key);
      let address = decode::<HdAddress>("ADDRESS_KEY_TO_ADDRESS", value.value())?;

      let Some(account) = wallet.account_mut(key.account_key()) else {
        log::warn!("skipping address {} of unknown account {}", address.address, key.account);
        continue;
      };

      account.chain_mut(key.keychain).push(address);
    }

    let transactions = rtx.open_table(TRANSACTION_KEY_TO_TRANSACTION)?;
    for entry in transactions.range::<&[u8]>(prefix.as_slice()..)? {
      let (key, value) = entry?;
      let Ok(key) = TransactionKeyValue::try_from(key.value()) else {
        break;
      };
      if !key.starts_with(&prefix) {
        break;
      }

      let (key, _) = <(AddressKey, OutPoint)>::load(key);
      let transaction =
        decode::<TransactionData>("TRANSACTION_KEY_TO_TRANSACTION", value.value())?;

      match wallet.address_mut(key) {
        Some(address) => address.transactions.push(transaction),
        None => log::warn!("skipping transaction {} of unknown address", transaction.outpoint()),
      }
    }

    Ok(Some(wallet))
  }

  fn save_wallet(
    wtx: &WriteTransaction,
    wallet: &Wallet,
    include_transactions: bool,
  ) -> Result<(), StoreError> {
    wtx
      .open_table(WALLET_ID_TO_WALLET)?
      .insert(wallet.id.0, encode(wallet)?.as_slice())?;

    wtx
      .open_table(WALLET_NAME_TO_WALLET_ID)?
      .insert(name_key(&wallet.name).as_str(), wallet.id.0)?;

    for (key, address) in wallet.addresses() {
      Self::save_address(wtx, key, address)?;

      if include_transactions {
        Self::save_transactions(wtx, key, &address.transactions)?;
      }
    }

    Ok(())
  }

  fn save_address(
    wtx: &WriteTransaction,
    key: AddressKey,
    address: &HdAddress,
  ) -> Result<(), StoreError> {
    wtx
      .open_table(ADDRESS_KEY_TO_ADDRESS)?
      .insert(key.store().as_slice(), encode(address)?.as_slice())?;

    wtx
      .open_table(ADDRESS_TO_WALLET_ID)?
      .insert(address.address.as_str(), key.wallet.0)?;

    let mut scripts = wtx.open_table(SCRIPT_PUBKEY_TO_WALLET_ID)?;
    for script in address.scripts() {
      scripts.insert(script.as_bytes(), key.wallet.0)?;
    }

    Ok(())
  }

  fn save_transaction(
    wtx: &WriteTransaction,
    key: AddressKey,
    transaction: &TransactionData,
  ) -> Result<(), StoreError> {
    wtx.open_table(TRANSACTION_KEY_TO_TRANSACTION)?.insert(
      (key, transaction.outpoint()).store().as_slice(),
      encode(transaction)?.as_slice(),
    )?;

    Ok(())
  }

  /// Replaces every transaction record of the address at `key`.
  fn save_transactions(
    wtx: &WriteTransaction,
    key: AddressKey,
    transactions: &[TransactionData],
  ) -> Result<(), StoreError> {
    Self::remove_transactions(wtx, key)?;

    for transaction in transactions {
      Self::save_transaction(wtx, key, transaction)?;
    }

    Ok(())
  }

  fn remove_transactions(wtx: &WriteTransaction, key: AddressKey) -> Result<(), StoreError> {
    let mut table = wtx.open_table(TRANSACTION_KEY_TO_TRANSACTION)?;

    let (start, end) = transaction_range(key);

    let mut doomed = Vec::new();
    for entry in table.range::<&[u8]>(start.as_slice()..=end.as_slice())? {
      let (key, _) = entry?;
      doomed.push(key.value().to_vec());
    }

    for key in doomed {
      table.remove(key.as_slice())?;
    }

    Ok(())
  }

  fn save_last_synced_block(
    wtx: &WriteTransaction,
    wallet: WalletId,
    coin_type: u32,
    block: Option<BlockId>,
  ) -> Result<(), StoreError> {
    let mut wallets = wtx.open_table(WALLET_ID_TO_WALLET)?;

    let mut record = match wallets.get(wallet.0)? {
      Some(value) => decode::<Wallet>("WALLET_ID_TO_WALLET", value.value())?,
      None => return Err(StoreError::MissingWallet { wallet }),
    };

    if let Some(root) = record.root_mut(coin_type) {
      root.last_synced = block;
    }

    wallets.insert(wallet.0, encode(&record)?.as_slice())?;

    Ok(())
  }

  fn delete_wallet(wtx: &WriteTransaction, wallet: WalletId) -> Result<(), StoreError> {
    let record = {
      let mut wallets = wtx.open_table(WALLET_ID_TO_WALLET)?;
      let Some(record) = wallets.remove(wallet.0)? else {
        return Ok(());
      };
      decode::<Wallet>("WALLET_ID_TO_WALLET", record.value())?
    };

    wtx
      .open_table(WALLET_NAME_TO_WALLET_ID)?
      .remove(name_key(&record.name).as_str())?;

    let prefix = wallet_prefix(wallet);

    let mut addresses = wtx.open_table(ADDRESS_KEY_TO_ADDRESS)?;
    let mut doomed = Vec::new();
    for entry in addresses.range::<&[u8]>(prefix.as_slice()..)? {
      let (key, value) = entry?;
      if !key.value().starts_with(&prefix) {
        break;
      }
      doomed.push((
        key.value().to_vec(),
        decode::<HdAddress>("ADDRESS_KEY_TO_ADDRESS", value.value())?,
      ));
    }

    let mut address_to_wallet_id = wtx.open_table(ADDRESS_TO_WALLET_ID)?;
    let mut script_pubkey_to_wallet_id = wtx.open_table(SCRIPT_PUBKEY_TO_WALLET_ID)?;

    for (key, address) in doomed {
      addresses.remove(key.as_slice())?;
      address_to_wallet_id.remove(address.address.as_str())?;
      for script in address.scripts() {
        script_pubkey_to_wallet_id.remove(script.as_bytes())?;
      }
    }

    let mut transactions = wtx.open_table(TRANSACTION_KEY_TO_TRANSACTION)?;

    let mut doomed = Vec::new();
    for entry in transactions.range::<&[u8]>(prefix.as_slice()..)? {
      let (key, _) = entry?;
      if !key.value().starts_with(&prefix) {
        break;
      }
      doomed.push(key.value().to_vec());
    }

    for key in doomed {
      transactions.remove(key.as_slice())?;
    }

    Ok(())
  }

  fn apply(wtx: &WriteTransaction, op: Op) -> Result<(), StoreError> {
    match op {
      Op::DeleteWallet { wallet } => Self::delete_wallet(wtx, wallet),
      Op::RemoveTransaction { key, outpoint } => {
        wtx
          .open_table(TRANSACTION_KEY_TO_TRANSACTION)?
          .remove((key, outpoint).store().as_slice())?;
        Ok(())
      }
      Op::SaveAddress { key, address } => Self::save_address(wtx, key, &address),
      Op::SaveLastSyncedBlock {
        wallet,
        coin_type,
        block,
      } => Self::save_last_synced_block(wtx, wallet, coin_type, block),
      Op::SaveTransaction { key, transaction } => Self::save_transaction(wtx, key, &transaction),
      Op::SaveWallet {
        wallet,
        include_transactions,
      } => Self::save_wallet(wtx, &wallet, include_transactions),
    }
  }
}

impl WalletStore for RedbStore {
  fn wallet_names(&self) -> Result<Vec<String>, StoreError> {
    let rtx = self.database.begin_read()?;

    let mut names = Vec::new();
    for entry in rtx.open_table(WALLET_ID_TO_WALLET)?.iter()? {
      let (_, value) = entry?;
      names.push(decode::<Wallet>("WALLET_ID_TO_WALLET", value.value())?.name);
    }

    Ok(names)
  }

  fn wallet_by_name(&self, name: &str) -> Result<Option<Wallet>, StoreError> {
    let id = self
      .database
      .begin_read()?
      .open_table(WALLET_NAME_TO_WALLET_ID)?
      .get(name_key(name).as_str())?
      .map(|id| id.value());

    match id {
      Some(id) => self.load_wallet(id),
      None => Ok(None),
    }
  }

  fn wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, StoreError> {
    let id = self
      .database
      .begin_read()?
      .open_table(ADDRESS_TO_WALLET_ID)?
      .get(address)?
      .map(|id| id.value());

    match id {
      Some(id) => self.load_wallet(id),
      None => Ok(None),
    }
  }

  fn wallet_by_script(&self, script: &Script) -> Result<Option<Wallet>, StoreError> {
    let id = self
      .database
      .begin_read()?
      .open_table(SCRIPT_PUBKEY_TO_WALLET_ID)?
      .get(script.as_bytes())?
      .map(|id| id.value());

    match id {
      Some(id) => self.load_wallet(id),
      None => Ok(None),
    }
  }

  fn next_wallet_id(&self) -> Result<WalletId, StoreError> {
    let rtx = self.database.begin_read()?;
    let wallets = rtx.open_table(WALLET_ID_TO_WALLET)?;
    let last = wallets.last()?.map(|(id, _)| id.value());
    Ok(WalletId(last.map_or(0, |id| id + 1)))
  }

  fn commit(&self, batch: Batch) -> Result<(), StoreError> {
    if batch.is_empty() {
      return Ok(());
    }

    let ops = batch.len();
    let wtx = self.database.begin_write()?;

    for op in batch {
      Self::apply(&wtx, op)?;
    }

    wtx.commit()?;

    log::debug!("committed {ops} wallet store operations");

    Ok(())
  }
}
