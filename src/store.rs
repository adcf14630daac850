use super::*;

pub use self::database::RedbStore;

mod database;
mod entry;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum StoreError {
  #[snafu(display("corrupt record in `{table}`"))]
  Corrupt {
    table: &'static str,
    source: serde_json::Error,
  },
  #[snafu(display("database error"))]
  Database { source: redb::Error },
  #[snafu(display("failed to encode record"))]
  Encode { source: serde_json::Error },
  #[snafu(display("I/O error at `{}`", path.display()))]
  Io { source: io::Error, path: PathBuf },
  #[snafu(display("wallet {wallet} is missing from the store"))]
  MissingWallet { wallet: WalletId },
}

macro_rules! from_redb {
  ($($error:ty),* $(,)?) => {
    $(
      impl From<$error> for StoreError {
        fn from(err: $error) -> Self {
          Self::Database { source: err.into() }
        }
      }
    )*
  };
}

from_redb!(
  redb::CommitError,
  redb::DatabaseError,
  redb::Error,
  redb::StorageError,
  redb::TableError,
  redb::TransactionError,
);

/// A single record change. Operations in a batch apply in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
  DeleteWallet {
    wallet: WalletId,
  },
  RemoveTransaction {
    key: AddressKey,
    outpoint: OutPoint,
  },
  SaveAddress {
    key: AddressKey,
    address: HdAddress,
  },
  SaveLastSyncedBlock {
    wallet: WalletId,
    coin_type: u32,
    block: Option<BlockId>,
  },
  SaveTransaction {
    key: AddressKey,
    transaction: TransactionData,
  },
  SaveWallet {
    wallet: Wallet,
    include_transactions: bool,
  },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
  ops: Vec<Op>,
}

impl Batch {
  pub fn save_wallet(&mut self, wallet: &Wallet, include_transactions: bool) {
    self.ops.push(Op::SaveWallet {
      wallet: wallet.clone(),
      include_transactions,
    });
  }

  pub fn save_address(&mut self, key: AddressKey, address: &HdAddress) {
    self.ops.push(Op::SaveAddress {
      key,
      address: address.clone(),
    });
  }

  pub fn save_transaction(&mut self, key: AddressKey, transaction: &TransactionData) {
    self.ops.push(Op::SaveTransaction {
      key,
      transaction: transaction.clone(),
    });
  }

  pub fn remove_transaction(&mut self, key: AddressKey, outpoint: OutPoint) {
    self.ops.push(Op::RemoveTransaction { key, outpoint });
  }

  pub fn save_last_synced_block(
    &mut self,
    wallet: WalletId,
    coin_type: u32,
    block: Option<BlockId>,
  ) {
    self.ops.push(Op::SaveLastSyncedBlock {
      wallet,
      coin_type,
      block,
    });
  }

  pub fn delete_wallet(&mut self, wallet: WalletId) {
    self.ops.push(Op::DeleteWallet { wallet });
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn ops(&self) -> &[Op] {
    &self.ops
  }
}

impl IntoIterator for Batch {
  type Item = Op;
  type IntoIter = std::vec::IntoIter<Op>;

  fn into_iter(self) -> Self::IntoIter {
    self.ops.into_iter()
  }
}

/// Durable wallet storage. `commit` applies a whole batch or nothing.
pub trait WalletStore: Send + Sync {
  fn wallet_names(&self) -> Result<Vec<String>, StoreError>;

  fn wallet_by_name(&self, name: &str) -> Result<Option<Wallet>, StoreError>;

  fn wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, StoreError>;

  fn wallet_by_script(&self, script: &Script) -> Result<Option<Wallet>, StoreError>;

  /// An id no stored wallet uses.
  fn next_wallet_id(&self) -> Result<WalletId, StoreError>;

  fn commit(&self, batch: Batch) -> Result<(), StoreError>;
}
