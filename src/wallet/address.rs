use super::*;

/// Position of an address in the wallet arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressKey {
  pub wallet: WalletId,
  pub coin_type: u32,
  pub account: u32,
  pub keychain: Keychain,
  pub index: u32,
}

impl AddressKey {
  pub fn account_key(self) -> AccountKey {
    AccountKey {
      wallet: self.wallet,
      coin_type: self.coin_type,
      account: self.account,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdAddress {
  pub index: u32,
  pub hd_path: String,
  pub keychain: Keychain,
  pub script_pubkey: ScriptBuf,
  pub pubkey: Option<ScriptBuf>,
  pub address: String,
  #[serde(skip)]
  pub transactions: Vec<TransactionData>,
}

impl HdAddress {
  pub fn is_used(&self) -> bool {
    !self.transactions.is_empty()
  }

  pub fn is_change(&self) -> bool {
    self.keychain.is_change()
  }

  pub fn transaction(&self, outpoint: OutPoint) -> Option<&TransactionData> {
    self
      .transactions
      .iter()
      .find(|transaction| transaction.outpoint() == outpoint)
  }

  pub(crate) fn transaction_mut(&mut self, outpoint: OutPoint) -> Option<&mut TransactionData> {
    self
      .transactions
      .iter_mut()
      .find(|transaction| transaction.outpoint() == outpoint)
  }

  pub(crate) fn scripts(&self) -> impl Iterator<Item = &ScriptBuf> {
    std::iter::once(&self.script_pubkey).chain(self.pubkey.as_ref())
  }
}
