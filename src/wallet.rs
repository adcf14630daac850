use super::*;

pub use self::{
  account::{Account, AccountKey, Keychain},
  address::{AddressKey, HdAddress},
  transaction_data::{Payment, SpendingDetails, TransactionData},
};

mod account;
mod address;
mod transaction_data;

#[derive(
  Debug,
  Copy,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  derive_more::Display,
)]
#[serde(transparent)]
pub struct WalletId(pub u32);

/// An HD wallet: an encrypted seed plus one account tree per coin type.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
  pub id: WalletId,
  pub name: String,
  pub encrypted_seed: EncryptedSeed,
  #[serde_as(as = "serde_with::hex::Hex")]
  pub chain_code: [u8; 32],
  pub created_at: DateTime<Utc>,
  pub network: Network,
  pub account_roots: Vec<AccountRoot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRoot {
  pub coin_type: u32,
  pub last_synced: Option<BlockId>,
  pub accounts: Vec<Account>,
}

impl Wallet {
  pub fn root(&self, coin_type: u32) -> Option<&AccountRoot> {
    self
      .account_roots
      .iter()
      .find(|root| root.coin_type == coin_type)
  }

  pub(crate) fn root_mut(&mut self, coin_type: u32) -> Option<&mut AccountRoot> {
    self
      .account_roots
      .iter_mut()
      .find(|root| root.coin_type == coin_type)
  }

  pub fn last_synced(&self, coin_type: u32) -> Option<BlockId> {
    self.root(coin_type).and_then(|root| root.last_synced)
  }

  pub fn account(&self, key: AccountKey) -> Option<&Account> {
    self
      .root(key.coin_type)?
      .accounts
      .get(usize::try_from(key.account).ok()?)
  }

  pub(crate) fn account_mut(&mut self, key: AccountKey) -> Option<&mut Account> {
    self
      .root_mut(key.coin_type)?
      .accounts
      .get_mut(usize::try_from(key.account).ok()?)
  }

  pub fn address(&self, key: AddressKey) -> Option<&HdAddress> {
    self
      .account(key.account_key())?
      .chain(key.keychain)
      .get(usize::try_from(key.index).ok()?)
  }

  pub(crate) fn address_mut(&mut self, key: AddressKey) -> Option<&mut HdAddress> {
    self
      .account_mut(key.account_key())?
      .chain_mut(key.keychain)
      .get_mut(usize::try_from(key.index).ok()?)
  }

  pub fn accounts(&self) -> impl Iterator<Item = (AccountKey, &Account)> {
    self.account_roots.iter().flat_map(move |root| {
      root.accounts.iter().map(move |account| {
        (
          AccountKey {
            wallet: self.id,
            coin_type: root.coin_type,
            account: account.index,
          },
          account,
        )
      })
    })
  }

  /// Every address of every account, external chain before internal.
  pub fn addresses(&self) -> impl Iterator<Item = (AddressKey, &HdAddress)> {
    self.accounts().flat_map(|(key, account)| {
      account
        .addresses()
        .map(move |address| (key.address(address), address))
    })
  }

  pub fn transactions(&self) -> impl Iterator<Item = (AddressKey, &TransactionData)> {
    self.addresses().flat_map(|(key, address)| {
      address
        .transactions
        .iter()
        .map(move |transaction| (key, transaction))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wallet_serialization_omits_addresses() {
    let context = test::Context::new();
    let wallet = context.wallet("alice");

    let json = serde_json::to_string(&wallet).unwrap();
    let decoded = serde_json::from_str::<Wallet>(&json).unwrap();

    let account = decoded.account(context.account_key("alice")).unwrap();
    assert!(account.external.is_empty());
    assert!(account.internal.is_empty());
    assert_eq!(account.xpub, wallet.account(context.account_key("alice")).unwrap().xpub);
    assert_eq!(decoded.encrypted_seed, wallet.encrypted_seed);
  }

  #[test]
  fn addresses_are_keyed_by_position() {
    let context = test::Context::new();
    let wallet = context.wallet("alice");

    for (key, address) in wallet.addresses() {
      assert_eq!(key.wallet, wallet.id);
      assert_eq!(key.index, address.index);
      assert_eq!(key.keychain, address.keychain);
      assert_eq!(wallet.address(key), Some(address));
    }

    assert_eq!(wallet.addresses().count(), 40);
  }
}
