use super::*;

#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Keychain {
  External,
  Internal,
}

impl Keychain {
  pub const ALL: [Keychain; 2] = [Keychain::External, Keychain::Internal];

  /// The BIP44 change level of this chain.
  pub fn index(self) -> u32 {
    match self {
      Self::External => 0,
      Self::Internal => 1,
    }
  }

  pub fn is_change(self) -> bool {
    self == Self::Internal
  }
}

impl Display for Keychain {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Self::External => write!(f, "external"),
      Self::Internal => write!(f, "internal"),
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
  pub wallet: WalletId,
  pub coin_type: u32,
  pub account: u32,
}

impl AccountKey {
  pub fn address(self, address: &HdAddress) -> AddressKey {
    AddressKey {
      wallet: self.wallet,
      coin_type: self.coin_type,
      account: self.account,
      keychain: address.keychain,
      index: address.index,
    }
  }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
  pub index: u32,
  pub name: String,
  pub hd_path: String,
  #[serde_as(as = "DisplayFromStr")]
  pub xpub: Xpub,
  pub created_at: DateTime<Utc>,
  #[serde(skip)]
  pub external: Vec<HdAddress>,
  #[serde(skip)]
  pub internal: Vec<HdAddress>,
}

impl Account {
  pub fn chain(&self, keychain: Keychain) -> &[HdAddress] {
    match keychain {
      Keychain::External => &self.external,
      Keychain::Internal => &self.internal,
    }
  }

  pub(crate) fn chain_mut(&mut self, keychain: Keychain) -> &mut Vec<HdAddress> {
    match keychain {
      Keychain::External => &mut self.external,
      Keychain::Internal => &mut self.internal,
    }
  }

  pub fn addresses(&self) -> impl Iterator<Item = &HdAddress> {
    self.external.iter().chain(&self.internal)
  }

  pub fn is_used(&self) -> bool {
    self.addresses().any(HdAddress::is_used)
  }

  pub fn last_used_index(&self, keychain: Keychain) -> Option<u32> {
    self
      .chain(keychain)
      .iter()
      .rev()
      .find(|address| address.is_used())
      .map(|address| address.index)
  }

  /// Number of unused addresses after the last used one.
  pub fn unused_tail(&self, keychain: Keychain) -> usize {
    let chain = self.chain(keychain);
    chain.len()
      - self
        .last_used_index(keychain)
        .and_then(|index| usize::try_from(index).ok())
        .map(|index| index + 1)
        .unwrap_or(0)
  }
}
