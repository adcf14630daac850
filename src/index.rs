use super::*;

/// Lookup maps from scripts, address strings and outpoints to positions in
/// the wallet arena. Everything here can be rebuilt from the wallets alone.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AddressIndex {
  addresses: HashMap<String, AddressKey>,
  outpoints: HashMap<OutPoint, AddressKey>,
  scripts: HashMap<ScriptBuf, AddressKey>,
}

impl AddressIndex {
  pub fn build<'a>(wallets: impl IntoIterator<Item = &'a Wallet>) -> Self {
    let mut index = Self::default();

    for wallet in wallets {
      for (key, address) in wallet.addresses() {
        index.register(key, address);
      }
    }

    index
  }

  /// Registers an address and every output it holds. Registering the same
  /// address twice leaves the index unchanged.
  pub fn register(&mut self, key: AddressKey, address: &HdAddress) {
    for script in address.scripts() {
      self.scripts.insert(script.clone(), key);
    }

    self.addresses.insert(address.address.clone(), key);

    for transaction in &address.transactions {
      self.outpoints.insert(transaction.outpoint(), key);
    }
  }

  pub fn register_output(&mut self, key: AddressKey, outpoint: OutPoint) {
    self.outpoints.insert(outpoint, key);
  }

  pub fn unregister_output(&mut self, outpoint: OutPoint) {
    self.outpoints.remove(&outpoint);
  }

  pub fn unregister_wallet(&mut self, wallet: WalletId) {
    self.addresses.retain(|_, key| key.wallet != wallet);
    self.outpoints.retain(|_, key| key.wallet != wallet);
    self.scripts.retain(|_, key| key.wallet != wallet);
  }

  pub fn lookup_script(&self, script: &Script) -> Option<AddressKey> {
    self.scripts.get(script).copied()
  }

  pub fn lookup_address(&self, address: &str) -> Option<AddressKey> {
    self.addresses.get(address).copied()
  }

  pub fn lookup_outpoint(&self, outpoint: OutPoint) -> Option<AddressKey> {
    self.outpoints.get(&outpoint).copied()
  }

  /// Resolves an output script to its owning address, falling back to the
  /// address string for script forms that were not registered directly.
  pub fn resolve(&self, script: &Script, chain: Chain) -> Option<AddressKey> {
    self.lookup_script(script).or_else(|| {
      chain
        .address_from_script(script)
        .and_then(|address| self.lookup_address(&address.to_string()))
    })
  }

  pub fn scripts(&self) -> usize {
    self.scripts.len()
  }

  pub fn outputs(&self) -> usize {
    self.outpoints.len()
  }
}
