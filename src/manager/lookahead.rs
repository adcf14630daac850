use super::*;

impl Unit<'_> {
  /// Derives addresses until `keychain` of `account` ends in at least
  /// `lookahead` unused addresses. Returns the keys of new addresses.
  pub(crate) fn ensure_lookahead(
    &mut self,
    account: AccountKey,
    keychain: Keychain,
  ) -> Result<Vec<AddressKey>, WalletError> {
    let unused = self.account(account)?.unused_tail(keychain);
    let missing = self.config().lookahead.saturating_sub(unused);
    self.derive_addresses(account, keychain, missing)
  }

  /// The first `count` unused addresses of a chain, with the lookahead kept
  /// past the last one returned.
  pub(crate) fn unused_addresses(
    &mut self,
    account: AccountKey,
    keychain: Keychain,
    count: usize,
  ) -> Result<Vec<AddressKey>, WalletError> {
    let mut keys = self
      .account(account)?
      .chain(keychain)
      .iter()
      .filter(|address| !address.is_used())
      .take(count)
      .map(|address| account.address(address))
      .collect::<Vec<AddressKey>>();

    let missing = count - keys.len();
    keys.extend(self.derive_addresses(account, keychain, missing)?);

    self.extend_past(account, keychain, &keys)?;

    Ok(keys)
  }

  /// Derives `count` addresses past the end of a chain, with the lookahead
  /// kept past them.
  pub(crate) fn new_addresses(
    &mut self,
    account: AccountKey,
    keychain: Keychain,
    count: usize,
  ) -> Result<Vec<AddressKey>, WalletError> {
    let keys = self.derive_addresses(account, keychain, count)?;
    self.extend_past(account, keychain, &keys)?;
    Ok(keys)
  }

  fn extend_past(
    &mut self,
    account: AccountKey,
    keychain: Keychain,
    keys: &[AddressKey],
  ) -> Result<(), WalletError> {
    let Some(last) = keys
      .iter()
      .map(|key| key.index)
      .max()
      .and_then(|index| usize::try_from(index).ok())
    else {
      return Ok(());
    };

    let tail = self
      .account(account)?
      .chain(keychain)
      .len()
      .saturating_sub(last + 1);

    let missing = self.config().lookahead.saturating_sub(tail);
    self.derive_addresses(account, keychain, missing)?;

    Ok(())
  }

  fn account(&self, key: AccountKey) -> Result<&Account, WalletError> {
    self
      .state
      .wallets
      .get(&key.wallet)
      .and_then(|wallet| wallet.account(key))
      .ok_or_else(|| WalletError::AccountNotFound {
        wallet: self.wallet_name(key.wallet),
        account: key.account,
      })
  }

  fn derive_addresses(
    &mut self,
    key: AccountKey,
    keychain: Keychain,
    count: usize,
  ) -> Result<Vec<AddressKey>, WalletError> {
    if count == 0 {
      return Ok(Vec::new());
    }

    let account = self.account(key)?;
    let (xpub, hd_path, next) = (
      account.xpub,
      account.hd_path.clone(),
      account.chain(keychain).len(),
    );

    let mut keys = Vec::with_capacity(count);

    for position in next..next + count {
      let index = u32::try_from(position).map_err(|_| WalletError::InvalidArgument {
        message: format!("{keychain} chain of account {} is full", key.account),
      })?;

      let derived = self.manager.keys.derive_address(&xpub, keychain, index)?;

      let address = HdAddress {
        index,
        hd_path: format!("{hd_path}/{}/{index}", keychain.index()),
        keychain,
        script_pubkey: derived.script_pubkey,
        pubkey: Some(derived.pubkey),
        address: derived.address.to_string(),
        transactions: Vec::new(),
      };

      let address_key = key.address(&address);

      self.journal.address(self.state, address_key);

      self.state.index.register(address_key, &address);
      self.batch.save_address(address_key, &address);

      if let Some(account) = self
        .state
        .wallets
        .get_mut(&key.wallet)
        .and_then(|wallet| wallet.account_mut(key))
      {
        account.chain_mut(keychain).push(address);
      }

      keys.push(address_key);
    }

    log::debug!(
      "derived {count} {keychain} addresses for account {} of wallet `{}`",
      key.account,
      self.wallet_name(key.wallet)
    );

    Ok(keys)
  }
}
