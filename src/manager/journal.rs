use super::*;

/// Before-images of everything a unit of work touched, so a failed commit
/// can put the arena back the way it was.
#[derive(Debug, Default)]
pub(super) struct Journal {
  addresses: BTreeMap<AddressKey, Option<HdAddress>>,
  cursors: BTreeMap<WalletId, Option<BlockId>>,
  dirty: Option<BTreeSet<WalletId>>,
  tip: Option<Option<BlockId>>,
  wallets: BTreeMap<WalletId, Option<Wallet>>,
}

impl Journal {
  /// Records an address before its first change. `None` marks an address
  /// created by this unit.
  pub(super) fn address(&mut self, state: &WalletState, key: AddressKey) {
    if self.wallets.contains_key(&key.wallet) || self.addresses.contains_key(&key) {
      return;
    }

    let image = state
      .wallets
      .get(&key.wallet)
      .and_then(|wallet| wallet.address(key))
      .cloned();

    self.addresses.insert(key, image);
  }

  pub(super) fn cursor(&mut self, state: &WalletState, wallet: WalletId) {
    if self.wallets.contains_key(&wallet) || self.cursors.contains_key(&wallet) {
      return;
    }

    let image = state
      .wallets
      .get(&wallet)
      .and_then(|wallet| wallet.last_synced(state.coin_type()));

    self.cursors.insert(wallet, image);
  }

  pub(super) fn dirty(&mut self, state: &WalletState) {
    self.dirty.get_or_insert_with(|| state.dirty.clone());
  }

  pub(super) fn tip(&mut self, state: &WalletState) {
    self.tip.get_or_insert(state.tip);
  }

  /// Records a whole wallet. Finer images taken earlier for the same wallet
  /// are folded into it.
  pub(super) fn wallet(&mut self, state: &WalletState, wallet: WalletId) {
    if self.wallets.contains_key(&wallet) {
      return;
    }

    let image = state.wallets.get(&wallet).cloned().map(|mut image| {
      for (key, address) in self.addresses.iter().filter(|(key, _)| key.wallet == wallet) {
        Self::restore_address(&mut image, *key, address.clone());
      }

      if let Some(cursor) = self.cursors.get(&wallet)
        && let Some(root) = image.root_mut(state.coin_type())
      {
        root.last_synced = *cursor;
      }

      image
    });

    self.addresses.retain(|key, _| key.wallet != wallet);
    self.cursors.remove(&wallet);
    self.wallets.insert(wallet, image);
  }

  fn restore_address(wallet: &mut Wallet, key: AddressKey, image: Option<HdAddress>) {
    let Some(account) = wallet.account_mut(key.account_key()) else {
      return;
    };

    let chain = account.chain_mut(key.keychain);

    match image {
      Some(address) => {
        if let Some(slot) = usize::try_from(key.index)
          .ok()
          .and_then(|index| chain.get_mut(index))
        {
          *slot = address;
        }
      }
      None => {
        if let Ok(index) = usize::try_from(key.index) {
          chain.truncate(index);
        }
      }
    }
  }

  pub(super) fn rollback(self, state: &mut WalletState) {
    let coin_type = state.coin_type();

    for (id, image) in self.wallets {
      match image {
        Some(wallet) => {
          state.wallets.insert(id, wallet);
        }
        None => {
          state.wallets.remove(&id);
        }
      }
    }

    for (key, image) in self.addresses {
      if let Some(wallet) = state.wallets.get_mut(&key.wallet) {
        Self::restore_address(wallet, key, image);
      }
    }

    for (id, cursor) in self.cursors {
      if let Some(root) = state
        .wallets
        .get_mut(&id)
        .and_then(|wallet| wallet.root_mut(coin_type))
      {
        root.last_synced = cursor;
      }
    }

    if let Some(tip) = self.tip {
      state.tip = tip;
    }

    if let Some(dirty) = self.dirty {
      state.dirty = dirty;
    }
  }
}
