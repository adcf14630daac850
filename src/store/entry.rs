use super::*;

pub(super) trait Entry: Sized {
  type Value;

  fn load(value: Self::Value) -> Self;

  fn store(self) -> Self::Value;
}

pub(super) type AddressKeyValue = [u8; 17];

impl Entry for AddressKey {
  type Value = AddressKeyValue;

  fn load(value: Self::Value) -> Self {
    let word = |offset: usize| {
      let mut bytes = [0; 4];
      bytes.copy_from_slice(&value[offset..offset + 4]);
      u32::from_be_bytes(bytes)
    };

    Self {
      wallet: WalletId(word(0)),
      coin_type: word(4),
      account: word(8),
      keychain: if value[12] == 0 {
        Keychain::External
      } else {
        Keychain::Internal
      },
      index: word(13),
    }
  }

  fn store(self) -> Self::Value {
    let mut value = [0; 17];
    value[0..4].copy_from_slice(&self.wallet.0.to_be_bytes());
    value[4..8].copy_from_slice(&self.coin_type.to_be_bytes());
    value[8..12].copy_from_slice(&self.account.to_be_bytes());
    value[12] = match self.keychain {
      Keychain::External => 0,
      Keychain::Internal => 1,
    };
    value[13..17].copy_from_slice(&self.index.to_be_bytes());
    value
  }
}

pub(super) type TransactionKeyValue = [u8; 53];

/// A transaction record is keyed by its address followed by its outpoint, so
/// the records of one address form a contiguous range.
impl Entry for (AddressKey, OutPoint) {
  type Value = TransactionKeyValue;

  fn load(value: Self::Value) -> Self {
    let mut address = [0; 17];
    address.copy_from_slice(&value[0..17]);

    let mut txid = [0; 32];
    txid.copy_from_slice(&value[17..49]);

    let mut vout = [0; 4];
    vout.copy_from_slice(&value[49..53]);

    (
      AddressKey::load(address),
      OutPoint {
        txid: Txid::from_byte_array(txid),
        vout: u32::from_be_bytes(vout),
      },
    )
  }

  fn store(self) -> Self::Value {
    let (address, outpoint) = self;
    let mut value = [0; 53];
    value[0..17].copy_from_slice(&address.store());
    value[17..49].copy_from_slice(&outpoint.txid.to_byte_array());
    value[49..53].copy_from_slice(&outpoint.vout.to_be_bytes());
    value
  }
}

/// Bounds of the transaction records stored under `address`.
pub(super) fn transaction_range(address: AddressKey) -> (TransactionKeyValue, TransactionKeyValue) {
  let mut start = [0; 53];
  start[0..17].copy_from_slice(&address.store());

  let mut end = [u8::MAX; 53];
  end[0..17].copy_from_slice(&address.store());

  (start, end)
}

pub(super) fn wallet_prefix(wallet: WalletId) -> [u8; 4] {
  wallet.0.to_be_bytes()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn address_keys_sort_by_position() {
    let key = |account, keychain, index| AddressKey {
      wallet: WalletId(1),
      coin_type: 1,
      account,
      keychain,
      index,
    };

    let mut keys = vec![
      key(1, Keychain::External, 0),
      key(0, Keychain::Internal, 0),
      key(0, Keychain::External, 256),
      key(0, Keychain::External, 2),
    ];

    let mut encoded = keys.iter().map(|key| key.store()).collect::<Vec<_>>();
    encoded.sort();
    keys.sort();

    assert_eq!(
      encoded.into_iter().map(AddressKey::load).collect::<Vec<_>>(),
      keys
    );
    assert!(key(0, Keychain::External, 0).store().starts_with(&wallet_prefix(WalletId(1))));
  }

  #[test]
  fn transaction_keys_group_by_address() {
    let address = AddressKey {
      wallet: WalletId(3),
      coin_type: 1,
      account: 0,
      keychain: Keychain::Internal,
      index: 9,
    };

    let outpoint = OutPoint {
      txid: Txid::from_byte_array([0xab; 32]),
      vout: 258,
    };

    let value = (address, outpoint).store();
    let (start, end) = transaction_range(address);

    assert_eq!(<(AddressKey, OutPoint)>::load(value), (address, outpoint));
    assert!(start <= value && value <= end);
    assert!(value.starts_with(&address.store()));

    let next = AddressKey { index: 10, ..address };
    assert!((next, OutPoint::null()).store() > end);
  }
}
