use {super::*, bitcoin::merkle_tree::PartialMerkleTree};

/// An output paid to a wallet address.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
  pub txid: Txid,
  pub index: u32,
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub amount: Amount,
  pub script_pubkey: ScriptBuf,
  pub block_height: Option<u32>,
  pub block_hash: Option<BlockHash>,
  pub created_at: DateTime<Utc>,
  #[serde_as(as = "Option<serde_with::hex::Hex>")]
  pub transaction: Option<Vec<u8>>,
  #[serde_as(as = "Option<serde_with::hex::Hex>")]
  pub merkle_proof: Option<Vec<u8>>,
  pub is_propagated: bool,
  pub is_coinbase: bool,
  pub spending_details: Option<SpendingDetails>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingDetails {
  pub txid: Txid,
  pub payments: Vec<Payment>,
  pub block_height: Option<u32>,
  pub created_at: DateTime<Utc>,
  #[serde_as(as = "Option<serde_with::hex::Hex>")]
  pub transaction: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub destination: ScriptBuf,
  pub address: Option<String>,
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub amount: Amount,
}

impl TransactionData {
  pub fn outpoint(&self) -> OutPoint {
    OutPoint {
      txid: self.txid,
      vout: self.index,
    }
  }

  pub fn is_spendable(&self) -> bool {
    self.spending_details.is_none()
  }

  pub fn is_confirmed(&self) -> bool {
    self.block_height.is_some()
  }

  /// Confirmations as seen from a tip at `tip_height`, zero when unconfirmed.
  pub fn confirmations(&self, tip_height: u32) -> u32 {
    self
      .block_height
      .and_then(|height| tip_height.checked_sub(height))
      .map(|depth| depth + 1)
      .unwrap_or(0)
  }

  pub fn merkle_tree(&self) -> Option<PartialMerkleTree> {
    consensus::deserialize(self.merkle_proof.as_deref()?).ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn confirmations() {
    let mut data = test::transaction_data(test::txid(1), 0, 1000);
    assert_eq!(data.confirmations(100), 0);
    assert!(!data.is_confirmed());

    data.block_height = Some(100);
    assert_eq!(data.confirmations(100), 1);
    assert_eq!(data.confirmations(105), 6);
    assert_eq!(data.confirmations(99), 0);
  }

  #[test]
  fn spendable_until_spent() {
    let mut data = test::transaction_data(test::txid(1), 0, 1000);
    assert!(data.is_spendable());

    data.spending_details = Some(SpendingDetails {
      txid: test::txid(2),
      payments: Vec::new(),
      block_height: None,
      created_at: DateTime::<Utc>::UNIX_EPOCH,
      transaction: None,
    });

    assert!(!data.is_spendable());
  }

  #[test]
  fn amounts_serialize_as_sats() {
    let data = test::transaction_data(test::txid(1), 3, 12_345);
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["amount"], 12_345);
    assert_eq!(json["index"], 3);
    assert_eq!(serde_json::from_value::<TransactionData>(json).unwrap(), data);
  }
}
