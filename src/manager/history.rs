use super::*;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub confirmed: Amount,
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub unconfirmed: Amount,
}

impl Balance {
  pub fn total(&self) -> Amount {
    self.confirmed + self.unconfirmed
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendableOutput {
  pub account: AccountKey,
  pub address: String,
  pub keychain: Keychain,
  pub outpoint: OutPoint,
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub amount: Amount,
  pub confirmations: u32,
  pub is_coinbase: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryKind {
  Mined,
  Received,
  Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
  pub kind: HistoryKind,
  pub txid: Txid,
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub amount: Amount,
  #[serde(with = "bitcoin::amount::serde::as_sat")]
  pub fee: Amount,
  pub block_height: Option<u32>,
  pub timestamp: DateTime<Utc>,
  pub address: Option<String>,
  pub payments: Vec<Payment>,
}

#[derive(Default)]
struct Spend {
  inputs: Amount,
  payments: Vec<Payment>,
  block_height: Option<u32>,
  timestamp: Option<DateTime<Utc>>,
}

impl WalletState {
  fn scoped_accounts(
    &self,
    name: &str,
    account: Option<u32>,
  ) -> Result<Vec<(AccountKey, &Account)>, WalletError> {
    let wallet = self.wallet(name)?;
    let coin_type = self.coin_type();

    let accounts = wallet
      .accounts()
      .filter(|(key, _)| {
        key.coin_type == coin_type && account.is_none_or(|account| key.account == account)
      })
      .collect::<Vec<(AccountKey, &Account)>>();

    if let Some(account) = account
      && accounts.is_empty()
    {
      return Err(WalletError::AccountNotFound {
        wallet: wallet.name.clone(),
        account,
      });
    }

    Ok(accounts)
  }

  fn outputs(
    &self,
    name: &str,
    account: Option<u32>,
  ) -> Result<Vec<(AccountKey, &HdAddress, &TransactionData)>, WalletError> {
    Ok(
      self
        .scoped_accounts(name, account)?
        .into_iter()
        .flat_map(|(key, account)| {
          account.addresses().flat_map(move |address| {
            address
              .transactions
              .iter()
              .map(move |transaction| (key, address, transaction))
          })
        })
        .collect(),
    )
  }

  /// Confirmed is the total of unspent confirmed outputs, unconfirmed the
  /// total of unspent outputs not yet in a block.
  pub fn balance(&self, name: &str, account: Option<u32>) -> Result<Balance, WalletError> {
    let mut balance = Balance::default();

    for (_, _, output) in self.outputs(name, account)? {
      if !output.is_spendable() {
        continue;
      }

      if output.is_confirmed() {
        balance.confirmed += output.amount;
      } else {
        balance.unconfirmed += output.amount;
      }
    }

    Ok(balance)
  }

  pub fn spendable_amount(&self, name: &str, confirmed_only: bool) -> Result<Amount, WalletError> {
    let balance = self.balance(name, None)?;

    Ok(if confirmed_only {
      balance.confirmed
    } else {
      balance.total()
    })
  }

  /// Unspent outputs with at least `min_confirmations`, counted from the
  /// wallet's sync cursor. Immature coinbase outputs are left out.
  pub fn spendable_outputs(
    &self,
    name: &str,
    account: Option<u32>,
    min_confirmations: u32,
  ) -> Result<Vec<SpendableOutput>, WalletError> {
    let tip_height = self
      .wallet(name)?
      .last_synced(self.coin_type())
      .map_or(0, |block| block.height);

    Ok(
      self
        .outputs(name, account)?
        .into_iter()
        .filter(|(_, _, output)| output.is_spendable())
        .map(|(key, address, output)| SpendableOutput {
          account: key,
          address: address.address.clone(),
          keychain: address.keychain,
          outpoint: output.outpoint(),
          amount: output.amount,
          confirmations: output.confirmations(tip_height),
          is_coinbase: output.is_coinbase,
        })
        .filter(|output| {
          output.confirmations >= min_confirmations
            && !(output.is_coinbase && output.confirmations < COINBASE_MATURITY)
        })
        .collect(),
    )
  }

  /// Received and mined outputs of non-change addresses plus one item per
  /// spending transaction, newest first. The fee of a spend is what its
  /// wallet inputs carried beyond its payments and change, or zero when that
  /// comes out negative.
  pub fn history(&self, name: &str, account: Option<u32>) -> Result<Vec<HistoryItem>, WalletError> {
    let outputs = self.outputs(name, account)?;

    let mut items = Vec::new();
    let mut spends = BTreeMap::<Txid, Spend>::new();
    let mut change = BTreeMap::<Txid, Amount>::new();

    for (_, address, output) in &outputs {
      if address.is_change() {
        *change.entry(output.txid).or_default() += output.amount;
      } else {
        items.push(HistoryItem {
          kind: if output.is_coinbase {
            HistoryKind::Mined
          } else {
            HistoryKind::Received
          },
          txid: output.txid,
          amount: output.amount,
          fee: Amount::ZERO,
          block_height: output.block_height,
          timestamp: output.created_at,
          address: Some(address.address.clone()),
          payments: Vec::new(),
        });
      }

      if let Some(details) = &output.spending_details {
        let spend = spends.entry(details.txid).or_default();
        spend.inputs += output.amount;
        if spend.timestamp.is_none() {
          spend.payments = details.payments.clone();
          spend.block_height = details.block_height;
          spend.timestamp = Some(details.created_at);
        }
      }
    }

    for (txid, spend) in spends {
      let paid = spend
        .payments
        .iter()
        .map(|payment| payment.amount)
        .sum::<Amount>();

      let fee = spend
        .inputs
        .checked_sub(paid)
        .and_then(|rest| rest.checked_sub(change.get(&txid).copied().unwrap_or_default()))
        .unwrap_or(Amount::ZERO);

      items.push(HistoryItem {
        kind: HistoryKind::Sent,
        txid,
        amount: paid,
        fee,
        block_height: spend.block_height,
        timestamp: spend.timestamp.unwrap_or_default(),
        address: None,
        payments: spend.payments,
      });
    }

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(items)
  }
}
