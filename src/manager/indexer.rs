use super::*;

/// Where a transaction was seen confirmed. `block` is absent when only the
/// height is known.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Confirmation<'a> {
  pub(crate) height: u32,
  pub(crate) block: Option<&'a BlockContext>,
}

impl Confirmation<'_> {
  fn time(&self) -> Option<DateTime<Utc>> {
    self.block.map(|block| block.time)
  }
}

impl Unit<'_> {
  /// Credits outputs paying to wallet addresses and debits wallet outputs
  /// spent by inputs. Reprocessing a transaction with the same arguments
  /// changes nothing. Returns whether the transaction touches any wallet.
  pub(crate) fn process_transaction(
    &mut self,
    transaction: &Transaction,
    txid: Txid,
    confirmation: Option<Confirmation>,
    is_propagated: bool,
  ) -> Result<bool, WalletError> {
    let raw = self
      .config()
      .store_transactions
      .then(|| consensus::serialize(transaction));

    let (credited, received) =
      self.credit(transaction, txid, confirmation, is_propagated, raw.as_ref())?;

    let (debited, sent) = self.debit(transaction, txid, confirmation, raw.as_ref());

    if confirmation.is_some() {
      if received {
        self.notify(NotificationKind::Received, txid);
      }

      if sent {
        self.notify(NotificationKind::Sent, txid);
      }

      if received || sent {
        self.notify(NotificationKind::All, txid);
      }
    }

    Ok(credited || debited)
  }

  fn credit(
    &mut self,
    transaction: &Transaction,
    txid: Txid,
    confirmation: Option<Confirmation>,
    is_propagated: bool,
    raw: Option<&Vec<u8>>,
  ) -> Result<(bool, bool), WalletError> {
    let (mut touched, mut changed) = (false, false);

    for (vout, output) in (0..).zip(&transaction.output) {
      let Some(key) = self
        .state
        .index
        .resolve(&output.script_pubkey, self.state.chain)
      else {
        continue;
      };

      touched = true;

      let outpoint = OutPoint { txid, vout };

      let Some(address) = self.address_mut(key) else {
        log::warn!("index points {} at a missing address", output.script_pubkey);
        continue;
      };

      let was_used = address.is_used();

      let record = match address.transaction_mut(outpoint) {
        Some(existing) => {
          if !Self::update_output(existing, txid, confirmation, is_propagated) {
            continue;
          }
          existing.clone()
        }
        None => {
          let record = TransactionData {
            txid,
            index: vout,
            amount: output.value,
            script_pubkey: output.script_pubkey.clone(),
            block_height: confirmation.map(|confirmation| confirmation.height),
            block_hash: confirmation
              .and_then(|confirmation| confirmation.block)
              .map(|block| block.hash),
            created_at: confirmation
              .and_then(|confirmation| confirmation.time())
              .unwrap_or_else(Utc::now),
            transaction: raw.cloned(),
            merkle_proof: confirmation
              .and_then(|confirmation| confirmation.block)
              .and_then(|block| block.merkle_proof(txid)),
            is_propagated,
            is_coinbase: transaction.is_coinbase(),
            spending_details: None,
          };

          log::debug!(
            "credited {} to {} in {outpoint}",
            record.amount,
            address.address
          );

          address.transactions.push(record.clone());
          record
        }
      };

      changed = true;

      self.state.index.register_output(key, outpoint);
      self.batch.save_transaction(key, &record);

      if !was_used {
        self.ensure_lookahead(key.account_key(), key.keychain)?;
      }
    }

    Ok((touched, changed))
  }

  /// Applies confirmation data to an output seen before. Spending state is
  /// left alone.
  fn update_output(
    output: &mut TransactionData,
    txid: Txid,
    confirmation: Option<Confirmation>,
    is_propagated: bool,
  ) -> bool {
    let mut changed = false;

    if is_propagated && !output.is_propagated {
      output.is_propagated = true;
      changed = true;
    }

    let Some(confirmation) = confirmation else {
      return changed;
    };

    let block_hash = confirmation.block.map(|block| block.hash).or(output.block_hash);
    let created_at = confirmation.time().unwrap_or(output.created_at);
    let merkle_proof = confirmation
      .block
      .and_then(|block| block.merkle_proof(txid))
      .or_else(|| output.merkle_proof.clone());

    if output.block_height != Some(confirmation.height)
      || output.block_hash != block_hash
      || output.created_at != created_at
      || output.merkle_proof != merkle_proof
    {
      output.block_height = Some(confirmation.height);
      output.block_hash = block_hash;
      output.created_at = created_at;
      output.merkle_proof = merkle_proof;
      changed = true;
    }

    changed
  }

  fn debit(
    &mut self,
    transaction: &Transaction,
    txid: Txid,
    confirmation: Option<Confirmation>,
    raw: Option<&Vec<u8>>,
  ) -> (bool, bool) {
    let (mut touched, mut changed) = (false, false);

    for input in &transaction.input {
      let outpoint = input.previous_output;

      let Some(key) = self.state.index.lookup_outpoint(outpoint) else {
        continue;
      };

      touched = true;

      let payments = self.payments(transaction, key.wallet);

      let Some(output) = self
        .address_mut(key)
        .and_then(|address| address.transaction_mut(outpoint))
      else {
        log::warn!("index points {outpoint} at a missing output");
        continue;
      };

      let updated = match output.spending_details.as_mut() {
        None => {
          output.spending_details = Some(SpendingDetails {
            txid,
            payments,
            block_height: confirmation.map(|confirmation| confirmation.height),
            created_at: confirmation
              .and_then(|confirmation| confirmation.time())
              .unwrap_or_else(Utc::now),
            transaction: raw.cloned(),
          });
          log::debug!("{outpoint} spent by {txid}");
          true
        }
        Some(details) if details.txid == txid => match confirmation {
          Some(confirmation) => {
            let created_at = confirmation.time().unwrap_or(details.created_at);
            if details.block_height != Some(confirmation.height) || details.created_at != created_at
            {
              details.block_height = Some(confirmation.height);
              details.created_at = created_at;
              true
            } else {
              false
            }
          }
          None => false,
        },
        Some(details) => {
          log::warn!(
            "{outpoint} is already spent by {}, ignoring conflicting spend in {txid}",
            details.txid
          );
          false
        }
      };

      if updated {
        let record = output.clone();
        self.batch.save_transaction(key, &record);
        changed = true;
      }
    }

    (touched, changed)
  }

  /// Outputs of `transaction` that leave `wallet`. Change returning to the
  /// same wallet is not a payment.
  fn payments(&self, transaction: &Transaction, wallet: WalletId) -> Vec<Payment> {
    transaction
      .output
      .iter()
      .filter(|output| {
        !self
          .state
          .index
          .resolve(&output.script_pubkey, self.state.chain)
          .is_some_and(|key| key.wallet == wallet && key.keychain.is_change())
      })
      .map(|output| Payment {
        destination: output.script_pubkey.clone(),
        address: self
          .state
          .chain
          .address_from_script(&output.script_pubkey)
          .map(|address| address.to_string()),
        amount: output.value,
      })
      .collect()
  }
}
