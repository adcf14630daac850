use {super::*, bitcoin::merkle_tree::PartialMerkleTree};

/// Per-block data shared by every transaction in the block.
#[derive(Debug, Clone)]
pub(crate) struct BlockContext {
  pub(crate) hash: BlockHash,
  pub(crate) time: DateTime<Utc>,
  txids: Vec<Txid>,
}

impl BlockContext {
  pub(crate) fn new(block: &Block) -> Self {
    Self {
      hash: block.block_hash(),
      time: timestamp(block.header.time),
      txids: block.txdata.iter().map(Transaction::compute_txid).collect(),
    }
  }

  /// Consensus-encoded partial merkle tree proving `txid` is in the block.
  pub(crate) fn merkle_proof(&self, txid: Txid) -> Option<Vec<u8>> {
    let position = self.txids.iter().position(|candidate| *candidate == txid)?;

    let matches = (0..self.txids.len())
      .map(|index| index == position)
      .collect::<Vec<bool>>();

    Some(consensus::serialize(&PartialMerkleTree::from_txids(
      &self.txids,
      &matches,
    )))
  }
}

impl WalletGuard<'_> {
  /// Applies a block that extends the wallet tip. A block that does not is
  /// rejected with [`WalletError::ReorgRequired`] when the tip fell off the
  /// best chain, with [`WalletError::BlockTooFarAhead`] when blocks are
  /// missing in between, and ignored otherwise.
  pub fn process_block(&mut self, block: &Block, height: u32) -> Result<(), WalletError> {
    let id = BlockId {
      height,
      hash: block.block_hash(),
    };

    if self.wallets.is_empty() {
      self.state.tip = Some(id);
      return Ok(());
    }

    if let Some(tip) = self.tip
      && block.header.prev_blockhash != tip.hash
    {
      if !self.manager.chain.contains(tip.hash)? {
        return Err(WalletError::ReorgRequired { tip: tip.hash });
      }

      if height > tip.height {
        return Err(WalletError::BlockTooFarAhead {
          hash: id.hash,
          height,
          tip_height: tip.height,
        });
      }

      log::debug!("ignoring block {id} behind wallet tip {tip}");

      return Ok(());
    }

    let context = BlockContext::new(block);

    self.unit(|unit| unit.apply_block(block, height, &context))
  }

  /// Rolls every wallet back to `fork`: outputs confirmed above it are
  /// forgotten and spends confirmed above it are undone.
  pub fn remove_blocks(&mut self, fork: BlockId) -> Result<(), WalletError> {
    let wallets = self.wallets.keys().copied().collect::<Vec<WalletId>>();

    let removed = self.unit(|unit| {
      let above = |height: Option<u32>| height.is_some_and(|height| height > fork.height);

      let mut removed = 0;
      for wallet in wallets {
        removed += unit
          .evict(
            wallet,
            |output| above(output.block_height),
            |spend| above(spend.block_height),
          )
          .len();
        unit.persist_cursor(wallet, Some(fork));
      }

      unit.set_tip(Some(fork));

      Ok(removed)
    })?;

    log::info!("rolled wallets back to {fork}, {removed} transactions affected");

    Ok(())
  }

  /// Walks back from the wallet tip to the last block still on the best
  /// chain.
  pub fn find_fork(&self) -> Result<Option<BlockId>, WalletError> {
    let Some(tip) = self.tip else {
      return Ok(None);
    };

    let chain = &self.manager.chain;

    let mut hash = tip.hash;
    loop {
      let header = chain
        .header(hash)?
        .ok_or(WalletError::UnknownBlock { hash })?;

      if chain.contains(hash)? {
        return Ok(Some(header.id()));
      }

      hash = header.prev_hash();
    }
  }
}

impl Unit<'_> {
  fn apply_block(
    &mut self,
    block: &Block,
    height: u32,
    context: &BlockContext,
  ) -> Result<(), WalletError> {
    let confirmation = Confirmation {
      height,
      block: Some(context),
    };

    let mut touched = 0;
    for (transaction, txid) in block.txdata.iter().zip(&context.txids) {
      if self.process_transaction(transaction, *txid, Some(confirmation), true)? {
        touched += 1;
      }
    }

    let id = BlockId {
      height,
      hash: context.hash,
    };

    let persist = !self.batch.is_empty();

    let wallets = self.state.wallets.keys().copied().collect::<Vec<WalletId>>();
    for wallet in wallets {
      if persist {
        self.persist_cursor(wallet, Some(id));
      } else {
        self.set_cursor(wallet, Some(id));
        self.journal.dirty(self.state);
        self.state.dirty.insert(wallet);
      }
    }

    self.set_tip(Some(id));

    if touched > 0 {
      log::info!("block {id} touched {touched} wallet transactions");
    } else {
      log::trace!("block {id} has no wallet transactions");
    }

    Ok(())
  }
}
