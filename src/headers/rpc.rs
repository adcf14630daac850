use {
  super::*,
  bitcoincore_rpc::{Client, RpcApi, jsonrpc},
};

pub(crate) trait BitcoinCoreRpcResultExt<T> {
  fn into_option(self) -> Result<Option<T>, bitcoincore_rpc::Error>;
}

impl<T> BitcoinCoreRpcResultExt<T> for Result<T, bitcoincore_rpc::Error> {
  fn into_option(self) -> Result<Option<T>, bitcoincore_rpc::Error> {
    match self {
      Ok(ok) => Ok(Some(ok)),
      Err(bitcoincore_rpc::Error::JsonRpc(jsonrpc::error::Error::Rpc(
        jsonrpc::error::RpcError { code: -8, .. },
      ))) => Ok(None),
      Err(bitcoincore_rpc::Error::JsonRpc(jsonrpc::error::Error::Rpc(
        jsonrpc::error::RpcError { code: -5, .. },
      ))) => Ok(None),
      Err(err) => Err(err),
    }
  }
}

/// Header chain served by Bitcoin Core over JSON-RPC.
pub struct CoreChain {
  client: Client,
}

impl CoreChain {
  pub fn new(client: Client) -> Self {
    Self { client }
  }

  pub fn block(&self, hash: BlockHash) -> Result<Block, WalletError> {
    self.client.get_block(&hash).map_err(WalletError::chain)
  }

  /// Fetches the block at `height`, retrying with exponential backoff while
  /// the node is unreachable.
  pub fn block_at(&self, height: u32) -> Result<Option<(ChainHeader, Block)>, WalletError> {
    let mut errors = 0;
    loop {
      let result = self
        .client
        .get_block_hash(height.into())
        .into_option()
        .and_then(|hash| {
          hash
            .map(|hash| self.client.get_block(&hash))
            .transpose()
        });

      match result {
        Ok(block) => {
          return Ok(block.map(|block| {
            (
              ChainHeader {
                height,
                header: block.header,
              },
              block,
            )
          }));
        }
        Err(err) => {
          if cfg!(test) {
            return Err(WalletError::chain(err));
          }

          errors += 1;
          let seconds = 1 << errors;
          log::warn!("failed to fetch block {height}, retrying in {seconds}s: {err}");

          if seconds > 120 {
            log::error!("would sleep for more than 120s, giving up");
            return Err(WalletError::chain(err));
          }

          thread::sleep(Duration::from_secs(seconds));
        }
      }
    }
  }
}

impl ChainSource for CoreChain {
  fn header(&self, hash: BlockHash) -> Result<Option<ChainHeader>, WalletError> {
    let Some(info) = self
      .client
      .get_block_header_info(&hash)
      .into_option()
      .map_err(WalletError::chain)?
    else {
      return Ok(None);
    };

    Ok(Some(ChainHeader {
      height: u32::try_from(info.height).map_err(WalletError::chain)?,
      header: self
        .client
        .get_block_header(&hash)
        .map_err(WalletError::chain)?,
    }))
  }

  fn header_at(&self, height: u32) -> Result<Option<ChainHeader>, WalletError> {
    let Some(hash) = self
      .client
      .get_block_hash(height.into())
      .into_option()
      .map_err(WalletError::chain)?
    else {
      return Ok(None);
    };

    Ok(Some(ChainHeader {
      height,
      header: self
        .client
        .get_block_header(&hash)
        .map_err(WalletError::chain)?,
    }))
  }

  fn tip(&self) -> Result<Option<ChainHeader>, WalletError> {
    let hash = self
      .client
      .get_best_block_hash()
      .map_err(WalletError::chain)?;

    self.header(hash)
  }

  fn contains(&self, hash: BlockHash) -> Result<bool, WalletError> {
    Ok(
      self
        .client
        .get_block_header_info(&hash)
        .into_option()
        .map_err(WalletError::chain)?
        .is_some_and(|info| info.confirmations >= 0),
    )
  }

  fn is_downloaded(&self) -> Result<bool, WalletError> {
    Ok(
      !self
        .client
        .get_blockchain_info()
        .map_err(WalletError::chain)?
        .initial_block_download,
    )
  }
}
