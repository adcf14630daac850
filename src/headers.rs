use super::*;

pub use self::rpc::CoreChain;

mod rpc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
  pub height: u32,
  pub hash: BlockHash,
}

impl Display for BlockId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}@{}", self.hash, self.height)
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChainHeader {
  pub height: u32,
  pub header: Header,
}

impl ChainHeader {
  pub fn hash(&self) -> BlockHash {
    self.header.block_hash()
  }

  pub fn prev_hash(&self) -> BlockHash {
    self.header.prev_blockhash
  }

  pub fn id(&self) -> BlockId {
    BlockId {
      height: self.height,
      hash: self.hash(),
    }
  }

  pub fn time(&self) -> DateTime<Utc> {
    timestamp(self.header.time)
  }
}

/// The node's view of the best header chain.
pub trait ChainSource: Send + Sync {
  /// Looks up a header by hash, including headers no longer on the best chain.
  fn header(&self, hash: BlockHash) -> Result<Option<ChainHeader>, WalletError>;

  fn header_at(&self, height: u32) -> Result<Option<ChainHeader>, WalletError>;

  fn tip(&self) -> Result<Option<ChainHeader>, WalletError>;

  fn contains(&self, hash: BlockHash) -> Result<bool, WalletError>;

  fn is_downloaded(&self) -> Result<bool, WalletError> {
    Ok(true)
  }

  /// Height of the first block with a timestamp at or after `time`, or the
  /// height after the tip when no such block exists yet.
  fn height_at_time(&self, time: DateTime<Utc>) -> Result<u32, WalletError> {
    let Some(tip) = self.tip()? else {
      return Ok(0);
    };

    let (mut low, mut high) = (0, tip.height + 1);

    while low < high {
      let middle = low + (high - low) / 2;

      let header = self
        .header_at(middle)?
        .ok_or(WalletError::UnknownBlock { hash: tip.hash() })?;

      if header.time() < time {
        low = middle + 1;
      } else {
        high = middle;
      }
    }

    Ok(low)
  }
}

/// An in-process header chain, for embedders that already track headers and
/// for tests.
#[derive(Debug, Default)]
pub struct MemoryChain {
  inner: RwLock<MemoryChainInner>,
}

#[derive(Debug, Default)]
struct MemoryChainInner {
  best: Vec<Header>,
  known: HashMap<BlockHash, ChainHeader>,
}

impl MemoryChain {
  pub fn push(&self, header: Header) -> ChainHeader {
    let mut inner = self.inner.write().unwrap();

    let height = u32::try_from(inner.best.len()).unwrap_or(u32::MAX);
    let entry = ChainHeader { height, header };

    inner.best.push(header);
    inner.known.insert(entry.hash(), entry);

    entry
  }

  /// Drops every header above `height` from the best chain. Dropped headers
  /// stay known so stale tips can still be walked back.
  pub fn truncate(&self, height: u32) {
    let len = usize::try_from(height).map(|height| height + 1).unwrap_or(usize::MAX);
    self.inner.write().unwrap().best.truncate(len);
  }
}

impl ChainSource for MemoryChain {
  fn header(&self, hash: BlockHash) -> Result<Option<ChainHeader>, WalletError> {
    Ok(self.inner.read().unwrap().known.get(&hash).copied())
  }

  fn header_at(&self, height: u32) -> Result<Option<ChainHeader>, WalletError> {
    let inner = self.inner.read().unwrap();
    Ok(
      usize::try_from(height)
        .ok()
        .and_then(|position| inner.best.get(position))
        .map(|header| ChainHeader {
          height,
          header: *header,
        }),
    )
  }

  fn tip(&self) -> Result<Option<ChainHeader>, WalletError> {
    let inner = self.inner.read().unwrap();
    Ok(inner.best.last().map(|header| ChainHeader {
      height: u32::try_from(inner.best.len() - 1).unwrap_or(u32::MAX),
      header: *header,
    }))
  }

  fn contains(&self, hash: BlockHash) -> Result<bool, WalletError> {
    let inner = self.inner.read().unwrap();
    Ok(
      inner
        .known
        .get(&hash)
        .and_then(|entry| inner.best.get(usize::try_from(entry.height).ok()?))
        .is_some_and(|header| header.block_hash() == hash),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chain(times: &[u32]) -> MemoryChain {
    let chain = MemoryChain::default();
    let mut prev = BlockHash::all_zeros();
    for time in times {
      prev = chain.push(test::header(prev, *time)).hash();
    }
    chain
  }

  #[test]
  fn truncated_headers_leave_the_best_chain() {
    let chain = chain(&[10, 20, 30]);
    let stale = chain.header_at(2).unwrap().unwrap();

    chain.truncate(1);

    assert!(!chain.contains(stale.hash()).unwrap());
    assert_eq!(chain.header(stale.hash()).unwrap(), Some(stale));
    assert_eq!(chain.tip().unwrap().unwrap().height, 1);
    assert!(chain.header_at(2).unwrap().is_none());
  }

  #[test]
  fn height_at_time() {
    let chain = chain(&[10, 20, 30, 40]);

    assert_eq!(chain.height_at_time(timestamp(0)).unwrap(), 0);
    assert_eq!(chain.height_at_time(timestamp(10)).unwrap(), 0);
    assert_eq!(chain.height_at_time(timestamp(25)).unwrap(), 2);
    assert_eq!(chain.height_at_time(timestamp(40)).unwrap(), 3);
    assert_eq!(chain.height_at_time(timestamp(41)).unwrap(), 4);
    assert_eq!(
      MemoryChain::default().height_at_time(timestamp(41)).unwrap(),
      0
    );
  }
}
