use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Resync {
  #[arg(long, help = "Only forget transactions that are not in a block.")]
  unconfirmed: bool,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub removed: BTreeSet<Txid>,
  pub tip: Option<BlockId>,
}

impl Resync {
  pub(crate) fn run(self, settings: &Settings, name: &str) -> SubcommandResult {
    let manager = if self.unconfirmed {
      super::open(name, settings)?
    } else {
      open_manager(settings, core_chain(settings)?, None)?
    };

    let mut guard = manager.lock();

    let removed = if self.unconfirmed {
      guard.remove_unconfirmed_transactions(name)?
    } else {
      guard.remove_all_transactions(name)?
    };

    let tip = guard.wallet(name)?.last_synced(guard.coin_type());

    Ok(Some(Box::new(Output { removed, tip })))
  }
}
