use super::*;

pub mod sync;
pub mod wallet;
pub mod wallets;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
  #[command(about = "Follow Bitcoin Core and index wallet transactions")]
  Sync(sync::Sync),
  #[command(about = "Wallet commands")]
  Wallet(wallet::WalletCommand),
  #[command(about = "List all wallets")]
  Wallets,
}

impl Subcommand {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    match self {
      Self::Sync(sync) => sync.run(settings),
      Self::Wallet(wallet) => wallet.run(settings),
      Self::Wallets => wallets::run(settings),
    }
  }
}

pub(crate) trait Output: Send {
  fn print_json(&self);
}

impl<T> Output for T
where
  T: Serialize + Send,
{
  fn print_json(&self) {
    serde_json::to_writer_pretty(io::stdout(), self).ok();
    println!();
  }
}

pub(crate) type SubcommandResult = Result<Option<Box<dyn Output>>>;

/// Opens the wallet database under the data dir and loads every wallet in it.
pub(crate) fn open_manager(
  settings: &Settings,
  chain: Arc<dyn ChainSource>,
  sink: Option<Arc<dyn NotificationSink>>,
) -> Result<Arc<WalletManager>> {
  let path = settings.database_path();

  let store = RedbStore::open(&path)
    .with_context(|| format!("failed to open wallet database at `{}`", path.display()))?;

  let mut manager = WalletManager::new(
    settings.manager_config(),
    Arc::new(store),
    chain,
    Arc::new(Bip32KeySource::new(settings.chain().network())),
  );

  if let Some(sink) = sink {
    manager = manager.with_sink(sink);
  }

  let manager = Arc::new(manager);

  manager.load()?;

  Ok(manager)
}

/// A chain source for commands that never consult the chain.
pub(crate) fn offline_chain() -> Arc<dyn ChainSource> {
  Arc::new(MemoryChain::default())
}

pub(crate) fn core_chain(settings: &Settings) -> Result<Arc<CoreChain>> {
  Ok(Arc::new(CoreChain::new(settings.bitcoin_rpc_client()?)))
}
