use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
  #[arg(long, help = "Authenticate to Bitcoin Core RPC with <BITCOIN_RPC_PASSWORD>.")]
  pub(crate) bitcoin_rpc_password: Option<String>,
  #[arg(long, help = "Connect to Bitcoin Core RPC at <BITCOIN_RPC_URL>.")]
  pub(crate) bitcoin_rpc_url: Option<String>,
  #[arg(long, help = "Authenticate to Bitcoin Core RPC as <BITCOIN_RPC_USERNAME>.")]
  pub(crate) bitcoin_rpc_username: Option<String>,
  #[arg(long = "chain", value_enum, help = "Use <CHAIN>. [default: mainnet]")]
  pub(crate) chain_argument: Option<Chain>,
  #[arg(long, help = "Load configuration from <CONFIG>.")]
  pub(crate) config: Option<PathBuf>,
  #[arg(long, help = "Load configuration from <CONFIG_DIR>.")]
  pub(crate) config_dir: Option<PathBuf>,
  #[arg(long, help = "Load Bitcoin Core RPC cookie file from <COOKIE_FILE>.")]
  pub(crate) cookie_file: Option<PathBuf>,
  #[arg(long, alias = "datadir", help = "Store wallets in <DATA_DIR>.")]
  pub(crate) data_dir: Option<PathBuf>,
  #[arg(
    long,
    value_parser = humantime::parse_duration,
    help = "Write pending sync progress every <FLUSH_INTERVAL>. [default: 5m]"
  )]
  pub(crate) flush_interval: Option<Duration>,
  #[arg(
    long,
    help = "Keep <LOOKAHEAD> unused addresses past the last used one. [default: 20]"
  )]
  pub(crate) lookahead: Option<usize>,
  #[arg(
    long,
    value_name = "KIND=COMMAND",
    value_parser = parse_notify,
    help = "Run <COMMAND> for confirmed wallet transactions of <KIND>. `%s` becomes the txid."
  )]
  pub(crate) notify: Vec<(NotificationKind, String)>,
  #[arg(long, help = "Queue at most <NOTIFY_QUEUE> notifications. [default: 1024]")]
  pub(crate) notify_queue: Option<usize>,
  #[arg(long, short, help = "Use regtest. Equivalent to `--chain regtest`.")]
  pub(crate) regtest: bool,
  #[arg(long, short, help = "Use signet. Equivalent to `--chain signet`.")]
  pub(crate) signet: bool,
  #[arg(long, help = "Store raw transactions alongside wallet outputs.")]
  pub(crate) store_transactions: bool,
  #[arg(long, short, help = "Use testnet. Equivalent to `--chain testnet`.")]
  pub(crate) testnet: bool,
}

fn parse_notify(s: &str) -> Result<(NotificationKind, String)> {
  let (kind, command) = s
    .split_once('=')
    .ok_or_else(|| anyhow!("expected <KIND>=<COMMAND>, got `{s}`"))?;

  let kind =
    <NotificationKind as clap::ValueEnum>::from_str(kind, true).map_err(|err| anyhow!(err))?;

  if command.trim().is_empty() {
    bail!("notify command for `{kind}` is empty");
  }

  Ok((kind, command.into()))
}
