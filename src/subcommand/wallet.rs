use super::*;

pub mod addresses;
pub mod balance;
pub mod create;
pub mod history;
pub mod outputs;
pub mod receive;
pub mod restore;
pub mod resync;

#[derive(Debug, Parser)]
pub(crate) struct WalletCommand {
  #[arg(long, default_value = "tally", help = "Use wallet named <NAME>.")]
  pub(crate) name: String,
  #[command(subcommand)]
  pub(crate) subcommand: WalletSubcommand,
}

#[derive(Debug, Parser)]
pub(crate) enum WalletSubcommand {
  #[command(about = "List wallet addresses")]
  Addresses(addresses::Addresses),
  #[command(about = "Get wallet balance")]
  Balance(balance::Balance),
  #[command(about = "Create new wallet")]
  Create(create::Create),
  #[command(about = "List wallet transactions, newest first")]
  History(history::History),
  #[command(about = "List spendable outputs")]
  Outputs(outputs::Outputs),
  #[command(about = "Get unused receive addresses")]
  Receive(receive::Receive),
  #[command(about = "Restore wallet from mnemonic")]
  Restore(restore::Restore),
  #[command(about = "Forget wallet transactions and rescan from wallet creation")]
  Resync(resync::Resync),
}

impl WalletCommand {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let name = self.name;

    match self.subcommand {
      WalletSubcommand::Addresses(addresses) => addresses.run(&*open(&name, &settings)?, &name),
      WalletSubcommand::Balance(balance) => balance.run(&*open(&name, &settings)?, &name),
      WalletSubcommand::Create(create) => create.run(&settings, &name),
      WalletSubcommand::History(history) => history.run(&*open(&name, &settings)?, &name),
      WalletSubcommand::Outputs(outputs) => outputs.run(&*open(&name, &settings)?, &name),
      WalletSubcommand::Receive(receive) => receive.run(&*open(&name, &settings)?, &name),
      WalletSubcommand::Restore(restore) => restore.run(&settings, &name),
      WalletSubcommand::Resync(resync) => resync.run(&settings, &name),
    }
  }
}

/// Opens the wallet database without a node connection and checks that
/// `name` exists.
fn open(name: &str, settings: &Settings) -> Result<Arc<WalletManager>> {
  let manager = open_manager(settings, offline_chain(), None)?;

  manager
    .read()
    .wallet(name)
    .with_context(|| format!("failed to open wallet `{name}`"))?;

  Ok(manager)
}
