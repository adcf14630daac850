use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Outputs {
  #[arg(long, help = "Only list outputs of account <ACCOUNT>.")]
  account: Option<u32>,
  #[arg(
    long,
    default_value_t = 0,
    help = "Only list outputs with at least <MIN_CONFIRMATIONS> confirmations."
  )]
  min_confirmations: u32,
}

impl Outputs {
  pub(crate) fn run(self, manager: &WalletManager, name: &str) -> SubcommandResult {
    Ok(Some(Box::new(manager.read().spendable_outputs(
      name,
      self.account,
      self.min_confirmations,
    )?)))
  }
}
