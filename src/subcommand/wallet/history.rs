use super::*;

#[derive(Debug, Parser)]
pub(crate) struct History {
  #[arg(long, help = "Only list transactions of account <ACCOUNT>.")]
  account: Option<u32>,
  #[arg(long, help = "List at most <LIMIT> transactions.")]
  limit: Option<usize>,
}

impl History {
  pub(crate) fn run(self, manager: &WalletManager, name: &str) -> SubcommandResult {
    let mut history = manager.history(name, self.account)?;

    if let Some(limit) = self.limit {
      history.truncate(limit);
    }

    Ok(Some(Box::new(history)))
  }
}
