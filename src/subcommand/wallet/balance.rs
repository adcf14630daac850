use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Balance {
  #[arg(long, help = "Only count outputs of account <ACCOUNT>.")]
  account: Option<u32>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub confirmed: u64,
  pub unconfirmed: u64,
  pub total: u64,
}

impl Balance {
  pub(crate) fn run(self, manager: &WalletManager, name: &str) -> SubcommandResult {
    let balance = manager.balance(name, self.account)?;

    Ok(Some(Box::new(Output {
      confirmed: balance.confirmed.to_sat(),
      unconfirmed: balance.unconfirmed.to_sat(),
      total: balance.total().to_sat(),
    })))
  }
}
