use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Addresses {
  #[arg(long, help = "Only list addresses of account <ACCOUNT>.")]
  account: Option<u32>,
  #[arg(long, help = "Only list addresses that received funds.")]
  used: bool,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub address: String,
  pub path: String,
  pub keychain: Keychain,
  pub outputs: usize,
}

impl Addresses {
  pub(crate) fn run(self, manager: &WalletManager, name: &str) -> SubcommandResult {
    let reader = manager.read();

    let addresses = reader
      .accounts(name)?
      .into_iter()
      .filter(|account| self.account.is_none_or(|index| account.index == index))
      .flat_map(Account::addresses)
      .filter(|address| !self.used || address.is_used())
      .map(|address| Output {
        address: address.address.clone(),
        path: address.hd_path.clone(),
        keychain: address.keychain,
        outputs: address.transactions.len(),
      })
      .collect::<Vec<Output>>();

    Ok(Some(Box::new(addresses)))
  }
}
