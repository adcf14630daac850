use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Receive {
  #[arg(long, default_value_t = 0, help = "Use account <ACCOUNT>.")]
  account: u32,
  #[arg(long, help = "Hand out change addresses.")]
  change: bool,
  #[arg(long, default_value_t = 1, help = "Hand out <COUNT> addresses.")]
  count: usize,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub addresses: Vec<String>,
}

impl Receive {
  pub(crate) fn run(self, manager: &WalletManager, name: &str) -> SubcommandResult {
    let keychain = if self.change {
      Keychain::Internal
    } else {
      Keychain::External
    };

    let addresses = manager
      .unused_addresses(name, self.account, keychain, self.count)?
      .into_iter()
      .map(|address| address.address)
      .collect();

    Ok(Some(Box::new(Output { addresses })))
  }
}
