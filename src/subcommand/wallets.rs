use super::*;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub name: String,
  pub tip: Option<BlockId>,
  pub accounts: usize,
  pub addresses: usize,
}

pub(crate) fn run(settings: Settings) -> SubcommandResult {
  let manager = open_manager(&settings, offline_chain(), None)?;

  let reader = manager.read();
  let coin_type = reader.coin_type();

  Ok(Some(Box::new(
    reader
      .wallets()
      .map(|wallet| Output {
        name: wallet.name.clone(),
        tip: wallet.last_synced(coin_type),
        accounts: wallet
          .root(coin_type)
          .map_or(0, |root| root.accounts.len()),
        addresses: wallet.addresses().count(),
      })
      .collect::<Vec<Output>>(),
  )))
}
