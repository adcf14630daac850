use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Restore {
  #[arg(long, help = "Restore wallet from <MNEMONIC>.")]
  pub(crate) mnemonic: Mnemonic,
  #[arg(
    long,
    env = "TALLY_WALLET_PASSWORD",
    hide_env_values = true,
    help = "Encrypt the wallet seed with <PASSWORD>."
  )]
  pub(crate) password: String,
  #[arg(long, default_value = "", help = "Use <PASSPHRASE> as BIP39 passphrase.")]
  pub(crate) passphrase: String,
  #[arg(
    long,
    help = "Scan blocks from <FROM>, an RFC 3339 timestamp. [default: genesis]"
  )]
  pub(crate) from: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub name: String,
  pub tip: Option<BlockId>,
}

impl Restore {
  pub(crate) fn run(self, settings: &Settings, name: &str) -> SubcommandResult {
    let manager = open_manager(settings, core_chain(settings)?, None)?;

    manager.recover_wallet(
      name,
      &self.password,
      &self.mnemonic,
      &self.passphrase,
      self.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    )?;

    let tip = manager.read().wallet(name)?.last_synced(settings.chain().coin_type());

    Ok(Some(Box::new(Output {
      name: name.into(),
      tip,
    })))
  }
}
