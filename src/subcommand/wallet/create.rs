use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Create {
  #[arg(
    long,
    env = "TALLY_WALLET_PASSWORD",
    hide_env_values = true,
    help = "Encrypt the wallet seed with <PASSWORD>."
  )]
  pub(crate) password: String,
  #[arg(long, default_value = "", help = "Use <PASSPHRASE> as BIP39 passphrase.")]
  pub(crate) passphrase: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub mnemonic: String,
  pub passphrase: Option<String>,
  pub tip: Option<BlockId>,
}

impl Create {
  pub(crate) fn run(self, settings: &Settings, name: &str) -> SubcommandResult {
    let manager = open_manager(settings, core_chain(settings)?, None)?;

    let mnemonic = manager.create_wallet(name, &self.password, &self.passphrase, None)?;

    let tip = manager.read().wallet(name)?.last_synced(settings.chain().coin_type());

    Ok(Some(Box::new(Output {
      mnemonic: mnemonic.to_string(),
      passphrase: (!self.passphrase.is_empty()).then_some(self.passphrase),
      tip,
    })))
  }
}
