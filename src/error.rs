use super::*;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum WalletError {
  #[snafu(display("account {account} not found in wallet `{wallet}`"))]
  AccountNotFound { wallet: String, account: u32 },
  #[snafu(display(
    "block {hash} at height {height} does not extend wallet tip at height {tip_height}"
  ))]
  BlockTooFarAhead {
    hash: BlockHash,
    height: u32,
    tip_height: u32,
  },
  #[snafu(display("chain source request failed"))]
  Chain {
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[snafu(display("failed to seal wallet seed"))]
  Encryption,
  #[snafu(display("invalid argument: {message}"))]
  InvalidArgument { message: String },
  #[snafu(display("Invalid chain `{chain}`"))]
  InvalidChain { chain: String },
  #[snafu(display("key derivation failed"))]
  KeyDerivation { source: bitcoin::bip32::Error },
  #[snafu(display("invalid mnemonic"))]
  Mnemonic { source: bip39::Error },
  #[snafu(display(
    "cannot create account {account} in wallet `{wallet}` before account {} has transactions",
    account.saturating_sub(1)
  ))]
  PreviousAccountUnused { wallet: String, account: u32 },
  #[snafu(display("wallet tip {tip} is no longer on the best chain"))]
  ReorgRequired { tip: BlockHash },
  #[snafu(display("invalid password"))]
  Security,
  #[snafu(display("wallet store failure"))]
  Store { source: StoreError },
  #[snafu(display("block {hash} is unknown to the chain source"))]
  UnknownBlock { hash: BlockHash },
  #[snafu(display("wallet `{name}` already exists"))]
  WalletAlreadyExists { name: String },
  #[snafu(display("wallet `{name}` not found"))]
  WalletNotFound { name: String },
}

impl WalletError {
  pub(crate) fn chain(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Chain {
      source: Box::new(err),
    }
  }
}

impl From<StoreError> for WalletError {
  fn from(source: StoreError) -> Self {
    Self::Store { source }
  }
}

/// We currently use `anyhow` for errors at the command line and `snafu`
/// inside the engine. Since `anyhow` exports a `Context` trait, importing
/// `snafu::ResultExt` would clash, so this trait forwards to it under a
/// different name.
pub(crate) trait ResultExt<T, E>: Sized {
  fn snafu_context<C, E2>(self, context: C) -> Result<T, E2>
  where
    C: snafu::IntoError<E2, Source = E>,
    E2: std::error::Error + snafu::ErrorCompat;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E> {
  fn snafu_context<C, E2>(self, context: C) -> Result<T, E2>
  where
    C: snafu::IntoError<E2, Source = E>,
    E2: std::error::Error + snafu::ErrorCompat,
  {
    use snafu::ResultExt;
    self.context(context)
  }
}
