#![allow(
  clippy::large_enum_variant,
  clippy::result_large_err,
  clippy::too_many_arguments,
  clippy::type_complexity
)]
#![deny(
  clippy::cast_lossless,
  clippy::cast_possible_truncation,
  clippy::cast_possible_wrap,
  clippy::cast_sign_loss
)]

use {
  self::{
    arguments::Arguments,
    error::ResultExt,
    subcommand::{Output, Subcommand, SubcommandResult},
  },
  anyhow::{Context, Error, anyhow, bail},
  bip39::Mnemonic,
  bitcoin::{
    Address, Amount, Block, BlockHash, Network, OutPoint, Script, ScriptBuf, Transaction, Txid,
    bip32::{ChildNumber, DerivationPath, Xpriv, Xpub},
    block::Header,
    consensus,
    hashes::Hash,
  },
  chrono::{DateTime, TimeZone, Utc},
  clap::Parser,
  indicatif::{ProgressBar, ProgressStyle},
  log::log_enabled,
  serde::{Deserialize, Serialize, de::DeserializeOwned},
  serde_with::{DisplayFromStr, serde_as},
  snafu::Snafu,
  std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    env,
    fmt::{self, Display, Formatter},
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process::{self, Command},
    str::FromStr,
    sync::{
      Arc, Mutex, RwLock, Weak,
      atomic::{self, AtomicBool},
    },
    thread,
    time::Duration,
  },
  zeroize::Zeroizing,
};

pub use self::{
  chain::Chain,
  error::WalletError,
  headers::{BlockId, ChainHeader, ChainSource, CoreChain, MemoryChain},
  index::AddressIndex,
  keys::{Bip32KeySource, DerivedAddress, EncryptedSeed, KdfParams, KeySource, generate_mnemonic},
  manager::{
    Balance, COINBASE_MATURITY, DEFAULT_FLUSH_INTERVAL, DEFAULT_LOOKAHEAD, HistoryItem,
    HistoryKind, ManagerConfig, SpendableOutput, WalletGuard, WalletManager, WalletReader,
    WalletState,
  },
  notifier::{CommandNotifier, Notification, NotificationKind, NotificationSink},
  options::Options,
  settings::Settings,
  store::{Batch, Op, RedbStore, StoreError, WalletStore},
  wallet::{
    Account, AccountKey, AccountRoot, AddressKey, HdAddress, Keychain, Payment, SpendingDetails,
    TransactionData, Wallet, WalletId,
  },
};

#[cfg(test)]
mod test;

mod arguments;
pub mod chain;
pub mod error;
pub mod headers;
pub mod index;
pub mod keys;
pub mod manager;
pub mod notifier;
pub mod options;
pub mod settings;
pub mod store;
pub mod subcommand;
pub mod wallet;

type Result<T = (), E = Error> = std::result::Result<T, E>;

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

fn timestamp(seconds: u32) -> DateTime<Utc> {
  Utc
    .timestamp_opt(seconds.into(), 0)
    .single()
    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub fn main() {
  env_logger::init();

  ctrlc::set_handler(move || {
    if SHUTTING_DOWN.fetch_or(true, atomic::Ordering::Relaxed) {
      process::exit(1);
    }

    eprintln!("Shutting down gracefully. Press <CTRL-C> again to shutdown immediately.");
  })
  .expect("Error setting <CTRL-C> handler");

  let args = Arguments::parse();

  match args.run() {
    Err(err) => {
      eprintln!("error: {err}");
      err
        .chain()
        .skip(1)
        .for_each(|cause| eprintln!("because: {cause}"));
      if env::var_os("RUST_BACKTRACE")
        .map(|val| val == "1")
        .unwrap_or_default()
      {
        eprintln!("{}", err.backtrace());
      }
      process::exit(1);
    }
    Ok(output) => {
      if let Some(output) = output {
        output.print_json();
      }
    }
  }
}
