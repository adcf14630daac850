use {
  super::*,
  bitcoincore_rpc::{Auth, Client, RpcApi},
};

pub const DEFAULT_NOTIFY_QUEUE: usize = 1024;

#[serde_as]
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
  bitcoin_rpc_password: Option<String>,
  bitcoin_rpc_url: Option<String>,
  bitcoin_rpc_username: Option<String>,
  chain: Option<Chain>,
  config: Option<PathBuf>,
  config_dir: Option<PathBuf>,
  cookie_file: Option<PathBuf>,
  data_dir: Option<PathBuf>,
  #[serde_as(as = "Option<DisplayFromStr>")]
  flush_interval: Option<humantime::Duration>,
  lookahead: Option<usize>,
  notify: BTreeMap<NotificationKind, String>,
  notify_queue: Option<usize>,
  store_transactions: bool,
}

impl Settings {
  pub fn load(options: Options) -> Result<Settings> {
    let mut env = BTreeMap::<String, String>::new();

    for (var, value) in env::vars_os() {
      let Some(var) = var.to_str() else {
        continue;
      };

      let Some(key) = var.strip_prefix("TALLY_") else {
        continue;
      };

      env.insert(
        key.into(),
        value.into_string().map_err(|value| {
          anyhow!(
            "environment variable `{var}` not valid unicode: `{}`",
            value.to_string_lossy()
          )
        })?,
      );
    }

    Self::merge(options, env)
  }

  pub(crate) fn merge(options: Options, env: BTreeMap<String, String>) -> Result<Self> {
    let settings = Settings::from_options(options).or(Settings::from_env(env)?);

    let config_path = match &settings.config {
      Some(path) => Some(path.into()),
      None => {
        let path = match &settings.config_dir {
          Some(dir) => dir.join("tally.yaml"),
          None => settings.clone().or_defaults()?.data_dir().join("tally.yaml"),
        };

        path.exists().then_some(path)
      }
    };

    let config = match config_path {
      Some(path) => {
        let file = File::open(&path)
          .with_context(|| format!("failed to open config file `{}`", path.display()))?;

        serde_yaml::from_reader(file)
          .with_context(|| format!("failed to deserialize config file `{}`", path.display()))?
      }
      None => Settings::default(),
    };

    settings.or(config).or_defaults()
  }

  pub(crate) fn or(self, source: Settings) -> Self {
    Self {
      bitcoin_rpc_password: self.bitcoin_rpc_password.or(source.bitcoin_rpc_password),
      bitcoin_rpc_url: self.bitcoin_rpc_url.or(source.bitcoin_rpc_url),
      bitcoin_rpc_username: self.bitcoin_rpc_username.or(source.bitcoin_rpc_username),
      chain: self.chain.or(source.chain),
      config: self.config.or(source.config),
      config_dir: self.config_dir.or(source.config_dir),
      cookie_file: self.cookie_file.or(source.cookie_file),
      data_dir: self.data_dir.or(source.data_dir),
      flush_interval: self.flush_interval.or(source.flush_interval),
      lookahead: self.lookahead.or(source.lookahead),
      notify: if self.notify.is_empty() {
        source.notify
      } else {
        self.notify
      },
      notify_queue: self.notify_queue.or(source.notify_queue),
      store_transactions: self.store_transactions || source.store_transactions,
    }
  }

  pub(crate) fn from_options(options: Options) -> Self {
    Self {
      bitcoin_rpc_password: options.bitcoin_rpc_password,
      bitcoin_rpc_url: options.bitcoin_rpc_url,
      bitcoin_rpc_username: options.bitcoin_rpc_username,
      chain: options
        .testnet
        .then_some(Chain::Testnet)
        .or(options.signet.then_some(Chain::Signet))
        .or(options.regtest.then_some(Chain::Regtest))
        .or(options.chain_argument),
      config: options.config,
      config_dir: options.config_dir,
      cookie_file: options.cookie_file,
      data_dir: options.data_dir,
      flush_interval: options.flush_interval.map(Into::into),
      lookahead: options.lookahead,
      notify: options.notify.into_iter().collect(),
      notify_queue: options.notify_queue,
      store_transactions: options.store_transactions,
    }
  }

  pub(crate) fn from_env(env: BTreeMap<String, String>) -> Result<Self> {
    let get_bool = |key| {
      env
        .get(key)
        .map(|value| !value.is_empty())
        .unwrap_or_default()
    };

    let get_string = |key| env.get(key).cloned();

    let get_path = |key| env.get(key).map(PathBuf::from);

    let get_usize = |key| {
      env
        .get(key)
        .map(|value| value.parse::<usize>())
        .transpose()
        .with_context(|| format!("failed to parse environment variable TALLY_{key} as usize"))
    };

    let chain = env
      .get("CHAIN")
      .map(|chain| chain.parse::<Chain>())
      .transpose()
      .context("failed to parse environment variable TALLY_CHAIN as chain")?;

    let flush_interval = env
      .get("FLUSH_INTERVAL")
      .map(|interval| interval.parse::<humantime::Duration>())
      .transpose()
      .context("failed to parse environment variable TALLY_FLUSH_INTERVAL as duration")?;

    let notify = [
      (NotificationKind::All, "NOTIFY_ALL"),
      (NotificationKind::Received, "NOTIFY_RECEIVED"),
      (NotificationKind::Sent, "NOTIFY_SENT"),
    ]
    .into_iter()
    .filter_map(|(kind, key)| get_string(key).map(|command| (kind, command)))
    .collect();

    Ok(Self {
      bitcoin_rpc_password: get_string("BITCOIN_RPC_PASSWORD"),
      bitcoin_rpc_url: get_string("BITCOIN_RPC_URL"),
      bitcoin_rpc_username: get_string("BITCOIN_RPC_USERNAME"),
      chain,
      config: get_path("CONFIG"),
      config_dir: get_path("CONFIG_DIR"),
      cookie_file: get_path("COOKIE_FILE"),
      data_dir: get_path("DATA_DIR"),
      flush_interval,
      lookahead: get_usize("LOOKAHEAD")?,
      notify,
      notify_queue: get_usize("NOTIFY_QUEUE")?,
      store_transactions: get_bool("STORE_TRANSACTIONS"),
    })
  }

  pub(crate) fn or_defaults(self) -> Result<Self> {
    let chain = self.chain.unwrap_or_default();

    let data_dir = chain.join_with_data_dir(match &self.data_dir {
      Some(data_dir) => data_dir.clone(),
      None => Self::default_data_dir()?,
    });

    if self.lookahead == Some(0) {
      bail!("lookahead must be at least 1");
    }

    Ok(Self {
      bitcoin_rpc_url: Some(
        self
          .bitcoin_rpc_url
          .clone()
          .unwrap_or_else(|| format!("127.0.0.1:{}", chain.default_rpc_port())),
      ),
      chain: Some(chain),
      data_dir: Some(data_dir),
      flush_interval: Some(
        self
          .flush_interval
          .unwrap_or_else(|| DEFAULT_FLUSH_INTERVAL.into()),
      ),
      lookahead: Some(self.lookahead.unwrap_or(DEFAULT_LOOKAHEAD)),
      notify_queue: Some(self.notify_queue.unwrap_or(DEFAULT_NOTIFY_QUEUE)),
      ..self
    })
  }

  fn default_data_dir() -> Result<PathBuf> {
    Ok(
      dirs::data_dir()
        .context("could not get data dir")?
        .join("tally"),
    )
  }

  pub fn chain(&self) -> Chain {
    self.chain.unwrap_or_default()
  }

  pub fn data_dir(&self) -> PathBuf {
    self.data_dir.clone().unwrap_or_default()
  }

  pub fn database_path(&self) -> PathBuf {
    self.data_dir().join("wallets.redb")
  }

  pub fn manager_config(&self) -> ManagerConfig {
    ManagerConfig {
      chain: self.chain(),
      flush_interval: self
        .flush_interval
        .map_or(DEFAULT_FLUSH_INTERVAL, Into::into),
      lookahead: self.lookahead.unwrap_or(DEFAULT_LOOKAHEAD),
      store_transactions: self.store_transactions,
    }
  }

  pub fn notify(&self) -> &BTreeMap<NotificationKind, String> {
    &self.notify
  }

  pub fn notify_queue(&self) -> usize {
    self.notify_queue.unwrap_or(DEFAULT_NOTIFY_QUEUE)
  }

  pub(crate) fn bitcoin_rpc_url(&self) -> String {
    self
      .bitcoin_rpc_url
      .clone()
      .unwrap_or_else(|| format!("127.0.0.1:{}", self.chain().default_rpc_port()))
  }

  pub(crate) fn cookie_file(&self) -> Result<PathBuf> {
    if let Some(cookie_file) = &self.cookie_file {
      return Ok(cookie_file.clone());
    }

    let path = if cfg!(target_os = "linux") {
      dirs::home_dir()
        .ok_or_else(|| anyhow!("failed to get cookie file path: could not get home dir"))?
        .join(".bitcoin")
    } else {
      dirs::data_dir()
        .ok_or_else(|| anyhow!("failed to get cookie file path: could not get data dir"))?
        .join("Bitcoin")
    };

    Ok(self.chain().join_with_data_dir(path).join(".cookie"))
  }

  pub(crate) fn bitcoin_credentials(&self) -> Result<Auth> {
    if let Some((user, pass)) = &self
      .bitcoin_rpc_username
      .as_ref()
      .zip(self.bitcoin_rpc_password.as_ref())
    {
      Ok(Auth::UserPass((*user).clone(), (*pass).clone()))
    } else {
      Ok(Auth::CookieFile(self.cookie_file()?))
    }
  }

  pub(crate) fn bitcoin_rpc_client(&self) -> Result<Client> {
    let rpc_url = self.bitcoin_rpc_url();

    let auth = self.bitcoin_credentials()?;

    log::info!("connecting to Bitcoin Core at {rpc_url}");

    if let Auth::CookieFile(cookie_file) = &auth {
      log::info!("using credentials from cookie file at `{}`", cookie_file.display());

      if !cookie_file.is_file() {
        bail!("cookie file `{}` does not exist", cookie_file.display());
      }
    }

    let client = Client::new(&rpc_url, auth)
      .with_context(|| format!("failed to connect to Bitcoin Core RPC at `{rpc_url}`"))?;

    let rpc_chain = match client.get_blockchain_info()?.chain {
      Network::Bitcoin => Chain::Mainnet,
      Network::Testnet => Chain::Testnet,
      Network::Signet => Chain::Signet,
      Network::Regtest => Chain::Regtest,
      other => bail!("Bitcoin RPC server on unsupported chain {other}"),
    };

    let tally_chain = self.chain();

    if rpc_chain != tally_chain {
      bail!("Bitcoin RPC server is on {rpc_chain} but tally is on {tally_chain}");
    }

    Ok(client)
  }
}
