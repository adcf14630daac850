use {super::*, tokio::sync::mpsc};

#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
  All,
  Received,
  Sent,
}

impl Display for NotificationKind {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Self::All => write!(f, "all"),
      Self::Received => write!(f, "received"),
      Self::Sent => write!(f, "sent"),
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Notification {
  pub kind: NotificationKind,
  pub txid: Txid,
}

/// Receives wallet notifications. Implementations must not block.
pub trait NotificationSink: Send + Sync {
  fn notify(&self, notification: Notification);
}

impl NotificationSink for mpsc::Sender<Notification> {
  fn notify(&self, notification: Notification) {
    if let Err(err) = self.try_send(notification) {
      log::warn!(
        "dropping {} notification for {}: {err}",
        notification.kind,
        notification.txid
      );
    }
  }
}

/// Runs a shell command per notification on a worker thread. `%s` in the
/// command is replaced with the txid.
pub struct CommandNotifier {
  sender: mpsc::Sender<Notification>,
}

impl CommandNotifier {
  pub fn spawn(commands: BTreeMap<NotificationKind, String>, capacity: usize) -> Self {
    let (sender, mut receiver) = mpsc::channel::<Notification>(capacity.max(1));

    thread::spawn(move || {
      while let Some(notification) = receiver.blocking_recv() {
        if let Some(command) = commands.get(&notification.kind) {
          Self::run(command, notification);
        }
      }

      log::debug!("notification worker exiting");
    });

    Self { sender }
  }

  fn run(command: &str, notification: Notification) {
    let command = command.replace("%s", &notification.txid.to_string());

    log::debug!("running {} notification command `{command}`", notification.kind);

    match Command::new("sh").arg("-c").arg(&command).status() {
      Ok(status) if status.success() => {}
      Ok(status) => log::error!("notification command `{command}` failed: {status}"),
      Err(err) => log::error!("failed to run notification command `{command}`: {err}"),
    }
  }
}

impl NotificationSink for CommandNotifier {
  fn notify(&self, notification: Notification) {
    self.sender.notify(notification);
  }
}
