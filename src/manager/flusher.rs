use {
  super::*,
  std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread::JoinHandle,
  },
};

/// Background thread that periodically writes out sync cursors left dirty by
/// blocks without wallet transactions.
pub(crate) struct Flusher {
  stop: mpsc::Sender<()>,
  handle: JoinHandle<()>,
}

impl Flusher {
  pub(crate) fn spawn(manager: Weak<WalletManager>, interval: Duration) -> Self {
    let (stop, receiver) = mpsc::channel();

    let handle = thread::spawn(move || {
      loop {
        match receiver.recv_timeout(interval) {
          Err(RecvTimeoutError::Timeout) => {}
          Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let Some(manager) = manager.upgrade() else {
          break;
        };

        if let Err(err) = manager.flush() {
          log::error!("periodic wallet flush failed: {err}");
        }
      }

      log::debug!("wallet flusher stopped");
    });

    Self { stop, handle }
  }

  /// Stops the thread and waits for it to exit.
  pub(crate) fn stop(self) {
    let Self { stop, handle } = self;

    stop.send(()).ok();

    if handle.join().is_err() {
      log::error!("wallet flusher panicked");
    }
  }

  /// Tells the thread to exit without waiting for it.
  pub(crate) fn signal(self) {
    self.stop.send(()).ok();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flushes_on_interval() {
    let context = test::Context::new();
    context.mine(Vec::new());
    assert!(context.manager.read().is_dirty("alice"));

    let flusher = Flusher::spawn(Arc::downgrade(&context.manager), Duration::from_millis(10));

    for _ in 0..500 {
      if !context.manager.read().is_dirty("alice") {
        break;
      }
      thread::sleep(Duration::from_millis(10));
    }

    flusher.stop();

    assert!(!context.manager.read().is_dirty("alice"));
  }

  #[test]
  fn exits_when_the_manager_is_gone() {
    let manager = Weak::<WalletManager>::new();
    Flusher::spawn(manager, Duration::from_millis(1)).stop();
  }
}
