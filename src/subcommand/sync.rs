use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Sync {
  #[arg(long, help = "Exit once the chain tip is reached.")]
  once: bool,
  #[arg(
    long,
    value_parser = humantime::parse_duration,
    default_value = "10s",
    help = "Poll for new blocks every <POLL_INTERVAL>."
  )]
  poll_interval: Duration,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub tip: Option<BlockId>,
  pub blocks: u64,
  pub reorgs: u64,
}

impl Sync {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let chain = core_chain(&settings)?;

    let sink = (!settings.notify().is_empty()).then(|| {
      Arc::new(CommandNotifier::spawn(
        settings.notify().clone(),
        settings.notify_queue(),
      )) as Arc<dyn NotificationSink>
    });

    let manager = open_manager(&settings, chain.clone(), sink)?;

    if manager.read().wallets().next().is_none() {
      bail!("no wallets to sync, create one with `tally wallet create`");
    }

    manager.start()?;

    let result = Self::follow(&manager, &chain, self.once, self.poll_interval);

    manager.stop()?;

    let (blocks, reorgs) = result?;

    Ok(Some(Box::new(Output {
      tip: manager.read().tip(),
      blocks,
      reorgs,
    })))
  }

  fn follow(
    manager: &WalletManager,
    chain: &CoreChain,
    once: bool,
    poll_interval: Duration,
  ) -> Result<(u64, u64)> {
    let (mut blocks, mut reorgs) = (0, 0);

    let mut progress_bar: Option<ProgressBar> = None;

    while !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) && !chain.is_downloaded()? {
      log::info!("waiting for bitcoin core to finish initial block download");
      thread::sleep(poll_interval);
    }

    while !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
      let next = manager.read().tip().map_or(0, |tip| tip.height + 1);

      let Some((header, block)) = chain.block_at(next)? else {
        if let Some(progress_bar) = progress_bar.take() {
          progress_bar.finish_and_clear();
        }

        if once {
          break;
        }

        thread::sleep(poll_interval);
        continue;
      };

      if progress_bar.is_none()
        && !cfg!(test)
        && !log_enabled!(log::Level::Info)
        && let Some(tip) = chain.tip()?
        && tip.height > next
      {
        let bar = ProgressBar::new(tip.height.into());
        bar.set_position(next.into());
        bar.set_style(
          ProgressStyle::with_template("[syncing wallets] {wide_bar} {pos}/{len}")
            .context("invalid progress bar template")?,
        );
        progress_bar = Some(bar);
      }

      match manager.process_block(&block, header.height) {
        Ok(()) => {
          blocks += 1;
          if let Some(progress_bar) = &progress_bar {
            progress_bar.inc(1);
          }
        }
        Err(WalletError::ReorgRequired { tip }) => {
          log::warn!("wallet tip {tip} was reorganized out of the best chain");

          let mut guard = manager.lock();

          let fork = guard
            .find_fork()?
            .ok_or_else(|| anyhow!("no common ancestor with the best chain"))?;

          guard.remove_blocks(fork)?;

          reorgs += 1;
        }
        Err(WalletError::BlockTooFarAhead { hash, .. }) => {
          log::debug!("best chain moved while fetching {hash}, retrying");
        }
        Err(err) => return Err(err.into()),
      }
    }

    if let Some(progress_bar) = progress_bar {
      progress_bar.finish_and_clear();
    }

    Ok((blocks, reorgs))
  }
}
