use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::aging::StaleFileResolver;
use crate::config::Config;
use crate::error::Result;
use crate::notify::{compose_alert, Mailer, SmtpMailer};
use crate::remote::{records_from_entries, DirectoryLister, SftpLister};
use crate::store::{AlertStore, LineFileStore};

/// Orchestrates one run: load alerted set, list, resolve, notify, persist.
/// Collaborators sit behind traits so a run can be driven without a network.
pub struct AlertPlatform<'a> {
    config: &'a Config,
    /// Supplies the folder snapshot
    lister: Box<dyn DirectoryLister>,
    /// Delivers the alert email
    mailer: Box<dyn Mailer>,
    /// Remembers which names were already alerted on
    store: Box<dyn AlertStore>,
    resolver: StaleFileResolver,
}

impl<'a> AlertPlatform<'a> {
    /// Creates a platform wired to SFTP, SMTP and the line-file store
    /// described by `config`.
    pub fn new(config: &'a Config) -> Self {
        Self::with_collaborators(
            config,
            Box::new(SftpLister::new(&config.sftp)),
            Box::new(SmtpMailer::new(&config.smtp)),
            Box::new(LineFileStore::new(&config.alert.store_path)),
        )
    }

    pub fn with_collaborators(
        config: &'a Config,
        lister: Box<dyn DirectoryLister>,
        mailer: Box<dyn Mailer>,
        store: Box<dyn AlertStore>,
    ) -> Self {
        Self {
            config,
            lister,
            mailer,
            store,
            resolver: StaleFileResolver::new(config.alert.age_hours),
        }
    }

    /// Runs one check against the current clock.
    pub async fn run(&self, dry_run: bool) -> Result<RunReport> {
        self.run_at(Utc::now(), dry_run).await
    }

    /// Runs one check as of `now`.
    ///
    /// Store and listing failures abort the run before anything is sent or
    /// written. A failed send is logged and reported as `MailFailed`; the
    /// alerted set is only extended after a successful send, so the next run
    /// alerts on the same files again.
    pub async fn run_at(&self, now: DateTime<Utc>, dry_run: bool) -> Result<RunReport> {
        let folder = self.config.sftp.folder.as_str();

        let already_alerted = self.store.load()?;
        log::debug!("{} file(s) already alerted on", already_alerted.len());

        let entries = match self.lister.list(folder).await {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Listing {} on {} failed: {}", folder, self.lister.host(), e);
                return Err(e);
            }
        };
        let records = records_from_entries(entries);

        let resolution = self.resolver.resolve(&records, now, &already_alerted);
        log::info!(
            "{} file(s) in {} on {}: {} stale, {} new",
            records.len(),
            folder,
            self.lister.host(),
            resolution.stale_total,
            resolution.newly_stale.len()
        );

        let mut report = RunReport {
            host: self.lister.host().to_string(),
            folder: folder.to_string(),
            checked_at: now,
            threshold_hours: self.config.alert.age_hours,
            files_seen: records.len(),
            stale_total: resolution.stale_total,
            newly_stale: resolution.newly_stale.clone(),
            outcome: RunOutcome::NothingNew,
        };

        if dry_run {
            report.outcome = RunOutcome::DryRun;
            return Ok(report);
        }
        if resolution.newly_stale.is_empty() {
            return Ok(report);
        }

        let message = compose_alert(&self.config.alert.subject, folder, &resolution.newly_stale);
        match self.mailer.send(&message).await {
            Ok(()) => {
                if let Err(e) = self.store.append(&resolution.to_append) {
                    log::error!("Alert sent but recording it failed, files will be re-alerted: {}", e);
                    return Err(e);
                }
                report.outcome = RunOutcome::Alerted;
            }
            Err(e) => {
                log::error!(
                    "Could not send alert for {} file(s) in {} on {}: {}",
                    resolution.newly_stale.len(),
                    folder,
                    self.lister.host(),
                    e
                );
                report.outcome = RunOutcome::MailFailed {
                    error: e.to_string(),
                };
            }
        }

        Ok(report)
    }

    /// Runs checks every `every` until `shutdown` completes, returning the
    /// number of runs started.
    ///
    /// Runs never overlap: the next tick is awaited only once a run ends and
    /// missed ticks are skipped. `shutdown` is watched both between runs and
    /// while a run is in flight, so a hung run does not block stopping.
    pub async fn watch<F>(&self, every: Duration, dry_run: bool, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut runs = 0;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::info!("Interrupted, stopping watch after {} run(s)", runs);
                    return runs;
                }
                _ = ticker.tick() => {}
            }

            runs += 1;
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::warn!("Interrupted during run {}, abandoning it", runs);
                    return runs;
                }
                outcome = self.run(dry_run) => match outcome {
                    Ok(report) if report.is_failure() => {
                        log::warn!("Run finished without alerting:\n{}", report)
                    }
                    Ok(report) => log::info!("Run finished:\n{}", report),
                    Err(e) => log::error!(
                        "Run against {} on {} failed: {}",
                        self.config.sftp.folder,
                        self.lister.host(),
                        e
                    ),
                },
            }
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No stale file needed an alert
    NothingNew,
    /// Alert sent and recorded
    Alerted,
    /// Alert could not be sent; nothing was recorded
    MailFailed { error: String },
    /// Checked only; nothing sent or recorded
    DryRun,
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub host: String,
    pub folder: String,
    pub checked_at: DateTime<Utc>,
    pub threshold_hours: u64,
    /// Plain files in the listing
    pub files_seen: usize,
    pub stale_total: usize,
    pub newly_stale: Vec<String>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, RunOutcome::MailFailed { .. })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}:{} checked at {} (threshold {}h)",
            self.host,
            self.folder,
            self.checked_at.to_rfc3339(),
            self.threshold_hours
        )?;
        writeln!(
            f,
            "  {} file(s), {} stale, {} new",
            self.files_seen,
            self.stale_total,
            self.newly_stale.len()
        )?;
        for name in &self.newly_stale {
            writeln!(f, "    {}", name)?;
        }
        match &self.outcome {
            RunOutcome::NothingNew => write!(f, "  nothing new to report"),
            RunOutcome::Alerted => write!(f, "  alert sent"),
            RunOutcome::MailFailed { error } => write!(f, "  alert NOT sent: {}", error),
            RunOutcome::DryRun => write!(f, "  dry run, no alert sent"),
        }
    }
}
