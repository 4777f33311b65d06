use crate::connection::{Client, ConnectionParams, PutOutcome};
use crate::error::Error;
use crate::file::FileInfo;
use crate::window::{Lookback, Since};
use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// What happened to one vendor's files during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VendorReport {
    pub vendor: String,
    pub listed: Vec<FileInfo>,
    pub written: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl VendorReport {
    fn new(vendor: &str, listed: Vec<FileInfo>) -> Self {
        Self {
            vendor: vendor.to_string(),
            listed,
            ..Self::default()
        }
    }

    fn record(&mut self, name: &str, outcome: crate::Result<PutOutcome>) {
        match outcome {
            Ok(PutOutcome::Written(_)) => self.written.push(name.to_string()),
            Ok(PutOutcome::AlreadyExists(_)) => self.skipped.push(name.to_string()),
            Err(e) => self.failed.push((name.to_string(), e.to_string())),
        }
    }
}

/// One vendor's run: list what changed in `src`, then copy each file to
/// `dst`, skipping files already there.
#[derive(Debug, Clone)]
pub struct VendorJob {
    pub params: ConnectionParams,
    pub src: String,
    pub dst: Option<String>,
    pub lookback: Option<Lookback>,
    pub dry_run: bool,
}

impl VendorJob {
    /// Runs on the calling thread. The vendor session, and the destination
    /// session when one is given, are both closed before returning.
    pub fn run(&self, destination: Option<&ConnectionParams>) -> Result<VendorReport> {
        let name = self.params.name.clone();
        let dst = match (self.dst.as_deref(), self.dry_run) {
            (Some(dst), _) => dst,
            (None, true) => "",
            (None, false) => bail!("{name}: no \"dst\" directory configured"),
        };

        let report = Client::scoped(&self.params, |vendor| {
            let files = vendor.list_file_data(&self.src, self.lookback.map(Since::from))?;
            let mut report = VendorReport::new(&name, files);
            if self.dry_run || report.listed.is_empty() {
                return Ok(report);
            }

            match destination {
                Some(params) => Client::scoped(params, |sink| {
                    self.copy_all(vendor, Some(sink), dst, &mut report)
                })?,
                None => self.copy_all(vendor, None, dst, &mut report)?,
            }
            Ok(report)
        })
        .with_context(|| format!("{name}: run failed"))?;

        info!(
            vendor = %name,
            listed = report.listed.len(),
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "vendor run complete"
        );
        Ok(report)
    }

    /// Per-file failures are recorded and the run continues; a lost
    /// connection ends it.
    fn copy_all(
        &self,
        source: &mut Client,
        mut sink: Option<&mut Client>,
        dst: &str,
        report: &mut VendorReport,
    ) -> crate::Result<()> {
        let files = report.listed.clone();
        for file in &files {
            let fetched = match source.get_file(file, &self.src) {
                Ok(fetched) => fetched,
                Err(e @ Error::Connection { .. }) => return Err(e),
                Err(e) => {
                    report.record(file.name(), Err(e));
                    continue;
                }
            };
            let outcome = match sink.as_deref_mut() {
                Some(sink) => sink.put_file(&fetched, dst, true, true),
                None => source.put_file(&fetched, dst, false, true),
            };
            if let Err(Error::Connection { .. }) = outcome {
                return outcome.map(|_| ());
            }
            report.record(file.name(), outcome);
        }
        Ok(())
    }
}

/// Run `jobs` concurrently, each vendor on its own sessions.
pub async fn run_vendors(
    jobs: Vec<VendorJob>,
    destination: Option<ConnectionParams>,
    max_concurrent: usize,
) -> Vec<(String, Result<VendorReport>)> {
    VendorRunner::new(destination, max_concurrent).run(jobs).await
}

pub struct VendorRunner {
    destination: Option<ConnectionParams>,
    max_concurrent: usize,
}

impl VendorRunner {
    pub fn new(destination: Option<ConnectionParams>, max_concurrent: usize) -> Self {
        Self {
            destination,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run every job on its own blocking thread with its own sessions,
    /// at most `max_concurrent` at a time. Results come back in completion
    /// order, one per job.
    pub async fn run(&self, jobs: Vec<VendorJob>) -> Vec<(String, Result<VendorReport>)> {
        let multi_progress = MultiProgress::new();

        stream::iter(jobs)
            .map(|job| {
                let destination = self.destination.clone();
                let pb = multi_progress.add(ProgressBar::new_spinner());

                async move { Self::run_single(job, destination, pb).await }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await
    }

    async fn run_single(
        job: VendorJob,
        destination: Option<ConnectionParams>,
        progress_bar: ProgressBar,
    ) -> (String, Result<VendorReport>) {
        let vendor = job.params.name.clone();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            progress_bar.set_style(style);
        }
        progress_bar.set_message(format!("{vendor}: retrieving"));
        progress_bar.enable_steady_tick(Duration::from_millis(120));

        let result = tokio::task::spawn_blocking(move || job.run(destination.as_ref()))
            .await
            .map_err(|e| anyhow!("{vendor}: worker stopped: {e}"))
            .and_then(|result| result);

        match &result {
            Ok(report) => progress_bar.finish_with_message(format!(
                "✓ {vendor}: {} listed, {} written, {} skipped, {} failed",
                report.listed.len(),
                report.written.len(),
                report.skipped.len(),
                report.failed.len()
            )),
            Err(e) => {
                warn!(vendor = %vendor, error = %e, "vendor run failed");
                progress_bar.finish_with_message(format!("✗ {vendor}: {e:#}"));
            }
        }
        (vendor, result)
    }
}
