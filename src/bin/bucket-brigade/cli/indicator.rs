use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanBytes, HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use simple_moving_average::{SMA, SumTreeSMA};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use bucket_brigade::types::SyncStatistics;

const MOVING_AVERAGE_PERIOD_SECS: usize = 10;
const REFRESH_INTERVAL: f32 = 1.0;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
struct Totals {
    synced: u64,
    synced_bytes: u64,
    transformed: u64,
    skipped: u64,
    failed: u64,
    error: u64,
    pages: u64,
    listed: u64,
}

impl Totals {
    /// Returns the synced object count and bytes this statistic adds.
    fn add(&mut self, sync_stats: SyncStatistics) -> (u64, u64) {
        match sync_stats {
            SyncStatistics::SyncComplete { .. } => {
                self.synced += 1;
                return (1, 0);
            }
            SyncStatistics::SyncBytes(size) => {
                self.synced_bytes += size;
                return (0, size);
            }
            SyncStatistics::TransformComplete { .. } => self.transformed += 1,
            SyncStatistics::SyncSkip { .. } => self.skipped += 1,
            SyncStatistics::SyncWarning { .. } => self.failed += 1,
            SyncStatistics::SyncError { .. } => self.error += 1,
            SyncStatistics::PageComplete { objects } => {
                self.pages += 1;
                self.listed += objects;
            }
        }

        (0, 0)
    }

    fn counts_message(&self) -> String {
        format!(
            "transformed {} objects,  skipped {} objects,  failed {} objects,  error {} objects,  {} pages ({} objects listed)",
            self.transformed, self.skipped, self.failed, self.error, self.pages, self.listed,
        )
    }
}

pub fn show_indicator(
    stats_receiver: Receiver<SyncStatistics>,
    show_progress: bool,
    show_result: bool,
    dry_run: bool,
) -> JoinHandle<()> {
    let progress_style = ProgressStyle::with_template("{wide_msg}").unwrap();
    let progress_text = ProgressBar::new(0);
    progress_text.set_style(progress_style);

    tokio::spawn(async move {
        let start_time = Instant::now();

        let mut ma_synced_bytes = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();
        let mut ma_synced_count = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();

        let mut totals = Totals::default();

        loop {
            let mut sync_bytes: u64 = 0;
            let mut sync_count: u64 = 0;

            let period = Instant::now();
            loop {
                while let Ok(sync_stats) = stats_receiver.try_recv() {
                    let (count, bytes) = totals.add(sync_stats);
                    sync_count += count;
                    sync_bytes += bytes;
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() {
                    let elapsed = start_time.elapsed();
                    let elapsed_secs_f64 = elapsed.as_secs_f64();

                    let mut objects_per_sec = (totals.synced as f64 / elapsed_secs_f64) as u64;
                    let mut sync_bytes_per_sec =
                        (totals.synced_bytes as f64 / elapsed_secs_f64) as u64;

                    if elapsed_secs_f64 < REFRESH_INTERVAL as f64 {
                        objects_per_sec = totals.synced;
                        sync_bytes_per_sec = totals.synced_bytes;
                    }
                    if dry_run {
                        objects_per_sec = 0;
                        sync_bytes_per_sec = 0;
                    }

                    info!(
                        message = "sync summary",
                        transferred_byte = totals.synced_bytes,
                        transferred_byte_per_sec = sync_bytes_per_sec,
                        transferred_object = totals.synced,
                        transferred_object_per_sec = objects_per_sec,
                        transformed = totals.transformed,
                        skipped = totals.skipped,
                        failed = totals.failed,
                        error = totals.error,
                        pages = totals.pages,
                        listed = totals.listed,
                        duration_sec = elapsed_secs_f64,
                    );

                    if show_result {
                        progress_text.set_style(ProgressStyle::with_template("{msg}").unwrap());

                        progress_text.finish_with_message(format!(
                            "{:>3} | {:>3}/sec,  transferred {:>3} objects | {:>3} objects/sec,  {},  duration {}",
                            HumanBytes(totals.synced_bytes),
                            HumanBytes(sync_bytes_per_sec),
                            totals.synced,
                            HumanCount(objects_per_sec),
                            totals.counts_message(),
                            HumanDuration(elapsed),
                        ));

                        println!();
                        let _ = io::stdout().flush();
                    }

                    return;
                }

                tokio::time::sleep(std::time::Duration::from_secs_f32(0.05)).await;
            }
            ma_synced_bytes.add_sample(sync_bytes);

            if !dry_run {
                ma_synced_count.add_sample(sync_count);
            }

            if show_progress {
                progress_text.set_message(format!(
                    "{:>3} | {:>3}/sec,  transferred {:>3} objects | {:>3} objects/sec,  {}",
                    HumanBytes(totals.synced_bytes),
                    HumanBytes(ma_synced_bytes.get_average()).to_string(),
                    totals.synced,
                    HumanCount(ma_synced_count.get_average()).to_string(),
                    totals.counts_message(),
                ));
            }
        }
    })
}
