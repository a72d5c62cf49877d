/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

///! the single analyzer consumer: commits every result together with the provider
///! statistics row, reports progress, and orchestrates shutdown via the per-provider
///! stop signals

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use chrono::Utc;
use kanal::AsyncReceiver;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use geoharvest_common::datetime::{epoch_secs,fmt_hms,secs};
use geoharvest_provider::{ContentProvider,ProviderThrottles};
use geoharvest_store::{ProviderStatistics,Store};
use crate::{AnalysisResult,AnalyzerConfig,ExtentTask,Result,WorkerStats};

pub async fn result_consumer (store: &Store, config: &AnalyzerConfig,
                              results: AsyncReceiver<AnalysisResult>, extent_queue: AsyncReceiver<ExtentTask>,
                              mut statistics: HashMap<ContentProvider,ProviderStatistics>,
                              stop_signals: HashMap<ContentProvider,CancellationToken>,
                              worker_stats: Arc<WorkerStats>, throttles: ProviderThrottles,
                              time_begin: Instant)->Result<()>
{
    let mut channel_closed = false;

    loop {
        let mut received = None;
        match timeout( secs(10), results.recv()).await {
            Ok(Ok(result)) => received = Some(result),
            Ok(Err(_)) => channel_closed = true, // all workers done
            Err(_) => {} // idle - still report progress and check stop conditions
        }

        if let Some(result) = received {
            let stats = statistics.entry( result.provider).or_default();
            stats.processed_counter += 1;
            stats.processed_data_volume += result.sum_size;

            // a bbox with NaN coordinates is as good as none
            let bbox = result.extent.bbox.as_ref()
                .filter( |b| !b.is_empty() && !b.iter().any( |x| x.is_nan()));
            if bbox.is_some() {
                stats.with_bbox += 1;
            }

            if result.extent.timeout.is_some() {
                stats.timeout_counter += 1;
            }

            store.commit_analysis(
                result.key, result.provider, &result.status.to_json(),
                bbox, result.extent.timeout, epoch_secs(), stats
            ).await?;
        }

        print_progress( &statistics, &worker_stats, &throttles, results.len(), extent_queue.len(), time_begin);

        //--- set per-provider stop signals
        for provider in ContentProvider::ALL {
            let stats = statistics.get(&provider).copied().unwrap_or_default();
            let count_reached = stats.processed_counter >= config.count_threshold;
            let budget_spent = time_begin.elapsed() > config.time_budget;

            // the wall-clock budget is the operative trigger unless counts are configured in
            let stop_now = if config.count_triggers_stop { count_reached || budget_spent } else { budget_spent };

            if stop_now {
                if let Some(signal) = stop_signals.get(&provider) {
                    if !signal.is_cancelled() {
                        signal.cancel();
                        println!("Send stop signal to {} download worker.", provider);
                    }
                }
            }
        }

        //--- terminate once everything is stopped and drained
        let all_stopped = stop_signals.values().all( |signal| signal.is_cancelled());
        let drained = extent_queue.is_empty() && results.is_empty()
            && worker_stats.active_download.load(Ordering::Relaxed) == 0
            && worker_stats.active_extent.load(Ordering::Relaxed) == 0;

        if (all_stopped && drained) || (channel_closed && results.is_empty()) {
            break
        }
    }

    Ok(())
}

fn print_progress (statistics: &HashMap<ContentProvider,ProviderStatistics>, worker_stats: &WorkerStats,
                   throttles: &ProviderThrottles, result_queued: usize, extent_queued: usize, time_begin: Instant)
{
    println!(
        "status: Runtime: {} | Dryad: {} Figshare: {} Zenodo: {} Active download worker: {}/{} | Active extent worker: {}/{} | Extent-Queue: {} | Result-Queue: {}",
        fmt_hms( time_begin.elapsed()),
        provider_text( statistics, throttles, ContentProvider::Dryad),
        provider_text( statistics, throttles, ContentProvider::Figshare),
        provider_text( statistics, throttles, ContentProvider::Zenodo),
        worker_stats.active_download.load(Ordering::Relaxed), worker_stats.total_download.load(Ordering::Relaxed),
        worker_stats.active_extent.load(Ordering::Relaxed), worker_stats.total_extent.load(Ordering::Relaxed),
        extent_queued, result_queued
    );
}

fn provider_text (statistics: &HashMap<ContentProvider,ProviderStatistics>, throttles: &ProviderThrottles,
                  provider: ContentProvider)->String
{
    let Some(stats) = statistics.get(&provider) else { return "### |".to_string() };

    if stats.processed_counter > 0 {
        let pct = stats.with_bbox as f64 / stats.processed_counter as f64 * 100.0;
        let mut text = format!("{}/{} ({:.2} %) ", stats.with_bbox, stats.processed_counter, pct);

        // surface an active rate limit sleep window
        if let Some(until) = throttles.sleeping_until(provider) {
            let remaining = (until - Utc::now()).to_std().unwrap_or_default();
            text.push_str( format!("(Sleep: {}) ", fmt_hms(remaining)).as_str());
        }
        text.push('|');
        text
    } else {
        "### |".to_string()
    }
}
