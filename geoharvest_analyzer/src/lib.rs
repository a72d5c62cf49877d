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
#![allow(unused)]

///! the dataset analyzer pipeline: per-provider download workers stream dataset files
///! into scratch directories, a pool of extent workers probes them for geospatial
///! bounding boxes in subordinate OS processes, and a single consumer commits the
///! results plus per-provider statistics to the store

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64,Ordering};
use std::time::{Duration,Instant};
use kanal::{bounded_async,unbounded_async};
use serde::{Deserialize,Serialize};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::info;

use geoharvest_common::{datetime::{deserialize_duration,fmt_hms},fs::ensure_writable_dir};
use geoharvest_provider::{ContentProvider,HttpClient,ProviderThrottles};
use geoharvest_store::Store;

mod errors;
pub use errors::*;

mod download;
pub use download::*;

mod extent;
pub use extent::*;

mod consumer;
pub use consumer::*;

/// general analyzer parameters configuration
#[derive(Clone,Serialize,Deserialize,Debug)]
pub struct AnalyzerConfig {
    /// pathname of the SQLite store produced by the harvester
    pub db_path: PathBuf,

    /// parent directory for per-dataset scratch directories (should be on a large filesystem)
    pub scratch_root: PathBuf,

    /// quantile of pending download sizes used as per-provider size threshold
    #[serde(default="default_size_quantile")]
    pub size_quantile: f64,

    /// explicit per-provider size thresholds [B] overriding the quantile
    #[serde(default)]
    pub size_thresholds: HashMap<ContentProvider,f64>,

    /// Dryad datasets below this size [B] are first tried as a single server-side zip
    #[serde(default="default_dryad_zip_threshold")]
    pub dryad_zip_threshold: i64,

    /// per provider number of processed datasets after which the stop signal is set -
    /// only operative with `count_triggers_stop`
    #[serde(default="default_count_threshold")]
    pub count_threshold: i64,

    /// if false (default) the wall-clock budget is the only stop trigger
    #[serde(default)]
    pub count_triggers_stop: bool,

    /// wall-clock budget after which all providers get their stop signal
    #[serde(deserialize_with="deserialize_duration", default="default_time_budget")]
    pub time_budget: Duration,

    /// extent workers per download worker
    #[serde(default="default_extent_worker_factor")]
    pub extent_worker_factor: usize,

    /// bound of the download -> extent queue (caps scratch dir disk occupancy)
    #[serde(default="default_extent_queue_bound")]
    pub extent_queue_bound: usize,

    /// bound of the extent -> consumer result channel
    #[serde(default="default_result_queue_bound")]
    pub result_queue_bound: usize,

    pub extent_tool: ExtentToolConfig,
}

fn default_size_quantile ()->f64 { 0.95 }
fn default_dryad_zip_threshold ()->i64 { 200_000_000 }
fn default_count_threshold ()->i64 { 60 }
fn default_time_budget ()->Duration { Duration::from_secs(10 * 3600) }
fn default_extent_worker_factor ()->usize { 2 }
fn default_extent_queue_bound ()->usize { 6 }
fn default_result_queue_bound ()->usize { 64 }

/// invocation parameters of the external extent extraction tool
#[derive(Clone,Serialize,Deserialize,Debug)]
pub struct ExtentToolConfig {
    /// the extraction executable (e.g. "geoextent")
    pub program: PathBuf,

    /// fixed arguments placed before the probed directory
    #[serde(default)]
    pub args: Vec<String>,

    /// timeout passed to the tool itself
    #[serde(deserialize_with="deserialize_duration", default="default_soft_timeout")]
    pub soft_timeout: Duration,

    /// wall-clock timeout after which the tool process is terminated.
    /// The tool's own timeout does not reliably interrupt CPU bound probes
    #[serde(deserialize_with="deserialize_duration", default="default_hard_timeout")]
    pub hard_timeout: Duration,
}

fn default_soft_timeout ()->Duration { Duration::from_secs(30 * 60) }
fn default_hard_timeout ()->Duration { Duration::from_secs(60 * 60) }

/// an HTTP download status - either a status code or the "undefined" token for
/// failures that never got a response
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum FileStatus {
    Code(u16),
    Undefined,
}

impl FileStatus {
    pub fn to_json (&self)->Value {
        match self {
            FileStatus::Code(code) => Value::from(*code),
            FileStatus::Undefined => Value::from("undefined"),
        }
    }
}

/// the download status of one dataset: a single status for the Dryad bulk-zip path,
/// one status per file otherwise
#[derive(Debug,Clone)]
pub enum StatusCodes {
    Single(FileStatus),
    PerFile(Vec<FileStatus>),
}

impl StatusCodes {
    pub fn to_json (&self)->Value {
        match self {
            StatusCodes::Single(status) => status.to_json(),
            StatusCodes::PerFile(statuses) => Value::from( statuses.iter().map(FileStatus::to_json).collect::<Vec<_>>()),
        }
    }
}

/// unit of work handed from a download worker to an extent worker. The scratch dir
/// is owned by exactly one stage at a time and deleted when this is dropped
#[derive(Debug)]
pub struct ExtentTask {
    pub provider: ContentProvider,
    pub key: i64,
    pub sum_size: i64,
    pub status: StatusCodes,
    pub scratch: TempDir,
}

/// what the consumer commits for one dataset
#[derive(Debug)]
pub struct AnalysisResult {
    pub provider: ContentProvider,
    pub key: i64,
    pub sum_size: i64,
    pub status: StatusCodes,
    pub extent: ExtentOutcome,
}

/// live worker counters surfaced by the progress reporter
#[derive(Debug)]
pub struct WorkerStats {
    pub active_download: AtomicI64,
    pub total_download: AtomicI64,
    pub active_extent: AtomicI64,
    pub total_extent: AtomicI64,
}

impl WorkerStats {
    pub fn new (total_download: i64, total_extent: i64)->Self {
        WorkerStats {
            active_download: AtomicI64::new(0),
            total_download: AtomicI64::new(total_download),
            active_extent: AtomicI64::new(0),
            total_extent: AtomicI64::new(total_extent),
        }
    }
}

/// run the analyzer pipeline to completion. `cancel` is the external stop signal
/// (Ctrl-C) - the per-provider stop signals are derived from it
pub async fn run_analysis (config: AnalyzerConfig, cancel: CancellationToken)->Result<()> {
    let time_begin = Instant::now();

    if !config.db_path.is_file() {
        return Err( op_failed( format!("no store at {:?}", config.db_path)))
    }
    ensure_writable_dir( &config.scratch_root)?;

    let store = Store::open( &config.db_path).await?;
    store.init_statistics().await?;
    let statistics = store.load_statistics().await?;

    let config = Arc::new(config);
    let throttles = ProviderThrottles::new();
    let worker_stats = Arc::new( WorkerStats::new(
        ContentProvider::ALL.len() as i64,
        (ContentProvider::ALL.len() * config.extent_worker_factor) as i64
    ));

    let (extent_tx, extent_rx) = bounded_async::<ExtentTask>( config.extent_queue_bound);
    let (result_tx, result_rx) = bounded_async::<AnalysisResult>( config.result_queue_bound);

    let stop_signals: HashMap<ContentProvider,CancellationToken> =
        HashMap::from( ContentProvider::ALL.map( |p| (p, cancel.child_token())) );

    //--- download workers (one per provider)
    let mut workers = Vec::new();

    for provider in ContentProvider::ALL {
        let threshold = match config.size_thresholds.get(&provider) {
            Some(threshold) => *threshold,
            None => store.sum_size_quantile( provider, config.size_quantile).await?.unwrap_or(0.0),
        };

        let tasks = store.pending_downloads( provider, threshold).await?;
        info!("{}: {} pending downloads (sum_size < {:.0} B)", provider, tasks.len(), threshold);

        let (task_tx, task_rx) = unbounded_async();
        for task in tasks {
            task_tx.send(task).await.map_err( |e| op_failed(e))?;
        }
        drop(task_tx);

        let stop = stop_signals.get(&provider).unwrap().clone();
        let client = HttpClient::new( throttles.clone(), stop.clone())?;
        let worker_config = config.clone();
        let stats = worker_stats.clone();
        let to_extent = extent_tx.clone();
        let to_results = result_tx.clone();

        workers.push( tokio::spawn( async move {
            download_worker( worker_config, client, provider, stop, task_rx, to_extent, to_results, stats).await
        }));
    }
    drop(extent_tx); // closes once the last download worker is done

    //--- extent workers
    for _ in 0..(ContentProvider::ALL.len() * config.extent_worker_factor) {
        let worker_config = config.clone();
        let tasks = extent_rx.clone();
        let to_results = result_tx.clone();
        let stats = worker_stats.clone();

        workers.push( tokio::spawn( async move {
            extent_worker( worker_config, tasks, to_results, stats).await
        }));
    }
    drop(result_tx); // closes once the last worker is done

    result_consumer(
        &store, config.as_ref(), result_rx, extent_rx, statistics,
        stop_signals, worker_stats, throttles, time_begin
    ).await?;

    for worker in workers {
        worker.await?;
    }

    println!("Finished dataset analysis in {}", fmt_hms( time_begin.elapsed()));
    Ok(())
}
