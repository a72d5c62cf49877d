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

///! the metadata harvester pipeline: per-provider task queues seeded from deterministic
///! identifier lists, one fetch worker per provider, and a single consumer that
///! normalizes results, maintains the checkpoint and commits batches to the store

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path,PathBuf};
use std::time::Instant;
use kanal::{bounded_async,unbounded_async,AsyncReceiver,AsyncSender};
use serde::{Deserialize,Serialize};
use serde_json::Value;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug,info,warn};

use geoharvest_common::datetime::{fmt_hms,secs};
use geoharvest_provider::{
    fetch_metadata,normalize,ContentProvider,GeoharvestProviderError,HttpClient,ProviderThrottles
};
use geoharvest_store::{DatasetRecord,HarvestCheckpoint,Store};

mod errors;
pub use errors::*;

/// general harvester parameters configuration
#[derive(Clone,Serialize,Deserialize,Debug)]
pub struct HarvesterConfig {
    /// per provider identifier list (JSON array of strings, deterministic order)
    pub identifier_lists: HashMap<ContentProvider,PathBuf>,

    /// pathname of the checkpoint blob (rewritten atomically on each commit)
    pub checkpoint_path: PathBuf,

    /// pathname of the SQLite store
    pub db_path: PathBuf,

    /// optional provider API access tokens (currently only used by Zenodo)
    #[serde(default)]
    pub access_tokens: HashMap<ContentProvider,String>,

    /// per provider number of successfully harvested datasets after which we stop
    #[serde(default="default_success_threshold")]
    pub success_threshold: u64,

    /// number of successful records batched between commits
    #[serde(default="default_commit_batch")]
    pub commit_batch: usize,

    /// bound of the shared result channel
    #[serde(default="default_result_queue_bound")]
    pub result_queue_bound: usize,
}

fn default_success_threshold ()->u64 { 100_000 }
fn default_commit_batch ()->usize { 1000 }
fn default_result_queue_bound ()->usize { 1024 }

/// what a fetch worker produced for one identifier
#[derive(Debug)]
pub enum FetchOutcome {
    Metadata(Value),
    HttpError(u16),
    Undefined,
}

#[derive(Debug)]
struct HarvestItem {
    provider: ContentProvider,
    identifier: String,
    outcome: FetchOutcome,
}

/// load a deterministic identifier list (JSON array of strings)
pub fn load_identifier_list (path: impl AsRef<Path>)->Result<Vec<String>> {
    let data = std::fs::read( path.as_ref())?;
    Ok( serde_json::from_slice( data.as_slice())? )
}

/// split an identifier list into the part that still has to be fetched and the part the
/// store already holds. The first `skip` entries were consumed in a previous run (the
/// checkpoint is authoritative for them); of the rest, identifiers with a committed
/// record are reconciled instead of refetched - the store wins over a stale checkpoint
pub fn partition_identifiers (identifiers: Vec<String>, skip: usize, committed: &std::collections::HashSet<String>)
    ->(Vec<String>,Vec<String>)
{
    identifiers.into_iter().skip(skip).partition( |identifier| !committed.contains(identifier))
}

/// run the harvester pipeline to completion. `cancel` is the shared stop signal -
/// set by the consumer when all providers reached their quota, or externally (Ctrl-C)
pub async fn run_harvest (config: HarvesterConfig, cancel: CancellationToken)->Result<()> {
    let time_begin = Instant::now();

    let mut checkpoint = HarvestCheckpoint::load( &config.checkpoint_path)?.unwrap_or_else( HarvestCheckpoint::new);
    let store = Store::open( &config.db_path).await?;

    let throttles = ProviderThrottles::new();
    let client = HttpClient::new( throttles, cancel.clone())?;
    let (result_tx, result_rx) = bounded_async::<HarvestItem>( config.result_queue_bound);

    let mut workers = Vec::new();

    for provider in ContentProvider::ALL {
        let Some(list_path) = config.identifier_lists.get(&provider) else { continue };

        let identifiers = load_identifier_list( list_path)?;
        let skip = checkpoint.progress(provider).total() as usize;
        let committed = store.existing_identifiers( provider).await?;

        let (to_fetch, reconciled) = partition_identifiers( identifiers, skip, &committed);
        for identifier in &reconciled {
            checkpoint.progress_mut(provider).record_success( identifier.as_str());
        }

        let (task_tx, task_rx) = unbounded_async::<String>();
        let queued = to_fetch.len();
        for identifier in to_fetch {
            task_tx.send(identifier).await.map_err( |e| op_failed(e))?;
        }
        drop(task_tx); // workers terminate once the seeded queue is drained

        info!("{}: {} identifiers queued ({} skipped from checkpoint, {} reconciled from store)",
              provider, queued, skip, reconciled.len());

        let worker_client = client.clone();
        let access_token = config.access_tokens.get(&provider).cloned();
        let results = result_tx.clone();
        let worker_cancel = cancel.clone();

        workers.push( tokio::spawn( async move {
            fetch_worker( worker_client, provider, access_token, task_rx, results, worker_cancel).await
        }));
    }
    drop(result_tx); // the result channel closes when the last worker is done

    result_consumer( &store, result_rx, &mut checkpoint, &config, cancel.clone(), time_begin).await?;

    for worker in workers {
        worker.await?;
    }

    print!("\r\x1b[K");
    println!("Finished metadata harvesting in {}", fmt_hms( time_begin.elapsed()));
    Ok(())
}

/// pull identifiers off the task queue and fetch their metadata until the queue is
/// drained or the stop signal is set
async fn fetch_worker (client: HttpClient, provider: ContentProvider, access_token: Option<String>,
                       tasks: AsyncReceiver<String>, results: AsyncSender<HarvestItem>, cancel: CancellationToken)
{
    loop {
        let identifier = tokio::select! {
            _ = cancel.cancelled() => break,
            recv = tasks.recv() => match recv {
                Ok(identifier) => identifier,
                Err(_) => break, // queue drained
            }
        };

        let outcome = match fetch_metadata( &client, provider, identifier.as_str(), access_token.as_deref()).await {
            Ok(raw) => FetchOutcome::Metadata(raw),
            Err(GeoharvestProviderError::StatusError{status,..}) => FetchOutcome::HttpError(status),
            Err(GeoharvestProviderError::CancelledError) => break,
            Err(e) => {
                debug!("{} metadata fetch for {} failed: {}", provider, identifier, e);
                FetchOutcome::Undefined
            }
        };

        if results.send( HarvestItem { provider, identifier, outcome }).await.is_err() {
            break // consumer is gone
        }
    }
}

/// drain the shared result channel, update the checkpoint, and commit batches of
/// normalized records together with the checkpoint blob
async fn result_consumer (store: &Store, results: AsyncReceiver<HarvestItem>, checkpoint: &mut HarvestCheckpoint,
                          config: &HarvesterConfig, cancel: CancellationToken, time_begin: Instant)->Result<()>
{
    let mut pending: Vec<DatasetRecord> = Vec::new();
    let mut channel_closed = false;

    loop {
        // stop the workers once every provider reached its quota
        if checkpoint.all_reached( config.success_threshold) {
            cancel.cancel();

            // break right away if the quota was already met when we started
            if time_begin.elapsed() < secs(10) {
                break
            }
        }

        if pending.len() >= config.commit_batch || ((cancel.is_cancelled() || channel_closed) && results.is_empty()) {
            if !pending.is_empty() {
                print!("\r\x1b[K");
                println!("Write checkpoint, store.");

                checkpoint.save( &config.checkpoint_path)?;
                store.append_records( pending.as_slice()).await?;
                pending.clear();
            }

            if cancel.is_cancelled() || channel_closed {
                break
            }
        }

        let item = match timeout( secs(30), results.recv()).await {
            Ok(Ok(item)) => item,
            Ok(Err(_)) => { channel_closed = true; continue } // all workers done
            Err(_) => continue, // idle - re-evaluate stop policy
        };

        let progress = checkpoint.progress_mut( item.provider);
        match item.outcome {
            FetchOutcome::Metadata(raw) => {
                match normalize( item.provider, &raw) {
                    Ok(normalized) => {
                        progress.record_success( item.identifier.as_str());
                        pending.push( DatasetRecord { normalized, metadata: raw });
                    }
                    Err(e) => {
                        debug!("{} normalization of {} failed: {}", item.provider, item.identifier, e);
                        progress.record_failure( item.identifier.as_str(), "undefined");
                    }
                }
            }
            FetchOutcome::HttpError(status) => {
                progress.record_failure( item.identifier.as_str(), status.to_string().as_str());
            }
            FetchOutcome::Undefined => {
                progress.record_failure( item.identifier.as_str(), "undefined");
            }
        }

        print_progress( checkpoint, results.len(), pending.len(), time_begin);
    }

    cancel.cancel();
    println!();
    Ok(())
}

fn print_progress (checkpoint: &HarvestCheckpoint, queued: usize, pending: usize, time_begin: Instant) {
    let counts: Vec<(u64,u64)> = ContentProvider::ALL.iter().map( |p| {
        let progress = checkpoint.progress(*p);
        (progress.counter_successful, progress.total())
    }).collect();

    if counts.iter().any( |(_,total)| *total == 0) {
        return // suppress the status line until every provider reported something
    }

    let pct = |good: u64, total: u64| good as f64 / total as f64 * 100.0;

    print!("\r\x1b[K status: Runtime: {} | Dryad: {}/{} ({:.2} %) | Figshare: {}/{} ({:.2} %) | Zenodo: {}/{} ({:.2} %) | Queue: {} | Pending inserts: {}",
        fmt_hms( time_begin.elapsed()),
        counts[0].0, counts[0].1, pct(counts[0].0, counts[0].1),
        counts[1].0, counts[1].1, pct(counts[1].0, counts[1].1),
        counts[2].0, counts[2].1, pct(counts[2].0, counts[2].1),
        queued, pending
    );
    let _ = std::io::stdout().flush();
}
