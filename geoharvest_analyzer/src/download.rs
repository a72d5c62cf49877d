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

///! per-provider dataset download worker. Streams all files of one dataset into a
///! fresh scratch directory and hands the directory off to the extent workers.
///! Dryad datasets below the zip threshold are first tried as a single server-side
///! generated archive

use std::sync::Arc;
use std::sync::atomic::Ordering;
use bytes::Bytes;
use kanal::{AsyncReceiver,AsyncSender};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug,info};

use geoharvest_provider::{
    url_encoded,ContentProvider,GeoharvestProviderError,HttpClient,DRYAD_BASE_URL
};
use geoharvest_store::DownloadTask;
use crate::{
    AnalysisResult,AnalyzerConfig,ExtentOutcome,ExtentTask,FileStatus,StatusCodes,WorkerStats
};

/// the literal body Dryad sends with a 4xx when it refuses server-side zip generation
pub const DRYAD_ZIP_UNAVAILABLE: &[u8] =
    b"The dataset is too large for zip file generation. Please download each file individually.";

/// true if a terminal bulk-zip response body is Dryad's structured "download each file
/// individually" refusal
pub fn is_zip_unavailable (body: Option<&Bytes>)->bool {
    body.map( |b| b.as_ref() == DRYAD_ZIP_UNAVAILABLE).unwrap_or(false)
}

enum DownloadDisposition {
    ToExtent(ExtentTask),
    Failed(StatusCodes),
    Cancelled,
}

pub async fn download_worker (config: Arc<AnalyzerConfig>, client: HttpClient, provider: ContentProvider,
                              stop: CancellationToken, tasks: AsyncReceiver<DownloadTask>,
                              extent_queue: AsyncSender<ExtentTask>, results: AsyncSender<AnalysisResult>,
                              stats: Arc<WorkerStats>)
{
    loop {
        let task = tokio::select! {
            _ = stop.cancelled() => break,
            recv = tasks.recv() => match recv {
                Ok(task) => task,
                Err(_) => break, // queue drained
            }
        };

        // the active count covers the handoff too, so drained-pipeline checks never
        // miss an in-flight dataset
        stats.active_download.fetch_add( 1, Ordering::Relaxed);
        let disposition = download_dataset( config.as_ref(), &client, provider, &task).await;

        let handoff_failed = match disposition {
            DownloadDisposition::ToExtent(extent_task) => {
                // blocks when the extent queue is full - backpressure on scratch space
                extent_queue.send(extent_task).await.is_err()
            }
            DownloadDisposition::Failed(status) => {
                let result = AnalysisResult {
                    provider, key: task.key, sum_size: task.sum_size,
                    status, extent: ExtentOutcome::default()
                };
                results.send(result).await.is_err()
            }
            DownloadDisposition::Cancelled => true,
        };
        stats.active_download.fetch_sub( 1, Ordering::Relaxed);

        if handoff_failed { break }
    }

    stats.total_download.fetch_sub( 1, Ordering::Relaxed);
}

/// retrieve all files of one dataset into a new scratch dir. The scratch dir is bound
/// to the returned ExtentTask - on all other paths it is dropped (and deleted) here
async fn download_dataset (config: &AnalyzerConfig, client: &HttpClient, provider: ContentProvider,
                           task: &DownloadTask)->DownloadDisposition
{
    let scratch = match tempfile::Builder::new().prefix("geoharvest-").tempdir_in( &config.scratch_root) {
        Ok(dir) => dir,
        Err(e) => {
            debug!("could not create scratch dir for {}: {}", task.key, e);
            return DownloadDisposition::Failed( StatusCodes::Single( FileStatus::Undefined))
        }
    };

    //--- Dryad: try to download the whole dataset as one server-side generated zip
    if provider == ContentProvider::Dryad && task.sum_size < config.dryad_zip_threshold {
        if let Some(doi) = &task.doi {
            let url = format!("{DRYAD_BASE_URL}/api/v2/datasets/{}/download", url_encoded(doi));
            let path = scratch.path().join("dataset.zip");

            match client.download_to_file( provider, url.as_str(), &path).await {
                Ok((status,len)) => {
                    debug!("dryad bulk zip for {}: {} B", task.key, len);
                    return DownloadDisposition::ToExtent( ExtentTask {
                        provider, key: task.key, sum_size: task.sum_size,
                        status: StatusCodes::Single( FileStatus::Code(status)), scratch
                    })
                }
                Err(GeoharvestProviderError::StatusError{status,body}) => {
                    if is_zip_unavailable( body.as_ref()) {
                        info!("dryad zip generation unavailable for {} - downloading files individually", task.key);
                        // fall through to per-file downloads below
                    } else {
                        debug!("dryad bulk zip for {} failed with {}", task.key, status);
                        return DownloadDisposition::Failed( StatusCodes::Single( FileStatus::Code(status)))
                    }
                }
                Err(GeoharvestProviderError::CancelledError) => return DownloadDisposition::Cancelled,
                Err(e) => {
                    debug!("dryad bulk zip for {} failed: {}", task.key, e);
                    return DownloadDisposition::Failed( StatusCodes::Single( FileStatus::Undefined))
                }
            }
        }
    }

    //--- per-file downloads (and Dryad datasets the server refuses to zip)
    let mut statuses: Vec<FileStatus> = Vec::with_capacity( task.files.len());

    for (name, url) in &task.files {
        let path = scratch.path().join(name);

        match client.download_to_file( provider, url.as_str(), &path).await {
            Ok((status,_len)) => statuses.push( FileStatus::Code(status)),
            Err(GeoharvestProviderError::StatusError{status,..}) => {
                debug!("download of {} for {} failed with {}", name, task.key, status);
                statuses.push( FileStatus::Code(status));
            }
            Err(GeoharvestProviderError::CancelledError) => return DownloadDisposition::Cancelled,
            Err(e) => {
                debug!("download of {} for {} failed: {}", name, task.key, e);
                statuses.push( FileStatus::Undefined);
            }
        }
    }

    DownloadDisposition::ToExtent( ExtentTask {
        provider, key: task.key, sum_size: task.sum_size,
        status: StatusCodes::PerFile(statuses), scratch
    })
}
