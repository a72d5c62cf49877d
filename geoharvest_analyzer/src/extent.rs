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

///! geospatial extent extraction worker. The extraction tool runs as a subordinate OS
///! process per scratch directory - its internal timeout does not reliably interrupt
///! CPU bound probes (huge csv files), so a hard wall-clock kill backs it up

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use kanal::{AsyncReceiver,AsyncSender};
use serde::{Deserialize,Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug,warn};

use crate::{AnalysisResult,AnalyzerConfig,ExtentTask,ExtentToolConfig,WorkerStats};

/// what an extraction run produced. Both fields absent means the probe failed or
/// found nothing usable
#[derive(Serialize,Deserialize,Debug,Clone,Default)]
pub struct ExtentOutcome {
    /// [minx, miny, maxx, maxy] in EPSG:4326
    pub bbox: Option<Vec<f64>>,

    /// set iff extraction was cut off, to the timeout in seconds
    pub timeout: Option<i64>,
}

pub async fn extent_worker (config: Arc<AnalyzerConfig>, tasks: AsyncReceiver<ExtentTask>,
                            results: AsyncSender<AnalysisResult>, stats: Arc<WorkerStats>)
{
    while let Ok(task) = tasks.recv().await {
        stats.active_extent.fetch_add( 1, Ordering::Relaxed);

        let ExtentTask { provider, key, sum_size, status, scratch } = task;

        let extent = run_extent_tool( &config.extent_tool, scratch.path(), key).await;
        drop(scratch); // scratch dir contents are deleted no matter how extraction went

        // stay counted as active until the result is queued
        let handoff_failed = results.send( AnalysisResult { provider, key, sum_size, status, extent }).await.is_err();
        stats.active_extent.fetch_sub( 1, Ordering::Relaxed);

        if handoff_failed {
            break // consumer is gone
        }
    }

    stats.total_extent.fetch_sub( 1, Ordering::Relaxed);
}

/// run the external extraction tool over one scratch directory. The tool gets the soft
/// timeout passed as an argument and prints an ExtentOutcome JSON document on stdout;
/// exceeding the hard wall-clock timeout kills the process and records the cutoff
pub async fn run_extent_tool (config: &ExtentToolConfig, dir: &Path, key: i64)->ExtentOutcome {
    let mut cmd = Command::new( &config.program);
    cmd.args( &config.args)
        .arg("--timeout").arg( config.soft_timeout.as_secs().to_string())
        .arg(dir)
        .stdin( Stdio::null())
        .stdout( Stdio::piped())
        .stderr( Stdio::null())
        .kill_on_drop( true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!("{} could not spawn extent tool: {}", key, e);
            return ExtentOutcome::default()
        }
    };

    match timeout( config.hard_timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            if output.status.success() {
                match serde_json::from_slice::<ExtentOutcome>( output.stdout.as_slice()) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        debug!("{} unusable extent tool output: {}", key, e);
                        ExtentOutcome::default()
                    }
                }
            } else {
                debug!("{} extent tool failed with {:?}", key, output.status.code());
                ExtentOutcome::default()
            }
        }
        Ok(Err(e)) => {
            debug!("{} extent tool error: {}", key, e);
            ExtentOutcome::default()
        }
        Err(_elapsed) => {
            // dropping the timed out wait also kills the child (kill_on_drop)
            warn!("extent tool terminated after {} s. Key: {}", config.hard_timeout.as_secs(), key);
            ExtentOutcome { bbox: None, timeout: Some( config.hard_timeout.as_secs() as i64) }
        }
    }
}
