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

///! harvester progress checkpoint. This is authoritative for input list progress -
///! on resume the harvester skips the first `successful + failed` identifiers of each
///! (deterministically ordered) input list. The file is rewritten atomically on every
///! commit so an abrupt kill leaves either the old or the new checkpoint, never a torn one

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize,Serialize};

use geoharvest_common::fs::write_file_atomic;
use geoharvest_provider::ContentProvider;
use crate::errors::Result;

/// per-provider harvest progress
#[derive(Serialize,Deserialize,Debug,Clone,Default)]
pub struct ProviderProgress {
    pub counter_successful: u64,
    pub counter_failed: u64,
    pub datasets_successful: Vec<String>,
    pub datasets_failed: Vec<String>,

    /// status code (or "undefined") -> identifiers that failed with it
    pub http_error: HashMap<String,Vec<String>>,
}

impl ProviderProgress {
    /// how many input list entries this provider has consumed (the resume skip count)
    pub fn total (&self)->u64 {
        self.counter_successful + self.counter_failed
    }

    pub fn record_success (&mut self, identifier: &str) {
        self.counter_successful += 1;
        self.datasets_successful.push( identifier.to_string());
    }

    pub fn record_failure (&mut self, identifier: &str, error: &str) {
        self.counter_failed += 1;
        self.datasets_failed.push( identifier.to_string());
        self.http_error.entry( error.to_string()).or_default().push( identifier.to_string());
    }
}

#[derive(Serialize,Deserialize,Debug,Clone)]
pub struct HarvestCheckpoint {
    providers: HashMap<ContentProvider,ProviderProgress>,
}

impl HarvestCheckpoint {
    pub fn new ()->Self {
        let providers = HashMap::from( ContentProvider::ALL.map( |p| (p, ProviderProgress::default())) );
        HarvestCheckpoint { providers }
    }

    /// load a previously committed checkpoint, None if there is none yet
    pub fn load (path: impl AsRef<Path>)->Result<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None)
        }
        let data = std::fs::read(path)?;
        let mut checkpoint: HarvestCheckpoint = serde_json::from_slice( data.as_slice())?;

        // make sure lookups never miss, whatever the blob contained
        for provider in ContentProvider::ALL {
            checkpoint.providers.entry(provider).or_default();
        }
        Ok( Some(checkpoint) )
    }

    /// commit the checkpoint via write-temp + rename
    pub fn save (&self, path: impl AsRef<Path>)->Result<()> {
        let data = serde_json::to_vec(self)?;
        write_file_atomic( path, data.as_slice())?;
        Ok(())
    }

    pub fn progress (&self, provider: ContentProvider)->&ProviderProgress {
        self.providers.get(&provider).expect("checkpoint holds all providers")
    }

    pub fn progress_mut (&mut self, provider: ContentProvider)->&mut ProviderProgress {
        self.providers.entry(provider).or_default()
    }

    /// true if every provider has at least `threshold` successfully harvested datasets
    pub fn all_reached (&self, threshold: u64)->bool {
        ContentProvider::ALL.iter().all( |p| self.progress(*p).counter_successful >= threshold)
    }
}
