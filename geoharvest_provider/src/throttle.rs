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

///! per-provider request throttle records.
///! One record per provider holds the earliest instant at which the next outbound
///! request may be issued, plus a "currently sleeping until" field the progress
///! reporter surfaces during long rate limit sleeps. A single holder mutates a
///! record at a time - workers only go through [crate::HttpClient]

use std::collections::HashMap;
use std::sync::{Arc,Mutex};
use std::time::{Duration,Instant};
use chrono::{DateTime,Utc};
use reqwest::header::HeaderMap;

use geoharvest_common::datetime::{millis,secs};
use crate::ContentProvider;

/// rate limit header pairs checked in order (Zenodo emits either spelling)
const RATE_LIMIT_HEADERS: [(&str,&str);2] = [
    ("x-ratelimit-remaining", "x-ratelimit-reset"),
    ("ratelimit-remaining", "ratelimit-reset"),
];

#[derive(Debug)]
struct Throttle {
    next_request: Instant,
    sleeping_until: Option<DateTime<Utc>>,
}

impl Throttle {
    fn new ()->Self {
        Throttle { next_request: Instant::now(), sleeping_until: None }
    }
}

/// the shared throttle state for all providers. Cheap to clone - all clones refer
/// to the same records
#[derive(Clone)]
pub struct ProviderThrottles {
    map: Arc<HashMap<ContentProvider, Mutex<Throttle>>>,
}

impl ProviderThrottles {
    pub fn new ()->Self {
        let map = HashMap::from( ContentProvider::ALL.map( |p| (p, Mutex::new(Throttle::new()))) );
        ProviderThrottles { map: Arc::new(map) }
    }

    fn lock (&self, provider: ContentProvider)->std::sync::MutexGuard<'_,Throttle> {
        // the map always holds all providers and throttle holders never panic while locked
        self.map.get(&provider).unwrap().lock().unwrap()
    }

    /// how long the caller has to wait before it may issue the next request
    pub fn wait_duration (&self, provider: ContentProvider)->Duration {
        let throttle = self.lock(provider);
        throttle.next_request.saturating_duration_since( Instant::now())
    }

    /// push the earliest permissible instant for the next request out by `delay` from now.
    /// Never moves it backwards
    pub fn defer (&self, provider: ContentProvider, delay: Duration) {
        let mut throttle = self.lock(provider);
        let next = Instant::now() + delay;
        if next > throttle.next_request {
            throttle.next_request = next;
        }
    }

    pub fn set_sleeping_until (&self, provider: ContentProvider, until: DateTime<Utc>) {
        self.lock(provider).sleeping_until = Some(until);
    }

    pub fn clear_sleeping_until (&self, provider: ContentProvider) {
        self.lock(provider).sleeping_until = None;
    }

    /// read by the progress reporter - set while a worker is in a rate limit sleep > 60 s
    pub fn sleeping_until (&self, provider: ContentProvider)->Option<DateTime<Utc>> {
        self.lock(provider).sleeping_until
    }
}

fn header_i64 (headers: &HeaderMap, name: &str)->Option<i64> {
    headers.get(name).and_then( |v| v.to_str().ok()).and_then( |s| s.trim().parse().ok())
}

/// post-request delay derived from rate limit response headers, checking both header
/// spellings in order. Returns None if neither pair is present
pub fn rate_limit_delay (headers: &HeaderMap, now_epoch: i64)->Option<Duration> {
    for (remaining_name, reset_name) in RATE_LIMIT_HEADERS {
        if let (Some(remaining), Some(reset)) = (header_i64(headers, remaining_name), header_i64(headers, reset_name)) {
            if remaining < 2 {
                return Some( secs( (reset - now_epoch).max(0) as u64) )
            }
            return Some( millis(500) )
        }
    }
    None
}

/// the delay to apply after a successful response from the given provider
pub fn post_request_delay (provider: ContentProvider, headers: &HeaderMap, now_epoch: i64)->Duration {
    match provider {
        ContentProvider::Zenodo => rate_limit_delay( headers, now_epoch).unwrap_or( provider.headerless_delay()),
        other => other.post_request_delay(),
    }
}

/// how long to back off after a 429 - at least 60 s, longer if Retry-After demands it
pub fn too_many_requests_delay (headers: &HeaderMap)->Duration {
    secs( header_i64(headers, "retry-after").unwrap_or(0).max(60) as u64)
}

/// how long to back off after a 5xx before the next attempt
pub fn server_error_delay (headers: &HeaderMap)->Duration {
    secs( header_i64(headers, "retry-after").unwrap_or(60).max(0) as u64)
}
