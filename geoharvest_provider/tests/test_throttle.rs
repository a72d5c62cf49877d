/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
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

use std::time::Duration;
use reqwest::header::{HeaderMap,HeaderValue};
use geoharvest_provider::{
    post_request_delay,rate_limit_delay,server_error_delay,too_many_requests_delay,
    ContentProvider,ProviderThrottles
};

// run with "cargo test test_throttle -- --nocapture"

fn headers (pairs: &[(&'static str, &str)])->HeaderMap {
    let mut hm = HeaderMap::new();
    for (k,v) in pairs {
        hm.insert( *k, HeaderValue::from_str(v).unwrap());
    }
    hm
}

#[test]
fn test_fixed_delays() {
    let empty = HeaderMap::new();

    assert_eq!( post_request_delay( ContentProvider::Dryad, &empty, 1000), Duration::from_millis(500));
    assert_eq!( post_request_delay( ContentProvider::Figshare, &empty, 1000), Duration::from_secs(1));

    // Zenodo without usable headers falls back to 2 s
    assert_eq!( post_request_delay( ContentProvider::Zenodo, &empty, 1000), Duration::from_secs(2));
}

#[test]
fn test_rate_limit_headers() {
    let now = 1_700_000_000;

    // plenty of requests left -> base delay
    let hm = headers( &[("x-ratelimit-remaining", "55"), ("x-ratelimit-reset", "1700000030")]);
    assert_eq!( rate_limit_delay( &hm, now), Some(Duration::from_millis(500)));

    // nearly exhausted -> sleep until the reset instant
    let hm = headers( &[("x-ratelimit-remaining", "1"), ("x-ratelimit-reset", "1700000005")]);
    let delay = rate_limit_delay( &hm, now).unwrap();
    println!("reset delay = {delay:?}");
    assert_eq!( delay, Duration::from_secs(5));

    // the alternate header spelling works the same
    let hm = headers( &[("ratelimit-remaining", "0"), ("ratelimit-reset", "1700000042")]);
    assert_eq!( rate_limit_delay( &hm, now), Some(Duration::from_secs(42)));

    // a reset instant in the past never yields a negative sleep
    let hm = headers( &[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1699999990")]);
    assert_eq!( rate_limit_delay( &hm, now), Some(Duration::from_secs(0)));

    // an incomplete pair does not count
    let hm = headers( &[("x-ratelimit-remaining", "1")]);
    assert_eq!( rate_limit_delay( &hm, now), None);

    // garbage values do not count either
    let hm = headers( &[("x-ratelimit-remaining", "lots"), ("x-ratelimit-reset", "soon")]);
    assert_eq!( rate_limit_delay( &hm, now), None);
}

#[test]
fn test_backoff_delays() {
    // 429 waits at least 60 s even when Retry-After asks for less
    assert_eq!( too_many_requests_delay( &headers( &[("retry-after", "5")])), Duration::from_secs(60));
    assert_eq!( too_many_requests_delay( &headers( &[("retry-after", "120")])), Duration::from_secs(120));
    assert_eq!( too_many_requests_delay( &HeaderMap::new()), Duration::from_secs(60));

    // 5xx honors Retry-After as given, with a 60 s default
    assert_eq!( server_error_delay( &headers( &[("retry-after", "5")])), Duration::from_secs(5));
    assert_eq!( server_error_delay( &HeaderMap::new()), Duration::from_secs(60));
}

#[test]
fn test_throttle_records() {
    let throttles = ProviderThrottles::new();

    // fresh records don't impose a wait
    assert_eq!( throttles.wait_duration( ContentProvider::Dryad), Duration::ZERO);

    // after a deferral the wait is (about) the deferred delay, for that provider only
    throttles.defer( ContentProvider::Dryad, Duration::from_secs(30));
    let wait = throttles.wait_duration( ContentProvider::Dryad);
    println!("wait = {wait:?}");
    assert!( wait > Duration::from_secs(29) && wait <= Duration::from_secs(30));
    assert_eq!( throttles.wait_duration( ContentProvider::Zenodo), Duration::ZERO);

    // deferring never moves the permissible instant backwards
    throttles.defer( ContentProvider::Dryad, Duration::from_secs(1));
    assert!( throttles.wait_duration( ContentProvider::Dryad) > Duration::from_secs(28));

    // sleep window bookkeeping for the progress reporter
    assert_eq!( throttles.sleeping_until( ContentProvider::Zenodo), None);
    let until = chrono::Utc::now() + chrono::Duration::seconds(90);
    throttles.set_sleeping_until( ContentProvider::Zenodo, until);
    assert_eq!( throttles.sleeping_until( ContentProvider::Zenodo), Some(until));
    throttles.clear_sleeping_until( ContentProvider::Zenodo);
    assert_eq!( throttles.sleeping_until( ContentProvider::Zenodo), None);
}
