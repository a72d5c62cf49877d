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

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use parse_duration::parse;

// simple Duration ctor wrappers so that call sites don't have to spell out std::time paths
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn secs_f64 (n: f64)->Duration { Duration::from_secs_f64(n) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }
#[inline] pub fn hours (n: u64)->Duration { Duration::from_secs(n * 3600) }

#[inline]
pub fn utc_now()->DateTime<Utc> {
    Utc::now()
}

#[inline]
pub fn epoch_secs ()->i64 {
    Utc::now().timestamp()
}

/// format an elapsed Duration as "HH:MM:SS" (hours keep counting past 24)
pub fn fmt_hms (dur: Duration)->String {
    let total = dur.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// parse the ISO-8601 shapes we get from provider metadata into a NaiveDate:
///   2025-05-02
///   2025-05-02T12:31:38Z
///   2025-05-02T12:31:38.783221+00:00
/// returns None for anything that does not parse (never panics)
pub fn parse_iso_date (s: &str)->Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some( dt.date_naive() )
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some( ndt.date() )
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// normalized "YYYY-MM-DD" rendering of an optional ISO-8601 input
pub fn iso_date_string (s: Option<&str>)->Option<String> {
    s.and_then(parse_iso_date).map(|nd| nd.format("%Y-%m-%d").to_string())
}

pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}
