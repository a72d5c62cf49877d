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
use geoharvest_common::datetime::{fmt_hms,iso_date_string,parse_iso_date};

// run with "cargo test test_dates -- --nocapture"

#[test]
fn test_dates() {
    // all provider date shapes normalize to YYYY-MM-DD
    let inputs = [
        "2025-05-02",
        "2025-05-02T12:31:38Z",
        "2025-05-02T12:31:38.783221+00:00",
        "2025-05-02T12:31:38",
    ];

    for input in inputs {
        let normalized = iso_date_string( Some(input));
        println!("{input} -> {normalized:?}");
        assert_eq!( normalized, Some("2025-05-02".to_string()));
    }
}

#[test]
fn test_invalid_dates() {
    assert_eq!( iso_date_string(None), None);
    assert_eq!( iso_date_string( Some("")), None);
    assert_eq!( iso_date_string( Some("yesterday")), None);
    assert_eq!( iso_date_string( Some("05/02/2025")), None);
    assert_eq!( iso_date_string( Some("2025-13-40")), None);

    assert!( parse_iso_date("2025-02-30").is_none());
}

#[test]
fn test_fmt_hms() {
    assert_eq!( fmt_hms( Duration::from_secs(0)), "00:00:00");
    assert_eq!( fmt_hms( Duration::from_secs(59)), "00:00:59");
    assert_eq!( fmt_hms( Duration::from_secs(3600 + 23*60 + 7)), "01:23:07");
    assert_eq!( fmt_hms( Duration::from_secs(26*3600)), "26:00:00"); // runtimes can exceed a day
}
