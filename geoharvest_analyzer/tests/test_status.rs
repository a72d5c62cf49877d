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

use bytes::Bytes;
use serde_json::json;
use geoharvest_analyzer::{is_zip_unavailable,FileStatus,StatusCodes,DRYAD_ZIP_UNAVAILABLE};

// run with "cargo test test_status -- --nocapture"

#[test]
fn test_status_json() {
    // the bulk-zip path stores a single scalar status
    assert_eq!( StatusCodes::Single( FileStatus::Code(200)).to_json(), json!(200));
    assert_eq!( StatusCodes::Single( FileStatus::Undefined).to_json(), json!("undefined"));

    // per-file downloads store one entry per file, mixing codes and "undefined"
    let status = StatusCodes::PerFile( vec![
        FileStatus::Code(200),
        FileStatus::Undefined,
        FileStatus::Code(404),
    ]);
    let value = status.to_json();
    println!("status json = {value}");
    assert_eq!( value, json!([200, "undefined", 404]));

    // the serialized column text round-trips as JSON
    assert_eq!( serde_json::to_string(&value).unwrap(), r#"[200,"undefined",404]"#);
}

#[test]
fn test_zip_unavailable_body() {
    let body = Bytes::from_static( DRYAD_ZIP_UNAVAILABLE);
    assert!( is_zip_unavailable( Some(&body)));

    let other = Bytes::from_static( b"No such dataset");
    assert!( !is_zip_unavailable( Some(&other)));
    assert!( !is_zip_unavailable( None));
}
