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

use std::collections::HashSet;
use geoharvest_harvester::{load_identifier_list,partition_identifiers};

// run with "cargo test test_resume -- --nocapture"

fn ids (values: &[&str])->Vec<String> {
    values.iter().map( |s| s.to_string()).collect()
}

#[test]
fn test_fresh_start() {
    let (to_fetch, reconciled) = partition_identifiers( ids(&["a","b","c"]), 0, &HashSet::new());
    assert_eq!( to_fetch, ids(&["a","b","c"]));
    assert!( reconciled.is_empty());
}

#[test]
fn test_checkpoint_skip() {
    // the checkpoint consumed the first two entries (successful or failed alike)
    let (to_fetch, reconciled) = partition_identifiers( ids(&["a","b","c","d"]), 2, &HashSet::new());
    assert_eq!( to_fetch, ids(&["c","d"]));
    assert!( reconciled.is_empty());

    // a skip beyond the list end just leaves nothing to do
    let (to_fetch, _) = partition_identifiers( ids(&["a"]), 5, &HashSet::new());
    assert!( to_fetch.is_empty());
}

#[test]
fn test_store_wins() {
    // "c" was committed in a run whose checkpoint write got lost - it must not be
    // fetched again, while "d" (absent from store and checkpoint) must not be skipped
    let committed: HashSet<String> = ids(&["a","c"]).into_iter().collect();

    let (to_fetch, reconciled) = partition_identifiers( ids(&["a","b","c","d"]), 1, &committed);
    println!("to_fetch = {to_fetch:?}, reconciled = {reconciled:?}");
    assert_eq!( to_fetch, ids(&["b","d"]));
    assert_eq!( reconciled, ids(&["c"]));
}

#[test]
fn test_identifier_list_order() {
    // resume arithmetic relies on the input list being stable across runs
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identifiers.json");
    std::fs::write( &path, r#"["doi:10.5061/dryad.b","doi:10.5061/dryad.a"]"#).unwrap();

    let list = load_identifier_list(&path).unwrap();
    assert_eq!( list, ids(&["doi:10.5061/dryad.b","doi:10.5061/dryad.a"])); // file order, no resorting
}
