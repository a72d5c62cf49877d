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

use serde_json::json;
use geoharvest_provider::{CanonicalRecord,ContentProvider};
use geoharvest_store::{quantile,DatasetRecord,ProviderStatistics,Store};

// run with "cargo test test_store -- --nocapture"

fn record (provider: ContentProvider, id: &str, sum_size: i64, download_flag: bool)->DatasetRecord {
    let normalized = CanonicalRecord {
        content_provider: provider,
        created_date: Some("2020-05-02".to_string()),
        modified_date: None,
        id: Some(id.to_string()),
        doi: Some( format!("doi:10.5061/dryad.{id}")),
        url_api: None,
        url_html: None,
        title: Some( format!("dataset {id}")),
        description: None,
        keywords: None,
        sum_size,
        files_types: vec![".csv".to_string()],
        files: vec![ ("data.csv".to_string(), format!("https://example.org/{id}/data.csv")) ],
        geospatial_flag: download_flag,
        download_flag,
    };
    DatasetRecord { normalized, metadata: json!({"id": id, "raw": true}) }
}

#[tokio::test]
async fn test_append_and_pending() {
    let store = Store::open_in_memory().await.unwrap();

    let records = vec![
        record( ContentProvider::Dryad, "aaa11", 100, true),
        record( ContentProvider::Dryad, "bbb22", 5000, true),
        record( ContentProvider::Dryad, "ccc33", 200, false), // no download flag
        record( ContentProvider::Figshare, "123", 300, true),
    ];
    store.append_records( records.as_slice()).await.unwrap();

    assert_eq!( store.dataset_count( ContentProvider::Dryad).await.unwrap(), 3);
    assert_eq!( store.dataset_count( ContentProvider::Figshare).await.unwrap(), 1);

    // only download_flag = 1 below the size bound qualifies
    let tasks = store.pending_downloads( ContentProvider::Dryad, 1000.0).await.unwrap();
    println!("pending: {tasks:?}");
    assert_eq!( tasks.len(), 1);
    assert_eq!( tasks[0].sum_size, 100);
    assert_eq!( tasks[0].doi, Some("doi:10.5061/dryad.aaa11".to_string()));
    assert_eq!( tasks[0].files, vec![ ("data.csv".to_string(), "https://example.org/aaa11/data.csv".to_string()) ]);

    // identifiers for checkpoint reconciliation: doi for dryad, id for the rest
    let dryad_ids = store.existing_identifiers( ContentProvider::Dryad).await.unwrap();
    assert!( dryad_ids.contains("doi:10.5061/dryad.aaa11"));
    let figshare_ids = store.existing_identifiers( ContentProvider::Figshare).await.unwrap();
    assert!( figshare_ids.contains("123"));
}

#[tokio::test]
async fn test_commit_analysis() {
    let store = Store::open_in_memory().await.unwrap();
    store.init_statistics().await.unwrap();

    let records = vec![
        record( ContentProvider::Zenodo, "1", 100, true),
        record( ContentProvider::Zenodo, "2", 200, true),
    ];
    store.append_records( records.as_slice()).await.unwrap();

    let mut stats = store.load_statistics().await.unwrap();
    let zenodo = stats.get_mut( &ContentProvider::Zenodo).unwrap();

    // first record: bbox found
    zenodo.processed_counter += 1;
    zenodo.processed_data_volume += 100;
    zenodo.with_bbox += 1;
    let bbox = vec![5.0, 50.0, 6.0, 51.0];
    store.commit_analysis( 1, ContentProvider::Zenodo, &json!([200, 200]), Some(&bbox), None, 1700000000, zenodo).await.unwrap();

    // second record: extraction timed out
    zenodo.processed_counter += 1;
    zenodo.processed_data_volume += 200;
    zenodo.timeout_counter += 1;
    store.commit_analysis( 2, ContentProvider::Zenodo, &json!(["undefined"]), None, Some(3600), 1700000010, zenodo).await.unwrap();

    //--- dataset rows
    let row = store.analysis_columns(1).await.unwrap();
    println!("row 1: {row:?}");
    assert_eq!( row.processed_flag, 1);
    assert_eq!( row.bbox, Some("[5.0,50.0,6.0,51.0]".to_string()));
    assert_eq!( row.files_http_status_code, Some("[200,200]".to_string()));
    assert_eq!( row.timeout, None);
    assert_eq!( row.time_result_insert, Some(1700000000));

    let row = store.analysis_columns(2).await.unwrap();
    assert_eq!( row.processed_flag, 1);
    assert_eq!( row.bbox, None);
    assert_eq!( row.timeout, Some(3600));
    assert_eq!( row.files_http_status_code, Some(r#"["undefined"]"#.to_string()));

    //--- statistics row matches the processed dataset count
    let reloaded = store.load_statistics().await.unwrap();
    let zenodo = reloaded.get( &ContentProvider::Zenodo).unwrap();
    assert_eq!( zenodo.processed_counter, store.processed_count( ContentProvider::Zenodo).await.unwrap());
    assert_eq!( zenodo.processed_data_volume, 300);
    assert_eq!( zenodo.with_bbox, 1);
    assert_eq!( zenodo.timeout_counter, 1);

    // processed records no longer show up as pending work
    let tasks = store.pending_downloads( ContentProvider::Zenodo, f64::MAX).await.unwrap();
    assert!( tasks.is_empty());
}

#[tokio::test]
async fn test_statistics_init() {
    let store = Store::open_in_memory().await.unwrap();

    store.init_statistics().await.unwrap();
    let stats = store.load_statistics().await.unwrap();
    assert_eq!( stats.len(), 3);
    assert_eq!( stats.get( &ContentProvider::Dryad).unwrap().processed_counter, 0);

    // idempotent - a second init does not add rows
    store.init_statistics().await.unwrap();
    assert_eq!( store.load_statistics().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_size_quantile() {
    let store = Store::open_in_memory().await.unwrap();

    let records: Vec<_> = (1..=100).map( |i| record( ContentProvider::Figshare, &i.to_string(), i * 10, true)).collect();
    store.append_records( records.as_slice()).await.unwrap();

    // sizes 10..=1000: the 0.95 quantile interpolates between rank 95 and 96
    let q = store.sum_size_quantile( ContentProvider::Figshare, 0.95).await.unwrap().unwrap();
    println!("0.95 quantile = {q}");
    assert!( (q - 950.5).abs() < 1e-9);

    assert_eq!( store.sum_size_quantile( ContentProvider::Dryad, 0.95).await.unwrap(), None);
}

#[test]
fn test_quantile_interpolation() {
    assert_eq!( quantile( &[], 0.5), None);
    assert_eq!( quantile( &[42], 0.95), Some(42.0));
    assert_eq!( quantile( &[10, 20, 30, 40], 0.5), Some(25.0));
    assert_eq!( quantile( &[10, 20, 30, 40], 0.0), Some(10.0));
    assert_eq!( quantile( &[10, 20, 30, 40], 1.0), Some(40.0));
}
