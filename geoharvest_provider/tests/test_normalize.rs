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
use geoharvest_provider::{
    analyse_files,is_archive_format,is_geospatial_format,normalize,ContentProvider
};

// run with "cargo test test_normalize -- --nocapture"

#[test]
fn test_format_sets() {
    assert!( is_geospatial_format(".csv"));
    assert!( is_geospatial_format(".GeoJSON")); // case insensitive
    assert!( !is_geospatial_format(".txt"));

    assert!( is_archive_format(".zip"));
    assert!( is_archive_format(".Z"));
    assert!( is_archive_format(".tar"));
    assert!( !is_archive_format(".csv"));
    assert!( !is_archive_format(""));
}

#[test]
fn test_dryad_normalize() {
    let raw = json!({
        "id": 26651,
        "identifier": "doi:10.5061/dryad.j1fd7",
        "title": "Data from: something with rivers",
        "abstract": "water flows",
        "keywords": ["hydrology", "rivers"],
        "publicationDate": "2020-05-02",
        "lastModificationDate": "2021-01-01T08:00:00Z",
        "sharingLink": "https://datadryad.org/stash/share/xyz",
        "files_count": 3,
        "files_total": 3,
        "files_embedded": {
            "stash:files": [
                { "path": "rivers.csv", "size": 100,
                  "_links": { "stash:download": { "href": "/api/v2/files/1/download" } } },
                { "path": "unavailable.bin", "size": 999,
                  "_links": {} },
                { "path": "shapes.zip", "size": 250,
                  "_links": { "stash:download": { "href": "/api/v2/files/2/download" } } }
            ]
        }
    });

    let record = normalize( ContentProvider::Dryad, &raw).unwrap();
    println!("dryad record: {record:?}");

    assert_eq!( record.content_provider, ContentProvider::Dryad);
    assert_eq!( record.id, Some("26651".to_string()));
    assert_eq!( record.doi, Some("doi:10.5061/dryad.j1fd7".to_string()));
    assert_eq!( record.created_date, Some("2020-05-02".to_string()));
    assert_eq!( record.modified_date, Some("2021-01-01".to_string()));
    assert_eq!( record.url_api, None);
    assert_eq!( record.keywords, Some(vec!["hydrology".to_string(), "rivers".to_string()]));

    // the entry without a download link is not retrievable and does not count
    assert_eq!( record.sum_size, 350);
    assert_eq!( record.files_types, vec![".csv".to_string(), ".zip".to_string()]);
    assert_eq!( record.files, vec![
        ("rivers.csv".to_string(), "https://datadryad.org/api/v2/files/1/download".to_string()),
        ("shapes.zip".to_string(), "https://datadryad.org/api/v2/files/2/download".to_string()),
    ]);
    assert!( record.geospatial_flag);
    assert!( record.download_flag);
}

#[test]
fn test_figshare_normalize() {
    let raw = json!({
        "id": 9978467,
        "doi": "10.6084/m9.figshare.9978467.v1",
        "title": "elevation rasters",
        "description": "a DEM",
        "tags": ["DEM"],
        "created_date": "2019-07-30T12:55:02Z",
        "modified_date": "2019-08-01T09:00:00Z",
        "url": "https://api.figshare.com/v2/articles/9978467",
        "figshare_url": "https://figshare.com/articles/9978467",
        "files": [
            { "name": "dem.TIF", "download_url": "https://ndownloader.figshare.com/files/1", "size": 4096 },
            { "name": "README", "download_url": "https://ndownloader.figshare.com/files/2", "size": 10 }
        ]
    });

    let record = normalize( ContentProvider::Figshare, &raw).unwrap();
    println!("figshare record: {record:?}");

    assert_eq!( record.created_date, Some("2019-07-30".to_string()));
    assert_eq!( record.url_api, Some("https://api.figshare.com/v2/articles/9978467".to_string()));
    assert_eq!( record.sum_size, 4106);
    assert_eq!( record.files_types, vec![".tif".to_string(), "".to_string()]); // extensionless -> ""
    assert!( record.geospatial_flag);
    assert!( record.download_flag); // via the geospatial .tif
}

#[test]
fn test_zenodo_normalize() {
    let raw = json!({
        "id": 1220711,
        "doi": "10.5281/zenodo.1220711",
        "title": "survey tracks",
        "created": "2018-04-18T09:13:37.783221+00:00",
        "modified": "2018-04-19T00:00:00+00:00",
        "links": {
            "self": "https://zenodo.org/api/records/1220711",
            "self_html": "https://zenodo.org/records/1220711"
        },
        "metadata": {
            "description": "gps tracks of the survey",
            "keywords": ["gps"]
        },
        "files": [
            { "key": "tracks.gpx", "size": 2048,
              "links": { "self": "https://zenodo.org/api/records/1220711/files/tracks.gpx/content" } },
            { "key": "notes.txt", "size": 8,
              "links": { "self": "https://zenodo.org/api/records/1220711/files/notes.txt/content" } }
        ]
    });

    let record = normalize( ContentProvider::Zenodo, &raw).unwrap();
    println!("zenodo record: {record:?}");

    assert_eq!( record.created_date, Some("2018-04-18".to_string()));
    assert_eq!( record.description, Some("gps tracks of the survey".to_string()));
    assert_eq!( record.keywords, Some(vec!["gps".to_string()]));

    // file names come from the parent path element of the content link
    assert_eq!( record.files, vec![
        ("tracks.gpx".to_string(), "https://zenodo.org/api/records/1220711/files/tracks.gpx/content".to_string()),
        ("notes.txt".to_string(), "https://zenodo.org/api/records/1220711/files/notes.txt/content".to_string()),
    ]);
    assert_eq!( record.sum_size, 2056);
    assert_eq!( record.files_types, vec![".gpx".to_string(), ".txt".to_string()]);
    assert!( record.geospatial_flag);
}

#[test]
fn test_flags_follow_types() {
    // archive-only dataset: download_flag without geospatial_flag
    let raw = json!({
        "id": 1,
        "files": [
            { "name": "bundle.tar.gz", "download_url": "https://example.org/1", "size": 100 }
        ]
    });
    let record = normalize( ContentProvider::Figshare, &raw).unwrap();
    assert_eq!( record.files_types, vec![".gz".to_string()]); // last suffix decides
    assert!( !record.geospatial_flag);
    assert!( record.download_flag);

    // nothing classifiable -> neither flag, nothing to download
    let raw = json!({ "id": 2, "files": [ { "name": "paper.pdf", "download_url": "https://example.org/2", "size": 5 } ] });
    let record = normalize( ContentProvider::Figshare, &raw).unwrap();
    assert!( !record.geospatial_flag);
    assert!( !record.download_flag);

    // sum_size always equals the sum over the enumerated files
    let fa = analyse_files( ContentProvider::Figshare, &json!({ "files": [
        { "name": "a.csv", "download_url": "u1", "size": 1 },
        { "name": "b.csv", "download_url": "u2", "size": 2 }
    ]}));
    assert_eq!( fa.sum_size, 3);
}

#[test]
fn test_unusable_metadata() {
    assert!( normalize( ContentProvider::Dryad, &json!("not an object")).is_err());
    assert!( normalize( ContentProvider::Zenodo, &json!(null)).is_err());

    // object without any files section still normalizes - just with empty file info
    let record = normalize( ContentProvider::Dryad, &json!({ "id": 3 })).unwrap();
    assert_eq!( record.sum_size, 0);
    assert!( record.files.is_empty());
    assert!( !record.download_flag);
}
