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

///! mapping of provider-specific raw metadata documents into the canonical record
///! format shared by both pipelines

use std::path::Path;
use serde::{Deserialize,Serialize};
use serde_json::Value;

use geoharvest_common::{datetime::iso_date_string,fs::lowercase_suffix};
use crate::{
    errors::{parse_error,Result},
    ContentProvider
};

/// file extensions (leading dot, lowercase) the extent extraction library can probe directly
pub const GEOSPATIAL_FORMATS: &[&str] = &[
    ".geojson", ".csv", ".geotiff", ".tif", ".tiff", ".shp", ".gpkg", ".gpx", ".gml", ".kml",
];

/// archive extensions the extraction toolchain can unpack
pub const ARCHIVE_FORMATS: &[&str] = &[
    ".7z", ".cb7", ".ace", ".cba", ".adf", ".alz", ".ape", ".a", ".arc", ".arj",
    ".bz2", ".bz3", ".cab", ".chm", ".z", ".cpio", ".deb", ".dms", ".flac", ".gz",
    ".iso", ".lrz", ".lha", ".lzh", ".lz", ".lzma", ".lzo", ".rpm", ".rar", ".cbr",
    ".rz", ".shn", ".tar", ".cbt", ".udf", ".xz", ".zip", ".jar", ".cbz", ".zst",
    ".zoo",
];

pub fn is_geospatial_format (ext: &str)->bool {
    let ext = ext.to_lowercase();
    GEOSPATIAL_FORMATS.contains(&ext.as_str())
}

pub fn is_archive_format (ext: &str)->bool {
    let ext = ext.to_lowercase();
    ARCHIVE_FORMATS.contains(&ext.as_str())
}

/// the normalized form of one dataset - what ends up in the `datasets` table columns.
/// `files` holds `(name, download_url)` pairs in provider enumeration order
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct CanonicalRecord {
    pub content_provider: ContentProvider,
    pub created_date: Option<String>,    // "YYYY-MM-DD"
    pub modified_date: Option<String>,   // "YYYY-MM-DD"
    pub id: Option<String>,
    pub doi: Option<String>,
    pub url_api: Option<String>,
    pub url_html: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub sum_size: i64,
    pub files_types: Vec<String>,
    pub files: Vec<(String,String)>,
    pub geospatial_flag: bool,
    pub download_flag: bool,
}

/// the file related part of a normalized record
#[derive(Debug,Default)]
pub struct FileAnalysis {
    pub sum_size: i64,
    pub files_types: Vec<String>,
    pub files: Vec<(String,String)>,
    pub geospatial_flag: bool,
    pub download_flag: bool,
}

impl FileAnalysis {
    fn add (&mut self, name: String, url: String, size: i64, extension: String) {
        self.sum_size += size;

        if is_geospatial_format(&extension) {
            self.geospatial_flag = true;
        }
        if is_geospatial_format(&extension) || is_archive_format(&extension) {
            self.download_flag = true;
        }

        self.files_types.push(extension);
        self.files.push( (name, url) );
    }
}

fn str_field (raw: &Value, key: &str)->Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn str_pointer (raw: &Value, pointer: &str)->Option<String> {
    raw.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn id_field (raw: &Value)->Option<String> {
    match raw.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn keywords_field (value: Option<&Value>)->Option<Vec<String>> {
    value.cloned().and_then( |v| serde_json::from_value(v).ok())
}

fn date_field (raw: &Value, key: &str)->Option<String> {
    iso_date_string( raw.get(key).and_then(Value::as_str))
}

/// normalize a raw provider metadata document into a CanonicalRecord.
/// Fails only on structurally unusable input - missing individual fields map to None
pub fn normalize (provider: ContentProvider, raw: &Value)->Result<CanonicalRecord> {
    if !raw.is_object() {
        return Err( parse_error( format!("{} metadata is not a JSON object", provider)))
    }

    let fa = analyse_files( provider, raw);

    let record = match provider {
        ContentProvider::Dryad => CanonicalRecord {
            content_provider: provider,
            created_date: date_field( raw, "publicationDate"),
            modified_date: date_field( raw, "lastModificationDate"),
            id: id_field(raw),
            doi: str_field( raw, "identifier"),
            url_api: None,
            url_html: str_field( raw, "sharingLink"),
            title: str_field( raw, "title"),
            description: str_field( raw, "abstract"),
            keywords: keywords_field( raw.get("keywords")),
            sum_size: fa.sum_size,
            files_types: fa.files_types,
            files: fa.files,
            geospatial_flag: fa.geospatial_flag,
            download_flag: fa.download_flag,
        },

        ContentProvider::Figshare => CanonicalRecord {
            content_provider: provider,
            created_date: date_field( raw, "created_date"),
            modified_date: date_field( raw, "modified_date"),
            id: id_field(raw),
            doi: str_field( raw, "doi"),
            url_api: str_field( raw, "url"),
            url_html: str_field( raw, "figshare_url"),
            title: str_field( raw, "title"),
            description: str_field( raw, "description"),
            keywords: keywords_field( raw.get("tags")),
            sum_size: fa.sum_size,
            files_types: fa.files_types,
            files: fa.files,
            geospatial_flag: fa.geospatial_flag,
            download_flag: fa.download_flag,
        },

        ContentProvider::Zenodo => CanonicalRecord {
            content_provider: provider,
            created_date: date_field( raw, "created"),
            modified_date: date_field( raw, "modified"),
            id: id_field(raw),
            doi: str_field( raw, "doi"),
            url_api: str_pointer( raw, "/links/self"),
            url_html: str_pointer( raw, "/links/self_html"),
            title: str_field( raw, "title"),
            description: str_pointer( raw, "/metadata/description"),
            keywords: keywords_field( raw.pointer("/metadata/keywords")),
            sum_size: fa.sum_size,
            files_types: fa.files_types,
            files: fa.files,
            geospatial_flag: fa.geospatial_flag,
            download_flag: fa.download_flag,
        },
    };

    Ok(record)
}

/// enumerate the downloadable files of a raw metadata document and derive sizes,
/// extension list and the geospatial/download flags
pub fn analyse_files (provider: ContentProvider, raw: &Value)->FileAnalysis {
    let mut fa = FileAnalysis::default();

    match provider {
        ContentProvider::Dryad => {
            // "stash:files" can be missing if downloads for this version are unavailable
            if let Some(files) = raw.pointer("/files_embedded/stash:files").and_then(Value::as_array) {
                for file in files {
                    // entries without a download link are not retrievable - skip them
                    let Some(href) = file.pointer("/_links/stash:download/href").and_then(Value::as_str) else {
                        continue
                    };
                    let Some(path) = file.get("path").and_then(Value::as_str) else { continue };

                    let url = format!("https://datadryad.org{href}");
                    let size = file.get("size").and_then(Value::as_i64).unwrap_or(0);
                    fa.add( path.to_string(), url, size, lowercase_suffix(path));
                }
            }
        }

        ContentProvider::Figshare => {
            if let Some(files) = raw.get("files").and_then(Value::as_array) {
                for file in files {
                    let Some(name) = file.get("name").and_then(Value::as_str) else { continue };
                    let Some(url) = file.get("download_url").and_then(Value::as_str) else { continue };

                    let size = file.get("size").and_then(Value::as_i64).unwrap_or(0);
                    fa.add( name.to_string(), url.to_string(), size, lowercase_suffix(name));
                }
            }
        }

        ContentProvider::Zenodo => {
            if let Some(files) = raw.get("files").and_then(Value::as_array) {
                for file in files {
                    let Some(link) = file.pointer("/links/self").and_then(Value::as_str) else { continue };
                    let Some(key) = file.get("key").and_then(Value::as_str) else { continue };

                    // the parent path element of the content link is the file name
                    let name = Path::new(link).parent()
                        .and_then(Path::file_name)
                        .and_then(|n| n.to_str())
                        .unwrap_or(key)
                        .to_string();

                    let size = file.get("size").and_then(Value::as_i64).unwrap_or(0);
                    fa.add( name, link.to_string(), size, lowercase_suffix(key));
                }
            }
        }
    }

    fa
}
