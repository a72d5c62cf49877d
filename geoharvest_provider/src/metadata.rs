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

///! provider API adapters that retrieve the raw (verbatim) metadata document for one
///! dataset identifier. The raw document is kept as a serde_json::Value since we store
///! it alongside the normalized record for later re-normalization

use serde_json::Value;
use tracing::debug;

use crate::{
    client::{from_json,HttpClient},
    errors::{parse_error,GeoharvestProviderError,Result},
    ContentProvider
};

pub const DRYAD_BASE_URL: &str = "https://datadryad.org";
pub const FIGSHARE_API_URL: &str = "https://api.figshare.com/v2/articles/";
pub const ZENODO_API_URL: &str = "https://zenodo.org/api/records/";

/// percent-encode an identifier so it can be used as a single URL path segment
/// (Dryad DOIs contain ':' and '/')
pub fn url_encoded (identifier: &str)->String {
    url::form_urlencoded::byte_serialize( identifier.as_bytes()).collect()
}

/// retrieve the raw metadata document for `identifier` from the given provider.
/// Terminal HTTP failures surface as StatusError, provider-level "not found" bodies
/// and exhausted non-HTTP failures as UndefinedError
pub async fn fetch_metadata (client: &HttpClient, provider: ContentProvider, identifier: &str, access_token: Option<&str>)->Result<Value> {
    match provider {
        ContentProvider::Dryad => fetch_dryad( client, identifier).await,
        ContentProvider::Figshare => {
            let url = format!("{FIGSHARE_API_URL}{identifier}");
            from_json( client.get( provider, &url).await? ).await
        }
        ContentProvider::Zenodo => {
            let url = format!("{ZENODO_API_URL}{identifier}");
            match access_token {
                Some(token) => from_json( client.get_with_query( provider, &url, &[("access_token", token)]).await? ).await,
                None => from_json( client.get( provider, &url).await? ).await,
            }
        }
    }
}

/// Dryad needs two requests: the dataset document, then the file listing of its latest
/// version, which gets merged into the dataset document under `files_count`/`files_total`/
/// `files_embedded`. A top-level `message` field is Dryad's structured "not found"
async fn fetch_dryad (client: &HttpClient, identifier: &str)->Result<Value> {
    let url = format!("{DRYAD_BASE_URL}/api/v2/datasets/{}", url_encoded(identifier));
    let mut data: Value = from_json( client.get( ContentProvider::Dryad, &url).await? ).await?;

    if let Some(message) = data.get("message") {
        debug!("dryad dataset {} not available: {}", identifier, message);
        return Err( GeoharvestProviderError::UndefinedError )
    }

    let version_href = data.pointer("/_links/stash:version/href")
        .and_then( Value::as_str)
        .ok_or_else( || parse_error( format!("no version link in dryad dataset {identifier}")))?
        .to_string();

    let files_url = format!("{DRYAD_BASE_URL}{version_href}/files");
    let files: Value = from_json( client.get( ContentProvider::Dryad, &files_url).await? ).await?;

    data["files_count"] = files.get("count").cloned().unwrap_or(Value::Null);
    data["files_total"] = files.get("total").cloned().unwrap_or(Value::Null);
    data["files_embedded"] = files.get("_embedded").cloned().unwrap_or(Value::Null);

    Ok(data)
}
