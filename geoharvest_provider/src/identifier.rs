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

///! canonical dataset identifier extraction from OpenAIRE graph records.
///! A record lists instances with `pids` and/or `alternateIdentifiers`; we collect the
///! scheme-matching values and reduce them with a provider-specific pattern. Records
///! that yield no canonical id are counted as failed by the caller

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::ContentProvider;

lazy_static! {
    // e.g. "10.5061/dryad.70d46/3" -> "10.5061/dryad.70d46"
    static ref DRYAD_ID_RE: Regex = Regex::new( r"(10\.5061/dryad\.[A-Za-z0-9]+)(?:/\d+)?").unwrap();

    // e.g. "10.6084/m9.figshare.9978467.v1" -> "9978467"
    static ref FIGSHARE_ID_RE: Regex = Regex::new( r"\.(\d+)(?:_d\d+)?(?:\.v\d+)?$").unwrap();

    // e.g. "10.5281/zenodo.5310135" -> "5310135"
    static ref ZENODO_ID_RE: Regex = Regex::new( r"(?:10\.\d+/zenodo\.)(\d+)(?:/\d+)?").unwrap();
}

const ZENODO_OAI_PREFIX: &str = "oai:zenodo.org:";

fn accepted_schemes (provider: ContentProvider)->&'static [&'static str] {
    match provider {
        ContentProvider::Zenodo => &["doi", "oai"],
        _ => &["doi"],
    }
}

/// the scheme-matching pid/alternateIdentifier values of all instances of a record.
/// Note that alternateIdentifiers of an instance are only considered if it has no pids
fn candidate_values (provider: ContentProvider, record: &Value)->Vec<String> {
    let schemes = accepted_schemes(provider);
    let mut values: Vec<String> = Vec::new();

    if let Some(instances) = record.get("instances").and_then(Value::as_array) {
        for instance in instances {
            let ids = if instance.get("pids").is_some() {
                instance.get("pids")
            } else {
                instance.get("alternateIdentifiers")
            };

            if let Some(ids) = ids.and_then(Value::as_array) {
                for id in ids {
                    if let (Some(scheme), Some(value)) = (id.get("scheme").and_then(Value::as_str), id.get("value").and_then(Value::as_str)) {
                        if schemes.contains(&scheme) {
                            values.push( value.to_string());
                        }
                    }
                }
            }
        }
    }

    values
}

/// reduce one raw identifier value to the canonical provider-local id
fn canonical_id (provider: ContentProvider, value: &str)->Option<String> {
    match provider {
        ContentProvider::Dryad => {
            DRYAD_ID_RE.captures(value).map( |cap| format!("doi:{}", &cap[1]))
        }
        ContentProvider::Figshare => {
            FIGSHARE_ID_RE.captures(value)
                .map( |cap| cap[1].to_string())
                .filter( |id| id.chars().all(|c| c.is_ascii_digit()))
        }
        ContentProvider::Zenodo => {
            let id = match ZENODO_ID_RE.captures(value) {
                Some(cap) => cap[1].to_string(),
                None => {
                    if let Some(suffix) = value.strip_prefix(ZENODO_OAI_PREFIX) {
                        suffix.to_string()
                    } else {
                        return None
                    }
                }
            };
            if id.chars().all(|c| c.is_ascii_digit()) { Some(id) } else { None }
        }
    }
}

/// extract the canonical identifier from one OpenAIRE record. When several instance
/// identifiers reduce to different canonical ids the smallest one wins (ascending sort)
pub fn extract_identifier (provider: ContentProvider, record: &Value)->Option<String> {
    let mut result: Vec<String> = Vec::new();

    for value in candidate_values( provider, record) {
        if let Some(id) = canonical_id( provider, &value) {
            if !result.contains(&id) {
                result.push(id);
            }
        }
    }

    if result.is_empty() {
        None
    } else {
        result.sort();
        Some( result.swap_remove(0) )
    }
}

/// extract the canonical identifier from one line of an OpenAIRE JSON-lines extract
pub fn extract_identifier_from_line (provider: ContentProvider, line: &str)->Option<String> {
    serde_json::from_str::<Value>(line).ok().and_then( |record| extract_identifier( provider, &record))
}
