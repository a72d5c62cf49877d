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

///! turn an OpenAIRE JSON-lines extract for one content provider into the identifier
///! list (JSON array) consumed by harvest_metadata. Records that yield no canonical
///! identifier are counted and skipped

use std::fs::File;
use std::io::{BufRead,BufReader,Write};
use std::str::FromStr;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use geoharvest_common::{check_cli,define_cli};
use geoharvest_harvester::{op_failed,Result};
use geoharvest_provider::{extract_identifier_from_line,ContentProvider};

define_cli! { ARGS [about="extract dataset identifiers from an OpenAIRE JSON-lines extract"] =
    provider: String [help="content provider (dryad|figshare|zenodo)", short,long],
    output: String [help="filename of identifier list output (JSON array)", short,long],
    input: String [help="filename of OpenAIRE JSON-lines extract"]
}

fn main ()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::from_default_env())
        .init();
    check_cli!(ARGS);

    let provider = ContentProvider::from_str( ARGS.provider.as_str())
        .map_err( |_| op_failed( format!("unsupported content provider: {}", ARGS.provider)))?;

    let reader = BufReader::new( File::open( &ARGS.input)?);
    let mut identifiers: Vec<String> = Vec::new();
    let mut failed = 0;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue }

        match extract_identifier_from_line( provider, line.as_str()) {
            Some(identifier) => identifiers.push(identifier),
            None => {
                debug!("failed to get {} id from record {}", provider, line_number + 1);
                failed += 1;
            }
        }
    }

    let mut out = File::create( &ARGS.output)?;
    out.write_all( serde_json::to_vec_pretty( &identifiers)?.as_slice())?;

    println!("failed id extractions: {failed}");
    println!("successfully extracted {} identifier to {}", identifiers.len(), ARGS.output);
    Ok(())
}
