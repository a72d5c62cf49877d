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

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use geoharvest_common::{check_cli,define_cli,cfg::load_ron_config};
use geoharvest_harvester::{run_harvest,HarvesterConfig,Result};

define_cli! { ARGS [about="scholarly dataset metadata harvester"] =
    config: String [help="filename of harvester config file", short,long,default_value="configs/harvester.ron"]
}

#[tokio::main]
async fn main ()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::from_default_env())
        .init();
    check_cli!(ARGS);

    let config: HarvesterConfig = load_ron_config( &ARGS.config)?;

    let cancel = CancellationToken::new();
    let sig_cancel = cancel.clone();
    tokio::spawn( async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\rinterrupted - flushing pending work..");
            sig_cancel.cancel();
        }
    });

    run_harvest( config, cancel).await
}
