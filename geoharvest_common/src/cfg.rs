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

///! RON based configuration loading

use std::fs;
use std::path::Path;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error,Debug)]
pub enum ConfigError {
    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("config parse error {0}")]
    ParseError( #[from] ron::de::SpannedError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// load a RON config file into a Deserialize type
pub fn load_ron_config<C> (path: impl AsRef<Path>)->Result<C> where C: DeserializeOwned {
    let data = fs::read( path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}
