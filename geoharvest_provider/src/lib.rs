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
#![allow(unused)]

///! content provider abstraction for the scholarly data repositories we harvest from
///! (Dryad, Figshare, Zenodo), plus the throttled HTTP client all pipeline stages
///! use to talk to them

use std::time::Duration;
use serde::{Deserialize,Serialize};
use strum::{Display,EnumString,IntoStaticStr};

use geoharvest_common::datetime::{millis,secs};

mod errors;
pub use errors::*;

mod throttle;
pub use throttle::*;

mod client;
pub use client::*;

mod metadata;
pub use metadata::*;

mod identifier;
pub use identifier::*;

mod normalize;
pub use normalize::*;

/// the scholarly data repositories we know how to talk to.
/// Note the lowercase names are wire/store format (`content_provider` column, config keys)
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize,Display,EnumString,IntoStaticStr)]
#[strum(serialize_all="lowercase")]
#[serde(rename_all="lowercase")]
pub enum ContentProvider {
    Dryad,
    Figshare,
    Zenodo,
}

impl ContentProvider {
    pub const ALL: [ContentProvider;3] = [ContentProvider::Dryad, ContentProvider::Figshare, ContentProvider::Zenodo];

    pub fn name (&self)->&'static str {
        (*self).into()
    }

    /// fixed delay applied after each request. Zenodo normally gets its delay from
    /// rate limit response headers - this is only its headerless base delay
    pub fn post_request_delay (&self)->Duration {
        match self {
            ContentProvider::Dryad => millis(500),
            ContentProvider::Figshare => secs(1),
            ContentProvider::Zenodo => millis(500),
        }
    }

    /// delay applied when a Zenodo response carries no usable rate limit headers
    pub fn headerless_delay (&self)->Duration {
        match self {
            ContentProvider::Zenodo => secs(2),
            other => other.post_request_delay(),
        }
    }
}
