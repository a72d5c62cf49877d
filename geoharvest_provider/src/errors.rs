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

use bytes::Bytes;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeoharvestProviderError>;

#[derive(Error,Debug)]
pub enum GeoharvestProviderError {
    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    /// a terminal HTTP status - either a non-retryable 4xx or retry exhaustion on 429/5xx.
    /// `body` carries the (small) response body of a non-retryable status so that callers
    /// can check structured refusal messages
    #[error("http status {status}")]
    StatusError { status: u16, body: Option<Bytes> },

    /// a failure without usable HTTP status (connect/SSL/read-timeout exhaustion,
    /// structured "not found" bodies). Filed under the "undefined" bucket by consumers
    #[error("request failed without http status")]
    UndefinedError,

    /// request was aborted because the stop signal was set during a sleep
    #[error("operation cancelled")]
    CancelledError,

    #[error("parse error {0}")]
    ParseError(String),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed(String),
}

pub fn op_failed (msg: impl ToString)->GeoharvestProviderError {
    GeoharvestProviderError::OpFailed(msg.to_string())
}

pub fn parse_error (msg: impl ToString)->GeoharvestProviderError {
    GeoharvestProviderError::ParseError(msg.to_string())
}

pub fn status_error (status: u16)->GeoharvestProviderError {
    GeoharvestProviderError::StatusError { status, body: None }
}
