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

///! HTTP GET client shared by harvester and analyzer workers. Requests go through the
///! per-provider throttle gate, transient failures are retried with provider backoff,
///! and every sleep tests the shared stop signal so that shutdown does not have to wait
///! out a rate limit window

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use chrono::Utc;
use reqwest::{Client,Response,StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug,warn};

use geoharvest_common::datetime::{epoch_secs,secs};
use crate::{
    errors::{status_error,GeoharvestProviderError,Result},
    throttle::{post_request_delay,server_error_delay,too_many_requests_delay,ProviderThrottles},
    ContentProvider
};

/// total attempts per request (initial + retries)
const MAX_ATTEMPTS: usize = 6;

/// long sleeps are broken into slices of this length between stop signal checks
const SLEEP_SLICE: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    throttles: ProviderThrottles,
    cancel: CancellationToken,
    request_timeout: Duration,
}

impl HttpClient {
    pub fn new (throttles: ProviderThrottles, cancel: CancellationToken)->Result<Self> {
        let client = Client::builder()
            .connect_timeout( secs(30))
            .build()?;
        Ok( HttpClient { client, throttles, cancel, request_timeout: secs(30) } )
    }

    pub fn throttles (&self)->&ProviderThrottles { &self.throttles }

    pub fn cancel_token (&self)->&CancellationToken { &self.cancel }

    /// GET with a read timeout - for API requests with bounded response sizes
    pub async fn get (&self, provider: ContentProvider, url: &str)->Result<Response> {
        self.request( provider, url, &[], Some(self.request_timeout)).await
    }

    pub async fn get_with_query (&self, provider: ContentProvider, url: &str, query: &[(&str,&str)])->Result<Response> {
        self.request( provider, url, query, Some(self.request_timeout)).await
    }

    /// GET the response headers for a body of unbounded size (no read timeout)
    pub async fn get_streaming (&self, provider: ContentProvider, url: &str)->Result<Response> {
        self.request( provider, url, &[], None).await
    }

    /// GET `url` and stream the response body into `path` in chunks.
    /// Returns the response status and the number of bytes written
    pub async fn download_to_file (&self, provider: ContentProvider, url: &str, path: &Path)->Result<(u16,u64)> {
        let mut response = self.get_streaming( provider, url).await?;
        let status = response.status().as_u16();

        let mut file = File::create(path)?;
        let mut len: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            len += chunk.len() as u64;
            file.write_all(&chunk)?;
        }
        file.flush()?;

        Ok( (status, len) )
    }

    async fn request (&self, provider: ContentProvider, url: &str, query: &[(&str,&str)], timeout: Option<Duration>)->Result<Response> {
        let mut attempts = 0;

        loop {
            self.wait_turn( provider).await?;
            attempts += 1;

            let mut req = self.client.get(url);
            if !query.is_empty() { req = req.query(query) }
            if let Some(dur) = timeout { req = req.timeout(dur) }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let delay = post_request_delay( provider, response.headers(), epoch_secs());
                        self.throttles.defer( provider, delay);
                        return Ok(response)

                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        warn!("{} rate limited (429) on {}", provider, url);
                        if attempts >= MAX_ATTEMPTS { return Err( status_error( status.as_u16())) }
                        self.sleep_interruptible( provider, too_many_requests_delay( response.headers())).await?;

                    } else if status.is_server_error() {
                        debug!("{} server error {} on {}", provider, status.as_u16(), url);
                        if attempts >= MAX_ATTEMPTS { return Err( status_error( status.as_u16())) }
                        self.sleep_interruptible( provider, server_error_delay( response.headers())).await?;

                    } else {
                        // non-retryable client error - keep the body so callers can check structured refusals
                        let code = status.as_u16();
                        let body = response.bytes().await.ok();
                        return Err( GeoharvestProviderError::StatusError { status: code, body } )
                    }
                }
                Err(e) => {
                    // connect, SSL, read-timeout and whatever else the transport ran into
                    debug!("{} request error on {}: {}", provider, url, e);
                    if attempts >= MAX_ATTEMPTS { return Err( GeoharvestProviderError::UndefinedError ) }
                    self.sleep_interruptible( provider, provider.post_request_delay()).await?;
                }
            }
        }
    }

    /// wait until the provider throttle permits the next outbound request
    async fn wait_turn (&self, provider: ContentProvider)->Result<()> {
        let wait = self.throttles.wait_duration( provider);
        self.sleep_interruptible( provider, wait).await
    }

    /// sleep in ≤60 s slices, aborting with CancelledError as soon as the stop signal is set.
    /// Sleeps longer than one slice are surfaced through the throttle record so the progress
    /// reporter can show the active sleep window
    async fn sleep_interruptible (&self, provider: ContentProvider, dur: Duration)->Result<()> {
        if self.cancel.is_cancelled() { return Err( GeoharvestProviderError::CancelledError ) }
        if dur.is_zero() { return Ok(()) }

        let long_sleep = dur > SLEEP_SLICE;
        if long_sleep {
            warn!("{} sleeping for {} s", provider, dur.as_secs());
            if let Ok(cdur) = chrono::Duration::from_std(dur) {
                self.throttles.set_sleeping_until( provider, Utc::now() + cdur);
            }
        }

        let mut remaining = dur;
        while !remaining.is_zero() {
            let slice = remaining.min( SLEEP_SLICE);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    if long_sleep { self.throttles.clear_sleeping_until( provider) }
                    return Err( GeoharvestProviderError::CancelledError )
                }
                _ = tokio::time::sleep( slice) => {}
            }
            remaining -= slice;
        }

        if long_sleep { self.throttles.clear_sleeping_until( provider) }
        Ok(())
    }
}

/// deserialize a JSON response body
pub async fn from_json<T> (response: Response)->Result<T> where T: DeserializeOwned {
    let bytes = response.bytes().await?;
    serde_json::from_slice( &bytes).map_err(|e| GeoharvestProviderError::ParseError(e.to_string()))
}
