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

///! durable SQLite store shared by harvester and analyzer.
///! The `datasets` table is append-only for the harvester (one row per harvested
///! dataset) and gets its analysis columns updated exactly once by the analyzer;
///! `statistics_dataset_analysis` holds one mutable counter row per provider.
///! All mutations are routed through the single pipeline consumer, enforced here
///! with a single-connection pool

use std::collections::{HashMap,HashSet};
use std::path::Path;
use std::str::FromStr;
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions,SqlitePoolOptions},Row,SqlitePool};

use geoharvest_provider::{CanonicalRecord,ContentProvider};

mod checkpoint;
pub use checkpoint::*;

mod errors;
pub use errors::*;

/// a harvested dataset as committed by the harvester consumer: the normalized record
/// plus the verbatim provider metadata document it was derived from
#[derive(Debug,Clone)]
pub struct DatasetRecord {
    pub normalized: CanonicalRecord,
    pub metadata: Value,
}

/// one pending unit of analyzer work, as selected from the store
#[derive(Debug,Clone)]
pub struct DownloadTask {
    pub key: i64,
    pub doi: Option<String>,
    pub files: Vec<(String,String)>,
    pub sum_size: i64,
}

/// the per-provider counter row of `statistics_dataset_analysis`
#[derive(Debug,Clone,Copy,Default)]
pub struct ProviderStatistics {
    pub processed_counter: i64,
    pub processed_data_volume: i64,
    pub timeout_counter: i64,
    pub with_bbox: i64,
}

/// the analyzer-written columns of a dataset row (mostly of interest to tests)
#[derive(Debug,Clone)]
pub struct AnalysisColumns {
    pub files_http_status_code: Option<String>,
    pub bbox: Option<String>,
    pub processed_flag: i64,
    pub timeout: Option<i64>,
    pub time_result_insert: Option<i64>,
}

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// open (and create if necessary) the store at `path`
    pub async fn open (path: impl AsRef<Path>)->Result<Store> {
        let opts = SqliteConnectOptions::new()
            .filename( path.as_ref())
            .create_if_missing( true);
        Self::open_with( opts).await
    }

    /// an in-memory store for tests
    pub async fn open_in_memory ()->Result<Store> {
        Self::open_with( SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn open_with (opts: SqliteConnectOptions)->Result<Store> {
        // single connection - all writes are serialized through the pipeline consumer anyways
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with( opts).await?;

        let store = Store { pool };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema (&self)->Result<()> {
        sqlx::query( r#"
            CREATE TABLE IF NOT EXISTS statistics_dataset_analysis (
                id INTEGER PRIMARY KEY,
                content_provider TEXT,
                processed_counter INTEGER,
                processed_data_volume INTEGER,
                timeout_counter INTEGER,
                with_bbox INTEGER
            )
        "#).execute( &self.pool).await?;

        sqlx::query( r#"
            CREATE TABLE IF NOT EXISTS datasets (
                key INTEGER PRIMARY KEY,
                content_provider TEXT,
                created_date TEXT,
                modified_date TEXT,
                id TEXT,
                doi TEXT,
                url_api TEXT,
                url_html TEXT,
                title TEXT,
                description TEXT,
                keywords TEXT,
                sum_size INTEGER,
                files_types TEXT,
                files TEXT,
                files_http_status_code TEXT,
                geospatial_flag INTEGER,
                download_flag INTEGER,
                processed_flag INTEGER,
                timeout INTEGER,
                bbox TEXT,
                time_result_insert INTEGER,
                metadata TEXT
            )
        "#).execute( &self.pool).await?;

        Ok(())
    }

    /* #region harvester interface *********************************************************/

    /// append a batch of harvested datasets in one transaction
    pub async fn append_records (&self, records: &[DatasetRecord])->Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            let n = &record.normalized;
            sqlx::query( r#"
                INSERT INTO datasets (
                    content_provider, created_date, modified_date, id, doi, url_api,
                    url_html, title, description, keywords, sum_size,
                    files_types, files, files_http_status_code, geospatial_flag, download_flag,
                    processed_flag, timeout, bbox, time_result_insert, metadata
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#)
            .bind( n.content_provider.name())
            .bind( &n.created_date)
            .bind( &n.modified_date)
            .bind( &n.id)
            .bind( &n.doi)
            .bind( &n.url_api)
            .bind( &n.url_html)
            .bind( &n.title)
            .bind( &n.description)
            .bind( serde_json::to_string( &n.keywords)?)
            .bind( n.sum_size)
            .bind( serde_json::to_string( &n.files_types)?)
            .bind( serde_json::to_string( &n.files)?)
            .bind( Option::<String>::None)
            .bind( n.geospatial_flag as i64)
            .bind( n.download_flag as i64)
            .bind( 0i64)
            .bind( Option::<i64>::None)
            .bind( Option::<String>::None)
            .bind( Option::<i64>::None)
            .bind( serde_json::to_string( &record.metadata)?)
            .execute( &mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// the harvest identifiers already committed for a provider (store-wins reconciliation
    /// on checkpoint resume). For Dryad the harvest identifier is the DOI, for Figshare
    /// and Zenodo the provider-local numeric id
    pub async fn existing_identifiers (&self, provider: ContentProvider)->Result<HashSet<String>> {
        let column = match provider {
            ContentProvider::Dryad => "doi",
            _ => "id",
        };
        let rows = sqlx::query( &format!("SELECT {column} FROM datasets WHERE content_provider = ?"))
            .bind( provider.name())
            .fetch_all( &self.pool).await?;

        Ok( rows.iter().filter_map( |row| row.get::<Option<String>,_>(0)).collect() )
    }

    /* #endregion harvester interface */

    /* #region analyzer interface **********************************************************/

    /// make sure there is one statistics row per provider
    pub async fn init_statistics (&self)->Result<()> {
        let count: i64 = sqlx::query_scalar( "SELECT COUNT(*) FROM statistics_dataset_analysis")
            .fetch_one( &self.pool).await?;

        if count == 0 {
            for provider in ContentProvider::ALL {
                sqlx::query( r#"
                    INSERT INTO statistics_dataset_analysis
                    (content_provider, processed_counter, processed_data_volume, timeout_counter, with_bbox)
                    VALUES (?, 0, 0, 0, 0)
                "#).bind( provider.name()).execute( &self.pool).await?;
            }
        }
        Ok(())
    }

    pub async fn load_statistics (&self)->Result<HashMap<ContentProvider,ProviderStatistics>> {
        let rows = sqlx::query( r#"
            SELECT content_provider, processed_counter, processed_data_volume, timeout_counter, with_bbox
            FROM statistics_dataset_analysis
        "#).fetch_all( &self.pool).await?;

        let mut map = HashMap::new();
        for row in rows {
            let name: String = row.get(0);
            if let Ok(provider) = ContentProvider::from_str( name.as_str()) {
                map.insert( provider, ProviderStatistics {
                    processed_counter: row.get(1),
                    processed_data_volume: row.get(2),
                    timeout_counter: row.get(3),
                    with_bbox: row.get(4),
                });
            }
        }
        Ok(map)
    }

    /// the datasets a provider download worker still has to process, bounded by `max_size`
    pub async fn pending_downloads (&self, provider: ContentProvider, max_size: f64)->Result<Vec<DownloadTask>> {
        let rows = sqlx::query( r#"
            SELECT key, doi, files, sum_size FROM datasets
            WHERE content_provider = ? AND download_flag = 1 AND processed_flag = 0 AND sum_size < ?
        "#)
        .bind( provider.name())
        .bind( max_size)
        .fetch_all( &self.pool).await?;

        let mut tasks = Vec::with_capacity( rows.len());
        for row in rows {
            let files_json: Option<String> = row.get(2);
            let files = match files_json {
                Some(json) => serde_json::from_str( json.as_str()).unwrap_or_default(),
                None => Vec::new(),
            };
            tasks.push( DownloadTask {
                key: row.get(0),
                doi: row.get(1),
                files,
                sum_size: row.get(3),
            });
        }
        Ok(tasks)
    }

    /// the q-quantile of pending download sizes for a provider (linear interpolation),
    /// None if there are no pending downloads
    pub async fn sum_size_quantile (&self, provider: ContentProvider, q: f64)->Result<Option<f64>> {
        let sizes: Vec<i64> = sqlx::query_scalar( r#"
            SELECT sum_size FROM datasets
            WHERE content_provider = ? AND download_flag = 1 AND processed_flag = 0
            ORDER BY sum_size
        "#)
        .bind( provider.name())
        .fetch_all( &self.pool).await?;

        Ok( quantile( sizes.as_slice(), q) )
    }

    /// commit one analysis result: dataset columns and the provider statistics row
    /// are updated in a single transaction
    pub async fn commit_analysis (&self, key: i64, provider: ContentProvider,
                                  files_http_status_code: &Value, bbox: Option<&Vec<f64>>,
                                  timeout: Option<i64>, time_result_insert: i64,
                                  stats: &ProviderStatistics)->Result<()>
    {
        let bbox_json = match bbox {
            Some(b) => Some( serde_json::to_string(b)?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query( r#"
            UPDATE datasets
            SET files_http_status_code = ?,
                bbox = ?,
                processed_flag = 1,
                timeout = ?,
                time_result_insert = ?
            WHERE key = ?
        "#)
        .bind( serde_json::to_string( files_http_status_code)?)
        .bind( bbox_json)
        .bind( timeout)
        .bind( time_result_insert)
        .bind( key)
        .execute( &mut *tx).await?;

        sqlx::query( r#"
            UPDATE statistics_dataset_analysis
            SET processed_counter = ?,
                processed_data_volume = ?,
                timeout_counter = ?,
                with_bbox = ?
            WHERE content_provider = ?
        "#)
        .bind( stats.processed_counter)
        .bind( stats.processed_data_volume)
        .bind( stats.timeout_counter)
        .bind( stats.with_bbox)
        .bind( provider.name())
        .execute( &mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    /* #endregion analyzer interface */

    /* #region introspection ***************************************************************/

    pub async fn processed_count (&self, provider: ContentProvider)->Result<i64> {
        Ok( sqlx::query_scalar( "SELECT COUNT(*) FROM datasets WHERE content_provider = ? AND processed_flag = 1")
            .bind( provider.name())
            .fetch_one( &self.pool).await? )
    }

    pub async fn dataset_count (&self, provider: ContentProvider)->Result<i64> {
        Ok( sqlx::query_scalar( "SELECT COUNT(*) FROM datasets WHERE content_provider = ?")
            .bind( provider.name())
            .fetch_one( &self.pool).await? )
    }

    /// the analyzer-written columns of one dataset row
    pub async fn analysis_columns (&self, key: i64)->Result<AnalysisColumns> {
        let row = sqlx::query( r#"
            SELECT files_http_status_code, bbox, processed_flag, timeout, time_result_insert
            FROM datasets WHERE key = ?
        "#)
        .bind( key)
        .fetch_one( &self.pool).await?;

        Ok( AnalysisColumns {
            files_http_status_code: row.get(0),
            bbox: row.get(1),
            processed_flag: row.get(2),
            timeout: row.get(3),
            time_result_insert: row.get(4),
        })
    }

    /* #endregion introspection */
}

/// the q-quantile of an ascending sorted slice with linear interpolation between ranks
pub fn quantile (sorted: &[i64], q: f64)->Option<f64> {
    if sorted.is_empty() {
        return None
    }

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;

    let v_lo = sorted[lo] as f64;
    let v_hi = sorted[hi] as f64;
    Some( v_lo + (v_hi - v_lo) * (h - lo as f64) )
}
