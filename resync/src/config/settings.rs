//! Environment configuration for a sweep.

use std::env;

use resync_pipeline::{loader::RetryPolicy, FieldMapping, IndexSchema, SyncConfig};
use resync_shared::RecordFilter;

use crate::ResyncError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default search index name.
const DEFAULT_INDEX: &str = "records";

/// Default records table.
const DEFAULT_TABLE: &str = "records";

/// Default number of records in flight.
const DEFAULT_CONCURRENCY: usize = 4;

/// Settings for one resynchronization sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ResyncConfig {
    pub opensearch_url: String,
    pub index_name: String,
    pub database_url: String,
    pub table: String,
    /// Record fields a document cannot be built without.
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub save_on_synchronize: bool,
    pub concurrency: usize,
    pub max_retries: u32,
    pub filter: RecordFilter,
    pub refresh_on_close: bool,
}

impl ResyncConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `RESYNC_INDEX`: Target index (default: records)
    /// - `DATABASE_URL`: Postgres connection string (required)
    /// - `RESYNC_TABLE`: Records table (default: records)
    /// - `RESYNC_REQUIRED_FIELDS`: Comma-separated required text fields
    /// - `RESYNC_OPTIONAL_FIELDS`: Comma-separated optional text fields
    /// - `RESYNC_SAVE_ON_SYNCHRONIZE`: Save records back after indexing (default: true)
    /// - `RESYNC_CONCURRENCY`: Records in flight (default: 4)
    /// - `RESYNC_MAX_RETRIES`: Index retries per record (default: 3)
    /// - `RESYNC_FILTER`: JSON object of equality criteria (default: {})
    /// - `RESYNC_REFRESH_ON_CLOSE`: Refresh the index after the sweep (default: true)
    pub fn from_env() -> Result<Self, ResyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ResyncError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ResyncError::config("DATABASE_URL must be set"))?;

        let required_fields = parse_list(var("RESYNC_REQUIRED_FIELDS"));
        let optional_fields = parse_list(var("RESYNC_OPTIONAL_FIELDS"));
        if required_fields.is_empty() && optional_fields.is_empty() {
            return Err(ResyncError::config(
                "RESYNC_REQUIRED_FIELDS or RESYNC_OPTIONAL_FIELDS must name at least one field",
            ));
        }

        let concurrency = match var("RESYNC_CONCURRENCY") {
            Some(value) => parse_number::<usize>("RESYNC_CONCURRENCY", &value)?,
            None => DEFAULT_CONCURRENCY,
        };

        let max_retries = match var("RESYNC_MAX_RETRIES") {
            Some(value) => parse_number::<u32>("RESYNC_MAX_RETRIES", &value)?,
            None => RetryPolicy::default().max_retries,
        };

        let filter = match var("RESYNC_FILTER") {
            Some(value) => parse_filter(&value)?,
            None => RecordFilter::all(),
        };

        let config = Self {
            opensearch_url: var("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            index_name: var("RESYNC_INDEX").unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            database_url,
            table: var("RESYNC_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            required_fields,
            optional_fields,
            save_on_synchronize: parse_bool(
                "RESYNC_SAVE_ON_SYNCHRONIZE",
                var("RESYNC_SAVE_ON_SYNCHRONIZE"),
                true,
            )?,
            concurrency,
            max_retries,
            filter,
            refresh_on_close: parse_bool(
                "RESYNC_REFRESH_ON_CLOSE",
                var("RESYNC_REFRESH_ON_CLOSE"),
                true,
            )?,
        };
        config.sync_config().validate()?;
        Ok(config)
    }

    /// The index schema: required fields first, then optional ones.
    pub fn schema(&self) -> IndexSchema {
        let required = self
            .required_fields
            .iter()
            .map(|field| FieldMapping::text(field.as_str()).required());
        let optional = self
            .optional_fields
            .iter()
            .map(|field| FieldMapping::text(field.as_str()));
        IndexSchema::new(required.chain(optional).collect())
    }

    /// Pipeline settings for the sweep.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .save_on_synchronize(self.save_on_synchronize)
            .concurrency(self.concurrency)
            .retry(RetryPolicy::default().with_max_retries(self.max_retries))
            .refresh_on_close(self.refresh_on_close)
    }

    /// Pool size for the record store: one connection per worker plus the cursor.
    pub fn max_connections(&self) -> u32 {
        u32::try_from(self.concurrency.saturating_add(1)).unwrap_or(u32::MAX)
    }
}

fn parse_list(value: Option<String>) -> Vec<String> {
    value
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ResyncError> {
    value
        .trim()
        .parse()
        .map_err(|_| ResyncError::config(format!("{key} must be a non-negative integer, got {value:?}")))
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, ResyncError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ResyncError::config(format!(
            "{key} must be true or false, got {value:?}"
        ))),
    }
}

fn parse_filter(value: &str) -> Result<RecordFilter, ResyncError> {
    let json: serde_json::Value = serde_json::from_str(value)
        .map_err(|e| ResyncError::config(format!("RESYNC_FILTER is not valid JSON: {e}")))?;
    RecordFilter::from_json(json)
        .ok_or_else(|| ResyncError::config("RESYNC_FILTER must be a JSON object"))
}
