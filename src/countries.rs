// src/countries.rs
use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Result, bail};
use log::{info, warn};
use reqwest::StatusCode;
use serde::Deserialize;

pub const DEFAULT_COUNTRIES_URL: &str = "https://api.nordvpn.com/v1/servers/countries";

/// Country display name to lowercase code, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryDirectory {
    countries: BTreeMap<String, String>,
}

// Only the fields we use; the API sends many more.
#[derive(Deserialize)]
struct CountryRecord {
    name: String,
    code: String,
}

impl CountryDirectory {
    fn from_records(records: Vec<CountryRecord>) -> Self {
        let countries = records
            .into_iter()
            .map(|record| (record.name, record.code.to_lowercase()))
            .collect();
        Self { countries }
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.iter()
            .find(|(_, candidate)| *candidate == code)
            .map(|(name, _)| name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.countries
            .iter()
            .map(|(name, code)| (name.as_str(), code.as_str()))
    }
}

/// Reads the directory once. Any failure leaves it empty, which only hides
/// per-country connect.
pub async fn fetch(url: &str, timeout: Duration) -> CountryDirectory {
    match try_fetch(url, timeout).await {
        Ok(directory) => {
            info!("Loaded {} countries.", directory.len());
            directory
        }
        Err(e) => {
            warn!("Country list unavailable: {:#}", e);
            CountryDirectory::default()
        }
    }
}

async fn try_fetch(url: &str, timeout: Duration) -> Result<CountryDirectory> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    if response.status() != StatusCode::OK {
        bail!("{} answered {}", url, response.status());
    }
    let records = response.json::<Vec<CountryRecord>>().await?;
    Ok(CountryDirectory::from_records(records))
}
