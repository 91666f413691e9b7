use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub name: String,
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    pub dial_code: String,
    pub flag: String,
}

impl Country {
    fn new(name: &str, code: &str, dial_code: &str, flag: &str) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            dial_code: dial_code.into(),
            flag: flag.into(),
        }
    }
}

// Shape of one entry from restcountries.com (only the requested fields).
#[derive(Debug, Deserialize)]
struct RestCountry {
    name: RestName,
    cca2: String,
    #[serde(default)]
    idd: Option<RestIdd>,
    #[serde(default)]
    flag: String,
}

#[derive(Debug, Deserialize)]
struct RestName {
    common: String,
}

#[derive(Debug, Deserialize)]
struct RestIdd {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    suffixes: Option<Vec<String>>,
}

/// Used whenever the remote list cannot be fetched.
pub fn fallback_countries() -> Vec<Country> {
    vec![
        Country::new("United States", "US", "+1", "🇺🇸"),
        Country::new("United Kingdom", "GB", "+44", "🇬🇧"),
        Country::new("India", "IN", "+91", "🇮🇳"),
        Country::new("Germany", "DE", "+49", "🇩🇪"),
        Country::new("France", "FR", "+33", "🇫🇷"),
    ]
}

/// Keep entries with a dial root and a non-empty first suffix, sorted by
/// name.
fn format_countries(raw: Vec<RestCountry>) -> Vec<Country> {
    let mut countries: Vec<Country> = raw
        .into_iter()
        .filter_map(|c| {
            let idd = c.idd?;
            let root = idd.root.filter(|r| !r.is_empty())?;
            let suffix = idd.suffixes?.into_iter().next().filter(|s| !s.is_empty())?;
            Some(Country {
                name: c.name.common,
                code: c.cca2,
                dial_code: format!("{root}{suffix}"),
                flag: c.flag,
            })
        })
        .collect();

    countries.sort_by_cached_key(|c| (sort_key(&c.name), c.name.clone()));
    countries
}

/// Lowercased name with common Latin accents folded, so that "Åland
/// Islands" sorts among the A's instead of after "Zimbabwe".
fn sort_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'ç' => 'c',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ñ' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

pub async fn fetch_countries(url: &str) -> Result<Vec<Country>> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

    let raw: Vec<RestCountry> = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(format_countries(raw))
}

/// Best-effort country list: the remote one, or the fallback on any failure.
pub async fn list_countries(url: &str) -> Vec<Country> {
    match fetch_countries(url).await {
        Ok(countries) if !countries.is_empty() => countries,
        Ok(_) => {
            warn!(url, "Country list was empty, using fallback");
            fallback_countries()
        }
        Err(e) => {
            warn!(url, error = %e, "Failed to fetch countries, using fallback");
            fallback_countries()
        }
    }
}
