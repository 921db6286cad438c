//! Residential property price index (RPPI) series loading.
//!
//! Accepts any CSV with `date`, `region` and `index` columns (header case and
//! surrounding whitespace ignored). Rows whose date or index cannot be parsed
//! are skipped.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RppiError {
    #[error("failed to read region index: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse region index csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("region index csv has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("region index holds no usable rows")]
    Empty,
    #[error("region index fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexObservation {
    pub date: NaiveDate,
    pub region: String,
    pub index: f64,
}

/// Observations ordered by date (stable, so file order breaks ties).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionIndexSeries {
    observations: Vec<IndexObservation>,
    labels: Vec<String>,
}

impl RegionIndexSeries {
    pub fn from_observations(mut observations: Vec<IndexObservation>) -> Self {
        observations.sort_by_key(|o| o.date);
        let labels = observations.iter().map(|o| o.region.clone()).collect::<BTreeSet<_>>().into_iter().collect();
        Self { observations, labels }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RppiError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let find = |name: &'static str| {
            headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name)).ok_or(RppiError::MissingColumn(name))
        };
        let (date_col, region_col, index_col) = (find("date")?, find("region")?, find("index")?);

        let mut observations = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let record = record?;
            let date = record.get(date_col).and_then(parse_index_date);
            let region = record.get(region_col).map(str::trim).filter(|r| !r.is_empty());
            let index = record.get(index_col).and_then(|v| v.trim().parse::<f64>().ok()).filter(|v| v.is_finite());
            match (date, region, index) {
                (Some(date), Some(region), Some(index)) => observations.push(IndexObservation { date, region: region.to_string(), index }),
                _ => skipped += 1,
            }
        }
        if skipped > 0 { debug!(skipped, "skipped unparseable region index rows"); }
        if observations.is_empty() { return Err(RppiError::Empty); }
        Ok(Self::from_observations(observations))
    }

    pub fn load_file(path: &Path) -> Result<Self, RppiError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub async fn fetch(url: &str) -> Result<Self, RppiError> {
        let body = reqwest::get(url).await?.error_for_status()?.text().await?;
        Self::from_reader(body.as_bytes())
    }

    pub fn observations(&self) -> &[IndexObservation] { &self.observations }
    pub fn labels(&self) -> &[String] { &self.labels }
    pub fn len(&self) -> usize { self.observations.len() }
    pub fn is_empty(&self) -> bool { self.observations.is_empty() }

    /// Date-ordered observations whose region equals any candidate, ignoring case.
    pub fn filter(&self, candidates: &[String]) -> Vec<IndexObservation> {
        let wanted: Vec<String> = candidates.iter().map(|c| c.trim().to_lowercase()).collect();
        self.observations
            .iter()
            .filter(|o| wanted.contains(&o.region.to_lowercase()))
            .cloned()
            .collect()
    }
}

/// Remote URL first, then the local file. Failures are logged and yield `None`.
pub async fn load_region_index(path: &Path, url: Option<&str>) -> Option<RegionIndexSeries> {
    if let Some(url) = url {
        match RegionIndexSeries::fetch(url).await {
            Ok(series) => {
                info!(url, observations = series.len(), regions = series.labels().len(), "region index fetched");
                return Some(series);
            }
            Err(e) => warn!(url, error = %e, "region index fetch failed, trying local file"),
        }
    }
    if !path.exists() {
        info!(path = %path.display(), "no local region index");
        return None;
    }
    match RegionIndexSeries::load_file(path) {
        Ok(series) => {
            info!(path = %path.display(), observations = series.len(), regions = series.labels().len(), "region index loaded");
            Some(series)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "region index unavailable");
            None
        }
    }
}

/// Parses ISO dates (optionally with a time part), `DD/MM/YYYY`, `YYYY/MM/DD`,
/// `YYYY-MM`, `YYYY`, `Mon-YYYY` and year-quarter labels. Quarters map to
/// their first day.
pub fn parse_index_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() { return None; }
    let head = s.get(..10).filter(|_| s.len() > 10 && matches!(s.as_bytes()[10], b'T' | b' '));
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(head.unwrap_or(s), fmt) { return Some(d); }
    }
    for fmt in ["%d-%b-%Y", "%d %b %Y"] {
        let sep = if fmt.contains('-') { '-' } else { ' ' };
        if let Ok(d) = NaiveDate::parse_from_str(&format!("01{sep}{s}"), fmt) { return Some(d); }
    }
    if let Some(d) = parse_quarter(s) { return Some(d); }
    if let Some((y, m)) = s.split_once('-') {
        if y.len() == 4 {
            return NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1);
        }
    }
    if s.len() == 4 {
        return NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1);
    }
    None
}

fn parse_quarter(s: &str) -> Option<NaiveDate> {
    let compact: String = s.chars().filter(|c| !matches!(c, ' ' | '-')).collect::<String>().to_ascii_uppercase();
    let (left, right) = compact.split_once('Q')?;
    let (year, quarter) = if left.is_empty() {
        // Q12020
        let mut chars = right.chars();
        let q = chars.next()?;
        (chars.as_str(), &right[..q.len_utf8()])
    } else {
        (left, right)
    };
    let year: i32 = year.parse().ok().filter(|_| year.len() == 4)?;
    let quarter: u32 = quarter.parse().ok().filter(|q| (1..=4).contains(q))?;
    NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
}
