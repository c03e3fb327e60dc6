use crate::error::{ImportError, Result};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://data.gharchive.org";

const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Hour selector for one import window: a single archive hour, or all 24
/// hours of the day fetched in hour order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourSpec {
    All,
    Single(u8),
}

impl HourSpec {
    /// Hours to fetch, in archive order.
    pub fn hours(self) -> Vec<u8> {
        match self {
            HourSpec::All => (0..24).collect(),
            HourSpec::Single(h) => vec![h],
        }
    }
}

impl FromStr for HourSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(HourSpec::All);
        }
        match s.parse::<u8>() {
            Ok(h) if h < 24 => Ok(HourSpec::Single(h)),
            _ => Err(format!("invalid hour `{s}`; expected 0-23 or `all`")),
        }
    }
}

/// Archive addressing unit: `{date}-{hour}` names one gzip NDJSON object.
/// The archive uses unpadded hours.
pub fn window_name(date: NaiveDate, hour: u8) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), hour)
}

pub struct ArchiveClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ImportError::Config(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn archive_url(&self, date: NaiveDate, hour: u8) -> String {
        format!("{}/{}.json.gz", self.base_url, window_name(date, hour))
    }

    /// Fetch and decompress one hour window into raw record lines.
    ///
    /// The body is decompressed fully in memory; one archive hour is
    /// bounded. Blank lines are dropped. Transport, HTTP status, and
    /// decompression failures all report the window they belong to.
    /// Retrying is restarting: a failed window is fetched again from the
    /// beginning, never resumed mid-stream.
    pub fn fetch_hour(&self, date: NaiveDate, hour: u8) -> Result<Vec<String>> {
        let window = window_name(date, hour);
        let fetch_err = |message: String| ImportError::Fetch {
            window: window.clone(),
            message,
        };

        let response = self
            .http
            .get(self.archive_url(date, hour))
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| fetch_err(e.to_string()))?;
        let compressed = response.bytes().map_err(|e| fetch_err(e.to_string()))?;

        let mut text = String::new();
        GzDecoder::new(&compressed[..])
            .read_to_string(&mut text)
            .map_err(|e| fetch_err(format!("gunzip: {e}")))?;

        Ok(text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(ToString::to_string)
            .collect())
    }
}
