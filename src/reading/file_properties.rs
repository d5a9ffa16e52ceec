//! Country, stream and date of a MERRA-2 grid file.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
/// Properties encoded in a grid file key such as
/// `Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.parquet`.
///
/// The first path segment is the country the subset was cut for. The file
/// name follows the GES DISC convention `MERRA2_<stream>.<collection>.<date>`.
/// See the [MERRA-2 file specification](https://gmao.gsfc.nasa.gov/pubs/docs/Bosilovich785.pdf).
pub struct FileProperties {
    pub country: Option<String>,
    pub stream: Option<u16>,
    pub collection: String,
    pub date: Option<NaiveDate>,
}

impl FileProperties {
    pub fn from_key(key: &str) -> Result<Self> {
        let key = key.trim_matches('/');
        let (country, file_name) = match key.rsplit_once('/') {
            Some((dir, file_name)) => (dir.split('/').next().map(str::to_string), file_name),
            None => (None, key),
        };

        let parts: Vec<&str> = file_name.split('.').collect();
        if parts.len() < 3 || !parts[0].starts_with("MERRA2") {
            return Err(anyhow!("Not a MERRA-2 file name: `{}`", file_name));
        }

        let stream = parts[0]
            .strip_prefix("MERRA2_")
            .and_then(|s| s.parse::<u16>().ok());
        let collection = parts[1].to_string();
        let date = NaiveDate::parse_from_str(parts[2], "%Y%m%d").ok();

        Ok(FileProperties {
            country,
            stream,
            collection,
            date,
        })
    }
}

/// The country folder of a key, i.e. its first path segment.
pub fn country_of(key: &str) -> Option<&str> {
    let key = key.trim_start_matches('/');
    key.split_once('/').map(|(country, _)| country)
}
