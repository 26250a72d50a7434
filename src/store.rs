use crate::{config::default_data_dir, error::*, types::*};
use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SUFFIX: &str = "_rentals.csv";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait DatasetStore {
    /// Rows previously saved for `region`; a missing dataset is empty.
    fn load(&self, region: &Region) -> Result<Vec<Listing>>;
    /// Replace the region's dataset with `rows`.
    fn save(&self, region: &Region, rows: &[Listing]) -> Result<PathBuf>;
    /// Regions that currently have a dataset, sorted.
    fn list(&self) -> Result<Vec<Region>>;
}

/// One CSV file per region under `root`: `<Region_Name>_rentals.csv`.
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| HarvestError::storage_error("initialization", e.to_string()))?;
        Ok(Self { root })
    }

    pub fn at_default() -> Result<Self> {
        Self::new(default_data_dir()?.join("data"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, region: &Region) -> PathBuf {
        self.root.join(format!("{}{SUFFIX}", region.file_stem()))
    }
}

/* ---------- On-disk row shape ----------
address,price,beds,baths,sqft,url,description,type,page_number,neighborhood,scraped_date
------------------------------------------ */

#[derive(Serialize, Deserialize)]
struct Row {
    address: String,
    price: String,
    beds: String,
    baths: String,
    sqft: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: Description,
    #[serde(rename = "type", default)]
    listing_type: String,
    #[serde(default)]
    page_number: Option<u32>,
    #[serde(default)]
    neighborhood: String,
    #[serde(default)]
    scraped_date: String,
}

impl From<&Listing> for Row {
    fn from(l: &Listing) -> Self {
        Row {
            address: l.address.clone(),
            price: l.price.clone(),
            beds: l.beds.clone(),
            baths: l.baths.clone(),
            sqft: l.sqft.clone(),
            url: l.url.clone().unwrap_or_default(),
            description: l.description.clone(),
            listing_type: l.listing_type.clone(),
            page_number: l.page_number,
            neighborhood: l
                .source_region
                .as_ref()
                .map(|r| r.name().to_string())
                .unwrap_or_default(),
            scraped_date: l
                .collected_at
                .map(|t| t.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

impl From<Row> for Listing {
    fn from(r: Row) -> Self {
        let url = Some(r.url.trim().to_string()).filter(|u| !u.is_empty());
        let source_region = Some(r.neighborhood.trim())
            .filter(|n| !n.is_empty())
            .map(Region::new);
        let collected_at = NaiveDateTime::parse_from_str(r.scraped_date.trim(), DATE_FORMAT)
            .ok()
            .and_then(|n| Local.from_local_datetime(&n).earliest());
        Listing {
            url,
            address: r.address,
            price: r.price,
            beds: r.beds,
            baths: r.baths,
            sqft: r.sqft,
            description: r.description,
            listing_type: if r.listing_type.is_empty() {
                RENTAL.to_string()
            } else {
                r.listing_type
            },
            source_region,
            page_number: r.page_number,
            collected_at,
        }
    }
}

impl DatasetStore for CsvStore {
    fn load(&self, region: &Region) -> Result<Vec<Listing>> {
        let p = self.path_for(region);
        if !p.exists() {
            return Ok(vec![]);
        }
        let mut reader = csv::Reader::from_path(&p)?;
        let mut out = Vec::new();
        for row in reader.deserialize::<Row>() {
            out.push(row?.into());
        }
        debug!("loaded {} rows from {}", out.len(), p.display());
        Ok(out)
    }

    fn save(&self, region: &Region, rows: &[Listing]) -> Result<PathBuf> {
        let p = self.path_for(region);
        let tmp = p.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for l in rows {
                writer.serialize(Row::from(l))?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &p).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            HarvestError::storage_error("save", format!("{}: {e}", p.display()))
        })?;
        Ok(p)
    }

    fn list(&self) -> Result<Vec<Region>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(SUFFIX)) else {
                continue;
            };
            if !stem.is_empty() {
                out.push(Region::from_file_stem(stem));
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(addr: &str, url: Option<&str>, desc: Description) -> Listing {
        let mut l = Listing::summary(addr);
        l.url = url.map(str::to_string);
        l.price = "$2,400/mo".into();
        l.description = desc;
        l.page_number = Some(2);
        l.source_region = Some(Region::new("Echo Park"));
        l.collected_at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).earliest();
        l
    }

    #[test]
    fn missing_dataset_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path()).unwrap();
        assert!(store.load(&Region::new("Nowhere")).unwrap().is_empty());
    }

    #[test]
    fn save_then_load_keeps_rows_and_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path()).unwrap();
        let region = Region::new("Echo Park");
        let rows = vec![
            row("1 Elm St", Some("https://x.test/1"), Description::Text("Sunny, with a \"big\" yard".into())),
            row("2 Oak St", Some("https://x.test/2"), Description::CaptchaBlocked),
            row("3 Fir St", None, Description::Absent),
            row("4 Bay St", Some("https://x.test/4"), Description::Error),
        ];
        let path = store.save(&region, &rows).unwrap();
        assert!(path.ends_with("Echo_Park_rentals.csv"));
        assert_eq!(store.load(&region).unwrap(), rows);
    }

    #[test]
    fn header_uses_dataset_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path()).unwrap();
        let region = Region::new("Silver Lake");
        let path = store.save(&region, &[row("1 Elm St", None, Description::Absent)]).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "address,price,beds,baths,sqft,url,description,type,page_number,neighborhood,scraped_date"
        );
        assert!(text.contains(",N/A,Rental,2,Echo Park,2024-05-01 09:30:00"));
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path()).unwrap();
        let region = Region::new("Echo Park");
        store.save(&region, &[row("1", None, Description::Absent), row("2", None, Description::Absent)]).unwrap();
        store.save(&region, &[row("3", None, Description::Absent)]).unwrap();
        assert_eq!(store.load(&region).unwrap().len(), 1);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["Echo_Park_rentals.csv".to_string()]);
    }

    #[test]
    fn lists_regions_with_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path()).unwrap();
        store.save(&Region::new("Silver Lake"), &[]).unwrap();
        store.save(&Region::new("Echo Park"), &[]).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(
            store.list().unwrap(),
            vec![Region::new("Echo Park"), Region::new("Silver Lake")]
        );
    }

    #[test]
    fn reads_rows_written_without_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path()).unwrap();
        fs::write(
            dir.path().join("Venice_rentals.csv"),
            "address,price,beds,baths,sqft\n12 Canal St,\"$3,000/mo\",1 bd,1 ba,N/A\n",
        )
        .unwrap();
        let rows = store.load(&Region::new("Venice")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, "$3,000/mo");
        assert_eq!(rows[0].url, None);
        assert_eq!(rows[0].listing_type, "Rental");
        assert_eq!(rows[0].description, Description::Absent);
    }
}
