//! Idempotent CSV ingestion of the provider capability catalogue.

use crate::store::MetaStore;
use crate::types::StoredProviderCapability;
use s3gw_common::error::{Error, Result};
use std::path::Path;

/// Load the provider capability CSV (if present) and seed rows that don't
/// already exist. Rows missing a zone code or provider are skipped.
pub fn seed_provider_capabilities(store: &MetaStore, csv_path: impl AsRef<Path>) -> Result<usize> {
    let path = csv_path.as_ref();
    if !path.exists() {
        return Ok(0);
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Misconfigured(format!("failed to open provider csv: {e}")))?;

    let mut seeded = 0;
    for record in reader.deserialize::<CsvRow>() {
        let record = record.map_err(|e| Error::Misconfigured(format!("bad provider csv row: {e}")))?;
        if record.zone_code.is_empty() || record.provider.is_empty() {
            continue;
        }
        store.seed_provider_capability(StoredProviderCapability {
            country: record.country,
            region_city: record.region_city,
            zone_code: record.zone_code,
            provider: record.provider,
            s3_compatible: non_empty(record.s3_compatible),
            object_lock: non_empty(record.object_lock),
            versioning: non_empty(record.versioning),
            iso27001: non_empty(record.iso27001),
            veeam_ready: non_empty(record.veeam_ready),
            notes: non_empty(record.notes),
        })?;
        seeded += 1;
    }
    Ok(seeded)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "Region/City", default)]
    region_city: String,
    #[serde(rename = "Zone_Code", default)]
    zone_code: String,
    #[serde(rename = "Provider", default)]
    provider: String,
    #[serde(rename = "S3_Compatible", default)]
    s3_compatible: String,
    #[serde(rename = "Object_Lock", default)]
    object_lock: String,
    #[serde(rename = "Versioning", default)]
    versioning: String,
    #[serde(rename = "ISO_27001_GDPR", default)]
    iso27001: String,
    #[serde(rename = "Veeam_Ready", default)]
    veeam_ready: String,
    #[serde(rename = "Notes", default)]
    notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn seeds_rows_and_skips_incomplete_ones() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("providers.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(
            file,
            "Country,Region/City,Zone_Code,Provider,S3_Compatible,Object_Lock,Versioning,ISO_27001_GDPR,Veeam_Ready,Notes"
        )
        .unwrap();
        writeln!(file, "US,Virginia,us-east-1,AWS,Yes,Yes,Yes,Yes,Yes,primary region").unwrap();
        writeln!(file, "DE,Frankfurt,,OVH,,,,,,").unwrap();

        let store_dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(store_dir.path().join("meta.redb")).unwrap();
        let seeded = seed_provider_capabilities(&store, &csv_path).unwrap();
        assert_eq!(seeded, 1);
    }

    #[test]
    fn missing_csv_is_a_no_op() {
        let store_dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(store_dir.path().join("meta.redb")).unwrap();
        let seeded = seed_provider_capabilities(&store, "/nonexistent/path.csv").unwrap();
        assert_eq!(seeded, 0);
    }
}
