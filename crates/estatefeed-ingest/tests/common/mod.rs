//! Shared fixtures for the integration tests
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use estatefeed_ingest::coerce::DestinationRecord;
use estatefeed_ingest::config::{ArchiveConfig, DestinationConfig, ImportConfig};
use estatefeed_ingest::destination::{CreatedRow, Destination, DestinationError};
use estatefeed_ingest::schema::{ColumnRequirement, REQUIRED_COLUMNS};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zip::write::FileOptions;

pub const TOKEN: &str = "patTESTTOKEN0123456789";
pub const BASE_ID: &str = "appTestBase";
pub const TABLE: &str = "Listings";

// ============================================================================
// Archives and feeds
// ============================================================================

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, body) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap();
}

/// Three listings under `realty_feed.offers.offer`
pub const MODERN_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<realty_feed>
  <offers>
    <offer>
      <ESTATE_TYPE>Квартира</ESTATE_TYPE>
      <PRICE>85000</PRICE>
      <PRICE_CURRENCY>USD</PRICE_CURRENCY>
      <ROOM_QUANTITY>3</ROOM_QUANTITY>
      <TOTAL_FLOOR_AREA>72,5</TOTAL_FLOOR_AREA>
      <CITY>Київ</CITY><STREET>Хрещатик</STREET><HOUSE_NO>22</HOUSE_NO>
      <PHOTOS>
        <PHOTO><URL>https://cdn.example.com/a1.jpg</URL><ORDINAL>1</ORDINAL></PHOTO>
        <PHOTO><URL>https://cdn.example.com/a2.jpg</URL><ORDINAL>2</ORDINAL></PHOTO>
      </PHOTOS>
    </offer>
    <offer>
      <ESTATE_TYPE>Будинок</ESTATE_TYPE>
      <PRICE>1200</PRICE>
      <ADDRESS>Ірпінь, вул. Садова 4</ADDRESS>
    </offer>
    <offer>
      <ESTATE_TYPE>Ділянка</ESTATE_TYPE>
      <DISTRICT>Бучанський</DISTRICT>
    </offer>
  </offers>
</realty_feed>
"#;

/// One listing in a layout no known path covers
pub const UNKNOWN_LAYOUT_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<export generated="2024-05-01">
  <items>
    <item>
      <type>кімната</type>
      <city>Львів</city>
      <street>Городоцька</street>
    </item>
  </items>
</export>
"#;

/// A feed of `count` minimal listings
pub fn numbered_feed(count: usize) -> String {
    let offers: String = (0..count)
        .map(|i| format!("<offer><ESTATE_TYPE>Квартира</ESTATE_TYPE><PRICE>{}</PRICE></offer>", 1000 + i))
        .collect();
    format!("<realty_feed><offers>{}</offers></realty_feed>", offers)
}

/// Archive, scratch root and the directory holding both
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub archive: PathBuf,
    pub scratch_root: PathBuf,
}

impl Workspace {
    pub fn with_entries(entries: &[(&str, &[u8])]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("feeds.zip");
        write_zip(&archive, entries);
        let scratch_root = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch_root).unwrap();
        Self {
            dir,
            archive,
            scratch_root,
        }
    }

    pub fn config(&self) -> ImportConfig {
        self.config_for_api(estatefeed_ingest::config::DEFAULT_API_URL)
    }

    pub fn config_for_api(&self, api_url: &str) -> ImportConfig {
        ImportConfig::new(
            ArchiveConfig::new(&self.archive).with_scratch_root(&self.scratch_root),
            DestinationConfig::new(TOKEN, BASE_ID, TABLE).with_api_url(api_url),
        )
    }

    /// Whatever is left under the scratch root after a run
    pub fn scratch_leftovers(&self) -> usize {
        std::fs::read_dir(&self.scratch_root).unwrap().count()
    }
}

// ============================================================================
// In-memory destination
// ============================================================================

pub enum Schema {
    Columns(Vec<String>),
    Unauthorized,
    Unreadable,
}

pub fn all_columns() -> Vec<String> {
    REQUIRED_COLUMNS.iter().map(|c| c.name.to_string()).collect()
}

pub fn columns_without(missing: &[&str]) -> Vec<String> {
    all_columns().into_iter().filter(|c| !missing.contains(&c.as_str())).collect()
}

pub struct FakeDestination {
    pub schema: Schema,
    pub can_create_columns: bool,
    /// 1-based numbers of `create_rows` calls that fail
    pub failing_calls: Vec<usize>,
    pub created_columns: Mutex<Vec<String>>,
    pub batches: Mutex<Vec<Vec<DestinationRecord>>>,
}

impl FakeDestination {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            can_create_columns: false,
            failing_calls: Vec::new(),
            created_columns: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn complete() -> Self {
        Self::new(Schema::Columns(all_columns()))
    }

    pub fn failing_calls(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.to_vec();
        self
    }

    pub fn allow_column_creation(mut self) -> Self {
        self.can_create_columns = true;
        self
    }

    /// Every row sent, including rows of failed calls
    pub fn sent_rows(&self) -> Vec<DestinationRecord> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(|b| b.len()).collect()
    }
}

#[async_trait]
impl Destination for FakeDestination {
    async fn list_columns(&self, _table: &str) -> Result<Vec<String>, DestinationError> {
        match &self.schema {
            Schema::Columns(columns) => {
                let mut columns = columns.clone();
                columns.extend(self.created_columns.lock().unwrap().iter().cloned());
                Ok(columns)
            },
            Schema::Unauthorized => Err(DestinationError::Unauthorized),
            Schema::Unreadable => Err(DestinationError::Status {
                status: 403,
                message: "INVALID_PERMISSIONS".to_string(),
            }),
        }
    }

    async fn create_column(&self, _table: &str, column: &ColumnRequirement) -> Result<bool, DestinationError> {
        if self.can_create_columns {
            self.created_columns.lock().unwrap().push(column.name.to_string());
        }
        Ok(self.can_create_columns)
    }

    async fn create_rows(
        &self,
        _table: &str,
        rows: &[DestinationRecord],
    ) -> Result<Vec<CreatedRow>, DestinationError> {
        let call = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(rows.to_vec());
            batches.len()
        };
        if self.failing_calls.contains(&call) {
            return Err(DestinationError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok((0..rows.len())
            .map(|i| CreatedRow {
                id: format!("rec{:03}{:02}", call, i),
            })
            .collect())
    }
}
