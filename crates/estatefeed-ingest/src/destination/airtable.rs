//! Airtable REST client
//!
//! Column listing and creation go through the metadata API. Tokens without
//! schema scopes cannot use it, so listing falls back to reading the field
//! names of the first row.

use super::{CreatedRow, Destination, DestinationError};
use crate::coerce::{DestinationRecord, FieldValue};
use crate::config::DestinationConfig;
use crate::schema::{ColumnRequirement, FieldType};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TablesResponse {
    tables: Vec<TableSchema>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    id: String,
    name: String,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: Vec<RecordResponse>,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

// ============================================================================
// Client
// ============================================================================

/// Destination backed by one Airtable base
pub struct AirtableClient {
    client: Client,
    api_url: String,
    token: String,
    base_id: String,
}

impl AirtableClient {
    pub fn new(config: &DestinationConfig) -> Result<Self, DestinationError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.trim().to_string(),
            base_id: config.base_id.trim().to_string(),
        })
    }

    fn tables_url(&self) -> String {
        format!("{}/v0/meta/bases/{}/tables", self.api_url, self.base_id)
    }

    fn fields_url(&self, table_id: &str) -> String {
        format!(
            "{}/v0/meta/bases/{}/tables/{}/fields",
            self.api_url,
            self.base_id,
            urlencoding::encode(table_id)
        )
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/v0/{}/{}", self.api_url, self.base_id, urlencoding::encode(table))
    }

    async fn fetch_tables(&self) -> Result<Vec<TableSchema>, DestinationError> {
        let response = self.client.get(self.tables_url()).bearer_auth(&self.token).send().await?;
        let response = check_status(response).await?;
        let body: TablesResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::Decode(e.to_string()))?;
        Ok(body.tables)
    }

    async fn find_table(&self, table: &str) -> Result<TableSchema, DestinationError> {
        self.fetch_tables()
            .await?
            .into_iter()
            .find(|t| t.name == table || t.id == table)
            .ok_or_else(|| DestinationError::TableNotFound(table.to_string()))
    }

    /// Field names of the first row; an empty table yields no names
    async fn probe_columns(&self, table: &str) -> Result<Vec<String>, DestinationError> {
        let response = self
            .client
            .get(self.records_url(table))
            .query(&[("maxRecords", "1")])
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DestinationError::TableNotFound(table.to_string()));
        }
        let response = check_status(response).await?;
        let body: RecordsResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::Decode(e.to_string()))?;

        Ok(body
            .records
            .into_iter()
            .next()
            .map(|record| record.fields.into_iter().map(|(name, _)| name).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Destination for AirtableClient {
    async fn list_columns(&self, table: &str) -> Result<Vec<String>, DestinationError> {
        match self.find_table(table).await {
            Ok(schema) => {
                debug!(table = table, columns = schema.fields.len(), "Read table schema");
                Ok(schema.fields.into_iter().map(|f| f.name).collect())
            },
            Err(DestinationError::Status { status, message }) => {
                warn!(status = status, message = %message, "Schema API unavailable, probing first row");
                self.probe_columns(table).await
            },
            Err(DestinationError::Decode(message)) => {
                warn!(message = %message, "Schema API response unreadable, probing first row");
                self.probe_columns(table).await
            },
            Err(e) => Err(e),
        }
    }

    async fn create_column(&self, table: &str, column: &ColumnRequirement) -> Result<bool, DestinationError> {
        let schema = match self.find_table(table).await {
            Ok(schema) => schema,
            Err(DestinationError::Http(e)) => return Err(DestinationError::Http(e)),
            Err(e) => {
                debug!(column = column.name, error = %e, "Cannot resolve table id for column creation");
                return Ok(false);
            },
        };

        let response = self
            .client
            .post(self.fields_url(&schema.id))
            .bearer_auth(&self.token)
            .json(&column_payload(column))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(column = column.name, "Created column");
            Ok(true)
        } else {
            debug!(column = column.name, status = status.as_u16(), "Column creation refused");
            Ok(false)
        }
    }

    async fn create_rows(
        &self,
        table: &str,
        rows: &[DestinationRecord],
    ) -> Result<Vec<CreatedRow>, DestinationError> {
        let records: Vec<Value> = rows.iter().map(|row| json!({ "fields": row_payload(row) })).collect();
        let body = json!({ "records": records, "typecast": true });

        let response = self
            .client
            .post(self.records_url(table))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DestinationError::TableNotFound(table.to_string()));
        }
        let response = check_status(response).await?;
        let body: RecordsResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::Decode(e.to_string()))?;

        Ok(body.records.into_iter().map(|r| CreatedRow { id: r.id }).collect())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Map 401 to `Unauthorized` and other failures to `Status` with the API's message
async fn check_status(response: Response) -> Result<Response, DestinationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(DestinationError::Unauthorized);
    }

    let text = response.text().await.unwrap_or_default();
    Err(DestinationError::Status {
        status: status.as_u16(),
        message: error_message(&text),
    })
}

/// `{"error": {"message": ...}}`, `{"error": "CODE"}`, or the raw body
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    match error {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Object(details)) => details
            .get("message")
            .or_else(|| details.get("type"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => body.chars().take(200).collect(),
    }
}

fn column_payload(column: &ColumnRequirement) -> Value {
    let mut payload = json!({
        "name": column.name,
        "type": column.field_type.destination_type(),
    });
    let options = match column.field_type {
        FieldType::Number => Some(json!({ "precision": 2 })),
        FieldType::Boolean => Some(json!({ "icon": "check", "color": "greenBright" })),
        _ => None,
    };
    if let (Some(options), Some(object)) = (options, payload.as_object_mut()) {
        object.insert("options".to_string(), options);
    }
    payload
}

fn is_fetchable(reference: &str) -> bool {
    Url::parse(reference)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// JSON fields of one row
///
/// Attachments are sent as URL objects; plain file names cannot be fetched
/// by the destination and are left out. An attachment column with no URL
/// at all is omitted.
fn row_payload(row: &DestinationRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    for (column, value) in row.iter() {
        let value = match value {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Number(n) => json!(n),
            FieldValue::Integer(n) => json!(n),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Attachments(references) => {
                let urls: Vec<Value> = references
                    .iter()
                    .filter(|r| is_fetchable(r))
                    .map(|r| json!({ "url": r }))
                    .collect();
                if urls.is_empty() {
                    continue;
                }
                Value::Array(urls)
            },
        };
        fields.insert(column.to_string(), value);
    }
    fields
}
