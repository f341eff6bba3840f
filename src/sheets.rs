use crate::config::AppConfig;
use crate::error::AppError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: u64 = 3600;

/// One cell as it comes back from the remote tab.
///
/// Rows are schema-less; a lookup for a header the row does not carry yields
/// [`CellValue::Empty`] so downstream code degrades to zeros/blanks instead
/// of panicking.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The cell's display string. Whole numbers render without a decimal
    /// point so they match what the sheet shows.
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }

    fn from_json(value: &Value) -> CellValue {
        match value {
            Value::Null => CellValue::Empty,
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            Value::String(s) if s.is_empty() => CellValue::Empty,
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// A single data row keyed by the tab's header strings.
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    cells: HashMap<String, CellValue>,
}

const EMPTY_CELL: CellValue = CellValue::Empty;

impl SheetRow {
    /// Build a row from literal header/value pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> SheetRow {
        let cells = pairs
            .into_iter()
            .map(|(header, value)| {
                let cell = if value.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(value.to_string())
                };
                (header.to_string(), cell)
            })
            .collect();
        SheetRow { cells }
    }

    /// Look up a cell by header. Missing headers read as empty.
    pub fn get(&self, header: &str) -> &CellValue {
        self.cells.get(header).unwrap_or(&EMPTY_CELL)
    }

    /// The display string for a cell, `""` when absent.
    pub fn render(&self, header: &str) -> String {
        self.get(header).render()
    }

    pub fn set(&mut self, header: &str, value: CellValue) {
        self.cells.insert(header.to_string(), value);
    }

    /// Serialize the row as a header-keyed JSON object.
    pub fn to_object(&self, headers: &[String]) -> serde_json::Map<String, Value> {
        headers
            .iter()
            .map(|header| (header.clone(), Value::String(self.render(header))))
            .collect()
    }
}

/// Header row plus all data rows of one tab.
#[derive(Debug, Clone, Default)]
pub struct TabRows {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl TabRows {
    /// Shape a raw value grid into header-keyed rows.
    ///
    /// The first grid row is the header row. Data rows shorter than the
    /// header row are padded with empty cells, values beyond the header
    /// width are dropped, and duplicate headers keep the first occurrence.
    pub fn from_values(values: Vec<Vec<Value>>) -> TabRows {
        let mut grid = values.into_iter();
        let headers: Vec<String> = match grid.next() {
            Some(header_row) => header_row
                .iter()
                .map(|v| CellValue::from_json(v).render())
                .collect(),
            None => return TabRows::default(),
        };

        let rows = grid
            .map(|raw| {
                let mut row = SheetRow::default();
                for (i, header) in headers.iter().enumerate() {
                    if header.is_empty() || row.cells.contains_key(header) {
                        continue;
                    }
                    let cell = raw.get(i).map(CellValue::from_json).unwrap_or(EMPTY_CELL);
                    row.cells.insert(header.clone(), cell);
                }
                row
            })
            .collect();

        TabRows { headers, rows }
    }
}

/// Service-account identity parsed from the credential JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: TabInfo,
}

#[derive(Debug, Clone, Deserialize)]
struct TabInfo {
    title: String,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// An authenticated handle on the spreadsheet document.
///
/// Holds a fresh access token and the document's tab listing. Handles are
/// created per request and dropped afterwards; there is no token cache and
/// no connection pool, so every route pays one authentication round trip.
pub struct Document {
    http: reqwest::Client,
    token: String,
    spreadsheet_id: String,
    tabs: Vec<TabInfo>,
}

/// A named tab within an open document.
pub struct Tab<'a> {
    doc: &'a Document,
    title: String,
}

/// Authenticate to the spreadsheet service and load the document metadata.
///
/// Credentials come from `GOOGLE_CREDS` when set, else from the local
/// credential file; absence of both, a malformed key, or an unreachable
/// service all surface as [`AppError::Connection`].
pub async fn connect(config: &AppConfig) -> Result<Document, AppError> {
    let key = load_credentials(config)?;
    let http = reqwest::Client::builder()
        .timeout(config.fetch_timeout)
        .build()
        .map_err(|e| AppError::Connection(e.to_string()))?;

    let token = fetch_access_token(&http, &key).await?;

    let meta_url = format!(
        "{SHEETS_API}/{}?fields=sheets.properties(title,index)",
        config.spreadsheet_id
    );
    let meta: SpreadsheetMeta = http
        .get(&meta_url)
        .bearer_auth(&token)
        .send()
        .await
        .map_err(|e| AppError::Connection(format!("document metadata: {e}")))?
        .error_for_status()
        .map_err(|e| AppError::Connection(format!("document metadata: {e}")))?
        .json()
        .await
        .map_err(|e| AppError::Connection(format!("document metadata: {e}")))?;

    Ok(Document {
        http,
        token,
        spreadsheet_id: config.spreadsheet_id.clone(),
        tabs: meta.sheets.into_iter().map(|s| s.properties).collect(),
    })
}

impl Document {
    /// Resolve a tab by its position within the document.
    pub fn tab_by_index(&self, index: usize) -> Result<Tab<'_>, AppError> {
        self.tabs
            .iter()
            .find(|tab| tab.index == index)
            .map(|tab| Tab {
                doc: self,
                title: tab.title.clone(),
            })
            .ok_or_else(|| AppError::TabNotFound(format!("index {index}")))
    }

    /// Resolve a tab by its exact title.
    pub fn tab_by_title(&self, title: &str) -> Result<Tab<'_>, AppError> {
        self.tabs
            .iter()
            .find(|tab| tab.title == title)
            .map(|tab| Tab {
                doc: self,
                title: tab.title.clone(),
            })
            .ok_or_else(|| AppError::TabNotFound(title.to_string()))
    }
}

impl Tab<'_> {
    /// Fetch the tab's full value grid and shape it into rows.
    pub async fn rows(&self) -> Result<TabRows, AppError> {
        let mut url = reqwest::Url::parse(SHEETS_API)
            .map_err(|e| AppError::Fetch(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Fetch("bad API base url".to_string()))?
            .push(&self.doc.spreadsheet_id)
            .push("values")
            .push(&format!("'{}'", self.title));

        let range: ValueRange = self
            .doc
            .http
            .get(url)
            .bearer_auth(&self.doc.token)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("tab '{}': {e}", self.title)))?
            .error_for_status()
            .map_err(|e| AppError::Fetch(format!("tab '{}': {e}", self.title)))?
            .json()
            .await
            .map_err(|e| AppError::Fetch(format!("tab '{}': {e}", self.title)))?;

        Ok(TabRows::from_values(range.values))
    }
}

fn load_credentials(config: &AppConfig) -> Result<ServiceAccountKey, AppError> {
    let raw = match &config.creds_json {
        Some(blob) => blob.clone(),
        None => fs::read_to_string(&config.creds_file).map_err(|_| {
            AppError::Connection(
                "missing credentials: set GOOGLE_CREDS or provide credentials.json".to_string(),
            )
        })?,
    };

    let mut key: ServiceAccountKey = serde_json::from_str(&raw)
        .map_err(|e| AppError::Connection(format!("credential JSON: {e}")))?;
    // Environment blobs usually carry the PEM with escaped newlines.
    key.private_key = key.private_key.replace("\\n", "\n");
    Ok(key)
}

async fn fetch_access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = TokenClaims {
        iss: &key.client_email,
        scope: SHEETS_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| AppError::Connection(format!("service-account key: {e}")))?;
    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|e| AppError::Connection(format!("token assertion: {e}")))?;

    let response: TokenResponse = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
        .send()
        .await
        .map_err(|e| AppError::Connection(format!("token endpoint: {e}")))?
        .error_for_status()
        .map_err(|e| AppError::Connection(format!("token endpoint: {e}")))?
        .json()
        .await
        .map_err(|e| AppError::Connection(format!("token endpoint: {e}")))?;

    Ok(response.access_token)
}
