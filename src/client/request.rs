//! Query request construction and validation
//!
//! The JSON request sent after the handshake:
//!
//! ```json
//! {"schema":[{"name":"a","type":"int32"}],"sql":"select a from t",
//!  "fragment":[0,4],"filespec":{"fmt":"parquet"}}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ClientError, ClientResult};
use crate::xrg::is_supported_type;

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            precision: None,
            scale: None,
        }
    }

    pub fn decimal(name: impl Into<String>, precision: i32, scale: i32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::new(name, "decimal")
        }
    }
}

/// Reads a JSON array of column definitions and validates it.
pub fn load_schema(path: &Path) -> ClientResult<Vec<ColumnDef>> {
    let content = fs::read_to_string(path).map_err(|e| {
        ClientError::Config(format!("failed to read schema {}: {}", path.display(), e))
    })?;
    let schema: Vec<ColumnDef> = serde_json::from_str(&content).map_err(|e| {
        ClientError::Config(format!("invalid schema JSON in {}: {}", path.display(), e))
    })?;
    validate_schema(&schema)?;
    Ok(schema)
}

/// Checks the schema is non-empty and every column is named and typed.
pub fn validate_schema(schema: &[ColumnDef]) -> ClientResult<()> {
    if schema.is_empty() {
        return Err(ClientError::Validation("no schema found".into()));
    }
    for (i, col) in schema.iter().enumerate() {
        if col.name.is_empty() {
            return Err(ClientError::Validation(format!("column {} has no name", i)));
        }
        if !is_supported_type(&col.ty) {
            return Err(ClientError::Validation(format!(
                "invalid type '{}' for column '{}'",
                col.ty, col.name
            )));
        }
    }
    Ok(())
}

/// CSV source options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvSpec {
    pub delim: String,
    pub quote: String,
    pub escape: String,
    pub nullstr: String,
    pub header_line: bool,
}

impl Default for CsvSpec {
    fn default() -> Self {
        Self {
            delim: ",".into(),
            quote: "\"".into(),
            escape: "\"".into(),
            nullstr: String::new(),
            header_line: false,
        }
    }
}

/// Source file format, tagged by `fmt` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fmt", rename_all = "lowercase")]
pub enum FileSpec {
    Csv(CsvSpec),
    Parquet,
}

impl FileSpec {
    pub fn csv(spec: CsvSpec) -> Self {
        FileSpec::Csv(spec)
    }

    pub fn validate(&self) -> ClientResult<()> {
        let FileSpec::Csv(csv) = self else {
            return Ok(());
        };
        let chars = |s: &str| s.chars().count();
        if chars(&csv.delim) != 1 {
            return Err(ClientError::Validation(format!(
                "csv delim must be one character, got {:?}",
                csv.delim
            )));
        }
        if chars(&csv.quote) != 1 {
            return Err(ClientError::Validation(format!(
                "csv quote must be one character, got {:?}",
                csv.quote
            )));
        }
        if chars(&csv.escape) > 1 {
            return Err(ClientError::Validation(format!(
                "csv escape must be at most one character, got {:?}",
                csv.escape
            )));
        }
        if csv.delim == csv.quote {
            return Err(ClientError::Validation(
                "csv delim and quote must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Which fragments of the query to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentSelector {
    /// One request per fragment
    #[default]
    All,
    /// Only the fragment with this index
    Single(u32),
}

/// The request for one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub schema: Vec<ColumnDef>,
    pub sql: String,
    /// `[index, total]`
    pub fragment: [u32; 2],
    pub filespec: FileSpec,
}

impl QueryRequest {
    pub fn to_json(&self) -> ClientResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| ClientError::Validation(format!("failed to encode request: {}", e)))
    }
}

/// Everything needed to build the per-fragment requests.
#[derive(Debug, Clone, Default)]
pub struct QueryTemplate {
    pub sql: String,
    pub schema: Vec<ColumnDef>,
    pub filespec: Option<FileSpec>,
    pub fragment_count: u32,
    pub selector: FragmentSelector,
    pub hosts: Vec<String>,
}

impl QueryTemplate {
    /// Validates the template. The first failing check wins.
    pub fn validate(&self) -> ClientResult<()> {
        if self.sql.trim().is_empty() {
            return Err(ClientError::Validation("invalid SQL statement".into()));
        }
        match &self.filespec {
            None => return Err(ClientError::Validation("invalid file spec".into())),
            Some(spec) => spec.validate()?,
        }
        validate_schema(&self.schema)?;
        if self.fragment_count == 0 {
            return Err(ClientError::Validation(
                "fragment count must be greater than 0".into(),
            ));
        }
        if let FragmentSelector::Single(id) = self.selector {
            if id >= self.fragment_count {
                return Err(ClientError::Validation(format!(
                    "fragment id {} out of range for {} fragments",
                    id, self.fragment_count
                )));
            }
        }
        if self.hosts.is_empty() {
            return Err(ClientError::Validation("no hosts configured".into()));
        }
        Ok(())
    }

    /// Builds the per-fragment requests, validating first.
    pub fn expand(&self) -> ClientResult<Vec<QueryRequest>> {
        self.validate()?;
        let filespec = self
            .filespec
            .clone()
            .ok_or_else(|| ClientError::Validation("invalid file spec".into()))?;
        let indexes: Vec<u32> = match self.selector {
            FragmentSelector::All => (0..self.fragment_count).collect(),
            FragmentSelector::Single(id) => vec![id],
        };
        Ok(indexes
            .into_iter()
            .map(|index| QueryRequest {
                schema: self.schema.clone(),
                sql: self.sql.clone(),
                fragment: [index, self.fragment_count],
                filespec: filespec.clone(),
            })
            .collect())
    }

    /// Host for the `n`th request, round-robin.
    pub fn host_for(&self, n: usize) -> Option<&str> {
        if self.hosts.is_empty() {
            return None;
        }
        Some(self.hosts[n % self.hosts.len()].as_str())
    }
}
