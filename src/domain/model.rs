use crate::utils::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// An in-memory CSV table: ordered headers and rows of string cells.
///
/// Every row holds exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Parses CSV text. Lines starting with `#` are comments. Short rows are
    /// padded with empty cells.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let width = headers.len();
        let mut rows = Vec::new();

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > width {
                return Err(FetchError::InvalidTable {
                    message: format!(
                        "row {} has {} fields but the header has {}",
                        line + 1,
                        record.len(),
                        width
                    ),
                });
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if !self.headers.is_empty() {
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
        }
        writer
            .into_inner()
            .map_err(|e| FetchError::IoError(e.into_error()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| FetchError::MissingColumn {
                column: name.to_string(),
                context: format!("table with columns [{}]", self.headers.join(", ")),
            })
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(FetchError::InvalidTable {
                message: format!(
                    "row has {} cells but the table has {} columns",
                    row.len(),
                    self.headers.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Keeps only the named columns, in the order given.
    pub fn select(&self, columns: &[&str]) -> Result<Table> {
        let indices = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(Table {
            headers: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Renames columns that exist; unknown names in the mapping are ignored.
    pub fn rename(&mut self, mapping: &[(&str, &str)]) {
        let lookup: HashMap<&str, &str> = mapping.iter().copied().collect();
        for header in &mut self.headers {
            if let Some(new_name) = lookup.get(header.as_str()) {
                *header = new_name.to_string();
            }
        }
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.headers.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Replaces the named column, or appends it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(FetchError::InvalidTable {
                message: format!(
                    "column '{}' has {} values for {} rows",
                    name,
                    values.len(),
                    self.rows.len()
                ),
            });
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Inner join on `left_key == right_key`, preserving left row order.
    ///
    /// When both keys share a name the right key column is dropped. Other
    /// columns present on both sides get `_x` / `_y` suffixes.
    pub fn inner_join(&self, right: &Table, left_key: &str, right_key: &str) -> Result<Table> {
        let left_idx = self.require_column(left_key)?;
        let right_idx = right.require_column(right_key)?;

        let right_cols: Vec<usize> = (0..right.headers.len())
            .filter(|&i| !(i == right_idx && left_key == right_key))
            .collect();

        let left_names: HashSet<&str> = self.headers.iter().map(String::as_str).collect();
        let right_names: HashSet<&str> = right_cols
            .iter()
            .map(|&i| right.headers[i].as_str())
            .collect();

        let mut headers = Vec::with_capacity(self.headers.len() + right_cols.len());
        for (i, h) in self.headers.iter().enumerate() {
            if right_names.contains(h.as_str()) && !(i == left_idx && left_key == right_key) {
                headers.push(format!("{}_x", h));
            } else {
                headers.push(h.clone());
            }
        }
        for &i in &right_cols {
            let h = &right.headers[i];
            if left_names.contains(h.as_str()) {
                headers.push(format!("{}_y", h));
            } else {
                headers.push(h.clone());
            }
        }

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (r, row) in right.rows.iter().enumerate() {
            index.entry(normalize_key(&row[right_idx])).or_default().push(r);
        }

        let mut rows = Vec::new();
        for left_row in &self.rows {
            if let Some(matches) = index.get(&normalize_key(&left_row[left_idx])) {
                for &r in matches {
                    let mut row = left_row.clone();
                    row.extend(right_cols.iter().map(|&i| right.rows[r][i].clone()));
                    rows.push(row);
                }
            }
        }

        Ok(Table { headers, rows })
    }

    /// Stacks tables vertically. Headers are the union in first-seen order;
    /// cells missing from a table are left empty.
    pub fn concat(tables: &[Table]) -> Table {
        let mut headers: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for table in tables {
            for h in &table.headers {
                if seen.insert(h.clone()) {
                    headers.push(h.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let positions: Vec<Option<usize>> =
                headers.iter().map(|h| table.column_index(h)).collect();
            for row in &table.rows {
                rows.push(
                    positions
                        .iter()
                        .map(|p| p.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        Table { headers, rows }
    }

    /// Drops rows whose key was already seen; the first occurrence wins.
    pub fn dedup_by(&mut self, key: &str) -> Result<()> {
        let idx = self.require_column(key)?;
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(normalize_key(&row[idx])));
        Ok(())
    }
}

/// Join/dedup key form: trimmed, with integral numbers like `123.0` written as `123`.
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
            return format!("{}", n as i64);
        }
    }
    trimmed.to_string()
}

/// Which sectors an operation should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorSelection {
    All,
    Single(u32),
    List(Vec<u32>),
}

impl SectorSelection {
    /// Expands to concrete sector numbers. Sectors are numbered from 1.
    pub fn resolve(&self, num_sectors: u32) -> Result<Vec<u32>> {
        let sectors = match self {
            SectorSelection::All => (1..=num_sectors).collect(),
            SectorSelection::Single(s) => vec![*s],
            SectorSelection::List(list) => {
                let mut seen = HashSet::new();
                list.iter().copied().filter(|s| seen.insert(*s)).collect()
            }
        };

        if let Some(bad) = sectors.iter().find(|&&s| s == 0) {
            return Err(FetchError::InvalidConfigValueError {
                field: "sector".to_string(),
                value: bad.to_string(),
                reason: "TESS sectors are numbered from 1".to_string(),
            });
        }
        Ok(sectors)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToiSource {
    /// NASA Exoplanet Archive TOI table.
    #[default]
    Caltech,
    /// TESS Exoplanet Vetting (tev.mit.edu) TOI release.
    Mit,
}

impl ToiSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToiSource::Caltech => "caltech",
            ToiSource::Mit => "mit",
        }
    }
}

impl fmt::Display for ToiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToiSource {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "caltech" => Ok(ToiSource::Caltech),
            "mit" => Ok(ToiSource::Mit),
            other => Err(FetchError::InvalidConfigValueError {
                field: "toi_source".to_string(),
                value: other.to_string(),
                reason: "expected 'caltech' or 'mit'".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CutoutTarget {
    Coordinates { ra: f64, dec: f64 },
    Tic(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CutoutRequest {
    pub target: CutoutTarget,
    /// Cutout edge length in pixels.
    pub size: u32,
    pub sector: Option<u32>,
}

impl CutoutRequest {
    pub const DEFAULT_SIZE: u32 = 10;

    /// Names the cached archive; every field that changes the product is in it.
    pub fn label(&self) -> String {
        let target = match &self.target {
            CutoutTarget::Tic(id) => format!("TIC_{}", id),
            CutoutTarget::Coordinates { ra, dec } => format!("ra{:.5}_dec{:+.5}", ra, dec),
        };
        let cutout = format!("{}_{}x{}", target, self.size, self.size);
        match self.sector {
            Some(s) => format!("{}_S{:03}", cutout, s),
            None => cutout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Cached,
    Refreshed,
    Downloaded,
}

/// A table-valued product as it now sits in storage.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub table: Table,
    pub path: String,
    pub status: CacheStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorCount {
    pub configured: u32,
    pub available: u32,
}

impl SectorCount {
    pub fn is_current(&self) -> bool {
        self.configured == self.available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Target-list template; `{sector}` is replaced by the zero-padded sector.
    pub sector_pointings: String,
    pub toi_caltech: String,
    pub toi_mit: String,
    pub mast_invoke: String,
    pub tesscut: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sector_pointings:
                "https://tess.mit.edu/wp-content/uploads/all_targets_S{sector}_v1.csv".to_string(),
            toi_caltech:
                "https://exoplanetarchive.ipac.caltech.edu/cgi-bin/nstedAPI/nph-nstedAPI?table=toi"
                    .to_string(),
            toi_mit: "https://tev.mit.edu/data/collection/193/csv/6/".to_string(),
            mast_invoke: "https://mast.stsci.edu/api/v0/invoke".to_string(),
            tesscut: "https://mast.stsci.edu/tesscut/api/v0.1/astrocut".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint rooted at `base`, mirroring the real paths. Used to
    /// point the whole tool at a mirror or a mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            sector_pointings: format!("{}/wp-content/uploads/all_targets_S{{sector}}_v1.csv", base),
            toi_caltech: format!("{}/cgi-bin/nstedAPI/nph-nstedAPI?table=toi", base),
            toi_mit: format!("{}/data/collection/193/csv/6/", base),
            mast_invoke: format!("{}/api/v0/invoke", base),
            tesscut: format!("{}/tesscut/api/v0.1/astrocut", base),
        }
    }

    pub fn sector_pointings_url(&self, sector: u32) -> String {
        self.sector_pointings
            .replace("{sector}", &format!("{:03}", sector))
    }

    pub fn toi_url(&self, source: ToiSource) -> &str {
        match source {
            ToiSource::Caltech => &self.toi_caltech,
            ToiSource::Mit => &self.toi_mit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            retry_attempts: 2,
            retry_delay_ms: 1000,
        }
    }
}
