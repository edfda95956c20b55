//! CSV name registry adapter.

use crate::domain::error::StockpickError;
use crate::ports::names_port::NamesPort;
use std::fs;
use std::path::PathBuf;

pub struct CsvNamesAdapter {
    path: PathBuf,
}

impl CsvNamesAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

fn is_code_header(header: &str) -> bool {
    matches!(header, "code" | "代码" | "股票代码")
}

fn is_name_header(header: &str) -> bool {
    matches!(header, "name" | "名称" | "股票名称")
}

impl NamesPort for CsvNamesAdapter {
    /// Codes are kept as text so leading zeros survive until normalization.
    fn load_names(&self) -> Result<Vec<(String, String)>, StockpickError> {
        if !self.path.is_file() {
            return Err(StockpickError::MissingPath {
                what: "name registry",
                path: self.path.clone(),
            });
        }
        let content = fs::read_to_string(&self.path).map_err(|e| StockpickError::Registry {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| StockpickError::Registry {
            reason: format!("CSV header error: {}", e),
        })?;
        let position = |pred: fn(&str) -> bool, label: &str| {
            headers
                .iter()
                .position(|h| pred(h.trim_start_matches('\u{feff}')))
                .ok_or_else(|| StockpickError::Registry {
                    reason: format!("{}: missing {} column", self.path.display(), label),
                })
        };
        let code_idx = position(is_code_header, "code")?;
        let name_idx = position(is_name_header, "name")?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| StockpickError::Registry {
                reason: format!("CSV parse error: {}", e),
            })?;
            let code = record.get(code_idx).unwrap_or_default();
            if code.is_empty() {
                continue;
            }
            let name = record.get(name_idx).unwrap_or_default();
            rows.push((code.to_string(), name.to_string()));
        }

        Ok(rows)
    }
}
