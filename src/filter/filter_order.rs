use super::error::FilterError;
use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    /// Missing values rank lowest: first ascending, last descending.
    pub fn generate(infos: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if infos.is_empty() { return Ok(String::new()); }
        for info in infos {
            if !info.column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(FilterError::InvalidColumn(info.column.clone()));
            }
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {} {}", i.column, i.sort.to_sql(), i.sort.nulls_sql()))
            .collect();
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}
