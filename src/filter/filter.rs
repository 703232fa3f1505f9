use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{ColumnCasts, FilterWhere};
use super::types::{FilterOrderInfo, SqlResult};

/// Parameterized SELECT builder over a single table.
///
/// Client-driven conditions go through `where_clause` and are always bound as
/// parameters. `scope` predicates are fixed SQL supplied by the server (for
/// example the released-only rule) and are ANDed in front of them.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    scope: Vec<String>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    casts: ColumnCasts,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            scope: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
            casts: ColumnCasts::new(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        Self::validate_select_columns(&columns)?;
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    /// Bind parameters for `column` with an explicit Postgres cast.
    pub fn cast(&mut self, column: impl Into<String>, pg_type: &'static str) -> &mut Self {
        self.casts.insert(column.into(), pg_type);
        self
    }

    /// Add a server-side predicate. Never pass client input here.
    pub fn scope(&mut self, predicate: impl Into<String>) -> &mut Self {
        let predicate = predicate.into();
        if !self.scope.contains(&predicate) {
            self.scope.push(predicate);
        }
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scope
    }

    pub fn order(&mut self, order: Vec<FilterOrderInfo>) -> Result<&mut Self, FilterError> {
        FilterOrder::generate(&order)?;
        self.order_data = order;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i64::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        self.render(self.build_select_clause(), None)
    }

    /// Same query, but each row comes back as one JSON object in column `row`.
    pub fn to_json_sql(&self) -> Result<SqlResult, FilterError> {
        let projection = if self.select_columns.is_empty() {
            "row_to_json(t)".to_string()
        } else {
            let pairs = self
                .select_columns
                .iter()
                .map(|c| format!("'{}', \"{}\"", c, c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("json_build_object({})", pairs)
        };
        self.render(format!("{} AS row", projection), Some("t"))
    }

    /// WHERE body (without the keyword) with placeholders numbered after `starting_param_index`.
    pub fn to_where_sql(&self, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        let mut conditions = self.scope.clone();
        let mut params = vec![];
        if let Some(ref where_data) = self.where_data {
            let (sql, where_params) = FilterWhere::generate(where_data, starting_param_index, &self.casts)?;
            if !sql.is_empty() {
                conditions.push(sql);
            }
            params = where_params;
        }
        Ok(SqlResult { query: conditions.join(" AND "), params })
    }

    fn render(&self, select_clause: String, alias: Option<&str>) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql(0)?;
        let order_clause = FilterOrder::generate(&self.order_data)?;
        let limit_clause = self.build_limit_clause();
        let from_clause = match alias {
            Some(alias) => format!("FROM \"{}\" AS {}", self.table_name, alias),
            None => format!("FROM \"{}\"", self.table_name),
        };

        let query = [
            format!("SELECT {}", select_clause),
            from_clause,
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() { return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())); }
        if !Self::is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn validate_select_columns(columns: &[String]) -> Result<(), FilterError> {
        for column in columns {
            if column == "*" { continue; }
            if column.is_empty() { return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string())); }
            if !Self::is_identifier(column) {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
            }
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.contains(&"*".to_string()) {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;
    use serde_json::json;

    #[test]
    fn plain_select_without_conditions() {
        let filter = Filter::new("movies").unwrap();
        assert_eq!(filter.to_sql().unwrap().query, "SELECT * FROM \"movies\"");
    }

    #[test]
    fn scope_precedes_client_conditions() {
        let mut filter = Filter::new("movies").unwrap();
        filter.scope("\"release_date\" <= NOW()");
        filter.where_clause(json!({ "price": { "$lt": 20 } })).unwrap();
        filter.limit(10, Some(20)).unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"movies\" WHERE \"release_date\" <= NOW() AND \"price\" < $1 LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!(20)]);
    }

    #[test]
    fn scope_is_not_duplicated() {
        let mut filter = Filter::new("users").unwrap();
        filter.scope("\"active\" IS NOT FALSE").scope("\"active\" IS NOT FALSE");
        assert_eq!(filter.scopes().len(), 1);
    }

    #[test]
    fn json_projection_uses_build_object() {
        let mut filter = Filter::new("movies").unwrap();
        filter.select(vec!["id".into(), "name".into()]).unwrap();
        filter
            .order(vec![FilterOrderInfo { column: "name".into(), sort: SortDirection::Asc }])
            .unwrap();
        assert_eq!(
            filter.to_json_sql().unwrap().query,
            "SELECT json_build_object('id', \"id\", 'name', \"name\") AS row FROM \"movies\" AS t ORDER BY \"name\" ASC NULLS FIRST"
        );
    }

    #[test]
    fn json_projection_defaults_to_whole_row() {
        let filter = Filter::new("movies").unwrap();
        assert_eq!(filter.to_json_sql().unwrap().query, "SELECT row_to_json(t) AS row FROM \"movies\" AS t");
    }

    #[test]
    fn where_sql_puts_scope_first() {
        let mut filter = Filter::new("movies").unwrap();
        filter.scope("\"release_date\" <= NOW()");
        assert_eq!(filter.to_where_sql(0).unwrap().query, "\"release_date\" <= NOW()");
    }

    #[test]
    fn rejects_bad_identifiers_and_negative_limits() {
        assert!(Filter::new("movies; DROP").is_err());
        let mut filter = Filter::new("movies").unwrap();
        assert!(filter.select(vec!["na me".into()]).is_err());
        assert!(filter.limit(-1, None).is_err());
        assert!(filter.limit(5, Some(-1)).is_err());
    }
}
