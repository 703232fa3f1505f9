use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOrderInfo, SortDirection};

const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// How a query-string value is coerced before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Integer,
    Float,
    Timestamp,
    TextList,
}

/// Mapping between a public (camelCase) attribute and its column.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub api: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    /// Left out of the default projection.
    pub hidden: bool,
}

impl FieldSpec {
    pub const fn new(api: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { api, column, kind, hidden: false }
    }

    pub const fn hidden(api: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { api, column, kind, hidden: true }
    }
}

pub fn find_field(fields: &'static [FieldSpec], api: &str) -> Option<&'static FieldSpec> {
    fields.iter().find(|f| f.api == api)
}

/// Applies request query parameters to a pending `Filter`.
///
/// Call in order: `filter`, `sort`, `limit_fields`, `paginate`.
#[derive(Debug)]
pub struct QueryModifier {
    filter: Filter,
    params: HashMap<String, String>,
    fields: &'static [FieldSpec],
}

impl QueryModifier {
    pub fn new(filter: Filter, params: HashMap<String, String>, fields: &'static [FieldSpec]) -> Self {
        Self { filter, params, fields }
    }

    /// `field=v` is equality, `field[gte]=v` (also gt, lte, lt, ne) a comparison.
    /// Unknown attributes are ignored.
    pub fn filter(mut self) -> Result<Self, FilterError> {
        let mut conditions = Map::new();

        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();

        for key in keys {
            let (name, op) = split_operator(key);
            if RESERVED_PARAMS.contains(&name) {
                continue;
            }
            let Some(spec) = find_field(self.fields, name) else {
                continue;
            };
            let raw = &self.params[key];

            let (operator, value) = match (spec.kind, op) {
                (FieldKind::TextList, None | Some("eq")) => ("$any", Value::Array(vec![Value::String(raw.clone())])),
                (FieldKind::TextList, Some(other)) => {
                    return Err(FilterError::UnsupportedOperator(other.to_string()))
                }
                (kind, op) => (map_operator(op)?, coerce(spec, kind, raw)?),
            };

            match spec.kind {
                FieldKind::Timestamp => {
                    self.filter.cast(spec.column, "timestamptz");
                }
                FieldKind::Uuid => {
                    self.filter.cast(spec.column, "uuid");
                }
                _ => {}
            }

            let entry = conditions
                .entry(spec.column.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                ops.insert(operator.to_string(), value);
            }
        }

        if !conditions.is_empty() {
            self.filter.where_clause(Value::Object(conditions))?;
        }
        Ok(self)
    }

    /// Comma-separated attributes, `-` prefix for descending. Defaults to newest first.
    pub fn sort(mut self) -> Result<Self, FilterError> {
        let mut order: Vec<FilterOrderInfo> = self
            .params
            .get("sort")
            .map(|s| {
                s.split(',')
                    .filter_map(|part| {
                        let part = part.trim();
                        let (name, sort) = match part.strip_prefix('-') {
                            Some(name) => (name, SortDirection::Desc),
                            None => (part, SortDirection::Asc),
                        };
                        find_field(self.fields, name).map(|spec| FilterOrderInfo {
                            column: spec.column.to_string(),
                            sort,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if order.is_empty() {
            order.push(FilterOrderInfo { column: "created_at".to_string(), sort: SortDirection::Desc });
        }
        // Stable pages even when the sort keys tie
        if !order.iter().any(|o| o.column == "id") {
            order.push(FilterOrderInfo { column: "id".to_string(), sort: SortDirection::Asc });
        }

        self.filter.order(order)?;
        Ok(self)
    }

    /// Project to the listed attributes (`id` is always kept). A list made only of
    /// `-field` entries removes those from the default projection instead.
    pub fn limit_fields(mut self) -> Result<Self, FilterError> {
        let requested: Vec<&str> = self
            .params
            .get("fields")
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let default_columns = || {
            self.fields
                .iter()
                .filter(|f| !f.hidden)
                .map(|f| f.column.to_string())
                .collect::<Vec<_>>()
        };

        let columns = if requested.is_empty() {
            default_columns()
        } else if requested.iter().all(|f| f.starts_with('-')) {
            let excluded: Vec<&str> = requested
                .iter()
                .filter_map(|f| find_field(self.fields, &f[1..]).map(|spec| spec.column))
                .collect();
            default_columns()
                .into_iter()
                .filter(|c| c == "id" || !excluded.contains(&c.as_str()))
                .collect()
        } else {
            let mut columns = vec!["id".to_string()];
            for name in requested.iter().filter(|f| !f.starts_with('-')) {
                if let Some(spec) = find_field(self.fields, name) {
                    if !columns.iter().any(|c| c == spec.column) {
                        columns.push(spec.column.to_string());
                    }
                }
            }
            if columns.len() == 1 {
                default_columns()
            } else {
                columns
            }
        };

        self.filter.select(columns)?;
        Ok(self)
    }

    /// `page` and `limit` as positive integers, anything else falls back to the defaults.
    pub fn paginate(mut self) -> Result<Self, FilterError> {
        let page = self.params.get("page").and_then(|v| parse_positive(v)).unwrap_or(1);
        let limit = self
            .params
            .get("limit")
            .and_then(|v| parse_positive(v))
            .unwrap_or(crate::config::CONFIG.filter.default_limit);
        let skip = (page - 1).saturating_mul(limit);

        self.filter.limit(limit, Some(skip))?;
        Ok(self)
    }

    pub fn into_filter(self) -> Filter {
        self.filter
    }
}

/// `duration[gte]` -> (`duration`, Some(`gte`))
fn split_operator(key: &str) -> (&str, Option<&str>) {
    match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
        Some((name, op)) => (name, Some(op)),
        None => (key, None),
    }
}

fn map_operator(op: Option<&str>) -> Result<&'static str, FilterError> {
    Ok(match op {
        None | Some("eq") => "$eq",
        Some("ne") => "$ne",
        Some("gt") => "$gt",
        Some("gte") => "$gte",
        Some("lt") => "$lt",
        Some("lte") => "$lte",
        Some(other) => return Err(FilterError::UnsupportedOperator(other.to_string())),
    })
}

fn coerce(spec: &FieldSpec, kind: FieldKind, raw: &str) -> Result<Value, FilterError> {
    let invalid = || FilterError::InvalidOperatorData { field: spec.api.to_string(), value: raw.to_string() };
    let trimmed = raw.trim();

    match kind {
        FieldKind::Text => Ok(Value::String(raw.to_string())),
        FieldKind::Integer => {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::Number(i.into()));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid)
        }
        FieldKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        FieldKind::Timestamp => {
            let valid = chrono::DateTime::parse_from_rfc3339(trimmed).is_ok()
                || chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok();
            if valid { Ok(Value::String(trimmed.to_string())) } else { Err(invalid()) }
        }
        FieldKind::Uuid => Uuid::parse_str(trimmed)
            .map(|id| Value::String(id.to_string()))
            .map_err(|_| invalid()),
        FieldKind::TextList => Ok(Value::String(raw.to_string())),
    }
}

fn parse_positive(raw: &str) -> Option<i64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.is_finite() && value >= 1.0 {
        Some(value.floor() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static FIELDS: [FieldSpec; 7] = [
        FieldSpec::new("id", "id", FieldKind::Uuid),
        FieldSpec::new("name", "name", FieldKind::Text),
        FieldSpec::new("duration", "duration", FieldKind::Integer),
        FieldSpec::new("price", "price", FieldKind::Float),
        FieldSpec::new("genres", "genres", FieldKind::TextList),
        FieldSpec::new("releaseDate", "release_date", FieldKind::Timestamp),
        FieldSpec::hidden("createdAt", "created_at", FieldKind::Timestamp),
    ];

    fn modifier(pairs: &[(&str, &str)]) -> QueryModifier {
        let params = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        QueryModifier::new(Filter::new("movies").unwrap(), params, &FIELDS)
    }

    fn sql(m: QueryModifier) -> (String, Vec<Value>) {
        let result = m.into_filter().to_sql().unwrap();
        (result.query, result.params)
    }

    #[test]
    fn range_filters_are_applied() {
        let (query, params) = sql(modifier(&[("duration[gte]", "90"), ("price[lt]", "20.5"), ("page", "2")]).filter().unwrap());
        assert_eq!(query, "SELECT * FROM \"movies\" WHERE \"duration\" >= $1 AND \"price\" < $2");
        assert_eq!(params, vec![json!(90), json!(20.5)]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let (query, params) = sql(modifier(&[("director", "Nolan"), ("sort", "name")]).filter().unwrap());
        assert_eq!(query, "SELECT * FROM \"movies\"");
        assert!(params.is_empty());
    }

    #[test]
    fn list_attributes_match_on_membership() {
        let (query, params) = sql(modifier(&[("genres", "Drama")]).filter().unwrap());
        assert_eq!(query, "SELECT * FROM \"movies\" WHERE \"genres\" && ARRAY[$1]::text[]");
        assert_eq!(params, vec![json!("Drama")]);
    }

    #[test]
    fn timestamps_are_cast() {
        let (query, _) = sql(modifier(&[("releaseDate[lte]", "2020-01-01")]).filter().unwrap());
        assert_eq!(query, "SELECT * FROM \"movies\" WHERE \"release_date\" <= $1::timestamptz");
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = modifier(&[("duration[gte]", "long")]).filter().unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for duration: long");
        assert!(matches!(
            modifier(&[("duration[regex]", "1")]).filter(),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn default_sort_is_newest_first_with_tiebreak() {
        let (query, _) = sql(modifier(&[]).sort().unwrap());
        assert_eq!(query, "SELECT * FROM \"movies\" ORDER BY \"created_at\" DESC NULLS LAST, \"id\" ASC NULLS FIRST");
    }

    #[test]
    fn explicit_sort_with_descending_prefix() {
        let (query, _) = sql(modifier(&[("sort", "-price,name,bogus")]).sort().unwrap());
        assert_eq!(query, "SELECT * FROM \"movies\" ORDER BY \"price\" DESC NULLS LAST, \"name\" ASC NULLS FIRST, \"id\" ASC NULLS FIRST");
    }

    #[test]
    fn default_projection_hides_internal_fields() {
        let (query, _) = sql(modifier(&[]).limit_fields().unwrap());
        assert_eq!(
            query,
            "SELECT \"id\", \"name\", \"duration\", \"price\", \"genres\", \"release_date\" FROM \"movies\""
        );
    }

    #[test]
    fn explicit_projection_keeps_id() {
        let (query, _) = sql(modifier(&[("fields", "name,createdAt")]).limit_fields().unwrap());
        assert_eq!(query, "SELECT \"id\", \"name\", \"created_at\" FROM \"movies\"");
    }

    #[test]
    fn exclusion_projection() {
        let (query, _) = sql(modifier(&[("fields", "-genres,-price")]).limit_fields().unwrap());
        assert_eq!(query, "SELECT \"id\", \"name\", \"duration\", \"release_date\" FROM \"movies\"");
    }

    #[test]
    fn pagination_defaults_and_skip() {
        let (query, _) = sql(modifier(&[]).paginate().unwrap());
        assert!(query.ends_with("LIMIT 10 OFFSET 0"), "{}", query);

        let (query, _) = sql(modifier(&[("page", "3"), ("limit", "5")]).paginate().unwrap());
        assert!(query.ends_with("LIMIT 5 OFFSET 10"), "{}", query);
    }

    #[test]
    fn malformed_pagination_degrades_to_defaults() {
        let (query, _) = sql(modifier(&[("page", "zero"), ("limit", "-4")]).paginate().unwrap());
        assert!(query.ends_with("LIMIT 10 OFFSET 0"), "{}", query);

        let (query, _) = sql(modifier(&[("page", "0")]).paginate().unwrap());
        assert!(query.ends_with("LIMIT 10 OFFSET 0"), "{}", query);
    }

    #[test]
    fn full_chain_composes() {
        let filter = modifier(&[("price[gte]", "10"), ("sort", "-price"), ("fields", "name"), ("page", "2"), ("limit", "2")])
            .filter()
            .and_then(QueryModifier::sort)
            .and_then(QueryModifier::limit_fields)
            .and_then(QueryModifier::paginate)
            .unwrap()
            .into_filter();
        assert_eq!(
            filter.to_sql().unwrap().query,
            "SELECT \"id\", \"name\" FROM \"movies\" WHERE \"price\" >= $1 ORDER BY \"price\" DESC NULLS LAST, \"id\" ASC NULLS FIRST LIMIT 2 OFFSET 2"
        );
    }

    #[test]
    fn splits_bracket_operators() {
        assert_eq!(split_operator("duration[gte]"), ("duration", Some("gte")));
        assert_eq!(split_operator("name"), ("name", None));
    }
}
