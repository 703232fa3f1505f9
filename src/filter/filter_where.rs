use std::collections::HashMap;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Column name -> Postgres type used to cast bound parameters (`$1::timestamptz`).
pub type ColumnCasts = HashMap<String, &'static str>;

pub struct FilterWhere<'a> {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
    casts: &'a ColumnCasts,
}

impl<'a> FilterWhere<'a> {
    pub fn new(starting_param_index: usize, casts: &'a ColumnCasts) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
            casts,
        }
    }

    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
        casts: &ColumnCasts,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = FilterWhere::new(starting_param_index, casts);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            if let Some(sql) = self.build_sql_condition(condition)? {
                sql_conditions.push(sql);
            }
        }
        let where_clause = sql_conditions.join(" AND ");
        Ok((where_clause, self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidWhereClause(format!("{} requires array", op)))?;
                let mut sql_parts = Vec::new();
                for v in arr {
                    let (sql, params) = FilterWhere::generate(v, self.param_index, self.casts)?;
                    if sql.is_empty() {
                        continue;
                    }
                    self.param_index += params.len();
                    self.param_values.extend(params);
                    sql_parts.push(format!("({})", sql));
                }
                if sql_parts.is_empty() {
                    return Ok(());
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                // Stored as a pre-rendered condition; params are already accounted for
                self.conditions.push(FilterWhereInfo {
                    column: format!("({})", sql_parts.join(joiner)),
                    operator: FilterOp::Text,
                    data: Value::Null,
                });
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$any" => FilterOp::Any,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<Option<String>, FilterError> {
        if condition.operator == FilterOp::Text {
            return Ok(Some(condition.column.clone()));
        }

        Self::validate_column(&condition.column)?;
        let quoted_column = format!("\"{}\"", condition.column);
        let column = condition.column.as_str();
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() { Ok(Some(format!("{} IS NULL", quoted_column))) }
                else { Ok(Some(format!("{} = {}", quoted_column, self.param(column, condition.data.clone())))) }
            }
            FilterOp::Ne => {
                if condition.data.is_null() { Ok(Some(format!("{} IS NOT NULL", quoted_column))) }
                else { Ok(Some(format!("{} <> {}", quoted_column, self.param(column, condition.data.clone())))) }
            }
            FilterOp::Gt => Ok(Some(format!("{} > {}", quoted_column, self.param(column, condition.data.clone())))),
            FilterOp::Gte => Ok(Some(format!("{} >= {}", quoted_column, self.param(column, condition.data.clone())))),
            FilterOp::Lt => Ok(Some(format!("{} < {}", quoted_column, self.param(column, condition.data.clone())))),
            FilterOp::Lte => Ok(Some(format!("{} <= {}", quoted_column, self.param(column, condition.data.clone())))),
            FilterOp::In => {
                if let Value::Array(values) = &condition.data {
                    if values.is_empty() { return Ok(Some("1=0".to_string())); }
                    let params: Vec<String> = values.iter().map(|v| self.param(column, v.clone())).collect();
                    Ok(Some(format!("{} IN ({})", quoted_column, params.join(", "))))
                } else {
                    Ok(Some(format!("{} = {}", quoted_column, self.param(column, condition.data.clone()))))
                }
            }
            FilterOp::Any => {
                // Array overlap; parameters bind as plain text elements
                let values = match &condition.data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() { return Ok(Some("1=0".to_string())); }
                let params: Vec<String> = values.into_iter().map(|v| self.param("", v)).collect();
                Ok(Some(format!("{} && ARRAY[{}]::text[]", quoted_column, params.join(", "))))
            }
            _ => Ok(None),
        }
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        let valid = column.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false)
            && column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidColumn(column.to_string()))
        }
    }

    fn param(&mut self, column: &str, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        match self.casts.get(column) {
            Some(cast) => format!("${}::{}", self.param_index, cast),
            None => format!("${}", self.param_index),
        }
    }
}
