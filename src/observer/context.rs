use std::time::{Duration, Instant};

use serde_json::Value;

use crate::filter::Filter;
use crate::observer::error::ObserverError;
use crate::observer::traits::Operation;

/// State that flows through the observer pipeline for one repository call
#[derive(Debug)]
pub struct ObserverContext<R> {
    pub operation: Operation,
    pub schema_name: &'static str,

    /// Incoming changes for CREATE and UPDATE
    pub record: Option<R>,

    /// Pending query; observers narrow it with scope predicates
    pub filter: Option<Filter>,

    /// Rows produced by the database step, as public documents
    pub result: Option<Vec<Value>>,

    pub start_time: Instant,
    pub errors: Vec<ObserverError>,
}

impl<R> ObserverContext<R> {
    fn empty(operation: Operation, schema_name: &'static str) -> Self {
        Self {
            operation,
            schema_name,
            record: None,
            filter: None,
            result: None,
            start_time: Instant::now(),
            errors: Vec::new(),
        }
    }

    pub fn create(schema_name: &'static str, record: R) -> Self {
        Self { record: Some(record), ..Self::empty(Operation::Create, schema_name) }
    }

    pub fn update(schema_name: &'static str, record: R, filter: Filter) -> Self {
        Self { record: Some(record), filter: Some(filter), ..Self::empty(Operation::Update, schema_name) }
    }

    pub fn delete(schema_name: &'static str, filter: Filter) -> Self {
        Self { filter: Some(filter), ..Self::empty(Operation::Delete, schema_name) }
    }

    pub fn select(schema_name: &'static str, filter: Filter) -> Self {
        Self { filter: Some(filter), ..Self::empty(Operation::Select, schema_name) }
    }

    pub fn aggregate(schema_name: &'static str, filter: Filter) -> Self {
        Self { filter: Some(filter), ..Self::empty(Operation::Aggregate, schema_name) }
    }

    pub fn record_mut(&mut self) -> Option<&mut R> {
        self.record.as_mut()
    }

    pub fn take_filter(&mut self) -> Option<Filter> {
        self.filter.take()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get total execution time
    pub fn execution_time(&self) -> Duration {
        self.start_time.elapsed()
    }
}
