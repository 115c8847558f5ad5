//! Header accumulation across records and runs

use super::flatten::flatten;
use serde_json::Value;
use std::collections::BTreeSet;

/// Running union of the fields seen in a set of records
#[derive(Debug, Clone)]
pub struct HeaderAccumulator {
    fields: BTreeSet<String>,
    primary_key: Vec<String>,
    flatten: bool,
}

impl HeaderAccumulator {
    /// Create an accumulator for a table keyed by `primary_key`
    pub fn new<I, S>(primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: BTreeSet::new(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            flatten: true,
        }
    }

    /// Only look at top-level keys
    #[must_use]
    pub fn without_flattening(mut self) -> Self {
        self.flatten = false;
        self
    }

    /// Fold one record's fields in
    pub fn observe(&mut self, record: &Value) {
        match record {
            Value::Object(map) if !self.flatten => {
                self.fields.extend(map.keys().cloned());
            }
            _ => {
                self.fields.extend(flatten(record).into_iter().map(|(k, _)| k));
            }
        }
    }

    /// Fold a page of records in
    pub fn observe_all(&mut self, records: &[Value]) {
        for record in records {
            self.observe(record);
        }
    }

    /// Seed with a header persisted by an earlier run
    pub fn extend_from<I, S>(&mut self, prior: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(prior.into_iter().map(Into::into));
    }

    /// Fields seen so far
    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    /// Check whether nothing has been observed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Header in output order
    pub fn header(&self) -> Vec<String> {
        order_header(self.fields.iter().cloned(), &self.primary_key)
    }

    /// Consume into the raw field set
    pub fn into_fields(self) -> BTreeSet<String> {
        self.fields
    }
}

/// Union of an observed header and a prior one, in output order
pub fn merge_header<A, B>(observed: A, prior: B, primary_key: &[String]) -> Vec<String>
where
    A: IntoIterator<Item = String>,
    B: IntoIterator<Item = String>,
{
    order_header(observed.into_iter().chain(prior), primary_key)
}

/// Deduplicate fields: primary key columns first (when present), the rest sorted
pub fn order_header<I>(fields: I, primary_key: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut rest: BTreeSet<String> = fields.into_iter().collect();
    let mut header = Vec::with_capacity(rest.len());

    for key in primary_key {
        if rest.remove(key) {
            header.push(key.clone());
        }
    }
    header.extend(rest);

    header
}
