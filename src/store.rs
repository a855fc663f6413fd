//! In-memory list state for one resource type.
//!
//! The store only changes through the request lifecycle transitions
//! (`begin_load`, `complete_load`, `fail_load`, `record_*`) and the plain
//! setters. None of these talk to the network; the list controller decides
//! when a reload follows a setter.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::resource::Resource;

pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl Pagination {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total: 0,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }
}

/// Filter key → value; `None` means the filter is not applied.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Filters(BTreeMap<String, Option<String>>);

impl Filters {
    /// All `keys` present and unset.
    pub fn with_keys(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| (k.to_string(), None)).collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Shallow merge: keys in `partial` overwrite, everything else is kept.
    pub fn merge<I, K>(&mut self, partial: I)
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        for (k, v) in partial {
            self.0.insert(k.into(), v);
        }
    }

    /// Resets every known key to `None`.
    pub fn clear(&mut self) {
        for v in self.0.values_mut() {
            *v = None;
        }
    }

    /// Applied filters only. Unset and blank values are skipped so the
    /// backend never sees them as literal filters.
    pub fn applied(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(k, v)| match v.as_deref() {
            Some(value) if !value.trim().is_empty() => Some((k.as_str(), value)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceStore<R> {
    records: Vec<R>,
    loading: bool,
    error: Option<String>,
    pagination: Pagination,
    filters: Filters,
    search: String,
    selected: Option<R>,
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(default_limit: u32) -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            error: None,
            pagination: Pagination::with_limit(default_limit),
            filters: Filters::with_keys(R::descriptor().filter_keys),
            search: String::new(),
            selected: None,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    /// Record last fetched by id, if any.
    pub fn selected(&self) -> Option<&R> {
        self.selected.as_ref()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// A refresh always replaces the list and pagination wholesale.
    pub fn complete_load(&mut self, records: Vec<R>, pagination: Pagination) {
        self.loading = false;
        self.records = records;
        self.pagination = pagination;
    }

    /// Keeps the stale list and pagination.
    pub fn fail_load(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    /// Appends without touching `pagination.total`; the follow-up load corrects it.
    pub fn record_created(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn record_updated(&mut self, record: R) {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => debug!(kind = %R::descriptor().kind, id = record.id(), "updated record not in current page"),
        }
    }

    pub fn record_deleted(&mut self, id: &str) {
        self.records.retain(|r| r.id() != id);
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn set_page(&mut self, page: u32) {
        self.pagination.page = page;
    }

    /// Clamped to at least 1.
    pub fn set_limit(&mut self, limit: u32) {
        self.pagination.limit = limit.max(1);
    }

    pub fn set_filters<I, K>(&mut self, partial: I)
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        self.filters.merge(partial);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_selected(&mut self, record: R) {
        self.selected = Some(record);
    }

    pub fn clear_selected(&mut self) {
        self.selected = None;
    }
}
