//! List controller: the one object a presentation layer talks to for a
//! resource. It owns the resource store and the create/edit/delete modal
//! state, and reloads after every change that affects which records are
//! visible.
//!
//! Loads are tagged with a generation number when issued. A response is only
//! applied while its generation is still the newest, so the visible list
//! always follows the most recently issued intent even when responses arrive
//! out of order. Mutations are pessimistic: the list changes only after the
//! backend confirms.
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::gateway::{Gateway, GatewayError, ListQuery};
use crate::resource::{Descriptor, Resource};
use crate::store::ResourceStore;
use crate::validate::{Validate, ValidationErrors};

/// Modal sub-state. Editing and deleting always carry the selected record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "modal", content = "record", rename_all = "snake_case")]
pub enum Modal<R> {
    Closed,
    Creating,
    Editing(R),
    Deleting(R),
}

impl<R> Modal<R> {
    pub fn is_create_open(&self) -> bool {
        matches!(self, Modal::Creating)
    }

    pub fn is_edit_open(&self) -> bool {
        matches!(self, Modal::Editing(_))
    }

    pub fn is_delete_open(&self) -> bool {
        matches!(self, Modal::Deleting(_))
    }

    pub fn selected_record(&self) -> Option<&R> {
        match self {
            Modal::Editing(r) | Modal::Deleting(r) => Some(r),
            Modal::Closed | Modal::Creating => None,
        }
    }
}

/// Load lifecycle of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued before this one resolved; its response was dropped.
    Superseded,
    /// An identical load was already pending; no request was sent.
    Coalesced,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// Update or delete without a selected record; nothing was sent.
    NoSelection,
    /// Client-side validation failed; nothing was sent.
    Invalid(ValidationErrors),
    /// The backend refused; the modal stays open.
    Rejected(String),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }
}

/// Point-in-time copy of everything a view renders.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<R> {
    pub store: ResourceStore<R>,
    pub modal: Modal<R>,
    pub phase: Phase,
    pub mutation_error: Option<String>,
    /// The last request was refused with 401; the host should send the user to login.
    pub session_expired: bool,
}

struct State<R> {
    store: ResourceStore<R>,
    modal: Modal<R>,
    /// Generation of the most recently issued load.
    issued: u64,
    /// Query of the newest load while it is still outstanding.
    pending: Option<ListQuery>,
    /// Only `issue_load` moves this.
    phase: Phase,
    mutation_error: Option<String>,
    session_expired: bool,
}

impl<R: Resource> State<R> {
    fn note_result(&mut self, err: Option<&GatewayError>) {
        self.session_expired = err.is_some_and(GatewayError::is_unauthorized);
    }

    fn close_modals(&mut self) {
        self.modal = Modal::Closed;
        self.mutation_error = None;
    }
}

pub struct ListController<R: Resource> {
    gateway: Arc<dyn Gateway>,
    lookup_limit: u32,
    state: Mutex<State<R>>,
}

fn descriptor<R: Resource>() -> &'static Descriptor {
    R::descriptor()
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(format!("invalid record: {}", e)))
}

/// A create answers with the new record, or with one record per submitted
/// name for resources that register several at once.
fn decode_created<R: DeserializeOwned>(value: Value) -> Result<Vec<R>, GatewayError> {
    match value {
        Value::Array(items) => items.into_iter().map(decode::<R>).collect(),
        other => decode::<R>(other).map(|record| vec![record]),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::Decode(format!("unencodable payload: {}", e)))
}

impl<R: Resource> ListController<R> {
    pub fn new(gateway: Arc<dyn Gateway>, default_limit: u32) -> Self {
        Self {
            gateway,
            lookup_limit: 1000,
            state: Mutex::new(State {
                store: ResourceStore::new(default_limit),
                modal: Modal::Closed,
                issued: 0,
                pending: None,
                phase: Phase::Idle,
                mutation_error: None,
                session_expired: false,
            }),
        }
    }

    pub fn with_lookup_limit(mut self, limit: u32) -> Self {
        self.lookup_limit = limit.max(1);
        self
    }

    /// Initial filters, applied before the first load.
    pub fn with_filters<I, K>(mut self, partial: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        self.state.get_mut().store.set_filters(partial);
        self
    }

    pub async fn snapshot(&self) -> Snapshot<R> {
        let state = self.state.lock().await;
        Snapshot {
            store: state.store.clone(),
            modal: state.modal.clone(),
            phase: state.phase,
            mutation_error: state.mutation_error.clone(),
            session_expired: state.session_expired,
        }
    }

    pub async fn session_expired(&self) -> bool {
        self.state.lock().await.session_expired
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Load a page. Missing arguments fall back to the store; filters always
    /// come from the store.
    pub async fn load(&self, page: Option<u32>, limit: Option<u32>, search: Option<&str>) -> LoadOutcome {
        let query = {
            let state = self.state.lock().await;
            let current = state.store.pagination();
            ListQuery {
                page: page.unwrap_or(current.page),
                limit: limit.unwrap_or(current.limit),
                search: search.map_or_else(|| state.store.search_term().to_string(), str::to_string),
                filters: state.store.filters().clone(),
            }
        };
        self.issue_load(query, true).await
    }

    /// Reload with the current store state, never coalescing: the pending
    /// request (if any) was issued before the change being reconciled.
    async fn reload(&self) -> LoadOutcome {
        let query = {
            let state = self.state.lock().await;
            let current = state.store.pagination();
            ListQuery {
                page: current.page,
                limit: current.limit,
                search: state.store.search_term().to_string(),
                filters: state.store.filters().clone(),
            }
        };
        self.issue_load(query, false).await
    }

    #[instrument(skip_all, fields(resource = %descriptor::<R>().kind, page = query.page, limit = query.limit))]
    async fn issue_load(&self, query: ListQuery, coalesce: bool) -> LoadOutcome {
        let d = descriptor::<R>();
        let generation = {
            let mut state = self.state.lock().await;
            if coalesce && state.pending.as_ref() == Some(&query) {
                debug!("identical load already pending");
                return LoadOutcome::Coalesced;
            }
            state.issued += 1;
            state.pending = Some(query.clone());
            state.store.begin_load();
            state.phase = Phase::Loading;
            state.issued
        };

        let result = match self.gateway.list(d, &query).await {
            Ok(page) => page.decode::<R>(),
            Err(err) => Err(err),
        };

        let mut state = self.state.lock().await;
        if generation != state.issued {
            debug!(generation, latest = state.issued, "discarding stale list response");
            return LoadOutcome::Superseded;
        }
        state.pending = None;
        state.note_result(result.as_ref().err());
        match result {
            Ok(page) => {
                debug!(records = page.records.len(), total = page.pagination.total, "list loaded");
                state.store.complete_load(page.records, page.pagination);
                state.phase = Phase::Loaded;
                LoadOutcome::Applied
            }
            Err(err) => {
                let message = err.user_message(&format!("Failed to fetch {}", d.label));
                warn!(?err, "list load failed");
                state.store.fail_load(message.clone());
                state.phase = Phase::Error;
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Validate and create. On success the record is appended, modals close
    /// and the list reloads; on failure the modal stays as it was.
    pub async fn create(&self, data: &R::Create) -> MutationOutcome {
        let d = descriptor::<R>();
        if let Err(errors) = data.validate() {
            debug!(resource = %d.kind, %errors, "create payload failed validation");
            return MutationOutcome::Invalid(errors);
        }
        let result = match encode(data) {
            Ok(body) => match self.gateway.create(d, body).await {
                Ok(value) => decode_created::<R>(value),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        match result {
            Ok(records) => {
                info!(resource = %d.kind, count = records.len(), "records created");
                {
                    let mut state = self.state.lock().await;
                    for record in records {
                        state.store.record_created(record);
                    }
                    state.note_result(None);
                    state.close_modals();
                }
                self.reload().await;
                MutationOutcome::Applied
            }
            Err(err) => self.reject(err, &format!("Failed to create {}", d.noun)).await,
        }
    }

    /// Update the selected record with a partial body.
    pub async fn update(&self, data: &R::Update) -> MutationOutcome {
        let d = descriptor::<R>();
        let Some(id) = self.selected_id().await else {
            return MutationOutcome::NoSelection;
        };
        let result = match encode(data) {
            Ok(body) => match self.gateway.update(d, &id, body).await {
                Ok(value) => decode::<R>(value),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        match result {
            Ok(record) => {
                info!(resource = %d.kind, id = record.id(), "record updated");
                {
                    let mut state = self.state.lock().await;
                    state.store.record_updated(record);
                    state.note_result(None);
                    state.close_modals();
                }
                self.reload().await;
                MutationOutcome::Applied
            }
            Err(err) => self.reject(err, &format!("Failed to update {}", d.noun)).await,
        }
    }

    /// Delete the selected record.
    pub async fn remove(&self) -> MutationOutcome {
        let d = descriptor::<R>();
        let Some(id) = self.selected_id().await else {
            return MutationOutcome::NoSelection;
        };
        match self.gateway.delete(d, &id).await {
            Ok(()) => {
                info!(resource = %d.kind, id = %id, "record deleted");
                {
                    let mut state = self.state.lock().await;
                    state.store.record_deleted(&id);
                    state.note_result(None);
                    state.close_modals();
                }
                self.reload().await;
                MutationOutcome::Applied
            }
            Err(err) => self.reject(err, &format!("Failed to delete {}", d.noun)).await,
        }
    }

    async fn selected_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.modal.selected_record().map(|r| r.id().to_string())
    }

    async fn reject(&self, err: GatewayError, fallback: &str) -> MutationOutcome {
        let message = err.user_message(fallback);
        warn!(?err, resource = %descriptor::<R>().kind, "mutation failed");
        let mut state = self.state.lock().await;
        state.note_result(Some(&err));
        state.mutation_error = Some(message.clone());
        MutationOutcome::Rejected(message)
    }

    /// New search term; always restarts at page 1.
    pub async fn search(&self, term: &str) -> LoadOutcome {
        self.state.lock().await.store.set_search(term);
        self.load(Some(1), None, Some(term)).await
    }

    /// No clamping; an out-of-range page yields whatever slice the backend returns.
    pub async fn change_page(&self, page: u32) -> LoadOutcome {
        self.state.lock().await.store.set_page(page);
        self.load(Some(page), None, None).await
    }

    /// Zero is clamped to 1.
    pub async fn change_limit(&self, limit: u32) -> LoadOutcome {
        let limit = limit.max(1);
        self.state.lock().await.store.set_limit(limit);
        self.load(Some(1), Some(limit), None).await
    }

    pub async fn set_filter<I, K>(&self, partial: I) -> LoadOutcome
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        self.state.lock().await.store.set_filters(partial);
        self.load(Some(1), None, None).await
    }

    pub async fn clear_filters(&self) -> LoadOutcome {
        self.state.lock().await.store.clear_filters();
        self.load(Some(1), None, None).await
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.store.clear_error();
    }

    pub async fn open_create(&self) {
        let mut state = self.state.lock().await;
        state.modal = Modal::Creating;
        state.mutation_error = None;
    }

    pub async fn open_edit(&self, record: R) {
        let mut state = self.state.lock().await;
        state.modal = Modal::Editing(record);
        state.mutation_error = None;
    }

    pub async fn open_delete(&self, record: R) {
        let mut state = self.state.lock().await;
        state.modal = Modal::Deleting(record);
        state.mutation_error = None;
    }

    pub async fn close_all(&self) {
        self.state.lock().await.close_modals();
    }

    /// Fetch one record by id into the store's `selected` slot.
    pub async fn fetch_by_id(&self, id: &str) -> Result<R, String> {
        let d = descriptor::<R>();
        let result = match self.gateway.get(d, id).await {
            Ok(value) => decode::<R>(value),
            Err(err) => Err(err),
        };
        match result {
            Ok(record) => {
                let mut state = self.state.lock().await;
                state.note_result(None);
                state.store.set_selected(record.clone());
                Ok(record)
            }
            Err(err) => {
                warn!(?err, resource = %d.kind, id, "fetch by id failed");
                self.state.lock().await.note_result(Some(&err));
                Err(err.user_message(&format!("Failed to fetch {} {}", d.noun, id)))
            }
        }
    }

    pub async fn clear_selected(&self) {
        self.state.lock().await.store.clear_selected();
    }

    /// Every record of the resource (up to the lookup limit) for dropdown
    /// options. Leaves the store untouched.
    pub async fn lookup_all(&self) -> Result<Vec<R>, String> {
        let d = descriptor::<R>();
        let query = ListQuery {
            page: 1,
            limit: self.lookup_limit,
            search: String::new(),
            filters: Default::default(),
        };
        let result = match self.gateway.list(d, &query).await {
            Ok(page) => page.decode::<R>(),
            Err(err) => Err(err),
        };
        match result {
            Ok(page) => Ok(page.records),
            Err(err) => {
                warn!(?err, resource = %d.kind, "lookup failed");
                self.state.lock().await.note_result(Some(&err));
                Err(err.user_message(&format!("Failed to fetch {}", d.label)))
            }
        }
    }
}
