use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tecmetrics_console::controller::Phase;
use tecmetrics_console::gateway::{Gateway, GatewayError, ListPage, ListQuery};
use tecmetrics_console::model::{Branch, BranchCreate, BranchUpdate, DocumentType, DocumentTypeCreate, Employee};
use tecmetrics_console::{Descriptor, ListController, LoadOutcome, Modal, MutationOutcome, Pagination};
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone)]
enum Call {
    List(ListQuery),
    Get(String),
    Create(Value),
    Update(String, Value),
    Delete(String),
}

/// Scripted gateway. Responses are taken in call order, at call time; a held
/// search term blocks its list call until the paired `Notify` fires.
#[derive(Default)]
struct RecordingGateway {
    lists: Mutex<VecDeque<Result<ListPage<Value>, GatewayError>>>,
    writes: Mutex<VecDeque<Result<Value, GatewayError>>>,
    calls: Mutex<Vec<Call>>,
    hold: Mutex<Option<(String, Arc<Notify>)>>,
}

impl RecordingGateway {
    async fn push_list(&self, response: Result<ListPage<Value>, GatewayError>) {
        self.lists.lock().await.push_back(response);
    }

    async fn push_write(&self, response: Result<Value, GatewayError>) {
        self.writes.lock().await.push_back(response);
    }

    async fn hold_search(&self, term: &str, notify: Arc<Notify>) {
        *self.hold.lock().await = Some((term.to_string(), notify));
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn list_queries(&self) -> Vec<ListQuery> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::List(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    async fn pop_write(&self) -> Result<Value, GatewayError> {
        self.writes.lock().await.pop_front().unwrap_or(Ok(Value::Null))
    }
}

#[async_trait::async_trait]
impl Gateway for RecordingGateway {
    async fn list(&self, _descriptor: &Descriptor, query: &ListQuery) -> Result<ListPage<Value>, GatewayError> {
        self.calls.lock().await.push(Call::List(query.clone()));
        let response = self.lists.lock().await.pop_front().unwrap_or_else(|| {
            Ok(ListPage {
                records: vec![],
                pagination: Pagination {
                    page: query.page,
                    limit: query.limit,
                    total: 0,
                },
            })
        });
        let held = self
            .hold
            .lock()
            .await
            .as_ref()
            .filter(|(term, _)| *term == query.search)
            .map(|(_, notify)| notify.clone());
        if let Some(notify) = held {
            notify.notified().await;
        }
        response
    }

    async fn get(&self, _descriptor: &Descriptor, id: &str) -> Result<Value, GatewayError> {
        self.calls.lock().await.push(Call::Get(id.to_string()));
        self.pop_write().await
    }

    async fn create(&self, _descriptor: &Descriptor, body: Value) -> Result<Value, GatewayError> {
        self.calls.lock().await.push(Call::Create(body));
        self.pop_write().await
    }

    async fn update(&self, _descriptor: &Descriptor, id: &str, body: Value) -> Result<Value, GatewayError> {
        self.calls.lock().await.push(Call::Update(id.to_string(), body));
        self.pop_write().await
    }

    async fn delete(&self, _descriptor: &Descriptor, id: &str) -> Result<(), GatewayError> {
        self.calls.lock().await.push(Call::Delete(id.to_string()));
        self.pop_write().await.map(|_| ())
    }
}

fn branch_json(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "code": id.to_uppercase(),
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

fn branch(id: &str, name: &str) -> Branch {
    serde_json::from_value(branch_json(id, name)).unwrap()
}

fn page(records: Vec<Value>, page: u32, limit: u32, total: u64) -> ListPage<Value> {
    ListPage {
        records,
        pagination: Pagination { page, limit, total },
    }
}

fn server_error(message: Option<&str>) -> GatewayError {
    GatewayError::Status {
        status: 500,
        message: message.map(str::to_string),
    }
}

fn ids(records: &[Branch]) -> Vec<&str> {
    records.iter().map(|b| b.id.as_str()).collect()
}

fn setup() -> (Arc<RecordingGateway>, ListController<Branch>) {
    let gw = Arc::new(RecordingGateway::default());
    let ctl = ListController::<Branch>::new(gw.clone(), 10);
    (gw, ctl)
}

#[tokio::test]
async fn load_replaces_list_with_server_page() {
    let (gw, ctl) = setup();
    assert_eq!(ctl.phase().await, Phase::Idle);

    gw.push_list(Ok(page(
        vec![branch_json("b1", "Riyadh"), branch_json("b2", "Jeddah"), branch_json("b3", "Dammam")],
        2,
        10,
        23,
    )))
    .await;
    let outcome = ctl.load(Some(2), Some(10), Some("")).await;
    assert_eq!(outcome, LoadOutcome::Applied);

    let snap = ctl.snapshot().await;
    assert_eq!(ids(snap.store.records()), vec!["b1", "b2", "b3"]);
    assert_eq!(snap.store.pagination(), Pagination { page: 2, limit: 10, total: 23 });
    assert_eq!(snap.phase, Phase::Loaded);

    let queries = gw.list_queries().await;
    assert_eq!(queries.len(), 1);
    assert_eq!((queries[0].page, queries[0].limit, queries[0].search.as_str()), (2, 10, ""));
}

#[tokio::test]
async fn failed_load_keeps_stale_list() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh")], 1, 10, 1))).await;
    gw.push_list(Err(server_error(None))).await;

    ctl.load(None, None, None).await;
    let before = ctl.snapshot().await;

    let outcome = ctl.change_page(2).await;
    assert_eq!(outcome, LoadOutcome::Failed("Failed to fetch branches".into()));

    let after = ctl.snapshot().await;
    assert_eq!(after.store.records(), before.store.records());
    assert_eq!(after.store.pagination().total, 1);
    assert_eq!(after.store.error(), Some("Failed to fetch branches"));
    assert!(!after.store.loading());
    assert_eq!(after.phase, Phase::Error);

    ctl.clear_error().await;
    let dismissed = ctl.snapshot().await;
    assert_eq!(dismissed.store.error(), None);
    // Dismissing the message is not a load.
    assert_eq!(dismissed.phase, Phase::Error);
}

#[tokio::test]
async fn create_appends_closes_modal_and_reloads() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh")], 1, 10, 1))).await;
    ctl.search("Riy").await;

    gw.push_write(Ok(branch_json("b99", "Riyadh Branch"))).await;
    // The reconciling reload fails, exposing the transient append.
    gw.push_list(Err(server_error(Some("upstream timeout")))).await;

    ctl.open_create().await;
    let outcome = ctl
        .create(&BranchCreate {
            name: "Riyadh Branch".into(),
            code: "RYD".into(),
            ..Default::default()
        })
        .await;
    assert_eq!(outcome, MutationOutcome::Applied);

    let snap = ctl.snapshot().await;
    assert_eq!(ids(snap.store.records()), vec!["b1", "b99"]);
    assert_eq!(snap.store.pagination().total, 1);
    assert_eq!(snap.modal, Modal::Closed);

    let calls = gw.calls().await;
    match &calls[1] {
        Call::Create(body) => {
            assert_eq!(body["name"], "Riyadh Branch");
            assert_eq!(body["code"], "RYD");
            assert!(body.get("_id").is_none());
        }
        other => panic!("expected create, got {:?}", other),
    }
    let reload = gw.list_queries().await.pop().unwrap();
    assert_eq!((reload.page, reload.limit, reload.search.as_str()), (1, 10, "Riy"));
}

#[tokio::test]
async fn create_reload_supersedes_transient_append() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh")], 1, 10, 1))).await;
    ctl.load(None, None, None).await;

    gw.push_write(Ok(branch_json("b99", "Riyadh Branch"))).await;
    gw.push_list(Ok(page(
        vec![branch_json("b50", "Abha"), branch_json("b1", "Riyadh"), branch_json("b99", "Riyadh Branch")],
        1,
        10,
        3,
    )))
    .await;

    let outcome = ctl
        .create(&BranchCreate {
            name: "Riyadh Branch".into(),
            code: "RYD".into(),
            ..Default::default()
        })
        .await;
    assert!(outcome.is_applied());

    let snap = ctl.snapshot().await;
    assert_eq!(ids(snap.store.records()), vec!["b50", "b1", "b99"]);
    assert_eq!(snap.store.pagination().total, 3);
}

#[tokio::test]
async fn create_with_invalid_payload_never_reaches_gateway() {
    let (gw, ctl) = setup();
    ctl.open_create().await;
    let outcome = ctl.create(&BranchCreate::default()).await;
    match outcome {
        MutationOutcome::Invalid(errors) => {
            assert!(errors.has("name"));
            assert!(errors.has("code"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(gw.calls().await.is_empty());
    let snap = ctl.snapshot().await;
    assert!(snap.modal.is_create_open());
    assert!(snap.store.records().is_empty());
}

#[tokio::test]
async fn update_without_selection_is_a_no_op() {
    let (gw, ctl) = setup();
    let outcome = ctl
        .update(&BranchUpdate {
            name: Some("Jeddah".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(outcome, MutationOutcome::NoSelection);
    assert!(gw.calls().await.is_empty());
    assert_eq!(ctl.snapshot().await.phase, Phase::Idle);

    assert_eq!(ctl.remove().await, MutationOutcome::NoSelection);
    assert!(gw.calls().await.is_empty());
}

#[tokio::test]
async fn update_replaces_selected_record() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh"), branch_json("b2", "Jeddah")], 1, 10, 2)))
        .await;
    ctl.load(None, None, None).await;

    let mut updated = branch_json("b2", "Jeddah North");
    updated["updatedAt"] = json!("2024-03-01T00:00:00Z");
    gw.push_write(Ok(updated)).await;
    gw.push_list(Err(server_error(None))).await;

    ctl.open_edit(branch("b2", "Jeddah")).await;
    let outcome = ctl
        .update(&BranchUpdate {
            name: Some("Jeddah North".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(outcome, MutationOutcome::Applied);

    let snap = ctl.snapshot().await;
    assert_eq!(snap.store.records()[0], branch("b1", "Riyadh"));
    assert_eq!(snap.store.records()[1].name, "Jeddah North");
    assert_eq!(snap.store.records()[1].updated_at.as_deref(), Some("2024-03-01T00:00:00Z"));
    assert_eq!(snap.modal, Modal::Closed);

    let calls = gw.calls().await;
    match &calls[1] {
        Call::Update(id, body) => {
            assert_eq!(id, "b2");
            assert_eq!(body, &json!({ "name": "Jeddah North" }));
        }
        other => panic!("expected update, got {:?}", other),
    }
}

#[tokio::test]
async fn rejected_update_keeps_modal_open() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh")], 1, 10, 1))).await;
    ctl.load(None, None, None).await;

    gw.push_write(Err(GatewayError::Status {
        status: 409,
        message: Some("Branch code already exists".into()),
    }))
    .await;
    ctl.open_edit(branch("b1", "Riyadh")).await;
    let outcome = ctl
        .update(&BranchUpdate {
            code: Some("JED".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(outcome, MutationOutcome::Rejected("Branch code already exists".into()));

    let snap = ctl.snapshot().await;
    assert!(snap.modal.is_edit_open());
    assert_eq!(snap.modal.selected_record().map(|b| b.id.as_str()), Some("b1"));
    assert_eq!(snap.mutation_error.as_deref(), Some("Branch code already exists"));
    assert_eq!(snap.store.records(), &[branch("b1", "Riyadh")]);
    // No reload after a failed mutation.
    assert_eq!(gw.list_queries().await.len(), 1);
}

#[tokio::test]
async fn remove_deletes_selected_and_reloads() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh"), branch_json("b2", "Jeddah")], 1, 10, 2)))
        .await;
    ctl.load(None, None, None).await;

    gw.push_write(Ok(Value::Null)).await;
    gw.push_list(Err(server_error(None))).await;
    ctl.open_delete(branch("b1", "Riyadh")).await;
    assert_eq!(ctl.remove().await, MutationOutcome::Applied);

    let snap = ctl.snapshot().await;
    assert_eq!(ids(snap.store.records()), vec!["b2"]);
    assert_eq!(snap.modal, Modal::Closed);
    let calls = gw.calls().await;
    assert!(matches!(&calls[1], Call::Delete(id) if id == "b1"));
    assert!(matches!(&calls[2], Call::List(_)));
}

#[tokio::test]
async fn rejected_delete_keeps_confirmation_open() {
    let (gw, ctl) = setup();
    gw.push_write(Err(GatewayError::Unauthorized)).await;
    ctl.open_delete(branch("b1", "Riyadh")).await;
    let outcome = ctl.remove().await;
    assert_eq!(outcome, MutationOutcome::Rejected("Session expired, please log in again".into()));
    assert!(ctl.snapshot().await.modal.is_delete_open());
}

#[tokio::test]
async fn search_always_restarts_at_first_page() {
    let (gw, ctl) = setup();
    ctl.change_page(4).await;
    ctl.search("riyadh").await;

    let last = gw.list_queries().await.pop().unwrap();
    assert_eq!(last.page, 1);
    assert_eq!(last.search, "riyadh");
    assert_eq!(ctl.snapshot().await.store.search_term(), "riyadh");
}

#[tokio::test]
async fn change_limit_resets_page() {
    let (gw, ctl) = setup();
    ctl.change_page(3).await;
    assert_eq!(gw.list_queries().await.pop().unwrap().page, 3);

    ctl.change_limit(20).await;
    let last = gw.list_queries().await.pop().unwrap();
    assert_eq!((last.page, last.limit), (1, 20));

    ctl.change_limit(0).await;
    let last = gw.list_queries().await.pop().unwrap();
    assert_eq!(last.limit, 1);
    assert_eq!(ctl.snapshot().await.store.pagination().limit, 1);
}

#[tokio::test]
async fn out_of_range_page_is_passed_through() {
    let (gw, ctl) = setup();
    assert_eq!(ctl.change_page(99).await, LoadOutcome::Applied);
    assert_eq!(gw.list_queries().await[0].page, 99);
    assert!(ctl.snapshot().await.store.records().is_empty());
}

#[tokio::test]
async fn filters_reload_from_first_page_without_unset_keys() {
    let gw = Arc::new(RecordingGateway::default());
    let ctl = ListController::<Employee>::new(gw.clone(), 10);

    ctl.change_page(2).await;
    ctl.set_filter([("branch", Some("b1".to_string())), ("gender", None)]).await;

    let last = gw.list_queries().await.pop().unwrap();
    assert_eq!(last.page, 1);
    let applied: Vec<_> = last.filters.applied().collect();
    assert_eq!(applied, vec![("branch", "b1")]);
    let keys: Vec<String> = last.to_query_pairs().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["page", "limit", "search", "branch"]);

    ctl.clear_filters().await;
    let last = gw.list_queries().await.pop().unwrap();
    assert_eq!(last.filters.applied().count(), 0);
    assert_eq!(last.page, 1);
}

#[tokio::test]
async fn late_response_for_older_search_is_discarded() {
    let (gw, ctl) = setup();
    let release = Arc::new(Notify::new());
    gw.hold_search("a", release.clone()).await;
    gw.push_list(Ok(page(vec![branch_json("b-a", "Abha")], 1, 10, 1))).await;
    gw.push_list(Ok(page(vec![branch_json("b-ab", "Abqaiq")], 1, 10, 1))).await;

    let (older, newer) = tokio::join!(ctl.search("a"), async {
        let outcome = ctl.search("ab").await;
        release.notify_one();
        outcome
    });

    assert_eq!(newer, LoadOutcome::Applied);
    assert_eq!(older, LoadOutcome::Superseded);
    let snap = ctl.snapshot().await;
    assert_eq!(ids(snap.store.records()), vec!["b-ab"]);
    assert_eq!(snap.store.search_term(), "ab");
    assert!(!snap.store.loading());
}

#[tokio::test]
async fn identical_pending_load_is_coalesced() {
    let (gw, ctl) = setup();
    let release = Arc::new(Notify::new());
    gw.hold_search("", release.clone()).await;
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh")], 1, 10, 1))).await;

    let (first, second) = tokio::join!(ctl.load(None, None, None), async {
        let outcome = ctl.load(None, None, None).await;
        release.notify_one();
        outcome
    });

    assert_eq!(first, LoadOutcome::Applied);
    assert_eq!(second, LoadOutcome::Coalesced);
    assert_eq!(gw.list_queries().await.len(), 1);
    assert_eq!(ids(ctl.snapshot().await.store.records()), vec!["b1"]);
}

#[tokio::test]
async fn close_all_clears_every_modal_and_selection() {
    let (_gw, ctl) = setup();
    ctl.open_edit(branch("b1", "Riyadh")).await;
    let snap = ctl.snapshot().await;
    assert!(snap.modal.is_edit_open());
    assert!(snap.modal.selected_record().is_some());

    ctl.open_delete(branch("b2", "Jeddah")).await;
    let snap = ctl.snapshot().await;
    assert!(!snap.modal.is_edit_open());
    assert_eq!(snap.modal.selected_record().map(|b| b.id.as_str()), Some("b2"));

    ctl.close_all().await;
    let snap = ctl.snapshot().await;
    assert!(!snap.modal.is_create_open() && !snap.modal.is_edit_open() && !snap.modal.is_delete_open());
    assert!(snap.modal.selected_record().is_none());

    ctl.open_create().await;
    assert!(ctl.snapshot().await.modal.selected_record().is_none());
}

#[tokio::test]
async fn fetch_by_id_fills_selected_slot() {
    let (gw, ctl) = setup();
    gw.push_write(Ok(branch_json("b7", "Tabuk"))).await;
    let record = ctl.fetch_by_id("b7").await.unwrap();
    assert_eq!(record.name, "Tabuk");
    assert_eq!(ctl.snapshot().await.store.selected().map(|b| b.id.as_str()), Some("b7"));

    gw.push_write(Err(server_error(None))).await;
    let err = ctl.fetch_by_id("b8").await.unwrap_err();
    assert_eq!(err, "Failed to fetch branch b8");

    ctl.clear_selected().await;
    assert!(ctl.snapshot().await.store.selected().is_none());
}

#[tokio::test]
async fn lookup_all_leaves_store_untouched() {
    let gw = Arc::new(RecordingGateway::default());
    let ctl = ListController::<Branch>::new(gw.clone(), 10).with_lookup_limit(500);
    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh"), branch_json("b2", "Jeddah")], 1, 500, 2)))
        .await;

    let options = ctl.lookup_all().await.unwrap();
    assert_eq!(ids(&options), vec!["b1", "b2"]);
    let query = &gw.list_queries().await[0];
    assert_eq!((query.page, query.limit), (1, 500));

    let snap = ctl.snapshot().await;
    assert!(snap.store.records().is_empty());
    assert_eq!(snap.phase, Phase::Idle);
}

#[tokio::test]
async fn undecodable_record_fails_the_load() {
    let (gw, ctl) = setup();
    gw.push_list(Ok(page(vec![json!({ "_id": "b1" })], 1, 10, 1))).await;
    let outcome = ctl.load(None, None, None).await;
    assert_eq!(outcome, LoadOutcome::Failed("Failed to fetch branches".into()));
}

fn document_type_json(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "code": name.to_uppercase(),
        "branch": "b1",
        "department": "d1",
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

fn document_type_payload() -> DocumentTypeCreate {
    DocumentTypeCreate {
        branch: "b1".into(),
        department: "d1".into(),
        document_types: vec!["Passport".into(), "Visa".into()],
    }
}

#[tokio::test]
async fn document_type_create_appends_every_returned_record() {
    let gw = Arc::new(RecordingGateway::default());
    let ctl = ListController::<DocumentType>::new(gw.clone(), 10);

    gw.push_write(Ok(json!([
        document_type_json("dt1", "Passport"),
        document_type_json("dt2", "Visa")
    ])))
    .await;
    gw.push_list(Err(server_error(None))).await;

    ctl.open_create().await;
    let outcome = ctl.create(&document_type_payload()).await;
    assert_eq!(outcome, MutationOutcome::Applied);

    let snap = ctl.snapshot().await;
    let ids: Vec<_> = snap.store.records().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["dt1", "dt2"]);
    assert_eq!(snap.modal, Modal::Closed);
    assert_eq!(gw.list_queries().await.len(), 1);

    match &gw.calls().await[0] {
        Call::Create(body) => assert_eq!(body["documentTypes"], json!(["Passport", "Visa"])),
        other => panic!("expected create, got {:?}", other),
    }
}

#[tokio::test]
async fn rejected_create_names_the_resource_in_words() {
    let gw = Arc::new(RecordingGateway::default());
    let ctl = ListController::<DocumentType>::new(gw.clone(), 10);
    gw.push_write(Err(server_error(None))).await;

    ctl.open_create().await;
    let outcome = ctl.create(&document_type_payload()).await;
    assert_eq!(outcome, MutationOutcome::Rejected("Failed to create document type".into()));
    assert!(ctl.snapshot().await.modal.is_create_open());
}

#[tokio::test]
async fn unauthorized_response_flags_expired_session() {
    let (gw, ctl) = setup();
    gw.push_list(Err(GatewayError::Unauthorized)).await;
    let outcome = ctl.load(None, None, None).await;
    assert_eq!(outcome, LoadOutcome::Failed("Session expired, please log in again".into()));
    assert!(ctl.session_expired().await);
    assert!(ctl.snapshot().await.session_expired);

    gw.push_list(Ok(page(vec![branch_json("b1", "Riyadh")], 1, 10, 1))).await;
    ctl.load(None, None, None).await;
    assert!(!ctl.session_expired().await);
}
