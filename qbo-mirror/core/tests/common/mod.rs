//! Shared fixtures for the engine integration tests.
//!
//! `MockQbo` serves the accounting API query endpoint from an axum router bound
//! to an ephemeral port. `FakeWarehouse` interprets the loader's SQL against
//! tables held in memory and performs COPY by decoding the Parquet object from
//! the same object store the engine writes to.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use datafusion::arrow::array::Array;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use object_store::{memory::InMemory, ObjectStore};
use qbo_mirror_core::{
    columnar::object_path,
    loader::{StatementError, Warehouse},
    prelude::*,
};
use qbo_mirror_schemas::{ColumnMapping, Location, WarehouseColumn, WarehouseSpec};
use regex::Regex;
use serde_json::{json, Value};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

pub const REALM: &str = "9130347596317426";
pub const TOKEN: &str = "eyJlbmMiOiJBMTI4Q0JDLUhTMjU2";
pub const IAM_ROLE: &str = "arn:aws:iam::123456789012:role/redshift-copy";

// ------------------------------------------------------------------------------------------------
// Accounting API

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub realm: String,
    pub query: String,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct QboInner {
    records: HashMap<String, Vec<Value>>,
    failure: Option<(usize, u16)>,
    requests: Vec<RecordedQuery>,
}

#[derive(Clone, Default)]
struct QboState(Arc<Mutex<QboInner>>);

pub struct MockQbo {
    pub base_url: String,
    state: QboState,
}

impl MockQbo {
    pub async fn start() -> Self {
        let state = QboState::default();
        let app = Router::new()
            .route("/v3/company/{realm}/query", get(query))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn set_records(&self, entity: &str, records: Vec<Value>) {
        self.state
            .0
            .lock()
            .unwrap()
            .records
            .insert(entity.to_string(), records);
    }

    /// Answer the page starting at `position` with `status`
    pub fn fail_at(&self, position: usize, status: u16) {
        self.state.0.lock().unwrap().failure = Some((position, status));
    }

    pub fn clear_failure(&self) {
        self.state.0.lock().unwrap().failure = None;
    }

    pub fn requests(&self) -> Vec<RecordedQuery> {
        self.state.0.lock().unwrap().requests.clone()
    }
}

fn query_regex() -> Regex {
    Regex::new(r"^SELECT \* FROM (\w+) STARTPOSITION (\d+)(?: MAXRESULTS (\d+))?$").unwrap()
}

async fn query(
    State(state): State<QboState>,
    Path(realm): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let statement = params.get("query").cloned().unwrap_or_default();
    let mut inner = state.0.lock().unwrap();

    inner.requests.push(RecordedQuery {
        realm,
        query: statement.clone(),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    });

    let Some(captures) = query_regex().captures(&statement) else {
        return (StatusCode::BAD_REQUEST, format!("unparsable query: {statement}")).into_response();
    };
    let entity = captures[1].to_string();
    let start_position: usize = captures[2].parse().unwrap();
    let max_results: usize = captures
        .get(3)
        .map(|m| m.as_str().parse().unwrap())
        .unwrap_or(100);

    if let Some((position, status)) = inner.failure {
        if position == start_position {
            let status = StatusCode::from_u16(status).unwrap();
            let body = json!({
                "Fault": {
                    "Error": [{ "Message": "message=AuthenticationFailed; errorCode=003200; statusCode=401" }],
                    "type": "AUTHENTICATION"
                }
            });
            return (status, Json(body)).into_response();
        }
    }

    let records = inner.records.get(&entity).cloned().unwrap_or_default();
    let page = records
        .into_iter()
        .skip(start_position - 1)
        .take(max_results)
        .collect::<Vec<_>>();

    // the API leaves the entity key out of an empty page
    let body = if page.is_empty() {
        json!({ "QueryResponse": {}, "time": "2024-05-01T10:00:00.000-07:00" })
    } else {
        json!({
            "QueryResponse": {
                entity: page,
                "startPosition": start_position,
                "maxResults": page.len(),
            },
            "time": "2024-05-01T10:00:00.000-07:00"
        })
    };

    (StatusCode::OK, Json(body)).into_response()
}

// ------------------------------------------------------------------------------------------------
// Warehouse

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Vec<Option<String>> {
        let index = self
            .columns
            .iter()
            .position(|column| column == name)
            .unwrap_or_else(|| panic!("no column {name} in {:?}", self.columns));
        self.rows.iter().map(|row| row[index].clone()).collect()
    }
}

#[derive(Default)]
struct WarehouseInner {
    tables: BTreeMap<String, Table>,
    log: Vec<String>,
    fail_on: Option<String>,
}

/// Redshift stand-in: autocommit statements, transactions with rollback and,
/// when `truncate_commits` is set, the implicit commit of TRUNCATE
pub struct FakeWarehouse {
    store: Arc<dyn ObjectStore>,
    truncate_commits: bool,
    inner: Mutex<WarehouseInner>,
}

impl FakeWarehouse {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            truncate_commits: false,
            inner: Mutex::default(),
        }
    }

    pub fn with_implicit_truncate_commit(mut self) -> Self {
        self.truncate_commits = true;
        self
    }

    pub fn create_table(&self, name: &str, columns: &[&str]) {
        self.inner.lock().unwrap().tables.insert(
            name.to_ascii_lowercase(),
            Table {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: vec![],
            },
        );
    }

    pub fn table(&self, name: &str) -> Option<Table> {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn insert_rows(&self, name: &str, rows: Vec<Vec<Option<String>>>) {
        let mut inner = self.inner.lock().unwrap();
        let table = inner.tables.get_mut(&name.to_ascii_lowercase()).unwrap();
        table.rows.extend(rows);
    }

    /// Fail every statement starting with `prefix` until cleared
    pub fn fail_on(&self, prefix: &str) {
        self.inner.lock().unwrap().fail_on = Some(prefix.to_string());
    }

    pub fn clear_failure(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    /// Every statement received, probes included
    pub fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.inner.lock().unwrap().log.clear();
    }

    fn check_injected(inner: &WarehouseInner, sql: &str) -> Result<(), String> {
        match &inner.fail_on {
            Some(prefix) if sql.starts_with(prefix.as_str()) => {
                Err(format!("injected failure: {prefix}"))
            }
            _ => Ok(()),
        }
    }

    async fn read_parquet(&self, url: &str) -> Result<Vec<Vec<Option<String>>>, String> {
        let location = Location::try_from(url)?;
        let path = object_path(&location).map_err(|e| e.to_string())?;
        let bytes = self
            .store
            .get(&path)
            .await
            .map_err(|e| format!("S3ServiceException: {e}"))?
            .bytes()
            .await
            .map_err(|e| e.to_string())?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .and_then(|builder| builder.build())
            .map_err(|e| e.to_string())?;

        let mut rows = vec![];
        for batch in reader {
            let batch = batch.map_err(|e| e.to_string())?;
            for row in 0..batch.num_rows() {
                let values = batch
                    .columns()
                    .iter()
                    .map(|array| {
                        if array.is_null(row) {
                            Ok(None)
                        } else {
                            array_value_to_string(array, row)
                                .map(Some)
                                .map_err(|e| e.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                rows.push(values);
            }
        }

        Ok(rows)
    }
}

/// Split on commas outside of parentheses and quotes
fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = vec![];
    let mut depth = 0;
    let mut quoted = false;
    let mut current = String::new();

    for c in list.chars() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Column a select expression reads, `TO_DATE(due_date, 'YYYY-MM-DD') AS due_date` reads `due_date`
fn source_column(expression: &str) -> String {
    let regex = Regex::new(r"^(?:\w+\()?(\w+)").unwrap();
    regex
        .captures(expression)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

fn apply(
    tables: &mut BTreeMap<String, Table>,
    sql: &str,
    copied: Option<Vec<Vec<Option<String>>>>,
) -> Result<(), String> {
    let create = Regex::new(r"^CREATE TABLE (\S+) \((.*)\)$").unwrap();
    let copy = Regex::new(r"^COPY (\S+) FROM '([^']+)' IAM_ROLE '([^']+)' FORMAT AS PARQUET$").unwrap();
    let truncate = Regex::new(r"^TRUNCATE TABLE (\S+)$").unwrap();
    let delete = Regex::new(r"^DELETE FROM (\S+)$").unwrap();
    let insert = Regex::new(r"^INSERT INTO (\S+) SELECT (.*) FROM (\S+)$").unwrap();
    let drop = Regex::new(r"^DROP TABLE (IF EXISTS )?(\S+)$").unwrap();

    let missing = |table: &str| format!("relation \"{table}\" does not exist");

    if let Some(c) = create.captures(sql) {
        let name = c[1].to_ascii_lowercase();
        if tables.contains_key(&name) {
            return Err(format!("relation \"{name}\" already exists"));
        }
        let columns = split_top_level(&c[2])
            .iter()
            .map(|definition| definition.split_whitespace().next().unwrap_or_default().to_string())
            .collect();
        tables.insert(name, Table { columns, rows: vec![] });
    } else if let Some(c) = copy.captures(sql) {
        let name = c[1].to_ascii_lowercase();
        let table = tables.get_mut(&name).ok_or_else(|| missing(&name))?;
        let rows = copied.unwrap_or_default();
        if let Some(row) = rows.iter().find(|row| row.len() != table.columns.len()) {
            return Err(format!(
                "Spectrum Scan Error: file has {} columns, table has {}",
                row.len(),
                table.columns.len()
            ));
        }
        table.rows.extend(rows);
    } else if let Some(c) = truncate.captures(sql).or_else(|| delete.captures(sql)) {
        let name = c[1].to_ascii_lowercase();
        tables.get_mut(&name).ok_or_else(|| missing(&name))?.rows.clear();
    } else if let Some(c) = insert.captures(sql) {
        let target = c[1].to_ascii_lowercase();
        let staging = c[3].to_ascii_lowercase();
        let source = tables.get(&staging).ok_or_else(|| missing(&staging))?.clone();

        let indices = split_top_level(&c[2])
            .iter()
            .map(|expression| {
                let column = source_column(expression);
                source
                    .columns
                    .iter()
                    .position(|c| *c == column)
                    .ok_or_else(|| format!("column \"{column}\" does not exist"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = source
            .rows
            .iter()
            .map(|row| indices.iter().map(|i| row[*i].clone()).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let target_table = tables.get_mut(&target).ok_or_else(|| missing(&target))?;
        if indices.len() != target_table.columns.len() {
            return Err("INSERT has more expressions than target columns".to_string());
        }
        target_table.rows.extend(rows);
    } else if let Some(c) = drop.captures(sql) {
        let name = c[2].to_ascii_lowercase();
        if tables.remove(&name).is_none() && c.get(1).is_none() {
            return Err(missing(&name));
        }
    } else {
        return Err(format!("syntax error at or near \"{sql}\""));
    }

    Ok(())
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn table_exists(&self, table: &str) -> Result<bool, StatementError> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("PROBE {table}"));
        Ok(inner.tables.contains_key(&table.to_ascii_lowercase()))
    }

    async fn execute(&self, sql: &str) -> Result<(), StatementError> {
        let copied = match sql.strip_prefix("COPY ") {
            Some(rest) => {
                let url = rest
                    .split('\'')
                    .nth(1)
                    .ok_or_else(|| StatementError::new("COPY without source"))?;
                Some(self.read_parquet(url).await.map_err(StatementError::new)?)
            }
            None => None,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.log.push(sql.to_string());
        Self::check_injected(&inner, sql).map_err(StatementError::new)?;
        apply(&mut inner.tables, sql, copied).map_err(StatementError::new)
    }

    async fn execute_transaction(&self, statements: &[String]) -> Result<(), StatementError> {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = inner.tables.clone();
        let mut committed = snapshot.clone();

        for (index, sql) in statements.iter().enumerate() {
            inner.log.push(sql.to_string());

            let result = Self::check_injected(&inner, sql)
                .and_then(|_| apply(&mut inner.tables, sql, None));

            if let Err(cause) = result {
                inner.tables = committed;
                return Err(StatementError::at(index, cause));
            }

            if self.truncate_commits && sql.starts_with("TRUNCATE") {
                committed = inner.tables.clone();
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Engine

pub struct Harness {
    pub qbo: MockQbo,
    pub store: Arc<InMemory>,
    pub warehouse: Arc<FakeWarehouse>,
    pub tracker: Arc<RecordingTracker>,
}

impl Harness {
    pub async fn start() -> Self {
        let store = Arc::new(InMemory::new());
        Self {
            qbo: MockQbo::start().await,
            warehouse: Arc::new(FakeWarehouse::new(store.clone())),
            store,
            tracker: Arc::new(RecordingTracker::default()),
        }
    }

    /// Make TRUNCATE commit on its own, as Redshift does inside a transaction
    pub fn with_implicit_truncate_commit(mut self) -> Self {
        self.warehouse =
            Arc::new(FakeWarehouse::new(self.store.clone()).with_implicit_truncate_commit());
        self
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::builder()
            .copy_iam_role(IAM_ROLE)
            .api_base_url(self.qbo.base_url.clone())
            .http_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap()
    }

    pub fn engine(&self) -> IngestionEngine {
        self.engine_with(self.config())
    }

    pub fn engine_with(&self, config: EngineConfig) -> IngestionEngine {
        let credentials = Arc::new(StaticCredentials::new(TOKEN, REALM));
        let client = QueryClient::try_new(&config, credentials).unwrap();

        IngestionEngine::builder()
            .source(Arc::new(client))
            .warehouse(self.warehouse.clone())
            .store(self.store.clone())
            .tracker(self.tracker.clone())
            .config(config)
            .build()
    }

    /// Create the target table of `descriptor` the way the warehouse schema does
    pub fn create_target(&self, descriptor: &Descriptor) {
        let columns = descriptor.warehouse.column_names().collect::<Vec<_>>();
        self.warehouse
            .create_table(&descriptor.warehouse.target_table, &columns);
    }

    pub async fn object_exists(&self, descriptor: &Descriptor) -> bool {
        let path = object_path(&descriptor.object_path).unwrap();
        self.store.head(&path).await.is_ok()
    }
}

#[derive(Default)]
pub struct RecordingTracker {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingTracker {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressTracker for RecordingTracker {
    fn on_progress(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ------------------------------------------------------------------------------------------------
// Descriptors and records

pub fn bill_payment_descriptor() -> Descriptor {
    let projection = vec![
        ColumnMapping::new("Id", "id"),
        ColumnMapping::new("SyncToken", "sync_token"),
        ColumnMapping::new("TxnDate", "txn_date"),
        ColumnMapping::new("TotalAmt", "total_amt"),
        ColumnMapping::new("PayType", "pay_type"),
        ColumnMapping::new("VendorRef.value", "vendor_ref_value"),
        ColumnMapping::new("CreditCardPayment.CCAccountRef.value", "cc_account_ref_value"),
        ColumnMapping::new("MetaData.LastUpdatedTime", "last_updated_time"),
    ];

    Descriptor::builder()
        .entity_name("BillPayment".to_string())
        .projection(projection)
        .column_types(
            [
                ("id", ColumnType::Int32),
                ("sync_token", ColumnType::Int32),
                ("txn_date", ColumnType::Date),
                ("total_amt", ColumnType::Float64),
                ("pay_type", ColumnType::String),
                ("vendor_ref_value", ColumnType::Int32),
                ("cc_account_ref_value", ColumnType::Int32),
                ("last_updated_time", ColumnType::Timestamp),
            ]
            .into_iter()
            .map(|(column, tpe)| (column.to_string(), tpe))
            .collect(),
        )
        .warehouse(WarehouseSpec {
            staging_table: "finance.temp_qb_bill_payment".to_string(),
            target_table: "finance.qb_bill_payment".to_string(),
            columns: vec![
                WarehouseColumn::new("id", "INT"),
                WarehouseColumn::new("sync_token", "INT"),
                WarehouseColumn::new("txn_date", "VARCHAR(255)")
                    .with_cast("TO_DATE(txn_date, 'YYYY-MM-DD')"),
                WarehouseColumn::new("total_amt", "DOUBLE PRECISION"),
                WarehouseColumn::new("pay_type", "VARCHAR(255)"),
                WarehouseColumn::new("vendor_ref_value", "INT"),
                WarehouseColumn::new("cc_account_ref_value", "INT"),
                WarehouseColumn::new("last_updated_time", "VARCHAR(255)")
                    .with_cast("TO_TIMESTAMP(last_updated_time, 'YYYY-MM-DDTHH24:MI:SS')"),
            ],
        })
        .object_path(
            "s3://datalake/to_redshift/qb/qb_bill_payment.parquet"
                .try_into()
                .unwrap(),
        )
        .build()
}

pub fn bill_payment(id: usize) -> Value {
    let mut record = json!({
        "Id": id.to_string(),
        "SyncToken": "0",
        "TxnDate": "2024-04-15",
        "TotalAmt": 100.0 + id as f64,
        "PayType": if id % 2 == 0 { "CreditCard" } else { "Check" },
        "VendorRef": { "value": "57", "name": "Tony's Tires" },
        "MetaData": {
            "CreateTime": "2024-04-15T09:12:05-07:00",
            "LastUpdatedTime": "2024-04-16T11:40:00-07:00"
        },
        "Line": [{ "Amount": 100.0 + id as f64, "LinkedTxn": [{ "TxnId": "12", "TxnType": "Bill" }] }]
    });

    if id % 2 == 0 {
        record["CreditCardPayment"] = json!({ "CCAccountRef": { "value": "41", "name": "Mastercard" } });
    } else {
        record["CheckPayment"] = json!({ "BankAccountRef": { "value": "35", "name": "Checking" } });
    }

    record
}

pub fn purchase_descriptor() -> Descriptor {
    let projection = vec![
        ColumnMapping::new("Id", "id"),
        ColumnMapping::new("TxnDate", "txn_date"),
        ColumnMapping::new("PaymentType", "payment_type"),
        ColumnMapping::new("AccountRef.value", "account_ref_value"),
    ];
    let explode = vec![
        ColumnMapping::new("Id", "line_id"),
        ColumnMapping::new("Amount", "line_amount"),
        ColumnMapping::new("Description", "line_description"),
        ColumnMapping::new(
            "AccountBasedExpenseLineDetail.AccountRef.value",
            "line_account_ref_value",
        ),
    ];

    Descriptor::builder()
        .entity_name("Purchase".to_string())
        .projection(projection)
        .explode_path("Line".to_string())
        .explode_column_map(explode)
        .column_types(
            [
                ("id", ColumnType::Int32),
                ("txn_date", ColumnType::Date),
                ("payment_type", ColumnType::String),
                ("account_ref_value", ColumnType::Int32),
                ("line_id", ColumnType::Int32),
                ("line_amount", ColumnType::Float64),
                ("line_description", ColumnType::String),
                ("line_account_ref_value", ColumnType::Int32),
            ]
            .into_iter()
            .map(|(column, tpe)| (column.to_string(), tpe))
            .collect(),
        )
        .null_policy(
            [
                ("line_id".to_string(), NullPolicy::KeepNull),
                ("line_amount".to_string(), NullPolicy::KeepNull),
                ("line_description".to_string(), NullPolicy::KeepNull),
                ("line_account_ref_value".to_string(), NullPolicy::KeepNull),
            ]
            .into(),
        )
        .warehouse(WarehouseSpec {
            staging_table: "finance.temp_qb_purchase".to_string(),
            target_table: "finance.qb_purchase".to_string(),
            columns: vec![
                WarehouseColumn::new("id", "INT"),
                WarehouseColumn::new("txn_date", "VARCHAR(255)")
                    .with_cast("TO_DATE(txn_date, 'YYYY-MM-DD')"),
                WarehouseColumn::new("payment_type", "VARCHAR(255)"),
                WarehouseColumn::new("account_ref_value", "INT"),
                WarehouseColumn::new("line_id", "INT"),
                WarehouseColumn::new("line_amount", "DOUBLE PRECISION"),
                WarehouseColumn::new("line_description", "VARCHAR(4096)"),
                WarehouseColumn::new("line_account_ref_value", "INT"),
            ],
        })
        .object_path(
            "s3://datalake/to_redshift/qb/qb_purchase.parquet"
                .try_into()
                .unwrap(),
        )
        .build()
}

pub fn purchase(id: usize, lines: usize) -> Value {
    let lines = (1..=lines)
        .map(|line| {
            json!({
                "Id": line.to_string(),
                "Amount": 12.5 * line as f64,
                "Description": format!("Fuel {line}"),
                "DetailType": "AccountBasedExpenseLineDetail",
                "AccountBasedExpenseLineDetail": {
                    "AccountRef": { "value": "56", "name": "Fuel" },
                    "BillableStatus": "NotBillable"
                }
            })
        })
        .collect::<Vec<_>>();

    json!({
        "Id": id.to_string(),
        "TxnDate": "2024-03-02",
        "PaymentType": "CreditCard",
        "AccountRef": { "value": "42", "name": "Visa" },
        "Line": lines
    })
}

pub fn deposit_descriptor() -> Descriptor {
    Descriptor::builder()
        .entity_name("Deposit".to_string())
        .projection(vec![
            ColumnMapping::new("Id", "id"),
            ColumnMapping::new("TotalAmt", "total_amt"),
            ColumnMapping::new("DepositToAccountRef.value", "deposit_to_account_ref_value"),
        ])
        .column_types(
            [
                ("id".to_string(), ColumnType::Int32),
                ("total_amt".to_string(), ColumnType::Float64),
                ("deposit_to_account_ref_value".to_string(), ColumnType::Int32),
            ]
            .into(),
        )
        .warehouse(WarehouseSpec {
            staging_table: "finance.temp_qb_deposit".to_string(),
            target_table: "finance.qb_deposit".to_string(),
            columns: vec![
                WarehouseColumn::new("id", "INT"),
                WarehouseColumn::new("total_amt", "DOUBLE PRECISION"),
                WarehouseColumn::new("deposit_to_account_ref_value", "INT"),
            ],
        })
        .object_path(
            "s3://datalake/to_redshift/qb/qb_deposit.parquet"
                .try_into()
                .unwrap(),
        )
        .build()
}

pub fn deposit(id: usize, total_amt: Value) -> Value {
    json!({
        "Id": id.to_string(),
        "TotalAmt": total_amt,
        "DepositToAccountRef": { "value": "35", "name": "Checking" }
    })
}
