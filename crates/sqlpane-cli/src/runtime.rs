// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use sqlpane_api::{Client, ReconnectPolicy, run_job_listener};
use sqlpane_app::{
    ColumnDescriptor, ConnectionId, DEFAULT_JOB_PRUNE_AFTER, DEFAULT_PAGE_SIZE, Filter,
    FilterOperator, ForeignKeyRef, Row, SessionBus, TableRef, WidthStore, display_value,
    primary_key_column,
};
use sqlpane_grid::{
    CellTarget, DEFAULT_CLICK_DELAY, GridAxes, GridOptions, GridRuntime, GridSpec, InternalEvent,
    PageRequest, PageResult, RowMutations, RowTarget,
};
use sqlpane_store::Store;
use sqlpane_testkit::{DEMO_SCHEMA, DemoDataset};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

/// Grid behaviour that comes from config rather than from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSettings {
    pub page_size: usize,
    pub click_delay: Duration,
    pub job_prune_after: Duration,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            click_delay: DEFAULT_CLICK_DELAY,
            job_prune_after: DEFAULT_JOB_PRUNE_AFTER,
        }
    }
}

impl GridSettings {
    fn options(self, editable: bool) -> GridOptions {
        GridOptions {
            editable,
            click_delay: self.click_delay,
            ..GridOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Table {
        table: TableRef,
        filters: Vec<Filter>,
    },
    Query {
        connection: ConnectionId,
        sql: String,
    },
}

/// Server-backed grid. A table is paged, sorted, and filtered by the
/// server; a query result is fetched once and handled in the grid.
pub struct ApiRuntime<'a> {
    client: Client,
    store: &'a Store,
    session: SessionBus,
    settings: GridSettings,
    source: Source,
    columns: Vec<ColumnDescriptor>,
    query_rows: Vec<Row>,
    jobs: Option<ReconnectPolicy>,
    job_generation: Arc<AtomicU64>,
}

impl<'a> ApiRuntime<'a> {
    pub fn for_table(
        client: Client,
        store: &'a Store,
        session: SessionBus,
        settings: GridSettings,
        table: TableRef,
    ) -> Self {
        Self::new(
            client,
            store,
            session,
            settings,
            Source::Table {
                table,
                filters: Vec::new(),
            },
        )
    }

    pub fn for_query(
        client: Client,
        store: &'a Store,
        session: SessionBus,
        settings: GridSettings,
        connection: ConnectionId,
        sql: String,
    ) -> Self {
        Self::new(
            client,
            store,
            session,
            settings,
            Source::Query { connection, sql },
        )
    }

    fn new(
        client: Client,
        store: &'a Store,
        session: SessionBus,
        settings: GridSettings,
        source: Source,
    ) -> Self {
        Self {
            client,
            store,
            session,
            settings,
            source,
            columns: Vec::new(),
            query_rows: Vec::new(),
            jobs: None,
            job_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_job_stream(mut self, policy: Option<ReconnectPolicy>) -> Self {
        self.jobs = policy;
        self
    }

    fn connection(&self) -> ConnectionId {
        match &self.source {
            Source::Table { table, .. } => table.connection,
            Source::Query { connection, .. } => *connection,
        }
    }

    fn writable_table(&self) -> Result<&TableRef> {
        match &self.source {
            Source::Table { table, .. } => Ok(table),
            Source::Query { .. } => bail!("query results are read-only"),
        }
    }

    fn primary_key(&self, row: &Row) -> Result<Row> {
        let table = self.writable_table()?;
        let key = primary_key_column(&self.columns).ok_or_else(|| {
            anyhow!("{table} has no primary key; its rows cannot be changed here")
        })?;
        let value = row
            .get(&key.name)
            .filter(|value| !value.is_null())
            .ok_or_else(|| anyhow!("row has no value for primary key {}", key.name))?;
        Ok(Row::from_pairs([(key.name.clone(), value.clone())]))
    }
}

impl RowMutations for ApiRuntime<'_> {
    fn insert_row(&mut self, values: &Row) -> Result<()> {
        let table = self.writable_table()?;
        self.client.insert_row(table, values)?;
        tracing::info!(%table, columns = values.len(), "inserted row");
        Ok(())
    }

    fn update_cell(&mut self, target: &CellTarget, value: &Value) -> Result<()> {
        let key = self.primary_key(&target.row)?;
        let table = self.writable_table()?;
        self.client.update_row(table, &key, &target.column, value)?;
        tracing::info!(%table, column = %target.column, "updated cell");
        Ok(())
    }

    fn delete_rows(&mut self, targets: &[RowTarget]) -> Result<()> {
        let keys = targets
            .iter()
            .map(|target| self.primary_key(&target.row))
            .collect::<Result<Vec<_>>>()?;
        let table = self.writable_table()?;
        let deleted = self.client.delete_rows(table, &keys)?;
        tracing::info!(%table, requested = keys.len(), deleted, "deleted rows");
        if deleted < keys.len() {
            bail!(
                "deleted {deleted} of {} rows; refresh to see what remains",
                keys.len()
            );
        }
        Ok(())
    }
}

impl GridRuntime for ApiRuntime<'_> {
    fn open_grid(&mut self) -> Result<GridSpec> {
        match &self.source {
            Source::Table { table, filters } => {
                self.columns = self.client.table_columns(table)?;
                Ok(GridSpec {
                    title: table.to_string(),
                    table: Some(table.clone()),
                    columns: self.columns.clone(),
                    axes: GridAxes::server_side(self.settings.page_size, filters.clone()),
                    options: self.settings.options(true),
                })
            }
            Source::Query { connection, sql } => {
                let result = self.client.execute_sql(*connection, sql)?;
                tracing::info!(rows = result.rows.len(), "query returned");
                self.columns = result.columns;
                self.query_rows = result.rows;
                Ok(GridSpec {
                    title: "query result".to_owned(),
                    table: None,
                    columns: self.columns.clone(),
                    axes: GridAxes::client_side(self.settings.page_size),
                    options: self.settings.options(false),
                })
            }
        }
    }

    fn load_page(&mut self, request: &PageRequest) -> Result<PageResult> {
        match &self.source {
            Source::Table { table, .. } => {
                let page = self.client.fetch_rows(
                    table,
                    &request.filters,
                    request.sort.as_ref(),
                    request.pagination.unwrap_or_default(),
                )?;
                Ok(PageResult {
                    rows: page.rows,
                    total_count: page.total_count,
                })
            }
            Source::Query { .. } => Ok(PageResult {
                rows: self.query_rows.clone(),
                total_count: None,
            }),
        }
    }

    fn spawn_page_load(
        &mut self,
        request_id: u64,
        request: PageRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let Source::Table { table, .. } = &self.source else {
            let result = self
                .load_page(&request)
                .map_err(|error| format!("{error:#}"));
            tx.send(InternalEvent::PageLoaded { request_id, result })
                .map_err(|_| anyhow!("page event channel closed"))?;
            return Ok(());
        };

        let client = self.client.clone();
        let table = table.clone();
        thread::spawn(move || {
            let result = client
                .fetch_rows(
                    &table,
                    &request.filters,
                    request.sort.as_ref(),
                    request.pagination.unwrap_or_default(),
                )
                .map(|page| PageResult {
                    rows: page.rows,
                    total_count: page.total_count,
                })
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(InternalEvent::PageLoaded { request_id, result });
        });
        Ok(())
    }

    fn width_store(&self) -> Option<&dyn WidthStore> {
        Some(self.store)
    }

    fn page_size_changed(&mut self, page_size: usize) {
        self.settings.page_size = page_size;
        if let Err(error) = self.store.put_page_size(page_size) {
            tracing::warn!(error = %error, page_size, "could not save page size");
        }
    }

    fn follow_reference(&mut self, reference: &ForeignKeyRef, value: &Value) -> Result<bool> {
        let table = TableRef::new(self.connection(), &reference.schema, &reference.table);
        let filter = Filter::new(&reference.column, FilterOperator::Equals, display_value(value));
        tracing::info!(%table, filter = %filter.describe(), "following reference");
        self.source = Source::Table {
            table,
            filters: vec![filter],
        };
        self.query_rows.clear();
        Ok(true)
    }

    fn start_job_stream(&mut self, tx: Sender<InternalEvent>) -> Result<bool> {
        let Some(policy) = self.jobs else {
            return Ok(false);
        };
        // A bumped generation tells any earlier listener to stop at its next event.
        let generation = self.job_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.job_generation);
        let client = self.client.clone();
        thread::spawn(move || {
            run_job_listener(&client, policy, |feed| {
                current.load(Ordering::SeqCst) == generation
                    && tx.send(InternalEvent::Jobs(feed)).is_ok()
            });
        });
        Ok(true)
    }

    fn session_bus(&self) -> Option<SessionBus> {
        Some(self.session.clone())
    }

    fn job_prune_after(&self) -> Duration {
        self.settings.job_prune_after
    }
}

/// Local grid over the generated demo dataset. Everything is client-side;
/// following a reference pins the target table to the matching rows.
pub struct DemoRuntime {
    dataset: DemoDataset,
    store: Store,
    settings: GridSettings,
    table: String,
    pinned: Option<(String, Value)>,
}

impl DemoRuntime {
    pub fn new(
        dataset: DemoDataset,
        store: Store,
        settings: GridSettings,
        table: &str,
    ) -> Result<Self> {
        if dataset.table(table).is_none() {
            bail!(
                "demo has no table {table:?}; choose one of {}",
                dataset.table_names().join(", ")
            );
        }
        Ok(Self {
            dataset,
            store,
            settings,
            table: table.to_owned(),
            pinned: None,
        })
    }

    fn key_column(&self) -> Result<String> {
        let table = self
            .dataset
            .table(&self.table)
            .ok_or_else(|| anyhow!("demo table {} disappeared", self.table))?;
        primary_key_column(&table.columns)
            .map(|column| column.name.clone())
            .ok_or_else(|| anyhow!("demo table {} has no primary key", self.table))
    }

    fn key_of(&self, row: &Row) -> Result<Value> {
        let column = self.key_column()?;
        row.get(&column)
            .cloned()
            .ok_or_else(|| anyhow!("row has no value for primary key {column}"))
    }
}

impl RowMutations for DemoRuntime {
    fn insert_row(&mut self, values: &Row) -> Result<()> {
        let key = self.dataset.insert(&self.table, values)?;
        tracing::info!(table = %self.table, key = %key, "inserted demo row");
        Ok(())
    }

    fn update_cell(&mut self, target: &CellTarget, value: &Value) -> Result<()> {
        let key = self.key_of(&target.row)?;
        self.dataset.update(&self.table, &key, &target.column, value)
    }

    fn delete_rows(&mut self, targets: &[RowTarget]) -> Result<()> {
        let keys = targets
            .iter()
            .map(|target| self.key_of(&target.row))
            .collect::<Result<Vec<_>>>()?;
        let deleted = self.dataset.delete(&self.table, &keys)?;
        tracing::info!(table = %self.table, deleted, "deleted demo rows");
        Ok(())
    }
}

impl GridRuntime for DemoRuntime {
    fn open_grid(&mut self) -> Result<GridSpec> {
        let table = self
            .dataset
            .table(&self.table)
            .ok_or_else(|| anyhow!("demo has no table {}", self.table))?;
        let title = match &self.pinned {
            Some((column, value)) => {
                format!("{} ({column} = {})", table.name, display_value(value))
            }
            None => table.name.clone(),
        };
        Ok(GridSpec {
            title,
            table: Some(TableRef::new(ConnectionId::new(0), DEMO_SCHEMA, &table.name)),
            columns: table.columns.clone(),
            axes: GridAxes::client_side(self.settings.page_size),
            options: self.settings.options(true),
        })
    }

    fn load_page(&mut self, _request: &PageRequest) -> Result<PageResult> {
        let rows = match &self.pinned {
            Some((column, value)) => self.dataset.rows_matching(&self.table, column, value),
            None => self
                .dataset
                .table(&self.table)
                .map(|table| table.rows.clone())
                .unwrap_or_default(),
        };
        Ok(PageResult {
            rows,
            total_count: None,
        })
    }

    fn width_store(&self) -> Option<&dyn WidthStore> {
        Some(&self.store)
    }

    fn page_size_changed(&mut self, page_size: usize) {
        self.settings.page_size = page_size;
        if let Err(error) = self.store.put_page_size(page_size) {
            tracing::warn!(error = %error, page_size, "could not save page size");
        }
    }

    fn follow_reference(&mut self, reference: &ForeignKeyRef, value: &Value) -> Result<bool> {
        if reference.schema != DEMO_SCHEMA || self.dataset.table(&reference.table).is_none() {
            return Ok(false);
        }
        self.table = reference.table.clone();
        self.pinned = Some((reference.column.clone(), value.clone()));
        Ok(true)
    }

    fn job_prune_after(&self) -> Duration {
        self.settings.job_prune_after
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, DemoRuntime, GridSettings};
    use anyhow::{Result, anyhow};
    use serde_json::json;
    use sqlpane_app::{
        ColumnWidths, ConnectionId, Filter, FilterOperator, ForeignKeyRef, SessionBus, TableRef,
        WidthStore,
    };
    use sqlpane_api::Client;
    use sqlpane_grid::{
        CellTarget, DataTable, GridCommand, GridRuntime, InternalEvent, PageRequest,
        RowMutations, RowTarget,
    };
    use sqlpane_store::Store;
    use sqlpane_testkit::{DemoDataset, row};
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn demo() -> Result<DemoRuntime> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        DemoRuntime::new(DemoDataset::generate(7), store, GridSettings::default(), "customers")
    }

    fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
        Response::from_string(body).with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
    }

    #[test]
    fn demo_rejects_unknown_table() -> Result<()> {
        let store = Store::open_memory()?;
        let error = DemoRuntime::new(
            DemoDataset::generate(1),
            store,
            GridSettings::default(),
            "nope",
        )
        .err()
            .ok_or_else(|| anyhow!("unknown table should fail"))?;
        assert!(error.to_string().contains("customers"));
        Ok(())
    }

    #[test]
    fn demo_opens_client_side_grid_with_all_rows() -> Result<()> {
        let mut runtime = demo()?;
        let spec = runtime.open_grid()?;
        assert_eq!(spec.title, "customers");
        assert!(!spec.axes.pagination.is_controlled());
        assert_eq!(
            spec.table.map(|table| table.storage_key()),
            Some("0:public:customers".to_owned())
        );
        let page = runtime.load_page(&PageRequest::default())?;
        assert_eq!(page.rows.len(), sqlpane_testkit::CUSTOMER_COUNT);
        Ok(())
    }

    #[test]
    fn demo_filter_drives_footer_total_and_paging() -> Result<()> {
        let mut runtime = demo()?;
        let spec = runtime.open_grid()?;
        let page = runtime.load_page(&PageRequest::default())?;
        assert_eq!(page.total_count, None);
        let expected = page
            .rows
            .iter()
            .filter(|row| row.display("country") == "NZ")
            .count();
        assert!(expected > 0 && expected < sqlpane_testkit::CUSTOMER_COUNT);

        let mut grid = DataTable::new(spec.title, spec.columns, spec.axes, spec.options);
        grid.set_rows(page.rows, page.total_count);
        grid.dispatch(
            GridCommand::AddFilter(Filter::new("country", FilterOperator::Equals, "NZ")),
            &mut runtime,
        );
        assert_eq!(grid.view().total, expected);
        assert_eq!(grid.total_pages(), expected.div_ceil(grid.pagination().page_size));

        grid.dispatch(GridCommand::GoToPage(grid.total_pages()), &mut runtime);
        assert!(!grid.page_rows().is_empty());
        assert!(!grid.pagination().has_next(grid.view().total));
        Ok(())
    }

    #[test]
    fn query_results_leave_the_count_to_the_grid() -> Result<()> {
        let store = Store::open_memory()?;
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let mut runtime = ApiRuntime::for_query(
            client,
            &store,
            SessionBus::new(),
            GridSettings::default(),
            ConnectionId::new(2),
            "SELECT id FROM plans".to_owned(),
        );
        runtime.query_rows = vec![row(&[("id", json!(1))]), row(&[("id", json!(2))])];
        let page = runtime.load_page(&PageRequest::default())?;
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total_count, None);
        Ok(())
    }

    #[test]
    fn demo_follow_reference_pins_target_rows() -> Result<()> {
        let mut runtime = demo()?;
        let reference = ForeignKeyRef {
            schema: "public".to_owned(),
            table: "plans".to_owned(),
            column: "id".to_owned(),
        };
        assert!(runtime.follow_reference(&reference, &json!(2))?);

        let spec = runtime.open_grid()?;
        assert_eq!(spec.title, "plans (id = 2)");
        let page = runtime.load_page(&PageRequest::default())?;
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].get("id"), Some(&json!(2)));

        let missing = ForeignKeyRef {
            table: "teams".to_owned(),
            ..reference
        };
        assert!(!runtime.follow_reference(&missing, &json!(1))?);
        Ok(())
    }

    #[test]
    fn demo_mutations_change_the_dataset() -> Result<()> {
        let mut runtime = demo()?;
        let first = runtime.load_page(&PageRequest::default())?.rows[0].clone();

        runtime.update_cell(
            &CellTarget {
                row_index: 0,
                column: "name".to_owned(),
                row: first.clone(),
            },
            &json!("Renamed"),
        )?;
        let rows = runtime.load_page(&PageRequest::default())?.rows;
        assert_eq!(rows[0].display("name"), "Renamed");

        runtime.insert_row(&row(&[("name", json!("New customer"))]))?;
        let rows = runtime.load_page(&PageRequest::default())?.rows;
        assert_eq!(rows.len(), sqlpane_testkit::CUSTOMER_COUNT + 1);

        let inserted = rows
            .last()
            .cloned()
            .ok_or_else(|| anyhow!("inserted row expected"))?;
        runtime.delete_rows(&[RowTarget {
            row_index: rows.len() - 1,
            row: inserted,
        }])?;
        assert_eq!(
            runtime.load_page(&PageRequest::default())?.rows.len(),
            sqlpane_testkit::CUSTOMER_COUNT
        );
        Ok(())
    }

    #[test]
    fn demo_page_size_and_widths_persist_in_store() -> Result<()> {
        let mut runtime = demo()?;
        runtime.page_size_changed(50);
        let widths = ColumnWidths::from([("email".to_owned(), 30)]);
        let store = runtime
            .width_store()
            .ok_or_else(|| anyhow!("demo has a width store"))?;
        store.save_widths("0:public:customers", &widths)?;
        assert_eq!(store.load_widths("0:public:customers")?, Some(widths));
        assert_eq!(runtime.store.get_page_size()?, Some(50));
        Ok(())
    }

    #[test]
    fn api_table_mode_fetches_columns_then_pages_on_a_worker() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("columns request expected");
            assert_eq!(
                request.url(),
                "/connections/1/schemas/public/tables/orders/columns"
            );
            request
                .respond(json_response(
                    r#"{"columns":[{"name":"id","type":"integer","isPrimaryKey":true},{"name":"total","type":"numeric"}]}"#,
                ))
                .expect("response should succeed");

            let request = server.recv().expect("rows request expected");
            assert_eq!(
                request.url(),
                "/connections/1/schemas/public/tables/orders/rows/query"
            );
            request
                .respond(json_response(
                    r#"{"rows":[{"id":1,"total":9.5}],"totalCount":40}"#,
                ))
                .expect("response should succeed");
        });

        let store = Store::open_memory()?;
        store.bootstrap()?;
        let client = Client::new(&addr, Duration::from_secs(1))?;
        let mut runtime = ApiRuntime::for_table(
            client,
            &store,
            SessionBus::new(),
            GridSettings::default(),
            TableRef::new(ConnectionId::new(1), "public", "orders"),
        );

        let spec = runtime.open_grid()?;
        assert!(spec.axes.pagination.is_controlled());
        assert!(spec.options.editable);
        assert_eq!(spec.columns.len(), 2);

        let (tx, rx) = mpsc::channel();
        runtime.spawn_page_load(
            4,
            PageRequest {
                pagination: Some(sqlpane_app::Pagination::new(1, 25)),
                ..PageRequest::default()
            },
            tx,
        )?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::PageLoaded { request_id, result } => {
                assert_eq!(request_id, 4);
                let page = result.map_err(|error| anyhow!(error))?;
                assert_eq!(page.total_count, Some(40));
                assert_eq!(page.rows.len(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn api_mutations_send_primary_keys() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("columns request expected");
            request
                .respond(json_response(
                    r#"{"columns":[{"name":"id","type":"integer","isPrimaryKey":true},{"name":"status","type":"text"}]}"#,
                ))
                .expect("response should succeed");

            let mut request = server.recv().expect("delete request expected");
            let mut body = String::new();
            request
                .as_reader()
                .read_to_string(&mut body)
                .expect("body should be readable");
            assert_eq!(body, r#"{"primaryKeys":[{"id":3},{"id":8}]}"#);
            request
                .respond(json_response(r#"{"deleted":1}"#))
                .expect("response should succeed");
        });

        let store = Store::open_memory()?;
        store.bootstrap()?;
        let client = Client::new(&addr, Duration::from_secs(1))?;
        let mut runtime = ApiRuntime::for_table(
            client,
            &store,
            SessionBus::new(),
            GridSettings::default(),
            TableRef::new(ConnectionId::new(1), "public", "orders"),
        );
        runtime.open_grid()?;

        let targets = [3, 8].map(|id| RowTarget {
            row_index: 0,
            row: row(&[("id", json!(id)), ("status", json!("open"))]),
        });
        let error = runtime
            .delete_rows(&targets)
            .expect_err("partial delete should be reported");
        assert!(error.to_string().contains("deleted 1 of 2 rows"));

        let keyless = RowTarget {
            row_index: 0,
            row: row(&[("status", json!("open"))]),
        };
        assert!(runtime.delete_rows(&[keyless]).is_err());

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn api_follow_reference_switches_to_filtered_table() -> Result<()> {
        let store = Store::open_memory()?;
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let mut runtime = ApiRuntime::for_query(
            client,
            &store,
            SessionBus::new(),
            GridSettings::default(),
            ConnectionId::new(5),
            "SELECT 1".to_owned(),
        );
        assert!(
            runtime
                .insert_row(&row(&[("id", json!(1))]))
                .is_err(),
            "query results are read-only"
        );

        let reference = ForeignKeyRef {
            schema: "sales".to_owned(),
            table: "customers".to_owned(),
            column: "id".to_owned(),
        };
        assert!(runtime.follow_reference(&reference, &json!(12))?);
        match &runtime.source {
            super::Source::Table { table, filters } => {
                assert_eq!(table.storage_key(), "5:sales:customers");
                assert_eq!(filters.len(), 1);
                assert_eq!(filters[0].describe(), "id = 12");
            }
            other => panic!("expected table source, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn job_stream_is_off_without_policy() -> Result<()> {
        let store = Store::open_memory()?;
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let mut runtime = ApiRuntime::for_table(
            client,
            &store,
            SessionBus::new(),
            GridSettings::default(),
            TableRef::new(ConnectionId::new(1), "public", "orders"),
        );
        let (tx, _rx) = mpsc::channel();
        assert!(!runtime.start_job_stream(tx)?);
        Ok(())
    }
}
