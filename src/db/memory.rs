//! In-process wide-column store for tests and the `memory` backend.
//!
//! Rows live in partitions keyed by the partition-key values and are kept in
//! clustering order, so reads come back sorted the way the cluster returns
//! them. The statement checks mirror the cluster's: a keyspace must be
//! selected, tables must exist, and reads must bind the whole partition key
//! and restrict clustering columns as a prefix.

use super::session::{Relation, Restriction, Row, Select, Session, Statement, StoreError, Value};
use super::tables::{ClusteringOrder, Table, TableDef};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ClusteringKey(Vec<(Value, ClusteringOrder)>);

impl Ord for ClusteringKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for ((a, order), (b, _)) in self.0.iter().zip(other.0.iter()) {
            let ord = match order {
                ClusteringOrder::Asc => a.cmp(b),
                ClusteringOrder::Desc => b.cmp(a),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ClusteringKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct Partition {
    statics: BTreeMap<usize, Value>,
    rows: BTreeMap<ClusteringKey, Vec<Value>>,
}

#[derive(Debug, Default)]
struct TableData {
    partitions: BTreeMap<Vec<Value>, Partition>,
}

/// A row whose primary key has been checked, ready to apply.
#[derive(Debug)]
struct KeyedRow {
    partition_key: Vec<Value>,
    clustering: ClusteringKey,
    values: Vec<Value>,
}

impl KeyedRow {
    fn new(def: &TableDef, values: &[Value]) -> Result<Self, StoreError> {
        if values.len() != def.columns.len() {
            return Err(StoreError::InvalidRequest(format!(
                "{} expects {} values, got {}",
                def.name,
                def.columns.len(),
                values.len()
            )));
        }

        let mut partition_key = Vec::with_capacity(def.partition_key.len());
        for column in def.partition_key {
            partition_key.push(key_value(def, values, column)?);
        }
        let mut clustering = Vec::with_capacity(def.clustering.len());
        for (column, order) in def.clustering {
            clustering.push((key_value(def, values, column)?, *order));
        }
        Ok(KeyedRow {
            partition_key,
            clustering: ClusteringKey(clustering),
            values: values.to_vec(),
        })
    }
}

impl TableData {
    fn upsert(&mut self, def: &TableDef, row: KeyedRow) {
        let KeyedRow {
            partition_key,
            clustering,
            values: mut row,
        } = row;
        let partition = self.partitions.entry(partition_key).or_default();
        for (i, column) in def.columns.iter().enumerate() {
            if column.is_static {
                let value = std::mem::replace(&mut row[i], Value::Null);
                if value != Value::Null {
                    partition.statics.insert(i, value);
                }
            }
        }
        partition.rows.insert(clustering, row);
    }

    fn row_count(&self) -> usize {
        self.partitions.values().map(|p| p.rows.len()).sum()
    }
}

fn key_value(def: &TableDef, values: &[Value], column: &str) -> Result<Value, StoreError> {
    let index = def
        .column_index(column)
        .ok_or_else(|| StoreError::InvalidRequest(format!("unknown column {}", column)))?;
    match &values[index] {
        Value::Null => Err(StoreError::InvalidRequest(format!(
            "invalid null value for primary key column {}",
            column
        ))),
        value => Ok(value.clone()),
    }
}

#[derive(Debug, Default)]
struct Keyspace {
    replication_factor: u32,
    tables: BTreeMap<Table, TableData>,
}

#[derive(Debug, Default)]
struct State {
    keyspaces: HashMap<String, Keyspace>,
    current: Option<String>,
    batches: Vec<(Table, usize)>,
    batches_before_failure: Option<usize>,
}

impl State {
    fn keyspace_mut(&mut self) -> Result<&mut Keyspace, StoreError> {
        let name = self.current.clone().ok_or_else(|| {
            StoreError::InvalidRequest("no keyspace has been specified".to_string())
        })?;
        self.keyspaces
            .get_mut(&name)
            .ok_or_else(|| StoreError::InvalidRequest(format!("keyspace {} does not exist", name)))
    }

    fn table_mut(&mut self, table: Table) -> Result<&mut TableData, StoreError> {
        self.keyspace_mut()?
            .tables
            .get_mut(&table)
            .ok_or_else(|| StoreError::InvalidRequest(format!("unconfigured table {}", table)))
    }
}

/// Prepared statement handle for [`MemorySession`].
#[derive(Debug, Clone)]
pub struct MemoryPrepared {
    statement: Statement,
}

/// In-memory implementation of [`Session`].
#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<State>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make batch submissions fail once `n` more batches have succeeded.
    pub fn fail_after_batches(&self, n: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.batches_before_failure = Some(n);
        }
    }

    /// Sizes of every successful batch, in submission order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state
            .lock()
            .map(|s| s.batches.iter().map(|(_, n)| *n).collect())
            .unwrap_or_default()
    }

    /// Sizes of the successful batches sent to `table`.
    pub fn batch_sizes_for(&self, table: Table) -> Vec<usize> {
        self.state
            .lock()
            .map(|s| {
                s.batches
                    .iter()
                    .filter(|(t, _)| *t == table)
                    .map(|(_, n)| *n)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of rows stored in `table` of the current keyspace.
    pub fn row_count(&self, table: Table) -> usize {
        let Ok(mut state) = self.lock() else {
            return 0;
        };
        let count = match state.table_mut(table) {
            Ok(data) => data.row_count(),
            Err(_) => 0,
        };
        count
    }

    /// Tables defined in `keyspace`, or `None` if the keyspace does not exist.
    pub fn tables(&self, keyspace: &str) -> Option<Vec<Table>> {
        let state = self.lock().ok()?;
        let tables = state
            .keyspaces
            .get(keyspace)
            .map(|ks| ks.tables.keys().copied().collect());
        tables
    }

    /// Replication factor recorded for `keyspace`.
    pub fn replication_factor(&self, keyspace: &str) -> Option<u32> {
        let state = self.lock().ok()?;
        let factor = state.keyspaces.get(keyspace).map(|ks| ks.replication_factor);
        factor
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn run(&self, statement: &Statement, values: &[Value]) -> Result<Vec<Row>, StoreError> {
        let mut state = self.lock()?;
        match statement {
            Statement::CreateKeyspace {
                name,
                replication_factor,
            } => {
                state
                    .keyspaces
                    .entry(name.clone())
                    .or_insert_with(|| Keyspace {
                        replication_factor: *replication_factor,
                        tables: BTreeMap::new(),
                    });
                Ok(Vec::new())
            }
            Statement::CreateTable(table) => {
                state.keyspace_mut()?.tables.entry(*table).or_default();
                Ok(Vec::new())
            }
            Statement::Insert(table) => {
                let row = KeyedRow::new(table.def(), values)?;
                state.table_mut(*table)?.upsert(table.def(), row);
                Ok(Vec::new())
            }
            Statement::Select(select) => {
                let data = state.table_mut(select.table)?;
                read(data, select, values)
            }
        }
    }
}

fn read(data: &TableData, select: &Select, values: &[Value]) -> Result<Vec<Row>, StoreError> {
    let def = select.table.def();
    if values.len() != select.restrictions.len() {
        return Err(StoreError::InvalidRequest(format!(
            "expected {} bound values, got {}",
            select.restrictions.len(),
            values.len()
        )));
    }
    check_restrictions(def, &select.restrictions)?;

    let mut partition_key = Vec::with_capacity(def.partition_key.len());
    for column in def.partition_key {
        let position = select
            .restrictions
            .iter()
            .position(|r| r.column == *column && r.relation == Relation::Eq)
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!(
                    "partition key column {} must be restricted by equality",
                    column
                ))
            })?;
        partition_key.push(values[position].clone());
    }

    let Some(partition) = data.partitions.get(&partition_key) else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for row in partition.rows.values() {
        if let Some(limit) = select.limit {
            if rows.len() >= limit {
                break;
            }
        }
        if matches_all(def, row, &select.restrictions, values)? {
            let mut full = row.clone();
            for (index, value) in &partition.statics {
                full[*index] = value.clone();
            }
            rows.push(Row::new(full));
        }
    }
    Ok(rows)
}

/// Clustering restrictions must be equalities on a prefix, optionally
/// followed by a range on the next clustering column.
fn check_restrictions(def: &TableDef, restrictions: &[Restriction]) -> Result<(), StoreError> {
    let mut eq_prefix = 0;
    let mut range_column: Option<&str> = None;

    for restriction in restrictions {
        if def.column_index(restriction.column).is_none() {
            return Err(StoreError::InvalidRequest(format!(
                "undefined column {} in {}",
                restriction.column, def.name
            )));
        }
        if def.is_partition_key(restriction.column) {
            if restriction.relation != Relation::Eq {
                return Err(StoreError::InvalidRequest(format!(
                    "only equality is allowed on partition key {}",
                    restriction.column
                )));
            }
            continue;
        }
        let Some(position) = def
            .clustering
            .iter()
            .position(|(c, _)| *c == restriction.column)
        else {
            return Err(StoreError::InvalidRequest(format!(
                "restricting non-key column {} requires filtering",
                restriction.column
            )));
        };

        match restriction.relation {
            Relation::Eq => {
                if range_column.is_some() || position != eq_prefix {
                    return Err(StoreError::InvalidRequest(format!(
                        "clustering column {} cannot be restricted: preceding columns are not",
                        restriction.column
                    )));
                }
                eq_prefix += 1;
            }
            Relation::SinceTime | Relation::UntilTime => {
                if position != eq_prefix {
                    return Err(StoreError::InvalidRequest(format!(
                        "range on {} requires equality on all preceding clustering columns",
                        restriction.column
                    )));
                }
                if let Some(existing) = range_column {
                    if existing != restriction.column {
                        return Err(StoreError::InvalidRequest(
                            "only one clustering column may carry a range".to_string(),
                        ));
                    }
                }
                range_column = Some(restriction.column);
            }
        }
    }
    Ok(())
}

fn matches_all(
    def: &TableDef,
    row: &[Value],
    restrictions: &[Restriction],
    values: &[Value],
) -> Result<bool, StoreError> {
    for (restriction, bound) in restrictions.iter().zip(values) {
        let index = def.column_index(restriction.column).unwrap_or_default();
        let cell = &row[index];
        let ok = match restriction.relation {
            Relation::Eq => cell == bound,
            Relation::SinceTime | Relation::UntilTime => {
                let (Value::TimeUuid(id), Value::Timestamp(at)) = (cell, bound) else {
                    return Err(StoreError::InvalidRequest(format!(
                        "time range on {} needs a timeuuid column and a timestamp",
                        restriction.column
                    )));
                };
                let id_ms = id.timestamp().timestamp_millis();
                if restriction.relation == Relation::SinceTime {
                    id_ms >= at.timestamp_millis()
                } else {
                    id_ms <= at.timestamp_millis()
                }
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

#[async_trait]
impl Session for MemorySession {
    type Prepared = MemoryPrepared;

    async fn execute(
        &self,
        statement: &Statement,
        values: Vec<Value>,
    ) -> Result<Vec<Row>, StoreError> {
        self.run(statement, &values)
    }

    async fn prepare(&self, statement: &Statement) -> Result<MemoryPrepared, StoreError> {
        let mut state = self.lock()?;
        match statement {
            Statement::Insert(table) => {
                state.table_mut(*table)?;
            }
            Statement::Select(select) => {
                state.table_mut(select.table)?;
                check_restrictions(select.table.def(), &select.restrictions)?;
            }
            Statement::CreateKeyspace { .. } | Statement::CreateTable(_) => {}
        }
        Ok(MemoryPrepared {
            statement: statement.clone(),
        })
    }

    async fn batch(&self, prepared: &MemoryPrepared, rows: &[Vec<Value>]) -> Result<(), StoreError> {
        let Statement::Insert(table) = &prepared.statement else {
            return Err(StoreError::InvalidRequest(
                "only inserts are allowed in a batch".to_string(),
            ));
        };

        let mut state = self.lock()?;
        if let Some(remaining) = state.batches_before_failure {
            if remaining == 0 {
                return Err(StoreError::Backend(format!(
                    "write timeout during batch to {}",
                    table
                )));
            }
            state.batches_before_failure = Some(remaining - 1);
        }

        // All rows or none, like a logged batch.
        let def = table.def();
        let keyed = rows
            .iter()
            .map(|row| KeyedRow::new(def, row))
            .collect::<Result<Vec<_>, _>>()?;
        let data = state.table_mut(*table)?;
        for row in keyed {
            data.upsert(def, row);
        }
        state.batches.push((*table, rows.len()));
        debug!(table = %table, rows = rows.len(), "memory batch applied");
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.keyspaces.contains_key(keyspace) {
            return Err(StoreError::InvalidRequest(format!(
                "keyspace {} does not exist",
                keyspace
            )));
        }
        state.current = Some(keyspace.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeId;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    async fn session_with(tables: &[Table]) -> MemorySession {
        let session = MemorySession::new();
        session
            .execute(
                &Statement::CreateKeyspace {
                    name: "ks".to_string(),
                    replication_factor: 1,
                },
                vec![],
            )
            .await
            .unwrap();
        session.use_keyspace("ks").await.unwrap();
        for table in tables {
            session
                .execute(&Statement::CreateTable(*table), vec![])
                .await
                .unwrap();
        }
        session
    }

    fn trade_row(account: &str, day: u32, kind: &str, symbol: &str) -> Vec<Value> {
        let date = NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        vec![
            Value::from(account),
            Value::from(TradeId::from_date(date, day as u16, [day as u8; 6]).unwrap()),
            Value::from(kind),
            Value::from(symbol),
            Value::Int(1),
            Value::Decimal(Decimal::new(100, 2)),
            Value::Decimal(Decimal::new(100, 2)),
        ]
    }

    #[tokio::test]
    async fn test_statements_need_a_keyspace() {
        let session = MemorySession::new();
        let err = session
            .execute(&Statement::CreateTable(Table::AccountsByUser), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
        assert!(session.use_keyspace("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_rows_come_back_in_clustering_order() {
        let session = session_with(&[Table::TradesByType]).await;
        let prepared = session
            .prepare(&Statement::Insert(Table::TradesByType))
            .await
            .unwrap();
        session
            .batch(
                &prepared,
                &[
                    trade_row("a", 3, "sell", "VOO"),
                    trade_row("a", 5, "buy", "VOO"),
                    trade_row("a", 1, "buy", "SPY"),
                ],
            )
            .await
            .unwrap();

        let select = Select::from(Table::TradesByType).with(Restriction::eq("account"));
        let rows = session
            .execute(&Statement::Select(select), vec![Value::from("a")])
            .await
            .unwrap();
        let kinds: Vec<&str> = rows.iter().map(|r| r.text(2).unwrap()).collect();
        let days: Vec<u32> = rows
            .iter()
            .map(|r| {
                use chrono::Datelike;
                r.timeuuid(1).unwrap().trade_date().day()
            })
            .collect();
        assert_eq!(kinds, vec!["buy", "buy", "sell"]);
        assert_eq!(days, vec![5, 1, 3]);
    }

    #[tokio::test]
    async fn test_select_requires_partition_key() {
        let session = session_with(&[Table::TradesBySymbol]).await;
        let select = Select::from(Table::TradesBySymbol).with(Restriction::eq("symbol"));
        let err = session
            .execute(&Statement::Select(select), vec![Value::from("VOO")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_clustering_prefix_enforced() {
        let session = session_with(&[Table::TradesByTypeAndSymbol]).await;
        let select = Select::from(Table::TradesByTypeAndSymbol)
            .with(Restriction::eq("account"))
            .with(Restriction::eq("symbol"));
        let err = session
            .execute(
                &Statement::Select(select),
                vec![Value::from("a"), Value::from("VOO")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_time_range_and_limit() {
        let session = session_with(&[Table::TradesByAccount]).await;
        let prepared = session
            .prepare(&Statement::Insert(Table::TradesByAccount))
            .await
            .unwrap();
        let rows: Vec<_> = (1..=9).map(|d| trade_row("a", d, "buy", "VOO")).collect();
        session.batch(&prepared, &rows).await.unwrap();

        let select = Select::from(Table::TradesByAccount)
            .with(Restriction::eq("account"))
            .with(Restriction::since("trade_id"))
            .with(Restriction::until("trade_id"))
            .limit(2);
        let from = Utc.with_ymd_and_hms(2020, 1, 3, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2020, 1, 6, 23, 59, 59).unwrap();
        let found = session
            .execute(
                &Statement::Select(select),
                vec![Value::from("a"), Value::Timestamp(from), Value::Timestamp(to)],
            )
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = found
            .iter()
            .map(|r| r.timeuuid(1).unwrap().trade_date())
            .collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_static_column_shared_across_partition() {
        let session = session_with(&[Table::AccountsByUser]).await;
        let prepared = session
            .prepare(&Statement::Insert(Table::AccountsByUser))
            .await
            .unwrap();
        session
            .batch(
                &prepared,
                &[
                    vec![
                        Value::from("tom"),
                        Value::from("b"),
                        Value::Decimal(Decimal::ONE),
                        Value::from("Tomas Train"),
                    ],
                    vec![
                        Value::from("tom"),
                        Value::from("a"),
                        Value::Decimal(Decimal::TEN),
                        Value::Null,
                    ],
                ],
            )
            .await
            .unwrap();

        let select = Select::from(Table::AccountsByUser).with(Restriction::eq("username"));
        let rows = session
            .execute(&Statement::Select(select), vec![Value::from("tom")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(1).unwrap(), "a");
        assert_eq!(rows[0].text(3).unwrap(), "Tomas Train");
        assert_eq!(rows[1].text(3).unwrap(), "Tomas Train");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let session = session_with(&[Table::TradesByAccount]).await;
        let prepared = session
            .prepare(&Statement::Insert(Table::TradesByAccount))
            .await
            .unwrap();
        session.fail_after_batches(1);
        session
            .batch(&prepared, &[trade_row("a", 1, "buy", "VOO")])
            .await
            .unwrap();
        let err = session
            .batch(&prepared, &[trade_row("a", 2, "buy", "VOO")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(session.batch_sizes(), vec![1]);
        assert_eq!(session.row_count(Table::TradesByAccount), 1);
    }

    #[tokio::test]
    async fn test_batch_with_null_key_writes_nothing() {
        let session = session_with(&[Table::TradesByAccount]).await;
        let prepared = session
            .prepare(&Statement::Insert(Table::TradesByAccount))
            .await
            .unwrap();
        let mut bad = trade_row("a", 2, "buy", "VOO");
        bad[1] = Value::Null;
        let err = session
            .batch(
                &prepared,
                &[
                    trade_row("a", 1, "buy", "VOO"),
                    bad,
                    trade_row("a", 3, "sell", "VOO"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
        assert_eq!(session.row_count(Table::TradesByAccount), 0);
        assert!(session.batch_sizes().is_empty());
    }
}
