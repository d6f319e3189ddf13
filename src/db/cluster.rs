//! Cassandra/ScyllaDB backend over the `scylla` CQL driver.

use super::cql;
use super::session::{Row, Session, Statement, StoreError, Value};
use crate::domain::TradeId;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use scylla::batch::Batch;
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::{CqlDecimal, CqlTimestamp, CqlTimeuuid};
use scylla::prepared_statement::PreparedStatement;
use scylla::SessionBuilder;
use tracing::{debug, info};

/// Driver-backed session, created once at startup and reused for every call.
pub struct ScyllaSession {
    inner: scylla::Session,
}

impl ScyllaSession {
    /// Connect to the cluster through the given contact points (`host:port`).
    ///
    /// # Errors
    /// Returns an error if no contact point accepts the connection.
    pub async fn connect(nodes: &[String]) -> Result<Self, StoreError> {
        info!("Connecting to cluster at {}", nodes.join(","));
        let inner = SessionBuilder::new()
            .known_nodes(nodes)
            .build()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        info!("Connected to cluster");
        Ok(ScyllaSession { inner })
    }
}

fn to_cql(value: Value) -> Result<Option<CqlValue>, StoreError> {
    Ok(match value {
        Value::Null => None,
        Value::Text(s) => Some(CqlValue::Text(s)),
        Value::Int(v) => Some(CqlValue::Int(v)),
        Value::Decimal(d) => Some(CqlValue::Decimal(decimal_to_cql(d))),
        Value::TimeUuid(id) => Some(CqlValue::Timeuuid(CqlTimeuuid::from(*id.as_uuid()))),
        Value::Timestamp(at) => Some(CqlValue::Timestamp(CqlTimestamp(at.timestamp_millis()))),
    })
}

fn from_cql(index: usize, value: Option<CqlValue>) -> Result<Value, StoreError> {
    let decode = |reason: String| StoreError::Decode { index, reason };
    Ok(match value {
        None => Value::Null,
        Some(CqlValue::Text(s)) | Some(CqlValue::Ascii(s)) => Value::Text(s),
        Some(CqlValue::Int(v)) => Value::Int(v),
        Some(CqlValue::Decimal(d)) => Value::Decimal(decimal_from_cql(&d).map_err(decode)?),
        Some(CqlValue::Timeuuid(t)) => {
            Value::TimeUuid(TradeId::from_uuid(*t.as_ref()).map_err(|e| decode(e.to_string()))?)
        }
        Some(CqlValue::Timestamp(ts)) => Value::Timestamp(
            Utc.timestamp_millis_opt(ts.0)
                .single()
                .ok_or_else(|| decode(format!("timestamp out of range: {}", ts.0)))?,
        ),
        Some(other) => return Err(decode(format!("unsupported column type {:?}", other))),
    })
}

/// Encode as a big-endian two's complement unscaled value plus scale.
fn decimal_to_cql(d: Decimal) -> CqlDecimal {
    let bytes = d.mantissa().to_be_bytes();
    // Drop redundant sign-extension bytes, keeping the sign bit intact.
    let mut start = 0;
    while start < bytes.len() - 1 {
        let (b, next) = (bytes[start], bytes[start + 1]);
        if (b == 0x00 && next & 0x80 == 0) || (b == 0xff && next & 0x80 != 0) {
            start += 1;
        } else {
            break;
        }
    }
    CqlDecimal::from_signed_be_bytes_and_exponent(bytes[start..].to_vec(), d.scale() as i32)
}

fn decimal_from_cql(d: &CqlDecimal) -> Result<Decimal, String> {
    let (bytes, scale) = d.as_signed_be_bytes_slice_and_exponent();
    if bytes.len() > 16 {
        return Err(format!("decimal of {} bytes does not fit", bytes.len()));
    }
    let fill = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        0xff
    } else {
        0x00
    };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    let scale = u32::try_from(scale).map_err(|_| format!("negative scale {}", scale))?;
    Decimal::try_from_i128_with_scale(i128::from_be_bytes(buf), scale).map_err(|e| e.to_string())
}

fn to_cql_row(values: Vec<Value>) -> Result<Vec<Option<CqlValue>>, StoreError> {
    values.into_iter().map(to_cql).collect()
}

#[async_trait]
impl Session for ScyllaSession {
    type Prepared = PreparedStatement;

    async fn execute(
        &self,
        statement: &Statement,
        values: Vec<Value>,
    ) -> Result<Vec<Row>, StoreError> {
        let text = cql::render(statement);
        debug!(cql = %text, "execute");
        let result = self
            .inner
            .query(text, to_cql_row(values)?)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        result
            .rows_or_empty()
            .into_iter()
            .map(|row| {
                row.columns
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| from_cql(i, v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Row::new)
            })
            .collect()
    }

    async fn prepare(&self, statement: &Statement) -> Result<PreparedStatement, StoreError> {
        let text = cql::render(statement);
        debug!(cql = %text, "prepare");
        self.inner
            .prepare(text)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn batch(
        &self,
        prepared: &PreparedStatement,
        rows: &[Vec<Value>],
    ) -> Result<(), StoreError> {
        let mut batch = Batch::default();
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            batch.append_statement(prepared.clone());
            values.push(to_cql_row(row.clone())?);
        }
        self.inner
            .batch(&batch, values)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), StoreError> {
        self.inner
            .use_keyspace(keyspace, false)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
