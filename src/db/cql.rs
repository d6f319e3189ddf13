//! CQL rendering for typed statements.

use super::session::{Relation, Select, Statement};
use super::tables::TableDef;

/// Render a statement as CQL text with `?` placeholders.
pub fn render(statement: &Statement) -> String {
    match statement {
        Statement::CreateKeyspace {
            name,
            replication_factor,
        } => create_keyspace(name, *replication_factor),
        Statement::CreateTable(table) => create_table(table.def()),
        Statement::Insert(table) => insert(table.def()),
        Statement::Select(select) => self::select(select),
    }
}

fn create_keyspace(name: &str, replication_factor: u32) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
         {{ 'class' : 'SimpleStrategy', 'replication_factor' : {} }}",
        name, replication_factor
    )
}

fn create_table(def: &TableDef) -> String {
    let columns = def
        .columns
        .iter()
        .map(|c| {
            if c.is_static {
                format!("{} {} STATIC", c.name, c.cql_type.as_cql())
            } else {
                format!("{} {}", c.name, c.cql_type.as_cql())
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut primary_key = format!("({})", def.partition_key.join(", "));
    for (column, _) in def.clustering {
        primary_key.push_str(", ");
        primary_key.push_str(column);
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
        def.name, columns, primary_key
    );
    if !def.clustering.is_empty() {
        let order = def
            .clustering
            .iter()
            .map(|(column, order)| format!("{} {}", column, order.as_cql()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" WITH CLUSTERING ORDER BY ({})", order));
    }
    sql
}

fn insert(def: &TableDef) -> String {
    let names: Vec<&str> = def.columns.iter().map(|c| c.name).collect();
    let marks = vec!["?"; names.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        def.name,
        names.join(", "),
        marks
    )
}

fn select(select: &Select) -> String {
    let def = select.table.def();
    let names: Vec<&str> = def.columns.iter().map(|c| c.name).collect();
    let mut sql = format!("SELECT {} FROM {}", names.join(", "), def.name);

    for (i, restriction) in select.restrictions.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        let term = match restriction.relation {
            Relation::Eq => format!("{} = ?", restriction.column),
            Relation::SinceTime => format!("{} >= minTimeuuid(?)", restriction.column),
            Relation::UntilTime => format!("{} <= maxTimeuuid(?)", restriction.column),
        };
        sql.push_str(&term);
    }

    if let Some(limit) = select.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::session::Restriction;
    use crate::db::tables::Table;

    #[test]
    fn test_create_keyspace() {
        let cql = render(&Statement::CreateKeyspace {
            name: "investments".to_string(),
            replication_factor: 3,
        });
        assert_eq!(
            cql,
            "CREATE KEYSPACE IF NOT EXISTS investments WITH REPLICATION = \
             { 'class' : 'SimpleStrategy', 'replication_factor' : 3 }"
        );
    }

    #[test]
    fn test_create_accounts_table_has_static_name() {
        let cql = render(&Statement::CreateTable(Table::AccountsByUser));
        assert_eq!(
            cql,
            "CREATE TABLE IF NOT EXISTS accounts_by_user (username TEXT, account_number TEXT, \
             cash_balance DECIMAL, name TEXT STATIC, PRIMARY KEY ((username), account_number)) \
             WITH CLUSTERING ORDER BY (account_number ASC)"
        );
    }

    #[test]
    fn test_create_type_symbol_trade_table() {
        let cql = render(&Statement::CreateTable(Table::TradesByTypeAndSymbol));
        assert_eq!(
            cql,
            "CREATE TABLE IF NOT EXISTS trades_by_a_std (account TEXT, trade_id TIMEUUID, \
             type TEXT, symbol TEXT, shares INT, price DECIMAL, amount DECIMAL, \
             PRIMARY KEY ((account), type, symbol, trade_id)) \
             WITH CLUSTERING ORDER BY (type ASC, symbol ASC, trade_id DESC)"
        );
    }

    #[test]
    fn test_insert() {
        let cql = render(&Statement::Insert(Table::PositionsByAccount));
        assert_eq!(
            cql,
            "INSERT INTO positions_by_account (account, symbol, quantity) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_select_with_range_and_limit() {
        let select = Select::from(Table::TradesByType)
            .with(Restriction::eq("account"))
            .with(Restriction::eq("type"))
            .with(Restriction::since("trade_id"))
            .with(Restriction::until("trade_id"))
            .limit(10);
        assert_eq!(
            render(&Statement::Select(select)),
            "SELECT account, trade_id, type, symbol, shares, price, amount FROM trades_by_a_td \
             WHERE account = ? AND type = ? AND trade_id >= minTimeuuid(?) \
             AND trade_id <= maxTimeuuid(?) LIMIT 10"
        );
    }
}
