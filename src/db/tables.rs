//! Table definitions for the six denormalized tables.
//!
//! Column names, types, key layout, and clustering order are the on-disk
//! contract; the CQL DDL is rendered from these definitions.
//!
//! Share counts (`shares`) and position sizes (`quantity`) are `INT`. An
//! earlier schema stored both as `DECIMAL`. Tables created by it keep that
//! type under `IF NOT EXISTS`, and their rows do not decode here, so the
//! keyspace has to be dropped and repopulated. Money columns (`cash_balance`,
//! `price`, `amount`) are `DECIMAL` in both.

/// CQL column types used by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlType {
    Text,
    Int,
    Decimal,
    TimeUuid,
}

impl CqlType {
    pub fn as_cql(&self) -> &'static str {
        match self {
            CqlType::Text => "TEXT",
            CqlType::Int => "INT",
            CqlType::Decimal => "DECIMAL",
            CqlType::TimeUuid => "TIMEUUID",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusteringOrder {
    Asc,
    Desc,
}

impl ClusteringOrder {
    pub fn as_cql(&self) -> &'static str {
        match self {
            ClusteringOrder::Asc => "ASC",
            ClusteringOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub cql_type: CqlType,
    /// One value per partition.
    pub is_static: bool,
}

const fn col(name: &'static str, cql_type: CqlType) -> ColumnDef {
    ColumnDef {
        name,
        cql_type,
        is_static: false,
    }
}

const fn static_col(name: &'static str, cql_type: CqlType) -> ColumnDef {
    ColumnDef {
        name,
        cql_type,
        is_static: true,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub partition_key: &'static [&'static str],
    pub clustering: &'static [(&'static str, ClusteringOrder)],
}

impl TableDef {
    /// Position of `column` in the definition (and in every full-row select).
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    pub fn is_partition_key(&self, column: &str) -> bool {
        self.partition_key.contains(&column)
    }
}

/// Column layout shared by the four trade tables.
pub const TRADE_COLUMNS: &[ColumnDef] = &[
    col("account", CqlType::Text),
    col("trade_id", CqlType::TimeUuid),
    col("type", CqlType::Text),
    col("symbol", CqlType::Text),
    col("shares", CqlType::Int),
    col("price", CqlType::Decimal),
    col("amount", CqlType::Decimal),
];

static ACCOUNTS_BY_USER: TableDef = TableDef {
    name: "accounts_by_user",
    columns: &[
        col("username", CqlType::Text),
        col("account_number", CqlType::Text),
        col("cash_balance", CqlType::Decimal),
        static_col("name", CqlType::Text),
    ],
    partition_key: &["username"],
    clustering: &[("account_number", ClusteringOrder::Asc)],
};

static POSITIONS_BY_ACCOUNT: TableDef = TableDef {
    name: "positions_by_account",
    columns: &[
        col("account", CqlType::Text),
        col("symbol", CqlType::Text),
        col("quantity", CqlType::Int),
    ],
    partition_key: &["account"],
    clustering: &[("symbol", ClusteringOrder::Asc)],
};

static TRADES_BY_A_D: TableDef = TableDef {
    name: "trades_by_a_d",
    columns: TRADE_COLUMNS,
    partition_key: &["account"],
    clustering: &[("trade_id", ClusteringOrder::Desc)],
};

static TRADES_BY_A_TD: TableDef = TableDef {
    name: "trades_by_a_td",
    columns: TRADE_COLUMNS,
    partition_key: &["account"],
    clustering: &[
        ("type", ClusteringOrder::Asc),
        ("trade_id", ClusteringOrder::Desc),
    ],
};

static TRADES_BY_A_STD: TableDef = TableDef {
    name: "trades_by_a_std",
    columns: TRADE_COLUMNS,
    partition_key: &["account"],
    clustering: &[
        ("type", ClusteringOrder::Asc),
        ("symbol", ClusteringOrder::Asc),
        ("trade_id", ClusteringOrder::Desc),
    ],
};

static TRADES_BY_A_SD: TableDef = TableDef {
    name: "trades_by_a_sd",
    columns: TRADE_COLUMNS,
    partition_key: &["account"],
    clustering: &[
        ("symbol", ClusteringOrder::Asc),
        ("trade_id", ClusteringOrder::Desc),
    ],
};

/// The tables of the investments keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    AccountsByUser,
    PositionsByAccount,
    /// `trades_by_a_d`
    TradesByAccount,
    /// `trades_by_a_td`
    TradesByType,
    /// `trades_by_a_std`
    TradesByTypeAndSymbol,
    /// `trades_by_a_sd`
    TradesBySymbol,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::AccountsByUser,
        Table::PositionsByAccount,
        Table::TradesByAccount,
        Table::TradesByType,
        Table::TradesByTypeAndSymbol,
        Table::TradesBySymbol,
    ];

    /// Every table holding a copy of each trade, in fan-out order.
    pub const TRADES: [Table; 4] = [
        Table::TradesByAccount,
        Table::TradesByType,
        Table::TradesByTypeAndSymbol,
        Table::TradesBySymbol,
    ];

    pub fn def(&self) -> &'static TableDef {
        match self {
            Table::AccountsByUser => &ACCOUNTS_BY_USER,
            Table::PositionsByAccount => &POSITIONS_BY_ACCOUNT,
            Table::TradesByAccount => &TRADES_BY_A_D,
            Table::TradesByType => &TRADES_BY_A_TD,
            Table::TradesByTypeAndSymbol => &TRADES_BY_A_STD,
            Table::TradesBySymbol => &TRADES_BY_A_SD,
        }
    }

    pub fn name(&self) -> &'static str {
        self.def().name
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
