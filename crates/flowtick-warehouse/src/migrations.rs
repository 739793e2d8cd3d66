use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_option_trades",
        sql: r#"
CREATE SEQUENCE IF NOT EXISTS option_trades_id_seq START 1;

CREATE TABLE IF NOT EXISTS option_trades (
    id BIGINT PRIMARY KEY DEFAULT nextval('option_trades_id_seq'),
    trade_id VARCHAR NOT NULL UNIQUE,
    timestamp BIGINT NOT NULL,
    creation_date BIGINT NOT NULL,
    order_id BIGINT NOT NULL,
    symbol VARCHAR NOT NULL,
    trade_type VARCHAR NOT NULL,
    details VARCHAR,
    bid_ask VARCHAR,
    contract_price DECIMAL(38, 10) NOT NULL,
    volume BIGINT NOT NULL,
    option_type VARCHAR NOT NULL,
    strike DECIMAL(38, 10) NOT NULL,
    spot DECIMAL(38, 10) NOT NULL,
    premium DECIMAL(38, 10) NOT NULL,
    expiration BIGINT,
    color VARCHAR NOT NULL,
    implied_volatility DECIMAL(38, 10) NOT NULL,
    dte BIGINT NOT NULL,
    earnings_report VARCHAR NOT NULL,
    security_type VARCHAR NOT NULL,
    sector VARCHAR NOT NULL,
    unusual_activity VARCHAR NOT NULL,
    weekly_option VARCHAR NOT NULL,
    market_cap BIGINT NOT NULL,
    open_interest BIGINT NOT NULL,
    itm VARCHAR NOT NULL,
    ex_div VARCHAR NOT NULL,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL
);
"#,
    },
    Migration {
        version: "0002_option_trades_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_option_trades_creation_date ON option_trades(creation_date);
CREATE INDEX IF NOT EXISTS idx_option_trades_symbol ON option_trades(symbol);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
