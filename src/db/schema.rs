use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS crypto_data (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            snapped_at   TEXT,
            price        REAL,
            market_cap   INTEGER,
            total_volume INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_crypto_data_snapped ON crypto_data(snapped_at DESC);
        ",
    )?;
    Ok(())
}
