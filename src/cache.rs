//! Statement Cache (C3): a SQL-text-keyed prepared statement cache with
//! connection-lifetime scope.
//!
//! `rusqlite::Connection` already carries a built-in prepared-statement
//! cache (`prepare_cached`) with exactly the semantics this component needs
//! — prepare on miss, reuse on hit, keyed by SQL text — so C3 is a thin
//! wrapper around that rather than a hand-rolled `HashMap`. A hand-rolled map
//! would also fight the borrow checker: `rusqlite::CachedStatement<'conn>`
//! borrows its connection, so it cannot be stored independently of it.

use rusqlite::Connection;

/// Large enough that "memoize everything" (spec says unlimited) never
/// evicts a statement still in active use by this workload.
pub const STATEMENT_CACHE_CAPACITY: usize = 512;

/// Configures `conn`'s built-in cache capacity. Call once per connection,
/// right after opening it.
pub fn configure(conn: &Connection) {
    conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
}

/// Empties the cache. Must run before the connection handle is dropped (I3)
/// — called from `close()` and at the start of `reconnect()`.
pub fn flush(conn: &Connection) {
    conn.flush_prepared_statement_cache();
}

/// Current number of cached prepared statements, used by tests asserting
/// P4/S7 (cache is empty immediately after reconnect).
pub fn len(conn: &Connection) -> usize {
    conn.cache_len()
}
