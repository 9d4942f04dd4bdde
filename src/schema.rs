//! Baseline DDL and index metadata for a freshly initialized database.
//!
//! These are the statements `StorageEngine::initialize` runs with
//! `IF NOT EXISTS` guards. Keeping them as constants here (rather than
//! scattered inline in `engine.rs`) makes the persisted layout easy to audit
//! against a single spot and keeps `verify_indices` in sync with what
//! `initialize` actually creates.

/// Every `CREATE TABLE IF NOT EXISTS` statement run during initialization,
/// in dependency order (`history` before `history_fts`, since the FTS table
/// mirrors it via `content_rowid`).
pub const BASELINE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (\
        version INTEGER PRIMARY KEY, \
        applied_at INTEGER NOT NULL\
    )",
    "CREATE TABLE IF NOT EXISTS sessions (\
        id INTEGER PRIMARY KEY AUTOINCREMENT, \
        tabs TEXT NOT NULL, \
        activeTabId TEXT, \
        timestamp INTEGER NOT NULL, \
        version TEXT NOT NULL, \
        created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')*1000)\
    )",
    "CREATE TABLE IF NOT EXISTS tab_groups (\
        id TEXT PRIMARY KEY, \
        name TEXT NOT NULL, \
        color TEXT NOT NULL, \
        tabIds TEXT NOT NULL, \
        isCollapsed INTEGER NOT NULL DEFAULT 0, \
        createdAt INTEGER NOT NULL, \
        created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')*1000)\
    )",
    "CREATE TABLE IF NOT EXISTS history (\
        id INTEGER PRIMARY KEY AUTOINCREMENT, \
        url TEXT NOT NULL, \
        title TEXT, \
        visited_at INTEGER NOT NULL, \
        visit_count INTEGER NOT NULL DEFAULT 1, \
        created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')*1000)\
    )",
    "CREATE TABLE IF NOT EXISTS bookmarks (\
        id TEXT PRIMARY KEY, \
        url TEXT NOT NULL, \
        title TEXT NOT NULL, \
        tags TEXT, \
        favicon TEXT, \
        createdAt INTEGER NOT NULL, \
        updatedAt INTEGER NOT NULL, \
        created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')*1000)\
    )",
    "CREATE TABLE IF NOT EXISTS settings (\
        key TEXT PRIMARY KEY, \
        value TEXT NOT NULL, \
        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')*1000)\
    )",
    "CREATE TABLE IF NOT EXISTS workspaces (\
        id TEXT PRIMARY KEY, \
        name TEXT NOT NULL UNIQUE, \
        description TEXT, \
        createdAt INTEGER NOT NULL, \
        updatedAt INTEGER NOT NULL, \
        sessionSnapshot TEXT NOT NULL, \
        tags TEXT, \
        created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')*1000)\
    )",
    "CREATE VIRTUAL TABLE IF NOT EXISTS history_fts USING fts5(\
        url, title, content='history', content_rowid='id'\
    )",
];

/// `(index name, creating statement)` pairs. Kept paired so `verify_indices`
/// can report exactly the names spec'd without re-parsing DDL.
pub const BASELINE_INDICES: &[(&str, &str)] = &[
    (
        "idx_sessions_timestamp",
        "CREATE INDEX IF NOT EXISTS idx_sessions_timestamp ON sessions(timestamp DESC)",
    ),
    (
        "idx_tab_groups_createdAt",
        "CREATE INDEX IF NOT EXISTS idx_tab_groups_createdAt ON tab_groups(createdAt DESC)",
    ),
    (
        "idx_history_url",
        "CREATE INDEX IF NOT EXISTS idx_history_url ON history(url)",
    ),
    (
        "idx_history_visited_at",
        "CREATE INDEX IF NOT EXISTS idx_history_visited_at ON history(visited_at DESC)",
    ),
    (
        "idx_bookmarks_url",
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks(url)",
    ),
    (
        "idx_bookmarks_createdAt",
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_createdAt ON bookmarks(createdAt DESC)",
    ),
    (
        "idx_workspaces_name",
        "CREATE INDEX IF NOT EXISTS idx_workspaces_name ON workspaces(name)",
    ),
    (
        "idx_workspaces_updatedAt",
        "CREATE INDEX IF NOT EXISTS idx_workspaces_updatedAt ON workspaces(updatedAt DESC)",
    ),
];

/// Tables cleared by `StorageEngine::reset()`. See DESIGN.md for why this
/// list is narrower than `TRUNCATE_ALL_TABLES`.
pub const RESET_TABLES: &[&str] = &["sessions", "tab_groups", "schema_version"];

/// Tables cleared by `StorageEngine::truncate_all()`.
pub const TRUNCATE_ALL_TABLES: &[&str] = &[
    "sessions",
    "tab_groups",
    "history",
    "bookmarks",
    "settings",
    "workspaces",
    "schema_version",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_indices_cover_minimum_required_set() {
        let names: Vec<&str> = BASELINE_INDICES.iter().map(|(n, _)| *n).collect();
        assert!(names.contains(&"idx_sessions_timestamp"));
        assert!(names.contains(&"idx_tab_groups_createdAt"));
    }

    #[test]
    fn test_reset_tables_excludes_history_bookmarks_settings_workspaces() {
        assert!(!RESET_TABLES.contains(&"history"));
        assert!(!RESET_TABLES.contains(&"bookmarks"));
        assert!(!RESET_TABLES.contains(&"settings"));
        assert!(!RESET_TABLES.contains(&"workspaces"));
    }

    #[test]
    fn test_truncate_all_covers_every_table() {
        assert_eq!(TRUNCATE_ALL_TABLES.len(), 7);
    }
}
