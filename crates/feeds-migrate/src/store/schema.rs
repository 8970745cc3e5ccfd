//! Table definitions used by the SQLite backend.
//!
//! The current schema is what the importer system installs; the legacy
//! schema mirrors the tables the old feed-import module left behind and is
//! only created when seeding fixtures.

/// Tables of the current importer model.
pub const CURRENT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS variable (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feeds_importer (
    id TEXT PRIMARY KEY,
    config TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feeds_source (
    id TEXT NOT NULL,
    feed_nid INTEGER NOT NULL,
    config TEXT NOT NULL,
    PRIMARY KEY (id, feed_nid)
);

CREATE TABLE IF NOT EXISTS feeds_node_item (
    nid INTEGER NOT NULL,
    id TEXT NOT NULL,
    feed_nid INTEGER NOT NULL,
    imported INTEGER NOT NULL DEFAULT 0,
    url TEXT NOT NULL DEFAULT '',
    guid TEXT NOT NULL DEFAULT '',
    hash TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (id, nid)
);

CREATE INDEX IF NOT EXISTS idx_feeds_node_item_feed
    ON feeds_node_item(id, feed_nid);
"#;

/// Tables of the legacy feed-import module.
pub const LEGACY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS variable (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS node_type (
    type TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS node (
    nid INTEGER PRIMARY KEY,
    vid INTEGER NOT NULL,
    type TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS feedapi (
    nid INTEGER NOT NULL,
    vid INTEGER NOT NULL,
    url TEXT,
    PRIMARY KEY (nid, vid)
);

CREATE TABLE IF NOT EXISTS feedapi_mapper (
    nid INTEGER NOT NULL,
    mapping TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feedapi_node_item (
    nid INTEGER PRIMARY KEY,
    url TEXT,
    timestamp INTEGER NOT NULL DEFAULT 0,
    arrived INTEGER NOT NULL DEFAULT 0,
    guid TEXT
);

CREATE TABLE IF NOT EXISTS feedapi_node_item_feed (
    feed_nid INTEGER NOT NULL,
    feed_item_nid INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS feedapi_fast_item (
    fid INTEGER PRIMARY KEY,
    title TEXT,
    description TEXT,
    url TEXT,
    guid TEXT,
    published INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS feedapi_fast_item_feed (
    feed_nid INTEGER NOT NULL,
    feed_item_fid INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS content_node_field_instance (
    field_name TEXT NOT NULL,
    type_name TEXT NOT NULL,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (field_name, type_name)
);
"#;
