//! Canonical SQLite schema for stackboard.
//!
//! - `items` holds one row per work item, including soft-deleted ones
//! - `item_tags` models the multi-valued tag set
//! - `users` is the user-lookup collaborator, joined as an outer join
//! - `repo_admins` backs the repository-administrator check
//!
//! The schema version lives in `PRAGMA user_version` only.
//!
//! `items.parent_id` is deliberately not a foreign key: it is a weak
//! reference, and an empty string is read the same as `NULL`.

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY CHECK (length(trim(user_id)) > 0),
    name TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS repo_admins (
    repo TEXT NOT NULL CHECK (length(trim(repo)) > 0),
    user_id TEXT NOT NULL CHECK (length(trim(user_id)) > 0),
    granted_at_us INTEGER NOT NULL,
    PRIMARY KEY (repo, user_id)
);

CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY,
    project TEXT NOT NULL CHECK (length(trim(project)) > 0),
    repo TEXT NOT NULL CHECK (length(trim(repo)) > 0),
    title TEXT NOT NULL,
    description TEXT,
    kind TEXT NOT NULL CHECK (kind IN ('epic', 'issue', 'task')),
    state TEXT NOT NULL CHECK (state IN ('todo', 'doing', 'done')),
    parent_id TEXT,
    stack_rank TEXT NOT NULL CHECK (length(stack_rank) > 0),
    area TEXT NOT NULL DEFAULT '',
    assigned_to TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    deleted_at_us INTEGER,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> item_id)
);

CREATE TABLE IF NOT EXISTS item_tags (
    item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (item_id, tag)
);
";

/// Migration v2: read-path indexes for partitions, filters, and tags.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_items_sibling_rank
    ON items(project, repo, parent_id, stack_rank);

CREATE INDEX IF NOT EXISTS idx_items_kind_state_rank
    ON items(project, repo, kind, state, stack_rank);

CREATE INDEX IF NOT EXISTS idx_items_assigned
    ON items(assigned_to, item_id);

CREATE INDEX IF NOT EXISTS idx_items_deleted
    ON items(is_deleted, project, repo);

CREATE INDEX IF NOT EXISTS idx_item_tags_tag
    ON item_tags(tag, item_id);
";

/// Indexes expected by the board, backlog, and reorder query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_items_sibling_rank",
    "idx_items_kind_state_rank",
    "idx_items_assigned",
    "idx_items_deleted",
    "idx_item_tags_tag",
];
