//! SQLite schema for snapshots, history and subscriptions.

pub const SCHEMA_SQL: &str = r#"
-- Rankings: tracked sources, edited by admin/config only
CREATE TABLE IF NOT EXISTS rankings (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    source_url TEXT NOT NULL,
    update_frequency INTEGER NOT NULL,
    last_updated TEXT
);

-- Current snapshot: full set replaced every successful run
CREATE TABLE IF NOT EXISTS ranking_items (
    id TEXT PRIMARY KEY,
    ranking_id TEXT NOT NULL REFERENCES rankings(id),
    position INTEGER NOT NULL,
    item_id TEXT NOT NULL,
    item_name TEXT NOT NULL,
    item_image TEXT,
    score REAL,
    metadata TEXT,
    timestamp TEXT NOT NULL
);

-- History: append-only change log
CREATE TABLE IF NOT EXISTS ranking_history (
    id TEXT PRIMARY KEY,
    ranking_id TEXT NOT NULL REFERENCES rankings(id),
    item_id TEXT NOT NULL,
    item_name TEXT NOT NULL,
    old_position INTEGER,
    new_position INTEGER NOT NULL,
    change_type TEXT NOT NULL,
    change_amount INTEGER,
    timestamp TEXT NOT NULL
);

-- Subscriptions: user wants change alerts for a ranking
CREATE TABLE IF NOT EXISTS subscriptions (
    user_id TEXT NOT NULL,
    ranking_id TEXT NOT NULL REFERENCES rankings(id),
    notify_on_change INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (user_id, ranking_id)
);

-- Devices: OneSignal push targets, many per user
CREATE TABLE IF NOT EXISTS user_devices (
    user_id TEXT NOT NULL,
    onesignal_player_id TEXT NOT NULL,
    PRIMARY KEY (user_id, onesignal_player_id)
);

CREATE INDEX IF NOT EXISTS idx_items_ranking ON ranking_items(ranking_id);
CREATE INDEX IF NOT EXISTS idx_history_ranking ON ranking_history(ranking_id);
CREATE INDEX IF NOT EXISTS idx_subs_ranking ON subscriptions(ranking_id);
"#;
