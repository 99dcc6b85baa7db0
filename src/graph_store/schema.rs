use crate::schema::StoreSchema;

pub const GRAPH_SCHEMA_VERSION: i64 = 1;

pub const GRAPH_SCHEMA: StoreSchema = StoreSchema {
    meta_table: "graph_meta",
    version: GRAPH_SCHEMA_VERSION,
    statements: &[r#"
        CREATE TABLE IF NOT EXISTS graph_nodes (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            key   TEXT NOT NULL,
            data  TEXT NOT NULL,
            UNIQUE(label, key)
        );
        CREATE TABLE IF NOT EXISTS graph_edges (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id   INTEGER NOT NULL,
            to_id     INTEGER NOT NULL,
            edge_type TEXT NOT NULL,
            data      TEXT NOT NULL,
            UNIQUE(from_id, to_id, edge_type)
        );
        CREATE INDEX IF NOT EXISTS idx_nodes_label ON graph_nodes(label);
        CREATE INDEX IF NOT EXISTS idx_edges_to ON graph_edges(to_id);
        CREATE INDEX IF NOT EXISTS idx_edges_type ON graph_edges(edge_type);
        "#],
};
