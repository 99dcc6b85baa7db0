use compliancegraph::{
    EntityKind,
    graph_store::{GRAPH_SCHEMA, GRAPH_SCHEMA_VERSION},
    relational::{RELATIONAL_SCHEMA, RELATIONAL_SCHEMA_VERSION, columns},
};
use rusqlite::Connection;

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
        .unwrap()
        .exists([name])
        .unwrap()
}

fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("SELECT name FROM pragma_table_info('{table}')"))
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn test_relational_schema_creates_one_table_per_type() {
    let conn = Connection::open_in_memory().unwrap();
    RELATIONAL_SCHEMA.ensure(&conn).unwrap();
    for kind in EntityKind::ALL {
        assert!(table_exists(&conn, kind.table()), "{}", kind.table());
    }
    assert_eq!(
        RELATIONAL_SCHEMA.read_version(&conn).unwrap(),
        Some(RELATIONAL_SCHEMA_VERSION)
    );
}

#[test]
fn test_row_columns_follow_table_declaration() {
    let conn = Connection::open_in_memory().unwrap();
    RELATIONAL_SCHEMA.ensure(&conn).unwrap();
    for kind in EntityKind::ALL {
        let declared = table_columns(&conn, kind.table());
        let mapped: Vec<String> = columns(kind).iter().map(|c| c.to_string()).collect();
        assert_eq!(declared, mapped, "{}", kind.table());
    }
}

#[test]
fn test_graph_schema_creates_node_and_edge_tables() {
    let conn = Connection::open_in_memory().unwrap();
    GRAPH_SCHEMA.ensure(&conn).unwrap();
    assert!(table_exists(&conn, "graph_nodes"));
    assert!(table_exists(&conn, "graph_edges"));
    assert_eq!(
        GRAPH_SCHEMA.read_version(&conn).unwrap(),
        Some(GRAPH_SCHEMA_VERSION)
    );
}

#[test]
fn test_both_schemas_can_share_a_database() {
    let conn = Connection::open_in_memory().unwrap();
    RELATIONAL_SCHEMA.ensure(&conn).unwrap();
    GRAPH_SCHEMA.ensure(&conn).unwrap();
    RELATIONAL_SCHEMA.ensure(&conn).unwrap();
    assert_eq!(
        RELATIONAL_SCHEMA.read_version(&conn).unwrap(),
        Some(RELATIONAL_SCHEMA_VERSION)
    );
    assert_eq!(
        GRAPH_SCHEMA.read_version(&conn).unwrap(),
        Some(GRAPH_SCHEMA_VERSION)
    );
}
