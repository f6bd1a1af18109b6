//! Database schema definitions for the SQLite declaration store

/// SQL to create the modules table, in enumeration order
pub const CREATE_MODULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS modules (
    idx INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    root INTEGER
)
"#;

/// SQL to create the decls table
///
/// `error_set_node` holds a u64 bit-cast to INTEGER.
pub const CREATE_DECLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS decls (
    handle INTEGER PRIMARY KEY,
    category INTEGER NOT NULL,
    alias_target INTEGER,
    name TEXT NOT NULL,
    fqn TEXT,
    docs_short TEXT NOT NULL DEFAULT '',
    docs_full TEXT NOT NULL DEFAULT '',
    type_html TEXT NOT NULL DEFAULT '',
    source_html TEXT NOT NULL DEFAULT '',
    file_path TEXT NOT NULL DEFAULT '',
    proto_short TEXT NOT NULL DEFAULT '',
    proto_full TEXT NOT NULL DEFAULT '',
    doctest TEXT NOT NULL DEFAULT '',
    error_set_base INTEGER,
    error_set_node INTEGER
)
"#;

/// SQL to create the decl_links table
///
/// One row per parameter, field or member edge; `position` preserves
/// store order.
pub const CREATE_DECL_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS decl_links (
    owner INTEGER NOT NULL,
    kind TEXT NOT NULL,
    position INTEGER NOT NULL,
    target INTEGER NOT NULL,
    public INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (owner, kind, position)
)
"#;

/// SQL to create the error_nodes table
pub const CREATE_ERROR_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS error_nodes (
    base INTEGER NOT NULL,
    node INTEGER NOT NULL,
    position INTEGER NOT NULL,
    error_node INTEGER NOT NULL,
    PRIMARY KEY (base, node, position)
)
"#;

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_decls_fqn ON decls(fqn)",
    "CREATE INDEX IF NOT EXISTS idx_modules_name ON modules(name)",
];

/// Link kinds stored in `decl_links.kind`
pub const LINK_PARAM: &str = "param";
pub const LINK_FIELD: &str = "field";
pub const LINK_MEMBER: &str = "member";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_MODULES_TABLE,
        CREATE_DECLS_TABLE,
        CREATE_DECL_LINKS_TABLE,
        CREATE_ERROR_NODES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
