//! SQLite-backed declaration store

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::schema;
use super::snapshot::StoreSnapshot;
use super::{DeclStore, DocLength, ErrorSetRef, Visibility};
use crate::category::Category;
use crate::ids::{DeclHandle, ErrorNodeId};
use crate::{Error, Result};

/// Declaration store persisted in a SQLite snapshot database.
///
/// A connection is not reentrant, so every read goes through one mutex.
/// A poisoned lock means the store can no longer be trusted and surfaces as
/// `Error::StoreUnavailable`.
pub struct SqliteDeclStore {
    conn: Mutex<Connection>,
}

impl SqliteDeclStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StoreUnavailable("sqlite connection lock poisoned".to_string()))
    }

    // ========== Import ==========

    /// Replace the database contents with `snapshot`, in one transaction.
    pub fn import_snapshot(&self, snapshot: &StoreSnapshot) -> Result<()> {
        snapshot.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM error_nodes", [])?;
        tx.execute("DELETE FROM decl_links", [])?;
        tx.execute("DELETE FROM decls", [])?;
        tx.execute("DELETE FROM modules", [])?;

        for (idx, module) in snapshot.modules.iter().enumerate() {
            tx.execute(
                "INSERT INTO modules (idx, name, root) VALUES (?1, ?2, ?3)",
                params![idx as i64, module.name, module.root],
            )?;
        }

        for decl in &snapshot.decls {
            tx.execute(
                r#"
                INSERT INTO decls (handle, category, alias_target, name, fqn, docs_short, docs_full,
                    type_html, source_html, file_path, proto_short, proto_full, doctest,
                    error_set_base, error_set_node)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    decl.handle,
                    decl.category,
                    decl.alias_target,
                    decl.name,
                    decl.fqn,
                    decl.docs_short,
                    decl.docs_full,
                    decl.type_html,
                    decl.source_html,
                    decl.file_path,
                    decl.proto_short,
                    decl.proto_full,
                    decl.doctest,
                    decl.error_set.map(|set| set.base),
                    decl.error_set.map(|set| set.node.0 as i64),
                ],
            )?;

            let links = decl
                .params
                .iter()
                .map(|&target| (schema::LINK_PARAM, target, true))
                .chain(decl.fields.iter().map(|&target| (schema::LINK_FIELD, target, true)))
                .chain(decl.members.iter().map(|m| (schema::LINK_MEMBER, m.handle, m.public)));

            let mut positions = [0i64; 3];
            for (kind, target, public) in links {
                let slot = match kind {
                    schema::LINK_PARAM => 0,
                    schema::LINK_FIELD => 1,
                    _ => 2,
                };
                tx.execute(
                    "INSERT INTO decl_links (owner, kind, position, target, public) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![decl.handle, kind, positions[slot], target, public],
                )?;
                positions[slot] += 1;
            }
        }

        for list in &snapshot.error_nodes {
            for (position, error) in list.errors.iter().enumerate() {
                tx.execute(
                    "INSERT INTO error_nodes (base, node, position, error_node) VALUES (?1, ?2, ?3, ?4)",
                    params![list.base, list.node.0 as i64, position as i64, error.0 as i64],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ========== Row helpers ==========

    fn decl_text(&self, handle: DeclHandle, column: &'static str) -> Result<String> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM decls WHERE handle = ?1", column);
        conn.query_row(&sql, [handle.raw()], |row| row.get::<_, String>(0))
            .optional()?
            .ok_or(Error::OutOfBounds { handle, what: column })
    }

    fn ensure_exists(conn: &Connection, handle: DeclHandle) -> Result<()> {
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM decls WHERE handle = ?1", [handle.raw()], |row| row.get(0))
            .optional()?;
        exists.map(|_| ()).ok_or(Error::OutOfBounds {
            handle,
            what: "declaration",
        })
    }

    fn links(&self, handle: DeclHandle, kind: &str, visibility: Visibility) -> Result<Vec<DeclHandle>> {
        let conn = self.conn()?;
        Self::ensure_exists(&conn, handle)?;

        let mut stmt = conn.prepare(
            "SELECT target, public FROM decl_links WHERE owner = ?1 AND kind = ?2 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![handle.raw(), kind], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, bool>(1)?))
        })?;

        let mut handles = Vec::new();
        for row in rows {
            let (target, public) = row?;
            if !public && visibility == Visibility::PublicOnly {
                continue;
            }
            if let Some(target) = DeclHandle::from_raw(target) {
                handles.push(target);
            }
        }
        Ok(handles)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(DbStats {
            modules: count("modules")?,
            decls: count("decls")?,
            links: count("decl_links")?,
            error_nodes: count("error_nodes")?,
        })
    }
}

impl DeclStore for SqliteDeclStore {
    fn category(&self, handle: DeclHandle) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let code: i64 = conn
            .query_row("SELECT category FROM decls WHERE handle = ?1", [handle.raw()], |row| row.get(0))
            .optional()?
            .ok_or(Error::OutOfBounds { handle, what: "category" })?;
        Ok(u8::try_from(code).ok().and_then(Category::from_code))
    }

    fn alias_target(&self, handle: DeclHandle) -> Result<Option<DeclHandle>> {
        let conn = self.conn()?;
        let target: Option<u32> = conn
            .query_row("SELECT alias_target FROM decls WHERE handle = ?1", [handle.raw()], |row| row.get(0))
            .optional()?
            .ok_or(Error::OutOfBounds { handle, what: "alias target" })?;
        Ok(target.and_then(DeclHandle::from_raw))
    }

    fn name(&self, handle: DeclHandle) -> Result<String> {
        self.decl_text(handle, "name")
    }

    fn fqn(&self, handle: DeclHandle) -> Result<Option<String>> {
        let conn = self.conn()?;
        let fqn: Option<String> = conn
            .query_row("SELECT fqn FROM decls WHERE handle = ?1", [handle.raw()], |row| row.get(0))
            .optional()?
            .ok_or(Error::OutOfBounds { handle, what: "fqn" })?;
        Ok(fqn.filter(|fqn| !fqn.is_empty()))
    }

    fn docs_html(&self, handle: DeclHandle, length: DocLength) -> Result<String> {
        match length {
            DocLength::Short => self.decl_text(handle, "docs_short"),
            DocLength::Full => self.decl_text(handle, "docs_full"),
        }
    }

    fn type_html(&self, handle: DeclHandle) -> Result<String> {
        self.decl_text(handle, "type_html")
    }

    fn source_html(&self, handle: DeclHandle) -> Result<String> {
        self.decl_text(handle, "source_html")
    }

    fn file_path(&self, handle: DeclHandle) -> Result<String> {
        self.decl_text(handle, "file_path")
    }

    fn params(&self, handle: DeclHandle) -> Result<Vec<DeclHandle>> {
        self.links(handle, schema::LINK_PARAM, Visibility::IncludePrivate)
    }

    fn fields(&self, handle: DeclHandle) -> Result<Vec<DeclHandle>> {
        self.links(handle, schema::LINK_FIELD, Visibility::IncludePrivate)
    }

    fn members(&self, handle: DeclHandle, visibility: Visibility) -> Result<Vec<DeclHandle>> {
        self.links(handle, schema::LINK_MEMBER, visibility)
    }

    fn fn_proto_html(&self, handle: DeclHandle, length: DocLength) -> Result<String> {
        match length {
            DocLength::Short => self.decl_text(handle, "proto_short"),
            DocLength::Full => self.decl_text(handle, "proto_full"),
        }
    }

    fn doctest_html(&self, handle: DeclHandle) -> Result<String> {
        self.decl_text(handle, "doctest")
    }

    fn error_set(&self, handle: DeclHandle) -> Result<Option<ErrorSetRef>> {
        let conn = self.conn()?;
        let (base, node): (Option<u32>, Option<i64>) = conn
            .query_row(
                "SELECT error_set_base, error_set_node FROM decls WHERE handle = ?1",
                [handle.raw()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(Error::OutOfBounds { handle, what: "error set" })?;

        let base = base.and_then(DeclHandle::from_raw);
        let node = node.map(|n| ErrorNodeId(n as u64)).filter(|n| !n.is_empty());
        Ok(base.zip(node).map(|(base, node)| ErrorSetRef { base, node }))
    }

    fn error_nodes(&self, error_set: &ErrorSetRef) -> Result<Vec<ErrorNodeId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT error_node FROM error_nodes WHERE base = ?1 AND node = ?2 ORDER BY position",
        )?;
        let rows = stmt.query_map(
            params![error_set.base.raw(), error_set.node.0 as i64],
            |row| row.get::<_, i64>(0),
        )?;

        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(ErrorNodeId(row? as u64));
        }
        Ok(nodes)
    }

    fn lookup(&self, fqn: &str) -> Result<Option<DeclHandle>> {
        let conn = self.conn()?;
        let handle: Option<u32> = conn
            .query_row(
                "SELECT handle FROM decls WHERE fqn = ?1 ORDER BY handle LIMIT 1",
                [fqn],
                |row| row.get(0),
            )
            .optional()?;
        Ok(handle.and_then(DeclHandle::from_raw))
    }

    fn module_name(&self, index: u32) -> Result<String> {
        let conn = self.conn()?;
        let name: Option<String> = conn
            .query_row("SELECT name FROM modules WHERE idx = ?1", [index], |row| row.get(0))
            .optional()?;
        Ok(name.unwrap_or_default())
    }

    fn module_root(&self, name: &str) -> Result<Option<DeclHandle>> {
        let conn = self.conn()?;
        let root: Option<Option<u32>> = conn
            .query_row("SELECT root FROM modules WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(root.flatten().and_then(DeclHandle::from_raw))
    }
}

/// Statistics about a SQLite declaration store
#[derive(Debug, Clone)]
pub struct DbStats {
    pub modules: usize,
    pub decls: usize,
    pub links: usize,
    pub error_nodes: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Declaration Store Statistics:")?;
        writeln!(f, "  Modules: {}", self.modules)?;
        writeln!(f, "  Declarations: {}", self.decls)?;
        writeln!(f, "  Links: {}", self.links)?;
        writeln!(f, "  Error nodes: {}", self.error_nodes)
    }
}
