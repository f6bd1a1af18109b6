use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use docroute::cache::{fingerprint_file, RouteCache};
use docroute::config::{
    default_cache_path, default_config_path, force_regenerate_from_env, write_config, DocrouteConfig,
};
use docroute::server::{start_server, AppState};
use docroute::session::{RouteSet, RouteSource};
use docroute::store::{open_store, SqliteDeclStore, StoreSnapshot};
use docroute::ui::{
    alias_arrow, dim, header, info, module_line, routes_table, section, stats_table, status, success,
    summary_row, Icons, ProgressManager, Spinner,
};
use docroute::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Store selection shared by every command that reads one
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Declaration store (.db/.sqlite for SQLite, anything else is a JSON snapshot)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Route cache file
    #[arg(short, long)]
    pub cache: Option<PathBuf>,

    /// Enumeration worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl StoreArgs {
    fn store_path(&self, config: &DocrouteConfig) -> anyhow::Result<PathBuf> {
        self.store
            .clone()
            .or_else(|| config.store.as_ref().map(PathBuf::from))
            .context("no declaration store given; pass --store or set `store` in docroute.toml")
    }

    fn cache(&self, config: &DocrouteConfig) -> RouteCache {
        let path = self
            .cache
            .clone()
            .or_else(|| config.cache.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_cache_path);
        RouteCache::new(path)
    }
}

pub fn emit_success<T: Serialize>(command: &str, data: T) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn open_session(config: &DocrouteConfig, args: &StoreArgs) -> anyhow::Result<(Session, PathBuf)> {
    let path = args.store_path(config)?;
    let mut options = config.session_options();
    if let Some(workers) = args.workers {
        options.workers = workers.max(1);
    }

    let store = open_store(&path).with_context(|| format!("failed to open store {}", path.display()))?;
    Ok((Session::with_options(store, options), path))
}

fn fingerprint(store_path: &Path) -> Option<String> {
    match fingerprint_file(store_path) {
        Ok(fp) => Some(fp),
        Err(e) => {
            tracing::warn!("Could not fingerprint {}: {}", store_path.display(), e);
            None
        }
    }
}

fn load_routes(
    config: &DocrouteConfig,
    args: &StoreArgs,
    force: bool,
    output: OutputMode,
) -> anyhow::Result<(Session, RouteCache, RouteSet)> {
    let (session, store_path) = open_session(config, args)?;
    let cache = args.cache(config);
    let force = force || force_regenerate_from_env();
    let fp = fingerprint(&store_path);

    if !output.is_human() {
        let set = session.routes(&cache, force, fp.as_deref())?;
        return Ok((session, cache, set));
    }

    let started = Instant::now();
    let (progress, tx) = ProgressManager::new();
    let session = session.with_progress(tx);
    let set = session.routes(&cache, force, fp.as_deref())?;

    let modules: BTreeSet<&str> = set.routes.iter().map(|r| r.module.as_str()).collect();
    progress.finish_with_summary(started.elapsed(), modules.len(), set.routes.len());
    Ok((session, cache, set))
}

pub fn run_routes(
    config: &DocrouteConfig,
    args: &StoreArgs,
    force: bool,
    limit: usize,
    output: OutputMode,
) -> anyhow::Result<()> {
    let (_session, cache, set) = load_routes(config, args, force, output)?;

    if !output.is_human() {
        return emit_success(
            "routes",
            serde_json::json!({
                "from_cache": set.from_cache(),
                "cache": cache.path(),
                "routes": set.routes,
            }),
        );
    }

    section("Routes");
    let cache_path = cache.path().display().to_string();
    let routes = set.routes.len().to_string();
    match &set.source {
        RouteSource::Cache => {
            println!(
                "{}",
                stats_table(&[("Source", "cache"), ("Cache", &cache_path), ("Routes", &routes)])
            );
        }
        RouteSource::Enumerated(stats) => {
            let modules = format!("{} ({} failed)", stats.modules, stats.failed_modules);
            let duplicates = stats.duplicates.to_string();
            let unnamed = stats.unnamed.to_string();
            let failed = stats.failed.to_string();
            println!(
                "{}",
                stats_table(&[
                    ("Source", "enumerated"),
                    ("Cache", &cache_path),
                    ("Modules", &modules),
                    ("Routes", &routes),
                    ("Duplicates skipped", &duplicates),
                    ("Unnamed skipped", &unnamed),
                    ("Failed declarations", &failed),
                ])
            );
        }
    }

    let table = routes_table(&set.routes, limit);
    if !table.is_empty() {
        println!("{}", table);
    }
    if set.routes.len() > limit {
        println!("{}", dim(&format!("... and {} more", set.routes.len() - limit)));
    }
    Ok(())
}

pub fn run_modules(config: &DocrouteConfig, args: &StoreArgs, output: OutputMode) -> anyhow::Result<()> {
    let (session, _) = open_session(config, args)?;
    let modules = session.modules()?;

    if !output.is_human() {
        return emit_success("modules", modules);
    }

    section("Modules");
    for module in modules {
        module_line(&module.name, &module.root.to_string());
    }
    println!();
    summary_row("Total:", &modules.len().to_string());
    Ok(())
}

pub fn run_show(config: &DocrouteConfig, args: &StoreArgs, fqn: &str, output: OutputMode) -> anyhow::Result<()> {
    let (session, _) = open_session(config, args)?;
    let record = session.record(fqn)?;

    if !output.is_human() {
        return emit_success("show", &record);
    }

    header(&record.fqn);
    let category = record.category.map(|c| c.as_str()).unwrap_or("unknown");
    info("Category", category);
    if record.is_alias {
        info("Alias", &alias_arrow(&record.fqn, &record.target_fqn));
    }
    if !record.file_path.is_empty() {
        info("File", &record.file_path);
    }
    if let Some(proto) = &record.prototype {
        info("Prototype", &proto.short_html);
    }
    if !record.params.is_empty() {
        info("Params", &record.params.len().to_string());
    }
    if !record.fields.is_empty() {
        info("Fields", &record.fields.len().to_string());
    }
    if !record.members.is_empty() {
        info("Members", &record.members.len().to_string());
    }
    if let Some(set) = &record.error_set {
        info("Errors", &set.errors.len().to_string());
    }
    if !record.error_nodes.is_empty() {
        info("Error nodes", &record.error_nodes.len().to_string());
    }
    if !record.docs_short_html.is_empty() {
        section("Docs");
        println!("{}", record.docs_short_html);
    }
    Ok(())
}

pub fn run_import(input: &Path, db: &Path, output: OutputMode) -> anyhow::Result<()> {
    let spinner = output.is_human().then(|| Spinner::new("Importing snapshot"));

    let snapshot = StoreSnapshot::load(input).with_context(|| format!("failed to load {}", input.display()))?;
    if let Some(parent) = db.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = SqliteDeclStore::open(db)?;
    store.import_snapshot(&snapshot)?;
    let stats = store.stats()?;

    if let Some(spinner) = spinner {
        spinner.finish_with_message("Done");
        status(Icons::DATABASE, "Database", &db.display().to_string());
        println!("{}", stats);
        success("Import complete");
        Ok(())
    } else {
        emit_success(
            "import",
            serde_json::json!({
                "database": db,
                "modules": stats.modules,
                "decls": stats.decls,
                "links": stats.links,
                "error_nodes": stats.error_nodes,
            }),
        )
    }
}

pub fn run_serve(config: &DocrouteConfig, args: &StoreArgs, port: u16, force: bool) -> anyhow::Result<()> {
    let (session, _, set) = load_routes(config, args, force, OutputMode::Human)?;
    let modules = session.modules()?.to_vec();

    status(Icons::GLOBE, "Serving", &format!("http://127.0.0.1:{}", port));
    let state = AppState::new(modules, set.routes);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(start_server(port, state))
}

pub fn run_init(path: Option<&Path>, force: bool, output: OutputMode) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    write_config(&path, &DocrouteConfig::starter(), force)?;

    if output.is_human() {
        success(&format!("Wrote {}", path.display()));
        Ok(())
    } else {
        emit_success("init", serde_json::json!({ "config": path }))
    }
}
