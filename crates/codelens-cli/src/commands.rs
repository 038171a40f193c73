//! CLI command implementations: thin glue between `clap`'s parsed
//! arguments and the Indexer/Store/Watcher APIs.

use crate::config::CodelensConfig;
use codelens_core::{ParserBridge, SymbolKind};
use codelens_indexer::{DirectoryOptions, Indexer};
use codelens_store::query::{ReferenceFilter, SymbolFilter};
use codelens_store::Store;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Initialize `.codelens/` in a directory with a default config file.
pub fn init(path: &Path) -> Result<()> {
    let dir = CodelensConfig::dir(path);
    if dir.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    CodelensConfig::default().save(path)?;
    Store::open(CodelensConfig::db_path(path))?;

    println!("{} Initialized codelens in {}", "✓".green(), path.display());
    println!("  Run {} to index your codebase", "codelens index".cyan());
    Ok(())
}

fn open_store(path: &Path) -> Result<Arc<Store>> {
    let db_path = CodelensConfig::db_path(path);
    if !db_path.exists() {
        return Err(format!(
            "no index found at {}; run `codelens index` first",
            path.display()
        )
        .into());
    }
    Ok(Arc::new(Store::open(db_path)?))
}

/// Recursively index a directory and print a summary.
pub async fn index(path: &Path) -> Result<()> {
    let config = CodelensConfig::load(path);
    let bridge = Arc::new(ParserBridge::new()?);
    let store = Arc::new(Store::open(CodelensConfig::db_path(path))?);
    let indexer = Indexer::with_config(bridge, store, config.indexer_config());

    println!("{}", "Indexing...".cyan());
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message("Walking files...");

    let opts = DirectoryOptions {
        exclude: config.exclude.clone(),
    };
    let outcomes = indexer.index_directory(path, &opts).await?;
    spinner.finish_and_clear();

    let mut files = 0usize;
    let mut symbols = 0usize;
    let mut references = 0usize;
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(o) => {
                files += 1;
                symbols += o.symbols_added;
                references += o.references_added;
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    println!(
        "{} Indexed {} files ({} symbols, {} references)",
        "✓".green(),
        files.to_string().cyan(),
        symbols.to_string().cyan(),
        references.to_string().cyan()
    );

    if !errors.is_empty() {
        println!("\n{} files with errors:", "⚠".yellow());
        for e in errors.iter().take(5) {
            println!("  {}", e.red());
        }
        if errors.len() > 5 {
            println!("  ... and {} more", errors.len() - 5);
        }
    }

    Ok(())
}

/// Re-index a single file against the store rooted at the current directory.
pub fn index_file(file: &Path) -> Result<()> {
    let root = std::env::current_dir()?;
    let config = CodelensConfig::load(&root);
    let bridge = Arc::new(ParserBridge::new()?);
    let store = Arc::new(Store::open(CodelensConfig::db_path(&root))?);
    let indexer = Indexer::with_config(bridge, store, config.indexer_config());

    let outcome = indexer.index_file(file)?;
    println!(
        "{} Indexed {} ({} symbols, {} references)",
        "✓".green(),
        outcome.file_path.cyan(),
        outcome.symbols_added,
        outcome.references_added
    );
    Ok(())
}

fn parse_kind(kind: &str) -> Result<SymbolKind> {
    Ok(match kind {
        "function" => SymbolKind::Function,
        "class" => SymbolKind::Class,
        "module" => SymbolKind::Module,
        "method" => SymbolKind::Method,
        "variable" => SymbolKind::Variable,
        "constant" => SymbolKind::Constant,
        "import" => SymbolKind::Import,
        "alias" => SymbolKind::Alias,
        "use" => SymbolKind::Use,
        "require" => SymbolKind::Require,
        "macro" => SymbolKind::Macro,
        other => return Err(format!("unknown symbol kind: {other}").into()),
    })
}

/// Case-insensitive substring search.
pub fn search(path: &Path, query: &str, limit: usize, kind: Option<&str>, json: bool) -> Result<()> {
    let store = open_store(path)?;
    let filter = SymbolFilter {
        kind: kind.map(parse_kind).transpose()?,
        language: None,
        limit: Some(limit),
    };
    let results = store.search(query, &filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matches found for \"{query}\"");
        return Ok(());
    }

    println!("Found {} matches:\n", results.len());
    for symbol in results {
        print_symbol_line(&symbol);
    }
    Ok(())
}

/// Find the definition of a name or qualified name.
pub fn find(path: &Path, name: &str, json: bool) -> Result<()> {
    let store = open_store(path)?;
    match store.find_definition(name)? {
        Some(symbol) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&symbol)?);
            } else {
                print_symbol_line(&symbol);
                if let Some(sig) = &symbol.signature {
                    println!("    {}", sig.dimmed());
                }
            }
            Ok(())
        }
        None => Err(format!("no definition found for \"{name}\"").into()),
    }
}

/// Find every usage site of a name or qualified name.
pub fn references(path: &Path, name: &str, json: bool) -> Result<()> {
    let store = open_store(path)?;
    let refs = store.find_references(name, &ReferenceFilter::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&refs)?);
        return Ok(());
    }

    if refs.is_empty() {
        println!("No references found for \"{name}\"");
        return Ok(());
    }

    println!("Found {} references:\n", refs.len());
    for r in refs {
        println!(
            "  {} {}",
            r.kind.to_string().yellow(),
            format!("{}:{}:{}", r.file_path, r.line, r.col).dimmed()
        );
    }
    Ok(())
}

/// Show callers and callees of a function/method/macro.
pub fn calls(path: &Path, name: &str, json: bool) -> Result<()> {
    let store = open_store(path)?;
    let graph = store.call_graph(name)?;

    if json {
        let output = serde_json::json!({
            "callers": graph.callers.iter().map(|c| serde_json::json!({
                "reference": c.reference,
                "container_qualified_name": c.container_qualified_name,
            })).collect::<Vec<_>>(),
            "callees": graph.callees,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Callers:".cyan().bold());
    if graph.callers.is_empty() {
        println!("  (none)");
    }
    for caller in &graph.callers {
        let container = caller
            .container_qualified_name
            .as_deref()
            .unwrap_or("<top level>");
        println!(
            "  {} in {} ({}:{})",
            container.yellow(),
            caller.reference.file_path.dimmed(),
            caller.reference.line,
            caller.reference.col
        );
    }

    println!("\n{}", "Callees:".cyan().bold());
    if graph.callees.is_empty() {
        println!("  (none)");
    }
    for callee in &graph.callees {
        println!(
            "  {} ({}:{})",
            callee.name.yellow(),
            callee.file_path.dimmed(),
            callee.line
        );
    }
    Ok(())
}

/// List every symbol in one file, in position order.
pub fn symbols(path: &Path, file: &Path) -> Result<()> {
    let store = open_store(path)?;
    let file_path = std::fs::canonicalize(file)
        .unwrap_or_else(|_| file.to_path_buf())
        .to_string_lossy()
        .into_owned();

    let symbols = store.symbols_in_file(&file_path)?;
    if symbols.is_empty() {
        println!("No symbols found in {file_path}");
        return Ok(());
    }

    for symbol in symbols {
        print_symbol_line(&symbol);
    }
    Ok(())
}

/// Find the innermost symbol covering a (line, col) position.
pub fn at(path: &Path, file: &Path, line: u32, col: u32) -> Result<()> {
    let store = open_store(path)?;
    let file_path = std::fs::canonicalize(file)
        .unwrap_or_else(|_| file.to_path_buf())
        .to_string_lossy()
        .into_owned();

    match store.symbol_at(&file_path, line, col)? {
        Some(symbol) => {
            print_symbol_line(&symbol);
            Ok(())
        }
        None => Err(format!("no symbol covers {file_path}:{line}:{col}").into()),
    }
}

/// Show index status and aggregate statistics.
pub fn status(path: &Path) -> Result<()> {
    let dir = CodelensConfig::dir(path);
    if !dir.exists() {
        println!("{} codelens not initialized in this directory", "✗".red());
        println!("  Run {} to initialize", "codelens init".cyan());
        return Ok(());
    }

    let store = open_store(path)?;
    let stats = store.stats()?;

    println!("{}", "codelens status".cyan().bold());
    println!();
    println!("  {} {}", "Files:".dimmed(), stats.indexed_files);
    println!("  {} {}", "Symbols:".dimmed(), stats.total_symbols);
    println!("  {} {}", "References:".dimmed(), stats.total_references);
    println!();
    println!("  {}", "By kind:".dimmed());
    let mut by_kind: Vec<_> = stats.symbols_by_kind.into_iter().collect();
    by_kind.sort_by(|a, b| a.0.cmp(&b.0));
    for (kind, count) in by_kind {
        println!("    {:<10} {}", kind, count);
    }

    Ok(())
}

/// Watch a directory, keeping the index in sync until interrupted.
pub async fn watch(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(format!("{} is not a directory", path.display()).into());
    }
    let config = CodelensConfig::load(path);
    let bridge = Arc::new(ParserBridge::new()?);
    let store = Arc::new(Store::open(CodelensConfig::db_path(path))?);
    let indexer = Arc::new(Indexer::with_config(
        bridge,
        store.clone(),
        config.indexer_config(),
    ));

    println!("{}", "Indexing before watching...".cyan());
    let opts = DirectoryOptions {
        exclude: config.exclude.clone(),
    };
    indexer.index_directory(path, &opts).await?;

    let watcher = codelens_watcher::Watcher::with_config(indexer, store, config.watcher_config());
    watcher.watch(path)?;

    println!(
        "{} Watching {} — press {} to stop",
        "✓".green(),
        path.display(),
        "Ctrl+C".cyan()
    );
    tokio::signal::ctrl_c().await?;
    println!("\nStopping.");
    Ok(())
}

fn print_symbol_line(symbol: &codelens_core::Symbol) {
    println!(
        "  {} {} {}",
        symbol.kind.to_string().yellow(),
        symbol.qualified_name.cyan(),
        format!("({}:{})", symbol.file_path, symbol.start_line).dimmed()
    );
}
