//! Module resolution.
//!
//! Resolves `std::a::b::c`-style import paths to source files, lexes and
//! parses each one, and walks `use` items recursively to build the full set
//! of modules a compilation needs, detecting import cycles along the way.
//!
//! The first path segment `std` maps to the standard library root
//! (`<repo>/stdlib/...`); every other path is resolved relative to the
//! compilation root. A single-segment tail `a` maps to `a/a.fax`; a longer
//! tail `x::y::z` maps to `x/y/z.fax` (leaf file named after the last
//! segment, nested under a directory per segment).

use std::fs;
use std::path::{Path, PathBuf};

use faxc_par::Ast;
use faxc_util::diagnostic::DiagnosticBuilder;
use faxc_util::{FxHashMap, FxHashSet, Handler, Span, Symbol};

use crate::codes;

/// A module that has been located, read, and parsed.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub name: String,
    pub path: PathBuf,
    pub ast: Ast,
    pub dependencies: FxHashSet<String>,
}

/// Failure modes of module resolution (mirrors the reference compiler's
/// `ModuleError`).
#[derive(Debug, Clone)]
pub enum ModuleError {
    /// No `.fax` file exists at the resolved location for this import path.
    NotFound(String),
    /// The module currently being loaded imports itself, directly or
    /// transitively.
    CircularImport(String),
    /// The file exists but couldn't be read.
    Io { path: PathBuf, message: String },
}

impl std::fmt::Display for ModuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleError::NotFound(name) => write!(f, "module not found: {name}"),
            ModuleError::CircularImport(name) => write!(f, "circular import detected: {name}"),
            ModuleError::Io { path, message } => write!(f, "could not read {}: {}", path.display(), message),
        }
    }
}

impl std::error::Error for ModuleError {}

fn join_path(segments: &[Symbol]) -> String {
    segments
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("::")
}

/// Resolves import paths under a compilation root, caching loaded modules
/// and detecting circular imports.
pub struct ModuleResolver {
    root_dir: PathBuf,
    stdlib_root: PathBuf,
    modules: FxHashMap<String, ResolvedModule>,
    loading: FxHashSet<String>,
}

impl ModuleResolver {
    /// `root_dir` is the directory user-relative imports resolve against;
    /// `stdlib_root` is the directory `std::...` imports resolve against
    /// (typically `<repo>/stdlib`).
    pub fn new(root_dir: impl Into<PathBuf>, stdlib_root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            stdlib_root: stdlib_root.into(),
            modules: FxHashMap::default(),
            loading: FxHashSet::default(),
        }
    }

    pub fn modules(&self) -> &FxHashMap<String, ResolvedModule> {
        &self.modules
    }

    /// Resolves an import path to a file on disk, or `None` if nothing
    /// exists at the expected location.
    pub fn resolve_import(&self, import_path: &[Symbol]) -> Option<PathBuf> {
        if import_path.is_empty() {
            return None;
        }

        if import_path[0].as_str() == "std" {
            let rest = &import_path[1..];
            if rest.is_empty() {
                return None;
            }
            let candidate = stdlib_file_path(&self.stdlib_root, rest);
            return candidate.exists().then_some(candidate);
        }

        let candidate = relative_file_path(&self.root_dir, import_path);
        candidate.exists().then_some(candidate)
    }

    /// Loads a module (and, transitively, every module it imports),
    /// returning the cached copy on repeat calls.
    pub fn load_module(&mut self, import_path: &[Symbol]) -> Result<ResolvedModule, ModuleError> {
        let module_name = join_path(import_path);

        if let Some(existing) = self.modules.get(&module_name) {
            return Ok(existing.clone());
        }

        if self.loading.contains(&module_name) {
            return Err(ModuleError::CircularImport(module_name));
        }

        let file_path = self
            .resolve_import(import_path)
            .ok_or_else(|| ModuleError::NotFound(module_name.clone()))?;

        self.loading.insert(module_name.clone());

        let ast = match parse_source_file(&file_path) {
            Ok(ast) => ast,
            Err(err) => {
                self.loading.remove(&module_name);
                return Err(err);
            }
        };

        let mut dependencies = FxHashSet::default();
        for item in &ast {
            if let faxc_par::Item::Use(use_item) = item {
                let dep_path: Vec<Symbol> = use_item.path.segments.iter().map(|s| s.ident).collect();
                match self.load_module(&dep_path) {
                    Ok(dep) => {
                        dependencies.insert(dep.name.clone());
                    },
                    Err(ModuleError::CircularImport(name)) => return Err(ModuleError::CircularImport(name)),
                    Err(_) => {
                        // Unresolved import: left for name resolution to
                        // report against the importing module's own spans.
                    },
                }
            }
        }

        self.loading.remove(&module_name);

        let module = ResolvedModule {
            name: module_name.clone(),
            path: file_path,
            ast,
            dependencies,
        };
        self.modules.insert(module_name, module.clone());
        Ok(module)
    }

    /// Returns every loaded module in dependency order (a module's
    /// dependencies always precede it).
    pub fn topological_order(&self) -> Vec<ResolvedModule> {
        let mut result = Vec::with_capacity(self.modules.len());
        let mut visited = FxHashSet::default();

        fn visit(
            name: &str,
            modules: &FxHashMap<String, ResolvedModule>,
            visited: &mut FxHashSet<String>,
            result: &mut Vec<ResolvedModule>,
        ) {
            if visited.contains(name) {
                return;
            }
            visited.insert(name.to_string());
            let Some(module) = modules.get(name) else { return };
            for dep in &module.dependencies {
                visit(dep, modules, visited, result);
            }
            result.push(module.clone());
        }

        for name in self.modules.keys() {
            visit(name, &self.modules, &mut visited, &mut result);
        }
        result
    }
}

/// Loads `main_file` and every module it transitively imports, returning the
/// full set in dependency order. Per spec §4.1/§7, a missing `std::...`
/// module is a hard error; a missing non-stdlib module is downgraded to a
/// warning so the rest of the program can still be analyzed. Both are
/// reported through `handler` under `P_MODULE_NOT_FOUND`/`P_CIRCULAR_IMPORT`
/// rather than silently dropped.
pub fn resolve_modules(
    main_file: impl AsRef<Path>,
    stdlib_root: impl Into<PathBuf>,
    handler: &Handler,
) -> Result<Vec<ResolvedModule>, ModuleError> {
    let main_file = main_file.as_ref();
    let root_dir = main_file.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let mut resolver = ModuleResolver::new(root_dir, stdlib_root);

    let ast = parse_source_file(main_file)?;
    let mut dependencies = FxHashSet::default();
    for item in &ast {
        if let faxc_par::Item::Use(use_item) = item {
            let dep_path: Vec<Symbol> = use_item.path.segments.iter().map(|s| s.ident).collect();
            match resolver.load_module(&dep_path) {
                Ok(dep) => {
                    dependencies.insert(dep.name.clone());
                },
                Err(err) => report_module_error(handler, &dep_path, &err, use_item.path.span),
            }
        }
    }

    let main_module = ResolvedModule {
        name: "main".to_string(),
        path: main_file.to_path_buf(),
        ast,
        dependencies,
    };
    resolver.modules.insert("main".to_string(), main_module);

    Ok(resolver.topological_order())
}

/// Reports a module-resolution failure under the appropriate severity: a
/// circular import is always an error; a missing module is an error for
/// `std::...` paths and a warning (§4.1: "the driver may downgrade this to
/// a warning for non-stdlib paths") otherwise. `span` is the `use` item's
/// own path span; a synthetic import (none on hand) falls back to
/// `Span::DUMMY`, the convention the rest of this crate uses for nodes with
/// no location.
fn report_module_error(handler: &Handler, import_path: &[Symbol], err: &ModuleError, span: Span) {
    match err {
        ModuleError::CircularImport(name) => {
            DiagnosticBuilder::error(format!("circular import: {name}"))
                .code(codes::P_CIRCULAR_IMPORT)
                .span(span)
                .emit(handler);
        },
        ModuleError::NotFound(name) => {
            let is_stdlib = import_path.first().map(|s| s.as_str()) == Some("std");
            let message = format!("module not found: {name}");
            if is_stdlib {
                DiagnosticBuilder::error(message).code(codes::P_MODULE_NOT_FOUND).span(span).emit(handler);
            } else {
                DiagnosticBuilder::warning(message).code(codes::P_MODULE_NOT_FOUND).span(span).emit(handler);
            }
        },
        ModuleError::Io { path, message } => {
            DiagnosticBuilder::error(format!("could not read {}: {message}", path.display()))
                .code(codes::P_MODULE_NOT_FOUND)
                .span(span)
                .emit(handler);
        },
    }
}

fn stdlib_file_path(stdlib_root: &Path, tail: &[Symbol]) -> PathBuf {
    if tail.len() == 1 {
        stdlib_root.join(tail[0].as_str()).join(format!("{}.fax", tail[0].as_str()))
    } else {
        let dir = tail[0].as_str();
        let leaf = tail[tail.len() - 1].as_str();
        let mut path = stdlib_root.join(dir);
        for seg in &tail[1..tail.len() - 1] {
            path = path.join(seg.as_str());
        }
        path.join(format!("{leaf}.fax"))
    }
}

fn relative_file_path(root_dir: &Path, segments: &[Symbol]) -> PathBuf {
    let mut path = root_dir.to_path_buf();
    for seg in &segments[..segments.len() - 1] {
        path = path.join(seg.as_str());
    }
    path.join(format!("{}.fax", segments[segments.len() - 1].as_str()))
}

fn parse_source_file(path: &Path) -> Result<Ast, ModuleError> {
    let source = fs::read_to_string(path).map_err(|e| ModuleError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut lex_handler = Handler::new();
    let tokens = {
        let mut lexer = faxc_lex::Lexer::new(&source, &mut lex_handler);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token == faxc_lex::Token::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    };

    let mut parse_handler = Handler::new();
    let mut parser = faxc_par::Parser::new(tokens, &mut parse_handler);
    Ok(parser.parse())
}
