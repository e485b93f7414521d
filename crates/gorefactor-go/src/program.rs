//! The program model: parsed files grouped into packages, plus symbols.
//!
//! A [`Program`] is built once from `(path, contents)` pairs and never
//! changes afterwards. Paths are workspace-relative and use `/` separators;
//! the directory part of a path decides which package a file belongs to.
//!
//! Problems found while loading (syntax errors, directories that mix
//! packages, names that resolve to nothing) do not stop the load. They are
//! kept as [`Program::diagnostics`] so a refactoring can report them as
//! pre-existing issues.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use gorefactor_core::error::DoctorError;
use gorefactor_core::text::LineIndex;
use gorefactor_core::{Location, LogEntry, Severity, Span};
use gorefactor_syntax::lexer::Lexer;
use gorefactor_syntax::{parse_file, Ast, FileId, NodeId, TokenKind};

use crate::resolve;
use crate::types::Info;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that stop a program from being loaded at all.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The directory walk failed.
    #[error("failed to walk {root}: {source}")]
    Walk {
        root: String,
        #[source]
        source: walkdir::Error,
    },

    /// The root holds no Go files.
    #[error("no Go files found under {root}")]
    NoFiles { root: String },
}

impl From<LoadError> for DoctorError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NoFiles { root } => DoctorError::FileNotFound { path: root },
            other => DoctorError::internal(other.to_string()),
        }
    }
}

// ============================================================================
// Source Map
// ============================================================================

/// A resolved source position. Lines and columns are 1-indexed, offsets
/// 0-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub file: String,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

/// One parsed file.
#[derive(Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    /// Directory part of `path`; empty for files at the root.
    pub dir: String,
    pub contents: String,
    pub lines: LineIndex,
    pub root: NodeId,
    pub package: PackageId,
}

impl SourceFile {
    pub fn position(&self, offset: usize) -> Position {
        let (line, column) = self.lines.position(offset);
        Position {
            file: self.path.clone(),
            offset,
            line,
            column,
        }
    }

    pub fn location(&self, span: Span) -> Location {
        let (line, col) = self.lines.position(span.start);
        Location::new(self.path.clone(), span, line, col)
    }

    pub fn text(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }
}

/// All parsed files, addressable by id or path.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
    by_path: HashMap<String, FileId>,
}

impl FileSet {
    fn add(&mut self, file: SourceFile) {
        self.by_path.insert(file.path.clone(), file.id);
        self.files.push(file);
    }

    pub fn get(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    pub fn by_path(&self, path: &str) -> Option<&SourceFile> {
        self.by_path
            .get(&normalize_path(path))
            .map(|&id| self.get(id))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolve a byte offset in `file` to a position.
    pub fn position(&self, file: FileId, offset: usize) -> Position {
        self.get(file).position(offset)
    }
}

// ============================================================================
// Packages
// ============================================================================

/// Index of a [`Package`] in a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The files of one directory that declare the same package name.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub dir: String,
    pub import_path: String,
    pub files: Vec<FileId>,
}

/// Package clause of a loaded file, kept even when the file fails to parse.
#[derive(Debug, Clone)]
struct DeclaredFile {
    path: String,
    dir: String,
    package: Option<String>,
}

// ============================================================================
// Program
// ============================================================================

/// A parsed and resolved Go program.
#[derive(Debug)]
pub struct Program {
    ast: Ast,
    files: FileSet,
    packages: Vec<Package>,
    declared: Vec<DeclaredFile>,
    info: Info,
    diagnostics: Vec<LogEntry>,
}

impl Program {
    /// Build a program from `(path, contents)` pairs.
    pub fn load(files: Vec<(String, String)>) -> Program {
        Program::load_with_module(files, None)
    }

    /// Build a program whose import paths are prefixed with `module`.
    pub fn load_with_module(mut files: Vec<(String, String)>, module: Option<&str>) -> Program {
        for (path, _) in files.iter_mut() {
            *path = normalize_path(path);
        }
        files.sort_by(|(a, _), (b, _)| a.cmp(b));
        files.dedup_by(|(a, _), (b, _)| a == b);

        let mut ast = Ast::new();
        let mut diagnostics = Vec::new();
        let mut declared = Vec::new();
        let mut parsed = Vec::new();

        for (path, contents) in files {
            let dir = dir_of(&path).to_string();
            declared.push(DeclaredFile {
                path: path.clone(),
                dir: dir.clone(),
                package: package_clause(&contents),
            });
            let id = FileId::new(parsed.len());
            match parse_file(&mut ast, id, &contents) {
                Ok(root) => parsed.push((id, path, dir, contents, root)),
                Err(err) => {
                    let lines = LineIndex::new(&contents);
                    let span = Span::at(err.offset.min(contents.len()), 0);
                    let (line, col) = lines.position(span.start);
                    debug!(file = %path, error = %err, "excluding file that does not parse");
                    diagnostics.push(LogEntry {
                        severity: Severity::Error,
                        message: err.message,
                        position: Some(Location::new(path, span, line, col)),
                    });
                }
            }
        }

        // Group by directory, then by declared package name.
        let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (i, (_, _, dir, _, root)) in parsed.iter().enumerate() {
            let name = package_name(&ast, *root).unwrap_or_default().to_string();
            groups.entry((dir.clone(), name)).or_default().push(i);
        }

        let mut packages = Vec::new();
        let mut package_of = vec![PackageId(0); parsed.len()];
        for ((dir, name), members) in &groups {
            let id = PackageId(packages.len() as u32);
            for &i in members {
                package_of[i] = id;
            }
            packages.push(Package {
                id,
                name: name.clone(),
                dir: dir.clone(),
                import_path: import_path(module, dir),
                files: members.iter().map(|&i| parsed[i].0).collect(),
            });
        }
        diagnostics.extend(mixed_package_diagnostics(&packages, &parsed));

        let mut file_set = FileSet::default();
        for (i, (id, path, dir, contents, root)) in parsed.into_iter().enumerate() {
            file_set.add(SourceFile {
                id,
                lines: LineIndex::new(&contents),
                path,
                dir,
                contents,
                root,
                package: package_of[i],
            });
        }

        let (info, resolve_diagnostics) = resolve::resolve(&ast, &file_set, &packages);
        diagnostics.extend(resolve_diagnostics);

        info!(
            files = file_set.len(),
            packages = packages.len(),
            diagnostics = diagnostics.len(),
            "loaded program"
        );

        Program {
            ast,
            files: file_set,
            packages,
            declared,
            info,
            diagnostics,
        }
    }

    /// Load every `.go` file under `root`.
    ///
    /// Hidden directories and `testdata`/`vendor` trees are skipped.
    pub fn load_dir(root: &Path, module: Option<&str>) -> Result<Program, LoadError> {
        let files = collect_go_files(root)?;
        if files.is_empty() {
            return Err(LoadError::NoFiles {
                root: root.display().to_string(),
            });
        }
        Ok(Program::load_with_module(files, module))
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        self.files.get(id)
    }

    pub fn file_by_path(&self, path: &str) -> Option<&SourceFile> {
        self.files.by_path(path)
    }

    /// File containing `node`.
    pub fn file_of(&self, node: NodeId) -> &SourceFile {
        self.files.get(self.ast.file(node))
    }

    /// Check if `path` was loaded, whether or not it parsed.
    pub fn was_loaded(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.declared.iter().any(|d| d.path == path)
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn package_by_import_path(&self, import_path: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.import_path == import_path)
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Problems that existed before any refactoring ran.
    pub fn diagnostics(&self) -> &[LogEntry] {
        &self.diagnostics
    }

    /// Source text of a node.
    pub fn node_text(&self, node: NodeId) -> &str {
        self.file_of(node).text(self.ast.span(node))
    }

    /// Log location of a node.
    pub fn location(&self, node: NodeId) -> Location {
        self.file_of(node).location(self.ast.span(node))
    }

    /// Package clauses of every loaded file in `dir`, parsed or not.
    ///
    /// `None` marks a file whose package clause could not be read.
    pub fn package_clauses_in(&self, dir: &str) -> Vec<Option<&str>> {
        self.declared
            .iter()
            .filter(|d| d.dir == dir)
            .map(|d| d.package.as_deref())
            .collect()
    }
}

// ============================================================================
// Loading Helpers
// ============================================================================

/// Collect `(relative path, contents)` for every `.go` file under `root`.
pub fn collect_go_files(root: &Path) -> Result<Vec<(String, String)>, LoadError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|source| LoadError::Walk {
            root: root.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "go") {
            continue;
        }
        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        files.push((normalize_path(&rel_path.to_string_lossy()), contents));
    }

    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files)
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor"
}

/// Workspace-relative path with `/` separators and no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut rest = path.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}

/// Directory part of a normalized path.
pub fn dir_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Final component of a directory path.
pub fn base_name(dir: &str) -> &str {
    dir.rsplit_once('/').map_or(dir, |(_, base)| base)
}

fn import_path(module: Option<&str>, dir: &str) -> String {
    match (module, dir) {
        (Some(module), "") => module.to_string(),
        (Some(module), dir) => format!("{}/{}", module, dir),
        (None, "") => ".".to_string(),
        (None, dir) => dir.to_string(),
    }
}

fn package_name(ast: &Ast, root: NodeId) -> Option<&str> {
    match ast.kind(root) {
        gorefactor_syntax::NodeKind::File { name, .. } => ast.ident_name(*name),
        _ => None,
    }
}

/// Read just the package clause, so files with later syntax errors still
/// report their package.
fn package_clause(contents: &str) -> Option<String> {
    let mut lexer = Lexer::new(contents);
    let keyword = lexer.next_token().ok()?;
    if keyword.kind != TokenKind::Package {
        return None;
    }
    let name = lexer.next_token().ok()?;
    (name.kind == TokenKind::Ident).then(|| name.text(contents).to_string())
}

fn mixed_package_diagnostics(
    packages: &[Package],
    parsed: &[(FileId, String, String, String, NodeId)],
) -> Vec<LogEntry> {
    let mut diagnostics = Vec::new();
    for pair in packages.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if first.dir != second.dir {
            continue;
        }
        let file_name = |p: &Package| {
            p.files
                .first()
                .map(|id| parsed[id.index()].1.clone())
                .unwrap_or_default()
        };
        let (a, b) = (file_name(first), file_name(second));
        let dir = if first.dir.is_empty() { "." } else { &first.dir };
        diagnostics.push(LogEntry {
            severity: Severity::Error,
            message: format!(
                "found packages {} ({}) and {} ({}) in {}",
                first.name, a, second.name, b, dir
            ),
            position: None,
        });
    }
    diagnostics
}

// ============================================================================
// Tests
// ============================================================================
