use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use std::path::{Path, PathBuf};

use crate::category::{Category, extension, is_maven_metadata, name_without_extension};

/// An ordered, categorized set of local files.
///
/// The order depends only on the files themselves, never on the order they
/// were supplied in.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    entries: Vec<Entry>,
    roots: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    parent: String,
    category: Category,
    extension: String,
    stem: String,
    full: String,
}

impl FileSet {
    /// Categorizes and orders `files`.
    pub fn of<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        paths.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        paths.dedup();

        let roots = infer_roots(&paths);
        let mut entries: Vec<Entry> = paths
            .into_iter()
            .map(|path| Entry::new(path, &roots))
            .collect();
        entries.sort_by(Entry::deploy_order);

        Self { entries, roots }
    }

    /// Files in deploy order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.path.as_path())
    }

    /// Files in deploy order, with their categories.
    pub fn iter_categorized(&self) -> impl Iterator<Item = (&Path, Category)> {
        self.entries.iter().map(|e| (e.path.as_path(), e.category))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inferred root name of a parent directory, if it has one.
    pub fn root(&self, parent: &Path) -> Option<&str> {
        self.roots
            .get(parent.to_string_lossy().as_ref())
            .map(String::as_str)
    }

    /// Category of a file in this set.
    pub fn category(&self, path: &Path) -> Option<Category> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.category)
    }

    /// Keeps the files matching `predicate`. Roots and relative order are
    /// preserved.
    pub fn filter<F>(&self, mut predicate: F) -> FileSet
    where
        F: FnMut(&Path) -> bool,
    {
        let entries = self
            .entries
            .iter()
            .filter(|e| predicate(&e.path))
            .cloned()
            .collect();
        FileSet {
            entries,
            roots: self.roots.clone(),
        }
    }

    /// Files grouped by category in deploy order. Empty categories are
    /// omitted.
    pub fn batched_by_category(&self) -> BTreeMap<Category, Vec<PathBuf>> {
        let mut batches: BTreeMap<Category, Vec<PathBuf>> = BTreeMap::new();
        for entry in &self.entries {
            batches
                .entry(entry.category)
                .or_default()
                .push(entry.path.clone());
        }
        batches
    }
}

impl Entry {
    fn new(path: PathBuf, roots: &BTreeMap<String, String>) -> Self {
        let parent = parent_key(&path);
        let name = file_name(&path);
        let root = roots.get(&parent).map(String::as_str);
        Self {
            category: Category::of(&name, root),
            extension: extension(&name).to_string(),
            stem: name_without_extension(&name).to_string(),
            full: path.to_string_lossy().into_owned(),
            parent,
            path,
        }
    }

    fn deploy_order(a: &Entry, b: &Entry) -> Ordering {
        a.parent
            .cmp(&b.parent)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.extension.cmp(&b.extension))
            .then_with(|| a.stem.cmp(&b.stem))
            .then_with(|| a.full.cmp(&b.full))
    }
}

/// Picks the shortest candidate name per directory. `paths` must already be
/// sorted so that ties go to the first file in path order.
fn infer_roots(paths: &[PathBuf]) -> BTreeMap<String, String> {
    let mut roots: BTreeMap<String, String> = BTreeMap::new();
    for path in paths {
        let name = file_name(path);
        if !is_root_candidate(path, &name) {
            continue;
        }
        let stem = name_without_extension(&name);
        match roots.entry(parent_key(path)) {
            MapEntry::Vacant(slot) => {
                slot.insert(stem.to_string());
            }
            MapEntry::Occupied(mut slot) => {
                if stem.len() < slot.get().len() {
                    slot.insert(stem.to_string());
                }
            }
        }
    }
    roots
}

fn is_root_candidate(path: &Path, name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !is_maven_metadata(name)
        && !name.starts_with('.')
        && !lower.ends_with(".md5")
        && !lower.ends_with("sha1")
        && !path.is_dir()
}

fn parent_key(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
