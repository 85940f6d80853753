//! Corpus discovery.
//!
//! Two layouts are supported. The *taxonomy* layout nests documents four
//! directory levels deep (`root/city/category/type/building`) with the actual
//! files one level further down, inside a fixed reports subfolder. The *flat*
//! layout keeps documents directly under the root, scanned non-recursively.
//!
//! Directory listings are sorted at every level so discovery order is
//! reproducible across platforms and runs.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, CorpusConfig};
use crate::models::{Classification, DocumentRef};

pub fn scan_corpus(config: &CorpusConfig) -> Result<Vec<DocumentRef>> {
    if !config.root.exists() {
        bail!("Corpus root does not exist: {}", config.root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    match config.layout.as_str() {
        "taxonomy" => scan_taxonomy(&config.root, &config.reports_dir, &include_set),
        "flat" => scan_flat(&config.root, &include_set),
        other => bail!("Unknown corpus layout: '{}'. Must be taxonomy or flat.", other),
    }
}

/// Walk the four-level taxonomy. Non-directories at intermediate levels are
/// skipped silently; a building without a reports subfolder contributes zero
/// documents.
fn scan_taxonomy(root: &Path, reports_dir: &str, include: &GlobSet) -> Result<Vec<DocumentRef>> {
    let mut documents = Vec::new();

    for (city, city_path) in sorted_dirs(root)? {
        for (category, category_path) in sorted_dirs(&city_path)? {
            for (building_type, type_path) in sorted_dirs(&category_path)? {
                for (building, building_path) in sorted_dirs(&type_path)? {
                    let reports_path = building_path.join(reports_dir);
                    if !reports_path.is_dir() {
                        continue;
                    }
                    for (file_name, path) in sorted_files(&reports_path)? {
                        if !include.is_match(&file_name) {
                            continue;
                        }
                        documents.push(DocumentRef {
                            path,
                            file_name,
                            classification: Some(Classification {
                                city: city.clone(),
                                category: category.clone(),
                                building_type: building_type.clone(),
                                building: building.clone(),
                            }),
                        });
                    }
                }
            }
        }
    }

    Ok(documents)
}

/// Non-recursive scan of the root for matching document files.
fn scan_flat(root: &Path, include: &GlobSet) -> Result<Vec<DocumentRef>> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !include.is_match(&file_name) {
            continue;
        }
        documents.push(DocumentRef {
            path: entry.path().to_path_buf(),
            file_name,
            classification: None,
        });
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(documents)
}

/// Name-sorted subdirectories of `path`. Entries that are not directories are
/// skipped, not an error.
fn sorted_dirs(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Name-sorted plain files of `path`.
fn sorted_files(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Run the `scan` command: print the discovered corpus without processing.
///
/// With `preview`, each document additionally reports its page count and a
/// short first-page excerpt, which is useful for eyeballing an unfamiliar
/// corpus before spending provider calls on it.
pub fn run_scan(config: &Config, preview: bool) -> Result<()> {
    let documents = scan_corpus(&config.corpus)?;

    println!("corpus {} ({})", config.corpus.root.display(), config.corpus.layout);
    for document in &documents {
        println!("  {}", document.source_id());
        if preview {
            match document_preview(&document.path) {
                Ok((pages, excerpt)) => {
                    println!("    pages: {}", pages);
                    if !excerpt.is_empty() {
                        println!("    excerpt: {}", excerpt);
                    }
                }
                Err(e) => println!("    unreadable: {}", e),
            }
        }
    }
    println!("  documents found: {}", documents.len());

    Ok(())
}

/// Page count plus a whitespace-collapsed excerpt of the first page.
fn document_preview(path: &Path) -> Result<(usize, String)> {
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| anyhow::anyhow!("PDF text extraction failed: {}", e))?;
    let excerpt: String = pages
        .first()
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
        .chars()
        .take(160)
        .collect();
    Ok((pages.len(), excerpt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"%PDF-1.4 stub").unwrap();
    }

    fn corpus(root: &Path, include: &[&str]) -> CorpusConfig {
        CorpusConfig {
            root: root.to_path_buf(),
            layout: "taxonomy".to_string(),
            reports_dir: "reports".to_string(),
            include_globs: include.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let config = corpus(&tmp.path().join("nope"), &["*.pdf"]);
        assert!(scan_corpus(&config).is_err());
    }

    #[test]
    fn taxonomy_scan_collects_tags_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("riyadh/collapsing/residential/tower-b/reports/b.pdf"));
        touch(&root.join("riyadh/collapsing/residential/tower-b/reports/a.pdf"));
        touch(&root.join("jeddah/reinforce/government/hall/reports/main.pdf"));
        // Reports folder holds a non-matching file too.
        touch(&root.join("jeddah/reinforce/government/hall/reports/notes.txt"));
        // A building with no reports folder contributes nothing.
        std::fs::create_dir_all(root.join("jeddah/reinforce/government/annex")).unwrap();
        // A stray file at an intermediate level is skipped silently.
        std::fs::write(root.join("README"), b"not a city").unwrap();

        let docs = scan_corpus(&corpus(root, &["*.pdf"])).unwrap();
        let ids: Vec<String> = docs.iter().map(|d| d.source_id()).collect();
        assert_eq!(
            ids,
            vec![
                "jeddah/reinforce/government/hall/main.pdf",
                "riyadh/collapsing/residential/tower-b/a.pdf",
                "riyadh/collapsing/residential/tower-b/b.pdf",
            ]
        );
        let tags = docs[0].classification.as_ref().unwrap();
        assert_eq!(tags.city, "jeddah");
        assert_eq!(tags.category, "reinforce");
        assert_eq!(tags.building_type, "government");
        assert_eq!(tags.building, "hall");
    }

    #[test]
    fn flat_scan_is_non_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("beta.pdf"));
        touch(&root.join("alpha.pdf"));
        touch(&root.join("nested/hidden.pdf"));
        std::fs::write(root.join("skip.txt"), b"x").unwrap();

        let mut config = corpus(root, &["*.pdf"]);
        config.layout = "flat".to_string();

        let docs = scan_corpus(&config).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["alpha.pdf", "beta.pdf"]);
        assert!(docs.iter().all(|d| d.classification.is_none()));
    }
}
