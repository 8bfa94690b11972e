use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::{AssetLedger, Document};
use crate::translation::SegmentBatch;

// @module: File and directory utilities

/// Suffix of serialized documents
pub const DOCUMENT_SUFFIX: &str = ".doc.json";

/// Suffix of serialized asset ledgers
pub const LEDGER_SUFFIX: &str = ".ledger.json";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Base name of a document file without its `.doc.json` or `.json` suffix
    pub fn document_stem<P: AsRef<Path>>(path: P) -> String {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        name.strip_suffix(DOCUMENT_SUFFIX)
            .or_else(|| name.strip_suffix(".json"))
            .unwrap_or(name.as_str())
            .to_string()
    }

    // @generates: Output path for a stage result
    // @params: input_file, output_dir, suffix (e.g. "fr.doc.json")
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        suffix: &str,
    ) -> PathBuf {
        let mut output_filename = Self::document_stem(input_file);
        output_filename.push('.');
        output_filename.push_str(suffix.trim_start_matches('.'));

        output_dir.as_ref().join(output_filename)
    }

    /// Ledger expected next to a document: `name.doc.json` -> `name.ledger.json`
    pub fn sibling_ledger_path<P: AsRef<Path>>(document_path: P) -> PathBuf {
        let document_path = document_path.as_ref();
        let file_name = format!("{}{}", Self::document_stem(document_path), LEDGER_SUFFIX);
        document_path.with_file_name(file_name)
    }

    /// Find files whose name ends with `suffix`, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, suffix: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let suffix = suffix.to_lowercase();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                if name.ends_with(&suffix) {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Deserialize a JSON file
    pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        let content = Self::read_to_string(path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON file: {:?}", path))
    }

    /// Serialize a value as pretty JSON
    pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize JSON for: {:?}", path.as_ref()))?;
        Self::write_to_file(path, &json)
    }

    pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::load_json(path)
    }

    pub fn save_document<P: AsRef<Path>>(path: P, document: &Document) -> Result<()> {
        Self::save_json(path, document)
    }

    pub fn load_ledger<P: AsRef<Path>>(path: P) -> Result<AssetLedger> {
        Self::load_json(path)
    }

    pub fn save_ledger<P: AsRef<Path>>(path: P, ledger: &AssetLedger) -> Result<()> {
        Self::save_json(path, ledger)
    }

    pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<SegmentBatch> {
        Self::load_json(path)
    }

    pub fn save_batch<P: AsRef<Path>>(path: P, batch: &SegmentBatch) -> Result<()> {
        Self::save_json(path, batch)
    }

    /// Translated texts, a JSON array of strings in segment order
    pub fn load_translations<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        Self::load_json(path)
    }
}
