/*!
 * Stage-by-stage runs checkpointed to disk and resumed
 */

use anyhow::Result;

use docweave::file_utils::FileManager;
use docweave::pipeline::Pipeline;
use docweave::translation::{PseudoTranslator, SegmentTranslator};

use crate::common::{create_temp_dir, create_test_file, init_logging, pattern_document, pattern_ledger};

#[test]
fn test_stages_resumedFromDisk_shouldMatchSingleRun() -> Result<()> {
    init_logging();
    let temp_dir = create_temp_dir()?;
    let dir = temp_dir.path();
    let pipeline = Pipeline::for_languages("en", "fr");
    let translator = PseudoTranslator::new();

    let doc_path = dir.join("mittens.doc.json");
    FileManager::save_document(&doc_path, &pattern_document())?;
    FileManager::save_ledger(FileManager::sibling_ledger_path(&doc_path), &pattern_ledger())?;

    // Anchoring
    let document = FileManager::load_document(&doc_path)?;
    let mut ledger = FileManager::load_ledger(dir.join("mittens.ledger.json"))?;
    let layout = pipeline.detect_columns(&document);
    pipeline.anchor(&document, &mut ledger, &layout)?;
    let anchored_path = FileManager::generate_output_path(&doc_path, dir, "anchored.ledger.json");
    FileManager::save_ledger(&anchored_path, &ledger)?;

    // Injection
    let ledger = FileManager::load_ledger(&anchored_path)?;
    let marked = pipeline.inject(&document, &ledger)?;
    let marked_path = FileManager::generate_output_path(&doc_path, dir, "marked.doc.json");
    FileManager::save_document(&marked_path, &marked)?;

    // Segmentation
    let marked = FileManager::load_document(&marked_path)?;
    let batch = pipeline.segment(&marked)?;
    let batch_path = FileManager::generate_output_path(&doc_path, dir, "segments.json");
    FileManager::save_batch(&batch_path, &batch)?;

    // Translation happens outside, results come back as a JSON array
    let batch = FileManager::load_batch(&batch_path)?;
    let translated = translator.translate(&batch)?;
    let translations_path = create_test_file(dir, "mittens.fr.json", &serde_json::to_string(&translated)?)?;

    // Merge
    let translated = FileManager::load_translations(&translations_path)?;
    let merged = pipeline.merge(&marked, &batch, &translated)?;

    let single = pipeline.run(&pattern_document(), &pattern_ledger(), &translator)?;
    assert_eq!(merged, single.translated_document);
    assert_eq!(ledger, single.ledger);
    assert_eq!(batch, single.batch);
    assert_eq!(anchored_path, dir.join("mittens.anchored.ledger.json"));
    Ok(())
}

#[test]
fn test_run_withAnchoredLedgerFromDisk_shouldSkipAnchoring() -> Result<()> {
    let temp_dir = create_temp_dir()?;
    let pipeline = Pipeline::for_languages("en", "fr");
    let first = pipeline.run(&pattern_document(), &pattern_ledger(), &PseudoTranslator::new())?;

    let ledger_path = temp_dir.path().join("mittens.anchored.ledger.json");
    FileManager::save_ledger(&ledger_path, &first.ledger)?;
    let anchored = FileManager::load_ledger(&ledger_path)?;

    let resumed = pipeline.run(&pattern_document(), &anchored, &PseudoTranslator::new())?;

    assert_eq!(resumed.ledger, first.ledger);
    assert_eq!(resumed.translated_document, first.translated_document);
    assert_eq!(resumed.report.anchored_assets, 4);
    // Skipped anchoring reports no per-page statistics
    assert!(resumed.report.pages_without_assets.is_empty());
    Ok(())
}

#[test]
fn test_resume_markedDocumentAgain_shouldNotDuplicateMarkers() -> Result<()> {
    let pipeline = Pipeline::for_languages("en", "fr");
    let first = pipeline.run(&pattern_document(), &pattern_ledger(), &PseudoTranslator::new())?;

    let again = pipeline.inject(&first.marked_document, &first.ledger)?;

    assert_eq!(again, first.marked_document);
    Ok(())
}

#[test]
fn test_loadDocument_missingFile_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let result = FileManager::load_document(temp_dir.path().join("absent.doc.json"));

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("File does not exist"));
}
