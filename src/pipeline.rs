/*!
 * Pipeline orchestrator.
 *
 * Runs the stages for one document in dependency order:
 * 1. Column detection per page
 * 2. Asset anchoring (all assets before anything reads the anchors)
 * 3. Marker injection with document-wide validation
 * 4. Segmentation, checked against the block count
 * 5. Translation through a `SegmentTranslator`
 * 6. Merge, then decode of the protected literals
 *
 * Each stage is atomic: a failure aborts the document and no partially
 * processed output is returned. Stages are also exposed one by one so a
 * caller can checkpoint to disk between them.
 */

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::app_config::Config;
use crate::document::{AssetLedger, Document};
use crate::errors::PipelineError;
use crate::layout::{AnchorReport, AssetAnchorer, ColumnDetector, ColumnLayout};
use crate::markers::{MarkerInjector, count_markers};
use crate::translation::{
    PlaceholderCodec, SegmentBatch, SegmentTranslator, Segmenter, check_segmentation, decode_document,
};

/// Settings of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub epsilon: f64,
    pub min_points: usize,
    pub tolerance_pt: f64,
    pub tolerance_pct: f64,
    pub source_language: String,
    pub target_language: String,
    /// Restore protected literals right after merge
    pub decode_after_merge: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            epsilon: crate::layout::columns::DEFAULT_EPSILON,
            min_points: crate::layout::columns::DEFAULT_MIN_POINTS,
            tolerance_pt: crate::layout::anchoring::DEFAULT_TOLERANCE_PT,
            tolerance_pct: crate::layout::anchoring::DEFAULT_TOLERANCE_PCT,
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            decode_after_merge: true,
        }
    }
}

impl PipelineConfig {
    /// Default settings for a language pair.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    pub fn with_decode_after_merge(mut self, enabled: bool) -> Self {
        self.decode_after_merge = enabled;
        self
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            epsilon: config.columns.epsilon,
            min_points: config.columns.min_points,
            tolerance_pt: config.anchoring.tolerance_pt,
            tolerance_pct: config.anchoring.tolerance_pct,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            decode_after_merge: config.segmentation.decode_after_merge,
        }
    }
}

/// Stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Columns,
    Anchoring,
    Injection,
    Segmentation,
    Translation,
    Merge,
    Decode,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Columns => "columns",
            Self::Anchoring => "anchoring",
            Self::Injection => "injection",
            Self::Segmentation => "segmentation",
            Self::Translation => "translation",
            Self::Merge => "merge",
            Self::Decode => "decode",
        };
        write!(f, "{}", name)
    }
}

/// Wall time spent in one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub duration_ms: u64,
}

/// Counts and timings of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique id of the run
    pub run_id: String,

    /// RFC 3339 start time
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_ref: Option<String>,

    /// Name of the translator used
    pub translator: String,

    pub blocks: usize,
    pub columns: usize,
    pub assets: usize,
    pub anchored_assets: usize,

    /// Assets anchored outside their own column
    pub fallback_anchors: usize,

    pub pages_without_assets: Vec<u32>,
    pub markers: usize,
    pub segments: usize,

    /// Segments that carry at least one placeholder
    pub protected_segments: usize,

    pub stage_timings: Vec<StageTiming>,
    pub total_duration_ms: u64,
}

impl PipelineReport {
    fn start(source_document_ref: Option<String>, translator: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            source_document_ref,
            translator: translator.to_string(),
            blocks: 0,
            columns: 0,
            assets: 0,
            anchored_assets: 0,
            fallback_anchors: 0,
            pages_without_assets: Vec::new(),
            markers: 0,
            segments: 0,
            protected_segments: 0,
            stage_timings: Vec::new(),
            total_duration_ms: 0,
        }
    }

    fn record_stage(&mut self, stage: PipelineStage, elapsed: Duration) {
        debug!("Stage {} finished in {:?}", stage, elapsed);
        self.stage_timings.push(StageTiming {
            stage,
            duration_ms: elapsed.as_millis() as u64,
        });
    }

    /// Time spent in a stage, if it ran
    pub fn stage_duration_ms(&self, stage: PipelineStage) -> Option<u64> {
        self.stage_timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.duration_ms)
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!("Duration: {}ms", self.total_duration_ms));
        parts.push(format!("Blocks: {} in {} column(s)", self.blocks, self.columns));
        parts.push(format!(
            "Assets: {}/{} anchored ({} fallback)",
            self.anchored_assets, self.assets, self.fallback_anchors
        ));
        parts.push(format!("Markers: {}", self.markers));
        parts.push(format!(
            "Segments: {} ({} protected) via {}",
            self.segments, self.protected_segments, self.translator
        ));

        parts.join(" | ")
    }
}

/// Everything a full run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Ledger with every asset anchored
    pub ledger: AssetLedger,
    /// Document with markers injected, before translation
    pub marked_document: Document,
    /// Segments sent to the translator
    pub batch: SegmentBatch,
    /// Translated document, decoded unless decoding was disabled
    pub translated_document: Document,
    pub report: PipelineReport,
}

/// Orchestrates the stages for one document at a time.
///
/// Holds no per-run state, so independent documents can be processed by
/// separate calls, or separate pipelines, in parallel.
pub struct Pipeline {
    config: PipelineConfig,
    detector: ColumnDetector,
    anchorer: AssetAnchorer,
    injector: MarkerInjector,
    segmenter: Segmenter,
}

impl Pipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        let detector = ColumnDetector::new(config.epsilon, config.min_points);
        let anchorer = AssetAnchorer::new(config.tolerance_pt, config.tolerance_pct);

        Self {
            config,
            detector,
            anchorer,
            injector: MarkerInjector::new(),
            segmenter: Segmenter::new(),
        }
    }

    /// Create a pipeline with default settings for a language pair.
    pub fn for_languages(source_language: &str, target_language: &str) -> Self {
        Self::new(PipelineConfig::new(source_language, target_language))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage 1: column layout of every page.
    pub fn detect_columns(&self, document: &Document) -> ColumnLayout {
        self.detector.detect_layout(document)
    }

    /// Stage 2: anchor every asset of the ledger.
    ///
    /// A ledger whose assets are all anchored already is accepted as is, which
    /// lets a run resume from a saved anchored ledger.
    pub fn anchor(
        &self,
        document: &Document,
        ledger: &mut AssetLedger,
        layout: &ColumnLayout,
    ) -> Result<AnchorReport, PipelineError> {
        if !ledger.assets.is_empty() && ledger.unanchored().next().is_none() {
            info!("All {} asset(s) already anchored, skipping anchoring", ledger.assets.len());
            return Ok(AnchorReport::default());
        }

        Ok(self.anchorer.anchor_all(document, ledger, layout)?)
    }

    /// Stage 3: inject markers for the anchored ledger.
    pub fn inject(&self, document: &Document, ledger: &AssetLedger) -> Result<Document, PipelineError> {
        Ok(self.injector.inject(document, ledger)?)
    }

    /// Stage 4: segment the marked document, checking one segment per block.
    pub fn segment(&self, document: &Document) -> Result<SegmentBatch, PipelineError> {
        let batch = self.segmenter.segment_batch(
            document,
            &self.config.source_language,
            &self.config.target_language,
        );
        check_segmentation(document, &batch.segments)?;
        Ok(batch)
    }

    /// Stage 5: run the translator and check it kept the batch shape.
    pub fn translate(&self, batch: &SegmentBatch, translator: &dyn SegmentTranslator) -> Result<Vec<String>, PipelineError> {
        let translated = translator
            .translate(batch)
            .map_err(|e| PipelineError::Translator(format!("{}: {:#}", translator.name(), e)))?;

        for (segment, text) in batch.segments.iter().zip(&translated) {
            let check = PlaceholderCodec::verify(text, &segment.mapping);
            if !check.missing.is_empty() {
                warn!(
                    "Segment {} lost placeholder(s): {}",
                    segment.segment_id,
                    check.missing.join(", ")
                );
            }
        }

        Ok(translated)
    }

    /// Stage 6: merge translated texts, then decode when configured to.
    pub fn merge(
        &self,
        document: &Document,
        batch: &SegmentBatch,
        translated: &[String],
    ) -> Result<Document, PipelineError> {
        let merged = self.segmenter.merge(document, &batch.segments, translated)?;
        if self.config.decode_after_merge {
            decode_document(&merged, &batch.segments)
        } else {
            Ok(merged)
        }
    }

    /// Run every stage on one document.
    pub fn run(
        &self,
        document: &Document,
        ledger: &AssetLedger,
        translator: &dyn SegmentTranslator,
    ) -> Result<PipelineOutput, PipelineError> {
        let run_start = Instant::now();
        let mut report = PipelineReport::start(document.source_ref.clone(), translator.name());
        info!(
            "Starting run {} ({} -> {})",
            report.run_id, self.config.source_language, self.config.target_language
        );

        let stage_start = Instant::now();
        let layout = self.detect_columns(document);
        report.blocks = document.total_block_count();
        report.columns = layout.total_columns();
        report.record_stage(PipelineStage::Columns, stage_start.elapsed());

        let stage_start = Instant::now();
        let mut ledger = ledger.clone();
        let anchor_report = self.anchor(document, &mut ledger, &layout)?;
        report.assets = ledger.assets.len();
        report.anchored_assets = ledger.anchored().count();
        report.fallback_anchors = anchor_report.fallback_count;
        report.pages_without_assets = anchor_report.pages_without_assets;
        report.record_stage(PipelineStage::Anchoring, stage_start.elapsed());

        let stage_start = Instant::now();
        let marked_document = self.inject(document, &ledger)?;
        report.markers = count_markers(&marked_document);
        report.record_stage(PipelineStage::Injection, stage_start.elapsed());

        let stage_start = Instant::now();
        let batch = self.segment(&marked_document)?;
        report.segments = batch.len();
        report.protected_segments = batch.segments.iter().filter(|s| !s.mapping.is_empty()).count();
        report.record_stage(PipelineStage::Segmentation, stage_start.elapsed());

        let stage_start = Instant::now();
        let translated = self.translate(&batch, translator)?;
        report.record_stage(PipelineStage::Translation, stage_start.elapsed());

        let stage_start = Instant::now();
        let merged = self.segmenter.merge(&marked_document, &batch.segments, &translated)?;
        report.record_stage(PipelineStage::Merge, stage_start.elapsed());

        let translated_document = if self.config.decode_after_merge {
            let stage_start = Instant::now();
            let decoded = decode_document(&merged, &batch.segments)?;
            report.record_stage(PipelineStage::Decode, stage_start.elapsed());

            let restored = count_markers(&decoded);
            if restored != report.markers {
                warn!(
                    "Translated document carries {} marker(s), expected {}",
                    restored, report.markers
                );
            }
            decoded
        } else {
            merged
        };

        report.total_duration_ms = run_start.elapsed().as_millis() as u64;
        info!("Run {} complete: {}", report.run_id, report.summary());

        Ok(PipelineOutput {
            ledger,
            marked_document,
            batch,
            translated_document,
            report,
        })
    }
}
