/*!
 * Tests for asset anchoring against detected columns
 */

use docweave::document::{Asset, AssetKind, AssetLedger, BlockKind, ContentBlock, Document, Section, content_hash};
use docweave::errors::{AnchorError, GeometryError};
use docweave::layout::{AnchorMethod, AssetAnchorer, Column, ColumnDetector, check_geometry_preserved, normalize};

use crate::common::{
    block, chart_asset, finishing_asset, init_logging, pattern_document, pattern_ledger, photo_asset, rect,
    size_table_asset,
};

fn body_column() -> Column {
    Column {
        id: "p1-col0".to_string(),
        x_min: 50.0,
        x_max: 250.0,
        y_min: 100.0,
        y_max: 700.0,
        block_ids: Vec::new(),
    }
}

#[test]
fn test_normalize_assetInColumn_shouldUseColumnFractions() {
    let n = normalize(&rect(60.0, 110.0, 160.0, 210.0), &body_column()).unwrap();

    assert!((n.x - 0.05).abs() < 1e-9);
    assert!((n.y - 10.0 / 600.0).abs() < 1e-9);
    assert!((n.w - 0.5).abs() < 1e-9);
    assert!((n.h - 100.0 / 600.0).abs() < 1e-9);
    assert!(n.is_within_unit());
}

#[test]
fn test_checkGeometryPreserved_withinTolerance_shouldPass() {
    let column = body_column();
    let original = rect(60.0, 110.0, 160.0, 210.0);

    let nudged = rect(61.5, 110.0, 161.5, 210.0);
    assert!(check_geometry_preserved(&original, &nudged, &column, 2.0, 0.01).unwrap());

    let moved = rect(70.0, 118.0, 170.0, 218.0);
    assert!(!check_geometry_preserved(&original, &moved, &column, 2.0, 0.01).unwrap());

    // A wide asset gets a proportionally larger allowance
    let wide = rect(50.0, 110.0, 250.0, 210.0);
    let shifted = rect(50.0, 112.5, 250.0, 212.5);
    assert!(!check_geometry_preserved(&wide, &shifted, &column, 2.0, 0.01).unwrap());
    assert!(check_geometry_preserved(&wide, &shifted, &column, 2.0, 0.02).unwrap());
}

#[test]
fn test_checkGeometryPreserved_zeroAreaColumn_shouldFail() {
    let mut column = body_column();
    column.y_max = column.y_min;
    let r = rect(60.0, 110.0, 160.0, 210.0);

    let result = check_geometry_preserved(&r, &r, &column, 2.0, 0.01);

    assert!(matches!(result, Err(GeometryError::ZeroAreaColumn { .. })));
}

#[test]
fn test_findAnchor_assetBetweenBlocks_shouldPreferBlockBelow() {
    init_logging();
    let above = block("para.s1.001", BlockKind::Paragraph, "above", 1, 0, Some(rect(50.0, 150.0, 250.0, 190.0)));
    let below = block("para.s1.002", BlockKind::Paragraph, "below", 1, 1, Some(rect(50.0, 310.0, 250.0, 330.0)));
    let mut column = body_column();
    column.block_ids = vec![above.id.clone(), below.id.clone()];
    let columns = vec![column];

    // 10pt from both
    let asset = Asset::new(AssetKind::Image, &content_hash(b"mid"), 1, rect(60.0, 200.0, 240.0, 300.0), 1);
    let candidates: Vec<&ContentBlock> = vec![&above, &below];

    let choice = AssetAnchorer::default()
        .find_anchor(&asset, &candidates, &columns)
        .unwrap();

    assert_eq!(choice.block.id, "para.s1.002");
    assert_eq!(choice.method, AnchorMethod::VerticalDistance);
}

#[test]
fn test_findAnchor_emptyColumn_shouldWidenToPage() {
    let left = block("para.s1.001", BlockKind::Paragraph, "left", 1, 0, Some(rect(50.0, 100.0, 250.0, 200.0)));
    let columns = vec![
        Column {
            block_ids: vec![left.id.clone()],
            ..body_column()
        },
        Column {
            id: "p1-col1".to_string(),
            x_min: 300.0,
            x_max: 500.0,
            y_min: 100.0,
            y_max: 700.0,
            block_ids: Vec::new(),
        },
    ];
    let asset = Asset::new(AssetKind::Vector, &content_hash(b"right"), 1, rect(320.0, 150.0, 480.0, 250.0), 1);
    let candidates: Vec<&ContentBlock> = vec![&left];

    let choice = AssetAnchorer::default()
        .find_anchor(&asset, &candidates, &columns)
        .unwrap();

    assert_eq!(choice.block.id, "para.s1.001");
    assert_eq!(choice.method, AnchorMethod::Widened);
    assert_eq!(choice.column.map(|c| c.id.as_str()), Some("p1-col1"));
}

#[test]
fn test_findAnchor_pageWithoutBlocks_shouldFallBackToReadingOrder() {
    let first = block("para.s1.001", BlockKind::Paragraph, "one", 1, 0, Some(rect(50.0, 100.0, 250.0, 200.0)));
    let last = block("para.s1.002", BlockKind::Paragraph, "two", 1, 1, Some(rect(50.0, 300.0, 250.0, 400.0)));
    let asset = Asset::new(AssetKind::Image, &content_hash(b"p2"), 2, rect(60.0, 100.0, 200.0, 200.0), 1);
    let candidates: Vec<&ContentBlock> = vec![&first, &last];

    let choice = AssetAnchorer::default().find_anchor(&asset, &candidates, &[]).unwrap();

    assert_eq!(choice.block.id, "para.s1.002");
    assert_eq!(choice.method, AnchorMethod::ReadingOrder);
}

#[test]
fn test_anchorAll_patternDocument_shouldBindEveryAssetInItsColumn() {
    init_logging();
    let doc = pattern_document();
    let mut ledger = pattern_ledger();
    let layout = ColumnDetector::default().detect_layout(&doc);

    let report = AssetAnchorer::default()
        .anchor_all(&doc, &mut ledger, &layout)
        .unwrap();

    let anchor_of = |asset: Asset| ledger.asset(&asset.id).and_then(|a| a.anchor_to.clone());
    assert_eq!(anchor_of(photo_asset()).as_deref(), Some("list.s1.004"));
    assert_eq!(anchor_of(chart_asset()).as_deref(), Some("fig.s1.007"));
    assert_eq!(anchor_of(size_table_asset()).as_deref(), Some("table.s1.006"));
    assert_eq!(anchor_of(finishing_asset()).as_deref(), Some("para.s2.001"));

    assert_eq!(report.anchored_count(), 4);
    assert_eq!(report.fallback_count, 0);
    assert_eq!(report.pages_without_assets, vec![3]);
    assert!(report.unanchored.is_empty());

    let chart = report.record(&chart_asset().id).unwrap();
    assert_eq!(chart.method, AnchorMethod::VerticalOverlap);
    assert_eq!(chart.column_id.as_deref(), Some("p1-col1"));
    assert!(chart.normalized.is_some());
}

#[test]
fn test_anchorAll_secondRun_shouldRefuseToReanchor() {
    let doc = pattern_document();
    let mut ledger = pattern_ledger();
    let layout = ColumnDetector::default().detect_layout(&doc);
    let anchorer = AssetAnchorer::default();
    anchorer.anchor_all(&doc, &mut ledger, &layout).unwrap();
    let before = ledger.clone();

    let result = anchorer.anchor_all(&doc, &mut ledger, &layout);

    assert!(matches!(result, Err(AnchorError::AlreadyAnchored { .. })));
    assert_eq!(ledger, before);
}

#[test]
fn test_anchorAll_emptyDocument_shouldLeaveAssetsUnanchored() {
    let doc = Document::new(vec![Section::new("s1")]);
    let mut ledger = AssetLedger::new("empty.pdf", 1).with_asset(photo_asset());
    let layout = ColumnDetector::default().detect_layout(&doc);

    let report = AssetAnchorer::default()
        .anchor_all(&doc, &mut ledger, &layout)
        .unwrap();

    assert_eq!(report.unanchored, vec![photo_asset().id]);
    assert_eq!(ledger.unanchored().count(), 1);
}
