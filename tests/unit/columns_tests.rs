/*!
 * Tests for column detection on whole pages
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use docweave::document::{BlockKind, ContentBlock};
use docweave::layout::ColumnDetector;

use crate::common::{block, init_logging, pattern_document, rect};

#[test]
fn test_detect_twoColumnsWithSpanningBlock_shouldAssignByCenter() {
    init_logging();
    let blocks = vec![
        block("para.s.001", BlockKind::Paragraph, "a", 1, 0, Some(rect(50.0, 100.0, 250.0, 150.0))),
        block("para.s.002", BlockKind::Paragraph, "b", 1, 1, Some(rect(50.0, 160.0, 250.0, 210.0))),
        block("para.s.003", BlockKind::Paragraph, "c", 1, 2, Some(rect(50.0, 220.0, 250.0, 270.0))),
        block("para.s.004", BlockKind::Paragraph, "d", 1, 3, Some(rect(280.0, 100.0, 480.0, 150.0))),
        block("para.s.005", BlockKind::Paragraph, "e", 1, 4, Some(rect(280.0, 160.0, 480.0, 210.0))),
        block("para.s.006", BlockKind::Paragraph, "f", 1, 5, Some(rect(280.0, 220.0, 480.0, 270.0))),
        block("para.s.007", BlockKind::Paragraph, "wide", 1, 6, Some(rect(50.0, 300.0, 450.0, 350.0))),
    ];
    let refs: Vec<&ContentBlock> = blocks.iter().collect();

    let columns = ColumnDetector::default().detect(&refs);

    assert_eq!(columns.len(), 2);
    assert!(columns[0].contains_block("para.s.007"));
    assert_eq!(columns[0].x_min, 50.0);
    assert_eq!(columns[0].x_max, 250.0);
    assert_eq!(columns[0].y_max, 350.0);
    assert_eq!(columns[1].x_min, 280.0);
    assert_eq!(columns[1].x_max, 480.0);
}

#[test]
fn test_detect_fullWidthHeadingsOverRightColumn_shouldNotOverlap() {
    let blocks = vec![
        block("head.s.001", BlockKind::Heading, "a", 1, 0, Some(rect(50.0, 40.0, 450.0, 70.0))),
        block("head.s.002", BlockKind::Heading, "b", 1, 1, Some(rect(50.0, 80.0, 450.0, 110.0))),
        block("head.s.003", BlockKind::Heading, "c", 1, 2, Some(rect(50.0, 120.0, 450.0, 150.0))),
        block("para.s.004", BlockKind::Paragraph, "d", 1, 3, Some(rect(280.0, 200.0, 480.0, 250.0))),
        block("para.s.005", BlockKind::Paragraph, "e", 1, 4, Some(rect(280.0, 260.0, 480.0, 310.0))),
        block("para.s.006", BlockKind::Paragraph, "f", 1, 5, Some(rect(280.0, 320.0, 480.0, 370.0))),
    ];
    let refs: Vec<&ContentBlock> = blocks.iter().collect();
    let detector = ColumnDetector::default();

    let columns = detector.detect(&refs);

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].block_ids, vec!["head.s.001", "head.s.002", "head.s.003"]);
    assert_eq!(columns[0].x_min, 50.0);
    assert_eq!(columns[0].x_max, 280.0);
    assert_eq!(columns[1].x_min, 280.0);
    assert_eq!(columns[1].x_max, 480.0);
    assert!(columns[0].x_max <= columns[1].x_min + detector.epsilon());
}

#[test]
fn test_detect_indentedListInsideColumn_shouldKeepParagraphBounds() {
    let blocks = vec![
        block("para.s.001", BlockKind::Paragraph, "a", 1, 0, Some(rect(50.0, 100.0, 250.0, 150.0))),
        block("list.s.002", BlockKind::List, "- b", 1, 1, Some(rect(85.0, 160.0, 250.0, 180.0))),
        block("list.s.003", BlockKind::List, "- c", 1, 2, Some(rect(85.0, 190.0, 250.0, 210.0))),
        block("list.s.004", BlockKind::List, "- d", 1, 3, Some(rect(85.0, 220.0, 250.0, 240.0))),
        block("para.s.005", BlockKind::Paragraph, "e", 1, 4, Some(rect(50.0, 250.0, 250.0, 300.0))),
        block("para.s.006", BlockKind::Paragraph, "f", 1, 5, Some(rect(50.0, 310.0, 250.0, 360.0))),
    ];
    let refs: Vec<&ContentBlock> = blocks.iter().collect();

    let columns = ColumnDetector::default().detect(&refs);

    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].block_ids.len(), 6);
    assert_eq!(columns[0].x_min, 50.0);
    assert_eq!(columns[0].x_max, 250.0);
    assert_eq!(columns[0].y_min, 100.0);
    assert_eq!(columns[0].y_max, 360.0);
}

#[test]
fn test_detect_indentedListBesideSecondColumn_shouldFindTwoColumns() {
    let blocks = vec![
        block("para.s.001", BlockKind::Paragraph, "a", 1, 0, Some(rect(50.0, 100.0, 250.0, 150.0))),
        block("para.s.002", BlockKind::Paragraph, "b", 1, 1, Some(rect(50.0, 160.0, 250.0, 210.0))),
        block("para.s.003", BlockKind::Paragraph, "c", 1, 2, Some(rect(50.0, 220.0, 250.0, 270.0))),
        block("list.s.004", BlockKind::List, "- d", 1, 3, Some(rect(85.0, 280.0, 250.0, 300.0))),
        block("list.s.005", BlockKind::List, "- e", 1, 4, Some(rect(85.0, 310.0, 250.0, 330.0))),
        block("list.s.006", BlockKind::List, "- f", 1, 5, Some(rect(85.0, 340.0, 250.0, 360.0))),
        block("para.s.007", BlockKind::Paragraph, "g", 1, 6, Some(rect(300.0, 100.0, 500.0, 150.0))),
        block("para.s.008", BlockKind::Paragraph, "h", 1, 7, Some(rect(300.0, 160.0, 500.0, 210.0))),
        block("para.s.009", BlockKind::Paragraph, "i", 1, 8, Some(rect(300.0, 220.0, 500.0, 270.0))),
    ];
    let refs: Vec<&ContentBlock> = blocks.iter().collect();

    let columns = ColumnDetector::default().detect(&refs);

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].block_ids.len(), 6);
    assert_eq!(columns[0].x_min, 50.0);
    assert_eq!(columns[0].x_max, 250.0);
    assert_eq!(columns[1].x_min, 300.0);
    assert_eq!(columns[1].x_max, 500.0);
}

#[test]
fn test_detectLayout_patternDocument_shouldQualifyIdsPerPage() {
    let doc = pattern_document();
    let layout = ColumnDetector::default().detect_layout(&doc);

    assert_eq!(layout.columns_on_page(1).len(), 2);
    assert_eq!(layout.columns_on_page(2).len(), 1);
    assert_eq!(layout.total_columns(), 3);
    assert!(layout.columns_on_page(3).is_empty());

    assert_eq!(layout.column_of("head.s1.001").unwrap().id, "p1-col0");
    assert_eq!(layout.column_of("fig.s1.007").unwrap().id, "p1-col1");
    // Unplaced block follows the placed block before it
    assert_eq!(layout.column_of("para.s2.002").unwrap().id, "p2-col0");
}

#[test]
fn test_detect_randomColumnPages_shouldPartitionBlocks() {
    let mut rng = StdRng::seed_from_u64(7);
    let detector = ColumnDetector::default();

    for _ in 0..50 {
        let column_count = rng.random_range(1..=3);
        let mut blocks = Vec::new();
        let mut order = 0;

        for column in 0..column_count {
            let base = 50.0 + 250.0 * column as f64;
            for row in 0..rng.random_range(3..=6) {
                let x0 = base + rng.random_range(0.0..20.0);
                let x1 = base + 180.0 + rng.random_range(0.0..20.0);
                let y0 = 60.0 * row as f64 + 10.0;
                blocks.push(block(
                    &format!("para.c{}.{:03}", column, row),
                    BlockKind::Paragraph,
                    "text",
                    1,
                    order,
                    Some(rect(x0, y0, x1, y0 + 50.0)),
                ));
                order += 1;
            }
        }
        if column_count > 1 && rng.random_bool(0.5) {
            blocks.push(block(
                "head.wide.001",
                BlockKind::Heading,
                "title",
                1,
                order,
                Some(rect(50.0, 400.0, 250.0 * column_count as f64, 430.0)),
            ));
        }

        let refs: Vec<&ContentBlock> = blocks.iter().collect();
        let columns = detector.detect(&refs);

        assert_eq!(columns.len(), column_count);
        for b in &blocks {
            let owners = columns.iter().filter(|c| c.contains_block(&b.id)).count();
            assert_eq!(owners, 1, "block {} owned by {} columns", b.id, owners);
        }
        for pair in columns.windows(2) {
            assert!(pair[0].x_min < pair[1].x_min);
            assert!(pair[0].x_max <= pair[1].x_min + detector.epsilon());
        }
    }
}
