/*!
 * Tests for the placeholder codec on generated text
 */

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use docweave::translation::PlaceholderCodec;

static ID_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(ASSET_[A-Z0-9-]+|PH[0-9]{3,})$").unwrap());

/// Substrings that must never reach a translator
const FRAGILE: &[&str] = &[
    "https://example.com/gauge",
    "http://yarn.example.org/colours?id=42",
    "help@example.org",
    "knit.along@mail.example.com",
    "1,234.5",
    "86,5",
    "3.75",
    "[[img-abcdef01-p3-occ1]]",
    "[[tbl-00ff00aa-p12-occ2]]",
];

/// Tokens that translate as ordinary text
const PLAIN: &[&str] = &["Knit", "purl", "22", "sts", "café", "Größe", "rib", "100%", "(wool)", "naïve", "5"];

const SEPARATORS: &[&str] = &[" ", "\n", "  ", " \n", ", ", ". ", "\t", "\n\n"];

fn random_text(rng: &mut StdRng) -> String {
    let count = rng.random_range(0..24);
    let mut text = String::new();
    for _ in 0..count {
        let token = if rng.random_bool(0.35) {
            FRAGILE[rng.random_range(0..FRAGILE.len())]
        } else {
            PLAIN[rng.random_range(0..PLAIN.len())]
        };
        text.push_str(token);
        text.push_str(SEPARATORS[rng.random_range(0..SEPARATORS.len())]);
    }
    text
}

#[test]
fn test_encode_yarnAndNeedles_shouldKeepPlainIntegers() {
    let text = "Yarn: 200g\nNeedles: 4mm";

    let protected = PlaceholderCodec::encode(text);

    assert_eq!(protected.text, text);
    assert!(protected.mapping.is_empty());
    assert_eq!(PlaceholderCodec::decode(&protected.text, &protected.mapping).unwrap(), text);
}

#[test]
fn test_encode_randomText_shouldRoundTrip() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..300 {
        let text = random_text(&mut rng);
        let protected = PlaceholderCodec::encode(&text);
        let decoded = PlaceholderCodec::decode(&protected.text, &protected.mapping).unwrap();
        assert_eq!(decoded, text);
    }
}

#[test]
fn test_encode_randomText_shouldPreserveNewlines() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..300 {
        let text = random_text(&mut rng);
        let protected = PlaceholderCodec::encode(&text);
        assert_eq!(
            protected.text.matches('\n').count(),
            text.matches('\n').count(),
            "newlines changed for {:?}",
            text
        );
    }
}

#[test]
fn test_encode_randomText_shouldHideEveryFragileLiteral() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..300 {
        let text = random_text(&mut rng);
        let protected = PlaceholderCodec::encode(&text);

        for literal in FRAGILE {
            assert!(
                !protected.text.contains(literal),
                "{:?} leaked into {:?}",
                literal,
                protected.text
            );
            if text.contains(literal) {
                assert!(
                    protected.mapping.values().any(|v| v == literal),
                    "{:?} missing from mapping",
                    literal
                );
            }
        }
        for id in protected.mapping.keys() {
            assert!(ID_FORMAT.is_match(id), "bad placeholder id {}", id);
        }
        assert!(PlaceholderCodec::verify(&protected.text, &protected.mapping).passed());
    }
}

#[test]
fn test_encode_numberFollowedByEmail_shouldProtectBoth() {
    let text = "1,234.5info@example.org";

    let protected = PlaceholderCodec::encode(text);

    assert_eq!(protected.text, "<ph id=\"PH001\" /><ph id=\"PH002\" />");
    assert_eq!(protected.mapping.get("PH001").map(String::as_str), Some("1,234.5"));
    assert_eq!(protected.mapping.get("PH002").map(String::as_str), Some("info@example.org"));
}

#[test]
fn test_encode_emailFollowedByNumber_shouldKeepNumberWhole() {
    let text = "info@b.com1,234.56";

    let protected = PlaceholderCodec::encode(text);

    assert_eq!(protected.text, "<ph id=\"PH001\" /><ph id=\"PH002\" />");
    assert_eq!(protected.mapping.get("PH001").map(String::as_str), Some("info@b.com"));
    assert_eq!(protected.mapping.get("PH002").map(String::as_str), Some("1,234.56"));
}

#[test]
fn test_encode_adjacentFragileLiterals_shouldLeakNothing() {
    let cases: &[(&str, &[&str])] = &[
        ("[[img-abcdef01-p3-occ1]]https://example.com/gauge", &["[[img-abcdef01-p3-occ1]]", "https://example.com/gauge"]),
        ("help@example.org3.75", &["help@example.org", "3.75"]),
        ("3.75[[img-abcdef01-p3-occ1]]86,5", &["3.75", "[[img-abcdef01-p3-occ1]]", "86,5"]),
        ("1,234.5help@example.org[[tbl-00ff00aa-p12-occ2]]", &["1,234.5", "help@example.org", "[[tbl-00ff00aa-p12-occ2]]"]),
    ];

    for (text, literals) in cases {
        let protected = PlaceholderCodec::encode(text);

        for literal in *literals {
            assert!(!protected.text.contains(literal), "{:?} leaked into {:?}", literal, protected.text);
            assert!(
                protected.mapping.values().any(|v| v == literal),
                "{:?} not protected on its own in {:?}",
                literal,
                text
            );
        }
        assert_eq!(PlaceholderCodec::decode(&protected.text, &protected.mapping).unwrap(), *text);
    }
}

#[test]
fn test_encode_sourceWithLiteralTag_shouldRoundTrip() {
    let text = "Escape <ph id=\"PH001\" /> before 1,5 cm\nand <ph id=\"x\"/>";

    let protected = PlaceholderCodec::encode(text);

    assert_eq!(protected.mapping.get("PH001").map(String::as_str), Some("<ph id=\"PH001\" />"));
    assert_eq!(PlaceholderCodec::decode(&protected.text, &protected.mapping).unwrap(), text);
}

#[test]
fn test_encode_assetMarker_shouldUseAssetPlaceholder() {
    let protected = PlaceholderCodec::encode("[[img-abc-p0-occ1]]\nCast on 60 sts");

    assert_eq!(protected.text, "<ph id=\"ASSET_IMG-ABC-P0-OCC1\" />\nCast on 60 sts");
    assert_eq!(
        PlaceholderCodec::asset_placeholder_id("img-abc-p0-occ1"),
        "ASSET_IMG-ABC-P0-OCC1"
    );
}
