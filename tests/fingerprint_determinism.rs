mod common;

use common::{make_doc, make_titled_doc, published};
use legis_ingest::document::{fingerprint, normalize_title, Document};
use legis_ingest::error::IngestError;
use legis_ingest::types::{ContentHash, IdentityKey, MetadataKey, SourceTag};

#[test]
fn golden_content_hash() {
    let fp = fingerprint(&make_doc("senado", "123", "Altera a Lei 8.666")).unwrap();
    assert_eq!(
        fp.content_hash.as_str(),
        "sha256:4b98c1bf29ee1cf2e624b0e1cb67edad4589c2a1bc7fbed1277409f7e7cd1667"
    );
}

#[test]
fn invariant_same_document_same_fingerprint() {
    let a = fingerprint(&make_doc("senado", "123", "A")).unwrap();
    let b = fingerprint(&make_doc("senado", "123", "A")).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a.content_hash.as_str(),
        "sha256:559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd"
    );
}

#[test]
fn invariant_whitespace_does_not_change_content_hash() {
    let tidy = fingerprint(&make_doc("senado", "1", "Altera a Lei 8.666")).unwrap();
    let messy = fingerprint(&make_doc("senado", "1", "  Altera   a\n\tLei 8.666 \n")).unwrap();
    assert_eq!(tidy.content_hash, messy.content_hash);
}

#[test]
fn content_case_is_significant() {
    let lower = fingerprint(&make_doc("senado", "1", "altera")).unwrap();
    let upper = fingerprint(&make_doc("senado", "1", "ALTERA")).unwrap();
    assert_ne!(lower.content_hash, upper.content_hash);
}

#[test]
fn missing_or_blank_content_gets_sentinel() {
    let mut doc = make_doc("senado", "1", "x");
    doc.content = None;
    assert!(fingerprint(&doc).unwrap().content_hash.is_empty_sentinel());

    let blank = make_doc("senado", "1", "   \n ");
    let fp = fingerprint(&blank).unwrap();
    assert_eq!(fp.content_hash, ContentHash::empty());
    assert_eq!(fp.content_hash.as_str(), ContentHash::EMPTY);
}

#[test]
fn metadata_key_normalizes_title_and_uses_day() {
    let a = make_titled_doc("senado", "1", "Reforma  TRIBUTÁRIA", "a");
    let mut b = make_titled_doc("senado", "2", " reforma tributária ", "b");
    // Same day, different hour.
    b.published_at = published(2024, 3, 15) + chrono::Duration::hours(9);

    let fa = fingerprint(&a).unwrap();
    let fb = fingerprint(&b).unwrap();
    assert_eq!(fa.metadata_key, fb.metadata_key);
    assert_eq!(
        fa.metadata_key,
        MetadataKey::from_parts("reforma tributária", "2024-03-15", &SourceTag::new("senado"))
    );

    let other_source = make_titled_doc("camara", "1", "Reforma tributária", "a");
    assert_ne!(fingerprint(&other_source).unwrap().metadata_key, fa.metadata_key);
}

#[test]
fn normalize_title_collapses_whitespace() {
    assert_eq!(normalize_title("  Dispõe   sobre\tO  Tema "), "dispõe sobre o tema");
}

#[test]
fn blank_identity_key_is_invalid() {
    let doc = Document::new(
        SourceTag::new("senado"),
        IdentityKey::new("   "),
        "Sem título",
        "",
        published(2024, 1, 1),
        "PL",
    );
    assert!(matches!(fingerprint(&doc), Err(IngestError::InvalidDocument(_))));
}

#[test]
fn blank_source_is_invalid() {
    let doc = make_doc("", "123", "A");
    assert!(matches!(fingerprint(&doc), Err(IngestError::InvalidDocument(_))));
}
