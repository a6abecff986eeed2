mod common;

use tkr_receipts::numbering::{COUNTER_KEY, ReceiptCounter};
use tkr_receipts::receipts::ReceiptDatabase;
use tkr_receipts::{Assets, KeyValueStore, MemoryStore, ReceiptGenerator};

#[test]
fn counter_advances_once_per_generation() {
    common::init_logging();
    let store = MemoryStore::new();
    store.set(COUNTER_KEY, "7").unwrap();
    let assets = Assets::fallback();
    let out = tempfile::tempdir().unwrap();
    let generator = ReceiptGenerator::new(&store, &assets, "TKR2025");

    let k = 4;
    let numbers: Vec<String> = (0..k)
        .map(|_| {
            generator
                .generate(&common::sample_details(), out.path())
                .expect("generate")
                .receipt_number
        })
        .collect();

    assert_eq!(ReceiptCounter::new(&store, "TKR2025").peek(), 7 + k);
    assert_eq!(numbers, ["TKR2025-0007", "TKR2025-0008", "TKR2025-0009", "TKR2025-0010"]);
    assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(ReceiptDatabase::new(&store).list().len(), k as usize);
}

#[test]
fn generated_file_is_a_pdf_named_after_the_number() {
    let store = MemoryStore::new();
    let assets = Assets::fallback();
    let out = tempfile::tempdir().unwrap();
    let generator = ReceiptGenerator::new(&store, &assets, "TKR2025");

    let result = generator.generate(&common::sample_details(), out.path()).unwrap();
    assert_eq!(result.path, out.path().join("Receipt_TKR2025-0001.pdf"));
    let bytes = std::fs::read(&result.path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let stored = ReceiptDatabase::new(&store)
        .get(result.record_id.as_deref().unwrap())
        .expect("record stored");
    assert_eq!(stored.receipt_number, "TKR2025-0001");
    assert_eq!(stored.received_from, "Karim Haddad");
    assert_eq!(stored.advertisements.zones, ["Zone B", "Zone E"]);
    assert!(stored.services.electricity && !stored.services.chairs);
}

#[test]
fn failed_write_leaves_counter_and_log_untouched() {
    let store = MemoryStore::new();
    let assets = Assets::fallback();
    let generator = ReceiptGenerator::new(&store, &assets, "TKR2025");
    // A regular file where the output directory should be
    let blocker = tempfile::NamedTempFile::new().unwrap();

    assert!(generator.generate(&common::sample_details(), blocker.path()).is_err());
    assert_eq!(store.get(COUNTER_KEY), None);
    assert!(ReceiptDatabase::new(&store).list().is_empty());
    assert_eq!(generator.next_number(), "TKR2025-0001");
}

#[test]
fn preview_does_not_number_or_record() {
    let store = MemoryStore::new();
    let assets = Assets::fallback();
    let out = tempfile::tempdir().unwrap();
    let generator = ReceiptGenerator::new(&store, &assets, "TKR2025");

    let result = generator.preview(&common::sample_details(), out.path()).unwrap();
    assert!(result.record_id.is_none());
    assert!(result.path.exists());
    assert!(
        result
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Receipt_")
    );
    assert_eq!(generator.next_number(), "TKR2025-0001");
    assert!(ReceiptDatabase::new(&store).list().is_empty());
}
