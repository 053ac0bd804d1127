// tests/report_flow.rs
use hse_report::aggregate::{cumulative, monthly_total};
use hse_report::catalog::{LTI, LTIF, MANHOURS};
use hse_report::config::Config;
use hse_report::dataset::{DatasetPatch, PlannedActual};
use hse_report::pipeline::{commit, process_upload};
use hse_report::store::{JsonFileStore, RecordStore, SqliteStore};

const P6_MARCH: &str = "\
WASCO monthly HSE statistics
Total Manhours recorded: 1,000 hrs
Lost time injury: 1
Fatality: 0
Management Walkabout - Planned: 4 Actual: 3
";

const P7_MARCH: &str = "\
T&I monthly HSE statistics
Man-hours: 2,000
LTI 1
HSSE audit completed 2
";

fn stores(dir: &std::path::Path) -> Vec<Box<dyn RecordStore>> {
    vec![
        Box::new(SqliteStore::new(dir.join("hse.db")).unwrap()),
        Box::new(JsonFileStore::new(dir.join("json"))),
    ]
}

#[test]
fn uploads_flow_into_cumulative_totals() {
    let cfg = Config::builtin().unwrap();
    let catalog = cfg.catalog();
    let dir = tempfile::tempdir().unwrap();

    for store in stores(dir.path()) {
        let p6 = process_upload("p6.txt", P6_MARCH.as_bytes(), Some("P6"), &catalog, &cfg.upload)
            .unwrap();
        let p7 = process_upload("p7.csv", P7_MARCH.as_bytes(), Some("P7"), &catalog, &cfg.upload)
            .unwrap();
        commit(store.as_ref(), &catalog, "chenda", "Mar-26", "P6", &p6.extracted).unwrap();
        let march = commit(
            store.as_ref(),
            &catalog,
            "chenda",
            "Mar-26",
            "P7",
            &p7.extracted,
        )
        .unwrap();

        // Saves from different contracts do not clobber each other.
        assert_eq!(march.single(MANHOURS, "P6"), Some(1000.0));
        assert_eq!(march.single(MANHOURS, "P7"), Some(2000.0));
        assert_eq!(march.single("Fatality", "P6"), Some(0.0));
        assert_eq!(march.single("Fatality", "P7"), None);

        let project = catalog.project("chenda").unwrap();
        let month = monthly_total(&march, &project.contracts, &catalog);
        let ltif = month.single_total(LTIF).unwrap();
        assert!((ltif - 666.666_666).abs() < 1e-3);
        assert_eq!(month.single_cell(LTIF, "P6"), Some(1_000_000.0 / 1000.0));
        assert_eq!(month.single_cell(LTIF, "P2"), None);
        assert_eq!(
            month.pair_total("Management Walkabout"),
            PlannedActual {
                planned: Some(4.0),
                actual: Some(3.0),
            }
        );

        let mut april = DatasetPatch::default();
        april.set_single(MANHOURS, "P6", 1000.0);
        april.set_single(LTI, "P6", 0.0);
        store.save(&catalog, "chenda", "Apr-26", &april).unwrap();

        let all = store.load_all(&catalog, "chenda", &catalog.months).unwrap();
        assert_eq!(all.len(), catalog.months.len());
        let view = cumulative("chenda", &all, &project.contracts, &catalog);
        assert_eq!(view.single_cell(MANHOURS, "P6"), Some(2000.0));
        assert_eq!(view.single_total(MANHOURS), Some(4000.0));
        assert_eq!(view.single_total(LTI), Some(2.0));
        assert_eq!(view.single_total(LTIF), Some(2.0 * 1_000_000.0 / 4000.0));
        assert_eq!(view.single_total("Major Fire"), None);
    }
}

#[test]
fn absent_extraction_fields_keep_stored_values() {
    let cfg = Config::builtin().unwrap();
    let catalog = cfg.catalog();
    let dir = tempfile::tempdir().unwrap();

    for store in stores(dir.path()) {
        let mut earlier = DatasetPatch::default();
        earlier.set_single("Near Miss Case", "P3", 5.0);
        earlier.set_single(MANHOURS, "P3", 700.0);
        store.save(&catalog, "sapih-tiram-wangsa", "Jun-26", &earlier).unwrap();

        let upload = process_upload(
            "p3.txt",
            b"Manhours 900\nFirst aid 1\n",
            Some("P3"),
            &catalog,
            &cfg.upload,
        )
        .unwrap();
        commit(store.as_ref(), &catalog, "sapih-tiram-wangsa", "Jun-26", "P3", &upload.extracted)
            .unwrap();

        let ds = store.load(&catalog, "sapih-tiram-wangsa", "Jun-26").unwrap();
        assert_eq!(ds.single(MANHOURS, "P3"), Some(900.0));
        assert_eq!(ds.single("First Aid Cases (FAC)", "P3"), Some(1.0));
        assert_eq!(ds.single("Near Miss Case", "P3"), Some(5.0));
        assert_eq!(ds.single("Property Damage", "P3"), None);
    }
}
