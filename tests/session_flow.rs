use chrono::{TimeZone, Utc};
use kartotek::{
    ClipboardMode, NewRecord, RecordPatch, SearchRequest, Session, SortBy, ValidityPatch,
};

fn record(name: &str, tags: &[&str]) -> NewRecord {
    NewRecord {
        file_name: format!("{name}.pdf"),
        name: name.to_string(),
        description: format!("scanned copy of {name}"),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        ..NewRecord::default()
    }
}

#[test]
fn full_session_lifecycle() {
    let base = tempfile::tempdir().expect("temp base");

    let invoice_id;
    let contract_id;
    {
        let mut session = Session::bootstrap(base.path()).expect("bootstrap");
        let root = session.root();

        let invoices = session.create_directory(root, "invoices").expect("dir");
        let legal = session.create_directory(root, "legal").expect("dir");
        invoice_id = session
            .create_record(invoices, record("Faktura 2026-001", &["finance"]))
            .expect("record");
        contract_id = session
            .create_record(legal, record("Smlouva o dílo", &["legal", "signed"]))
            .expect("record");
        session
            .create_record(invoices, record("Faktura 2026-002", &["finance"]))
            .expect("record");

        session.edit_record(
            invoice_id,
            RecordPatch {
                validity: Some(ValidityPatch {
                    start: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
                    end: Some(Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap()),
                }),
                ..RecordPatch::default()
            },
        );

        session.add_favorite(invoices);
        session.save_state().expect("save");
    }

    // reopen from disk: ids, paths, and the index must all survive
    let mut session = Session::open(base.path()).expect("reopen");
    let snapshot = session.record_snapshot(invoice_id).expect("snapshot");
    assert_eq!(snapshot.full_path, "/invoices/Faktura 2026-001.pdf");
    assert_eq!(snapshot.tags, vec!["finance".to_string()]);

    let favorites = session.favorites();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].full_path, "/invoices");

    // diacritic-insensitive prefix search
    let hits = session.search(&SearchRequest {
        name: Some("smlouva".to_string()),
        ..SearchRequest::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, contract_id);

    // tag filter narrows the full universe when no text field is given
    let hits = session.search(&SearchRequest {
        require_tags: vec!["finance".to_string()],
        sort_by: SortBy::Name,
        ..SearchRequest::default()
    });
    assert_eq!(hits.len(), 2);
    assert!(hits[0].name < hits[1].name);

    // validity window filter
    let hits = session.search(&SearchRequest {
        validity_start_min: Some(Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()),
        validity_start_max: Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
        ..SearchRequest::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, invoice_id);

    // clipboard copy across directories mints fresh ids
    let legal = session.path_to_id("/legal").expect("legal");
    assert!(session.stage(&[invoice_id], ClipboardMode::Copy));
    assert!(session.paste(legal).expect("paste"));
    let copies = session.list_records(legal);
    assert_eq!(copies.len(), 2);
    assert!(copies.iter().all(|copy| copy.id != invoice_id));

    // delete into the bin and restore to the original parent
    assert!(session.delete(contract_id));
    assert!(session
        .search(&SearchRequest {
            name: Some("smlouva".to_string()),
            ..SearchRequest::default()
        })
        .is_empty());
    assert!(session.restore(contract_id));
    assert_eq!(
        session.record_snapshot(contract_id).expect("restored").full_path,
        "/legal/Smlouva o dílo.pdf"
    );

    // a second delete from the bin purges for good
    assert!(session.delete(contract_id));
    assert!(session.delete(contract_id));
    assert!(!session.contains(contract_id));

    session.save_state().expect("final save");
    assert!(base.path().join("data/data.json.old").exists());
}
