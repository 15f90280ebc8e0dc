mod common;

use common::{FakeClient, image_uploads};
use radiobatch::{anonymize::ItemStatus, config::Config, session::Session};

fn session_with(names: &[&str]) -> Session {
    let mut s = Session::new();
    s.upload_images(image_uploads(names));
    s
}

fn id_of(s: &Session, name: &str) -> radiobatch::registry::ItemId {
    s.registry().image_by_filename(name).unwrap().id
}

#[test]
fn second_run_skips_anonymized_items() {
    let cfg = Config::default();
    let client = FakeClient::new();
    let mut s = session_with(&["a.png", "b.png"]);

    let first = s.anonymize_all(&cfg, &client, |_| {});
    assert_eq!(first.succeeded, 2);
    let second = s.anonymize_all(&cfg, &client, |_| {});
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 2);

    assert_eq!(client.calls(), vec!["a.png", "b.png"]);
    assert_eq!(s.anonymization().len(), 2);
}

#[test]
fn one_failure_does_not_stop_the_batch() {
    let cfg = Config::default();
    let client = FakeClient::failing(&["2.png"]);
    let mut s = session_with(&["1.png", "2.png", "3.png"]);

    let report = s.anonymize_all(&cfg, &client, |_| {});
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(client.calls(), vec!["1.png", "2.png", "3.png"]);

    let a = s.anonymization();
    assert_eq!(a.status(id_of(&s, "1.png")), ItemStatus::Anonymized);
    assert_eq!(a.status(id_of(&s, "3.png")), ItemStatus::Anonymized);
    assert!(matches!(
        a.status(id_of(&s, "2.png")),
        ItemStatus::Failed { .. }
    ));
    assert!(a.result(id_of(&s, "2.png")).is_none());
}

#[test]
fn rerun_retries_only_failed_items() {
    let cfg = Config::default();
    let client = FakeClient::failing(&["2.png"]);
    let mut s = session_with(&["1.png", "2.png", "3.png"]);
    s.anonymize_all(&cfg, &client, |_| {});

    client.heal("2.png");
    let report = s.anonymize_all(&cfg, &client, |_| {});
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(
        client.calls(),
        vec!["1.png", "2.png", "3.png", "2.png"]
    );
    assert_eq!(
        s.anonymization().status(id_of(&s, "2.png")),
        ItemStatus::Anonymized
    );
    assert_eq!(s.anonymization().failed_count(), 0);
}

#[test]
fn undecodable_response_marks_item_failed() {
    let cfg = Config::default();
    let client = FakeClient::returning_garbage(&["bad.png"]);
    let mut s = session_with(&["bad.png", "good.png"]);

    let report = s.anonymize_all(&cfg, &client, |_| {});
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    match s.anonymization().status(id_of(&s, "bad.png")) {
        ItemStatus::Failed { reason } => assert!(reason.contains("decoding")),
        other => panic!("unexpected status: {other:?}"),
    }
}

#[test]
fn progress_reports_every_item_in_upload_order() {
    let cfg = Config::default();
    let client = FakeClient::new();
    let mut s = session_with(&["x.png", "y.png", "z.png"]);

    let mut seen = Vec::new();
    s.anonymize_all(&cfg, &client, |p| {
        seen.push((p.processed, p.total, p.item.filename.clone()));
    });
    assert_eq!(
        seen,
        vec![
            (1, 3, "x.png".to_string()),
            (2, 3, "y.png".to_string()),
            (3, 3, "z.png".to_string()),
        ]
    );
}

#[test]
fn stored_thumbnail_is_bounded() {
    let mut cfg = Config::default();
    cfg.thumbnail.max_side = 50;
    let mut client = FakeClient::new();
    client.output_size = (200, 100);
    let mut s = session_with(&["wide.png"]);
    s.anonymize_all(&cfg, &client, |_| {});

    let done = s.anonymization().result(id_of(&s, "wide.png")).unwrap();
    assert_eq!((done.width, done.height), (200, 100));
    let thumb = image::load_from_memory(&done.thumbnail_png).unwrap();
    assert_eq!(thumb.width(), 50);
    assert_eq!(thumb.height(), 25);
}

#[test]
fn pending_until_processed() {
    let s = session_with(&["a.png"]);
    assert_eq!(
        s.anonymization().status(id_of(&s, "a.png")),
        ItemStatus::Pending
    );
}
