mod common;

use common::{FakeClient, image_uploads, report_uploads};
use radiobatch::{
    association::{AssignError, Assignment},
    config::Config,
    session::Session,
};

fn session() -> Session {
    let mut s = Session::new();
    s.upload_images(image_uploads(&["a.png", "b.png", "c.png"]));
    s.upload_reports(report_uploads(&["R1.txt", "R2.txt"]));
    s
}

fn id_of(s: &Session, name: &str) -> radiobatch::registry::ItemId {
    s.registry().image_by_filename(name).unwrap().id
}

#[test]
fn free_text_wins_over_selected_report() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    let stored = s.assign(a, Some("R1.txt"), Some("custom")).unwrap().clone();
    assert_eq!(stored, Assignment::Label("custom".to_string()));
    assert_eq!(s.associations().get(a).unwrap().as_str(), "custom");
}

#[test]
fn blank_label_falls_back_to_report() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    s.assign(a, Some("R1.txt"), Some("   ")).unwrap();
    assert_eq!(
        s.associations().get(a),
        Some(&Assignment::Report("R1.txt".to_string()))
    );
}

#[test]
fn neither_label_nor_report_is_rejected_without_change() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    s.assign(a, None, Some("first")).unwrap();

    assert_eq!(s.assign(a, None, Some("")), Err(AssignError::MissingLabel));
    assert_eq!(s.assign(a, None, None), Err(AssignError::MissingLabel));
    assert_eq!(s.associations().get(a).unwrap().as_str(), "first");
}

#[test]
fn unknown_report_is_rejected() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    assert_eq!(
        s.assign(a, Some("nope.txt"), None),
        Err(AssignError::UnknownReport("nope.txt".to_string()))
    );
    assert!(s.associations().get(a).is_none());
}

#[test]
fn last_write_wins() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    s.assign(a, Some("R1.txt"), None).unwrap();
    s.assign(a, None, Some("fracture, distal radius")).unwrap();
    assert_eq!(
        s.associations().get(a).unwrap().as_str(),
        "fracture, distal radius"
    );
    assert_eq!(s.associations().len(), 1);
}

#[test]
fn assign_all_overwrites_every_image() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    let b = id_of(&s, "b.png");
    s.assign(a, None, Some("custom")).unwrap();
    s.assign(b, Some("R1.txt"), None).unwrap();

    assert_eq!(s.assign_all("R2.txt"), Ok(3));
    for image in s.registry().images() {
        assert_eq!(
            s.associations().get(image.id),
            Some(&Assignment::Report("R2.txt".to_string()))
        );
    }
}

#[test]
fn assign_all_with_unknown_report_changes_nothing() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    s.assign(a, None, Some("keep")).unwrap();
    assert!(s.assign_all("missing.txt").is_err());
    assert_eq!(s.associations().get(a).unwrap().as_str(), "keep");
}

#[test]
fn clear_leaves_uploads_and_results_alone() {
    let cfg = Config::default();
    let mut s = session();
    s.anonymize_all(&cfg, &FakeClient::new(), |_| {});
    s.assign_all("R1.txt").unwrap();

    s.clear_associations();
    assert!(s.associations().is_empty());
    assert_eq!(s.registry().image_count(), 3);
    assert_eq!(s.registry().reports().len(), 2);
    assert_eq!(s.anonymization().len(), 3);
}

#[test]
fn assign_current_follows_the_cursor() {
    let mut s = session();
    s.next();
    s.assign_current(None, Some("second")).unwrap();
    let b = id_of(&s, "b.png");
    assert_eq!(s.associations().get(b).unwrap().as_str(), "second");
    assert!(s.associations().get(id_of(&s, "a.png")).is_none());
}

#[test]
fn replacing_reports_drops_links_to_removed_reports() {
    let mut s = session();
    let a = id_of(&s, "a.png");
    let b = id_of(&s, "b.png");
    s.assign(a, Some("R1.txt"), None).unwrap();
    s.assign(b, None, Some("free text")).unwrap();

    s.upload_reports(report_uploads(&["R2.txt"]));
    assert!(s.associations().get(a).is_none());
    assert_eq!(s.associations().get(b).unwrap().as_str(), "free text");
}
