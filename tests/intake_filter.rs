mod common;

use common::{png, scratch_dir};
use radiobatch::{
    config::Config,
    intake::{UploadKind, collect_uploads},
};

#[test]
fn directories_expand_to_matching_files_in_name_order() {
    let dir = scratch_dir("intake-dir");
    std::fs::write(dir.join("b.PNG"), png(4, 4)).unwrap();
    std::fs::write(dir.join("a.jpg"), png(4, 4)).unwrap();
    std::fs::write(dir.join("readme.txt"), b"x").unwrap();

    let uploads = collect_uploads(&Config::default(), UploadKind::Image, &[dir]).unwrap();
    let names: Vec<_> = uploads.iter().map(|u| u.filename.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.PNG"]);
    assert_eq!(uploads[0].media_type, "image/jpeg");
    assert_eq!(uploads[1].media_type, "image/png");
}

#[test]
fn explicit_non_image_is_rejected() {
    let dir = scratch_dir("intake-reject");
    let path = dir.join("notes.txt");
    std::fs::write(&path, b"x").unwrap();
    assert!(collect_uploads(&Config::default(), UploadKind::Image, &[path.clone()]).is_err());
    assert_eq!(
        collect_uploads(&Config::default(), UploadKind::Report, &[path])
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn oversized_and_url_inputs_are_rejected() {
    let dir = scratch_dir("intake-limits");
    let path = dir.join("big.png");
    std::fs::write(&path, png(32, 32)).unwrap();
    let mut cfg = Config::default();
    cfg.uploads.max_file_bytes = 10;
    assert!(collect_uploads(&cfg, UploadKind::Image, &[path]).is_err());

    let url = std::path::PathBuf::from("https://example.org/x.png");
    assert!(collect_uploads(&Config::default(), UploadKind::Image, &[url]).is_err());
}
