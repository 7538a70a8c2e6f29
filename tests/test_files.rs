mod common;

use common::ScratchDir;
use sentinel::files::{StaticError, StaticFiles};
use sentinel::http::response::StatusCode;

/// Lays out `<scratch>/public` as the root with a secret next to it.
fn fixture() -> (ScratchDir, StaticFiles) {
    let dir = ScratchDir::new("files");
    dir.write("public/index.html", "<h1>home</h1>");
    dir.write("public/css/site.css", "body{}");
    dir.write("public/logo.PNG", [0x89u8, b'P', b'N', b'G', 0, 0xff]);
    dir.write("public/notes", "no extension");
    dir.write("secrets.txt", "top secret");
    dir.write("public-evil/leak.txt", "leaked");

    let files = StaticFiles::new(dir.path().join("public"), "index.html").unwrap();
    (dir, files)
}

#[tokio::test]
async fn test_root_serves_index() {
    let (_dir, files) = fixture();

    let file = files.load("/").await.unwrap();
    assert_eq!(file.content_type, "text/html");
    assert_eq!(file.contents, b"<h1>home</h1>".to_vec());
}

#[tokio::test]
async fn test_nested_file_with_mime() {
    let (_dir, files) = fixture();

    let file = files.load("/css/site.css").await.unwrap();
    assert_eq!(file.content_type, "text/css");
}

#[tokio::test]
async fn test_binary_file_round_trips_with_upper_case_extension() {
    let (_dir, files) = fixture();

    let response = files.serve("/logo.PNG").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, "image/png");
    assert_eq!(response.body, vec![0x89, b'P', b'N', b'G', 0, 0xff]);
}

#[tokio::test]
async fn test_unmapped_extension_defaults() {
    let (_dir, files) = fixture();

    let file = files.load("/notes").await.unwrap();
    assert_eq!(file.content_type, "application/octet-stream");
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let (_dir, files) = fixture();

    assert!(matches!(files.load("/nope.html").await, Err(StaticError::NotFound(_))));
    assert_eq!(files.serve("/nope.html").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directory_is_not_found() {
    let (_dir, files) = fixture();

    assert!(matches!(files.load("/css").await, Err(StaticError::NotFound(_))));
    assert!(matches!(files.load("/css/").await, Err(StaticError::NotFound(_))));
}

#[tokio::test]
async fn test_file_with_trailing_slash_is_not_found() {
    let (_dir, files) = fixture();

    assert!(matches!(files.load("/css/site.css/").await, Err(StaticError::NotFound(_))));
    assert_eq!(files.serve("/notes/").await.status, StatusCode::NOT_FOUND);
    assert!(files.load("/css/site.css").await.is_ok());
}

#[tokio::test]
async fn test_parent_traversal_is_forbidden() {
    let (_dir, files) = fixture();

    for path in ["/../secrets.txt", "/css/../../secrets.txt", "/./../public-evil/leak.txt"] {
        let response = files.serve(path).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{path}");
        assert!(!response.body.starts_with(b"top secret"));
    }
}

#[tokio::test]
async fn test_traversal_that_stays_inside_is_allowed() {
    let (_dir, files) = fixture();

    let file = files.load("/css/../index.html").await.unwrap();
    assert_eq!(file.contents, b"<h1>home</h1>".to_vec());
}

#[tokio::test]
async fn test_double_slash_does_not_escape_to_filesystem_root() {
    let (_dir, files) = fixture();

    let status = files.serve("//etc/passwd").await.status;
    assert!(status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN);
}

#[test]
fn test_sibling_with_shared_prefix_is_outside_root() {
    let (dir, files) = fixture();

    let escaped = files.resolve_path("/../public-evil/leak.txt");
    assert!(matches!(escaped, Err(StaticError::Forbidden(_))));

    let inside = files.resolve_path("/a/b/../c.txt").unwrap();
    assert!(inside.starts_with(files.root()));
    assert!(inside.ends_with("a/c.txt"));
    drop(dir);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_forbidden() {
    let (dir, files) = fixture();
    std::os::unix::fs::symlink(dir.path().join("secrets.txt"), dir.path().join("public/link.txt"))
        .unwrap();

    assert!(matches!(files.load("/link.txt").await, Err(StaticError::Forbidden(_))));
}

#[test]
fn test_missing_root_is_created() {
    let dir = ScratchDir::new("files-create");
    let root = dir.path().join("does/not/exist");

    let files = StaticFiles::new(&root, "index.html").unwrap();
    assert!(root.is_dir());
    assert!(files.root().is_absolute());
}
