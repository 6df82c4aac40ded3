//! Unit tests for the directory-backed archive

use super::*;
use tempfile::tempdir;

async fn open_archive(dir: &tempfile::TempDir) -> FsArchive {
    let root = Utf8PathBuf::from_path_buf(dir.path().join("archive")).unwrap();
    FsArchive::open(&root).await.unwrap()
}

fn metadata(hash: &str) -> HashMap<String, String> {
    HashMap::from([("content-hash".to_string(), hash.to_string())])
}

#[tokio::test]
async fn test_put_returns_file_location() {
    let temp_dir = tempdir().unwrap();
    let archive = open_archive(&temp_dir).await;

    let location = archive
        .put("user/42/hello.txt", b"ABC".to_vec(), metadata("abc"))
        .await
        .unwrap();

    assert!(location.starts_with("file://"));
    assert!(location.ends_with("user/42/hello.txt"));
    let stored = std::fs::read(archive.root().join("user/42/hello.txt")).unwrap();
    assert_eq!(stored, b"ABC");
}

#[tokio::test]
async fn test_head() {
    let temp_dir = tempdir().unwrap();
    let archive = open_archive(&temp_dir).await;

    assert!(archive.head("room/7/a.bin").await.unwrap().is_none());

    archive
        .put("room/7/a.bin", vec![1, 2, 3, 4], metadata("h1"))
        .await
        .unwrap();
    let meta = archive.head("room/7/a.bin").await.unwrap().unwrap();
    assert_eq!(meta.key, "room/7/a.bin");
    assert_eq!(meta.size, 4);
    assert_eq!(meta.e_tag, Some(blake3_hash(&[1, 2, 3, 4])));
    assert_eq!(meta.metadata.get("content-hash").map(String::as_str), Some("h1"));
}

#[tokio::test]
async fn test_put_overwrites() {
    let temp_dir = tempdir().unwrap();
    let archive = open_archive(&temp_dir).await;

    archive.put("user/1/a.txt", b"old".to_vec(), HashMap::new()).await.unwrap();
    archive.put("user/1/a.txt", b"newer".to_vec(), HashMap::new()).await.unwrap();

    let meta = archive.head("user/1/a.txt").await.unwrap().unwrap();
    assert_eq!(meta.size, 5);
}

#[tokio::test]
async fn test_list_by_prefix() {
    let temp_dir = tempdir().unwrap();
    let archive = open_archive(&temp_dir).await;

    for key in ["user/1/a.txt", "user/1/b.txt", "user/2/c.txt", "room/1/d.txt"] {
        archive.put(key, b"x".to_vec(), HashMap::new()).await.unwrap();
    }

    let user_one: Vec<String> = archive
        .list("user/1/")
        .await
        .unwrap()
        .into_iter()
        .map(|meta| meta.key)
        .collect();
    assert_eq!(user_one, vec!["user/1/a.txt", "user/1/b.txt"]);

    // Sidecar metadata never shows up as an object
    assert_eq!(archive.list("").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_rejects_escaping_keys() {
    let temp_dir = tempdir().unwrap();
    let archive = open_archive(&temp_dir).await;

    assert!(archive.put("../outside.txt", vec![], HashMap::new()).await.is_err());
    assert!(archive.put("/etc/passwd", vec![], HashMap::new()).await.is_err());
    assert!(archive.put(".meta/x.json", vec![], HashMap::new()).await.is_err());
    assert!(archive.head("").await.is_err());
}
