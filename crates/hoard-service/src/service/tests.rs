//! Unit tests for the file service

use super::*;
use camino::Utf8PathBuf;
use hoard_archive::MemoryArchive;
use hoard_store::records::DEFAULT_RETENTION;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    blob_dir: Utf8PathBuf,
    kv: Arc<LocalKv>,
    archive: Arc<MemoryArchive>,
    service: FileService,
}

fn options() -> ServiceOptions {
    ServiceOptions {
        expected_items: 1000,
        error_rate: 0.01,
        retention: DEFAULT_RETENTION,
        // Small pages so record scans span several cursors
        scan_batch: 2,
    }
}

async fn fixture_with(options: ServiceOptions) -> Fixture {
    let dir = TempDir::new().unwrap();
    let blob_dir = Utf8PathBuf::from_path_buf(dir.path().join("blobs")).unwrap();
    let kv = Arc::new(LocalKv::in_memory());
    let archive = Arc::new(MemoryArchive::new());
    let service = FileService::open(&blob_dir, kv.clone(), archive.clone(), options)
        .await
        .unwrap();
    Fixture {
        _dir: dir,
        blob_dir,
        kv,
        archive,
        service,
    }
}

async fn fixture() -> Fixture {
    fixture_with(options()).await
}

async fn read_local(service: &FileService, file_id: &FileId) -> (Vec<u8>, String) {
    match service.download(file_id, &DownloadRequest::local()).await.unwrap() {
        Download::Local { reader, filename } => (reader.into_bytes().await.unwrap(), filename),
        other => panic!("expected a local download, got {:?}", other),
    }
}

fn blob_names(blob_dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(blob_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_open_saves_filter_snapshot() {
    let fx = fixture().await;
    assert!(fx.kv.get(hoard_store::filter::FILTER_KEY).await.unwrap().is_some());
    assert_eq!(fx.kv.len(), 1);
}

#[tokio::test]
async fn test_hello_scenario() {
    let fx = fixture().await;

    let first = fx.service.upload(b"ABC", "hello.txt").await.unwrap();
    assert!(!first.already_existed);
    assert_eq!(first.filename, "hello.txt");

    let second = fx.service.upload(b"ABC", "hello.txt").await.unwrap();
    assert!(second.already_existed);
    assert_ne!(first.file_id, second.file_id);

    let hash = compute_hash(b"ABC").to_hex();
    assert_eq!(blob_names(&fx.blob_dir), vec![format!("{}.txt", hash)]);

    for id in [&first.file_id, &second.file_id] {
        let (content, filename) = read_local(&fx.service, id).await;
        assert_eq!(content, b"ABC");
        assert_eq!(filename, "hello.txt");
    }

    let report = fx.service.delete(&first.file_id).await.unwrap();
    assert!(report.blob_removed);
    assert_eq!(report.records_removed, 2);
    assert_eq!(report.content_hash, hash);
    assert!(blob_names(&fx.blob_dir).is_empty());

    let err = fx
        .service
        .download(&second.file_id, &DownloadRequest::local())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let fx = fixture().await;

    let err = fx.service.upload(b"", "empty.txt").await.unwrap_err();
    assert!(matches!(err, HoardError::Validation { ref field, .. } if field == "payload"));

    for name in ["", "   ", "../escape.txt", "a%2Fb.txt"] {
        let err = fx.service.upload(b"data", name).await.unwrap_err();
        assert!(matches!(err, HoardError::Validation { .. }), "accepted {:?}", name);
    }

    // Only the filter snapshot is stored
    assert_eq!(fx.kv.len(), 1);
    assert!(blob_names(&fx.blob_dir).is_empty());
}

#[tokio::test]
async fn test_upload_decodes_filename() {
    let fx = fixture().await;

    let receipt = fx.service.upload(b"notes", "my%20notes.MD").await.unwrap();
    assert_eq!(receipt.filename, "my notes.MD");

    let record = fx.service.stat(&receipt.file_id).await.unwrap();
    assert_eq!(record.filename, "my notes.MD");
    assert_eq!(record.content_hash, compute_hash(b"notes").to_hex());
    assert!(blob_names(&fx.blob_dir)[0].ends_with(".MD"));
}

#[tokio::test]
async fn test_filter_survives_restart() {
    let fx = fixture().await;
    fx.service.upload(b"persisted", "p.bin").await.unwrap();

    let reopened = FileService::open(&fx.blob_dir, fx.kv.clone(), fx.archive.clone(), options())
        .await
        .unwrap();
    let receipt = reopened.upload(b"persisted", "again.bin").await.unwrap();
    assert!(receipt.already_existed);
    assert_eq!(blob_names(&fx.blob_dir).len(), 1);
}

#[tokio::test]
async fn test_missing_blob_is_rewritten_on_upload() {
    let fx = fixture().await;
    fx.service.upload(b"fragile", "f.txt").await.unwrap();
    for name in blob_names(&fx.blob_dir) {
        std::fs::remove_file(fx.blob_dir.join(name)).unwrap();
    }

    // The filter still matches, but nothing is on disk
    let receipt = fx.service.upload(b"fragile", "f.txt").await.unwrap();
    assert!(!receipt.already_existed);
    let (content, _) = read_local(&fx.service, &receipt.file_id).await;
    assert_eq!(content, b"fragile");
}

#[tokio::test]
async fn test_staging_download() {
    let fx = fixture().await;
    let receipt = fx.service.upload(b"ABC", "hello.txt").await.unwrap();

    let download = fx
        .service
        .download(&receipt.file_id, &DownloadRequest::staging("user", "42"))
        .await
        .unwrap();
    match download {
        Download::Staged {
            location,
            key,
            filename,
        } => {
            assert_eq!(key, "user/42/hello.txt");
            assert_eq!(location, "memory://user/42/hello.txt");
            assert_eq!(filename, "hello.txt");
        }
        other => panic!("expected a staged download, got {:?}", other),
    }

    assert_eq!(fx.archive.get("user/42/hello.txt"), Some(b"ABC".to_vec()));
    let meta = fx.archive.head("user/42/hello.txt").await.unwrap().unwrap();
    assert_eq!(
        meta.metadata.get("content-hash"),
        Some(&compute_hash(b"ABC").to_hex())
    );
    assert_eq!(meta.metadata.get("file-id"), Some(&receipt.file_id.to_string()));
}

#[tokio::test]
async fn test_staging_download_validation() {
    let fx = fixture().await;
    let receipt = fx.service.upload(b"ABC", "hello.txt").await.unwrap();

    let requests = [
        DownloadRequest::new("staging-area"),
        DownloadRequest {
            way: "staging-area".to_string(),
            scope_type: Some("room".to_string()),
            owner_id: None,
        },
        DownloadRequest::staging("team", "1"),
        DownloadRequest::staging("user", "../up"),
    ];
    for request in &requests {
        let err = fx.service.download(&receipt.file_id, request).await.unwrap_err();
        assert!(matches!(err, HoardError::Validation { .. }), "accepted {:?}", request);
    }
    assert!(fx.archive.is_empty());
}

#[tokio::test]
async fn test_staging_arguments_checked_before_lookup() {
    let fx = fixture().await;
    let unknown = FileId::generate();

    let err = fx
        .service
        .download(&unknown, &DownloadRequest::new("staging-area"))
        .await
        .unwrap_err();
    assert!(matches!(err, HoardError::Validation { ref field, .. } if field == "type"));

    let err = fx
        .service
        .download(&unknown, &DownloadRequest::staging("team", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, HoardError::Validation { .. }));

    // Well-formed arguments reach the lookup
    let err = fx
        .service
        .download(&unknown, &DownloadRequest::staging("user", "1"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_archive_failure_propagates() {
    let fx = fixture().await;
    let receipt = fx.service.upload(b"ABC", "hello.txt").await.unwrap();
    fx.archive.fail_puts(true);

    let err = fx
        .service
        .download(&receipt.file_id, &DownloadRequest::staging("room", "7"))
        .await
        .unwrap_err();
    assert!(matches!(err, HoardError::RemoteArchive { .. }));

    // Local delivery is unaffected
    let (content, _) = read_local(&fx.service, &receipt.file_id).await;
    assert_eq!(content, b"ABC");
}

#[tokio::test]
async fn test_download_rejects_unknown_ways() {
    let fx = fixture().await;
    let receipt = fx.service.upload(b"ABC", "hello.txt").await.unwrap();

    let err = fx
        .service
        .download(&receipt.file_id, &DownloadRequest::new("third-party"))
        .await
        .unwrap_err();
    assert!(matches!(err, HoardError::Unsupported { .. }));

    let err = fx
        .service
        .download(&receipt.file_id, &DownloadRequest::new("ftp"))
        .await
        .unwrap_err();
    assert!(matches!(err, HoardError::Validation { ref field, .. } if field == "way"));
}

#[tokio::test]
async fn test_unknown_file_id() {
    let fx = fixture().await;
    let unknown = FileId::generate();

    assert!(fx.service.stat(&unknown).await.unwrap_err().is_not_found());
    assert!(fx
        .service
        .download(&unknown, &DownloadRequest::local())
        .await
        .unwrap_err()
        .is_not_found());
    assert!(fx.service.delete(&unknown).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_only_touches_sharers() {
    let fx = fixture().await;
    let a1 = fx.service.upload(b"alpha", "a.txt").await.unwrap();
    let a2 = fx.service.upload(b"alpha", "a-copy.txt").await.unwrap();
    let a3 = fx.service.upload(b"alpha", "a-again.txt").await.unwrap();
    let b = fx.service.upload(b"beta", "b.txt").await.unwrap();

    let report = fx.service.delete(&a2.file_id).await.unwrap();
    assert_eq!(report.records_removed, 3);

    for id in [&a1.file_id, &a2.file_id, &a3.file_id] {
        assert!(fx.service.stat(id).await.unwrap_err().is_not_found());
    }
    let (content, _) = read_local(&fx.service, &b.file_id).await;
    assert_eq!(content, b"beta");
    assert_eq!(blob_names(&fx.blob_dir).len(), 1);

    // The content is no longer counted, so a new upload stores it again
    let again = fx.service.upload(b"alpha", "a.txt").await.unwrap();
    assert!(!again.already_existed);
}

#[tokio::test]
async fn test_delete_with_missing_blob() {
    let fx = fixture().await;
    let receipt = fx.service.upload(b"gone", "gone.txt").await.unwrap();
    for name in blob_names(&fx.blob_dir) {
        std::fs::remove_file(fx.blob_dir.join(name)).unwrap();
    }

    let report = fx.service.delete(&receipt.file_id).await.unwrap();
    assert!(!report.blob_removed);
    assert_eq!(report.records_removed, 1);
    assert!(fx.service.stat(&receipt.file_id).await.is_err());
}

#[tokio::test]
async fn test_delete_all() {
    let fx = fixture().await;
    for (content, name) in [
        (&b"one"[..], "1.txt"),
        (&b"two"[..], "2.txt"),
        (&b"three"[..], "3.txt"),
        (&b"one"[..], "1-copy.txt"),
    ] {
        fx.service.upload(content, name).await.unwrap();
    }

    let report = fx.service.delete_all().await.unwrap();
    assert_eq!(report.blobs_removed, 3);
    assert_eq!(report.record_keys_removed, 8);
    assert!(blob_names(&fx.blob_dir).is_empty());

    let stats = fx.service.stats().await.unwrap();
    assert_eq!(stats.blob_count, 0);
    assert_eq!(stats.filter.item_count, 0);
    // Only the fresh snapshot is left
    assert_eq!(fx.kv.len(), 1);

    let receipt = fx.service.upload(b"two", "2.txt").await.unwrap();
    assert!(!receipt.already_existed);
}

#[tokio::test]
async fn test_stats() {
    let fx = fixture().await;
    fx.service.upload(b"x", "x.bin").await.unwrap();
    fx.service.upload(b"y", "y.bin").await.unwrap();
    fx.service.upload(b"x", "x2.bin").await.unwrap();

    let stats = fx.service.stats().await.unwrap();
    assert_eq!(stats.blob_dir, fx.blob_dir);
    assert_eq!(stats.blob_count, 2);
    assert_eq!(stats.filter.item_count, 2);
    assert_eq!(stats.filter.capacity, 1000);
}

#[tokio::test]
async fn test_sweep_expired() {
    let fx = fixture_with(ServiceOptions {
        retention: Duration::from_millis(50),
        ..options()
    })
    .await;
    let receipt = fx.service.upload(b"short-lived", "s.txt").await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(fx.service.sweep_expired().await.unwrap(), 2);
    assert!(fx.service.stat(&receipt.file_id).await.unwrap_err().is_not_found());
    // The snapshot never expires
    assert_eq!(fx.kv.len(), 1);
}

#[tokio::test]
async fn test_concurrent_identical_uploads_share_one_blob() {
    let fx = fixture().await;
    let (left, right) = tokio::join!(
        fx.service.upload(b"same", "same.txt"),
        fx.service.upload(b"same", "same.txt")
    );
    let (left, right) = (left.unwrap(), right.unwrap());

    assert_ne!(left.file_id, right.file_id);
    assert_eq!(blob_names(&fx.blob_dir).len(), 1);
    for id in [&left.file_id, &right.file_id] {
        let (content, _) = read_local(&fx.service, id).await;
        assert_eq!(content, b"same");
    }
}

#[tokio::test]
async fn test_from_config_memory_backend() {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    let mut config = HoardToml::default();
    config.records.backend = RecordsBackend::Memory;
    config.resolve_paths(&root);

    let service = FileService::from_config(&config).await.unwrap();
    let receipt = service.upload(b"cfg", "c.txt").await.unwrap();
    assert!(root.join("hoard_storage/blobs").is_dir());
    assert!(!root.join("hoard_storage/records.json").exists());

    let staged = service
        .download(&receipt.file_id, &DownloadRequest::staging("room", "r1"))
        .await
        .unwrap();
    match staged {
        Download::Staged { location, .. } => assert!(location.starts_with("file://")),
        other => panic!("expected a staged download, got {:?}", other),
    }
}

#[tokio::test]
async fn test_from_config_file_backend_persists_records() {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let mut config = HoardToml::default();
    config.resolve_paths(&root);

    let file_id = {
        let service = FileService::from_config(&config).await.unwrap();
        service.upload(b"durable", "d.txt").await.unwrap().file_id
    };

    let service = FileService::from_config(&config).await.unwrap();
    let (content, filename) = read_local(&service, &file_id).await;
    assert_eq!(content, b"durable");
    assert_eq!(filename, "d.txt");
    assert!(service.upload(b"durable", "d.txt").await.unwrap().already_existed);
}

#[tokio::test]
async fn test_from_config_file_backend_keeps_filter_apart() {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let mut config = HoardToml::default();
    config.resolve_paths(&root);

    let service = FileService::from_config(&config).await.unwrap();
    for i in 0..3 {
        service
            .upload(format!("payload {}", i).as_bytes(), "p.txt")
            .await
            .unwrap();
    }

    let records = std::fs::read_to_string(&config.storage.records_path).unwrap();
    assert!(!records.contains(hoard_store::filter::FILTER_KEY));
    assert!(!records.contains('\n'));
    // Six record keys, no counters
    assert!(records.len() < 4096, "records file is {} bytes", records.len());

    let filter = std::fs::read_to_string(&config.storage.filter_path).unwrap();
    assert!(filter.contains(hoard_store::filter::FILTER_KEY));
}
