use std::sync::Arc;
use std::time::{Duration, SystemTime};

use quarry_vfs::{
    CancellationToken, FileContentCache, FileUri, Handle, IoLimiter, LocalFs, ManualClock,
};

fn settled_cache() -> FileContentCache {
    // Freshly written temp files are "recent"; moving the clock ahead makes them cacheable.
    let clock = Arc::new(ManualClock::new(SystemTime::now() + Duration::from_secs(60)));
    FileContentCache::new(Arc::new(LocalFs::new()), IoLimiter::new(2)).with_clock(clock)
}

#[tokio::test]
async fn reads_real_files() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("main.go");
    std::fs::write(&path, "package main\n").unwrap();
    let cache = settled_cache();

    let record = cache
        .read_file(&CancellationToken::new(), &FileUri::from_path(&path).unwrap())
        .await
        .unwrap();
    assert_eq!(&*record.content().unwrap(), b"package main\n");
    assert_eq!(cache.stats().identities, 1);
}

#[tokio::test]
async fn missing_files_report_not_found() {
    let temp = tempfile::tempdir().unwrap();
    let uri = FileUri::from_path(temp.path().join("gone.go")).unwrap();
    let cache = settled_cache();

    let record = cache.read_file(&CancellationToken::new(), &uri).await.unwrap();
    assert!(record.error().unwrap().is_not_found());
    assert_eq!(cache.stats().identities, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn hard_links_are_one_cache_entry() {
    let temp = tempfile::tempdir().unwrap();
    let a = temp.path().join("a.go");
    let b = temp.path().join("b.go");
    std::fs::write(&a, "package a").unwrap();
    std::fs::hard_link(&a, &b).unwrap();
    let cache = settled_cache();
    let cancel = CancellationToken::new();

    let ra = cache
        .read_file(&cancel, &FileUri::from_path(&a).unwrap())
        .await
        .unwrap();
    let rb = cache
        .read_file(&cancel, &FileUri::from_path(&b).unwrap())
        .await
        .unwrap();

    assert!(ra.shares_payload_with(&rb));
    assert_ne!(ra.uri(), rb.uri());
    let stats = cache.stats();
    assert_eq!(stats.identities, 1);
    assert_eq!(stats.aliases, 2);
}
