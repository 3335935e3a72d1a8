use std::sync::Arc;
use std::time::{Duration, SystemTime};

use quarry_vfs::{
    Cancelled, CancellationToken, ContentHash, FileContentCache, FileError, FileKind, FileUri,
    Handle, IoLimiter, ManualClock, MemoryFs, OverlayStore,
};

fn t0() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

fn uri(path: &str) -> FileUri {
    FileUri::from_path(path).unwrap()
}

struct Fixture {
    fs: Arc<MemoryFs>,
    clock: Arc<ManualClock>,
    cache: Arc<FileContentCache>,
}

fn fixture(io_slots: usize) -> Fixture {
    let fs = Arc::new(MemoryFs::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let cache = Arc::new(
        FileContentCache::new(fs.clone(), IoLimiter::new(io_slots)).with_clock(clock.clone()),
    );
    Fixture { fs, clock, cache }
}

#[tokio::test]
async fn first_read_of_settled_file_is_cached() {
    let f = fixture(4);
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
    let cancel = CancellationToken::new();

    let record = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();

    assert_eq!(&*record.content().unwrap(), b"package a");
    assert_eq!(record.hash(), ContentHash::of("package a"));
    assert!(record.error().is_none());
    assert_eq!(record.kind(), FileKind::Go);
    assert_eq!(f.cache.stats().identities, 1);
}

#[tokio::test]
async fn second_read_of_unchanged_file_does_no_io() {
    let f = fixture(4);
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
    let cancel = CancellationToken::new();

    let first = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    let second = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();

    assert_eq!(first.identity(), second.identity());
    assert!(first.shares_payload_with(&second));
    assert_eq!(f.fs.read_count(), 1);
}

#[tokio::test]
async fn aliases_share_one_read() {
    let f = fixture(4);
    f.fs.write("/src/a.go", "package a", t0() - Duration::from_secs(10));
    f.fs.link("/src/a.go", "/vendor/a.go").unwrap();
    let cancel = CancellationToken::new();

    let a = f.cache.read_file(&cancel, &uri("/src/a.go")).await.unwrap();
    let b = f
        .cache
        .read_file(&cancel, &uri("/vendor/a.go"))
        .await
        .unwrap();

    assert_eq!(a.hash(), b.hash());
    assert_eq!(a.content().unwrap(), b.content().unwrap());
    assert_eq!(b.uri(), &uri("/vendor/a.go"));
    assert_ne!(a.uri(), b.uri());
    assert!(a.shares_payload_with(&b));
    assert_eq!(f.fs.read_count(), 1);

    let stats = f.cache.stats();
    assert_eq!(stats.identities, 1);
    assert_eq!(stats.aliases, 2);
}

#[tokio::test]
async fn recently_modified_files_are_served_but_not_cached() {
    let f = fixture(4);
    f.fs.write("/a.go", "package a", t0() - Duration::from_millis(500));
    let cancel = CancellationToken::new();

    let first = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(&*first.content().unwrap(), b"package a");
    assert_eq!(f.cache.stats().identities, 0);

    // Same mtime, new content: a cached entry would hide this write.
    f.fs
        .write("/a.go", "package b", t0() - Duration::from_millis(500));
    let second = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(&*second.content().unwrap(), b"package b");
    assert_eq!(f.fs.read_count(), 2);

    // Once the file has settled it is cached normally.
    f.clock.advance(Duration::from_secs(5));
    f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(f.fs.read_count(), 3);
    assert_eq!(f.cache.stats().identities, 1);
}

#[tokio::test]
async fn recent_read_evicts_existing_entry() {
    let f = fixture(4);
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
    let cancel = CancellationToken::new();
    f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(f.cache.stats().identities, 1);

    f.fs.write("/a.go", "package a2", t0() - Duration::from_millis(100));
    let record = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(&*record.content().unwrap(), b"package a2");
    assert_eq!(f.cache.stats().identities, 0);
}

#[tokio::test]
async fn changed_mtime_rereads_and_drops_stale_aliases() {
    let f = fixture(4);
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
    f.fs.link("/a.go", "/b.go").unwrap();
    let cancel = CancellationToken::new();
    f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    f.cache.read_file(&cancel, &uri("/b.go")).await.unwrap();
    assert_eq!(f.cache.stats().aliases, 2);

    f.fs.write("/a.go", "package a // v2", t0() - Duration::from_secs(5));
    let a = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(&*a.content().unwrap(), b"package a // v2");
    assert_eq!(f.fs.read_count(), 2);

    let stats = f.cache.stats();
    assert_eq!(stats.identities, 1);
    assert_eq!(stats.aliases, 1);

    let b = f.cache.read_file(&cancel, &uri("/b.go")).await.unwrap();
    assert!(a.shares_payload_with(&b));
    assert_eq!(f.fs.read_count(), 2);
}

#[tokio::test]
async fn rename_keeps_cached_read() {
    let f = fixture(4);
    f.fs.write("/old.go", "package a", t0() - Duration::from_secs(10));
    let cancel = CancellationToken::new();
    f.cache.read_file(&cancel, &uri("/old.go")).await.unwrap();

    f.fs.rename("/old.go", "/new.go").unwrap();
    let moved = f.cache.read_file(&cancel, &uri("/new.go")).await.unwrap();
    assert_eq!(&*moved.content().unwrap(), b"package a");
    assert_eq!(f.fs.read_count(), 1);
}

#[tokio::test]
async fn stat_failures_are_never_cached() {
    let f = fixture(4);
    let cancel = CancellationToken::new();

    let missing = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert!(matches!(missing.error(), Some(FileError::Stat(_))));
    assert!(missing.error().unwrap().is_not_found());
    assert!(missing.content().is_err());
    assert_eq!(f.cache.stats().identities, 0);
    assert_eq!(f.fs.read_count(), 0);

    // The file appearing later is picked up immediately.
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
    let found = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert_eq!(&*found.content().unwrap(), b"package a");
    assert_eq!(f.fs.stat_count(), 2);
}

#[tokio::test]
async fn read_failures_follow_the_freshness_policy() {
    let f = fixture(4);
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));
    f.fs.fail_reads("/a.go");
    let cancel = CancellationToken::new();

    let first = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert!(matches!(first.error(), Some(FileError::Read(_))));
    assert_eq!(f.cache.stats().error_entries, 1);

    let second = f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    assert!(matches!(second.error(), Some(FileError::Read(_))));
    assert_eq!(f.fs.read_count(), 1);
}

#[tokio::test]
async fn stats_report_largest_content() {
    let f = fixture(4);
    let old = t0() - Duration::from_secs(10);
    f.fs.write("/a.go", "package a", old);
    f.fs.write("/b.go", "package bbbbbb", old);
    let cancel = CancellationToken::new();
    f.cache.read_file(&cancel, &uri("/a.go")).await.unwrap();
    f.cache.read_file(&cancel, &uri("/b.go")).await.unwrap();

    let stats = f.cache.stats();
    assert_eq!(stats.identities, 2);
    assert_eq!(stats.largest_content_bytes, "package bbbbbb".len());
    assert_eq!(stats.error_entries, 0);
}

#[tokio::test]
async fn cancellation_while_waiting_for_a_slot() {
    let f = fixture(1);
    f.fs.write("/a.go", "package a", t0() - Duration::from_secs(10));

    let held = f
        .cache
        .limiter()
        .acquire(&CancellationToken::new())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        f.cache.read_file(&cancel, &uri("/a.go")),
    )
    .await
    .expect("cancelled read should return promptly");
    canceller.await.unwrap();

    assert!(matches!(result, Err(Cancelled)));
    assert_eq!(f.cache.stats().identities, 0);
    assert_eq!(f.fs.read_count(), 0);

    drop(held);
    assert_eq!(f.cache.limiter().available(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_are_bounded_and_release_every_slot() {
    let f = fixture(3);
    let old = t0() - Duration::from_secs(10);
    for i in 0..32 {
        f.fs.write(format!("/pkg/f{i}.go"), format!("package p // {i}"), old);
    }

    let mut tasks = Vec::new();
    for i in 0..32 {
        let cache = f.cache.clone();
        tasks.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            cache
                .read_file(&cancel, &uri(&format!("/pkg/f{i}.go")))
                .await
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let record = task.await.unwrap().unwrap();
        assert_eq!(
            &*record.content().unwrap(),
            format!("package p // {i}").as_bytes()
        );
    }

    assert_eq!(f.cache.limiter().available(), 3);
    assert_eq!(f.cache.stats().identities, 32);
    assert_eq!(f.fs.read_count(), 32);
}

#[tokio::test]
async fn overlay_shadows_disk_without_touching_the_cache() {
    let f = fixture(4);
    f.fs.write("/a.go", "package disk", t0() - Duration::from_secs(10));
    let store = OverlayStore::new(f.cache.clone());
    let a = uri("/a.go");
    store.open(a.clone(), "package overlay", 3, FileKind::Go);
    let cancel = CancellationToken::new();

    let handle = store.read_file(&cancel, &a).await.unwrap();
    assert_eq!(&*handle.content().unwrap(), b"package overlay");
    assert_eq!(handle.version(), 3);
    assert!(!handle.same_contents_on_disk());
    assert_eq!(f.fs.stat_count(), 0);
    assert_eq!(f.fs.read_count(), 0);
    assert_eq!(f.cache.stats().identities, 0);

    // Other files still come from disk.
    f.fs.write("/b.go", "package b", t0() - Duration::from_secs(10));
    let b = store.read_file(&cancel, &uri("/b.go")).await.unwrap();
    assert_eq!(&*b.content().unwrap(), b"package b");
    assert!(b.same_contents_on_disk());
}
