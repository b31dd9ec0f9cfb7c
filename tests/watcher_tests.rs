use crossbeam_channel::select;
use rwatch::{Event, RecursiveWatcher, WatchError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const TIMEOUT_MS: u64 = 5000;

/// Helper: drain both streams until an event matches or the timeout expires.
///
/// Errors seen on the way are collected so a failing test can print them.
fn wait_for_event<F>(
    watcher: &RecursiveWatcher,
    timeout_ms: u64,
    mut matches: F,
) -> (Option<Event>, Vec<WatchError>)
where
    F: FnMut(&Event) -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut errors = Vec::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return (None, errors);
        }

        select! {
            recv(watcher.events()) -> msg => match msg {
                Ok(event) if matches(&event) => return (Some(event), errors),
                Ok(_) => {}
                Err(_) => return (None, errors),
            },
            recv(watcher.errors()) -> msg => match msg {
                Ok(error) => errors.push(error),
                Err(_) => return (None, errors),
            },
            default(remaining) => return (None, errors),
        }
    }
}

fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths
}

fn write_file(path: &Path, contents: &str) {
    let mut file = File::create(path).unwrap();
    writeln!(file, "{}", contents).unwrap();
    file.sync_all().unwrap();
}

#[test]
fn test_add_recursive_registers_existing_tree() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();
    fs::create_dir_all(root.join("a/b/c"))?;
    fs::create_dir(root.join("d"))?;
    fs::write(root.join("a/file.txt"), b"not a directory")?;

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;

    assert_eq!(
        watcher.watch_list(),
        sorted(vec![
            root.clone(),
            root.join("a"),
            root.join("a/b"),
            root.join("a/b/c"),
            root.join("d"),
        ])
    );
    Ok(())
}

#[test]
fn test_recursive_watch_set_follows_tree() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();
    let a = root.join("a");
    let b = root.join("b");
    fs::create_dir(&a)?;

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;
    assert_eq!(watcher.watch_list(), vec![root.clone(), a.clone()]);

    // New directory: registered before its Create event is handed out
    fs::create_dir(&b)?;
    let (event, errors) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == b && e.is_create());
    assert!(event.is_some(), "Should receive create event for {:?}, errors: {:?}", b, errors);
    assert_eq!(watcher.watch_list(), vec![root.clone(), a.clone(), b.clone()]);

    // Removed directory: unregistered before its Remove event is handed out
    fs::remove_dir(&a)?;
    let (event, errors) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == a && e.is_remove());
    assert!(event.is_some(), "Should receive remove event for {:?}, errors: {:?}", a, errors);
    assert_eq!(watcher.watch_list(), vec![root, b]);
    Ok(())
}

#[test]
fn test_events_in_new_subdirectory_are_reported() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;

    let sub = root.join("sub");
    fs::create_dir(&sub)?;
    let (event, _) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == sub && e.is_create());
    assert!(event.is_some(), "Should receive create event for new subdirectory");

    // The subdirectory is watched by now, so its files are visible
    let file_path = sub.join("inside.txt");
    write_file(&file_path, "hello");

    let (event, errors) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == file_path);
    assert!(
        event.is_some(),
        "Should receive event for file in new subdirectory, errors: {:?}",
        errors
    );
    Ok(())
}

#[test]
fn test_nested_tree_created_at_once_converges() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;

    // Children may appear before the parent's watch exists; the walk on the
    // parent's Create event still picks them up.
    let top = root.join("top");
    fs::create_dir_all(top.join("mid/leaf"))?;
    let (event, _) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == top && e.is_create());
    assert!(event.is_some(), "Should receive create event for {:?}", top);

    let watched = watcher.watch_list();
    assert!(watched.contains(&top.join("mid")));
    assert!(watched.contains(&top.join("mid/leaf")));
    Ok(())
}

#[test]
fn test_file_lifecycle_events_in_order() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;

    // Give watcher time to start
    sleep(Duration::from_millis(100));

    let file_path = root.join("test.rs");
    write_file(&file_path, "fn test() {}");
    fs::remove_file(&file_path)?;

    let mut seen = Vec::new();
    loop {
        let (event, _) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == file_path);
        let Some(event) = event else { break };
        let done = event.is_remove();
        seen.push(event);
        if done {
            break;
        }
    }

    assert!(!seen.is_empty(), "Should receive events for {:?}", file_path);
    assert!(seen.first().unwrap().is_create(), "First event should be CREATE: {:?}", seen);
    assert!(seen.last().unwrap().is_remove(), "Last event should be REMOVE: {:?}", seen);
    // Files are never registered themselves
    assert_eq!(watcher.watch_list(), vec![root]);
    Ok(())
}

#[test]
fn test_rename_out_of_tree_unwatches() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let outside = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();
    let moving = root.join("moving");
    fs::create_dir(&moving)?;

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;
    assert!(watcher.watch_list().contains(&moving));

    fs::rename(&moving, outside.path().join("moving"))?;
    let (event, _) = wait_for_event(&watcher, TIMEOUT_MS, |e| e.path == moving && e.is_rename());
    assert!(event.is_some(), "Should receive rename event for {:?}", moving);

    // Gone from disk, so the stat fails and the watch is dropped
    assert!(!watcher.watch_list().contains(&moving));
    Ok(())
}

#[test]
fn test_add_missing_path_fails() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let watcher = RecursiveWatcher::new()?;
    let missing = temp_dir.path().join("x");

    let err = watcher.add(&missing).unwrap_err();
    assert!(err.is_not_found(), "Expected not-found error, got {:?}", err);

    let err = watcher.add_recursive(&missing).unwrap_err();
    assert!(err.is_not_found(), "Expected not-found error, got {:?}", err);

    assert!(watcher.watch_list().is_empty());
    Ok(())
}

#[test]
fn test_add_is_not_recursive() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();
    fs::create_dir(root.join("child"))?;

    let watcher = RecursiveWatcher::new()?;
    watcher.add(&root)?;

    assert_eq!(watcher.watch_list(), vec![root]);
    Ok(())
}

#[test]
fn test_remove_keeps_descendants() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().to_path_buf();
    let child = root.join("child");
    fs::create_dir(&child)?;

    let watcher = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;
    watcher.remove(&root)?;

    assert_eq!(watcher.watch_list(), vec![child]);
    Ok(())
}

#[test]
fn test_remove_unwatched_path_fails() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let watcher = RecursiveWatcher::new()?;

    let err = watcher.remove(temp_dir.path()).unwrap_err();
    assert!(err.is_not_watched(), "Expected not-watched error, got {:?}", err);
    Ok(())
}
