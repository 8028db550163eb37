//! Frame store naming, enumeration and mutation tests.

use std::fs;
use std::path::Path;

use gifmaker::{FrameKind, FrameStore, GifmakerError, frame_path};
use tempfile::TempDir;

fn open_store() -> (TempDir, FrameStore) {
    let dir = TempDir::new().unwrap();
    let store = FrameStore::open(dir.path().join("frames")).unwrap();
    (dir, store)
}

#[test]
fn open_creates_directory() {
    let (_dir, store) = open_store();
    assert!(store.root().is_dir());
    assert!(store.is_empty().unwrap());
}

#[test]
fn frame_path_is_zero_padded() {
    let root = Path::new("scratch");
    assert_eq!(frame_path(root, FrameKind::Still, 1), root.join("00001.jpg"));
    assert_eq!(frame_path(root, FrameKind::Intermediate, 42), root.join("00042.gif"));
    assert_eq!(frame_path(root, FrameKind::Still, 123456), root.join("123456.jpg"));
}

#[test]
fn enumerate_unpadded_names_in_numeric_order() {
    let (_dir, store) = open_store();
    for index in (1..=10).rev() {
        fs::write(store.root().join(format!("{index}.jpg")), [index as u8]).unwrap();
    }

    let sequence = store.enumerate(FrameKind::Still).unwrap();
    assert_eq!(sequence, (1..=10).collect::<Vec<u64>>());
}

#[test]
fn enumerate_mixes_padded_and_wide_names() {
    let (_dir, store) = open_store();
    store.write(FrameKind::Still, 99999, b"a").unwrap();
    store.write(FrameKind::Still, 100000, b"b").unwrap();
    store.write(FrameKind::Still, 2, b"c").unwrap();

    assert_eq!(store.enumerate(FrameKind::Still).unwrap(), vec![2, 99999, 100000]);
}

#[test]
fn enumerate_ignores_foreign_files() {
    let (_dir, store) = open_store();
    store.write(FrameKind::Still, 3, b"still").unwrap();
    store.write(FrameKind::Intermediate, 5, b"unit").unwrap();
    fs::write(store.root().join("notes.txt"), b"x").unwrap();
    fs::write(store.root().join("cover.jpg"), b"x").unwrap();
    fs::write(store.root().join("-4.jpg"), b"x").unwrap();
    fs::create_dir(store.root().join("7.jpg")).unwrap();

    assert_eq!(store.enumerate(FrameKind::Still).unwrap(), vec![3]);
    assert_eq!(store.enumerate(FrameKind::Intermediate).unwrap(), vec![5]);
}

#[test]
fn uppercase_extension_is_recognised() {
    let (_dir, store) = open_store();
    fs::write(store.root().join("8.JPG"), b"x").unwrap();
    assert_eq!(store.enumerate(FrameKind::Still).unwrap(), vec![8]);
}

#[test]
fn write_read_copy_delete() {
    let (_dir, store) = open_store();
    store.write(FrameKind::Still, 1, b"first").unwrap();
    store.copy(FrameKind::Still, 1, 4).unwrap();
    assert_eq!(store.read(FrameKind::Still, 4).unwrap(), b"first");

    store.write(FrameKind::Still, 4, b"replaced").unwrap();
    assert_eq!(store.read(FrameKind::Still, 4).unwrap(), b"replaced");
    assert_eq!(store.read(FrameKind::Still, 1).unwrap(), b"first");

    store.delete(FrameKind::Still, 1).unwrap();
    assert_eq!(store.enumerate(FrameKind::Still).unwrap(), vec![4]);
}

#[test]
fn read_finds_unpadded_file() {
    let (_dir, store) = open_store();
    fs::write(store.root().join("12.jpg"), b"legacy").unwrap();
    assert_eq!(store.read(FrameKind::Still, 12).unwrap(), b"legacy");
}

#[test]
fn read_missing_frame_is_scratch_error() {
    let (_dir, store) = open_store();
    let result = store.read(FrameKind::Still, 9);
    assert!(matches!(result, Err(GifmakerError::Scratch { .. })));
}

#[test]
fn delete_all_by_kind() {
    let (_dir, store) = open_store();
    for index in 1..=3 {
        store.write(FrameKind::Still, index, b"s").unwrap();
        store.write(FrameKind::Intermediate, index, b"i").unwrap();
    }
    fs::write(store.root().join("7.jpg"), b"unpadded").unwrap();
    fs::write(store.root().join("keep.txt"), b"k").unwrap();

    assert_eq!(store.delete_all(&[FrameKind::Still]).unwrap(), 4);
    assert_eq!(store.count(FrameKind::Still).unwrap(), 0);
    assert_eq!(store.count(FrameKind::Intermediate).unwrap(), 3);
    assert!(!store.is_empty().unwrap());

    assert_eq!(store.clean().unwrap(), 3);
    assert!(store.is_empty().unwrap());
    assert!(store.root().join("keep.txt").exists());
}
