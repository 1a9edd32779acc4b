//! Binary resolution against real directories

#![cfg(unix)]

mod common;

use common::helpers::StubBin;
use gallery_tunnel::{BinaryResolver, Error};
use pretty_assertions::assert_eq;

#[test]
fn test_path_only_binary_has_no_search_directory() {
    let bin = StubBin::new();
    let fake = bin.script("fakebin", "echo ok");

    let resolved = bin.resolver().resolve("fakebin").unwrap();
    assert_eq!(resolved.executable_path, fake);
    assert_eq!(resolved.search_directory, None);
}

#[test]
fn test_bundle_directory_preferred_over_path() {
    let bundle = StubBin::new();
    let on_path = StubBin::new();
    let bundled = bundle.script("cloudflared", "exit 0");
    on_path.script("cloudflared", "exit 0");

    let resolver = BinaryResolver::new()
        .with_bundle_dir(bundle.path())
        .with_search_path(on_path.path().as_os_str());
    let resolved = resolver.resolve("cloudflared").unwrap();

    assert_eq!(resolved.executable_path, bundled);
    assert_eq!(resolved.search_directory.as_deref(), Some(bundle.path()));
}

#[test]
fn test_first_path_entry_wins() {
    let first = StubBin::new();
    let second = StubBin::new();
    let expected = first.script("ffprobe", "exit 0");
    second.script("ffprobe", "exit 0");

    let search = std::env::join_paths([first.path(), second.path()]).unwrap();
    let resolver = BinaryResolver::new()
        .without_bundle_dir()
        .with_search_path(search);

    assert_eq!(
        resolver.resolve("ffprobe").unwrap().executable_path,
        expected
    );
}

#[test]
fn test_absent_everywhere_is_binary_not_found() {
    let bin = StubBin::new();
    let resolver = BinaryResolver::new()
        .with_bundle_dir(bin.path())
        .with_search_path(bin.path().as_os_str());

    let err = resolver.resolve("codex-not-real-binary").unwrap_err();
    match err {
        Error::BinaryNotFound { name, hint } => {
            assert_eq!(name, "codex-not-real-binary");
            assert_eq!(hint, "brew install codex-not-real-binary");
        }
        other => panic!("unexpected error: {other}"),
    }
}
