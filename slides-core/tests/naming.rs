use std::sync::Arc;

use slides_core::{ErrorKind, UniqueNameResolver};
use slides_store::{ContentStore, MemoryStore};

#[tokio::test]
async fn free_name_is_returned_unchanged() {
    let store = Arc::new(MemoryStore::new());
    let resolver = UniqueNameResolver::new(store);

    assert_eq!(resolver.resolve("slides/x.png").await.unwrap(), "slides/x.png");
}

#[tokio::test]
async fn collisions_get_the_first_free_suffix() {
    let store = Arc::new(
        MemoryStore::new()
            .with_file("slides/x.png", "0")
            .with_file("slides/x-1.png", "1"),
    );
    let resolver = UniqueNameResolver::new(store.clone());

    assert_eq!(resolver.resolve("slides/x.png").await.unwrap(), "slides/x-2.png");
    assert_eq!(store.paths().len(), 2, "resolver must not write");
}

#[tokio::test]
async fn extension_case_is_kept_in_candidates() {
    let store = Arc::new(MemoryStore::new().with_file("slides/Photo.PNG", "p"));
    let resolver = UniqueNameResolver::new(store);

    assert_eq!(
        resolver.resolve("slides/Photo.PNG").await.unwrap(),
        "slides/Photo-1.PNG"
    );
}

#[tokio::test]
async fn names_without_extension_get_plain_suffix() {
    let store = Arc::new(MemoryStore::new().with_file("slides/notes", "n"));
    let resolver = UniqueNameResolver::new(store);

    assert_eq!(resolver.resolve("slides/notes").await.unwrap(), "slides/notes-1");
}

#[tokio::test]
async fn exhausting_the_bound_is_name_exhausted() {
    let store = Arc::new(
        MemoryStore::new()
            .with_file("slides/x.png", "0")
            .with_file("slides/x-1.png", "1")
            .with_file("slides/x-2.png", "2"),
    );
    let resolver = UniqueNameResolver::new(store.clone()).with_max_attempts(2);

    let err = resolver.resolve("slides/x.png").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NameExhausted);
    assert_eq!(err.code(), 409);

    let wider = UniqueNameResolver::new(store.clone() as Arc<dyn ContentStore>).with_max_attempts(3);
    assert_eq!(wider.resolve("slides/x.png").await.unwrap(), "slides/x-3.png");
}
