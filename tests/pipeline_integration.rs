//! End-to-end tests of the library entry points against a temporary media
//! root.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use image::GenericImageView;
use suzuno::{
    FileOutcome, Library, Liveness, PipelineError, ResourceKind, THUMBNAIL_SIZE,
    ThumbnailOutcome, WeightedPool,
};

fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
    image::RgbImage::new(width, height)
        .save_with_format(dir.join(name), image::ImageFormat::Png)
        .unwrap();
}

fn library(dir: &Path) -> Library {
    Library::new(dir, Arc::new(WeightedPool::default()))
}

#[tokio::test]
async fn thumbnail_is_a_square_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wide.png", 800, 600);
    write_png(dir.path(), "tall.png", 90, 1000);

    let lib = library(dir.path());
    for name in ["/wide.png", "/tall.png"] {
        match lib.thumbnail(name, None, &Liveness::new()).await.unwrap() {
            ThumbnailOutcome::Rendered {
                jpeg,
                fingerprint,
                weight,
            } => {
                let decoded =
                    image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();
                assert_eq!(decoded.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
                assert!(fingerprint.as_str().starts_with("\"thumbnail:v1:"));
                assert_eq!(weight.units(), 1);
            }
            other => panic!("expected a rendered thumbnail, got {other:?}"),
        }
    }
    assert_eq!(lib.pool().in_use(), 0);
}

#[tokio::test]
async fn thumbnail_revalidation_is_not_modified() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", 40, 40);
    let lib = library(dir.path());

    let first = match lib.thumbnail("/a.png", None, &Liveness::new()).await.unwrap() {
        ThumbnailOutcome::Rendered { fingerprint, .. } => fingerprint,
        other => panic!("unexpected {other:?}"),
    };

    let second = lib
        .thumbnail("/a.png", Some(first.to_string()), &Liveness::new())
        .await
        .unwrap();
    assert!(matches!(second, ThumbnailOutcome::NotModified(ref tag) if *tag == first));
}

#[tokio::test]
async fn file_tags_cannot_revalidate_thumbnails() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", 40, 40);
    let lib = library(dir.path());

    let file_tag = match lib.open_file("/a.png", None).await.unwrap() {
        FileOutcome::Ready { opened, .. } => opened.fingerprint,
        other => panic!("unexpected {other:?}"),
    };

    let thumb = lib
        .thumbnail("/a.png", Some(file_tag.to_string()), &Liveness::new())
        .await
        .unwrap();
    assert!(matches!(thumb, ThumbnailOutcome::Rendered { .. }));
}

#[tokio::test]
async fn open_file_streams_from_offset_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"field notes").unwrap();
    let lib = library(dir.path());

    let (tag, mut opened) = match lib.open_file("/notes.txt", None).await.unwrap() {
        FileOutcome::Ready { resource, opened } => {
            assert_eq!(resource.logical(), "/notes.txt");
            (opened.fingerprint.clone(), opened)
        }
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(opened.len, 11);
    let mut body = String::new();
    opened.file.read_to_string(&mut body).unwrap();
    assert_eq!(body, "field notes");

    let again = lib.open_file("/notes.txt", Some(tag.to_string())).await.unwrap();
    assert!(matches!(again, FileOutcome::NotModified(_)));
}

#[tokio::test]
async fn traversal_stays_inside_the_root() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("media");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
    let lib = library(&root);

    let err = lib.open_file("/../secret.txt", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound));

    let err = lib
        .thumbnail("/../../etc/passwd", None, &Liveness::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound));
}

#[tokio::test]
async fn directories_are_not_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("album.png")).unwrap();
    let lib = library(dir.path());

    assert!(matches!(
        lib.thumbnail("/album.png", None, &Liveness::new()).await,
        Err(PipelineError::NotFound)
    ));
    assert!(matches!(
        lib.open_file("/", None).await,
        Err(PipelineError::NotFound)
    ));
}

#[tokio::test]
async fn listing_and_batch_share_projections() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", 4, 4);
    std::fs::create_dir(dir.path().join("trips")).unwrap();
    let lib = library(dir.path()).with_batch_size(1);

    let listing = lib.list_directory("/", &Liveness::new()).await.unwrap();
    assert_eq!(listing.path, "/");
    assert_eq!(listing.resources.len(), 2);

    let batch = lib
        .lookup_batch(vec!["/a.png".to_string(), "/missing.png".to_string()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].kind, ResourceKind::File);
    assert_eq!(batch[0].path, "/a.png");
    assert_eq!(batch[1].kind, ResourceKind::Empty);
    assert_eq!(batch[1].path, "/missing.png");

    let from_listing = listing
        .resources
        .iter()
        .find(|r| r.name == "a.png")
        .unwrap();
    assert_eq!(from_listing, &batch[0]);
}
