use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use nivela_frontend::models::{ClientPhoto, PhotoFields, PhotoFile, PhotoLabel};
use nivela_frontend::services::photos::PHOTOS_TABLE;
use service_core::error::AppError;
use std::collections::HashSet;
use tower::util::ServiceExt;

mod common;
use common::{session, TestApp, TEST_USER_ID};

fn jpeg(name: &str) -> PhotoFile {
    PhotoFile {
        file_name: name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
    }
}

fn fields() -> PhotoFields {
    PhotoFields {
        label: Some(PhotoLabel::Antes),
        description: Some("Fios ressecados".to_string()),
        photo_type: None,
    }
}

#[tokio::test]
async fn upload_then_remove_deletes_object_and_row() {
    let app = TestApp::spawn(Some(session(TEST_USER_ID))).await;
    let user = session(TEST_USER_ID);

    let photo = app
        .state
        .photos
        .upload(&user, "c1", jpeg("antes.JPG"), fields())
        .await
        .expect("upload should succeed");

    assert!(photo.photo_url.starts_with("test_user_123/c1/"));
    assert!(photo.photo_url.ends_with(".jpg"));
    assert_eq!(photo.photo_type, "Geral");
    assert_eq!(photo.label, Some(PhotoLabel::Antes));
    assert!(app.objects.contains(&photo.photo_url));
    assert_eq!(app.metadata.rows(PHOTOS_TABLE).len(), 1);

    let gallery = app.state.photos.list(&user, "c1").await.unwrap();
    assert_eq!(gallery.len(), 1);
    assert_eq!(
        gallery[0].public_url.as_deref(),
        Some(format!("memory://upload-photos/{}", photo.photo_url).as_str())
    );

    app.state
        .photos
        .remove(&user, &photo.id, &photo.photo_url)
        .await
        .expect("remove should succeed");

    assert!(!app.objects.contains(&photo.photo_url));
    assert!(app.metadata.rows(PHOTOS_TABLE).is_empty());
}

#[tokio::test]
async fn metadata_failure_rolls_back_object() {
    let app = TestApp::spawn(None).await;
    app.metadata.fail_inserts(true);

    let result = app
        .state
        .photos
        .upload(&session(TEST_USER_ID), "c1", jpeg("a.jpg"), fields())
        .await;

    assert!(matches!(result, Err(AppError::MetadataWriteError(_))));
    assert_eq!(app.objects.put_calls(), 1);
    assert!(app.objects.paths().is_empty());
    assert!(app.metadata.rows(PHOTOS_TABLE).is_empty());
}

#[tokio::test]
async fn failed_rollback_still_reports_metadata_error() {
    let app = TestApp::spawn(None).await;
    app.metadata.fail_inserts(true);
    app.objects.fail_deletes(true);

    let result = app
        .state
        .photos
        .upload(&session(TEST_USER_ID), "c1", jpeg("a.jpg"), fields())
        .await;

    assert!(matches!(result, Err(AppError::MetadataWriteError(_))));
    assert_eq!(app.objects.paths().len(), 1);
}

#[tokio::test]
async fn storage_failure_writes_no_row() {
    let app = TestApp::spawn(None).await;
    app.objects.fail_puts(true);

    let result = app
        .state
        .photos
        .upload(&session(TEST_USER_ID), "c1", jpeg("a.jpg"), fields())
        .await;

    assert!(matches!(result, Err(AppError::StorageWriteError(_))));
    assert!(app.metadata.rows(PHOTOS_TABLE).is_empty());
}

#[tokio::test]
async fn invalid_upload_touches_nothing() {
    let app = TestApp::spawn(None).await;
    let empty = PhotoFile {
        bytes: Vec::new(),
        ..jpeg("a.jpg")
    };

    let result = app
        .state
        .photos
        .upload(&session(TEST_USER_ID), "c1", empty, fields())
        .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert_eq!(app.objects.put_calls(), 0);
}

#[tokio::test]
async fn concurrent_uploads_never_collide() {
    let app = TestApp::spawn(None).await;
    let mut uploads = tokio::task::JoinSet::new();

    for i in 0..8 {
        let photos = app.state.photos.clone();
        uploads.spawn(async move {
            photos
                .upload(
                    &session(TEST_USER_ID),
                    "c1",
                    jpeg(&format!("foto-{}.png", i)),
                    PhotoFields::default(),
                )
                .await
        });
    }

    let mut paths = HashSet::new();
    while let Some(result) = uploads.join_next().await {
        let photo: ClientPhoto = result.unwrap().expect("upload should succeed");
        paths.insert(photo.photo_url);
    }

    assert_eq!(paths.len(), 8);
    assert_eq!(app.objects.paths().len(), 8);
    assert_eq!(app.metadata.rows(PHOTOS_TABLE).len(), 8);
}

#[tokio::test]
async fn remove_keeps_going_when_object_delete_fails() {
    let app = TestApp::spawn(None).await;
    let user = session(TEST_USER_ID);
    let photo = app
        .state
        .photos
        .upload(&user, "c1", jpeg("a.jpg"), fields())
        .await
        .unwrap();

    app.objects.fail_deletes(true);
    app.state
        .photos
        .remove(&user, &photo.id, &photo.photo_url)
        .await
        .unwrap();

    assert!(app.metadata.rows(PHOTOS_TABLE).is_empty());
}

#[tokio::test]
async fn remove_reports_row_delete_failure() {
    let app = TestApp::spawn(None).await;
    let user = session(TEST_USER_ID);
    let photo = app
        .state
        .photos
        .upload(&user, "c1", jpeg("a.jpg"), fields())
        .await
        .unwrap();

    app.metadata.fail_deletes(true);
    let result = app.state.photos.remove(&user, &photo.id, &photo.photo_url).await;

    assert!(matches!(result, Err(AppError::MetadataDeleteError(_))));
}

#[tokio::test]
async fn remove_refuses_foreign_paths() {
    let app = TestApp::spawn(None).await;

    let result = app
        .state
        .photos
        .remove(&session(TEST_USER_ID), "p1", "someone_else/c1/a.jpg")
        .await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn multipart_upload_over_http() {
    let app = TestApp::spawn(Some(session(TEST_USER_ID))).await;
    let boundary = "nivela-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"label\"\r\n\r\n\
         depois\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"depois.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         PNGDATA\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/clientes/c1/fotos")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let photo: ClientPhoto = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(photo.label, Some(PhotoLabel::Depois));
    assert!(photo.photo_url.ends_with(".png"));
    assert!(app.objects.contains(&photo.photo_url));
}

#[tokio::test]
async fn client_id_with_reserved_characters_is_rejected() {
    let app = TestApp::spawn(Some(session(TEST_USER_ID))).await;
    let boundary = "nivela-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"abc.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         JPEGDATA\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/clientes/%3Fx/fotos")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.objects.put_calls(), 0);
    assert!(app.metadata.rows(PHOTOS_TABLE).is_empty());
}
