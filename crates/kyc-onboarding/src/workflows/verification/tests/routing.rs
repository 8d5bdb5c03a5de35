use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::workflows::notifications::InMemoryNotificationRepository;
use crate::workflows::verification::{
    verification_router, BlobStore, DocumentType, DraftStore, InMemoryDraftStore,
    InMemoryVerificationRepository, VerificationDraft,
};

async fn seed(harness: &Harness<InMemoryVerificationRepository>, draft: &VerificationDraft) {
    harness
        .drafts
        .save(&subject(), draft)
        .await
        .expect("seed draft");
}

#[tokio::test]
async fn resume_without_draft_lands_on_first_step() {
    let harness = harness();
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::get("/api/v1/verification/user-42/draft?step=review")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["step"], json!("personal_info"));
    assert_eq!(payload["draft"]["stepIndex"], json!(0));
    assert_eq!(payload["steps"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn advance_reports_field_errors_as_unprocessable() {
    let harness = harness();
    seed(&harness, &VerificationDraft::default()).await;

    let response = crate::workflows::verification::router::advance_handler::<
        InMemoryDraftStore,
        InMemoryVerificationRepository,
        InMemoryNotificationRepository,
    >(State(harness.service.clone()), Path("user-42".to_string()))
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["step"], json!("personal_info"));
    assert_eq!(payload["fields"]["lastName"], json!("Last name is required"));
}

#[tokio::test]
async fn advance_without_draft_is_not_found() {
    let harness = harness();
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/user-42/advance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn retreat_from_first_step_conflicts() {
    let harness = harness();
    seed(&harness, &VerificationDraft::default()).await;
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/user-42/retreat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn document_upload_route_stores_and_corroborates_front_page() {
    let harness = harness();
    let draft = VerificationDraft {
        personal_info: personal_info(),
        document_type: Some(DocumentType::Passport),
        step_index: 1,
        ..VerificationDraft::default()
    };
    seed(&harness, &draft).await;
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/user-42/documents/front")
                .header(header::CONTENT_TYPE, "image/jpeg")
                .body(Body::from(vec![0xff, 0xd8, 0xff]))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["side"], json!("front"));
    assert_eq!(payload["corroboration"]["status"], json!("completed"));
    assert_eq!(payload["corroboration"]["result"]["status"], json!("verified"));
    assert_eq!(harness.blobs.keys().len(), 1);
}

#[tokio::test]
async fn document_upload_rejects_non_images() {
    let harness = harness();
    seed(&harness, &VerificationDraft::default()).await;
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/user-42/documents/front")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(harness.blobs.keys().is_empty());
}

#[tokio::test]
async fn corroborate_route_follows_the_page_contract() {
    let harness = harness();
    let reference = harness
        .blobs
        .put("documents/user-42/front-1.jpg", &[0xff, 0xd8])
        .await
        .expect("blob stored");
    let router = verification_router(harness.service.clone());

    let request = json!({
        "documentUrl": reference.as_str(),
        "formData": {
            "firstName": "Jane Doe",
            "lastName": "Doe",
            "dateOfBirth": "1990-04-12",
            "address": "12 Harbour Road"
        },
        "userId": "user-42",
        "documentType": "passport"
    });

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/corroborate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(request.to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["matchScore"], json!(1.0));
    assert_eq!(payload["status"], json!("verified"));
    assert_eq!(payload["extractedData"]["firstName"], json!("jane"));
}

#[tokio::test]
async fn corroborate_route_reports_missing_documents() {
    let harness = harness();
    let router = verification_router(harness.service.clone());

    let request = json!({
        "documentUrl": "documents/user-42/missing.jpg",
        "userId": "user-42",
    });

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/corroborate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(request.to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload: Value = read_json_body(response).await;
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn corroborate_route_refuses_another_subjects_document() {
    let harness = harness();
    let reference = harness
        .blobs
        .put("documents/user-7/front-1.jpg", &[0xff, 0xd8])
        .await
        .expect("blob stored");
    let router = verification_router(harness.service.clone());

    let request = json!({
        "documentUrl": reference.as_str(),
        "formData": { "firstName": "Jane Doe" },
        "userId": "user-42",
    });

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/corroborate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(request.to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert!(payload.get("extractedData").is_none());
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn finalize_route_conflicts_when_uploads_are_gone() {
    let harness = harness();
    seed(&harness, &complete_draft(DocumentType::Passport)).await;
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/user-42/finalize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(harness.drafts.load(&subject()).await.expect("load").is_some());
}

#[tokio::test]
async fn finalize_route_creates_a_pending_record() {
    let harness = harness();
    let draft = complete_draft(DocumentType::Passport);
    seed(&harness, &draft).await;
    harness.stage_artifacts(&draft).await;
    let router = verification_router(harness.service.clone());

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/verification/user-42/finalize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("pending"));
    assert_eq!(payload["document_type"], json!("passport"));
    let record_id = payload["record_id"].as_str().expect("record id").to_string();

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/verification/records/{record_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn finalize_route_refuses_incomplete_drafts() {
    let harness = harness();
    seed(&harness, &VerificationDraft::default()).await;
    let router = verification_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/v1/verification/user-42/finalize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["fields"].get("firstName").is_some());
}

#[tokio::test]
async fn save_and_abandon_round_trip_through_the_draft_routes() {
    let harness = harness();
    let router = verification_router(harness.service.clone());
    let draft = VerificationDraft {
        personal_info: personal_info(),
        ..VerificationDraft::default()
    };

    let response = router
        .clone()
        .oneshot(
            Request::put("/api/v1/verification/user-42/draft")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&draft).unwrap()))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        harness.drafts.load(&subject()).await.expect("load"),
        Some(draft)
    );

    let response = router
        .oneshot(
            Request::delete("/api/v1/verification/user-42/draft")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(harness.drafts.load(&subject()).await.expect("load").is_none());
}
