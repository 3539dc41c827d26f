// Integration tests for API handlers - real HTTP tests over the
// in-memory stores

#[path = "common/mod.rs"]
mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_endpoint_returns_200() {
    let (app, _state, _auth) = test_app();

    let (status, body) = send_request(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}

#[tokio::test]
async fn test_invalid_endpoint_returns_404() {
    let (app, _state, _auth) = test_app();

    let request = Request::builder()
        .uri("/nonexistent")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_listing() {
    let (app, _state, _auth) = test_app();

    let (status, body) = send_request(&app, "GET", "/events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_anonymous_creation_is_pending() {
    let (app, _state, _auth) = test_app();

    let (status, body) = send_request(
        &app,
        "POST",
        "/events",
        None,
        Some(json!({"title": "Open day", "date": "2025-05-01"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["approved"], false);
    assert_eq!(body["userId"], "anonymous");
}

#[tokio::test]
async fn test_admin_creation_is_auto_approved() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    let (status, body) = send_request(
        &app,
        "POST",
        "/events",
        Some(&admin),
        Some(json!({"title": "Maintenance window", "date": "2025-05-01"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["approved"], true);
    assert_eq!(body["userId"], "admin");
}

#[tokio::test]
async fn test_non_admin_listing_never_contains_pending() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;
    let user = user_session(&state, &auth, "alice").await;

    // Fixture mix: two pending (anonymous + user), one approved (admin)
    create_event(&app, None, "pending-anon", "2025-05-01", None).await;
    create_event(&app, Some(&user), "pending-user", "2025-05-02", None).await;
    create_event(&app, Some(&admin), "approved-admin", "2025-05-03", None).await;

    for session in [None, Some(user.as_str())] {
        let (status, body) = send_request(&app, "GET", "/events", session, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["approved-admin"]);
        for event in body.as_array().unwrap() {
            assert_eq!(event["approved"], true);
        }
    }
}

#[tokio::test]
async fn test_include_pending_silently_downgraded_for_non_admin() {
    let (app, state, auth) = test_app();
    let user = user_session(&state, &auth, "alice").await;

    create_event(&app, Some(&user), "own-pending", "2025-05-01", None).await;

    // Not an error, and the caller's own pending event stays hidden
    let (status, body) = send_request(
        &app,
        "GET",
        "/events?includePending=true",
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_admin_include_pending_sees_everything() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    create_event(&app, None, "pending", "2025-05-01", None).await;

    let (status, body) = send_request(
        &app,
        "GET",
        "/events?includePending=true",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["pending"]);
    assert_eq!(body[0]["approved"], false);

    // Without the flag even the admin gets the approved-only view
    let (_, body) = send_request(&app, "GET", "/events", Some(&admin), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_approve_requires_admin_and_hides_existence() {
    let (app, state, auth) = test_app();
    let user = user_session(&state, &auth, "alice").await;
    let id = create_event(&app, None, "pending", "2025-05-01", None).await;

    // Anonymous and non-admin get 403 - for real and missing ids alike,
    // so the response does not reveal whether an id exists
    for target in [id, 9999] {
        let uri = format!("/events/{}/approve", target);
        let (status, _) = send_request(&app, "PUT", &uri, None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send_request(&app, "PUT", &uri, Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_admin_approve_unknown_id_is_404() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    let (status, _) = send_request(&app, "PUT", "/events/9999/approve", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approve_is_idempotent() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;
    let id = create_event(&app, None, "pending", "2025-05-01", None).await;
    let uri = format!("/events/{}/approve", id);

    let (status, first) = send_request(&app, "PUT", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["approved"], true);

    let (status, second) = send_request(&app, "PUT", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let (app, state, auth) = test_app();
    let user = user_session(&state, &auth, "alice").await;
    let id = create_event(&app, None, "pending", "2025-05-01", None).await;
    let uri = format!("/events/{}", id);

    let (status, _) = send_request(&app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send_request(&app, "DELETE", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_twice_is_404_the_second_time() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;
    let id = create_event(&app, Some(&admin), "short-lived", "2025-05-01", None).await;
    let uri = format!("/events/{}", id);

    let (status, _) = send_request(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_request(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_request(&app, "DELETE", "/events/9999", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_and_malformed_time_become_null() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    for time in ["", "   ", "9 o'clock", "25:99"] {
        let (status, body) = send_request(
            &app,
            "POST",
            "/events",
            Some(&admin),
            Some(json!({"title": "Exam", "date": "2025-12-05", "time": time})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["time"].is_null(), "time {:?} should store as null", time);
    }
}

#[tokio::test]
async fn test_valid_time_round_trips_as_hh_mm() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    let (status, body) = send_request(
        &app,
        "POST",
        "/events",
        Some(&admin),
        Some(json!({"title": "Exam", "date": "2025-12-05", "time": "09:30"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["time"], "09:30");
}

#[tokio::test]
async fn test_missing_title_or_date_is_400() {
    let (app, _state, _auth) = test_app();

    let (status, _) = send_request(
        &app,
        "POST",
        "/events",
        None,
        Some(json!({"date": "2025-12-05"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_request(
        &app,
        "POST",
        "/events",
        None,
        Some(json!({"title": "Exam"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_request(
        &app,
        "POST",
        "/events",
        None,
        Some(json!({"title": "   ", "date": "2025-12-05"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_date_is_400_not_normalized() {
    let (app, _state, _auth) = test_app();

    // Date is required and strictly validated, unlike the lenient time
    let (status, _) = send_request(
        &app,
        "POST",
        "/events",
        None,
        Some(json!({"title": "Exam", "date": "05.12.2025"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_description_stored_as_absent() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    let (status, body) = send_request(
        &app,
        "POST",
        "/events",
        Some(&admin),
        Some(json!({"title": "Exam", "date": "2025-12-05", "description": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["description"].is_null());
}

#[tokio::test]
async fn test_listing_sorted_by_date_with_stable_tie_break() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    // Same date+time for b and c, so their ids break the tie
    create_event(&app, Some(&admin), "b", "2025-06-01", Some("10:00")).await;
    create_event(&app, Some(&admin), "c", "2025-06-01", Some("10:00")).await;
    create_event(&app, Some(&admin), "a", "2025-01-01", None).await;
    create_event(&app, Some(&admin), "untimed", "2025-06-01", None).await;

    let (status, body) = send_request(&app, "GET", "/events?sort=asc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["a", "untimed", "b", "c"]);

    let (status, body) = send_request(&app, "GET", "/events?sort=desc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    // Descending flips the dates but keeps the id tie-break ascending
    assert_eq!(titles(&body), vec!["b", "c", "untimed", "a"]);
}

#[tokio::test]
async fn test_default_sort_is_ascending() {
    let (app, state, auth) = test_app();
    let admin = admin_session(&state, &auth).await;

    create_event(&app, Some(&admin), "late", "2025-06-01", None).await;
    create_event(&app, Some(&admin), "early", "2025-01-01", None).await;

    let (_, body) = send_request(&app, "GET", "/events", Some(&admin), None).await;
    assert_eq!(titles(&body), vec!["early", "late"]);
}
