//! Bucket pages over HTTP: the staff gate, owner scoping and pagination.

mod common;

use axum::http::StatusCode;
use bucket_manager::models::bucket::BucketInput;
use common::{body_text, location, test_app};

fn input(name: &str) -> BucketInput {
    BucketInput {
        name: name.to_string(),
        description: String::new(),
    }
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = test_app().await;

    let cases = [
        ("/buckets/", "/accounts/login/?next=/buckets/"),
        ("/dashboard/", "/accounts/login/?next=/dashboard/"),
        ("/buckets/create/", "/accounts/login/?next=/buckets/create/"),
        ("/buckets/abc/edit/", "/accounts/login/?next=/buckets/abc/edit/"),
        ("/buckets/?page=2", "/accounts/login/?next=/buckets/%3Fpage%3D2"),
    ];
    for (path, expected) in cases {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::FOUND, "{}", path);
        assert_eq!(location(&response), expected);
    }

    let response = app
        .post_form("/buckets/create/", &[("name", "Photos")], None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(app.bucket_count().await, 0);
}

#[tokio::test]
async fn non_staff_users_are_forbidden() {
    let app = test_app().await;
    app.signup("alice").await;
    let bob = app.signup("bob").await;

    for path in ["/buckets/", "/dashboard/", "/buckets/create/", "/buckets/1/edit/"] {
        let response = app.get(path, Some(&bob)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", path);
    }

    let response = app
        .post_form("/buckets/create/", &[("name", "Photos")], Some(&bob))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.bucket_count().await, 0);
}

#[tokio::test]
async fn create_bucket_and_see_it_listed() {
    let app = test_app().await;
    let alice = app.signup("alice").await;

    let form = app.get("/buckets/create/", Some(&alice)).await;
    assert_eq!(form.status(), StatusCode::OK);

    let response = app
        .post_form(
            "/buckets/create/",
            &[("name", "Photos"), ("description", "Holiday pictures")],
            Some(&alice),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/buckets/");

    let owner_id = app.user_id("alice").await;
    let (name, owner): (String, i64) =
        sqlx::query_as("SELECT name, owner_id FROM buckets")
            .fetch_one(&*app.state.buckets.db)
            .await
            .unwrap();
    assert_eq!(name, "Photos");
    assert_eq!(owner, owner_id);

    let list = app.get("/buckets/", Some(&alice)).await;
    assert_eq!(list.status(), StatusCode::OK);
    let body = body_text(list).await;
    assert!(body.contains("Photos"));
    assert!(body.contains("Holiday pictures"));
    assert!(body.contains("created successfully!"));
}

#[tokio::test]
async fn dashboard_prefix_serves_the_same_pages() {
    let app = test_app().await;
    let alice = app.signup("alice").await;

    let response = app
        .post_form("/dashboard/create/", &[("name", "Logs")], Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/buckets/");

    let body = body_text(app.get("/dashboard/", Some(&alice)).await).await;
    assert!(body.contains("Logs"));
}

#[tokio::test]
async fn invalid_bucket_forms_rerender() {
    let app = test_app().await;
    let alice = app.signup("alice").await;

    let response = app
        .post_form("/buckets/create/", &[("name", "  ")], Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("This field is required."));

    let long = "x".repeat(151);
    let response = app
        .post_form("/buckets/create/", &[("name", long.as_str())], Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("Ensure this value has at most 150 characters (it has 151).")
    );

    assert_eq!(app.bucket_count().await, 0);
}

#[tokio::test]
async fn duplicate_names_are_a_form_error() {
    let app = test_app().await;
    let alice = app.signup("alice").await;

    for _ in 0..2 {
        app.post_form("/buckets/create/", &[("name", "Photos")], Some(&alice))
            .await;
    }
    assert_eq!(app.bucket_count().await, 1);

    let response = app
        .post_form("/buckets/create/", &[("name", "Photos")], Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("Bucket with this Name and Owner already exists.")
    );

    // Another owner may reuse the name.
    let bob = app.staff("bob").await;
    let response = app
        .post_form("/buckets/create/", &[("name", "Photos")], Some(&bob))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(app.bucket_count().await, 2);
}

#[tokio::test]
async fn owners_cannot_see_or_touch_each_others_buckets() {
    let app = test_app().await;
    let alice = app.signup("alice").await;
    let bob = app.staff("bob").await;

    let alice_id = app.user_id("alice").await;
    let bucket = app
        .state
        .buckets
        .create(alice_id, input("Private"))
        .await
        .unwrap();

    let list = body_text(app.get("/buckets/", Some(&bob)).await).await;
    assert!(!list.contains("Private"));

    let edit_path = format!("/buckets/{}/edit/", bucket.id);
    let delete_path = format!("/buckets/{}/delete/", bucket.id);

    assert_eq!(
        app.get(&edit_path, Some(&bob)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.post_form(&edit_path, &[("name", "Stolen")], Some(&bob))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&delete_path, Some(&bob)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.post_form(&delete_path, &[], Some(&bob)).await.status(),
        StatusCode::NOT_FOUND
    );

    let still_there = app.state.buckets.get_owned(alice_id, bucket.id).await.unwrap();
    assert_eq!(still_there.name, "Private");

    let own = app.get(&edit_path, Some(&alice)).await;
    assert_eq!(own.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_and_malformed_ids_are_not_found() {
    let app = test_app().await;
    let alice = app.signup("alice").await;

    for path in ["/buckets/999/edit/", "/buckets/abc/edit/", "/buckets/abc/delete/"] {
        let response = app.get(path, Some(&alice)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
    }
}

#[tokio::test]
async fn edit_updates_name_and_keeps_created_at() {
    let app = test_app().await;
    let alice = app.signup("alice").await;
    let alice_id = app.user_id("alice").await;
    let bucket = app
        .state
        .buckets
        .create(alice_id, input("Photos"))
        .await
        .unwrap();
    let other = app
        .state
        .buckets
        .create(alice_id, input("Videos"))
        .await
        .unwrap();
    let path = format!("/buckets/{}/edit/", bucket.id);

    // Keeping its own name is not a duplicate.
    let response = app
        .post_form(
            &path,
            &[("name", "Photos"), ("description", "now described")],
            Some(&alice),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    // Taking a sibling's name is.
    let response = app
        .post_form(&path, &[("name", other.name.as_str())], Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("Bucket with this Name and Owner already exists.")
    );

    let response = app
        .post_form(&path, &[("name", "Pictures")], Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/buckets/");

    let updated = app.state.buckets.get_owned(alice_id, bucket.id).await.unwrap();
    assert_eq!(updated.name, "Pictures");
    assert_eq!(updated.created_at, bucket.created_at);

    let list = body_text(app.get("/buckets/", Some(&alice)).await).await;
    assert!(list.contains("updated successfully!"));
}

#[tokio::test]
async fn delete_asks_for_confirmation_then_deletes() {
    let app = test_app().await;
    let alice = app.signup("alice").await;
    let alice_id = app.user_id("alice").await;
    let bucket = app
        .state
        .buckets
        .create(alice_id, input("Scratch"))
        .await
        .unwrap();
    let path = format!("/buckets/{}/delete/", bucket.id);

    let confirm = app.get(&path, Some(&alice)).await;
    assert_eq!(confirm.status(), StatusCode::OK);
    assert!(body_text(confirm).await.contains("Scratch"));
    assert_eq!(app.bucket_count().await, 1);

    let response = app.post_form(&path, &[], Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/buckets/");
    assert_eq!(app.bucket_count().await, 0);

    let list = body_text(app.get("/buckets/", Some(&alice)).await).await;
    assert!(list.contains("deleted successfully!"));

    let again = app.post_form(&path, &[], Some(&alice)).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_paginates_by_ten() {
    let app = test_app().await;
    let alice = app.signup("alice").await;
    let alice_id = app.user_id("alice").await;
    for i in 0..12 {
        app.state
            .buckets
            .create(alice_id, input(&format!("bucket-{:02}", i)))
            .await
            .unwrap();
    }

    let first = body_text(app.get("/buckets/", Some(&alice)).await).await;
    assert_eq!(first.matches(">Edit</a>").count(), 10);
    assert!(first.contains("bucket-11"));
    assert!(!first.contains("bucket-00"));
    assert!(first.contains("Page 1 of 2."));

    let second = body_text(app.get("/buckets/?page=2", Some(&alice)).await).await;
    assert_eq!(second.matches(">Edit</a>").count(), 2);
    assert!(second.contains("bucket-00"));

    let last = body_text(app.get("/buckets/?page=last", Some(&alice)).await).await;
    assert_eq!(last.matches(">Edit</a>").count(), 2);

    for page in ["3", "0", "abc"] {
        let response = app
            .get(&format!("/buckets/?page={}", page), Some(&alice))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "page={}", page);
    }
}

#[tokio::test]
async fn empty_listing_renders() {
    let app = test_app().await;
    let alice = app.signup("alice").await;

    let response = app.get("/buckets/", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("You have no buckets yet."));
}

#[tokio::test]
async fn deleting_a_user_removes_their_buckets() {
    let app = test_app().await;
    let alice = app.signup("alice").await;
    let alice_id = app.user_id("alice").await;
    app.state
        .buckets
        .create(alice_id, input("Photos"))
        .await
        .unwrap();

    app.state.accounts.delete("alice").await.unwrap();
    assert_eq!(app.bucket_count().await, 0);

    let response = app.get("/buckets/", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn health_probes_answer() {
    let app = test_app().await;

    let health = app.get("/healthz", None).await;
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(health).await).unwrap();
    assert_eq!(body["status"], "ok");

    let ready = app.get("/readyz", None).await;
    assert_eq!(ready.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(ready).await).unwrap();
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
}
