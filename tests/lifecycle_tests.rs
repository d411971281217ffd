//! Loan and reservation lifecycle integration tests
//!
//! These run against a live server with a seeded admin account. Each test
//! creates its own users and books so runs do not interfere with each other.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const ADMIN_EMAIL: &str = "admin@librarium.local";
const ADMIN_PASSWORD: &str = "admin-password";

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Clock before epoch")
        .as_nanos()
}

async fn admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh member account, returning its token and id
async fn register_member(client: &Client, suffix: u128) -> (String, i64) {
    let email = format!("member-{}@example.com", suffix);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Lifecycle Member",
            "email": email,
            "password": "member-password"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse register response");
    let user_id = body["id"].as_i64().expect("No user ID");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "member-password"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("No token").to_string();
    (token, user_id)
}

/// Create an author and a book linked to it, returning the book id
async fn create_book(client: &Client, token: &str, suffix: u128) -> i64 {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": format!("Author {}", suffix) }))
        .send()
        .await
        .expect("Failed to create author");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse author response");
    let author_id = body["id"].as_i64().expect("No author ID");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": format!("Lifecycle Book {}", suffix),
            "isbn": format!("test-{:014}", suffix % 100_000_000_000_000),
            "author_ids": [author_id]
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse book response");
    body["id"].as_i64().expect("No book ID")
}

async fn book_status(client: &Client, book_id: i64) -> String {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to fetch book");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse book response");
    body["status"].as_str().expect("No book status").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_duplicate_reservation_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (member, _) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);
    assert_eq!(book_status(&client, book_id).await, "reserved");

    // Same user again: rejected before the availability check even matters
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send reservation request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_reserved_book_rejected_for_other_user() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (holder, _) = register_member(&client, suffix).await;
    let (other, _) = register_member(&client, suffix + 1).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", holder))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", other))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send reservation request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_loan_converts_own_reservation() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (member, member_id) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    // Loan to the reservation holder converts the reservation
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": member_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);
    assert_eq!(book_status(&client, book_id).await, "borrowed");

    let response = client
        .get(format!("{}/users/{}/reservations", BASE_URL, member_id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to list reservations");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse reservations");
    let items = body.as_array().expect("Expected a reservation array");
    let reservation = items
        .iter()
        .find(|r| r["book_id"].as_i64() == Some(book_id))
        .expect("Reservation missing from listing");
    assert_eq!(reservation["status"], "converted");
}

#[tokio::test]
#[ignore]
async fn test_loan_rejected_when_reserved_by_other_user() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (holder, _) = register_member(&client, suffix).await;
    let (_, other_id) = register_member(&client, suffix + 1).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", holder))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": other_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send loan request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_extend_loan_within_and_past_window() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (_, member_id) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": member_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse loan response");
    let loan_id = body["id"].as_i64().expect("No loan ID");
    let due_date: chrono::DateTime<chrono::Utc> =
        body["due_date"].as_str().expect("No due date").parse().expect("Bad due date");

    // Within the 30-day window from the current due date
    let response = client
        .post(format!("{}/loans/{}/extend", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "due_date": due_date + chrono::Duration::days(10) }))
        .send()
        .await
        .expect("Failed to extend loan");
    assert!(response.status().is_success());

    // Past the window: measured from the new due date, 40 more days is too far
    let response = client
        .post(format!("{}/loans/{}/extend", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "due_date": due_date + chrono::Duration::days(50) }))
        .send()
        .await
        .expect("Failed to send extend request");
    assert_eq!(response.status(), 400);

    // A date in the past is always rejected
    let response = client
        .post(format!("{}/loans/{}/extend", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "due_date": chrono::Utc::now() - chrono::Duration::days(1) }))
        .send()
        .await
        .expect("Failed to send extend request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_return_loan_frees_book() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (_, member_id) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": member_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse loan response");
    let loan_id = body["id"].as_i64().expect("No loan ID");
    assert_eq!(book_status(&client, book_id).await, "borrowed");

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to return loan");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse return response");
    assert_eq!(body["status"], "returned");
    assert!(body["returned_at"].is_string());
    assert_eq!(book_status(&client, book_id).await, "available");
}

#[tokio::test]
#[ignore]
async fn test_loan_cap_enforced() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (_, member_id) = register_member(&client, suffix).await;

    // Default policy allows 3 concurrent active loans
    for i in 0..3u128 {
        let book_id = create_book(&client, &admin, suffix + i).await;
        let response = client
            .post(format!("{}/loans", BASE_URL))
            .header("Authorization", format!("Bearer {}", admin))
            .json(&json!({ "user_id": member_id, "book_id": book_id }))
            .send()
            .await
            .expect("Failed to create loan");
        assert_eq!(response.status(), 201);
    }

    let book_id = create_book(&client, &admin, suffix + 3).await;
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": member_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send loan request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_cancel_foreign_reservation_not_found() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (holder, _) = register_member(&client, suffix).await;
    let (other, _) = register_member(&client, suffix + 1).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", holder))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["id"].as_i64().expect("No reservation ID");

    // Ownership is not disclosed: another member sees 404, not 403
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", other))
        .send()
        .await
        .expect("Failed to send cancel request");
    assert_eq!(response.status(), 404);

    // The holder can cancel, and the book is freed
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", holder))
        .send()
        .await
        .expect("Failed to cancel reservation");
    assert!(response.status().is_success());
    assert_eq!(book_status(&client, book_id).await, "available");
}

#[tokio::test]
#[ignore]
async fn test_cancel_rejected_once_no_longer_active() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (member, _) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["id"].as_i64().expect("No reservation ID");

    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to cancel reservation");
    assert!(response.status().is_success());

    // Cancelling again is rejected; only active reservations can be cancelled
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to send cancel request");
    assert_eq!(response.status(), 400);
    assert_eq!(book_status(&client, book_id).await, "available");
}

async fn run_sweep(client: &Client, admin: &str, path: &str) -> u64 {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to run sweep");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse sweep response");
    body["updated"].as_u64().expect("No updated count")
}

async fn loan_status(client: &Client, admin: &str, loan_id: i64) -> String {
    let response = client
        .get(format!("{}/loans/{}", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch loan");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse loan response");
    body["status"].as_str().expect("No loan status").to_string()
}

async fn reservation_status(client: &Client, admin: &str, reservation_id: i64) -> String {
    let response = client
        .get(format!("{}/reservations/{}", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch reservation");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse reservation response");
    body["status"].as_str().expect("No reservation status").to_string()
}

#[tokio::test]
#[ignore]
async fn test_overdue_sweep_flips_past_due_loan() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (_, member_id) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    // Already past due at creation
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "user_id": member_id,
            "book_id": book_id,
            "due_date": chrono::Utc::now() - chrono::Duration::days(1)
        }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse loan response");
    let loan_id = body["id"].as_i64().expect("No loan ID");

    run_sweep(&client, &admin, "/admin/loans/check-overdue").await;
    assert_eq!(loan_status(&client, &admin, loan_id).await, "overdue");
    // An overdue loan still holds its book
    assert_eq!(book_status(&client, book_id).await, "borrowed");

    // Rerunning leaves the loan as it is
    run_sweep(&client, &admin, "/admin/loans/check-overdue").await;
    assert_eq!(loan_status(&client, &admin, loan_id).await, "overdue");
    assert_eq!(book_status(&client, book_id).await, "borrowed");
}

#[tokio::test]
#[ignore]
async fn test_expiry_sweep_frees_stale_reservation() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (member, _) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    // Already expired at creation
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({
            "book_id": book_id,
            "expires_at": chrono::Utc::now() - chrono::Duration::hours(1)
        }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["id"].as_i64().expect("No reservation ID");
    assert_eq!(book_status(&client, book_id).await, "reserved");

    run_sweep(&client, &admin, "/admin/reservations/check-expired").await;
    assert_eq!(
        reservation_status(&client, &admin, reservation_id).await,
        "expired"
    );
    assert_eq!(book_status(&client, book_id).await, "available");

    // Rerunning leaves the reservation and the freed book as they are
    run_sweep(&client, &admin, "/admin/reservations/check-expired").await;
    assert_eq!(
        reservation_status(&client, &admin, reservation_id).await,
        "expired"
    );
    assert_eq!(book_status(&client, book_id).await, "available");
}

#[tokio::test]
#[ignore]
async fn test_expiry_sweep_preserves_converted_reservation() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (member, _) = register_member(&client, suffix).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({
            "book_id": book_id,
            "expires_at": chrono::Utc::now() - chrono::Duration::hours(1)
        }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["id"].as_i64().expect("No reservation ID");

    // Conversion wins; the sweep must not overwrite it afterwards even
    // though the expiry has passed
    let response = client
        .post(format!("{}/reservations/{}/convert", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to convert reservation");
    assert!(response.status().is_success());

    run_sweep(&client, &admin, "/admin/reservations/check-expired").await;
    assert_eq!(
        reservation_status(&client, &admin, reservation_id).await,
        "converted"
    );
    assert_eq!(book_status(&client, book_id).await, "reserved");
}

#[tokio::test]
#[ignore]
async fn test_reapplied_return_does_not_free_relent_book() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let suffix = unique_suffix();
    let (_, first_id) = register_member(&client, suffix).await;
    let (_, second_id) = register_member(&client, suffix + 1).await;
    let book_id = create_book(&client, &admin, suffix).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": first_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse loan response");
    let first_loan = body["id"].as_i64().expect("No loan ID");

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, first_loan))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to return loan");
    assert!(response.status().is_success());

    // Book is lent out again to someone else
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "user_id": second_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);
    assert_eq!(book_status(&client, book_id).await, "borrowed");

    // Re-applying `returned` to the first loan is a no-op on the book; it
    // must not free a book the second loan now holds
    let response = client
        .put(format!("{}/loans/{}", BASE_URL, first_loan))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "status": "returned" }))
        .send()
        .await
        .expect("Failed to update loan");
    assert!(response.status().is_success());
    assert_eq!(book_status(&client, book_id).await, "borrowed");
}
