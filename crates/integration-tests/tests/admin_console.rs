//! Admin sign-in, catalog management and order handling.

use axum::http::{StatusCode, header};
use modern_shop_core::catalog::Product;
use modern_shop_core::docstore::{DocumentStore, to_fields};
use modern_shop_core::identity::{LEGACY_ROLES_COLLECTION, RoleRecord};
use modern_shop_core::order::Order;
use modern_shop_core::{Email, OrderStatus};
use modern_shop_integration_tests::{TestClient, admin, create_user, documents, storefront};
use serde_json::{Value, json};

#[tokio::test]
async fn test_signed_out_visitors_are_turned_away() {
    let mut client = TestClient::new(admin(&documents()));

    let response = client.get("/admin").await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header(header::LOCATION), Some("/login"));

    let response = client.get("/admin/api/products").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = client.get("/login").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("<form"));
}

#[tokio::test]
async fn test_non_admin_cannot_sign_in() {
    let documents = documents();
    create_user(&documents, "shopper@example.com", false).await;
    let mut client = TestClient::new(admin(&documents));

    let response = client.login("shopper@example.com").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("not an administrator"));

    assert_eq!(
        client.get("/admin/api/orders").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));

    let response = client
        .post_form(
            "/login",
            &[("email", "owner%40example.com"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Invalid email or password"));
}

#[tokio::test]
async fn test_legacy_role_collection_still_grants_access() {
    let documents = documents();
    let user = create_user(&documents, "legacy@example.com", false).await;
    let record = RoleRecord::admin(Email::parse("legacy@example.com").unwrap());
    documents
        .set(
            LEGACY_ROLES_COLLECTION,
            user.id.as_str(),
            to_fields(&record).unwrap(),
        )
        .await
        .unwrap();

    let mut client = TestClient::new(admin(&documents));
    let response = client.login("legacy@example.com").await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header(header::LOCATION), Some("/admin"));
    assert_eq!(client.get("/admin").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));

    client.login("owner@example.com").await;
    assert_eq!(client.get("/admin/api/settings").await.status, StatusCode::OK);

    let response = client.post_form("/logout", &[]).await;
    assert_eq!(response.header(header::LOCATION), Some("/login"));
    assert_eq!(
        client.get("/admin/api/settings").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));
    client.login("owner@example.com").await;

    let response = client
        .post_json("/admin/api/categories", &json!({ "name": "Books" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = client
        .post_json("/admin/api/categories", &json!({ "name": "Books" }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = client
        .post_json(
            "/admin/api/products",
            &json!({ "name": "Rust Book", "price": "39.99", "category": "Books", "stock": 4 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let book: Product = response.json();

    let response = client.delete("/admin/api/categories/Books").await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = client
        .delete(&format!("/admin/api/products/{}", book.id))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = client
        .delete(&format!("/admin/api/products/{}", book.id))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = client.delete("/admin/api/categories/Books").await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let categories: Vec<String> = client.get("/admin/api/categories").await.json();
    assert!(categories.is_empty());
}

#[tokio::test]
async fn test_product_update_validates_category() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));
    client.login("owner@example.com").await;

    client
        .post_json("/admin/api/categories", &json!({ "name": "Books" }))
        .await;
    let book: Product = client
        .post_json(
            "/admin/api/products",
            &json!({ "name": "Rust Book", "price": "39.99", "category": "Books" }),
        )
        .await
        .json();

    let path = format!("/admin/api/products/{}", book.id);
    let response = client.patch_json(&path, &json!({ "category": "Games" })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let updated: Product = client.patch_json(&path, &json!({ "stock": 12 })).await.json();
    assert_eq!(updated.stock, 12);
    assert_eq!(updated.category.as_str(), "Books");
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));
    client.login("owner@example.com").await;

    client
        .post_json("/admin/api/categories", &json!({ "name": "Books" }))
        .await;
    let response = client
        .post_json(
            "/admin/api/products",
            &json!({ "name": "Bad", "price": "-5.00", "category": "Books", "stock": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let book: Product = client
        .post_json(
            "/admin/api/products",
            &json!({ "name": "Rust Book", "price": "39.99", "category": "Books" }),
        )
        .await
        .json();
    let path = format!("/admin/api/products/{}", book.id);
    let response = client.patch_json(&path, &json!({ "price": "-1" })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let products: Vec<Product> = client.get("/admin/api/products").await.json();
    assert_eq!(products.len(), 1);
    assert_eq!(products.first().unwrap().price, book.price);
}

/// Two products at stock 5 and 3; an order for 2 and 1 delivered leaves 3 and 2.
#[tokio::test]
async fn test_delivered_order_takes_stock() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut console = TestClient::new(admin(&documents));
    console.login("owner@example.com").await;

    console
        .post_json("/admin/api/categories", &json!({ "name": "Kitchen" }))
        .await;
    let mug: Product = console
        .post_json(
            "/admin/api/products",
            &json!({ "name": "Mug", "price": "9.50", "category": "Kitchen", "stock": 5 }),
        )
        .await
        .json();
    let kettle: Product = console
        .post_json(
            "/admin/api/products",
            &json!({ "name": "Kettle", "price": "45.00", "category": "Kitchen", "stock": 3 }),
        )
        .await
        .json();

    // A storefront started now serves the published catalog
    let mut visitor = TestClient::new(storefront(documents.clone()).await);
    visitor
        .post_json("/api/cart/add", &json!({ "product_id": mug.id, "quantity": 2 }))
        .await;
    visitor
        .post_json("/api/cart/add", &json!({ "product_id": kettle.id }))
        .await;
    let response = visitor
        .post_json(
            "/api/checkout",
            &json!({
                "name": "Ana Lima",
                "email": "ana@example.com",
                "phone": "555-0100",
                "address": "1 Main St",
                "payment_method": "bank_transfer",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let order: Order = response.json();

    let orders: Vec<Order> = console.get("/admin/api/orders").await.json();
    assert_eq!(orders.len(), 1);

    let path = format!("/admin/api/orders/{}/status", order.id);
    let response = console.put_json(&path, &json!({ "status": "shipped" })).await;
    assert_eq!(response.json::<Order>().status, OrderStatus::Shipped);
    let response = console.put_json(&path, &json!({ "status": "delivered" })).await;
    assert_eq!(response.status, StatusCode::OK);

    let mug: Product = console
        .get(&format!("/admin/api/products/{}", mug.id))
        .await
        .json();
    let kettle: Product = console
        .get(&format!("/admin/api/products/{}", kettle.id))
        .await
        .json();
    assert_eq!(mug.stock, 3);
    assert_eq!(kettle.stock, 2);

    // Deleting the order does not restore stock
    let response = console
        .delete(&format!("/admin/api/orders/{}", order.id))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = console
        .get(&format!("/admin/api/orders/{}", order.id))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let summary: Value = console.get("/admin").await.json();
    assert_eq!(summary["product_count"], 2);
}

#[tokio::test]
async fn test_settings_reject_bad_email() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));
    client.login("owner@example.com").await;

    let response = client
        .put_json(
            "/admin/api/settings",
            &json!({ "store_name": "Shop", "store_email": "nope" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = client
        .put_json(
            "/admin/api/settings",
            &json!({ "store_name": "Shop", "store_email": "owner@shop.io" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let settings: Value = client.get("/admin/api/settings").await.json();
    assert_eq!(settings["store_email"], "owner@shop.io");
}

#[tokio::test]
async fn test_upload_without_image_host_is_unavailable() {
    let documents = documents();
    create_user(&documents, "owner@example.com", true).await;
    let mut client = TestClient::new(admin(&documents));
    client.login("owner@example.com").await;

    let body = "--XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"image\"; filename=\"a.png\"\r\n\
        Content-Type: image/png\r\n\r\n\
        PNG\r\n\
        --XBOUNDARY--\r\n";
    let response = client
        .post_bytes(
            "/admin/api/uploads/image",
            "multipart/form-data; boundary=XBOUNDARY",
            body.as_bytes().to_vec(),
        )
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
