mod support;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;

use florette::domain::types::TaxonomyKind;
use support::{
    AppOptions, MemoryStore, authed, build_app, get, json_request, login, send,
};

fn names(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn hidden_records_stay_out_of_the_storefront_but_not_the_back_office() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    let roses = store.seed_collection("Roses", true).await;
    let archive = store.seed_collection("Archive", false).await;
    store.seed_product("Red Roses", Some(&roses), true).await;
    store.seed_product("Secret Tulips", Some(&roses), false).await;
    store.seed_product("Old Lilies", Some(&archive), true).await;
    store.seed_testimonial("Ayu", true).await;
    store.seed_testimonial("Budi", false).await;
    let app = build_app(store, AppOptions::new(dir.path()));

    let products = send(&app.public, get("/api/products")).await;
    assert_eq!(products.status, StatusCode::OK);
    let body = products.json();
    assert_eq!(names(&body), vec!["Red Roses"]);
    assert!(body.get("fallback").is_none());

    let hidden = send(&app.public, get("/api/products/secret-tulips")).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
    let in_hidden_collection = send(&app.public, get("/api/products/old-lilies")).await;
    assert_eq!(in_hidden_collection.status, StatusCode::NOT_FOUND);

    let collections = send(&app.public, get("/api/collections")).await;
    assert_eq!(names(&collections.json()), vec!["Roses"]);

    let testimonials = send(&app.public, get("/api/testimonials")).await.json();
    assert_eq!(testimonials["items"].as_array().map(Vec::len), Some(1));

    let cookie = login(&app).await;
    let admin_products = send(&app.admin, authed("GET", "/api/products", &cookie)).await;
    assert_eq!(admin_products.status, StatusCode::OK);
    let mut admin_names = names(&admin_products.json());
    admin_names.sort();
    assert_eq!(admin_names, vec!["Old Lilies", "Red Roses", "Secret Tulips"]);

    let admin_collections = send(&app.admin, authed("GET", "/api/collections", &cookie)).await;
    assert_eq!(names(&admin_collections.json()).len(), 2);
}

#[tokio::test]
async fn empty_store_serves_the_fallback_catalog() {
    let dir = TempDir::new().expect("tempdir");
    let app = build_app(MemoryStore::new(), AppOptions::new(dir.path()));

    let products = send(&app.public, get("/api/products")).await;
    assert_eq!(products.status, StatusCode::OK);
    let body = products.json();
    assert_eq!(body["fallback"], json!(true));
    assert!(!names(&body).is_empty());

    // search cannot be answered from fallback data
    let searched = send(&app.public, get("/api/products?search=orchid")).await.json();
    assert!(names(&searched).is_empty());
    assert!(searched.get("fallback").is_none());
}

#[tokio::test]
async fn product_filters_follow_taxonomy_links() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    let roses = store.seed_product("Red Roses", None, true).await;
    store.seed_product("Sunflower Box", None, true).await;
    let anniversary = store
        .seed_taxonomy(TaxonomyKind::Celebration, "Anniversary", true)
        .await;
    let partner = store
        .seed_taxonomy(TaxonomyKind::Relationship, "Partner", true)
        .await;
    store.link(&roses, &anniversary).await;
    store.link(&roses, &partner).await;
    let app = build_app(store, AppOptions::new(dir.path()));

    let by_celebration = send(&app.public, get("/api/products?celebration=anniversary"))
        .await
        .json();
    assert_eq!(names(&by_celebration), vec!["Red Roses"]);

    let detail = send(&app.public, get("/api/products/red-roses")).await.json();
    assert_eq!(detail["celebrations"][0]["slug"], "anniversary");
    assert_eq!(detail["relationships"][0]["slug"], "partner");

    let celebration = send(&app.public, get("/api/celebrations/anniversary")).await;
    assert_eq!(celebration.status, StatusCode::OK);
    assert_eq!(celebration.json()["products"][0]["slug"], "red-roses");
}

#[tokio::test]
async fn listings_are_cached_until_an_admin_write() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    store.seed_product("Red Roses", None, true).await;
    let app = build_app(store.clone(), AppOptions::new(dir.path()));

    send(&app.public, get("/api/products")).await;
    send(&app.public, get("/api/products")).await;
    assert_eq!(store.product_list_calls(), 1);

    let cookie = login(&app).await;
    let created = send(
        &app.admin,
        json_request(
            "POST",
            "/api/products",
            Some(&cookie),
            json!({ "name": "White Lilies", "price_cents": 250000 }),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["slug"], "white-lilies");

    let after = send(&app.public, get("/api/products")).await.json();
    assert_eq!(names(&after), vec!["Red Roses", "White Lilies"]);
    assert!(store.product_list_calls() >= 2);
}

#[tokio::test]
async fn manual_cache_purge_forces_a_refetch() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    store.seed_product("Red Roses", None, true).await;
    let app = build_app(store.clone(), AppOptions::new(dir.path()));

    send(&app.public, get("/api/products")).await;
    let cookie = login(&app).await;
    let purged = send(&app.admin, authed("DELETE", "/api/cache", &cookie)).await;
    assert_eq!(purged.status, StatusCode::NO_CONTENT);

    send(&app.public, get("/api/products")).await;
    assert_eq!(store.product_list_calls(), 2);
}

#[tokio::test]
async fn whatsapp_order_builds_a_wa_me_link() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    store.seed_product("Red Roses", None, true).await;
    store.set_whatsapp("+62 812-3456-7890", true).await;
    store.set_setting("public_site_url", "https://florette.example/").await;
    let app = build_app(store, AppOptions::new(dir.path()));

    let response = send(
        &app.public,
        json_request(
            "POST",
            "/api/orders/whatsapp",
            None,
            json!({ "product_slug": "red-roses", "quantity": 2, "note": "Deliver before noon" }),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let url = body["url"].as_str().expect("url");
    assert!(url.starts_with("https://wa.me/6281234567890?text="));
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("Red Roses x2"));
    assert!(message.contains("https://florette.example/products/red-roses"));
    assert!(message.contains("Note: Deliver before noon"));
}

#[tokio::test]
async fn whatsapp_order_rejects_banned_words_and_disabled_ordering() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    store.seed_product("Red Roses", None, true).await;
    store.set_whatsapp("6281234567890", true).await;
    store.add_banned("spam").await;
    let app = build_app(store.clone(), AppOptions::new(dir.path()));

    let banned = send(
        &app.public,
        json_request(
            "POST",
            "/api/orders/whatsapp",
            None,
            json!({ "product_slug": "red-roses", "note": "this is SPAM!" }),
        ),
    )
    .await;
    assert_eq!(banned.status, StatusCode::BAD_REQUEST);
    assert_eq!(banned.json()["error"]["code"], "banned_word");

    let missing = send(
        &app.public,
        json_request(
            "POST",
            "/api/orders/whatsapp",
            None,
            json!({ "product_slug": "blue-orchids" }),
        ),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let cookie = login(&app).await;
    let disabled = send(
        &app.admin,
        json_request(
            "PUT",
            "/api/whatsapp",
            Some(&cookie),
            json!({ "phone_number": "6281234567890", "greeting": "Hi", "enabled": false }),
        ),
    )
    .await;
    assert_eq!(disabled.status, StatusCode::OK);

    let unavailable = send(
        &app.public,
        json_request(
            "POST",
            "/api/orders/whatsapp",
            None,
            json!({ "product_slug": "red-roses" }),
        ),
    )
    .await;
    assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn public_settings_expose_theme_map() {
    let dir = TempDir::new().expect("tempdir");
    let store = MemoryStore::new();
    store.set_setting("theme.primary", "#d94f70").await;
    store.set_setting("shop_name", "Florette").await;
    let app = build_app(store, AppOptions::new(dir.path()));

    let body = send(&app.public, get("/api/settings")).await.json();
    assert_eq!(body["theme"]["primary"], "#d94f70");
    assert_eq!(body["settings"]["shop_name"], "Florette");
    assert_eq!(body["whatsapp"]["enabled"], json!(false));

    let health = send(&app.public, get("/_health/db")).await;
    assert_eq!(health.status, StatusCode::NO_CONTENT);
}
