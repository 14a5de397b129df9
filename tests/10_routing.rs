mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{read, TestServer};

#[tokio::test]
async fn public_routes_need_no_tenant() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = read(server.get("/health").send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));

    let (status, body) = read(server.get("/").send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tenant_header"], json!("x-tenant"));
    Ok(())
}

#[tokio::test]
async fn tenant_route_without_tenant_is_forbidden() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = read(server.get("/api/tenant").send().await?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("TENANT_MISSING"));

    // A principal without a tenant claim is no different
    let resp = server
        .get("/api/data/blogs")
        .bearer_auth(server.user_token(None))
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("TENANT_MISSING"));
    Ok(())
}

#[tokio::test]
async fn unknown_tenant_header_is_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;

    for slug in ["ghost", "Not A Slug"] {
        let (status, body) = read(server.get("/api/tenant").header("x-tenant", slug).send().await?).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", slug);
        assert_eq!(body["code"], json!("TENANT_NOT_FOUND"));
    }
    Ok(())
}

#[tokio::test]
async fn invalid_bearer_token_is_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = read(server.get("/api/tenant").bearer_auth("not-a-jwt").send().await?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("UNAUTHORIZED"));
    Ok(())
}

#[tokio::test]
async fn header_selects_tenant_database() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;

    let (status, body) = read(server.get("/api/tenant").header("x-tenant", "acme").send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tenant"]["slug"], json!("acme"));
    assert_eq!(body["data"]["binding"]["tenant"], json!("acme"));
    Ok(())
}

#[tokio::test]
async fn principal_tenant_wins_over_header() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;
    server.create_tenant("globex").await?;

    let resp = server
        .get("/api/tenant")
        .bearer_auth(server.user_token(Some("acme")))
        .header("x-tenant", "globex")
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tenant"]["slug"], json!("acme"));
    Ok(())
}

#[tokio::test]
async fn suspended_tenant_stops_resolving() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;
    let token = server.user_token(Some("acme"));

    let resp = server
        .put("/api/root/tenant/acme")
        .bearer_auth(server.root_token())
        .json(&json!({ "status": "suspended" }))
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("suspended"));

    let (status, body) = read(server.get("/api/tenant").bearer_auth(&token).send().await?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("TENANT_NOT_FOUND"));

    server
        .put("/api/root/tenant/acme")
        .bearer_auth(server.root_token())
        .json(&json!({ "status": "active" }))
        .send()
        .await?;
    let resp = server.get("/api/tenant").bearer_auth(&token).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn records_stay_in_their_tenant() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;
    server.create_tenant("globex").await?;

    let resp = server
        .post("/api/data/blogs")
        .header("x-tenant", "acme")
        .json(&json!({ "title": "acme launch", "views": 3 }))
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["title"], json!("acme launch"));
    assert!(body["data"]["id"].is_i64());

    let (_, acme) = read(server.get("/api/data/blogs").header("x-tenant", "acme").send().await?).await?;
    let (_, globex) = read(server.get("/api/data/blogs").header("x-tenant", "globex").send().await?).await?;
    assert_eq!(acme["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(globex["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn interleaved_requests_never_cross_tenants() -> Result<()> {
    let server = TestServer::spawn().await?;
    let slugs = ["acme", "globex", "initech"];
    for slug in slugs {
        server.create_tenant(slug).await?;
    }

    let writes = (0..30).map(|i| {
        let slug = slugs[i % slugs.len()];
        server
            .post("/api/data/blogs")
            .header("x-tenant", slug)
            .json(&json!({ "title": format!("{}-{}", slug, i) }))
            .send()
    });
    for resp in futures::future::join_all(writes).await {
        assert_eq!(resp?.status(), StatusCode::CREATED);
    }

    for slug in slugs {
        let resp = server.get("/api/data/blogs").header("x-tenant", slug).send().await?;
        let (_, body) = read(resp).await?;
        let rows = body["data"].as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 10, "{}", slug);
        for row in rows {
            let title = row["title"].as_str().unwrap_or_default();
            assert!(title.starts_with(&format!("{}-", slug)), "{} saw {}", slug, title);
        }
    }
    Ok(())
}

#[tokio::test]
async fn page_size_is_capped() -> Result<()> {
    let server = TestServer::spawn_with(|config| config.api.max_page_size = 2).await?;
    server.create_tenant("acme").await?;

    for title in ["one", "two", "three"] {
        server
            .post("/api/data/blogs")
            .header("x-tenant", "acme")
            .json(&json!({ "title": title }))
            .send()
            .await?;
    }

    let resp = server
        .get("/api/data/blogs?limit=50")
        .header("x-tenant", "acme")
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn writes_are_validated_against_declared_columns() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;

    let post = |body: Value| server.post("/api/data/blogs").header("x-tenant", "acme").json(&body).send();

    let (status, body) = read(post(json!({ "id": 7, "title": "x" })).await?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("BAD_REQUEST"));

    let (status, body) = read(post(json!({ "subtitle": "x" })).await?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    assert!(body["field_errors"]["subtitle"].is_string());

    let (status, body) = read(post(json!({ "views": "many" })).await?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    Ok(())
}

#[tokio::test]
async fn relation_columns_follow_their_targets() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;

    let post = |path: &str, body: Value| server.post(path).header("x-tenant", "acme").json(&body).send();

    // Dangling reference into a provisioned table is the caller's mistake
    let (status, body) = read(post("/api/data/blogs", json!({ "title": "x", "author_id": 999 })).await?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));

    let (status, author) = read(post("/api/data/authors", json!({ "name": "ada" })).await?).await?;
    assert_eq!(status, StatusCode::CREATED);
    let author_id = author["data"]["id"].clone();

    let (status, _) = read(post("/api/data/blogs", json!({ "title": "y", "author_id": author_id })).await?).await?;
    assert_eq!(status, StatusCode::CREATED);

    // Internal and tenant types have no table here, so their ids are stored as-is
    let (status, body) = read(post("/api/data/blogs", json!({ "title": "z", "editor_id": 1, "owner_id": 7 })).await?).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["editor_id"], json!(1));
    Ok(())
}

#[tokio::test]
async fn excluded_families_are_not_data_routes() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_tenant("acme").await?;

    for content_type in ["api::tenant.tenant", "admin::user", "nope"] {
        let path = format!("/api/data/{}", content_type);
        let resp = server.get(&path).header("x-tenant", "acme").send().await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", content_type);
    }
    Ok(())
}

#[tokio::test]
async fn root_routes_require_root_access() -> Result<()> {
    let server = TestServer::spawn().await?;

    let resp = server.get("/api/root/tenant").send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .get("/api/root/tenant")
        .bearer_auth(server.user_token(None))
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("FORBIDDEN"));

    let (status, body) = read(server.get("/api/root/tenant").bearer_auth(server.root_token()).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    Ok(())
}
