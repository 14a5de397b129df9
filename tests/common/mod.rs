#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use monk_tenancy::app::{app, AppState};
use monk_tenancy::auth::{generate_jwt, Claims, ROOT_ACCESS};
use monk_tenancy::config::AppConfig;
use monk_tenancy::schema::FileDeclarationSource;

const BLOG: &str = r#"{
  "collectionName": "blogs",
  "attributes": {
    "title": { "type": "string" },
    "views": { "type": "integer" },
    "body": { "type": "richtext" },
    "author": { "type": "relation", "relation": "manyToOne", "target": "api::author.author" },
    "tags": { "type": "relation", "relation": "manyToMany", "target": "api::tag.tag" },
    "owner": { "type": "relation", "relation": "manyToOne", "target": "api::tenant.tenant" },
    "editor": { "type": "relation", "relation": "manyToOne", "target": "admin::user" }
  }
}"#;

const AUTHOR: &str = r#"{
  "collectionName": "authors",
  "attributes": { "name": { "type": "string" } }
}"#;

const TAG: &str = r#"{
  "collectionName": "tags",
  "attributes": { "label": { "type": "string" } }
}"#;

const TENANT: &str = r#"{ "attributes": { "name": { "type": "string" } } }"#;

const ADMIN_USER: &str = r#"{
  "identifier": "admin::user",
  "attributes": { "email": { "type": "email" } }
}"#;

/// App served on an ephemeral port, backed by a throwaway data root
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub config: AppConfig,
    _root: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let root = tempfile::tempdir().context("failed to create temp dir")?;
        let declarations = root.path().join("content-types");
        write_declarations(&declarations)?;

        let mut config = AppConfig::for_data_root(root.path().join("data"));
        config.tenancy.declarations_path = declarations.clone();
        configure(&mut config);

        let state = AppState::new(config.clone(), Arc::new(FileDeclarationSource::new(declarations)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let base_url = format!("http://{}", listener.local_addr()?);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app(state)).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            config,
            _root: root,
        })
    }

    pub fn data_root(&self) -> &Path {
        &self.config.database.data_root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    fn token(&self, access: &str, tenant: Option<&str>) -> String {
        let claims = Claims::new(
            "tester".to_string(),
            uuid::Uuid::new_v4(),
            access.to_string(),
            tenant.map(str::to_string),
            1,
        );
        generate_jwt(&claims, &self.config.security.jwt_secret).expect("token")
    }

    pub fn root_token(&self) -> String {
        self.token(ROOT_ACCESS, None)
    }

    pub fn user_token(&self, tenant: Option<&str>) -> String {
        self.token("full", tenant)
    }

    /// Register `slug` through the management API; registration provisions it
    pub async fn create_tenant(&self, slug: &str) -> Result<Value> {
        let resp = self
            .post("/api/root/tenant")
            .bearer_auth(self.root_token())
            .json(&json!({ "slug": slug }))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::CREATED, "create {} -> {}", slug, resp.status());
        Ok(resp.json::<Value>().await?["data"].clone())
    }
}

/// Status plus parsed body
pub async fn read(resp: Response) -> Result<(StatusCode, Value)> {
    let status = resp.status();
    let body = resp.json::<Value>().await.context("response body was not JSON")?;
    Ok((status, body))
}

fn write_declarations(root: &Path) -> Result<()> {
    let documents = [
        ("api/author/content-types/author/schema.json", AUTHOR),
        ("api/blog/content-types/blog/schema.json", BLOG),
        ("api/tag/content-types/tag/schema.json", TAG),
        ("api/tenant/content-types/tenant/schema.json", TENANT),
        ("admin/user.json", ADMIN_USER),
    ];

    for (relative, contents) in documents {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
    }
    Ok(())
}
