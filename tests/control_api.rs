//! 控制接口与版本更新的端到端测试

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{Value, json};

use swcache::{application::handle_config_change, config::Settings};

mod common;
use common::*;

#[tokio::test]
async fn test_status() -> Result<()> {
    let origin = start_origin(&[("/index.html", "home")]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &["/index.html"])?;
    let server = start_test_server(&config_path).await?;

    let res = client().get(server.url("/__sw/status")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["state"], "activated");
    assert_eq!(body["version"], "v1");
    assert_eq!(body["cache_name"], "swcache-v1");
    Ok(())
}

#[tokio::test]
async fn test_push_and_notification_click() -> Result<()> {
    let origin = start_origin(&[]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &[])?;
    let server = start_test_server(&config_path).await?;
    let client = client();

    let res = client
        .post(server.url("/__sw/push"))
        .json(&json!({ "title": "New level", "body": "World 2 unlocked" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let notification: Value = res.json().await?;
    assert_eq!(notification["title"], "New level");
    assert_eq!(notification["icon"], "/images/icon-192.png");
    let id = notification["id"].as_u64().unwrap();

    let res = client.get(server.url("/__sw/notifications")).send().await?;
    let list: Vec<Value> = res.json().await?;
    assert_eq!(list.len(), 1);

    let click = server.url(&format!("/__sw/notifications/{id}/click"));
    let res = client.post(&click).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["open_window"], "/");

    // 已关闭的通知
    let res = client.post(&click).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(server.url("/__sw/push"))
        .body("not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_sync_refreshes_data() -> Result<()> {
    let origin = start_origin(&[("/data/x.json", "1")]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &[])?;
    let server = start_test_server(&config_path).await?;
    let client = client();

    client.get(server.url("/data/x.json")).send().await?;
    origin.set("/data/x.json", "2");

    let res = client.post(server.url("/__sw/sync/sync-data")).send().await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    // 同步在后台执行
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while origin.state.hits("/data/x.json") < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    origin.shutdown().await;
    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(x_cache(&res), "HIT");
    assert_eq!(res.text().await?, "2");
    Ok(())
}

#[tokio::test]
async fn test_new_version_replaces_old_cache() -> Result<()> {
    let origin = start_origin(&[("/index.html", "home v1")]).await?;
    let (dir, config_path) = create_temp_config(&origin.url(), "v1", &["/index.html"])?;
    let server = start_test_server(&config_path).await?;
    assert_eq!(
        server.registration.storage().keys().await?,
        vec!["swcache-v1".to_string()]
    );

    origin.set("/index.html", "home v2");
    let content = config_content(
        &origin.url(),
        "v2",
        &["/index.html"],
        &dir.path().join("cache").to_string_lossy(),
    );
    handle_config_change(
        Settings::from_toml(&content),
        server.registration.clone(),
        server.handles.clone(),
    )
    .await;

    let active = server.registration.active().unwrap();
    assert_eq!(active.cache_name(), "swcache-v2");
    assert_eq!(
        server.registration.storage().keys().await?,
        vec!["swcache-v2".to_string()]
    );

    // 服务器重启后监听新的端口
    let addr = get_server_addr(&server.handles).await?;
    let res = client()
        .get(format!("http://{addr}/index.html"))
        .send()
        .await?;
    assert_eq!(x_cache(&res), "HIT");
    assert_eq!(res.text().await?, "home v2");
    Ok(())
}

#[tokio::test]
async fn test_invalid_reload_keeps_current_worker() -> Result<()> {
    let origin = start_origin(&[("/index.html", "home")]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &["/index.html"])?;
    let server = start_test_server(&config_path).await?;

    handle_config_change(
        Settings::from_toml("not = [valid"),
        server.registration.clone(),
        server.handles.clone(),
    )
    .await;

    let active = server.registration.active().unwrap();
    assert_eq!(active.cache_name(), "swcache-v1");
    let res = client().get(server.url("/index.html")).send().await?;
    assert_eq!(x_cache(&res), "HIT");
    Ok(())
}
