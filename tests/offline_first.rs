//! 缓存策略的端到端测试：源站 <- swcache <- reqwest 客户端

use anyhow::Result;
use reqwest::StatusCode;

mod common;
use common::*;

#[tokio::test]
async fn test_static_assets_served_from_cache() -> Result<()> {
    let origin = start_origin(&[("/index.html", "<h1>home</h1>"), ("/a.js", "console.log(1)")]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &["/index.html", "/a.js"])?;
    let server = start_test_server(&config_path).await?;

    // 安装阶段各请求一次
    assert_eq!(origin.state.hits("/a.js"), 1);

    let client = client();
    for _ in 0..3 {
        let res = client.get(server.url("/a.js")).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(x_cache(&res), "HIT");
        assert!(res.headers().contains_key("sw-version"));
        assert_eq!(res.text().await?, "console.log(1)");
    }
    assert_eq!(origin.state.hits("/a.js"), 1);

    // 没有预取的静态资源第一次来自网络，之后来自缓存
    origin.set("/b.css", "body {}");
    let res = client.get(server.url("/b.css")).send().await?;
    assert_eq!(x_cache(&res), "MISS");
    let res = client.get(server.url("/b.css")).send().await?;
    assert_eq!(x_cache(&res), "HIT");
    assert_eq!(origin.state.hits("/b.css"), 1);
    Ok(())
}

#[tokio::test]
async fn test_data_network_first_and_offline_fallback() -> Result<()> {
    let origin = start_origin(&[("/index.html", "home"), ("/data/x.json", r#"{"v":1}"#)]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &["/index.html"])?;
    let server = start_test_server(&config_path).await?;
    let client = client();

    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(x_cache(&res), "MISS");
    assert_eq!(res.text().await?, r#"{"v":1}"#);

    // 数据始终优先请求网络
    origin.set("/data/x.json", r#"{"v":2}"#);
    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(x_cache(&res), "MISS");
    assert_eq!(res.text().await?, r#"{"v":2}"#);
    assert_eq!(origin.state.hits("/data/x.json"), 2);

    origin.shutdown().await;

    // 离线时返回最近一次成功的网络响应
    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(x_cache(&res), "HIT");
    assert_eq!(res.text().await?, r#"{"v":2}"#);

    // 离线且没有缓存
    let res = client.get(server.url("/data/y.json")).send().await?;
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["code"], 1004);

    // 预取过的静态资源离线可用
    let res = client.get(server.url("/index.html")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "home");

    // 未缓存的静态资源离线时请求失败
    let res = client.get(server.url("/c.png")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn test_non_get_passthrough() -> Result<()> {
    let origin = start_origin(&[("/data/x.json", "{}")]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &[])?;
    let server = start_test_server(&config_path).await?;
    let client = client();

    let res = client.post(server.url("/data/x.json")).body("{}").send().await?;
    assert_eq!(x_cache(&res), "BYPASS");
    let res = client.post(server.url("/data/x.json")).body("{}").send().await?;
    assert_eq!(x_cache(&res), "BYPASS");
    assert_eq!(origin.state.hits("/data/x.json"), 2);

    // POST 不会写入缓存
    origin.shutdown().await;
    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    Ok(())
}

#[tokio::test]
async fn test_failed_install_leaves_no_worker() -> Result<()> {
    let origin = start_origin(&[("/index.html", "home")]).await?;
    let (_dir, config_path) =
        create_temp_config(&origin.url(), "v1", &["/index.html", "/missing.js"])?;
    let server = start_test_server(&config_path).await?;

    assert!(server.registration.active().is_none());
    assert!(server.registration.storage().keys().await?.is_empty());

    let client = client();
    let res = client.get(server.url("/index.html")).send().await?;
    assert_eq!(x_cache(&res), "BYPASS");
    assert_eq!(res.text().await?, "home");

    let res = client.get(server.url("/__sw/status")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn test_revalidating_client_does_not_empty_offline_entry() -> Result<()> {
    let origin = start_origin(&[("/data/x.json", r#"{"v":1}"#)]).await?;
    let (_dir, config_path) = create_temp_config(&origin.url(), "v1", &[])?;
    let server = start_test_server(&config_path).await?;
    let client = client();

    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url("/data/x.json"))
        .header("if-none-match", "\"v1\"")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, r#"{"v":1}"#);

    origin.shutdown().await;
    let res = client.get(server.url("/data/x.json")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(x_cache(&res), "HIT");
    assert_eq!(res.text().await?, r#"{"v":1}"#);
    Ok(())
}
