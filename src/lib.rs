//! swcache 库
//! 离线优先的缓存代理：按版本预取静态资源，数据请求网络优先、静态资源缓存优先。
//! 导出公共 API 和类型，供集成测试和外部 crate 使用

pub mod application;
pub mod cli;
pub mod config;
pub mod consts;
pub mod error;
pub mod fetch;
pub mod http;
pub mod middlewares;
pub mod network;
pub mod storage;
pub mod utils;
pub mod worker;
