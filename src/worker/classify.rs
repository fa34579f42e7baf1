use crate::fetch::{FetchRequest, Origin};

/// 请求的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// 游戏数据：网络优先
    Data,
    /// 静态资源：缓存优先
    Static,
    /// 跨源或非 GET 请求，不拦截
    Passthrough,
}

/// 路径包含 `/data/` 段且以 `.json` 结尾
pub fn is_data_path(path: &str) -> bool {
    path.contains("/data/") && path.ends_with(".json")
}

pub fn classify(request: &FetchRequest, origin: &Origin) -> RequestKind {
    if request.method != http::Method::GET {
        return RequestKind::Passthrough;
    }
    match request.origin() {
        Some(request_origin) if &request_origin == origin => {}
        _ => return RequestKind::Passthrough,
    }
    if is_data_path(request.path()) {
        RequestKind::Data
    } else {
        RequestKind::Static
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn origin() -> Origin {
        Origin::parse("http://127.0.0.1:3000").unwrap()
    }

    fn get(url: &str) -> FetchRequest {
        FetchRequest::get(url.parse().unwrap())
    }

    #[test]
    fn test_data_paths() {
        assert!(is_data_path("/data/x.json"));
        assert!(is_data_path("/game/data/items/sword.json"));
        assert!(!is_data_path("/data/x.js"));
        assert!(!is_data_path("/database/x.json"));
        assert!(!is_data_path("/x.json"));
        assert!(!is_data_path("/data/"));
    }

    #[test]
    fn test_classify_same_origin() {
        let origin = origin();
        assert_eq!(
            classify(&get("http://127.0.0.1:3000/data/x.json"), &origin),
            RequestKind::Data
        );
        assert_eq!(
            classify(&get("http://127.0.0.1:3000/a.js"), &origin),
            RequestKind::Static
        );
        assert_eq!(
            classify(&get("http://127.0.0.1:3000/"), &origin),
            RequestKind::Static
        );
    }

    #[test]
    fn test_query_string_is_not_part_of_path() {
        assert_eq!(
            classify(&get("http://127.0.0.1:3000/data/x.json?v=2"), &origin()),
            RequestKind::Data
        );
    }

    #[test]
    fn test_classify_cross_origin() {
        let origin = origin();
        assert_eq!(
            classify(&get("http://cdn.example.com/data/x.json"), &origin),
            RequestKind::Passthrough
        );
        assert_eq!(
            classify(&get("https://127.0.0.1:3000/a.js"), &origin),
            RequestKind::Passthrough
        );
    }

    #[test]
    fn test_classify_non_get() {
        let mut request = get("http://127.0.0.1:3000/data/x.json");
        request.method = Method::POST;
        assert_eq!(classify(&request, &origin()), RequestKind::Passthrough);
    }
}
