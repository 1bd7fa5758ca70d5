//! 响应 JSON 字段探测工具
//!
//! 不同远程服务的响应结构差异很大，这里用点分路径按优先级探测字段，
//! 适配器只声明候选路径列表，不绑定具体响应 schema。

use serde_json::Value;

/// 按点分路径取值，数组段按下标解析（如 `output.results.0.url`）
pub fn find_value_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(segment)?;
            }
            Value::Array(items) => {
                let index = segment.parse::<usize>().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// 按候选路径顺序探测第一个非空字符串值，数字会被转为字符串
pub fn find_string_value(value: &Value, paths: &[&str]) -> Option<String> {
    for path in paths {
        if let Some(candidate) = find_value_by_path(value, path) {
            match candidate {
                Value::String(text) => {
                    if !text.trim().is_empty() {
                        return Some(text.clone());
                    }
                }
                Value::Number(number) => {
                    return Some(number.to_string());
                }
                _ => {}
            }
        }
    }
    None
}

/// 按候选路径顺序探测第一个整数值，字符串数字也接受
pub fn find_i64_value(value: &Value, paths: &[&str]) -> Option<i64> {
    for path in paths {
        if let Some(candidate) = find_value_by_path(value, path) {
            match candidate {
                Value::Number(number) => {
                    if let Some(integer) = number.as_i64() {
                        return Some(integer);
                    }
                }
                Value::String(text) => {
                    if let Ok(parsed) = text.parse::<i64>() {
                        return Some(parsed);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// 按候选路径顺序探测第一个浮点值
pub fn find_f64_value(value: &Value, paths: &[&str]) -> Option<f64> {
    for path in paths {
        if let Some(candidate) = find_value_by_path(value, path) {
            match candidate {
                Value::Number(number) => {
                    if let Some(float) = number.as_f64() {
                        return Some(float);
                    }
                }
                Value::String(text) => {
                    if let Ok(parsed) = text.parse::<f64>() {
                        return Some(parsed);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// 从响应中提取视频产物 URL（仅接受 http/https）
pub fn extract_media_url(value: &Value) -> Option<String> {
    if let Some(url) = find_string_value(
        value,
        &[
            "output.video_url",
            "output.url",
            "video_url",
            "url",
            "result.video_url",
            "result.url",
            "output.video_urls.0",
            "audio_url",
            "result.audio_url",
        ],
    ) {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(url);
        }
    }

    if let Some(Value::Array(items)) = find_value_by_path(value, "output.results") {
        for item in items {
            if let Some(url) = find_string_value(item, &["url", "video_url"]) {
                if url.starts_with("http://") || url.starts_with("https://") {
                    return Some(url);
                }
            }
        }
    }

    None
}

/// 规范化 API 地址：补协议、去尾部斜杠，空值回落默认地址
pub fn normalize_host(api_host: &str, fallback: &str) -> String {
    let trimmed = api_host.trim();
    if trimmed.is_empty() {
        return fallback.trim_end_matches('/').to_string();
    }
    let with_protocol = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    with_protocol.trim_end_matches('/').to_string()
}

/// 截断响应体用于日志与错误信息
pub fn preview_payload(payload: &str) -> String {
    const LIMIT: usize = 280;
    if payload.len() <= LIMIT {
        return payload.to_string();
    }
    let mut end = LIMIT;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &payload[..end])
}
