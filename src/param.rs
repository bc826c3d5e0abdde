// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块集中定义输入访问层与内省服务使用的协议常量，包括：
//! - 识别 AJAX 请求、JSON 期望与客户端地址所依赖的头部与服务器变量名。
//! - 常见 HTTP 状态码的原因短语（Reason Phrase）。
//! - 协议版本的强类型枚举。

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "webinput";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 浏览器脚本发起请求时附带的标记头
pub const AJAX_HEADER: &str = "X-Requested-With";

/// `X-Requested-With` 头的约定取值，比较时忽略大小写
pub const AJAX_MARKER: &str = "XMLHttpRequest";

/// 内容协商使用的请求头
pub const ACCEPT_HEADER: &str = "Accept";

/// 保存客户端地址的服务器变量
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";

/// 被视为安全连接的 URI scheme
pub const SECURE_SCHEME: &str = "https";

lazy_static! {
    /// 匹配 JSON 媒体类型：`application/json` 以及 `application/vnd.api+json` 一类的结构化后缀。
    ///
    /// 匹配前需去掉媒体范围中的参数部分（如 `;q=0.9`）。
    pub static ref JSON_MEDIA_TYPE: Regex =
        Regex::new(r"(?i)^application/(?:[a-z0-9._-]+\+)?json$").unwrap();
}

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        // 2xx: 成功响应 (Successful)
        map.insert(200, "OK");
        map.insert(204, "No Content");

        // 4xx: 客户端错误 (Client Error)
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(413, "Content Too Large");

        // 5xx: 服务端错误 (Server Error)
        map.insert(500, "Internal Server Error");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.0 版本
    V1_0,
    /// HTTP/1.1 版本
    V1_1,
}

impl HttpVersion {
    /// 从请求行中的协议字段解析版本，大小写不敏感。
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP/1.0" => Some(HttpVersion::V1_0),
            "HTTP/1.1" => Some(HttpVersion::V1_1),
            _ => None,
        }
    }
}

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "1.0"),
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}
