// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求上下文模块
//!
//! [`ServerRequest`] 是输入访问器读取的“已解析请求”。它有两种来源：
//! 1. 由上游框架通过 `with_*` 构建方法逐项组装（测试与子请求常用）。
//! 2. 由 [`ServerRequest::try_from`] 从 TCP 流读取的原始字节解析得到，涵盖：
//!    - 请求行（方法、目标、版本）
//!    - 请求头（保持原始顺序与写法）
//!    - 查询字符串与 `application/x-www-form-urlencoded` 正文（支持 `a[]=1`、`a[b]=1` 嵌套键）
//!    - `application/json` 正文
//!    - `Cookie` 请求头
//!
//! 请求一经构建即不可变；所有 `with_*` 方法都返回新值。

use std::path::PathBuf;

use log::{debug, error, warn};
use serde_derive::Serialize;
use serde_json::{Map, Value};

use crate::{exception::Exception, param::*, uri::Uri};

/// 上传文件的描述信息。文件内容本身由上游保存到临时路径。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    client_filename: String,
    client_media_type: String,
    size: u64,
    /// 上传错误码，0 表示成功
    error: u8,
    temp_path: Option<PathBuf>,
}

impl UploadedFile {
    pub fn new(client_filename: &str, client_media_type: &str, size: u64) -> Self {
        Self {
            client_filename: client_filename.to_string(),
            client_media_type: client_media_type.to_string(),
            size,
            error: 0,
            temp_path: None,
        }
    }

    pub fn with_error(mut self, error: u8) -> Self {
        self.error = error;
        self
    }

    pub fn with_temp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_path = Some(path.into());
        self
    }

    pub fn client_filename(&self) -> &str {
        &self.client_filename
    }

    pub fn client_media_type(&self) -> &str {
        &self.client_media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn error(&self) -> u8 {
        self.error
    }

    pub fn temp_path(&self) -> Option<&PathBuf> {
        self.temp_path.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error == 0
    }
}

/// 一个完整的、已解析的入站请求。
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRequest {
    /// 全局请求 ID，用于在多线程环境下追踪日志
    id: u128,
    /// 原始方法名，大小写保持客户端发送的样子
    method: String,
    uri: Uri,
    version: HttpVersion,
    /// 按接收顺序保存的请求头
    headers: Vec<(String, String)>,
    query_params: Map<String, Value>,
    parsed_body: Map<String, Value>,
    cookies: Map<String, Value>,
    uploaded_files: Vec<(String, UploadedFile)>,
    /// 路由等中间层附加的属性
    attributes: Map<String, Value>,
    server_params: Map<String, Value>,
}

impl Default for ServerRequest {
    fn default() -> Self {
        Self::new("GET", "")
    }
}

impl ServerRequest {
    /// 以方法和 URI 构建请求，查询参数取自 URI 的查询部分。
    pub fn new(method: &str, uri: &str) -> Self {
        let uri = Uri::parse(uri);
        let query_params = parse_urlencoded(uri.query());
        Self {
            id: 0,
            method: method.to_string(),
            uri,
            version: HttpVersion::V1_1,
            headers: Vec::new(),
            query_params,
            parsed_body: Map::new(),
            cookies: Map::new(),
            uploaded_files: Vec::new(),
            attributes: Map::new(),
            server_params: Map::new(),
        }
    }

    /// 从原始字节缓冲区尝试构建 `ServerRequest` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、目标和协议版本。
    /// 3. 解析请求头，并据此补全 URI 的 scheme 与 host。
    /// 4. 解析查询字符串、Cookie 与正文。
    /// 5. 填充 CGI 风格的服务器变量。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string.trim_end_matches('\0'),
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let (head, body) = match request_string.split_once("\r\n\r\n") {
            Some((head, body)) => (head, body),
            None => (request_string, ""),
        };
        let mut lines = head.split(CRLF);

        // 请求行 (e.g., "GET /index.html HTTP/1.1")
        let request_line = lines.next().unwrap_or("");
        let parts: Vec<&str> = request_line.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let version = match HttpVersion::parse(parts[parts.len() - 1]) {
            Some(v) => v,
            None => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, parts[parts.len() - 1]);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let target = parts[1..parts.len() - 1].join(" ");

        let mut request = Self::new(parts[0], &target).with_id(id).with_version(version);

        for line in lines {
            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    request = request.with_header(name.trim(), value.trim());
                }
                _ => warn!("[ID{}]忽略格式错误的请求头：{}", id, line),
            }
        }

        if request.uri.scheme().is_empty() {
            let host = request.header_line("Host").unwrap_or_default();
            request.uri = request.uri.with_scheme("http").with_authority(&host);
        }

        let cookie_header = request.header_line("Cookie");
        if let Some(cookie_header) = cookie_header {
            request.cookies = parse_cookies(&cookie_header);
        }

        let body = match request
            .header_line("Content-Length")
            .and_then(|len| len.trim().parse::<usize>().ok())
        {
            Some(len) if len < body.len() && body.is_char_boundary(len) => &body[..len],
            _ => body,
        };
        request.parsed_body = parse_body(request.header_line("Content-Type").as_deref(), body, id);

        request.server_params = request.cgi_params(&target);
        debug!(
            "[ID{}]请求解析完成：{} {}，{}个请求头",
            id,
            request.method,
            request.uri,
            request.headers.len()
        );
        Ok(request)
    }

    fn cgi_params(&self, target: &str) -> Map<String, Value> {
        let mut params = self.server_params.clone();
        params.insert(
            "SERVER_PROTOCOL".to_string(),
            Value::String(format!("HTTP/{}", self.version)),
        );
        params.insert("REQUEST_METHOD".to_string(), Value::String(self.method.clone()));
        params.insert("REQUEST_URI".to_string(), Value::String(target.to_string()));
        params.insert(
            "QUERY_STRING".to_string(),
            Value::String(self.uri.query().to_string()),
        );
        for (name, _) in &self.headers {
            let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
            if let Some(value) = self.header_line(name) {
                params.insert(key, Value::String(value));
            }
        }
        params
    }
}

// --- 构建方法 ---

impl ServerRequest {
    pub fn with_id(mut self, id: u128) -> Self {
        self.id = id;
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    /// 追加一个请求头，已存在的同名头不会被覆盖。
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_query_params(mut self, params: Map<String, Value>) -> Self {
        self.query_params = params;
        self
    }

    pub fn with_parsed_body(mut self, body: Map<String, Value>) -> Self {
        self.parsed_body = body;
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn with_cookie_params(mut self, cookies: Map<String, Value>) -> Self {
        self.cookies = cookies;
        self
    }

    /// 同名文件会被替换。
    pub fn with_uploaded_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.uploaded_files.retain(|(key, _)| key != name);
        self.uploaded_files.push((name.to_string(), file));
        self
    }

    pub fn with_attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn with_server_param(mut self, name: &str, value: Value) -> Self {
        self.server_params.insert(name.to_string(), value);
        self
    }

    pub fn with_server_params(mut self, params: Map<String, Value>) -> Self {
        self.server_params = params;
        self
    }
}

// --- Getter 访问器实现 ---

impl ServerRequest {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 按名称（不区分大小写）取出全部取值并以逗号拼接。
    pub fn header_line(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }

    pub fn query_params(&self) -> &Map<String, Value> {
        &self.query_params
    }

    pub fn parsed_body(&self) -> &Map<String, Value> {
        &self.parsed_body
    }

    pub fn cookies(&self) -> &Map<String, Value> {
        &self.cookies
    }

    pub fn uploaded_files(&self) -> &[(String, UploadedFile)] {
        &self.uploaded_files
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn server_params(&self) -> &Map<String, Value> {
        &self.server_params
    }
}

fn parse_body(content_type: Option<&str>, body: &str, id: u128) -> Map<String, Value> {
    let media_type = match content_type {
        Some(t) => t.split(';').next().unwrap_or("").trim(),
        None => return Map::new(),
    };
    if body.is_empty() {
        return Map::new();
    }
    if media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        return parse_urlencoded(body);
    }
    if JSON_MEDIA_TYPE.is_match(media_type) {
        return match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("[ID{}]JSON正文不是对象，忽略", id);
                Map::new()
            }
            Err(e) => {
                warn!("[ID{}]无法解析JSON正文：{}", id, e);
                Map::new()
            }
        };
    }
    debug!("[ID{}]不解析的正文类型：{}", id, media_type);
    Map::new()
}

/// 解析 `a=1&b[]=2&c[d]=3` 形式的字符串。
pub fn parse_urlencoded(input: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        insert_param(&mut map, &key, Value::String(decode_component(value)));
    }
    map
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

fn insert_param(map: &mut Map<String, Value>, key: &str, value: Value) {
    let (base, rest) = match key.find('[') {
        Some(i) if i > 0 && key.ends_with(']') => (&key[..i], &key[i..]),
        _ => {
            map.insert(key.to_string(), value);
            return;
        }
    };
    let segments: Vec<&str> = rest[1..rest.len() - 1].split("][").collect();
    let slot = map.entry(base.to_string()).or_insert(Value::Null);
    insert_nested(slot, &segments, value);
}

fn insert_nested(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };
    if first.is_empty() {
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            items.push(Value::Null);
            if let Some(last) = items.last_mut() {
                insert_nested(last, rest, value);
            }
        }
    } else {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(map) = slot {
            let child = map.entry(first.to_string()).or_insert(Value::Null);
            insert_nested(child, rest, value);
        }
    }
}

fn parse_cookies(header: &str) -> Map<String, Value> {
    let mut cookies = Map::new();
    for pair in header.split(|c: char| c == ';' || c == ',') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim().trim_matches('"');
            let value = match urlencoding::decode(value) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => value.to_string(),
            };
            // 同名 Cookie 以第一次出现的为准
            if !cookies.contains_key(name) {
                cookies.insert(name.to_string(), Value::String(value));
            }
        }
    }
    cookies
}
