// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 请求 URI 的值类型。
//!
//! 只做结构拆分（scheme、host、port、path、query），不做百分号解码；
//! 解码由请求解析器在构建查询参数时完成。

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
}

impl Uri {
    /// 拆分绝对形式（`https://host:8443/p?q`）、源形式（`/p?q`）、相对形式（`hello`）以及空串。
    ///
    /// 该函数不会失败：无法识别的部分原样归入 path。
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        // 片段从不发送给服务端，直接丢弃
        let input = match input.find('#') {
            Some(i) => &input[..i],
            None => input,
        };

        let (scheme, rest) = match input.find("://") {
            Some(i) if is_scheme(&input[..i]) => (input[..i].to_ascii_lowercase(), &input[i + 3..]),
            _ => (String::new(), input),
        };

        let (authority, rest) = if scheme.is_empty() {
            ("", rest)
        } else {
            let end = rest.find(['/', '?']).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };

        let (path, query) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };

        let (host, port) = split_authority(authority);

        Self {
            scheme,
            host,
            port,
            path: path.to_string(),
            query: query.to_string(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// 原始路径，可能为空或不以 `/` 开头。
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_ascii_lowercase();
        self
    }

    /// 设置 host，`authority` 允许携带端口（`example.com:8080`）。
    pub fn with_authority(mut self, authority: &str) -> Self {
        let (host, port) = split_authority(authority);
        self.host = host;
        self.port = port;
        self
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}://{}", self.scheme, self.host)?;
            if let Some(port) = self.port {
                write!(f, ":{}", port)?;
            }
            if !self.path.is_empty() && !self.path.starts_with('/') {
                write!(f, "/")?;
            }
        }
        write!(f, "{}", self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

fn split_authority(authority: &str) -> (String, Option<u16>) {
    // 去掉 userinfo
    let authority = match authority.rfind('@') {
        Some(i) => &authority[i + 1..],
        None => authority,
    };
    // IPv6 字面量中的冒号不是端口分隔符
    let port_sep = match authority.rfind(']') {
        Some(close) => authority[close..].find(':').map(|i| close + i),
        None => authority.rfind(':'),
    };
    match port_sep {
        Some(i) => match authority[i + 1..].parse::<u16>() {
            Ok(port) => (authority[..i].to_ascii_lowercase(), Some(port)),
            Err(_) => (authority.to_ascii_lowercase(), None),
        },
        None => (authority.to_ascii_lowercase(), None),
    }
}
