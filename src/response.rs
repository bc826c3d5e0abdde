use crate::{
    param::*,
    util::HtmlBuilder,
};

use bytes::Bytes;
use chrono::prelude::*;
use log::error;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    date: DateTime<Utc>,
    server_name: String,
    content: Option<Bytes>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            content: None,
        }
    }

    pub fn json(data: &Value, code: u16) -> Self {
        let body = match serde_json::to_vec_pretty(data) {
            Ok(body) => body,
            Err(e) => {
                error!("无法序列化JSON响应：{}", e);
                return Self::from_status_code(500);
            }
        };
        let mut response = Self::new();
        response.content_type = Some("application/json".to_string());
        response.content = Some(Bytes::from(body));
        response.set_code(code).to_owned()
    }

    pub fn html(html: &str, code: u16) -> Self {
        let mut response = Self::new();
        response.content_type = Some("text/html;charset=utf-8".to_string());
        response.content = Some(Bytes::from(html.to_string()));
        response.set_code(code).to_owned()
    }

    pub fn from_status_code(code: u16) -> Self {
        let content = match code {
            400 => HtmlBuilder::from_status_code(400, Some(
                r"<h2>噢！</h2><p>服务器无法解析你的请求。</p>"
            )),
            500 => HtmlBuilder::from_status_code(500, Some(
                r"<h2>噢！</h2><p>服务器出现了一个内部错误。</p>"
            )),
            _ => HtmlBuilder::from_status_code(code, None),
        }
        .build();
        Self::html(&content, code)
    }

    pub fn response_400() -> Self {
        Self::from_status_code(400)
    }

    pub fn response_500() -> Self {
        Self::from_status_code(500)
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&reason) => reason.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                self.status_code = 500;
                "Internal Server Error".to_string()
            }
        };
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_0 => "HTTP/1.0",
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let content_length: &str = &self.content_length().to_string();
        let date: &str = &format_date(&self.date);

        let header = [
            version,
            " ",
            status_code,
            " ",
            &self.information,
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            &self.server_name,
            CRLF,
            "Connection: close",
            CRLF,
            CRLF,
        ]
        .concat();
        [header.as_bytes(), self.content.as_deref().unwrap_or_default()].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_length(&self) -> usize {
        self.content.as_ref().map_or(0, Bytes::len)
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
