use serde_json::{Map, Value};

use crate::param::STATUS_CODES;

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let title = format!("{}", code);
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let description = match note {
            Some(n) => n,
            None => STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status"),
        };
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code, description
        );
        Self { title, css, body }
    }

    /// 将访问器看到的请求快照渲染为页面。
    ///
    /// `summary` 为 (名称, 取值) 列表，显示在页首；`sections` 中每个对象渲染为一张表。
    pub fn from_snapshot(path: &str, summary: &[(&str, String)], sections: &Map<String, Value>) -> Self {
        let mut body = String::new();
        body.push_str(&format!("<h1>{}</h1><hr>", escape_html(path)));
        body.push_str("<table>");
        for (name, value) in summary {
            body.push_str(&format!(
                "<tr><td><b>{}</b></td><td>{}</td></tr>",
                escape_html(name),
                escape_html(value)
            ));
        }
        body.push_str("</table>");

        for (section, value) in sections {
            body.push_str(&format!("<h2>{}</h2>", escape_html(section)));
            match value {
                Value::Object(entries) if !entries.is_empty() => {
                    body.push_str("<table>");
                    for (key, value) in entries {
                        body.push_str(&format!(
                            "<tr><td>{}</td><td>{}</td></tr>",
                            escape_html(key),
                            escape_html(&display_value(value))
                        ));
                    }
                    body.push_str("</table>");
                }
                _ => body.push_str("<p>（空）</p>"),
            }
        }

        let css = r"
            table {
                border-collapse: collapse;
                width: 100%;
            }

            td {
                padding: 8px;
                white-space: pre-wrap; /* 保留换行符和空格 */
                border: none; /* 隐藏单元格边框 */
            }"
        .to_string();
        HtmlBuilder {
            title: format!("{} 的请求输入", path),
            css,
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <html>
                <head>
                    <meta charset="utf-8">
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            escape_html(&self.title),
            self.css,
            self.body
        )
    }
}

/// 字符串原样显示，`null` 显示为 `null`，其余值显示为紧凑 JSON。
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
