// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 定义输入访问层在请求生命周期中可能产生的错误。
//!
//! ## 设计意图
//! - **两类核心错误**：`ScopeError` 表示当前作用域内没有绑定请求；`InputError`
//!   表示调用方使用了不存在的集合名，属于编程错误。二者互不混用。
//! - **缺失值不是错误**：缺失的请求头、参数或客户端地址一律以 `Option::None` 表达。
//! - **解析错误**：上游 HTTP 报文解析器的失败同样归入 `Exception`，便于服务端统一转换为 400。

use std::{error, fmt};

/// 当前作用域中没有可用的请求上下文。
///
/// 该错误总是直接返回给调用方，访问器内部不会重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// 在 HTTP 请求生命周期之外访问了请求数据。
    NoActiveRequest,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::NoActiveRequest => {
                write!(f, "Unable to resolve active request, no request is bound in scope")
            }
        }
    }
}

impl error::Error for ScopeError {}

/// 调用方请求了一个不存在的输入集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// 未知的集合名称，携带原始名称以便定位调用点。
    UnknownBag(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::UnknownBag(name) => write!(f, "Undefined input bag '{}'", name),
        }
    }
}

impl error::Error for InputError {}

/// 输入层对外的统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 作用域中没有请求。
    Scope(ScopeError),
    /// 集合名称错误。
    Input(InputError),
    /// 请求字节流不是合法的 UTF-8。
    RequestIsNotUtf8,
    /// 请求行缺少方法、目标或协议版本。
    MalformedRequestLine,
    /// 不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope(e) => write!(f, "{}", e),
            Input(e) => write!(f, "{}", e),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
        }
    }
}

impl error::Error for Exception {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Scope(e) => Some(e),
            Input(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScopeError> for Exception {
    fn from(e: ScopeError) -> Self {
        Exception::Scope(e)
    }
}

impl From<InputError> for Exception {
    fn from(e: InputError) -> Self {
        Exception::Input(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_error_converts() {
        let e: Exception = ScopeError::NoActiveRequest.into();
        assert_eq!(e, Exception::Scope(ScopeError::NoActiveRequest));
        assert!(error::Error::source(&e).is_some());
    }

    #[test]
    fn test_input_error_message_names_bag() {
        let e: Exception = InputError::UnknownBag("invalid".to_string()).into();
        assert_eq!(e.to_string(), "Undefined input bag 'invalid'");
    }

    #[test]
    fn test_parse_errors_have_no_source() {
        assert!(error::Error::source(&Exception::RequestIsNotUtf8).is_none());
        assert_eq!(
            Exception::UnsupportedHttpVersion.to_string(),
            "Unsupported HTTP version"
        );
    }
}
