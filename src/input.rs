// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 输入访问器
//!
//! [`InputAccessor`] 通过 [`ScopeProvider`] 解析“当前请求”，并以强类型集合的形式
//! 暴露查询参数、正文、Cookie、上传文件、请求头、服务器变量与路由属性。
//!
//! ## 缓存模型
//! - 每个集合在首次访问时构建，之后返回同一个 `Arc`，直到绑定的请求发生变化。
//! - 缓存记录构建时请求的代数。一旦作用域返回不同的代数，全部集合在同一临界区内一起丢弃，
//!   不存在“部分集合仍指向旧请求”的中间状态。
//! - 克隆出的访问器拥有空缓存，独立地重新解析。
//!
//! ```
//! use std::sync::Arc;
//! use webinput::{InputAccessor, RequestScope, ServerRequest};
//!
//! let scope = Arc::new(RequestScope::new());
//! let input = InputAccessor::new(scope.clone());
//! assert!(input.path().is_err());
//!
//! scope.bind(ServerRequest::new("put", "http://domain.com/hello?id=7"));
//! assert_eq!(input.path().unwrap(), "/hello");
//! assert_eq!(input.method().unwrap(), "PUT");
//! assert_eq!(input.query().unwrap().get_str("id"), Some("7"));
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, warn};
use serde_json::Value;

use crate::{
    bag::{Bag, BagKind, FilesBag, HeadersBag, InputBag, ServerBag},
    exception::{Exception, ScopeError},
    param::*,
    request::ServerRequest,
    scope::ScopeProvider,
    uri::Uri,
};

/// 与某一代请求绑定的集合缓存。
#[derive(Default)]
struct BagCache {
    generation: Option<u64>,
    query: Option<Arc<InputBag>>,
    data: Option<Arc<InputBag>>,
    cookies: Option<Arc<InputBag>>,
    attributes: Option<Arc<InputBag>>,
    files: Option<Arc<FilesBag>>,
    headers: Option<Arc<HeadersBag>>,
    server: Option<Arc<ServerBag>>,
}

impl BagCache {
    fn for_generation(generation: u64) -> Self {
        Self {
            generation: Some(generation),
            ..Self::default()
        }
    }
}

fn memoized<T>(slot: &mut Option<Arc<T>>, build: impl FnOnce() -> T) -> Arc<T> {
    Arc::clone(slot.get_or_insert_with(|| Arc::new(build())))
}

pub struct InputAccessor {
    provider: Arc<dyn ScopeProvider>,
    /// 点号路径前缀，作用于 query / data / cookies / attributes
    prefix: String,
    cache: Mutex<BagCache>,
}

impl InputAccessor {
    pub fn new(provider: Arc<dyn ScopeProvider>) -> Self {
        Self {
            provider,
            prefix: String::new(),
            cache: Mutex::new(BagCache::default()),
        }
    }

    /// 返回一个以 `prefix` 为根的新访问器，前缀可以叠加。
    ///
    /// `input.with_prefix("user").data()?.get("name")` 读取正文中的 `user.name`。
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let prefix = match (self.prefix.is_empty(), prefix.is_empty()) {
            (_, true) => self.prefix.clone(),
            (true, false) => prefix.to_string(),
            (false, false) => format!("{}.{}", self.prefix, prefix),
        };
        Self {
            prefix,
            ..self.clone()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 当前活动请求。
    pub fn request(&self) -> Result<Arc<ServerRequest>, ScopeError> {
        self.synced().map(|(_, request)| request)
    }

    pub fn uri(&self) -> Result<Uri, ScopeError> {
        Ok(self.request()?.uri().clone())
    }

    /// 规范化后的请求路径，总是以 `/` 开头；空路径与仅含 host 的 URI 得到 `/`。
    pub fn path(&self) -> Result<String, ScopeError> {
        let request = self.request()?;
        let path = request.uri().path();
        Ok(if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        })
    }

    /// 大写的请求方法。
    pub fn method(&self) -> Result<String, ScopeError> {
        Ok(self.request()?.method().to_uppercase())
    }

    pub fn is_secure(&self) -> Result<bool, ScopeError> {
        Ok(self
            .request()?
            .uri()
            .scheme()
            .eq_ignore_ascii_case(SECURE_SCHEME))
    }

    /// `X-Requested-With: XMLHttpRequest`，名称与取值均不区分大小写。
    pub fn is_ajax(&self) -> Result<bool, ScopeError> {
        Ok(self
            .headers()?
            .get(AJAX_HEADER)
            .map_or(false, |value| value.trim().eq_ignore_ascii_case(AJAX_MARKER)))
    }

    /// `Accept` 中任一可接受（`q` 不为 0）的媒体范围为 JSON 类型时为真。
    pub fn is_json_expected(&self) -> Result<bool, ScopeError> {
        Ok(self.headers()?.get(ACCEPT_HEADER).map_or(false, |accept| {
            accept.split(',').any(|range| {
                let mut parts = range.split(';');
                let media_type = parts.next().unwrap_or("").trim();
                JSON_MEDIA_TYPE.is_match(media_type) && !parts.any(is_zero_quality)
            })
        }))
    }

    /// 客户端地址；服务器变量缺失或为 `null` 时返回 `None`，不会退化为空串。
    pub fn remote_address(&self) -> Result<Option<String>, ScopeError> {
        Ok(self.server()?.get_string(REMOTE_ADDR))
    }

    pub fn query(&self) -> Result<Arc<InputBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.query, || {
            InputBag::with_prefix(request.query_params(), &self.prefix)
        }))
    }

    /// 解析后的正文字段。
    pub fn data(&self) -> Result<Arc<InputBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.data, || {
            InputBag::with_prefix(request.parsed_body(), &self.prefix)
        }))
    }

    pub fn cookies(&self) -> Result<Arc<InputBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.cookies, || {
            InputBag::with_prefix(request.cookies(), &self.prefix)
        }))
    }

    pub fn attributes(&self) -> Result<Arc<InputBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.attributes, || {
            InputBag::with_prefix(request.attributes(), &self.prefix)
        }))
    }

    pub fn files(&self) -> Result<Arc<FilesBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.files, || {
            FilesBag::new(request.uploaded_files().to_vec())
        }))
    }

    pub fn headers(&self) -> Result<Arc<HeadersBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.headers, || {
            HeadersBag::new(
                request
                    .headers()
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            )
        }))
    }

    pub fn server(&self) -> Result<Arc<ServerBag>, ScopeError> {
        let (mut cache, request) = self.synced()?;
        Ok(memoized(&mut cache.server, || {
            ServerBag::new(request.server_params().clone())
        }))
    }

    /// 按名称取集合。名称在解析作用域之前校验，未知名称直接返回 [`Exception::Input`]。
    pub fn bag(&self, name: &str) -> Result<Bag, Exception> {
        let kind = BagKind::from_name(name)?;
        Ok(self.bag_of(kind)?)
    }

    pub fn bag_of(&self, kind: BagKind) -> Result<Bag, ScopeError> {
        Ok(match kind {
            BagKind::Query => Bag::Input(self.query()?),
            BagKind::Data => Bag::Input(self.data()?),
            BagKind::Cookies => Bag::Input(self.cookies()?),
            BagKind::Attributes => Bag::Input(self.attributes()?),
            BagKind::Files => Bag::Files(self.files()?),
            BagKind::Headers => Bag::Headers(self.headers()?),
            BagKind::Server => Bag::Server(self.server()?),
        })
    }

    pub fn header(&self, name: &str) -> Result<Option<String>, ScopeError> {
        Ok(self.headers()?.get(name))
    }

    pub fn cookie(&self, name: &str) -> Result<Option<Value>, ScopeError> {
        Ok(self.cookies()?.get(name).cloned())
    }

    pub fn query_value(&self, name: &str) -> Result<Option<Value>, ScopeError> {
        Ok(self.query()?.get(name).cloned())
    }

    pub fn data_value(&self, name: &str) -> Result<Option<Value>, ScopeError> {
        Ok(self.data()?.get(name).cloned())
    }

    /// 先查正文，再查查询参数。
    pub fn input(&self, name: &str) -> Result<Option<Value>, ScopeError> {
        match self.data_value(name)? {
            Some(value) => Ok(Some(value)),
            None => self.query_value(name),
        }
    }

    /// 在持有缓存锁的情况下解析作用域，必要时整体作废缓存。
    ///
    /// 解析与作废处于同一临界区，多个调用方共享同一访问器时也不会看到新旧混合的集合。
    fn synced(&self) -> Result<(MutexGuard<'_, BagCache>, Arc<ServerRequest>), ScopeError> {
        let mut cache = self.cache();
        let scoped = self.provider.resolve()?;
        if cache.generation != Some(scoped.generation()) {
            if cache.generation.is_some() {
                debug!(
                    "[ID{}]请求上下文已变化（代数{:?} -> {}），丢弃全部缓存集合",
                    scoped.request().id(),
                    cache.generation,
                    scoped.generation()
                );
            }
            *cache = BagCache::for_generation(scoped.generation());
        }
        Ok((cache, scoped.into_request()))
    }

    fn cache(&self) -> MutexGuard<'_, BagCache> {
        match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("输入缓存锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }
}

/// `q=0` 表示不可接受；无法解析的权重按默认值 1 处理。
fn is_zero_quality(param: &str) -> bool {
    match param.split_once('=') {
        Some((name, value)) if name.trim().eq_ignore_ascii_case("q") => {
            value.trim().parse::<f32>().map_or(false, |q| q == 0.0)
        }
        _ => false,
    }
}

impl Clone for InputAccessor {
    /// 克隆共享作用域提供者与前缀，但缓存为空。
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            prefix: self.prefix.clone(),
            cache: Mutex::new(BagCache::default()),
        }
    }
}

impl fmt::Debug for InputAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputAccessor")
            .field("prefix", &self.prefix)
            .field("generation", &self.cache().generation)
            .finish()
    }
}
