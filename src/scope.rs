// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求作用域模块
//!
//! 输入访问器不依赖任何全局容器来寻找“当前请求”，而是在构造时拿到一个
//! [`ScopeProvider`]，每次调用都经由它解析。
//!
//! [`RequestScope`] 是默认实现：
//! - `bind` 替换最内层作用域中的请求；
//! - `enter` 为子请求压入一层新的作用域，返回的 [`ScopeGuard`] 在析构时恢复外层请求。
//!
//! 每次绑定都会分配一个新的代数（generation），访问器据此以 O(1) 判断缓存是否过期。

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use log::{debug, warn};

use crate::{exception::ScopeError, request::ServerRequest};

/// 进程级单调递增的代数计数器，保证任意两次绑定的代数不同。
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// 作用域解析的结果：请求本身及其绑定时分配的代数。
#[derive(Debug, Clone)]
pub struct ScopedRequest {
    generation: u64,
    request: Arc<ServerRequest>,
}

impl ScopedRequest {
    pub fn new(generation: u64, request: Arc<ServerRequest>) -> Self {
        Self {
            generation,
            request,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &Arc<ServerRequest> {
        &self.request
    }

    pub fn into_request(self) -> Arc<ServerRequest> {
        self.request
    }
}

/// 提供“当前活动请求”的能力。
///
/// 实现必须保证：只要绑定的请求没有变化，返回的代数就保持不变；
/// 请求一旦被替换，代数必须随之改变。
pub trait ScopeProvider: Send + Sync {
    /// 解析当前请求；作用域中没有请求时返回 [`ScopeError::NoActiveRequest`]。
    fn resolve(&self) -> Result<ScopedRequest, ScopeError>;
}

/// 作用域栈中的一层。
///
/// `owner` 为创建该层的守卫标记；最外层由 `bind` 创建，没有所有者。
/// `slot` 为空表示该层中的请求已被 `unbind`，此时不会回落到外层请求。
#[derive(Debug)]
struct Frame {
    owner: Option<u64>,
    slot: Option<ScopedRequest>,
}

/// 基于栈的请求作用域。
///
/// 带所有者的层只能由对应的 [`ScopeGuard`] 移除；`bind` 与 `unbind` 只作用于最内层中的请求。
#[derive(Debug, Default)]
pub struct RequestScope {
    frames: Mutex<Vec<Frame>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建并立即绑定一个请求。
    pub fn with_request(request: ServerRequest) -> Self {
        let scope = Self::new();
        scope.bind(request);
        scope
    }

    /// 替换最内层作用域中的请求，作用域为空时创建第一层。返回新分配的代数。
    pub fn bind(&self, request: ServerRequest) -> u64 {
        self.bind_shared(Arc::new(request))
    }

    pub fn bind_shared(&self, request: Arc<ServerRequest>) -> u64 {
        let generation = next_generation();
        debug!("[ID{}]绑定请求，代数{}", request.id(), generation);
        let mut frames = self.frames();
        let scoped = ScopedRequest::new(generation, request);
        match frames.last_mut() {
            Some(top) => top.slot = Some(scoped),
            None => frames.push(Frame {
                owner: None,
                slot: Some(scoped),
            }),
        }
        generation
    }

    /// 进入嵌套作用域（子请求）。守卫析构时移除它自己压入的那一层，
    /// 与其它守卫的析构顺序无关。
    pub fn enter(&self, request: ServerRequest) -> ScopeGuard<'_> {
        let generation = next_generation();
        debug!("[ID{}]进入嵌套作用域，代数{}", request.id(), generation);
        self.frames().push(Frame {
            owner: Some(generation),
            slot: Some(ScopedRequest::new(generation, Arc::new(request))),
        });
        ScopeGuard {
            scope: self,
            token: generation,
        }
    }

    /// 取出最内层作用域中的请求。
    ///
    /// 最外层随之移除；嵌套层保留为空层，直到其守卫析构。
    pub fn unbind(&self) -> Option<Arc<ServerRequest>> {
        let mut frames = self.frames();
        let top = frames.last_mut()?;
        let scoped = top.slot.take();
        if top.owner.is_none() {
            frames.pop();
        }
        scoped.map(ScopedRequest::into_request)
    }

    pub fn is_bound(&self) -> bool {
        self.frames()
            .last()
            .map_or(false, |frame| frame.slot.is_some())
    }

    pub fn depth(&self) -> usize {
        self.frames().len()
    }

    fn frames(&self) -> MutexGuard<'_, Vec<Frame>> {
        match self.frames.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("作用域锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }
}

impl ScopeProvider for RequestScope {
    fn resolve(&self) -> Result<ScopedRequest, ScopeError> {
        self.frames()
            .last()
            .and_then(|frame| frame.slot.clone())
            .ok_or(ScopeError::NoActiveRequest)
    }
}

/// 嵌套作用域守卫。
#[must_use = "dropping the guard immediately leaves the nested scope"]
pub struct ScopeGuard<'a> {
    scope: &'a RequestScope,
    token: u64,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        let mut frames = self.scope.frames();
        frames.retain(|frame| frame.owner != Some(self.token));
        debug!("离开嵌套作用域，剩余{}层", frames.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_fails() {
        let scope = RequestScope::new();
        assert_eq!(scope.resolve().unwrap_err(), ScopeError::NoActiveRequest);
        assert!(!scope.is_bound());
    }

    #[test]
    fn test_resolve_is_stable_until_rebind() {
        let scope = RequestScope::with_request(ServerRequest::new("GET", "/hello"));
        let first = scope.resolve().unwrap();
        let second = scope.resolve().unwrap();
        assert_eq!(first.generation(), second.generation());
        assert!(Arc::ptr_eq(first.request(), second.request()));

        scope.bind(ServerRequest::new("GET", "/other"));
        let third = scope.resolve().unwrap();
        assert_ne!(first.generation(), third.generation());
        assert_eq!(third.request().uri().path(), "/other");
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_rebinding_equal_request_changes_generation() {
        let scope = RequestScope::with_request(ServerRequest::default());
        let before = scope.resolve().unwrap().generation();
        scope.bind(ServerRequest::default());
        assert_ne!(before, scope.resolve().unwrap().generation());
    }

    #[test]
    fn test_nested_scope_restores_outer() {
        let scope = RequestScope::with_request(ServerRequest::new("GET", "/outer"));
        let outer = scope.resolve().unwrap().generation();
        {
            let _guard = scope.enter(ServerRequest::new("GET", "/inner"));
            assert_eq!(scope.depth(), 2);
            assert_eq!(scope.resolve().unwrap().request().uri().path(), "/inner");

            // 嵌套作用域内的 bind 只替换内层
            scope.bind(ServerRequest::new("GET", "/inner-2"));
            assert_eq!(scope.resolve().unwrap().request().uri().path(), "/inner-2");
        }
        let restored = scope.resolve().unwrap();
        assert_eq!(restored.generation(), outer);
        assert_eq!(restored.request().uri().path(), "/outer");
    }

    #[test]
    fn test_enter_on_empty_scope() {
        let scope = RequestScope::new();
        {
            let _guard = scope.enter(ServerRequest::default());
            assert!(scope.is_bound());
        }
        assert!(!scope.is_bound());
    }

    #[test]
    fn test_unbind() {
        let scope = RequestScope::with_request(ServerRequest::new("POST", "/x"));
        let request = scope.unbind().unwrap();
        assert_eq!(request.method(), "POST");
        assert!(scope.unbind().is_none());
        assert!(scope.resolve().is_err());
    }

    #[test]
    fn test_guards_dropped_out_of_order() {
        let scope = RequestScope::with_request(ServerRequest::new("GET", "/outer"));
        let first = scope.enter(ServerRequest::new("GET", "/a"));
        let second = scope.enter(ServerRequest::new("GET", "/b"));

        // 外层守卫先析构时，仍存活的内层子请求保持可见
        drop(first);
        assert_eq!(scope.depth(), 2);
        assert_eq!(scope.resolve().unwrap().request().uri().path(), "/b");

        drop(second);
        assert_eq!(scope.depth(), 1);
        assert_eq!(scope.resolve().unwrap().request().uri().path(), "/outer");
    }

    #[test]
    fn test_unbind_and_bind_inside_nested_scope_keep_outer() {
        let scope = RequestScope::with_request(ServerRequest::new("GET", "/outer"));
        let outer = scope.resolve().unwrap().generation();
        {
            let _guard = scope.enter(ServerRequest::new("GET", "/inner"));
            let inner = scope.unbind().unwrap();
            assert_eq!(inner.uri().path(), "/inner");

            // 清空的内层不会回落到外层请求
            assert_eq!(scope.depth(), 2);
            assert!(!scope.is_bound());
            assert_eq!(scope.resolve().unwrap_err(), ScopeError::NoActiveRequest);

            scope.bind(ServerRequest::new("GET", "/replacement"));
            assert_eq!(scope.resolve().unwrap().request().uri().path(), "/replacement");
        }
        let restored = scope.resolve().unwrap();
        assert_eq!(scope.depth(), 1);
        assert_eq!(restored.generation(), outer);
        assert_eq!(restored.request().uri().path(), "/outer");
    }
}
