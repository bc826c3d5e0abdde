// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 使用 mockall 替身验证访问器与作用域提供者之间的约定。

use std::sync::Arc;

use mockall::{mock, Sequence};
use webinput::{
    Exception, InputAccessor, ScopeError, ScopeProvider, ScopedRequest, ServerRequest,
};

mock! {
    pub Provider {}

    impl ScopeProvider for Provider {
        fn resolve(&self) -> Result<ScopedRequest, ScopeError>;
    }
}

fn scoped(generation: u64, uri: &str) -> ScopedRequest {
    ScopedRequest::new(generation, Arc::new(ServerRequest::new("GET", uri)))
}

#[test]
fn test_every_call_goes_through_provider() {
    let request = scoped(1, "/a");
    let mut provider = MockProvider::new();
    provider
        .expect_resolve()
        .times(3)
        .returning(move || Ok(request.clone()));

    let input = InputAccessor::new(Arc::new(provider));
    input.path().unwrap();
    input.query().unwrap();
    input.query().unwrap();
}

#[test]
fn test_scope_error_is_propagated_without_retry() {
    let mut provider = MockProvider::new();
    provider
        .expect_resolve()
        .times(1)
        .returning(|| Err(ScopeError::NoActiveRequest));

    let input = InputAccessor::new(Arc::new(provider));
    assert_eq!(
        input.bag("headers").unwrap_err(),
        Exception::Scope(ScopeError::NoActiveRequest)
    );
}

#[test]
fn test_unknown_bag_never_touches_provider() {
    let mut provider = MockProvider::new();
    provider.expect_resolve().never();

    let input = InputAccessor::new(Arc::new(provider));
    assert!(matches!(input.bag("nope"), Err(Exception::Input(_))));
}

#[test]
fn test_generation_change_rebuilds_and_same_generation_reuses() {
    let mut seq = Sequence::new();
    let mut provider = MockProvider::new();
    let first = scoped(10, "/?v=1");
    let first_again = first.clone();
    let second = scoped(11, "/?v=2");
    provider
        .expect_resolve()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move || Ok(first.clone()));
    provider
        .expect_resolve()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move || Ok(first_again.clone()));
    provider
        .expect_resolve()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move || Ok(second.clone()));

    let input = InputAccessor::new(Arc::new(provider));
    let a = input.query().unwrap();
    let b = input.query().unwrap();
    let c = input.query().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&b, &c));
    assert_eq!(c.get_str("v"), Some("2"));
}

#[test]
fn test_failed_resolution_keeps_previous_cache() {
    let mut seq = Sequence::new();
    let mut provider = MockProvider::new();
    let request = scoped(5, "/?k=v");
    let request_again = request.clone();
    provider
        .expect_resolve()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move || Ok(request.clone()));
    provider
        .expect_resolve()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Err(ScopeError::NoActiveRequest));
    provider
        .expect_resolve()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move || Ok(request_again.clone()));

    let input = InputAccessor::new(Arc::new(provider));
    let before = input.query().unwrap();
    assert!(input.query().is_err());
    let after = input.query().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}
