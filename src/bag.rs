// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 输入集合（Bag）模块
//!
//! 每个集合都是某一类请求数据的只读、有序视图：
//! - [`InputBag`]：查询参数、表单/JSON 正文、Cookie、路由属性。键区分大小写，支持点号路径。
//! - [`HeadersBag`]：请求头。名称不区分大小写，一个名称可对应多个值。
//! - [`FilesBag`]：上传文件描述符。
//! - [`ServerBag`]：服务器/环境变量。查找时名称会被规范化为大写下划线形式。
//!
//! 集合从不被原地修改；请求变化时由访问器整体重建。

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde_json::{Map, Value};

use crate::{exception::InputError, request::UploadedFile};

/// 通用键值集合。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBag {
    data: Map<String, Value>,
}

impl InputBag {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// 以点号路径 `prefix` 处的嵌套对象为根构建集合。
    ///
    /// 前缀为空时等价于 [`InputBag::new`]；前缀不存在或指向非对象值时得到空集合。
    pub fn with_prefix(data: &Map<String, Value>, prefix: &str) -> Self {
        if prefix.is_empty() {
            return Self::new(data.clone());
        }
        match dot_get(data, prefix) {
            Some(Value::Object(nested)) => Self::new(nested.clone()),
            _ => Self::default(),
        }
    }

    /// 按名称取值。先精确匹配，找不到时再按点号路径（`user.name`、`items.0`）逐层查找。
    ///
    /// 返回 `None` 表示不存在；存在但为 `null` 时返回 `Some(Value::Null)`。
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name).or_else(|| dot_get(&self.data, name))
    }

    /// 仅当值为字符串时返回。
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.data.iter()
    }

    /// 取出 `keys` 指定的子集，顺序与 `keys` 一致。
    ///
    /// `fill` 为真时缺失的键以 `null` 补齐，否则直接跳过。
    pub fn fetch(&self, keys: &[&str], fill: bool) -> Map<String, Value> {
        let mut result = Map::new();
        for key in keys {
            match self.get(key) {
                Some(value) => {
                    result.insert(key.to_string(), value.clone());
                }
                None if fill => {
                    result.insert(key.to_string(), Value::Null);
                }
                None => {}
            }
        }
        result
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

fn dot_get<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 请求头集合，名称不区分大小写。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadersBag {
    /// (首次出现时的名称写法, 全部取值)，保持首次出现的顺序
    entries: Vec<(String, Vec<String>)>,
    /// 小写名称 -> entries 下标
    index: HashMap<String, usize>,
}

impl HeadersBag {
    pub fn new<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut bag = Self::default();
        for (name, value) in headers {
            let key = name.to_ascii_lowercase();
            match bag.index.get(&key) {
                Some(&i) => bag.entries[i].1.push(value.to_string()),
                None => {
                    bag.index.insert(key, bag.entries.len());
                    bag.entries.push((name.to_string(), vec![value.to_string()]));
                }
            }
        }
        bag
    }

    /// 以逗号拼接同名头的全部取值。
    pub fn get(&self, name: &str) -> Option<String> {
        self.values(name).map(|values| values.join(","))
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.values(name).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        self.values(name).is_some()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, values) in self.iter() {
            map.insert(name.to_string(), Value::String(values.join(",")));
        }
        Value::Object(map)
    }

    fn values(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| self.entries[i].1.as_slice())
    }
}

/// 上传文件集合。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilesBag {
    files: Vec<(String, UploadedFile)>,
}

impl FilesBag {
    pub fn new(files: Vec<(String, UploadedFile)>) -> Self {
        Self { files }
    }

    pub fn get(&self, name: &str) -> Option<&UploadedFile> {
        self.files
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, file)| file)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadedFile)> {
        self.files.iter().map(|(name, file)| (name.as_str(), file))
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, file) in self.iter() {
            map.insert(
                name.to_string(),
                serde_json::to_value(file).unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }
}

/// 服务器/环境变量集合。
///
/// `get("remote-addr")` 与 `get("REMOTE_ADDR")` 等价。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerBag {
    inner: InputBag,
}

impl ServerBag {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            inner: InputBag::new(data),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner
            .all()
            .get(name)
            .or_else(|| self.inner.all().get(&normalize_server_key(name)))
    }

    /// 存在且不为 `null` 时返回其文本形式；字符串原样返回，其余类型按 JSON 文本输出。
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn all(&self) -> &Map<String, Value> {
        self.inner.all()
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.inner.iter()
    }

    pub fn to_json(&self) -> Value {
        self.inner.to_json()
    }
}

fn normalize_server_key(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// 访问器可提供的全部集合种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BagKind {
    Query,
    Data,
    Cookies,
    Files,
    Headers,
    Server,
    Attributes,
}

impl BagKind {
    pub const ALL: [BagKind; 7] = [
        BagKind::Query,
        BagKind::Data,
        BagKind::Cookies,
        BagKind::Files,
        BagKind::Headers,
        BagKind::Server,
        BagKind::Attributes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BagKind::Query => "query",
            BagKind::Data => "data",
            BagKind::Cookies => "cookies",
            BagKind::Files => "files",
            BagKind::Headers => "headers",
            BagKind::Server => "server",
            BagKind::Attributes => "attributes",
        }
    }

    /// 名称区分大小写；未知名称属于调用方的编程错误。
    pub fn from_name(name: &str) -> Result<Self, InputError> {
        BagKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| InputError::UnknownBag(name.to_string()))
    }
}

impl FromStr for BagKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BagKind::from_name(s)
    }
}

impl fmt::Display for BagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 按名称动态取得的集合。
#[derive(Debug, Clone)]
pub enum Bag {
    Input(Arc<InputBag>),
    Files(Arc<FilesBag>),
    Headers(Arc<HeadersBag>),
    Server(Arc<ServerBag>),
}

impl Bag {
    pub fn as_input(&self) -> Option<&Arc<InputBag>> {
        match self {
            Bag::Input(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&Arc<FilesBag>> {
        match self {
            Bag::Files(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_headers(&self) -> Option<&Arc<HeadersBag>> {
        match self {
            Bag::Headers(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_server(&self) -> Option<&Arc<ServerBag>> {
        match self {
            Bag::Server(bag) => Some(bag),
            _ => None,
        }
    }

    /// 两者是否为同一个缓存实例。
    pub fn ptr_eq(&self, other: &Bag) -> bool {
        match (self, other) {
            (Bag::Input(a), Bag::Input(b)) => Arc::ptr_eq(a, b),
            (Bag::Files(a), Bag::Files(b)) => Arc::ptr_eq(a, b),
            (Bag::Headers(a), Bag::Headers(b)) => Arc::ptr_eq(a, b),
            (Bag::Server(a), Bag::Server(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Bag::Input(bag) => bag.to_json(),
            Bag::Files(bag) => bag.to_json(),
            Bag::Headers(bag) => bag.to_json(),
            Bag::Server(bag) => bag.to_json(),
        }
    }
}
