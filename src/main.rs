// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求输入内省服务
//!
//! 基于 Tokio 运行时的多线程服务器，用于直观地观察输入访问器看到的内容：
//! - 每个连接读取并解析一个 HTTP 请求，补充客户端地址等服务器变量
//! - 为该请求建立独立的作用域，并通过 `InputAccessor` 读取全部集合
//! - 客户端期望 JSON 时返回 JSON 快照，否则返回 HTML 表格页面
//! - 收到 Ctrl-C 后停止接收新连接

use std::{
    error::Error,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Instant,
};

use chrono::Utc;
use log::{debug, error, info, warn};
use serde_json::{json, Map, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    runtime::Builder,
};

use webinput::{
    BagKind, Config, Exception, HtmlBuilder, InputAccessor, RequestScope, Response, ServerRequest,
};

const CONFIG_PATH: &str = "config/development.toml";

/// # 程序入口点
///
/// 加载配置、初始化日志、按配置构建异步运行时并启动监听循环。
fn main() -> Result<(), Box<dyn Error>> {
    // 配置先于日志加载，以便从配置中取得日志配置路径；读取失败的原因在日志就绪后补记
    let (config, config_error) = match Config::from_toml(CONFIG_PATH) {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };

    log4rs::init_file(config.log_config(), Default::default())?;
    match config_error {
        Some(e) => warn!("无法读取配置文件{}：{}，使用默认配置", CONFIG_PATH, e),
        None => info!("配置文件已载入"),
    }

    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;
    info!("工作线程数：{}", config.worker_threads());

    runtime.block_on(serve(Arc::new(config)))?;
    Ok(())
}

/// # 监听循环
///
/// 持续接收新连接并分发至 Tokio 线程池，直到收到停机信号。
async fn serve(config: Arc<Config>) -> io::Result<()> {
    let address = match config.local() {
        true => Ipv4Addr::LOCALHOST,
        false => Ipv4Addr::UNSPECIFIED,
    };
    let socket = SocketAddrV4::new(address, config.port());
    let listener = TcpListener::bind(socket).await?;
    info!("服务端将在{}上监听Socket连接", socket);

    let mut id: u128 = 0;
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!("[ID{}]新的连接：{}", id, peer);
                        let config = Arc::clone(&config);
                        tokio::spawn(async move {
                            handle_connection(stream, peer, id, config).await;
                        });
                        id += 1;
                    }
                    Err(e) => error!("接受连接失败：{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
        }
    }
    Ok(())
}

/// # 连接处理器
///
/// 读取并解析请求，为其建立作用域，构建并发送响应。
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, id: u128, config: Arc<Config>) {
    let mut buffer = vec![0; config.buffer_size()];
    let n = match stream.read(&mut buffer).await {
        Ok(0) => return, // 客户端主动关闭连接
        Ok(n) => n,
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };
    let start_time = Instant::now();

    let response = match ServerRequest::try_from(&buffer[..n], id) {
        Ok(request) => {
            let request = request
                .with_server_param("REMOTE_ADDR", Value::String(peer.ip().to_string()))
                .with_server_param("REMOTE_PORT", json!(peer.port()))
                .with_server_param("REQUEST_TIME", json!(Utc::now().timestamp()));
            let input = InputAccessor::new(Arc::new(RequestScope::with_request(request)));
            match respond(&input) {
                Ok(response) => {
                    info!(
                        "[ID{}] {}, {}, {}, {}",
                        id,
                        input.method().unwrap_or_default(),
                        input.path().unwrap_or_default(),
                        response.status_code(),
                        input.header("User-Agent").ok().flatten().unwrap_or_default(),
                    );
                    response
                }
                Err(e) => {
                    error!("[ID{}]读取请求输入时发生异常: {}", id, e);
                    Response::response_500()
                }
            }
        }
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}，返回400", id, e);
            Response::response_400()
        }
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    let response_bytes = response.as_bytes();
    if let Err(e) = stream.write_all(&response_bytes).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}

/// 按客户端期望的格式输出访问器看到的请求快照。
fn respond(input: &InputAccessor) -> Result<Response, Exception> {
    let mut bags = Map::new();
    for kind in BagKind::ALL {
        bags.insert(kind.name().to_string(), input.bag(kind.name())?.to_json());
    }

    let path = input.path()?;
    let method = input.method()?;
    let secure = input.is_secure()?;
    let ajax = input.is_ajax()?;
    let remote_address = input.remote_address()?;

    if input.is_json_expected()? {
        let snapshot = json!({
            "path": path,
            "method": method,
            "secure": secure,
            "ajax": ajax,
            "remote_address": remote_address,
            "bags": bags,
        });
        return Ok(Response::json(&snapshot, 200));
    }

    let summary = [
        ("method", method),
        ("secure", secure.to_string()),
        ("ajax", ajax.to_string()),
        ("remote_address", remote_address.unwrap_or_else(|| "null".to_string())),
    ];
    let html = HtmlBuilder::from_snapshot(&path, &summary, &bags).build();
    Ok(Response::html(&html, 200))
}
