//! Helpers shared by unit tests: a canned-response HTTP server and serialised
//! access to the process environment.

use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Variables read by the config loader
const ISOLATED_VARS: &[&str] = &["XDG_CONFIG_HOME", "DRIVENAV_ACCESS_TOKEN"];

static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Local HTTP server answering every request with the same raw response
pub(crate) struct StubServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub(crate) async fn start(response: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    read_request_head(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        Self {
            url: format!("http://{}", addr),
            hits,
        }
    }

    /// Requests answered so far
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                head.extend_from_slice(&buf[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    return;
                }
            }
        }
    }
}

/// Run `f` with `XDG_CONFIG_HOME` pointed at `config_home` and the token
/// shortcut unset, holding the environment lock throughout
pub(crate) fn with_xdg_env<T>(config_home: &Path, f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK.lock();
    let saved: Vec<(&str, Option<OsString>)> = ISOLATED_VARS
        .iter()
        .map(|name| (*name, std::env::var_os(name)))
        .collect();
    std::env::remove_var("DRIVENAV_ACCESS_TOKEN");
    std::env::set_var("XDG_CONFIG_HOME", config_home);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }
    result.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
