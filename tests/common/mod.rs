#![allow(dead_code)]

pub mod test_server {
    use adoption_status::config::{AppConfig, StoreBackend};
    use adoption_status::model::NewAdoptionStatus;
    use adoption_status::server::ServerHandle;
    use adoption_status::store::{MemoryStatusStore, StatusStore};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::{Arc, Once};

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x40000);
        });
    }

    /// Reserve an ephemeral port on localhost.
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    /// Running service on an ephemeral port; stopped on drop.
    pub struct TestServer {
        handle: Option<ServerHandle>,
        pub addr: SocketAddr,
        pub store: Arc<dyn StatusStore>,
    }

    impl TestServer {
        /// Serve over an in-memory store holding `seed`.
        pub fn start(seed: Vec<NewAdoptionStatus>) -> Self {
            let store: Arc<dyn StatusStore> = Arc::new(MemoryStatusStore::new());
            for record in seed {
                store.insert(record).unwrap();
            }
            Self::with_store(store, AppConfig::default())
        }

        pub fn with_store(store: Arc<dyn StatusStore>, mut config: AppConfig) -> Self {
            setup_may_runtime();
            let addr = free_addr();
            config.http.addr = addr.to_string();
            config.store.backend = StoreBackend::Memory;
            let handle = adoption_status::app::serve(&config, &store).unwrap();
            handle.wait_ready().unwrap();
            Self {
                handle: Some(handle),
                addr,
                store,
            }
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Parsed HTTP/1.1 response.
    #[derive(Debug)]
    pub struct TestResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl TestResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body)
                .unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", self.body))
        }
    }

    /// Send a raw request and read one response, using `Content-Length` to
    /// find its end.
    pub fn send_request(addr: &SocketAddr, req: &str) -> TestResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(req.as_bytes()).unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(resp) = try_parse(&buf) {
                return resp;
            }
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) => panic!("read failed: {e}; received so far: {}", String::from_utf8_lossy(&buf)),
            }
        }
        try_parse(&buf).unwrap_or_else(|| {
            panic!("incomplete response: {}", String::from_utf8_lossy(&buf))
        })
    }

    fn try_parse(buf: &[u8]) -> Option<TestResponse> {
        let text = std::str::from_utf8(buf).ok()?;
        let (head, rest) = text.split_once("\r\n\r\n")?;
        let mut lines = head.lines();
        let status = lines.next()?.split_whitespace().nth(1)?.parse().ok()?;
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        let length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        if rest.len() < length {
            return None;
        }
        Some(TestResponse {
            status,
            headers,
            body: rest[..length].to_string(),
        })
    }

    pub fn get(addr: &SocketAddr, path: &str) -> TestResponse {
        send_request(
            addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        )
    }

    pub fn put_json(addr: &SocketAddr, path: &str, body: &str) -> TestResponse {
        send_request(
            addr,
            &format!(
                "PUT {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            ),
        )
    }
}
