//! Scripted transport for protocol tests.

use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::session::{Method, Page, PageRequest, Transport};

#[derive(Debug, Clone)]
pub enum Reply {
    Page(StatusCode, String),
    ConnectionReset,
    Blocked,
}

/// Answers requests by exact URL (and method). Each route holds a queue of
/// replies; the last one repeats once the queue is down to it.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(bool, String), VecDeque<Reply>>>,
    sent: Mutex<Vec<PageRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(self, url: &str, reply: Reply) -> Self {
        self.push(false, url, reply)
    }

    pub fn on_post(self, url: &str, reply: Reply) -> Self {
        self.push(true, url, reply)
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.on_get(url, Reply::Page(StatusCode::OK, body.to_string()))
    }

    fn push(self, post: bool, url: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry((post, url.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn sent(&self) -> Vec<PageRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.sent().iter().filter(|r| r.url == url).count()
    }

    pub fn posts(&self) -> Vec<PageRequest> {
        self.sent()
            .into_iter()
            .filter(|r| matches!(r.method, Method::PostForm(_)))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: PageRequest) -> Result<Page> {
        self.sent.lock().unwrap().push(request.clone());

        let key = (matches!(request.method, Method::PostForm(_)), request.url.clone());
        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Page(status, body)) => Ok(Page {
                url: request.url,
                status,
                body,
            }),
            Some(Reply::Blocked) => Err(Error::BlockedRegion),
            Some(Reply::ConnectionReset) | None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                format!("no route for {}", request.url),
            ))),
        }
    }
}
