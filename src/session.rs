//! HTTP session shared by the login flow and the page extractors.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, redirect};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::jar::CookieJar;

pub const LOTO_URL: &str = "https://www.loto.ro";
pub const BILETE_URL: &str = "https://bilete.loto.ro";

const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,ro-RO;q=0.8,ro;q=0.7";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    /// Hand 3xx responses back to the caller.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    PostForm(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub method: Method,
    pub url: String,
    pub redirects: Redirects,
    pub referer: Option<String>,
}

impl PageRequest {
    pub fn get(url: impl Into<String>) -> Self {
        PageRequest {
            method: Method::Get,
            url: url.into(),
            redirects: Redirects::Follow,
            referer: None,
        }
    }

    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PageRequest {
            method: Method::PostForm(fields),
            ..PageRequest::get(url)
        }
    }

    pub fn without_redirects(mut self) -> Self {
        self.redirects = Redirects::Manual;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    fn method_name(&self) -> &'static str {
        match self.method {
            Method::Get => "GET",
            Method::PostForm(_) => "POST",
        }
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Sends one request, one attempt, and reads the whole body.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: PageRequest) -> Result<Page>;
}

pub struct SessionManager {
    follow: reqwest::Client,
    manual: reqwest::Client,
    jar: Arc<CookieJar>,
}

impl SessionManager {
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_jar(user_agent, Arc::new(CookieJar::new()))
    }

    /// Both clients share `jar`, so cookies set while following redirects
    /// are visible to manual-redirect requests and vice versa.
    pub fn with_jar(user_agent: &str, jar: Arc<CookieJar>) -> Result<Self> {
        let build = |policy: redirect::Policy| {
            reqwest::Client::builder()
                .user_agent(user_agent)
                .default_headers(browser_headers())
                .cookie_provider(Arc::clone(&jar))
                .redirect(policy)
                .build()
        };

        Ok(SessionManager {
            follow: build(redirect::Policy::default())?,
            manual: build(redirect::Policy::none())?,
            jar,
        })
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

impl Transport for SessionManager {
    async fn send(&self, request: PageRequest) -> Result<Page> {
        let client = match request.redirects {
            Redirects::Follow => &self.follow,
            Redirects::Manual => &self.manual,
        };

        let mut builder = match &request.method {
            Method::Get => client.get(&request.url),
            Method::PostForm(fields) => client.post(&request.url).form(fields),
        };
        if let Some(referer) = &request.referer {
            builder = builder.header(header::REFERER, referer);
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!(method = request.method_name(), url = %request.url, %status, "response");

        // loto.ro answers 410 to clients outside Romania
        if status == StatusCode::GONE {
            return Err(Error::BlockedRegion);
        }

        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page { url, status, body })
    }
}
