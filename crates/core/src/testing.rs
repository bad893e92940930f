//! Test doubles for the host seams.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::Error;
use crate::config::AppConfig;
use crate::network::Network;
use crate::push::{Notification, NotificationHost};
use crate::request::{Request, Response};

enum Reply {
    Respond(Response),
    Fail,
}

/// Scripted network: answers by URL, unknown URLs fail like an offline host.
pub struct FakeNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    log: Mutex<Vec<(String, String, Option<String>)>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self { replies: Mutex::new(HashMap::new()), log: Mutex::new(Vec::new()), calls: AtomicUsize::new(0), delay: None }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new() }
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Respond(response));
    }

    pub fn fail(&self, url: &str) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(method, url, body)` of every request, in order.
    pub fn requests(&self) -> Vec<(String, String, Option<String>)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push((
            request.method.clone(),
            request.url.to_string(),
            request.body.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()),
        ));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let replies = self.replies.lock().unwrap();
        match replies.get(request.url.as_str()) {
            Some(Reply::Respond(response)) => Ok(response.clone()),
            Some(Reply::Fail) | None => Err(Error::Network(format!("unreachable: {}", request.url))),
        }
    }
}

/// Notification host that records what it was asked to do.
#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notification>>,
    pub opened: Mutex<Vec<Url>>,
    pub closed: AtomicUsize,
    pub deny: bool,
}

impl RecordingNotifier {
    pub fn denying() -> Self {
        Self { deny: true, ..Default::default() }
    }
}

#[async_trait]
impl NotificationHost for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        if self.deny {
            return Err(Error::InvalidState("notification permission denied".into()));
        }
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(())
    }
}

/// Config rooted at `https://app.example` with a two-asset precache.
pub fn test_config() -> AppConfig {
    AppConfig {
        origin: "https://app.example".into(),
        cache_prefix: "fa".into(),
        precache: vec!["/".into(), "/manifest.json".into()],
        ..Default::default()
    }
}
