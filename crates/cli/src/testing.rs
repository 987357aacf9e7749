//! In-memory fakes for the browser and launcher seams.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use scm::{ConsoleMessage, ConsoleSubscription, TargetKind, TaskFailure, TaskMonitor};
use tokio::sync::{broadcast, oneshot};

use crate::browser::{BrowserLike, ConsoleHandler, Connector, PageLike, TargetLike};
use crate::error::{BridgeError, Result};
use crate::launcher::Launcher;

struct Listener {
	handler: Arc<ConsoleHandler>,
	cancel_rx: oneshot::Receiver<()>,
}

impl Listener {
	fn is_cancelled(&mut self) -> bool {
		!matches!(self.cancel_rx.try_recv(), Err(oneshot::error::TryRecvError::Empty))
	}
}

/// Page that records navigations and delivers console messages on demand.
pub struct MockPage {
	listeners: Mutex<Vec<Listener>>,
	url: Mutex<String>,
	title: Mutex<String>,
	navigations: Mutex<Vec<String>>,
	failure: Mutex<Option<BridgeError>>,
	live: AtomicBool,
}

impl MockPage {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			listeners: Mutex::new(Vec::new()),
			url: Mutex::new("about:blank".to_string()),
			title: Mutex::new(String::new()),
			navigations: Mutex::new(Vec::new()),
			failure: Mutex::new(None),
			live: AtomicBool::new(true),
		})
	}

	/// Marks the page as attached over a connection that went away.
	pub fn kill(&self) {
		self.live.store(false, Ordering::SeqCst);
	}

	/// Feeds `message` to every live console handler.
	pub fn emit(&self, message: ConsoleMessage) {
		let handlers: Vec<_> = {
			let mut listeners = self.listeners.lock();
			listeners.retain_mut(|listener| !listener.is_cancelled());
			listeners.iter().map(|listener| Arc::clone(&listener.handler)).collect()
		};
		for handler in handlers {
			handler(message.clone());
		}
	}

	pub fn listener_count(&self) -> usize {
		let mut listeners = self.listeners.lock();
		listeners.retain_mut(|listener| !listener.is_cancelled());
		listeners.len()
	}

	pub fn set_title(&self, title: &str) {
		*self.title.lock() = title.to_string();
	}

	pub fn set_url(&self, url: &str) {
		*self.url.lock() = url.to_string();
	}

	/// Makes the next navigation fail with `err`.
	pub fn fail_next_navigation(&self, err: BridgeError) {
		*self.failure.lock() = Some(err);
	}

	/// URLs passed to `goto`, with `reload` recorded as `"reload"`.
	pub fn navigations(&self) -> Vec<String> {
		self.navigations.lock().clone()
	}

	fn navigate(&self, entry: &str) -> Result<()> {
		self.navigations.lock().push(entry.to_string());
		match self.failure.lock().take() {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl PageLike for MockPage {
	fn is_live(&self) -> bool {
		self.live.load(Ordering::SeqCst)
	}

	fn on_console(&self, handler: ConsoleHandler) -> ConsoleSubscription {
		let (cancel_tx, cancel_rx) = oneshot::channel();
		self.listeners.lock().push(Listener {
			handler: Arc::new(handler),
			cancel_rx,
		});
		ConsoleSubscription::new(cancel_tx)
	}

	async fn goto(&self, url: &str) -> Result<()> {
		self.navigate(url)?;
		self.set_url(url);
		Ok(())
	}

	async fn reload(&self) -> Result<()> {
		self.navigate("reload")
	}

	async fn title(&self) -> Result<String> {
		Ok(self.title.lock().clone())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.url.lock().clone())
	}
}

/// Target with a fixed kind and an optional page.
pub struct MockTarget {
	id: String,
	kind: TargetKind,
	url: Mutex<String>,
	internal_id: Mutex<Option<String>>,
	page: Mutex<Option<Arc<MockPage>>>,
	page_requests: AtomicUsize,
}

impl MockTarget {
	/// Page target. An empty `id` means the client exposes no identity.
	pub fn page(id: &str, url: &str) -> Arc<Self> {
		Self::new(id, TargetKind::Page, url)
	}

	/// Target of `kind`; only page-bearing kinds get a page.
	pub fn new(id: &str, kind: TargetKind, url: &str) -> Arc<Self> {
		let page = kind.has_page().then(|| {
			let page = MockPage::new();
			page.set_url(url);
			page
		});
		Arc::new(Self {
			id: id.to_string(),
			kind,
			url: Mutex::new(url.to_string()),
			internal_id: Mutex::new(None),
			page: Mutex::new(page),
			page_requests: AtomicUsize::new(0),
		})
	}

	pub fn with_internal_id(self: Arc<Self>, id: &str) -> Arc<Self> {
		*self.internal_id.lock() = Some(id.to_string());
		self
	}

	pub fn set_url(&self, url: &str) {
		*self.url.lock() = url.to_string();
	}

	/// The page handed out by `page()`.
	pub fn mock_page(&self) -> Option<Arc<MockPage>> {
		self.page.lock().clone()
	}

	/// Kills the current page and hands out a fresh one from now on, as a
	/// reattach after a reconnect would.
	pub fn reattach(&self) -> Arc<MockPage> {
		let fresh = MockPage::new();
		fresh.set_url(&self.url.lock());
		if let Some(old) = self.page.lock().replace(Arc::clone(&fresh)) {
			old.kill();
		}
		fresh
	}

	/// How many times `page()` was called.
	pub fn page_requests(&self) -> usize {
		self.page_requests.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl TargetLike for MockTarget {
	fn kind(&self) -> TargetKind {
		self.kind
	}

	fn url(&self) -> String {
		self.url.lock().clone()
	}

	fn id(&self) -> Option<String> {
		Some(self.id.clone()).filter(|id| !id.is_empty())
	}

	fn internal_id(&self) -> Option<String> {
		self.internal_id.lock().clone()
	}

	async fn page(&self) -> Result<Option<Arc<dyn PageLike>>> {
		self.page_requests.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(Duration::from_millis(5)).await;
		Ok(self.mock_page().map(|page| page as Arc<dyn PageLike>))
	}
}

/// Browser holding a fixed target list.
pub struct MockBrowser {
	targets: Vec<Arc<MockTarget>>,
	connected: AtomicBool,
	disconnects: AtomicUsize,
	monitor: TaskMonitor,
}

impl MockBrowser {
	pub fn new(targets: Vec<Arc<MockTarget>>) -> Arc<Self> {
		Arc::new(Self {
			targets,
			connected: AtomicBool::new(true),
			disconnects: AtomicUsize::new(0),
			monitor: TaskMonitor::new(),
		})
	}

	/// Monitor whose failures [`BrowserLike::task_failures`] reports.
	pub fn monitor(&self) -> &TaskMonitor {
		&self.monitor
	}

	pub fn set_connected(&self, connected: bool) {
		self.connected.store(connected, Ordering::SeqCst);
	}

	pub fn disconnects(&self) -> usize {
		self.disconnects.load(Ordering::SeqCst)
	}
}

impl BrowserLike for MockBrowser {
	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	fn targets(&self) -> Vec<Arc<dyn TargetLike>> {
		self.targets.iter().map(|target| Arc::clone(target) as Arc<dyn TargetLike>).collect()
	}

	fn disconnect(&self) {
		self.disconnects.fetch_add(1, Ordering::SeqCst);
		self.connected.store(false, Ordering::SeqCst);
	}

	fn task_failures(&self) -> broadcast::Receiver<TaskFailure> {
		self.monitor.subscribe()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reachability {
	Always,
	AfterLaunch,
	Never,
}

/// Connector whose reachability is scripted.
pub struct MockConnector {
	browser: Option<Arc<MockBrowser>>,
	reachability: Reachability,
	launched: AtomicBool,
	delay: Duration,
	connects: AtomicUsize,
	endpoints: Mutex<Vec<String>>,
}

impl MockConnector {
	fn with(browser: Option<Arc<MockBrowser>>, reachability: Reachability) -> Self {
		Self {
			browser,
			reachability,
			launched: AtomicBool::new(false),
			delay: Duration::ZERO,
			connects: AtomicUsize::new(0),
			endpoints: Mutex::new(Vec::new()),
		}
	}

	pub fn reachable(browser: Arc<MockBrowser>) -> Self {
		Self::with(Some(browser), Reachability::Always)
	}

	/// Refuses connections until a [`MockLauncher`] bound to it has run.
	pub fn unreachable_until_launched(browser: Arc<MockBrowser>) -> Self {
		Self::with(Some(browser), Reachability::AfterLaunch)
	}

	pub fn never_reachable() -> Self {
		Self::with(None, Reachability::Never)
	}

	/// Delays every connect by `delay`.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn connects(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}

	pub fn endpoints(&self) -> Vec<String> {
		self.endpoints.lock().clone()
	}

	fn mark_launched(&self) {
		self.launched.store(true, Ordering::SeqCst);
	}
}

#[async_trait]
impl Connector for MockConnector {
	async fn connect(&self, endpoint: &str) -> Result<Arc<dyn BrowserLike>> {
		self.connects.fetch_add(1, Ordering::SeqCst);
		self.endpoints.lock().push(endpoint.to_string());
		if !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}

		let reachable = match self.reachability {
			Reachability::Always => true,
			Reachability::AfterLaunch => self.launched.load(Ordering::SeqCst),
			Reachability::Never => false,
		};
		match (&self.browser, reachable) {
			(Some(browser), true) => {
				browser.set_connected(true);
				Ok(Arc::clone(browser) as Arc<dyn BrowserLike>)
			}
			_ => Err(BridgeError::Connection(format!("connect ECONNREFUSED {endpoint}"))),
		}
	}
}

/// Launcher that counts launches and unlocks its connector.
pub struct MockLauncher {
	connector: Option<Arc<MockConnector>>,
	fails: bool,
	launches: AtomicUsize,
}

impl MockLauncher {
	pub fn new(connector: &Arc<MockConnector>) -> Self {
		Self {
			connector: Some(Arc::clone(connector)),
			fails: false,
			launches: AtomicUsize::new(0),
		}
	}

	pub fn failing() -> Self {
		Self {
			connector: None,
			fails: true,
			launches: AtomicUsize::new(0),
		}
	}

	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Launcher for MockLauncher {
	async fn launch(&self, _port: u16) -> Result<()> {
		self.launches.fetch_add(1, Ordering::SeqCst);
		if self.fails {
			return Err(BridgeError::Connection("spawn google-chrome-test ENOENT".to_string()));
		}
		if let Some(connector) = &self.connector {
			connector.mark_launched();
		}
		Ok(())
	}

	fn remedy_command(&self, port: u16) -> String {
		format!("google-chrome-test --remote-debugging-port={port}")
	}
}

/// Session over a reachable [`MockBrowser`] holding `targets`.
pub fn mock_session(targets: Vec<Arc<MockTarget>>) -> (Arc<crate::session::Session>, Arc<MockBrowser>) {
	let browser = MockBrowser::new(targets);
	let connector = Arc::new(MockConnector::reachable(Arc::clone(&browser)));
	let launcher = Arc::new(MockLauncher::new(&connector));
	let session = crate::session::Session::new(crate::config::BridgeConfig::default(), connector, launcher);
	(Arc::new(session), browser)
}
