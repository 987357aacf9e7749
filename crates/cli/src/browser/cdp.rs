//! [`scm`] implementations of the browser seams.

use std::sync::Arc;

use async_trait::async_trait;
use scm::{Browser, ConsoleSubscription, Page, Target, TargetKind, TaskFailure};
use tokio::sync::broadcast;

use super::{BrowserLike, ConsoleHandler, Connector, PageLike, TargetLike};
use crate::error::Result;

/// Connects over the DevTools WebSocket.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpConnector;

#[async_trait]
impl Connector for CdpConnector {
	async fn connect(&self, endpoint: &str) -> Result<Arc<dyn BrowserLike>> {
		let browser = Browser::connect(endpoint).await?;
		Ok(Arc::new(browser))
	}
}

impl BrowserLike for Browser {
	fn is_connected(&self) -> bool {
		Browser::is_connected(self)
	}

	fn targets(&self) -> Vec<Arc<dyn TargetLike>> {
		Browser::targets(self)
			.into_iter()
			.map(|target| Arc::new(target) as Arc<dyn TargetLike>)
			.collect()
	}

	fn disconnect(&self) {
		Browser::disconnect(self)
	}

	fn task_failures(&self) -> broadcast::Receiver<TaskFailure> {
		Browser::task_failures(self)
	}
}

#[async_trait]
impl TargetLike for Target {
	fn kind(&self) -> TargetKind {
		Target::kind(self)
	}

	fn url(&self) -> String {
		Target::url(self)
	}

	fn id(&self) -> Option<String> {
		Some(Target::id(self).to_string())
	}

	async fn page(&self) -> Result<Option<Arc<dyn PageLike>>> {
		let page = Target::page(self).await?;
		Ok(page.map(|page| Arc::new(page) as Arc<dyn PageLike>))
	}
}

#[async_trait]
impl PageLike for Page {
	fn is_live(&self) -> bool {
		Page::is_connected(self)
	}

	fn on_console(&self, handler: ConsoleHandler) -> ConsoleSubscription {
		Page::on_console(self, handler)
	}

	async fn goto(&self, url: &str) -> Result<()> {
		Ok(Page::goto(self, url).await?)
	}

	async fn reload(&self) -> Result<()> {
		Ok(Page::reload(self).await?)
	}

	async fn title(&self) -> Result<String> {
		Ok(Page::title(self).await?)
	}

	async fn current_url(&self) -> Result<String> {
		Ok(Page::current_url(self).await?)
	}
}
