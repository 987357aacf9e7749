use std::sync::Arc;

use scm::{ConsoleMessage, ConsoleMessageKind, TargetKind};

use super::*;
use crate::testing::{MockTarget, mock_session};

#[tokio::test]
async fn concurrent_first_acquire_attaches_one_listener() {
	let target = MockTarget::page("T1", "https://a.test/");
	let (session, _browser) = mock_session(vec![Arc::clone(&target)]);
	let id = stable_id(target.as_ref());

	let calls = (0..6).map(|_| {
		let session = Arc::clone(&session);
		let target = Arc::clone(&target);
		let id = id.clone();
		tokio::spawn(async move { session.acquire_page(target.as_ref(), &id).await })
	});
	let pages: Vec<_> = futures::future::join_all(calls)
		.await
		.into_iter()
		.map(|r| r.unwrap().unwrap().unwrap())
		.collect();

	assert!(pages.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
	assert_eq!(target.page_requests(), 1);
	assert_eq!(target.mock_page().unwrap().listener_count(), 1);
	assert!(session.logs().has_buffer("T1"));
}

#[tokio::test]
async fn pageless_target_is_not_cached() {
	let worker = MockTarget::new("W1", TargetKind::ServiceWorker, "https://a.test/sw.js");
	let (session, _browser) = mock_session(vec![Arc::clone(&worker)]);

	let page = session.acquire_page(worker.as_ref(), &stable_id(worker.as_ref())).await.unwrap();
	assert!(page.is_none());
	assert!(session.pages().is_empty());
	assert!(!session.logs().has_buffer("W1"));
}

#[tokio::test]
async fn captured_messages_land_in_the_buffer() {
	let target = MockTarget::page("T1", "https://a.test/");
	let (session, _browser) = mock_session(vec![Arc::clone(&target)]);
	session.acquire_page(target.as_ref(), &stable_id(target.as_ref())).await.unwrap();

	let page = target.mock_page().unwrap();
	page.emit(ConsoleMessage::new(ConsoleMessageKind::Error, "boom"));

	let report = session.logs().read("T1", 50, LogFilter::All);
	assert_eq!(report.total, 1);
	assert!(report.text.ends_with("] ERROR: boom"));
}

#[tokio::test]
async fn cleanup_runs_once_and_releases_everything() {
	let target = MockTarget::page("T1", "https://a.test/");
	let (session, browser) = mock_session(vec![Arc::clone(&target)]);
	session.ensure_connection(9222).await.unwrap();
	session.acquire_page(target.as_ref(), &stable_id(target.as_ref())).await.unwrap();

	session.cleanup();
	session.cleanup();

	assert!(session.is_cleaned_up());
	assert_eq!(browser.disconnects(), 1);
	assert_eq!(target.mock_page().unwrap().listener_count(), 0);
	assert!(session.pages().is_empty());
	assert!(!session.logs().has_buffer("T1"));
	assert!(session.ensure_connection(9222).await.is_err());
}

#[tokio::test]
async fn dead_page_is_reattached_and_keeps_its_logs() {
	let target = MockTarget::page("T1", "https://a.test/");
	let (session, _browser) = mock_session(vec![Arc::clone(&target)]);
	let id = stable_id(target.as_ref());
	let first = session.acquire_page(target.as_ref(), &id).await.unwrap().unwrap();
	target.mock_page().unwrap().emit(ConsoleMessage::new(ConsoleMessageKind::Log, "before"));

	let old = target.mock_page().unwrap();
	let fresh = target.reattach();
	let second = session.acquire_page(target.as_ref(), &id).await.unwrap().unwrap();

	assert!(!Arc::ptr_eq(&first, &second));
	assert!(second.is_live());
	assert_eq!(target.page_requests(), 2);
	assert_eq!(old.listener_count(), 0);
	assert_eq!(fresh.listener_count(), 1);

	fresh.emit(ConsoleMessage::new(ConsoleMessageKind::Error, "after"));
	let report = session.logs().read("T1", 50, LogFilter::All);
	assert_eq!(report.total, 2);
	assert!(report.text.ends_with("] ERROR: after"));

	let third = session.acquire_page(target.as_ref(), &id).await.unwrap().unwrap();
	assert!(Arc::ptr_eq(&second, &third));
	assert_eq!(target.page_requests(), 2);
}
