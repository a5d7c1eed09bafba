//! Split-file loading: keywords stored outside the main payload

use futures::executor::LocalPool;
use logview::loader::RequestQueue;
use logview::{Error, MessageLevel, Node, ReportData, SplitPayload};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const FIXTURES: &str = "tests/fixtures/v2";

fn open() -> (ReportData, RequestQueue) {
    let queue = RequestQueue::new();
    let report = ReportData::from_path(&Path::new(FIXTURES).join("output.json"), queue.clone())
        .expect("fixture loads");
    (report, queue)
}

fn pump(report: &ReportData, queue: &RequestQueue) -> usize {
    queue
        .serve_from_dir(report.loader(), Path::new(FIXTURES))
        .expect("split files served")
}

/// Resolve `id` through the callback contract, pumping split files in between
fn resolve(report: &ReportData, queue: &RequestQueue, id: &str) -> Vec<String> {
    let outcome = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    report
        .ensure_loaded(id, move |result| *slot.borrow_mut() = Some(result))
        .unwrap();
    pump(report, queue);
    let result = outcome.borrow_mut().take();
    result.expect("callback fired").expect("no decode error")
}

#[test]
fn resolves_through_nested_split_files() {
    let (report, queue) = open();
    let chain = resolve(&report, &queue, "s1-s1-t1-k1-k1");
    assert_eq!(
        chain,
        ["s1", "s1-s1", "s1-s1-t1", "s1-s1-t1-k1", "s1-s1-t1-k1-k1"]
    );
    assert_eq!(report.loader().request_count(), 2);
    assert!(report.loader().is_loaded("log-1.json"));
    assert!(report.loader().is_loaded("log-2.json"));

    let Some(Node::Keyword(digits)) = report.find_loaded("s1-s1-t1-k1-k1") else {
        panic!("keyword not registered");
    };
    assert_eq!(digits.name(), "Type Digits");
    assert_eq!(digits.path(), "Shop.Checkout.Pay With Card.0.0");
    let messages = digits.messages().unwrap();
    assert_eq!(messages[0].text(), "typed");
    assert_eq!(messages[1].level(), MessageLevel::Debug);
}

#[test]
fn split_keywords_use_their_own_string_table() {
    let (report, queue) = open();
    resolve(&report, &queue, "s1-s1-t1-k2");
    let card = report.find_loaded("s1-s1-t1").unwrap();
    assert!(card.is_children_loaded());
    let children = card.children().unwrap().unwrap();
    assert_eq!(children.len(), 2);

    let enter = children[0].as_keyword().unwrap();
    assert_eq!(enter.name(), "Enter Card");
    assert_eq!(enter.arguments(), "4111");
    assert!(!enter.is_children_loaded());
    assert_eq!(enter.split_file(), Some("log-2.json"));

    let submit = children[1].as_keyword().unwrap();
    assert_eq!(submit.name(), "Submit");
    let failure = submit.message(0).unwrap().unwrap();
    assert_eq!(failure.level(), MessageLevel::Fail);
    assert_eq!(failure.text(), "Card declined");
    assert!(Rc::ptr_eq(&failure.parent().unwrap(), submit));
}

#[test]
fn concurrent_waiters_share_one_request() {
    let (report, queue) = open();
    let card = report.suite().unwrap().suite(0).unwrap().unwrap().test(0).unwrap().unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));
    for i in 0..3 {
        let order = Rc::clone(&order);
        card.call_when_children_ready(move || order.borrow_mut().push(i));
    }
    assert_eq!(queue.len(), 1);
    assert_eq!(report.loader().pending_files(), ["log-1.json"]);
    assert!(order.borrow().is_empty());

    assert_eq!(pump(&report, &queue), 1);
    assert_eq!(*order.borrow(), [0, 1, 2]);
    assert!(report.loader().pending_files().is_empty());

    // already loaded: runs immediately, no new request
    let order2 = Rc::clone(&order);
    card.call_when_children_ready(move || order2.borrow_mut().push(3));
    assert_eq!(*order.borrow(), [0, 1, 2, 3]);
    assert_eq!(report.loader().request_count(), 1);
}

#[test]
fn inline_children_are_ready_immediately() {
    let (report, queue) = open();
    let cash = report.suite().unwrap().suite(0).unwrap().unwrap().test(1).unwrap().unwrap();
    let ran = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&ran);
    cash.call_when_children_ready(move || *flag.borrow_mut() = true);
    assert!(*ran.borrow());
    assert!(queue.is_empty());
}

#[test]
fn second_announcement_is_ignored() {
    let (report, queue) = open();
    resolve(&report, &queue, "s1-s1-t1-k1");
    let replacement = SplitPayload::from_json(
        r#"{"keywords": [[0, 1, 0, 0, 0, [1, 0, 0], [], []]], "strings": ["*", "*Other"]}"#,
    )
    .unwrap();
    report.announce("log-1.json", replacement);
    let card = report.find_loaded("s1-s1-t1").unwrap();
    let first = card.child(logview::NodeKind::Keyword, 0).unwrap().unwrap();
    assert_eq!(first.name(), "Enter Card");
    assert_eq!(card.children().unwrap().unwrap().len(), 2);
}

#[test]
fn unresolvable_segments_truncate() {
    let (report, queue) = open();
    assert_eq!(resolve(&report, &queue, "s1-s1-t9"), ["s1", "s1-s1"]);
    assert_eq!(
        resolve(&report, &queue, "s1-s1-t1-k7"),
        ["s1", "s1-s1", "s1-s1-t1"]
    );
    assert_eq!(resolve(&report, &queue, "s1-x1-t1"), ["s1"]);
}

/// Every suite, test and keyword id, loading split files on the way down
fn all_ids(report: &ReportData, queue: &RequestQueue) -> Vec<String> {
    let mut ids = Vec::new();
    let mut stack = vec![Node::Suite(report.suite().unwrap())];
    while let Some(node) = stack.pop() {
        if matches!(node, Node::Message(_)) {
            continue;
        }
        ids.push(node.id().to_string());
        if !node.is_children_loaded() {
            node.call_when_children_ready(|| {});
            pump(report, queue);
        }
        let children = node.children().unwrap().expect("children loaded");
        stack.extend(children.into_iter().rev());
    }
    ids
}

#[test]
fn every_id_resolves_to_itself() {
    let (report, queue) = open();
    let ids = all_ids(&report, &queue);
    assert!(ids.iter().any(|id| id == "s1-s1-t1-k1-k1"));
    assert_eq!(report.loader().request_count(), 2);

    for id in &ids {
        let chain = resolve(&report, &queue, id);
        assert_eq!(chain.last(), Some(id), "chain for {}", id);
        assert_eq!(chain[0], "s1");
    }
    assert_eq!(report.loader().request_count(), 2);
}

#[test]
fn keyword_path_from_names() {
    let (report, queue) = open();
    let outcome = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    report
        .path_to_keyword("Shop.Checkout.Pay With Card.1", move |r| {
            *slot.borrow_mut() = Some(r)
        })
        .unwrap();
    pump(&report, &queue);
    let chain = outcome.borrow_mut().take().unwrap().unwrap();
    assert_eq!(chain.last().map(String::as_str), Some("s1-s1-t1-k2"));

    // the error message links to the same keyword
    let link = report.errors().unwrap()[0].link().unwrap().to_string();
    assert_eq!(resolve(&report, &queue, &link), chain);
}

#[test]
fn future_resolution_on_local_pool() {
    let (report, queue) = open();
    let mut pool = LocalPool::new();
    let chain = report.resolve("s1-s1-t1-k2").unwrap();
    let payload = report.loader().loaded("log-1.json");
    pump(&report, &queue);

    let chain = pool.run_until(chain).unwrap();
    assert_eq!(chain, ["s1", "s1-s1", "s1-s1-t1", "s1-s1-t1-k2"]);
    let payload = pool.run_until(payload).unwrap();
    assert_eq!(payload.keywords.len(), 2);
}

#[test]
fn dropping_the_report_abandons_pending_loads() {
    let (report, _queue) = open();
    let mut pool = LocalPool::new();
    let chain = report.resolve("s1-s1-t1-k1").unwrap();
    drop(report);
    match pool.run_until(chain) {
        Err(Error::LoadAbandoned(path)) => assert_eq!(path, "s1-s1-t1-k1"),
        other => panic!("expected LoadAbandoned, got {:?}", other),
    }
}

#[test]
fn missing_split_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::copy(
        Path::new(FIXTURES).join("output.json"),
        dir.path().join("output.json"),
    )
    .unwrap();
    let queue = RequestQueue::new();
    let report = ReportData::from_path(&dir.path().join("output.json"), queue.clone()).unwrap();
    report.ensure_loaded("s1-s1-t1-k1", |_| {}).unwrap();
    let err = queue.serve_from_dir(report.loader(), dir.path()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(report.loader().pending_files(), ["log-1.json"]);
}
