//! Uploads through ReadReporter.

use lumberyard::mocks::{MockResponse, MockTransport, TestFixtures};
use lumberyard::{HttpConnection, HttpRequest, ReadReporter, RequestSigner};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn connection(transport: &MockTransport) -> HttpConnection {
    HttpConnection::with_transport(
        "photos.nimbus.io",
        Some(RequestSigner::new(TestFixtures::credentials())),
        TestFixtures::config(),
        transport.clone(),
    )
}

#[test]
fn test_upload_reports_every_byte() {
    let transport = MockTransport::with_responses(vec![MockResponse::created()]);
    let mut connection = connection(&transport);

    let data = vec![42u8; 200_000];
    let sent = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sent);
    let reporter = ReadReporter::with_callback(Cursor::new(data.clone()), move |n| {
        counter.fetch_add(n, Ordering::SeqCst);
    });

    let request = HttpRequest::post("/data/big")
        .with_reader(reporter, Some(data.len() as u64))
        .expect_status(201);
    drop(connection.request(request).unwrap());

    assert_eq!(sent.load(Ordering::SeqCst), data.len());
    assert_eq!(transport.last_request().unwrap().body.len(), data.len());
}

#[test]
fn test_put_from_file_sends_file_length() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"file contents").unwrap();
    let source = file.reopen().unwrap();
    let length = source.metadata().unwrap().len();

    let transport = MockTransport::with_responses(vec![MockResponse::ok()]);
    let mut connection = connection(&transport);

    let request = HttpRequest::put("/data/file").with_reader(ReadReporter::new(source), Some(length));
    drop(connection.request(request).unwrap());

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.headers.get("content-length"), Some("13"));
    assert_eq!(recorded.body.as_ref(), b"file contents");
}
