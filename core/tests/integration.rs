//! Job lifecycle and object round trip against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port with signature verification
//! enabled, then drives every client operation over real HTTP through
//! `UreqTransport` and `HmacSigner`.

use std::io::{Cursor, Read};

use storage_core::{
    ClientConfig, CreateJob, HmacSigner, HttpMethod, JobPhase, ListJobsInput, RequestInput, StorageClient,
    StorageError,
};

const SECRET: &str = "integration-secret";

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, Some(SECRET.as_bytes().to_vec())).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str, secret: &str) -> StorageClient {
    let config = ClientConfig::new(base_url, "acct").unwrap();
    StorageClient::new(config, HmacSigner::new("acct", "ab:cd:ef", secret))
}

#[test]
fn job_lifecycle() {
    let client = client(&start_server(), SECRET);
    let jobs = client.jobs();

    // Step 1: create a two-phase job.
    let id = jobs
        .create(&CreateJob {
            name: "WordCount".to_string(),
            phases: vec![
                JobPhase::map("wc"),
                JobPhase::reduce("awk '{ l += $1; w += $2; c += $3 } END { print l, w, c }'"),
            ],
        })
        .unwrap();
    assert!(!id.is_empty());

    // Step 2: add inputs in two batches.
    jobs.add_inputs(&id, &["/acct/stor/books/treasure_island.txt", "/acct/stor/books/moby_dick.txt"])
        .unwrap();
    jobs.add_inputs(&id, &["/acct/stor/books/sherlock_holmes.txt"]).unwrap();

    // Step 3: status while input is open.
    let job = jobs.get(&id).unwrap();
    assert_eq!(job.id, id);
    assert_eq!(job.name, "WordCount");
    assert_eq!(job.state, "running");
    assert!(!job.input_done);
    assert_eq!(job.phases.len(), 2);
    assert_eq!(job.stats.as_ref().unwrap().tasks, 3);

    // Step 4: close input.
    jobs.end_input(&id).unwrap();

    // Step 5: closing twice is a service error.
    let err = jobs.end_input(&id).unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.service_error().unwrap().code, "InvalidJobState");

    // Step 6: list includes the job.
    let list = jobs.list(&ListJobsInput::default()).unwrap();
    assert_eq!(list.result_set_size, 1);
    assert_eq!(list.jobs[0].id, id);

    // Step 7: running-only list is empty now.
    let running = jobs
        .list(&ListJobsInput {
            running_only: true,
            ..ListJobsInput::default()
        })
        .unwrap();
    assert!(running.jobs.is_empty());

    // Step 8: inputs come back as a line stream.
    let inputs = jobs.get_input(&id).unwrap();
    assert_eq!(inputs.result_set_size, 3);
    let lines: Vec<String> = inputs.lines().collect::<Result<_, _>>().unwrap();
    assert_eq!(lines[2], "/acct/stor/books/sherlock_holmes.txt");

    // Step 9: one reducer output.
    let outputs = jobs.get_output(&id).unwrap();
    assert_eq!(outputs.result_set_size, 1);
    let lines: Vec<String> = outputs.lines().collect::<Result<_, _>>().unwrap();
    assert!(lines[0].starts_with(&format!("/acct/jobs/{id}/stor/reduce.1.")));

    // Step 10: no failures.
    assert_eq!(jobs.get_failures(&id).unwrap().result_set_size, 0);

    // Step 11: finished jobs cannot be cancelled.
    let err = jobs.cancel(&id).unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[test]
fn cancel_running_job() {
    let client = client(&start_server(), SECRET);
    let jobs = client.jobs();
    let id = jobs
        .create(&CreateJob {
            name: String::new(),
            phases: vec![JobPhase::map("cat")],
        })
        .unwrap();
    jobs.cancel(&id).unwrap();

    let job = jobs.get(&id).unwrap();
    assert!(job.cancelled);
    assert_eq!(job.state, "done");
}

#[test]
fn object_roundtrip() {
    let client = client(&start_server(), SECRET);
    let objects = client.objects();
    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

    objects
        .put("books/blob.bin", None, Cursor::new(payload.clone()))
        .unwrap();

    let mut object = objects.get("/books/blob.bin").unwrap();
    assert_eq!(object.content_type.as_deref(), Some("application/octet-stream"));
    assert!(object.etag.is_some());
    let mut body = Vec::new();
    object.body.read_to_end(&mut body).unwrap();
    assert_eq!(body, payload);

    objects.delete("books/blob.bin").unwrap();
    let err = objects.get("books/blob.bin").unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.service_error().unwrap().code, "ResourceNotFound");
}

#[test]
fn wrong_secret_is_rejected() {
    let client = client(&start_server(), "not-the-secret");
    let err = client.jobs().list(&ListJobsInput::default()).unwrap_err();
    match err {
        StorageError::Service(service) => {
            assert_eq!(service.status, 401);
            assert_eq!(service.code, "InvalidSignature");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[test]
fn raw_request_through_executor() {
    let client = client(&start_server(), SECRET);
    let response = client
        .execute(RequestInput::new(HttpMethod::Get, "/acct/jobs").query("limit", "5"))
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.headers.get("result-set-size"), Some("0"));
    assert!(response.into_bytes().unwrap().is_empty());
}

#[test]
fn unreachable_endpoint_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"), SECRET)
        .jobs()
        .get("j1")
        .unwrap_err();
    assert!(matches!(err, StorageError::Transport(_)));
}
