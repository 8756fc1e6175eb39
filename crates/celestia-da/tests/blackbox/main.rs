#![allow(clippy::missing_panics_doc)]

pub mod helper;

use std::time::Duration;

use celestia_da::{
    celestia::{
        blob,
        namespace,
        MAX_BLOB_SIZE,
    },
    da::{
        Blob,
        Id,
        Proof,
    },
    fee::SubmitOptions,
    server::{
        DaApiClient as _,
        ListenAddr,
        ListenNetwork,
        ENCODING_ERROR_CODE,
        NOT_FOUND_ERROR_CODE,
    },
    CelestiaDa,
};
use celestia_da_mock::MockCelestiaNode;
use helper::{
    make_config,
    metrics,
    spawn_celestia_da,
    spawn_celestia_da_with_node,
    NAMESPACE_ID,
};
use jsonrpsee::core::ClientError;
use tokio::io::{
    AsyncReadExt as _,
    AsyncWriteExt as _,
};

fn error_code(error: &ClientError) -> i32 {
    match error {
        ClientError::Call(object) => object.code(),
        other => panic!("expected a call error, got `{other}`"),
    }
}

#[tokio::test]
async fn submitted_blob_is_retrievable_and_provably_included() {
    let test = spawn_celestia_da().await;
    let blob = Blob(vec![0x00, 0x01, 0x02]);

    let ids = test
        .client
        .submit(vec![blob.clone()], -1.0, None)
        .await
        .unwrap();
    assert_eq!(1, ids.len());
    let height = u64::from_le_bytes(ids[0].as_bytes()[..8].try_into().unwrap());

    let ids_at_height = test.client.get_ids(height, None).await.unwrap();
    assert_eq!(ids, ids_at_height);

    let blobs = test.client.get(ids.clone(), None).await.unwrap();
    assert_eq!(vec![blob.clone()], blobs);

    let proofs = test.client.get_proofs(ids.clone(), None).await.unwrap();
    assert_eq!(1, proofs.len());

    let included = test.client.validate(ids, proofs, None).await.unwrap();
    assert_eq!(vec![true], included);

    let submissions = test.node.submissions();
    assert_eq!(1, submissions.len());
    assert_eq!(SubmitOptions::node_default(), submissions[0].options);
    let namespace = namespace::from_hex_id(NAMESPACE_ID).unwrap();
    assert_eq!(namespace, submissions[0].blobs[0].namespace);
}

#[tokio::test]
async fn commitments_match_the_ids_of_submitted_blobs() {
    let test = spawn_celestia_da().await;
    let blobs = vec![Blob(b"first".to_vec()), Blob(b"second".to_vec())];

    let commitments = test.client.commit(blobs.clone(), None).await.unwrap();
    let ids = test.client.submit(blobs, 0.002, None).await.unwrap();

    assert_eq!(2, ids.len());
    for (id, commitment) in ids.iter().zip(&commitments) {
        assert_eq!(commitment.as_bytes(), &id.as_bytes()[8..]);
    }
    let options = test.node.submissions()[0].options;
    assert!(options.fee > 0);
    assert!(options.gas_limit > 0);
}

#[tokio::test]
async fn commitment_matches_celestia_app() {
    let test = spawn_celestia_da().await;
    let mut namespace = vec![0; 19];
    namespace.extend_from_slice(&[1; 10]);

    let commitments = test
        .client
        .commit(vec![Blob(vec![0xff; 1536])], Some(namespace.into()))
        .await
        .unwrap();
    assert_eq!(
        &hex_literal::hex!("3b9e78b6648ec1a241925b31da2ecb50bfc6f4ad552d3279928ca13ebeba8c2b"),
        commitments[0].as_bytes(),
    );
}

#[tokio::test]
async fn proof_of_another_blob_does_not_validate() {
    let test = spawn_celestia_da().await;
    let first = test
        .client
        .submit(vec![Blob(b"first".to_vec())], -1.0, None)
        .await
        .unwrap();
    let second = test
        .client
        .submit(vec![Blob(vec![0xab; 2_000])], -1.0, None)
        .await
        .unwrap();
    let second_proofs = test.client.get_proofs(second, None).await.unwrap();

    let included = test
        .client
        .validate(first, second_proofs, None)
        .await
        .unwrap();
    assert_eq!(vec![false], included);
}

#[tokio::test]
async fn empty_inputs_yield_empty_outputs() {
    let test = spawn_celestia_da().await;

    assert!(test.client.submit(vec![], -1.0, None).await.unwrap().is_empty());
    assert!(test.client.get(vec![], None).await.unwrap().is_empty());
    assert!(test.client.commit(vec![], None).await.unwrap().is_empty());
    assert!(test.client.get_ids(1, None).await.unwrap().is_empty());
    assert!(test.node.submissions().is_empty());
}

#[tokio::test]
async fn blobs_in_another_namespace_are_not_listed() {
    let test = spawn_celestia_da().await;
    let other = namespace::from_hex_id("0102030405060708090a").unwrap();

    let ids = test
        .client
        .submit(
            vec![Blob(b"elsewhere".to_vec())],
            -1.0,
            Some(other.as_bytes().to_vec().into()),
        )
        .await
        .unwrap();
    let height = u64::from_le_bytes(ids[0].as_bytes()[..8].try_into().unwrap());

    assert!(test.client.get_ids(height, None).await.unwrap().is_empty());
    assert_eq!(
        ids,
        test.client
            .get_ids(height, Some(other.as_bytes().to_vec().into()))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn errors_are_reported_with_their_kind() {
    let test = spawn_celestia_da().await;

    let short_id = test
        .client
        .get(vec![Id(vec![1, 2, 3])], None)
        .await
        .unwrap_err();
    assert_eq!(ENCODING_ERROR_CODE, error_code(&short_id));

    let oversized = test
        .client
        .commit(vec![Blob(vec![0; MAX_BLOB_SIZE + 1])], None)
        .await
        .unwrap_err();
    assert_eq!(ENCODING_ERROR_CODE, error_code(&oversized));

    let namespace = namespace::from_hex_id(NAMESPACE_ID).unwrap();
    let commitment = blob::commit(namespace, b"never submitted").unwrap();
    let mut missing = 7u64.to_le_bytes().to_vec();
    missing.extend_from_slice(&commitment.0);
    let not_found = test
        .client
        .get(vec![Id(missing)], None)
        .await
        .unwrap_err();
    assert_eq!(NOT_FOUND_ERROR_CODE, error_code(&not_found));

    let mismatched = test
        .client
        .validate(vec![], vec![Proof(vec![])], None)
        .await
        .unwrap_err();
    assert_eq!(ENCODING_ERROR_CODE, error_code(&mismatched));
}

#[tokio::test]
async fn in_flight_requests_finish_during_shutdown() {
    let node =
        MockCelestiaNode::spawn_with_response_delay("127.0.0.1:0", Duration::from_millis(500))
            .await
            .unwrap();
    let mut test = spawn_celestia_da_with_node(node, |_| {}).await;

    let client = test.client.clone();
    let submission =
        tokio::spawn(async move { client.submit(vec![Blob(vec![1])], -1.0, None).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    test.service.shutdown().await.unwrap();

    let ids = submission.await.unwrap().unwrap();
    assert_eq!(1, ids.len());
    assert_eq!(1, test.node.submissions().len());
    test.client.max_blob_size().await.unwrap_err();
}

#[tokio::test]
async fn service_listens_on_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("celestia-da.sock");
    let node = MockCelestiaNode::spawn().await.unwrap();
    let mut config = make_config(node.endpoint());
    config.listen_network = ListenNetwork::Unix;
    config.listen_address = socket.display().to_string();

    let mut service = CelestiaDa::spawn(config, metrics()).await.unwrap();
    assert_eq!(&ListenAddr::Unix(socket.clone()), service.local_addr());

    let body = r#"{"jsonrpc":"2.0","id":1,"method":"da.MaxBlobSize","params":[]}"#;
    let request = format!(
        "POST / HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\ncontent-length: \
         {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = tokio::net::UnixStream::connect(&socket).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(
        response.contains(&format!(r#""result":{MAX_BLOB_SIZE}"#)),
        "unexpected response: {response}"
    );

    service.shutdown().await.unwrap();
    assert!(!socket.exists(), "socket file must be removed on shutdown");
}

#[tokio::test]
async fn unreachable_node_fails_startup() {
    let node = MockCelestiaNode::spawn().await.unwrap();
    let endpoint = node.endpoint();
    node.stop();
    node.stopped().await;

    let error = CelestiaDa::spawn(make_config(endpoint), metrics())
        .await
        .err()
        .expect("starting against a stopped node must fail");
    assert!(
        error.to_string().contains("not reachable"),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn unixpacket_listener_is_rejected() {
    let node = MockCelestiaNode::spawn().await.unwrap();
    let mut config = make_config(node.endpoint());
    config.listen_network = ListenNetwork::UnixPacket;
    config.listen_address = "/tmp/celestia-da-unixpacket.sock".to_string();

    CelestiaDa::spawn(config, metrics())
        .await
        .err()
        .expect("unixpacket sockets are not supported");
}

#[tokio::test]
async fn invalid_namespace_fails_startup() {
    let node = MockCelestiaNode::spawn().await.unwrap();
    let mut config = make_config(node.endpoint());
    config.namespace = "not hex".to_string();

    CelestiaDa::spawn(config, metrics())
        .await
        .err()
        .expect("an invalid namespace must be rejected");
}

#[tokio::test]
async fn max_blob_size_is_served() {
    let test = spawn_celestia_da().await;
    test.assert_serving().await;
}
