mod common;

use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use mockito::{Matcher, Server};

use pride_curator::error::CuratorError;
use pride_curator::pride::{
    PrideHttpClient, ProjectResolver, list_all_identifiers, resolve_transfer_url,
};
use pride_curator::store::Store;

use common::temp_root;

const PROJECT_BODY: &str = r#"{"accession":"PXD000001","title":"TMT spikes","projectDescription":"Expected reporter ion ratios","doi":"10.6019/PXD000001","_links":{"datasetFtpUrl":{"href":"ftp://ftp.pride.ebi.ac.uk/pride/data/archive/2012/03/PXD000001"}}}"#;

fn client(server: &Server) -> PrideHttpClient {
    PrideHttpClient::with_base_url(&server.url(), Duration::from_secs(5)).unwrap()
}

fn offline_client() -> PrideHttpClient {
    PrideHttpClient::with_base_url("http://127.0.0.1:1", Duration::from_secs(2)).unwrap()
}

#[test]
fn fetch_returns_metadata_and_caches_body_verbatim() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/projects/PXD000001")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROJECT_BODY)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root.clone());

    let mut resolver = ProjectResolver::for_identifier(client(&server), "pxd000001", &store).unwrap();
    let metadata = resolver.metadata().unwrap();

    assert_eq!(metadata.title(), Some("TMT spikes"));
    assert_eq!(metadata.doi(), Some("10.6019/PXD000001"));
    let cached = fs::read_to_string(root.join("PXD000001").join(".pride-metadata").as_std_path())
        .unwrap();
    assert_eq!(cached, PROJECT_BODY);
    mock.assert();
}

#[test]
fn metadata_is_fetched_once_per_resolver() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/projects/PXD000001")
        .with_status(200)
        .with_body(PROJECT_BODY)
        .expect(1)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);

    let mut resolver = ProjectResolver::for_identifier(client(&server), "PXD000001", &store).unwrap();
    resolver.metadata().unwrap();
    resolver.metadata().unwrap();

    mock.assert();
}

#[test]
fn not_found_status_is_a_request_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/projects/PXD000404")
        .with_status(404)
        .with_body("Project not found")
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root.clone());

    let mut resolver = ProjectResolver::for_identifier(client(&server), "PXD000404", &store).unwrap();
    let err = resolver.metadata().unwrap_err();

    assert!(err.to_string().contains("404"));
    assert_matches!(err, CuratorError::PrideStatus { status: 404, .. });
    assert!(!root.join("PXD000404").join(".pride-metadata").as_std_path().exists());
}

#[test]
fn status_error_does_not_fall_back_to_cache() {
    let mut server = Server::new();
    server
        .mock("GET", "/projects/PXD000001")
        .with_status(500)
        .with_body("boom")
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);
    let id = "PXD000001".parse().unwrap();
    Store::write_bytes_atomic(&store.metadata_cache_path(&id), PROJECT_BODY.as_bytes()).unwrap();

    let mut resolver = ProjectResolver::new(client(&server), id, &store);

    assert_matches!(
        resolver.metadata().unwrap_err(),
        CuratorError::PrideStatus { status: 500, .. }
    );
}

#[test]
fn connection_failure_falls_back_to_cache() {
    let (_temp, root) = temp_root();
    let store = Store::new(root);
    let id = "PXD000001".parse().unwrap();
    Store::write_bytes_atomic(&store.metadata_cache_path(&id), PROJECT_BODY.as_bytes()).unwrap();

    let mut resolver = ProjectResolver::new(offline_client(), id, &store);
    let metadata = resolver.metadata().unwrap();

    assert_eq!(metadata.title(), Some("TMT spikes"));
}

#[test]
fn connection_failure_without_cache_propagates() {
    let (_temp, root) = temp_root();
    let store = Store::new(root);

    let mut resolver = ProjectResolver::for_identifier(offline_client(), "PXD000001", &store).unwrap();

    assert_matches!(
        resolver.metadata().unwrap_err(),
        CuratorError::PrideConnection(_)
    );
}

#[test]
fn online_fetch_overwrites_existing_cache() {
    let mut server = Server::new();
    server
        .mock("GET", "/projects/PXD000001")
        .with_status(200)
        .with_body(PROJECT_BODY)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);
    let id = "PXD000001".parse().unwrap();
    let cache = store.metadata_cache_path(&id);
    Store::write_bytes_atomic(&cache, br#"{"title":"stale"}"#).unwrap();

    let mut resolver = ProjectResolver::new(client(&server), id, &store);

    assert_eq!(resolver.metadata().unwrap().title(), Some("TMT spikes"));
    assert_eq!(Store::read_to_string(&cache).unwrap(), PROJECT_BODY);
}

#[test]
fn prefer_cache_skips_the_network() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/projects/PXD000001")
        .with_status(200)
        .with_body(PROJECT_BODY)
        .expect(0)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);
    let id = "PXD000001".parse().unwrap();
    Store::write_bytes_atomic(&store.metadata_cache_path(&id), br#"{"title":"cached"}"#).unwrap();

    let mut resolver = ProjectResolver::new(client(&server), id, &store).prefer_cache(true);

    assert_eq!(resolver.metadata().unwrap().title(), Some("cached"));
    mock.assert();
}

#[test]
fn malformed_identifier_is_rejected_locally() {
    let (_temp, root) = temp_root();
    let store = Store::new(root);

    for bad in ["PXD12", "PZD000001", "XPXD000001", "", "PXD00000A"] {
        let result = ProjectResolver::for_identifier(offline_client(), bad, &store);
        assert_matches!(result.err(), Some(CuratorError::InvalidIdentifier(_)));
    }
}

#[test]
fn sitemap_lists_matching_identifiers_sorted() {
    let mut server = Server::new();
    server
        .mock("GET", "/misc/sitemap")
        .with_status(200)
        .with_body(
            "https://www.ebi.ac.uk/pride/archive/projects/PXD000002\n\
             https://www.ebi.ac.uk/pride/archive/junk\n\
             https://www.ebi.ac.uk/pride/archive/projects/PRD000123\n\
             https://www.ebi.ac.uk/pride/archive/projects/PXD000001\n",
        )
        .create();

    let ids = list_all_identifiers(&client(&server))
        .unwrap()
        .into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["PRD000123", "PXD000001", "PXD000002"]);
}

#[test]
fn transfer_url_uses_first_reachable_rewrite() {
    let mut server = Server::new();
    let body = format!(
        r#"{{"_links":{{"datasetFtpUrl":{{"href":"{}/pride/data/archive/2016/10/PXD004732"}}}}}}"#,
        server.url()
    );
    server
        .mock("GET", "/projects/PXD004732")
        .with_status(200)
        .with_body(body)
        .create();
    let original = server
        .mock("HEAD", "/pride/data/archive/2016/10/PXD004732")
        .with_status(404)
        .create();
    let rewritten = server
        .mock("HEAD", "/pride-archive/2016/10/PXD004732")
        .with_status(200)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);

    let mut resolver = ProjectResolver::for_identifier(client(&server), "PXD004732", &store).unwrap();
    let url = resolver.transfer_url().unwrap().to_string();

    assert_eq!(url, format!("{}/pride-archive/2016/10/PXD004732", server.url()));
    original.assert();
    rewritten.assert();
}

#[test]
fn transfer_url_fails_when_no_candidate_is_reachable() {
    let mut server = Server::new();
    server
        .mock("HEAD", Matcher::Any)
        .with_status(404)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);
    let id = "PXD004732".parse().unwrap();
    let body = format!(
        r#"{{"_links":{{"datasetFtpUrl":{{"href":"{}/pride/data/archive/2016/10/PXD004732"}}}}}}"#,
        server.url()
    );
    Store::write_bytes_atomic(&store.metadata_cache_path(&id), body.as_bytes()).unwrap();
    let mut resolver = ProjectResolver::new(client(&server), id, &store).prefer_cache(true);
    let metadata = resolver.metadata().unwrap().clone();

    let err = resolve_transfer_url(resolver.client(), &metadata).unwrap_err();

    assert_matches!(err, CuratorError::UnreachableUrl { ref reason, .. } if reason.contains("404"));
}

#[test]
fn missing_transfer_link_is_reported() {
    let (_temp, root) = temp_root();
    let store = Store::new(root);
    let id = "PXD000001".parse().unwrap();
    Store::write_bytes_atomic(&store.metadata_cache_path(&id), br#"{"title":"x"}"#).unwrap();

    let mut resolver = ProjectResolver::new(offline_client(), id, &store).prefer_cache(true);

    assert_matches!(
        resolver.transfer_url().unwrap_err(),
        CuratorError::MissingLink(_)
    );
}

#[test]
fn transfer_url_is_resolved_once_per_resolver() {
    let mut server = Server::new();
    let body = format!(
        r#"{{"_links":{{"datasetFtpUrl":{{"href":"{}/pride/data/archive/2016/10/PXD004732"}}}}}}"#,
        server.url()
    );
    let project = server
        .mock("GET", "/projects/PXD004732")
        .with_status(200)
        .with_body(body)
        .expect(1)
        .create();
    let head = server
        .mock("HEAD", "/pride/data/archive/2016/10/PXD004732")
        .with_status(200)
        .expect(1)
        .create();
    let (_temp, root) = temp_root();
    let store = Store::new(root);

    let mut resolver = ProjectResolver::for_identifier(client(&server), "PXD004732", &store).unwrap();
    let first = resolver.transfer_url().unwrap().to_string();
    let second = resolver.transfer_url().unwrap().to_string();

    assert_eq!(first, second);
    assert!(resolver.metadata().unwrap().title().is_none());
    project.assert();
    head.assert();
}
