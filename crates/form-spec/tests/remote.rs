use std::collections::BTreeMap;

use serde_json::json;

use form_spec::{
    LatestRequest, RemoteError, SearchMethod, SearchRequest, UploadResponse,
    normalize_search_response,
};

#[test]
fn get_requests_carry_query_string() {
    let request = SearchRequest::new(
        "https://api.example.com/cities?limit=5",
        SearchMethod::Get,
        "new york",
        BTreeMap::new(),
    )
    .expect("request");
    assert_eq!(request.url.as_str(), "https://api.example.com/cities?limit=5&q=new+york");
    assert!(request.body.is_none());
}

#[test]
fn post_requests_carry_json_body() {
    let headers = BTreeMap::from([("Authorization".to_string(), "Bearer t".to_string())]);
    let request = SearchRequest::new(
        "https://api.example.com/cities",
        SearchMethod::Post,
        "par",
        headers,
    )
    .expect("request");
    assert_eq!(request.body, Some(json!({ "q": "par" })));
    assert_eq!(request.url.query(), None);
    assert_eq!(request.headers["Authorization"], "Bearer t");
}

#[test]
fn relative_endpoints_are_rejected() {
    assert!(matches!(
        SearchRequest::new("/cities", SearchMethod::Get, "x", BTreeMap::new()),
        Err(RemoteError::InvalidEndpoint { .. })
    ));
}

#[test]
fn search_responses_accept_three_shapes() {
    let option = json!({ "value": "ca", "label": "Canada" });
    for response in [
        json!([option.clone()]),
        json!({ "results": [option.clone()] }),
        json!({ "data": [option.clone()], "total": 1 }),
    ] {
        assert_eq!(normalize_search_response(response).expect("options"), vec![option.clone()]);
    }
    assert!(normalize_search_response(json!({ "items": [] })).is_err());
    assert!(normalize_search_response(json!("nope")).is_err());
}

#[test]
fn upload_response_requires_url() {
    let ok =
        UploadResponse::parse(json!({ "url": "https://cdn.example.com/a.png" })).expect("upload");
    assert_eq!(ok.url, "https://cdn.example.com/a.png");
    assert!(UploadResponse::parse(json!({ "id": 3 })).is_err());
}

#[test]
fn only_the_latest_ticket_is_current() {
    let tracker = LatestRequest::new();
    let first = tracker.issue();
    let second = tracker.issue();
    assert!(!tracker.is_current(first));
    assert!(tracker.is_current(second));
}
