//! Request dispatch across virtual hosts over a real listener.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::IntoResponse;
use hostgate::http::HandlerResult;
use hostgate::{HandlerFault, Server};
use reqwest::header;
use reqwest::StatusCode;

mod common;

fn text(body: &'static str) -> impl Fn(Request<Body>) -> std::future::Ready<HandlerResult> {
    move |_request| std::future::ready(Ok(body.into_response()))
}

#[tokio::test]
async fn exact_host_then_wildcard() {
    let server = Server::new(common::local_config());
    server
        .register_route("*", Method::GET, "/hello", text("wildcard"))
        .unwrap();
    server
        .register_route("api.example", Method::GET, "/hello", text("api"))
        .unwrap();
    let addr = common::start(&server).await;
    let client = common::client();
    let url = format!("http://{addr}/hello");

    let res = client.get(&url).header(header::HOST, "app.example").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "wildcard");

    let res = client
        .get(&url)
        .header(header::HOST, "API.example:8080")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "api");

    // Method is part of the key.
    let res = client.post(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn registrations_after_start_take_effect_and_last_wins() {
    let server = Server::new(common::local_config());
    let addr = common::start(&server).await;
    let client = common::client();
    let url = format!("http://{addr}/version");

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "404 Not Found");

    server
        .register_route("*", Method::GET, "/version", text("one"))
        .unwrap();
    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "one");

    server
        .register_route("*", Method::GET, "/version", text("two"))
        .unwrap();
    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "two");

    server.stop().await;
}

#[tokio::test]
async fn failing_handler_is_isolated() {
    let server = Server::new(common::local_config());
    server
        .register_route("*", Method::GET, "/fail", |_request: Request<Body>| async {
            Err::<axum::response::Response, HandlerFault>("database unavailable".into())
        })
        .unwrap();
    server
        .register_route("*", Method::GET, "/panic", |_request: Request<Body>| async {
            if true {
                panic!("handler bug");
            }
            Ok::<_, HandlerFault>("unreachable".into_response())
        })
        .unwrap();
    server
        .register_route("*", Method::GET, "/ok", text("still here"))
        .unwrap();
    let addr = common::start(&server).await;
    let client = common::client();

    for path in ["/fail", "/panic"] {
        let res = client.get(format!("http://{addr}{path}")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.text().await.unwrap(), "500 Internal Server Error");
    }

    let res = client.get(format!("http://{addr}/ok")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "still here");

    server.stop().await;
}

#[tokio::test]
async fn handlers_see_the_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let server = Server::new(common::local_config());
    server
        .register_route("*", Method::PUT, "/echo", move |request: Request<Body>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let body = axum::body::to_bytes(request.into_body(), 1024).await?;
                Ok::<_, HandlerFault>(body.into_response())
            }
        })
        .unwrap();
    let addr = common::start(&server).await;

    let res = common::client()
        .put(format!("http://{addr}/echo"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "payload");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    server.stop().await;
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let server = Server::new(common::local_config());
    let addr = common::start(&server).await;
    let client = common::client();

    let res = client.get(format!("http://{addr}/missing")).send().await.unwrap();
    assert!(!res.headers()["x-request-id"].is_empty());

    let res = client
        .get(format!("http://{addr}/missing"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-42");

    server.stop().await;
}

#[tokio::test]
async fn plain_request_to_websocket_path_is_rejected() {
    let server = Server::new(common::local_config());
    server
        .register_websocket("*", "/chat", hostgate::websocket::relay(Default::default(), false))
        .unwrap();
    let addr = common::start(&server).await;

    let res = common::client()
        .get(format!("http://{addr}/chat"))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());

    server.stop().await;
}
