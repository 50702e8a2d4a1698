//! Built-in plugins against mocked upstreams

use courier::{ArtifactFormat, ArtifactKind, Envelope};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::TestHost;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

fn atom_feed(ids: &[&str]) -> String {
    let entries: String = ids
        .iter()
        .map(|id| {
            format!(
                "<entry><id>http://arxiv.org/abs/{id}</id><title>Paper {id}</title>\
                 <category term=\"cs.LG\" scheme=\"http://arxiv.org/schemas/atom\"/></entry>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <feed xmlns=\"http://www.w3.org/2005/Atom\"><id>http://arxiv.org/api/q</id>{entries}</feed>"
    )
}

fn direct_paths(envelope: &Envelope) -> Vec<String> {
    match envelope {
        Envelope::DirectResult(direct) => direct.value.iter().map(String::from).collect(),
        other => panic!("expected direct result, got {other:?}"),
    }
}

#[tokio::test]
async fn arxiv_search_returns_requested_number_of_pdfs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "ti:attention"))
        .and(query_param("max_results", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(&[
            "1706.03762v7",
            "1810.04805v2",
            "2005.14165v4",
            "1409.0473v7",
            "1512.03385v1",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host
        .call("search_arxiv", r#"{"query": "attention", "results_num": 2}"#)
        .await;

    let Envelope::DirectResult(direct) = &envelope else {
        panic!("expected direct result, got {envelope:?}");
    };
    assert_eq!(direct.kind, ArtifactKind::File);
    assert_eq!(direct.format, ArtifactFormat::Url);
    assert_eq!(
        direct.value.iter().collect::<Vec<_>>(),
        [
            "https://arxiv.org/pdf/1706.03762v7",
            "https://arxiv.org/pdf/1810.04805v2"
        ]
    );
}

#[tokio::test]
async fn arxiv_search_defaults_to_three_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(atom_feed(&["1", "2", "3", "4"])),
        )
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("search_arxiv", r#"{"query": "x"}"#).await;

    assert_eq!(direct_paths(&envelope).len(), 3);
}

#[tokio::test]
async fn arxiv_search_without_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(&[])))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("search_arxiv", r#"{"query": "nothing"}"#).await;

    assert_eq!(envelope, Envelope::result("No matching papers found"));
}

#[tokio::test]
async fn arxiv_search_upstream_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("search_arxiv", r#"{"query": "x"}"#).await;

    assert!(envelope.error_message().unwrap().contains("Failed to search arXiv"));
}

#[tokio::test]
async fn jina_reader_returns_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Attention Is All You Need"))
        .expect(1)
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host
        .call("jina_scrape_to_markdown", r#"{"url": "https://arxiv.org/abs/1706.03762"}"#)
        .await;

    assert_eq!(envelope, Envelope::result("# Attention Is All You Need"));
}

#[tokio::test]
async fn jina_reader_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host
        .call("jina_scrape_to_markdown", r#"{"url": "https://arxiv.org/abs/0"}"#)
        .await;

    assert_eq!(
        envelope,
        Envelope::error("Failed to retrieve Markdown content. Status code: 404")
    );
}

#[tokio::test]
async fn web_scraper_converts_page_to_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>t</title><script>alert(1)</script></head>\
             <body><h1>Title</h1><p>Some <strong>bold</strong> text.</p></body></html>",
        ))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let url = format!("{}/article", server.uri());
    let envelope = host
        .call("scrape_to_markdown", &json!({ "url": url }).to_string())
        .await;

    let Envelope::Result(value) = envelope else {
        panic!("expected result, got {envelope:?}");
    };
    let markdown = value.as_str().unwrap();
    assert!(markdown.contains("# Title"));
    assert!(markdown.contains("Some **bold** text."));
    assert!(!markdown.contains("alert"));
}

#[tokio::test]
async fn unreachable_scrape_yields_only_an_error() {
    let host = TestHost::new("http://127.0.0.1:9");
    let envelope = host
        .call("scrape_to_markdown", r#"{"url": "http://nonexistent.invalid/"}"#)
        .await;

    let wire = envelope.to_json();
    let object = wire.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(object["error"].is_string());
}

#[tokio::test]
async fn telegram_scraper_collects_each_post() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rustlang/1"))
        .and(query_param("embed", "1"))
        .and(query_param("mode", "tme"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="tgme_widget_message_author"><a><span dir="auto">Rust</span></a></div>
               <div class="tgme_widget_message_text" dir="auto">Hello <b>world</b></div>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rustlang/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let urls = format!("{0}/rustlang/1, {0}/rustlang/2", server.uri());
    let envelope = host
        .call("scrape_telegram_post", &json!({ "post_url": urls }).to_string())
        .await;

    let Envelope::Result(value) = envelope else {
        panic!("expected result, got {envelope:?}");
    };
    let posts = value["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["author"], "Rust");
    assert_eq!(posts[0]["content"], "Hello world");
    assert!(posts[0]["post_url"].as_str().unwrap().ends_with("?embed=1&mode=tme"));
    assert!(posts[1]["error"].as_str().unwrap().contains("404"));
    assert!(posts[1].get("content").is_none());
}

#[tokio::test]
async fn telegram_scraper_requires_a_url() {
    let host = TestHost::new("http://127.0.0.1:9");
    let envelope = host.call("scrape_telegram_post", r#"{"post_url": " , "}"#).await;
    assert_eq!(envelope, Envelope::error("No post URL provided."));
}

async fn mount_wikipedia_search(server: &MockServer, hits: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("list", "search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "search": hits }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn wikipedia_returns_extract_of_best_hit() {
    let server = MockServer::start().await;
    mount_wikipedia_search(&server, json!([{ "title": "Rust (programming language)" }])).await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("titles", "Rust (programming language)"))
        .and(query_param("explaintext", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": [{
                "title": "Rust (programming language)",
                "extract": "Rust is a general-purpose programming language.",
                "fullurl": "https://en.wikipedia.org/wiki/Rust_(programming_language)"
            }]}
        })))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("search", r#"{"query": "rust language"}"#).await;

    assert_eq!(
        envelope,
        Envelope::result(json!({
            "title": "Rust (programming language)",
            "content": "Rust is a general-purpose programming language.",
            "url": "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        }))
    );
}

#[tokio::test]
async fn wikipedia_without_hits() {
    let server = MockServer::start().await;
    mount_wikipedia_search(&server, json!([])).await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("search", r#"{"query": "qwxzv"}"#).await;

    assert_eq!(envelope, Envelope::error("No results found"));
}

#[tokio::test]
async fn wikipedia_disambiguation() {
    let server = MockServer::start().await;
    mount_wikipedia_search(&server, json!([{ "title": "Mercury" }])).await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("titles", "Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": [{
                "title": "Mercury",
                "extract": "Mercury may refer to:",
                "pageprops": { "disambiguation": "" }
            }]}
        })))
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("search", r#"{"query": "mercury"}"#).await;

    assert_eq!(
        envelope,
        Envelope::error("Disambiguation error: Mercury may refer to several pages")
    );
}

#[tokio::test]
async fn wikipedia_rejects_blank_query() {
    let host = TestHost::new("http://127.0.0.1:9");
    let envelope = host.call("search", r#"{"query": "  "}"#).await;
    assert_eq!(envelope, Envelope::error("Query is required"));
}

#[tokio::test]
async fn image_generation_without_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let host = TestHost::with(&server.uri(), |config| {
        config.image.openai_base_url = server.uri();
    });
    let envelope = host.call("generate_image", r#"{"prompt": "a lighthouse"}"#).await;

    assert!(envelope.error_message().unwrap().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn flux_without_key_names_it() {
    let host = TestHost::new("http://127.0.0.1:9");
    let envelope = host
        .call("generate_image", r#"{"prompt": "a lighthouse", "use_flux": true}"#)
        .await;

    assert!(envelope.error_message().unwrap().contains("FLUX_API_KEY"));
}

#[tokio::test]
async fn openai_image_is_staged_as_photo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({ "model": "dall-e-3", "n": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "url": format!("{}/files/img.png", server.uri()) }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/img.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG))
        .mount(&server)
        .await;

    let host = TestHost::with(&server.uri(), |config| {
        config.image.openai_base_url = server.uri();
        config.api_keys.openai = Some(SecretString::from("sk-test".to_string()));
    });
    let envelope = host.call("generate_image", r#"{"prompt": "a lighthouse"}"#).await;

    let Envelope::DirectResult(direct) = &envelope else {
        panic!("expected direct result, got {envelope:?}");
    };
    assert_eq!(direct.kind, ArtifactKind::Photo);
    assert_eq!(direct.format, ArtifactFormat::Path);

    let paths = direct_paths(&envelope);
    assert!(paths[0].contains("openai_images"));
    assert_eq!(std::fs::read(&paths[0]).unwrap(), PNG);
}

#[tokio::test]
async fn flux_image_is_staged_as_document() {
    use base64::Engine;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({
            "steps": 24,
            "width": 512,
            "height": 768,
            "response_format": "b64_json"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": base64::engine::general_purpose::STANDARD.encode(PNG) }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let host = TestHost::with(&server.uri(), |config| {
        config.image.flux_base_url = Some(server.uri());
        config.image.size = "512x768".to_string();
        config.api_keys.flux = Some(SecretString::from("flux-test".to_string()));
    });
    let envelope = host
        .call("generate_image", r#"{"prompt": "a lighthouse", "use_flux": true}"#)
        .await;

    let Envelope::DirectResult(direct) = &envelope else {
        panic!("expected direct result, got {envelope:?}");
    };
    assert_eq!(direct.kind, ArtifactKind::Document);
    assert_eq!(host.staged("flux_images"), 1);
}

#[tokio::test]
async fn latex_is_rendered_and_staged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/png.image"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG),
        )
        .expect(1)
        .mount(&server)
        .await;

    let host = TestHost::new(&server.uri());
    let envelope = host.call("latex_to_image", r#"{"expression": "E = mc^2"}"#).await;

    let Envelope::DirectResult(direct) = &envelope else {
        panic!("expected direct result, got {envelope:?}");
    };
    assert_eq!(direct.kind, ArtifactKind::Photo);
    assert_eq!(host.staged("latex_images"), 1);
}

#[tokio::test]
async fn repeated_latex_failures_leave_no_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>error</html>"),
        )
        .mount(&server)
        .await;
    let host = TestHost::new(&server.uri());

    for _ in 0..3 {
        let envelope = host.call("latex_to_image", r#"{"expression": "\\frac{1}{0"}"#).await;
        assert!(
            envelope
                .error_message()
                .unwrap()
                .starts_with("Unable to convert LaTeX expression to image")
        );
    }

    assert_eq!(host.staged("latex_images"), 0);
}

#[tokio::test]
async fn moderator_posts_to_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": "@news", "text": "Release day" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 77 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let host = TestHost::with(&server.uri(), |config| {
        config.telegram.moderator_token = Some(SecretString::from("123:abc".to_string()));
        config.telegram.channel_id = Some("@news".to_string());
    });
    let envelope = host
        .call("telegram_moderator", r#"{"action": "send", "message_text": "Release day"}"#)
        .await;

    assert_eq!(
        envelope,
        Envelope::result(json!({
            "status": "success",
            "action": "send",
            "details": { "chat_id": "@news", "message_ids": [77] }
        }))
    );
}

#[tokio::test]
async fn moderator_surfaces_bot_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let host = TestHost::with(&server.uri(), |config| {
        config.telegram.moderator_token = Some(SecretString::from("123:abc".to_string()));
        config.telegram.channel_id = Some("-100123".to_string());
    });
    let envelope = host
        .call("telegram_moderator", r#"{"action": "send", "message_text": "hi"}"#)
        .await;

    assert_eq!(
        envelope,
        Envelope::error("Telegram error: Bad Request: chat not found")
    );
}

#[tokio::test]
async fn moderator_rejects_unknown_action() {
    let host = TestHost::new("http://127.0.0.1:9");
    let envelope = host
        .call("telegram_moderator", r#"{"action": "delete", "message_text": "hi"}"#)
        .await;

    assert!(envelope.error_message().unwrap().contains("must be one of"));
}
