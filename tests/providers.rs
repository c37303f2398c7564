//! Integration tests for the balancer variants using wiremock.
//!
//! Each balancer is pointed at a mock server through its `api_url` and
//! driven over the real reqwest transport.

use std::sync::Arc;

use balancers::balancer::BalancerKind;
use balancers::{Balancer, HttpClient, ProviderConfig, SearchQuery};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build(kind: BalancerKind, server: &MockServer, token: Option<&str>) -> Arc<dyn Balancer> {
    let config = ProviderConfig {
        name: kind.name().into(),
        api_url: server.uri(),
        token: token.map(Into::into),
        priority: 1,
        ..ProviderConfig::default()
    };
    kind.build(config, Arc::new(HttpClient::new().unwrap()))
}

mod cdn_tests {
    use super::*;

    #[tokio::test]
    async fn search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Dune"))
            .and(query_param("kp", "409424"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "id": 10, "title": "Дюна", "voice": "Дубляж", "quality": "1080p", "url": "https://cdn.test/10", "type": "movie" },
                    { "kpId": "409424", "voice": "Оригинал" }
                ]
            })))
            .mount(&server)
            .await;

        let videodb = build(BalancerKind::Videodb, &server, None);
        let results = videodb
            .search(&SearchQuery::new("Dune").with_kp_id("409424"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].balancer, "videodb");
        assert_eq!(results[0].content_id, "10");
        assert_eq!(results[0].kind.as_deref(), Some("movie"));
        assert_eq!(results[1].content_id, "409424");
        // Missing title falls back to the query
        assert_eq!(results[1].title, "Dune");
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let svetacdn = build(BalancerKind::Svetacdn, &server, None);
        let err = svetacdn.search(&SearchQuery::new("Dune")).await.unwrap_err();
        assert!(err.to_string().contains("503"), "unexpected error: {err}");
        assert!(!err.is_not_implemented());
    }

    #[tokio::test]
    async fn navigation_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/seasons"))
            .and(query_param("id", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "seasons": [{ "id": "s1", "number": 1 }, { "id": "s2", "title": "Второй", "number": 2 }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/episodes"))
            .and(query_param("id", "s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "e1", "number": 1, "url": "https://cdn.test/e1.m3u8" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/direct"))
            .and(query_param("id", "e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "https://cdn.test/e1.mp4" })))
            .mount(&server)
            .await;

        let allohacdn = build(BalancerKind::Allohacdn, &server, None);

        let seasons = allohacdn.get_seasons("10").await.unwrap();
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].title, "1");
        assert_eq!(seasons[1].title, "Второй");

        let episodes = allohacdn.get_episodes("s1").await.unwrap();
        assert_eq!(episodes[0].url.as_deref(), Some("https://cdn.test/e1.m3u8"));

        let link = allohacdn.get_direct_link("e1").await.unwrap();
        assert_eq!(link.as_deref(), Some("https://cdn.test/e1.mp4"));
    }
}

mod kodik_tests {
    use super::*;

    #[tokio::test]
    async fn token_travels_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("token", "kodik-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "id": "movie-1",
                    "title": "Дюна",
                    "translation": { "title": "Кубик в Кубе" },
                    "link": "//kodik.test/video/1",
                    "quality": "WEB-DLRip 720p"
                }]
            })))
            .mount(&server)
            .await;

        let kodik = build(BalancerKind::Kodik, &server, Some("kodik-key"));
        let results = kodik.search(&SearchQuery::new("Dune")).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].voice.as_deref(), Some("Кубик в Кубе"));
        assert_eq!(results[0].url.as_deref(), Some("//kodik.test/video/1"));
    }

    #[tokio::test]
    async fn streams_come_from_list_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(query_param("id", "movie-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "id": "t1", "translation": { "title": "AniLibria" }, "link": "//kodik.test/1" }]
            })))
            .mount(&server)
            .await;

        let kodik = build(BalancerKind::Kodik, &server, Some("kodik-key"));
        let streams = kodik.get_streams("movie-1").await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].voice.as_deref(), Some("AniLibria"));
    }

    #[tokio::test]
    async fn no_token_means_no_requests() {
        let server = MockServer::start().await;
        let kodik = build(BalancerKind::Kodik, &server, None);

        assert!(!kodik.is_available());
        assert!(kodik.search(&SearchQuery::new("Dune")).await.unwrap().is_empty());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}

mod bearer_tests {
    use super::*;

    #[tokio::test]
    async fn filmix_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer filmix-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "id": 1, "title": "Дюна" }]
            })))
            .mount(&server)
            .await;

        let filmix = build(BalancerKind::Filmix, &server, Some("filmix-key"));
        let results = filmix.search(&SearchQuery::new("Dune")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].balancer, "filmix");
    }

    #[tokio::test]
    async fn kinopub_sends_device_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer kp-key"))
            .and(query_param("device_id", "tv-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [{ "id": 5 }] })))
            .mount(&server)
            .await;

        let config = ProviderConfig {
            name: "kinopub".into(),
            api_url: server.uri(),
            token: Some("kp-key".into()),
            device_id: Some("tv-1".into()),
            ..ProviderConfig::default()
        };
        let kinopub = BalancerKind::Kinopub.build(config, Arc::new(HttpClient::new().unwrap()));
        let results = kinopub.search(&SearchQuery::new("Dune")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content_id, "5");
    }
}

mod rezka_tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <a href="/films/1-dune.html">Дюна</a>
        <a href="/films/2-dune-2.html">Дюна 2</a>
    </body></html>"#;

    #[tokio::test]
    async fn search_scrapes_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Dune"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let rezka = build(BalancerKind::Rezka, &server, None);
        let results = rezka.search(&SearchQuery::new("Dune")).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "Дюна 2");
        assert_eq!(results[1].content_id, "/films/2-dune-2.html");
    }

    #[tokio::test]
    async fn json_answer_counts_as_nothing_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "captcha" })))
            .mount(&server)
            .await;

        let rezka = build(BalancerKind::Rezka, &server, None);
        assert!(rezka.search(&SearchQuery::new("Dune")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn direct_link_from_player_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/films/1-dune.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<video><source src="https://cdn.test/dune.m3u8"></video>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let rezka = build(BalancerKind::Rezka, &server, None);
        let link = rezka.get_direct_link("/films/1-dune.html").await.unwrap();
        assert_eq!(link.as_deref(), Some("https://cdn.test/dune.m3u8"));
    }
}

mod vibix_tests {
    use super::*;

    fn video() -> serde_json::Value {
        json!({
            "name_rus": "Дюна",
            "iframe_url": "https://vibix.test/embed/409424",
            "quality": "1080p",
            "type": "serial",
            "voiceovers": [{ "id": 1, "name": "Дубляж" }]
        })
    }

    #[tokio::test]
    async fn search_falls_back_from_kp_to_imdb() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/kp/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/imdb/tt1160419"))
            .and(header("Authorization", "Bearer vibix-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(video()))
            .mount(&server)
            .await;

        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));
        let query = SearchQuery::new("Dune").with_kp_id("1").with_imdb_id("tt1160419");
        let results = vibix.search(&query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content_id, "imdb:tt1160419");
        assert_eq!(results[0].title, "Дюна");
        assert_eq!(results[0].url.as_deref(), Some("https://vibix.test/embed/409424"));
    }

    #[tokio::test]
    async fn kp_server_error_falls_back_to_imdb() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/kp/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/imdb/tt1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(video()))
            .mount(&server)
            .await;

        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));
        let query = SearchQuery::new("Dune").with_kp_id("1").with_imdb_id("tt1");
        let results = vibix.search(&query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content_id, "imdb:tt1");
    }

    #[tokio::test]
    async fn last_lookup_error_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/kp/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/imdb/tt1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));
        let query = SearchQuery::new("Dune").with_kp_id("1").with_imdb_id("tt1");
        let err = vibix.search(&query).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn search_without_ids_is_empty() {
        let server = MockServer::start().await;
        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));
        assert!(vibix.search(&SearchQuery::new("Dune")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookups_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/kp/409424"))
            .respond_with(ResponseTemplate::new(200).set_body_json(video()))
            .expect(1)
            .mount(&server)
            .await;

        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));
        let query = SearchQuery::new("Dune").with_kp_id("409424");
        vibix.search(&query).await.unwrap();
        let streams = vibix.get_streams("kp:409424").await.unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].voice.as_deref(), Some("Дубляж"));
    }

    #[tokio::test]
    async fn seasons_and_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/kp/409424"))
            .respond_with(ResponseTemplate::new(200).set_body_json(video()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/serials/kp/409424"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "seasons": [
                    { "name": "1", "series": [{ "id": 1, "name": "1 серия" }, { "id": 2, "name": "2 серия" }] },
                    { "name": "2", "series": [] }
                ]
            })))
            .mount(&server)
            .await;

        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));

        let seasons = vibix.get_seasons("kp:409424").await.unwrap();
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].season_id, "kp:409424/1");
        assert_eq!(seasons[0].number, Some(1));

        let episodes = vibix.get_episodes("kp:409424/1").await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[1].episode_id, "kp:409424/1/2");
        assert_eq!(
            episodes[1].url.as_deref(),
            Some("https://vibix.test/embed/409424?season=1&episode=2")
        );
    }

    #[tokio::test]
    async fn direct_link_is_not_implemented() {
        let server = MockServer::start().await;
        let vibix = build(BalancerKind::Vibix, &server, Some("vibix-key"));
        let err = vibix.get_direct_link("kp:1").await.unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[tokio::test]
    async fn server_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publisher/videos/kp/7"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let vibix = build(BalancerKind::Vibix, &server, Some("bad-key"));
        let err = vibix
            .search(&SearchQuery::new("x").with_kp_id("7"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
