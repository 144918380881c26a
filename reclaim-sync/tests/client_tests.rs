//! HTTP clients against mock Emby / Sonarr / Radarr servers

use reclaim_common::config::{BackendConfig, CatalogConfig};
use reclaim_sync::models::MediaKind;
use reclaim_sync::services::{
    ArrClient, ArrError, CatalogSource, EmbyClient, EmbyError, MovieBackend, SeriesBackend,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_config(url: &str) -> CatalogConfig {
    CatalogConfig {
        name: "Emby".to_string(),
        url: url.to_string(),
        api_key: "emby-key".to_string(),
        user_id: None,
        enabled: true,
    }
}

fn backend_config(name: &str, url: &str) -> BackendConfig {
    BackendConfig {
        name: name.to_string(),
        url: url.to_string(),
        api_key: "arr-key".to_string(),
        enabled: true,
        selected_folders: Vec::new(),
    }
}

#[tokio::test]
async fn test_catalog_listing_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/emby/Items"))
        .and(query_param("StartIndex", "0"))
        .and(query_param("IncludeItemTypes", "Movie,Series"))
        .and(header("X-Emby-Token", "emby-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [
                {"Id": "1", "Name": "The Matrix", "Type": "Movie",
                 "ProviderIds": {"Tmdb": "603"}, "ProductionYear": 1999},
                {"Id": "2", "Name": "Pilot", "Type": "Episode"}
            ],
            "TotalRecordCount": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/emby/Items"))
        .and(query_param("StartIndex", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [
                {"Id": "3", "Name": "Fargo", "Type": "Series",
                 "ProviderIds": {"Tvdb": "269613"}, "Path": "/tv/Fargo"}
            ],
            "TotalRecordCount": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = EmbyClient::new(&catalog_config(&server.uri())).unwrap();
    let items = client.list_items().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].kind, MediaKind::Movie);
    assert_eq!(items[0].provider_ids.tmdb, Some(603));
    assert_eq!(items[1].kind, MediaKind::Series);
    assert_eq!(items[1].provider_ids.tvdb, Some(269613));
}

#[tokio::test]
async fn test_catalog_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emby/Items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = EmbyClient::new(&catalog_config(&server.uri())).unwrap();
    match client.list_items().await {
        Err(EmbyError::Api(status, body)) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected API error, got {:?}", other.map(|i| i.len())),
    }
}

#[tokio::test]
async fn test_activity_query_posts_sql() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emby/user_usage_stats/submit_custom_query"))
        .and(body_partial_json(json!({"CustomQueryString": "SELECT 1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "colums": ["LastWatched", "WatchCount"],
            "results": [["2024-05-01 21:00:00", "2"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = EmbyClient::new(&catalog_config(&server.uri())).unwrap();
    let result = client.query_activity("SELECT 1").await.unwrap();

    assert_eq!(result.column("WatchCount"), Some(1));
    assert_eq!(result.results.len(), 1);
}

#[tokio::test]
async fn test_series_collection_tagged_with_instance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/series"))
        .and(header("X-Api-Key", "arr-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 12, "title": "Fargo", "tvdbId": 269613, "path": "/tv/Fargo",
             "monitored": true, "added": "2021-01-01T00:00:00Z",
             "statistics": {"sizeOnDisk": 1000, "episodeFileCount": 3, "totalEpisodeCount": 4}}
        ])))
        .mount(&server)
        .await;

    let client = ArrClient::new(&backend_config("Sonarr 4K", &server.uri())).unwrap();
    let series = client.list_series().await.unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].instance, "Sonarr 4K");
    assert_eq!(series[0].tvdb_id, Some(269613));
    assert!(series[0].added_at().is_some());
}

#[tokio::test]
async fn test_movie_collection_and_disk_space() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "title": "The Matrix", "tmdbId": 603, "sizeOnDisk": 5000000000i64,
             "movieFile": {"quality": {"quality": {"name": "Bluray-1080p"}}}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/diskspace"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"path": "/media", "label": "media", "freeSpace": 1073741824i64, "totalSpace": 4294967296i64}
        ])))
        .mount(&server)
        .await;

    let client = ArrClient::new(&backend_config("Radarr", &server.uri())).unwrap();
    let movies = client.list_movies().await.unwrap();
    assert_eq!(movies[0].instance, "Radarr");
    assert_eq!(movies[0].quality_name(), Some("Bluray-1080p"));

    let disk = MovieBackend::disk_space(&client).await.unwrap();
    assert_eq!(disk.len(), 1);
    assert_eq!(disk[0].free_space, Some(1073741824));
}

#[tokio::test]
async fn test_backend_rejects_bad_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/diskspace"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = ArrClient::new(&backend_config("Sonarr", &server.uri())).unwrap();
    let result = SeriesBackend::disk_space(&client).await;
    assert!(matches!(result, Err(ArrError::Unauthorized)));
}

#[tokio::test]
async fn test_root_folders_and_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/rootfolder"))
        .and(header("X-Api-Key", "arr-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "path": "/tv/", "accessible": true, "freeSpace": 1073741824i64}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig {
        selected_folders: vec!["/tv".to_string()],
        ..backend_config("Sonarr", &server.uri())
    };
    let client = ArrClient::new(&config).unwrap();
    let roots = SeriesBackend::root_folders(&client).await.unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].path.as_deref(), Some("/tv/"));
    assert_eq!(roots[0].free_space, Some(1073741824));
    assert_eq!(roots[0].total_space, None);
    assert_eq!(SeriesBackend::selected_folders(&client), ["/tv".to_string()]);
}
