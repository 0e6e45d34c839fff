//! End-to-end run over the CLI commands: fetch, download, reconcile.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xenocanto_downloader::cli::{DownloadArgs, FetchArgs, ReconcileArgs};

const API_PATH: &str = "/api/3/recordings";

fn fetch_args(workspace: &TempDir, server: &MockServer) -> FetchArgs {
    FetchArgs {
        roster: workspace.path().join("labels.csv"),
        cache_dir: workspace.path().join("xenocanto_cache"),
        summary: workspace.path().join("fetch_summary.csv"),
        api_key: Some("test-key".to_string()),
        base_url: format!("{}{}", server.uri(), API_PATH),
        delay_ms: 0,
        country: "ZA".to_string(),
        max_recordings: 30,
        max_api_calls: 800,
    }
}

fn download_args(workspace: &TempDir) -> DownloadArgs {
    DownloadArgs {
        cache_dir: workspace.path().join("xenocanto_cache"),
        audio_dir: workspace.path().join("xeno-raw"),
        delay_ms: 0,
    }
}

async fn mount_api(server: &MockServer) {
    let recordings: Vec<_> = (1..=5)
        .map(|id| {
            json!({
                "id": id.to_string(),
                "file": format!("{}/audio/{id}", server.uri()),
                "file-name": format!("XC{id}-blackbird.mp3"),
                "q": "A",
                "length": "0:34",
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("query", "sp:\"Turdus merula\"+cnt:ZA"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numRecordings": 5,
            "numPages": 1,
            "recordings": recordings,
        })))
        .expect(1)
        .mount(server)
        .await;

    for id in 1..=5 {
        Mock::given(method("GET"))
            .and(path(format!("/audio/{id}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(format!("audio-{id}").into_bytes()),
            )
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_fetch_download_reconcile_round_trip() {
    let server = MockServer::start().await;
    mount_api(&server).await;

    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("labels.csv"),
        "birdId,birdName,scientificName\n1,Common Blackbird,Turdus merula\n",
    )
    .unwrap();

    // Fetch: one species, one page, five recordings.
    fetch_args(&workspace, &server).execute().await.unwrap();

    let cache_file = workspace
        .path()
        .join("xenocanto_cache/Turdus_merula_page1.json");
    assert!(cache_file.exists());

    let summary = std::fs::read_to_string(workspace.path().join("fetch_summary.csv")).unwrap();
    let mut lines = summary.lines();
    assert_eq!(
        lines.next(),
        Some("species,recordings_fetched,pages_requested")
    );
    assert_eq!(lines.next(), Some("Turdus merula,5,1"));

    // Download: five files appear under the species directory.
    download_args(&workspace).execute().await.unwrap();

    let species_dir = workspace.path().join("xeno-raw/Turdus_merula");
    for id in 1..=5 {
        let file = species_dir.join(format!("{id}_XC{id}-blackbird.mp3"));
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            format!("audio-{id}")
        );
    }
    assert!(species_dir.join("download_ledger.json").exists());

    // Re-running both stages replays cache and disk; the mocks' expect(1)
    // fail the test if anything goes back to the network.
    fetch_args(&workspace, &server).execute().await.unwrap();
    download_args(&workspace).execute().await.unwrap();

    // Reconcile: the roster gains availability columns.
    let output = workspace.path().join("labels_updated.csv");
    ReconcileArgs {
        roster: workspace.path().join("labels.csv"),
        cache_dir: workspace.path().join("xenocanto_cache"),
        output: output.clone(),
        in_place: false,
    }
    .execute()
    .unwrap();

    let reconciled = std::fs::read_to_string(&output).unwrap();
    let mut lines = reconciled.lines();
    assert_eq!(
        lines.next(),
        Some("birdId,birdName,scientificName,found_in_xenocanto,xenocanto_recordings")
    );
    assert_eq!(
        lines.next(),
        Some("1,Common Blackbird,Turdus merula,Yes,5")
    );
}

#[tokio::test]
async fn test_call_budget_stops_run_before_next_species() {
    let server = MockServer::start().await;
    // Only the first species' page is ever requested.
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("query", "sp:\"Turdus merula\"+cnt:ZA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numRecordings": 1,
            "numPages": 1,
            "recordings": [{"id": "1"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("labels.csv"),
        "birdId,birdName,scientificName\n\
         1,Common Blackbird,Turdus merula\n\
         2,Cape Robin-Chat,Cossypha caffra\n",
    )
    .unwrap();

    let mut args = fetch_args(&workspace, &server);
    args.max_api_calls = 1;
    args.execute().await.unwrap();

    // The second species was never fetched: the run stopped at the budget,
    // so the summary holds only the first species.
    let summary = std::fs::read_to_string(workspace.path().join("fetch_summary.csv")).unwrap();
    let rows: Vec<&str> = summary.lines().skip(1).collect();
    assert_eq!(rows, vec!["Turdus merula,1,1"]);
    assert!(!workspace
        .path()
        .join("xenocanto_cache/Cossypha_caffra_page1.json")
        .exists());
}

#[tokio::test]
async fn test_invalid_api_key_aborts_the_whole_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("labels.csv"),
        "birdId,birdName,scientificName\n\
         1,Common Blackbird,Turdus merula\n\
         2,Cape Robin-Chat,Cossypha caffra\n",
    )
    .unwrap();

    let result = fetch_args(&workspace, &server).execute().await;
    assert!(result.is_err());
    // Fatal abort: the second species was never attempted.
}
