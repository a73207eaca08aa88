//! End-to-end runs against mocked Modrinth endpoints.

use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use sha2::{Digest, Sha512};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modsync_lib::core::config::{ConfigOverrides, EngineConfig};
use modsync_lib::core::error::EngineResult;
use modsync_lib::core::matching::MatchQuality;
use modsync_lib::core::orchestrator::{EntryOutcome, Orchestrator};
use modsync_lib::core::report::{render_summary, Confirm, Decision, MatchReport, Unattended};
use modsync_lib::core::retry::RetryPolicy;

fn version(server: &MockServer, file: &str, game_versions: &[&str], body: &[u8]) -> Value {
    json!({
        "id": format!("{file}-id"),
        "version_number": "1.0.0",
        "game_versions": game_versions,
        "loaders": ["fabric"],
        "version_type": "release",
        "date_published": "2024-05-01T12:00:00Z",
        "files": [{
            "hashes": {"sha512": hex::encode(Sha512::digest(body))},
            "url": format!("{}/cdn/{file}", server.uri()),
            "filename": file,
            "primary": true,
            "size": body.len()
        }]
    })
}

async fn mount_project(server: &MockServer, slug: &str, versions: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/project/{slug}/version")))
        .and(header("Authorization", "mr-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(versions))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/cdn/{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Four Modrinth mods: two exact, one nearest, one without any version.
async fn four_mod_server() -> MockServer {
    let server = MockServer::start().await;

    mount_project(
        &server,
        "sodium",
        json!([version(&server, "sodium.jar", &["1.20.1"], b"sodium bytes")]),
    )
    .await;
    mount_project(
        &server,
        "lithium",
        json!([version(&server, "lithium.jar", &["1.20", "1.20.1"], b"lithium bytes")]),
    )
    .await;
    mount_project(
        &server,
        "iris",
        json!([version(&server, "iris.jar", &["1.20"], b"iris bytes")]),
    )
    .await;
    mount_project(&server, "abandoned", json!([])).await;

    mount_file(&server, "sodium.jar", b"sodium bytes").await;
    mount_file(&server, "lithium.jar", b"lithium bytes").await;
    mount_file(&server, "iris.jar", b"iris bytes").await;

    server
}

fn config(server: &MockServer, output_dir: &Path) -> EngineConfig {
    let raw = format!(
        r#"
game_version = "1.20.1"
output_dir = "{out}"
unattended = true

[modrinth]
api_key = "mr-key"
api_url = "{uri}/v2"

[[mods]]
name = "Sodium"
url = "https://modrinth.com/mod/sodium"

[[mods]]
name = "Lithium"
provider = "modrinth"
id = "lithium"

[[mods]]
name = "Iris"
provider = "modrinth"
id = "iris"

[[mods]]
name = "Abandoned"
provider = "modrinth"
id = "abandoned"
"#,
        out = output_dir.display().to_string().replace('\\', "/"),
        uri = server.uri(),
    );
    EngineConfig::parse(&raw, Path::new("."), ConfigOverrides::default()).unwrap()
}

fn orchestrator(config: &EngineConfig) -> Orchestrator {
    Orchestrator::with_retry(
        config,
        reqwest::Client::new(),
        RetryPolicy::new(1, Duration::ZERO),
    )
}

#[tokio::test]
async fn unattended_run_downloads_matches_and_skips_the_rest() {
    let server = four_mod_server().await;
    let out = tempfile::tempdir().unwrap();
    let config = config(&server, out.path());
    let entries = config.entries().unwrap();
    config.preflight(&entries).unwrap();

    let summary = orchestrator(&config)
        .run(&entries, &mut Unattended::default(), &CancellationToken::new())
        .await
        .unwrap();

    let qualities: Vec<_> = summary.matches.iter().map(|m| m.quality).collect();
    assert_eq!(
        qualities,
        vec![
            MatchQuality::Exact,
            MatchQuality::Exact,
            MatchQuality::Nearest,
            MatchQuality::None
        ]
    );

    let names: Vec<_> = summary.entries.iter().map(|e| e.entry.name.as_str()).collect();
    assert_eq!(names, vec!["Sodium", "Lithium", "Iris", "Abandoned"]);
    assert!(matches!(
        summary.entries[3].outcome,
        EntryOutcome::SkippedNoMatch { .. }
    ));

    let counts = summary.counts();
    assert_eq!(counts.downloaded, 3);
    assert_eq!(counts.no_match, 1);
    assert_eq!(summary.downloads.len(), 3);

    assert_eq!(std::fs::read(out.path().join("sodium.jar")).unwrap(), b"sodium bytes");
    assert_eq!(std::fs::read(out.path().join("lithium.jar")).unwrap(), b"lithium bytes");
    assert_eq!(std::fs::read(out.path().join("iris.jar")).unwrap(), b"iris bytes");
}

struct Decline;

impl Confirm for Decline {
    fn confirm(&mut self, report: &MatchReport<'_>) -> EngineResult<Decision> {
        assert_eq!(report.counts().downloadable(), 3);
        Ok(Decision::Abort)
    }
}

#[tokio::test]
async fn declining_downloads_nothing() {
    let server = four_mod_server().await;
    let out = tempfile::tempdir().unwrap();
    let config = config(&server, out.path());
    let entries = config.entries().unwrap();

    let summary = orchestrator(&config)
        .run(&entries, &mut Decline, &CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.aborted());
    assert!(summary.downloads.is_empty());
    assert_eq!(summary.counts().by_user, 3);
    assert_eq!(summary.counts().no_match, 1);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().starts_with("/cdn/")));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);

    let text = render_summary(&summary);
    let declined: Vec<_> = text
        .lines()
        .filter(|line| line.starts_with("[skipped]") && line.ends_with("declined"))
        .collect();
    assert_eq!(declined.len(), 3);
    for name in ["Sodium", "Lithium", "Iris"] {
        assert!(declined.iter().any(|line| line.contains(name)), "{name} missing");
    }
    assert!(text.contains("Abandoned"));
}

/// Records whether the report was shown and whether a question was asked.
#[derive(Default)]
struct Recorder {
    shown: usize,
    asked: usize,
}

impl Confirm for Recorder {
    fn confirm(&mut self, _report: &MatchReport<'_>) -> EngineResult<Decision> {
        self.asked += 1;
        Ok(Decision::Proceed)
    }

    fn show(&mut self, report: &MatchReport<'_>) -> EngineResult<()> {
        assert_eq!(report.results().len(), 1);
        self.shown += 1;
        Ok(())
    }
}

#[tokio::test]
async fn nothing_downloadable_still_shows_the_table() {
    let server = four_mod_server().await;
    let out = tempfile::tempdir().unwrap();
    let raw = format!(
        r#"
game_version = "1.20.1"
output_dir = "{out}"

[modrinth]
api_key = "mr-key"
api_url = "{uri}/v2"

[[mods]]
name = "Abandoned"
provider = "modrinth"
id = "abandoned"
"#,
        out = out.path().display().to_string().replace('\\', "/"),
        uri = server.uri(),
    );
    let config = EngineConfig::parse(&raw, Path::new("."), ConfigOverrides::default()).unwrap();
    let entries = config.entries().unwrap();

    let mut recorder = Recorder::default();
    let summary = orchestrator(&config)
        .run(&entries, &mut recorder, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!((recorder.shown, recorder.asked), (1, 0));
    assert!(!summary.aborted());
    assert_eq!(summary.counts().no_match, 1);
}

#[tokio::test]
async fn missing_credential_fails_only_its_entries() {
    let server = four_mod_server().await;
    let out = tempfile::tempdir().unwrap();
    let raw = format!(
        r#"
game_version = "1.20.1"
output_dir = "{out}"

[modrinth]
api_key = "mr-key"
api_url = "{uri}/v2"

[[mods]]
name = "Sodium"
provider = "modrinth"
id = "sodium"

[[mods]]
name = "Carpet"
url = "https://github.com/gnembon/fabric-carpet"
"#,
        out = out.path().display().to_string().replace('\\', "/"),
        uri = server.uri(),
    );
    let config = EngineConfig::parse(&raw, Path::new("."), ConfigOverrides::default()).unwrap();
    let entries = config.entries().unwrap();

    let summary = orchestrator(&config)
        .run(&entries, &mut Unattended::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(summary.entries[0].outcome, EntryOutcome::Downloaded { .. }));
    match &summary.entries[1].outcome {
        EntryOutcome::SkippedNoMatch { reason } => {
            assert!(reason.contains("API credential missing"), "{reason}")
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}
