use async_trait::async_trait;
use axum::body::Bytes;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use text_reader::{
    controllers::{
        playback::PlaybackController, section::SectionController, session::SessionController,
    },
    domain::{
        audio::{AudioDecoder, PcmFormat},
        reader::{PlaybackService, ReaderOptions, ReaderService, ReaderServiceApi, Voice},
    },
    infrastructure::{
        http::create_router,
        repositories::{
            RawSpeech, ReflowRepository, SessionRepository, SpeechPayload, SpeechRepository,
        },
    },
};
use tokio::net::TcpListener;

pub mod api_client;

use api_client::TestClient;

/// Three sections at the section size used by the tests
pub const SAMPLE_TEXT: &str = "First sentence here. Second one follows. Third closes it.";
pub const SECTION_CHARS: usize = 20;
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;
pub const SAMPLE_RATE: u32 = 24000;
/// Samples returned by the fake speech provider for every request
pub const FAKE_SAMPLES: [i16; 4] = [0, 8192, -8192, 0];

pub struct FakeReflow;

#[async_trait]
impl ReflowRepository for FakeReflow {
    fn provider(&self) -> &'static str {
        "fake-reflow"
    }

    async fn reflow(&self, text: &str) -> Result<String, String> {
        Ok(text.replace(". ", ".\n"))
    }
}

/// Speech fake that records voices and fails for any text containing a registered marker
#[derive(Default)]
pub struct FakeSpeech {
    voices: Mutex<Vec<Voice>>,
    fail_on: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn fail_on(&self, marker: &str) {
        self.fail_on.lock().unwrap().push(marker.to_string());
    }

    pub fn recover(&self) {
        self.fail_on.lock().unwrap().clear();
    }

    pub fn voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechRepository for FakeSpeech {
    fn provider(&self) -> &'static str {
        "fake-speech"
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<RawSpeech, String> {
        self.voices.lock().unwrap().push(voice);
        let failing = self
            .fail_on
            .lock()
            .unwrap()
            .iter()
            .any(|marker| text.contains(marker.as_str()));
        if failing {
            return Err("No audio payload returned".to_string());
        }

        let pcm: Vec<u8> = FAKE_SAMPLES.iter().flat_map(|s| s.to_le_bytes()).collect();
        Ok(RawSpeech {
            payload: SpeechPayload::Pcm(Bytes::from(pcm)),
            format: PcmFormat::mono(SAMPLE_RATE),
        })
    }
}

/// A running server plus the handles tests reach into
pub struct TestApp {
    pub client: TestClient,
    pub reader: Arc<ReaderService>,
}

/// Build the full stack over `state_dir` and serve it on an ephemeral port
pub async fn spawn_app(state_dir: &Path, export_dir: &Path, speech: Arc<FakeSpeech>) -> TestApp {
    let session_repo = Arc::new(SessionRepository::new(state_dir));
    let reader = Arc::new(ReaderService::new(
        Arc::new(FakeReflow),
        speech,
        session_repo,
        AudioDecoder::shared(),
        ReaderOptions {
            max_section_chars: SECTION_CHARS,
            page_generation_delay: Duration::from_millis(5),
            bulk_download_delay: Duration::from_millis(5),
            reflow_cache_enabled: false,
        },
    ));
    reader.restore().await.expect("Failed to restore state");

    let playback = Arc::new(PlaybackService::new(
        reader.clone(),
        Duration::from_millis(50),
    ));
    let session_controller = Arc::new(SessionController::new(reader.clone(), playback.clone()));
    let section_controller = Arc::new(SectionController::new(
        reader.clone(),
        export_dir.to_path_buf(),
    ));
    let playback_controller = Arc::new(PlaybackController::new(playback));

    let app = create_router(
        reader.clone(),
        session_controller,
        section_controller,
        playback_controller,
        MAX_UPLOAD_BYTES,
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        client: TestClient::new(&format!("http://{}", addr)),
        reader,
    }
}

pub struct TestContext {
    pub client: TestClient,
    #[allow(dead_code)]
    pub reader: Arc<ReaderService>,
    pub speech: Arc<FakeSpeech>,
    pub state_dir: TempDir,
    pub export_dir: TempDir,
}

impl TestContext {
    /// Upload `SAMPLE_TEXT` as `novel.txt`
    pub async fn load_sample(&self) {
        self.client
            .post_bytes("/api/session?file_name=novel.txt", SAMPLE_TEXT.as_bytes())
            .await
            .unwrap()
            .assert_status(hyper::StatusCode::CREATED);
    }

    pub async fn generate(&self, index: usize) {
        self.client
            .post_empty(&format!("/api/sections/{}/generate", index))
            .await
            .unwrap()
            .assert_status(hyper::StatusCode::OK);
    }
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let state_dir = tempfile::tempdir().expect("Failed to create state dir");
            let export_dir = tempfile::tempdir().expect("Failed to create export dir");
            let speech = Arc::new(FakeSpeech::default());

            let app = spawn_app(state_dir.path(), export_dir.path(), speech.clone()).await;

            Self {
                client: app.client,
                reader: app.reader,
                speech,
                state_dir,
                export_dir,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // Temporary directories are removed on drop
        }
    }
}

/// Poll `/api/playback` until `done` accepts the body or the deadline passes
pub async fn wait_for_playback<F>(client: &TestClient, done: F) -> serde_json::Value
where
    F: Fn(&serde_json::Value) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = client.get("/api/playback").await.unwrap();
        let body = response.body.clone().unwrap_or_default();
        if done(&body) || tokio::time::Instant::now() > deadline {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
