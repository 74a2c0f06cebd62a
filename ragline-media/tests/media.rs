use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use ragline_core::{retry::RetryPolicy, LanguageModelError, MockDescribeImage};
use ragline_media::{
    clean_input_path, AudioProcessor, ImageProcessor, MediaDescriber, MediaError,
    MediaTranscriber, VideoProcessor, VideoTools, TEXT_NOT_FOUND,
};
use ragline_test_utils::mock_transcription;
use secrecy::SecretString;
use temp_dir::TempDir;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn transcriber(server: &MockServer, policy: RetryPolicy) -> MediaTranscriber {
    MediaTranscriber::builder()
        .endpoint(format!("{}/audio/transcriptions", server.uri()))
        .api_key(SecretString::from("test-key"))
        .retry_policy(policy)
        .build()
        .unwrap()
}

fn quick_retries() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), 1.0)
}

#[test_log::test(tokio::test)]
async fn test_uploads_multipart_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("whisper-1"))
        .and(body_string_contains("filename=\"memo.mp3\""))
        .and(body_string_contains("audio/mpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "Hello there."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = transcriber(&server, quick_retries())
        .transcribe(b"ID3".to_vec(), "memo.mp3", "audio/mpeg")
        .await;

    assert_eq!(text, "Hello there.");
}

#[test_log::test(tokio::test)]
async fn test_retries_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mock_transcription(&server, "Third time lucky.").await;

    let text = transcriber(&server, quick_retries())
        .try_transcribe(b"ID3".to_vec(), "memo.mp3", "audio/mpeg")
        .await
        .unwrap();

    assert_eq!(text, "Third time lucky.");
}

#[test_log::test(tokio::test)]
async fn test_exhausted_retries_are_tagged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(6)
        .mount(&server)
        .await;
    let transcriber = transcriber(&server, quick_retries());

    let err = transcriber
        .try_transcribe(b"ID3".to_vec(), "memo.mp3", "audio/mpeg")
        .await
        .unwrap_err();
    assert_eq!(err.attempts(), Some(3));

    let text = transcriber
        .transcribe(b"ID3".to_vec(), "memo.mp3", "audio/mpeg")
        .await;
    assert_eq!(
        text,
        "[Audio Transcription Failed: endpoint returned 503 Service Unavailable: down]"
    );
}

#[test_log::test(tokio::test)]
async fn test_invalid_mime_type_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let transcriber = transcriber(
        &server,
        RetryPolicy::new(3, Duration::from_millis(500), 1.0),
    );

    let started = std::time::Instant::now();
    let err = transcriber
        .try_transcribe(b"ID3".to_vec(), "memo.mp3", "audio mpeg")
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(matches!(err, MediaError::InvalidMimeType { .. }), "{err}");
    assert!(!err.is_transient());
    assert_eq!(err.attempts(), None);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let err = transcriber(&server, quick_retries())
        .try_transcribe_file(dir.child("gone.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::NotFound { .. }), "{err}");
}

#[test_log::test(tokio::test)]
async fn test_attempt_timeout_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "text": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let text = transcriber(&server, RetryPolicy::no_retries())
        .with_timeout(Duration::from_millis(50))
        .transcribe(b"ID3".to_vec(), "memo.mp3", "audio/mpeg")
        .await;

    assert!(text.starts_with("[Audio Transcription Failed: request failed"), "{text}");
}

#[tokio::test]
async fn test_missing_text_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let text = transcriber(&server, quick_retries())
        .transcribe(b"ID3".to_vec(), "memo.mp3", "audio/mpeg")
        .await;

    assert_eq!(text, TEXT_NOT_FOUND);
}

#[tokio::test]
async fn test_audio_report() {
    let server = MockServer::start().await;
    mock_transcription(&server, "Meeting notes.").await;
    let dir = TempDir::new().unwrap();
    let file = dir.child("memo.wav");
    std::fs::write(&file, b"RIFF").unwrap();
    let processor = AudioProcessor::new(transcriber(&server, quick_retries()));

    assert_eq!(
        processor.analyze(&file).await,
        "--- AUDIO TRANSCRIPT ---\nMeeting notes.\n--------------------------"
    );

    let missing = processor.analyze(dir.child("gone.mp3")).await;
    assert!(missing.contains("[Error] Audio file not found:"), "{missing}");
}

/// Pretends to be ffmpeg.
struct FakeTools {
    frame: Option<Vec<u8>>,
    audio: bool,
}

#[async_trait]
impl VideoTools for FakeTools {
    async fn middle_frame(&self, _video: &Path) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.frame.clone())
    }

    async fn extract_audio(&self, _video: &Path, output: &Path) -> anyhow::Result<bool> {
        if self.audio {
            std::fs::write(output, b"ID3")?;
        }
        Ok(self.audio)
    }
}

fn describer(reply: Result<&'static str, &'static str>) -> Arc<MockDescribeImage> {
    let mut describer = MockDescribeImage::new();
    describer
        .expect_describe_image()
        .withf(|_, image| image.mime_type == "image/jpeg" && image.base64 == "anBn")
        .returning(move |_, _| match reply {
            Ok(text) => Ok(text.to_string()),
            Err(error) => Err(LanguageModelError::permanent(error)),
        });
    Arc::new(describer)
}

#[test_log::test(tokio::test)]
async fn test_video_report_combines_frame_and_audio() {
    let server = MockServer::start().await;
    mock_transcription(&server, "Meow.").await;
    let scratch = TempDir::new().unwrap();

    let processor = VideoProcessor::new(
        describer(Ok("A cat on a mat.")),
        transcriber(&server, quick_retries()),
    )
    .with_tools(FakeTools {
        frame: Some(b"jpg".to_vec()),
        audio: true,
    })
    .with_scratch_dir(scratch.path());

    let report = processor.analyze("cat.mp4").await;

    assert_eq!(
        report,
        "--- VIDEO ANALYSIS REPORT ---\n1. VISUAL OBSERVATIONS:\nA cat on a mat.\n\n2. AUDIO \
         TRANSCRIPT:\nMeow.\n-----------------------------"
    );
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_video_without_frames_or_audio() {
    let server = MockServer::start().await;
    let processor = VideoProcessor::new(
        Arc::new(MockDescribeImage::new()),
        transcriber(&server, quick_retries()),
    )
    .with_tools(FakeTools {
        frame: None,
        audio: false,
    });

    let report = processor.analyze("silent.mp4").await;

    assert!(report.contains("1. VISUAL OBSERVATIONS:\nNo visual data.\n"));
    assert!(report.contains("2. AUDIO TRANSCRIPT:\n[No audio track found in video]\n"));
}

#[tokio::test]
async fn test_video_vision_failure_is_reported() {
    let server = MockServer::start().await;
    let processor = VideoProcessor::new(
        describer(Err("overloaded")),
        transcriber(&server, quick_retries()),
    )
    .with_tools(FakeTools {
        frame: Some(b"jpg".to_vec()),
        audio: false,
    });

    let report = processor.analyze("cat.mp4").await;

    assert!(
        report.contains("Visual analysis failed: Permanent error: overloaded"),
        "{report}"
    );
}

#[tokio::test]
async fn test_describer_routes_by_kind() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let notes = dir.child("notes.txt");
    std::fs::write(&notes, "hi").unwrap();

    let transcriber = transcriber(&server, quick_retries());
    let describer = MediaDescriber::new(
        ImageProcessor::new(Arc::new(MockDescribeImage::new())),
        AudioProcessor::new(transcriber.clone()),
        VideoProcessor::new(Arc::new(MockDescribeImage::new()), transcriber),
    );

    assert_eq!(
        describer.describe(&notes).await,
        "[ERROR] Unsupported file format: notes.txt"
    );
    assert!(describer
        .describe(dir.child("missing.png"))
        .await
        .starts_with("[ERROR] File not found: "));
}

#[test]
fn test_clean_input_path() {
    assert_eq!(
        clean_input_path("  \"/tmp/my clip.mp4\"\n"),
        "/tmp/my clip.mp4"
    );
    assert_eq!(clean_input_path("'photo.png'"), "photo.png");
}
