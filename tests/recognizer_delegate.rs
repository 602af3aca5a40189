use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use attendanced::recognizer::{
    process_transient_frame, ExternalRecognizer, FrameAnalysis, Recognizer, RecognizerError,
};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write stub script");
    path
}

fn frame_file(dir: &Path) -> PathBuf {
    let path = dir.join("frame.jpg");
    std::fs::write(&path, b"not-really-a-jpeg").expect("write frame");
    path
}

#[cfg(unix)]
mod external {
    use super::*;

    #[tokio::test]
    async fn parses_delegate_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(
            dir.path(),
            "ok.sh",
            r#"cp "$1" "$1.seen"
echo '{"faces":[{"x":10,"y":20,"width":30,"height":40,"recognized":true,"name":"Amara Osei","student_id":"S1","confidence":0.91},{"x":1,"y":2,"width":3,"height":4,"recognized":false,"name":"Unknown","confidence":0}],"total_faces":2}'
"#,
        );
        let frame = frame_file(dir.path());

        let recognizer = ExternalRecognizer::new("/bin/sh", script, Duration::from_secs(10));
        let analysis = recognizer
            .recognize(&frame, "class-1", "terminal-1")
            .await
            .expect("delegate output parses");

        assert_eq!(analysis.total_faces, 2);
        assert_eq!(analysis.faces.len(), 2);
        let hit = &analysis.faces[0];
        assert!(hit.recognized);
        assert_eq!(hit.student_id.as_deref(), Some("S1"));
        assert_eq!(hit.name, "Amara Osei");
        assert!(hit.confidence > 0.9);
        assert!(!analysis.faces[1].recognized);

        // The delegate really received the frame path as its first argument.
        assert!(dir.path().join("frame.jpg.seen").exists());
    }

    #[tokio::test]
    async fn delegate_error_field_is_a_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(
            dir.path(),
            "error.sh",
            "echo '{\"error\":\"Could not load image\"}'\n",
        );
        let frame = frame_file(dir.path());

        let recognizer = ExternalRecognizer::new("/bin/sh", script, Duration::from_secs(10));
        let err = recognizer
            .recognize(&frame, "class-1", "terminal-1")
            .await
            .expect_err("error field fails");
        match err {
            RecognizerError::Failed(msg) => assert_eq!(msg, "Could not load image"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(
            dir.path(),
            "crash.sh",
            "echo 'traceback: boom' 1>&2\nexit 3\n",
        );
        let frame = frame_file(dir.path());

        let recognizer = ExternalRecognizer::new("/bin/sh", script, Duration::from_secs(10));
        let err = recognizer
            .recognize(&frame, "class-1", "terminal-1")
            .await
            .expect_err("nonzero exit fails");
        match err {
            RecognizerError::Failed(msg) => assert!(msg.contains("boom"), "message: {msg}"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_stdout_is_bad_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "garbage.sh", "echo 'this is not json'\n");
        let frame = frame_file(dir.path());

        let recognizer = ExternalRecognizer::new("/bin/sh", script, Duration::from_secs(10));
        let err = recognizer
            .recognize(&frame, "class-1", "terminal-1")
            .await
            .expect_err("garbage fails");
        assert!(matches!(err, RecognizerError::BadOutput(_)));
    }

    #[tokio::test]
    async fn slow_delegate_hits_the_hard_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "slow.sh", "sleep 30\n");
        let frame = frame_file(dir.path());

        let recognizer = ExternalRecognizer::new("/bin/sh", script, Duration::from_secs(1));
        let started = Instant::now();
        let err = recognizer
            .recognize(&frame, "class-1", "terminal-1")
            .await
            .expect_err("slow delegate times out");

        assert!(matches!(err, RecognizerError::Timeout(_)));
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "caller must not hang for the delegate's full runtime"
        );
    }
}

struct StubRecognizer {
    result: Mutex<Option<Result<FrameAnalysis, RecognizerError>>>,
    saw_frame_on_disk: Mutex<Option<bool>>,
}

impl StubRecognizer {
    fn new(result: Result<FrameAnalysis, RecognizerError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            saw_frame_on_disk: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Recognizer for StubRecognizer {
    async fn recognize(
        &self,
        frame: &Path,
        _class_id: &str,
        _terminal_id: &str,
    ) -> Result<FrameAnalysis, RecognizerError> {
        *self.saw_frame_on_disk.lock().expect("stub lock") = Some(frame.exists());
        self.result
            .lock()
            .expect("stub lock")
            .take()
            .expect("single use")
    }
}

#[tokio::test]
async fn transient_frame_is_removed_after_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames_dir = dir.path().join("frames");
    let stub = StubRecognizer::new(Ok(FrameAnalysis::default()));

    let result =
        process_transient_frame(&stub, &frames_dir, "terminal-1", "class-1", b"frame-bytes")
            .await;

    assert!(result.is_ok());
    assert_eq!(*stub.saw_frame_on_disk.lock().expect("stub lock"), Some(true));
    assert_dir_empty(&frames_dir);
}

#[tokio::test]
async fn transient_frame_is_removed_after_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames_dir = dir.path().join("frames");
    let stub = StubRecognizer::new(Err(RecognizerError::Failed("delegate crashed".into())));

    let result =
        process_transient_frame(&stub, &frames_dir, "terminal-1", "class-1", b"frame-bytes")
            .await;

    assert!(matches!(result, Err(RecognizerError::Failed(_))));
    assert_dir_empty(&frames_dir);
}

#[cfg(unix)]
#[tokio::test]
async fn transient_frame_is_removed_after_timeout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames_dir = dir.path().join("frames");
    let script = write_script(dir.path(), "slow.sh", "sleep 30\n");
    let recognizer = ExternalRecognizer::new("/bin/sh", script, Duration::from_secs(1));

    let result = process_transient_frame(
        &recognizer,
        &frames_dir,
        "terminal-1",
        "class-1",
        b"frame-bytes",
    )
    .await;

    assert!(matches!(result, Err(RecognizerError::Timeout(_))));
    assert_dir_empty(&frames_dir);
}

#[tokio::test]
async fn concurrent_terminals_get_distinct_frame_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames_dir = dir.path().join("frames");

    struct PathCollector(Mutex<Vec<PathBuf>>);

    #[async_trait]
    impl Recognizer for PathCollector {
        async fn recognize(
            &self,
            frame: &Path,
            _class_id: &str,
            _terminal_id: &str,
        ) -> Result<FrameAnalysis, RecognizerError> {
            self.0.lock().expect("collector lock").push(frame.to_path_buf());
            Ok(FrameAnalysis::default())
        }
    }

    let collector = PathCollector(Mutex::new(Vec::new()));
    for _ in 0..3 {
        process_transient_frame(&collector, &frames_dir, "terminal-1", "class-1", b"frame")
            .await
            .expect("stub succeeds");
    }

    let paths = collector.0.lock().expect("collector lock");
    assert_eq!(paths.len(), 3);
    let unique: std::collections::HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), 3, "paths must not collide: {paths:?}");
    assert_dir_empty(&frames_dir);
}

fn assert_dir_empty(dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .expect("frames dir exists")
        .collect();
    assert!(leftovers.is_empty(), "transient files left behind: {leftovers:?}");
}
