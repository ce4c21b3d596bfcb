use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;

use crate::domain::{ClassificationResult, WasteImage};

use super::category::CategoryMap;

pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Blocking on-device inference. Returns one score per label, in label order.
pub trait InferenceBackend: Send + Sync {
    fn infer(&self, image: &WasteImage) -> Result<Vec<f32>>;
}

/// Runs an external model-runner process. The image bytes go to stdin and the
/// runner prints a JSON array of scores to stdout. A runner that outlives
/// `timeout` is killed.
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn from_command_line(command_line: &str, timeout: Duration) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program: PathBuf::from(program),
            args: parts.collect(),
            timeout,
        })
    }

    fn wait_until_deadline(&self, child: &mut Child) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    reap(child);
                    bail!("model runner timed out after {:?}", self.timeout);
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    reap(child);
                    return Err(err).context("failed to wait for model runner");
                }
            }
        }
    }
}

impl InferenceBackend for CommandBackend {
    fn infer(&self, image: &WasteImage) -> Result<Vec<f32>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("IMAGE_MIME_TYPE", &image.mime_type)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start model runner {}", self.program.display()))?;

        // Pipes are drained on their own threads so a runner that blocks on a
        // full stdout, or never reads stdin, still hits the deadline.
        let writer = child.stdin.take().map(|mut stdin| {
            let bytes = image.bytes.clone();
            thread::spawn(move || stdin.write_all(&bytes))
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait_until_deadline(&mut child)?;

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        if !status.success() {
            bail!(
                "model runner exited with {}: {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            );
        }

        match writer.map(JoinHandle::join) {
            Some(Ok(Err(err))) if err.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!(target: "classify", "model runner exited before reading the whole image");
            }
            Some(Ok(Err(err))) => return Err(err).context("failed to stream image to model runner"),
            Some(Err(_)) => bail!("image writer thread panicked"),
            Some(Ok(Ok(()))) | None => {}
        }

        let scores: Vec<f32> =
            serde_json::from_slice(&stdout).context("model runner did not print a JSON score array")?;
        Ok(scores)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| anyhow!("model runner pipe reader panicked"))?
            .context("failed to read model runner output"),
        None => Ok(Vec::new()),
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!(target: "classify", error = %err, "model runner already gone");
    }
    let _ = child.wait();
}

/// On-device classifier: a labels asset plus an inference backend.
pub struct LocalClassifier {
    labels: Vec<String>,
    backend: Mutex<Option<Arc<dyn InferenceBackend>>>,
}

impl LocalClassifier {
    pub fn new(labels: Vec<String>, backend: Arc<dyn InferenceBackend>) -> Result<Self> {
        if labels.is_empty() {
            bail!("label set is empty");
        }
        Ok(Self {
            labels,
            backend: Mutex::new(Some(backend)),
        })
    }

    pub fn load(labels_path: &Path, backend: Arc<dyn InferenceBackend>) -> Result<Self> {
        let raw = fs::read_to_string(labels_path)
            .with_context(|| format!("failed to read labels from {}", labels_path.display()))?;
        let labels = parse_labels(&raw);
        tracing::info!(
            target: "classify",
            path = %labels_path.display(),
            labels = labels.len(),
            "local model labels loaded"
        );
        Self::new(labels, backend)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.lock().is_some()
    }

    pub fn classify(&self, image: &WasteImage) -> Result<ClassificationResult> {
        let backend = self
            .backend
            .lock()
            .clone()
            .context("local model has been released")?;
        let scores = backend.infer(image)?;
        if scores.len() != self.labels.len() {
            bail!(
                "model returned {} scores for {} labels",
                scores.len(),
                self.labels.len()
            );
        }

        let (index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| !score.is_nan())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .context("model returned no usable scores")?;

        let label = &self.labels[index];
        let category = CategoryMap::global().map(label);
        tracing::debug!(target: "classify", label = %label, confidence, "local inference done");
        Ok(ClassificationResult::new(label.clone(), category, confidence))
    }

    /// Releases the backend. Later calls to `classify` fail.
    pub fn close(&self) {
        if self.backend.lock().take().is_some() {
            tracing::debug!(target: "classify", "local model released");
        }
    }
}

fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(char::is_whitespace) {
            Some((index, rest)) if index.chars().all(|c| c.is_ascii_digit()) => {
                rest.trim().to_string()
            }
            _ => line.to_string(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::WasteCategory;

    pub(crate) struct FixedScores(pub Vec<f32>);

    impl InferenceBackend for FixedScores {
        fn infer(&self, _image: &WasteImage) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn image() -> WasteImage {
        WasteImage::new(vec![0xff, 0xd8, 0xff], "image/jpeg")
    }

    #[test]
    fn labels_file_accepts_indexed_and_plain_lines() {
        let labels = parse_labels("# trashnet\n0 cardboard\n1 glass\n\nbattery\n");
        assert_eq!(labels, vec!["cardboard", "glass", "battery"]);
    }

    #[test]
    fn load_reads_labels_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "plastic\nbattery\n").unwrap();
        let classifier = LocalClassifier::load(&path, Arc::new(FixedScores(vec![0.1, 0.9]))).unwrap();
        assert_eq!(classifier.labels().len(), 2);
    }

    #[test]
    fn load_fails_for_missing_or_empty_labels() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        assert!(LocalClassifier::load(&missing, Arc::new(FixedScores(vec![]))).is_err());

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "# nothing\n").unwrap();
        assert!(LocalClassifier::load(&empty, Arc::new(FixedScores(vec![]))).is_err());
    }

    #[test]
    fn picks_highest_score_and_maps_category() {
        let classifier = LocalClassifier::new(
            vec!["plastic".into(), "battery".into(), "fruit".into()],
            Arc::new(FixedScores(vec![0.03, 0.95, 0.02])),
        )
        .unwrap();
        let result = classifier.classify(&image()).unwrap();
        assert_eq!(result.raw_label(), "battery");
        assert_eq!(result.category(), WasteCategory::Hazardous);
        assert!((result.confidence() - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let classifier =
            LocalClassifier::new(vec!["glass".into()], Arc::new(FixedScores(vec![3.5]))).unwrap();
        assert_eq!(classifier.classify(&image()).unwrap().confidence(), 1.0);
    }

    #[test]
    fn score_count_mismatch_is_an_error() {
        let classifier =
            LocalClassifier::new(vec!["glass".into(), "metal".into()], Arc::new(FixedScores(vec![0.5])))
                .unwrap();
        assert!(classifier.classify(&image()).is_err());
    }

    #[test]
    fn closed_classifier_refuses_work() {
        let classifier =
            LocalClassifier::new(vec!["glass".into()], Arc::new(FixedScores(vec![0.5]))).unwrap();
        classifier.close();
        assert!(!classifier.is_loaded());
        assert!(classifier.classify(&image()).is_err());
    }

    #[test]
    fn command_line_is_split_into_program_and_args() {
        let backend =
            CommandBackend::from_command_line("python3 runner.py --model m.tflite", DEFAULT_INFERENCE_TIMEOUT)
                .unwrap();
        assert_eq!(backend.program, PathBuf::from("python3"));
        assert_eq!(backend.args, vec!["runner.py", "--model", "m.tflite"]);
        assert!(CommandBackend::from_command_line("   ", DEFAULT_INFERENCE_TIMEOUT).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn hung_runner_is_killed_at_the_deadline() {
        let backend = CommandBackend::from_command_line("sleep 30", Duration::from_millis(200)).unwrap();
        let started = Instant::now();
        let err = backend.infer(&image()).unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err:#}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn runner_that_ignores_stdin_still_reports_scores() {
        let backend = CommandBackend::from_command_line("echo [0.9]", DEFAULT_INFERENCE_TIMEOUT).unwrap();
        let large = WasteImage::new(vec![0u8; 4 * 1024 * 1024], "image/jpeg");
        assert_eq!(backend.infer(&large).unwrap(), vec![0.9]);
    }

    #[cfg(unix)]
    #[test]
    fn failing_runner_reports_stderr() {
        let backend = CommandBackend::from_command_line("ls /definitely/not/here", DEFAULT_INFERENCE_TIMEOUT).unwrap();
        assert!(backend.infer(&image()).is_err());
    }
}
