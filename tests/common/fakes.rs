//! Fake extractor, converter, storage and reporter implementations

use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use videodl::{
    ConversionPlan, DownloadRequest, Error, JobOptions, MediaConverter, MediaExtractor, MediaInfo,
    ProgressReporter, ProgressSnapshot, Result, Stage, StorageUploader,
};

/// Create a sparse file of `size` bytes
pub fn sparse_file(path: &Path, size: u64) {
    let file = File::create(path).expect("create file");
    file.set_len(size).expect("set file length");
}

/// What the fake extractor does when asked to download
#[derive(Clone, Debug)]
pub enum DownloadBehavior {
    /// Write `video.<ext>` of `size` bytes, reporting `samples` progress samples
    WriteFile {
        /// File size
        size: u64,
        /// File extension
        ext: &'static str,
        /// Number of progress samples to report
        samples: u64,
        /// Pause between samples
        pause: Duration,
    },
    /// Fail with the given error
    Fail(Error),
    /// Never finish on its own; only returns once cancelled
    Hang,
}

impl DownloadBehavior {
    /// Write an mp4 of `size` bytes immediately
    pub fn file(size: u64) -> Self {
        DownloadBehavior::WriteFile {
            size,
            ext: "mp4",
            samples: 1,
            pause: Duration::ZERO,
        }
    }
}

/// Scriptable [`MediaExtractor`]
pub struct FakeExtractor {
    /// Probe result
    pub probe: Result<MediaInfo>,
    /// Download behavior
    pub behavior: DownloadBehavior,
    /// Number of probe calls
    pub probe_calls: AtomicUsize,
    /// Number of download calls
    pub download_calls: AtomicUsize,
    /// Set once a hanging download observed the abandon signal
    pub saw_cancel: AtomicBool,
}

impl FakeExtractor {
    /// Extractor whose probe returns `info` and whose download does `behavior`
    pub fn new(info: MediaInfo, behavior: DownloadBehavior) -> Self {
        Self {
            probe: Ok(info),
            behavior,
            probe_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            saw_cancel: AtomicBool::new(false),
        }
    }

    /// Extractor that downloads an mp4 of `size` bytes with compatible codecs
    pub fn with_file(size: u64) -> Self {
        Self::new(compatible_info(), DownloadBehavior::file(size))
    }
}

/// Probe metadata for a compatible mp4 from a video site
pub fn compatible_info() -> MediaInfo {
    MediaInfo {
        id: Some("abc123".into()),
        title: Some("Test Clip".into()),
        extractor: Some("youtube".into()),
        vcodec: Some("avc1.64001F".into()),
        acodec: Some("mp4a.40.2".into()),
        ext: Some("mp4".into()),
        ..Default::default()
    }
}

impl MediaExtractor for FakeExtractor {
    fn probe(
        &self,
        _url: &str,
        _options: &JobOptions,
        _cancel: &CancellationToken,
    ) -> Result<MediaInfo> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.clone()
    }

    fn download(
        &self,
        request: &DownloadRequest<'_>,
        progress: &dyn Fn(ProgressSnapshot),
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            DownloadBehavior::WriteFile {
                size,
                ext,
                samples,
                pause,
            } => {
                let path = request.work_dir.join(format!("video.{ext}"));
                for i in 1..=*samples {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    progress(ProgressSnapshot {
                        stage: Some(Stage::Downloading),
                        downloaded_bytes: size * i / samples.max(&1),
                        total_bytes: Some(*size),
                        speed_bps: Some(1_048_576.0),
                        eta: Some(Duration::from_secs(samples - i)),
                        filename: Some(path.display().to_string()),
                        ..Default::default()
                    });
                    std::thread::sleep(*pause);
                }
                sparse_file(&path, *size);
                Ok(path)
            }
            DownloadBehavior::Fail(e) => Err(e.clone()),
            DownloadBehavior::Hang => {
                let started = Instant::now();
                while !cancel.is_cancelled() {
                    if started.elapsed() > Duration::from_secs(30) {
                        return Err(Error::Extraction("fake hang gave up".into()));
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                self.saw_cancel.store(true, Ordering::SeqCst);
                Err(Error::Cancelled)
            }
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Converter that writes an output of a fixed size and records its inputs
pub struct FakeConverter {
    /// Size of every converted file
    pub output_size: u64,
    /// (input path, input size at conversion time) per call
    pub calls: Mutex<Vec<(PathBuf, u64)>>,
}

impl FakeConverter {
    /// Converter producing files of `output_size` bytes
    pub fn new(output_size: u64) -> Self {
        Self {
            output_size,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of conversions performed
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

impl MediaConverter for FakeConverter {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        _plan: &ConversionPlan,
        _cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let input_size = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
        self.calls
            .lock()
            .expect("lock")
            .push((input.to_path_buf(), input_size));
        sparse_file(output, self.output_size);
        Ok(output.to_path_buf())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Storage that records uploads and returns a predictable link
#[derive(Default)]
pub struct FakeStorage {
    /// (object name, file size at upload time) per call
    pub uploads: Mutex<Vec<(String, u64)>>,
    /// Fail every upload
    pub fail: bool,
}

impl FakeStorage {
    /// Storage whose uploads always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Recorded uploads
    pub fn uploads(&self) -> Vec<(String, u64)> {
        self.uploads.lock().expect("lock").clone()
    }
}

#[async_trait]
impl StorageUploader for FakeStorage {
    async fn upload(&self, path: &Path, object_name: &str) -> Result<String> {
        let size = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|e| Error::StorageUpload(e.to_string()))?;
        self.uploads
            .lock()
            .expect("lock")
            .push((object_name.to_string(), size));
        if self.fail {
            return Err(Error::StorageUpload("bucket unavailable".into()));
        }
        Ok(format!("https://storage.test/videos/{object_name}"))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Reporter that records every text it receives
#[derive(Default)]
pub struct RecordingReporter {
    /// (time received, text) per report
    pub texts: Mutex<Vec<(Instant, String)>>,
    /// Fail every report after recording it
    pub fail: bool,
}

impl RecordingReporter {
    /// Texts received so far
    pub fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Times texts were received
    pub fn times(&self) -> Vec<Instant> {
        self.texts
            .lock()
            .expect("lock")
            .iter()
            .map(|(t, _)| *t)
            .collect()
    }
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn report(&self, text: &str) -> Result<()> {
        self.texts
            .lock()
            .expect("lock")
            .push((Instant::now(), text.to_string()));
        if self.fail {
            Err(Error::Network("chat api returned 429".into()))
        } else {
            Ok(())
        }
    }
}

/// Reporter whose every report takes `delay` to complete
pub struct StallingReporter {
    /// Time each report takes
    pub delay: Duration,
    calls: AtomicUsize,
}

impl StallingReporter {
    /// Reporter stalling for `delay` per report
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of reports started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressReporter for StallingReporter {
    async fn report(&self, _text: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
