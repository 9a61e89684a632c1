// Scripted capture backend for integration tests
//
// No process is ever launched. Spawned argument lists are recorded, segment
// files are simulated on disk and every probe/concat outcome is scripted.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use screen_replay::capture::{CaptureBackend, CaptureProcess};
use screen_replay::catalog::{RecordingCatalog, RecordingEntry, RecordingKind};
use screen_replay::{CaptureError, EncoderProfile};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// How a fake concat call behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatBehavior {
    Succeed,
    /// Runs but exits unsuccessfully
    Fail,
    /// Writes part of the output, then exits unsuccessfully
    PartialFail,
    /// Returns an error before running
    Error,
    /// Never finishes
    Hang,
}

/// Counters shared by every process a backend spawns
#[derive(Debug, Default)]
pub struct ProcessLog {
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub stop_requests: AtomicUsize,
    pub kills: AtomicUsize,
    pub start_kills: AtomicUsize,
}

impl ProcessLog {
    fn started(&self) {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
    }

    fn exited(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

pub struct FakeProcess {
    log: Arc<ProcessLog>,
    ignore_quit: bool,
    stop_requested: bool,
    exited: bool,
}

impl FakeProcess {
    pub fn new(log: Arc<ProcessLog>, ignore_quit: bool) -> Self {
        log.started();
        Self {
            log,
            ignore_quit,
            stop_requested: false,
            exited: false,
        }
    }

    fn exit(&mut self) {
        if !self.exited {
            self.exited = true;
            self.log.exited();
        }
    }
}

#[async_trait::async_trait]
impl CaptureProcess for FakeProcess {
    async fn request_stop(&mut self) -> io::Result<()> {
        self.log.stop_requests.fetch_add(1, Ordering::SeqCst);
        self.stop_requested = true;
        Ok(())
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        if self.exited {
            return Ok(None);
        }
        if self.stop_requested && !self.ignore_quit {
            self.exit();
            return Ok(Some(0));
        }
        std::future::pending().await
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.log.kills.fetch_add(1, Ordering::SeqCst);
        self.exit();
        Ok(())
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.log.start_kills.fetch_add(1, Ordering::SeqCst);
        self.exit();
        Ok(())
    }

    fn id(&self) -> Option<u32> {
        Some(4242)
    }
}

pub struct FakeBackend {
    pub log: Arc<ProcessLog>,
    spawned: Mutex<Vec<Vec<String>>>,
    fail_spawn: AtomicBool,
    ignore_quit: AtomicBool,
    write_output: AtomicBool,
    hang_probes: AtomicBool,
    segments_on_spawn: AtomicUsize,
    devices: Mutex<Option<Vec<String>>>,
    encoders: Mutex<HashMap<EncoderProfile, Result<bool, String>>>,
    encoder_tests: Mutex<Vec<EncoderProfile>>,
    concat_behavior: Mutex<ConcatBehavior>,
    manifests: Mutex<Vec<String>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Spawns succeed, output files appear, three segments per buffer
    /// session, no audio devices and no hardware encoders
    pub fn new() -> Self {
        Self {
            log: Arc::new(ProcessLog::default()),
            spawned: Mutex::new(Vec::new()),
            fail_spawn: AtomicBool::new(false),
            ignore_quit: AtomicBool::new(false),
            write_output: AtomicBool::new(true),
            hang_probes: AtomicBool::new(false),
            segments_on_spawn: AtomicUsize::new(3),
            devices: Mutex::new(Some(Vec::new())),
            encoders: Mutex::new(HashMap::new()),
            encoder_tests: Mutex::new(Vec::new()),
            concat_behavior: Mutex::new(ConcatBehavior::Succeed),
            manifests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    pub fn set_ignore_quit(&self, ignore: bool) {
        self.ignore_quit.store(ignore, Ordering::SeqCst);
    }

    pub fn set_write_output(&self, write: bool) {
        self.write_output.store(write, Ordering::SeqCst);
    }

    /// Device listing and encoder tests never finish
    pub fn set_hang_probes(&self, hang: bool) {
        self.hang_probes.store(hang, Ordering::SeqCst);
    }

    pub fn set_segments_on_spawn(&self, count: usize) {
        self.segments_on_spawn.store(count, Ordering::SeqCst);
    }

    /// `None` makes enumeration fail
    pub fn set_devices(&self, devices: Option<Vec<&str>>) {
        *self.devices.lock().unwrap() =
            devices.map(|d| d.into_iter().map(String::from).collect());
    }

    pub fn set_encoder(&self, encoder: EncoderProfile, result: Result<bool, &str>) {
        self.encoders
            .lock()
            .unwrap()
            .insert(encoder, result.map_err(String::from));
    }

    pub fn set_concat(&self, behavior: ConcatBehavior) {
        *self.concat_behavior.lock().unwrap() = behavior;
    }

    pub fn spawned(&self) -> Vec<Vec<String>> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn encoder_tests(&self) -> Vec<EncoderProfile> {
        self.encoder_tests.lock().unwrap().clone()
    }

    /// Manifest contents seen by each concat call
    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().unwrap().clone()
    }

    pub fn concat_calls(&self) -> usize {
        self.manifests.lock().unwrap().len()
    }

    fn simulate_output(&self, args: &[String]) -> io::Result<()> {
        let Some(target) = args.last() else {
            return Ok(());
        };
        let target = Path::new(target);

        if args.iter().any(|a| a == "segment") {
            let Some(dir) = target.parent() else {
                return Ok(());
            };
            let count = self.segments_on_spawn.load(Ordering::SeqCst);
            let base = SystemTime::now() - Duration::from_secs(count as u64 + 1);
            for i in 0..count {
                let path = dir.join(format!("buffer_{:04}.mp4", i));
                let modified = base + Duration::from_secs(i as u64);
                write_with_mtime(&path, format!("segment {}", i).as_bytes(), modified)?;
            }
        } else if self.write_output.load(Ordering::SeqCst) {
            fs::write(target, b"fulltime")?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FakeBackend {
    async fn spawn(&self, args: &[String]) -> Result<Box<dyn CaptureProcess>, CaptureError> {
        self.spawned.lock().unwrap().push(args.to_vec());

        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(CaptureError::Spawn("fake backend refused to start".to_string()));
        }

        self.simulate_output(args)?;

        Ok(Box::new(FakeProcess::new(
            Arc::clone(&self.log),
            self.ignore_quit.load(Ordering::SeqCst),
        )))
    }

    async fn list_audio_devices(&self) -> Result<Vec<String>> {
        if self.hang_probes.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.devices
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("device enumeration failed"))
    }

    async fn test_encoder(&self, encoder: &EncoderProfile) -> Result<bool> {
        self.encoder_tests.lock().unwrap().push(*encoder);
        if self.hang_probes.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        match self.encoders.lock().unwrap().get(encoder) {
            Some(Ok(ok)) => Ok(*ok),
            Some(Err(e)) => Err(anyhow!("{}", e)),
            None => Ok(false),
        }
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<bool> {
        self.manifests
            .lock()
            .unwrap()
            .push(fs::read_to_string(manifest)?);

        // Like the concat demuxer, relative entries resolve against the
        // manifest's directory and a missing input fails the join
        let base = manifest.parent().unwrap_or(Path::new(""));
        let all_present = manifest_entries(manifest)?
            .iter()
            .all(|entry| base.join(entry).exists());
        if !all_present {
            return Ok(false);
        }

        let behavior = *self.concat_behavior.lock().unwrap();
        match behavior {
            ConcatBehavior::Succeed => {
                fs::write(output, b"replay")?;
                Ok(true)
            }
            ConcatBehavior::Fail => Ok(false),
            ConcatBehavior::PartialFail => {
                fs::write(output, b"repl")?;
                Ok(false)
            }
            ConcatBehavior::Error => Err(anyhow!("concat could not run")),
            ConcatBehavior::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Paths listed in a concat manifest, unescaped
pub fn manifest_entries(manifest: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(fs::read_to_string(manifest)?
        .lines()
        .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\''))
        .map(|entry| PathBuf::from(entry.replace(r"'\''", "'")))
        .collect())
}

/// Catalog that remembers every registration
#[derive(Default)]
pub struct FakeCatalog {
    records: Mutex<Vec<(PathBuf, RecordingKind)>>,
    fail: AtomicBool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<(PathBuf, RecordingKind)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordingCatalog for FakeCatalog {
    async fn record(&self, path: &Path, kind: RecordingKind) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("catalog unavailable"));
        }
        let mut records = self.records.lock().unwrap();
        records.push((path.to_path_buf(), kind));
        Ok(format!("rec-{}", records.len()))
    }

    async fn list(&self) -> Result<Vec<RecordingEntry>> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: &str) -> Result<Option<RecordingEntry>> {
        Ok(None)
    }

    async fn delete(&self, _id: &str, _delete_file: bool) -> Result<bool> {
        Ok(false)
    }
}

/// Create `path` with `contents` and an explicit modification time
pub fn write_with_mtime(path: &Path, contents: &[u8], modified: SystemTime) -> io::Result<()> {
    fs::write(path, contents)?;
    File::options().write(true).open(path)?.set_modified(modified)
}
