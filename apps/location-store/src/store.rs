use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

const CSV_HEADERS: [&str; 2] = ["latitude", "longitude"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed { rows: usize },
    NotFound,
}

/// Locations persisted as a two-column CSV file with a header row.
///
/// Coordinates are compared with exact float equality, both for duplicate
/// detection on save and for matching on remove.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            store.write_all(&[])?;
            tracing::info!(path=%store.path.display(), "created empty location file");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<Location>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut locations = Vec::new();
        for row in reader.deserialize::<Location>() {
            let location =
                row.with_context(|| format!("malformed row in {}", self.path.display()))?;
            locations.push(location);
        }
        Ok(locations)
    }

    pub fn save(&self, location: Location) -> Result<SaveOutcome> {
        if self.read_all()?.contains(&location) {
            return Ok(SaveOutcome::AlreadyExists);
        }

        let file = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {} for append", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(location)?;
        writer.flush()?;
        Ok(SaveOutcome::Saved)
    }

    pub fn remove(&self, location: Location) -> Result<RemoveOutcome> {
        let existing = self.read_all()?;
        let remaining: Vec<Location> = existing
            .iter()
            .copied()
            .filter(|loc| *loc != location)
            .collect();

        if remaining.len() == existing.len() {
            return Ok(RemoveOutcome::NotFound);
        }

        self.write_all(&remaining)?;
        Ok(RemoveOutcome::Removed {
            rows: existing.len() - remaining.len(),
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.write_all(&[])
    }

    fn write_all(&self, locations: &[Location]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {} for write", self.path.display()))?;
        writer.write_record(CSV_HEADERS)?;
        for location in locations {
            writer.serialize(location)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum StoreCommand {
    List {
        respond_to: oneshot::Sender<Result<Vec<Location>>>,
    },
    Save {
        location: Location,
        respond_to: oneshot::Sender<Result<SaveOutcome>>,
    },
    Remove {
        location: Location,
        respond_to: oneshot::Sender<Result<RemoveOutcome>>,
    },
    Clear {
        respond_to: oneshot::Sender<Result<()>>,
    },
}

/// Async front for the store thread; every file operation runs there, one at a time.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::UnboundedSender<StoreCommand>) -> Self {
        Self { tx }
    }

    pub async fn list(&self) -> Result<Vec<Location>> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::List { respond_to: tx })?;
        rx.await.context("store thread dropped response")?
    }

    pub async fn save(&self, location: Location) -> Result<SaveOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Save {
            location,
            respond_to: tx,
        })?;
        rx.await.context("store thread dropped response")?
    }

    pub async fn remove(&self, location: Location) -> Result<RemoveOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Remove {
            location,
            respond_to: tx,
        })?;
        rx.await.context("store thread dropped response")?
    }

    pub async fn clear(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Clear { respond_to: tx })?;
        rx.await.context("store thread dropped response")?
    }

    fn send(&self, cmd: StoreCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| anyhow!("store thread stopped"))
    }
}

pub fn spawn_store_thread(csv_path: PathBuf) -> Result<StoreHandle> {
    let store = CsvStore::open(csv_path)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<StoreCommand>();

    std::thread::Builder::new()
        .name("location-store".to_string())
        .spawn(move || run_store_thread(store, &mut rx))
        .context("failed to spawn store thread")?;

    Ok(StoreHandle::new(tx))
}

fn run_store_thread(store: CsvStore, rx: &mut mpsc::UnboundedReceiver<StoreCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            StoreCommand::List { respond_to } => {
                let _ = respond_to.send(store.read_all());
            }
            StoreCommand::Save {
                location,
                respond_to,
            } => {
                let res = store.save(location);
                if let Ok(SaveOutcome::Saved) = res {
                    tracing::debug!(lat = location.latitude, lng = location.longitude, "location appended");
                }
                let _ = respond_to.send(res);
            }
            StoreCommand::Remove {
                location,
                respond_to,
            } => {
                let res = store.remove(location);
                if let Ok(RemoveOutcome::Removed { rows }) = res {
                    tracing::debug!(rows, lat = location.latitude, lng = location.longitude, "location removed");
                }
                let _ = respond_to.send(res);
            }
            StoreCommand::Clear { respond_to } => {
                let _ = respond_to.send(store.clear());
            }
        }
    }
    tracing::debug!(path=%store.path().display(), "store thread exiting");
}
