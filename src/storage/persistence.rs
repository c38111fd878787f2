//! Factory persistence
//!
//! The whole factory (every wallet, its ledger and event log, plus the
//! external account book) is written as one JSON document wrapped in a
//! small versioned envelope. Saves go through a temp file and a rename so a
//! crash never leaves a half-written state file behind.

use crate::multisig::MultisigFactory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current on-disk format
pub const FORMAT_VERSION: u32 = 1;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Unsupported state format version {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Where and how state is stored
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            state_file: "factory.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    factory: &'a MultisigFactory,
}

#[derive(Deserialize)]
struct OwnedEnvelope {
    version: u32,
    factory: MultisigFactory,
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

/// Reads and writes the factory state file and its backups
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Open storage, creating the data directory if needed
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, slot: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, slot))
    }

    fn keeps_backups(&self) -> bool {
        self.config.backup_enabled && self.config.max_backups > 0
    }

    /// Write the factory, pushing the previous state into backup slot 0
    pub fn save(&self, factory: &MultisigFactory) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.keeps_backups() && path.exists() {
            self.shift_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let staging = path.with_extension("json.tmp");
        save_to_file(factory, &staging)?;
        fs::rename(&staging, &path)?;

        log::debug!(
            "Saved {} wallets to {}",
            factory.instance_count(),
            path.display()
        );
        Ok(())
    }

    /// Read the saved factory
    pub fn load(&self) -> Result<MultisigFactory, StorageError> {
        let path = self.state_path();
        if !path.exists() {
            return Err(StorageError::InvalidData(format!(
                "no state file at {}",
                path.display()
            )));
        }

        let factory = load_from_file(&path)?;
        log::info!(
            "Loaded {} wallets from {}",
            factory.instance_count(),
            path.display()
        );
        Ok(factory)
    }

    /// Read the saved factory, or start empty when nothing was saved yet
    pub fn load_or_default(&self) -> Result<MultisigFactory, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(MultisigFactory::new())
        }
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Remove the state file. Backups are kept.
    pub fn delete(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.state_path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Move every backup one slot older, dropping whatever falls off the end
    fn shift_backups(&self) -> Result<(), StorageError> {
        let last = self.config.max_backups - 1;
        for slot in (0..last).rev() {
            let from = self.backup_path(slot);
            if from.exists() {
                fs::rename(&from, self.backup_path(slot + 1))?;
            }
        }
        Ok(())
    }

    /// Read the factory from a backup slot (0 is the newest)
    pub fn restore_backup(&self, slot: usize) -> Result<MultisigFactory, StorageError> {
        let path = self.backup_path(slot);
        if !path.exists() {
            return Err(StorageError::InvalidData(format!(
                "backup {} not found",
                slot
            )));
        }
        load_from_file(&path)
    }

    /// Occupied backup slots, newest first
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|slot| self.backup_path(*slot).exists())
            .collect()
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let file_size = match fs::metadata(self.state_path()) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Write a factory to an arbitrary path
pub fn save_to_file(factory: &MultisigFactory, path: &Path) -> Result<(), StorageError> {
    let envelope = Envelope {
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        factory,
    };
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, &envelope)?;
    Ok(())
}

/// Read a factory from an arbitrary path
///
/// Owner registries are re-validated while parsing. Ledgers that disagree
/// with their owner set or position fail with `InvalidData`.
pub fn load_from_file(path: &Path) -> Result<MultisigFactory, StorageError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let envelope: OwnedEnvelope = serde_json::from_reader(reader)?;
    if envelope.version != FORMAT_VERSION {
        return Err(StorageError::UnsupportedVersion(envelope.version));
    }
    if let Some(problem) = envelope.factory.integrity_error() {
        return Err(StorageError::InvalidData(problem));
    }
    Ok(envelope.factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string()]
    }

    fn temp_storage(temp_dir: &tempfile::TempDir, max_backups: usize) -> Storage {
        Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_save_load_factory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&temp_dir, 5);

        let mut factory = MultisigFactory::new();
        let wallet = factory.deploy_instance(owners(), 2, None).unwrap();
        factory.deposit(&wallet, "donor", 10).unwrap();
        let index = factory
            .submit_transaction(&wallet, "alice", "carol", 4, vec![0xff])
            .unwrap();
        factory.confirm_transaction(&wallet, "bob", index).unwrap();

        storage.save(&factory).unwrap();
        assert!(storage.exists());
        assert!(!temp_dir.path().join("factory.json.tmp").exists());

        let loaded = storage.load().unwrap();
        let restored = loaded.get(&wallet).unwrap();
        assert_eq!(loaded.list_instances(), factory.list_instances());
        assert_eq!(restored.balance(), 10);
        assert_eq!(restored.get_transaction(index).unwrap().data, vec![0xff]);
        assert!(restored.is_confirmed(index, "bob").unwrap());
        assert_eq!(restored.events().len(), 3);
    }

    #[test]
    fn test_load_missing_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&temp_dir, 5);

        assert!(!storage.exists());
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
        assert_eq!(storage.load_or_default().unwrap().instance_count(), 0);
        storage.delete().unwrap();
    }

    #[test]
    fn test_rejects_unknown_format_version() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("factory.json");
        save_to_file(&MultisigFactory::new(), &path).unwrap();

        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        doc["version"] = serde_json::json!(99);
        fs::write(&path, doc.to_string()).unwrap();

        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::UnsupportedVersion(99))
        ));
    }

    /// Save a 2-of-2 wallet with one confirmation, then edit the file
    fn tampered_file(
        temp_dir: &tempfile::TempDir,
        edit: impl FnOnce(&mut serde_json::Value),
    ) -> PathBuf {
        let mut factory = MultisigFactory::new();
        let wallet = factory.deploy_instance(owners(), 2, None).unwrap();
        factory
            .submit_transaction(&wallet, "alice", "carol", 0, vec![])
            .unwrap();
        factory.confirm_transaction(&wallet, "alice", 0).unwrap();

        let path = temp_dir.path().join("factory.json");
        save_to_file(&factory, &path).unwrap();
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        edit(&mut doc["factory"]["instances"][wallet.as_str()]);
        fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn test_rejects_tampered_confirmation_count() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = tampered_file(&temp_dir, |wallet| {
            wallet["transactions"][0]["num_confirmations"] = serde_json::json!(0);
        });

        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_rejects_tampered_ledger_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = tampered_file(&temp_dir, |wallet| {
            wallet["transactions"][0]["index"] = serde_json::json!(5);
        });

        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_rejects_confirmation_from_non_owner() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = tampered_file(&temp_dir, |wallet| {
            wallet["transactions"][0]["confirmed_by"] = serde_json::json!(["mallory"]);
        });

        match load_from_file(&path) {
            Err(StorageError::InvalidData(problem)) => assert!(problem.contains("mallory")),
            other => panic!("expected InvalidData, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rejects_invalid_registry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = tampered_file(&temp_dir, |wallet| {
            wallet["registry"]["quorum"] = serde_json::json!(0);
        });
        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::SerializationError(_))
        ));

        let path = tampered_file(&temp_dir, |wallet| {
            wallet["registry"]["owners"] = serde_json::json!(["alice", "alice"]);
        });
        assert!(load_from_file(&path).is_err());
    }

    #[test]
    fn test_rejects_misfiled_wallet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = tampered_file(&temp_dir, |wallet| {
            wallet["address"] = serde_json::json!("0xelsewhere");
        });

        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&temp_dir, 3);
        let mut factory = MultisigFactory::new();

        for _ in 0..5 {
            factory.deploy_instance(owners(), 1, None).unwrap();
            storage.save(&factory).unwrap();
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);

        // Slot 0 holds the state before the last save, slot 2 the oldest kept
        assert_eq!(storage.restore_backup(0).unwrap().instance_count(), 4);
        assert_eq!(storage.restore_backup(2).unwrap().instance_count(), 2);
        assert!(storage.restore_backup(7).is_err());
    }

    #[test]
    fn test_backups_disabled() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            backup_enabled: false,
            ..Default::default()
        })
        .unwrap();

        storage.save(&MultisigFactory::new()).unwrap();
        storage.save(&MultisigFactory::new()).unwrap();
        assert!(storage.list_backups().is_empty());
    }

    #[test]
    fn test_delete_and_stats() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&temp_dir, 2);

        storage.save(&MultisigFactory::new()).unwrap();
        let stats = storage.stats().unwrap();
        assert!(stats.file_size > 0);
        assert_eq!(stats.backup_count, 0);

        storage.delete().unwrap();
        assert!(!storage.exists());
        assert_eq!(storage.stats().unwrap().file_size, 0);
    }
}
