//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use cinder_volume::supervisor::{ServiceHandle, ServiceSupervisor};
use cinder_volume::{CinderVolume, RawOptions, Result, SnapPaths};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Scratch snap layout whose install root is this crate, so the bundled
/// `templates/` directory is used as-is.
pub struct Sandbox {
    pub tmp: TempDir,
    pub paths: SnapPaths,
}

impl Sandbox {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let paths = SnapPaths::under(tmp.path(), Path::new(env!("CARGO_MANIFEST_DIR")));
        Self { tmp, paths }
    }

    pub fn manager<'a>(&'a self, supervisor: &'a RecordingSupervisor) -> CinderVolume<'a> {
        CinderVolume::new(&self.paths, supervisor)
    }

    pub fn common(&self, rel: &str) -> std::path::PathBuf {
        self.paths.common.join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.common(rel)).expect("Rendered file should exist")
    }
}

/// Core options every configure cycle needs
pub fn base_options() -> Value {
    json!({
        "database-url": "sqlite:///x",
        "rabbitmq-url": "amqp://y",
        "cinder-project-id": "p",
        "cinder-user-id": "u"
    })
}

pub fn with(mut doc: Value, extra: Value) -> Value {
    if let (Some(map), Value::Object(more)) = (doc.as_object_mut(), extra) {
        map.extend(more);
    }
    doc
}

pub fn ceph_backend(pool: &str) -> Value {
    json!({
        "rbd-pool": pool,
        "rbd-user": "cinder",
        "rbd-secret-uuid": "abc",
        "rbd-key": "AQBsecretkey==",
        "mon-hosts": "10.0.0.1,10.0.0.2"
    })
}

pub fn hitachi_backend(storage_id: &str, pools: &str) -> Value {
    json!({
        "san-ip": "10.0.0.10",
        "san-login": "maintenance",
        "san-password": "secret",
        "hitachi-storage-id": storage_id,
        "hitachi-pools": pools
    })
}

pub fn options(doc: Value) -> RawOptions {
    RawOptions::from_value(doc).expect("Options should be an object")
}

pub type Calls = Rc<RefCell<Vec<String>>>;

/// Supervisor double recording every start and restart.
pub struct RecordingSupervisor {
    pub calls: Calls,
    pub known: Vec<String>,
}

impl RecordingSupervisor {
    pub fn new(known: &[&str]) -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            known: known.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

struct RecordingHandle {
    name: String,
    calls: Calls,
}

impl ServiceHandle for RecordingHandle {
    fn start(&self) -> Result<()> {
        self.calls.borrow_mut().push(format!("start {}", self.name));
        Ok(())
    }

    fn restart(&self) -> Result<()> {
        self.calls.borrow_mut().push(format!("restart {}", self.name));
        Ok(())
    }
}

impl ServiceSupervisor for RecordingSupervisor {
    fn list(&self) -> Result<BTreeMap<String, Box<dyn ServiceHandle>>> {
        Ok(self
            .known
            .iter()
            .map(|name| {
                let handle: Box<dyn ServiceHandle> = Box::new(RecordingHandle {
                    name: name.clone(),
                    calls: Rc::clone(&self.calls),
                });
                (name.clone(), handle)
            })
            .collect())
    }
}
