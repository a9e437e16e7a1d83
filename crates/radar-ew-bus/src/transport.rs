//! File-based packet transport.
//!
//! An alternative wire for cross-process or offline runs: each packet is
//! written to its own uniquely-named JSON file, and the receiving side polls
//! the directory at a fixed interval. Already-processed filenames are
//! remembered so a file is consumed at most once per transport instance.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::BusResult;

/// Directory-polling packet transport.
#[derive(Debug)]
pub struct DirectoryTransport {
    dir: PathBuf,
    /// Filenames already consumed by `poll_new`.
    processed: HashSet<String>,
}

impl DirectoryTransport {
    /// Open (creating if needed) a transport rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> BusResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            processed: HashSet::new(),
        })
    }

    /// The transport directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one packet under a collision-free name and return the filename.
    ///
    /// Names embed the role and frame for debuggability plus a UUID for
    /// uniqueness: `{role}_{frame:06}_{uuid}.json`.
    pub fn write_packet<T: Serialize>(
        &self,
        packet: &T,
        role: &str,
        frame: u64,
    ) -> BusResult<String> {
        let name = format!("{role}_{frame:06}_{}.json", Uuid::new_v4().simple());
        let payload = serde_json::to_vec_pretty(packet)?;

        // Write-then-rename so a poller never observes a half-written file.
        let tmp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, self.dir.join(&name))?;
        Ok(name)
    }

    /// Collect packets from files not seen before, oldest name first.
    ///
    /// Undecodable files are skipped (and remembered, so they are not
    /// re-attempted every poll); decoding other roles' files is the caller's
    /// concern via the type parameter.
    pub fn poll_new<T: DeserializeOwned>(&mut self) -> BusResult<Vec<T>> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json") && !self.processed.contains(name))
            .collect();
        names.sort_unstable();

        let mut packets = Vec::with_capacity(names.len());
        for name in names {
            let path = self.dir.join(&name);
            self.processed.insert(name.clone());
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(file = %name, %err, "unreadable packet file skipped");
                    continue;
                }
            };
            match serde_json::from_slice(&bytes) {
                Ok(packet) => packets.push(packet),
                Err(err) => {
                    tracing::warn!(file = %name, %err, "undecodable packet file skipped");
                }
            }
        }
        Ok(packets)
    }

    /// Number of filenames consumed so far.
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use radar_ew_core::{AttackPacket, IntelligencePacket, SceneContext};

    fn intel(frame_id: u64) -> IntelligencePacket {
        IntelligencePacket {
            frame_id,
            sensor_id: "sensor-file".into(),
            timestamp: Utc::now(),
            tracks: vec![],
            threat_assessments: vec![],
            scene_context: SceneContext::default(),
            overall_confidence: 0.6,
        }
    }

    #[test]
    fn write_then_poll_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = DirectoryTransport::new(dir.path()).unwrap();

        transport.write_packet(&intel(1), "sensor", 1).unwrap();
        transport.write_packet(&intel(2), "sensor", 2).unwrap();

        let packets: Vec<IntelligencePacket> = transport.poll_new().unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].frame_id, 1);
        assert_eq!(packets[1].frame_id, 2);
    }

    #[test]
    fn each_file_is_processed_at_most_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = DirectoryTransport::new(dir.path()).unwrap();

        transport.write_packet(&intel(7), "sensor", 7).unwrap();

        let first: Vec<IntelligencePacket> = transport.poll_new().unwrap();
        let second: Vec<IntelligencePacket> = transport.poll_new().unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(transport.processed_count(), 1);
    }

    #[test]
    fn undecodable_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = DirectoryTransport::new(dir.path()).unwrap();

        fs::write(dir.path().join("garbage_000001_x.json"), b"not json").unwrap();
        transport.write_packet(&intel(3), "sensor", 3).unwrap();

        let packets: Vec<IntelligencePacket> = transport.poll_new().unwrap();
        assert_eq!(packets.len(), 1);

        // The garbage file is remembered, not retried.
        let again: Vec<IntelligencePacket> = transport.poll_new().unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn distinct_frames_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let transport = DirectoryTransport::new(dir.path()).unwrap();

        let a = transport.write_packet(&intel(1), "sensor", 1).unwrap();
        let b = transport.write_packet(&intel(1), "sensor", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn attack_packets_use_the_same_wire() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = DirectoryTransport::new(dir.path()).unwrap();

        let packet = AttackPacket {
            effector_id: "effector-file".into(),
            timestamp: Utc::now(),
            countermeasures: vec![],
            engagement_status: vec![],
            overall_effectiveness: 0.3,
            decision_confidence: 0.4,
            expected_impact: 2.0,
        };
        transport.write_packet(&packet, "effector", 1).unwrap();

        let packets: Vec<AttackPacket> = transport.poll_new().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].effector_id, "effector-file");
    }
}
