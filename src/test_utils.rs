/*
 * Test utilities and fakes for rpigpiomon
 *
 * Shared helpers for building sensor records from INI snippets, writing
 * executable readout scripts and reading sensors without spawning processes.
 */

#[cfg(test)]
pub mod test_utils {
    use crate::config::ConfigTree;
    use crate::reader::{parse_reading, ReadError, ValueReader};
    use crate::sensor::{SensorRecord, ValueSource};
    use std::collections::HashMap;
    use std::fs;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Parses `ini` and builds the record of section `name`
    pub fn record_from_ini(ini: &str, name: &str) -> SensorRecord {
        let tree = ConfigTree::parse(ini).expect("test config parses");
        let section = tree.section(name).cloned().unwrap_or_default();
        SensorRecord::from_section(name, &section)
    }

    /// Writes an executable `/bin/sh` script and returns its path
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    #[derive(Debug, Clone)]
    enum Canned {
        Output(String, Duration),
        Hang,
    }

    /// In-memory reader answering from canned outputs.
    ///
    /// Unknown sources fail like a missing program. Every read is recorded.
    #[derive(Debug, Clone, Default)]
    pub struct FixedReader {
        outputs: HashMap<ValueSource, Canned>,
        reads: Arc<Mutex<Vec<ValueSource>>>,
    }

    impl FixedReader {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, source: ValueSource, output: &str) -> Self {
            self.delayed(source, output, Duration::ZERO)
        }

        pub fn delayed(mut self, source: ValueSource, output: &str, delay: Duration) -> Self {
            self.outputs.insert(source, Canned::Output(output.to_string(), delay));
            self
        }

        pub fn hanging(mut self, source: ValueSource) -> Self {
            self.outputs.insert(source, Canned::Hang);
            self
        }

        /// Sources read so far, in call order
        pub fn reads(&self) -> Vec<ValueSource> {
            self.reads.lock().unwrap().clone()
        }
    }

    impl ValueReader for FixedReader {
        async fn read(&self, source: &ValueSource) -> Result<String, ReadError> {
            self.reads.lock().unwrap().push(source.clone());
            match self.outputs.get(source) {
                Some(Canned::Output(output, delay)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(*delay).await;
                    }
                    parse_reading(output)
                }
                Some(Canned::Hang) => Err(ReadError::Timeout {
                    program: source.to_string(),
                    timeout: Duration::from_secs(5),
                }),
                None => Err(ReadError::Spawn {
                    program: source.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no canned output"),
                }),
            }
        }
    }
}
