//! Test doubles shared across modules.

use std::sync::Mutex;

use crate::error::Result;
use crate::report::Reporter;

/// Records outputs and failure messages instead of publishing them.
#[derive(Default)]
pub struct RecordingReporter {
    outputs: Mutex<Vec<(String, String)>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.outputs.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.outputs
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn fail(&self, message: &str) -> Result<()> {
        self.failures.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
