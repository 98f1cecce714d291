use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use gendag::exec::{GenerationRequest, OutputGenerator};

#[derive(Debug, Default)]
struct State {
    started: Vec<String>,
    finished: Vec<String>,
    requests: Vec<GenerationRequest>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    responses: HashMap<String, String>,
}

/// A fake generator that:
/// - records which outputs were generated, and in which order they started
///   and finished
/// - optionally sleeps or fails per output
/// - returns `// generated <output>` unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct FakeGenerator {
    state: Arc<Mutex<State>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, output: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(output.to_string(), message.to_string());
        self
    }

    pub fn delay(self, output: &str, delay: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(output.to_string(), delay);
        self
    }

    pub fn respond(self, output: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(output.to_string(), text.to_string());
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.state.lock().unwrap().finished.clone()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.started.clear();
        state.finished.clear();
        state.requests.clear();
    }
}

impl OutputGenerator for FakeGenerator {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let output = request.output.clone();
            let delay = {
                let mut state = self.state.lock().unwrap();
                state.started.push(output.clone());
                state.requests.push(request.clone());
                state.delays.get(&output).copied()
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.state.lock().unwrap();
            state.finished.push(output.clone());
            if let Some(message) = state.failures.get(&output) {
                return Err(anyhow!(message.clone()));
            }
            Ok(state
                .responses
                .get(&output)
                .cloned()
                .unwrap_or_else(|| format!("// generated {output}\n")))
        })
    }
}
