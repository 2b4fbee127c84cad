//! Scripted provider clients
//!
//! Jobs are scripted per audio URL so each batch item can behave differently.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use studio_gen::models::{GenerationRequest, JobHandle, ProviderResponse};
use studio_gen::services::{
    validate_audio_reference, CompletionClient, CompletionError, JobClient, JobClientError,
};

/// One poll observation
#[derive(Debug, Clone)]
pub enum Step {
    Respond(ProviderResponse),
    /// Network-level poll failure
    Transient,
    /// Poll answered with a non-retryable HTTP status
    Rejected(u16),
    Panic,
}

impl Step {
    pub fn succeeded(url: &str) -> Self {
        Step::Respond(ProviderResponse::Succeeded {
            output: Some(url.to_string()),
        })
    }

    pub fn failed(detail: &str) -> Self {
        Step::Respond(ProviderResponse::Failed {
            detail: Some(detail.to_string()),
        })
    }

    pub fn pending() -> Self {
        Step::Respond(ProviderResponse::Pending)
    }

    pub fn running() -> Self {
        Step::Respond(ProviderResponse::Running)
    }
}

/// Behaviour of one job; the last step repeats forever
#[derive(Debug, Clone)]
pub struct Script {
    pub reject_submit: Option<String>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn polls(steps: Vec<Step>) -> Self {
        Self {
            reject_submit: None,
            steps,
        }
    }

    pub fn reject(detail: &str) -> Self {
        Self {
            reject_submit: Some(detail.to_string()),
            steps: Vec::new(),
        }
    }
}

#[derive(Default)]
struct JobState {
    /// provider job id -> (audio url, polls so far)
    jobs: HashMap<String, (String, usize)>,
}

pub struct ScriptedJobClient {
    configured: bool,
    scripts: HashMap<String, Script>,
    state: Mutex<JobState>,
    submits: AtomicUsize,
}

impl ScriptedJobClient {
    pub fn new(scripts: Vec<(&str, Script)>) -> Self {
        Self {
            configured: true,
            scripts: scripts
                .into_iter()
                .map(|(audio, script)| (audio.to_string(), script))
                .collect(),
            state: Mutex::new(JobState::default()),
            submits: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    /// Submit calls that reached the provider
    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    /// Polls made for the job driven by `audio_url`
    pub fn poll_count(&self, audio_url: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .jobs
            .values()
            .filter(|(audio, _)| audio == audio_url)
            .map(|(_, polls)| *polls)
            .sum()
    }
}

#[async_trait]
impl JobClient for ScriptedJobClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, JobClientError> {
        if !self.configured {
            return Err(JobClientError::Configuration("no token".into()));
        }
        validate_audio_reference(&request.audio_url)?;

        let submit_no = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        let script = self.scripts.get(&request.audio_url);

        if let Some(detail) = script.and_then(|s| s.reject_submit.clone()) {
            return Err(JobClientError::Api(422, detail));
        }

        let job_id = format!("job-{}", submit_no);
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(job_id.clone(), (request.audio_url.clone(), 0));
        Ok(JobHandle::new(job_id))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<ProviderResponse, JobClientError> {
        let step = {
            let mut state = self.state.lock().unwrap();
            let (audio, polls) = state
                .jobs
                .get_mut(&handle.provider_job_id)
                .expect("poll for unknown job");
            *polls += 1;
            let steps = self
                .scripts
                .get(audio.as_str())
                .map(|s| s.steps.clone())
                .unwrap_or_else(|| vec![Step::pending()]);
            let index = (*polls - 1).min(steps.len().saturating_sub(1));
            steps.get(index).cloned().unwrap_or_else(Step::pending)
        };

        match step {
            Step::Respond(response) => Ok(response),
            Step::Transient => Err(JobClientError::Network("connection reset".into())),
            Step::Rejected(status) => Err(JobClientError::Api(status, "rejected".into())),
            Step::Panic => panic!("scripted provider panic"),
        }
    }
}

/// Completion client returning a fixed result and recording prompts
pub struct ScriptedCompletionClient {
    configured: bool,
    reply: Result<String, (u16, String)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletionClient {
    pub fn replying(text: &str) -> Self {
        Self {
            configured: true,
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            configured: true,
            reply: Err((status, body.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::replying("unused")
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if !self.configured {
            return Err(CompletionError::Configuration("no key".into()));
        }
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) if text.trim().is_empty() => Err(CompletionError::EmptyCompletion),
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(CompletionError::Api(*status, body.clone())),
        }
    }
}
