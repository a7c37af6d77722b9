//! In-memory collaborators for driving sessions in tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::backend_client::{BackendError, LibrarySource, PreviewRequest, RulesEngine};
use crate::models::library::Library;
use crate::models::preview::CvPreview;
use crate::models::variant::CvVariant;
use crate::preview::theme::CvTheme;
use crate::reconcile::ManualOverride;

fn unavailable(message: &str) -> BackendError {
    BackendError::Api {
        status: 503,
        message: message.to_string(),
    }
}

pub struct FakeLibrary {
    library: Mutex<Option<Library>>,
}

impl FakeLibrary {
    pub fn new(library: Library) -> Self {
        Self {
            library: Mutex::new(Some(library)),
        }
    }

    pub fn failing() -> Self {
        Self {
            library: Mutex::new(None),
        }
    }

    pub fn set(&self, library: Option<Library>) {
        *self.library.lock().unwrap() = library;
    }
}

#[async_trait]
impl LibrarySource for FakeLibrary {
    async fn load_library(&self) -> Result<Library, BackendError> {
        self.library
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("library service down"))
    }
}

/// Scripted response for one set of job tags.
#[derive(Clone)]
pub struct Script {
    pub delay: Duration,
    pub preview: Option<CvPreview>,
}

impl Script {
    pub fn ok(delay: Duration, preview: CvPreview) -> Self {
        Self {
            delay,
            preview: Some(preview),
        }
    }

    pub fn failing() -> Self {
        Self {
            delay: Duration::from_millis(10),
            preview: None,
        }
    }
}

/// Rules engine answering from scripts keyed by comma-joined job tags.
pub struct ScriptedEngine {
    default: Script,
    scripts: Mutex<HashMap<String, Script>>,
    previews: Mutex<Vec<PreviewRequest>>,
    renders: Mutex<Vec<PreviewRequest>>,
    render_fails: bool,
}

impl ScriptedEngine {
    pub fn new(default_preview: CvPreview) -> Self {
        Self {
            default: Script::ok(Duration::from_millis(10), default_preview),
            scripts: Mutex::new(HashMap::new()),
            previews: Mutex::new(Vec::new()),
            renders: Mutex::new(Vec::new()),
            render_fails: false,
        }
    }

    pub fn script(self, tags: &str, script: Script) -> Self {
        self.set_script(tags, script);
        self
    }

    pub fn failing_renders(mut self) -> Self {
        self.render_fails = true;
        self
    }

    pub fn set_script(&self, tags: &str, script: Script) {
        self.scripts.lock().unwrap().insert(tags.to_string(), script);
    }

    pub fn preview_requests(&self) -> Vec<PreviewRequest> {
        self.previews.lock().unwrap().clone()
    }

    pub fn render_requests(&self) -> Vec<PreviewRequest> {
        self.renders.lock().unwrap().clone()
    }

    fn lookup(&self, request: &PreviewRequest) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get(&request.job_tags.join(","))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl RulesEngine for ScriptedEngine {
    async fn preview(&self, request: &PreviewRequest) -> Result<CvPreview, BackendError> {
        self.previews.lock().unwrap().push(request.clone());
        let script = self.lookup(request);
        tokio::time::sleep(script.delay).await;
        script
            .preview
            .ok_or_else(|| unavailable("rules engine down"))
    }

    async fn render(&self, request: &PreviewRequest) -> Result<Bytes, BackendError> {
        self.renders.lock().unwrap().push(request.clone());
        let script = self.lookup(request);
        tokio::time::sleep(script.delay).await;
        if self.render_fails {
            return Err(unavailable("renderer down"));
        }
        Ok(Bytes::from(format!(
            "%PDF {} {}",
            request.template,
            request.job_tags.join(",")
        )))
    }

    async fn export_variant(
        &self,
        variant: &CvVariant,
        _theme: Option<&CvTheme>,
        _manual_overrides: Option<&ManualOverride>,
    ) -> Result<Bytes, BackendError> {
        if self.render_fails {
            return Err(unavailable("renderer down"));
        }
        Ok(Bytes::from(format!("%PDF variant {}", variant.name)))
    }
}

pub fn variant(
    name: &str,
    tags: &[&str],
    template: &str,
    manual_overrides: Option<ManualOverride>,
) -> CvVariant {
    CvVariant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        job_tags: tags.iter().map(|t| t.to_string()).collect(),
        template: template.to_string(),
        manual_overrides,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
