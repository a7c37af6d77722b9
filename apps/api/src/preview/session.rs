//! Preview session: one user's live CV preview.
//!
//! The session is the single owner of its reconciliation state. Every input
//! change, override toggle and asynchronous result goes through the same
//! mutex-guarded update path; the lock is never held across an await.
//!
//! Two output channels (structured data, rendered document) are recomputed
//! independently: each change to a channel's inputs resets that channel's
//! debounce timer, and each result is applied only if it was requested under
//! the channel's current token.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend_client::{BackendError, LibrarySource, PreviewRequest, RulesEngine};
use crate::errors::{AppError, PreviewFailure};
use crate::models::library::{EntityId, Library, Section};
use crate::models::preview::CvPreview;
use crate::models::variant::CvVariant;
use crate::preview::channel::{Channel, ChannelKind, ChannelStatus};
use crate::preview::theme::{default_theme, supports_theme, CvTheme, ThemePatch, ATS_TEMPLATE};
use crate::reconcile::{resolve_preview, LibraryMatch, ManualOverride};

/// Orchestrator settings threaded into every session.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub debounce: Duration,
    /// Whether users may override the automatic selection at all.
    pub manual_overrides_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(450),
            manual_overrides_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    #[default]
    Data,
    Document,
}

impl PreviewMode {
    fn label(&self) -> &'static str {
        match self {
            PreviewMode::Data => "DATA",
            PreviewMode::Document => "DOCUMENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewInputs {
    pub job_tags: Vec<String>,
    /// Template chosen by the user; saved with variants.
    pub template: String,
    /// Preview with the ATS template regardless of `template`.
    pub ats_preview: bool,
    pub mode: PreviewMode,
    pub theme: CvTheme,
}

impl Default for PreviewInputs {
    fn default() -> Self {
        Self {
            job_tags: Vec::new(),
            template: ATS_TEMPLATE.to_string(),
            ats_preview: true,
            mode: PreviewMode::Data,
            theme: default_theme(ATS_TEMPLATE),
        }
    }
}

impl PreviewInputs {
    /// Template actually sent to the rules engine.
    pub fn effective_template(&self) -> &str {
        if self.ats_preview {
            ATS_TEMPLATE
        } else {
            &self.template
        }
    }

    /// Theme sent with render calls; only themable templates get one.
    pub fn effective_theme(&self) -> Option<&CvTheme> {
        supports_theme(self.effective_template()).then_some(&self.theme)
    }
}

/// Partial update of a session's inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputsPatch {
    pub job_tags: Option<Vec<String>>,
    pub template: Option<String>,
    pub ats_preview: Option<bool>,
    pub mode: Option<PreviewMode>,
    pub theme: Option<ThemePatch>,
    #[serde(default)]
    pub reset_theme: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Preview tracks the current inputs.
    Live,
    /// Preview is a frozen resolution of a stored variant.
    Variant,
}

#[derive(Debug, Clone, Default)]
enum Source {
    #[default]
    Live,
    Variant(CvVariant),
}

/// Everything the presentation layer needs to render a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub mode: SessionMode,
    pub label: String,
    pub variant_id: Option<Uuid>,
    pub inputs: PreviewInputs,
    pub effective_template: String,
    pub manual_overrides_enabled: bool,
    /// Merged override map backing the toggle UI.
    pub overrides: Option<ManualOverride>,
    pub preview: Option<CvPreview>,
    pub data: ChannelStatus,
    pub document: ChannelStatus,
    pub document_ready: bool,
    pub library_error: Option<PreviewFailure>,
    /// Rules-engine items that matched no library record, per section.
    pub unmatched: BTreeMap<Section, usize>,
}

#[derive(Default)]
struct SessionState {
    source: Source,
    inputs: PreviewInputs,
    library: Option<Library>,
    library_token: u64,
    library_error: Option<PreviewFailure>,
    auto_preview: Option<CvPreview>,
    matched: Option<LibraryMatch>,
    defaults: Option<ManualOverride>,
    /// Explicit user choices only; sparse.
    manual: ManualOverride,
    /// `defaults` merged with `manual`; total once a preview has resolved.
    overrides: Option<ManualOverride>,
    preview: Option<CvPreview>,
    unmatched: BTreeMap<Section, usize>,
    document: Option<Bytes>,
    data_channel: Channel,
    document_channel: Channel,
}

impl SessionState {
    fn is_live(&self) -> bool {
        matches!(self.source, Source::Live)
    }

    fn channel_mut(&mut self, kind: ChannelKind) -> &mut Channel {
        match kind {
            ChannelKind::Data => &mut self.data_channel,
            ChannelKind::Document => &mut self.document_channel,
        }
    }
}

pub struct PreviewSession {
    id: Uuid,
    config: OrchestratorConfig,
    library_source: Arc<dyn LibrarySource>,
    engine: Arc<dyn RulesEngine>,
    state: Mutex<SessionState>,
}

impl PreviewSession {
    pub fn new(
        config: OrchestratorConfig,
        library_source: Arc<dyn LibrarySource>,
        engine: Arc<dyn RulesEngine>,
        inputs: PreviewInputs,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            config,
            library_source,
            engine,
            state: Mutex::new(SessionState {
                inputs,
                ..SessionState::default()
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the library and schedules the first live preview.
    pub async fn start(self: &Arc<Self>) {
        self.reload_library().await;
        let mut state = self.state();
        self.schedule(&mut state, ChannelKind::Data);
        self.schedule(&mut state, ChannelKind::Document);
    }

    /// Cancels pending timers and outdates in-flight calls.
    pub fn close(&self) {
        let mut state = self.state();
        state.data_channel.invalidate();
        state.document_channel.invalidate();
    }

    /// Re-fetches the library and re-reconciles against the latest
    /// rules-engine output. Only the most recent reload is applied.
    pub async fn reload_library(self: &Arc<Self>) {
        let token = {
            let mut state = self.state();
            state.library_token += 1;
            state.library_token
        };

        let result = self.library_source.load_library().await;

        let mut state = self.state();
        if state.library_token != token {
            debug!(session = %self.id, "Discarding superseded library load");
            return;
        }
        match result {
            Ok(library) => {
                state.library = Some(library);
                state.library_error = None;
                self.reconcile(&mut state);
            }
            Err(e) => {
                warn!(session = %self.id, "Library unavailable: {e}");
                state.library_error = Some(PreviewFailure::LibraryUnavailable(e.to_string()));
                self.drop_library(&mut state);
            }
        }
    }

    pub fn update_inputs(self: &Arc<Self>, patch: InputsPatch) -> Result<(), AppError> {
        let mut state = self.state();
        let before_template = state.inputs.effective_template().to_string();
        let before_theme = state.inputs.effective_theme().cloned();
        let mut data_dirty = false;
        let mut document_dirty = false;
        let mut forces_live = false;

        if let Some(tags) = patch.job_tags {
            let tags = clean_tags(tags);
            if tags != state.inputs.job_tags {
                state.inputs.job_tags = tags;
                data_dirty = true;
                document_dirty = true;
                forces_live = true;
            }
        }
        if let Some(template) = patch.template {
            let template = template.trim().to_string();
            if template.is_empty() {
                return Err(AppError::Validation("template cannot be empty".to_string()));
            }
            if template != state.inputs.template {
                state.inputs.theme = default_theme(&template);
                state.inputs.template = template;
                forces_live = true;
            }
        }
        if let Some(ats_preview) = patch.ats_preview {
            if ats_preview != state.inputs.ats_preview {
                state.inputs.ats_preview = ats_preview;
                forces_live = true;
            }
        }
        if let Some(mode) = patch.mode {
            if mode != state.inputs.mode {
                state.inputs.mode = mode;
                document_dirty = true;
                forces_live = true;
            }
        }
        if patch.reset_theme {
            let reset = default_theme(&state.inputs.template);
            forces_live |= state.inputs.theme != reset;
            state.inputs.theme = reset;
        }
        if let Some(theme) = patch.theme {
            let before = state.inputs.theme.clone();
            state.inputs.theme.apply(theme);
            forces_live |= state.inputs.theme != before;
        }

        if state.inputs.effective_template() != before_template {
            data_dirty = true;
            document_dirty = true;
        }
        if state.inputs.effective_theme() != before_theme.as_ref() {
            document_dirty = true;
        }

        if forces_live && self.enter_live(&mut state) {
            return Ok(());
        }
        if data_dirty {
            self.schedule(&mut state, ChannelKind::Data);
        }
        if document_dirty {
            self.schedule(&mut state, ChannelKind::Document);
        }
        Ok(())
    }

    /// Forces one library record in (`true`) or out (`false`) of the preview.
    pub fn toggle_override(
        self: &Arc<Self>,
        section: Section,
        id: EntityId,
        included: bool,
    ) -> Result<(), AppError> {
        self.ensure_overrides_enabled()?;
        let mut state = self.state();
        let library = state
            .library
            .as_ref()
            .ok_or_else(|| AppError::Validation("The library has not been loaded".to_string()))?;
        if !library.contains(section, &id) {
            return Err(AppError::NotFound(format!(
                "No {} entry with id {id}",
                section.as_str()
            )));
        }

        state.manual.section_mut(section).insert(id, included);
        self.overrides_changed(&mut state);
        Ok(())
    }

    /// Drops every explicit choice; the preview returns to the automatic selection.
    pub fn reset_overrides(self: &Arc<Self>) -> Result<(), AppError> {
        self.ensure_overrides_enabled()?;
        let mut state = self.state();
        state.manual = ManualOverride::default();
        self.overrides_changed(&mut state);
        Ok(())
    }

    /// Switches to VARIANT and resolves the stored variant against the
    /// current library: its own tags and template, its own persisted
    /// overrides merged over fresh defaults.
    ///
    /// The session keeps its current source until the variant has resolved;
    /// a failed inspection only sets the data channel's error.
    pub async fn inspect_variant(self: &Arc<Self>, variant: CvVariant) {
        let token = {
            let mut state = self.state();
            let token = state.data_channel.invalidate();
            state.data_channel.begin(token);
            token
        };
        info!(session = %self.id, variant = %variant.id, "Inspecting variant '{}'", variant.name);

        let request = PreviewRequest::new(variant.job_tags.clone(), variant.template.clone());
        let result = self.engine.preview(&request).await;

        let mut state = self.state();
        let error = result.as_ref().err().map(rules_engine_failure);
        if !state.data_channel.finish(token, error) {
            debug!(session = %self.id, "Discarding stale variant preview");
            return;
        }
        if let Ok(auto) = result {
            state.source = Source::Variant(variant.clone());
            state.inputs.mode = PreviewMode::Data;
            state.document_channel.invalidate();
            self.apply_variant(&mut state, &variant, auto);
        }
    }

    /// Re-issues one channel's recomputation immediately. In VARIANT mode the
    /// data channel re-inspects the variant and the document channel is idle.
    pub async fn retry(self: &Arc<Self>, kind: ChannelKind) {
        let variant = match &self.state().source {
            Source::Variant(variant) => Some(variant.clone()),
            Source::Live => None,
        };
        if let Some(variant) = variant {
            if kind == ChannelKind::Data {
                self.inspect_variant(variant).await;
            }
            return;
        }

        let issued = {
            let mut state = self.state();
            if kind == ChannelKind::Document && state.inputs.mode != PreviewMode::Document {
                None
            } else {
                let request = self.request_for(&state, kind);
                let token = state.channel_mut(kind).invalidate();
                Some((token, request))
            }
        };

        if let Some((token, request)) = issued {
            self.clone().issue(kind, token, request).await;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        let (mode, label, variant_id) = match &state.source {
            Source::Variant(variant) => (
                SessionMode::Variant,
                format!("Variant: {}", variant.name),
                Some(variant.id),
            ),
            Source::Live => (
                SessionMode::Live,
                format!(
                    "Live {} preview - {}",
                    state.inputs.mode.label(),
                    state.inputs.effective_template()
                ),
                None,
            ),
        };

        SessionSnapshot {
            id: self.id,
            mode,
            label,
            variant_id,
            inputs: state.inputs.clone(),
            effective_template: state.inputs.effective_template().to_string(),
            manual_overrides_enabled: self.config.manual_overrides_enabled,
            overrides: self
                .config
                .manual_overrides_enabled
                .then(|| state.overrides.clone())
                .flatten(),
            preview: state.preview.clone(),
            data: state.data_channel.status(),
            document: state.document_channel.status(),
            document_ready: state.document.is_some(),
            library_error: state.library_error.clone(),
            unmatched: state.unmatched.clone(),
        }
    }

    /// Latest rendered document, if any.
    pub fn document(&self) -> Option<Bytes> {
        self.state().document.clone()
    }

    /// Job tags, selected template and (when permitted) the current override
    /// map, as captured when saving a variant.
    pub fn variant_draft(&self) -> (Vec<String>, String, Option<ManualOverride>) {
        let state = self.state();
        let overrides = if self.config.manual_overrides_enabled {
            state.overrides.clone()
        } else {
            None
        };
        (
            state.inputs.job_tags.clone(),
            state.inputs.template.clone(),
            overrides,
        )
    }

    /// Theme to export `variant` with: the session theme, when the variant
    /// uses the session's template and that template is themable.
    pub fn export_theme(&self, variant: &CvVariant) -> Option<CvTheme> {
        let state = self.state();
        (variant.template == state.inputs.template && supports_theme(&variant.template))
            .then(|| state.inputs.theme.clone())
    }

    pub fn manual_overrides_enabled(&self) -> bool {
        self.config.manual_overrides_enabled
    }

    fn ensure_overrides_enabled(&self) -> Result<(), AppError> {
        if self.config.manual_overrides_enabled {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Manual content overrides are not enabled".to_string(),
            ))
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // State transitions (caller holds the lock)
    // ────────────────────────────────────────────────────────────────────

    /// VARIANT → LIVE. Returns false if the session was already live.
    fn enter_live(self: &Arc<Self>, state: &mut SessionState) -> bool {
        if state.is_live() {
            return false;
        }
        info!(session = %self.id, "Returning to live preview");
        state.source = Source::Live;
        self.refresh_preview(state);
        self.schedule(state, ChannelKind::Data);
        self.schedule(state, ChannelKind::Document);
        true
    }

    fn overrides_changed(self: &Arc<Self>, state: &mut SessionState) {
        self.remerge(state);
        if !self.enter_live(state) {
            self.refresh_preview(state);
            self.schedule(state, ChannelKind::Document);
        }
    }

    /// Recomputes match, defaults and merged overrides from the current
    /// library and rules-engine output.
    fn reconcile(self: &Arc<Self>, state: &mut SessionState) {
        if let (Some(library), Some(auto)) = (&state.library, &state.auto_preview) {
            let matched = LibraryMatch::compute(auto, library);
            let defaults = matched.default_overrides(library);
            for section in Section::ALL {
                state
                    .manual
                    .section_mut(section)
                    .retain(|id, _| library.contains(section, id));
            }
            let unmatched = matched.unmatched();
            if !unmatched.is_empty() {
                debug!(session = %self.id, ?unmatched, "Rules-engine items without a library match");
            }
            state.unmatched = unmatched;
            state.matched = Some(matched);
            state.defaults = Some(defaults);
        }

        if self.remerge(state) {
            self.schedule(state, ChannelKind::Document);
        }
        self.refresh_preview(state);
    }

    /// Forgets the library and everything derived from it. The preview falls
    /// back to the rules-engine output; explicit choices are kept for when
    /// the library returns.
    fn drop_library(self: &Arc<Self>, state: &mut SessionState) {
        state.library = None;
        state.matched = None;
        state.defaults = None;
        state.unmatched.clear();
        if state.overrides.take().is_some() {
            self.schedule(state, ChannelKind::Document);
        }
        self.refresh_preview(state);
    }

    /// Rebuilds `overrides` from `defaults` and the user's explicit choices.
    /// Returns whether the merged map changed.
    fn remerge(&self, state: &mut SessionState) -> bool {
        let Some(defaults) = &state.defaults else {
            return false;
        };
        let merged = ManualOverride::merged(defaults, Some(&state.manual));
        let changed = state.overrides.as_ref() != Some(&merged);
        state.overrides = Some(merged);
        changed
    }

    fn refresh_preview(&self, state: &mut SessionState) {
        if !state.is_live() {
            return;
        }
        state.preview = match (
            &state.auto_preview,
            &state.library,
            &state.matched,
            &state.overrides,
        ) {
            (None, ..) => None,
            (Some(_), Some(library), Some(matched), Some(overrides))
                if self.config.manual_overrides_enabled =>
            {
                Some(resolve_preview(library, matched, overrides))
            }
            (Some(auto), ..) => Some(auto.clone()),
        };
    }

    fn apply_variant(&self, state: &mut SessionState, variant: &CvVariant, auto: CvPreview) {
        let Some(library) = &state.library else {
            state.preview = Some(auto);
            return;
        };
        let matched = LibraryMatch::compute(&auto, library);
        let defaults = matched.default_overrides(library);
        let overrides = if self.config.manual_overrides_enabled {
            ManualOverride::merged(&defaults, variant.manual_overrides.as_ref())
        } else {
            defaults
        };
        state.preview = Some(resolve_preview(library, &matched, &overrides));
        state.unmatched = matched.unmatched();
    }

    // ────────────────────────────────────────────────────────────────────
    // Debounced, fenced recomputation
    // ────────────────────────────────────────────────────────────────────

    fn request_for(&self, state: &SessionState, kind: ChannelKind) -> PreviewRequest {
        let mut request = PreviewRequest::new(
            state.inputs.job_tags.clone(),
            state.inputs.effective_template(),
        );
        if kind == ChannelKind::Document {
            request.theme = state.inputs.effective_theme().cloned();
            if self.config.manual_overrides_enabled {
                request.manual_overrides = state.overrides.clone();
            }
        }
        request
    }

    /// Resets `kind`'s debounce timer. When it fires, the request captured
    /// now is issued under a fresh token.
    fn schedule(self: &Arc<Self>, state: &mut SessionState, kind: ChannelKind) {
        if !state.is_live() {
            return;
        }
        if kind == ChannelKind::Document && state.inputs.mode != PreviewMode::Document {
            return;
        }

        let request = self.request_for(state, kind);
        let channel = state.channel_mut(kind);
        let token = channel.invalidate();
        let session = Arc::downgrade(self);
        let debounce = self.config.debounce;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Some(session) = session.upgrade() {
                // Detached so that resetting the timer never cancels a call
                // that is already on the wire.
                tokio::spawn(session.issue(kind, token, request));
            }
        });
        channel.arm(token, timer);
        debug!(session = %self.id, ?kind, token, "Scheduled preview recomputation");
    }

    async fn issue(self: Arc<Self>, kind: ChannelKind, token: u64, request: PreviewRequest) {
        if !self.state().channel_mut(kind).begin(token) {
            return;
        }

        match kind {
            ChannelKind::Data => {
                let result = self.engine.preview(&request).await;
                self.apply_data(token, result);
            }
            ChannelKind::Document => {
                let result = self.engine.render(&request).await;
                self.apply_document(token, result);
            }
        }
    }

    fn apply_data(self: &Arc<Self>, token: u64, result: Result<CvPreview, BackendError>) {
        let mut state = self.state();
        let error = result.as_ref().err().map(rules_engine_failure);
        if !state.data_channel.finish(token, error) {
            warn!(
                session = %self.id,
                token,
                current = state.data_channel.token(),
                "Discarding stale data preview"
            );
            return;
        }
        if let Ok(auto) = result {
            state.auto_preview = Some(auto);
            self.reconcile(&mut state);
        }
    }

    fn apply_document(&self, token: u64, result: Result<Bytes, BackendError>) {
        let mut state = self.state();
        let error = result.as_ref().err().map(|e| {
            warn!(session = %self.id, "Render call failed: {e}");
            PreviewFailure::RenderUnavailable(e.to_string())
        });
        if !state.document_channel.finish(token, error) {
            warn!(
                session = %self.id,
                token,
                current = state.document_channel.token(),
                "Discarding stale document preview"
            );
            return;
        }
        if let Ok(document) = result {
            state.document = Some(document);
        }
    }
}

fn rules_engine_failure(error: &BackendError) -> PreviewFailure {
    warn!("Rules engine call failed: {error}");
    PreviewFailure::RulesEngineUnavailable(error.to_string())
}

/// Trims tags and drops blanks and repeats, keeping first occurrences.
pub(crate) fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}
