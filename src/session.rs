use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::autosave::AutoSaver;
use crate::planner::{ExistingContentSource, LessonUpdate, Planner, SectionUpdate};
use crate::{ContentProduct, ExistingContent, ProductRates, ProjectDefaults, TrainingPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    ProjectSettings,
    SectionSettings { section_index: usize },
    LessonSettings { section_index: usize, lesson_index: usize },
}

/// Which settings modal, if any, is open for an editor.
///
/// Opening hands out a guard; the modal counts as closed as soon as the guard
/// is dropped, whichever way the modal was dismissed.
#[derive(Debug, Clone, Default)]
pub struct ModalScope {
    active: Arc<Mutex<Option<ModalKind>>>,
}

impl ModalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another modal is already open.
    pub fn open(&self, kind: ModalKind) -> Option<ModalGuard> {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if active.is_some() {
            return None;
        }
        *active = Some(kind);
        Some(ModalGuard {
            scope: self.clone(),
            kind,
        })
    }

    pub fn active(&self) -> Option<ModalKind> {
        *self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_open(&self) -> bool {
        self.active().is_some()
    }
}

#[derive(Debug)]
pub struct ModalGuard {
    scope: ModalScope,
    kind: ModalKind,
}

impl ModalGuard {
    pub fn kind(&self) -> ModalKind {
        self.kind
    }
}

impl Drop for ModalGuard {
    fn drop(&mut self) {
        let mut active = self
            .scope
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = None;
    }
}

/// A training plan open for editing: every edit recomputes the affected
/// estimates and schedules a debounced save.
pub struct EditorSession {
    plan: TrainingPlan,
    project: ProjectDefaults,
    planner: Planner,
    modals: ModalScope,
    autosave: Option<AutoSaver<TrainingPlan>>,
    selected: Option<(usize, usize)>,
}

impl EditorSession {
    pub fn new(plan: TrainingPlan, project: ProjectDefaults, planner: Planner) -> Self {
        Self {
            plan,
            project,
            planner,
            modals: ModalScope::new(),
            autosave: None,
            selected: None,
        }
    }

    pub fn with_autosave(mut self, saver: AutoSaver<TrainingPlan>) -> Self {
        self.autosave = Some(saver);
        self
    }

    pub fn plan(&self) -> &TrainingPlan {
        &self.plan
    }

    pub fn project(&self) -> &ProjectDefaults {
        &self.project
    }

    pub fn modals(&self) -> &ModalScope {
        &self.modals
    }

    pub fn selected(&self) -> Option<(usize, usize)> {
        self.selected
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.as_ref().map(AutoSaver::has_pending).unwrap_or(false)
    }

    /// Selecting a lesson refreshes its estimate. Ignored while a modal is open.
    pub fn select_lesson(
        &mut self,
        section_index: usize,
        lesson_index: usize,
        existing: &ExistingContent,
    ) -> Result<Option<LessonUpdate>, String> {
        if self.modals.is_open() {
            debug!(section_index, lesson_index, "lesson selection ignored while modal is open");
            return Ok(None);
        }
        let update = self.planner.recompute_lesson(
            &mut self.plan,
            &self.project,
            section_index,
            lesson_index,
            existing,
        )?;
        self.selected = Some((section_index, lesson_index));
        self.after_edit();
        Ok(Some(update))
    }

    pub fn set_lesson_tier(
        &mut self,
        section_index: usize,
        lesson_index: usize,
        tier: &str,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let update = self.planner.set_lesson_tier(
            &mut self.plan,
            &self.project,
            section_index,
            lesson_index,
            tier,
            existing,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn rename_lesson(
        &mut self,
        section_index: usize,
        lesson_index: usize,
        title: &str,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let update = self.planner.rename_lesson(
            &mut self.plan,
            &self.project,
            section_index,
            lesson_index,
            title,
            existing,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn set_lesson_rate(
        &mut self,
        section_index: usize,
        lesson_index: usize,
        rate: Option<f64>,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let update = self.planner.set_lesson_rate(
            &mut self.plan,
            &self.project,
            section_index,
            lesson_index,
            rate,
            existing,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn set_lesson_advanced_rates(
        &mut self,
        section_index: usize,
        lesson_index: usize,
        advanced: Option<bool>,
        rates: Option<ProductRates>,
        existing: &ExistingContent,
    ) -> Result<LessonUpdate, String> {
        let update = self.planner.set_lesson_advanced_rates(
            &mut self.plan,
            &self.project,
            section_index,
            lesson_index,
            advanced,
            rates,
            existing,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn override_products(
        &mut self,
        section_index: usize,
        lesson_index: usize,
        products: Vec<ContentProduct>,
    ) -> Result<LessonUpdate, String> {
        let update = self.planner.override_products(
            &mut self.plan,
            &self.project,
            section_index,
            lesson_index,
            products,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn set_section_tier(
        &mut self,
        section_index: usize,
        tier: &str,
        discovery: &dyn ExistingContentSource,
    ) -> Result<SectionUpdate, String> {
        let update = self.planner.set_section_tier(
            &mut self.plan,
            &self.project,
            section_index,
            tier,
            discovery,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn set_section_rate(
        &mut self,
        section_index: usize,
        rate: Option<f64>,
        discovery: &dyn ExistingContentSource,
    ) -> Result<SectionUpdate, String> {
        let update = self.planner.set_section_rate(
            &mut self.plan,
            &self.project,
            section_index,
            rate,
            discovery,
        )?;
        self.after_edit();
        Ok(update)
    }

    pub fn set_section_advanced_rates(
        &mut self,
        section_index: usize,
        advanced: Option<bool>,
        rates: Option<ProductRates>,
        discovery: &dyn ExistingContentSource,
    ) -> Result<SectionUpdate, String> {
        let update = self.planner.set_section_advanced_rates(
            &mut self.plan,
            &self.project,
            section_index,
            advanced,
            rates,
            discovery,
        )?;
        self.after_edit();
        Ok(update)
    }

    /// Replaces the project defaults. Lessons inheriting a changed tier are
    /// rescored; everything else reuses its products.
    pub fn update_project(
        &mut self,
        project: ProjectDefaults,
        discovery: &dyn ExistingContentSource,
    ) -> f64 {
        self.project = project;
        let total = self.planner.recompute_plan(&mut self.plan, &self.project, discovery);
        self.after_edit();
        total
    }

    /// Input lost focus: persist right away.
    pub async fn blur(&self) -> Result<bool, String> {
        match &self.autosave {
            Some(saver) => saver.flush().await,
            None => Ok(false),
        }
    }

    /// Leaving the editor: flush pending changes and hand back the plan.
    ///
    /// If the save fails the session comes back with the error, changes still
    /// pending, so the caller can retry or keep editing.
    pub async fn navigate_away(self) -> Result<TrainingPlan, (String, Box<Self>)> {
        if let Some(saver) = &self.autosave {
            if let Err(err) = saver.flush().await {
                warn!(error = %err, "leaving editor with unsaved changes refused");
                return Err((err, Box::new(self)));
            }
        }
        info!(lessons = self.plan.lesson_count(), "editor session closed");
        Ok(self.plan)
    }

    fn after_edit(&self) {
        if let Some(saver) = &self.autosave {
            saver.schedule(self.plan.clone());
        }
    }
}
