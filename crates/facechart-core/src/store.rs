//! Charting session store.
//!
//! [`ChartingStore`] owns the active session, its working collections and the
//! pending-sync queue. Every other component goes through its operations.
//!
//! The working collections (points, annotations, photos, notes) are edited in
//! place and copied onto the session record by [`ChartingStore::save_session`]
//! and [`ChartingStore::complete_session`]. Only the pending queue is written
//! to the injected [`SessionRepository`].

use crate::config::ChartingSettings;
use crate::error::{ChartError, ChartResult};
use crate::model::{
    AnnotationId, FreehandAnnotation, InjectionPoint, Patient, PhotoId, PhotoUpdate, PointDraft,
    PointId, PointUpdate, ProductCategory, SessionId, SessionStatus, SoapNotes, SoapNotesUpdate,
    SoapSection, TreatmentPhoto, TreatmentSession, ZoneRef,
};
use crate::model::{total_units, total_volume};
use crate::storage::{SessionRepository, StorageResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The charting session store.
pub struct ChartingStore {
    repository: Arc<dyn SessionRepository>,
    current_session: Option<TreatmentSession>,
    current_patient: Option<Patient>,
    /// Category applied to new points. Survives across sessions.
    product_type: ProductCategory,
    points: Vec<InjectionPoint>,
    spatial_points: Vec<InjectionPoint>,
    annotations: Vec<FreehandAnnotation>,
    photos: Vec<TreatmentPhoto>,
    soap_notes: SoapNotes,
    photo_consent: bool,
    selected_point: Option<PointId>,
    selected_spatial_point: Option<PointId>,
    /// Completed sessions awaiting sync, oldest first.
    pending: Vec<TreatmentSession>,
    /// Set when the last queue write failed; the next write rewrites the
    /// whole queue instead of appending.
    queue_unsaved: bool,
    dirty: bool,
}

impl ChartingStore {
    /// Create a store with an empty pending queue.
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            repository,
            current_session: None,
            current_patient: None,
            product_type: ProductCategory::default(),
            points: Vec::new(),
            spatial_points: Vec::new(),
            annotations: Vec::new(),
            photos: Vec::new(),
            soap_notes: SoapNotes::default(),
            photo_consent: false,
            selected_point: None,
            selected_spatial_point: None,
            pending: Vec::new(),
            queue_unsaved: false,
            dirty: false,
        }
    }

    /// Create a store and restore the persisted pending queue.
    ///
    /// A queue that cannot be read is logged and the store starts empty.
    pub fn open(repository: Arc<dyn SessionRepository>) -> Self {
        let mut store = Self::new(repository);
        match store.repository.load_pending_queue() {
            Ok(queue) => {
                if !queue.is_empty() {
                    log::info!("Restored {} pending session(s)", queue.len());
                }
                store.pending = queue;
            }
            Err(e) => log::error!("Failed to load pending sessions: {}", e),
        }
        store
    }

    /// Restore the persisted queue and apply the configured default product.
    pub fn open_with_settings(
        repository: Arc<dyn SessionRepository>,
        settings: &ChartingSettings,
    ) -> Self {
        let mut store = Self::open(repository);
        store.product_type = settings.default_product;
        store
    }

    // --- Session lifecycle ---

    /// Start a new session for `patient`.
    ///
    /// Fails if a session is already in progress or `provider_id` is blank.
    pub fn start_session(&mut self, patient: Patient, provider_id: &str) -> ChartResult<SessionId> {
        if self.current_session.is_some() {
            return Err(ChartError::SessionInProgress);
        }
        let provider_id = provider_id.trim();
        if provider_id.is_empty() {
            return Err(ChartError::MissingProvider);
        }

        self.reset_working_state();
        let session =
            TreatmentSession::new(patient.id.clone(), provider_id.to_string(), self.product_type);
        let id = session.id;
        log::info!("Started session {} for patient {}", id, patient.id);

        self.current_session = Some(session);
        self.current_patient = Some(patient);
        Ok(id)
    }

    /// Copy the working collections onto the active session record.
    ///
    /// Leaves the status unchanged. Returns false if no session is active.
    pub fn save_session(&mut self) -> bool {
        let Some(session) = self.current_session.as_mut() else {
            return false;
        };
        session.product_type = self.product_type;
        session.points = self.points.clone();
        session.spatial_points = self.spatial_points.clone();
        session.annotations = self.annotations.clone();
        session.photos = self.photos.clone();
        session.soap_notes = self.soap_notes.clone();
        session.photo_consent = self.photo_consent;
        self.dirty = false;
        true
    }

    /// Finish the active session and move it into the pending queue.
    ///
    /// Returns the queued session's id, or `None` if no session was active.
    pub fn complete_session(&mut self) -> Option<SessionId> {
        self.current_session.as_ref()?;
        self.save_session();

        let mut session = self.current_session.take()?;
        session.ended_at = Some(Utc::now());
        session.status = SessionStatus::PendingSync;
        let id = session.id;

        let result = if self.queue_unsaved {
            self.pending.push(session);
            self.repository.replace_pending_queue(&self.pending)
        } else {
            let result = self.repository.save(&session);
            self.pending.push(session);
            result
        };
        self.record_queue_write(result);
        self.reset_working_state();
        log::info!("Completed session {} ({} pending)", id, self.pending.len());
        Some(id)
    }

    /// Abandon the active session without queueing it.
    pub fn discard_session(&mut self) -> bool {
        let Some(session) = self.current_session.take() else {
            return false;
        };
        log::info!("Discarded session {}", session.id);
        self.reset_working_state();
        true
    }

    fn reset_working_state(&mut self) {
        self.current_session = None;
        self.current_patient = None;
        self.points.clear();
        self.spatial_points.clear();
        self.annotations.clear();
        self.photos.clear();
        self.soap_notes = SoapNotes::default();
        self.photo_consent = false;
        self.selected_point = None;
        self.selected_spatial_point = None;
        self.dirty = false;
    }

    pub fn current_session(&self) -> Option<&TreatmentSession> {
        self.current_session.as_ref()
    }

    pub fn current_patient(&self) -> Option<&Patient> {
        self.current_patient.as_ref()
    }

    pub fn has_active_session(&self) -> bool {
        self.current_session.is_some()
    }

    /// Whether anything changed since the last snapshot.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn require_session(&self) -> ChartResult<()> {
        if self.current_session.is_some() {
            Ok(())
        } else {
            Err(ChartError::NoActiveSession)
        }
    }

    // --- Product category ---

    pub fn product_type(&self) -> ProductCategory {
        self.product_type
    }

    /// Set the category used for new points.
    pub fn set_product_type(&mut self, product: ProductCategory) {
        if self.product_type != product {
            self.product_type = product;
            self.dirty |= self.current_session.is_some();
        }
    }

    // --- Injection points ---

    /// Add a chart point and select it.
    pub fn add_injection_point(&mut self, draft: PointDraft) -> ChartResult<PointId> {
        self.require_session()?;
        if draft.placement.is_spatial() {
            return Err(ChartError::PlacementMismatch);
        }
        let point = InjectionPoint::from_draft(draft)?;
        let id = point.id();
        log::debug!("Added point {} at {}", id, point.zone.as_str());

        self.points.push(point);
        self.selected_point = Some(id);
        self.dirty = true;
        Ok(id)
    }

    /// Merge `update` into a point.
    ///
    /// Returns `Ok(false)` if no point has `id`.
    pub fn update_injection_point(
        &mut self,
        id: PointId,
        update: PointUpdate,
    ) -> ChartResult<bool> {
        let Some(point) = self.points.iter_mut().find(|p| p.id() == id) else {
            return Ok(false);
        };
        point.apply(update)?;
        self.dirty = true;
        Ok(true)
    }

    /// Step a point's dose up or down.
    pub fn adjust_dose(&mut self, id: PointId, steps: i32) -> bool {
        let Some(point) = self.points.iter_mut().find(|p| p.id() == id) else {
            return false;
        };
        point.step_dose(steps);
        self.dirty = true;
        true
    }

    pub fn remove_injection_point(&mut self, id: PointId) -> bool {
        let before = self.points.len();
        self.points.retain(|p| p.id() != id);
        if self.points.len() == before {
            return false;
        }
        if self.selected_point == Some(id) {
            self.selected_point = None;
        }
        self.dirty = true;
        true
    }

    /// Remove every chart point and clear the selection.
    pub fn clear_all_points(&mut self) {
        if !self.points.is_empty() {
            self.dirty = true;
        }
        self.points.clear();
        self.selected_point = None;
    }

    pub fn points(&self) -> &[InjectionPoint] {
        &self.points
    }

    pub fn point(&self, id: PointId) -> Option<&InjectionPoint> {
        self.points.iter().find(|p| p.id() == id)
    }

    /// The chart point placed on catalog zone `zone_id`, if any.
    pub fn point_in_zone(&self, zone_id: &str) -> Option<&InjectionPoint> {
        self.points
            .iter()
            .find(|p| matches!(&p.zone, ZoneRef::Zone(z) if z == zone_id))
    }

    pub fn select_point(&mut self, id: PointId) -> bool {
        if self.point(id).is_none() {
            return false;
        }
        self.selected_point = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_point = None;
        self.selected_spatial_point = None;
    }

    pub fn selected_point(&self) -> Option<&InjectionPoint> {
        self.selected_point.and_then(|id| self.point(id))
    }

    /// Neurotoxin units across the working chart points.
    pub fn total_units(&self) -> u32 {
        total_units(&self.points)
    }

    /// Filler volume in mL across the working chart points.
    pub fn total_volume(&self) -> f64 {
        total_volume(&self.points)
    }

    // --- Spatial points ---

    /// Add a point to the 3-D collection and select it.
    pub fn add_spatial_point(&mut self, draft: PointDraft) -> ChartResult<PointId> {
        self.require_session()?;
        if !draft.placement.is_spatial() {
            return Err(ChartError::PlacementMismatch);
        }
        let point = InjectionPoint::from_draft(draft)?;
        let id = point.id();

        self.spatial_points.push(point);
        self.selected_spatial_point = Some(id);
        self.dirty = true;
        Ok(id)
    }

    pub fn update_spatial_point(&mut self, id: PointId, update: PointUpdate) -> ChartResult<bool> {
        let Some(point) = self.spatial_points.iter_mut().find(|p| p.id() == id) else {
            return Ok(false);
        };
        point.apply(update)?;
        self.dirty = true;
        Ok(true)
    }

    pub fn remove_spatial_point(&mut self, id: PointId) -> bool {
        let before = self.spatial_points.len();
        self.spatial_points.retain(|p| p.id() != id);
        if self.spatial_points.len() == before {
            return false;
        }
        if self.selected_spatial_point == Some(id) {
            self.selected_spatial_point = None;
        }
        self.dirty = true;
        true
    }

    pub fn select_spatial_point(&mut self, id: PointId) -> bool {
        if !self.spatial_points.iter().any(|p| p.id() == id) {
            return false;
        }
        self.selected_spatial_point = Some(id);
        true
    }

    pub fn selected_spatial_point(&self) -> Option<&InjectionPoint> {
        let id = self.selected_spatial_point?;
        self.spatial_points.iter().find(|p| p.id() == id)
    }

    pub fn spatial_points(&self) -> &[InjectionPoint] {
        &self.spatial_points
    }

    // --- Annotations ---

    pub fn add_annotation(&mut self, annotation: FreehandAnnotation) -> ChartResult<AnnotationId> {
        self.require_session()?;
        let id = annotation.id();
        self.annotations.push(annotation);
        self.dirty = true;
        Ok(id)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.id() != id);
        let removed = self.annotations.len() != before;
        self.dirty |= removed;
        removed
    }

    pub fn clear_annotations(&mut self) {
        if !self.annotations.is_empty() {
            self.dirty = true;
        }
        self.annotations.clear();
    }

    pub fn annotations(&self) -> &[FreehandAnnotation] {
        &self.annotations
    }

    // --- Photos ---

    /// Record consent for photographing the current patient.
    pub fn confirm_photo_consent(&mut self) -> ChartResult<()> {
        self.require_session()?;
        if !self.photo_consent {
            self.photo_consent = true;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn photo_consent(&self) -> bool {
        self.photo_consent
    }

    /// Attach a photo. Consent must have been confirmed first.
    pub fn add_photo(&mut self, photo: TreatmentPhoto) -> ChartResult<PhotoId> {
        self.require_session()?;
        if !self.photo_consent {
            return Err(ChartError::ConsentRequired);
        }
        let id = photo.id();
        self.photos.push(photo);
        self.dirty = true;
        Ok(id)
    }

    pub fn update_photo(&mut self, id: PhotoId, update: PhotoUpdate) -> bool {
        let Some(photo) = self.photos.iter_mut().find(|p| p.id() == id) else {
            return false;
        };
        photo.apply(update);
        self.dirty = true;
        true
    }

    /// Append a mark to a photo's annotations.
    pub fn add_photo_annotation(&mut self, id: PhotoId, annotation: FreehandAnnotation) -> bool {
        let Some(photo) = self.photos.iter_mut().find(|p| p.id() == id) else {
            return false;
        };
        photo.annotations.push(annotation);
        self.dirty = true;
        true
    }

    pub fn remove_photo(&mut self, id: PhotoId) -> bool {
        let before = self.photos.len();
        self.photos.retain(|p| p.id() != id);
        let removed = self.photos.len() != before;
        self.dirty |= removed;
        removed
    }

    pub fn photos(&self) -> &[TreatmentPhoto] {
        &self.photos
    }

    // --- SOAP notes ---

    /// Shallow-merge `update` into the notes. Returns false with no session.
    pub fn update_soap_notes(&mut self, update: SoapNotesUpdate) -> bool {
        if self.current_session.is_none() {
            return false;
        }
        self.soap_notes.merge(update);
        self.dirty = true;
        true
    }

    pub fn soap_notes(&self) -> &SoapNotes {
        &self.soap_notes
    }

    /// Append a totals summary to the plan section and return it.
    pub fn generate_treatment_summary(&mut self) -> Option<String> {
        self.current_session.as_ref()?;
        let summary = format!(
            "Treatment Summary:\n- Total neurotoxin: {} units\n\
             - Total filler: {:.1} mL\n- Injection sites: {}\n",
            self.total_units(),
            self.total_volume(),
            self.points.len()
        );
        self.soap_notes.append(SoapSection::Plan, &summary, "\n\n");
        self.dirty = true;
        Some(summary)
    }

    // --- Pending queue ---

    pub fn pending_sessions(&self) -> &[TreatmentSession] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Remove `ids` from the pending queue after the remote accepted them.
    ///
    /// The removed sessions are returned with status `Completed` and
    /// `synced_at` set to `at`. Unknown ids are ignored.
    pub fn acknowledge_synced(
        &mut self,
        ids: &[SessionId],
        at: DateTime<Utc>,
    ) -> Vec<TreatmentSession> {
        let (mut synced, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|s| ids.contains(&s.id));
        self.pending = remaining;

        for session in &mut synced {
            session.status = SessionStatus::Completed;
            session.synced_at = Some(at);
        }

        if !synced.is_empty() || self.queue_unsaved {
            let result = self.repository.replace_pending_queue(&self.pending);
            self.record_queue_write(result);
        }
        synced
    }

    /// Whether the persisted queue is known to lag the in-memory one.
    pub fn has_unsaved_queue(&self) -> bool {
        self.queue_unsaved
    }

    fn record_queue_write(&mut self, result: StorageResult<()>) {
        match result {
            Ok(()) => {
                if self.queue_unsaved {
                    log::info!("Persisted pending queue ({} sessions)", self.pending.len());
                }
                self.queue_unsaved = false;
            }
            Err(e) => {
                log::error!("Failed to persist pending queue: {}", e);
                self.queue_unsaved = true;
            }
        }
    }
}
