// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator.
//
// One named thread pulls frames in capture order and runs, per frame:
//
//   dispatch -> detector -> confidence gate -> coordinate transform -> overlay
//
// Mode changes and context updates come from other threads and only touch
// short critical sections. Captures run on tokio's blocking pool so they can
// overlap with frame processing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use scanlens_bridge::record::ScanRecord;
use scanlens_bridge::traits::{Frame, FrameSource, ResultSink, StillCapture, TextRecognizer};
use scanlens_core::config::PipelineConfig;
use scanlens_core::error::{Result, ScanlensError};
use scanlens_core::human_errors::humanize_error;
use scanlens_core::types::{
    BarcodeOverlay, CameraPosition, CaptureSettings, Detection, DeviceOrientation, DocumentOverlay,
    FaceDetection, FaceOverlay, FlashMode, LandmarkPath, Mode, OverlayState, Pitch,
    RectangleDetection, ScanId, ScanKind, TransformContext,
};
use scanlens_vision::{ConfidenceGate, CoordinateTransformer, GazeEstimator, PerspectiveRectifier};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::dispatch::{DetectorDispatch, DetectorSet};
use crate::overlay::OverlayStore;

const EVENT_CAPACITY: usize = 64;
const FRAME_THREAD_NAME: &str = "frame-pipeline";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    ModeChanged { from: Mode, to: Mode },
    /// A detector call failed. The frame was skipped and its overlay cleared.
    DetectorFailed { mode: Mode, error: String },
    Captured { id: ScanId, kind: ScanKind },
}

/// External collaborators the pipeline drives.
pub struct Collaborators {
    pub detectors: DetectorSet,
    pub still: Arc<dyn StillCapture>,
    pub sink: Arc<dyn ResultSink>,
    pub recognizer: Option<Arc<dyn TextRecognizer>>,
}

struct Shared {
    dispatch: Mutex<DetectorDispatch>,
    context: Mutex<TransformContext>,
    overlays: Arc<OverlayStore>,
    /// Latest rectangle that passed the capture threshold in Document mode.
    candidate: Mutex<Option<RectangleDetection>>,
    capture_settings: Mutex<CaptureSettings>,
    gate: ConfidenceGate,
    gaze: GazeEstimator,
    rectifier: PerspectiveRectifier,
    recognize_text: bool,
    still: Arc<dyn StillCapture>,
    sink: Arc<dyn ResultSink>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    events: broadcast::Sender<PipelineEvent>,
    running: AtomicBool,
}

/// Handle to the live camera pipeline. Clones share one pipeline.
#[derive(Clone)]
pub struct Pipeline {
    shared: Arc<Shared>,
}

impl Pipeline {
    /// Build a pipeline. Fails with `InvalidConfig` for unusable settings.
    pub fn new(config: &PipelineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Shared {
            dispatch: Mutex::new(DetectorDispatch::new(
                collaborators.detectors,
                config.initial_mode,
            )),
            context: Mutex::new(config.transform_context()),
            overlays: Arc::new(OverlayStore::new(config.initial_mode)),
            candidate: Mutex::new(None),
            capture_settings: Mutex::new(config.capture),
            gate: ConfidenceGate::new(config.gate),
            gaze: GazeEstimator::new(config.gaze),
            rectifier: PerspectiveRectifier::new(config.rectify),
            recognize_text: config.recognize_text,
            still: collaborators.still,
            sink: collaborators.sink,
            recognizer: collaborators.recognizer,
            events,
            running: AtomicBool::new(false),
        };
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    // -- Observation ----------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.shared.events.subscribe()
    }

    pub fn overlays(&self) -> Arc<OverlayStore> {
        Arc::clone(&self.shared.overlays)
    }

    pub fn mode(&self) -> Mode {
        lock(&self.shared.dispatch).mode()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Current capture candidate, if a rectangle passed the capture gate.
    pub fn capture_candidate(&self) -> Option<RectangleDetection> {
        lock(&self.shared.candidate).clone()
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }

    // -- Control --------------------------------------------------------------

    /// Switch modes. Clears every overlay and the capture candidate in the
    /// same step so no stale geometry survives. Returns whether the mode
    /// changed.
    pub fn set_mode(&self, mode: Mode) -> bool {
        let transition = {
            let mut dispatch = lock(&self.shared.dispatch);
            let transition = dispatch.transition(mode);
            if transition.is_some() {
                self.shared.overlays.switch_mode(mode);
                *lock(&self.shared.candidate) = None;
            }
            transition
        };
        match transition {
            Some(t) => {
                self.emit(PipelineEvent::ModeChanged {
                    from: t.from,
                    to: t.to,
                });
                true
            }
            None => false,
        }
    }

    pub fn context(&self) -> TransformContext {
        *lock(&self.shared.context)
    }

    /// Replace the transform context. Takes effect from the next frame.
    pub fn set_context(&self, context: TransformContext) {
        *lock(&self.shared.context) = context;
    }

    pub fn set_orientation(&self, orientation: DeviceOrientation) {
        lock(&self.shared.context).orientation = orientation;
    }

    pub fn set_camera(&self, camera: CameraPosition) {
        lock(&self.shared.context).camera = camera;
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        *lock(&self.shared.capture_settings)
    }

    /// Advance the flash toggle (auto, on, off) and return the new mode.
    pub fn cycle_flash(&self) -> FlashMode {
        let mut settings = lock(&self.shared.capture_settings);
        settings.flash = settings.flash.cycle();
        settings.flash
    }

    // -- Frame processing -----------------------------------------------------

    /// Start pulling frames from `source` on a dedicated thread.
    ///
    /// `source.start()` runs on the calling thread, so a camera that cannot
    /// be opened fails here before any frame flows.
    #[instrument(skip_all)]
    pub fn start(&self, mut source: Box<dyn FrameSource>) -> Result<PipelineHandle> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Err(ScanlensError::AlreadyRunning);
        }
        if let Err(err) = source.start() {
            self.shared.running.store(false, Ordering::SeqCst);
            warn!(error = %err, "Frame source failed to start");
            return Err(err);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let processed = Arc::new(AtomicUsize::new(0));
        let pipeline = self.clone();
        let thread_stop = Arc::clone(&stop);
        let thread_processed = Arc::clone(&processed);

        let spawned = std::thread::Builder::new()
            .name(FRAME_THREAD_NAME.into())
            .spawn(move || {
                pipeline.run_frames(source.as_mut(), &thread_stop, &thread_processed);
                source.stop();
                pipeline.shared.running.store(false, Ordering::SeqCst);
                info!(
                    frames = thread_processed.load(Ordering::SeqCst),
                    "Frame pipeline stopped"
                );
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        };

        info!(mode = %self.mode(), "Frame pipeline started");
        Ok(PipelineHandle {
            stop,
            processed,
            thread: Some(thread),
        })
    }

    fn run_frames(&self, source: &mut dyn FrameSource, stop: &AtomicBool, processed: &AtomicUsize) {
        while !stop.load(Ordering::SeqCst) {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.process_frame(&frame);
                    processed.fetch_add(1, Ordering::SeqCst);
                }
                Ok(None) => {
                    debug!("Frame source exhausted");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "Frame source failed; stopping");
                    break;
                }
            }
        }
    }

    /// Run one frame through the active detector and publish its overlay.
    ///
    /// Never fails: detector errors clear the mode's overlay and are
    /// broadcast as [`PipelineEvent::DetectorFailed`].
    pub fn process_frame(&self, frame: &Frame) {
        let context = self.context();
        let (mode, route) = {
            let dispatch = lock(&self.shared.dispatch);
            (dispatch.mode(), dispatch.route())
        };

        if route.is_idle() {
            self.publish(mode, OverlayState::Empty, None);
            return;
        }

        let transformer = match CoordinateTransformer::new(context) {
            Ok(transformer) => transformer,
            Err(err) => {
                warn!(error = %err, "Skipping frame");
                self.publish(mode, OverlayState::Empty, None);
                return;
            }
        };

        match route.detect(&frame.pixels, frame.orientation) {
            Ok(detections) => {
                debug!(%mode, count = detections.len(), timestamp = ?frame.timestamp, "Frame analysed");
                let (state, candidate) = self.build_overlay(mode, detections, &transformer);
                self.publish(mode, state, candidate);
            }
            Err(err) => {
                warn!(%mode, error = %err, "Detector failed; frame skipped");
                self.publish(mode, OverlayState::Empty, None);
                self.emit(PipelineEvent::DetectorFailed {
                    mode,
                    error: humanize_error(&err).message,
                });
            }
        }
    }

    fn publish(&self, mode: Mode, state: OverlayState, candidate: Option<RectangleDetection>) {
        if !self.shared.overlays.set(mode, state) {
            return;
        }
        if mode == Mode::Document {
            *lock(&self.shared.candidate) = candidate;
        }
    }

    fn build_overlay(
        &self,
        mode: Mode,
        detections: Vec<Detection>,
        transformer: &CoordinateTransformer,
    ) -> (OverlayState, Option<RectangleDetection>) {
        let accepted = self.shared.gate.filter(detections);
        match mode {
            Mode::Camera => (OverlayState::Empty, None),
            Mode::Barcode => {
                let barcodes: Vec<BarcodeOverlay> = accepted
                    .into_iter()
                    .filter_map(|detection| match detection {
                        Detection::Barcode(barcode) => Some(BarcodeOverlay {
                            bounds: transformer.to_display(&barcode.bounds),
                            payload: barcode.payload,
                        }),
                        _ => None,
                    })
                    .collect();
                (OverlayState::Barcodes(barcodes), None)
            }
            Mode::Document => {
                let rects: Vec<RectangleDetection> = accepted
                    .into_iter()
                    .filter_map(|detection| match detection {
                        Detection::Rectangle(rect) => Some(rect),
                        _ => None,
                    })
                    .collect();
                let candidate = rects
                    .iter()
                    .filter(|rect| self.shared.gate.accept_for_capture(rect))
                    .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
                    .cloned();
                let documents = rects
                    .iter()
                    .map(|rect| document_overlay(rect, transformer))
                    .collect();
                (OverlayState::Documents(documents), candidate)
            }
            Mode::FaceLandmarks => match first_face(accepted) {
                Some(face) => (OverlayState::Face(face_overlay(&face, transformer)), None),
                None => (OverlayState::Empty, None),
            },
            Mode::FacePitch => {
                let pitch = first_face(accepted)
                    .map(|face| self.shared.gaze.estimate(&face, transformer))
                    .unwrap_or_else(Pitch::cleared);
                (OverlayState::Pitch(pitch), None)
            }
        }
    }

    // -- Capture --------------------------------------------------------------

    /// Take a still photo and submit it as a scan.
    ///
    /// In Document mode with a capture candidate the photo is rectified; an
    /// empty rectification falls back to the uncropped photo. Text
    /// recognition failures keep the default headline and content.
    #[instrument(skip(self), fields(mode = %self.mode()))]
    pub async fn capture(&self, settings: CaptureSettings) -> Result<ScanRecord> {
        let candidate = match self.mode() {
            Mode::Document => self.capture_candidate(),
            _ => None,
        };
        let shared = Arc::clone(&self.shared);

        let record = tokio::task::spawn_blocking(move || -> Result<ScanRecord> {
            let photo = shared.still.capture_photo(&settings)?;
            let (kind, image) = match candidate {
                Some(rect) => {
                    let document = shared.rectifier.rectify(&rect.corners, &photo);
                    if document.is_empty() {
                        warn!("Rectification produced nothing; keeping the full photo");
                        (ScanKind::Photo, photo)
                    } else {
                        (ScanKind::Rectified, document.into_image())
                    }
                }
                None => (ScanKind::Photo, photo),
            };

            let mut record = ScanRecord::new(kind, image);
            if shared.recognize_text {
                if let Some(recognizer) = &shared.recognizer {
                    match recognizer.recognize(&record.image) {
                        Ok(lines) => record = record.with_recognized_text(&lines),
                        Err(err) => warn!(error = %err, "Text recognition failed"),
                    }
                }
            }
            Ok(record)
        })
        .await
        .map_err(|err| ScanlensError::Capture(format!("capture worker failed: {err}")))??;

        self.shared.sink.submit(record.clone())?;
        info!(id = %record.id, kind = ?record.kind, "Scan captured");
        self.emit(PipelineEvent::Captured {
            id: record.id,
            kind: record.kind,
        });
        Ok(record)
    }
}

fn first_face(detections: Vec<Detection>) -> Option<FaceDetection> {
    detections.into_iter().find_map(|detection| match detection {
        Detection::Face(face) => Some(face),
        _ => None,
    })
}

fn document_overlay(rect: &RectangleDetection, transformer: &CoordinateTransformer) -> DocumentOverlay {
    let corners = &rect.corners;
    DocumentOverlay {
        bounds: transformer.to_display(&rect.bounds),
        outline: [
            corners.top_left,
            corners.top_right,
            corners.bottom_right,
            corners.bottom_left,
        ]
        .map(|corner| transformer.to_display_point(corner)),
        confidence: rect.confidence,
    }
}

fn face_overlay(face: &FaceDetection, transformer: &CoordinateTransformer) -> FaceOverlay {
    FaceOverlay {
        bounds: transformer.to_display(&face.bounds),
        landmarks: face
            .landmarks
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(kind, points)| LandmarkPath {
                kind: *kind,
                points: points
                    .iter()
                    .map(|p| transformer.landmark_to_display(*p, &face.bounds))
                    .collect(),
                closed: kind.is_closed(),
            })
            .collect(),
    }
}

/// Controls a running frame thread.
pub struct PipelineHandle {
    stop: Arc<AtomicBool>,
    processed: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Ask the frame thread to stop after the frame in flight.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Frames processed so far.
    pub fn frames_processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the frame thread to exit (it exits on its own when the source
    /// ends). Returns the number of frames processed.
    pub fn join(mut self) -> Result<usize> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| ScanlensError::Bridge("frame thread panicked".into()))?;
        }
        Ok(self.frames_processed())
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use image::{DynamicImage, RgbImage};
    use scanlens_bridge::traits::{SequentialDetector, StatelessDetector};
    use scanlens_bridge::ReplayCamera;
    use scanlens_core::geometry::{NormalizedPoint, NormalizedRect};
    use scanlens_core::types::{BarcodeDetection, LandmarkKind, QuadCorners};

    use crate::sink::ScanRepository;

    struct Barcodes(Vec<f32>);

    impl StatelessDetector for Barcodes {
        fn name(&self) -> &str {
            "barcodes"
        }

        fn detect(&self, _: &DynamicImage, _: DeviceOrientation) -> Result<Vec<Detection>> {
            Ok(self
                .0
                .iter()
                .map(|confidence| {
                    Detection::Barcode(BarcodeDetection {
                        bounds: NormalizedRect::new(0.25, 0.25, 0.5, 0.25),
                        confidence: *confidence,
                        payload: format!("{confidence}"),
                    })
                })
                .collect())
        }
    }

    struct Rectangles(f32);

    impl StatelessDetector for Rectangles {
        fn name(&self) -> &str {
            "rectangles"
        }

        fn detect(&self, _: &DynamicImage, _: DeviceOrientation) -> Result<Vec<Detection>> {
            let corners = QuadCorners::from_rect(&NormalizedRect::new(0.25, 0.25, 0.5, 0.5));
            Ok(vec![Detection::Rectangle(RectangleDetection::from_corners(
                corners, self.0,
            ))])
        }
    }

    struct Faces;

    impl SequentialDetector for Faces {
        fn name(&self) -> &str {
            "faces"
        }

        fn detect_sequential(
            &mut self,
            _: &DynamicImage,
            _: DeviceOrientation,
        ) -> Result<Vec<Detection>> {
            let mut landmarks = BTreeMap::new();
            landmarks.insert(
                LandmarkKind::LeftEye,
                vec![NormalizedPoint::new(0.2, 0.6), NormalizedPoint::new(0.4, 0.6)],
            );
            landmarks.insert(
                LandmarkKind::Nose,
                vec![NormalizedPoint::new(0.5, 0.5), NormalizedPoint::new(0.5, 0.3)],
            );
            Ok(vec![Detection::Face(FaceDetection {
                bounds: NormalizedRect::new(0.25, 0.25, 0.5, 0.5),
                landmarks,
            })])
        }
    }

    fn frame() -> Frame {
        Frame {
            pixels: Arc::new(DynamicImage::ImageRgb8(RgbImage::new(8, 8))),
            timestamp: Duration::ZERO,
            orientation: DeviceOrientation::Portrait,
        }
    }

    fn pipeline(detectors: DetectorSet, initial_mode: Mode) -> Pipeline {
        let config = PipelineConfig {
            initial_mode,
            ..PipelineConfig::default()
        };
        let camera = ReplayCamera::new(DynamicImage::ImageRgb8(RgbImage::new(64, 64)), 1);
        Pipeline::new(
            &config,
            Collaborators {
                detectors,
                still: Arc::new(camera),
                sink: Arc::new(ScanRepository::new()),
                recognizer: None,
            },
        )
        .expect("valid pipeline")
    }

    #[test]
    fn low_confidence_barcodes_are_not_drawn() {
        let p = pipeline(
            DetectorSet::new().with_barcode(Barcodes(vec![0.95, 0.5])),
            Mode::Barcode,
        );
        p.process_frame(&frame());
        match p.overlays().get(Mode::Barcode) {
            OverlayState::Barcodes(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].payload, "0.95");
            }
            other => panic!("unexpected overlay {other:?}"),
        }
    }

    #[test]
    fn preview_rectangle_below_capture_gate_is_not_a_candidate() {
        let p = pipeline(DetectorSet::new().with_document(Rectangles(0.95)), Mode::Document);
        p.process_frame(&frame());
        assert!(!p.overlays().get(Mode::Document).is_empty());
        assert!(p.capture_candidate().is_none());
    }

    #[test]
    fn confident_rectangle_becomes_candidate() {
        let p = pipeline(DetectorSet::new().with_document(Rectangles(0.99)), Mode::Document);
        p.process_frame(&frame());
        assert!(p.capture_candidate().is_some());
        p.set_mode(Mode::Camera);
        assert!(p.capture_candidate().is_none());
    }

    #[test]
    fn face_landmarks_become_paths() {
        let p = pipeline(DetectorSet::new().with_face(Faces), Mode::FaceLandmarks);
        p.process_frame(&frame());
        match p.overlays().get(Mode::FaceLandmarks) {
            OverlayState::Face(face) => {
                assert_eq!(face.landmarks.len(), 2);
                let eye = face
                    .landmarks
                    .iter()
                    .find(|path| path.kind == LandmarkKind::LeftEye)
                    .expect("left eye");
                assert!(eye.closed);
            }
            other => panic!("unexpected overlay {other:?}"),
        }
    }

    #[test]
    fn pitch_without_pupils_is_cleared() {
        let p = pipeline(DetectorSet::new().with_face(Faces), Mode::FacePitch);
        p.process_frame(&frame());
        assert!(p.overlays().get(Mode::FacePitch).is_empty());
    }

    #[test]
    fn camera_mode_draws_nothing() {
        let p = pipeline(
            DetectorSet::new().with_barcode(Barcodes(vec![0.99])),
            Mode::Camera,
        );
        p.process_frame(&frame());
        assert!(p.overlays().snapshot().is_clear());
    }

    #[test]
    fn flash_cycles() {
        let p = pipeline(DetectorSet::new(), Mode::Camera);
        assert_eq!(p.capture_settings().flash, FlashMode::Auto);
        assert_eq!(p.cycle_flash(), FlashMode::On);
        assert_eq!(p.cycle_flash(), FlashMode::Off);
        assert_eq!(p.cycle_flash(), FlashMode::Auto);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.gate.barcode_min = 2.0;
        let result = Pipeline::new(
            &config,
            Collaborators {
                detectors: DetectorSet::new(),
                still: Arc::new(ReplayCamera::new(
                    DynamicImage::ImageRgb8(RgbImage::new(1, 1)),
                    1,
                )),
                sink: Arc::new(ScanRepository::new()),
                recognizer: None,
            },
        );
        assert!(matches!(result, Err(ScanlensError::InvalidConfig(_))));
    }
}
