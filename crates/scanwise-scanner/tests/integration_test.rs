use async_trait::async_trait;
use futures::stream;
use scanwise_auth::{AuthSession, StaticTokenProvider, UserIdentity};
use scanwise_capture::{
    BarcodeDecoder, CaptureAdapter, ImageFile, ProgressSink, TextRecognizer,
};
use scanwise_client::{AnalysisService, ClientError, SubmitOutcome, EMPTY_RESULT_MESSAGE};
use scanwise_core::{
    AcquisitionMode, Alternative, AnalysisResult, CanonicalRequest, CaptureConfig, CatalogProduct,
    DraftDefaults, DraftField, FavoriteStatus, HistoryEntry, ProductData, ProductId,
    ScoreBreakdown, StatusLabel, SubmissionId, UserProfile,
};
use scanwise_scanner::{
    CaptureStatus, ScanError, ScanSession, SideEffectCoordinator, SideEffectOutcome, SubmitStatus,
    BARCODE_NOT_FOUND_MESSAGE,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Clone, Copy)]
enum Reply {
    Analysis(f64, Option<&'static str>),
    Empty,
    Remote(&'static str),
}

fn analysis(score: f64, category: Option<&str>) -> AnalysisResult {
    AnalysisResult {
        product_name: Some("Hydra Cream".to_string()),
        toxicity_score: score,
        status_label: StatusLabel::Moderate,
        score_breakdown: ScoreBreakdown {
            base: score,
            usage_factor: 1.0,
        },
        ingredients: vec!["aqua".to_string(), "parfum".to_string()],
        per_ingredient_report: Vec::new(),
        skin_type_warnings: BTreeSet::new(),
        skin_tone_warnings: BTreeSet::new(),
        category: category.map(str::to_string),
    }
}

/// In-memory analysis service recording every call.
struct FakeService {
    reply: Mutex<Reply>,
    first_scan_gate: Option<Arc<Notify>>,
    lookup_gate: Option<Arc<Notify>>,
    lookup_started: Notify,
    scans: Mutex<Vec<CanonicalRequest>>,
    history_calls: AtomicUsize,
    fail_history: AtomicBool,
    alternatives_calls: Mutex<Vec<(String, f64)>>,
    favorites: Mutex<Vec<String>>,
}

impl FakeService {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self::with_gate(reply, None))
    }

    fn with_gate(reply: Reply, first_scan_gate: Option<Arc<Notify>>) -> Self {
        Self {
            reply: Mutex::new(reply),
            first_scan_gate,
            lookup_gate: None,
            lookup_started: Notify::new(),
            scans: Mutex::new(Vec::new()),
            history_calls: AtomicUsize::new(0),
            fail_history: AtomicBool::new(false),
            alternatives_calls: Mutex::new(Vec::new()),
            favorites: Mutex::new(Vec::new()),
        }
    }

    fn scan_count(&self) -> usize {
        self.scans.lock().unwrap().len()
    }

    fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }
}

#[async_trait]
impl AnalysisService for FakeService {
    async fn scan_product(&self, request: &CanonicalRequest) -> scanwise_client::Result<SubmitOutcome> {
        let reply = *self.reply.lock().unwrap();
        let first = {
            let mut scans = self.scans.lock().unwrap();
            scans.push(request.clone());
            scans.len() == 1
        };
        if first {
            if let Some(gate) = &self.first_scan_gate {
                gate.notified().await;
            }
        }
        match reply {
            Reply::Analysis(score, category) => {
                Ok(SubmitOutcome::Analysis(analysis(score, category)))
            }
            Reply::Empty => Ok(SubmitOutcome::Empty),
            Reply::Remote(message) => Err(ClientError::Remote(message.to_string())),
        }
    }

    async fn lookup_barcode(&self, barcode: &ProductId) -> scanwise_client::Result<ProductData> {
        self.lookup_started.notify_one();
        if let Some(gate) = &self.lookup_gate {
            gate.notified().await;
        }
        match barcode.as_str() {
            "3600523" => Ok(ProductData {
                product_name: Some("Sun Lotion".to_string()),
                ingredients_text: Some("aqua, octocrylene".to_string()),
                category: Some("sunscreen".to_string()),
            }),
            other => Err(ClientError::NotFound(other.to_string())),
        }
    }

    async fn search_catalog(&self, query: &str) -> scanwise_client::Result<Vec<CatalogProduct>> {
        Ok(vec![CatalogProduct {
            id: "p-1".to_string(),
            product_name: format!("{query} Cream"),
            brand: None,
        }])
    }

    async fn recommend_alternatives(
        &self,
        category: &str,
        score: f64,
    ) -> scanwise_client::Result<Vec<Alternative>> {
        self.alternatives_calls
            .lock()
            .unwrap()
            .push((category.to_string(), score));
        Ok(vec![Alternative {
            product_name: "Gentle Cream".to_string(),
            brand: Some("Acme".to_string()),
            toxicity_score: 0.1,
        }])
    }

    async fn record_history(&self, _result: &AnalysisResult) -> scanwise_client::Result<()> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("history store offline".to_string()));
        }
        Ok(())
    }

    async fn add_favorite(&self, product_name: &str) -> scanwise_client::Result<FavoriteStatus> {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites.iter().any(|name| name == product_name) {
            return Ok(FavoriteStatus::AlreadyExists);
        }
        favorites.push(product_name.to_string());
        Ok(FavoriteStatus::Added)
    }

    async fn fetch_history(&self) -> scanwise_client::Result<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    async fn fetch_profile(&self) -> scanwise_client::Result<UserProfile> {
        Ok(UserProfile {
            skin_type: Some("Dry".to_string()),
            skin_tone: Some("Dark".to_string()),
            theme_preference: None,
        })
    }

    async fn save_profile(&self, _profile: &UserProfile) -> scanwise_client::Result<()> {
        Ok(())
    }
}

/// Recognizer that waits for a release before returning its text.
struct GatedRecognizer {
    release: Notify,
    started: Notify,
}

#[async_trait]
impl TextRecognizer for GatedRecognizer {
    async fn recognize(
        &self,
        _image: &ImageFile,
        _language: &str,
        mut progress: ProgressSink,
    ) -> scanwise_capture::Result<String> {
        progress.report(0.5);
        self.started.notify_one();
        self.release.notified().await;
        Ok("Ingredients: aqua,\n glycerin".to_string())
    }

    fn engine_id(&self) -> &str {
        "gated"
    }
}

/// Decoder that reads the frame name as the barcode.
struct NameDecoder;

#[async_trait]
impl BarcodeDecoder for NameDecoder {
    async fn decode(&self, frame: &ImageFile) -> scanwise_capture::Result<Option<String>> {
        Ok(match frame.name() {
            "blank" => None,
            name => Some(name.to_string()),
        })
    }

    fn engine_id(&self) -> &str {
        "name"
    }
}

fn frame(name: &str) -> ImageFile {
    ImageFile::new(name, "image/png", vec![0; 4])
}

fn recognizer() -> Arc<GatedRecognizer> {
    Arc::new(GatedRecognizer {
        release: Notify::new(),
        started: Notify::new(),
    })
}

fn signed_in() -> AuthSession {
    let auth = AuthSession::new();
    auth.sign_in(
        UserIdentity::new("user-1"),
        Arc::new(StaticTokenProvider::new("token-1")),
    );
    auth
}

fn session_with(
    service: Arc<FakeService>,
    recognizer: Arc<GatedRecognizer>,
    auth: AuthSession,
) -> ScanSession {
    let capture = CaptureAdapter::new(recognizer, Arc::new(NameDecoder), &CaptureConfig::default());
    ScanSession::new(service, capture, auth, &DraftDefaults::default())
}

fn manual_session(service: Arc<FakeService>, auth: AuthSession) -> ScanSession {
    let session = session_with(service, recognizer(), auth);
    session.select_mode(AcquisitionMode::Manual);
    session
        .update_draft_field(DraftField::IngredientsText, "aqua, parfum")
        .expect("ingredients allowed in manual");
    session
}

async fn submit_and_settle(session: &ScanSession) -> SubmitStatus {
    let status = session.submit().await.expect("submit");
    match status {
        SubmitStatus::Analyzed { submission, effects } => {
            effects.settle().await;
            SubmitStatus::Analyzed {
                submission,
                effects: Default::default(),
            }
        }
        SubmitStatus::Empty => SubmitStatus::Empty,
    }
}

#[tokio::test]
async fn test_submit_fires_side_effects_once() {
    let service = FakeService::new(Reply::Analysis(0.31, Some("cream")));
    let session = manual_session(Arc::clone(&service), signed_in());

    submit_and_settle(&session).await;

    assert_eq!(service.scan_count(), 1);
    assert_eq!(service.history_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *service.alternatives_calls.lock().unwrap(),
        vec![("cream".to_string(), 0.31)]
    );

    let effects = session.side_effect_state();
    assert_eq!(effects.history, Some(SideEffectOutcome::Succeeded));
    assert_eq!(effects.alternatives, Some(SideEffectOutcome::Succeeded));
    assert_eq!(effects.alternative_products.len(), 1);

    // Rendering is pure
    let first = session.render().expect("result view");
    let second = session.render().expect("result view");
    assert_eq!(first, second);
    assert_eq!(first.title, "Hydra Cream");
    tokio::task::yield_now().await;
    assert_eq!(service.history_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.alternatives_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_coordinator_fires_once_per_submission() {
    let service = FakeService::new(Reply::Empty);
    let coordinator = SideEffectCoordinator::new(service.clone(), signed_in());
    let submission = SubmissionId::generate();
    let result = analysis(0.5, Some("cream"));

    coordinator
        .on_analysis_succeeded(submission, &result, None)
        .settle()
        .await;
    let again = coordinator.on_analysis_succeeded(submission, &result, None);
    assert!(again.is_empty());
    again.settle().await;

    assert_eq!(service.history_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.alternatives_calls.lock().unwrap().len(), 1);
    assert_eq!(coordinator.state().submission, Some(submission));
}

#[tokio::test]
async fn test_alternatives_threshold_is_exclusive() {
    let service = FakeService::new(Reply::Analysis(0.3, Some("cream")));
    let session = manual_session(Arc::clone(&service), signed_in());

    submit_and_settle(&session).await;

    assert!(service.alternatives_calls.lock().unwrap().is_empty());
    assert!(session.side_effect_state().alternatives.is_none());
    assert_eq!(service.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_request_category_used_when_result_has_none() {
    let service = FakeService::new(Reply::Analysis(0.8, None));
    let session = manual_session(Arc::clone(&service), AuthSession::new());
    session
        .update_draft_field(DraftField::Category, "serum")
        .expect("category is shared");

    submit_and_settle(&session).await;

    assert_eq!(
        *service.alternatives_calls.lock().unwrap(),
        vec![("serum".to_string(), 0.8)]
    );
}

#[tokio::test]
async fn test_history_requires_sign_in() {
    let service = FakeService::new(Reply::Analysis(0.5, Some("cream")));
    let session = manual_session(Arc::clone(&service), AuthSession::new());

    submit_and_settle(&session).await;

    assert_eq!(service.history_calls.load(Ordering::SeqCst), 0);
    assert!(session.side_effect_state().history.is_none());
    assert_eq!(service.alternatives_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_side_effect_failure_keeps_result() {
    let service = FakeService::new(Reply::Analysis(0.2, None));
    service.fail_history.store(true, Ordering::SeqCst);
    let session = manual_session(Arc::clone(&service), signed_in());

    submit_and_settle(&session).await;

    assert!(matches!(
        session.side_effect_state().history,
        Some(SideEffectOutcome::Failed(_))
    ));
    let snapshot = session.snapshot();
    assert!(snapshot.result.is_some());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_validation_error_sends_nothing() {
    let service = FakeService::new(Reply::Analysis(0.2, None));
    let session = session_with(Arc::clone(&service), recognizer(), signed_in());
    session.select_mode(AcquisitionMode::Manual);

    let err = session.submit().await.unwrap_err();
    assert!(matches!(err, ScanError::Validation(_)));
    assert_eq!(service.scan_count(), 0);
    assert_eq!(
        session.snapshot().error.as_deref(),
        Some("ingredients_text is required")
    );
}

#[tokio::test]
async fn test_remote_error_keeps_draft_and_clears_result() {
    let service = FakeService::new(Reply::Analysis(0.2, None));
    let session = manual_session(Arc::clone(&service), signed_in());
    submit_and_settle(&session).await;
    assert!(session.result().is_some());

    service.set_reply(Reply::Remote("Ingredients not found in database"));
    let err = session.submit().await.unwrap_err();
    assert_eq!(err.user_message(), "Ingredients not found in database");

    let snapshot = session.snapshot();
    assert!(snapshot.result.is_none());
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Ingredients not found in database")
    );
    assert_eq!(
        snapshot.draft.ingredients_text.as_deref(),
        Some("aqua, parfum")
    );
    assert_eq!(snapshot.mode, AcquisitionMode::Manual);
}

#[tokio::test]
async fn test_empty_response_shows_message() {
    let service = FakeService::new(Reply::Empty);
    let session = manual_session(Arc::clone(&service), signed_in());

    assert!(matches!(
        session.submit().await.expect("empty is not an error"),
        SubmitStatus::Empty
    ));
    assert!(session.result().is_none());
    assert_eq!(session.snapshot().error.as_deref(), Some(EMPTY_RESULT_MESSAGE));
    assert_eq!(service.history_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_submission_is_superseded() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(FakeService::with_gate(
        Reply::Analysis(0.2, None),
        Some(Arc::clone(&gate)),
    ));
    let session = manual_session(Arc::clone(&service), AuthSession::new());

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    while service.scan_count() < 1 {
        tokio::task::yield_now().await;
    }

    service.set_reply(Reply::Analysis(0.7, None));
    submit_and_settle(&session).await;
    gate.notify_one();

    let stale = first.await.expect("task");
    assert!(matches!(stale, Err(ScanError::Superseded)));
    let result = session.result().expect("newest result kept");
    assert!((result.toxicity_score - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_field_outside_mode_is_rejected() {
    let service = FakeService::new(Reply::Empty);
    let session = session_with(service, recognizer(), signed_in());

    let err = session
        .update_draft_field(DraftField::IngredientsText, "aqua")
        .unwrap_err();
    assert!(matches!(
        err,
        ScanError::FieldOutsideMode {
            field: DraftField::IngredientsText,
            mode: AcquisitionMode::Search
        }
    ));
}

#[tokio::test]
async fn test_catalog_selection_fills_search_draft() {
    let service = FakeService::new(Reply::Analysis(0.1, None));
    let session = session_with(Arc::clone(&service), recognizer(), signed_in());

    let products = session.search_catalog("Hydra").await.expect("search");
    session
        .select_catalog_product(&products[0])
        .expect("search mode");
    submit_and_settle(&session).await;

    let scans = service.scans.lock().unwrap();
    assert_eq!(scans[0].product_identifier(), Some("p-1"));
    assert_eq!(scans[0].product_name(), "Hydra Cream");
    assert!(scans[0].ingredients_text().is_none());
}

#[tokio::test]
async fn test_text_capture_moves_to_manual() {
    let service = FakeService::new(Reply::Empty);
    let recognizer = recognizer();
    let session = session_with(service, Arc::clone(&recognizer), signed_in());
    session.select_mode(AcquisitionMode::OpticalCapture);

    let capture = tokio::spawn({
        let session = session.clone();
        async move { session.capture_text(frame("label.png")).await }
    });
    recognizer.started.notified().await;
    recognizer.release.notify_one();

    let status = capture.await.expect("task").expect("capture");
    assert_eq!(status, CaptureStatus::Applied);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.mode, AcquisitionMode::Manual);
    assert_eq!(
        snapshot.draft.ingredients_text.as_deref(),
        Some("aqua, glycerin")
    );
    assert!(snapshot.capture_progress.is_none());
}

#[tokio::test]
async fn test_late_capture_after_mode_switch_is_discarded() {
    let service = FakeService::new(Reply::Empty);
    let recognizer = recognizer();
    let session = session_with(service, Arc::clone(&recognizer), signed_in());
    session.select_mode(AcquisitionMode::OpticalCapture);

    let capture = tokio::spawn({
        let session = session.clone();
        async move { session.capture_text(frame("label.png")).await }
    });
    recognizer.started.notified().await;

    session.select_mode(AcquisitionMode::Search);
    recognizer.release.notify_one();

    let status = capture.await.expect("task").expect("capture");
    assert_eq!(status, CaptureStatus::Discarded);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.mode, AcquisitionMode::Search);
    assert!(snapshot.draft.ingredients_text.is_none());
}

#[tokio::test]
async fn test_capture_outside_capture_mode_is_rejected() {
    let service = FakeService::new(Reply::Empty);
    let session = session_with(service, recognizer(), signed_in());

    let err = session.capture_text(frame("label.png")).await.unwrap_err();
    assert!(matches!(
        err,
        ScanError::CaptureNotActive(AcquisitionMode::Search)
    ));
}

#[tokio::test]
async fn test_barcode_lookup_fills_review_draft() {
    let service = FakeService::new(Reply::Empty);
    let session = session_with(service, recognizer(), signed_in());
    session.select_mode(AcquisitionMode::BarcodeScan);

    let frames = stream::iter(vec![frame("blank"), frame("3600523"), frame("999")]);
    let status = session.scan_barcode(frames).await.expect("scan");

    assert_eq!(status, CaptureStatus::Applied);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.mode, AcquisitionMode::Manual);
    assert_eq!(snapshot.draft.product_name.as_deref(), Some("Sun Lotion"));
    assert_eq!(
        snapshot.draft.ingredients_text.as_deref(),
        Some("aqua, octocrylene")
    );
    assert_eq!(snapshot.draft.category.as_deref(), Some("sunscreen"));
}

#[tokio::test]
async fn test_text_capture_after_barcode_clears_category() {
    let service = FakeService::new(Reply::Analysis(0.8, None));
    let recognizer = recognizer();
    let session = session_with(Arc::clone(&service), Arc::clone(&recognizer), signed_in());
    session.select_mode(AcquisitionMode::BarcodeScan);
    session
        .scan_barcode(stream::iter(vec![frame("3600523")]))
        .await
        .expect("scan");
    assert_eq!(session.draft().category.as_deref(), Some("sunscreen"));

    session.select_mode(AcquisitionMode::OpticalCapture);
    let capture = tokio::spawn({
        let session = session.clone();
        async move { session.capture_text(frame("label.png")).await }
    });
    recognizer.started.notified().await;
    recognizer.release.notify_one();
    assert_eq!(
        capture.await.expect("task").expect("capture"),
        CaptureStatus::Applied
    );
    assert!(session.draft().category.is_none());

    submit_and_settle(&session).await;
    assert!(service.alternatives_calls.lock().unwrap().is_empty());
    assert!(service.scans.lock().unwrap()[0].category().is_none());
}

#[tokio::test]
async fn test_late_barcode_lookup_after_mode_switch_is_discarded() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(FakeService {
        lookup_gate: Some(Arc::clone(&gate)),
        ..FakeService::with_gate(Reply::Empty, None)
    });
    let session = session_with(Arc::clone(&service), recognizer(), signed_in());
    session.select_mode(AcquisitionMode::BarcodeScan);

    let scan = tokio::spawn({
        let session = session.clone();
        async move { session.scan_barcode(stream::iter(vec![frame("3600523")])).await }
    });
    service.lookup_started.notified().await;

    session.select_mode(AcquisitionMode::Search);
    gate.notify_one();

    let status = scan.await.expect("task").expect("scan");
    assert_eq!(status, CaptureStatus::Discarded);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.mode, AcquisitionMode::Search);
    assert!(snapshot.draft.product_name.is_none());
    assert!(snapshot.draft.category.is_none());
    assert!(snapshot.draft.ingredients_text.is_none());
}

#[tokio::test]
async fn test_unknown_barcode_keeps_mode() {
    let service = FakeService::new(Reply::Empty);
    let session = session_with(service, recognizer(), signed_in());
    session.select_mode(AcquisitionMode::BarcodeScan);

    let err = session
        .scan_barcode(stream::iter(vec![frame("404")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Client(ClientError::NotFound(_))));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.mode, AcquisitionMode::BarcodeScan);
    assert_eq!(snapshot.error.as_deref(), Some(BARCODE_NOT_FOUND_MESSAGE));

    let status = session
        .scan_barcode(stream::iter(vec![frame("blank")]))
        .await
        .expect("no barcode is not an error");
    assert_eq!(status, CaptureStatus::NoBarcode);
}

#[tokio::test]
async fn test_favorites() {
    let service = FakeService::new(Reply::Analysis(0.2, None));
    let session = manual_session(Arc::clone(&service), signed_in());
    assert!(matches!(
        session.add_favorite().await,
        Err(ScanError::NoResult)
    ));

    submit_and_settle(&session).await;
    assert_eq!(
        session.add_favorite().await.expect("favorite"),
        FavoriteStatus::Added
    );
    assert_eq!(
        session.add_favorite().await.expect("favorite"),
        FavoriteStatus::AlreadyExists
    );
    assert_eq!(
        session.side_effect_state().favorite_status,
        Some(FavoriteStatus::AlreadyExists)
    );
    assert!(session.result().is_some());
}

#[tokio::test]
async fn test_signed_out_user_cannot_favorite() {
    let service = FakeService::new(Reply::Analysis(0.2, None));
    let session = manual_session(Arc::clone(&service), AuthSession::new());
    submit_and_settle(&session).await;

    assert!(matches!(
        session.add_favorite().await,
        Err(ScanError::NotAuthenticated)
    ));
    assert!(service.favorites.lock().unwrap().is_empty());
    assert!(matches!(
        session.load_history().await,
        Err(ScanError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_profile_seeds_draft() {
    let service = FakeService::new(Reply::Empty);
    let session = session_with(service, recognizer(), signed_in());

    session.load_profile().await.expect("profile");
    let draft = session.draft();
    assert_eq!(draft.skin_type.as_deref(), Some("Dry"));
    assert_eq!(draft.skin_tone.as_deref(), Some("Dark"));
}
