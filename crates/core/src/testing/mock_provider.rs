//! Mock debrid provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::debrid::{
    DebridError, DebridProvider, FileChoice, ProviderConfig, ProviderFactory, ProviderKind,
    ProviderSnapshot, ResolutionStatus,
};

/// Raw status words understood by [`MockProvider::map_status`].
pub mod status {
    pub const READY: &str = "ready";
    pub const WORKING: &str = "working";
    pub const AWAITING_SELECTION: &str = "awaiting_selection";
    pub const FAILED: &str = "failed";
}

/// A recorded provider call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CheckCredentials,
    Submit(String),
    GetStatus(String),
    SelectFiles { item_id: String, choice: FileChoice },
    LinkFor { item_id: String, index: usize },
    DeRestrict(String),
}

/// Mock implementation of [`DebridProvider`].
///
/// Status reports are scripted: each `get_status_and_files` call consumes the
/// next queued report, and the last one keeps being returned. With nothing
/// queued the provider reports the item as not found.
///
/// # Example
///
/// ```rust,ignore
/// use kaistream_core::testing::{fixtures, MockProvider};
///
/// let provider = MockProvider::new();
/// provider.push_status(Ok(fixtures::snapshot("working", &[]))).await;
/// provider.push_status(Ok(fixtures::snapshot("ready", &[("Kai - 05.mkv", 100)]))).await;
/// ```
#[derive(Debug)]
pub struct MockProvider {
    kind: ProviderKind,
    credentials_valid: AtomicBool,
    reports: Arc<RwLock<VecDeque<Result<ProviderSnapshot, DebridError>>>>,
    /// Id returned on submission; `None` makes submissions fail.
    submit_id: Arc<RwLock<Option<String>>>,
    next_select_error: Arc<RwLock<Option<DebridError>>>,
    next_link_error: Arc<RwLock<Option<DebridError>>>,
    next_de_restrict_error: Arc<RwLock<Option<DebridError>>>,
    /// Link rewrites applied by `de_restrict_link`; unmapped links pass through.
    direct_links: Arc<RwLock<HashMap<String, String>>>,
    calls: Arc<RwLock<Vec<ProviderCall>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a mock with valid credentials that accepts submissions.
    pub fn new() -> Self {
        Self::with_kind(ProviderKind::RealDebrid)
    }

    pub fn with_kind(kind: ProviderKind) -> Self {
        Self {
            kind,
            credentials_valid: AtomicBool::new(true),
            reports: Arc::new(RwLock::new(VecDeque::new())),
            submit_id: Arc::new(RwLock::new(Some("mock-item".to_string()))),
            next_select_error: Arc::new(RwLock::new(None)),
            next_link_error: Arc::new(RwLock::new(None)),
            next_de_restrict_error: Arc::new(RwLock::new(None)),
            direct_links: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn set_credentials_valid(&self, valid: bool) {
        self.credentials_valid.store(valid, Ordering::SeqCst);
    }

    /// Queue a status report.
    pub async fn push_status(&self, report: Result<ProviderSnapshot, DebridError>) {
        self.reports.write().await.push_back(report);
    }

    pub async fn set_submit_id(&self, id: Option<&str>) {
        *self.submit_id.write().await = id.map(str::to_string);
    }

    pub async fn set_next_select_error(&self, error: DebridError) {
        *self.next_select_error.write().await = Some(error);
    }

    pub async fn set_next_link_error(&self, error: DebridError) {
        *self.next_link_error.write().await = Some(error);
    }

    pub async fn set_next_de_restrict_error(&self, error: DebridError) {
        *self.next_de_restrict_error.write().await = Some(error);
    }

    pub async fn set_direct_link(&self, restricted: &str, direct: &str) {
        self.direct_links
            .write()
            .await
            .insert(restricted.to_string(), direct.to_string());
    }

    pub async fn recorded_calls(&self) -> Vec<ProviderCall> {
        self.calls.read().await.clone()
    }

    pub async fn submissions(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::Submit(_))).await
    }

    pub async fn status_checks(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::GetStatus(_))).await
    }

    pub async fn selections(&self) -> Vec<FileChoice> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                ProviderCall::SelectFiles { choice, .. } => Some(choice.clone()),
                _ => None,
            })
            .collect()
    }

    async fn count(&self, pred: impl Fn(&ProviderCall) -> bool) -> usize {
        self.calls.read().await.iter().filter(|c| pred(c)).count()
    }

    async fn record(&self, call: ProviderCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl DebridProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn check_credentials(&self) -> bool {
        self.record(ProviderCall::CheckCredentials).await;
        self.credentials_valid.load(Ordering::SeqCst)
    }

    async fn submit_and_forget(&self, magnet: &str) -> Option<String> {
        self.record(ProviderCall::Submit(magnet.to_string())).await;
        self.submit_id.read().await.clone()
    }

    async fn get_status_and_files(&self, magnet: &str) -> Result<ProviderSnapshot, DebridError> {
        self.record(ProviderCall::GetStatus(magnet.to_string())).await;
        let mut reports = self.reports.write().await;
        if reports.len() > 1 {
            if let Some(report) = reports.pop_front() {
                return report;
            }
        }
        match reports.front() {
            Some(report) => report.clone(),
            None => Err(DebridError::NotFound("nothing queued".to_string())),
        }
    }

    fn map_status(&self, snapshot: &ProviderSnapshot) -> ResolutionStatus {
        match snapshot.status.as_str() {
            status::READY => ResolutionStatus::Completed,
            status::WORKING | status::AWAITING_SELECTION => ResolutionStatus::Downloading,
            _ => ResolutionStatus::Error,
        }
    }

    fn needs_file_selection(&self, snapshot: &ProviderSnapshot) -> bool {
        snapshot.status == status::AWAITING_SELECTION
    }

    async fn select_files(&self, item_id: &str, choice: &FileChoice) -> Result<(), DebridError> {
        self.record(ProviderCall::SelectFiles {
            item_id: item_id.to_string(),
            choice: choice.clone(),
        })
        .await;
        match self.next_select_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn link_for(
        &self,
        snapshot: &ProviderSnapshot,
        index: usize,
    ) -> Result<Option<String>, DebridError> {
        self.record(ProviderCall::LinkFor {
            item_id: snapshot.item_id.clone(),
            index,
        })
        .await;
        if let Some(error) = self.next_link_error.write().await.take() {
            return Err(error);
        }
        Ok(snapshot.paired_link(index))
    }

    async fn de_restrict_link(&self, url: &str) -> Result<String, DebridError> {
        self.record(ProviderCall::DeRestrict(url.to_string())).await;
        if let Some(error) = self.next_de_restrict_error.write().await.take() {
            return Err(error);
        }
        Ok(self
            .direct_links
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string()))
    }
}

/// Factory handing out one shared [`MockProvider`] for every configured session.
#[derive(Debug, Clone)]
pub struct MockProviderFactory {
    provider: Arc<MockProvider>,
    created: Arc<AtomicUsize>,
}

impl MockProviderFactory {
    pub fn new(provider: Arc<MockProvider>) -> Self {
        Self {
            provider,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of adapters handed out.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DebridProvider>, DebridError> {
        config.kind()?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.provider.clone())
    }
}
