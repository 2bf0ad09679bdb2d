//! Resolver runner.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::ResolverConfig;
use crate::debrid::{
    DebridError, DebridProvider, FileChoice, ProviderConfig, ProviderFactory, ProviderSnapshot,
    ResolutionResult, ResolutionStatus, StreamLink,
};
use crate::magnet;
use crate::matching::{basename, is_web_ready, select_best_file, EpisodeTarget, SelectOptions};
use crate::metrics;

use super::types::{ResolveOutcome, ResolveState, ResolvedStream};

/// Drives debrid providers from a magnet link to a playable URL.
pub struct Resolver {
    config: ResolverConfig,
    factory: Arc<dyn ProviderFactory>,
}

/// What one completed report led to.
enum Completion {
    Done(ResolutionResult),
    /// A file selection was requested; keep polling.
    Selecting,
}

/// Per-call bookkeeping for a resolution.
struct Attempt {
    states: Vec<ResolveState>,
    selection: Option<crate::matching::Selection>,
    web_ready: bool,
}

impl Attempt {
    fn new() -> Self {
        Self {
            states: Vec::new(),
            selection: None,
            web_ready: false,
        }
    }

    fn enter(&mut self, state: ResolveState) {
        if self.states.last() != Some(&state) {
            self.states.push(state);
        }
    }

    fn finish(mut self, result: ResolutionResult) -> ResolveOutcome {
        let terminal = match result.status() {
            ResolutionStatus::Completed => ResolveState::Ready,
            ResolutionStatus::Downloading => ResolveState::Timeout,
            ResolutionStatus::Error => ResolveState::Error,
            ResolutionStatus::NotFound => ResolveState::NotFound,
        };
        self.enter(terminal);
        ResolveOutcome {
            result,
            states: self.states,
            selection: self.selection,
            web_ready: self.web_ready,
        }
    }
}

impl Resolver {
    pub fn new(config: ResolverConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms.max(1))
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// Resolve `magnet_link` to a playable link for `target`.
    ///
    /// `forced_index` pins the file position; when absent a `fileIndex`
    /// parameter on the magnet is used. Never fails: every provider error
    /// becomes an `error` result.
    pub async fn resolve(
        &self,
        magnet_link: &str,
        provider_config: &ProviderConfig,
        target: &EpisodeTarget,
        forced_index: Option<usize>,
    ) -> ResolveOutcome {
        let started = Instant::now();
        let mut attempt = Attempt::new();
        attempt.enter(ResolveState::Submitting);

        let provider = match self.factory.create(provider_config) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(service = %provider_config.service, error = %e, "Provider not usable");
                record(&provider_config.service, ResolutionStatus::Error, started);
                return attempt.finish(ResolutionResult::error());
            }
        };
        let label = provider.kind().as_str();

        if !provider.check_credentials().await {
            warn!(provider = label, "Provider rejected credentials");
            record(label, ResolutionStatus::Error, started);
            return attempt.finish(ResolutionResult::error());
        }

        let options = SelectOptions {
            forced_index: forced_index.or_else(|| magnet::file_index(magnet_link)),
            largest_video_fallback: false,
        };

        let result = self
            .poll(provider.as_ref(), magnet_link, target, &options, &mut attempt)
            .await;
        info!(
            provider = label,
            status = result.status().as_str(),
            episode = target.number,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolution finished"
        );
        record(label, result.status(), started);
        attempt.finish(result)
    }

    /// Resolve and return the stream only when one is ready.
    pub async fn resolve_stream(
        &self,
        magnet_link: &str,
        provider_config: &ProviderConfig,
        target: &EpisodeTarget,
    ) -> Option<ResolvedStream> {
        let outcome = self
            .resolve(magnet_link, provider_config, target, None)
            .await;
        let web_ready = outcome.web_ready;
        let link = outcome.result.into_links().into_iter().next()?;
        if !link.url.starts_with("http") {
            return None;
        }
        Some(ResolvedStream {
            url: link.url,
            filename: link.filename,
            web_ready,
        })
    }

    async fn poll(
        &self,
        provider: &dyn DebridProvider,
        magnet_link: &str,
        target: &EpisodeTarget,
        options: &SelectOptions,
        attempt: &mut Attempt,
    ) -> ResolutionResult {
        let deadline = Instant::now() + self.timeout();
        let mut submitted = false;
        let mut selection_requested = false;

        loop {
            match provider.get_status_and_files(magnet_link).await {
                Err(DebridError::NotFound(what)) if !submitted => {
                    debug!(what = %what, "Item not on provider, submitting");
                    attempt.enter(ResolveState::Submitting);
                    submitted = true;
                    if provider.submit_and_forget(magnet_link).await.is_none() {
                        info!("Provider did not accept the magnet");
                        return ResolutionResult::not_found();
                    }
                    metrics::SUBMISSIONS
                        .with_label_values(&[provider.kind().as_str(), "accepted"])
                        .inc();
                }
                Err(DebridError::NotFound(_)) => {
                    debug!("Submitted item not listed yet");
                }
                Err(e) => {
                    warn!(error = %e, "Provider status check failed");
                    return ResolutionResult::error();
                }
                Ok(snapshot) => {
                    if provider.needs_file_selection(&snapshot) {
                        if selection_requested {
                            debug!(item = %snapshot.item_id, "Waiting for file selection to apply");
                        } else if let Err(e) =
                            request_selection(provider, &snapshot, target, options).await
                        {
                            warn!(item = %snapshot.item_id, error = %e, "File selection failed");
                            return ResolutionResult::error();
                        }
                        selection_requested = true;
                    } else {
                        match provider.map_status(&snapshot) {
                            ResolutionStatus::Completed => {
                                match self
                                    .complete(
                                        provider,
                                        &snapshot,
                                        target,
                                        options,
                                        selection_requested,
                                        attempt,
                                    )
                                    .await
                                {
                                    Completion::Done(result) => return result,
                                    Completion::Selecting => selection_requested = true,
                                }
                            }
                            ResolutionStatus::Downloading => {
                                debug!(item = %snapshot.item_id, status = %snapshot.status, "Still in progress");
                            }
                            ResolutionStatus::Error => {
                                warn!(item = %snapshot.item_id, status = %snapshot.status, "Provider reports failure");
                                return ResolutionResult::error();
                            }
                            ResolutionStatus::NotFound => return ResolutionResult::not_found(),
                        }
                    }
                }
            }

            attempt.enter(ResolveState::Waiting);
            let now = Instant::now();
            if now >= deadline {
                info!(
                    timeout_ms = self.config.timeout_ms,
                    "Provider still working at timeout"
                );
                return ResolutionResult::downloading();
            }
            sleep(self.poll_interval().min(deadline - now)).await;
        }
    }

    /// Pick the file from a completed report and produce its direct link.
    async fn complete(
        &self,
        provider: &dyn DebridProvider,
        snapshot: &ProviderSnapshot,
        target: &EpisodeTarget,
        options: &SelectOptions,
        selection_requested: bool,
        attempt: &mut Attempt,
    ) -> Completion {
        if snapshot.manifest.is_empty() {
            warn!(item = %snapshot.item_id, "Completed without any file");
            return Completion::Done(ResolutionResult::error());
        }

        let Some(selection) = select_best_file(&snapshot.manifest, target, options) else {
            info!(
                item = %snapshot.item_id,
                episode = target.number,
                files = snapshot.manifest.len(),
                "No file in the torrent matches the episode"
            );
            return Completion::Done(ResolutionResult::error());
        };
        attempt.selection = Some(selection.clone());

        let entry = &snapshot.manifest[selection.index];
        if !entry.selected && entry.link.is_none() {
            if selection_requested {
                warn!(item = %snapshot.item_id, file = %selection.file.name, "File still unselected after selection");
                return Completion::Done(ResolutionResult::error());
            }
            let choice = selection
                .file
                .provider_file_id
                .clone()
                .map(FileChoice::One)
                .unwrap_or(FileChoice::All);
            debug!(item = %snapshot.item_id, files = %choice.as_param(), "Selecting matched file");
            if let Err(e) = provider.select_files(&snapshot.item_id, &choice).await {
                warn!(item = %snapshot.item_id, error = %e, "File selection failed");
                return Completion::Done(ResolutionResult::error());
            }
            return Completion::Selecting;
        }

        let link = match provider.link_for(snapshot, selection.index).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                warn!(item = %snapshot.item_id, file = %selection.file.name, "No link for the selected file");
                return Completion::Done(ResolutionResult::error());
            }
            Err(e) => {
                warn!(item = %snapshot.item_id, error = %e, "Link request failed");
                return Completion::Done(ResolutionResult::error());
            }
        };

        let url = match provider.de_restrict_link(&link).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Link de-restriction failed");
                return Completion::Done(ResolutionResult::error());
            }
        };
        if !url.starts_with("http") {
            error!(url = %url, "Provider returned a non-http link");
            return Completion::Done(ResolutionResult::error());
        }

        let url = if self.config.force_https {
            force_https(&url)
        } else {
            url
        };
        attempt.web_ready = is_web_ready(&url) || is_web_ready(&selection.file.name);

        Completion::Done(ResolutionResult::completed(vec![StreamLink {
            url,
            filename: basename(&selection.file.name).to_string(),
        }]))
    }

    /// Submit a magnet without waiting for it. Never fails.
    ///
    /// On success, file selection for `target` is prepared in the background.
    pub async fn initiate_download(
        &self,
        magnet_link: &str,
        provider_config: &ProviderConfig,
        target: &EpisodeTarget,
    ) {
        let provider = match self.factory.create(provider_config) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(service = %provider_config.service, error = %e, "Provider not usable, download not started");
                return;
            }
        };
        let label = provider.kind().as_str();

        let Some(item_id) = provider.submit_and_forget(magnet_link).await else {
            warn!(provider = label, "Background submission failed");
            metrics::SUBMISSIONS.with_label_values(&[label, "failed"]).inc();
            return;
        };
        info!(provider = label, item = %item_id, episode = target.number, "Download initiated");
        metrics::SUBMISSIONS.with_label_values(&[label, "accepted"]).inc();

        let magnet_link = magnet_link.to_string();
        let target = target.clone();
        tokio::spawn(async move {
            prepare_selection(provider.as_ref(), &magnet_link, &target).await;
        });
    }

    /// Run [`initiate_download`](Self::initiate_download) detached.
    pub fn spawn_initiate_download(
        self: &Arc<Self>,
        magnet_link: String,
        provider_config: ProviderConfig,
        target: EpisodeTarget,
    ) -> tokio::task::JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            resolver
                .initiate_download(&magnet_link, &provider_config, &target)
                .await;
        })
    }
}

/// Select the episode file on providers waiting for a selection.
async fn prepare_selection(provider: &dyn DebridProvider, magnet_link: &str, target: &EpisodeTarget) {
    let snapshot = match provider.get_status_and_files(magnet_link).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            debug!(error = %e, "No status yet after submission");
            return;
        }
    };
    if !provider.needs_file_selection(&snapshot) {
        return;
    }
    let options = SelectOptions {
        forced_index: magnet::file_index(magnet_link),
        largest_video_fallback: false,
    };
    if let Err(e) = request_selection(provider, &snapshot, target, &options).await {
        warn!(item = %snapshot.item_id, error = %e, "Background file selection failed");
    }
}

/// Ask the provider to select the episode file, or everything when no file matches.
async fn request_selection(
    provider: &dyn DebridProvider,
    snapshot: &ProviderSnapshot,
    target: &EpisodeTarget,
    options: &SelectOptions,
) -> Result<(), DebridError> {
    let choice = select_best_file(&snapshot.manifest, target, options)
        .and_then(|s| s.file.provider_file_id)
        .map(FileChoice::One)
        .unwrap_or(FileChoice::All);
    debug!(item = %snapshot.item_id, files = %choice.as_param(), "Requesting file selection");
    provider.select_files(&snapshot.item_id, &choice).await
}

fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

fn record(provider: &str, status: ResolutionStatus, started: Instant) {
    metrics::RESOLUTIONS
        .with_label_values(&[provider, status.as_str()])
        .inc();
    metrics::RESOLUTION_DURATION
        .with_label_values(&[provider])
        .observe(started.elapsed().as_secs_f64());
}
