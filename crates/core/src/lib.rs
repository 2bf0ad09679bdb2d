pub mod config;
pub mod debrid;
pub mod magnet;
pub mod matching;
pub mod metrics;
pub mod resolver;
pub mod searcher;
pub mod session;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, NyaaConfig,
    ProvidersConfig, ResolverConfig, SanitizedConfig, ServerConfig, SessionsConfig,
};
pub use debrid::{
    create_provider, DebridError, DebridProvider, FileChoice, HttpProviderFactory, ManifestEntry,
    ProviderConfig, ProviderFactory, ProviderKind, ProviderSnapshot, ResolutionResult,
    ResolutionStatus, StreamLink,
};
pub use matching::{
    normalize, select_best_file, select_episode, CandidateFile, EpisodeTarget, SelectOptions,
    Selection,
};
pub use resolver::{ResolveOutcome, ResolveState, ResolvedStream, Resolver};
pub use searcher::{
    find_relevant_torrents, ManifestFetcher, NyaaClient, SearchError, TorrentCandidate,
    TorrentFinder, TorrentHealth, TorrentIndex,
};
pub use session::{DownloadOption, Session, SessionConfig, SessionError, SessionStore};
