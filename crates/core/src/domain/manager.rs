//! Maintains the list of domain aliases and their states for a single
//! default domain, and picks which hostname to address next.

use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::alias::{DomainAlias, DomainAliasState};
use super::probe::DomainProbe;

/// Aliases failing more often than this are pruned on the next
/// maintenance pass.
const MAX_FAILED_ATTEMPTS: u32 = 3;

/// Cursor into the current alias snapshot. The generation ties it to one
/// snapshot; after a swap the cursor is stale and treated as unset.
#[derive(Debug, Clone, Copy)]
struct AliasCursor {
    generation: u64,
    index: usize,
}

#[derive(Debug)]
struct AliasListState {
    default_domain_online: bool,
    generation: u64,
    aliases: Arc<Vec<Arc<DomainAlias>>>,
    cursor: Option<AliasCursor>,
}

impl AliasListState {
    fn current_index(&self) -> Option<usize> {
        self.cursor
            .filter(|c| c.generation == self.generation)
            .map(|c| c.index)
            .filter(|i| *i < self.aliases.len())
    }
}

/// Health model and hostname selection for one source.
///
/// Long-lived and shared by every performer addressing the same logical
/// source. The alias list is an immutable snapshot swapped atomically on
/// refresh; per-alias health counters are mutated in place by the probe
/// and offline-mark paths.
pub struct DomainAliasManager {
    default_domain: String,
    probe: Arc<dyn DomainProbe>,
    state: RwLock<AliasListState>,
}

impl DomainAliasManager {
    pub fn new(default_domain: &str, probe: Arc<dyn DomainProbe>) -> Self {
        Self::with_aliases(default_domain, probe, Vec::new())
    }

    /// Create a manager with a pre-built alias list in the given order.
    pub fn with_aliases(
        default_domain: &str,
        probe: Arc<dyn DomainProbe>,
        aliases: Vec<Arc<DomainAlias>>,
    ) -> Self {
        Self {
            default_domain: default_domain.to_string(),
            probe,
            state: RwLock::new(AliasListState {
                default_domain_online: true,
                generation: 0,
                aliases: Arc::new(aliases),
                cursor: None,
            }),
        }
    }

    pub fn default_domain(&self) -> &str {
        &self.default_domain
    }

    pub async fn is_default_domain_online(&self) -> bool {
        self.state.read().await.default_domain_online
    }

    /// Current alias snapshot, in selection order.
    pub async fn aliases(&self) -> Arc<Vec<Arc<DomainAlias>>> {
        self.state.read().await.aliases.clone()
    }

    /// The alias the cursor currently points at, if any.
    pub async fn current_domain_alias(&self) -> Option<Arc<DomainAlias>> {
        let state = self.state.read().await;
        state.current_index().map(|i| state.aliases[i].clone())
    }

    /// Refresh the alias list from a new candidate name set, keeping the
    /// existing alias objects (and their failure history) for names
    /// already known. The new list is shuffled so no single alias becomes
    /// a hotspot, and only replaces the old one if non-empty.
    pub async fn update_aliases(&self, names: &[String]) {
        let mut state = self.state.write().await;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut next: Vec<Arc<DomainAlias>> = Vec::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            match state.aliases.iter().find(|a| a.name() == name) {
                Some(existing) => next.push(existing.clone()),
                None => next.push(Arc::new(DomainAlias::new(&self.default_domain, name))),
            }
        }

        if next.is_empty() {
            return;
        }
        next.shuffle(&mut rand::thread_rng());

        state.aliases = Arc::new(next);
        state.generation += 1;
    }

    /// Hard reset: rebuild every entry fresh, discarding failure history.
    /// An empty name list is a no-op, like `update_aliases`.
    pub async fn set_aliases(&self, names: &[String]) {
        let mut state = self.state.write().await;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut next: Vec<Arc<DomainAlias>> = Vec::new();
        for name in names {
            if seen.insert(name.as_str()) {
                next.push(Arc::new(DomainAlias::new(&self.default_domain, name)));
            }
        }

        if next.is_empty() {
            return;
        }
        next.shuffle(&mut rand::thread_rng());

        state.aliases = Arc::new(next);
        state.generation += 1;
    }

    /// Record that a domain failed to serve content. The default domain
    /// flips its online flag; an alias goes offline and counts the
    /// failure.
    pub async fn mark_domain_offline(&self, domain: &str) {
        if domain == self.default_domain {
            let mut state = self.state.write().await;
            state.default_domain_online = false;
            warn!(domain = %domain, "Default domain marked offline");
            return;
        }

        let aliases = self.aliases().await;
        for alias in aliases.iter() {
            if alias.name() == domain {
                alias.mark_offline().await;
                let failed_attempts = alias.failed_attempts().await;
                warn!(
                    domain = %domain,
                    failed_attempts,
                    "Alias marked offline"
                );
            }
        }
    }

    /// The hostname a performer should address next.
    ///
    /// Returns the default domain while it is online. Once offline, the
    /// next online alias is computed lazily and cached in the cursor; the
    /// cached name keeps being returned until the cursor goes stale, even
    /// if that alias is later marked offline. With no alias to fall back
    /// on, the default domain name is returned anyway and the caller will
    /// keep failing against it until a probe revives something.
    pub async fn domain_name_to_use(&self) -> String {
        {
            let state = self.state.read().await;
            if state.default_domain_online {
                return self.default_domain.clone();
            }
            if let Some(i) = state.current_index() {
                return state.aliases[i].name().to_string();
            }
        }

        match self.next_online_domain_alias().await {
            Some(alias) => alias.name().to_string(),
            None => self.default_domain.clone(),
        }
    }

    /// Advance the cursor to the next alias considered online and return
    /// it, or `None` if nothing qualifies.
    ///
    /// With no cursor set, the first entry of the list is selected
    /// unconditionally, without consulting its state. Otherwise the scan
    /// runs circularly from the position after the cursor and takes the
    /// first `Online` entry other than the current one. Never probes the
    /// network; it only reads cached state.
    pub async fn next_online_domain_alias(&self) -> Option<Arc<DomainAlias>> {
        let mut state = self.state.write().await;
        let aliases = state.aliases.clone();
        if aliases.is_empty() {
            return None;
        }

        let current = state.current_index();
        match current {
            None => {
                state.cursor = Some(AliasCursor {
                    generation: state.generation,
                    index: 0,
                });
                Some(aliases[0].clone())
            }
            Some(cur) => {
                let len = aliases.len();
                for step in 1..=len {
                    let i = (cur + step) % len;
                    if i == cur {
                        continue;
                    }
                    if aliases[i].state().await == DomainAliasState::Online {
                        state.cursor = Some(AliasCursor {
                            generation: state.generation,
                            index: i,
                        });
                        return Some(aliases[i].clone());
                    }
                }
                None
            }
        }
    }

    /// Health-maintenance pass, intended to run periodically.
    ///
    /// Aliases that failed too often are pruned; the survivors get an
    /// asynchronous probe whose outcome lands out-of-band. Once the list
    /// is empty the whole manager resets so the source gets another
    /// chance.
    pub async fn check_statuses(&self) {
        let mut state = self.state.write().await;

        let mut keep: Vec<Arc<DomainAlias>> = Vec::new();
        let mut pruned = 0usize;
        for alias in state.aliases.iter() {
            if alias.failed_attempts().await > MAX_FAILED_ATTEMPTS {
                pruned += 1;
            } else {
                keep.push(alias.clone());
            }
        }

        if pruned > 0 {
            debug!(
                default_domain = %self.default_domain,
                pruned = pruned,
                "Pruned exhausted aliases"
            );
            state.aliases = Arc::new(keep.clone());
            state.generation += 1;
            state.cursor = None;
        }

        if state.aliases.is_empty() {
            debug!(
                default_domain = %self.default_domain,
                "Alias list exhausted, resetting health model"
            );
            state.default_domain_online = true;
            state.cursor = None;
            return;
        }

        for alias in keep {
            let probe = self.probe.clone();
            tokio::spawn(async move {
                let online = probe.is_online(alias.name()).await;
                alias.record_probe(online).await;
            });
        }
    }
}
