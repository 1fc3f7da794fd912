use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::worker::CompletionQueue;
use crate::{DetailTab, EnrichmentError, Executor, ItemId, Ticket};

/// What kind of remote data a detail tab wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnrichmentKind {
    Metadata,
    Scores,
}

/// Where a detail tab's content comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailSource {
    Local,
    Remote(EnrichmentKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrichmentRequest {
    pub item: ItemId,
    pub online_id: u64,
    pub kind: EnrichmentKind,
    /// Only meaningful for `Scores`.
    pub filter_mods: bool,
}

/// The remote enrichment collaborator.
pub trait EnrichmentClient: Send + Sync + 'static {
    type Payload: Send + 'static;

    fn request(
        &self,
        request: EnrichmentRequest,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Self::Payload, EnrichmentError>>;

    /// Requests are skipped entirely while this returns `false`.
    fn is_online(&self) -> bool {
        true
    }
}

/// What the detail area currently shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DetailState<P> {
    /// Nothing is displayed.
    #[default]
    Empty,
    /// The tab renders local data only.
    Local,
    Loading,
    Ready(P),
    /// Remote data could not be obtained. Not retried until the item or tab changes.
    Unavailable,
}

impl<P> DetailState<P> {
    pub fn payload(&self) -> Option<&P> {
        match self {
            Self::Ready(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

struct Completion<P> {
    ticket: Ticket,
    item: ItemId,
    result: Result<P, EnrichmentError>,
}

struct Outstanding {
    ticket: Ticket,
    item: ItemId,
    token: CancellationToken,
}

/// The single detail slot beside the carousel.
///
/// At most one request is outstanding. A response is only applied if it is for the item still
/// displayed and for the latest request; anything else is dropped.
pub struct DetailArea<E: EnrichmentClient> {
    client: Arc<E>,
    queue: CompletionQueue<Completion<E::Payload>>,
    tab: DetailTab,
    filter_mods: bool,
    displayed: Option<(ItemId, Option<u64>)>,
    outstanding: Option<Outstanding>,
    state: DetailState<E::Payload>,
}

impl<E: EnrichmentClient> DetailArea<E> {
    pub fn new(client: Arc<E>, executor: Arc<dyn Executor>, tab: DetailTab) -> Self {
        Self {
            client,
            queue: CompletionQueue::new(executor),
            tab,
            filter_mods: false,
            displayed: None,
            outstanding: None,
            state: DetailState::Empty,
        }
    }

    pub fn state(&self) -> &DetailState<E::Payload> {
        &self.state
    }

    pub fn displayed(&self) -> Option<ItemId> {
        self.displayed.map(|(item, _)| item)
    }

    pub fn tab(&self) -> DetailTab {
        self.tab
    }

    pub fn filter_mods(&self) -> bool {
        self.filter_mods
    }

    /// Number of remote requests issued so far.
    pub fn requests_issued(&self) -> u64 {
        self.queue.issued()
    }

    /// Displays `item`. Showing the item already displayed does nothing.
    pub fn show(&mut self, item: Option<ItemId>, online_id: Option<u64>) {
        let next = item.map(|item| (item, online_id));
        if next == self.displayed {
            return;
        }
        self.displayed = next;
        self.refresh();
    }

    pub fn set_tab(&mut self, tab: DetailTab) {
        if tab == self.tab {
            return;
        }
        self.tab = tab;
        self.refresh();
    }

    pub fn set_filter_mods(&mut self, filter_mods: bool) {
        if filter_mods == self.filter_mods {
            return;
        }
        self.filter_mods = filter_mods;
        if self.tab.source() == DetailSource::Remote(EnrichmentKind::Scores) {
            self.refresh();
        }
    }

    /// Cancels any outstanding request and re-requests for the displayed item.
    pub fn refresh(&mut self) {
        if let Some(outstanding) = self.outstanding.take() {
            outstanding.token.cancel();
        }

        let Some((item, online_id)) = self.displayed else {
            self.state = DetailState::Empty;
            return;
        };

        let kind = match self.tab.source() {
            DetailSource::Local => {
                self.state = DetailState::Local;
                return;
            }
            DetailSource::Remote(kind) => kind,
        };

        let Some(online_id) = online_id else {
            ctrace!(item = item.0, "DetailArea: no online id, skipping request");
            self.state = DetailState::Unavailable;
            return;
        };
        if !self.client.is_online() {
            ctrace!(item = item.0, "DetailArea: offline, skipping request");
            self.state = DetailState::Unavailable;
            return;
        }

        let request = EnrichmentRequest {
            item,
            online_id,
            kind,
            filter_mods: self.filter_mods,
        };
        let ticket = self.queue.next_ticket();
        let token = CancellationToken::new();
        let work = self.client.request(request, token.clone());
        self.queue.spawn(token.clone(), async move {
            Completion {
                ticket,
                item,
                result: work.await,
            }
        });
        self.outstanding = Some(Outstanding {
            ticket,
            item,
            token,
        });
        self.state = DetailState::Loading;
    }

    /// Applies finished requests. Returns `true` if the displayed state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for done in self.queue.drain() {
            let current = self
                .outstanding
                .as_ref()
                .is_some_and(|o| o.ticket == done.ticket && o.item == done.item)
                && self.displayed() == Some(done.item);
            if !current {
                ctrace!(item = done.item.0, "DetailArea: discarded stale response");
                continue;
            }
            self.outstanding = None;
            self.state = match done.result {
                Ok(payload) => DetailState::Ready(payload),
                Err(err) => {
                    cwarn!(item = done.item.0, error = %err, "DetailArea: enrichment failed");
                    DetailState::Unavailable
                }
            };
            changed = true;
        }
        changed
    }
}
