use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::list::{FetchResult, PageRequest};

/// List requests the core asks the shell to perform. Transport, auth and
/// timeouts are the shell's concern; it answers with the decoded page or a
/// [`FetchError`](crate::list::FetchError).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum FetchOperation {
    ListPage(PageRequest),
}

impl FetchOperation {
    #[must_use]
    pub fn request(&self) -> &PageRequest {
        match self {
            Self::ListPage(request) => request,
        }
    }
}

impl Operation for FetchOperation {
    type Output = FetchResult;
}

#[derive(Clone)]
pub struct Fetch<E> {
    context: CapabilityContext<FetchOperation, E>,
}

impl<Ev> Capability<Ev> for Fetch<Ev> {
    type Operation = FetchOperation;
    type MappedSelf<MappedEv> = Fetch<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Fetch::new(self.context.map_event(f))
    }
}

impl<E> Fetch<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<FetchOperation, E>) -> Self {
        Self { context }
    }

    /// Issues one bounded list request. `callback` turns the shell's answer
    /// into the next event.
    pub fn list_page<F>(&self, request: PageRequest, callback: F)
    where
        F: FnOnce(FetchResult) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(FetchOperation::ListPage(request))
                .await;
            ctx.update_app(callback(result));
        });
    }
}
