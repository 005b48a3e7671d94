use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::event::UnixTimeMs;

/// Asks the shell to resolve after `millis`. Used for search debouncing,
/// dedupe eviction and toast expiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayOperation {
    pub millis: u64,
}

/// Shell clock reading taken when the delay elapsed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DelayOutput {
    pub now: UnixTimeMs,
}

impl Operation for DelayOperation {
    type Output = DelayOutput;
}

#[derive(Clone)]
pub struct Delay<E> {
    context: CapabilityContext<DelayOperation, E>,
}

impl<Ev> Capability<Ev> for Delay<Ev> {
    type Operation = DelayOperation;
    type MappedSelf<MappedEv> = Delay<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Delay::new(self.context.map_event(f))
    }
}

impl<E> Delay<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<DelayOperation, E>) -> Self {
        Self { context }
    }

    pub fn after<F>(&self, millis: u64, callback: F)
    where
        F: FnOnce(DelayOutput) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(DelayOperation { millis }).await;
            ctx.update_app(callback(output));
        });
    }
}
