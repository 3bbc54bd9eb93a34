use cloudrelay_events::{DecoderRegistry, Dispatcher};

/// State shared by all request handlers.
#[derive(Debug, Clone, Default)]
pub struct AppServices {
    pub dispatcher: Dispatcher,
}

impl AppServices {
    pub fn new(registry: DecoderRegistry) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
        }
    }
}
