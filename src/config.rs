use crate::context::ExecutionContext;

/// What to do when a settled promise is resolved or rejected again.
///
/// Either way the second outcome is discarded and the stored state stays
/// exactly as the first settlement left it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MisusePolicy {
    /// Discard quietly (logged at `trace`).
    #[default]
    Ignore,
    /// Discard and emit a `warn` event.
    Warn,
}

/// Settings a promise is constructed with. Derived promises inherit them.
///
/// ```
/// use promise_then::{Config, MainQueue, MisusePolicy, Promise};
/// let main = MainQueue::new();
/// let config = Config::new().context(&main).misuse(MisusePolicy::Warn);
/// let p = Promise::<i32>::with_config(config);
/// let d = p.then(|v| Ok(v * 2));
/// p.resolve(4);
/// assert!(d.is_pending());
/// main.run_pending();
/// assert_eq!(d.value(), Some(8));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub(crate) context: ExecutionContext,
    pub(crate) misuse: MisusePolicy,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default context for continuations attached without `on_queue`.
    pub fn context(mut self, context: impl Into<ExecutionContext>) -> Self {
        self.context = context.into();
        self
    }

    pub fn misuse(mut self, policy: MisusePolicy) -> Self {
        self.misuse = policy;
        self
    }

    pub fn default_context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn misuse_policy(&self) -> MisusePolicy {
        self.misuse
    }
}
