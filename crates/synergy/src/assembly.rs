//! Building a ready-to-use pipeline from configuration.

use std::sync::Arc;

use synergy_config::SynergyConfig;
use synergy_core::Request;
use synergy_middleware::{
    BytesToTextMiddleware, CacheConfig, ControllerRegistry, Dispatcher, EnvExpandMiddleware,
    JsonDecodeMiddleware, JsonEncodeMiddleware, PathResolveMiddleware, Pipeline,
    SharedMiddleware, TelemetryMiddleware, TextToBytesMiddleware,
};
use synergy_telemetry::TelemetryResult;

/// A pipeline together with the dispatcher at its end.
///
/// The dispatcher handle is kept so that callers can inspect or invalidate
/// the resolution cache while the pipeline is serving requests.
pub struct Assembly {
    /// The assembled pipeline.
    pub pipeline: Pipeline,
    /// The terminal dispatcher shared with `pipeline`.
    pub dispatcher: Arc<Dispatcher>,
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly")
            .field("stages", &self.pipeline.stage_names())
            .field("cached_resolutions", &self.dispatcher.cache().len())
            .finish()
    }
}

/// Builds the default pipeline for `config` over `registry`.
///
/// Stage order:
///
/// ```text
/// Telemetry → EnvExpand? → PathResolve? → JsonEncode → JsonDecode → TextToBytes → BytesToText → Dispatcher
/// ```
///
/// `EnvExpand` is present when `transforms.expand_environment_variables` is
/// set, `PathResolve` when `transforms.resource_root` is set.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use synergy::{assemble, config::SynergyConfig, middleware::ControllerRegistry};
///
/// let assembly = assemble(&SynergyConfig::default(), Arc::new(ControllerRegistry::new()));
/// assert_eq!(assembly.pipeline.stage_names()[0], "telemetry");
/// ```
pub fn assemble(config: &SynergyConfig, registry: Arc<ControllerRegistry>) -> Assembly {
    assemble_with(config, registry, Vec::new())
}

/// Like [`assemble`], with `extra` stages inserted right after telemetry.
///
/// Extra stages see the request before any name or body transform, which is
/// where validation and recovery stages usually belong.
pub fn assemble_with(
    config: &SynergyConfig,
    registry: Arc<ControllerRegistry>,
    extra: impl IntoIterator<Item = SharedMiddleware>,
) -> Assembly {
    let cache = CacheConfig {
        max_entries: config.dispatcher.cache_capacity,
        ttl: config.cache_ttl(),
    };
    let dispatcher = Arc::new(Dispatcher::with_cache_config(registry, cache));

    let transforms = &config.transforms;
    let mut builder =
        Pipeline::builder().add_stage(TelemetryMiddleware::new(&config.telemetry.service_name));
    for stage in extra {
        builder = builder.add_shared_stage(stage);
    }
    if let Some(root) = &transforms.resource_root {
        tracing::debug!(root = %root, "Path resolution enabled");
    }
    let pipeline = builder
        .add_stage_if(
            transforms.expand_environment_variables,
            EnvExpandMiddleware::new(),
        )
        .add_stage_if(
            transforms.resource_root.is_some(),
            PathResolveMiddleware::new(transforms.resource_root.clone().unwrap_or_default()),
        )
        .add_stage(JsonEncodeMiddleware::new())
        .add_stage(JsonDecodeMiddleware::new())
        .add_stage(TextToBytesMiddleware::new())
        .add_stage(BytesToTextMiddleware::with_hint_key(
            transforms.text_hint_key.clone(),
        ))
        .build_shared(dispatcher.clone());

    tracing::debug!(stages = ?pipeline.stage_names(), "Pipeline assembled");
    Assembly {
        pipeline,
        dispatcher,
    }
}

/// Per-request defaults taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Initial value of `Request::allow_controller_caching`.
    pub allow_controller_caching: bool,
}

impl RequestDefaults {
    /// Applies the defaults to a freshly built request.
    pub fn apply(self, request: Request) -> Request {
        request.with_controller_caching(self.allow_controller_caching)
    }
}

/// Returns the request defaults configured in `config`.
pub fn request_defaults(config: &SynergyConfig) -> RequestDefaults {
    RequestDefaults {
        allow_controller_caching: config.dispatcher.allow_controller_caching,
    }
}

/// Installs logging and metrics as configured.
///
/// Call once at startup, before the first request.
pub fn init_telemetry(config: &SynergyConfig) -> TelemetryResult<()> {
    synergy_telemetry::init_telemetry(&config.telemetry_config())
}
