//! Shared pipeline context

use modelpress_atlas::ShaderPropertyDefaults;
use modelpress_io::AssetSink;

/// Collaborators shared by every stage: the asset sink and the
/// shader-property fallback table. Built once per optimize invocation;
/// tests substitute alternate sinks and tables freely.
pub struct Context<'a> {
    pub sink: &'a mut dyn AssetSink,
    pub defaults: ShaderPropertyDefaults,
}

impl<'a> Context<'a> {
    pub fn new(sink: &'a mut dyn AssetSink) -> Self {
        Self {
            sink,
            defaults: ShaderPropertyDefaults::default(),
        }
    }

    pub fn with_defaults(sink: &'a mut dyn AssetSink, defaults: ShaderPropertyDefaults) -> Self {
        Self { sink, defaults }
    }
}
